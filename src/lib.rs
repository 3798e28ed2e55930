pub mod assessment;
pub mod config;
pub mod error;
pub mod features;
pub mod message;
pub mod model;
pub mod policy;
pub mod scan;
pub mod scorer;
pub mod source;
pub mod store;

pub use assessment::{Confidence, RiskBand, ThreatAssessment, ThreatType};
pub use config::{EngineConfig, ScoringConfig};
pub use error::EngineError;
pub use message::EmailMessage;
pub use policy::{PolicyDecision, PolicyFilter, UserPolicy};
pub use scan::{ScanOrchestrator, ScanResult, ScanSource, Verdict};
pub use scorer::ThreatScorer;
pub use source::{InboxSource, SimulatedMailSource};
pub use store::{
    FlaggedEmailRecord, FlaggedStore, MemoryFlaggedStore, MemoryPolicyStore, PolicyStore,
};
