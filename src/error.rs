use thiserror::Error;

/// Error taxonomy for the threat assessment engine.
///
/// Only `Persistence` is fatal to a batch scan. `Extraction` is recovered
/// per message, `ModelIncompatible` is recovered at startup by falling back
/// to rule-based scoring, and `SourceUnavailable` triggers source fallback.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Feature extraction failed for a single message.
    #[error("feature extraction failed: {0}")]
    Extraction(String),

    /// A model artifact (or feature vector) does not match the current
    /// feature set and was rejected rather than silently mis-scored.
    #[error("model incompatible: {0}")]
    ModelIncompatible(String),

    /// The mail provider could not deliver messages (auth expired, quota,
    /// network). Surfaced to callers only as a fallback reason.
    #[error("inbox source unavailable: {0}")]
    SourceUnavailable(String),

    /// A flagged verdict could not be durably saved. The caller must be
    /// told the scan did not save rather than silently losing flags.
    #[error("persistence failed: {0}")]
    Persistence(String),
}
