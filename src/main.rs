use clap::{Arg, Command};
use log::LevelFilter;
use mailwarden::config::EngineConfig;
use mailwarden::message::EmailMessage;
use mailwarden::scan::ScanOrchestrator;
use mailwarden::source::SimulatedMailSource;
use mailwarden::store::{FlaggedStore, MemoryFlaggedStore, MemoryPolicyStore};
use std::process;
use std::sync::Arc;

fn main() {
    let matches = Command::new("mailwarden")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Email threat assessment engine with explainable scoring")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("mailwarden.yaml"),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Generate a default configuration file")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("analyze")
                .long("analyze")
                .value_name("FILE")
                .help("Analyze a single email from a JSON file and print the assessment")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("scan")
                .long("scan")
                .help("Scan the inbox and flag threats")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("list-flagged")
                .long("list-flagged")
                .help("List flagged messages after a scan")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("user")
                .short('u')
                .long("user")
                .value_name("ID")
                .help("User whose policy and flags apply")
                .default_value("demo"),
        )
        .arg(
            Arg::new("model")
                .long("model")
                .value_name("FILE")
                .help("Classifier artifact path (overrides configuration)")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let log_level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if let Some(generate_path) = matches.get_one::<String>("generate-config") {
        match EngineConfig::default().to_file(generate_path) {
            Ok(()) => println!("✅ Default configuration written to {generate_path}"),
            Err(e) => {
                eprintln!("❌ Failed to write configuration: {e}");
                process::exit(1);
            }
        }
        return;
    }

    let config_path = matches.get_one::<String>("config").unwrap();
    let mut config = if std::path::Path::new(config_path).exists() {
        match EngineConfig::from_file(config_path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("❌ Error loading configuration: {e}");
                process::exit(1);
            }
        }
    } else {
        EngineConfig::default()
    };
    if let Some(model_path) = matches.get_one::<String>("model") {
        config.model_path = Some(model_path.clone());
    }

    let user_id = matches.get_one::<String>("user").unwrap();
    let flagged = Arc::new(MemoryFlaggedStore::new());
    let orchestrator = ScanOrchestrator::new(
        &config,
        Arc::new(MemoryPolicyStore::new()),
        flagged.clone(),
        Box::new(SimulatedMailSource::new()),
        Box::new(SimulatedMailSource::new()),
    );
    log::info!(
        "scoring strategy: {}",
        if orchestrator.is_model_backed() {
            "model-backed"
        } else {
            "rule-based"
        }
    );

    if let Some(email_file) = matches.get_one::<String>("analyze") {
        analyze_email_file(&orchestrator, user_id, email_file);
        return;
    }

    if matches.get_flag("scan") {
        match orchestrator.scan_inbox(user_id) {
            Ok(result) => {
                println!("📬 Scanned {} messages via {:?} source", result.total_scanned, result.source);
                if let Some(reason) = &result.fallback_reason {
                    println!("   ({reason})");
                }
                println!(
                    "   Threats found: {} ({:.0}%)",
                    result.threats_found,
                    result.threat_rate * 100.0
                );
                if result.analysis_failures > 0 {
                    println!("   Analysis failures: {}", result.analysis_failures);
                }
            }
            Err(e) => {
                eprintln!("❌ Scan failed: {e}");
                process::exit(1);
            }
        }
        if matches.get_flag("list-flagged") {
            list_flagged(flagged.as_ref(), user_id);
        }
        return;
    }

    eprintln!("Nothing to do. Try --scan or --analyze FILE (see --help).");
    process::exit(2);
}

fn analyze_email_file(orchestrator: &ScanOrchestrator, user_id: &str, path: &str) {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("❌ Failed to read {path}: {e}");
            process::exit(1);
        }
    };
    let message: EmailMessage = match serde_json::from_str(&content) {
        Ok(message) => message,
        Err(e) => {
            eprintln!("❌ Failed to parse email JSON: {e}");
            process::exit(1);
        }
    };
    match orchestrator.analyze_single_email(user_id, &message, false) {
        Ok(verdict) => match serde_json::to_string_pretty(&verdict) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("❌ Failed to serialize verdict: {e}");
                process::exit(1);
            }
        },
        Err(e) => {
            eprintln!("❌ Analysis failed: {e}");
            process::exit(1);
        }
    }
}

fn list_flagged(flagged: &MemoryFlaggedStore, user_id: &str) {
    match flagged.list(user_id) {
        Ok(records) => {
            if records.is_empty() {
                println!("📭 No flagged messages for {user_id}");
                return;
            }
            println!("🚩 Flagged messages for {user_id}:");
            for record in records {
                println!(
                    "  • {} [{}] score {:.2} ({})",
                    record.message_id,
                    record.assessment.threat_type,
                    record.assessment.score,
                    record.assessment.risk_factors.join("; ")
                );
            }
        }
        Err(e) => {
            eprintln!("❌ Failed to list flagged messages: {e}");
            process::exit(1);
        }
    }
}
