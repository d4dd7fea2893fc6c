use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use hey_service::config::{self, BackendKind, ObservabilityConfig};
use hey_service::discovery::{self, DiscoveredRecord, RecordFilter, RegistrationId};
use hey_service::observability::logging;

#[derive(Parser)]
#[command(name = "discovery-cli")]
#[command(about = "Inspect and prune the service discovery store", long_about = None)]
struct Cli {
    /// Same configuration file the service uses
    #[arg(short, long, env = "HEY_SERVICE_CONFIG")]
    config: Option<PathBuf>,

    /// Override the configured backend (redis, rest, memory)
    #[arg(short, long)]
    backend: Option<BackendKind>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List published records
    List {
        /// Only records with this name
        #[arg(long)]
        name: Option<String>,

        /// Only records whose metadata contains key=value
        #[arg(long, value_parser = parse_key_value)]
        meta: Option<(String, String)>,

        /// Print the records as JSON
        #[arg(long)]
        json: bool,
    },
    /// Withdraw a record, e.g. one left behind by a killed instance
    Unpublish {
        registration: String,
    },
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{raw}'")),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match config::load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::from(2);
        }
    };
    logging::init_logging(&ObservabilityConfig {
        log_level: "warn".into(),
        ..config.observability.clone()
    });

    if let Some(kind) = cli.backend {
        config.discovery.backend = kind;
    }

    let backend = match discovery::connect(&config.discovery) {
        Ok(backend) => backend,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::from(2);
        }
    };

    match cli.command {
        Commands::List { name, meta, json } => {
            let filter = match (name, meta) {
                (Some(name), Some((key, value))) => RecordFilter::matching(move |record| {
                    record.name() == name && record.metadata_value(&key) == Some(value.as_str())
                }),
                (Some(name), None) => RecordFilter::by_name(name),
                (None, Some((key, value))) => RecordFilter::by_metadata(key, value),
                (None, None) => RecordFilter::All,
            };

            match backend.query(&filter).await {
                Ok(records) => print_records(&records, json),
                Err(e) => {
                    eprintln!("Error: {e}");
                    ExitCode::FAILURE
                }
            }
        }
        Commands::Unpublish { registration } => {
            let registration = RegistrationId::new(registration);
            match backend.unpublish(&registration).await {
                Ok(()) => {
                    println!("Unpublished {registration}");
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("Error: {e}");
                    ExitCode::FAILURE
                }
            }
        }
    }
}

fn print_records(records: &[DiscoveredRecord], json: bool) -> ExitCode {
    if json {
        let rows: Vec<serde_json::Value> = records
            .iter()
            .map(|found| {
                serde_json::json!({
                    "registration": found.registration,
                    "status": found.status,
                    "record": found.record,
                    "endpoint": found.record.endpoint(),
                })
            })
            .collect();

        return match serde_json::to_string_pretty(&rows) {
            Ok(text) => {
                println!("{text}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error: {e}");
                ExitCode::FAILURE
            }
        };
    }

    if records.is_empty() {
        println!("No records");
        return ExitCode::SUCCESS;
    }

    for found in records {
        println!(
            "{}  {:<20} {:?}  {}",
            found.registration,
            found.record.name(),
            found.status,
            found.record.endpoint()
        );
    }
    ExitCode::SUCCESS
}
