//! emr-client: command-line access to the per-resource services.

use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value as JsonValue};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use emr_client::{ClientConfig, ListRequest, QueryResult, ResourceService, Services};
use emr_core::{ResourceMapper, SortDirection};

#[derive(Parser)]
#[command(
    name = "emr-client",
    about = "Browse and manage EMR resources on a FHIR server",
    version,
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List one page of resources.
    List {
        resource: ResourceKind,
        /// Zero-based page index.
        #[arg(long)]
        page: Option<u32>,
        #[arg(long, default_value_t = 20)]
        page_size: u32,
        /// Sort field (application name, e.g. recordedDate). Repeatable.
        #[arg(long = "sort", value_name = "FIELD")]
        sort_fields: Vec<String>,
        /// Sort every field descending.
        #[arg(long)]
        desc: bool,
        /// Filter as key=value (application name, e.g. patientId=42). Repeatable.
        #[arg(long = "filter", value_name = "KEY=VALUE")]
        filters: Vec<String>,
    },

    /// Read one resource by id.
    Get { resource: ResourceKind, id: String },

    /// Delete one resource by id.
    Delete { resource: ResourceKind, id: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum ResourceKind {
    Patient,
    Practitioner,
    Condition,
    AllergyIntolerance,
    Medication,
    MedicationRequest,
    Encounter,
    Appointment,
    Location,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = ClientConfig::from_env();

    if config.api_key.is_some() {
        tracing::info!("API key authentication enabled");
    }
    match &config.auth {
        Some(auth) if config.session_store_path.is_some() => {
            tracing::info!(storage_key = %auth.storage_key(), "Bearer token lookup enabled");
        }
        _ => tracing::debug!("No session store configured, requests carry no bearer token"),
    }
    tracing::info!(base_url = %config.base_url, "Using FHIR server");

    let services = Services::new(&config);
    let resource = match &cli.command {
        Command::List { resource, .. }
        | Command::Get { resource, .. }
        | Command::Delete { resource, .. } => *resource,
    };

    match resource {
        ResourceKind::Patient => run(&services.patients, cli.command).await,
        ResourceKind::Practitioner => run(&services.practitioners, cli.command).await,
        ResourceKind::Condition => run(&services.conditions, cli.command).await,
        ResourceKind::AllergyIntolerance => {
            run(&services.allergy_intolerances, cli.command).await
        }
        ResourceKind::Medication => run(&services.medications, cli.command).await,
        ResourceKind::MedicationRequest => run(&services.medication_requests, cli.command).await,
        ResourceKind::Encounter => run(&services.encounters, cli.command).await,
        ResourceKind::Appointment => run(&services.appointments, cli.command).await,
        ResourceKind::Location => run(&services.locations, cli.command).await,
    }
}

async fn run<M: ResourceMapper>(service: &ResourceService<M>, command: Command) -> ExitCode {
    match command {
        Command::List {
            page,
            page_size,
            sort_fields,
            desc,
            filters,
            ..
        } => {
            let filters = match parse_filters::<M::Filters>(&filters) {
                Ok(filters) => filters,
                Err(message) => {
                    eprintln!("{message}");
                    return ExitCode::from(2);
                }
            };
            let direction = if desc {
                SortDirection::Desc
            } else {
                SortDirection::Asc
            };
            let request = ListRequest {
                page,
                page_size: Some(page_size),
                filters,
                sort_directions: vec![direction; sort_fields.len()],
                sort_fields,
                result_fields: Vec::new(),
            };

            print(&service.list(&request).await)
        }
        Command::Get { id, .. } => print(&service.get(&id).await),
        Command::Delete { id, .. } => print(&service.delete(&id).await),
    }
}

/// `key=value` pairs → typed filters; `true`/`false` become booleans
fn parse_filters<F: DeserializeOwned>(pairs: &[String]) -> Result<F, String> {
    let mut fields = Map::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| format!("Filter '{pair}' is not key=value"))?;
        let value = match value {
            "true" => JsonValue::Bool(true),
            "false" => JsonValue::Bool(false),
            other => JsonValue::String(other.to_string()),
        };
        fields.insert(key.trim().to_string(), value);
    }

    serde_json::from_value(JsonValue::Object(fields)).map_err(|e| format!("Invalid filters: {e}"))
}

fn print<T: Serialize>(result: &QueryResult<T>) -> ExitCode {
    match serde_json::to_string_pretty(result) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Failed to render result: {e}");
            return ExitCode::FAILURE;
        }
    }

    if result.is_error() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
