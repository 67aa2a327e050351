use std::path::{Path, PathBuf};
use std::process::ExitCode;

use axum::http::{HeaderName, HeaderValue};
use clap::{Parser, Subcommand};
use serde_json::json;

use request_gatekeeper::auth::AuthenticatorRegistry;
use request_gatekeeper::config::{load_config, registry_for, ConfigError};
use request_gatekeeper::gatekeeper::{GateRequest, Gatekeeper};

#[derive(Parser)]
#[command(name = "gatekeeper-cli")]
#[command(about = "Validate permission files and dry-run requests against them", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration file and report every problem
    Check {
        file: PathBuf,
    },
    /// Run one request through the gatekeeper without a server
    Probe {
        file: PathBuf,
        /// HTTP method, e.g. GET
        method: String,
        /// Path with optional query, e.g. "/items?limit=5"
        target: String,
        /// Request header as `name:value`; repeatable
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check { file } => Ok(check(&file)),
        Commands::Probe {
            file,
            method,
            target,
            headers,
        } => probe(&file, method, &target, &headers).await,
    }
}

fn check(file: &Path) -> ExitCode {
    match load_config(file) {
        Ok(config) => {
            println!("OK ({} patterns)", config.permissions.len());
            ExitCode::SUCCESS
        }
        Err(ConfigError::Validation(errors)) => {
            for error in &errors {
                eprintln!("error: {}", error);
            }
            eprintln!("{} problem(s) found", errors.len());
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn probe(
    file: &Path,
    method: String,
    target: &str,
    headers: &[String],
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = load_config(file)?;
    let gatekeeper = Gatekeeper::from_config(&config, &registry_for(&config, &AuthenticatorRegistry::new()))?;

    let mut request = GateRequest::new(method, target);
    for header in headers {
        let (name, value) = header
            .split_once(':')
            .ok_or_else(|| format!("header `{header}` is not in `name:value` form"))?;
        request = request.with_header(
            HeaderName::from_bytes(name.trim().as_bytes())?,
            HeaderValue::from_str(value.trim())?,
        );
    }

    let (decision, code) = match gatekeeper.check(request).await {
        Ok(guarded) => (
            json!({ "admitted": true, "status": 200, "gate": guarded.context }),
            ExitCode::SUCCESS,
        ),
        Err(rejection) => (
            json!({
                "admitted": false,
                "status": rejection.status().as_u16(),
                "kind": rejection.kind,
                "error": rejection.message,
            }),
            ExitCode::from(2),
        ),
    };

    println!("{}", serde_json::to_string_pretty(&decision)?);
    Ok(code)
}
