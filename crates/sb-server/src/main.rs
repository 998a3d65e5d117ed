//! scenebridge server.
//!
//! `scenebridge` serves the HTTP API. Two one-shot modes are also available:
//! `--validate` checks a design file read from stdin, and `--fetch <file_key>`
//! downloads a file from the design API and checks it.

use sb_core::schema::{SchemaError, ValidationReport, validate};
use sb_server::ServerConfig;
use sb_server::design_api::{DesignApiClient, DesignApiError};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();

    // ── `scenebridge --validate` ────────────────────────────────────────
    // Reads a design file from stdin, prints the report, exits 1 if invalid.
    if args.get(1).map(|s| s.as_str()) == Some("--validate") {
        use std::io::Read;
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .expect("failed to read stdin");

        match serde_json::from_str(&text) {
            Ok(value) => exit_with_report(&validate(&value)),
            Err(e) => {
                eprintln!("scenebridge --validate error: {e}");
                std::process::exit(1);
            }
        }
    }

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("scenebridge: {e}");
            std::process::exit(1);
        }
    };

    // ── `scenebridge --fetch <file_key>` ────────────────────────────────
    if args.get(1).map(|s| s.as_str()) == Some("--fetch") {
        let Some(file_key) = args.get(2) else {
            eprintln!("usage: scenebridge --fetch <file_key>");
            std::process::exit(2);
        };
        let client = DesignApiClient::new(config.design_api.clone());
        match client.fetch_file(file_key).await {
            Ok(file) => {
                println!(
                    "{}: valid (schema version {}, last modified {})",
                    file.name, file.schema_version, file.last_modified
                );
                std::process::exit(0);
            }
            Err(DesignApiError::Schema(SchemaError::Invalid(report))) => {
                exit_with_report(&report)
            }
            Err(e) => {
                eprintln!("scenebridge --fetch error: {e}");
                std::process::exit(1);
            }
        }
    }

    // ── HTTP server ─────────────────────────────────────────────────────
    if let Err(e) = sb_server::serve(config).await {
        log::error!("server stopped: {e}");
        std::process::exit(1);
    }
}

fn exit_with_report(report: &ValidationReport) -> ! {
    match serde_json::to_string_pretty(report) {
        Ok(text) => println!("{text}"),
        Err(e) => eprintln!("could not print report: {e}"),
    }
    std::process::exit(if report.valid { 0 } else { 1 });
}
