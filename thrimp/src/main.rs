//! # Thrimp CLI Entry Point
//!
//! The main executable for the Thrimp tool. This file drives the application lifecycle:
//!
//! 1. **Initialization**: Parses command-line arguments using [`cli::Cli`] and loads the
//!    parsed IDL document (JSON) the external parser produced.
//! 2. **Connection**: Establishes a TCP connection to the target server via `thrimp_core`.
//! 3. **Execution**: Delegates the call to the `ThrimpClient`, or answers `list`/`describe`
//!    introspection requests straight from the loaded document.
//! 4. **Presentation**: Formats and prints the resulting data or error to standard
//!    output/error.

mod cli;
mod formatter;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands, DescribeCommands, ListCommands};
use formatter::{FormattedString, GenericError, ServiceList};
use std::path::Path;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use thrimp_core::client::ThrimpClient;
use thrimp_core::registry::ResolvedService;
use thrimp_core::schema::Document;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Cli::parse();

    let document = match load_document(&args.schema) {
        Ok(document) => document,
        Err(err) => {
            eprintln!(
                "{}",
                FormattedString::from(GenericError("Failed to load the schema document", err))
            );
            process::exit(1);
        }
    };

    match args.command {
        Commands::Call {
            target,
            args: call_args,
            timeout_ms,
        } => {
            let (service, method) = target;
            run_call(
                &args.endpoint,
                &document,
                &service,
                &method,
                &call_args,
                Duration::from_millis(timeout_ms),
            );
        }
        Commands::List { sub } => match sub {
            ListCommands::Services => list_services(&document),
        },
        Commands::Describe { sub } => match sub {
            DescribeCommands::Service { service } => describe_service(&document, &service),
            DescribeCommands::Method { method } => {
                let (service, method_name) = method;
                describe_method(&document, &service, &method_name)
            }
        },
    }
}

fn load_document(path: &Path) -> anyhow::Result<Document> {
    let raw = std::fs::read(path)
        .with_context(|| format!("reading schema document '{}'", path.display()))?;
    let document = serde_json::from_slice(&raw)
        .with_context(|| format!("parsing schema document '{}'", path.display()))?;
    Ok(document)
}

fn run_call(
    endpoint: &str,
    document: &Document,
    service_name: &str,
    method_name: &str,
    call_args: &[serde_json::Value],
    timeout: Duration,
) {
    let service = match ResolvedService::resolve(document, service_name) {
        Ok(service) => Arc::new(service),
        Err(err) => {
            eprintln!("{}", FormattedString::from(err));
            process::exit(1);
        }
    };

    let mut client = match ThrimpClient::connect(endpoint, timeout, service) {
        Ok(client) => client,
        Err(err) => {
            eprintln!("{}", FormattedString::from(err));
            process::exit(1);
        }
    };

    match client.call(method_name, call_args) {
        Ok(value) => println!("{}", FormattedString::from(value)),
        Err(err) => {
            eprintln!("{}", FormattedString::from(err));
            let _ = client.close();
            process::exit(1);
        }
    }

    if let Err(err) = client.close() {
        eprintln!(
            "{}",
            FormattedString::from(GenericError("Failed to close the connection", err))
        );
        process::exit(1);
    }
}

fn list_services(document: &Document) {
    let mut names: Vec<String> = document.services.keys().cloned().collect();
    names.sort();
    println!("{}", FormattedString::from(ServiceList(names)));
}

fn describe_service(document: &Document, name: &str) {
    match document.services.get(name) {
        Some(service) => println!("{}", FormattedString::from(service)),
        None => {
            eprintln!(
                "{}",
                FormattedString::from(GenericError("Service not found", name))
            );
            process::exit(1);
        }
    }
}

fn describe_method(document: &Document, service_name: &str, method_name: &str) {
    let Some(service) = document.services.get(service_name) else {
        eprintln!(
            "{}",
            FormattedString::from(GenericError("Service not found", service_name))
        );
        process::exit(1);
    };

    match service.methods.get(method_name) {
        Some(method) => println!("{}", FormattedString::from(method)),
        None => {
            eprintln!(
                "{}",
                FormattedString::from(GenericError("Method not found", method_name))
            );
            process::exit(1);
        }
    }
}
