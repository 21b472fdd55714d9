//! # CLI
//!
//! This module defines the command-line interface of `thrimp` using `clap`.
//!
//! It is responsible for parsing user input and performing validation (e.g. splitting
//! `Service/method` targets and parsing JSON arguments).
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "thrimp", version, about = "Dynamic Thrift CLI")]
pub struct Cli {
    /// The server endpoint to connect to (e.g. localhost:9090)
    pub endpoint: String,

    /// Path to the parsed IDL document (JSON file)
    #[arg(long)]
    pub schema: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Perform a Thrift call against a server
    ///
    /// This command connects to a Thrift server and executes a method using
    /// positional JSON arguments, one `--arg` per declared parameter.
    ///
    /// ## Examples:
    ///
    /// ```bash
    /// thrimp localhost:9090 --schema calc.json call Calculator/add --arg 40 --arg 2
    /// ```
    Call {
        /// Target (Service/method)
        #[arg(value_parser = parse_target)]
        target: (String, String),

        /// Positional argument as a JSON value; repeat once per declared parameter
        #[arg(long = "arg", value_parser = parse_argument)]
        args: Vec<serde_json::Value>,

        /// Connect timeout in milliseconds
        #[arg(long, default_value_t = 5000)]
        timeout_ms: u64,
    },

    /// List services or other resources defined in the document
    List {
        #[command(subcommand)]
        sub: ListCommands,
    },

    /// Describe a service or a method in detail
    Describe {
        #[command(subcommand)]
        sub: DescribeCommands,
    },
}

#[derive(Subcommand)]
pub enum ListCommands {
    /// List all services defined in the loaded document
    Services,
}

#[derive(Subcommand)]
pub enum DescribeCommands {
    /// Describe a specific service (list its methods)
    Service {
        /// Service name (e.g. Calculator)
        service: String,
    },
    /// Describe a specific method (show its signature)
    Method {
        /// Target (Service/method)
        #[arg(value_parser = parse_target)]
        method: (String, String),
    },
}

fn parse_target(value: &str) -> Result<(String, String), String> {
    let (service, method) = value
        .split_once('/')
        .ok_or_else(|| format!("Invalid target format: '{value}'. Expected 'Service/method'"))?;

    if service.trim().is_empty() || method.trim().is_empty() {
        return Err("Service and method names cannot be empty".to_string());
    }

    Ok((service.to_string(), method.to_string()))
}

fn parse_argument(value: &str) -> Result<serde_json::Value, String> {
    serde_json::from_str(value).map_err(|e| format!("Invalid JSON: {e}"))
}
