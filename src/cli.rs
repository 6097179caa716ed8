// src/cli.rs

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Network reconnaissance and IP risk assessment", long_about = None)]
pub struct Cli {
    /// Configuration file (TOML). Defaults to config.toml in the user config directory.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Serve the JSON HTTP API
    Serve {
        /// Address to bind, overriding the configured one
        #[arg(long)]
        bind: Option<String>,
    },
    /// TCP port scan of one host
    Ports {
        host: String,
        /// common, quick or range
        #[arg(long, default_value = "common")]
        scan_type: String,
        /// Ports for a range scan (comma separated)
        #[arg(long, value_delimiter = ',')]
        ports: Vec<i64>,
    },
    /// Aggregated reputation of an IPv4 address
    Reputation { ip: String },
    /// Discover resolving subdomains of a domain
    Subdomains { domain: String },
    /// Interactive terminal UI (the default)
    Tui,
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Tui)
    }
}
