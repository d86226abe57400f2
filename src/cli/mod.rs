//! CLI definitions for taskdeck.
//!
//! This module defines the CLI structure using clap's derive macros.

use clap::Parser;
use std::path::PathBuf;

use crate::config::Config;

/// Personal task board with cover images and a local terminal launcher
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Path to database file (overrides config)
    #[arg(short, long)]
    pub database: Option<PathBuf>,

    /// Writable static directory; covers are stored under <dir>/uploads/tasks
    #[arg(short, long)]
    pub static_dir: Option<PathBuf>,

    /// Address to bind (overrides config)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2")]
    pub log: String,
}

impl Cli {
    /// Apply command-line overrides on top of the loaded configuration.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(ref db_path) = self.database {
            config.server.db_path = db_path.clone();
        }
        if let Some(ref static_dir) = self.static_dir {
            config.storage.static_dir = static_dir.clone();
        }
        if let Some(ref host) = self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
    }
}
