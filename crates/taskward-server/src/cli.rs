//! Command-line flags for the taskward server.

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "taskward-server", version, about = "Asynchronous inference task service")]
pub struct Cli {
    /// Config file to load instead of `config/<ENV>.yaml`.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Listen address (e.g. `0.0.0.0:8000`); overrides `server.host`/`server.port`.
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<String>,
}
