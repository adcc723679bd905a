use std::path::PathBuf;

use clap::Parser;
use patentupload_excel::parse_column_mapping;
use patentupload_protocol::ColumnMapping;

/// Convert patent workbooks and upload them to the import service.
#[derive(Parser, Debug)]
#[command(name = "patent-upload", author, version, about, long_about = None)]
pub struct Cli {
    /// Server base URL (e.g. http://localhost:3000)
    #[arg(short, long, env = "PATENTUPLOAD_SERVER")]
    pub server: Option<String>,

    /// Account name
    #[arg(short = 'u', long)]
    pub username: Option<String>,

    /// Account password
    #[arg(short, long, env = "PATENTUPLOAD_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Directory holding the source workbooks
    #[arg(short, long, required_unless_present = "check")]
    pub input: Option<PathBuf>,

    /// Directory receiving the converted workbooks
    #[arg(short, long, required_unless_present = "check")]
    pub output: Option<PathBuf>,

    /// Only import valid invention patents
    #[arg(short = 'v', long)]
    pub only_valid_invention: bool,

    /// Header rename, "original:mapped" (repeatable)
    #[arg(
        short = 'm',
        long = "column-mapping",
        value_name = "MAPPING",
        value_parser = parse_mapping
    )]
    pub column_mappings: Vec<ColumnMapping>,

    /// Retry failed uploads once after the run
    #[arg(long)]
    pub retry_failed: bool,

    /// Only check that the server answers, then exit
    #[arg(long)]
    pub check: bool,

    /// Write the event log to this file (or into this directory) when done
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Log filter (overridden by RUST_LOG)
    #[arg(long, value_name = "FILTER")]
    pub log_level: Option<String>,

    /// Settings file (default: <config dir>/patentupload/config.json)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Persist server, account and mappings to the settings file
    #[arg(long)]
    pub save_config: bool,
}

fn parse_mapping(s: &str) -> Result<ColumnMapping, String> {
    parse_column_mapping(s).map_err(|e| e.to_string())
}
