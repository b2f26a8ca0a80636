use std::path::PathBuf;

use clap::{Parser, Subcommand};
use godisk_api::{
    DEFAULT_API_BASE, DEFAULT_REPORT_RETRIES, DEFAULT_REPORT_RETRY_DELAY_MS,
    DEFAULT_REQUEST_TIMEOUT_MS,
};

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_retry_count(value: &str) -> Result<usize, String> {
    let parsed = value
        .parse::<usize>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed > 20 {
        return Err("value must be in range 0..=20".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Parser)]
#[command(
    name = "godisk",
    about = "Terminal console for the GoDisk disk-image service",
    version
)]
/// Public struct `Cli` used across GoDisk console components.
pub struct Cli {
    #[arg(
        long,
        env = "GODISK_API_BASE",
        default_value = DEFAULT_API_BASE,
        help = "Base URL of the GoDisk HTTP API, including the /api prefix."
    )]
    pub api_base: String,

    #[arg(
        long,
        env = "GODISK_REQUEST_TIMEOUT_MS",
        default_value_t = DEFAULT_REQUEST_TIMEOUT_MS,
        value_parser = parse_positive_u64,
        help = "Per-request HTTP timeout in milliseconds."
    )]
    pub request_timeout_ms: u64,

    #[arg(
        long,
        env = "GODISK_REPORT_RETRIES",
        default_value_t = DEFAULT_REPORT_RETRIES,
        value_parser = parse_retry_count,
        help = "Extra report fetches after the first while a report is still empty."
    )]
    pub report_retries: usize,

    #[arg(
        long,
        env = "GODISK_REPORT_RETRY_DELAY_MS",
        default_value_t = DEFAULT_REPORT_RETRY_DELAY_MS,
        value_parser = parse_positive_u64,
        help = "Fixed delay between report fetch attempts in milliseconds."
    )]
    pub report_retry_delay_ms: u64,

    #[arg(
        long,
        env = "GODISK_STATE_DIR",
        default_value = ".godisk",
        help = "Directory holding the persisted session and REPL history."
    )]
    pub state_dir: PathBuf,

    #[arg(
        long,
        default_value_t = false,
        help = "Print console state as JSON instead of text."
    )]
    pub json: bool,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Run a script and render its output and reports.
    Exec {
        #[arg(
            long = "script-file",
            help = "Script file to run; repeat to merge several files in order. Reads stdin when omitted."
        )]
        script_files: Vec<PathBuf>,
        #[arg(long, conflicts_with = "script_files", help = "Inline script text.")]
        script: Option<String>,
    },
    /// Interactive script box; a blank line submits the buffered script.
    Repl,
    /// Log into a mounted partition.
    Login {
        #[arg(long)]
        user: String,
        #[arg(long, env = "GODISK_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        id: String,
    },
    /// Close the current session.
    Logout,
    /// Show the persisted session.
    Whoami,
    /// Output of the backend `mounted` command.
    Mounted,
    /// List mounted partitions.
    Mounts,
    /// Detailed listing of a directory on a mounted partition.
    Ls {
        #[arg(long, help = "Mount id; defaults to the session mount.")]
        id: Option<String>,
        #[arg(long, default_value = "/")]
        ruta: String,
    },
    /// Directories and files directly under a path.
    Browse {
        #[arg(long, help = "Mount id; defaults to the session mount.")]
        id: Option<String>,
        #[arg(long, default_value = "/")]
        ruta: String,
        #[arg(long, help = "Name filter; searches without a mount when set.")]
        name: Option<String>,
    },
    /// Print a file stored on a mounted partition.
    File {
        #[arg(long, help = "Mount id; defaults to the session mount.")]
        id: Option<String>,
        #[arg(long)]
        ruta: String,
    },
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{parse_positive_u64, parse_retry_count, Cli, CliCommand};

    #[test]
    fn unit_positive_parser_rejects_zero() {
        assert_eq!(parse_positive_u64("250"), Ok(250));
        assert!(parse_positive_u64("0").is_err());
        assert!(parse_positive_u64("x").is_err());
        assert_eq!(parse_retry_count("0"), Ok(0));
        assert!(parse_retry_count("21").is_err());
    }

    #[test]
    fn functional_defaults_match_console_policy() {
        let cli = Cli::try_parse_from(["godisk", "mounts"]).expect("parse");
        assert_eq!(cli.report_retries, 2);
        assert_eq!(cli.report_retry_delay_ms, 250);
        assert!(matches!(cli.command, CliCommand::Mounts));
    }

    #[test]
    fn regression_inline_script_conflicts_with_script_files() {
        let parsed = Cli::try_parse_from([
            "godisk",
            "exec",
            "--script",
            "mounted",
            "--script-file",
            "a.smia",
        ]);
        assert!(parsed.is_err());
    }
}
