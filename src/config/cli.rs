use std::{path::PathBuf, str::FromStr};

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

use crate::domain::conversion::DocumentFormat;

/// Command-line arguments for the MarkDraft binary.
#[derive(Debug, Parser)]
#[command(
    name = "markdraft",
    version,
    about = "Convert Markdown into Word and PDF documents"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "MARKDRAFT_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP service (default).
    Serve(Box<ServeArgs>),
    /// Convert a Markdown file without starting the server.
    Convert(ConvertArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct LoggingOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct PdfOverrides {
    /// Path to the Chromium or Chrome executable used for PDF output.
    #[arg(long = "pdf-chrome-executable", value_name = "PATH", value_hint = ValueHint::ExecutablePath)]
    pub chrome_executable: Option<PathBuf>,

    /// Upper bound for each rendering-engine step.
    #[arg(long = "pdf-step-timeout-seconds", value_name = "SECONDS")]
    pub step_timeout_seconds: Option<u64>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub logging: LoggingOverrides,

    #[command(flatten)]
    pub pdf: PdfOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the maximum accepted request body in bytes.
    #[arg(long = "server-body-limit-bytes", value_name = "BYTES")]
    pub body_limit_bytes: Option<u64>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Args, Clone)]
pub struct ConvertArgs {
    #[command(flatten)]
    pub logging: LoggingOverrides,

    #[command(flatten)]
    pub pdf: PdfOverrides,

    /// Markdown file to convert.
    #[arg(value_name = "INPUT", value_hint = ValueHint::FilePath)]
    pub input: PathBuf,

    /// Output format (docx|pdf).
    #[arg(long, value_name = "FORMAT", value_parser = parse_format)]
    pub format: DocumentFormat,

    /// Page orientation for PDF output (portrait|landscape).
    #[arg(long, value_name = "ORIENTATION")]
    pub orientation: Option<String>,

    /// Destination file; defaults to the suggested download name.
    #[arg(long, short, value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub output: Option<PathBuf>,
}

fn parse_format(value: &str) -> Result<DocumentFormat, String> {
    DocumentFormat::from_str(value).map_err(|err| err.public_message().to_string())
}
