use clap::Parser;

/// Command line interface for the newspaper generation service
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Cli {
    /// Optional YAML file with service settings; environment variables override it
    #[arg(short, long)]
    pub config: Option<String>,

    /// Sets the logging verbosity level for the application
    /// Possible values: "error", "warn", "info", "debug", "trace"
    /// Default: "info"
    #[arg(long, default_value_t = String::from("info"))]
    pub logging_level: String,

    /// Port to listen on, overriding the configured one
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Also write logs to a daily rotating file under `logs/`
    #[arg(long, default_value_t = false)]
    pub log_to_file: bool,
}
