// src/cli.rs
use clap::Parser;

/// ct-backscan: Certificate Transparency backward scanner
///
/// Serves a scan endpoint that walks registered CT logs backward from their
/// current tree heads, extracting domains from certificates issued since a
/// cutoff date.
#[derive(Parser, Debug, Clone)]
#[command(name = "ct-backscan")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to TOML config file
    #[arg(short = 'c', long = "config", default_value = "config.toml")]
    pub config: String,

    /// Override listen address from config (host:port)
    #[arg(short = 'l', long = "listen")]
    pub listen: Option<String>,

    /// Verbose logging (set log level to debug)
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Quiet logging (set log level to warn)
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,
}

impl Cli {
    /// Validate flag combinations and return errors for invalid usage
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.verbose && self.quiet {
            anyhow::bail!("Cannot use --verbose with --quiet");
        }
        Ok(())
    }
}
