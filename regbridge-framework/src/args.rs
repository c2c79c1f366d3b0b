//! CLI argument parsing for bridges.

use std::path::PathBuf;

use clap::Parser;

/// Common CLI arguments for all bridges.
#[derive(Parser, Debug, Clone)]
#[command(about = "Polls register values from a controller and publishes them to Zenoh")]
#[command(version)]
pub struct BridgeArgs {
    /// Path to configuration file (JSON5 format).
    #[arg(short, long)]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,
}

impl BridgeArgs {
    /// Parse CLI arguments with a default config path.
    ///
    /// If no `--config` argument is provided, uses the default.
    pub fn parse_with_default(default_config: &'static str) -> Self {
        Self::parse_from_with_default(std::env::args_os(), default_config)
    }

    /// Same as [`parse_with_default`](Self::parse_with_default) over an explicit argument list.
    pub fn parse_from_with_default<I, T>(args: I, default_config: &'static str) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let matches = <Self as clap::CommandFactory>::command()
            .mut_arg("config", |arg| arg.default_value(default_config))
            .get_matches_from(args);

        <Self as clap::FromArgMatches>::from_arg_matches(&matches).unwrap_or_else(|e| e.exit())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_path() {
        let args = BridgeArgs::parse_from_with_default(["regbridge-modbus"], "regbridge.json5");
        assert_eq!(args.config, PathBuf::from("regbridge.json5"));
        assert_eq!(args.log_level, None);
    }

    #[test]
    fn test_explicit_arguments() {
        let args = BridgeArgs::parse_from_with_default(
            ["regbridge-modbus", "-c", "site.json5", "--log-level", "debug"],
            "regbridge.json5",
        );
        assert_eq!(args.config, PathBuf::from("site.json5"));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
    }
}
