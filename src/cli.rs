//! Command-line interface.

use std::path::PathBuf;

use chorus_settings::ChorusSettings;
use clap::{Args, Parser, Subcommand};

/// Multi-client tone session server.
#[derive(Parser, Debug)]
#[command(name = "chorus", version, about = "Multi-client tone session server")]
pub struct Cli {
    /// Settings file (defaults to `~/.chorus/settings.json`).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Emit JSON log lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// What to run. Defaults to `serve`.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the session server.
    Serve(ServeArgs),
    /// Connect as a client and play random tones.
    Wander(WanderArgs),
}

impl Default for Command {
    fn default() -> Self {
        Self::Serve(ServeArgs::default())
    }
}

/// Flags for `chorus serve`. Each overrides the matching setting.
#[derive(Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Host to bind.
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind (0 for auto-assign).
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory of browser assets to serve.
    #[arg(long)]
    pub static_dir: Option<PathBuf>,
}

impl ServeArgs {
    /// Apply flags over loaded settings.
    pub fn apply(&self, settings: &mut ChorusSettings) {
        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(dir) = &self.static_dir {
            settings.server.static_dir = Some(dir.to_string_lossy().into_owned());
        }
    }
}

/// Flags for `chorus wander`.
#[derive(Args, Debug, Clone)]
pub struct WanderArgs {
    /// Server WebSocket URL.
    #[arg(long, default_value = "ws://127.0.0.1:8765/ws")]
    pub url: String,

    /// How long each tone plays before it is stopped, in milliseconds.
    #[arg(long, default_value_t = 2_000)]
    pub interval_ms: u64,

    /// Silence between tones, in milliseconds.
    #[arg(long, default_value_t = 1_000)]
    pub rest_ms: u64,

    /// Stop after this many tones. Runs until Ctrl-C when omitted.
    #[arg(long)]
    pub rounds: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["chorus"]).unwrap();
        assert!(cli.command.is_none());
        assert!(matches!(cli.command.unwrap_or_default(), Command::Serve(_)));
    }

    #[test]
    fn serve_flags_override_settings() {
        let cli = Cli::try_parse_from([
            "chorus",
            "serve",
            "--host",
            "127.0.0.1",
            "--port",
            "9001",
            "--static-dir",
            "./web",
            "--log-json",
        ])
        .unwrap();
        assert!(cli.log_json);
        let Some(Command::Serve(args)) = cli.command else {
            panic!("expected serve");
        };

        let mut settings = ChorusSettings::default();
        args.apply(&mut settings);
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 9001);
        assert_eq!(settings.server.static_dir.as_deref(), Some("./web"));
    }

    #[test]
    fn empty_serve_args_change_nothing() {
        let mut settings = ChorusSettings::default();
        ServeArgs::default().apply(&mut settings);
        assert_eq!(settings.server.port, 8765);
        assert_eq!(settings.server.host, "0.0.0.0");
    }

    #[test]
    fn wander_defaults() {
        let cli = Cli::try_parse_from(["chorus", "wander", "--rounds", "3"]).unwrap();
        let Some(Command::Wander(args)) = cli.command else {
            panic!("expected wander");
        };
        assert_eq!(args.url, "ws://127.0.0.1:8765/ws");
        assert_eq!(args.interval_ms, 2_000);
        assert_eq!(args.rest_ms, 1_000);
        assert_eq!(args.rounds, Some(3));
    }

    #[test]
    fn config_is_global() {
        let cli = Cli::try_parse_from(["chorus", "wander", "--config", "/tmp/c.json"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.json")));
    }
}
