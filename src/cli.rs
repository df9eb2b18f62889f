use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "luna-agent", version, about = "Host telemetry agent for luna")]
pub struct Cli {
    /// Set config path
    #[arg(long, default_value = "agent.yml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Install the agent as a systemd service
    Install,
    /// List all sensors
    #[command(alias = "sensors:print")]
    Sensors,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_command_means_serve_with_default_config() {
        let cli = Cli::try_parse_from(["luna-agent"]).unwrap();
        assert_eq!(cli.command, None);
        assert_eq!(cli.config, PathBuf::from("agent.yml"));
    }

    #[test]
    fn config_flag_and_commands() {
        let cli = Cli::try_parse_from(["luna-agent", "--config", "/opt/luna-agent/agent.yml"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("/opt/luna-agent/agent.yml"));

        let cli = Cli::try_parse_from(["luna-agent", "install"]).unwrap();
        assert_eq!(cli.command, Some(Command::Install));

        for name in ["sensors", "sensors:print"] {
            let cli = Cli::try_parse_from(["luna-agent", name]).unwrap();
            assert_eq!(cli.command, Some(Command::Sensors), "{name}");
        }
    }

    #[test]
    fn unknown_command_is_rejected() {
        assert!(Cli::try_parse_from(["luna-agent", "uninstall"]).is_err());
        assert!(Cli::try_parse_from(["luna-agent", "install", "extra"]).is_err());
    }

    #[test]
    fn definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
