//! CLI entry point for the relay.

pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// HubSpot form relay
#[derive(Parser, Debug)]
#[command(name = "hubspot-relay", version, about = "Relay site form submissions to HubSpot")]
pub struct Cli {
    /// Config file (defaults to $HUBSPOT_RELAY_CONFIG or ~/.hubspot-relay/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP service
    Serve(ServeArgs),
    /// HubSpot account connection
    Auth(AuthArgs),
    /// HubSpot forms
    Forms(FormsArgs),
    /// HubSpot email subscription types
    Subscriptions(SubscriptionsArgs),
    /// HubSpot contacts
    Contacts(ContactsArgs),
    /// Stored field mappings
    Mapping(MappingArgs),
}

#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Listen address (overrides the configured one)
    #[arg(long)]
    pub addr: Option<String>,
}

#[derive(Parser, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommands,
}

#[derive(Subcommand, Debug)]
pub enum AuthCommands {
    /// Print the HubSpot authorization URL
    Url,
    /// Exchange the code HubSpot redirected back with
    Complete(CompleteArgs),
    /// Show connection status
    Status,
    /// Forget the stored token
    Logout,
}

#[derive(Parser, Debug)]
pub struct CompleteArgs {
    /// Authorization code from the redirect
    pub code: String,
}

#[derive(Parser, Debug)]
pub struct FormsArgs {
    #[command(subcommand)]
    pub command: ListCommand,
}

#[derive(Parser, Debug)]
pub struct SubscriptionsArgs {
    #[command(subcommand)]
    pub command: ListCommand,
}

#[derive(Subcommand, Debug)]
pub enum ListCommand {
    /// List entries
    List,
}

#[derive(Parser, Debug)]
pub struct ContactsArgs {
    #[command(subcommand)]
    pub command: ContactsCommands,
}

#[derive(Subcommand, Debug)]
pub enum ContactsCommands {
    /// Most recently updated contacts
    Recent {
        #[arg(short, long, default_value_t = crate::client::DEFAULT_RECENT_CONTACTS)]
        count: u32,
    },
}

#[derive(Parser, Debug)]
pub struct MappingArgs {
    #[command(subcommand)]
    pub command: MappingCommands,
}

#[derive(Subcommand, Debug)]
pub enum MappingCommands {
    /// Print the stored mapping of a local form
    Show { form_id: String },
    /// Resolve a form through the legacy `remoteGuid|localFormId` mapping
    Legacy {
        /// Remote form guid or local form id; lists every pair when omitted
        key: Option<String>,
    },
}

impl Cli {
    /// Parse CLI arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_auth_complete() {
        let cli = Cli::try_parse_from(["hubspot-relay", "auth", "complete", "code-123"]).unwrap();
        match cli.command {
            Commands::Auth(auth) => match auth.command {
                AuthCommands::Complete(args) => assert_eq!(args.code, "code-123"),
                other => panic!("expected Complete, got {other:?}"),
            },
            other => panic!("expected Auth, got {other:?}"),
        }
    }

    #[test]
    fn parse_contacts_recent_defaults_to_five() {
        let cli = Cli::try_parse_from(["hubspot-relay", "contacts", "recent"]).unwrap();
        match cli.command {
            Commands::Contacts(args) => {
                let ContactsCommands::Recent { count } = args.command;
                assert_eq!(count, 5);
            }
            other => panic!("expected Contacts, got {other:?}"),
        }
    }

    #[test]
    fn parse_global_log_format_after_subcommand() {
        let cli =
            Cli::try_parse_from(["hubspot-relay", "serve", "--log-format", "json"]).unwrap();
        assert_eq!(cli.log_format, LogFormat::Json);
        assert!(matches!(cli.command, Commands::Serve(ServeArgs { addr: None })));
    }

    #[test]
    fn parse_mapping_legacy_without_key() {
        let cli = Cli::try_parse_from(["hubspot-relay", "mapping", "legacy"]).unwrap();
        match cli.command {
            Commands::Mapping(args) => {
                assert!(matches!(args.command, MappingCommands::Legacy { key: None }))
            }
            other => panic!("expected Mapping, got {other:?}"),
        }
    }

    #[test]
    fn unknown_subcommand_fails() {
        assert!(Cli::try_parse_from(["hubspot-relay", "chat"]).is_err());
    }
}
