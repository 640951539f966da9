//! CLI command handlers.

use std::sync::Arc;

use crate::auth::{FileTokenStore, OAuthSession, TokenStoreConfig};
use crate::catalog::FormCatalog;
use crate::cli::{AuthCommands, ContactsCommands, ListCommand, MappingCommands};
use crate::config::RelayConfig;
use crate::mapping::{FileMappingStore, MappingEditor, MappingStore};
use crate::relay::{DebugMailer, LogMailer, SmtpMailer, SubmissionRelay};
use crate::server::AppState;

type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Build the session from config; credentials are required.
pub fn session_from_config(config: &RelayConfig) -> crate::error::Result<Arc<OAuthSession>> {
    let credentials = config.require_credentials()?;
    let store = FileTokenStore::new(TokenStoreConfig::new(config.data_dir()));
    Ok(Arc::new(
        OAuthSession::new(Arc::new(store), credentials).with_endpoints(config.endpoints()),
    ))
}

/// Wire every service of the HTTP surface.
pub fn app_state(config: &RelayConfig) -> crate::error::Result<AppState> {
    let session = session_from_config(config)?;
    let mappings: Arc<dyn MappingStore> = Arc::new(FileMappingStore::new(config.data_dir()));
    let mailer: Arc<dyn DebugMailer> = match config.smtp_settings()? {
        Some(smtp) => {
            tracing::info!(host = %smtp.host, "debug mails go through smtp");
            Arc::new(SmtpMailer::new(&smtp)?)
        }
        None => Arc::new(LogMailer),
    };
    let relay = SubmissionRelay::new(
        session.clone(),
        mappings.clone(),
        mailer,
        config.relay_settings()?,
    );
    Ok(AppState {
        catalog: Arc::new(FormCatalog::new(session.clone())),
        editor: Arc::new(MappingEditor::new(session.clone(), mappings)),
        relay: Arc::new(relay),
        session,
        trust_proxy: config.trust_proxy,
    })
}

/// Handle `hubspot-relay serve`.
pub async fn handle_serve(config: &RelayConfig, addr: Option<String>) -> CmdResult {
    let state = app_state(config)?;
    let addr = addr.unwrap_or_else(|| config.listen_addr().to_string());
    crate::server::serve(&addr, state).await?;
    Ok(())
}

/// Handle `hubspot-relay auth ...`.
pub async fn handle_auth(config: &RelayConfig, command: AuthCommands) -> CmdResult {
    let session = session_from_config(config)?;
    match command {
        AuthCommands::Url => {
            println!("{}", session.authorization_url()?);
        }
        AuthCommands::Complete(args) => {
            let token = session.complete_authorization(&args.code).await?;
            println!(
                "Connected to HubSpot (token expires {})",
                token.expires_at.format("%Y-%m-%d %H:%M")
            );
        }
        AuthCommands::Status => match session.stored_token() {
            Ok(Some(token)) if token.has_refresh_token() => {
                let state = if token.is_expired_at(chrono::Utc::now()) {
                    "access token expired, refreshed on next use".to_string()
                } else {
                    format!("expires {}", token.expires_at.format("%Y-%m-%d %H:%M"))
                };
                println!("HubSpot: connected ({state})");
            }
            Ok(_) => println!("HubSpot: not connected"),
            Err(e) => println!("HubSpot: token store error: {e}"),
        },
        AuthCommands::Logout => {
            session.disconnect()?;
            println!("HubSpot token removed");
        }
    }
    Ok(())
}

/// Handle `hubspot-relay forms list`.
pub async fn handle_forms(config: &RelayConfig, command: ListCommand) -> CmdResult {
    let ListCommand::List = command;
    let catalog = FormCatalog::new(session_from_config(config)?);
    for (guid, name) in catalog.form_options().await? {
        println!("{guid}\t{name}");
    }
    Ok(())
}

/// Handle `hubspot-relay subscriptions list`.
pub async fn handle_subscriptions(config: &RelayConfig, command: ListCommand) -> CmdResult {
    let ListCommand::List = command;
    let catalog = FormCatalog::new(session_from_config(config)?);
    for subscription in catalog.list_subscription_types().await? {
        println!("{}\t{}", subscription.id, subscription.name);
    }
    Ok(())
}

/// Handle `hubspot-relay contacts recent`.
pub async fn handle_contacts(config: &RelayConfig, command: ContactsCommands) -> CmdResult {
    let ContactsCommands::Recent { count } = command;
    let client = session_from_config(config)?.authorized_client().await?;
    let contacts = client.recent_contacts(count).await?;
    println!("{}", serde_json::to_string_pretty(&contacts)?);
    Ok(())
}

/// Handle `hubspot-relay mapping ...`.
pub fn handle_mapping(config: &RelayConfig, command: MappingCommands) -> CmdResult {
    match command {
        MappingCommands::Show { form_id } => {
            let store = FileMappingStore::new(config.data_dir());
            match store.load(&form_id)? {
                Some(mapping) => println!("{}", serde_json::to_string_pretty(&mapping)?),
                None => println!("No mapping stored for {form_id}"),
            }
        }
        MappingCommands::Legacy { key } => {
            let mapping = config.legacy_mapping()?;
            match key {
                Some(key) => {
                    if let Some(local) = mapping.local_for_remote(&key) {
                        println!("{key} -> {local}");
                    } else if let Some(remote) = mapping.remote_for_local(&key) {
                        println!("{remote} -> {key}");
                    } else {
                        println!("{key} is not in the forms mapping");
                    }
                }
                None => {
                    for (remote, local) in mapping.iter() {
                        println!("{remote}|{local}");
                    }
                }
            }
        }
    }
    Ok(())
}
