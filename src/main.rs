//! hubspot-relay binary entry point.

use hubspot_relay::cli::{commands, Cli, Commands, LogFormat};
use hubspot_relay::config::RelayConfig;
use tracing_subscriber::EnvFilter;

fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();
    init_logging(cli.log_format);

    let config = match RelayConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Serve(args) => commands::handle_serve(&config, args.addr).await,
        Commands::Auth(args) => commands::handle_auth(&config, args.command).await,
        Commands::Forms(args) => commands::handle_forms(&config, args.command).await,
        Commands::Subscriptions(args) => {
            commands::handle_subscriptions(&config, args.command).await
        }
        Commands::Contacts(args) => commands::handle_contacts(&config, args.command).await,
        Commands::Mapping(args) => commands::handle_mapping(&config, args.command),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
