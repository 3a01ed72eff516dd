use crate::address_book::{
    address_book_action_definition, address_book_definition, AddressBook, AddressBookAction,
    BookStore,
};
use crate::config::AppConfig;
use crate::definition::ServiceDefinition;
use crate::generator::{generator_for, Host, InstallStyle};
use crate::logging::init_logging_with_config;
use crate::middleware::{MetricsMiddleware, Middleware, TracingMiddleware};
use crate::runtime_config::RuntimeConfig;
use crate::server::{serve, AppService};
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Command-line interface for restdef
#[derive(Parser, Debug)]
#[command(name = "restdef")]
#[command(about = "Serve REST service definitions", long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Bind the address-book definitions and serve them
    Serve {
        /// YAML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Listen address, overrides `server.addr`
        #[arg(long)]
        addr: Option<String>,

        /// Installer style (resource|page), overrides `server.style`
        #[arg(long)]
        style: Option<InstallStyle>,
    },
    /// Print the routes the configuration installs
    Routes {
        /// YAML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Installer style (resource|page), overrides `server.style`
        #[arg(long)]
        style: Option<InstallStyle>,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<AppConfig> {
    match path {
        Some(path) => AppConfig::load(path),
        None => AppConfig::from_env(),
    }
}

/// Bind the entity-style address book, and the action-style one when
/// configured, onto `host`. Both share one store.
///
/// The returned definitions stay bound; keep them to unbind later.
pub fn bind_address_books(config: &AppConfig, host: &Host) -> Result<Vec<ServiceDefinition>> {
    let store = BookStore::default();
    let generator = generator_for(config.server.style, host);
    let form_params: Vec<&str> = config.service.form_params.iter().map(String::as_str).collect();

    let mut definitions = vec![address_book_definition(
        Arc::clone(&generator),
        &config.service.base_path,
        AddressBook::with_store(Arc::clone(&store)),
        &form_params,
    )?];
    if let Some(action_path) = &config.service.action_base_path {
        definitions.push(address_book_action_definition(
            Arc::clone(&generator),
            action_path,
            AddressBookAction::with_store(Arc::clone(&store)),
            &form_params,
        )?);
    }

    for definition in &mut definitions {
        definition
            .bind()
            .with_context(|| format!("Failed to bind {:?}", definition.base_path()))?;
    }
    Ok(definitions)
}

/// Parse the command line and run the selected command.
///
/// # Errors
///
/// Returns an error if:
/// - The configuration cannot be loaded or parsed
/// - A definition fails to bind
/// - The server fails to start
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve {
            config,
            addr,
            style,
        } => {
            let mut config = load_config(config.as_ref())?;
            if let Some(addr) = addr {
                config.server.addr = addr;
            }
            if let Some(style) = style {
                config.server.style = style;
            }
            init_logging_with_config(&config.log)?;
            RuntimeConfig::from_env().apply();

            let host = Host::new();
            let metrics = Arc::new(MetricsMiddleware::new());
            host.add_middleware(Arc::new(TracingMiddleware))?;
            host.add_middleware(Arc::clone(&metrics) as Arc<dyn Middleware>)?;

            let definitions = bind_address_books(&config, &host)?;
            info!(
                addr = %config.server.addr,
                style = %config.server.style,
                definitions = definitions.len(),
                routes = host.route_count(),
                "Starting restdef server"
            );

            let mut service = AppService::from_host(&host);
            service.set_metrics_middleware(metrics);
            let handle = serve(service, config.server.addr.as_str())?;
            handle
                .join()
                .map_err(|e| anyhow!("server terminated abnormally: {e:?}"))?;
            Ok(())
        }
        Commands::Routes { config, style } => {
            let mut config = load_config(config.as_ref())?;
            if let Some(style) = style {
                config.server.style = style;
            }
            let host = Host::new();
            let _definitions = bind_address_books(&config, &host)?;
            for route in host.routes() {
                println!(
                    "{:<7} {:<40} -> {}",
                    route.method, route.path_pattern, route.handler_name
                );
            }
            Ok(())
        }
    }
}
