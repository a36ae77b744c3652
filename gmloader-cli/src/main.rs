mod cli;
mod config;
mod error;
mod passthrough;
mod server;

use std::process;
use std::sync::Arc;

use clap::Parser;
use gmloader_engine::{ManifestCache, RequestRouter, SqliteManifestStore};
use tracing::{Level, debug, error, info};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use crate::cli::{Args, Commands};
use crate::config::AppConfig;
use crate::error::{AppError, Result};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Application error: {}", e);
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet)?;

    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(store_dir) = args.store_dir {
        config.store_dir = Some(store_dir);
    }
    debug!(?config, "Configuration loaded");

    match args.command {
        Commands::Serve {
            listen,
            upstream,
            wait_for_takeover,
        } => {
            if let Some(listen) = listen {
                config.listen = listen;
            }
            if upstream.is_some() {
                config.upstream = upstream;
            }
            if wait_for_takeover {
                config.take_over_on_install = false;
            }

            info!("gmloader {} starting", env!("CARGO_PKG_VERSION"));
            server::serve(config).await?;
        }

        Commands::Resolve { path } => resolve_once(&config, &path).await?,

        Commands::Config { show, reset } => {
            if reset {
                AppConfig::reset(args.config.as_deref())?;
                println!("✓ Configuration reset to defaults");
            } else if show {
                println!("{}", config.show()?);
            } else {
                println!(
                    "Use --show to display current configuration or --reset to reset to defaults"
                );
            }
        }
    }

    Ok(())
}

/// Run one GET through the router against the configured store.
async fn resolve_once(config: &AppConfig, path: &str) -> Result<()> {
    let loader_config = config.loader_config();
    let store = Arc::new(SqliteManifestStore::new(&loader_config));
    let router = RequestRouter::new(ManifestCache::new(store), &loader_config);

    let request = http::Request::get(path)
        .body(())
        .map_err(|e| AppError::InvalidInput(format!("'{path}': {e}")))?;

    let Some(response) = router.handle(&request).await else {
        println!("not claimed: {path} is outside /game/<bundle>/<file>");
        return Ok(());
    };

    let status = response.status();
    println!(
        "{} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or_default()
    );
    for (name, value) in response.headers() {
        println!("{name}: {}", value.to_str().unwrap_or("<binary>"));
    }
    println!();

    let body = response.body();
    let is_text = response
        .headers()
        .get(http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("charset=") || v.starts_with("text/"));
    match std::str::from_utf8(body) {
        Ok(text) if is_text => println!("{text}"),
        _ => println!("<{} bytes>", body.len()),
    }

    Ok(())
}

fn init_logging(verbose: bool, quiet: bool) -> Result<()> {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_level(verbose))
        .with(filter)
        .try_init()
        .map_err(|e| AppError::Initialization(e.to_string()))?;

    Ok(())
}
