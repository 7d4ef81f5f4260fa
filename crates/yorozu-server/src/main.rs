//! Yorozu server binary
//!
//! Mounts every persisted storage and holds the namespace until interrupted.
//!
//! ## Usage
//!
//! ```bash
//! # Run with the default config
//! yorozu-server
//!
//! # Run with an explicit config file
//! yorozu-server --config ./yorozu.toml
//!
//! # Print persisted storages and exit
//! yorozu-server list
//! ```

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use yorozu_kernel::{
    DriverContext, DriverRegistry, SqliteStorageRepository, StorageManager, YorozuConfig,
};

fn print_usage() {
    eprintln!(
        r#"yorozu-server - storage mount daemon

USAGE:
    yorozu-server [OPTIONS] [COMMAND]

COMMANDS:
    (default)                     Mount all storages and wait for Ctrl-C
    list                          List persisted storages

OPTIONS:
    --config <PATH>               Config file (default: {config})
    --help, -h                    Show this help

LOGGING:
    RUST_LOG overrides the [log] filter from the config file.
"#,
        config = YorozuConfig::default_path().display()
    );
}

struct Args {
    config: PathBuf,
    command: Option<String>,
}

fn parse_args() -> Result<Option<Args>, String> {
    let args: Vec<String> = env::args().skip(1).collect();
    let mut config = YorozuConfig::default_path();
    let mut command = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => return Ok(None),
            "--config" => {
                let Some(path) = args.get(i + 1) else {
                    return Err("--config requires a value".into());
                };
                config = PathBuf::from(path);
                i += 2;
            }
            other if command.is_none() && !other.starts_with('-') => {
                command = Some(other.to_string());
                i += 1;
            }
            other => return Err(format!("Unknown option: {}", other)),
        }
    }

    Ok(Some(Args { config, command }))
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = match parse_args() {
        Ok(Some(args)) => args,
        Ok(None) => {
            print_usage();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprintln!("{}", e);
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    let config = match YorozuConfig::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config {}: {}", args.config.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.filter));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let result = match args.command.as_deref() {
        None => run_server(&config).await,
        Some("list") => cmd_list(&config),
        Some(other) => {
            eprintln!("Unknown command: {}", other);
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn open_repository(config: &YorozuConfig) -> anyhow::Result<SqliteStorageRepository> {
    let path = config.database.resolved_path();
    SqliteStorageRepository::open(&path, &config.database.table_prefix)
        .with_context(|| format!("failed to open storage database {}", path.display()))
}

async fn run_server(config: &YorozuConfig) -> anyhow::Result<()> {
    let repo = Arc::new(open_repository(config)?);
    let drivers = DriverRegistry::with_builtin();
    tracing::info!(drivers = ?drivers.names(), "starting yorozu");

    let manager = StorageManager::new(repo, drivers);
    let ctx = DriverContext::new();

    let mounted = manager
        .load_storages(&ctx, config.bootstrap.page_size)
        .await
        .context("failed to load storages")?;
    for mount in manager.mounts() {
        tracing::info!(
            storage.id = %mount.id,
            mount_path = %mount.mount_path,
            driver = %mount.driver,
            "mounted"
        );
    }
    tracing::info!("{} storages mounted, waiting for Ctrl-C", mounted);

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;

    tracing::info!("shutting down");
    let released = manager.shutdown_all(&ctx).await;
    tracing::info!("released {} storages", released);
    Ok(())
}

fn cmd_list(config: &YorozuConfig) -> anyhow::Result<()> {
    let repo = open_repository(config)?;
    let manager = StorageManager::new(Arc::new(repo), DriverRegistry::with_builtin());
    let page_size = config.bootstrap.page_size.max(1);

    let mut page_index = 1;
    let mut printed = 0u64;
    loop {
        let (page, total) = manager.list_storages(page_index, page_size)?;
        if page.is_empty() {
            break;
        }
        for storage in &page {
            println!(
                "{:>6}  {:<8}  {:>4}  {}",
                storage.id.get(),
                storage.driver,
                storage.index,
                storage.mount_path
            );
        }
        printed += page.len() as u64;
        if printed >= total {
            break;
        }
        page_index += 1;
    }

    if printed == 0 {
        println!("No storages configured.");
    }
    Ok(())
}
