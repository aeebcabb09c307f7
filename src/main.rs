use anyhow::Context;
use clap::Parser;
use pd_shift::{
    cli::{run, Cli, CommandContext},
    config::{ConfigStore, Settings, YamlConfigStore},
    AppError,
};
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Failed to load settings: {}", e);
            eprintln!("Using default settings");
            Settings::default()
        }
    };

    init_tracing(&settings, cli.verbose, cli.log_json);

    match execute(cli, settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            let app_error = e.downcast_ref::<AppError>();
            tracing::error!(
                error_code = app_error.map(AppError::error_code).unwrap_or("UNKNOWN"),
                "Command failed"
            );
            let code = app_error.map(AppError::exit_code).unwrap_or(1);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

async fn execute(cli: Cli, settings: Settings) -> anyhow::Result<()> {
    let store = match cli.config {
        Some(path) => YamlConfigStore::new(path),
        None => YamlConfigStore::from_env()?,
    };
    tracing::debug!(config = %store.path().display(), "Using configuration file");
    let store: Arc<dyn ConfigStore> = Arc::new(store);

    let ctx = CommandContext::new(settings, store);

    // first Ctrl-C stops paging at the next page boundary, the second one exits
    let cancel = ctx.cancellation();
    tokio::spawn(async move {
        let mut interrupts = 0;
        while tokio::signal::ctrl_c().await.is_ok() {
            interrupts += 1;
            if interrupts > 1 {
                eprintln!("Interrupted again, exiting");
                std::process::exit(130);
            }
            tracing::warn!("Interrupt received, finishing the current page");
            cancel.store(true, Ordering::SeqCst);
        }
    });

    tracing::debug!(command = ?cli.command, "Running command");

    let mut stdout = std::io::stdout();
    run(cli.command, &ctx, &mut stdout)
        .await
        .context("command failed")?;
    Ok(())
}

fn init_tracing(settings: &Settings, verbose: u8, json: bool) {
    let default_filter = match verbose {
        0 => format!("pd_shift={}", settings.log_level),
        1 => "pd_shift=info".to_string(),
        _ => "pd_shift=debug".to_string(),
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
