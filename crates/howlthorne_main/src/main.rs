//! Howlthorne - point-ledger Discord bot

use clap::Parser;
use howlthorne_core::{BotConfig, config::load_dotenv};
use howlthorne_discord::HowlthorneBot;
use miette::Result;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (defaults to $HOWLTHORNE_CONFIG or howlthorne.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn init_logging(directory: &Path, debug: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    // Create logs directory if it doesn't exist
    std::fs::create_dir_all(directory).ok();

    let file_appender = tracing_appender::rolling::daily(directory, "howlthorne.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Leak the guard to keep it alive for the entire program
    Box::leak(Box::new(_guard));

    let default_filter = if debug {
        "howlthorne=debug,serenity=info"
    } else {
        "howlthorne=info,serenity=warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(
            // Console output
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_line_number(true),
        )
        .with(
            // File output
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true)
                .with_ansi(false),
        )
        .init();
}

fn install_panic_hook() {
    std::panic::set_hook(Box::new(|panic| {
        let location = panic
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_default();
        error!(%location, %panic, "panic");
    }));
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable, waiting for Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    load_dotenv();
    let config = BotConfig::load(args.config.as_deref())?;
    config.validate()?;

    init_logging(&config.logging.directory, args.debug);
    install_panic_hook();

    info!("Starting Howlthorne...");
    info!(
        prefix = %config.discord.prefix,
        quiet_period_secs = config.leaderboard.quiet_period_secs,
        "configuration loaded"
    );

    let bot = HowlthorneBot::build(config).await?;
    let shutdown = bot.shutdown_handle();

    let mut gateway = tokio::spawn(bot.run());
    tokio::select! {
        finished = &mut gateway => {
            return match finished {
                Ok(result) => result.map_err(Into::into),
                Err(join) => Err(miette::miette!("gateway task ended abnormally: {join}")),
            };
        }
        _ = shutdown_signal() => {
            info!("Shutting down Howlthorne...");
        }
    }

    shutdown.shutdown().await;
    match gateway.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "gateway stopped with an error during shutdown"),
        Err(e) => warn!(error = %e, "gateway task ended abnormally during shutdown"),
    }
    info!("Goodbye");
    Ok(())
}
