use clap::Parser;
use handoff_cli::commands::{self, cli};
use handoff_cli::error::CliError;
use handoff_core::api::{self as core_api, LogRotation};
use std::path::PathBuf;
use tracing_appender::rolling;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

static LOG_GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
    std::sync::OnceLock::new();

#[tokio::main]
async fn main() {
    let exit = match real_main().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{e}");
            e.exit_code()
        }
    };

    std::process::exit(exit);
}

async fn real_main() -> Result<i32, CliError> {
    let args = cli::Args::parse();
    let mut cfg =
        core_api::load(args.config.as_deref()).map_err(|e| CliError::Config(format!("{e:#}")))?;
    if let Some(dir) = args.data_dir.as_ref() {
        cfg.data_dir = std::env::current_dir()?
            .join(dir)
            .to_string_lossy()
            .into_owned();
    }
    init_tracing(&cfg.logging, cfg.log_dir_path()).map_err(CliError::Config)?;
    tracing::debug!(
        project_root = %cfg.project_root.display(),
        data_dir = %cfg.data_dir_path().display(),
        "config loaded"
    );

    let shutdown = core_api::Shutdown::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, stopping");
            signal.trigger();
        }
    });

    commands::dispatch(args.command, &cfg, shutdown).await
}

fn init_tracing(logging: &core_api::LoggingConfig, dir: PathBuf) -> Result<(), String> {
    if !logging.enabled {
        return Ok(());
    }

    let filter = match std::env::var("RUST_LOG") {
        Ok(v) if !v.trim().is_empty() => EnvFilter::from_default_env(),
        _ => EnvFilter::try_new(logging.level.clone()).map_err(|e| e.to_string())?,
    };

    let mut maybe_writer = None;

    if logging.file {
        std::fs::create_dir_all(&dir)
            .map_err(|e| format!("create log dir {} failed: {e}", dir.display()))?;
        let file_name = logging.file_name(std::process::id());
        let appender = match logging.rotation {
            LogRotation::Never => rolling::never(dir, file_name),
            LogRotation::Hourly => rolling::hourly(dir, file_name),
            LogRotation::Daily => rolling::daily(dir, file_name),
        };
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        let _ = LOG_GUARD.set(guard);
        maybe_writer = Some(non_blocking);
    }

    if !logging.console && maybe_writer.is_none() {
        return Err("logging disabled for both console and file".to_string());
    }

    let console_layer = logging.console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(atty::is(atty::Stream::Stderr))
    });

    let file_layer = maybe_writer.map(|w| {
        tracing_subscriber::fmt::layer()
            .with_writer(w)
            .with_ansi(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(())
}
