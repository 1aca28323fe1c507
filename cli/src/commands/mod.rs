pub mod cli;
pub mod pipeline;
pub mod store;

use handoff_core::api::{AppConfig, Coordinator, Shutdown, Store};

use crate::error::CliError;
use cli::Commands;

pub async fn dispatch(
    cmd: Commands,
    cfg: &AppConfig,
    shutdown: Shutdown,
) -> Result<i32, CliError> {
    let mut out = std::io::stdout();
    match cmd {
        Commands::Pipeline => {
            let mut coordinator = open_coordinator(cfg, shutdown)?;
            pipeline::handle_pipeline(&mut coordinator, &mut out).await
        }
        Commands::Clear => {
            let mut coordinator = open_coordinator(cfg, shutdown)?;
            pipeline::handle_clear(&mut coordinator, &mut out)
        }
        Commands::Run(args) => {
            let mut coordinator = open_coordinator(cfg, shutdown)?;
            pipeline::handle_run(&mut coordinator, args, &mut out).await
        }
        Commands::Wait(args) => {
            let mut coordinator = open_coordinator(cfg, shutdown)?;
            pipeline::handle_wait(&mut coordinator, args, &mut out).await
        }
        Commands::Check(args) => {
            let mut coordinator = open_coordinator(cfg, shutdown)?;
            let keys = if args.keys.is_empty() {
                cfg.pipeline.required_keys.clone()
            } else {
                args.keys
            };
            pipeline::handle_check(&mut coordinator, &keys, &mut out)
        }
        Commands::Report => {
            let mut coordinator = open_coordinator(cfg, shutdown)?;
            pipeline::handle_report(&mut coordinator, &mut out)
        }
        Commands::Monitor(args) => {
            let mut coordinator = open_coordinator(cfg, shutdown)?;
            pipeline::handle_monitor(&mut coordinator, args, &mut out).await
        }
        Commands::List(args) => store::handle_list(&open_store(cfg)?, args, &mut out),
        Commands::Get(args) => store::handle_get(&open_store(cfg)?, args, &mut out),
        Commands::Put(args) => store::handle_put(&open_store(cfg)?, args, &mut out),
        Commands::Update(args) => store::handle_update(&open_store(cfg)?, args, &mut out),
        Commands::Delete(args) => store::handle_delete(&open_store(cfg)?, args, &mut out),
        Commands::Info(args) => store::handle_info(&open_store(cfg)?, args, &mut out),
    }
}

fn open_store(cfg: &AppConfig) -> Result<Store, CliError> {
    Ok(Store::open(cfg.data_dir_path())?)
}

fn open_coordinator(cfg: &AppConfig, shutdown: Shutdown) -> Result<Coordinator, CliError> {
    Ok(Coordinator::from_config(cfg)?.with_shutdown(shutdown))
}
