use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "handoff",
    version,
    about = "Shared JSON store and producer/consumer pipeline coordinator"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file; defaults to the nearest handoff.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the shared data directory
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct KeyArgs {
    pub key: String,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ListArgs {
    /// Show size and modification time per record
    #[arg(long, short)]
    pub long: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct PutArgs {
    pub key: String,

    /// JSON text, or `-` to read it from stdin
    pub value: String,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct UpdateArgs {
    pub key: String,

    /// JSON text, or `-` to read it from stdin
    pub value: String,

    /// Overwrite the record instead of merging top-level fields
    #[arg(long)]
    pub replace: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RunArgs {
    pub path: PathBuf,

    /// Start in the background and print the pid
    #[arg(long)]
    pub detach: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct WaitArgs {
    pub key: String,

    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct CheckArgs {
    /// Keys to check; defaults to the configured required keys
    pub keys: Vec<String>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct MonitorArgs {
    #[arg(long, default_value_t = 60)]
    pub duration_secs: u64,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Clear, run producer, wait for data, run consumer, write report
    Pipeline,
    /// Delete every shared record except the execution log
    Clear,
    List(ListArgs),
    Get(KeyArgs),
    Put(PutArgs),
    Update(UpdateArgs),
    Delete(KeyArgs),
    Info(KeyArgs),
    /// Run a script or executable outside the pipeline
    Run(RunArgs),
    /// Block until a key appears
    Wait(WaitArgs),
    Check(CheckArgs),
    /// Build and save the final report from the current store
    Report,
    /// Report keys that appear while watching
    Monitor(MonitorArgs),
}
