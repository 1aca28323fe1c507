mod pipeline;
mod runner;
mod store;

pub use pipeline::PipelineError;
pub use runner::RunnerError;
pub use store::StoreError;
