mod capture;
mod handle;
mod process;
mod traits;
pub mod types;

pub use handle::ProcessHandle;
pub use process::{ProcessRunner, STORE_DIR_ENV};
pub use traits::ProcessLauncher;
pub use types::{ExitReport, RunOutcome};
