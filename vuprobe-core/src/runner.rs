mod gate;
mod progress;
mod run;
mod stats;

pub use gate::IterationGate;
pub use progress::{ProgressFn, ProgressUpdate};
pub use run::{RunOptions, RunOutcome, run_scenario};
pub use stats::{ActiveVu, RequestSample, RunStats};
