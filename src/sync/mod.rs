pub mod orchestrator;
pub mod scheduler;

pub use orchestrator::SyncOrchestrator;
pub use scheduler::{Scheduler, TickReport};
