//! Watches a rental-listings site and reports listings that appeared since
//! the previous sync cycle.

pub mod api;
pub mod core;
pub mod notify;
pub mod scanner;
pub mod session;
pub mod storage;
pub mod sync;

pub use crate::core::{Config, Result, SyncError};
pub use crate::scanner::ListingSummary;
pub use crate::sync::{Scheduler, SyncOrchestrator};
