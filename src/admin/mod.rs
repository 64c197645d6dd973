pub mod commands;
pub mod service;

pub use commands::{run, ExitStatus};
pub use service::{GuardStats, ImportReport, IpGuard};
