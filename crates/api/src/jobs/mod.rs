//! Background job scheduler and job implementations.

mod auto_revoke;
mod pool_metrics;
mod scheduler;

pub use auto_revoke::AutoRevokeJob;
pub use pool_metrics::PoolMetricsJob;
pub use scheduler::JobScheduler;
