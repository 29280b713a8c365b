//! Background jobs run by the server on a fixed interval
use std::time::Duration;

use async_trait::async_trait;
use tokio_rusqlite::Connection;

use crate::core::AppConfig;

mod refresh_token;
mod renew_channels;

pub use refresh_token::RefreshToken;
pub use renew_channels::RenewChannels;

#[async_trait]
pub trait PeriodicJob: Send + Sync + 'static {
    fn interval(&self) -> Duration;

    /// Failures are logged by the job, a failed run never stops the loop.
    async fn run_job(&self, config: &AppConfig, db: &Connection);
}

/// Run `job` in its own tokio task, once immediately and then on every
/// tick of its interval.
pub fn spawn_periodic_job<J: PeriodicJob>(config: AppConfig, db: Connection, job: J) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(job.interval());
        loop {
            interval.tick().await;
            job.run_job(&config, &db).await;
        }
    });
}
