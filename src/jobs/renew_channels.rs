use async_trait::async_trait;
use std::time::Duration;
use tokio_rusqlite::Connection;

use super::PeriodicJob;
use crate::core::AppConfig;
use crate::google::gcal::GoogleCalendar;
use crate::sync::channel::renew_expiring_channels;

/// Re-registers push channels before Google expires them
#[derive(Debug)]
pub struct RenewChannels;

#[async_trait]
impl PeriodicJob for RenewChannels {
    fn interval(&self) -> Duration {
        // Run hourly
        Duration::from_secs(60 * 60)
    }

    async fn run_job(&self, config: &AppConfig, db: &Connection) {
        let calendar = GoogleCalendar::new(&config.google_api_url);
        match renew_expiring_channels(config, db, &calendar).await {
            Ok(0) => tracing::debug!("No channels due for renewal"),
            Ok(renewed) => tracing::info!("Renewed {} channels", renewed),
            Err(e) => tracing::error!("Channel renewal failed: {}", e),
        }
    }
}
