use tokio_rusqlite::Connection;

use crate::backend::BackendClient;
use crate::core::AppConfig;
use crate::google::gcal::GoogleCalendar;

pub struct AppState {
    pub db: Connection,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(db: Connection, config: AppConfig) -> Self {
        Self { db, config }
    }

    pub fn calendar(&self) -> GoogleCalendar {
        GoogleCalendar::new(&self.config.google_api_url)
    }

    pub fn backend(&self) -> BackendClient {
        BackendClient::from_config(&self.config)
    }
}
