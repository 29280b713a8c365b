use anyhow::{Result, anyhow};

use crate::core::AppConfig;
use crate::core::db::open_initialized_db;
use crate::google::gcal::GoogleCalendar;
use crate::google::session::open_file_session;
use crate::sync::channel::register_channel;
use crate::sync::db::find_sync_config_by_email;
use crate::sync::onboarding::PRIMARY_CALENDAR;

pub async fn run(config: &AppConfig) -> Result<()> {
    let db = open_initialized_db(&config.db_path).await?;
    let (session, email) = open_file_session(config).await?;
    let sync_config = find_sync_config_by_email(&db, &email, PRIMARY_CALENDAR)
        .await?
        .ok_or(anyhow!("No sync config for {}, run `auth` first", email))?;

    let calendar = GoogleCalendar::new(&config.google_api_url);
    let registration = register_channel(config, &db, &calendar, &session, &sync_config).await?;
    println!(
        "Registered channel {} delivering to {} (expires {:?})",
        registration.channel_id, config.webhook_url, registration.expiration
    );
    Ok(())
}
