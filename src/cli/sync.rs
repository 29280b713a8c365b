use anyhow::{Result, anyhow};

use crate::backend::BackendClient;
use crate::core::AppConfig;
use crate::core::db::open_initialized_db;
use crate::google::gcal::GoogleCalendar;
use crate::google::session::open_file_session;
use crate::sync::db::find_sync_config_by_email;
use crate::sync::history::sync_history;
use crate::sync::onboarding::PRIMARY_CALENDAR;

pub async fn run(config: &AppConfig) -> Result<()> {
    let db = open_initialized_db(&config.db_path).await?;
    let (mut session, email) = open_file_session(config).await?;
    let sync_config = find_sync_config_by_email(&db, &email, PRIMARY_CALENDAR)
        .await?
        .ok_or(anyhow!("No sync config for {}, run `auth` first", email))?;

    let calendar = GoogleCalendar::new(&config.google_api_url);
    let backend = BackendClient::from_config(config);
    let report = sync_history(config, &db, &calendar, &backend, &mut session, &sync_config).await?;

    println!("Synced {} events, {} failed", report.synced, report.failed);
    for item in report.items.iter().filter(|i| i.error.is_some()) {
        println!(
            "  {} ({}): {}",
            item.title,
            item.event_id.as_deref().unwrap_or("no id"),
            item.error.as_deref().unwrap_or_default()
        );
    }
    Ok(())
}
