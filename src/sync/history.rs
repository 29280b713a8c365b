//! One-shot copy of a calendar's past events into the backend
use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tokio_rusqlite::Connection;

use super::db::touch_last_sync_time;
use super::mapper::{SyncDefaults, to_backend_event};
use super::models::SyncConfig;
use crate::backend::SchedulerBackend;
use crate::core::AppConfig;
use crate::google::gcal::GoogleCalendar;
use crate::google::session::{OAuthSession, save_token};

pub const PAGE_SIZE: u32 = 10;

fn history_start() -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(2000, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc())
        .unwrap_or_default()
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncItem {
    pub event_id: Option<String>,
    pub title: String,
    /// Set when the backend rejected the event
    pub error: Option<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct SyncReport {
    pub synced: usize,
    pub failed: usize,
    pub items: Vec<SyncItem>,
}

impl SyncReport {
    fn record(&mut self, item: SyncItem) {
        if item.error.is_some() {
            self.failed += 1;
        } else {
            self.synced += 1;
        }
        self.items.push(item);
    }
}

/// Create every event from 2000-01-01 until now in the backend.
///
/// Pages are fetched one at a time with the configured delay in between.
/// A failed create is recorded in the report and the sync moves on, but a
/// failed page fetch aborts the whole run. The session is refreshed before
/// every page and written back to the token file when it changes.
pub async fn sync_history(
    config: &AppConfig,
    db: &Connection,
    calendar: &GoogleCalendar,
    backend: &dyn SchedulerBackend,
    session: &mut OAuthSession,
    sync_config: &SyncConfig,
) -> Result<SyncReport> {
    let defaults = SyncDefaults::new(&sync_config.email, config);
    let time_min = history_start();
    let time_max = Utc::now();
    let mut report = SyncReport::default();
    let mut page_token: Option<String> = None;

    loop {
        if session.ensure_fresh().await? {
            save_token(&config.token_path, session.token()).await?;
        }
        let page = calendar
            .list_page(
                session.access_token(),
                &sync_config.calendar_id,
                time_min,
                time_max,
                PAGE_SIZE,
                page_token.as_deref(),
            )
            .await?;

        for event in &page.items {
            let mapped = to_backend_event(event, &defaults, Utc::now());
            let error = match backend.create_event(&mapped).await {
                Ok(_) => {
                    tracing::info!("Event \"{}\" synced", mapped.title);
                    None
                }
                Err(err) => {
                    tracing::error!("Failed to sync event \"{}\": {}", mapped.title, err);
                    Some(err.to_string())
                }
            };
            report.record(SyncItem {
                event_id: event.id.clone(),
                title: mapped.title,
                error,
            });
        }

        match page.next_page_token {
            Some(token) => {
                page_token = Some(token);
                tokio::time::sleep(config.sync_page_delay()).await;
            }
            None => break,
        }
    }

    touch_last_sync_time(db, sync_config.id, time_max).await?;
    tracing::info!(
        "Historical sync finished for {}: {} synced, {} failed",
        sync_config.email,
        report.synced,
        report.failed
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendClient;
    use crate::core::db::initialize_db;
    use crate::google::oauth::{OAuthClient, StoredToken};
    use crate::google::session::load_token;
    use crate::sync::db::{find_sync_config, upsert_sync_config};
    use crate::sync::models::{GOOGLE_PROVIDER, NewSyncConfig};
    use chrono::Duration;
    use mockito::Matcher;
    use serde_json::json;

    fn test_config(url: &str, storage_path: &str, sync_page_delay_ms: u64) -> AppConfig {
        AppConfig::with_storage(
            storage_path,
            AppConfig {
                storage_path: String::new(),
                db_path: String::new(),
                token_path: String::new(),
                email_path: String::new(),
                google_client_id: String::from("client-id"),
                google_client_secret: String::from("client-secret"),
                google_redirect_uri: String::from("http://localhost/api/auth/callback"),
                google_api_url: url.to_string(),
                google_oauth_url: url.to_string(),
                backend_api_url: url.to_string(),
                backend_api_token: String::from("backend-token"),
                webhook_url: String::from("https://calsync.example.com/api/webhook"),
                tenant_id: String::from("amura"),
                tenant_name: String::from("amura"),
                sync_page_delay_ms,
            },
        )
    }

    async fn test_db() -> Connection {
        let db = Connection::open_in_memory().await.unwrap();
        db.call(|conn| {
            initialize_db(conn).expect("Failed to initialize db");
            Ok(())
        })
        .await
        .unwrap();
        db
    }

    fn token_expiring_in(millis: i64) -> StoredToken {
        StoredToken {
            access_token: String::from("first_access_token"),
            refresh_token: Some(String::from("refresh")),
            expiry_date: Some((Utc::now() + Duration::milliseconds(millis)).timestamp_millis()),
            scope: None,
            token_type: None,
        }
    }

    /// The token is outside the refresh margin for the first page and
    /// inside it once the page delay has passed
    #[tokio::test]
    async fn it_refreshes_token_between_pages() {
        let mut server = mockito::Server::new_async().await;
        let first_page = server
            .mock("GET", "/calendar/v3/calendars/primary/events")
            .match_query(Matcher::Regex(String::from("orderBy=startTime$")))
            .match_header("authorization", "Bearer first_access_token")
            .with_status(200)
            .with_body(json!({"items": [], "nextPageToken": "page-2"}).to_string())
            .expect(1)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", "/token")
            .match_body(Matcher::UrlEncoded(
                String::from("refresh_token"),
                String::from("refresh"),
            ))
            .with_status(200)
            .with_body(r#"{"access_token": "fresh_access_token", "expires_in": 3600}"#)
            .expect(1)
            .create_async()
            .await;
        let second_page = server
            .mock("GET", "/calendar/v3/calendars/primary/events")
            .match_query(Matcher::UrlEncoded(
                String::from("pageToken"),
                String::from("page-2"),
            ))
            .match_header("authorization", "Bearer fresh_access_token")
            .with_status(200)
            .with_body(json!({"items": []}).to_string())
            .expect(1)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&server.url(), dir.path().to_str().unwrap(), 2_000);
        let db = test_db().await;
        let sync_config = upsert_sync_config(
            &db,
            NewSyncConfig {
                calendar_id: String::from("primary"),
                email: String::from("someone@example.com"),
                provider: String::from(GOOGLE_PROVIDER),
                token: token_expiring_in(61_500),
                is_sync_enabled: true,
                last_sync_time: None,
            },
        )
        .await
        .unwrap();
        let calendar = GoogleCalendar::new(&server.url());
        let backend = BackendClient::from_config(&config);
        let mut session =
            OAuthSession::new(OAuthClient::from_config(&config), token_expiring_in(61_500));

        let report = sync_history(&config, &db, &calendar, &backend, &mut session, &sync_config)
            .await
            .unwrap();

        assert_eq!(report.synced, 0);
        assert_eq!(session.access_token(), "fresh_access_token");
        let saved = load_token(&config.token_path).await.unwrap();
        assert_eq!(saved.access_token, "fresh_access_token");
        let stored = find_sync_config(&db, sync_config.id).await.unwrap().unwrap();
        assert!(stored.last_sync_time.is_some());

        first_page.assert_async().await;
        refresh.assert_async().await;
        second_page.assert_async().await;
    }

    #[test]
    fn it_starts_history_in_2000() {
        assert_eq!(history_start().to_rfc3339(), "2000-01-01T00:00:00+00:00");
    }

    #[test]
    fn it_counts_failures_separately() {
        let mut report = SyncReport::default();
        report.record(SyncItem {
            event_id: Some(String::from("a")),
            title: String::from("A"),
            error: None,
        });
        report.record(SyncItem {
            event_id: Some(String::from("b")),
            title: String::from("B"),
            error: Some(String::from("Backend request failed")),
        });
        assert_eq!(report.synced, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.items.len(), 2);
    }
}
