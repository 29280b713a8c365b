//! Push channel registration and renewal
use anyhow::Result;
use chrono::{Duration, Utc};
use tokio_rusqlite::Connection;
use uuid::Uuid;

use super::db::{find_enabled_sync_configs, update_sync_channel};
use super::models::{ChannelRegistration, SyncConfig};
use super::open_config_session;
use super::webhook::ChannelId;
use crate::core::AppConfig;
use crate::google::gcal::GoogleCalendar;
use crate::google::session::OAuthSession;

/// Channels expiring within this many hours get renewed
pub const RENEWAL_WINDOW_HOURS: i64 = 24;

/// Ask Google to push changes of the config's calendar to the webhook and
/// remember the channel on the config. Any previous channel is replaced.
pub async fn register_channel(
    config: &AppConfig,
    db: &Connection,
    calendar: &GoogleCalendar,
    session: &OAuthSession,
    sync_config: &SyncConfig,
) -> Result<ChannelRegistration> {
    let channel_id = ChannelId::new(sync_config.id).to_string();
    let channel_token = Uuid::new_v4().simple().to_string();
    let channel = calendar
        .watch(
            session.access_token(),
            &sync_config.calendar_id,
            &channel_id,
            &channel_token,
            &config.webhook_url,
        )
        .await?;

    let registration = ChannelRegistration {
        channel_id: channel.id.clone(),
        channel_token,
        resource_id: channel.resource_id.clone(),
        expiration: channel.expires_at(),
    };
    update_sync_channel(db, sync_config.id, &registration).await?;
    tracing::info!(
        "Registered channel {} for {} ({:?})",
        registration.channel_id,
        sync_config.email,
        registration.expiration
    );
    Ok(registration)
}

async fn renew_channel(
    config: &AppConfig,
    db: &Connection,
    calendar: &GoogleCalendar,
    sync_config: &SyncConfig,
    current: &ChannelRegistration,
) -> Result<ChannelRegistration> {
    let session = open_config_session(config, db, sync_config).await?;
    let renewed = register_channel(config, db, calendar, &session, sync_config).await?;

    // Best effort, the old channel also expires on its own
    if let Err(err) = calendar
        .stop_channel(session.access_token(), &current.channel_id, &current.resource_id)
        .await
    {
        tracing::warn!("Failed to stop channel {}: {}", current.channel_id, err);
    }
    Ok(renewed)
}

/// Re-register every enabled config's channel that expires within
/// [`RENEWAL_WINDOW_HOURS`]. Returns the number of renewed channels.
pub async fn renew_expiring_channels(
    config: &AppConfig,
    db: &Connection,
    calendar: &GoogleCalendar,
) -> Result<usize> {
    let now = Utc::now();
    let window = Duration::hours(RENEWAL_WINDOW_HOURS);
    let mut renewed = 0;

    for sync_config in find_enabled_sync_configs(db).await? {
        let Some(current) = sync_config.channel.as_ref() else {
            continue;
        };
        if !current.expires_within(now, window) {
            continue;
        }
        match renew_channel(config, db, calendar, &sync_config, current).await {
            Ok(_) => renewed += 1,
            Err(err) => tracing::error!(
                "Failed to renew channel {} for {}: {}",
                current.channel_id,
                sync_config.email,
                err
            ),
        }
    }
    Ok(renewed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::db::initialize_db;
    use crate::google::oauth::{OAuthClient, StoredToken};
    use crate::sync::db::{find_sync_config, upsert_sync_config};
    use crate::sync::models::{GOOGLE_PROVIDER, NewSyncConfig};
    use mockito::Matcher;
    use serde_json::json;

    fn test_config(url: &str) -> AppConfig {
        AppConfig {
            storage_path: String::from("/tmp"),
            db_path: String::from("/tmp/db"),
            token_path: String::from("/tmp/token.json"),
            email_path: String::from("/tmp/user_email.txt"),
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
            sync_page_delay_ms: 0,
        }
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

    fn valid_token() -> StoredToken {
        StoredToken {
            access_token: String::from("access"),
            refresh_token: Some(String::from("refresh")),
            expiry_date: Some((Utc::now() + Duration::hours(1)).timestamp_millis()),
            scope: None,
            token_type: None,
        }
    }

    async fn saved_config(db: &Connection) -> SyncConfig {
        upsert_sync_config(
            db,
            NewSyncConfig {
                calendar_id: String::from("primary"),
                email: String::from("someone@example.com"),
                provider: String::from(GOOGLE_PROVIDER),
                token: valid_token(),
                is_sync_enabled: true,
                last_sync_time: None,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn it_registers_channel_for_config() {
        let mut server = mockito::Server::new_async().await;
        let db = test_db().await;
        let sync_config = saved_config(&db).await;
        let expiration = (Utc::now() + Duration::days(7)).timestamp_millis();
        let mock = server
            .mock("POST", "/calendar/v3/calendars/primary/events/watch")
            .match_body(Matcher::PartialJson(json!({
                "type": "web_hook",
                "address": "https://calsync.example.com/api/webhook"
            })))
            .with_status(200)
            .with_body(
                json!({
                    "id": format!("{}_abc", sync_config.id),
                    "resourceId": "res-1",
                    "expiration": expiration.to_string()
                })
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;

        let config = test_config(&server.url());
        let calendar = GoogleCalendar::new(&server.url());
        let session = OAuthSession::new(OAuthClient::from_config(&config), valid_token());
        let registration = register_channel(&config, &db, &calendar, &session, &sync_config)
            .await
            .unwrap();

        assert_eq!(registration.resource_id, "res-1");
        assert_eq!(
            registration.expiration.map(|e| e.timestamp_millis()),
            Some(expiration)
        );
        let stored = find_sync_config(&db, sync_config.id).await.unwrap().unwrap();
        assert_eq!(stored.channel, Some(registration));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn it_renews_only_expiring_channels() {
        let mut server = mockito::Server::new_async().await;
        let db = test_db().await;
        let sync_config = saved_config(&db).await;
        let expiring = ChannelRegistration {
            channel_id: format!("{}_old", sync_config.id),
            channel_token: String::from("old-token"),
            resource_id: String::from("res-old"),
            expiration: Some(Utc::now() + Duration::hours(2)),
        };
        update_sync_channel(&db, sync_config.id, &expiring).await.unwrap();

        let watch = server
            .mock("POST", "/calendar/v3/calendars/primary/events/watch")
            .with_status(200)
            .with_body(
                json!({
                    "id": format!("{}_new", sync_config.id),
                    "resourceId": "res-new"
                })
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;
        let stop = server
            .mock("POST", "/calendar/v3/channels/stop")
            .match_body(Matcher::PartialJson(json!({
                "id": format!("{}_old", sync_config.id),
                "resourceId": "res-old"
            })))
            .with_status(204)
            .expect(1)
            .create_async()
            .await;

        let config = test_config(&server.url());
        let calendar = GoogleCalendar::new(&server.url());
        let renewed = renew_expiring_channels(&config, &db, &calendar).await.unwrap();
        assert_eq!(renewed, 1);

        let stored = find_sync_config(&db, sync_config.id).await.unwrap().unwrap();
        assert_eq!(stored.channel.unwrap().resource_id, "res-new");

        // Freshly registered channel has no expiration so nothing is due
        let renewed = renew_expiring_channels(&config, &db, &calendar).await.unwrap();
        assert_eq!(renewed, 0);
        watch.assert_async().await;
        stop.assert_async().await;
    }
}
