use anyhow::{Error, Result};
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, types::Type};
use tokio_rusqlite::{Connection, params};

use super::models::{ChannelRegistration, NewSyncConfig, SyncConfig};
use crate::google::oauth::StoredToken;

const SELECT_SYNC_CONFIG: &str = "SELECT id, calendar_id, email, provider, token, is_sync_enabled, last_sync_time, channel_id, channel_token, resource_id, channel_expiration FROM sync_config";

fn parse_time(value: Option<String>) -> Option<DateTime<Utc>> {
    value
        .and_then(|v| DateTime::parse_from_rfc3339(&v).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn row_to_sync_config(row: &Row<'_>) -> rusqlite::Result<SyncConfig> {
    let token_json: String = row.get(4)?;
    let token: StoredToken = serde_json::from_str(&token_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;

    let channel_id: Option<String> = row.get(7)?;
    let channel_token: Option<String> = row.get(8)?;
    let resource_id: Option<String> = row.get(9)?;
    let channel = match (channel_id, channel_token, resource_id) {
        (Some(channel_id), Some(channel_token), Some(resource_id)) => Some(ChannelRegistration {
            channel_id,
            channel_token,
            resource_id,
            expiration: parse_time(row.get(10)?),
        }),
        _ => None,
    };

    Ok(SyncConfig {
        id: row.get(0)?,
        calendar_id: row.get(1)?,
        email: row.get(2)?,
        provider: row.get(3)?,
        token,
        is_sync_enabled: row.get(5)?,
        last_sync_time: parse_time(row.get(6)?),
        channel,
    })
}

/// Insert a sync config or replace the token, enabled flag and last sync
/// time of the existing one for the same email, calendar and provider.
pub async fn upsert_sync_config(
    db: &Connection,
    config: NewSyncConfig,
) -> Result<SyncConfig, Error> {
    let token = serde_json::to_string(&config.token)?;
    let last_sync_time = config.last_sync_time.map(|t| t.to_rfc3339());
    let saved = db
        .call(move |conn| {
            conn.execute(
                "INSERT INTO sync_config (calendar_id, email, provider, token, is_sync_enabled, last_sync_time)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(email, calendar_id, provider) DO UPDATE SET
                   token = excluded.token,
                   is_sync_enabled = excluded.is_sync_enabled,
                   last_sync_time = excluded.last_sync_time",
                params![
                    config.calendar_id,
                    config.email,
                    config.provider,
                    token,
                    config.is_sync_enabled,
                    last_sync_time
                ],
            )?;
            let saved = conn.query_row(
                &format!(
                    "{} WHERE email = ?1 AND calendar_id = ?2 AND provider = ?3",
                    SELECT_SYNC_CONFIG
                ),
                params![config.email, config.calendar_id, config.provider],
                row_to_sync_config,
            )?;
            Ok(saved)
        })
        .await?;
    Ok(saved)
}

pub async fn find_sync_config(db: &Connection, id: i64) -> Result<Option<SyncConfig>, Error> {
    let found = db
        .call(move |conn| {
            let found = conn
                .query_row(
                    &format!("{} WHERE id = ?1", SELECT_SYNC_CONFIG),
                    [id],
                    row_to_sync_config,
                )
                .optional()?;
            Ok(found)
        })
        .await?;
    Ok(found)
}

pub async fn find_sync_config_by_email(
    db: &Connection,
    email: &str,
    calendar_id: &str,
) -> Result<Option<SyncConfig>, Error> {
    let email = email.to_string();
    let calendar_id = calendar_id.to_string();
    let found = db
        .call(move |conn| {
            let found = conn
                .query_row(
                    &format!(
                        "{} WHERE email = ?1 AND calendar_id = ?2",
                        SELECT_SYNC_CONFIG
                    ),
                    [email, calendar_id],
                    row_to_sync_config,
                )
                .optional()?;
            Ok(found)
        })
        .await?;
    Ok(found)
}

pub async fn find_enabled_sync_configs(db: &Connection) -> Result<Vec<SyncConfig>, Error> {
    let configs = db
        .call(|conn| {
            let mut stmt =
                conn.prepare(&format!("{} WHERE is_sync_enabled = 1", SELECT_SYNC_CONFIG))?;
            let rows = stmt
                .query_map([], row_to_sync_config)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
        .await?;
    Ok(configs)
}

pub async fn update_sync_config_token(
    db: &Connection,
    id: i64,
    token: &StoredToken,
) -> Result<(), Error> {
    let token = serde_json::to_string(token)?;
    db.call(move |conn| {
        conn.execute(
            "UPDATE sync_config SET token = ?1 WHERE id = ?2",
            params![token, id],
        )?;
        Ok(())
    })
    .await?;
    Ok(())
}

pub async fn update_sync_channel(
    db: &Connection,
    id: i64,
    channel: &ChannelRegistration,
) -> Result<(), Error> {
    let channel = channel.clone();
    db.call(move |conn| {
        conn.execute(
            "UPDATE sync_config SET channel_id = ?1, channel_token = ?2, resource_id = ?3, channel_expiration = ?4 WHERE id = ?5",
            params![
                channel.channel_id,
                channel.channel_token,
                channel.resource_id,
                channel.expiration.map(|t| t.to_rfc3339()),
                id
            ],
        )?;
        Ok(())
    })
    .await?;
    Ok(())
}

pub async fn touch_last_sync_time(
    db: &Connection,
    id: i64,
    at: DateTime<Utc>,
) -> Result<(), Error> {
    db.call(move |conn| {
        conn.execute(
            "UPDATE sync_config SET last_sync_time = ?1 WHERE id = ?2",
            params![at.to_rfc3339(), id],
        )?;
        Ok(())
    })
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::db::initialize_db;
    use crate::sync::models::GOOGLE_PROVIDER;

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

    fn new_config(access_token: &str) -> NewSyncConfig {
        NewSyncConfig {
            calendar_id: String::from("primary"),
            email: String::from("someone@example.com"),
            provider: String::from(GOOGLE_PROVIDER),
            token: StoredToken {
                access_token: access_token.to_string(),
                refresh_token: Some(String::from("refresh")),
                expiry_date: Some(1),
                scope: None,
                token_type: None,
            },
            is_sync_enabled: true,
            last_sync_time: Some(Utc::now()),
        }
    }

    #[tokio::test]
    async fn it_upserts_by_email_and_calendar() {
        let db = test_db().await;
        let first = upsert_sync_config(&db, new_config("one")).await.unwrap();
        let second = upsert_sync_config(&db, new_config("two")).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.token.access_token, "two");
        assert!(second.is_sync_enabled);
        assert!(second.channel.is_none());

        let found = find_sync_config_by_email(&db, "someone@example.com", "primary")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found, second);
    }

    #[tokio::test]
    async fn it_returns_none_for_unknown_id() {
        let db = test_db().await;
        assert!(find_sync_config(&db, 42).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn it_updates_channel_and_token() {
        let db = test_db().await;
        let saved = upsert_sync_config(&db, new_config("one")).await.unwrap();
        let channel = ChannelRegistration {
            channel_id: format!("{}_abc", saved.id),
            channel_token: String::from("secret"),
            resource_id: String::from("res-1"),
            expiration: DateTime::from_timestamp(1_704_067_200, 0),
        };
        update_sync_channel(&db, saved.id, &channel).await.unwrap();
        update_sync_config_token(&db, saved.id, &new_config("fresh").token)
            .await
            .unwrap();

        let found = find_sync_config(&db, saved.id).await.unwrap().unwrap();
        assert_eq!(found.channel, Some(channel));
        assert_eq!(found.token.access_token, "fresh");
    }

    #[tokio::test]
    async fn it_filters_disabled_configs() {
        let db = test_db().await;
        upsert_sync_config(&db, new_config("one")).await.unwrap();
        let mut disabled = new_config("two");
        disabled.email = String::from("other@example.com");
        disabled.is_sync_enabled = false;
        upsert_sync_config(&db, disabled).await.unwrap();

        let enabled = find_enabled_sync_configs(&db).await.unwrap();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].email, "someone@example.com");
    }
}
