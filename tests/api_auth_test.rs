//! Integration tests for the auth API endpoints

mod test_utils;

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use chrono::Utc;
    use mockito::Matcher;
    use serde_json::json;
    use serial_test::serial;
    use tower::util::ServiceExt;

    use calsync::google::session::{load_token, load_user_email};
    use calsync::sync::db::find_sync_config_by_email;

    use crate::test_utils::{TEST_EMAIL, body_to_string, test_app};

    /// Tests the consent redirect asks for offline calendar access
    #[tokio::test]
    #[serial]
    async fn it_redirects_to_consent_screen() {
        let server = mockito::Server::new_async().await;
        let test = test_app(&server.url()).await;

        let response = test
            .app
            .oneshot(
                Request::builder()
                    .uri("/api/auth")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(response.status().is_redirection());
        let location = response.headers()[header::LOCATION].to_str().unwrap();
        assert!(location.starts_with("https://accounts.google.com/o/oauth2/v2/auth"));
        assert!(location.contains("access_type=offline"));
        assert!(location.contains("client_id=test_client_id"));
    }

    /// Tests the callback returns 400 without an authorization code
    #[tokio::test]
    #[serial]
    async fn it_returns_400_for_missing_code() {
        let mut server = mockito::Server::new_async().await;
        let token = server
            .mock("POST", "/token")
            .expect(0)
            .create_async()
            .await;
        let test = test_app(&server.url()).await;

        let response = test
            .app
            .oneshot(
                Request::builder()
                    .uri("/api/auth/callback")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        token.assert_async().await;
    }

    /// Tests the callback stores the token, creates an enabled sync config
    /// and relays the settings to the backend
    #[tokio::test]
    #[serial]
    async fn it_completes_authorization() {
        let mut server = mockito::Server::new_async().await;
        let token = server
            .mock("POST", "/token")
            .match_body(Matcher::UrlEncoded(
                String::from("code"),
                String::from("auth-code"),
            ))
            .with_status(200)
            .with_body(
                json!({
                    "access_token": "new_access_token",
                    "refresh_token": "new_refresh_token",
                    "expires_in": 3599,
                    "token_type": "Bearer"
                })
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;
        let userinfo = server
            .mock("GET", "/oauth2/v2/userinfo")
            .match_header("authorization", "Bearer new_access_token")
            .with_status(200)
            .with_body(json!({"email": TEST_EMAIL}).to_string())
            .expect(1)
            .create_async()
            .await;
        let settings = server
            .mock("POST", "/scheduler/event/syncSettings")
            .match_header("authorization", "Bearer test_backend_token")
            .match_body(Matcher::PartialJson(json!({
                "calendar_id": "primary",
                "email": TEST_EMAIL,
                "provider": "google",
                "is_sync_enabled": true
            })))
            .with_status(200)
            .with_body(r#"{"status": "ok"}"#)
            .expect(1)
            .create_async()
            .await;
        let test = test_app(&server.url()).await;
        let before = Utc::now();

        let response = test
            .app
            .oneshot(
                Request::builder()
                    .uri("/api/auth/callback?code=auth-code")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let after = Utc::now();
        let body = body_to_string(response.into_body()).await;
        assert!(body.contains("Authentication successful"));

        let stored = load_token(&test.config.token_path).await.unwrap();
        assert_eq!(stored.access_token, "new_access_token");
        assert_eq!(stored.refresh_token.as_deref(), Some("new_refresh_token"));
        assert_eq!(
            load_user_email(&test.config.email_path).await.unwrap(),
            TEST_EMAIL
        );

        let sync_config = find_sync_config_by_email(&test.db, TEST_EMAIL, "primary")
            .await
            .unwrap()
            .unwrap();
        assert!(sync_config.is_sync_enabled);
        let last_sync_time = sync_config.last_sync_time.unwrap();
        assert!(last_sync_time >= before && last_sync_time <= after);

        token.assert_async().await;
        userinfo.assert_async().await;
        settings.assert_async().await;
    }

    /// Tests a rejected code surfaces as a server error without touching
    /// the backend
    #[tokio::test]
    #[serial]
    async fn it_returns_500_for_rejected_code() {
        let mut server = mockito::Server::new_async().await;
        let _token = server
            .mock("POST", "/token")
            .with_status(400)
            .with_body(r#"{"error": "invalid_grant"}"#)
            .create_async()
            .await;
        let settings = server
            .mock("POST", "/scheduler/event/syncSettings")
            .expect(0)
            .create_async()
            .await;
        let test = test_app(&server.url()).await;

        let response = test
            .app
            .oneshot(
                Request::builder()
                    .uri("/api/auth/callback?code=bad-code")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_to_string(response.into_body()).await;
        assert!(body.contains("invalid_grant"));
        settings.assert_async().await;
    }
}
