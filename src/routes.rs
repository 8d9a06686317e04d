use axum::{Router, middleware, routing::get};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::{
    AppState,
    handler::{
        auth::auth_handler, chapter::chapter_handler, discussion::discussion_handler,
        health::health, resource::resource_handler, users::users_handler,
    },
    middleware::auth,
};

/// Builds the whole application: the API under `/api/v1` and static files
/// under `/files`. CORS is layered on by the caller.
pub fn create_router(app_state: AppState) -> Router {
    let api_route = Router::new()
        .route("/health", get(health))
        .nest("/auth", auth_handler())
        .nest(
            "/me",
            users_handler().layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .nest("/chapters", chapter_handler())
        .nest("/resources", resource_handler())
        .nest("/discussions", discussion_handler(app_state.clone()));

    Router::new()
        .nest("/api/v1", api_route)
        .nest_service("/files", ServeDir::new(&app_state.env.files_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{DBClient, fixtures::seed_catalog, test_client};
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode, header},
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn latest_code(db: &DBClient, email: &str) -> String {
        sqlx::query_scalar(
            "SELECT code FROM email_verification_codes WHERE email = ? ORDER BY id DESC LIMIT 1",
        )
        .bind(email)
        .fetch_one(db.pool())
        .await
        .unwrap()
    }

    async fn app_with_db() -> (Router, DBClient) {
        let db = test_client().await;
        let app = create_router(AppState::for_tests(Some(db.clone())));
        (app, db)
    }

    /// Registers and verifies `email`, returning its token and user id.
    async fn signed_up(app: &Router, db: &DBClient, email: &str) -> (String, i64) {
        let (status, body) = send(
            app,
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({ "email": email, "password": "secret1", "name": "Someone" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");

        let code = latest_code(db, email).await;
        let (status, body) = send(
            app,
            Method::POST,
            "/api/v1/auth/verify-email",
            None,
            Some(json!({ "email": email, "code": code })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");

        (
            body["token"].as_str().unwrap().to_string(),
            body["user"]["id"].as_i64().unwrap(),
        )
    }

    async fn new_thread(app: &Router, token: &str) -> i64 {
        let (status, body) = send(
            app,
            Method::POST,
            "/api/v1/discussions",
            Some(token),
            Some(json!({ "title": "Hello", "content": "A first thread body" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn register_verify_vote_walkthrough() {
        let (app, db) = app_with_db().await;
        let alice = json!({ "email": "alice@example.com", "password": "secret1" });

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(alice.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["status"], "success");
        assert!(body["user_id"].as_i64().is_some());

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(alice.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let code = latest_code(&db, "alice@example.com").await;
        let wrong = if code == "10000" { "10001" } else { "10000" };
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/auth/verify-email",
            None,
            Some(json!({ "email": "alice@example.com", "code": wrong })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid or expired verification code");

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(alice.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/auth/verify-email",
            None,
            Some(json!({ "email": "alice@example.com", "code": code })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let alice_token = body["token"].as_str().unwrap().to_string();
        assert_eq!(body["user"]["is_active"], true);
        assert_eq!(body["user"]["email_verified"], true);

        // Codes are single-use.
        let (status, _) = send(
            &app,
            Method::POST,
            "/api/v1/auth/verify-email",
            None,
            Some(json!({ "email": "alice@example.com", "code": code })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/discussions",
            Some(&alice_token),
            Some(json!({ "title": "Hello", "content": "A first thread body" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["score"], 0);
        assert_eq!(body["data"]["comment_count"], 0);
        let thread_id = body["data"]["id"].as_i64().unwrap();

        let (bob_token, _) = signed_up(&app, &db, "bob@example.com").await;
        let vote_uri = format!("/api/v1/discussions/{thread_id}/vote");

        let (status, body) = send(
            &app,
            Method::POST,
            &vote_uri,
            Some(&bob_token),
            Some(json!({ "vote_type": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Vote recorded");
        assert_eq!(body["action"], "recorded");
        assert_eq!(body["score"], 1);

        let (status, body) = send(
            &app,
            Method::POST,
            &vote_uri,
            Some(&bob_token),
            Some(json!({ "vote_type": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Vote removed");
        assert_eq!(body["score"], 0);

        let (status, body) = send(
            &app,
            Method::POST,
            &vote_uri,
            Some(&alice_token),
            Some(json!({ "vote_type": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["status"], "fail");
    }

    #[tokio::test]
    async fn login_checks_credentials_then_verification() {
        let (app, db) = app_with_db().await;
        signed_up(&app, &db, "alice@example.com").await;

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "alice@example.com", "password": "wrong-password" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "nobody@example.com", "password": "secret1" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "Alice@Example.com", "password": "secret1" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["token"].as_str().is_some());
        assert!(body["user"].get("password").is_none());
    }

    #[tokio::test]
    async fn register_rejects_bad_input() {
        let (app, _db) = app_with_db().await;

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({ "email": "not-an-email", "password": "secret1" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({ "email": "alice@example.com", "password": "12345" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn verify_rejects_malformed_and_expired_codes() {
        let (app, db) = app_with_db().await;
        send(
            &app,
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({ "email": "alice@example.com", "password": "secret1" })),
        )
        .await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/auth/verify-email",
            None,
            Some(json!({ "email": "alice@example.com", "code": "12-34" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Verification code must be exactly 5 digits");

        sqlx::query("UPDATE email_verification_codes SET expires_at = ?")
            .bind(chrono::Utc::now() - chrono::Duration::minutes(1))
            .execute(db.pool())
            .await
            .unwrap();
        let code = latest_code(&db, "alice@example.com").await;
        let spaced = format!("{} {}", &code[..2], &code[2..]);
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/auth/verify-email",
            None,
            Some(json!({ "email": "alice@example.com", "code": spaced })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid or expired verification code");
    }

    #[tokio::test]
    async fn concurrent_verifications_consume_the_code_once() {
        let (app, db) = app_with_db().await;
        let (status, _) = send(
            &app,
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({ "email": "alice@example.com", "password": "secret1" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let code = latest_code(&db, "alice@example.com").await;
        let body = json!({ "email": "alice@example.com", "code": code });
        let (first, second) = tokio::join!(
            send(
                &app,
                Method::POST,
                "/api/v1/auth/verify-email",
                None,
                Some(body.clone()),
            ),
            send(
                &app,
                Method::POST,
                "/api/v1/auth/verify-email",
                None,
                Some(body.clone()),
            ),
        );

        let mut statuses = [first.0, second.0];
        statuses.sort();
        assert_eq!(statuses, [StatusCode::OK, StatusCode::BAD_REQUEST]);
        let rejected = if first.0 == StatusCode::OK { second.1 } else { first.1 };
        assert_eq!(rejected["message"], "Invalid or expired verification code");
    }

    #[tokio::test]
    async fn resend_code_rules() {
        let (app, db) = app_with_db().await;

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/v1/auth/resend-code",
            None,
            Some(json!({ "email": "ghost@example.com" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        send(
            &app,
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({ "email": "carol@example.com", "password": "secret1" })),
        )
        .await;
        let (status, _) = send(
            &app,
            Method::POST,
            "/api/v1/auth/resend-code",
            None,
            Some(json!({ "email": "carol@example.com" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let codes: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM email_verification_codes WHERE email = 'carol@example.com'",
        )
        .fetch_one(db.pool())
        .await
        .unwrap();
        assert_eq!(codes, 2);

        signed_up(&app, &db, "alice@example.com").await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/auth/resend-code",
            None,
            Some(json!({ "email": "alice@example.com" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Email is already verified");
    }

    #[tokio::test]
    async fn me_requires_a_valid_token() {
        let (app, db) = app_with_db().await;
        let (token, user_id) = signed_up(&app, &db, "alice@example.com").await;

        let (status, body) = send(&app, Method::GET, "/api/v1/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["id"], user_id);
        assert_eq!(body["data"]["email"], "alice@example.com");
        assert!(body["data"].get("password").is_none());

        let (status, _) = send(&app, Method::GET, "/api/v1/me", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(&app, Method::GET, "/api/v1/me", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn comments_nest_and_respect_locks() {
        let (app, db) = app_with_db().await;
        let (alice, _) = signed_up(&app, &db, "alice@example.com").await;
        let (bob, _) = signed_up(&app, &db, "bob@example.com").await;
        let thread_id = new_thread(&app, &alice).await;
        let other_thread_id = new_thread(&app, &alice).await;
        let comments_uri = format!("/api/v1/discussions/{thread_id}/comments");

        let (status, body) = send(
            &app,
            Method::POST,
            &comments_uri,
            Some(&bob),
            Some(json!({ "content": "Root comment" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["depth"], 0);
        let root_id = body["data"]["id"].as_i64().unwrap();

        let (status, body) = send(
            &app,
            Method::POST,
            &comments_uri,
            Some(&alice),
            Some(json!({ "content": "A reply", "parent_id": root_id })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["depth"], 1);
        assert_eq!(body["data"]["parent_id"], root_id);

        let (status, _) = send(
            &app,
            Method::POST,
            &format!("/api/v1/discussions/{other_thread_id}/comments"),
            Some(&alice),
            Some(json!({ "content": "Wrong thread", "parent_id": root_id })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/v1/discussions/9999/comments",
            Some(&alice),
            Some(json!({ "content": "Nowhere" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        sqlx::query("UPDATE threads SET is_locked = 1 WHERE id = ?")
            .bind(thread_id)
            .execute(db.pool())
            .await
            .unwrap();
        let (status, _) = send(
            &app,
            Method::POST,
            &comments_uri,
            Some(&bob),
            Some(json!({ "content": "Too late" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(
            &app,
            Method::GET,
            &format!("/api/v1/discussions/{thread_id}"),
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["thread"]["comment_count"], 2);
        assert_eq!(body["comments"].as_array().unwrap().len(), 2);

        let (status, body) = send(&app, Method::GET, &comments_uri, None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 2);
        assert_eq!(body["data"][1]["parent_id"], root_id);
    }

    #[tokio::test]
    async fn only_owners_edit_and_delete() {
        let (app, db) = app_with_db().await;
        let (alice, _) = signed_up(&app, &db, "alice@example.com").await;
        let (bob, _) = signed_up(&app, &db, "bob@example.com").await;
        let thread_id = new_thread(&app, &alice).await;
        let edit = json!({ "title": "Edited", "content": "Edited thread content" });

        let (status, _) = send(
            &app,
            Method::PUT,
            &format!("/api/v1/discussions/{thread_id}"),
            Some(&bob),
            Some(edit.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(
            &app,
            Method::PUT,
            "/api/v1/discussions/9999",
            Some(&alice),
            Some(edit.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(
            &app,
            Method::PUT,
            &format!("/api/v1/discussions/{thread_id}"),
            Some(&alice),
            Some(edit),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["title"], "Edited");
        assert!(body["data"]["edited_at"].is_string());

        let (_, body) = send(
            &app,
            Method::POST,
            &format!("/api/v1/discussions/{thread_id}/comments"),
            Some(&bob),
            Some(json!({ "content": "Bob was here" })),
        )
        .await;
        let comment_uri = format!("/api/v1/discussions/comments/{}", body["data"]["id"]);

        let (status, _) = send(&app, Method::DELETE, &comment_uri, Some(&alice), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(
            &app,
            Method::PUT,
            &comment_uri,
            Some(&bob),
            Some(json!({ "content": "Bob edited this" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["content"], "Bob edited this");

        let (status, _) = send(&app, Method::DELETE, &comment_uri, Some(&bob), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(&app, Method::DELETE, &comment_uri, Some(&bob), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn thread_content_is_sanitized() {
        let (app, db) = app_with_db().await;
        let (alice, _) = signed_up(&app, &db, "alice@example.com").await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/discussions",
            Some(&alice),
            Some(json!({
                "title": "Scripted",
                "content": "<p>Hello there</p><script>alert(1)</script>"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["content"], "<p>Hello there</p>");

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/v1/discussions",
            Some(&alice),
            Some(json!({ "title": "Hi", "content": "A first thread body" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/v1/discussions",
            None,
            Some(json!({ "title": "Hello", "content": "A first thread body" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn listing_clamps_pagination_and_reports_total() {
        let (app, db) = app_with_db().await;
        let (alice, _) = signed_up(&app, &db, "alice@example.com").await;
        for _ in 0..3 {
            new_thread(&app, &alice).await;
        }

        let (status, body) = send(
            &app,
            Method::GET,
            "/api/v1/discussions?page=0&per_page=500",
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["page"], 1);
        assert_eq!(body["per_page"], 20);
        assert_eq!(body["total"], 3);
        assert_eq!(body["threads"].as_array().unwrap().len(), 3);

        let (_, body) = send(
            &app,
            Method::GET,
            "/api/v1/discussions?sort=oldest&page=2&per_page=2",
            None,
            None,
        )
        .await;
        assert_eq!(body["total"], 3);
        assert_eq!(body["threads"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn viewer_annotations_follow_the_token() {
        let (app, db) = app_with_db().await;
        let (alice, _) = signed_up(&app, &db, "alice@example.com").await;
        let (bob, _) = signed_up(&app, &db, "bob@example.com").await;
        let thread_id = new_thread(&app, &alice).await;
        let react_uri = format!("/api/v1/discussions/{thread_id}/react");

        send(
            &app,
            Method::POST,
            &format!("/api/v1/discussions/{thread_id}/vote"),
            Some(&bob),
            Some(json!({ "vote_type": -1 })),
        )
        .await;
        let (status, body) = send(
            &app,
            Method::POST,
            &react_uri,
            Some(&bob),
            Some(json!({ "reaction_type": "clap" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Reaction toggled");
        assert_eq!(body["action"], "added");

        let (_, as_bob) = send(&app, Method::GET, "/api/v1/discussions", Some(&bob), None).await;
        let listed = &as_bob["threads"][0];
        assert_eq!(listed["user_vote"], -1);
        assert_eq!(listed["user_reactions"], json!(["clap"]));
        assert_eq!(listed["reaction_counts"]["clap"], 1);
        assert_eq!(listed["score"], -1);

        let (_, anonymous) = send(&app, Method::GET, "/api/v1/discussions", None, None).await;
        assert!(anonymous["threads"][0]["user_vote"].is_null());
        assert_eq!(anonymous["threads"][0]["user_reactions"], json!([]));

        // A bad token on an optional route is treated as anonymous.
        let (status, _) = send(&app, Method::GET, "/api/v1/discussions", Some("nope"), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn reaction_rules() {
        let (app, db) = app_with_db().await;
        let (alice, _) = signed_up(&app, &db, "alice@example.com").await;
        let (bob, _) = signed_up(&app, &db, "bob@example.com").await;
        let thread_id = new_thread(&app, &alice).await;
        let react_uri = format!("/api/v1/discussions/{thread_id}/react");

        let (status, _) = send(
            &app,
            Method::POST,
            &react_uri,
            Some(&alice),
            Some(json!({ "reaction_type": "heart" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(
            &app,
            Method::POST,
            &react_uri,
            Some(&bob),
            Some(json!({ "reaction_type": "smile" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/v1/discussions/comments/9999/react",
            Some(&bob),
            Some(json!({ "reaction_type": "heart" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        for expected in ["added", "removed"] {
            let (status, body) = send(
                &app,
                Method::POST,
                &react_uri,
                Some(&bob),
                Some(json!({ "reaction_type": "heart" })),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["action"], expected);
        }
    }

    #[tokio::test]
    async fn invalid_vote_value_is_rejected() {
        let (app, db) = app_with_db().await;
        let (alice, _) = signed_up(&app, &db, "alice@example.com").await;
        let (bob, _) = signed_up(&app, &db, "bob@example.com").await;
        let thread_id = new_thread(&app, &alice).await;

        let (status, _) = send(
            &app,
            Method::POST,
            &format!("/api/v1/discussions/{thread_id}/vote"),
            Some(&bob),
            Some(json!({ "vote_type": 2 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/v1/discussions/9999/vote",
            Some(&bob),
            Some(json!({ "vote_type": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn mistyped_bodies_are_bad_requests() {
        let (app, db) = app_with_db().await;
        let (alice, _) = signed_up(&app, &db, "alice@example.com").await;
        let (bob, _) = signed_up(&app, &db, "bob@example.com").await;
        let thread_id = new_thread(&app, &alice).await;

        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/api/v1/discussions/{thread_id}/vote"),
            Some(&bob),
            Some(json!({ "vote_type": "up" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "fail");

        let (status, _) = send(
            &app,
            Method::POST,
            &format!("/api/v1/discussions/{thread_id}/react"),
            Some(&bob),
            Some(json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "alice@example.com" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "fail");
    }

    #[tokio::test]
    async fn catalog_routes() {
        let (app, db) = app_with_db().await;
        seed_catalog(&db).await;

        let (status, body) = send(&app, Method::GET, "/api/v1/chapters", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 2);
        assert_eq!(body["data"][0]["slug"], "first");
        assert!(body["data"][0].get("content").is_none());

        let (status, body) =
            send(&app, Method::GET, "/api/v1/chapters/second?locale=fr", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["content"], "<p>two</p>");

        let id = body["data"]["id"].as_i64().unwrap();
        let (status, body) =
            send(&app, Method::GET, &format!("/api/v1/chapters/{id}"), None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["slug"], "second");

        let (status, _) = send(&app, Method::GET, "/api/v1/chapters/missing", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(&app, Method::GET, "/api/v1/resources", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 3);
        assert_eq!(body["data"][0]["type"], "audio");

        let (status, body) = send(&app, Method::GET, "/api/v1/resources/pdfs", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 2);
        assert_eq!(body["data"][0]["title"], "Guide");
        assert!(body["data"][0].get("duration").is_none());
    }

    #[tokio::test]
    async fn health_reports_store_state() {
        let (app, _db) = app_with_db().await;
        let (status, body) = send(&app, Method::GET, "/api/v1/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["database"], "connected");

        let degraded = create_router(AppState::for_tests(None));
        let (status, body) = send(&degraded, Method::GET, "/api/v1/health", None, None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "degraded");
    }

    #[tokio::test]
    async fn missing_store_answers_503() {
        let app = create_router(AppState::for_tests(None));

        let (status, body) = send(&app, Method::GET, "/api/v1/chapters", None, None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["message"], "Database service unavailable");

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "alice@example.com", "password": "secret1" })),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
