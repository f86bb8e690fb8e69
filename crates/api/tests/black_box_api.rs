use std::sync::Arc;

use chrono::Duration;
use reqwest::StatusCode;
use serde_json::{json, Value};

use vitrine_api::app::services::AppServices;
use vitrine_auth::{PermissionGrid, Role, TokenCodec};
use vitrine_infra::{AdminProfileRepo, ContactRepo, SubscriptionRepo, UserRepo};

struct TestServer {
    base_url: String,
    services: Arc<AppServices>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Build the production router against an in-memory database and bind it
    /// to an ephemeral port.
    async fn spawn() -> Self {
        let pool = vitrine_infra::connect_memory().await.expect("in-memory db");
        let services = Arc::new(AppServices {
            users: UserRepo::new(pool.clone()),
            subscriptions: SubscriptionRepo::new(pool.clone()),
            contacts: ContactRepo::new(pool.clone()),
            admin_profiles: AdminProfileRepo::new(pool),
            tokens: TokenCodec::new(
                b"test-secret",
                b"test-refresh-secret",
                Duration::minutes(10),
                Duration::days(30),
            ),
        });

        let app = vitrine_api::app::build_app(services.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            services,
            handle,
        }
    }

    fn api(&self, path: &str) -> String {
        format!("{}/api/v1{path}", self.base_url)
    }

    /// Register an account through the API; returns (user id, access token).
    async fn register(&self, client: &reqwest::Client, username: &str, email: &str) -> (String, String) {
        let res = client
            .post(self.api("/auth/register"))
            .json(&json!({
                "username": username,
                "email": email,
                "password": "hunter2-but-longer",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);

        let body: Value = res.json().await.unwrap();
        let user_id = body["data"]["user"]["id"].as_str().unwrap().to_string();
        let token = body["data"]["token"].as_str().unwrap().to_string();
        (user_id, token)
    }

    /// Flip an account's role to admin directly in storage (the promotion
    /// endpoint itself needs an admin, so tests bootstrap one this way).
    async fn promote(&self, email: &str) {
        let mut user = self
            .services
            .users
            .find_by_email(email)
            .await
            .unwrap()
            .unwrap();
        user.role = Role::Admin;
        self.services.users.save(&user).await.unwrap();
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[tokio::test]
async fn health_and_api_info_are_public() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/health", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "healthy");

    let res = client.get(server.api("")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn register_login_profile_flow() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let (_, token) = server.register(&client, "alice", "alice@example.com").await;

    // The registration token works immediately.
    let res = client
        .get(server.api("/auth/profile"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["user"]["username"], "alice");
    // Credentials never leak into responses.
    assert!(body["data"]["user"].get("password_hash").is_none());

    // Logging in again works and stamps last_login_at.
    let res = client
        .post(server.api("/auth/login"))
        .json(&json!({ "email": "alice@example.com", "password": "hunter2-but-longer" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert!(body["data"]["user"]["last_login_at"].is_string());

    // Wrong password and missing token are both rejected.
    let res = client
        .post(server.api("/auth/login"))
        .json(&json!({ "email": "alice@example.com", "password": "wrong-password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client.get(server.api("/auth/profile")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn non_admin_is_rejected_at_the_role_stage() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let (_, token) = server.register(&client, "bob", "bob@example.com").await;

    let res = client
        .get(server.api("/admin/dashboard/stats"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Admin access required");

    // No profile was provisioned for the rejected caller.
    let user = server
        .services
        .users
        .find_by_email("bob@example.com")
        .await
        .unwrap()
        .unwrap();
    assert!(server
        .services
        .admin_profiles
        .find_by_user_id(user.id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn first_admin_access_provisions_a_default_profile_once() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let (user_id, token) = server.register(&client, "carol", "carol@example.com").await;
    server.promote("carol@example.com").await;

    // First gated request auto-provisions the profile.
    let res = client
        .get(server.api("/admin/dashboard/stats"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // Second request reuses it; exactly one row exists.
    let res = client
        .get(server.api("/admin/dashboard/stats"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(server.services.admin_profiles.count().await.unwrap(), 1);

    // The profile is visible through the admin API and carries the default
    // grid with access_level=admin.
    let res = client
        .get(server.api(&format!("/admin/user/{user_id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    let admin = &body["data"]["admin"];
    assert_eq!(admin["access_level"], "admin");
    assert_eq!(admin["department"], "IT");

    let grid: PermissionGrid = serde_json::from_value(admin["permissions"].clone()).unwrap();
    assert_eq!(grid, PermissionGrid::default_grid());
}

#[tokio::test]
async fn role_floor_lets_admins_pass_despite_denied_grid_entries() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let (_, token) = server.register(&client, "dave", "dave@example.com").await;
    server.promote("dave@example.com").await;

    // The default grid denies admin.read, but role=admin supplies the floor,
    // so the admin listing still answers.
    let res = client
        .get(server.api("/admin"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn demotion_reverts_role_and_closes_the_gate() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let (user_id, token) = server.register(&client, "erin", "erin@example.com").await;
    server.promote("erin@example.com").await;

    // Provision via first access, then look up the profile id.
    let res = client
        .get(server.api(&format!("/admin/user/{user_id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    let profile_id = body["data"]["admin"]["id"].as_str().unwrap().to_string();

    // Demote (the grid denies admin.delete, the role floor allows it).
    let res = client
        .delete(server.api(&format!("/admin/{profile_id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // Role reverted to user, so the next gate check fails at the role stage.
    let res = client
        .get(server.api("/admin/dashboard/stats"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn newsletter_signup_is_idempotent_per_address() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(server.api("/subscriptions/newsletter"))
        .json(&json!({ "email": "reader@example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = client
        .post(server.api("/subscriptions/newsletter"))
        .json(&json!({ "email": "reader@example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Already subscribed to newsletter");

    assert_eq!(server.services.subscriptions.count().await.unwrap(), 1);
}

#[tokio::test]
async fn public_contact_intake_feeds_admin_triage() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    // Anonymous submission.
    let res = client
        .post(server.api("/contacts"))
        .json(&json!({
            "name": "Jane Doe",
            "email": "jane@example.com",
            "subject": "Broken checkout",
            "message": "The checkout button does nothing on mobile.",
            "category": "technical",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    let contact_id = body["data"]["contact"]["id"].as_str().unwrap().to_string();

    // An admin picks it up: the default grid grants contacts read+write.
    let (_, token) = server.register(&client, "frank", "frank@example.com").await;
    server.promote("frank@example.com").await;

    let res = client
        .get(server.api("/contacts"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["pagination"]["total"], 1);

    let res = client
        .post(server.api(&format!("/contacts/{contact_id}/respond")))
        .bearer_auth(&token)
        .json(&json!({ "response_message": "Fixed in tonight's deploy.", "status": "resolved" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["contact"]["status"], "resolved");
    assert!(body["data"]["contact"]["resolved_at"].is_string());
}
