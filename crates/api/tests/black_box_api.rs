use chrono::{Duration as ChronoDuration, Utc};
use gabinete_api::config::AppConfig;
use gabinete_auth::JwtClaims;
use gabinete_core::UserId;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{Value, json};

const JWT_SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(super_admins: Vec<UserId>) -> Self {
        // Same application as prod, bound to an ephemeral port.
        let config = AppConfig {
            site_url: Some("https://gabinete.example.org".to_string()),
            super_admins,
            ..AppConfig::for_secret(JWT_SECRET)
        };
        let app = gabinete_api::app::build_app(&config)
            .await
            .expect("failed to build app");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app.router).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            handle,
        }
    }

    async fn get(&self, path: &str, token: &str) -> (StatusCode, Value) {
        let res = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn post(&self, path: &str, token: &str, body: Value) -> (StatusCode, Value) {
        let res = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn patch(&self, path: &str, token: &str, body: Value) -> (StatusCode, Value) {
        let res = self
            .client
            .patch(format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn login(&self, email: &str, password: &str) -> (StatusCode, Value) {
        let res = self
            .client
            .post(format!("{}/auth/login", self.base_url))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn delete(&self, path: &str, token: &str) -> (StatusCode, Value) {
        let res = self
            .client
            .delete(format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

struct User {
    id: UserId,
    token: String,
}

fn user(email: &str) -> User {
    let id = UserId::new();
    User {
        id,
        token: mint_jwt(id, Some(email), ChronoDuration::minutes(10)),
    }
}

fn mint_jwt(sub: UserId, email: Option<&str>, ttl: ChronoDuration) -> String {
    let now = Utc::now();
    let claims = JwtClaims {
        sub,
        email: email.map(str::to_string),
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

async fn create_org(srv: &TestServer, admin: &User) -> Value {
    let (status, body) = srv
        .post(
            "/orgs",
            &admin.token,
            json!({ "name": "Gabinete X", "office": "vereador", "state": "rs", "city": "Pelotas" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "create org failed: {body}");
    body["org"].clone()
}

async fn invite_and_accept(srv: &TestServer, org_id: &str, admin: &User, member: &User, email: &str, role: &str) {
    let (status, body) = srv
        .post(
            &format!("/orgs/{org_id}/invitations"),
            &admin.token,
            json!({ "email": email, "role": role }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "invite failed: {body}");
    let (status, body) = srv
        .post("/invitations/accept", &member.token, json!({ "token": body["token"] }))
        .await;
    assert_eq!(status, StatusCode::OK, "accept failed: {body}");
}

#[tokio::test(flavor = "multi_thread")]
async fn health_is_public_and_everything_else_needs_a_token() {
    let srv = TestServer::spawn(vec![]).await;

    let res = srv.client.get(format!("{}/health", srv.base_url)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv.client.get(format!("{}/me", srv.base_url)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unauthenticated");

    let expired = mint_jwt(UserId::new(), None, ChronoDuration::minutes(-5));
    let (status, _) = srv.get("/me", &expired).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = srv.get("/me", "not.a.jwt").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test(flavor = "multi_thread")]
async fn identity_comes_from_the_token() {
    let srv = TestServer::spawn(vec![]).await;
    let alice = user("Alice@Example.com");

    let (status, body) = srv.get("/me", &alice.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["profile"]["user_id"], alice.id.to_string());
    assert_eq!(body["profile"]["email"], "alice@example.com");
    assert_eq!(body["profile"]["is_super_admin"], false);
}

#[tokio::test(flavor = "multi_thread")]
async fn org_creation_and_membership_listing() {
    let srv = TestServer::spawn(vec![]).await;
    let alice = user("alice@example.com");

    let org = create_org(&srv, &alice).await;
    assert_eq!(org["state"], "RS");
    assert_eq!(org["join_code"].as_str().unwrap().len(), 8);

    let (status, body) = srv.get("/me/orgs", &alice.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"][0]["role"], "admin");
    assert_eq!(body["items"][0]["join_code"], org["join_code"]);

    let (status, body) = srv
        .post(
            "/orgs",
            &alice.token,
            json!({ "name": " ", "office": "senador", "state": "RS", "city": "Pelotas" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");
}

#[tokio::test(flavor = "multi_thread")]
async fn last_admin_is_protected_over_http() {
    let srv = TestServer::spawn(vec![]).await;
    let (alice, bob) = (user("alice@example.com"), user("bob@example.com"));
    let org = create_org(&srv, &alice).await;
    let org_id = org["id"].as_str().unwrap();
    invite_and_accept(&srv, org_id, &alice, &bob, "bob@example.com", "viewer").await;

    let (status, body) = srv
        .post(&format!("/orgs/{org_id}/members/{}/remove", alice.id), &alice.token, json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "last_admin_violation");

    let (status, body) = srv
        .post(&format!("/orgs/{org_id}/members/{}/role", alice.id), &alice.token, json!({ "role": "viewer" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "self_role_change");

    let (status, _) = srv
        .post(&format!("/orgs/{org_id}/members/{}/remove", bob.id), &alice.token, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = srv.get(&format!("/orgs/{org_id}/members"), &alice.token).await;
    assert_eq!(status, StatusCode::OK);
    let users = body["users"].as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["role"], "admin");
}

#[tokio::test(flavor = "multi_thread")]
async fn non_members_are_forbidden() {
    let srv = TestServer::spawn(vec![]).await;
    let (alice, eve) = (user("alice@example.com"), user("eve@example.com"));
    let org = create_org(&srv, &alice).await;
    let org_id = org["id"].as_str().unwrap();

    let (status, body) = srv.get(&format!("/orgs/{org_id}/members"), &eve.token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, _) = srv.get(&format!("/orgs/{org_id}/cases"), &eve.token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = srv.get("/super/stats", &alice.token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = srv.get("/orgs/not-a-uuid/members", &alice.token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_id");
}

#[tokio::test(flavor = "multi_thread")]
async fn invitation_is_bound_to_its_email() {
    let srv = TestServer::spawn(vec![]).await;
    let (alice, carol, mallory) = (
        user("alice@example.com"),
        user("carol@example.com"),
        user("mallory@example.com"),
    );
    let org = create_org(&srv, &alice).await;
    let org_id = org["id"].as_str().unwrap();

    let (status, issued) = srv
        .post(
            &format!("/orgs/{org_id}/invitations"),
            &alice.token,
            json!({ "email": "carol@example.com", "role": "editor" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = issued["token"].as_str().unwrap();
    assert_eq!(
        issued["link"],
        format!("https://gabinete.example.org/accept-invite?token={token}")
    );

    let (status, body) = srv
        .post("/invitations/accept", &mallory.token, json!({ "token": token }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "email_mismatch");

    let (status, body) = srv
        .post("/invitations/accept", &carol.token, json!({ "token": token, "org_id": org_id }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["org_id"], org_id);
    assert_eq!(body["role"], "assessor");

    let (status, body) = srv
        .post("/invitations/accept", &carol.token, json!({ "token": token }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test(flavor = "multi_thread")]
async fn join_request_flow() {
    let srv = TestServer::spawn(vec![]).await;
    let (alice, dave) = (user("alice@example.com"), user("dave@example.com"));
    let org = create_org(&srv, &alice).await;
    let org_id = org["id"].as_str().unwrap();
    let code = org["join_code"].as_str().unwrap().to_lowercase();

    let (status, first) = srv
        .post("/join-requests", &dave.token, json!({ "code": code, "note": "sou assessor" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = srv.post("/join-requests", &dave.token, json!({ "code": code })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "duplicate_pending");

    let (status, body) = srv
        .get(&format!("/orgs/{org_id}/join-requests?status=pending"), &alice.token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"].as_array().unwrap().len(), 1);

    let request_id = first["request_id"].as_str().unwrap();
    let (status, _) = srv
        .post(&format!("/join-requests/{request_id}/decide"), &dave.token, json!({ "decision": "approve" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = srv
        .post(&format!("/join-requests/{request_id}/decide"), &alice.token, json!({ "decision": "approve" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true }));

    let (_, body) = srv
        .get(&format!("/orgs/{org_id}/join-requests?status=approved"), &alice.token)
        .await;
    assert_eq!(body["items"][0]["status"], "approved");

    let (_, body) = srv.get("/me/orgs", &dave.token).await;
    assert_eq!(body["items"][0]["role"], "viewer");
    assert!(body["items"][0]["join_code"].is_null());

    let (status, body) = srv
        .post(&format!("/orgs/{org_id}/join-code/rotate"), &alice.token, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(body["join_code"].as_str().unwrap().to_lowercase(), code);

    let (status, body) = srv.post("/join-requests", &user("x@example.com").token, json!({ "code": code })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_code");
}

#[tokio::test(flavor = "multi_thread")]
async fn super_admin_operations() {
    let root = user("root@example.com");
    let srv = TestServer::spawn(vec![root.id]).await;
    let alice = user("alice@example.com");
    let org = create_org(&srv, &alice).await;
    let org_id = org["id"].as_str().unwrap();

    let (status, created) = srv
        .post(
            &format!("/orgs/{org_id}/members"),
            &alice.token,
            json!({ "email": "bob@example.com", "password": "senha-forte", "role": "viewer" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let bob_id = created["user_id"].as_str().unwrap();

    let (status, body) = srv
        .post(&format!("/super/users/{bob_id}/password"), &root.token, json!({ "password": "curta" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");
    let (status, _) = srv
        .post(&format!("/super/users/{bob_id}/password"), &root.token, json!({ "password": "outra-senha" }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, stats) = srv.get("/super/stats", &root.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["organizations"], 1);
    assert_eq!(stats["memberships"], 2);

    let (status, body) = srv.get("/super/orgs", &root.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"].as_array().unwrap().len(), 1);

    let (status, _) = srv.delete(&format!("/super/orgs/{org_id}"), &alice.token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = srv.delete(&format!("/super/orgs/{org_id}"), &root.token).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = srv.delete(&format!("/super/orgs/{org_id}"), &root.token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test(flavor = "multi_thread")]
async fn audit_log_is_scoped_and_paginated() {
    let root = user("root@example.com");
    let srv = TestServer::spawn(vec![root.id]).await;
    let (alice, bob) = (user("alice@example.com"), user("bob@example.com"));
    let org = create_org(&srv, &alice).await;
    let org_id = org["id"].as_str().unwrap();
    invite_and_accept(&srv, org_id, &alice, &bob, "bob@example.com", "viewer").await;

    // organization CREATE, invitation CREATE, invitation ACCEPT
    let path = format!("/audit?org_id={org_id}&page_size=2");
    let mut body = Value::Null;
    for _ in 0..50 {
        let (status, current) = srv.get(&path, &alice.token).await;
        assert_eq!(status, StatusCode::OK);
        if current["total"] == 3 {
            body = current;
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    assert_eq!(body["total"], 3, "audit entries did not arrive");
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
    assert_eq!(body["page_size"], 2);

    let (status, body) = srv.get(&format!("/audit?org_id={org_id}&action=accept"), &alice.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["actor"], bob.id.to_string());

    let (status, _) = srv.get(&format!("/audit?org_id={org_id}"), &bob.token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = srv.get("/audit", &alice.token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = srv.get("/audit?action=explode", &alice.token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");

    let (status, body) = srv.get("/audit", &root.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn cases_respect_roles() {
    let srv = TestServer::spawn(vec![]).await;
    let (alice, vera) = (user("alice@example.com"), user("vera@example.com"));
    let org = create_org(&srv, &alice).await;
    let org_id = org["id"].as_str().unwrap();
    invite_and_accept(&srv, org_id, &alice, &vera, "vera@example.com", "viewer").await;

    let case = json!({ "title": "Buraco na rua 7" });
    let (status, _) = srv.post(&format!("/orgs/{org_id}/cases"), &vera.token, case.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = srv.post(&format!("/orgs/{org_id}/cases"), &alice.token, case).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["case"]["status"], "open");

    let (status, body) = srv.get(&format!("/orgs/{org_id}/cases"), &vera.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn sole_admin_cannot_delete_account() {
    let srv = TestServer::spawn(vec![]).await;
    let alice = user("alice@example.com");
    create_org(&srv, &alice).await;

    let (status, body) = srv.post("/me/delete", &alice.token, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "last_admin_violation");

    let bob = user("bob@example.com");
    let (status, body) = srv.post("/me/delete", &bob.token, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_bodies_are_validation_errors() {
    let srv = TestServer::spawn(vec![]).await;
    let (alice, bob) = (user("alice@example.com"), user("bob@example.com"));
    let org = create_org(&srv, &alice).await;
    let org_id = org["id"].as_str().unwrap();
    invite_and_accept(&srv, org_id, &alice, &bob, "bob@example.com", "viewer").await;

    let (status, body) = srv
        .post(&format!("/orgs/{org_id}/members/{}/role", bob.id), &alice.token, json!({ "role": "owner" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");

    let (status, body) = srv
        .post(&format!("/orgs/{org_id}/invitations"), &alice.token, json!({ "role": "viewer" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");

    let res = srv
        .client
        .post(format!("{}/orgs", srv.base_url))
        .bearer_auth(&alice.token)
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation");
}

#[tokio::test(flavor = "multi_thread")]
async fn created_members_log_in_with_their_password() {
    let srv = TestServer::spawn(vec![]).await;
    let alice = user("alice@example.com");
    let org = create_org(&srv, &alice).await;
    let org_id = org["id"].as_str().unwrap();

    let (status, created) = srv
        .post(
            &format!("/orgs/{org_id}/members"),
            &alice.token,
            json!({ "email": "Bob@Example.com", "password": "senha-forte", "role": "assessor" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "create member failed: {created}");
    let bob_id = created["user_id"].as_str().unwrap();

    let (status, body) = srv.login("bob@example.com", "senha-errada").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_credentials");
    let (status, body) = srv.login("nobody@example.com", "senha-forte").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_credentials");

    let (status, session) = srv.login(" BOB@example.com ", "senha-forte").await;
    assert_eq!(status, StatusCode::OK, "login failed: {session}");
    assert_eq!(session["user_id"], bob_id);
    assert_eq!(session["token_type"], "Bearer");
    let token = session["token"].as_str().unwrap();

    let (status, me) = srv.get("/me", token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["profile"]["user_id"], bob_id);
    assert_eq!(me["profile"]["email"], "bob@example.com");

    let (status, body) = srv.get("/me/orgs", token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"][0]["role"], "assessor");
}

#[tokio::test(flavor = "multi_thread")]
async fn voters_and_tags_over_http() {
    let srv = TestServer::spawn(vec![]).await;
    let (alice, vera) = (user("alice@example.com"), user("vera@example.com"));
    let org = create_org(&srv, &alice).await;
    let org_id = org["id"].as_str().unwrap();
    invite_and_accept(&srv, org_id, &alice, &vera, "vera@example.com", "viewer").await;

    let maria = json!({ "name": "Maria da Silva", "phone": "53 99999-0000", "city": "Pelotas", "state": "rs" });
    let (status, _) = srv.post(&format!("/orgs/{org_id}/voters"), &vera.token, maria.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = srv.post(&format!("/orgs/{org_id}/voters"), &alice.token, maria).await;
    assert_eq!(status, StatusCode::OK, "create voter failed: {body}");
    assert_eq!(body["item"]["state"], "RS");
    let voter_id = body["item"]["id"].as_str().unwrap().to_string();

    let (status, body) = srv
        .post(
            &format!("/orgs/{org_id}/voters"),
            &alice.token,
            json!({ "name": "João", "phone": " ", "city": "Pelotas" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");

    let (status, body) = srv
        .post(&format!("/orgs/{org_id}/tags"), &alice.token, json!({ "name": "Saúde", "color": "#0EA5E9" }))
        .await;
    assert_eq!(status, StatusCode::OK, "create tag failed: {body}");
    let tag_id = body["item"]["id"].as_str().unwrap().to_string();

    let link = format!("/orgs/{org_id}/voters/{voter_id}/tags/{tag_id}");
    let (status, _) = srv.post(&link, &vera.token, json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = srv.post(&link, &alice.token, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);

    let (status, body) = srv
        .get(&format!("/orgs/{org_id}/voters?q=silva&tag_id={tag_id}&limit=5"), &vera.token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["limit"], 5);
    assert_eq!(body["items"][0]["id"], voter_id.as_str());

    let (status, body) = srv.get(&format!("/orgs/{org_id}/voters/{voter_id}/tags"), &vera.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"][0]["color"], "#0ea5e9");

    let (status, body) = srv
        .patch(&format!("/orgs/{org_id}/voters/{voter_id}"), &alice.token, json!({ "notes": "ligar depois" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["item"]["notes"], "ligar depois");

    let (status, _) = srv.delete(&format!("/orgs/{org_id}/tags/{tag_id}"), &alice.token).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = srv.get(&format!("/orgs/{org_id}/voters/{voter_id}/tags"), &alice.token).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 0);

    let (status, _) = srv.delete(&format!("/orgs/{org_id}/voters/{voter_id}"), &alice.token).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = srv.get(&format!("/orgs/{org_id}/voters/{voter_id}"), &alice.token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}
