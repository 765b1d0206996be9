use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use donatehub::{app, AppState};
use donatehub::db;

async fn test_app() -> (tempfile::TempDir, db::DbPool, axum::Router) {
    std::env::set_var("JWT_SECRET", "integration-test-secret");

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("accounts.db");
    let pool = db::connect(path.to_str().expect("utf-8 path")).await.expect("connect");
    db::run_migrations(&pool).await.expect("migrations");

    let state = AppState { db: pool.clone(), ai: None };
    (dir, pool, app(state))
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.expect("body").to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn register_validates_fields() {
    let (_dir, _pool, app) = test_app().await;

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/register", serde_json::json!({
            "username": "x",
            "email": "not-an-email",
            "password": "123",
        })))
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body["errors"]["username"].is_string());
    assert!(body["errors"]["email"].is_string());
    assert!(body["errors"]["password"].is_string());
}

#[tokio::test]
async fn register_rejects_duplicate_username() {
    let (_dir, _pool, app) = test_app().await;

    let payload = serde_json::json!({
        "username": "ravi",
        "email": "ravi@example.com",
        "password": "paperclip77",
    });

    let first = app
        .clone()
        .oneshot(json_request("POST", "/api/register", payload.clone()))
        .await
        .expect("request");
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = app
        .clone()
        .oneshot(json_request("POST", "/api/register", payload))
        .await
        .expect("request");
    assert_eq!(second.status(), StatusCode::BAD_REQUEST);
    let body = json_body(second).await;
    assert!(body["errors"]["username"].is_string());
}

async fn register_and_login(app: &axum::Router, username: &str) -> String {
    let created = app
        .clone()
        .oneshot(json_request("POST", "/api/register", serde_json::json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": "paperclip77",
        })))
        .await
        .expect("request");
    assert_eq!(created.status(), StatusCode::CREATED);

    let login = app
        .clone()
        .oneshot(json_request("POST", "/api/login", serde_json::json!({
            "username": username,
            "password": "paperclip77",
        })))
        .await
        .expect("request");
    assert_eq!(login.status(), StatusCode::OK);

    let cookie = login
        .headers()
        .get(header::SET_COOKIE)
        .expect("auth cookie")
        .to_str()
        .expect("cookie header")
        .to_string();

    // "auth_token=...; HttpOnly; ..." -> "auth_token=..."
    cookie.split(';').next().expect("cookie pair").to_string()
}

#[tokio::test]
async fn donation_round_trip_over_http() {
    let (_dir, _pool, app) = test_app().await;
    let cookie = register_and_login(&app, "meena").await;

    let created = app
        .clone()
        .oneshot({
            let mut req = json_request("POST", "/api/donations", serde_json::json!({
                "category": "Books",
                "description": "old textbooks",
                "pickup_date": "2026-09-01",
            }));
            req.headers_mut().insert(header::COOKIE, cookie.parse().unwrap());
            req
        })
        .await
        .expect("request");
    assert_eq!(created.status(), StatusCode::CREATED);
    let body = json_body(created).await;
    assert_eq!(body["status"], "created");

    let listed = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/donations")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("request");
    assert_eq!(listed.status(), StatusCode::OK);
    let body = json_body(listed).await;
    let donations = body["donations"].as_array().expect("donations array");
    assert_eq!(donations.len(), 1);
    assert_eq!(donations[0]["category"], "Books");
    assert_eq!(donations[0]["status"], "Pending");
    assert_eq!(donations[0]["donor_username"], "meena");
}

#[tokio::test]
async fn bad_pickup_date_is_rejected() {
    let (_dir, _pool, app) = test_app().await;
    let cookie = register_and_login(&app, "ravi").await;

    let response = app
        .clone()
        .oneshot({
            let mut req = json_request("POST", "/api/donations", serde_json::json!({
                "category": "Books",
                "description": "old textbooks",
                "pickup_date": "next tuesday",
            }));
            req.headers_mut().insert(header::COOKIE, cookie.parse().unwrap());
            req
        })
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn donation_routes_require_auth() {
    let (_dir, _pool, app) = test_app().await;

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/api/donations").body(Body::empty()).unwrap())
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_routes_reject_regular_users() {
    let (_dir, _pool, app) = test_app().await;
    let cookie = register_and_login(&app, "asha").await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/admin/donations")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot({
            let mut req = json_request("PUT", "/api/admin/donations/some-id/status", serde_json::json!({
                "status": "Approved",
            }));
            req.headers_mut().insert(header::COOKIE, cookie.parse().unwrap());
            req
        })
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

async fn login_as_admin(pool: &db::DbPool, app: &axum::Router) -> String {
    let id = uuid::Uuid::new_v4().to_string();
    let hash = bcrypt::hash("paperclip77", bcrypt::DEFAULT_COST).expect("hash");
    db::create_user(pool, &id, "admin", "admin@example.com", &hash, true, chrono::Utc::now())
        .await
        .expect("create admin");

    let login = app
        .clone()
        .oneshot(json_request("POST", "/api/login", serde_json::json!({
            "username": "admin",
            "password": "paperclip77",
        })))
        .await
        .expect("request");
    assert_eq!(login.status(), StatusCode::OK);

    let cookie = login
        .headers()
        .get(header::SET_COOKIE)
        .expect("auth cookie")
        .to_str()
        .expect("cookie header")
        .to_string();
    cookie.split(';').next().expect("cookie pair").to_string()
}

#[tokio::test]
async fn admin_manages_donation_status() {
    let (_dir, pool, app) = test_app().await;
    let donor_cookie = register_and_login(&app, "meena").await;
    let admin_cookie = login_as_admin(&pool, &app).await;

    let created = app
        .clone()
        .oneshot({
            let mut req = json_request("POST", "/api/donations", serde_json::json!({
                "category": "Toys",
                "description": "wooden blocks",
                "pickup_date": "2026-09-05",
            }));
            req.headers_mut().insert(header::COOKIE, donor_cookie.parse().unwrap());
            req
        })
        .await
        .expect("request");
    assert_eq!(created.status(), StatusCode::CREATED);
    let donation_id = json_body(created).await["id"].as_str().expect("id").to_string();

    // Labels outside the status set are refused
    let response = app
        .clone()
        .oneshot({
            let mut req = json_request(
                "PUT",
                &format!("/api/admin/donations/{}/status", donation_id),
                serde_json::json!({ "status": "Vanished" }),
            );
            req.headers_mut().insert(header::COOKIE, admin_cookie.parse().unwrap());
            req
        })
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot({
            let mut req = json_request(
                "PUT",
                &format!("/api/admin/donations/{}/status", donation_id),
                serde_json::json!({ "status": "Picked Up" }),
            );
            req.headers_mut().insert(header::COOKIE, admin_cookie.parse().unwrap());
            req
        })
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot({
            let mut req = json_request(
                "PUT",
                "/api/admin/donations/no-such-id/status",
                serde_json::json!({ "status": "Approved" }),
            );
            req.headers_mut().insert(header::COOKIE, admin_cookie.parse().unwrap());
            req
        })
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let listed = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/admin/donations?status=Picked%20Up")
                .header(header::COOKIE, &admin_cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("request");
    assert_eq!(listed.status(), StatusCode::OK);
    let body = json_body(listed).await;
    let donations = body["donations"].as_array().expect("donations array");
    assert_eq!(donations.len(), 1);
    assert_eq!(donations[0]["id"], donation_id.as_str());
    assert_eq!(donations[0]["donor_username"], "meena");
}
