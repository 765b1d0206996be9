use std::collections::HashMap;
use std::env;
use std::future::Future;

use axum::{
    extract::{State, Json, FromRequestParts},
    response::IntoResponse,
    http::{StatusCode, request::Parts, HeaderValue, header},
};
use serde::{Deserialize, Serialize};
use chrono::{Utc, Duration};
use jsonwebtoken::{encode, decode, EncodingKey, DecodingKey, Header, Validation};
use uuid::Uuid;

use crate::AppState;
use crate::db;
use crate::db::models::User;

const AUTH_COOKIE_NAME: &str = "auth_token";

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, Clone)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
}

// Claims for our JWT
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: usize,
    username: String,
    email: String,
    admin: bool,
    iss: Option<String>,
    aud: Option<String>,
}

pub struct AuthenticatedUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
}

/// An authenticated user with the admin flag set; rejects everyone else
/// with 403 so admin handlers only declare the extractor.
pub struct AdminUser(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync + 'static,
{
    type Rejection = (StatusCode, String);

    fn from_request_parts(parts: &mut Parts, _state: &S) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        async move {
            let token = extract_token(parts)
                .ok_or((StatusCode::UNAUTHORIZED, "Missing auth token".to_string()))?;
            let secret = env::var("JWT_SECRET").map_err(|_| {
                tracing::error!("JWT_SECRET not set");
                (StatusCode::INTERNAL_SERVER_ERROR, "Server configuration error".to_string())
            })?;

            let mut validation = Validation::default();
            validation.validate_exp = true;
            if let Ok(issuer) = env::var("JWT_ISSUER") {
                validation.set_issuer(&[issuer.as_str()]);
            }
            if let Ok(audience) = env::var("JWT_AUDIENCE") {
                validation.set_audience(&[audience.as_str()]);
            }

            let token_data = decode::<Claims>(
                &token,
                &DecodingKey::from_secret(secret.as_ref()),
                &validation,
            )
            .map_err(|e| {
                tracing::error!("Token error: {}", e);
                (StatusCode::UNAUTHORIZED, "Invalid token".to_string())
            })?;

            Ok(AuthenticatedUser {
                id: token_data.claims.sub,
                username: token_data.claims.username,
                email: token_data.claims.email,
                is_admin: token_data.claims.admin,
            })
        }
    }
}

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync + 'static,
{
    type Rejection = (StatusCode, String);

    fn from_request_parts(parts: &mut Parts, state: &S) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        async move {
            let user = AuthenticatedUser::from_request_parts(parts, state).await?;
            if !user.is_admin {
                return Err((StatusCode::FORBIDDEN, "Admin access required".to_string()));
            }
            Ok(AdminUser(user))
        }
    }
}

/// Field-level checks applied before an account is persisted. Returns a map
/// keyed by field name so clients can re-render the form with inline errors.
pub fn validate_registration(req: &RegisterRequest) -> HashMap<&'static str, String> {
    let mut errors = HashMap::new();

    let username = req.username.trim();
    if username.len() < 3 || username.len() > 30 {
        errors.insert("username", "Username must be 3 to 30 characters long".to_string());
    } else if !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        errors.insert("username", "Username may only contain letters, digits, and underscores".to_string());
    }

    match req.email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {}
        _ => {
            errors.insert("email", "Enter a valid email address".to_string());
        }
    }

    if req.password.len() < 8 {
        errors.insert("password", "Password must be at least 8 characters long".to_string());
    } else if req.password.chars().all(|c| c.is_ascii_digit()) {
        errors.insert("password", "Password cannot be entirely numeric".to_string());
    }

    errors
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> impl IntoResponse {
    let mut errors = validate_registration(&req);

    if errors.is_empty() {
        match db::find_user_by_username(&state.db, req.username.trim()).await {
            Ok(Some(_)) => {
                errors.insert("username", "This username is already taken".to_string());
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!("User lookup failed: {}", e);
                return (StatusCode::INTERNAL_SERVER_ERROR, "Database Error").into_response();
            }
        }
    }

    if !errors.is_empty() {
        return (StatusCode::BAD_REQUEST, Json(serde_json::json!({ "errors": errors }))).into_response();
    }

    let password_hash = match bcrypt::hash(&req.password, bcrypt::DEFAULT_COST) {
        Ok(h) => h,
        Err(e) => {
            tracing::error!("Password hashing failed: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Registration failed").into_response();
        }
    };

    let id = Uuid::new_v4().to_string();
    let username = req.username.trim().to_string();
    let now = Utc::now();

    if let Err(e) = db::create_user(&state.db, &id, &username, req.email.trim(), &password_hash, false, now).await {
        tracing::error!("User create failed: {}", e);
        return (StatusCode::INTERNAL_SERVER_ERROR, "Database Error").into_response();
    }

    let profile = UserProfile {
        id,
        username,
        email: req.email.trim().to_string(),
        is_admin: false,
    };
    (StatusCode::CREATED, Json(profile)).into_response()
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> impl IntoResponse {
    let user = match db::find_user_by_username(&state.db, req.username.trim()).await {
        Ok(Some(u)) => u,
        Ok(None) => return (StatusCode::UNAUTHORIZED, "Invalid credentials").into_response(),
        Err(e) => {
            tracing::error!("User lookup failed: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database Error").into_response();
        }
    };

    match bcrypt::verify(&req.password, &user.password_hash) {
        Ok(true) => {}
        Ok(false) => return (StatusCode::UNAUTHORIZED, "Invalid credentials").into_response(),
        Err(e) => {
            tracing::error!("Password verify failed: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Login failed").into_response();
        }
    }

    let token = match create_jwt(&user) {
        Ok(t) => t,
        Err(e) => {
            tracing::error!("JWT creation failed: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Login failed").into_response();
        }
    };

    let profile = UserProfile {
        id: user.id,
        username: user.username,
        email: user.email,
        is_admin: user.is_admin,
    };

    let cookie = build_auth_cookie(&token);
    let mut response = Json(profile).into_response();
    match HeaderValue::from_str(&cookie) {
        Ok(value) => {
            response.headers_mut().insert(header::SET_COOKIE, value);
            response
        }
        Err(e) => {
            tracing::error!("Auth cookie build failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Login failed").into_response()
        }
    }
}

pub async fn logout() -> impl IntoResponse {
    let cookie = clear_auth_cookie();
    let mut response = (StatusCode::OK, "OK").into_response();
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        response.headers_mut().insert(header::SET_COOKIE, value);
    }
    response
}

pub async fn me(user: AuthenticatedUser) -> impl IntoResponse {
    let profile = UserProfile {
        id: user.id,
        username: user.username,
        email: user.email,
        is_admin: user.is_admin,
    };
    Json(profile)
}

fn create_jwt(user: &User) -> anyhow::Result<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::days(1))
        .ok_or_else(|| anyhow::anyhow!("invalid expiry timestamp"))?
        .timestamp();

    let issuer = env::var("JWT_ISSUER").ok();
    let audience = env::var("JWT_AUDIENCE").ok();

    let claims = Claims {
        sub: user.id.clone(),
        username: user.username.clone(),
        email: user.email.clone(),
        admin: user.is_admin,
        exp: expiration as usize,
        iss: issuer,
        aud: audience,
    };

    let secret = env::var("JWT_SECRET")
        .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable not set"))?;
    let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_ref()))?;

    Ok(token)
}

fn extract_token(parts: &Parts) -> Option<String> {
    if let Some(auth_header) = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    {
        if let Some(token) = auth_header.strip_prefix("Bearer ") {
            return Some(token.to_string());
        }
    }

    if let Some(cookie_header) = parts
        .headers
        .get(header::COOKIE)
        .and_then(|h| h.to_str().ok())
    {
        for cookie in cookie_header.split(';') {
            let cookie = cookie.trim();
            if let Some((k, v)) = cookie.split_once('=') {
                if k == AUTH_COOKIE_NAME {
                    return Some(v.to_string());
                }
            }
        }
    }
    None
}

fn build_auth_cookie(token: &str) -> String {
    let secure = env::var("RUST_ENV").unwrap_or_else(|_| "development".to_string()) == "production";
    let mut cookie = format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age=86400",
        AUTH_COOKIE_NAME,
        token
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn clear_auth_cookie() -> String {
    let secure = env::var("RUST_ENV").unwrap_or_else(|_| "development".to_string()) == "production";
    let mut cookie = format!(
        "{}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0",
        AUTH_COOKIE_NAME
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}
