use axum::{
    extract::{State, Query, Json, Path},
    response::{IntoResponse, Json as AxumJson, Response},
    http::{StatusCode, HeaderValue, header},
};
use serde::Deserialize;

use crate::AppState;
use crate::auth::AdminUser;
use crate::db;
use crate::db::models::DonationStatus;

#[derive(Deserialize)]
pub struct AdminListParams {
    pub status: Option<String>,
    pub category: Option<String>,
    pub q: Option<String>,
}

#[derive(Deserialize)]
pub struct SetStatusRequest {
    pub status: String,
}

fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        let escaped = s.replace('"', "\"\"");
        format!("\"{}\"", escaped)
    } else {
        s.to_string()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub async fn list_donations(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(params): Query<AdminListParams>,
) -> impl IntoResponse {
    let status = non_empty(params.status);
    let category = non_empty(params.category);
    let q = non_empty(params.q);

    match db::list_donations_admin(&state.db, status.as_deref(), category.as_deref(), q.as_deref()).await {
        Ok(donations) => AxumJson(serde_json::json!({ "donations": donations })).into_response(),
        Err(e) => {
            tracing::error!("DB Query Error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Database Error").into_response()
        }
    }
}

/// Any of the five labels may replace any other; there is no transition
/// table, matching the administrator console this replaces.
pub async fn set_status(
    Path(id): Path<String>,
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(req): Json<SetStatusRequest>,
) -> impl IntoResponse {
    let Some(status) = DonationStatus::parse(&req.status) else {
        let allowed: Vec<&str> = DonationStatus::ALL.iter().map(|s| s.label()).collect();
        return (
            StatusCode::BAD_REQUEST,
            AxumJson(serde_json::json!({ "error": "unknown status", "allowed": allowed })),
        ).into_response();
    };

    match db::set_donation_status(&state.db, &id, status.label()).await {
        Ok(true) => AxumJson(serde_json::json!({ "status": "updated", "id": id })).into_response(),
        Ok(false) => (StatusCode::NOT_FOUND, "Not found").into_response(),
        Err(e) => {
            tracing::error!("Status update error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Database Error").into_response()
        }
    }
}

pub async fn export_csv(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(params): Query<AdminListParams>,
) -> impl IntoResponse {
    let status = non_empty(params.status);
    let category = non_empty(params.category);
    let q = non_empty(params.q);

    match db::list_donations_admin(&state.db, status.as_deref(), category.as_deref(), q.as_deref()).await {
        Ok(list) => {
            let mut w = String::new();
            w.push_str("id,donor,category,description,pickup_date,status,created_at\n");
            for d in list {
                let pickup = d.pickup_date.format("%Y-%m-%d").to_string();
                let created = d.created_at.to_rfc3339();
                w.push_str(&format!("{},{},{},{},{},{},{}\n",
                    csv_escape(&d.id),
                    csv_escape(&d.donor_username),
                    csv_escape(&d.category),
                    csv_escape(&d.description),
                    csv_escape(&pickup),
                    csv_escape(&d.status),
                    csv_escape(&created),
                ));
            }

            let mut resp = Response::new(w.into());
            let headers = resp.headers_mut();
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/csv; charset=utf-8"));
            headers.insert(header::CONTENT_DISPOSITION, HeaderValue::from_static("attachment; filename=donations.csv"));
            resp
        }
        Err(e) => {
            tracing::error!("DB Query Error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Database Error").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::csv_escape;

    #[test]
    fn escapes_fields_with_delimiters_and_quotes() {
        assert_eq!(csv_escape("plain"), "plain");
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_escape("line\nbreak"), "\"line\nbreak\"");
    }
}
