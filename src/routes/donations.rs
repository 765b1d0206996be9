use axum::{
    extract::{State, Json},
    response::{IntoResponse, Json as AxumJson},
    http::StatusCode,
};
use serde::Deserialize;
use uuid::Uuid;
use chrono::NaiveDate;

use crate::AppState;
use crate::auth::AuthenticatedUser;
use crate::notifier;

#[derive(Deserialize)]
pub struct CreateDonationRequest {
    pub category: String,
    pub description: String,
    pub pickup_date: String, // YYYY-MM-DD
}

pub async fn create_donation(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(req): Json<CreateDonationRequest>,
) -> impl IntoResponse {
    let pickup_date = match NaiveDate::parse_from_str(&req.pickup_date, "%Y-%m-%d") {
        Ok(d) => d,
        Err(_) => {
            return (StatusCode::BAD_REQUEST, "pickup_date must be YYYY-MM-DD").into_response();
        }
    };

    let id = Uuid::new_v4().to_string();
    let now = chrono::Utc::now();

    if let Err(e) = crate::db::add_donation(
        &state.db,
        &id,
        &user.id,
        &req.category,
        &req.description,
        pickup_date,
        now,
    ).await {
        tracing::error!("DB Error: {}", e);
        return (StatusCode::INTERNAL_SERVER_ERROR, "Database Error").into_response();
    }

    // Confirmation email; failures never reach the donor.
    notifier::send_best_effort(
        &user.email,
        "Donation Submitted Successfully – DonateHub",
        &format!(
            "Hello {},\n\n\
             Thank you for your donation.\n\n\
             Category: {}\n\
             Pickup Date: {}\n\n\
             Regards,\nDonateHub Team",
            user.username,
            req.category,
            pickup_date.format("%Y-%m-%d"),
        ),
    );

    (StatusCode::CREATED, AxumJson(serde_json::json!({ "status": "created", "id": id }))).into_response()
}

pub async fn my_donations(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> impl IntoResponse {
    match crate::db::list_donations_by_donor(&state.db, &user.id).await {
        Ok(donations) => AxumJson(serde_json::json!({ "donations": donations })).into_response(),
        Err(e) => {
            tracing::error!("DB Query Error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Database Error").into_response()
        }
    }
}
