use serde::{Deserialize, Serialize};
use chrono::{NaiveDate, DateTime, Utc};

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct Donation {
    pub id: String,
    pub donor_id: String,
    pub donor_username: String,
    pub category: String,
    pub description: String,
    pub pickup_date: NaiveDate,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// The closed set of statuses an administrator may assign. The stored column
/// is plain text; validation happens at the admin endpoint, and no
/// current-to-next transition table is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DonationStatus {
    Pending,
    Approved,
    PickedUp,
    Delivered,
    Rejected,
}

impl DonationStatus {
    pub const ALL: [DonationStatus; 5] = [
        DonationStatus::Pending,
        DonationStatus::Approved,
        DonationStatus::PickedUp,
        DonationStatus::Delivered,
        DonationStatus::Rejected,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            DonationStatus::Pending => "Pending",
            DonationStatus::Approved => "Approved",
            DonationStatus::PickedUp => "Picked Up",
            DonationStatus::Delivered => "Delivered",
            DonationStatus::Rejected => "Rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.label() == value)
    }
}
