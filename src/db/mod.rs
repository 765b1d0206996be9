use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::migrate::MigrateDatabase;
use chrono::{NaiveDate, DateTime, Utc};
use std::env;
use std::time::Duration;

pub mod models;

use models::{User, Donation};

pub type DbPool = SqlitePool;

pub async fn init_pool() -> anyhow::Result<DbPool> {
    let path = env::var("DATABASE_PATH").unwrap_or_else(|_| "donatehub.db".to_string());
    connect(&path).await
}

pub async fn connect(path: &str) -> anyhow::Result<DbPool> {
    let url = format!("sqlite:{}", path);

    if !sqlx::Sqlite::database_exists(&url).await? {
        sqlx::Sqlite::create_database(&url).await?;
    }

    let pool = SqlitePoolOptions::new()
        // Tolerate transient lock contention under concurrent writers
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(60))
        .connect(&url)
        .await?;

    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    Ok(pool)
}

/// Applies the schema in `migrations/init.sql`. Every statement is
/// `IF NOT EXISTS`, so re-running on an existing database is a no-op.
pub async fn run_migrations(pool: &DbPool) -> anyhow::Result<()> {
    let sql = include_str!("../../migrations/init.sql");

    let statements: Vec<&str> = sql
        .split(';')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();

    for stmt in statements {
        sqlx::query(stmt).execute(pool).await?;
    }

    Ok(())
}

pub async fn create_user(
    pool: &DbPool,
    id: &str,
    username: &str,
    email: &str,
    password_hash: &str,
    is_admin: bool,
    created_at: DateTime<Utc>,
) -> anyhow::Result<()> {
    sqlx::query(
        "INSERT INTO users (id, username, email, password_hash, is_admin, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )
    .bind(id)
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .bind(is_admin)
    .bind(created_at)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn find_user_by_username(pool: &DbPool, username: &str) -> anyhow::Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, username, email, password_hash, is_admin, created_at \
         FROM users WHERE username = ?1",
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

pub async fn add_donation(
    pool: &DbPool,
    id: &str,
    donor_id: &str,
    category: &str,
    description: &str,
    pickup_date: NaiveDate,
    created_at: DateTime<Utc>,
) -> anyhow::Result<()> {
    sqlx::query(
        "INSERT INTO donations (id, donor_id, category, description, pickup_date, status, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, 'Pending', ?6)",
    )
    .bind(id)
    .bind(donor_id)
    .bind(category)
    .bind(description)
    .bind(pickup_date)
    .bind(created_at)
    .execute(pool)
    .await?;

    Ok(())
}

const DONATION_COLUMNS: &str =
    "d.id, d.donor_id, u.username AS donor_username, d.category, d.description, \
     d.pickup_date, d.status, d.created_at";

pub async fn list_donations_by_donor(pool: &DbPool, donor_id: &str) -> anyhow::Result<Vec<Donation>> {
    let donations = sqlx::query_as::<_, Donation>(&format!(
        "SELECT {} FROM donations d JOIN users u ON u.id = d.donor_id \
         WHERE d.donor_id = ?1 ORDER BY d.created_at DESC",
        DONATION_COLUMNS
    ))
    .bind(donor_id)
    .fetch_all(pool)
    .await?;

    Ok(donations)
}

/// Admin listing. `status` and `category` filter exactly; `q` matches donor
/// username, category, or description as a substring.
pub async fn list_donations_admin(
    pool: &DbPool,
    status: Option<&str>,
    category: Option<&str>,
    q: Option<&str>,
) -> anyhow::Result<Vec<Donation>> {
    let donations = sqlx::query_as::<_, Donation>(&format!(
        "SELECT {} FROM donations d JOIN users u ON u.id = d.donor_id \
         WHERE (?1 IS NULL OR d.status = ?1) \
           AND (?2 IS NULL OR d.category = ?2) \
           AND (?3 IS NULL \
                OR u.username LIKE '%' || ?3 || '%' \
                OR d.category LIKE '%' || ?3 || '%' \
                OR d.description LIKE '%' || ?3 || '%') \
         ORDER BY d.created_at DESC",
        DONATION_COLUMNS
    ))
    .bind(status)
    .bind(category)
    .bind(q)
    .fetch_all(pool)
    .await?;

    Ok(donations)
}

/// Returns false when no donation with that id exists.
pub async fn set_donation_status(pool: &DbPool, id: &str, status: &str) -> anyhow::Result<bool> {
    let result = sqlx::query("UPDATE donations SET status = ?1 WHERE id = ?2")
        .bind(status)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
