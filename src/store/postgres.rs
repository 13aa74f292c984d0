//! PostgreSQL store

use async_trait::async_trait;
use sqlx::PgPool;

use super::{Store, StoreError, StoreResult};
use crate::detection::MediaType;
use crate::models::{ChartFilter, ChartPoint, Feedback, LogEntry, RiskReport, User, UserStats};

/// SQL predicate for a fake-like result label
const FAKE_LIKE: &str = "(result LIKE '%Fake%' OR result LIKE '%AI%')";

const LOG_COLUMNS: &str = "id, request_type, input_data, result, confidence, username, created_at";

/// Postgres unique_violation
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn create_user(&self, user: User) -> StoreResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, email, password_hash, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            let code = e.as_database_error().and_then(|db| db.code()).map(|c| c.into_owned());
            if code.as_deref() == Some(UNIQUE_VIOLATION) {
                StoreError::Duplicate(format!("user {}", user.username))
            } else {
                StoreError::Database(e)
            }
        })
    }

    async fn update_password(&self, username: &str, password_hash: &str) -> StoreResult<()> {
        sqlx::query("UPDATE users SET password_hash = $1 WHERE username = $2")
            .bind(password_hash)
            .bind(username)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn append_log(&self, entry: LogEntry) -> StoreResult<LogEntry> {
        let query = format!(
            "INSERT INTO detection_logs ({LOG_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {LOG_COLUMNS}"
        );
        let saved = sqlx::query_as::<_, LogEntry>(&query)
            .bind(entry.id)
            .bind(&entry.request_type)
            .bind(&entry.input_data)
            .bind(&entry.result)
            .bind(entry.confidence)
            .bind(&entry.username)
            .bind(entry.timestamp)
            .fetch_one(&self.pool)
            .await?;
        Ok(saved)
    }

    async fn logs_for_user(&self, username: &str) -> StoreResult<Vec<LogEntry>> {
        let query = format!(
            "SELECT {LOG_COLUMNS} FROM detection_logs WHERE username = $1 ORDER BY created_at DESC"
        );
        let logs = sqlx::query_as::<_, LogEntry>(&query)
            .bind(username)
            .fetch_all(&self.pool)
            .await?;
        Ok(logs)
    }

    async fn user_stats(&self, username: &str) -> StoreResult<UserStats> {
        let query = format!(
            "SELECT COUNT(*), COUNT(*) FILTER (WHERE {FAKE_LIKE}) FROM detection_logs WHERE username = $1"
        );
        let (total, fake): (i64, i64) = sqlx::query_as(&query)
            .bind(username)
            .fetch_one(&self.pool)
            .await?;
        Ok(UserStats::from_counts(total, fake))
    }

    async fn chart_data(&self, username: &str, filter: ChartFilter) -> StoreResult<Vec<ChartPoint>> {
        let request_type = match filter {
            ChartFilter::All => None,
            ChartFilter::Only(media) => Some(media.as_str()),
        };

        let query = format!(
            r#"
            SELECT to_char(created_at AT TIME ZONE 'UTC', 'YYYY-MM-DD') AS day,
                   COUNT(*),
                   COUNT(*) FILTER (WHERE {FAKE_LIKE})
            FROM detection_logs
            WHERE username = $1 AND ($2::text IS NULL OR request_type = $2)
            GROUP BY day
            ORDER BY day ASC
            LIMIT {}
            "#,
            crate::models::stats::CHART_MAX_DAYS
        );
        let rows: Vec<(String, i64, i64)> = sqlx::query_as(&query)
            .bind(username)
            .bind(request_type)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(day, total, fake)| ChartPoint::new(day, total, fake))
            .collect())
    }

    async fn type_stats(&self, username: &str) -> StoreResult<Vec<ChartPoint>> {
        let query = format!(
            r#"
            SELECT request_type, COUNT(*), COUNT(*) FILTER (WHERE {FAKE_LIKE})
            FROM detection_logs
            WHERE username = $1
            GROUP BY request_type
            "#
        );
        let rows: Vec<(String, i64, i64)> = sqlx::query_as(&query)
            .bind(username)
            .fetch_all(&self.pool)
            .await?;

        Ok(MediaType::ALL
            .iter()
            .map(|media| {
                let (total, fake) = rows
                    .iter()
                    .find(|(kind, _, _)| kind == media.as_str())
                    .map(|(_, total, fake)| (*total, *fake))
                    .unwrap_or((0, 0));
                ChartPoint::new(media.display_name(), total, fake)
            })
            .collect())
    }

    async fn append_risk_report(&self, report: RiskReport) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO risk_reports (username, confidences, risk_level, average_confidence, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&report.username)
        .bind(&report.confidences)
        .bind(report.risk_level.as_str())
        .bind(report.average_confidence)
        .bind(report.timestamp)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn append_feedback(&self, feedback: Feedback) -> StoreResult<()> {
        sqlx::query("INSERT INTO feedback (username, message, created_at) VALUES ($1, $2, $3)")
            .bind(&feedback.username)
            .bind(&feedback.message)
            .bind(feedback.timestamp)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
