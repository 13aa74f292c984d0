//! Persistence boundary
//!
//! Handlers and the detection orchestrator only see `dyn Store`. Two
//! implementations exist: PostgreSQL for deployments and an in-process store
//! for local runs and tests.

use async_trait::async_trait;

use crate::models::{ChartFilter, ChartPoint, Feedback, LogEntry, RiskReport, User, UserStats};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0} already exists")]
    Duplicate(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
    // Users
    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn create_user(&self, user: User) -> StoreResult<User>;
    async fn update_password(&self, username: &str, password_hash: &str) -> StoreResult<()>;

    // Detection log
    async fn append_log(&self, entry: LogEntry) -> StoreResult<LogEntry>;
    /// Newest first
    async fn logs_for_user(&self, username: &str) -> StoreResult<Vec<LogEntry>>;
    async fn user_stats(&self, username: &str) -> StoreResult<UserStats>;
    /// Per-day totals, oldest first
    async fn chart_data(&self, username: &str, filter: ChartFilter) -> StoreResult<Vec<ChartPoint>>;
    /// Per-type totals in `MediaType::ALL` order
    async fn type_stats(&self, username: &str) -> StoreResult<Vec<ChartPoint>>;

    // Reports
    async fn append_risk_report(&self, report: RiskReport) -> StoreResult<()>;
    async fn append_feedback(&self, feedback: Feedback) -> StoreResult<()>;
}
