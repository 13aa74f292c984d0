//! In-process store (`DATABASE_URL=memory://`, tests)

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Store, StoreError, StoreResult};
use crate::models::{
    stats, ChartFilter, ChartPoint, Feedback, LogEntry, RiskReport, User, UserStats,
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    logs: Vec<LogEntry>,
    risk_reports: Vec<RiskReport>,
    feedback: Vec<Feedback>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn user_logs(&self, username: &str) -> Vec<LogEntry> {
        self.tables
            .read()
            .await
            .logs
            .iter()
            .filter(|e| e.username == username)
            .cloned()
            .collect()
    }

    #[cfg(test)]
    pub async fn risk_reports(&self) -> Vec<RiskReport> {
        self.tables.read().await.risk_reports.clone()
    }

    #[cfg(test)]
    pub async fn feedback(&self) -> Vec<Feedback> {
        self.tables.read().await.feedback.clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn create_user(&self, user: User) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.username == user.username) {
            return Err(StoreError::Duplicate(format!("username {}", user.username)));
        }
        if tables.users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate(format!("email {}", user.email)));
        }
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn update_password(&self, username: &str, password_hash: &str) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(user) = tables.users.iter_mut().find(|u| u.username == username) {
            user.password_hash = password_hash.to_string();
        }
        Ok(())
    }

    async fn append_log(&self, entry: LogEntry) -> StoreResult<LogEntry> {
        self.tables.write().await.logs.push(entry.clone());
        Ok(entry)
    }

    async fn logs_for_user(&self, username: &str) -> StoreResult<Vec<LogEntry>> {
        let mut logs = self.user_logs(username).await;
        logs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(logs)
    }

    async fn user_stats(&self, username: &str) -> StoreResult<UserStats> {
        Ok(stats::user_stats(&self.user_logs(username).await))
    }

    async fn chart_data(&self, username: &str, filter: ChartFilter) -> StoreResult<Vec<ChartPoint>> {
        Ok(stats::chart_by_day(&self.user_logs(username).await, filter))
    }

    async fn type_stats(&self, username: &str) -> StoreResult<Vec<ChartPoint>> {
        Ok(stats::type_breakdown(&self.user_logs(username).await))
    }

    async fn append_risk_report(&self, report: RiskReport) -> StoreResult<()> {
        self.tables.write().await.risk_reports.push(report);
        Ok(())
    }

    async fn append_feedback(&self, feedback: Feedback) -> StoreResult<()> {
        self.tables.write().await.feedback.push(feedback);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{DetectionRequest, Verdict};
    use chrono::Duration;

    #[tokio::test]
    async fn test_logs_are_per_user_newest_first() {
        let store = MemoryStore::new();
        let mut older = LogEntry::new(&DetectionRequest::text("one", "alice"), &Verdict::new("Real", 0.9));
        older.timestamp -= Duration::hours(1);
        let newer = LogEntry::new(&DetectionRequest::text("two", "alice"), &Verdict::new("Fake (AI)", 0.9));
        let other = LogEntry::new(&DetectionRequest::text("three", "bob"), &Verdict::new("Real", 0.9));

        store.append_log(older.clone()).await.unwrap();
        store.append_log(newer.clone()).await.unwrap();
        store.append_log(other).await.unwrap();

        assert_eq!(store.logs_for_user("alice").await.unwrap(), vec![newer, older]);
        assert_eq!(store.user_stats("alice").await.unwrap().safety_score, 50);
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let store = MemoryStore::new();
        store
            .create_user(User::new("alice".into(), "a@example.com".into(), "h".into()))
            .await
            .unwrap();
        let err = store
            .create_user(User::new("alice".into(), "other@example.com".into(), "h".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_update_password() {
        let store = MemoryStore::new();
        store
            .create_user(User::new("alice".into(), "a@example.com".into(), "old".into()))
            .await
            .unwrap();
        tokio_test::assert_ok!(store.update_password("alice", "new").await);
        // unknown users are a no-op
        tokio_test::assert_ok!(store.update_password("nobody", "x").await);
        let user = store.find_user_by_username("alice").await.unwrap().unwrap();
        assert_eq!(user.password_hash, "new");
    }
}
