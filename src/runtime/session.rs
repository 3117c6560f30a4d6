/// Test-listen sessions
///
/// An editor can ask to capture the next webhook run of a workflow. The
/// sessions live in a caller-owned `TestSessions` value with a TTL; nothing
/// here is global.

use crate::runtime::record::ExecutionRecord;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{collections::HashMap, time::Duration};
use tokio::{sync::Mutex, time::Instant};

/// State reported to a polling client
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SessionPoll {
    /// No session for this workflow
    Idle,
    /// Waiting for the next webhook
    #[serde(rename_all = "camelCase")]
    Listening { expires_at: DateTime<Utc> },
    /// A run was captured; the session is consumed by this poll
    Captured { execution: Box<ExecutionRecord> },
    /// The session ran out before a webhook arrived
    Expired,
}

#[derive(Debug)]
struct Session {
    deadline: Instant,
    expires_at: DateTime<Utc>,
    captured: Option<ExecutionRecord>,
}

impl Session {
    fn is_expired(&self, now: Instant) -> bool {
        self.captured.is_none() && now >= self.deadline
    }
}

/// TTL-bound capture sessions keyed by workflow id
#[derive(Debug)]
pub struct TestSessions {
    ttl: Duration,
    sessions: Mutex<HashMap<String, Session>>,
}

impl TestSessions {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Open (or restart) a session; returns when it expires
    pub async fn start(&self, workflow_id: &str) -> DateTime<Utc> {
        let mut sessions = self.sessions.lock().await;
        Self::purge(&mut sessions, Instant::now());

        let expires_at = Utc::now() + chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::zero());
        sessions.insert(
            workflow_id.to_string(),
            Session {
                deadline: Instant::now() + self.ttl,
                expires_at,
                captured: None,
            },
        );
        tracing::info!("👂 Listening for test webhook on '{}' until {}", workflow_id, expires_at);
        expires_at
    }

    /// Hand a finished run to a waiting session
    ///
    /// Returns false when no live, still-empty session exists for the workflow.
    pub async fn deposit(&self, workflow_id: &str, record: &ExecutionRecord) -> bool {
        let mut sessions = self.sessions.lock().await;
        let now = Instant::now();
        match sessions.get_mut(workflow_id) {
            Some(session) if session.captured.is_none() && !session.is_expired(now) => {
                session.captured = Some(record.clone());
                tracing::info!("📥 Captured execution {} for test session '{}'", record.id, workflow_id);
                true
            }
            _ => false,
        }
    }

    /// Current state of a workflow's session
    pub async fn poll(&self, workflow_id: &str) -> SessionPoll {
        let mut sessions = self.sessions.lock().await;
        let now = Instant::now();

        let Some(session) = sessions.get(workflow_id) else {
            return SessionPoll::Idle;
        };
        if session.is_expired(now) {
            sessions.remove(workflow_id);
            return SessionPoll::Expired;
        }
        if session.captured.is_none() {
            return SessionPoll::Listening {
                expires_at: session.expires_at,
            };
        }

        match sessions.remove(workflow_id).and_then(|session| session.captured) {
            Some(record) => SessionPoll::Captured {
                execution: Box::new(record),
            },
            None => SessionPoll::Idle,
        }
    }

    fn purge(sessions: &mut HashMap<String, Session>, now: Instant) {
        sessions.retain(|workflow_id, session| {
            let keep = !session.is_expired(now);
            if !keep {
                tracing::debug!("🧹 Dropping expired test session '{}'", workflow_id);
            }
            keep
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_capture_is_consumed_by_poll() {
        let sessions = TestSessions::new(Duration::from_secs(60));
        assert_eq!(sessions.poll("wf").await, SessionPoll::Idle);

        let record = ExecutionRecord::pending("wf", json!({ "amount": 1 }));
        assert!(!sessions.deposit("wf", &record).await);

        sessions.start("wf").await;
        assert!(matches!(sessions.poll("wf").await, SessionPoll::Listening { .. }));

        assert!(sessions.deposit("wf", &record).await);
        let second = ExecutionRecord::pending("wf", json!({ "amount": 2 }));
        assert!(!sessions.deposit("wf", &second).await);

        match sessions.poll("wf").await {
            SessionPoll::Captured { execution } => assert_eq!(execution.id, record.id),
            other => panic!("expected captured, got {:?}", other),
        }
        assert_eq!(sessions.poll("wf").await, SessionPoll::Idle);
    }

    #[tokio::test]
    async fn test_expired_session_rejects_deposit() {
        let sessions = TestSessions::new(Duration::ZERO);
        sessions.start("wf").await;

        let record = ExecutionRecord::pending("wf", json!(null));
        assert!(!sessions.deposit("wf", &record).await);
        assert_eq!(sessions.poll("wf").await, SessionPoll::Expired);
        assert_eq!(sessions.poll("wf").await, SessionPoll::Idle);
    }

    #[test]
    fn test_poll_serialization() {
        let value = serde_json::to_value(SessionPoll::Expired).unwrap();
        assert_eq!(value, json!({ "status": "expired" }));
    }
}
