/// Execution record storage
///
/// Finished records are handed to an `ExecutionLog`. The in-memory log keeps
/// the most recent runs so they can be fetched over the API.

use crate::runtime::record::ExecutionRecord;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use tokio::sync::RwLock;

/// Sink for finished execution records
#[async_trait]
pub trait ExecutionLog: Send + Sync {
    /// Store a finished record
    async fn store(&self, record: ExecutionRecord);

    /// Fetch a record by execution id
    async fn get(&self, execution_id: &str) -> Option<ExecutionRecord>;
}

/// Bounded in-memory execution log
///
/// Evicts the oldest record once `capacity` is reached.
#[derive(Debug)]
pub struct MemoryExecutionLog {
    capacity: usize,
    inner: RwLock<LogInner>,
}

#[derive(Debug, Default)]
struct LogInner {
    records: HashMap<String, ExecutionRecord>,
    arrival: VecDeque<String>,
}

impl MemoryExecutionLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: RwLock::new(LogInner::default()),
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }
}

impl Default for MemoryExecutionLog {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[async_trait]
impl ExecutionLog for MemoryExecutionLog {
    async fn store(&self, record: ExecutionRecord) {
        let mut inner = self.inner.write().await;
        let id = record.id.clone();
        if inner.records.insert(id.clone(), record).is_none() {
            inner.arrival.push_back(id);
        }
        while inner.arrival.len() > self.capacity {
            if let Some(oldest) = inner.arrival.pop_front() {
                inner.records.remove(&oldest);
                tracing::debug!("🧹 Evicted execution record {}", oldest);
            }
        }
    }

    async fn get(&self, execution_id: &str) -> Option<ExecutionRecord> {
        self.inner.read().await.records.get(execution_id).cloned()
    }
}
