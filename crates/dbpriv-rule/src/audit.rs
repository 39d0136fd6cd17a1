//! Best-effort audit trail of rule mutations
//!
//! Records are queued on a bounded channel and written by a detached task.
//! A full queue, a stopped writer or a failed write is logged and the record
//! is dropped; the mutation that produced it is never affected.

use std::sync::Arc;

use dbpriv_persistence::{NewPrivLog, PersistenceService, PrivLogPersistence};
use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::warn;

pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Producer side of the audit queue
#[derive(Clone, Debug)]
pub struct AuditSink {
    tx: mpsc::Sender<NewPrivLog>,
}

impl AuditSink {
    /// Start the writer task. It exits once every sink clone is dropped and
    /// the queue is drained.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        persistence: Arc<dyn PersistenceService>,
        capacity: usize,
    ) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<NewPrivLog>(capacity.max(1));

        let handle = tokio::spawn(async move {
            while let Some(log) = rx.recv().await {
                let bk_biz_id = log.bk_biz_id;
                let ticket = log.ticket.clone();
                if let Err(e) = persistence.priv_log_create(log).await {
                    warn!(bk_biz_id, ticket = %ticket, error = %e, "failed to write priv log");
                }
            }
        });

        (Self { tx }, handle)
    }

    /// Queue a record without waiting
    pub fn record(&self, log: NewPrivLog) {
        match self.tx.try_send(log) {
            Ok(()) => {}
            Err(TrySendError::Full(log)) => {
                warn!(
                    bk_biz_id = log.bk_biz_id,
                    ticket = %log.ticket,
                    "priv log queue is full, record dropped"
                );
            }
            Err(TrySendError::Closed(log)) => {
                warn!(
                    bk_biz_id = log.bk_biz_id,
                    ticket = %log.ticket,
                    "priv log writer stopped, record dropped"
                );
            }
        }
    }
}

/// Build an audit record carrying the serialized request
pub fn priv_log<T: Serialize>(bk_biz_id: i64, ticket: &str, operator: &str, para: &T) -> NewPrivLog {
    NewPrivLog {
        bk_biz_id,
        ticket: ticket.to_string(),
        operator: operator.to_string(),
        para: serde_json::to_string(para).unwrap_or_default(),
        execute_time: chrono::Local::now().naive_local(),
    }
}
