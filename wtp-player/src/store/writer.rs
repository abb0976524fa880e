//! Background session writer
//!
//! Durable writes for one session run on their own task so a slow disk never
//! stalls the tick loop. Operations apply in the order they were queued. A
//! save followed by another queued save is skipped; only the newest record
//! is written.

use crate::store::session::{PersistedSession, SessionStore};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use wtp_common::events::{EventBus, PlayerEvent};

enum WriteOp {
    Save(PersistedSession),
    Clear,
    Flush(oneshot::Sender<()>),
}

/// Handle to the writer task of one session
pub struct SessionWriter {
    tx: mpsc::UnboundedSender<WriteOp>,
    task: JoinHandle<()>,
}

impl SessionWriter {
    /// Spawn the writer task. Must be called inside a tokio runtime.
    ///
    /// Failed saves are reported as `PersistenceFailed` on `events`.
    pub fn spawn(store: SessionStore, session_id: String, events: EventBus) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_writer(store, session_id, events, rx));
        Self { tx, task }
    }

    /// Queue a stamped record. Returns whether it was queued.
    pub fn save(&self, record: PersistedSession) -> bool {
        self.send(WriteOp::Save(record))
    }

    /// Queue deletion of the record, ordered after every pending save
    pub fn clear(&self) -> bool {
        self.send(WriteOp::Clear)
    }

    /// Wait until everything queued so far has been applied
    pub async fn flush(&self) {
        let (done, applied) = oneshot::channel();
        if self.send(WriteOp::Flush(done)) {
            let _ = applied.await;
        }
    }

    /// Apply everything queued, then stop the task
    pub async fn close(self) {
        drop(self.tx);
        if let Err(e) = self.task.await {
            warn!("Session writer task failed: {}", e);
        }
    }

    fn send(&self, op: WriteOp) -> bool {
        if self.tx.send(op).is_err() {
            warn!("Session writer is gone");
            return false;
        }
        true
    }
}

async fn run_writer(
    store: SessionStore,
    session_id: String,
    events: EventBus,
    mut rx: mpsc::UnboundedReceiver<WriteOp>,
) {
    while let Some(first) = rx.recv().await {
        let mut batch = vec![first];
        while let Ok(op) = rx.try_recv() {
            batch.push(op);
        }

        let mut ops = batch.into_iter().peekable();
        while let Some(op) = ops.next() {
            match op {
                WriteOp::Save(record) => {
                    if matches!(ops.peek(), Some(WriteOp::Save(_))) {
                        continue;
                    }
                    if !store.write(&session_id, &record).await {
                        events.emit_lossy(PlayerEvent::PersistenceFailed {
                            session_id: session_id.clone(),
                            reason: "durable write failed".to_string(),
                        });
                    }
                }
                WriteOp::Clear => store.clear(&session_id).await,
                WriteOp::Flush(done) => {
                    let _ = done.send(());
                }
            }
        }
    }
    debug!("Session writer for {} stopped", session_id);
}
