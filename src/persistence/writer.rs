use std::sync::Arc;

use log::{debug, error};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};

use super::{PersistenceGateway, StorageKey};
use crate::error::PersistenceError;

/// Called from the writer task whenever a durable write is rejected.
pub type FailureHook = Arc<dyn Fn(StorageKey, &PersistenceError) + Send + Sync>;

enum WriteCommand {
    Put { key: StorageKey, value: String },
    Flush(oneshot::Sender<()>),
}

/// Fire-and-forget persistence. Writes are queued synchronously and applied one at a
/// time in queue order by a single background task, so the last enqueued snapshot of
/// a key is always the one that ends up on disk.
#[derive(Clone)]
pub struct PersistenceWriter {
    tx: mpsc::UnboundedSender<WriteCommand>,
}

impl PersistenceWriter {
    /// Must be called from within a tokio runtime. The task ends once every
    /// writer clone has been dropped and the queue is drained.
    pub fn spawn(gateway: PersistenceGateway, on_failure: FailureHook) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<WriteCommand>();

        let handle = tokio::spawn(async move {
            while let Some(command) = rx.recv().await {
                match command {
                    WriteCommand::Put { key, value } => {
                        match gateway.write(key, &value).await {
                            Ok(()) => debug!("[STORE] persisted {key} ({} bytes)", value.len()),
                            Err(err) => {
                                error!("[STORE] write of {key} failed: {err}");
                                on_failure(key, &err);
                            }
                        }
                    }
                    WriteCommand::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
            debug!("[STORE] persistence writer stopped");
        });

        (Self { tx }, handle)
    }

    /// Queue a full-value overwrite of `key`. Returns false if the writer is gone.
    pub fn enqueue(&self, key: StorageKey, value: String) -> bool {
        if self.tx.send(WriteCommand::Put { key, value }).is_err() {
            error!("[STORE] persistence writer closed, dropping write of {key}");
            return false;
        }
        true
    }

    /// Wait until every write queued before this call has been attempted.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(WriteCommand::Flush(done_tx)).is_err() {
            return;
        }
        let _ = done_rx.await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::persistence::{KeyValueStore, MemoryStore};

    #[tokio::test]
    async fn later_writes_win_in_order() {
        let store = Arc::new(MemoryStore::new());
        let gateway = PersistenceGateway::new(store.clone(), "t");
        let (writer, _task) = PersistenceWriter::spawn(
            gateway,
            Arc::new(|_: StorageKey, _: &PersistenceError| {}),
        );

        for n in 0..50 {
            assert!(writer.enqueue(StorageKey::Language, format!("v{n}")));
        }
        writer.flush().await;

        assert_eq!(store.get("t_language").await.unwrap().as_deref(), Some("v49"));
    }

    struct RejectingStore;

    #[async_trait::async_trait]
    impl KeyValueStore for RejectingStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, PersistenceError> {
            Ok(None)
        }

        async fn set(&self, key: &str, _value: &str) -> Result<(), PersistenceError> {
            Err(PersistenceError::WriteFailed {
                key: key.to_string(),
                reason: "disk full".into(),
            })
        }
    }

    #[tokio::test]
    async fn failures_reach_the_hook() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let gateway = PersistenceGateway::new(Arc::new(RejectingStore), "t");
        let (writer, _task) = PersistenceWriter::spawn(
            gateway,
            Arc::new(move |key: StorageKey, _: &PersistenceError| {
                sink.lock().unwrap().push(key)
            }),
        );

        writer.enqueue(StorageKey::Reports, "[]".into());
        writer.flush().await;

        assert_eq!(*seen.lock().unwrap(), vec![StorageKey::Reports]);
    }
}
