//! Debounced, single-flight persistence of one version.
//!
//! Each edited version gets one worker task. Edits send immutable snapshots;
//! the worker waits for a quiet period, then writes the newest one. Saves run
//! inside the worker, so two saves of the same version never overlap.

use crate::session::{SaveTarget, save_version};
use crate::store::{StoreError, VersionSnapshot, VersionStore};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};

pub const DEFAULT_DELAY_MS: u64 = 2000;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SaveStatus {
    #[default]
    Idle,
    Saving,
    Saved(i64),
    Error(String),
}

#[derive(Error, Debug)]
pub enum AutosaveError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Nothing has been edited yet")]
    NothingToSave,
    #[error("Autosave worker has stopped")]
    Stopped,
}

enum Command {
    Schedule(VersionSnapshot),
    Flush(oneshot::Sender<Result<i64, AutosaveError>>),
}

/// Handle to a version's autosave worker. Dropping it cancels the worker.
pub struct Autosave {
    tx: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<SaveStatus>,
    handle: JoinHandle<()>,
}

impl Autosave {
    pub fn spawn<S>(store: Arc<S>, target: SaveTarget, delay: Duration) -> Self
    where
        S: VersionStore + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let (status_tx, status) = watch::channel(SaveStatus::Idle);
        let handle = tokio::spawn(run(store, target, delay, rx, status_tx));
        Self { tx, status, handle }
    }

    /// Replace the pending snapshot and restart the quiet-period timer.
    pub fn schedule(&self, snapshot: VersionSnapshot) {
        if self.tx.send(Command::Schedule(snapshot)).is_err() {
            tracing::warn!("Autosave worker is gone, edit not scheduled");
        }
    }

    /// Save the pending snapshot now and return the version id.
    pub async fn flush(&self) -> Result<i64, AutosaveError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Command::Flush(reply_tx))
            .map_err(|_| AutosaveError::Stopped)?;
        reply_rx.await.map_err(|_| AutosaveError::Stopped)?
    }

    pub fn status(&self) -> watch::Receiver<SaveStatus> {
        self.status.clone()
    }

    pub fn current_status(&self) -> SaveStatus {
        self.status.borrow().clone()
    }

    /// Stop the worker, discarding any pending timer.
    pub fn cancel(&self) {
        self.handle.abort();
    }
}

impl Drop for Autosave {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn run<S: VersionStore>(
    store: Arc<S>,
    mut target: SaveTarget,
    delay: Duration,
    mut rx: mpsc::UnboundedReceiver<Command>,
    status: watch::Sender<SaveStatus>,
) {
    let mut pending: Option<VersionSnapshot> = None;
    let mut deadline: Option<Instant> = None;

    loop {
        let timer = async move {
            match deadline {
                Some(at) => sleep_until(at).await,
                None => futures_util::future::pending::<()>().await,
            }
        };

        tokio::select! {
            cmd = rx.recv() => match cmd {
                Some(Command::Schedule(snapshot)) => {
                    pending = Some(snapshot);
                    deadline = Some(Instant::now() + delay);
                }
                Some(Command::Flush(reply)) => {
                    deadline = None;
                    let result = save_pending(&*store, &mut target, &mut pending, &status).await;
                    let _ = reply.send(result);
                }
                None => break,
            },
            _ = timer => {
                deadline = None;
                let _ = save_pending(&*store, &mut target, &mut pending, &status).await;
            }
        }
    }
    tracing::debug!(version_id = ?target.version_id, "Autosave worker stopped");
}

/// Write `pending` if there is one. A failed save keeps it for the next try.
async fn save_pending<S: VersionStore>(
    store: &S,
    target: &mut SaveTarget,
    pending: &mut Option<VersionSnapshot>,
    status: &watch::Sender<SaveStatus>,
) -> Result<i64, AutosaveError> {
    let Some(snapshot) = pending.as_ref() else {
        return target.version_id.ok_or(AutosaveError::NothingToSave);
    };

    status.send_replace(SaveStatus::Saving);
    match save_version(store, target, snapshot).await {
        Ok(id) => {
            if target.version_id.is_none() {
                tracing::info!(version_id = id, "Created version on first save");
            }
            target.version_id = Some(id);
            *pending = None;
            status.send_replace(SaveStatus::Saved(id));
            Ok(id)
        }
        Err(e) => {
            tracing::warn!(error = %e, version_id = ?target.version_id, "Autosave failed");
            status.send_replace(SaveStatus::Error(e.to_string()));
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrangement::{Arrangement, VoicingSelection};
    use crate::store::{SongKey, SongRecord, VersionRecord, VersionSummary};
    use chrono::Utc;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct RecordingStore {
        inserts: AtomicUsize,
        updates: AtomicUsize,
        fail: AtomicBool,
        last: Mutex<Option<VersionSnapshot>>,
    }

    impl RecordingStore {
        fn saves(&self) -> usize {
            self.inserts.load(Ordering::SeqCst) + self.updates.load(Ordering::SeqCst)
        }

        fn last_placements(&self) -> usize {
            self.last
                .lock()
                .unwrap()
                .as_ref()
                .map_or(0, |s| s.arrangement.placements().len())
        }
    }

    impl VersionStore for RecordingStore {
        async fn find_song(&self, _key: &SongKey) -> Result<Option<SongRecord>, StoreError> {
            Ok(None)
        }

        async fn upsert_song(&self, key: &SongKey) -> Result<SongRecord, StoreError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
            }
            Ok(SongRecord {
                id: 1,
                artist: key.artist.clone(),
                title: key.title.clone(),
                updated_at: Utc::now(),
            })
        }

        async fn get_version(&self, _id: i64) -> Result<Option<VersionRecord>, StoreError> {
            Ok(None)
        }

        async fn latest_version(&self, _song_id: i64) -> Result<Option<VersionRecord>, StoreError> {
            Ok(None)
        }

        async fn list_versions(&self, _song_id: i64) -> Result<Vec<VersionSummary>, StoreError> {
            Ok(Vec::new())
        }

        async fn insert_version(
            &self,
            _song_id: i64,
            _user_id: &str,
            snapshot: &VersionSnapshot,
        ) -> Result<i64, StoreError> {
            let n = self.inserts.fetch_add(1, Ordering::SeqCst);
            *self.last.lock().unwrap() = Some(snapshot.clone());
            Ok(10 + n as i64)
        }

        async fn update_version(
            &self,
            _id: i64,
            _user_id: &str,
            snapshot: &VersionSnapshot,
        ) -> Result<(), StoreError> {
            self.updates.fetch_add(1, Ordering::SeqCst);
            *self.last.lock().unwrap() = Some(snapshot.clone());
            Ok(())
        }

        async fn delete_version(&self, _id: i64, _user_id: &str) -> Result<(), StoreError> {
            Ok(())
        }

        async fn set_featured(&self, _id: i64, _featured: bool) -> Result<(), StoreError> {
            Ok(())
        }
    }

    fn target() -> SaveTarget {
        SaveTarget {
            key: SongKey::new("a", "b"),
            user_id: "me".into(),
            version_id: None,
        }
    }

    fn snapshot_with(placements: usize) -> VersionSnapshot {
        let mut arrangement = Arrangement::new();
        for i in 0..placements {
            arrangement.add_or_replace(i, 10.0, "C", VoicingSelection::Unset);
        }
        VersionSnapshot {
            arrangement,
            lyrics: None,
        }
    }

    const DELAY: Duration = Duration::from_millis(2000);

    #[tokio::test(start_paused = true)]
    async fn bursts_of_edits_coalesce_into_one_save() {
        let store = Arc::new(RecordingStore::default());
        let autosave = Autosave::spawn(store.clone(), target(), DELAY);

        autosave.schedule(snapshot_with(1));
        tokio::time::sleep(Duration::from_millis(500)).await;
        autosave.schedule(snapshot_with(2));
        tokio::time::sleep(Duration::from_millis(500)).await;
        autosave.schedule(snapshot_with(3));

        tokio::time::sleep(Duration::from_millis(1999)).await;
        assert_eq!(store.saves(), 0);
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(store.saves(), 1);
        assert_eq!(store.last_placements(), 3);
        assert_eq!(autosave.current_status(), SaveStatus::Saved(10));
    }

    #[tokio::test(start_paused = true)]
    async fn first_save_inserts_then_updates() {
        let store = Arc::new(RecordingStore::default());
        let autosave = Autosave::spawn(store.clone(), target(), DELAY);

        assert!(matches!(autosave.flush().await, Err(AutosaveError::NothingToSave)));

        autosave.schedule(snapshot_with(1));
        assert_eq!(autosave.flush().await.unwrap(), 10);
        // Nothing pending: no write, same id.
        assert_eq!(autosave.flush().await.unwrap(), 10);

        autosave.schedule(snapshot_with(2));
        tokio::time::sleep(DELAY * 2).await;
        assert_eq!(store.inserts.load(Ordering::SeqCst), 1);
        assert_eq!(store.updates.load(Ordering::SeqCst), 1);
        assert_eq!(store.last_placements(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failures_are_reported_and_retried() {
        let store = Arc::new(RecordingStore::default());
        store.fail.store(true, Ordering::SeqCst);
        let autosave = Autosave::spawn(store.clone(), target(), DELAY);

        autosave.schedule(snapshot_with(1));
        tokio::time::sleep(DELAY * 2).await;
        assert!(matches!(autosave.current_status(), SaveStatus::Error(_)));
        assert_eq!(store.saves(), 0);

        store.fail.store(false, Ordering::SeqCst);
        assert_eq!(autosave.flush().await.unwrap(), 10);
        assert_eq!(store.last_placements(), 1);
        assert_eq!(autosave.current_status(), SaveStatus::Saved(10));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_discards_pending_save() {
        let store = Arc::new(RecordingStore::default());
        let autosave = Autosave::spawn(store.clone(), target(), DELAY);
        autosave.schedule(snapshot_with(1));
        tokio::time::sleep(Duration::from_millis(10)).await;
        autosave.cancel();
        tokio::time::sleep(DELAY * 3).await;
        assert_eq!(store.saves(), 0);
        assert!(matches!(autosave.flush().await, Err(AutosaveError::Stopped)));
    }

    #[tokio::test(start_paused = true)]
    async fn known_version_is_updated_in_place() {
        let store = Arc::new(RecordingStore::default());
        let mut t = target();
        t.version_id = Some(42);
        let autosave = Autosave::spawn(store.clone(), t, DELAY);
        assert_eq!(autosave.flush().await.unwrap(), 42);
        autosave.schedule(snapshot_with(1));
        assert_eq!(autosave.flush().await.unwrap(), 42);
        assert_eq!(store.updates.load(Ordering::SeqCst), 1);
        assert_eq!(store.inserts.load(Ordering::SeqCst), 0);
    }
}
