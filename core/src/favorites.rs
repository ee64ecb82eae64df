//! Reactive favorites store.
//!
//! Mutations are queued onto a dedicated writer runtime and applied in
//! submission order against the single SQLite connection. Readers never touch
//! the database: they observe immutable snapshots published through a
//! `watch` channel after every committed change.
//!
//! Commits made through other connections to the same file are picked up by
//! polling SQLite's `data_version` and republished like local writes.
//!
//! [`FavoritesStore::contains`] reads the last published snapshot, so it can
//! lag a mutation that is still queued. Use
//! [`FavoritesStore::contains_settled`] when the answer must account for
//! everything submitted so far.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::runtime::{Handle, Runtime};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

use crate::db::Database;
use crate::models::FavoriteMeal;

/// Number of writer threads backing the store.
pub const WRITER_THREADS: usize = 4;

/// How often the store checks the file for commits from other connections.
pub const EXTERNAL_POLL_INTERVAL: Duration = Duration::from_millis(250);

type Snapshot = Arc<Vec<FavoriteMeal>>;
type JobQueue = Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<Job>>>;
type QueueGuard<'a> = tokio::sync::MutexGuard<'a, mpsc::UnboundedReceiver<Job>>;

enum Job {
    Insert(FavoriteMeal),
    Delete(String),
    Clear,
    Lookup(String, oneshot::Sender<Option<FavoriteMeal>>),
    Settle(oneshot::Sender<()>),
}

struct Shared {
    db: Mutex<Database>,
    published: watch::Sender<Snapshot>,
}

impl Shared {
    /// Apply one job. The database lock is taken before the queue guard is
    /// released, which keeps commit order equal to submission order even
    /// with several writers.
    fn commit(&self, job: Job, queue: QueueGuard<'_>) {
        let db = self.db.lock().unwrap_or_else(PoisonError::into_inner);
        drop(queue);

        match job {
            Job::Insert(meal) => match db.insert_favorite(&meal) {
                Ok(true) => {
                    tracing::debug!(meal_id = %meal.meal_id, "favorite inserted");
                    self.republish(&db);
                }
                Ok(false) => {
                    tracing::debug!(meal_id = %meal.meal_id, "favorite already present, ignored");
                }
                Err(e) => {
                    tracing::warn!(meal_id = %meal.meal_id, "failed to insert favorite: {e:#}");
                }
            },
            Job::Delete(meal_id) => match db.delete_favorite(&meal_id) {
                Ok(true) => {
                    tracing::debug!(%meal_id, "favorite deleted");
                    self.republish(&db);
                }
                Ok(false) => tracing::debug!(%meal_id, "favorite not present, delete ignored"),
                Err(e) => tracing::warn!(%meal_id, "failed to delete favorite: {e:#}"),
            },
            Job::Clear => match db.clear_favorites() {
                Ok(0) => {}
                Ok(count) => {
                    tracing::debug!(count, "favorites cleared");
                    self.republish(&db);
                }
                Err(e) => tracing::warn!("failed to clear favorites: {e:#}"),
            },
            Job::Lookup(meal_id, reply) => {
                let found = db.get_favorite(&meal_id).unwrap_or_else(|e| {
                    tracing::warn!(%meal_id, "favorite lookup failed: {e:#}");
                    self.published
                        .borrow()
                        .iter()
                        .find(|m| m.meal_id == meal_id)
                        .cloned()
                });
                let _ = reply.send(found);
            }
            Job::Settle(reply) => {
                let _ = reply.send(());
            }
        }
    }

    /// Reload the table and publish it if it differs from the last snapshot.
    fn republish(&self, db: &Database) {
        match db.list_favorites() {
            Ok(all) => {
                self.published.send_if_modified(|current| {
                    if **current == all {
                        false
                    } else {
                        *current = Arc::new(all);
                        true
                    }
                });
            }
            Err(e) => tracing::warn!("failed to reload favorites: {e:#}"),
        }
    }

    fn sync_external(&self, last_version: &mut i64) {
        let db = self.db.lock().unwrap_or_else(PoisonError::into_inner);
        match db.data_version() {
            Ok(version) if version != *last_version => {
                tracing::debug!(version, "favorites changed by another connection");
                *last_version = version;
                self.republish(&db);
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("failed to read favorites data version: {e:#}"),
        }
    }
}

async fn watch_external(mut last_version: i64, shared: Arc<Shared>) {
    let mut tick = interval(EXTERNAL_POLL_INTERVAL);
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tick.tick().await;
        shared.sync_external(&mut last_version);
    }
}

async fn run_writer(worker: usize, queue: JobQueue, shared: Arc<Shared>) {
    loop {
        let mut rx = queue.lock().await;
        let Some(job) = rx.recv().await else {
            tracing::debug!(worker, "favorites queue closed, writer exiting");
            return;
        };
        shared.commit(job, rx);
    }
}

/// Durable, observable collection of bookmarked meals.
///
/// Construct one per application and hand references to every consumer.
/// Dropping the store abandons jobs that have not been applied yet; await
/// [`FavoritesStore::settled`] first when that matters.
pub struct FavoritesStore {
    queue: mpsc::UnboundedSender<Job>,
    snapshot: watch::Receiver<Snapshot>,
    handle: Handle,
    runtime: Option<Runtime>,
}

impl FavoritesStore {
    pub fn open(path: &Path) -> Result<Self> {
        Self::with_database(Database::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_database(Database::open_in_memory()?)
    }

    pub fn with_database(db: Database) -> Result<Self> {
        Self::with_workers(db, WRITER_THREADS)
    }

    pub fn with_workers(db: Database, workers: usize) -> Result<Self> {
        let workers = workers.max(1);
        let initial = db.list_favorites().context("Failed to load favorites")?;
        let version = db.data_version().context("Failed to read favorites data version")?;
        tracing::debug!(count = initial.len(), "favorites loaded");

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(workers)
            .thread_name("favorites-writer")
            .enable_time()
            .build()
            .context("Failed to start favorites writer pool")?;

        let (published, snapshot) = watch::channel(Arc::new(initial));
        let shared = Arc::new(Shared {
            db: Mutex::new(db),
            published,
        });

        let (queue, rx) = mpsc::unbounded_channel();
        let rx: JobQueue = Arc::new(tokio::sync::Mutex::new(rx));
        for worker in 0..workers {
            runtime.spawn(run_writer(worker, Arc::clone(&rx), Arc::clone(&shared)));
        }
        runtime.spawn(watch_external(version, shared));

        Ok(Self {
            queue,
            snapshot,
            handle: runtime.handle().clone(),
            runtime: Some(runtime),
        })
    }

    fn submit(&self, job: Job) -> bool {
        if self.queue.send(job).is_err() {
            tracing::warn!("favorites writer pool is gone, dropping mutation");
            return false;
        }
        true
    }

    /// Queue an insert. Ignored if `meal.meal_id` is already bookmarked.
    pub fn insert(&self, meal: FavoriteMeal) {
        tracing::debug!(meal_id = %meal.meal_id, name = %meal.name, "queueing favorite insert");
        self.submit(Job::Insert(meal));
    }

    /// Queue a delete. Ignored if `meal_id` is not bookmarked.
    pub fn delete(&self, meal_id: &str) {
        tracing::debug!(%meal_id, "queueing favorite delete");
        self.submit(Job::Delete(meal_id.to_string()));
    }

    /// Queue removal of every favorite.
    pub fn clear(&self) {
        tracing::debug!("queueing favorites clear");
        self.submit(Job::Clear);
    }

    /// Membership test against the last published snapshot.
    ///
    /// Does not wait for queued mutations, so it may briefly disagree with an
    /// insert or delete that has been submitted but not yet applied.
    #[must_use]
    pub fn contains(&self, meal_id: &str) -> bool {
        self.snapshot.borrow().iter().any(|m| m.meal_id == meal_id)
    }

    /// Membership test ordered after every mutation submitted before it.
    pub async fn contains_settled(&self, meal_id: &str) -> bool {
        self.get_settled(meal_id).await.is_some()
    }

    /// Stored record for `meal_id`, read after every mutation submitted
    /// before this call. Falls back to the snapshot if the read fails.
    pub async fn get_settled(&self, meal_id: &str) -> Option<FavoriteMeal> {
        let from_snapshot = || {
            self.snapshot
                .borrow()
                .iter()
                .find(|m| m.meal_id == meal_id)
                .cloned()
        };
        let (tx, rx) = oneshot::channel();
        if !self.submit(Job::Lookup(meal_id.to_string(), tx)) {
            return from_snapshot();
        }
        rx.await.unwrap_or_else(|_| from_snapshot())
    }

    /// Resolves once every mutation submitted before this call is applied.
    pub async fn settled(&self) {
        let (tx, rx) = oneshot::channel();
        if self.submit(Job::Settle(tx)) {
            let _ = rx.await;
        }
    }

    /// Last published collection.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Vec<FavoriteMeal>> {
        Arc::clone(&self.snapshot.borrow())
    }

    /// Live view over the whole collection.
    #[must_use]
    pub fn get_all(&self) -> LiveView<Vec<FavoriteMeal>> {
        LiveView::new(
            self.snapshot.clone(),
            self.handle.clone(),
            Arc::new(|all: &[FavoriteMeal]| all.to_vec()),
        )
    }

    /// Live view over a single key.
    #[must_use]
    pub fn get(&self, meal_id: &str) -> LiveView<Option<FavoriteMeal>> {
        let meal_id = meal_id.to_string();
        LiveView::new(
            self.snapshot.clone(),
            self.handle.clone(),
            Arc::new(move |all: &[FavoriteMeal]| {
                all.iter().find(|m| m.meal_id == meal_id).cloned()
            }),
        )
    }

    /// Run `callback` with the current collection and again after each change.
    pub fn observe<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(Vec<FavoriteMeal>) + Send + 'static,
    {
        self.get_all().subscribe(callback)
    }
}

impl Drop for FavoritesStore {
    fn drop(&mut self) {
        if let Some(rt) = self.runtime.take() {
            rt.shutdown_background();
        }
    }
}

type Projection<T> = Arc<dyn Fn(&[FavoriteMeal]) -> T + Send + Sync>;

/// A read handle that follows the store's published snapshots.
///
/// Each view tracks the last value it handed out, so [`LiveView::changed`]
/// only wakes when the projected value actually differs.
pub struct LiveView<T> {
    rx: watch::Receiver<Snapshot>,
    handle: Handle,
    project: Projection<T>,
    last: T,
}

impl<T> LiveView<T>
where
    T: Clone + PartialEq + Send + 'static,
{
    fn new(rx: watch::Receiver<Snapshot>, handle: Handle, project: Projection<T>) -> Self {
        let last = project(&rx.borrow());
        Self {
            rx,
            handle,
            project,
            last,
        }
    }

    /// Value as of the latest published snapshot.
    #[must_use]
    pub fn current(&self) -> T {
        (self.project)(&self.rx.borrow())
    }

    /// Wait for a value different from the one this view last returned.
    /// Returns `None` once the store has shut down.
    pub async fn changed(&mut self) -> Option<T> {
        loop {
            let now = (self.project)(&self.rx.borrow_and_update());
            if now != self.last {
                self.last = now.clone();
                return Some(now);
            }
            if self.rx.changed().await.is_err() {
                return None;
            }
        }
    }

    /// Wait until the projected value satisfies `pred`.
    pub async fn wait_for(&mut self, mut pred: impl FnMut(&T) -> bool) -> Option<T> {
        loop {
            let now = (self.project)(&self.rx.borrow_and_update());
            if pred(&now) {
                self.last = now.clone();
                return Some(now);
            }
            if self.rx.changed().await.is_err() {
                return None;
            }
        }
    }

    /// Deliver the current value, then every change, to `callback` until the
    /// returned handle is dropped.
    ///
    /// The callback runs on the caller's runtime, or on the store's writer
    /// runtime when called outside of one.
    pub fn subscribe<F>(mut self, mut callback: F) -> Subscription
    where
        F: FnMut(T) + Send + 'static,
    {
        let handle = Handle::try_current().unwrap_or_else(|_| self.handle.clone());
        let task = handle.spawn(async move {
            callback(self.last.clone());
            while let Some(value) = self.changed().await {
                callback(value);
            }
        });
        Subscription { task }
    }
}

/// Owned observer registration. Dropping it unsubscribes.
pub struct Subscription {
    task: JoinHandle<()>,
}

impl Subscription {
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}
