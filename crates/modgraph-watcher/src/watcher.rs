//! Per-root filesystem watching with shared watchers and debounced signals

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{timeout, Instant};
use tracing::{debug, error, info};

/// Directories whose churn never warrants re-extraction.
const NOISE_DIRS: &[&str] = &[".git", "node_modules"];

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("failed to watch {}: {source}", path.display())]
    Notify {
        path: PathBuf,
        source: notify::Error,
    },

    #[error("cannot watch {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("watching requires a running tokio runtime")]
    NoRuntime,
}

/// Burst coalescing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchConfig {
    /// How long the tree must stay quiet before subscribers hear about it.
    pub quiet_period: Duration,
    /// Upper bound on how long a continuous burst can delay the signal.
    pub max_batch_wait: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            quiet_period: Duration::from_millis(250),
            max_batch_wait: Duration::from_secs(2),
        }
    }
}

type Callback = Arc<dyn Fn() + Send + Sync>;
type Subscribers = Arc<DashMap<u64, Callback>>;
type Roots = DashMap<PathBuf, RootWatch>;

/// One notify watcher and its debounce task, shared by every subscriber of a root.
struct RootWatch {
    _watcher: RecommendedWatcher,
    subscribers: Subscribers,
    degraded: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl RootWatch {
    fn start(root: &Path, config: WatchConfig, runtime: &Handle) -> Result<Self, WatchError> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let degraded = Arc::new(AtomicBool::new(false));

        let callback_root = root.to_path_buf();
        let callback_degraded = Arc::clone(&degraded);
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            forward_event(&callback_root, &callback_degraded, &event_tx, res)
        })
        .map_err(|source| WatchError::Notify {
            path: root.to_path_buf(),
            source,
        })?;

        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(|source| WatchError::Notify {
                path: root.to_path_buf(),
                source,
            })?;

        let subscribers: Subscribers = Arc::new(DashMap::new());
        let task = runtime.spawn(debounce(
            event_rx,
            Arc::clone(&subscribers),
            config,
            root.to_path_buf(),
        ));

        info!("Watching directory: {}", root.display());
        Ok(Self {
            _watcher: watcher,
            subscribers,
            degraded,
            task,
        })
    }
}

impl Drop for RootWatch {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Notify callback body: pass real changes on to the debounce task, and
/// mark the root degraded on any watcher error.
fn forward_event(
    root: &Path,
    degraded: &AtomicBool,
    events: &mpsc::UnboundedSender<()>,
    res: Result<notify::Event, notify::Error>,
) {
    match res {
        Ok(event) => {
            if is_change(root, &event) {
                debug!("File system event: {:?}", event);
                let _ = events.send(());
            }
        }
        Err(e) => {
            error!("File system watch error under {}: {}", root.display(), e);
            degraded.store(true, Ordering::SeqCst);
        }
    }
}

/// Wait for a burst to settle, then signal every subscriber once.
async fn debounce(
    mut events: mpsc::UnboundedReceiver<()>,
    subscribers: Subscribers,
    config: WatchConfig,
    root: PathBuf,
) {
    while events.recv().await.is_some() {
        let deadline = Instant::now() + config.max_batch_wait;
        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let wait = config.quiet_period.min(deadline - now);
            match timeout(wait, events.recv()).await {
                Ok(Some(())) => continue,
                Ok(None) => return,
                Err(_) => break,
            }
        }

        let callbacks: Vec<Callback> = subscribers.iter().map(|s| Arc::clone(s.value())).collect();
        debug!("Changes settled under {}, notifying {} subscribers", root.display(), callbacks.len());
        for callback in callbacks {
            callback();
        }
    }
}

/// Create, modify and remove events outside the noise directories.
fn is_change(root: &Path, event: &notify::Event) -> bool {
    use notify::EventKind;

    if !matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) {
        return false;
    }
    event.paths.iter().any(|path| !is_noise(root, path))
}

fn is_noise(root: &Path, path: &Path) -> bool {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative.components().any(|component| {
        component
            .as_os_str()
            .to_str()
            .is_some_and(|name| NOISE_DIRS.contains(&name))
    })
}

/// Registry of watched roots. Subscribers of the same root share one watcher;
/// the watcher stops when the last subscription is released.
pub struct WatchRegistry {
    roots: Arc<Roots>,
    next_id: AtomicU64,
    config: WatchConfig,
}

impl WatchRegistry {
    pub fn new() -> Self {
        Self::with_config(WatchConfig::default())
    }

    pub fn with_config(config: WatchConfig) -> Self {
        Self {
            roots: Arc::new(DashMap::new()),
            next_id: AtomicU64::new(0),
            config,
        }
    }

    /// Call `on_change` after each settled burst of changes under `root`.
    /// Must be called from within a tokio runtime.
    pub fn subscribe<F>(&self, root: impl AsRef<Path>, on_change: F) -> Result<Subscription, WatchError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let root = canonical_root(root.as_ref())?;
        let runtime = Handle::try_current().map_err(|_| WatchError::NoRuntime)?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let callback: Callback = Arc::new(on_change);

        match self.roots.entry(root.clone()) {
            Entry::Occupied(entry) => {
                entry.get().subscribers.insert(id, callback);
            }
            Entry::Vacant(entry) => {
                let watch = RootWatch::start(&root, self.config, &runtime)?;
                watch.subscribers.insert(id, callback);
                entry.insert(watch);
            }
        }

        Ok(Subscription {
            roots: Arc::downgrade(&self.roots),
            root,
            id,
            active: true,
        })
    }

    pub fn is_watching(&self, root: impl AsRef<Path>) -> bool {
        self.roots.contains_key(&lookup_key(root.as_ref()))
    }

    pub fn subscriber_count(&self, root: impl AsRef<Path>) -> usize {
        self.roots
            .get(&lookup_key(root.as_ref()))
            .map(|watch| watch.subscribers.len())
            .unwrap_or(0)
    }

    /// Whether the watcher for `root` has reported an error since it started.
    pub fn is_degraded(&self, root: impl AsRef<Path>) -> bool {
        self.roots
            .get(&lookup_key(root.as_ref()))
            .is_some_and(|watch| watch.degraded.load(Ordering::SeqCst))
    }

    pub fn watched_roots(&self) -> Vec<PathBuf> {
        self.roots.iter().map(|entry| entry.key().clone()).collect()
    }
}

impl Default for WatchRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn canonical_root(root: &Path) -> Result<PathBuf, WatchError> {
    root.canonicalize().map_err(|source| WatchError::Io {
        path: root.to_path_buf(),
        source,
    })
}

fn lookup_key(root: &Path) -> PathBuf {
    root.canonicalize().unwrap_or_else(|_| root.to_path_buf())
}

/// A live subscription. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    roots: Weak<Roots>,
    root: PathBuf,
    id: u64,
    active: bool,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("root", &self.root)
            .field("id", &self.id)
            .field("active", &self.active)
            .finish()
    }
}

impl Subscription {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !std::mem::replace(&mut self.active, false) {
            return;
        }
        let Some(roots) = self.roots.upgrade() else {
            return;
        };

        if let Some(watch) = roots.get(&self.root) {
            watch.subscribers.remove(&self.id);
        }
        if roots
            .remove_if(&self.root, |_, watch| watch.subscribers.is_empty())
            .is_some()
        {
            info!("Stopped watching directory: {}", self.root.display());
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}
