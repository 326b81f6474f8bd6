// src/watch/watcher.rs

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use notify::event::ModifyKind;
use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher as _};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::config::WatchConfig;
use crate::errors::{Error, Result};
use crate::watch::ignore::IgnoreList;
use crate::watch::pattern::Pattern;

/// Capacity of the coalesced change stream. When full, the dispatch loop
/// blocks on send, back-pressuring the raw event drain.
const CHANGE_STREAM_CAPACITY: usize = 500;

/// A file believed relevant to at least one pattern, after ignore filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: PathBuf,
}

/// Handle for the filesystem watcher.
///
/// The underlying `RecommendedWatcher` lives inside the dispatch task; this
/// handle carries the change stream, the pause flag, and the close signal.
pub struct WatchHandle {
    changes: Option<mpsc::Receiver<ChangeEvent>>,
    pause: Arc<AtomicBool>,
    close_tx: mpsc::Sender<()>,
}

impl std::fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchHandle").finish()
    }
}

impl WatchHandle {
    /// Validate the watch config, register every pattern root with the OS
    /// primitive, and spawn the dispatch loop.
    ///
    /// Any registration failure here (directory vanished, permission denied)
    /// is a startup error.
    pub fn run(cfg: &WatchConfig) -> Result<WatchHandle> {
        let ignore = IgnoreList::new(&cfg.ignore)?;

        let mut patterns: Vec<Pattern> = Vec::with_capacity(cfg.pattern.len());
        for spec in &cfg.pattern {
            let pattern = Pattern::parse(spec)?;
            if !patterns.contains(&pattern) {
                patterns.push(pattern);
            }
        }

        // Channel from the blocking notify callback into the async world.
        // Errors from the OS primitive travel the same channel.
        let (raw_tx, raw_rx) = mpsc::unbounded_channel::<notify::Result<notify::Event>>();

        let watcher = RecommendedWatcher::new(
            move |res: notify::Result<notify::Event>| {
                // A send error means the dispatch loop is gone; nothing left
                // to deliver to.
                let _ = raw_tx.send(res);
            },
            Config::default(),
        )?;

        let (change_tx, change_rx) = mpsc::channel(CHANGE_STREAM_CAPACITY);
        let (close_tx, close_rx) = mpsc::channel(1);
        let pause = Arc::new(AtomicBool::new(false));

        let mut dispatcher = Dispatcher {
            patterns,
            pattern_cache: HashMap::new(),
            watch_set: HashSet::new(),
            ignore,
            watcher,
            change_tx,
            pause: Arc::clone(&pause),
        };

        let roots: Vec<PathBuf> = dispatcher
            .patterns
            .iter()
            .map(|p| p.dir().to_path_buf())
            .collect();
        for root in roots {
            dispatcher.add(&root)?;
        }

        tokio::spawn(dispatcher.dispatch(raw_rx, close_rx));

        Ok(WatchHandle {
            changes: Some(change_rx),
            pause,
            close_tx,
        })
    }

    /// Take the single-consumer change stream. Yields `None` after the first
    /// call.
    pub fn take_stream(&mut self) -> Option<mpsc::Receiver<ChangeEvent>> {
        self.changes.take()
    }

    /// While paused, matching changes are detected but silently dropped.
    pub fn pause(&self) {
        self.pause.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.pause.store(false, Ordering::SeqCst);
    }

    /// A cloneable handle that can close the watcher from another task.
    pub fn closer(&self) -> WatchCloser {
        WatchCloser {
            close_tx: self.close_tx.clone(),
        }
    }

    /// Stop the OS primitive and close the change stream. Further calls are
    /// no-ops.
    pub fn close(&self) {
        self.closer().close();
    }
}

/// Close signal for the dispatch loop, usable from shutdown tasks.
#[derive(Clone)]
pub struct WatchCloser {
    close_tx: mpsc::Sender<()>,
}

impl WatchCloser {
    pub fn close(&self) {
        // An error here means the dispatch loop already ended.
        let _ = self.close_tx.try_send(());
    }
}

/// Sole owner of the watch set and the directory→patterns cache; only the
/// dispatch task ever touches them, so no locking is needed.
struct Dispatcher {
    patterns: Vec<Pattern>,
    pattern_cache: HashMap<PathBuf, Vec<usize>>,
    watch_set: HashSet<PathBuf>,
    ignore: IgnoreList,
    watcher: RecommendedWatcher,
    change_tx: mpsc::Sender<ChangeEvent>,
    pause: Arc<AtomicBool>,
}

impl Dispatcher {
    /// Register `dir` with the OS primitive if any pattern covers it, then
    /// recurse into non-ignored subdirectories when a covering pattern is
    /// recursive. Idempotent via the watch-set membership check.
    fn add(&mut self, dir: &Path) -> Result<()> {
        if self.watch_set.contains(dir) {
            return Ok(());
        }
        let indices = self.dir_patterns(dir);
        if indices.is_empty() {
            return Ok(());
        }

        self.watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(|source| Error::WatchSetup {
                dir: dir.to_path_buf(),
                source,
            })?;
        self.watch_set.insert(dir.to_path_buf());
        debug!("watch add: {}", dir.display());

        let recursive = indices.iter().any(|&i| self.patterns[i].is_recursive());
        if !recursive {
            return Ok(());
        }

        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if self.ignore.matches(&name) {
                debug!("watch: ignore dir: {}", entry.path().display());
                continue;
            }
            self.add(&entry.path())?;
        }
        Ok(())
    }

    /// Patterns whose root covers `dir`, memoized. The pattern list is
    /// immutable, so entries never need invalidation.
    fn dir_patterns(&mut self, dir: &Path) -> Vec<usize> {
        if let Some(indices) = self.pattern_cache.get(dir) {
            return indices.clone();
        }
        let indices: Vec<usize> = self
            .patterns
            .iter()
            .enumerate()
            .filter(|(_, p)| p.match_dir(dir))
            .map(|(i, _)| i)
            .collect();
        self.pattern_cache.insert(dir.to_path_buf(), indices.clone());
        indices
    }

    async fn dispatch(
        mut self,
        mut raw_rx: mpsc::UnboundedReceiver<notify::Result<notify::Event>>,
        mut close_rx: mpsc::Receiver<()>,
    ) {
        info!("begin to watch");
        loop {
            tokio::select! {
                _ = close_rx.recv() => {
                    debug!("close requested");
                    break;
                }
                res = raw_rx.recv() => match res {
                    None => {
                        debug!("raw event source closed");
                        break;
                    }
                    Some(Err(err)) => {
                        // Transient OS-level failure; keep watching.
                        error!("received error from watcher: {err}");
                    }
                    Some(Ok(event)) => self.handle_event(event).await,
                },
            }
        }
        // Dropping `self` here stops the OS primitive and closes the change
        // stream.
        debug!("closing watcher");
    }

    async fn handle_event(&mut self, event: notify::Event) {
        // Neither access nor metadata-only events carry a content or
        // structural change.
        match event.kind {
            EventKind::Access(_) | EventKind::Modify(ModifyKind::Metadata(_)) => return,
            _ => {}
        }
        debug!("watch: receive change: {event:?}");

        for path in &event.paths {
            self.handle_path(&event.kind, path).await;
        }
    }

    async fn handle_path(&mut self, kind: &EventKind, path: &Path) {
        let (Some(dir), Some(name)) = (path.parent(), path.file_name()) else {
            return;
        };
        let dir = dir.to_path_buf();
        let name = name.to_string_lossy().into_owned();

        if matches!(kind, EventKind::Remove(_)) {
            self.watch_set.remove(path);
            if self.ignore.matches(&name) {
                return;
            }
            let matched = self
                .dir_patterns(&dir)
                .iter()
                .any(|&i| self.patterns[i].match_name(&name));
            if matched {
                self.emit(path).await;
            }
            return;
        }

        let meta = match fs::metadata(path) {
            Ok(meta) => meta,
            Err(err) => {
                // The path may have vanished between the event and now.
                debug!("failed to stat {}: {err}", path.display());
                return;
            }
        };

        if meta.is_dir() {
            if matches!(kind, EventKind::Create(_)) {
                let recursive = self
                    .dir_patterns(path)
                    .iter()
                    .any(|&i| self.patterns[i].is_recursive());
                if recursive {
                    if let Err(err) = self.add(path) {
                        error!("failed to add watch: {err}");
                    }
                }
            }
            return;
        }

        if self.ignore.matches(&name) {
            return;
        }
        let matched = self
            .dir_patterns(&dir)
            .iter()
            .any(|&i| self.patterns[i].match_name(&name));
        if matched {
            self.emit(path).await;
        }
    }

    async fn emit(&self, path: &Path) {
        if self.pause.load(Ordering::SeqCst) {
            debug!("watch: discard change due to pause: {}", path.display());
            return;
        }
        let event = ChangeEvent {
            path: path.to_path_buf(),
        };
        if self.change_tx.send(event).await.is_err() {
            debug!("change stream consumer is gone");
        }
    }
}
