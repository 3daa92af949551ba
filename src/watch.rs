//! Debounced change notification for save directories.
//!
//! One `notify` watcher per tracked directory feeds a single-slot debounce
//! worker. Every relevant event pushes the pending deadline back; when the
//! deadline passes quietly the scan cache is invalidated and subscribers
//! are told once.

use crate::scan::{ScanCache, ScanOptions};
use notify::event::AccessKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, Weak};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

type Listener = Arc<dyn Fn() + Send + Sync + 'static>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
}

/// Fan-out of change notifications.
#[derive(Clone, Default)]
pub struct ChangeHub {
    inner: Arc<Mutex<Listeners>>,
}

impl std::fmt::Debug for ChangeHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeHub")
            .field("listeners", &self.len())
            .finish()
    }
}

/// Handle returned by [`ChangeHub::subscribe`].
///
/// Dropping it keeps the listener registered; call
/// [`Subscription::unsubscribe`] to remove it.
#[must_use = "keep the subscription to be able to unsubscribe"]
pub struct Subscription {
    id: u64,
    hub: Weak<Mutex<Listeners>>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        if let Some(hub) = self.hub.upgrade() {
            if let Ok(mut listeners) = hub.lock() {
                listeners.entries.retain(|(id, _)| *id != self.id);
            }
        }
    }
}

impl ChangeHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut listeners = match self.inner.lock() {
            Ok(l) => l,
            Err(poisoned) => poisoned.into_inner(),
        };
        listeners.next_id += 1;
        let id = listeners.next_id;
        listeners.entries.push((id, Arc::new(listener)));
        Subscription {
            id,
            hub: Arc::downgrade(&self.inner),
        }
    }

    /// Call every listener. Listeners run outside the lock so they may
    /// subscribe or unsubscribe.
    pub fn notify(&self) {
        let snapshot: Vec<Listener> = match self.inner.lock() {
            Ok(l) => l.entries.iter().map(|(_, f)| Arc::clone(f)).collect(),
            Err(_) => return,
        };
        for listener in snapshot {
            listener();
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|l| l.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

enum Signal {
    Event,
    Shutdown,
}

/// Cheap handle that reports an event to a [`Debouncer`].
#[derive(Clone)]
pub struct Trigger {
    tx: Sender<Signal>,
}

impl Trigger {
    pub fn fire(&self) {
        // Worker gone means we are shutting down.
        let _ = self.tx.send(Signal::Event);
    }
}

/// Worker thread holding one cancellable deadline.
pub struct Debouncer {
    tx: Sender<Signal>,
    worker: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new<F>(delay: Duration, on_fire: F) -> Self
    where
        F: Fn() + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<Signal>();
        let worker = std::thread::spawn(move || {
            let mut deadline: Option<Instant> = None;
            loop {
                let received = match deadline {
                    None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
                    Some(at) => rx.recv_timeout(at.saturating_duration_since(Instant::now())),
                };
                match received {
                    Ok(Signal::Event) => deadline = Some(Instant::now() + delay),
                    Err(RecvTimeoutError::Timeout) => {
                        deadline = None;
                        on_fire();
                    }
                    Ok(Signal::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        });
        Self {
            tx,
            worker: Some(worker),
        }
    }

    pub fn trigger(&self) -> Trigger {
        Trigger {
            tx: self.tx.clone(),
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        let _ = self.tx.send(Signal::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Whether `event` can affect a scan result.
///
/// Reads and opens never do. An event without paths, or a path without a
/// file name, is treated as relevant; paths inside a backup directory are
/// not.
pub fn is_relevant(event: &Event, options: &ScanOptions) -> bool {
    if matches!(
        event.kind,
        EventKind::Access(AccessKind::Read) | EventKind::Access(AccessKind::Open(_))
    ) {
        return false;
    }
    if event.paths.is_empty() {
        return true;
    }
    event.paths.iter().any(|path| {
        let in_backups = path
            .components()
            .any(|c| matches!(c, Component::Normal(name) if name == options.backup_dir_name.as_str()));
        !in_backups && (path.file_name().is_none() || options.matches_extension(path))
    })
}

/// Watches save directories and invalidates a [`ScanCache`] on change.
pub struct SaveWatcher {
    options: Arc<ScanOptions>,
    watchers: HashMap<PathBuf, RecommendedWatcher>,
    // Declared last: dropped after the watchers holding its triggers.
    debouncer: Debouncer,
}

impl SaveWatcher {
    pub fn new(options: ScanOptions, delay: Duration, cache: Arc<ScanCache>, hub: ChangeHub) -> Self {
        let debouncer = Debouncer::new(delay, move || {
            cache.invalidate();
            hub.notify();
        });
        Self {
            options: Arc::new(options),
            watchers: HashMap::new(),
            debouncer,
        }
    }

    fn attach(&self, dir: &Path) -> notify::Result<RecommendedWatcher> {
        let trigger = self.debouncer.trigger();
        let options = Arc::clone(&self.options);
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if is_relevant(&event, &options) => trigger.fire(),
                Ok(_) => {}
                Err(err) => log::warn!("watch error: {err}"),
            },
            notify::Config::default(),
        )?;
        watcher.watch(dir, RecursiveMode::Recursive)?;
        Ok(watcher)
    }

    /// Watch exactly `dirs`: attach new directories, drop ones no longer
    /// listed. Directories that cannot be watched are logged and skipped.
    pub fn ensure(&mut self, dirs: &[PathBuf]) -> usize {
        self.watchers.retain(|dir, _| dirs.contains(dir));
        for dir in dirs {
            if self.watchers.contains_key(dir) {
                continue;
            }
            match self.attach(dir) {
                Ok(watcher) => {
                    log::debug!("watching {}", dir.display());
                    self.watchers.insert(dir.clone(), watcher);
                }
                Err(err) => log::warn!("cannot watch {}: {err}", dir.display()),
            }
        }
        self.watchers.len()
    }

    pub fn watched(&self) -> Vec<&Path> {
        let mut dirs: Vec<&Path> = self.watchers.keys().map(PathBuf::as_path).collect();
        dirs.sort();
        dirs
    }

    /// Report a change by hand, e.g. after an in-process write.
    pub fn poke(&self) {
        self.debouncer.trigger().fire();
    }
}
