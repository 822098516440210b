//! Platform file watching through `notify`
//!
//! `notify` picks the native backend (inotify, FSEvents, kqueue,
//! ReadDirectoryChangesW); this module turns its events into the four raw
//! notifications the router understands.

use crate::error::WatchError;
use crate::filter::NameFilter;
use crate::source::{EventSource, RawEventHandler};
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use quietwatch_core::{ConfigError, WatcherConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// What to watch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchOptions {
    pub path: PathBuf,
    pub filter: String,
    pub recursive: bool,
}

impl WatchOptions {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            filter: quietwatch_core::config::DEFAULT_FILTER.to_string(),
            recursive: true,
        }
    }

    pub fn filter(mut self, pattern: impl Into<String>) -> Self {
        self.filter = pattern.into();
        self
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }
}

impl From<&WatcherConfig> for WatchOptions {
    fn from(config: &WatcherConfig) -> Self {
        Self {
            path: config.path.clone(),
            filter: config.filter.clone(),
            recursive: config.recursive,
        }
    }
}

/// [`EventSource`] backed by the platform's recommended `notify` watcher
pub struct NotifySource {
    root: PathBuf,
    recursive: bool,
    filter: NameFilter,
    watcher: Option<RecommendedWatcher>,
}

impl NotifySource {
    /// Validate `options` without starting to watch
    pub fn new(options: WatchOptions) -> Result<Self, ConfigError> {
        if options.path.as_os_str().is_empty() {
            return Err(ConfigError::MissingPath);
        }

        let metadata = std::fs::metadata(&options.path)
            .map_err(|_| ConfigError::PathNotFound(options.path.clone()))?;
        if !metadata.is_dir() {
            return Err(ConfigError::NotADirectory(options.path));
        }

        // Backends report canonical paths (e.g. /private/tmp on macOS)
        let root = options
            .path
            .canonicalize()
            .map_err(|_| ConfigError::PathNotFound(options.path.clone()))?;
        let filter = NameFilter::new(&options.filter)?;

        Ok(Self {
            root,
            recursive: options.recursive,
            filter,
            watcher: None,
        })
    }

    /// Canonical directory being watched
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_attached(&self) -> bool {
        self.watcher.is_some()
    }
}

impl EventSource for NotifySource {
    fn attach(&mut self, handler: Arc<dyn RawEventHandler>) -> Result<(), WatchError> {
        if self.watcher.is_some() {
            return Ok(());
        }

        let mut translator = Translator::new(self.filter.clone());
        let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
            match result {
                Ok(event) => translator.translate(&event, handler.as_ref()),
                Err(error) => handler.on_error(WatchError::Source(error)),
            }
        })?;

        let mode = if self.recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher.watch(&self.root, mode)?;

        info!(
            "Watching {} ({}, filter: {})",
            self.root.display(),
            if self.recursive { "recursive" } else { "non-recursive" },
            self.filter.pattern()
        );
        self.watcher = Some(watcher);
        Ok(())
    }

    fn detach(&mut self) {
        // unwatch() blocks on the backend thread, which may be this thread
        if let Some(watcher) = self.watcher.take() {
            drop(watcher);
            info!("Stopped watching {}", self.root.display());
        }
    }
}

impl Drop for NotifySource {
    fn drop(&mut self) {
        self.detach();
    }
}

/// Stateful notify → raw event translation
///
/// Backends that track renames emit a `From` half, a `To` half, and then a
/// combined `Both` event carrying the same tracker. The halves are held
/// back so a paired rename is reported once, as a rename; a `From` whose
/// partner never shows up (moved out of the tree) becomes a delete as soon
/// as any unrelated event arrives.
struct Translator {
    filter: NameFilter,
    pending_from: Option<(usize, PathBuf)>,
}

impl Translator {
    fn new(filter: NameFilter) -> Self {
        Self {
            filter,
            pending_from: None,
        }
    }

    fn translate(&mut self, event: &Event, handler: &dyn RawEventHandler) {
        let tracker = event.tracker();
        self.flush_unpaired(event, tracker, handler);

        match event.kind {
            EventKind::Create(_) => self.each(event, |path| handler.on_created(path)),
            EventKind::Remove(_) => self.each(event, |path| handler.on_deleted(path)),
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
                self.pending_from = None;
                if let [old_path, path] = event.paths.as_slice() {
                    if self.filter.matches(path) || self.filter.matches(old_path) {
                        handler.on_renamed(path, old_path);
                    }
                }
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::From)) => match tracker {
                Some(tracker) => {
                    self.pending_from = event.paths.first().map(|path| (tracker, path.clone()));
                }
                None => self.each(event, |path| handler.on_deleted(path)),
            },
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
                let paired = tracker.is_some()
                    && self.pending_from.as_ref().map(|(pending, _)| *pending) == tracker;
                if !paired {
                    self.each(event, |path| handler.on_created(path));
                }
            }
            // Backends that cannot tell which half they saw (FSEvents)
            EventKind::Modify(ModifyKind::Name(_)) => self.each(event, |path| {
                if path.exists() {
                    handler.on_created(path)
                } else {
                    handler.on_deleted(path)
                }
            }),
            EventKind::Modify(_) => self.each(event, |path| handler.on_changed(path)),
            EventKind::Access(_) | EventKind::Any | EventKind::Other => {}
        }
    }

    /// Report a held-back `From` as deleted unless `event` is its partner
    fn flush_unpaired(&mut self, event: &Event, tracker: Option<usize>, handler: &dyn RawEventHandler) {
        let Some((pending, _)) = &self.pending_from else {
            return;
        };
        let partner = tracker == Some(*pending)
            && matches!(
                event.kind,
                EventKind::Modify(ModifyKind::Name(RenameMode::To | RenameMode::Both))
            );
        if partner {
            return;
        }
        if let Some((_, path)) = self.pending_from.take() {
            if self.filter.matches(&path) {
                handler.on_deleted(&path);
            }
        }
    }

    fn each(&self, event: &Event, mut deliver: impl FnMut(&Path)) {
        for path in &event.paths {
            if self.filter.matches(path) {
                deliver(path);
            }
        }
    }
}
