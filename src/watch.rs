//! Filesystem watch registry backed by `notify`.
//!
//! Each source file's parent directory is watched rather than the file
//! itself, so saves that replace the file (write a temp file, rename it over
//! the original) keep being reported. Events for other files in those
//! directories are dropped.

use crate::plugin::WatchRegistry;
use anyhow::{Context, Result};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;
use tracing::{debug, error};

pub struct SourceWatcher {
    watcher: RecommendedWatcher,
    changes: Receiver<PathBuf>,
    dirs: HashSet<PathBuf>,
    /// Canonical path -> path as registered
    files: HashMap<PathBuf, PathBuf>,
}

impl SourceWatcher {
    pub fn new() -> Result<Self> {
        let (tx, changes) = mpsc::channel();
        let watcher = notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
            match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    for path in event.paths {
                        let _ = tx.send(path);
                    }
                }
                Ok(_) => {}
                Err(e) => error!("watch error: {}", e),
            }
        })
        .context("failed to create file watcher")?;
        Ok(Self {
            watcher,
            changes,
            dirs: HashSet::new(),
            files: HashMap::new(),
        })
    }

    /// The next change to a registered file, as it was registered. With a
    /// timeout, `None` once that long passes without any event.
    pub fn next_change(&self, timeout: Option<Duration>) -> Option<PathBuf> {
        loop {
            let path = match timeout {
                Some(timeout) => self.changes.recv_timeout(timeout).ok()?,
                None => self.changes.recv().ok()?,
            };
            if let Some(file) = self.files.get(&canonical(&path)) {
                return Some(file.clone());
            }
            debug!("ignoring change to {}", path.display());
        }
    }

    /// Block on changes, calling `rebuild` with each changed file until the
    /// watcher goes away. Rebuild failures are logged, not fatal.
    pub fn run(self, mut rebuild: impl FnMut(&Path) -> Result<()>) {
        while let Some(file) = self.next_change(None) {
            debug!("changed: {}", file.display());
            if let Err(e) = rebuild(&file) {
                error!("rebuild failed: {:#}", e);
            }
        }
    }
}

impl WatchRegistry for SourceWatcher {
    fn watch(&mut self, path: &Path) -> Result<()> {
        let file = canonical(path);
        let dir = file
            .parent()
            .with_context(|| format!("{} has no parent directory", path.display()))?
            .to_path_buf();
        if !self.dirs.contains(&dir) {
            self.watcher
                .watch(&dir, RecursiveMode::NonRecursive)
                .with_context(|| format!("failed to watch {}", dir.display()))?;
            self.dirs.insert(dir);
        }
        self.files.insert(file, path.to_path_buf());
        Ok(())
    }
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
