//! Raw change records delivered by a notification source

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Kind of file system change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// File or directory created
    Created,
    /// File contents or attributes changed
    Changed,
    /// File or directory deleted
    Deleted,
    /// File or directory renamed
    Renamed,
}

impl ChangeKind {
    /// Every kind, in the order subscriber lists are kept
    pub const ALL: [ChangeKind; 4] = [
        ChangeKind::Created,
        ChangeKind::Changed,
        ChangeKind::Deleted,
        ChangeKind::Renamed,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ChangeKind::Created => "created",
            ChangeKind::Changed => "changed",
            ChangeKind::Deleted => "deleted",
            ChangeKind::Renamed => "renamed",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// A single unfiltered notification
///
/// `old_path` is only present for renames; use the constructors to keep
/// that invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawEvent {
    kind: ChangeKind,
    path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    old_path: Option<PathBuf>,
}

impl RawEvent {
    pub fn created(path: impl Into<PathBuf>) -> Self {
        Self::plain(ChangeKind::Created, path.into())
    }

    pub fn changed(path: impl Into<PathBuf>) -> Self {
        Self::plain(ChangeKind::Changed, path.into())
    }

    pub fn deleted(path: impl Into<PathBuf>) -> Self {
        Self::plain(ChangeKind::Deleted, path.into())
    }

    /// A rename from `old_path` to `path`
    pub fn renamed(path: impl Into<PathBuf>, old_path: impl Into<PathBuf>) -> Self {
        Self {
            kind: ChangeKind::Renamed,
            path: path.into(),
            old_path: Some(old_path.into()),
        }
    }

    fn plain(kind: ChangeKind, path: PathBuf) -> Self {
        Self {
            kind,
            path,
            old_path: None,
        }
    }

    pub fn kind(&self) -> ChangeKind {
        self.kind
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn old_path(&self) -> Option<&Path> {
        self.old_path.as_deref()
    }

    /// Path the suppression decision is keyed on
    ///
    /// Renames are keyed on the old path: editors commonly follow a
    /// rename with further writes against the old identity.
    pub fn suppression_key(&self) -> &Path {
        match (self.kind, self.old_path.as_deref()) {
            (ChangeKind::Renamed, Some(old_path)) => old_path,
            _ => &self.path,
        }
    }
}

impl fmt::Display for RawEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.old_path {
            Some(old_path) => write!(
                f,
                "{} {} -> {}",
                self.kind,
                old_path.display(),
                self.path.display()
            ),
            None => write!(f, "{} {}", self.kind, self.path.display()),
        }
    }
}
