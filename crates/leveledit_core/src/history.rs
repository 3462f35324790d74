// SPDX-License-Identifier: MIT OR Apache-2.0
//! Linear undo/redo history backed by per-entry archive files.
//!
//! Entry `N` lives in `<staging>/history{N}`. Each file starts with the
//! archive version and the entry kind, followed by the kind's payload.
//! Entries are written once when the action happens and only read by
//! undo/redo afterwards.

use crate::archive::{ArchiveError, ArchiveReader, ArchiveWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name prefix of history entries
pub const HISTORY_FILE_PREFIX: &str = "history";

/// History errors
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Entry could not be written or read
    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// Staging directory error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for history operations
pub type Result<T> = std::result::Result<T, HistoryError>;

/// Kind tag stored in every entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HistoryKind {
    /// Selection change
    Selection,
    /// Gizmo drag
    Transform,
    /// Entity deletion
    Deletion,
    /// Clipboard paste
    Paste,
    /// No operation
    None,
}

impl HistoryKind {
    /// Tag value written to the archive
    pub fn tag(&self) -> u8 {
        match self {
            Self::Selection => 0,
            Self::Transform => 1,
            Self::Deletion => 2,
            Self::Paste => 3,
            Self::None => 4,
        }
    }

    /// Decode a tag value
    pub fn from_tag(tag: u8) -> std::result::Result<Self, ArchiveError> {
        Ok(match tag {
            0 => Self::Selection,
            1 => Self::Transform,
            2 => Self::Deletion,
            3 => Self::Paste,
            4 => Self::None,
            value => {
                return Err(ArchiveError::InvalidTag {
                    what: "history kind",
                    value,
                })
            }
        })
    }

    /// Get the name of this kind
    pub fn name(&self) -> &'static str {
        match self {
            Self::Selection => "Selection",
            Self::Transform => "Transform",
            Self::Deletion => "Deletion",
            Self::Paste => "Paste",
            Self::None => "None",
        }
    }
}

/// A loaded entry, positioned after its kind tag
#[derive(Debug)]
pub struct HistoryEntry {
    /// Position in the log
    pub position: usize,
    /// Entry kind
    pub kind: HistoryKind,
    reader: ArchiveReader,
}

impl HistoryEntry {
    /// Archive format version of the entry
    pub fn version(&self) -> u32 {
        self.reader.version()
    }

    /// Reader for the payload
    pub fn reader(&mut self) -> &mut ArchiveReader {
        &mut self.reader
    }
}

/// History statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryStats {
    /// Entries that can be undone
    pub undo_count: usize,
    /// Entries that can be redone
    pub redo_count: usize,
}

/// Undo/redo history manager
#[derive(Debug)]
pub struct History {
    staging_dir: PathBuf,
    count: usize,
    position: Option<usize>,
}

impl History {
    /// Create a history that stages entries in `staging_dir`. Call
    /// [`History::reset`] before recording.
    pub fn new(staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            staging_dir: staging_dir.into(),
            count: 0,
            position: None,
        }
    }

    /// Empty the log, create the staging directory and delete entry files
    /// left over from an earlier session
    pub fn reset(&mut self) -> Result<()> {
        std::fs::create_dir_all(&self.staging_dir)?;
        for dir_entry in std::fs::read_dir(&self.staging_dir)? {
            let path = dir_entry?.path();
            if Self::is_entry_file(&path) {
                std::fs::remove_file(&path)?;
            }
        }
        self.count = 0;
        self.position = None;
        tracing::debug!("History reset in {:?}", self.staging_dir);
        Ok(())
    }

    fn is_entry_file(path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_prefix(HISTORY_FILE_PREFIX))
            .is_some_and(|suffix| !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()))
    }

    /// Path of the entry file at `position`
    pub fn entry_path(&self, position: usize) -> PathBuf {
        self.staging_dir
            .join(format!("{HISTORY_FILE_PREFIX}{position}"))
    }

    /// Staging directory
    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Record a new entry after the current position.
    ///
    /// `write` appends the payload after the version and kind. The cursor
    /// only advances once the file is written, so a failed write leaves
    /// the log untouched. Entries that could have been redone are dropped.
    pub fn record<F>(&mut self, kind: HistoryKind, write: F) -> Result<usize>
    where
        F: FnOnce(&mut ArchiveWriter) -> std::result::Result<(), ArchiveError>,
    {
        let next = self.position.map_or(0, |p| p + 1);

        let mut archive = ArchiveWriter::new();
        archive.write(&kind.tag())?;
        write(&mut archive)?;
        archive.save(&self.entry_path(next))?;

        for stale in next + 1..self.count {
            match std::fs::remove_file(self.entry_path(stale)) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!("Could not delete stale history entry {}: {}", stale, e),
            }
        }

        self.position = Some(next);
        self.count = next + 1;
        tracing::debug!("Recorded {} entry at {}", kind.name(), next);
        Ok(next)
    }

    fn load(&self, position: usize) -> Result<HistoryEntry> {
        let mut reader = ArchiveReader::open(&self.entry_path(position))?;
        let kind = HistoryKind::from_tag(reader.read()?)?;
        Ok(HistoryEntry {
            position,
            kind,
            reader,
        })
    }

    /// Load the entry at the current position and step back. Returns
    /// `None` at the start of the log.
    pub fn undo(&mut self) -> Result<Option<HistoryEntry>> {
        let Some(position) = self.position else {
            return Ok(None);
        };
        let entry = self.load(position)?;
        self.position = position.checked_sub(1);
        tracing::debug!("Undo {} entry at {}", entry.kind.name(), position);
        Ok(Some(entry))
    }

    /// Step forward and load that entry. Returns `None` at the tip.
    pub fn redo(&mut self) -> Result<Option<HistoryEntry>> {
        if !self.can_redo() {
            return Ok(None);
        }
        let next = self.position.map_or(0, |p| p + 1);
        let entry = self.load(next)?;
        self.position = Some(next);
        tracing::debug!("Redo {} entry at {}", entry.kind.name(), next);
        Ok(Some(entry))
    }

    /// Move the cursor without loading anything. Used to roll back a step
    /// whose entry could not be decoded. Positions past the log are ignored.
    pub fn seek(&mut self, position: Option<usize>) {
        if position.map_or(true, |p| p < self.count) {
            self.position = position;
        }
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        self.position.is_some()
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        self.position.map_or(0, |p| p + 1) < self.count
    }

    /// Number of entries in the log
    pub fn count(&self) -> usize {
        self.count
    }

    /// Index of the most recently applied entry
    pub fn position(&self) -> Option<usize> {
        self.position
    }

    /// Get history statistics
    pub fn stats(&self) -> HistoryStats {
        let applied = self.position.map_or(0, |p| p + 1);
        HistoryStats {
            undo_count: applied,
            redo_count: self.count - applied,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history() -> (tempfile::TempDir, History) {
        let dir = tempfile::tempdir().unwrap();
        let mut history = History::new(dir.path().join("temp"));
        history.reset().unwrap();
        (dir, history)
    }

    fn record_value(history: &mut History, value: u32) -> usize {
        history
            .record(HistoryKind::None, |w| w.write(&value))
            .unwrap()
    }

    #[test]
    fn test_record_advances_cursor() {
        let (_dir, mut history) = history();
        assert_eq!(history.position(), None);
        assert_eq!(record_value(&mut history, 10), 0);
        assert_eq!(record_value(&mut history, 11), 1);
        assert_eq!(history.count(), 2);
        assert_eq!(history.position(), Some(1));
        assert!(history.entry_path(1).exists());
    }

    #[test]
    fn test_undo_redo_walk() {
        let (_dir, mut history) = history();
        for value in 0..3 {
            record_value(&mut history, value);
        }

        let mut undone = Vec::new();
        while let Some(mut entry) = history.undo().unwrap() {
            undone.push(entry.reader().read::<u32>().unwrap());
        }
        assert_eq!(undone, vec![2, 1, 0]);
        assert_eq!(history.position(), None);
        assert!(history.undo().unwrap().is_none());

        let mut redone = Vec::new();
        while let Some(mut entry) = history.redo().unwrap() {
            redone.push(entry.reader().read::<u32>().unwrap());
        }
        assert_eq!(redone, vec![0, 1, 2]);
        assert_eq!(history.position(), Some(2));
        assert!(history.redo().unwrap().is_none());
    }

    #[test]
    fn test_record_after_undo_drops_redo() {
        let (_dir, mut history) = history();
        for value in 0..3 {
            record_value(&mut history, value);
        }
        history.undo().unwrap();
        history.undo().unwrap();
        assert_eq!(record_value(&mut history, 9), 1);
        assert_eq!(history.count(), 2);
        assert!(!history.can_redo());
        assert!(!history.entry_path(2).exists());

        let mut entry = history.undo().unwrap().unwrap();
        assert_eq!(entry.reader().read::<u32>().unwrap(), 9);
    }

    #[test]
    fn test_failed_write_keeps_cursor() {
        let (_dir, mut history) = history();
        record_value(&mut history, 1);
        let result = history.record(HistoryKind::None, |_| {
            Err(ArchiveError::InvalidTag {
                what: "test",
                value: 0,
            })
        });
        assert!(result.is_err());
        assert_eq!(history.position(), Some(0));
        assert_eq!(history.count(), 1);
    }

    #[test]
    fn test_reset_clears_stale_files() {
        let (_dir, mut history) = history();
        record_value(&mut history, 1);
        let unrelated = history.staging_dir().join("clipboard");
        std::fs::write(&unrelated, b"keep").unwrap();

        history.reset().unwrap();
        assert_eq!(history.count(), 0);
        assert!(!history.entry_path(0).exists());
        assert!(unrelated.exists());
        assert_eq!(history.stats(), HistoryStats::default());
    }

    #[test]
    fn test_seek_stays_inside_log() {
        let (_dir, mut history) = history();
        record_value(&mut history, 1);
        record_value(&mut history, 2);
        history.undo().unwrap();
        history.seek(Some(1));
        assert_eq!(history.position(), Some(1));
        history.seek(Some(5));
        assert_eq!(history.position(), Some(1));
        history.seek(None);
        assert!(!history.can_undo());
        assert_eq!(history.stats().redo_count, 2);
    }

    #[test]
    fn test_kind_tags() {
        for kind in [
            HistoryKind::Selection,
            HistoryKind::Transform,
            HistoryKind::Deletion,
            HistoryKind::Paste,
            HistoryKind::None,
        ] {
            assert_eq!(HistoryKind::from_tag(kind.tag()).unwrap(), kind);
        }
        assert!(HistoryKind::from_tag(200).is_err());
    }
}
