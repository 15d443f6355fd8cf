use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chat_api::Message;

use crate::error::HistoryStoreError;
use crate::paths::{history_file, temp_path_for};

/// Capacity-bounded, file-backed conversation history.
///
/// Every saving mutation rewrites the whole file; there is no append-only
/// log. Single writer only: nothing guards against another process writing
/// the same file.
#[derive(Debug)]
pub struct HistoryStore {
    path: PathBuf,
    capacity: usize,
    entries: Vec<Message>,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>, capacity: usize) -> Result<Self, HistoryStoreError> {
        if capacity == 0 {
            return Err(HistoryStoreError::InvalidCapacity { capacity });
        }

        Ok(Self {
            path: path.into(),
            capacity,
            entries: Vec::new(),
        })
    }

    /// Store backed by the conventional history file inside `dir`.
    pub fn in_dir(dir: &Path, capacity: usize) -> Result<Self, HistoryStoreError> {
        Self::new(history_file(dir), capacity)
    }

    /// Read the persisted history. A missing file is an empty history;
    /// unreadable or malformed content is an error.
    pub fn load(&self) -> Result<Vec<Message>, HistoryStoreError> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(HistoryStoreError::io("reading history", &self.path, source))
            }
        };

        serde_json::from_slice::<Vec<Message>>(&data)
            .map_err(|source| HistoryStoreError::decode(&self.path, source))
    }

    /// Replace in-memory history with the persisted one.
    ///
    /// Entries beyond capacity are dropped from the front in memory only;
    /// the file is rewritten on the next save.
    pub fn hydrate(&mut self) -> Result<usize, HistoryStoreError> {
        self.entries = self.load()?;
        self.enforce_capacity();
        tracing::info!(
            path = %self.path.display(),
            loaded = self.entries.len(),
            "loaded last session history"
        );
        Ok(self.entries.len())
    }

    /// Overwrite the persisted file with the full in-memory history.
    ///
    /// The content is written to a sibling temp file and renamed into place
    /// so a reader never sees a partial write.
    pub fn save(&self) -> Result<(), HistoryStoreError> {
        let data = serde_json::to_vec(&self.entries)
            .map_err(|source| HistoryStoreError::encode(&self.path, source))?;

        if let Some(parent) = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
        {
            fs::create_dir_all(parent)
                .map_err(|source| HistoryStoreError::io("creating history dir", parent, source))?;
        }

        let staging = temp_path_for(&self.path);
        let mut file = File::create(&staging)
            .map_err(|source| HistoryStoreError::io("creating history file", &staging, source))?;
        file.write_all(&data)
            .map_err(|source| HistoryStoreError::io("writing history", &staging, source))?;
        file.sync_all()
            .map_err(|source| HistoryStoreError::io("syncing history", &staging, source))?;
        drop(file);

        fs::rename(&staging, &self.path)
            .map_err(|source| HistoryStoreError::io("replacing history", &self.path, source))?;

        tracing::debug!(
            path = %self.path.display(),
            entries = self.entries.len(),
            "history saved"
        );
        Ok(())
    }

    /// Add messages to the tail, evict the oldest beyond capacity, then save.
    pub fn append<I>(&mut self, messages: I) -> Result<(), HistoryStoreError>
    where
        I: IntoIterator<Item = Message>,
    {
        for message in messages {
            tracing::debug!(
                role = message.role.as_str(),
                chars = message.content.chars().count(),
                "add message"
            );
            self.entries.push(message);
        }
        self.enforce_capacity();
        self.save()
    }

    /// Keep only the most recent entry, then save.
    pub fn truncate_to_last(&mut self) -> Result<(), HistoryStoreError> {
        let keep_from = self.entries.len().saturating_sub(1);
        self.entries.drain(..keep_from);
        self.save()
    }

    /// Add a message in memory only: no eviction, no save.
    ///
    /// Paired with [`Self::rollback_last`] when an exchange fails, or
    /// persisted by the next [`Self::append`].
    pub fn push_unsaved(&mut self, message: Message) {
        self.entries.push(message);
    }

    /// Remove the newest entry in memory only.
    pub fn rollback_last(&mut self) -> Option<Message> {
        self.entries.pop()
    }

    /// The newest `capacity` entries.
    #[must_use]
    pub fn window(&self) -> &[Message] {
        let start = self.entries.len().saturating_sub(self.capacity);
        &self.entries[start..]
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn enforce_capacity(&mut self) {
        if self.entries.len() > self.capacity {
            let excess = self.entries.len() - self.capacity;
            self.entries.drain(..excess);
        }
    }
}
