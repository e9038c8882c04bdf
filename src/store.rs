use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::sync::Mutex;

use camino::{Utf8Path, Utf8PathBuf};
use directories::BaseDirs;
use tempfile::Builder;

use crate::card::CardRecord;
use crate::error::IngestError;

/// Where parsed cards end up. Implementations are shared by every parse thread.
pub trait CardStore: Send + Sync {
    /// Inserts or replaces the card with the same identifier.
    fn upsert(&self, card: &CardRecord) -> Result<(), IngestError>;

    /// Every identifier already stored, ascending.
    fn list_known_identifiers(&self) -> Result<Vec<u32>, IngestError>;

    fn get(&self, id: u32) -> Result<Option<CardRecord>, IngestError>;
}

#[derive(Debug, Default)]
pub struct MemoryCardStore {
    cards: Mutex<BTreeMap<u32, CardRecord>>,
}

impl MemoryCardStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cards(cards: impl IntoIterator<Item = CardRecord>) -> Self {
        Self {
            cards: Mutex::new(cards.into_iter().map(|card| (card.id, card)).collect()),
        }
    }

    pub fn len(&self) -> usize {
        self.cards.lock().map(|cards| cards.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CardStore for MemoryCardStore {
    fn upsert(&self, card: &CardRecord) -> Result<(), IngestError> {
        let mut cards = self
            .cards
            .lock()
            .map_err(|_| IngestError::Store("card map lock poisoned".to_string()))?;
        cards.insert(card.id, card.clone());
        Ok(())
    }

    fn list_known_identifiers(&self) -> Result<Vec<u32>, IngestError> {
        let cards = self
            .cards
            .lock()
            .map_err(|_| IngestError::Store("card map lock poisoned".to_string()))?;
        Ok(cards.keys().copied().collect())
    }

    fn get(&self, id: u32) -> Result<Option<CardRecord>, IngestError> {
        let cards = self
            .cards
            .lock()
            .map_err(|_| IngestError::Store("card map lock poisoned".to_string()))?;
        Ok(cards.get(&id).cloned())
    }
}

/// Cards as pretty JSON under `cards/<id>.json`, images under `images/<id>.img`.
#[derive(Debug, Clone)]
pub struct JsonCardStore {
    root: Utf8PathBuf,
}

impl JsonCardStore {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    /// `<data dir>/gatherer-ingest` for the current user.
    pub fn default_root() -> Result<Utf8PathBuf, IngestError> {
        BaseDirs::new()
            .and_then(|dirs| {
                Utf8PathBuf::from_path_buf(dirs.data_dir().join("gatherer-ingest")).ok()
            })
            .ok_or_else(|| IngestError::Filesystem("unable to resolve data directory".to_string()))
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn card_path(&self, id: u32) -> Utf8PathBuf {
        self.root.join("cards").join(format!("{id}.json"))
    }

    pub fn image_path(&self, id: u32) -> Utf8PathBuf {
        self.root.join("images").join(format!("{id}.img"))
    }

    pub fn ensure_root(&self) -> Result<(), IngestError> {
        fs::create_dir_all(self.root.join("cards").as_std_path())
            .map_err(|err| IngestError::Filesystem(err.to_string()))?;
        fs::create_dir_all(self.root.join("images").as_std_path())
            .map_err(|err| IngestError::Filesystem(err.to_string()))
    }
}

impl CardStore for JsonCardStore {
    fn upsert(&self, card: &CardRecord) -> Result<(), IngestError> {
        let content = serde_json::to_vec_pretty(card)
            .map_err(|err| IngestError::Store(format!("serialize card {}: {err}", card.id)))?;
        write_bytes_atomic(&self.card_path(card.id), &content)?;

        let image_path = self.image_path(card.id);
        if !card.image.is_empty() {
            write_bytes_atomic(&image_path, &card.image)?;
        } else if image_path.as_std_path().exists() {
            fs::remove_file(image_path.as_std_path())
                .map_err(|err| IngestError::Filesystem(err.to_string()))?;
        }
        Ok(())
    }

    fn list_known_identifiers(&self) -> Result<Vec<u32>, IngestError> {
        let cards_dir = self.root.join("cards");
        if !cards_dir.as_std_path().exists() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        let entries = cards_dir
            .read_dir_utf8()
            .map_err(|err| IngestError::Filesystem(err.to_string()))?;
        for entry in entries {
            let entry = entry.map_err(|err| IngestError::Filesystem(err.to_string()))?;
            let path = entry.path();
            if path.extension() != Some("json") {
                continue;
            }
            if let Some(id) = path.file_stem().and_then(|stem| stem.parse::<u32>().ok()) {
                ids.push(id);
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }

    fn get(&self, id: u32) -> Result<Option<CardRecord>, IngestError> {
        let path = self.card_path(id);
        if !path.as_std_path().exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|err| IngestError::Filesystem(err.to_string()))?;
        let mut card: CardRecord = serde_json::from_str(&content)
            .map_err(|err| IngestError::Store(format!("decode {path}: {err}")))?;
        let image_path = self.image_path(id);
        if image_path.as_std_path().exists() {
            card.image = fs::read(image_path.as_std_path())
                .map_err(|err| IngestError::Filesystem(err.to_string()))?;
        }
        Ok(Some(card))
    }
}

/// Writes through a temp file in the destination directory, then renames it
/// over `path`.
pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), IngestError> {
    let parent = path
        .parent()
        .ok_or_else(|| IngestError::Filesystem(format!("invalid destination path {path}")))?;
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| IngestError::Filesystem(err.to_string()))?;
    let mut temp = Builder::new()
        .prefix(".gatherer-ingest")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| IngestError::Filesystem(err.to_string()))?;
    temp.write_all(content)
        .map_err(|err| IngestError::Filesystem(err.to_string()))?;
    temp.persist(path.as_std_path())
        .map_err(|err| IngestError::Filesystem(err.to_string()))?;
    Ok(())
}
