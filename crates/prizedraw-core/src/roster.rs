//! Participant roster loading.
//!
//! The roster is immutable for the duration of a run. The draw engine only
//! ever references participant ids present in the [`Roster`] it was built
//! with.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::debug;

/// Errors raised while loading or validating a roster.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RosterError {
    /// The roster file could not be read.
    #[error("failed to read roster {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The roster file is not valid JSON in the expected shape.
    #[error("invalid roster JSON in {}: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The roster contains no participants.
    #[error("participant roster is empty")]
    Empty,

    /// Participant ids must be positive.
    #[error("participant id must be positive (name: {name})")]
    InvalidId { name: String },

    /// Two participants share an id.
    #[error("duplicate participant id {id}")]
    DuplicateId { id: u32 },

    /// A participant references a photo that does not exist.
    #[error("photo not found for participant {id}: {}", .path.display())]
    MissingPhoto { id: u32, path: PathBuf },
}

/// A single entrant in the draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Unique positive id.
    #[serde(deserialize_with = "deserialize_id")]
    pub id: u32,
    pub name: String,
    /// Photo file name, relative to the roster's photo directory.
    pub photo: String,
}

impl Participant {
    #[must_use]
    pub fn new(id: u32, name: impl Into<String>, photo: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            photo: photo.into(),
        }
    }
}

// Roster files in the wild carry ids both as numbers and as numeric strings.
fn deserialize_id<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(u32),
        Text(String),
    }

    match RawId::deserialize(deserializer)? {
        RawId::Number(id) => Ok(id),
        RawId::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid participant id: {text:?}"))),
    }
}

/// Ordered, immutable participant list with an id index.
#[derive(Debug, Clone)]
pub struct Roster {
    participants: Vec<Participant>,
    index: HashMap<u32, usize>,
}

impl Roster {
    /// Builds a roster, rejecting empty lists, zero ids and duplicate ids.
    pub fn new(participants: Vec<Participant>) -> Result<Self, RosterError> {
        if participants.is_empty() {
            return Err(RosterError::Empty);
        }

        let mut index = HashMap::with_capacity(participants.len());
        for (pos, participant) in participants.iter().enumerate() {
            if participant.id == 0 {
                return Err(RosterError::InvalidId {
                    name: participant.name.clone(),
                });
            }
            if index.insert(participant.id, pos).is_some() {
                return Err(RosterError::DuplicateId { id: participant.id });
            }
        }

        Ok(Self {
            participants,
            index,
        })
    }

    #[must_use]
    pub fn get(&self, id: u32) -> Option<&Participant> {
        self.index.get(&id).map(|&pos| &self.participants[pos])
    }

    #[must_use]
    pub fn contains(&self, id: u32) -> bool {
        self.index.contains_key(&id)
    }

    /// Participants in roster order.
    pub fn iter(&self) -> std::slice::Iter<'_, Participant> {
        self.participants.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Participant] {
        &self.participants
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    /// Always false for a constructed roster; present for API symmetry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }
}

impl<'a> IntoIterator for &'a Roster {
    type Item = &'a Participant;
    type IntoIter = std::slice::Iter<'a, Participant>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Source of the participant roster.
///
/// Loading is a precondition of the engine; failures are not retried.
pub trait RosterProvider {
    fn load_roster(&self) -> Result<Roster, RosterError>;
}

/// Loads `participants.json` and checks every photo exists under `photo_dir`.
#[derive(Debug, Clone)]
pub struct JsonRosterProvider {
    path: PathBuf,
    photo_dir: PathBuf,
}

impl JsonRosterProvider {
    pub fn new(path: impl Into<PathBuf>, photo_dir: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            photo_dir: photo_dir.into(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RosterProvider for JsonRosterProvider {
    fn load_roster(&self) -> Result<Roster, RosterError> {
        let data = std::fs::read(&self.path).map_err(|source| RosterError::Io {
            path: self.path.clone(),
            source,
        })?;
        let participants: Vec<Participant> =
            serde_json::from_slice(&data).map_err(|source| RosterError::Malformed {
                path: self.path.clone(),
                source,
            })?;

        let roster = Roster::new(participants)?;

        for participant in &roster {
            let photo_path = self.photo_dir.join(&participant.photo);
            if !photo_path.is_file() {
                return Err(RosterError::MissingPhoto {
                    id: participant.id,
                    path: photo_path,
                });
            }
        }

        debug!(
            path = %self.path.display(),
            participants = roster.len(),
            "Loaded participant roster"
        );
        Ok(roster)
    }
}
