use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use docmap_types::Pid;
use serde::{Deserialize, Serialize};

/// BLAKE3 checksum of a datastream payload, hex encoded.
pub fn checksum(content: &[u8]) -> String {
    hex::encode(blake3::hash(content).as_bytes())
}

/// Repository-side metadata of one datastream.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatastreamProfile {
    pub label: String,
    pub mime_type: String,
    pub versionable: bool,
    /// Hex BLAKE3 digest of the stored payload.
    pub checksum: String,
    pub size: u64,
    pub created: DateTime<Utc>,
}

/// A stored datastream: profile plus payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatastreamRecord {
    pub name: String,
    pub profile: DatastreamProfile,
    pub content: Vec<u8>,
}

/// The attributes a client asks the repository to store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatastreamWrite {
    pub label: String,
    pub mime_type: String,
    pub versionable: bool,
    pub content: Vec<u8>,
}

impl DatastreamWrite {
    pub fn new(label: impl Into<String>, mime_type: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            label: label.into(),
            mime_type: mime_type.into(),
            versionable: true,
            content,
        }
    }

    pub fn versionable(mut self, versionable: bool) -> Self {
        self.versionable = versionable;
        self
    }
}

/// A digital object as the repository stores it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub pid: Pid,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub datastreams: BTreeMap<String, DatastreamRecord>,
}

impl ObjectRecord {
    /// An empty record created at `now`.
    pub fn new(pid: Pid, now: DateTime<Utc>) -> Self {
        Self {
            pid,
            created: now,
            modified: now,
            datastreams: BTreeMap::new(),
        }
    }

    pub fn datastream(&self, name: &str) -> Option<&DatastreamRecord> {
        self.datastreams.get(name)
    }

    pub fn has_datastream(&self, name: &str) -> bool {
        self.datastreams.contains_key(name)
    }
}
