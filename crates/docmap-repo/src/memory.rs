use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use docmap_types::Pid;
use tracing::debug;

use crate::error::{RepoError, RepoResult};
use crate::record::{checksum, DatastreamProfile, DatastreamRecord, DatastreamWrite, ObjectRecord};
use crate::traits::RepositoryClient;

/// In-memory, HashMap-based repository.
///
/// Intended for tests and embedding. Records are held behind a `RwLock` and
/// cloned on read. Pids are minted from a per-repository counter.
pub struct InMemoryRepository {
    objects: RwLock<HashMap<Pid, ObjectRecord>>,
    next_id: AtomicU64,
}

impl InMemoryRepository {
    /// Create a new empty repository.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> usize {
        self.read_map().map(|m| m.len()).unwrap_or(0)
    }

    /// Returns `true` if the repository holds no objects.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted list of every stored pid.
    pub fn all_pids(&self) -> RepoResult<Vec<Pid>> {
        let map = self.read_map()?;
        let mut pids: Vec<Pid> = map.keys().cloned().collect();
        pids.sort();
        Ok(pids)
    }

    fn read_map(&self) -> RepoResult<RwLockReadGuard<'_, HashMap<Pid, ObjectRecord>>> {
        self.objects
            .read()
            .map_err(|e| RepoError::Poisoned(e.to_string()))
    }

    fn write_map(&self) -> RepoResult<RwLockWriteGuard<'_, HashMap<Pid, ObjectRecord>>> {
        self.objects
            .write()
            .map_err(|e| RepoError::Poisoned(e.to_string()))
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl RepositoryClient for InMemoryRepository {
    fn fetch(&self, pid: &Pid) -> RepoResult<ObjectRecord> {
        self.read_map()?
            .get(pid)
            .cloned()
            .ok_or_else(|| RepoError::NotFound(pid.clone()))
    }

    fn create(&self, pid: &Pid) -> RepoResult<ObjectRecord> {
        let mut map = self.write_map()?;
        if map.contains_key(pid) {
            return Err(RepoError::AlreadyExists(pid.clone()));
        }
        let record = ObjectRecord::new(pid.clone(), Utc::now());
        map.insert(pid.clone(), record.clone());
        debug!(%pid, "created object");
        Ok(record)
    }

    fn delete(&self, pid: &Pid) -> RepoResult<()> {
        self.write_map()?
            .remove(pid)
            .map(|_| ())
            .ok_or_else(|| RepoError::NotFound(pid.clone()))
    }

    fn read_datastream(&self, pid: &Pid, name: &str) -> RepoResult<DatastreamRecord> {
        let map = self.read_map()?;
        let record = map.get(pid).ok_or_else(|| RepoError::NotFound(pid.clone()))?;
        record
            .datastreams
            .get(name)
            .cloned()
            .ok_or_else(|| RepoError::DatastreamNotFound {
                pid: pid.clone(),
                name: name.to_string(),
            })
    }

    fn write_datastream(
        &self,
        pid: &Pid,
        name: &str,
        write: &DatastreamWrite,
    ) -> RepoResult<DatastreamProfile> {
        let mut map = self.write_map()?;
        let record = map
            .get_mut(pid)
            .ok_or_else(|| RepoError::NotFound(pid.clone()))?;
        let now = Utc::now();
        let created = record
            .datastreams
            .get(name)
            .map(|existing| existing.profile.created)
            .unwrap_or(now);
        let profile = DatastreamProfile {
            label: write.label.clone(),
            mime_type: write.mime_type.clone(),
            versionable: write.versionable,
            checksum: checksum(&write.content),
            size: write.content.len() as u64,
            created,
        };
        record.datastreams.insert(
            name.to_string(),
            DatastreamRecord {
                name: name.to_string(),
                profile: profile.clone(),
                content: write.content.clone(),
            },
        );
        record.modified = now;
        debug!(%pid, datastream = name, size = profile.size, "wrote datastream");
        Ok(profile)
    }

    fn next_pid(&self, namespace: &str) -> RepoResult<Pid> {
        let map = self.read_map()?;
        loop {
            let n = self.next_id.fetch_add(1, Ordering::Relaxed);
            let pid = Pid::from_parts(namespace, &n.to_string())?;
            if !map.contains_key(&pid) {
                return Ok(pid);
            }
        }
    }

    fn exists(&self, pid: &Pid) -> RepoResult<bool> {
        Ok(self.read_map()?.contains_key(pid))
    }
}

impl std::fmt::Debug for InMemoryRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryRepository")
            .field("object_count", &self.len())
            .finish()
    }
}
