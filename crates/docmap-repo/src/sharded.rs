//! Pid-hash routing across several repositories.

use std::sync::Arc;

use docmap_types::Pid;

use crate::error::{RepoError, RepoResult};
use crate::record::{DatastreamProfile, DatastreamRecord, DatastreamWrite, ObjectRecord};
use crate::traits::RepositoryClient;

/// Index of the shard that owns `pid` among `shard_count` shards.
///
/// CRC-32 of the pid bytes modulo the shard count. A single shard always
/// maps to index 0.
pub fn shard_index(pid: &Pid, shard_count: usize) -> usize {
    if shard_count <= 1 {
        return 0;
    }
    crc32fast::hash(pid.as_str().as_bytes()) as usize % shard_count
}

/// A repository made of several independent shards.
///
/// Each object lives on exactly one shard, chosen by [`shard_index`]. Pids
/// are minted by the first shard and skipped while any owning shard already
/// holds them.
pub struct ShardedRepository {
    shards: Vec<Arc<dyn RepositoryClient>>,
}

impl ShardedRepository {
    pub fn new(shards: Vec<Arc<dyn RepositoryClient>>) -> RepoResult<Self> {
        if shards.is_empty() {
            return Err(RepoError::Unavailable("sharded repository needs at least one shard".into()));
        }
        Ok(Self { shards })
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// The client owning `pid`.
    pub fn connection_for_pid(&self, pid: &Pid) -> &dyn RepositoryClient {
        self.shards[shard_index(pid, self.shards.len())].as_ref()
    }
}

impl RepositoryClient for ShardedRepository {
    fn fetch(&self, pid: &Pid) -> RepoResult<ObjectRecord> {
        self.connection_for_pid(pid).fetch(pid)
    }

    fn create(&self, pid: &Pid) -> RepoResult<ObjectRecord> {
        self.connection_for_pid(pid).create(pid)
    }

    fn delete(&self, pid: &Pid) -> RepoResult<()> {
        self.connection_for_pid(pid).delete(pid)
    }

    fn read_datastream(&self, pid: &Pid, name: &str) -> RepoResult<DatastreamRecord> {
        self.connection_for_pid(pid).read_datastream(pid, name)
    }

    fn write_datastream(
        &self,
        pid: &Pid,
        name: &str,
        write: &DatastreamWrite,
    ) -> RepoResult<DatastreamProfile> {
        self.connection_for_pid(pid).write_datastream(pid, name, write)
    }

    fn next_pid(&self, namespace: &str) -> RepoResult<Pid> {
        loop {
            let pid = self.shards[0].next_pid(namespace)?;
            if !self.exists(&pid)? {
                return Ok(pid);
            }
        }
    }

    fn exists(&self, pid: &Pid) -> RepoResult<bool> {
        self.connection_for_pid(pid).exists(pid)
    }
}

impl std::fmt::Debug for ShardedRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardedRepository")
            .field("shards", &self.shards.len())
            .finish()
    }
}
