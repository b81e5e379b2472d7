use docmap_types::Pid;

use crate::error::{RepoError, RepoResult};
use crate::record::{DatastreamProfile, DatastreamRecord, DatastreamWrite, ObjectRecord};

/// Client for the versioned content repository.
///
/// All implementations must satisfy these invariants:
/// - A missing object yields [`RepoError::NotFound`], distinct from
///   transport or storage failures.
/// - `write_datastream` returns the profile as actually stored; the
///   repository, not the caller, decides whether versioning is active.
/// - Calls are blocking; timeouts and retries belong to the implementation.
pub trait RepositoryClient: Send + Sync {
    /// Fetch a full object record.
    fn fetch(&self, pid: &Pid) -> RepoResult<ObjectRecord>;

    /// Create an empty object. Fails with `AlreadyExists` if the pid is taken.
    fn create(&self, pid: &Pid) -> RepoResult<ObjectRecord>;

    /// Delete an object and all of its datastreams.
    fn delete(&self, pid: &Pid) -> RepoResult<()>;

    /// Read one datastream of an object.
    fn read_datastream(&self, pid: &Pid, name: &str) -> RepoResult<DatastreamRecord>;

    /// Create or replace one datastream of an existing object.
    fn write_datastream(
        &self,
        pid: &Pid,
        name: &str,
        write: &DatastreamWrite,
    ) -> RepoResult<DatastreamProfile>;

    /// Mint a fresh pid in `namespace`.
    fn next_pid(&self, namespace: &str) -> RepoResult<Pid>;

    /// Check whether an object exists.
    ///
    /// Default implementation calls `fetch()` and maps not-found to `false`.
    fn exists(&self, pid: &Pid) -> RepoResult<bool> {
        match self.fetch(pid) {
            Ok(_) => Ok(true),
            Err(RepoError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
