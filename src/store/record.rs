//! # Value stored under the leader key.

use std::fmt;
use std::str::FromStr;

/// Identifies the node holding the leader lock.
///
/// Encoded as `<holder>/<pid>`; the holder is the node id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LockRecord {
    /// Node id of the leader.
    pub holder: String,
    /// OS process id of the leader's supervisor.
    pub pid: u32,
}

impl LockRecord {
    /// Record for the current process.
    pub fn current(holder: impl Into<String>) -> Self {
        Self {
            holder: holder.into(),
            pid: std::process::id(),
        }
    }
}

impl fmt::Display for LockRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.holder, self.pid)
    }
}

/// Error returned when a stored value is not a lock record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed lock record: {0:?}")]
pub struct ParseLockRecordError(String);

impl FromStr for LockRecord {
    type Err = ParseLockRecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (holder, pid) = s
            .rsplit_once('/')
            .ok_or_else(|| ParseLockRecordError(s.to_string()))?;
        let pid = pid
            .parse()
            .map_err(|_| ParseLockRecordError(s.to_string()))?;
        if holder.is_empty() {
            return Err(ParseLockRecordError(s.to_string()));
        }
        Ok(Self {
            holder: holder.to_string(),
            pid,
        })
    }
}
