//! Per-key write bookkeeping for the host's published fields.
//!
//! Every queued write stamps its key with a fresh sequence number. Only the
//! write holding the current stamp may be applied or settle the key's
//! status; anything older has been superseded.

use dashmap::DashMap;

use lobbyline_core::MetadataKey;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldStatus {
    /// Queued, or sent and not yet acknowledged.
    Pending,
    Published,
    Failed(String),
}

#[derive(Debug, Clone)]
struct Entry {
    seq: u64,
    status: FieldStatus,
}

#[derive(Default)]
pub struct FieldLedger {
    entries: DashMap<MetadataKey, Entry>,
}

impl FieldLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn begin(&self, key: MetadataKey, seq: u64) {
        self.entries.insert(key, Entry { seq, status: FieldStatus::Pending });
    }

    pub(crate) fn is_current(&self, key: MetadataKey, seq: u64) -> bool {
        self.entries.get(&key).map(|e| e.seq == seq).unwrap_or(false)
    }

    /// Record the outcome of write `seq`. Ignored if a newer write exists.
    pub(crate) fn settle(&self, key: MetadataKey, seq: u64, status: FieldStatus) -> bool {
        match self.entries.get_mut(&key) {
            Some(mut e) if e.seq == seq => {
                e.status = status;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn clear(&self) {
        self.entries.clear();
    }

    pub fn status(&self, key: MetadataKey) -> Option<FieldStatus> {
        self.entries.get(&key).map(|e| e.status.clone())
    }

    /// Keys whose latest write failed, in publish order.
    pub fn failed(&self) -> Vec<(MetadataKey, String)> {
        MetadataKey::ALL
            .iter()
            .filter_map(|&k| match self.status(k) {
                Some(FieldStatus::Failed(reason)) => Some((k, reason)),
                _ => None,
            })
            .collect()
    }

    pub fn pending(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.value().status == FieldStatus::Pending)
            .count()
    }
}
