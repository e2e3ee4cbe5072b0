//! PIT (Pending Interest Table).
//!
//! Entries are keyed by Interest name. Each entry tracks where the Interest
//! came from (in-records) and where it was forwarded (out-records).
//! Out-records persist until the entry itself is erased, so the strategy can
//! still reason about upstreams whose record has expired.

use crate::clock::Timestamp;
use ndn_asf_common::name::Name;
use ndn_asf_common::types::{FaceId, Nonce};
use std::any::Any;
use std::collections::HashMap;
use std::time::Duration;

/// Record of a downstream that requested the name.
#[derive(Debug, Clone)]
pub struct InRecord {
    pub face: FaceId,
    pub nonce: Nonce,
    pub expiry: Timestamp,
}

/// Record of an upstream the Interest was forwarded to.
#[derive(Debug, Clone)]
pub struct OutRecord {
    pub face: FaceId,
    pub last_nonce: Nonce,
    /// When the Interest was last transmitted on this face.
    pub last_tx_time: Timestamp,
    pub expiry: Timestamp,
    /// Whether the last transmission on this face was a probe.
    pub is_probe: bool,
}

impl OutRecord {
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expiry <= now
    }
}

/// A pending Interest.
#[derive(Debug)]
pub struct PitEntry {
    name: Name,
    in_records: Vec<InRecord>,
    out_records: Vec<OutRecord>,
    satisfied: bool,
    /// Opaque per-entry state owned by the forwarding strategy.
    strategy_info: Option<Box<dyn Any>>,
}

impl PitEntry {
    fn new(name: Name) -> Self {
        Self {
            name,
            in_records: Vec::new(),
            out_records: Vec::new(),
            satisfied: false,
            strategy_info: None,
        }
    }

    /// Whether Data already satisfied this entry. The entry lingers until
    /// its records expire so that straggler Data can still be measured.
    pub fn is_satisfied(&self) -> bool {
        self.satisfied
    }

    pub fn mark_satisfied(&mut self) {
        self.satisfied = true;
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn in_records(&self) -> &[InRecord] {
        &self.in_records
    }

    pub fn out_records(&self) -> &[OutRecord] {
        &self.out_records
    }

    /// Whether the Interest was already forwarded somewhere, i.e. a further
    /// Interest for this entry is a retransmission.
    pub fn has_out_records(&self) -> bool {
        !self.out_records.is_empty()
    }

    /// Inserts or refreshes the in-record for `face`.
    pub fn insert_in_record(&mut self, face: FaceId, nonce: Nonce, expiry: Timestamp) {
        match self.in_records.iter_mut().find(|r| r.face == face) {
            Some(record) => {
                record.nonce = nonce;
                record.expiry = record.expiry.max(expiry);
            }
            None => self.in_records.push(InRecord { face, nonce, expiry }),
        }
    }

    /// Inserts or refreshes the out-record for `face`.
    pub fn insert_out_record(
        &mut self,
        face: FaceId,
        nonce: Nonce,
        now: Timestamp,
        lifetime: Duration,
        is_probe: bool,
    ) {
        let expiry = now + lifetime;
        match self.out_records.iter_mut().find(|r| r.face == face) {
            Some(record) => {
                record.last_nonce = nonce;
                record.last_tx_time = now;
                record.expiry = record.expiry.max(expiry);
                record.is_probe = is_probe;
            }
            None => self.out_records.push(OutRecord {
                face,
                last_nonce: nonce,
                last_tx_time: now,
                expiry,
                is_probe,
            }),
        }
    }

    pub fn out_record(&self, face: FaceId) -> Option<&OutRecord> {
        self.out_records.iter().find(|r| r.face == face)
    }

    /// Latest instant at which any record of this entry is still alive.
    pub fn expiry(&self) -> Timestamp {
        self.in_records
            .iter()
            .map(|r| r.expiry)
            .chain(self.out_records.iter().map(|r| r.expiry))
            .max()
            .unwrap_or(Timestamp::ZERO)
    }

    /// Typed access to the strategy's per-entry state, created on first use.
    pub fn strategy_info_mut<T: Default + 'static>(&mut self) -> &mut T {
        let needs_init = !self
            .strategy_info
            .as_ref()
            .is_some_and(|info| info.is::<T>());
        if needs_init {
            self.strategy_info = Some(Box::<T>::default());
        }
        self.strategy_info
            .as_mut()
            .and_then(|info| info.downcast_mut::<T>())
            .expect("strategy info type established above")
    }
}

/// The Pending Interest Table.
#[derive(Debug, Default)]
pub struct Pit {
    entries: HashMap<Name, PitEntry>,
}

impl Pit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Finds or creates the entry for `name`.
    pub fn find_or_create(&mut self, name: &Name) -> &mut PitEntry {
        self.entries
            .entry(name.clone())
            .or_insert_with(|| PitEntry::new(name.clone()))
    }

    pub fn get(&self, name: &Name) -> Option<&PitEntry> {
        self.entries.get(name)
    }

    pub fn get_mut(&mut self, name: &Name) -> Option<&mut PitEntry> {
        self.entries.get_mut(name)
    }

    pub fn erase(&mut self, name: &Name) -> Option<PitEntry> {
        self.entries.remove(name)
    }

    /// Drops every entry whose records have all lapsed.
    pub fn prune_expired(&mut self, now: Timestamp) {
        self.entries.retain(|_, entry| entry.expiry() > now);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(uri: &str) -> Name {
        Name::from_uri(uri).unwrap()
    }

    const LIFETIME: Duration = Duration::from_secs(4);

    #[test]
    fn out_record_refresh_keeps_latest_tx() {
        let mut pit = Pit::new();
        let entry = pit.find_or_create(&name("/a"));
        entry.insert_out_record(FaceId(1), 100, Duration::ZERO, LIFETIME, false);
        entry.insert_out_record(FaceId(1), 101, Duration::from_millis(50), LIFETIME, false);

        let record = entry.out_record(FaceId(1)).unwrap();
        assert_eq!(record.last_nonce, 101);
        assert_eq!(record.last_tx_time, Duration::from_millis(50));
        assert_eq!(entry.out_records().len(), 1);
    }

    #[test]
    fn retransmission_detection() {
        let mut pit = Pit::new();
        let entry = pit.find_or_create(&name("/a"));
        entry.insert_in_record(FaceId(9), 1, LIFETIME);
        assert!(!entry.has_out_records());
        entry.insert_out_record(FaceId(1), 1, Duration::ZERO, LIFETIME, false);
        assert!(entry.has_out_records());
    }

    #[test]
    fn prune_drops_fully_expired_entries() {
        let mut pit = Pit::new();
        {
            let entry = pit.find_or_create(&name("/a"));
            entry.insert_in_record(FaceId(9), 1, Duration::from_millis(5));
        }
        {
            let entry = pit.find_or_create(&name("/b"));
            entry.insert_in_record(FaceId(9), 2, Duration::from_millis(500));
        }
        pit.prune_expired(Duration::from_millis(10));
        assert!(pit.get(&name("/a")).is_none());
        assert!(pit.get(&name("/b")).is_some());
    }

    #[test]
    fn strategy_info_is_sticky() {
        #[derive(Default)]
        struct Info {
            hits: u32,
        }

        let mut pit = Pit::new();
        let entry = pit.find_or_create(&name("/a"));
        entry.strategy_info_mut::<Info>().hits += 1;
        entry.strategy_info_mut::<Info>().hits += 1;
        assert_eq!(entry.strategy_info_mut::<Info>().hits, 2);
    }
}
