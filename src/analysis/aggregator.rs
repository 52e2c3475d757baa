use chrono::{DateTime, Local};
use std::collections::{HashMap, VecDeque};

use crate::analysis::classifier::aggregation_key;
use crate::capture::descriptor::PacketDescriptor;

pub const DEFAULT_HISTORY_CAPACITY: usize = 20;
/// Largest history window the config accepts.
pub const MAX_HISTORY_CAPACITY: usize = 100_000;

/// A received packet with the local time it was ingested.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub packet: PacketDescriptor,
    pub received_at: DateTime<Local>,
}

/// Occurrence counter that remembers the order keys were first seen,
/// so equal counts always rank the same way.
#[derive(Debug, Default)]
struct OrderedCounter {
    index: HashMap<String, usize>,
    entries: Vec<(String, u64)>,
}

impl OrderedCounter {
    fn increment(&mut self, key: &str) {
        match self.index.get(key) {
            Some(&slot) => self.entries[slot].1 += 1,
            None => {
                self.index.insert(key.to_string(), self.entries.len());
                self.entries.push((key.to_string(), 1));
            }
        }
    }

    fn get(&self, key: &str) -> u64 {
        self.index.get(key).map(|&slot| self.entries[slot].1).unwrap_or(0)
    }

    fn ranked(&self, limit: Option<usize>) -> Vec<(String, u64)> {
        let mut ranked = self.entries.clone();
        // sort_by is stable: ties keep first-seen order
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        if let Some(limit) = limit {
            ranked.truncate(limit);
        }
        ranked
    }
}

/// Read-only view of the aggregator at one point in time.
#[derive(Debug, Clone)]
pub struct Snapshot<'a> {
    /// Oldest first.
    pub history: &'a VecDeque<HistoryEntry>,
    pub top_talkers: Vec<(String, u64)>,
    pub protocols: Vec<(String, u64)>,
    pub total_bytes: u64,
    pub total_packets: u64,
}

/// Rolling packet history plus cumulative session counters.
///
/// History is a display window with FIFO eviction; the counters cover every
/// packet ever ingested and are never decremented when history evicts.
#[derive(Debug)]
pub struct Aggregator {
    capacity: usize,
    history: VecDeque<HistoryEntry>,
    total_bytes: u64,
    total_packets: u64,
    talkers: OrderedCounter,
    protocols: OrderedCounter,
}

impl Aggregator {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            // grows on demand; capacity only bounds it
            history: VecDeque::new(),
            total_bytes: 0,
            total_packets: 0,
            talkers: OrderedCounter::default(),
            protocols: OrderedCounter::default(),
        }
    }

    pub fn ingest(&mut self, packet: PacketDescriptor) {
        self.ingest_at(packet, Local::now());
    }

    pub fn ingest_at(&mut self, packet: PacketDescriptor, received_at: DateTime<Local>) {
        let key = aggregation_key(&packet);

        self.total_bytes = self.total_bytes.saturating_add(packet.size);
        self.total_packets += 1;
        // An empty id means the record carried no source address; counting it
        // would rank a blank row among the top talkers.
        if !key.talker_id.is_empty() {
            self.talkers.increment(&key.talker_id);
        }
        self.protocols.increment(&key.protocol_label);

        if self.capacity == 0 {
            return;
        }
        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(HistoryEntry { packet, received_at });
    }

    pub fn snapshot(&self, top_n: usize) -> Snapshot<'_> {
        Snapshot {
            history: &self.history,
            top_talkers: self.top_talkers(top_n),
            protocols: self.protocol_breakdown(),
            total_bytes: self.total_bytes,
            total_packets: self.total_packets,
        }
    }

    pub fn top_talkers(&self, n: usize) -> Vec<(String, u64)> {
        self.talkers.ranked(Some(n))
    }

    pub fn protocol_breakdown(&self) -> Vec<(String, u64)> {
        self.protocols.ranked(None)
    }

    pub fn talker_count(&self, talker_id: &str) -> u64 {
        self.talkers.get(talker_id)
    }

    pub fn protocol_count(&self, label: &str) -> u64 {
        self.protocols.get(label)
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn total_packets(&self) -> u64 {
        self.total_packets
    }

    pub fn history(&self) -> &VecDeque<HistoryEntry> {
        &self.history
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::descriptor::{PacketKind, WifiSubtype};

    fn tcp_from(src_ip: &str, size: u64) -> PacketDescriptor {
        let mut packet = PacketDescriptor::new(PacketKind::Tcp, size);
        packet.src_ip = src_ip.to_string();
        packet
    }

    fn sizes(aggregator: &Aggregator) -> Vec<u64> {
        aggregator.history().iter().map(|e| e.packet.size).collect()
    }

    #[test]
    fn test_three_tcp_packets_from_one_talker() {
        let mut aggregator = Aggregator::new(20);
        for size in [100, 200, 50] {
            aggregator.ingest(tcp_from("10.0.0.5", size));
        }

        assert_eq!(aggregator.total_bytes(), 350);
        assert_eq!(aggregator.talker_count("10.0.0.5"), 3);
        assert_eq!(aggregator.top_talkers(1), vec![("10.0.0.5".to_string(), 3)]);
        assert_eq!(aggregator.protocol_breakdown(), vec![("TCP".to_string(), 3)]);
    }

    #[test]
    fn test_eviction_keeps_counters() {
        let mut aggregator = Aggregator::new(2);
        aggregator.ingest(tcp_from("10.0.0.1", 10));
        aggregator.ingest(tcp_from("10.0.0.2", 20));
        aggregator.ingest(tcp_from("10.0.0.3", 30));

        assert_eq!(sizes(&aggregator), vec![20, 30]);
        assert_eq!(aggregator.total_bytes(), 60);
        assert_eq!(aggregator.total_packets(), 3);
        assert_eq!(aggregator.talker_count("10.0.0.1"), 1);
    }

    #[test]
    fn test_history_never_exceeds_capacity() {
        let mut aggregator = Aggregator::new(5);
        let mut expected_bytes = 0;
        for size in 0..50u64 {
            aggregator.ingest(tcp_from("10.0.0.1", size));
            expected_bytes += size;
            assert!(aggregator.history().len() <= 5);
        }

        assert_eq!(sizes(&aggregator), vec![45, 46, 47, 48, 49]);
        assert_eq!(aggregator.total_bytes(), expected_bytes);
    }

    #[test]
    fn test_zero_capacity_still_counts() {
        let mut aggregator = Aggregator::new(0);
        aggregator.ingest(tcp_from("10.0.0.1", 10));
        assert!(aggregator.history().is_empty());
        assert_eq!(aggregator.total_bytes(), 10);
        assert_eq!(aggregator.protocol_count("TCP"), 1);
    }

    #[test]
    fn test_huge_capacity_does_not_preallocate() {
        let mut aggregator = Aggregator::new(usize::MAX / 8);
        aggregator.ingest(tcp_from("10.0.0.1", 10));
        aggregator.ingest(tcp_from("10.0.0.2", 20));
        assert_eq!(sizes(&aggregator), vec![10, 20]);
    }

    #[test]
    fn test_ties_rank_by_first_occurrence() {
        let mut aggregator = Aggregator::new(10);
        aggregator.ingest(tcp_from("10.0.0.3", 1));
        aggregator.ingest(tcp_from("10.0.0.1", 1));
        aggregator.ingest(tcp_from("10.0.0.2", 1));
        aggregator.ingest(tcp_from("10.0.0.2", 1));
        aggregator.ingest(tcp_from("10.0.0.1", 1));

        let expected = vec![
            ("10.0.0.1".to_string(), 2),
            ("10.0.0.2".to_string(), 2),
            ("10.0.0.3".to_string(), 1),
        ];
        assert_eq!(aggregator.top_talkers(10), expected);
        // stable across calls
        assert_eq!(aggregator.top_talkers(10), expected);
        assert_eq!(aggregator.top_talkers(2), expected[..2].to_vec());
    }

    #[test]
    fn test_protocol_breakdown_by_label() {
        let mut aggregator = Aggregator::new(10);
        let mut beacon = PacketDescriptor::new(PacketKind::Wifi(Some(WifiSubtype::Beacon)), 100);
        beacon.src_mac = "AA:BB:CC:DD:EE:FF".to_string();

        aggregator.ingest(PacketDescriptor::new(PacketKind::Udp, 1));
        aggregator.ingest(beacon.clone());
        aggregator.ingest(beacon);
        aggregator.ingest(PacketDescriptor::new(PacketKind::Wifi(None), 1));

        assert_eq!(
            aggregator.protocol_breakdown(),
            vec![
                ("BEACON".to_string(), 2),
                ("UDP".to_string(), 1),
                ("Unknown".to_string(), 1),
            ]
        );
        assert_eq!(aggregator.talker_count("AA:BB:CC:DD:EE:FF"), 2);
        // addressless packets are not talkers
        assert_eq!(aggregator.top_talkers(10).len(), 1);
    }

    #[test]
    fn test_snapshot_does_not_mutate() {
        let mut aggregator = Aggregator::new(3);
        aggregator.ingest(tcp_from("10.0.0.5", 100));

        let first = aggregator.snapshot(10);
        let second = aggregator.snapshot(10);
        assert_eq!(first.history.len(), 1);
        assert_eq!(first.top_talkers, second.top_talkers);
        assert_eq!(first.total_bytes, second.total_bytes);

        aggregator.ingest(tcp_from("10.0.0.6", 1));
        let third = aggregator.snapshot(10);
        assert_eq!(third.history.len(), 2);
        assert_eq!(third.total_packets, 2);
    }
}
