use crate::analysis::aggregator::Snapshot;
use crate::analysis::classifier::{classify, SignalHint, StyleHint};
use crate::utils::formatting::{format_kib, truncate_address};

pub const DEFAULT_TOP_TALKERS: usize = 10;

/// Columns a talker address may take in the side panel.
const TALKER_WIDTH: usize = 18;

/// One row of the live packet table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketRow {
    pub time: String,
    pub label: String,
    pub source: String,
    pub destination: String,
    pub annotation: String,
    pub signal: SignalHint,
    pub style: StyleHint,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsPanel {
    pub top_talkers: Vec<(String, u64)>,
    pub protocols: Vec<(String, u64)>,
    pub total_bytes: u64,
    pub total_display: String,
    pub total_packets: u64,
}

/// Everything the rendering backend needs for one frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayModel {
    /// Oldest first.
    pub rows: Vec<PacketRow>,
    pub stats: StatsPanel,
    pub footer: String,
}

#[derive(Debug, Clone)]
pub struct Presenter {
    top_talkers: usize,
}

impl Presenter {
    pub fn new(top_talkers: usize) -> Self {
        Self { top_talkers }
    }

    pub fn top_talkers(&self) -> usize {
        self.top_talkers
    }

    pub fn present(&self, snapshot: &Snapshot<'_>) -> DisplayModel {
        let rows = snapshot
            .history
            .iter()
            .map(|entry| {
                let class = classify(&entry.packet);
                PacketRow {
                    time: entry.received_at.format("%H:%M:%S").to_string(),
                    label: class.label,
                    source: class.source,
                    destination: class.destination,
                    annotation: class.annotation,
                    signal: class.signal,
                    style: class.style,
                }
            })
            .collect();

        let top_talkers = snapshot
            .top_talkers
            .iter()
            .take(self.top_talkers)
            .map(|(addr, count)| (truncate_address(addr, TALKER_WIDTH), *count))
            .collect();

        DisplayModel {
            rows,
            stats: StatsPanel {
                top_talkers,
                protocols: snapshot.protocols.clone(),
                total_bytes: snapshot.total_bytes,
                total_display: format_kib(snapshot.total_bytes),
                total_packets: snapshot.total_packets,
            },
            footer: String::new(),
        }
    }
}

impl Default for Presenter {
    fn default() -> Self {
        Self::new(DEFAULT_TOP_TALKERS)
    }
}
