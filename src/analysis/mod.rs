pub mod aggregator;
pub mod classifier;

pub use aggregator::{Aggregator, HistoryEntry, Snapshot};
pub use classifier::{
    aggregation_key, classify, AggregationKey, Classification, SignalHint, StyleHint,
};
