// Library exports for packet-dashboard
pub mod analysis;
pub mod capture;
pub mod config;
pub mod ui;
pub mod utils;
pub mod visualization;

pub use analysis::{aggregator, classifier};
pub use capture::{descriptor, listener};
pub use config::settings;
pub use ui::app;
pub use utils::formatting;
pub use visualization::{presenter, widgets};

// Error types
pub use anyhow::{Error, Result};
