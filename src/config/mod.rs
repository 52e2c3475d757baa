pub mod settings;

pub use settings::{Config, ConfigError, HistoryConfig, ListenerConfig, UiConfig};
