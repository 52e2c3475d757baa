pub mod app;
pub mod terminal;

pub use app::{Dashboard, DashboardError, LoopState};
pub use terminal::{RenderBackend, RenderError, TerminalBackend};
