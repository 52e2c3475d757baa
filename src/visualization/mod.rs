pub mod presenter;
pub mod widgets;

pub use presenter::{DisplayModel, PacketRow, Presenter, StatsPanel};
pub use widgets::{draw_dashboard, PacketTable, StatsSidebar};
