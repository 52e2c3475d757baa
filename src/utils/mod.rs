pub mod formatting;
pub mod shutdown;

pub use formatting::{format_endpoint, format_kib, truncate_address};
pub use shutdown::CancellationToken;
