// Public API surface handed to display/persistence collaborators

pub mod streams;
mod types;

pub use streams::{live_readout_stream, result_stream};
pub use types::LiveReadout;
