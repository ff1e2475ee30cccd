//! Session channel: the duplex connection utterances arrive on and frames
//! leave by.

pub mod frame;
pub mod ws;

pub use frame::{FrameSink, ServerFrame};
pub use ws::{AppState, session_routes};
