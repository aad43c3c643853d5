//! Newsletter send gating.

mod gate;

pub use gate::{SendError, SendGate};
