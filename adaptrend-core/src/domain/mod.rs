//! Domain types for the adaptive trend engine.

pub mod bar;
pub mod signal;

pub use bar::Bar;
pub use signal::{Direction, SignalEvent, Trend};
