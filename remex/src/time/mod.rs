//! Timer primitives: sleeping and deadlines.

mod sleep;
mod timeout;

pub use sleep::{sleep, Sleep};
pub use timeout::{timeout, Elapsed, Timeout};
