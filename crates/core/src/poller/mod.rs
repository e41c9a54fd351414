//! Change detection that drives reconciliation.
//!
//! Two pollers feed the same `PollHandler`:
//! - `ChangePoller` hashes an element of a watched web page and fires when
//!   the hash changes
//! - `IntervalPoller` fires on every tick as a fallback
//!
//! Both run on `spawn_ticker` and are stopped through their `PollerHandle`.

mod change;
mod interval;
mod ticker;
mod types;

pub use change::{fingerprint_fragment, ChangePoller};
pub use interval::IntervalPoller;
pub use ticker::{spawn_ticker, PollerHandle};
pub use types::*;
