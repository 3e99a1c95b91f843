//! Feishu calendar free/busy lookup.
//!
//! Fetches busy periods per user, merges them and reports the common free
//! slots inside a day window.

pub mod client;
pub mod error;
pub mod intervals;
pub mod resolver;
pub mod types;

pub use client::{BusySource, FreeBusyClient};
pub use error::CalendarError;
pub use intervals::{free_slots, merge_intervals};
pub use resolver::FreeBusyResolver;
pub use types::{BusyInterval, BusyPeriod, FreeSlot, FreeSlotQuery};
