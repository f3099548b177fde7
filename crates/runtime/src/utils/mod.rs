//! Small concurrency and time helpers shared by the runtime services.

mod clock;
mod keyed;
mod shared;

pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use keyed::{KeyedGuard, KeyedLocks};
pub use shared::Shared;
