//! Round scanning engine: deadline reminders, round events and the
//! notification fan-out they share.

pub mod candidate;
pub mod context;
pub mod dedupe;
pub mod dispatch;
pub mod events;
pub mod lock;
pub mod reminder;
pub mod scan;
pub mod upstream;

pub use context::ScanContext;
pub use scan::{ScanMode, ScanReport, Scanner};
