//! Filesystem watching: OS watcher registrations, raw event translation,
//! and the queue the idle consumer drains.

pub mod backend;
pub mod events;
pub mod queue;

pub use backend::{translate_event, WatcherRegistry};
pub use events::{ChangeKind, ChangeRecord, RawEvent, RawEventKind};
pub use queue::{QueueStats, Waker, WatcherEventQueue};
