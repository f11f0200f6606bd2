//! Session persistence for Palaver.
//!
//! A session owns an append-only raw transcript and an ordered list of
//! rolling summaries indexing into it. Storage backends implement
//! [`SessionStorage`]; [`SessionLockMap`] serializes turns per session.

pub mod file;
pub mod lock;
pub mod memory;
pub mod record;
pub mod storage;

pub use file::FileSessionStore;
pub use lock::SessionLockMap;
pub use memory::InMemorySessionStore;
pub use record::{RollingSummary, SessionRecord, METADATA_TITLE};
pub use storage::SessionStorage;
