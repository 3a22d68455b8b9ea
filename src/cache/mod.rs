//! Response cache module
//!
//! Time-to-live cache of decoded responses, keyed by request identity.
//!
//! # Overview
//!
//! Entries are stored as serialized JSON so every hit hands back the same
//! bytes that were stored. There is no size bound or LRU; an entry stops
//! being visible at its expiry and is replaced by the next `set` for its key.

mod store;

pub use store::{cache_key, ResponseCache};
