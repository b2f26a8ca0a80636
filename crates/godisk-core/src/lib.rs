//! Foundational low-level utilities shared across GoDisk console crates.
//!
//! Provides atomic file-write helpers for the durable key-value store, the
//! millisecond clock used for cache-busting query parameters, and text
//! helpers for bounded error messages.

pub mod atomic_io;
pub mod text_utils;
pub mod time_utils;

pub use atomic_io::write_text_atomic;
pub use text_utils::truncate_for_error;
pub use time_utils::current_unix_timestamp_ms;
