//! Client orchestration for the GoDisk console.
//!
//! Detects `rep` directives in a script, dispatches the script, polls the
//! requested reports and reconciles everything into one set of display
//! surfaces guarded by a monotonically increasing request token. Also hosts
//! the session store and the login flow built on command-output sniffing.

pub mod auth;
pub mod block_runs;
pub mod content_opener;
pub mod directives;
pub mod dispatch;
pub mod error;
pub mod inode_explorer;
pub mod session_store;
pub mod surfaces;
pub mod tiling;

pub use auth::{output_error_message, AuthService, LOGIN_FAILURE_FALLBACK, NO_MOUNTS_PLACEHOLDER};
pub use block_runs::{contiguous_runs, format_runs};
pub use content_opener::{ContentOpener, FileOpenRequest, NoopContentOpener};
pub use directives::{detect_directives, DetectedDirectives};
pub use dispatch::{Console, ConsoleConfig, DispatchOutcome};
pub use error::ConsoleError;
pub use inode_explorer::{fetch_inode, fetch_inode_chain, DEFAULT_MAX_CHAIN_NODES};
pub use session_store::{
    FileKeyValueStore, KeyValueStore, MemoryKeyValueStore, Session, SessionStore,
    SessionStoreError, SESSION_STORAGE_KEY,
};
pub use surfaces::{ConsoleSurfaces, RedrawHandler};
pub use tiling::{
    apportion_tiles, tile_segments, Tile, DISK_TILE_BUDGET, EXTENDED_TILE_BUDGET, FREE_TILE_KIND,
    FREE_TILE_LABEL,
};
