//! Access control policy subsystem.
//!
//! # Data Flow
//! ```text
//! policy source (control plane or local directory)
//!     → watcher.rs (poll on interval, structural diff)
//!     → update functions (ordered fan-out, batch errors)
//!     → dispatch.rs (build_routes)
//!     → DispatchTable (immutable, swapped atomically by the server)
//! ```
//!
//! # Design Decisions
//! - The watcher owns the last-seen snapshot; nothing else mutates it
//! - Change detection is structural equality over the whole set
//! - A table build is all-or-nothing; a failed build never goes live

pub mod dispatch;
pub mod schema;
pub mod source;
pub mod watcher;

pub use schema::{AcpConfig, AcpSet};
pub use watcher::AcpWatcher;
