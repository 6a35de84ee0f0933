//! kkn-state: embedded store for the KKN autogroup service.
//!
//! Backed by [redb](https://docs.rs/redb). Holds placement locations,
//! filter criteria, grouping history headers, and one detail row per
//! placed student.
//!
//! # Architecture
//!
//! Records are JSON-serialized into `&[u8]` value columns. Numeric ids come
//! from a `sequences` table bumped inside the same write transaction as the
//! insert. Member rows use the composite key
//! `{grouping:010}:{group:05}:{seq:05}` so one prefix scan returns every
//! row of a grouping.
//!
//! `StateStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`)
//! and can be shared across async tasks.

pub mod error;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StateError, StateResult};
pub use store::StateStore;
pub use types::*;
