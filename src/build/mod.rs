//! Build state and the swap engine.
//!
//! A [`BuildState`] is the typed, in-memory view of one session's part
//! selections; a [`BuildSnapshot`] is its id-only wire form. Snapshots are
//! hydrated through a catalog client, and every operation on a build returns
//! a new value.

mod state;
mod swap;

pub use state::{BuildSnapshot, BuildState};
pub use swap::apply_swap;
