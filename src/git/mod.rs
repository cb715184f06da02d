//! Version-control integration layer.
//!
//! All state-changing operations (clone, pull, push, ...) go through the
//! installed executables via [`Invoker`]. The `git2` backend is only used
//! for read-only inspection of a local working copy.

mod git2_backend;
mod invoker;

pub use git2_backend::default_branch;
pub use invoker::{CancelToken, Captured, Invoker, Tool};
