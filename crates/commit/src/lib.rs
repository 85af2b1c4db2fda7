//! Applies differ output to a mutable rendering surface.
//!
//! A [`Committer`] owns one [`Surface`] and the [`IdentityMap`] that ties
//! tree positions to surface handles across cycles. [`ArenaSurface`] is an
//! in-memory surface that can rebuild what it holds as a tree.

mod arena;
mod committer;
mod identity;
mod surface;

pub use crate::arena::{ArenaSurface, SurfaceStats};
pub use crate::committer::{CommitError, CommitSummary, Committer};
pub use crate::identity::{IdentityMap, Slot};
pub use crate::surface::{Surface, SurfaceError};
