//! # vtree
//!
//! Immutable UI tree descriptions and the differ that turns a pair of trees
//! into an ordered [`MutationSet`].
//!
//! - [`Node`] / [`Child`]: elements and text leaves, built with
//!   [`Node::element`] or [`create_element`].
//! - [`diff`]: validated, deterministic diff; keyed sibling groups produce
//!   moves, unkeyed groups are compared slot by slot.
//! - [`Mutation`]: the protocol a committer applies, addressed by
//!   [`NodePath`].
//!
//! The differ is pure: it never touches its inputs and may run on any
//! thread.

pub mod corpus;
pub mod diff;
pub mod mutation;
#[cfg(any(test, feature = "tree-snapshot"))]
pub mod snapshot;

mod builder;
mod types;
mod validate;

pub use crate::builder::{ElementBuilder, create_element};
pub use crate::diff::{DiffError, DiffOptions, diff, diff_with_options};
pub use crate::mutation::{
    AttrDiff, Mutation, MutationCounts, MutationKind, MutationSet, NodePath,
};
pub use crate::types::{Child, ComponentRef, FunctionRef, Node, TEXT_TAG, Tag, TextValue, Value};
