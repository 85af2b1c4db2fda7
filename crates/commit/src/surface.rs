use core_types::SurfaceHandle;
use thiserror::Error;
use vtree::{TEXT_TAG, Tag, TextValue, Value};

/// Failure reported by a surface operation.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{op}: {message}")]
pub struct SurfaceError {
    op: &'static str,
    message: String,
}

impl SurfaceError {
    pub fn new(op: &'static str, message: impl Into<String>) -> Self {
        Self {
            op,
            message: message.into(),
        }
    }

    pub fn op(&self) -> &'static str {
        self.op
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Mutable rendering target driven by a `Committer`.
///
/// Handles are allocated by the surface and stay valid until the surface
/// is dropped; a detached node keeps its handle. Implementations are not
/// required to be thread-safe: one committer owns one surface.
pub trait Surface {
    /// Allocates a detached element.
    fn create_element(&mut self, tag: &Tag) -> Result<SurfaceHandle, SurfaceError>;

    /// Allocates a detached text leaf.
    ///
    /// The default creates a `#text` element and sets its content, for
    /// surfaces without a dedicated text node type.
    fn create_text(&mut self, value: &TextValue) -> Result<SurfaceHandle, SurfaceError> {
        let handle = self.create_element(&Tag::host(TEXT_TAG))?;
        self.set_text(handle, value)?;
        Ok(handle)
    }

    fn set_text(&mut self, handle: SurfaceHandle, value: &TextValue) -> Result<(), SurfaceError>;

    fn set_attribute(
        &mut self,
        handle: SurfaceHandle,
        name: &str,
        value: &Value,
    ) -> Result<(), SurfaceError>;

    fn remove_attribute(&mut self, handle: SurfaceHandle, name: &str) -> Result<(), SurfaceError>;

    /// Attaches a detached `child` so it ends up at `index` among the
    /// children of `parent`.
    fn append_child(
        &mut self,
        parent: SurfaceHandle,
        child: SurfaceHandle,
        index: usize,
    ) -> Result<(), SurfaceError>;

    /// Detaches `child` from `parent`, descendants included.
    fn remove_child(
        &mut self,
        parent: SurfaceHandle,
        child: SurfaceHandle,
    ) -> Result<(), SurfaceError>;
}
