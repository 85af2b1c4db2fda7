pub type TreeId = u64;

/// Opaque identifier for one live node on a rendering surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceHandle(pub u32);

impl SurfaceHandle {
    /// Reserved sentinel; surfaces never hand this out.
    pub const INVALID: SurfaceHandle = SurfaceHandle(0);

    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

impl std::fmt::Display for SurfaceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic counter of committed reconciliation cycles for one tree.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TreeVersion(pub u64);

impl TreeVersion {
    pub const INITIAL: TreeVersion = TreeVersion(0);

    pub fn next(self) -> Self {
        TreeVersion(self.0 + 1)
    }
}

impl std::fmt::Display for TreeVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_advances_by_one() {
        assert_eq!(TreeVersion::INITIAL.next(), TreeVersion(1));
        assert_eq!(TreeVersion(41).next().next(), TreeVersion(43));
    }

    #[test]
    fn invalid_handle_is_reserved() {
        assert!(!SurfaceHandle::INVALID.is_valid());
        assert!(SurfaceHandle(7).is_valid());
        assert_eq!(SurfaceHandle(7).to_string(), "#7");
    }
}
