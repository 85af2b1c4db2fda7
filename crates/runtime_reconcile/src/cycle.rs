//! One tree bound to one surface, reconciled cycle by cycle.
//!
//! Invariants:
//! - At most one cycle runs per instance; every entry point takes `&mut self`.
//! - The state is `Idle` whenever control returns to the caller.
//! - The baseline is only replaced by a fully committed tree.
//! - After a failed commit the surface may hold a partial batch. The
//!   instance is then desynchronized and its next cycle remounts from
//!   scratch instead of diffing against the baseline.

use crate::config::{ConfigError, QueuePolicy, ReconcilerConfig};
use commit::{CommitError, CommitSummary, Committer, Surface, SurfaceError};
use core_types::TreeVersion;
use thiserror::Error;
use vtree::{DiffError, DiffOptions, MutationCounts, Node, diff_with_options};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    Diffing,
    Committing,
}

/// How a staged tree was taken in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    Accepted,
    /// Replaced a tree that was still staged.
    Coalesced,
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("diff failed: {0}")]
    Diff(#[from] DiffError),
    #[error("commit failed: {0}")]
    Commit(#[from] CommitError),
    #[error("detaching the mounted tree failed: {0}")]
    Detach(#[source] SurfaceError),
    #[error("a tree is already staged and the queue policy rejects another")]
    Busy,
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ReconcileError {
    /// The surface no longer matches the identity map.
    pub fn is_fatal(&self) -> bool {
        match self {
            ReconcileError::Commit(err) => err.is_fatal(),
            ReconcileError::Detach(_) => true,
            _ => false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CycleReport {
    pub version: TreeVersion,
    pub counts: MutationCounts,
    pub summary: CommitSummary,
    /// The cycle rebuilt the surface instead of diffing.
    pub remounted: bool,
}

pub struct TreeInstance<S: Surface> {
    committer: Committer<S>,
    policy: QueuePolicy,
    diff_options: DiffOptions,
    state: CycleState,
    baseline: Option<Node>,
    pending: Option<Node>,
    version: TreeVersion,
    desynchronized: bool,
}

impl<S: Surface> TreeInstance<S> {
    pub fn new(mut committer: Committer<S>, config: &ReconcilerConfig) -> Self {
        committer.set_trace(config.trace_mutations);
        Self {
            committer,
            policy: config.queue_policy,
            diff_options: config.diff_options(),
            state: CycleState::Idle,
            baseline: None,
            pending: None,
            version: TreeVersion::INITIAL,
            desynchronized: false,
        }
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    /// Last successfully committed tree.
    pub fn baseline(&self) -> Option<&Node> {
        self.baseline.as_ref()
    }

    pub fn version(&self) -> TreeVersion {
        self.version
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn is_desynchronized(&self) -> bool {
        self.desynchronized
    }

    pub fn committer(&self) -> &Committer<S> {
        &self.committer
    }

    pub fn surface(&self) -> &S {
        self.committer.surface()
    }

    /// Stages `tree` for the next cycle.
    pub fn request(&mut self, tree: Node) -> Result<Admission, ReconcileError> {
        if self.pending.is_some() {
            return match self.policy {
                QueuePolicy::Coalesce => {
                    log::debug!(target: "reconcile.cycle", "staged tree replaced by a newer one");
                    self.pending = Some(tree);
                    Ok(Admission::Coalesced)
                }
                QueuePolicy::Reject => Err(ReconcileError::Busy),
            };
        }
        self.pending = Some(tree);
        Ok(Admission::Accepted)
    }

    /// Drops the staged tree, if any. A cycle already running is not
    /// affected.
    pub fn cancel_pending(&mut self) -> bool {
        self.pending.take().is_some()
    }

    /// Runs one cycle for the staged tree. `Ok(None)` when nothing is staged.
    pub fn run_pending(&mut self) -> Result<Option<CycleReport>, ReconcileError> {
        match self.pending.take() {
            Some(tree) => self.run_cycle(Some(tree)).map(Some),
            None => Ok(None),
        }
    }

    /// Stages `tree` and runs its cycle immediately.
    pub fn render(&mut self, tree: Node) -> Result<CycleReport, ReconcileError> {
        if self.pending.is_some() {
            if self.policy == QueuePolicy::Reject {
                return Err(ReconcileError::Busy);
            }
            self.pending = None;
            log::debug!(target: "reconcile.cycle", "staged tree replaced by a newer one");
        }
        self.run_cycle(Some(tree))
    }

    /// Removes the mounted tree from the surface.
    pub fn unmount(&mut self) -> Result<CycleReport, ReconcileError> {
        self.pending = None;
        self.run_cycle(None)
    }

    /// Detaches everything this instance mounted and inserts `tree` from
    /// scratch. Clears the desynchronized flag on success.
    pub fn remount(&mut self, tree: Node) -> Result<CycleReport, ReconcileError> {
        self.state = CycleState::Diffing;
        let mutations = match diff_with_options(None, Some(&tree), &self.diff_options) {
            Ok(mutations) => mutations,
            Err(err) => {
                self.state = CycleState::Idle;
                return Err(err.into());
            }
        };

        self.state = CycleState::Committing;
        let detached = self.committer.detach_all();
        self.baseline = None;
        let released = match detached {
            Ok(released) => released,
            Err(err) => {
                self.state = CycleState::Idle;
                self.desynchronized = true;
                log::error!(target: "reconcile.cycle", "remount could not detach the old tree: {err}");
                return Err(ReconcileError::Detach(err));
            }
        };
        let committed = self.committer.commit(&mutations);
        self.state = CycleState::Idle;
        let mut summary = committed.inspect_err(|_| self.desynchronized = true)?;
        summary.released += released;

        self.desynchronized = false;
        self.baseline = Some(tree);
        self.version = self.version.next();
        log::debug!(target: "reconcile.cycle", "remounted at {}: {summary}", self.version);
        Ok(CycleReport {
            version: self.version,
            counts: MutationCounts::of(&mutations),
            summary,
            remounted: true,
        })
    }

    fn run_cycle(&mut self, next: Option<Node>) -> Result<CycleReport, ReconcileError> {
        if self.desynchronized {
            log::info!(target: "reconcile.cycle", "surface out of sync; remounting");
            return match next {
                Some(tree) => self.remount(tree),
                None => {
                    self.state = CycleState::Committing;
                    let detached = self.committer.detach_all();
                    self.state = CycleState::Idle;
                    self.baseline = None;
                    let released = detached.map_err(ReconcileError::Detach)?;
                    self.desynchronized = false;
                    self.version = self.version.next();
                    Ok(CycleReport {
                        version: self.version,
                        counts: MutationCounts::default(),
                        summary: CommitSummary {
                            released,
                            ..CommitSummary::default()
                        },
                        remounted: true,
                    })
                }
            };
        }

        self.state = CycleState::Diffing;
        let mutations =
            match diff_with_options(self.baseline.as_ref(), next.as_ref(), &self.diff_options) {
                Ok(mutations) => mutations,
                Err(err) => {
                    self.state = CycleState::Idle;
                    log::warn!(target: "reconcile.cycle", "diff rejected the new tree: {err}");
                    return Err(err.into());
                }
            };
        let counts = MutationCounts::of(&mutations);
        log::debug!(target: "reconcile.cycle", "diffed against {}: {counts}", self.version);

        self.state = CycleState::Committing;
        let committed = self.committer.commit(&mutations);
        self.state = CycleState::Idle;
        let summary = match committed {
            Ok(summary) => summary,
            Err(err) => {
                self.desynchronized = true;
                if err.is_fatal() {
                    log::error!(target: "reconcile.cycle", "commit failed, surface desynchronized: {err}");
                } else {
                    log::warn!(target: "reconcile.cycle", "commit failed: {err}");
                }
                return Err(err.into());
            }
        };

        self.baseline = next;
        self.version = self.version.next();
        Ok(CycleReport {
            version: self.version,
            counts,
            summary,
            remounted: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commit::ArenaSurface;

    fn instance(policy: QueuePolicy) -> TreeInstance<ArenaSurface> {
        let surface = ArenaSurface::new();
        let container = surface.container();
        let config = ReconcilerConfig {
            queue_policy: policy,
            ..ReconcilerConfig::default()
        };
        TreeInstance::new(Committer::new(surface, container), &config)
    }

    fn title(text: &str) -> Node {
        Node::element("h1").text(text).build()
    }

    #[test]
    fn render_advances_version_and_baseline() {
        let mut instance = instance(QueuePolicy::Coalesce);
        let report = instance.render(title("Baked Salmon")).unwrap();
        assert_eq!(report.version, TreeVersion(1));
        assert_eq!(report.counts.inserts, 1);
        assert_eq!(instance.baseline(), Some(&title("Baked Salmon")));
        assert_eq!(instance.state(), CycleState::Idle);

        let report = instance.render(title("Fish Tacos")).unwrap();
        assert_eq!(report.version, TreeVersion(2));
        assert_eq!(report.counts.text_replacements, 1);
        assert_eq!(report.summary.created, 0);
    }

    #[test]
    fn coalescing_commits_only_the_latest_tree() {
        let mut instance = instance(QueuePolicy::Coalesce);
        assert_eq!(instance.request(title("one")).unwrap(), Admission::Accepted);
        assert_eq!(instance.request(title("two")).unwrap(), Admission::Coalesced);
        assert_eq!(instance.request(title("three")).unwrap(), Admission::Coalesced);

        let report = instance.run_pending().unwrap().expect("a tree was staged");
        assert_eq!(report.version, TreeVersion(1));
        assert_eq!(report.counts.total(), 1);
        assert_eq!(
            instance.surface().materialize_root().unwrap(),
            Some(title("three"))
        );
        assert!(instance.run_pending().unwrap().is_none());
    }

    #[test]
    fn reject_policy_refuses_a_second_staged_tree() {
        let mut instance = instance(QueuePolicy::Reject);
        instance.request(title("one")).unwrap();
        assert!(matches!(
            instance.request(title("two")),
            Err(ReconcileError::Busy)
        ));
        assert!(matches!(
            instance.render(title("three")),
            Err(ReconcileError::Busy)
        ));
        instance.run_pending().unwrap();
        assert_eq!(instance.baseline(), Some(&title("one")));
        assert!(instance.render(title("two")).is_ok());
    }

    #[test]
    fn cancel_drops_only_staged_trees() {
        let mut instance = instance(QueuePolicy::Coalesce);
        assert!(!instance.cancel_pending());
        instance.request(title("one")).unwrap();
        assert!(instance.cancel_pending());
        assert!(instance.run_pending().unwrap().is_none());
        assert_eq!(instance.version(), TreeVersion::INITIAL);
    }

    #[test]
    fn invalid_tree_keeps_the_baseline() {
        let mut instance = instance(QueuePolicy::Coalesce);
        instance.render(title("Baked Salmon")).unwrap();
        let duplicate = Node::element("ul")
            .child(Node::element("li").key("a"))
            .child(Node::element("li").key("a"))
            .build();
        let err = instance.render(duplicate).unwrap_err();
        assert!(matches!(err, ReconcileError::Diff(DiffError::Shape { .. })));
        assert!(!err.is_fatal());
        assert_eq!(instance.baseline(), Some(&title("Baked Salmon")));
        assert_eq!(instance.version(), TreeVersion(1));
        assert!(!instance.is_desynchronized());
        assert_eq!(instance.state(), CycleState::Idle);
    }

    #[test]
    fn unmount_empties_the_surface() {
        let mut instance = instance(QueuePolicy::Coalesce);
        instance.render(title("Baked Salmon")).unwrap();
        let report = instance.unmount().unwrap();
        assert_eq!(report.counts.removes, 1);
        assert_eq!(instance.baseline(), None);
        assert_eq!(instance.surface().materialize_root().unwrap(), None);
        assert!(instance.committer().identity().is_empty());
    }

    #[test]
    fn remount_rebuilds_from_scratch() {
        let mut instance = instance(QueuePolicy::Coalesce);
        instance.render(title("Baked Salmon")).unwrap();
        let report = instance.remount(title("Fish Tacos")).unwrap();
        assert!(report.remounted);
        assert_eq!(report.summary.released, 2);
        assert_eq!(report.summary.created, 2);
        assert_eq!(report.version, TreeVersion(2));
        assert_eq!(
            instance.surface().materialize_root().unwrap(),
            Some(title("Fish Tacos"))
        );
        assert_eq!(instance.committer().identity().len(), 2);
    }
}
