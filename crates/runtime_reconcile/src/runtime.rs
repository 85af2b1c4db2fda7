use std::collections::BTreeMap;
use std::sync::mpsc::{Receiver, Sender};
use std::thread::{self, JoinHandle};

use bus::{ReconcileCommand, ReconcileEvent};
use commit::Surface;
use core_types::{TreeId, TreeVersion};

use crate::cycle::{Admission, ReconcileError, TreeInstance};

/// Spawns the reconcile worker, which owns every tree instance.
///
/// Each step blocks for one command, drains whatever else is queued,
/// stages renders per tree under each instance's queue policy, applies
/// cancellations in arrival order, then runs one cycle for every tree with a
/// staged render in ascending `TreeId` order. `Shutdown`, or the command
/// channel closing, ends the worker once the current step is done; commands
/// queued behind `Shutdown` are dropped. The instances are handed back
/// through the join handle.
pub fn start_reconcile_runtime<S>(
    instances: BTreeMap<TreeId, TreeInstance<S>>,
    cmd_rx: Receiver<ReconcileCommand>,
    evt_tx: Sender<ReconcileEvent>,
) -> JoinHandle<BTreeMap<TreeId, TreeInstance<S>>>
where
    S: Surface + Send + 'static,
{
    thread::spawn(move || {
        let mut instances = instances;
        log::debug!(target: "reconcile.runtime", "started with {} trees", instances.len());

        while let Ok(first) = cmd_rx.recv() {
            let mut shutdown = false;
            for cmd in std::iter::once(first).chain(cmd_rx.try_iter()) {
                match cmd {
                    ReconcileCommand::Render { tree_id, tree } => {
                        let Some(instance) = instances.get_mut(&tree_id) else {
                            unknown_tree(&evt_tx, tree_id);
                            continue;
                        };
                        match instance.request(tree) {
                            Ok(Admission::Accepted) => {}
                            Ok(Admission::Coalesced) => {
                                log::debug!(target: "reconcile.runtime", "tree {tree_id}: render coalesced");
                            }
                            Err(ReconcileError::Busy) => {
                                log::debug!(target: "reconcile.runtime", "tree {tree_id}: render rejected");
                                let _ = evt_tx.send(ReconcileEvent::Rejected { tree_id });
                            }
                            Err(err) => {
                                let _ = evt_tx.send(ReconcileEvent::Failed {
                                    tree_id,
                                    version: instance.version(),
                                    error: err.to_string(),
                                    desynchronized: instance.is_desynchronized(),
                                });
                            }
                        }
                    }
                    ReconcileCommand::Cancel { tree_id } => {
                        let Some(instance) = instances.get_mut(&tree_id) else {
                            unknown_tree(&evt_tx, tree_id);
                            continue;
                        };
                        if instance.cancel_pending() {
                            let _ = evt_tx.send(ReconcileEvent::Cancelled { tree_id });
                        } else {
                            log::debug!(target: "reconcile.runtime", "tree {tree_id}: nothing staged to cancel");
                        }
                    }
                    ReconcileCommand::Shutdown => {
                        shutdown = true;
                        break;
                    }
                }
            }

            for (&tree_id, instance) in instances.iter_mut() {
                if !instance.has_pending() {
                    continue;
                }
                match instance.run_pending() {
                    Ok(Some(report)) => {
                        log::debug!(
                            target: "reconcile.runtime",
                            "tree {tree_id}: committed {} ({})",
                            report.version,
                            report.summary
                        );
                        let _ = evt_tx.send(ReconcileEvent::Committed {
                            tree_id,
                            version: report.version,
                            counts: report.counts,
                        });
                    }
                    Ok(None) => {}
                    Err(err) => {
                        if err.is_fatal() {
                            log::error!(target: "reconcile.runtime", "tree {tree_id}: {err}");
                        } else {
                            log::warn!(target: "reconcile.runtime", "tree {tree_id}: {err}");
                        }
                        let _ = evt_tx.send(ReconcileEvent::Failed {
                            tree_id,
                            version: instance.version(),
                            error: err.to_string(),
                            desynchronized: instance.is_desynchronized(),
                        });
                    }
                }
            }

            if shutdown {
                break;
            }
        }
        log::debug!(target: "reconcile.runtime", "stopped");
        instances
    })
}

fn unknown_tree(evt_tx: &Sender<ReconcileEvent>, tree_id: TreeId) {
    log::warn!(target: "reconcile.runtime", "tree {tree_id}: no instance registered");
    let _ = evt_tx.send(ReconcileEvent::Failed {
        tree_id,
        version: TreeVersion::INITIAL,
        error: format!("no tree instance registered for id {tree_id}"),
        desynchronized: false,
    });
}
