use core_types::{TreeId, TreeVersion};
use std::sync::mpsc::{self, Receiver, Sender};
use vtree::{MutationCounts, Node};

#[derive(Debug)]
pub enum ReconcileCommand {
    // Producer -> runtime
    Render {
        tree_id: TreeId,
        tree: Node,
    },
    Cancel {
        tree_id: TreeId,
    },
    Shutdown,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ReconcileEvent {
    Committed {
        tree_id: TreeId,
        version: TreeVersion,
        counts: MutationCounts,
    },
    // `version` is the baseline that stays current.
    Failed {
        tree_id: TreeId,
        version: TreeVersion,
        error: String,
        desynchronized: bool,
    },
    // Render refused by the `reject` queue policy.
    Rejected {
        tree_id: TreeId,
    },
    Cancelled {
        tree_id: TreeId,
    },
}

impl ReconcileEvent {
    pub fn tree_id(&self) -> TreeId {
        match self {
            ReconcileEvent::Committed { tree_id, .. }
            | ReconcileEvent::Failed { tree_id, .. }
            | ReconcileEvent::Rejected { tree_id }
            | ReconcileEvent::Cancelled { tree_id } => *tree_id,
        }
    }
}

pub struct Bus {
    pub cmd_tx: Sender<ReconcileCommand>,
    pub evt_rx: Receiver<ReconcileEvent>,
    pub evt_tx: Sender<ReconcileEvent>, // shareable for runtimes
}

impl Bus {
    /// Creates both channels; the command receiver goes to the runtime.
    pub fn new() -> (Self, Receiver<ReconcileCommand>) {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (evt_tx, evt_rx) = mpsc::channel();
        (
            Self {
                cmd_tx,
                evt_rx,
                evt_tx,
            },
            cmd_rx,
        )
    }
}
