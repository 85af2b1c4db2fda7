use std::collections::BTreeMap;
use std::process::ExitCode;

use bus::{Bus, ReconcileCommand, ReconcileEvent};
use commit::{ArenaSurface, Committer};
use core_types::TreeId;
use runtime_reconcile::{ReconcilerConfig, TreeInstance, start_reconcile_runtime};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::util::SubscriberInitExt;
use vtree::corpus::{INGREDIENTS, keyed_ingredient_list, recipe};
use vtree::snapshot::{TreeSnapshot, TreeSnapshotOptions};
use vtree::{Node, Tag};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

const RECIPE_TREE: TreeId = 1;
const STEPS: [&str; 3] = ["Preheat the oven", "Season the salmon", "Bake 15 minutes"];

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_env("RECONCILER_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    // Also routes `log` records from the library crates.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .without_time()
        .finish()
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => match ReconcilerConfig::from_path(&path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("{err}");
                return ExitCode::FAILURE;
            }
        },
        None => ReconcilerConfig::default(),
    };

    let surface = ArenaSurface::new();
    let container = surface.container();
    let instance = TreeInstance::new(Committer::new(surface, container), &config);

    let (bus, cmd_rx) = Bus::new();
    let runtime = start_reconcile_runtime(
        BTreeMap::from([(RECIPE_TREE, instance)]),
        cmd_rx,
        bus.evt_tx.clone(),
    );

    let mut ok = true;
    for tree in frames() {
        if bus
            .cmd_tx
            .send(ReconcileCommand::Render {
                tree_id: RECIPE_TREE,
                tree,
            })
            .is_err()
        {
            eprintln!("runtime stopped early");
            return ExitCode::FAILURE;
        }
        match bus.evt_rx.recv() {
            Ok(ReconcileEvent::Committed {
                version, counts, ..
            }) => println!("{version}: {counts}"),
            Ok(ReconcileEvent::Failed { version, error, .. }) => {
                eprintln!("render failed, still at {version}: {error}");
                ok = false;
            }
            Ok(other) => println!("{other:?}"),
            Err(_) => {
                eprintln!("runtime stopped early");
                return ExitCode::FAILURE;
            }
        }
    }

    let _ = bus.cmd_tx.send(ReconcileCommand::Shutdown);
    let Ok(instances) = runtime.join() else {
        eprintln!("runtime thread panicked");
        return ExitCode::FAILURE;
    };
    if let Some(instance) = instances.get(&RECIPE_TREE) {
        match instance.surface().materialize_root() {
            Ok(Some(root)) => {
                let snapshot = TreeSnapshot::new(&root, TreeSnapshotOptions { ignore_keys: true });
                println!("{snapshot}");
                println!("{}", instance.surface().stats());
            }
            Ok(None) => println!("(nothing mounted)"),
            Err(err) => {
                eprintln!("{err}");
                ok = false;
            }
        }
    }

    if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

// Mount, edit in place, reorder the keyed ingredients, then swap in a
// component placeholder for the list.
fn frames() -> Vec<Node> {
    let reordered = Node::element("ul")
        .attr("class", "ingredients")
        .children([5, 0, 1, 2, 3].map(|i| {
            Node::element("li")
                .key(i.to_string())
                .text(INGREDIENTS[i])
        }))
        .build();
    vec![
        recipe("Baked Salmon", Some(2), keyed_ingredient_list(), &STEPS),
        recipe("Baked Salmon", Some(4), keyed_ingredient_list(), &STEPS),
        recipe("Baked Salmon with Garlic", Some(4), reordered, &STEPS),
        recipe(
            "Baked Salmon with Garlic",
            None,
            Node::element(Tag::component("IngredientsList")).build(),
            &STEPS[..2],
        ),
    ]
}
