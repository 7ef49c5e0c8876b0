// collect.rs — Dependency collection and topological sequencing
//
// Depth-first walk from a root over value dependencies (and, on request,
// binding dependencies), producing each reachable node exactly once, after
// everything it depends on. Nodes reached again are counted, not re-emitted.
//
// Preconditions: the graph is acyclic (guaranteed by `Builder`).
// Postconditions: `Collection::order` is a topological order ending at the root.
// Failure modes: none.
// Side effects: none.

use std::collections::{HashMap, HashSet};

use crate::id::NodeId;
use crate::ir::Builder;

/// Result of one collection walk.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    /// Reached nodes, dependencies first.
    pub order: Vec<NodeId>,
    /// How many times each node was reached.
    pub refs: HashMap<NodeId, u32>,
}

impl Collection {
    /// Number of nodes reached along more than one path.
    pub fn shared(&self) -> usize {
        self.refs.values().filter(|&&n| n > 1).count()
    }
}

/// `i`-th outgoing edge of `id`: value dependencies, then binding ones.
fn child(b: &Builder, id: NodeId, i: usize, include_bindings: bool) -> Option<NodeId> {
    let node = b.node(id);
    match node.deps.get(i) {
        Some(d) => Some(*d),
        None if include_bindings => node.binding_deps.get(i - node.deps.len()).copied(),
        None => None,
    }
}

/// Walk the DAG under `root`. With `include_bindings`, buffers reachable only
/// through binding edges are included as well.
pub fn collect(b: &Builder, root: NodeId, include_bindings: bool) -> Collection {
    let mut order = Vec::new();
    let mut refs: HashMap<NodeId, u32> = HashMap::new();
    // Explicit stack of (node, next edge) so deep chains cannot overflow.
    let mut stack: Vec<(NodeId, usize)> = vec![(root, 0)];
    refs.insert(root, 1);

    while let Some(top) = stack.last_mut() {
        let (id, i) = *top;
        match child(b, id, i, include_bindings) {
            Some(c) => {
                top.1 += 1;
                let seen = refs.entry(c).or_insert(0);
                *seen += 1;
                if *seen == 1 {
                    stack.push((c, 0));
                }
            }
            None => {
                stack.pop();
                order.push(id);
            }
        }
    }

    Collection { order, refs }
}

// ── Verification ─────────────────────────────────────────────────────────────

/// Machine-checkable evidence attached to a verified stage output.
pub trait StageCert {
    fn all_pass(&self) -> bool;
    fn obligations(&self) -> Vec<(&'static str, bool)>;
}

/// Evidence for collection postconditions (C1-C3).
#[derive(Debug, Clone)]
pub struct OrderCert {
    /// C1: No node appears twice.
    pub c1_unique: bool,
    /// C2: Every node appears after all of its (followed) dependencies.
    pub c2_deps_first: bool,
    /// C3: The order is non-empty and ends at the root.
    pub c3_ends_at_root: bool,
}

impl StageCert for OrderCert {
    fn all_pass(&self) -> bool {
        self.c1_unique && self.c2_deps_first && self.c3_ends_at_root
    }

    fn obligations(&self) -> Vec<(&'static str, bool)> {
        vec![
            ("C1_unique", self.c1_unique),
            ("C2_deps_first", self.c2_deps_first),
            ("C3_ends_at_root", self.c3_ends_at_root),
        ]
    }
}

/// Check an order against the graph it was collected from.
pub fn verify_order(b: &Builder, root: NodeId, order: &[NodeId], include_bindings: bool) -> OrderCert {
    let mut placed: HashSet<NodeId> = HashSet::new();
    let mut unique = true;
    let mut deps_first = true;
    for &id in order {
        let node = b.node(id);
        let followed = node
            .deps
            .iter()
            .chain(node.binding_deps.iter().filter(|_| include_bindings));
        for d in followed {
            if !placed.contains(d) {
                deps_first = false;
            }
        }
        if !placed.insert(id) {
            unique = false;
        }
    }
    OrderCert {
        c1_unique: unique,
        c2_deps_first: deps_first,
        c3_ends_at_root: order.last() == Some(&root),
    }
}
