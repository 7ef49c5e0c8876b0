// dot.rs — Graphviz DOT output for expression DAGs
//
// Renders the nodes reachable from a root (value and binding edges) in DOT
// format, for `dot` or other Graphviz layout engines.
//
// Preconditions: `root` comes from `builder`.
// Postconditions: returns a DOT string; node and edge order follow the
//   binding-inclusive collection order, so output is deterministic.
// Failure modes: none (pure string formatting).
// Side effects: none.

use std::fmt::Write;

use crate::collect::collect;
use crate::id::NodeId;
use crate::ir::{Builder, NodeKind, ParamRole};

/// Emit the DAG under `root` as a Graphviz DOT string.
pub fn emit_dot(builder: &Builder, root: NodeId) -> String {
    let order = collect(builder, root, true).order;
    let mut buf = String::new();
    let _ = writeln!(buf, "digraph kernel {{");
    let _ = writeln!(buf, "    rankdir=BT;");
    let _ = writeln!(buf, "    node [fontname=\"Helvetica\", fontsize=10];");
    let _ = writeln!(buf, "    edge [fontname=\"Helvetica\", fontsize=9];");
    let _ = writeln!(buf);

    for &id in &order {
        let _ = writeln!(buf, "    {} [{}];", dot_node_id(id), node_attrs(builder, id, id == root));
    }
    let _ = writeln!(buf);
    for &id in &order {
        let node = builder.node(id);
        for dep in &node.deps {
            let _ = writeln!(buf, "    {} -> {};", dot_node_id(*dep), dot_node_id(id));
        }
        for dep in &node.binding_deps {
            let _ = writeln!(buf, "    {} -> {} [style=dashed];", dot_node_id(*dep), dot_node_id(id));
        }
    }
    let _ = writeln!(buf, "}}");
    buf
}

fn dot_node_id(id: NodeId) -> String {
    format!("n{}", id.0)
}

/// Escape a label for a double-quoted DOT string.
fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

fn node_attrs(builder: &Builder, id: NodeId, is_root: bool) -> String {
    let node = builder.node(id);
    let (shape, color) = match &node.kind {
        NodeKind::Literal(_) => ("plaintext", "white"),
        NodeKind::Coord(_) => ("ellipse", "lightgray"),
        NodeKind::Param {
            role: ParamRole::Uniform,
        } => ("ellipse", "lightyellow"),
        NodeKind::Param {
            role: ParamRole::BufferSize,
        } => ("ellipse", "lightgoldenrod"),
        NodeKind::Buffer { .. } | NodeKind::View { .. } => ("cylinder", "lightsalmon"),
        NodeKind::Branch { .. } => ("diamond", "lightgreen"),
        NodeKind::Unary { .. }
        | NodeKind::Binary { .. }
        | NodeKind::Func { .. }
        | NodeKind::Property { .. } => ("box", "lightblue"),
    };
    let label = escape(&format!("{}: {}", node.name, node.ty));
    let border = if is_root { ", penwidth=2" } else { "" };
    format!("shape={shape}, style=filled, fillcolor={color}, label=\"{label}\"{border}")
}
