// index.rs — Two-dimensional indexing of buffers and derived values
//
// `Builder::index(node, x, y)` reads `node` at a remapped position: the value
// it would have at output coordinate `(fx(x), fy(y))`, where `fx`/`fy` are the
// requested axis addresses. Buffers become views, views compose their
// addressing, and derived expressions are rebuilt over re-indexed inputs.
//
// Preconditions: node handles come from this builder.
// Postconditions: the returned node reads the same root buffers as `node`.
// Failure modes: literal, parameter or coordinate target → InvalidIndex;
//   bounded or non-positive-step range → UnsupportedSlice; non-Int32 index
//   node → TypeMismatch.
// Side effects: appends view and rebuilt nodes; subexpressions whose inputs
//   are unaffected are shared.

use std::collections::HashMap;

use log::debug;

use crate::collect::collect;
use crate::diag::{GenError, GenResult};
use crate::id::NodeId;
use crate::ir::{Builder, LiteralValue, NodeKind, Operand};
use crate::slice::{coalesce, nest, Axis, AxisAddr, AxisIndex, Index, IndexArith, Slice};
use crate::types::ValueType;

impl From<Index> for Operand {
    fn from(i: Index) -> Self {
        match i {
            Index::Const(v) => Operand::Lit(LiteralValue::Int(v)),
            Index::Node(id) => Operand::Node(id),
        }
    }
}

impl IndexArith for Builder {
    fn add_index(&mut self, a: Index, b: Index) -> GenResult<Index> {
        self.add(a, b).map(Index::Node)
    }

    fn scale_index(&mut self, a: Index, k: i64) -> GenResult<Index> {
        self.mul(a, k).map(Index::Node)
    }
}

impl Builder {
    /// Read `node` through the axis addresses `x` and `y`.
    pub fn index(
        &mut self,
        node: NodeId,
        x: impl Into<AxisIndex>,
        y: impl Into<AxisIndex>,
    ) -> GenResult<NodeId> {
        match &self.node(node).kind {
            NodeKind::Literal(_) | NodeKind::Param { .. } | NodeKind::Coord(_) => {
                return Err(GenError::invalid_index(
                    self.name(node),
                    format!("a {} has no addressable structure", self.node(node).kind.label()),
                ));
            }
            _ => {}
        }
        let fx = coalesce(&x.into(), false)?;
        let fy = coalesce(&y.into(), false)?;
        for id in fx.index_nodes().into_iter().chain(fy.index_nodes()) {
            let ty = self.ty(id);
            if ty != ValueType::Int32 {
                return Err(GenError::type_mismatch(
                    format!("index '{}'", self.name(id)),
                    ValueType::Int32,
                    ty,
                ));
            }
        }

        let before = self.len();
        let order = collect(self, node, false).order;
        let mut memo: HashMap<NodeId, NodeId> = HashMap::with_capacity(order.len());
        for id in order {
            let mapped = self.reindex_one(id, &fx, &fy, &memo)?;
            memo.insert(id, mapped);
        }
        debug!(
            "indexed '{}': {} nodes appended",
            self.name(node),
            self.len() - before
        );
        Ok(memo.get(&node).copied().unwrap_or(node))
    }

    /// A view of a root buffer. Index nodes become value dependencies; the
    /// buffer itself is a binding dependency.
    fn view(&mut self, buffer: NodeId, x: AxisAddr, y: AxisAddr) -> GenResult<NodeId> {
        let size = self.buffer_size(buffer)?;
        let mut deps = vec![size];
        deps.extend(x.index_nodes());
        deps.extend(y.index_nodes());
        let name = self.fresh_name("slice");
        let ty = self.ty(buffer);
        Ok(self.push_with_bindings(name, ty, deps, vec![buffer], NodeKind::View { buffer, x, y }))
    }

    /// Coordinate value along one axis under `addr`.
    fn coordinate_under(&mut self, coord: NodeId, addr: &AxisAddr) -> GenResult<NodeId> {
        match *addr {
            AxisAddr::Point(Index::Const(v)) => Ok(self.literal(LiteralValue::Int(v))),
            AxisAddr::Point(Index::Node(id)) => Ok(id),
            AxisAddr::Slice(Slice { start, step }) => {
                let scaled = if step == 1 { coord } else { self.mul(coord, step)? };
                self.add(scaled, start)
            }
        }
    }

    fn reindex_one(
        &mut self,
        id: NodeId,
        fx: &AxisAddr,
        fy: &AxisAddr,
        memo: &HashMap<NodeId, NodeId>,
    ) -> GenResult<NodeId> {
        let m = |d: NodeId| memo.get(&d).copied().unwrap_or(d);
        let node = self.node(id).clone();
        match node.kind {
            NodeKind::Literal(_) | NodeKind::Param { .. } => Ok(id),
            NodeKind::Coord(axis) => {
                let addr = if axis == Axis::X { fx } else { fy };
                if addr.is_full() {
                    Ok(id)
                } else {
                    self.coordinate_under(id, addr)
                }
            }
            NodeKind::Buffer { .. } => {
                if fx.is_full() && fy.is_full() {
                    Ok(id)
                } else {
                    self.view(id, *fx, *fy)
                }
            }
            NodeKind::View { buffer, x, y } => {
                let outer_x = x.map_nodes(m);
                let outer_y = y.map_nodes(m);
                let nx = nest(self, &outer_x, fx)?;
                let ny = nest(self, &outer_y, fy)?;
                if nx == x && ny == y {
                    Ok(id)
                } else {
                    self.view(buffer, nx, ny)
                }
            }
            kind => {
                let deps: Vec<NodeId> = node.deps.iter().map(|&d| m(d)).collect();
                if deps == node.deps {
                    return Ok(id);
                }
                let (prefix, kind) = match kind {
                    NodeKind::Unary { op, operand } => (
                        op.prefix().to_string(),
                        NodeKind::Unary {
                            op,
                            operand: m(operand),
                        },
                    ),
                    NodeKind::Binary { op, lhs, rhs } => (
                        op.prefix().to_string(),
                        NodeKind::Binary {
                            op,
                            lhs: m(lhs),
                            rhs: m(rhs),
                        },
                    ),
                    NodeKind::Func { func, args } => (
                        format!("func_{}", func),
                        NodeKind::Func {
                            func,
                            args: args.into_iter().map(m).collect(),
                        },
                    ),
                    NodeKind::Property { base, component } => (
                        format!("prop_{}", component),
                        NodeKind::Property {
                            base: m(base),
                            component,
                        },
                    ),
                    NodeKind::Branch { clauses, default } => (
                        "match".to_string(),
                        NodeKind::Branch {
                            clauses: clauses.into_iter().map(|(c, r)| (m(c), m(r))).collect(),
                            default: m(default),
                        },
                    ),
                    other => {
                        return Err(GenError::invalid_index(
                            node.name,
                            format!("cannot rebuild a {} node", other.label()),
                        ))
                    }
                };
                let name = self.fresh_name(&prefix);
                Ok(self.push_with_bindings(name, node.ty, deps, Vec::new(), kind))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slice::RangeSpec;

    fn formula(b: &Builder, id: NodeId) -> String {
        b.formula(id).unwrap().unwrap()
    }

    #[test]
    fn buffer_view_formula() {
        let mut b = Builder::new();
        let state = b.buffer("state", ValueType::Bit).unwrap();
        let v = b.index(state, AxisIndex::every(2), AxisIndex::all()).unwrap();
        assert_eq!(b.name(v), "slice_0");
        assert_eq!(
            formula(&b, v),
            "(texture(state, vec2(float(x*2) + 0.5, gl_FragCoord.y) / state_size)).x > 0.5"
        );
        assert_eq!(b.node(v).binding_deps, vec![state]);
    }

    #[test]
    fn full_index_is_identity() {
        let mut b = Builder::new();
        let state = b.buffer("state", ValueType::Int32).unwrap();
        let v = b.index(state, AxisIndex::all(), AxisIndex::all()).unwrap();
        assert_eq!(v, state);
    }

    #[test]
    fn nested_stride_two_views() {
        let mut b = Builder::new();
        let buf = b.buffer("state", ValueType::Int32).unwrap();
        let view = b.index(buf, AxisIndex::every(2), AxisIndex::all()).unwrap();
        let sub = b.index(view, AxisIndex::stepped(1, 2), AxisIndex::all()).unwrap();
        let direct = b.index(buf, AxisIndex::stepped(2, 4), AxisIndex::all()).unwrap();
        match (&b.node(sub).kind, &b.node(direct).kind) {
            (
                NodeKind::View { buffer: b1, x: x1, .. },
                NodeKind::View { buffer: b2, x: x2, .. },
            ) => {
                assert_eq!(b1, b2);
                assert_eq!(x1, x2);
            }
            other => panic!("expected views, got {:?}", other),
        }
        assert_eq!(formula(&b, sub), formula(&b, direct));
        assert!(formula(&b, sub).contains("float(x*4 + 2) + 0.5"));
    }

    #[test]
    fn point_index_with_nodes() {
        let mut b = Builder::new();
        let state = b.buffer("state", ValueType::Bit).unwrap();
        let (x, y) = (b.x(), b.y());
        let flipped = b.bit_xor(y, 1).unwrap();
        let v = b.index(state, x, flipped).unwrap();
        assert_eq!(
            formula(&b, v),
            "(texture(state, vec2(gl_FragCoord.x, float(bitwise_xor_0) + 0.5) / state_size)).x > 0.5"
        );
        assert!(b.node(v).deps.contains(&flipped));
    }

    #[test]
    fn constant_point_renders_texel_centre() {
        let mut b = Builder::new();
        let mux = b.buffer("found_ones", ValueType::Int32).unwrap();
        let v = b.index(mux, 0, AxisIndex::all()).unwrap();
        assert!(formula(&b, v).contains("vec2(0.5, gl_FragCoord.y)"));
    }

    #[test]
    fn derived_value_is_rebuilt() {
        let mut b = Builder::new();
        let state = b.buffer("state", ValueType::Int32).unwrap();
        let x = b.x();
        let k = b.param("k", ValueType::Int32);
        let sum = b.add(state, x).unwrap();
        let expr = b.mul(sum, k).unwrap();
        let shifted = b.index(expr, AxisIndex::from_start(1), AxisIndex::all()).unwrap();
        assert_ne!(shifted, expr);
        assert_eq!(b.ty(shifted), ValueType::Int32);
        let NodeKind::Binary { lhs, rhs, .. } = b.node(shifted).kind.clone() else {
            panic!("expected binary");
        };
        assert_eq!(rhs, k);
        let NodeKind::Binary { lhs: view, rhs: coord, .. } = b.node(lhs).kind.clone() else {
            panic!("expected binary");
        };
        assert!(matches!(b.node(view).kind, NodeKind::View { .. }));
        assert_eq!(formula(&b, coord), "x + 1");
    }

    #[test]
    fn unaffected_subexpressions_are_shared() {
        let mut b = Builder::new();
        let state = b.buffer("state", ValueType::Int32).unwrap();
        let k = b.param("k", ValueType::Int32);
        let k2 = b.mul(k, 2).unwrap();
        let expr = b.add(state, k2).unwrap();
        let moved = b.index(expr, AxisIndex::every(2), AxisIndex::all()).unwrap();
        let NodeKind::Binary { rhs, .. } = b.node(moved).kind.clone() else {
            panic!("expected binary");
        };
        assert_eq!(rhs, k2);
    }

    #[test]
    fn pinned_axis_stays_pinned() {
        let mut b = Builder::new();
        let state = b.buffer("state", ValueType::Bit).unwrap();
        let col = b.index(state, 3, AxisIndex::all()).unwrap();
        let moved = b.index(col, AxisIndex::every(2), AxisIndex::from_start(1)).unwrap();
        let NodeKind::View { x, y, .. } = b.node(moved).kind.clone() else {
            panic!("expected view");
        };
        assert_eq!(x, AxisAddr::Point(Index::Const(3)));
        assert_eq!(
            y,
            AxisAddr::Slice(Slice {
                start: Index::Const(1),
                step: 1
            })
        );
    }

    #[test]
    fn unindexable_kinds() {
        let mut b = Builder::new();
        let p = b.param("target", ValueType::Int32);
        let lit = b.literal(LiteralValue::Int(4));
        let x = b.x();
        for id in [p, lit, x] {
            assert!(matches!(
                b.index(id, 0, 0),
                Err(GenError::InvalidIndex { .. })
            ));
        }
    }

    #[test]
    fn bounded_and_bad_step_ranges() {
        let mut b = Builder::new();
        let state = b.buffer("state", ValueType::Bit).unwrap();
        let bounded = AxisIndex::Range(RangeSpec {
            stop: Some(Index::Const(8)),
            ..RangeSpec::default()
        });
        assert!(matches!(
            b.index(state, bounded, AxisIndex::all()),
            Err(GenError::UnsupportedSlice(_))
        ));
        assert!(b.index(state, AxisIndex::every(0), AxisIndex::all()).is_err());
    }

    #[test]
    fn index_nodes_must_be_int32() {
        let mut b = Builder::new();
        let state = b.buffer("state", ValueType::Bit).unwrap();
        let f = b.param("f", ValueType::Float32);
        assert!(matches!(
            b.index(state, f, AxisIndex::all()),
            Err(GenError::TypeMismatch { .. })
        ));
    }
}
