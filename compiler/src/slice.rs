// slice.rs — Affine addressing over one buffer axis
//
// A view of a buffer maps each output coordinate `c` along an axis to
// `start + step·c` (a `Slice`) or pins it to a single index (a point).
// Slices are open-ended and forward-stepping; composing views composes the
// affine maps.
//
// Preconditions: node indices handed to `nest` are Int32-typed (checked by
//   the `IndexArith` implementation).
// Postconditions: `coalesce` output has `step >= 1` and no stop bound.
// Failure modes: a stop bound or `step < 1` → UnsupportedSlice.
// Side effects: none, except node allocation through `IndexArith`.

use std::fmt;

use crate::diag::{GenError, GenResult};
use crate::id::NodeId;
use crate::ir::operand;

// ── Axes ────────────────────────────────────────────────────────────────────

/// One of the two buffer axes (also the component names of a Vec2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    /// Integer per-pixel coordinate variable declared in `main`.
    pub fn compute_var(self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
        }
    }

    /// Raw fragment coordinate (already at the texel centre).
    pub fn frag_coord(self) -> &'static str {
        match self {
            Axis::X => "gl_FragCoord.x",
            Axis::Y => "gl_FragCoord.y",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.compute_var())
    }
}

// ── Raw and validated indices ───────────────────────────────────────────────

/// A single index: a compile-time integer or an Int32-valued node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Index {
    Const(i64),
    Node(NodeId),
}

impl From<i64> for Index {
    fn from(v: i64) -> Self {
        Index::Const(v)
    }
}

impl From<i32> for Index {
    fn from(v: i32) -> Self {
        Index::Const(v as i64)
    }
}

impl From<NodeId> for Index {
    fn from(id: NodeId) -> Self {
        Index::Node(id)
    }
}

impl Index {
    fn is_zero(&self) -> bool {
        matches!(self, Index::Const(0))
    }
}

/// A range as written by a caller: every part optional, like `start:stop:step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RangeSpec {
    pub start: Option<Index>,
    pub stop: Option<Index>,
    pub step: Option<i64>,
}

/// One axis of an indexing request, before validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisIndex {
    Point(Index),
    Range(RangeSpec),
}

impl AxisIndex {
    /// `:`
    pub fn all() -> Self {
        AxisIndex::Range(RangeSpec::default())
    }

    /// `::step`
    pub fn every(step: i64) -> Self {
        AxisIndex::Range(RangeSpec {
            step: Some(step),
            ..RangeSpec::default()
        })
    }

    /// `start:`
    pub fn from_start(start: impl Into<Index>) -> Self {
        AxisIndex::Range(RangeSpec {
            start: Some(start.into()),
            ..RangeSpec::default()
        })
    }

    /// `start::step`
    pub fn stepped(start: impl Into<Index>, step: i64) -> Self {
        AxisIndex::Range(RangeSpec {
            start: Some(start.into()),
            stop: None,
            step: Some(step),
        })
    }

    /// A single index.
    pub fn at(index: impl Into<Index>) -> Self {
        AxisIndex::Point(index.into())
    }
}

impl From<i64> for AxisIndex {
    fn from(v: i64) -> Self {
        AxisIndex::at(v)
    }
}

impl From<i32> for AxisIndex {
    fn from(v: i32) -> Self {
        AxisIndex::at(v)
    }
}

impl From<NodeId> for AxisIndex {
    fn from(id: NodeId) -> Self {
        AxisIndex::at(id)
    }
}

impl From<RangeSpec> for AxisIndex {
    fn from(r: RangeSpec) -> Self {
        AxisIndex::Range(r)
    }
}

/// `output ↦ start + step·output`, `step >= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slice {
    pub start: Index,
    pub step: i64,
}

impl Slice {
    pub const FULL: Slice = Slice {
        start: Index::Const(0),
        step: 1,
    };

    pub fn is_full(&self) -> bool {
        *self == Slice::FULL
    }
}

/// A validated axis address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AxisAddr {
    Point(Index),
    Slice(Slice),
}

impl AxisAddr {
    pub const FULL: AxisAddr = AxisAddr::Slice(Slice::FULL);

    pub fn is_full(&self) -> bool {
        matches!(self, AxisAddr::Slice(s) if s.is_full())
    }

    /// Node handles this address reads.
    pub fn index_nodes(&self) -> Vec<NodeId> {
        let index = match self {
            AxisAddr::Point(i) => i,
            AxisAddr::Slice(s) => &s.start,
        };
        match index {
            Index::Node(id) => vec![*id],
            Index::Const(_) => Vec::new(),
        }
    }

    /// Replace node indices through `f` (used when an expression is re-addressed).
    pub fn map_nodes(&self, mut f: impl FnMut(NodeId) -> NodeId) -> AxisAddr {
        let mut map = |i: Index| match i {
            Index::Node(id) => Index::Node(f(id)),
            c => c,
        };
        match *self {
            AxisAddr::Point(i) => AxisAddr::Point(map(i)),
            AxisAddr::Slice(s) => AxisAddr::Slice(Slice {
                start: map(s.start),
                step: s.step,
            }),
        }
    }

    /// Evaluate the mapping at an output coordinate, when it has no node parts.
    pub fn eval(&self, coord: i64) -> Option<i64> {
        match *self {
            AxisAddr::Point(Index::Const(v)) => Some(v),
            AxisAddr::Slice(Slice {
                start: Index::Const(start),
                step,
            }) => Some(start + step * coord),
            _ => None,
        }
    }
}

// ── Validation ──────────────────────────────────────────────────────────────

/// Validate a raw axis index. A point stays a point unless `replace_point`
/// asks for the degenerate slice `start = index, step = 1`.
pub fn coalesce(raw: &AxisIndex, replace_point: bool) -> GenResult<AxisAddr> {
    match *raw {
        AxisIndex::Point(i) if replace_point => Ok(AxisAddr::Slice(Slice { start: i, step: 1 })),
        AxisIndex::Point(i) => Ok(AxisAddr::Point(i)),
        AxisIndex::Range(r) => {
            if r.stop.is_some() {
                return Err(GenError::UnsupportedSlice(
                    "stop bounds are not supported; views are open-ended".into(),
                ));
            }
            let step = r.step.unwrap_or(1);
            if step < 1 {
                return Err(GenError::UnsupportedSlice(format!(
                    "step must be at least 1, got {}",
                    step
                )));
            }
            Ok(AxisAddr::Slice(Slice {
                start: r.start.unwrap_or(Index::Const(0)),
                step,
            }))
        }
    }
}

// ── Composition ─────────────────────────────────────────────────────────────

/// Integer arithmetic on indices that may be nodes. Constant operands are
/// folded by `nest` before reaching the implementation.
pub trait IndexArith {
    fn add_index(&mut self, a: Index, b: Index) -> GenResult<Index>;
    fn scale_index(&mut self, a: Index, k: i64) -> GenResult<Index>;
}

/// Arithmetic over constants only; node operands are rejected.
pub struct ConstArith;

impl IndexArith for ConstArith {
    fn add_index(&mut self, a: Index, b: Index) -> GenResult<Index> {
        match (a, b) {
            (Index::Const(a), Index::Const(b)) => Ok(Index::Const(a + b)),
            _ => Err(GenError::UnsupportedSlice(
                "node-valued index without a builder".into(),
            )),
        }
    }

    fn scale_index(&mut self, a: Index, k: i64) -> GenResult<Index> {
        match a {
            Index::Const(a) => Ok(Index::Const(a * k)),
            Index::Node(_) => Err(GenError::UnsupportedSlice(
                "node-valued index without a builder".into(),
            )),
        }
    }
}

/// `base + k·i`, folding the trivial cases.
fn affine(arith: &mut impl IndexArith, base: Index, k: i64, i: Index) -> GenResult<Index> {
    let scaled = match i {
        Index::Const(v) => Index::Const(v * k),
        _ if k == 1 => i,
        _ => arith.scale_index(i, k)?,
    };
    match (base, scaled) {
        (Index::Const(a), Index::Const(b)) => Ok(Index::Const(a + b)),
        (b, s) if b.is_zero() => Ok(s),
        (b, s) if s.is_zero() => Ok(b),
        (b, s) => arith.add_index(b, s),
    }
}

/// Compose `outer ∘ inner`: the inner address is applied first, its result is
/// then mapped through the outer one. A pinned outer axis ignores the inner
/// address.
pub fn nest(arith: &mut impl IndexArith, outer: &AxisAddr, inner: &AxisAddr) -> GenResult<AxisAddr> {
    let s1 = match outer {
        AxisAddr::Point(_) => return Ok(*outer),
        AxisAddr::Slice(s) => *s,
    };
    match *inner {
        AxisAddr::Slice(s2) => Ok(AxisAddr::Slice(Slice {
            start: affine(arith, s1.start, s1.step, s2.start)?,
            step: s1.step * s2.step,
        })),
        AxisAddr::Point(p) => Ok(AxisAddr::Point(affine(arith, s1.start, s1.step, p)?)),
    }
}

/// `nest` for a raw inner index.
pub fn nest_raw(arith: &mut impl IndexArith, outer: &AxisAddr, inner: &AxisIndex) -> GenResult<AxisAddr> {
    let inner = coalesce(inner, false)?;
    nest(arith, outer, &inner)
}

// ── Rendering ───────────────────────────────────────────────────────────────

/// Name lookup the renderer needs for node-valued indices.
pub trait IndexNames {
    fn index_name(&self, id: NodeId) -> &str;
    /// `Some(axis)` when the node is the per-pixel coordinate of that axis.
    fn coordinate_axis(&self, id: NodeId) -> Option<Axis>;
}

fn index_text(names: &impl IndexNames, i: &Index) -> String {
    match i {
        Index::Const(v) => operand(&v.to_string()).into_owned(),
        Index::Node(id) => operand(names.index_name(*id)).into_owned(),
    }
}

/// Integer coordinate expression for one axis.
pub fn int_formula(names: &impl IndexNames, addr: &AxisAddr, axis: Axis) -> String {
    let c = axis.compute_var();
    match addr {
        AxisAddr::Point(i) => index_text(names, i),
        AxisAddr::Slice(s) => {
            let has_start = !s.start.is_zero();
            match (has_start, s.step != 1) {
                (true, true) => format!("{}*{} + {}", c, s.step, index_text(names, &s.start)),
                (true, false) => format!("{} + {}", c, index_text(names, &s.start)),
                (false, true) => format!("{}*{}", c, s.step),
                (false, false) => c.to_string(),
            }
        }
    }
}

/// Texel-centre sample coordinate for one axis. The untouched full slice and
/// a coordinate point both render as the raw fragment coordinate; a constant
/// point folds to its texel centre.
pub fn render_axis(names: &impl IndexNames, addr: &AxisAddr, axis: Axis) -> String {
    match addr {
        AxisAddr::Point(Index::Const(v)) => return format!("{:?}", *v as f64 + 0.5),
        AxisAddr::Point(Index::Node(id)) => {
            if let Some(a) = names.coordinate_axis(*id) {
                return a.frag_coord().to_string();
            }
        }
        a if a.is_full() => return axis.frag_coord().to_string(),
        _ => {}
    }
    format!("float({}) + 0.5", int_formula(names, addr, axis))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Names;

    impl IndexNames for Names {
        fn index_name(&self, id: NodeId) -> &str {
            match id.0 {
                0 => "x",
                1 => "y",
                _ => "row",
            }
        }

        fn coordinate_axis(&self, id: NodeId) -> Option<Axis> {
            match id.0 {
                0 => Some(Axis::X),
                1 => Some(Axis::Y),
                _ => None,
            }
        }
    }

    fn slice(start: i64, step: i64) -> AxisAddr {
        AxisAddr::Slice(Slice {
            start: Index::Const(start),
            step,
        })
    }

    #[test]
    fn coalesce_defaults() {
        assert_eq!(coalesce(&AxisIndex::all(), false), Ok(AxisAddr::FULL));
        assert_eq!(coalesce(&AxisIndex::every(2), false), Ok(slice(0, 2)));
        assert_eq!(coalesce(&AxisIndex::stepped(1, 2), false), Ok(slice(1, 2)));
    }

    #[test]
    fn coalesce_point_kept_unless_replaced() {
        assert_eq!(
            coalesce(&AxisIndex::at(3), false),
            Ok(AxisAddr::Point(Index::Const(3)))
        );
        assert_eq!(coalesce(&AxisIndex::at(3), true), Ok(slice(3, 1)));
    }

    #[test]
    fn coalesce_rejects_stop() {
        let raw = AxisIndex::Range(RangeSpec {
            stop: Some(Index::Const(4)),
            ..RangeSpec::default()
        });
        assert!(matches!(
            coalesce(&raw, false),
            Err(GenError::UnsupportedSlice(_))
        ));
    }

    #[test]
    fn coalesce_rejects_non_positive_step() {
        assert!(coalesce(&AxisIndex::every(0), false).is_err());
        assert!(coalesce(&AxisIndex::every(-1), false).is_err());
    }

    #[test]
    fn nest_composes_stride_two_views() {
        let outer = slice(0, 2);
        let inner = slice(1, 2);
        assert_eq!(nest(&mut ConstArith, &outer, &inner), Ok(slice(2, 4)));
    }

    #[test]
    fn nest_point_under_slice_stays_point() {
        let outer = slice(1, 3);
        let inner = AxisAddr::Point(Index::Const(2));
        assert_eq!(
            nest(&mut ConstArith, &outer, &inner),
            Ok(AxisAddr::Point(Index::Const(7)))
        );
    }

    #[test]
    fn nest_under_pinned_axis_is_pinned() {
        let outer = AxisAddr::Point(Index::Const(5));
        assert_eq!(nest(&mut ConstArith, &outer, &slice(1, 2)), Ok(outer));
    }

    #[test]
    fn render_fast_path() {
        assert_eq!(render_axis(&Names, &AxisAddr::FULL, Axis::X), "gl_FragCoord.x");
        assert_eq!(
            render_axis(&Names, &AxisAddr::Point(Index::Node(NodeId(1))), Axis::X),
            "gl_FragCoord.y"
        );
    }

    #[test]
    fn render_affine_forms() {
        assert_eq!(render_axis(&Names, &slice(0, 2), Axis::X), "float(x*2) + 0.5");
        assert_eq!(render_axis(&Names, &slice(1, 2), Axis::X), "float(x*2 + 1) + 0.5");
        assert_eq!(render_axis(&Names, &slice(3, 1), Axis::Y), "float(y + 3) + 0.5");
        assert_eq!(
            render_axis(&Names, &AxisAddr::Point(Index::Const(0)), Axis::X),
            "0.5"
        );
        assert_eq!(
            render_axis(&Names, &AxisAddr::Point(Index::Const(3)), Axis::Y),
            "3.5"
        );
        assert_eq!(
            render_axis(&Names, &AxisAddr::Point(Index::Node(NodeId(7))), Axis::Y),
            "float(row) + 0.5"
        );
    }

    #[test]
    fn render_negative_start_is_parenthesized() {
        assert_eq!(
            render_axis(&Names, &slice(-1, 1), Axis::X),
            "float(x + (-1)) + 0.5"
        );
    }

    #[test]
    fn eval_matches_composition() {
        let outer = slice(1, 3);
        let inner = slice(2, 2);
        let nested = nest(&mut ConstArith, &outer, &inner).unwrap();
        for c in 0..10 {
            let direct = outer.eval(inner.eval(c).unwrap()).unwrap();
            assert_eq!(nested.eval(c), Some(direct));
        }
    }
}
