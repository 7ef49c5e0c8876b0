// ir.rs — Expression DAG: node model and the arena-owning builder
//
// Every value in a kernel is a `Node` stored in a `Builder` arena and
// referenced by `NodeId`. Nodes are immutable once pushed. A node reached
// along two paths is the same handle and is emitted once; two structurally
// identical nodes built separately stay distinct.
//
// Preconditions: none.
// Postconditions: every dependency handle of a pushed node refers to an
//   earlier node, so the graph is acyclic by construction.
// Failure modes: `formula` on a Branch with a non-Bit condition →
//   TypeMismatch; decoding an unsupported buffer type → UnsupportedConversion.
// Side effects: none.

use std::borrow::Cow;

use crate::diag::{GenError, GenResult};
use crate::id::{NameAllocator, NodeId};
use crate::slice::{render_axis, Axis, AxisAddr, IndexNames};
use crate::types::ValueType;

// ── Literals and operands ───────────────────────────────────────────────────

/// A compile-time constant, kept in native form so branches can be folded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LiteralValue {
    Bool(bool),
    Int(i64),
    UInt(u32),
    Float(f64),
}

impl LiteralValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            LiteralValue::Bool(_) => ValueType::Bit,
            LiteralValue::Int(_) => ValueType::Int32,
            LiteralValue::UInt(_) => ValueType::UInt32,
            LiteralValue::Float(_) => ValueType::Float32,
        }
    }

    /// GLSL source text.
    pub fn text(&self) -> String {
        match self {
            LiteralValue::Bool(b) => b.to_string(),
            LiteralValue::Int(v) => v.to_string(),
            LiteralValue::UInt(v) => format!("{}u", v),
            LiteralValue::Float(v) => format!("{:?}", v),
        }
    }
}

/// An operator argument: an existing node, or a raw value to be wrapped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    Node(NodeId),
    Lit(LiteralValue),
}

impl From<NodeId> for Operand {
    fn from(id: NodeId) -> Self {
        Operand::Node(id)
    }
}

impl From<bool> for Operand {
    fn from(v: bool) -> Self {
        Operand::Lit(LiteralValue::Bool(v))
    }
}

impl From<i32> for Operand {
    fn from(v: i32) -> Self {
        Operand::Lit(LiteralValue::Int(v as i64))
    }
}

impl From<i64> for Operand {
    fn from(v: i64) -> Self {
        Operand::Lit(LiteralValue::Int(v))
    }
}

impl From<u32> for Operand {
    fn from(v: u32) -> Self {
        Operand::Lit(LiteralValue::Int(v as i64))
    }
}

impl From<f32> for Operand {
    fn from(v: f32) -> Self {
        Operand::Lit(LiteralValue::Float(v as f64))
    }
}

impl From<f64> for Operand {
    fn from(v: f64) -> Self {
        Operand::Lit(LiteralValue::Float(v))
    }
}

impl From<LiteralValue> for Operand {
    fn from(v: LiteralValue) -> Self {
        Operand::Lit(v)
    }
}

// ── Operators ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// Boolean negation `!`.
    Not,
    /// Bitwise complement `~`.
    Invert,
    /// Arithmetic negation `-`.
    Neg,
}

impl UnaryOp {
    pub fn prefix(self) -> &'static str {
        match self {
            UnaryOp::Not => "not",
            UnaryOp::Invert => "invert",
            UnaryOp::Neg => "neg",
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Invert => "~",
            UnaryOp::Neg => "-",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    BitAnd,
    BitOr,
    BitXor,
    LogicAnd,
    LogicOr,
    LogicXor,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    /// Name prefix of nodes built with this operator.
    pub fn prefix(self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Div => "divide",
            BinaryOp::Mod => "mod",
            BinaryOp::BitAnd => "bitwise_and",
            BinaryOp::BitOr => "bitwise_or",
            BinaryOp::BitXor => "bitwise_xor",
            BinaryOp::LogicAnd => "bit_and",
            BinaryOp::LogicOr => "bit_or",
            BinaryOp::LogicXor => "bit_xor",
            BinaryOp::Shl => "left_shift",
            BinaryOp::Shr => "right_shift",
            BinaryOp::Eq => "eq",
            BinaryOp::Ne => "ne",
            BinaryOp::Lt => "lt",
            BinaryOp::Le => "le",
            BinaryOp::Gt => "gt",
            BinaryOp::Ge => "ge",
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::LogicAnd => "&&",
            BinaryOp::LogicOr => "||",
            BinaryOp::LogicXor => "!=",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }
}

// ── Nodes ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamRole {
    /// Declared by the caller; gets its own binding descriptor.
    Uniform,
    /// Size of a buffer; bound together with the buffer's sampler.
    BufferSize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Literal(LiteralValue),
    /// Per-pixel integer output coordinate (`x` or `y`).
    Coord(Axis),
    Param {
        role: ParamRole,
    },
    /// A 2-D typed buffer read at the current output coordinate.
    Buffer {
        sampler: String,
        size: NodeId,
    },
    /// A buffer read through an affine remapping of both axes.
    View {
        buffer: NodeId,
        x: AxisAddr,
        y: AxisAddr,
    },
    Unary {
        op: UnaryOp,
        operand: NodeId,
    },
    Binary {
        op: BinaryOp,
        lhs: NodeId,
        rhs: NodeId,
    },
    /// Conversion or built-in call.
    Func {
        func: String,
        args: Vec<NodeId>,
    },
    /// Vec2 component access.
    Property {
        base: NodeId,
        component: Axis,
    },
    /// First clause whose condition holds, else the default.
    Branch {
        clauses: Vec<(NodeId, NodeId)>,
        default: NodeId,
    },
}

impl NodeKind {
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Literal(_) => "literal",
            NodeKind::Coord(_) => "coord",
            NodeKind::Param { .. } => "param",
            NodeKind::Buffer { .. } => "buffer",
            NodeKind::View { .. } => "view",
            NodeKind::Unary { .. } => "unary",
            NodeKind::Binary { .. } => "binary",
            NodeKind::Func { .. } => "func",
            NodeKind::Property { .. } => "property",
            NodeKind::Branch { .. } => "branch",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub ty: ValueType,
    /// Nodes whose values this node's formula reads.
    pub deps: Vec<NodeId>,
    /// Nodes that must be declared as external bindings when this node is
    /// used, without being part of its value chain.
    pub binding_deps: Vec<NodeId>,
    pub kind: NodeKind,
}

/// Parenthesize an operand unless it is a bare identifier or a non-negative
/// integer literal.
pub fn operand(text: &str) -> Cow<'_, str> {
    let bare = !text.is_empty() && text.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if bare {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(format!("({})", text))
    }
}

// ── Builder ─────────────────────────────────────────────────────────────────

/// Owns the nodes of one build and its name sequence. A fresh builder is a
/// fresh, independent build.
#[derive(Debug)]
pub struct Builder {
    nodes: Vec<Node>,
    names: NameAllocator,
    x: NodeId,
    y: NodeId,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    pub fn new() -> Self {
        let mut b = Builder {
            nodes: Vec::new(),
            names: NameAllocator::new(),
            x: NodeId(0),
            y: NodeId(0),
        };
        b.x = b.push_named("x", ValueType::Int32, Vec::new(), NodeKind::Coord(Axis::X));
        b.y = b.push_named("y", ValueType::Int32, Vec::new(), NodeKind::Coord(Axis::Y));
        b
    }

    // ── Access ──────────────────────────────────────────────────────────

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn ty(&self, id: NodeId) -> ValueType {
        self.node(id).ty
    }

    pub fn name(&self, id: NodeId) -> &str {
        &self.node(id).name
    }

    /// Number of generated names handed out by this build.
    pub fn names_issued(&self) -> u32 {
        self.names.issued()
    }

    /// The per-pixel x coordinate.
    pub fn x(&self) -> NodeId {
        self.x
    }

    /// The per-pixel y coordinate.
    pub fn y(&self) -> NodeId {
        self.y
    }

    pub fn coord(&self, axis: Axis) -> NodeId {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
        }
    }

    pub fn literal_value(&self, id: NodeId) -> Option<LiteralValue> {
        match self.node(id).kind {
            NodeKind::Literal(v) => Some(v),
            _ => None,
        }
    }

    pub(crate) fn operand_ty(&self, o: &Operand) -> ValueType {
        match o {
            Operand::Node(id) => self.ty(*id),
            Operand::Lit(v) => v.value_type(),
        }
    }

    pub(crate) fn operand_literal(&self, o: &Operand) -> Option<LiteralValue> {
        match o {
            Operand::Node(id) => self.literal_value(*id),
            Operand::Lit(v) => Some(*v),
        }
    }

    // ── Construction primitives ─────────────────────────────────────────

    pub(crate) fn push_named(
        &mut self,
        name: impl Into<String>,
        ty: ValueType,
        deps: Vec<NodeId>,
        kind: NodeKind,
    ) -> NodeId {
        self.push_with_bindings(name.into(), ty, deps, Vec::new(), kind)
    }

    pub(crate) fn push_with_bindings(
        &mut self,
        name: String,
        ty: ValueType,
        deps: Vec<NodeId>,
        binding_deps: Vec<NodeId>,
        kind: NodeKind,
    ) -> NodeId {
        debug_assert!(deps
            .iter()
            .chain(&binding_deps)
            .all(|d| d.index() < self.nodes.len()));
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            name,
            ty,
            deps,
            binding_deps,
            kind,
        });
        id
    }

    /// Push a node under a generated `<prefix>_<n>` name.
    pub(crate) fn push_fresh(
        &mut self,
        prefix: &str,
        ty: ValueType,
        deps: Vec<NodeId>,
        kind: NodeKind,
    ) -> NodeId {
        let name = self.names.fresh(prefix);
        self.push_named(name, ty, deps, kind)
    }

    pub(crate) fn fresh_name(&mut self, prefix: &str) -> String {
        self.names.fresh(prefix)
    }

    /// A literal node. Literals are named by their own text.
    pub fn literal(&mut self, value: impl Into<LiteralValue>) -> NodeId {
        let value = value.into();
        self.push_named(value.text(), value.value_type(), Vec::new(), NodeKind::Literal(value))
    }

    /// Coerce an operand to a node; raw values become literal nodes.
    pub fn wrap(&mut self, o: impl Into<Operand>) -> NodeId {
        match o.into() {
            Operand::Node(id) => id,
            Operand::Lit(v) => self.literal(v),
        }
    }

    /// An external scalar/vector bound at dispatch time, named as given.
    pub fn param(&mut self, name: &str, ty: ValueType) -> NodeId {
        self.push_named(name, ty, Vec::new(), NodeKind::Param {
            role: ParamRole::Uniform,
        })
    }

    /// A named 2-D buffer: node `v_<name>`, sampler `<name>`, size `<name>_size`.
    pub fn buffer(&mut self, name: &str, ty: ValueType) -> GenResult<NodeId> {
        ty.decode("")?;
        let size = self.push_named(format!("{}_size", name), ValueType::Vec2, Vec::new(), NodeKind::Param {
            role: ParamRole::BufferSize,
        });
        Ok(self.push_named(
            format!("v_{}", name),
            ty,
            vec![size],
            NodeKind::Buffer {
                sampler: name.to_string(),
                size,
            },
        ))
    }

    /// A buffer with generated names (`v_tex_<n>`, `tex_size_<m>`).
    pub fn anonymous_buffer(&mut self, ty: ValueType) -> GenResult<NodeId> {
        ty.decode("")?;
        let size_name = self.fresh_name("tex_size");
        let size = self.push_named(size_name, ValueType::Vec2, Vec::new(), NodeKind::Param {
            role: ParamRole::BufferSize,
        });
        let name = self.fresh_name("v_tex");
        let sampler = name["v_".len()..].to_string();
        Ok(self.push_named(name, ty, vec![size], NodeKind::Buffer { sampler, size }))
    }

    /// The Vec2 size parameter of a buffer (or of the buffer under a view).
    pub fn buffer_size(&self, id: NodeId) -> GenResult<NodeId> {
        match &self.node(id).kind {
            NodeKind::Buffer { size, .. } => Ok(*size),
            NodeKind::View { buffer, .. } => self.buffer_size(*buffer),
            other => Err(GenError::invalid_index(
                self.name(id),
                format!("a {} node has no buffer size", other.label()),
            )),
        }
    }

    // ── Rendering ───────────────────────────────────────────────────────

    fn op_text(&self, id: NodeId) -> Cow<'_, str> {
        operand(self.name(id))
    }

    /// Expression computing the node from its dependencies' names, or `None`
    /// when the node's name is already a valid expression. Branch formulas
    /// span several lines, one clause per line.
    pub fn formula(&self, id: NodeId) -> GenResult<Option<String>> {
        let node = self.node(id);
        let text = match &node.kind {
            NodeKind::Literal(_) | NodeKind::Coord(_) | NodeKind::Param { .. } => return Ok(None),
            NodeKind::Buffer { sampler, size } => {
                let sample = format!("texture({}, gl_FragCoord.xy / {})", sampler, self.op_text(*size));
                node.ty.decode(&sample)?
            }
            NodeKind::View { buffer, x, y } => {
                let (sampler, size) = match &self.node(*buffer).kind {
                    NodeKind::Buffer { sampler, size } => (sampler, *size),
                    other => {
                        return Err(GenError::invalid_index(
                            self.name(*buffer),
                            format!("view over a {} node", other.label()),
                        ))
                    }
                };
                let sample = format!(
                    "texture({}, vec2({}, {}) / {})",
                    sampler,
                    render_axis(self, x, Axis::X),
                    render_axis(self, y, Axis::Y),
                    self.op_text(size)
                );
                node.ty.decode(&sample)?
            }
            NodeKind::Unary { op, operand } => format!("{}{}", op.symbol(), self.op_text(*operand)),
            NodeKind::Binary { op, lhs, rhs } => format!(
                "{} {} {}",
                self.op_text(*lhs),
                op.symbol(),
                self.op_text(*rhs)
            ),
            NodeKind::Func { func, args } => {
                let args: Vec<Cow<'_, str>> = args.iter().map(|a| self.op_text(*a)).collect();
                format!("{}({})", func, args.join(", "))
            }
            NodeKind::Property { base, component } => {
                format!("{}.{}", self.op_text(*base), component)
            }
            NodeKind::Branch { clauses, default } => {
                let mut lines = Vec::with_capacity(clauses.len() + 1);
                for (cond, result) in clauses {
                    let cond_ty = self.ty(*cond);
                    if cond_ty != ValueType::Bit {
                        return Err(GenError::type_mismatch(
                            format!("condition '{}' of '{}'", self.name(*cond), node.name),
                            ValueType::Bit,
                            cond_ty,
                        ));
                    }
                    lines.push(format!("{} ? {} :", self.op_text(*cond), self.op_text(*result)));
                }
                lines.push(self.op_text(*default).into_owned());
                lines.join("\n")
            }
        };
        Ok(Some(text))
    }
}

impl IndexNames for Builder {
    fn index_name(&self, id: NodeId) -> &str {
        self.name(id)
    }

    fn coordinate_axis(&self, id: NodeId) -> Option<Axis> {
        match self.node(id).kind {
            NodeKind::Coord(axis) => Some(axis),
            _ => None,
        }
    }
}
