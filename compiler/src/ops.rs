// ops.rs — Operator algebra over builder nodes
//
// Construction functions for every operator a kernel can use. Each takes
// operands as `impl Into<Operand>`, so raw booleans, integers and floats are
// coerced to literal nodes through `Builder::wrap`.
//
// Preconditions: operand node handles come from this builder.
// Postconditions: on success exactly one node is appended, or none when an
//   identity rewrite returns an existing operand.
// Failure modes: incompatible operand kinds → TypeMismatch. Type checks run
//   before any literal is wrapped, so a failed call appends nothing.
// Side effects: `trace!` on identity rewrites.

use log::trace;

use crate::diag::{GenError, GenResult};
use crate::id::NodeId;
use crate::ir::{BinaryOp, Builder, LiteralValue, NodeKind, Operand, UnaryOp};
use crate::slice::Axis;
use crate::types::ValueType;

impl Builder {
    // ── Raw node constructors ───────────────────────────────────────────

    /// Append a binary node without checks or rewrites.
    pub(crate) fn binary_raw(&mut self, op: BinaryOp, lhs: NodeId, rhs: NodeId, ty: ValueType) -> NodeId {
        self.push_fresh(op.prefix(), ty, vec![lhs, rhs], NodeKind::Binary { op, lhs, rhs })
    }

    pub(crate) fn unary_raw(&mut self, op: UnaryOp, operand: NodeId, ty: ValueType) -> NodeId {
        self.push_fresh(op.prefix(), ty, vec![operand], NodeKind::Unary { op, operand })
    }

    pub(crate) fn func_raw(&mut self, func: &str, ty: ValueType, args: Vec<NodeId>) -> NodeId {
        self.push_fresh(
            &format!("func_{}", func),
            ty,
            args.clone(),
            NodeKind::Func {
                func: func.to_string(),
                args,
            },
        )
    }

    fn is_zero(&self, o: &Operand) -> bool {
        matches!(self.operand_literal(o), Some(LiteralValue::Int(0)))
    }

    /// Combine operand types and build the node; `ty` overrides the combined type.
    fn binary_checked(
        &mut self,
        op: BinaryOp,
        a: Operand,
        b: Operand,
        ty: Option<ValueType>,
    ) -> GenResult<NodeId> {
        let ta = self.operand_ty(&a);
        let tb = self.operand_ty(&b);
        let ty = match ty {
            Some(t) => t,
            None => ta.combine(tb).map_err(|_| {
                GenError::type_mismatch(format!("operator '{}'", op.symbol()), ta, tb)
            })?,
        };
        let lhs = self.wrap(a);
        let rhs = self.wrap(b);
        Ok(self.binary_raw(op, lhs, rhs, ty))
    }

    /// The operand itself, when `rewrite` holds and the operand is an Int32 node.
    fn identity(&mut self, keep: Operand, rewrite: bool, what: &str) -> Option<NodeId> {
        if !rewrite || self.operand_ty(&keep) != ValueType::Int32 {
            return None;
        }
        let id = self.wrap(keep);
        trace!("identity rewrite: {} keeps '{}'", what, self.name(id));
        Some(id)
    }

    // ── Arithmetic ──────────────────────────────────────────────────────

    pub fn add(&mut self, a: impl Into<Operand>, b: impl Into<Operand>) -> GenResult<NodeId> {
        let (a, b) = (a.into(), b.into());
        let (za, zb) = (self.is_zero(&a), self.is_zero(&b));
        if let Some(id) = self.identity(a, zb, "x + 0") {
            return Ok(id);
        }
        if let Some(id) = self.identity(b, za, "0 + x") {
            return Ok(id);
        }
        self.binary_checked(BinaryOp::Add, a, b, None)
    }

    pub fn sub(&mut self, a: impl Into<Operand>, b: impl Into<Operand>) -> GenResult<NodeId> {
        let (a, b) = (a.into(), b.into());
        if self.is_zero(&b) {
            if let Some(id) = self.identity(a, true, "x - 0") {
                return Ok(id);
            }
        }
        if self.is_zero(&a) && self.operand_ty(&b) == ValueType::Int32 {
            trace!("identity rewrite: 0 - x becomes neg");
            return self.neg(b);
        }
        self.binary_checked(BinaryOp::Sub, a, b, None)
    }

    pub fn mul(&mut self, a: impl Into<Operand>, b: impl Into<Operand>) -> GenResult<NodeId> {
        self.binary_checked(BinaryOp::Mul, a.into(), b.into(), None)
    }

    /// Integer division; non-Int32 quotients are truncated with `int(...)`.
    pub fn floor_div(&mut self, a: impl Into<Operand>, b: impl Into<Operand>) -> GenResult<NodeId> {
        let (a, b) = (a.into(), b.into());
        let both_int = self.operand_ty(&a) == ValueType::Int32 && self.operand_ty(&b) == ValueType::Int32;
        let q = self.binary_checked(BinaryOp::Div, a, b, None)?;
        if both_int {
            Ok(q)
        } else {
            Ok(self.func_raw("int", ValueType::Int32, vec![q]))
        }
    }

    /// Remainder; two Float32 operands use the `mod` built-in.
    pub fn rem(&mut self, a: impl Into<Operand>, b: impl Into<Operand>) -> GenResult<NodeId> {
        let (a, b) = (a.into(), b.into());
        if self.operand_ty(&a) == ValueType::Float32 && self.operand_ty(&b) == ValueType::Float32 {
            return self.call("mod", ValueType::Float32, [a, b]);
        }
        self.binary_checked(BinaryOp::Mod, a, b, None)
    }

    // ── Bitwise and logical ─────────────────────────────────────────────

    /// Integer literals meeting a UInt32 operand become `u`-suffixed literals.
    fn unsigned_literal(&self, lit: Operand, other: &Operand) -> Operand {
        match lit {
            Operand::Lit(LiteralValue::Int(v))
                if self.operand_ty(other) == ValueType::UInt32 && (0..=u32::MAX as i64).contains(&v) =>
            {
                Operand::Lit(LiteralValue::UInt(v as u32))
            }
            other => other,
        }
    }

    fn bitwise(
        &mut self,
        logical: BinaryOp,
        bitwise: BinaryOp,
        a: Operand,
        b: Operand,
    ) -> GenResult<NodeId> {
        let a = self.unsigned_literal(a, &b);
        let b = self.unsigned_literal(b, &a);
        let both_bits = self.operand_ty(&a) == ValueType::Bit && self.operand_ty(&b) == ValueType::Bit;
        let op = if both_bits { logical } else { bitwise };
        self.binary_checked(op, a, b, None)
    }

    /// `&&` for bits, `&` otherwise.
    pub fn bit_and(&mut self, a: impl Into<Operand>, b: impl Into<Operand>) -> GenResult<NodeId> {
        self.bitwise(BinaryOp::LogicAnd, BinaryOp::BitAnd, a.into(), b.into())
    }

    /// `||` for bits, `|` otherwise.
    pub fn bit_or(&mut self, a: impl Into<Operand>, b: impl Into<Operand>) -> GenResult<NodeId> {
        self.bitwise(BinaryOp::LogicOr, BinaryOp::BitOr, a.into(), b.into())
    }

    /// `!=` for bits, `^` otherwise.
    pub fn bit_xor(&mut self, a: impl Into<Operand>, b: impl Into<Operand>) -> GenResult<NodeId> {
        let (a, b) = (a.into(), b.into());
        if let Some(id) = self.identity(a, self.is_zero(&b), "x ^ 0") {
            return Ok(id);
        }
        if let Some(id) = self.identity(b, self.is_zero(&a), "0 ^ x") {
            return Ok(id);
        }
        self.bitwise(BinaryOp::LogicXor, BinaryOp::BitXor, a, b)
    }

    fn shift(&mut self, op: BinaryOp, a: Operand, b: Operand) -> GenResult<NodeId> {
        if self.is_zero(&b) {
            if let Some(id) = self.identity(a, true, "shift by 0") {
                return Ok(id);
            }
        }
        let ta = self.operand_ty(&a);
        let tb = self.operand_ty(&b);
        if !ta.is_integer() {
            return Err(GenError::type_mismatch(
                format!("left operand of '{}'", op.symbol()),
                "an integer kind",
                ta,
            ));
        }
        if !tb.is_integer() {
            return Err(GenError::type_mismatch(
                format!("shift amount of '{}'", op.symbol()),
                "an integer kind",
                tb,
            ));
        }
        self.binary_checked(op, a, b, Some(ta))
    }

    pub fn shl(&mut self, a: impl Into<Operand>, b: impl Into<Operand>) -> GenResult<NodeId> {
        self.shift(BinaryOp::Shl, a.into(), b.into())
    }

    pub fn shr(&mut self, a: impl Into<Operand>, b: impl Into<Operand>) -> GenResult<NodeId> {
        self.shift(BinaryOp::Shr, a.into(), b.into())
    }

    // ── Comparisons ─────────────────────────────────────────────────────

    fn compare(&mut self, op: BinaryOp, a: Operand, b: Operand) -> GenResult<NodeId> {
        self.binary_checked(op, a, b, Some(ValueType::Bit))
    }

    pub fn eq(&mut self, a: impl Into<Operand>, b: impl Into<Operand>) -> GenResult<NodeId> {
        self.compare(BinaryOp::Eq, a.into(), b.into())
    }

    pub fn ne(&mut self, a: impl Into<Operand>, b: impl Into<Operand>) -> GenResult<NodeId> {
        self.compare(BinaryOp::Ne, a.into(), b.into())
    }

    pub fn lt(&mut self, a: impl Into<Operand>, b: impl Into<Operand>) -> GenResult<NodeId> {
        self.compare(BinaryOp::Lt, a.into(), b.into())
    }

    pub fn le(&mut self, a: impl Into<Operand>, b: impl Into<Operand>) -> GenResult<NodeId> {
        self.compare(BinaryOp::Le, a.into(), b.into())
    }

    pub fn gt(&mut self, a: impl Into<Operand>, b: impl Into<Operand>) -> GenResult<NodeId> {
        self.compare(BinaryOp::Gt, a.into(), b.into())
    }

    pub fn ge(&mut self, a: impl Into<Operand>, b: impl Into<Operand>) -> GenResult<NodeId> {
        self.compare(BinaryOp::Ge, a.into(), b.into())
    }

    // ── Unary ───────────────────────────────────────────────────────────

    /// `!` on bits, `~` on integer kinds. Literals fold.
    pub fn not(&mut self, a: impl Into<Operand>) -> GenResult<NodeId> {
        let a = a.into();
        let ty = self.operand_ty(&a);
        let op = match ty {
            ValueType::Bit => UnaryOp::Not,
            t if t.is_integer() => UnaryOp::Invert,
            _ => return Err(GenError::type_mismatch("operator '~'", "Bit or an integer kind", ty)),
        };
        match self.operand_literal(&a) {
            Some(LiteralValue::Bool(v)) => Ok(self.literal(LiteralValue::Bool(!v))),
            Some(LiteralValue::Int(v)) => Ok(self.literal(LiteralValue::Int(!v))),
            Some(LiteralValue::UInt(v)) => Ok(self.literal(LiteralValue::UInt(!v))),
            _ => {
                let operand = self.wrap(a);
                Ok(self.unary_raw(op, operand, ty))
            }
        }
    }

    pub fn neg(&mut self, a: impl Into<Operand>) -> GenResult<NodeId> {
        let a = a.into();
        let ty = self.operand_ty(&a);
        if matches!(ty, ValueType::Bit | ValueType::Vec2) {
            return Err(GenError::type_mismatch("operator '-'", "a numeric kind", ty));
        }
        let operand = self.wrap(a);
        Ok(self.unary_raw(UnaryOp::Neg, operand, ty))
    }

    // ── Functions, casts, properties ────────────────────────────────────

    /// A built-in call `name(args...)` producing `ty`.
    pub fn call<I, O>(&mut self, name: &str, ty: ValueType, args: I) -> GenResult<NodeId>
    where
        I: IntoIterator<Item = O>,
        O: Into<Operand>,
    {
        let args: Vec<Operand> = args.into_iter().map(Into::into).collect();
        let args: Vec<NodeId> = args.into_iter().map(|a| self.wrap(a)).collect();
        Ok(self.func_raw(name, ty, args))
    }

    /// Conversion to `ty`, named after its GLSL constructor.
    pub fn cast(&mut self, a: impl Into<Operand>, ty: ValueType) -> GenResult<NodeId> {
        let a = a.into();
        let from = self.operand_ty(&a);
        if from == ValueType::Vec2 || ty == ValueType::Vec2 {
            return Err(GenError::type_mismatch("cast", "a scalar kind", ValueType::Vec2));
        }
        let operand = self.wrap(a);
        Ok(self.func_raw(ty.gl_name(), ty, vec![operand]))
    }

    pub fn to_bool(&mut self, a: impl Into<Operand>) -> GenResult<NodeId> {
        self.cast(a, ValueType::Bit)
    }

    pub fn to_int(&mut self, a: impl Into<Operand>) -> GenResult<NodeId> {
        self.cast(a, ValueType::Int32)
    }

    pub fn to_uint(&mut self, a: impl Into<Operand>) -> GenResult<NodeId> {
        self.cast(a, ValueType::UInt32)
    }

    pub fn to_float(&mut self, a: impl Into<Operand>) -> GenResult<NodeId> {
        self.cast(a, ValueType::Float32)
    }

    fn property(&mut self, base: NodeId, component: Axis) -> GenResult<NodeId> {
        let ty = self.ty(base);
        if ty != ValueType::Vec2 {
            return Err(GenError::type_mismatch(
                format!("component '.{}' of '{}'", component, self.name(base)),
                ValueType::Vec2,
                ty,
            ));
        }
        Ok(self.push_fresh(
            &format!("prop_{}", component),
            ValueType::Float32,
            vec![base],
            NodeKind::Property { base, component },
        ))
    }

    pub fn prop_x(&mut self, base: NodeId) -> GenResult<NodeId> {
        self.property(base, Axis::X)
    }

    pub fn prop_y(&mut self, base: NodeId) -> GenResult<NodeId> {
        self.property(base, Axis::Y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn formula(b: &Builder, id: NodeId) -> String {
        b.formula(id).unwrap().unwrap()
    }

    #[test]
    fn add_zero_returns_operand() {
        let mut b = Builder::new();
        let x = b.x();
        let before = b.len();
        assert_eq!(b.add(x, 0).unwrap(), x);
        assert_eq!(b.add(0, x).unwrap(), x);
        assert_eq!(b.sub(x, 0).unwrap(), x);
        assert_eq!(b.len(), before);
    }

    #[test]
    fn xor_and_shift_identities() {
        let mut b = Builder::new();
        let y = b.y();
        assert_eq!(b.bit_xor(y, 0).unwrap(), y);
        assert_eq!(b.shl(y, 0).unwrap(), y);
        assert_eq!(b.shr(y, 0).unwrap(), y);
    }

    #[test]
    fn identity_through_literal_node() {
        let mut b = Builder::new();
        let x = b.x();
        let zero = b.literal(LiteralValue::Int(0));
        assert_eq!(b.add(x, zero).unwrap(), x);
    }

    #[test]
    fn identity_skipped_for_other_kinds() {
        let mut b = Builder::new();
        let f = b.param("f", ValueType::Float32);
        // Float + int literal does not combine; no rewrite hides the error.
        assert!(b.add(f, 0).is_err());
        let u = b.param("u", ValueType::UInt32);
        let shifted = b.shl(u, 0).unwrap();
        assert_ne!(shifted, u);
    }

    #[test]
    fn zero_minus_x_is_negation() {
        let mut b = Builder::new();
        let x = b.x();
        let n = b.sub(0, x).unwrap();
        assert_eq!(b.name(n), "neg_0");
        assert_eq!(formula(&b, n), "-x");
    }

    #[test]
    fn names_follow_allocation_order() {
        let mut b = Builder::new();
        let x = b.x();
        let lt = b.lt(x, 2).unwrap();
        let mul = b.mul(x, 3).unwrap();
        assert_eq!(b.name(lt), "lt_0");
        assert_eq!(b.name(mul), "mul_1");
        assert_eq!(formula(&b, mul), "x * 3");
    }

    #[test]
    fn comparisons_yield_bits() {
        let mut b = Builder::new();
        let f = b.param("f", ValueType::Float32);
        let c = b.lt(f, 0.5).unwrap();
        assert_eq!(b.ty(c), ValueType::Bit);
        assert_eq!(formula(&b, c), "f < (0.5)");
    }

    #[test]
    fn boolean_aware_rendering() {
        let mut b = Builder::new();
        let p = b.param("p", ValueType::Bit);
        let q = b.param("q", ValueType::Bit);
        let and = b.bit_and(p, q).unwrap();
        let or = b.bit_or(p, q).unwrap();
        let xor = b.bit_xor(p, q).unwrap();
        assert_eq!(formula(&b, and), "p && q");
        assert_eq!(formula(&b, or), "p || q");
        assert_eq!(formula(&b, xor), "p != q");
        assert_eq!(b.name(xor), "bit_xor_2");

        let x = b.x();
        let bx = b.bit_xor(x, 1).unwrap();
        assert_eq!(formula(&b, bx), "x ^ 1");
        assert_eq!(b.name(bx), "bitwise_xor_3");
    }

    #[test]
    fn mixed_kinds_mismatch() {
        let mut b = Builder::new();
        let p = b.param("p", ValueType::Bit);
        let x = b.x();
        let before = b.len();
        let err = b.bit_and(p, x).unwrap_err();
        assert!(matches!(err, GenError::TypeMismatch { .. }));
        assert!(b.add(p, 1).is_err());
        assert_eq!(b.len(), before);
    }

    #[test]
    fn uint_masks_take_unsigned_literals() {
        let mut b = Builder::new();
        let u = b.param("u", ValueType::UInt32);
        let m = b.bit_and(u, 0xFFFF_FFFF_i64).unwrap();
        assert_eq!(b.ty(m), ValueType::UInt32);
        assert_eq!(formula(&b, m), "u & 4294967295u");
    }

    #[test]
    fn shift_keeps_left_type() {
        let mut b = Builder::new();
        let u = b.param("u", ValueType::UInt32);
        let s = b.shl(u, 13).unwrap();
        assert_eq!(b.ty(s), ValueType::UInt32);
        let f = b.param("f", ValueType::Float32);
        assert!(b.shl(u, f).is_err());
        assert!(b.shr(f, 1).is_err());
    }

    #[test]
    fn floor_div_and_rem() {
        let mut b = Builder::new();
        let y = b.y();
        let q = b.floor_div(y, 3).unwrap();
        assert_eq!(formula(&b, q), "y / 3");
        let f = b.param("f", ValueType::Float32);
        let g = b.param("g", ValueType::Float32);
        let fq = b.floor_div(f, g).unwrap();
        assert_eq!(b.ty(fq), ValueType::Int32);
        assert!(formula(&b, fq).starts_with("int(divide_"));
        let m = b.rem(f, g).unwrap();
        assert_eq!(formula(&b, m), "mod(f, g)");
        let r = b.rem(y, 4).unwrap();
        assert_eq!(formula(&b, r), "y % 4");
    }

    #[test]
    fn not_on_bits_and_integers() {
        let mut b = Builder::new();
        let p = b.param("p", ValueType::Bit);
        let n = b.not(p).unwrap();
        assert_eq!(formula(&b, n), "!p");
        let x = b.x();
        let i = b.not(x).unwrap();
        assert_eq!(formula(&b, i), "~x");
        assert!(b.name(i).starts_with("invert_"));
        let f = b.param("f", ValueType::Float32);
        assert!(b.not(f).is_err());
    }

    #[test]
    fn not_folds_literals() {
        let mut b = Builder::new();
        let t = b.not(true).unwrap();
        assert_eq!(b.literal_value(t), Some(LiteralValue::Bool(false)));
        let k = b.not(5).unwrap();
        assert_eq!(b.literal_value(k), Some(LiteralValue::Int(-6)));
        assert_eq!(b.names_issued(), 0);
    }

    #[test]
    fn neg_rejects_bits() {
        let mut b = Builder::new();
        let p = b.param("p", ValueType::Bit);
        assert!(b.neg(p).is_err());
    }

    #[test]
    fn casts_and_properties() {
        let mut b = Builder::new();
        let off = b.param("offset", ValueType::Vec2);
        let px = b.prop_x(off).unwrap();
        assert_eq!(b.name(px), "prop_x_0");
        assert_eq!(b.ty(px), ValueType::Float32);
        assert_eq!(formula(&b, px), "offset.x");
        let i = b.to_int(px).unwrap();
        assert_eq!(b.name(i), "func_int_1");
        assert_eq!(formula(&b, i), "int(prop_x_0)");
        let x = b.x();
        assert!(b.prop_y(x).is_err());
        assert!(b.to_float(off).is_err());
    }
}
