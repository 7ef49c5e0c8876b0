// branch.rs — Multi-way conditional chains and their compile-time reduction
//
// `MatchChain::if_then(c, r).else_if(c2).then(r2).else_end(&mut b, d)` builds
// a node evaluating to the result of the first clause whose condition holds,
// else `d`. Literal conditions are folded before any node is built.
//
// Preconditions: operand node handles come from the builder passed to `else_end`.
// Postconditions: the returned node is a Branch over the surviving clauses,
//   or a clause result / the default when no clause survives.
// Failure modes: non-Bit condition or non-combining results → TypeMismatch.
// Side effects: `trace!` for every folded clause.

use log::trace;

use crate::diag::{GenError, GenResult};
use crate::id::NodeId;
use crate::ir::{Builder, LiteralValue, NodeKind, Operand};
use crate::types::ValueType;

/// A chain with at least one complete clause, awaiting more or a default.
#[derive(Debug, Clone)]
pub struct MatchChain {
    clauses: Vec<(Operand, Operand)>,
}

/// A chain whose last condition has no result yet.
#[derive(Debug, Clone)]
pub struct PendingClause {
    clauses: Vec<(Operand, Operand)>,
    condition: Operand,
}

impl MatchChain {
    pub fn if_then(condition: impl Into<Operand>, result: impl Into<Operand>) -> Self {
        MatchChain {
            clauses: vec![(condition.into(), result.into())],
        }
    }

    pub fn else_if(self, condition: impl Into<Operand>) -> PendingClause {
        PendingClause {
            clauses: self.clauses,
            condition: condition.into(),
        }
    }

    pub fn clauses(&self) -> &[(Operand, Operand)] {
        &self.clauses
    }

    /// Finish the chain with `default` and build it.
    pub fn else_end(self, b: &mut Builder, default: impl Into<Operand>) -> GenResult<NodeId> {
        let default = default.into();
        for (i, (cond, _)) in self.clauses.iter().enumerate() {
            let ty = b.operand_ty(cond);
            if ty != ValueType::Bit {
                return Err(GenError::type_mismatch(format!("condition {} of match", i), ValueType::Bit, ty));
            }
        }

        let (clauses, default) = simplify(b, self.clauses, default);
        if clauses.is_empty() {
            return Ok(b.wrap(default));
        }

        let mut ty = b.operand_ty(&default);
        for (_, result) in &clauses {
            let rt = b.operand_ty(result);
            ty = ty
                .combine(rt)
                .map_err(|_| GenError::type_mismatch("match result", ty, rt))?;
        }

        let mut deps = Vec::with_capacity(clauses.len() * 2 + 1);
        let mut built = Vec::with_capacity(clauses.len());
        for (cond, result) in clauses {
            let c = b.wrap(cond);
            let r = b.wrap(result);
            deps.push(c);
            deps.push(r);
            built.push((c, r));
        }
        let d = b.wrap(default);
        deps.push(d);
        Ok(b.push_fresh(
            "match",
            ty,
            deps,
            NodeKind::Branch {
                clauses: built,
                default: d,
            },
        ))
    }
}

impl PendingClause {
    pub fn then(self, result: impl Into<Operand>) -> MatchChain {
        let mut clauses = self.clauses;
        clauses.push((self.condition, result.into()));
        MatchChain { clauses }
    }
}

/// Fold literal conditions: a true literal ends the chain and its result
/// becomes the default; false literals are dropped.
pub fn simplify(
    b: &Builder,
    clauses: Vec<(Operand, Operand)>,
    default: Operand,
) -> (Vec<(Operand, Operand)>, Operand) {
    let mut kept = Vec::with_capacity(clauses.len());
    for (i, (cond, result)) in clauses.into_iter().enumerate() {
        match b.operand_literal(&cond) {
            Some(LiteralValue::Bool(true)) => {
                trace!("match: clause {} is always taken, later clauses dropped", i);
                return (kept, result);
            }
            Some(LiteralValue::Bool(false)) => {
                trace!("match: clause {} is never taken", i);
            }
            _ => kept.push((cond, result)),
        }
    }
    (kept, default)
}
