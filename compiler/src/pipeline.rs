// pipeline.rs — Externally sequenced multi-step kernel lists
//
// A pipeline is an ordered list of writes `destination[region] = source`.
// Each write becomes one independent kernel; ordering between them is the
// dispatcher's job, not the kernels'. Also holds the build provenance record
// the binary emits with `--emit build-info`.
//
// Preconditions: all nodes come from the builder passed in.
// Postconditions: `emit` yields one document per recorded write, in order.
// Failure modes: non-buffer destination → InvalidIndex; bad region →
//   UnsupportedSlice; source/destination kinds differ → TypeMismatch;
//   emission errors propagate.
// Side effects: `write` appends region-masking nodes to the builder.

use std::fmt::Write as _;

use log::debug;
use serde::Serialize;

use crate::branch::MatchChain;
use crate::codegen::{emit_kernel, Binding, EmitOptions, KernelDocument};
use crate::diag::{GenError, GenResult};
use crate::id::NodeId;
use crate::ir::{Builder, NodeKind, Operand};
use crate::slice::{coalesce, Axis, AxisAddr, AxisIndex, Index, Slice};

// ── Steps ───────────────────────────────────────────────────────────────────

/// One recorded write.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteStep {
    pub destination: NodeId,
    pub x: AxisAddr,
    pub y: AxisAddr,
    /// Value written at every destination pixel (region mask applied).
    pub root: NodeId,
}

/// A write lowered to a kernel.
#[derive(Debug, Clone)]
pub struct EmittedStep {
    pub kernel: String,
    /// Sampler name of the destination buffer.
    pub destination: String,
    pub document: KernelDocument,
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    name: String,
    steps: Vec<WriteStep>,
}

impl Pipeline {
    pub fn new(name: impl Into<String>) -> Self {
        Pipeline {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[WriteStep] {
        &self.steps
    }

    /// Record `destination[x, y] = source`.
    pub fn write(
        &mut self,
        b: &mut Builder,
        source: impl Into<Operand>,
        destination: NodeId,
        x: impl Into<AxisIndex>,
        y: impl Into<AxisIndex>,
    ) -> GenResult<()> {
        if !matches!(b.node(destination).kind, NodeKind::Buffer { .. }) {
            return Err(GenError::invalid_index(
                b.name(destination),
                format!("cannot write into a {} node", b.node(destination).kind.label()),
            ));
        }
        let fx = coalesce(&x.into(), false)?;
        let fy = coalesce(&y.into(), false)?;
        let source = source.into();
        let (st, dt) = (b.operand_ty(&source), b.ty(destination));
        st.combine(dt).map_err(|_| {
            GenError::type_mismatch(format!("write into '{}'", b.name(destination)), dt, st)
        })?;

        let root = if fx.is_full() && fy.is_full() {
            b.wrap(source)
        } else {
            masked_write(b, source, destination, &fx, &fy)?
        };
        debug!(
            "pipeline '{}': step {} writes '{}'",
            self.name,
            self.steps.len(),
            b.name(destination)
        );
        self.steps.push(WriteStep {
            destination,
            x: fx,
            y: fy,
            root,
        });
        Ok(())
    }

    /// One kernel document per step.
    pub fn emit(&self, b: &Builder, options: &EmitOptions) -> GenResult<Vec<EmittedStep>> {
        self.steps
            .iter()
            .enumerate()
            .map(|(i, step)| {
                let destination = match &b.node(step.destination).kind {
                    NodeKind::Buffer { sampler, .. } => sampler.clone(),
                    _ => b.name(step.destination).to_string(),
                };
                Ok(EmittedStep {
                    kernel: format!("{}Step{}", self.name, i),
                    destination,
                    document: emit_kernel(b, step.root, options)?,
                })
            })
            .collect()
    }

    /// Dispatch lines for the host runtime, one per step.
    pub fn dispatch_script(emitted: &[EmittedStep]) -> String {
        let mut out = String::new();
        for step in emitted {
            let args: Vec<&str> = step
                .document
                .bindings
                .iter()
                .map(|binding| match binding {
                    Binding::Uniform { name, .. } | Binding::Texture { name, .. } => name.as_str(),
                })
                .collect();
            let _ = writeln!(
                out,
                "{}.withArgs({}).renderInto({});",
                step.kernel,
                args.join(", "),
                step.destination
            );
        }
        out
    }
}

/// `in_region ? source[local] : destination`.
fn masked_write(
    b: &mut Builder,
    source: Operand,
    destination: NodeId,
    fx: &AxisAddr,
    fy: &AxisAddr,
) -> GenResult<NodeId> {
    let mut conds: Vec<NodeId> = Vec::new();
    let lx = region_axis(b, Axis::X, fx, &mut conds)?;
    let ly = region_axis(b, Axis::Y, fy, &mut conds)?;

    let read = match source {
        Operand::Node(id)
            if !matches!(
                b.node(id).kind,
                NodeKind::Literal(_) | NodeKind::Param { .. } | NodeKind::Coord(_)
            ) =>
        {
            Operand::Node(b.index(id, lx, ly)?)
        }
        other => other,
    };

    let Some((&first, rest)) = conds.split_first() else {
        return Ok(b.wrap(read));
    };
    let mut in_region = first;
    for &c in rest {
        in_region = b.bit_and(in_region, c)?;
    }
    MatchChain::if_then(in_region, read).else_end(b, destination)
}

/// Membership conditions for one axis of a region, and the source index
/// that lands on each covered coordinate.
fn region_axis(
    b: &mut Builder,
    axis: Axis,
    addr: &AxisAddr,
    conds: &mut Vec<NodeId>,
) -> GenResult<AxisIndex> {
    let c = b.coord(axis);
    match *addr {
        a if a.is_full() => Ok(AxisIndex::all()),
        AxisAddr::Point(p) => {
            conds.push(b.eq(c, p)?);
            Ok(AxisIndex::at(0))
        }
        AxisAddr::Slice(Slice { start, step }) => {
            let offset = if start == Index::Const(0) { c } else { b.sub(c, start)? };
            conds.push(b.ge(offset, 0)?);
            if step == 1 {
                return Ok(AxisIndex::at(offset));
            }
            let phase = b.rem(offset, step)?;
            conds.push(b.eq(phase, 0)?);
            Ok(AxisIndex::at(b.floor_div(offset, step)?))
        }
    }
}

// ── Provenance ──────────────────────────────────────────────────────────────

/// Provenance metadata for one emitted kernel, for `--emit build-info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildInfo {
    pub compiler_version: &'static str,
    pub kernel: String,
    /// SHA-256 of the kernel source.
    pub fingerprint: String,
    pub bindings: usize,
}

impl BuildInfo {
    pub fn new(kernel: &str, document: &KernelDocument) -> Self {
        BuildInfo {
            compiler_version: env!("CARGO_PKG_VERSION"),
            kernel: kernel.to_string(),
            fingerprint: document.fingerprint(),
            bindings: document.bindings.len(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
