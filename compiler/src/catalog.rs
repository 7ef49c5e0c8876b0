// catalog.rs — Sample kernels built through the public construction API
//
// Each entry builds one root node for a stabilizer-tableau simulator kernel:
// the tableau lives in a Bit buffer `state`, two rows per qubit (X then Z
// observable), column 0 holding sign bits. The binary selects kernels from
// this table by name.
//
// Preconditions: a fresh `Builder` per entry.
// Postconditions: returns the root node to emit.
// Failure modes: none for the built-in entries; errors propagate with `?`.
// Side effects: appends nodes to the builder.

use crate::branch::MatchChain;
use crate::diag::GenResult;
use crate::id::NodeId;
use crate::ir::{Builder, Operand};
use crate::pipeline::Pipeline;
use crate::slice::AxisIndex;
use crate::types::ValueType;

/// A named kernel and how to build it.
#[derive(Clone, Copy)]
pub struct CatalogEntry {
    pub name: &'static str,
    pub description: &'static str,
    pub build: fn(&mut Builder) -> GenResult<NodeId>,
}

impl std::fmt::Debug for CatalogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogEntry").field("name", &self.name).finish()
    }
}

pub const CATALOG: &[CatalogEntry] = &[
    CatalogEntry {
        name: "singleX",
        description: "Pauli X on the qubit `target`",
        build: single_x,
    },
    CatalogEntry {
        name: "singleHadamard",
        description: "Hadamard on the qubit `target`",
        build: single_hadamard,
    },
    CatalogEntry {
        name: "singleCZ",
        description: "Controlled Z between `target1` and `target2`",
        build: single_cz,
    },
    CatalogEntry {
        name: "findOneFold",
        description: "Halving fold locating the first non-zero column",
        build: find_one_fold,
    },
    CatalogEntry {
        name: "orFold",
        description: "Halving fold OR-ing adjacent columns",
        build: or_fold,
    },
    CatalogEntry {
        name: "shifter",
        description: "Translate the buffer by the `offset` vector, zero-filled",
        build: shifter,
    },
    CatalogEntry {
        name: "prepareCleanState",
        description: "Initial tableau for all qubits in |0>",
        build: prepare_clean_state,
    },
    CatalogEntry {
        name: "bitToInt",
        description: "Widen a Bit buffer to Int32",
        build: bit_to_int,
    },
    CatalogEntry {
        name: "eliminateCol",
        description: "Reset the measured qubit's first variable column",
        build: eliminate_col,
    },
    CatalogEntry {
        name: "randomAdvance",
        description: "Advance per-row xorshift32 generator state",
        build: random_advance,
    },
    CatalogEntry {
        name: "measureSetResult",
        description: "Store the measurement outcome of `target`",
        build: measure_set_result,
    },
    CatalogEntry {
        name: "hadamardAll",
        description: "Hadamard on every surface-code qubit",
        build: hadamard_all,
    },
    CatalogEntry {
        name: "hadamardCheck",
        description: "Hadamard on surface-code check qubits",
        build: hadamard_check,
    },
    CatalogEntry {
        name: "hadamardData",
        description: "Hadamard on surface-code data qubits",
        build: hadamard_data,
    },
    CatalogEntry {
        name: "surfaceCzsEHX",
        description: "Surface-code CZ layer",
        build: surface_czs_ehx,
    },
    CatalogEntry {
        name: "surfaceCzsOHX",
        description: "Surface-code CZ layer",
        build: surface_czs_ohx,
    },
    CatalogEntry {
        name: "surfaceCzsEVX",
        description: "Surface-code CZ layer",
        build: surface_czs_evx,
    },
    CatalogEntry {
        name: "surfaceCzsOVX",
        description: "Surface-code CZ layer",
        build: surface_czs_ovx,
    },
    CatalogEntry {
        name: "surfaceCzsEHZ",
        description: "Surface-code CZ layer",
        build: surface_czs_ehz,
    },
    CatalogEntry {
        name: "surfaceCzsOHZ",
        description: "Surface-code CZ layer",
        build: surface_czs_ohz,
    },
    CatalogEntry {
        name: "surfaceCzsEVZ",
        description: "Surface-code CZ layer",
        build: surface_czs_evz,
    },
    CatalogEntry {
        name: "surfaceCzsOVZ",
        description: "Surface-code CZ layer",
        build: surface_czs_ovz,
    },
];

pub fn find(name: &str) -> Option<&'static CatalogEntry> {
    CATALOG.iter().find(|e| e.name == name)
}

// ── Shared gate layers ──────────────────────────────────────────────────────

/// Hadamard on every qubit whose rows are not `unaffected`: flip the Z sign
/// bit's source and swap the X/Z observables.
fn parallel_hadamards(b: &mut Builder, src: NodeId, unaffected: impl Into<Operand>) -> GenResult<NodeId> {
    let unaffected = unaffected.into();
    let (x, y) = (b.x(), b.y());
    let sign_col = b.eq(x, 0)?;
    let y_low = b.bit_and(y, 1)?;
    let x_row = b.eq(y_low, 0)?;
    let sign_of_x = b.bit_and(sign_col, x_row)?;
    let flipped = b.not(src)?;
    let partner_row = b.bit_xor(y, 1)?;
    let swapped = b.index(src, x, partner_row)?;
    MatchChain::if_then(unaffected, src)
        .else_if(sign_of_x)
        .then(flipped)
        .else_end(b, swapped)
}

/// Controlled Z from each affected qubit to `partner`.
fn parallel_czs(
    b: &mut Builder,
    state: NodeId,
    affected: impl Into<Operand>,
    partner: impl Into<Operand>,
) -> GenResult<NodeId> {
    let (x, y) = (b.x(), b.y());
    let data_col = b.gt(x, 0)?;
    let y_low = b.bit_and(y, 1)?;
    let x_row = b.eq(y_low, 0)?;
    let on_x_row = b.bit_and(data_col, x_row)?;
    let is_affected = b.bit_and(on_x_row, affected)?;
    let p2 = b.mul(partner, 2)?;
    let partner_z = b.add(p2, 1)?;
    let partner_bits = b.index(state, AxisIndex::all(), partner_z)?;
    let flip = b.bit_and(partner_bits, is_affected)?;
    b.bit_xor(state, flip)
}

// ── Single-qubit and two-qubit gates ────────────────────────────────────────

fn single_x(b: &mut Builder) -> GenResult<NodeId> {
    let state = b.buffer("state", ValueType::Bit)?;
    let target = b.param("target", ValueType::Int32);
    let (x, y) = (b.x(), b.y());
    // Flip the Z observable's sign bit and its own bit.
    let near = b.lt(x, 2)?;
    let t2 = b.mul(target, 2)?;
    let row = b.add(t2, x)?;
    let on_row = b.eq(y, row)?;
    let flip = b.bit_and(near, on_row)?;
    b.ne(state, flip)
}

fn single_hadamard(b: &mut Builder) -> GenResult<NodeId> {
    let state = b.buffer("state", ValueType::Bit)?;
    let target = b.param("target", ValueType::Int32);
    let y = b.y();
    let qubit = b.shr(y, 1)?;
    let unaffected = b.ne(qubit, target)?;
    parallel_hadamards(b, state, unaffected)
}

fn single_cz(b: &mut Builder) -> GenResult<NodeId> {
    let state = b.buffer("state", ValueType::Bit)?;
    let target1 = b.param("target1", ValueType::Int32);
    let target2 = b.param("target2", ValueType::Int32);
    let y = b.y();
    let qubit = b.shr(y, 1)?;
    let is1 = b.eq(qubit, target1)?;
    let is2 = b.eq(qubit, target2)?;
    let affected = b.bit_or(is1, is2)?;
    let both = b.add(target1, target2)?;
    let partner = b.sub(both, qubit)?;
    parallel_czs(b, state, affected, partner)
}

// ── Folds and utilities ─────────────────────────────────────────────────────

fn find_one_fold(b: &mut Builder) -> GenResult<NodeId> {
    let state = b.buffer("state", ValueType::Int32)?;
    let x = b.x();
    let left = b.index(state, AxisIndex::every(2), AxisIndex::all())?;
    let right = b.index(state, AxisIndex::stepped(1, 2), AxisIndex::all())?;
    let left_set = b.ne(left, 0)?;
    let left_at = b.add(left, x)?;
    let right_set = b.ne(right, 0)?;
    let right_x = b.add(right, x)?;
    let right_at = b.add(right_x, 1)?;
    MatchChain::if_then(left_set, left_at)
        .else_if(right_set)
        .then(right_at)
        .else_end(b, 0)
}

fn or_fold(b: &mut Builder) -> GenResult<NodeId> {
    let state = b.buffer("state", ValueType::Bit)?;
    let left = b.index(state, AxisIndex::every(2), AxisIndex::all())?;
    let right = b.index(state, AxisIndex::stepped(1, 2), AxisIndex::all())?;
    b.bit_or(left, right)
}

fn shifter(b: &mut Builder) -> GenResult<NodeId> {
    let state = b.buffer("state", ValueType::Int32)?;
    let offset = b.param("offset", ValueType::Vec2);
    let (x, y) = (b.x(), b.y());
    let ox = b.prop_x(offset)?;
    let dx = b.to_int(ox)?;
    let read_x = b.sub(x, dx)?;
    let oy = b.prop_y(offset)?;
    let dy = b.to_int(oy)?;
    let read_y = b.sub(y, dy)?;

    let size = b.buffer_size(state)?;
    let x_lo = b.ge(read_x, 0)?;
    let y_lo = b.ge(read_y, 0)?;
    let lo = b.bit_and(x_lo, y_lo)?;
    let w = b.prop_x(size)?;
    let wi = b.to_int(w)?;
    let x_hi = b.lt(read_x, wi)?;
    let lo_x = b.bit_and(lo, x_hi)?;
    let h = b.prop_y(size)?;
    let hi = b.to_int(h)?;
    let y_hi = b.lt(read_y, hi)?;
    let in_bounds = b.bit_and(lo_x, y_hi)?;

    let moved = b.index(state, read_x, read_y)?;
    MatchChain::if_then(in_bounds, moved).else_end(b, 0)
}

fn prepare_clean_state(b: &mut Builder) -> GenResult<NodeId> {
    let (x, y) = (b.x(), b.y());
    let x2 = b.mul(x, 2)?;
    let y4 = b.add(y, 4)?;
    b.eq(x2, y4)
}

fn bit_to_int(b: &mut Builder) -> GenResult<NodeId> {
    let state = b.buffer("state", ValueType::Bit)?;
    let bit = b.to_bool(state)?;
    b.to_int(bit)
}

/// Reset the measured qubit: xor its Z row into every row sharing its first
/// variable bit, and make its X row a unit vector at that column.
fn eliminate_col(b: &mut Builder) -> GenResult<NodeId> {
    let state = b.buffer("state", ValueType::Bit)?;
    let found = b.buffer("found_ones", ValueType::Int32)?;
    let measured = b.param("target", ValueType::Int32);
    let (x, y) = (b.x(), b.y());

    let m2 = b.mul(measured, 2)?;
    let unit_row = b.add(m2, 1)?;
    let first = b.index(found, 0, unit_row)?;
    let victim_col = b.add(first, 1)?;
    let non_trivial = b.ge(victim_col, 2)?;
    let row_bits = b.index(state, AxisIndex::all(), unit_row)?;
    let col_bits = b.index(state, victim_col, AxisIndex::all())?;
    let both = b.bit_and(row_bits, col_bits)?;
    let gated = b.bit_and(both, non_trivial)?;
    let data_col = b.gt(x, 0)?;
    let toggles = b.bit_and(gated, data_col)?;

    let m2_again = b.mul(measured, 2)?;
    let on_x_row = b.eq(y, m2_again)?;
    let reset = b.bit_and(on_x_row, non_trivial)?;
    let unit = b.eq(x, victim_col)?;
    let updated = b.bit_xor(toggles, state)?;
    MatchChain::if_then(reset, unit).else_end(b, updated)
}

/// xorshift32 over four byte columns, re-split into bytes.
fn random_advance(b: &mut Builder) -> GenResult<NodeId> {
    let state = b.buffer("state", ValueType::UInt32)?;
    let x = b.x();
    let mut u = b.index(state, 0, AxisIndex::all())?;
    for (col, shift) in [(1, 8), (2, 16), (3, 24)] {
        let byte = b.index(state, col, AxisIndex::all())?;
        let placed = b.shl(byte, shift)?;
        u = b.bit_or(u, placed)?;
    }

    let s = b.shl(u, 13)?;
    u = b.bit_xor(u, s)?;
    u = b.bit_and(u, 0xFFFF_FFFF_i64)?;
    let s = b.shr(u, 17)?;
    u = b.bit_xor(u, s)?;
    let s = b.shl(u, 5)?;
    u = b.bit_xor(u, s)?;

    let bits = b.mul(x, 8)?;
    let shifted = b.shr(u, bits)?;
    b.bit_and(shifted, 0xFF)
}

fn measure_set_result(b: &mut Builder) -> GenResult<NodeId> {
    let state = b.buffer("state", ValueType::Bit)?;
    let found = b.buffer("found_ones", ValueType::Int32)?;
    let rand = b.buffer("rand", ValueType::Int32)?;
    let target = b.param("target", ValueType::Int32);
    let (x, y) = (b.x(), b.y());

    let rand_col = b.index(rand, 0, AxisIndex::all())?;
    let rand_low = b.bit_and(rand_col, 1)?;
    let rand_bit = b.to_bool(rand_low)?;
    let const_bit = b.index(state, 1, AxisIndex::all())?;
    let first = b.index(found, 0, AxisIndex::all())?;
    let is_random = b.ne(first, 0)?;
    let outcome = MatchChain::if_then(is_random, rand_bit).else_end(b, const_bit)?;

    let t2 = b.mul(target, 2)?;
    let z_row = b.add(t2, 1)?;
    let other_row = b.ne(y, z_row)?;
    let data_col = b.ge(x, 2)?;
    let not_affected = b.bit_or(other_row, data_col)?;
    let result_col = b.eq(x, 1)?;
    let stored = b.bit_xor(state, outcome)?;
    MatchChain::if_then(not_affected, state)
        .else_if(result_col)
        .then(stored)
        .else_end(b, outcome)
}

// ── Surface code layers ─────────────────────────────────────────────────────

/// Lattice position of each row's qubit: `(qX, qY)` in a `surface_width` grid.
fn surface_position(b: &mut Builder, width: NodeId) -> GenResult<(NodeId, NodeId)> {
    let y = b.y();
    let q = b.shr(y, 1)?;
    let qx = b.rem(q, width)?;
    let qy = b.floor_div(q, width)?;
    Ok((qx, qy))
}

/// `(is_check, is_data)` from the lattice parity.
fn surface_roles(b: &mut Builder, qx: NodeId, qy: NodeId) -> GenResult<(NodeId, NodeId)> {
    let px = b.bit_and(qx, 1)?;
    let py = b.bit_and(qy, 1)?;
    let is_check = b.eq(px, py)?;
    let px = b.bit_and(qx, 1)?;
    let py = b.bit_and(qy, 1)?;
    let is_data = b.ne(px, py)?;
    Ok((is_check, is_data))
}

/// `None` affects every qubit; `Some(true)` data qubits stay put (checks
/// transformed); `Some(false)` the reverse.
fn surface_hadamards(b: &mut Builder, check_vs_data: Option<bool>) -> GenResult<NodeId> {
    let state = b.buffer("state", ValueType::Bit)?;
    let width = b.param("surface_width", ValueType::Int32);
    let (qx, qy) = surface_position(b, width)?;
    let (is_check, is_data) = surface_roles(b, qx, qy)?;
    let unaffected = match check_vs_data {
        None => Operand::from(false),
        Some(true) => Operand::from(is_data),
        Some(false) => Operand::from(is_check),
    };
    parallel_hadamards(b, state, unaffected)
}

fn hadamard_all(b: &mut Builder) -> GenResult<NodeId> {
    surface_hadamards(b, None)
}

fn hadamard_check(b: &mut Builder) -> GenResult<NodeId> {
    surface_hadamards(b, Some(true))
}

fn hadamard_data(b: &mut Builder) -> GenResult<NodeId> {
    surface_hadamards(b, Some(false))
}

/// One CZ layer between lattice neighbours along horizontal or vertical
/// lines, pairing from offset 0 or 1.
fn surface_czs(b: &mut Builder, evens: bool, verticals: bool, zs: bool) -> GenResult<NodeId> {
    let state = b.buffer("state", ValueType::Bit)?;
    let width = b.param("surface_width", ValueType::Int32);
    let height = b.param("surface_height", ValueType::Int32);
    let (qx, qy) = surface_position(b, width)?;

    let (i, j, limit) = if verticals { (qy, qx, height) } else { (qx, qy, width) };
    let offset: i64 = if evens { 0 } else { 1 };

    let j_parity = b.bit_and(j, 1)?;
    let on_line = b.eq(j_parity, if zs == verticals { 1 } else { 0 })?;
    let shifted = b.add(i, offset)?;
    let paired = b.bit_or(shifted, 1)?;
    let pair_end = b.sub(paired, offset)?;
    let in_range = b.lt(pair_end, limit)?;
    let shifted = b.add(i, offset)?;
    let flipped = b.bit_xor(shifted, 1)?;
    let partner_i = b.sub(flipped, offset)?;

    let (px, py) = if verticals { (j, partner_i) } else { (partner_i, j) };
    let affected = b.bit_and(in_range, on_line)?;
    let row_start = b.mul(py, width)?;
    let partner = b.add(row_start, px)?;
    parallel_czs(b, state, affected, partner)
}

fn surface_czs_ehx(b: &mut Builder) -> GenResult<NodeId> {
    surface_czs(b, false, false, false)
}

fn surface_czs_ohx(b: &mut Builder) -> GenResult<NodeId> {
    surface_czs(b, true, false, false)
}

fn surface_czs_evx(b: &mut Builder) -> GenResult<NodeId> {
    surface_czs(b, false, true, false)
}

fn surface_czs_ovx(b: &mut Builder) -> GenResult<NodeId> {
    surface_czs(b, true, true, false)
}

fn surface_czs_ehz(b: &mut Builder) -> GenResult<NodeId> {
    surface_czs(b, false, false, true)
}

fn surface_czs_ohz(b: &mut Builder) -> GenResult<NodeId> {
    surface_czs(b, true, false, true)
}

fn surface_czs_evz(b: &mut Builder) -> GenResult<NodeId> {
    surface_czs(b, false, true, true)
}

fn surface_czs_ovz(b: &mut Builder) -> GenResult<NodeId> {
    surface_czs(b, true, true, true)
}

// ── Multi-step pipelines ────────────────────────────────────────────────────

/// One syndrome-extraction cycle on a 16x16 lattice as seven in-place writes
/// to `state`, each an independent kernel.
pub fn surface_cycle(b: &mut Builder) -> GenResult<Pipeline> {
    let src = b.buffer("state", ValueType::Bit)?;
    let y = b.y();
    let q = b.shr(y, 1)?;
    let qx = b.bit_and(q, 15)?;
    let y5 = b.shr(y, 5)?;
    let qy = b.bit_and(y5, 15)?;
    let (is_check, is_data) = surface_roles(b, qx, qy)?;

    let qx_flip = b.bit_xor(qx, 1)?;
    let qy_shift = b.shl(qy, 4)?;
    let horizontal_partner = b.add(qx_flip, qy_shift)?;
    let qy_flip = b.bit_xor(qy, 1)?;
    let qy_flip_shift = b.shl(qy_flip, 4)?;
    let vertical_partner = b.add(qx, qy_flip_shift)?;

    let qx_pos = b.gt(qx, 0)?;
    let qy_pos = b.gt(qy, 0)?;
    let qx_in = b.lt(qx, 16)?;
    let qy_low = b.bit_and(qy, 1)?;
    let qy_odd = b.eq(qy_low, 1)?;
    let qy_even = b.eq(qy_low, 0)?;
    let qx_low = b.bit_and(qx, 1)?;
    let qx_odd = b.eq(qx_low, 1)?;

    let mut p = Pipeline::new("surfaceCycle");

    let step = parallel_hadamards(b, src, false)?;
    p.write(b, step, src, AxisIndex::all(), AxisIndex::all())?;

    let affected = b.bit_and(qx_pos, qy_odd)?;
    let step = parallel_czs(b, src, affected, horizontal_partner)?;
    p.write(b, step, src, AxisIndex::all(), AxisIndex::all())?;

    let affected = b.bit_and(qy_pos, qx_odd)?;
    let step = parallel_czs(b, src, affected, vertical_partner)?;
    p.write(b, step, src, AxisIndex::all(), AxisIndex::all())?;

    let step = parallel_hadamards(b, src, is_check)?;
    p.write(b, step, src, AxisIndex::all(), AxisIndex::all())?;

    let affected = b.bit_and(qx_in, qy_even)?;
    let step = parallel_czs(b, src, affected, horizontal_partner)?;
    p.write(b, step, src, AxisIndex::all(), AxisIndex::all())?;

    let affected = b.bit_and(qx_pos, qy_odd)?;
    let step = parallel_czs(b, src, affected, horizontal_partner)?;
    p.write(b, step, src, AxisIndex::all(), AxisIndex::all())?;

    let step = parallel_hadamards(b, src, is_data)?;
    p.write(b, step, src, AxisIndex::all(), AxisIndex::all())?;

    Ok(p)
}
