// codegen.rs — Fragment-kernel emission
//
// Lowers the DAG under a root node into GLSL fragment-kernel source plus the
// binding descriptors the runtime needs to wire uniforms and samplers. Also
// renders the wrapper unit the runtime loads directly.
//
// Preconditions: `root` comes from `builder`.
// Postconditions: `KernelDocument::source` declares every external binding
//   reachable from the root exactly once, initializes every formula-bearing
//   node after its dependencies, and assigns the encoded root to the output.
// Failure modes: non-Bit branch condition → TypeMismatch; root kind without
//   an output encoding → UnsupportedConversion.
// Side effects: `debug!` summary per emitted kernel.

use std::collections::HashSet;
use std::fmt::Write as _;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::collect::{collect, Collection};
use crate::diag::GenResult;
use crate::id::NodeId;
use crate::ir::{Builder, NodeKind, ParamRole};

// ── Public types ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    Low,
    Medium,
    #[default]
    High,
}

impl Precision {
    pub fn qualifier(self) -> &'static str {
        match self {
            Precision::Low => "lowp",
            Precision::Medium => "mediump",
            Precision::High => "highp",
        }
    }
}

/// Emission settings. Every field is optional when loaded from JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitOptions {
    pub glsl_version: String,
    pub float_precision: Precision,
    pub int_precision: Precision,
    pub output_var: String,
    /// Spaces per indentation level.
    pub indent: usize,
    /// Module the wrapper unit imports the runtime class from.
    pub runtime_module: String,
    pub runtime_class: String,
}

impl Default for EmitOptions {
    fn default() -> Self {
        EmitOptions {
            glsl_version: "300 es".to_string(),
            float_precision: Precision::High,
            int_precision: Precision::High,
            output_var: "outColor".to_string(),
            indent: 4,
            runtime_module: "src/sim/Gpu.js".to_string(),
            runtime_class: "ParametrizedShader".to_string(),
        }
    }
}

/// One argument the runtime passes when dispatching the kernel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Binding {
    Uniform {
        key: String,
        name: String,
        spreads: bool,
    },
    Texture {
        name: String,
        size: String,
    },
}

impl Binding {
    /// Wrapper-unit spelling, also the canonical sort key.
    pub fn render(&self) -> String {
        match self {
            Binding::Uniform { key, name, spreads } => format!("['{}', '{}', {}]", key, name, spreads),
            Binding::Texture { name, size } => format!("['tex', '{}', '{}']", name, size),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelDocument {
    pub source: String,
    /// Sorted by `Binding::render`, no duplicates.
    pub bindings: Vec<Binding>,
    pub initializer_count: usize,
}

impl KernelDocument {
    /// The loadable unit: the source embedded in a runtime constructor call.
    pub fn wrapper(&self, name: &str, options: &EmitOptions) -> String {
        let pad = " ".repeat(options.indent);
        let mut out = String::with_capacity(self.source.len() + 256);
        out.push_str("////// AUTO-GENERATED CODE //////\n\n");
        let _ = writeln!(
            out,
            "import {{{}}} from '{}'\n",
            options.runtime_class, options.runtime_module
        );
        let _ = write!(
            out,
            "let {} = new {}(`{}`",
            name,
            options.runtime_class,
            self.source.replace('\n', &format!("\n{}", pad))
        );
        for binding in &self.bindings {
            let _ = write!(out, ",\n{}{}", pad, binding.render());
        }
        out.push_str(");\n\n");
        let _ = write!(out, "export {{{}}}", name);
        out
    }

    /// SHA-256 of the kernel source, lowercase hex.
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        hasher.update(self.source.as_bytes());
        hasher.finalize().iter().map(|b| format!("{:02x}", b)).collect()
    }

    pub fn bindings_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.bindings)
    }
}

// ── Public entry point ──────────────────────────────────────────────────────

pub fn emit_kernel(builder: &Builder, root: NodeId, options: &EmitOptions) -> GenResult<KernelDocument> {
    let mut ctx = KernelCtx::new(builder, root, options);
    ctx.emit_all()?;
    Ok(ctx.build_result())
}

// ── Internal context ────────────────────────────────────────────────────────

struct KernelCtx<'a> {
    builder: &'a Builder,
    root: NodeId,
    options: &'a EmitOptions,
    values: Collection,
    with_bindings: Collection,
    out: String,
    initializer_count: usize,
}

impl<'a> KernelCtx<'a> {
    fn new(builder: &'a Builder, root: NodeId, options: &'a EmitOptions) -> Self {
        KernelCtx {
            builder,
            root,
            options,
            values: collect(builder, root, false),
            with_bindings: collect(builder, root, true),
            out: String::with_capacity(4096),
            initializer_count: 0,
        }
    }

    fn pad(&self, level: usize) -> String {
        " ".repeat(self.options.indent * level)
    }

    fn build_result(self) -> KernelDocument {
        debug!(
            "kernel '{}': {} nodes, {} shared, {} initializers",
            self.builder.name(self.root),
            self.with_bindings.order.len(),
            self.with_bindings.shared(),
            self.initializer_count
        );
        KernelDocument {
            bindings: self.bindings(),
            source: self.out,
            initializer_count: self.initializer_count,
        }
    }

    fn emit_all(&mut self) -> GenResult<()> {
        // Encoding is checked first so an unencodable root emits nothing.
        let root_ty = self.builder.ty(self.root);
        let output = root_ty.encode(self.builder.name(self.root))?;
        self.emit_header();
        self.emit_declarations();
        let _ = writeln!(self.out, "out float {};", self.options.output_var);
        self.out.push_str("void main() {\n");
        let pad = self.pad(1);
        let _ = writeln!(self.out, "{}int x = int(gl_FragCoord.x);", pad);
        let _ = writeln!(self.out, "{}int y = int(gl_FragCoord.y);", pad);
        self.emit_initializers()?;
        let _ = writeln!(self.out, "{}{} = {};", pad, self.options.output_var, output);
        self.out.push('}');
        Ok(())
    }

    // ── Phase 1: Header ─────────────────────────────────────────────────

    fn emit_header(&mut self) {
        let _ = writeln!(self.out, "#version {}", self.options.glsl_version);
        let _ = writeln!(self.out, "precision {} float;", self.options.float_precision.qualifier());
        let _ = writeln!(self.out, "precision {} int;", self.options.int_precision.qualifier());
    }

    // ── Phase 2: Uniform and sampler declarations ───────────────────────

    fn emit_declarations(&mut self) {
        let b = self.builder;
        let mut seen: HashSet<String> = HashSet::new();
        for &id in &self.with_bindings.order {
            let node = b.node(id);
            let line = match &node.kind {
                NodeKind::Param { .. } => format!("uniform {} {};", node.ty.gl_name(), node.name),
                NodeKind::Buffer { sampler, .. } => format!("uniform sampler2D {};", sampler),
                _ => continue,
            };
            if seen.insert(line.clone()) {
                let _ = writeln!(self.out, "{}", line);
            }
        }
    }

    // ── Phase 3: Ordered initializers ───────────────────────────────────

    fn emit_initializers(&mut self) -> GenResult<()> {
        let b = self.builder;
        let pad = self.pad(1);
        let inner = self.pad(2);
        for &id in &self.values.order {
            let Some(formula) = b.formula(id)? else {
                continue;
            };
            let node = b.node(id);
            if formula.contains('\n') {
                let _ = writeln!(self.out, "{}{} {} =", pad, node.ty.gl_name(), node.name);
                let mut lines = formula.lines().peekable();
                while let Some(line) = lines.next() {
                    let end = if lines.peek().is_none() { ";" } else { "" };
                    let _ = writeln!(self.out, "{}{}{}", inner, line, end);
                }
            } else {
                let _ = writeln!(self.out, "{}{} {} = {};", pad, node.ty.gl_name(), node.name, formula);
            }
            self.initializer_count += 1;
        }
        Ok(())
    }

    // ── Phase 4: Binding descriptors ────────────────────────────────────

    fn bindings(&self) -> Vec<Binding> {
        let b = self.builder;
        let mut out: Vec<Binding> = Vec::new();
        for &id in &self.with_bindings.order {
            let node = b.node(id);
            match &node.kind {
                NodeKind::Param {
                    role: ParamRole::Uniform,
                } => out.push(Binding::Uniform {
                    key: node.ty.binding_key().to_string(),
                    name: node.name.clone(),
                    spreads: node.ty.spreads_args(),
                }),
                NodeKind::Buffer { sampler, size } => out.push(Binding::Texture {
                    name: sampler.clone(),
                    size: b.name(*size).to_string(),
                }),
                _ => {}
            }
        }
        out.sort_by_cached_key(Binding::render);
        out.dedup();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::branch::MatchChain;
    use crate::diag::GenError;
    use crate::slice::AxisIndex;
    use crate::types::ValueType;

    fn single_x(b: &mut Builder) -> NodeId {
        let state = b.buffer("state", ValueType::Bit).unwrap();
        let target = b.param("target", ValueType::Int32);
        let (x, y) = (b.x(), b.y());
        let near = b.lt(x, 2).unwrap();
        let t2 = b.mul(target, 2).unwrap();
        let row = b.add(t2, x).unwrap();
        let on_row = b.eq(y, row).unwrap();
        let flip = b.bit_and(near, on_row).unwrap();
        b.ne(state, flip).unwrap()
    }

    #[test]
    fn declarations_and_bindings() {
        let mut b = Builder::new();
        let root = single_x(&mut b);
        let doc = emit_kernel(&b, root, &EmitOptions::default()).unwrap();
        assert!(doc.source.contains("uniform vec2 state_size;\nuniform sampler2D state;\nuniform int target;\n"));
        assert_eq!(
            doc.bindings,
            vec![
                Binding::Uniform {
                    key: "1i".into(),
                    name: "target".into(),
                    spreads: false
                },
                Binding::Texture {
                    name: "state".into(),
                    size: "state_size".into()
                },
            ]
        );
        assert_eq!(doc.initializer_count, 7);
        assert!(doc.source.ends_with("    outColor = float(ne_5);\n}"));
    }

    #[test]
    fn shared_view_declared_once() {
        let mut b = Builder::new();
        let state = b.buffer("state", ValueType::Bit).unwrap();
        let a = b.index(state, AxisIndex::every(2), AxisIndex::all()).unwrap();
        let c = b.index(state, AxisIndex::stepped(1, 2), AxisIndex::all()).unwrap();
        let root = b.bit_or(a, c).unwrap();
        let doc = emit_kernel(&b, root, &EmitOptions::default()).unwrap();
        assert_eq!(doc.source.matches("uniform sampler2D state;").count(), 1);
        assert_eq!(doc.bindings.len(), 1);
        assert_eq!(doc.bindings[0].render(), "['tex', 'state', 'state_size']");
    }

    #[test]
    fn branch_renders_one_clause_per_line() {
        let mut b = Builder::new();
        let x = b.x();
        let c = b.lt(x, 2).unwrap();
        let root = MatchChain::if_then(c, 1).else_end(&mut b, 0).unwrap();
        let doc = emit_kernel(&b, root, &EmitOptions::default()).unwrap();
        assert!(doc.source.contains("    int match_1 =\n        lt_0 ? 1 :\n        0;\n"));
        assert!(doc.source.contains("outColor = float(match_1) / 255.0;"));
    }

    #[test]
    fn vec2_root_is_unencodable() {
        let mut b = Builder::new();
        let off = b.param("offset", ValueType::Vec2);
        assert!(matches!(
            emit_kernel(&b, off, &EmitOptions::default()),
            Err(GenError::UnsupportedConversion { .. })
        ));
    }

    #[test]
    fn vec2_uniform_spreads() {
        let mut b = Builder::new();
        let off = b.param("offset", ValueType::Vec2);
        let px = b.prop_x(off).unwrap();
        let doc = emit_kernel(&b, px, &EmitOptions::default()).unwrap();
        assert_eq!(doc.bindings[0].render(), "['2f', 'offset', true]");
        assert!(doc.source.contains("outColor = prop_x_0;"));
    }

    #[test]
    fn options_change_header_and_output() {
        let mut b = Builder::new();
        let root = single_x(&mut b);
        let opts = EmitOptions {
            float_precision: Precision::Medium,
            output_var: "result".into(),
            indent: 2,
            ..EmitOptions::default()
        };
        let doc = emit_kernel(&b, root, &opts).unwrap();
        assert!(doc.source.contains("precision mediump float;\nprecision highp int;"));
        assert!(doc.source.contains("\n  result = float(ne_5);\n"));
    }

    #[test]
    fn options_from_partial_json() {
        let opts: EmitOptions = serde_json::from_str(r#"{"int_precision": "low"}"#).unwrap();
        assert_eq!(opts.int_precision, Precision::Low);
        assert_eq!(opts.output_var, "outColor");
    }

    #[test]
    fn wrapper_without_bindings() {
        let mut b = Builder::new();
        let (x, y) = (b.x(), b.y());
        let x2 = b.mul(x, 2).unwrap();
        let y4 = b.add(y, 4).unwrap();
        let root = b.eq(x2, y4).unwrap();
        let doc = emit_kernel(&b, root, &EmitOptions::default()).unwrap();
        assert!(doc.bindings.is_empty());
        let w = doc.wrapper("prepareCleanState", &EmitOptions::default());
        assert!(w.starts_with("////// AUTO-GENERATED CODE //////\n\nimport {ParametrizedShader} from 'src/sim/Gpu.js'\n\n"));
        assert!(w.contains("let prepareCleanState = new ParametrizedShader(`#version 300 es\n    precision highp float;"));
        assert!(w.contains("\n    }`);\n\nexport {prepareCleanState}"));
    }

    #[test]
    fn fingerprint_is_stable_hex() {
        let mut b = Builder::new();
        let root = single_x(&mut b);
        let doc = emit_kernel(&b, root, &EmitOptions::default()).unwrap();
        let f = doc.fingerprint();
        assert_eq!(f.len(), 64);
        assert!(f.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(f, doc.fingerprint());
    }

    #[test]
    fn bindings_serialize_with_kind_tag() {
        let b = Binding::Texture {
            name: "state".into(),
            size: "state_size".into(),
        };
        let json = serde_json::to_string(&b).unwrap();
        assert_eq!(json, r#"{"kind":"texture","name":"state","size":"state_size"}"#);
    }
}
