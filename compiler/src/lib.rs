// sgc — Shader Generator Compiler
//
// Library root. Host code builds a per-pixel expression DAG through
// `ir::Builder`, then lowers one root to a fragment kernel with
// `codegen::emit_kernel`. Modules are listed leaves first.

pub mod diag;
pub mod id;
pub mod types;

pub mod ir;
pub mod ops;
pub mod slice;

pub mod branch;
pub mod index;

pub mod codegen;
pub mod collect;
pub mod dot;
pub mod pipeline;

pub mod catalog;

pub use branch::MatchChain;
pub use codegen::{emit_kernel, Binding, EmitOptions, KernelDocument, Precision};
pub use diag::{GenError, GenResult};
pub use id::NodeId;
pub use ir::{Builder, Operand};
pub use pipeline::Pipeline;
pub use slice::AxisIndex;
pub use types::ValueType;
