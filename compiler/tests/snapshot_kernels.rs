// Snapshot tests: lock emitted kernel documents to detect unintended changes.
//
// Kernels are built from the catalog through the library API. Snapshots are
// managed by `insta` and stored under `compiler/tests/snapshots/`.
//
// Run `cargo insta review` after intentional output changes to update baselines.

use sgc::catalog;
use sgc::codegen::{emit_kernel, EmitOptions, KernelDocument};
use sgc::ir::Builder;

fn emit_catalog(name: &str) -> KernelDocument {
    let entry = catalog::find(name).unwrap_or_else(|| panic!("no catalog kernel '{}'", name));
    let mut b = Builder::new();
    let root = (entry.build)(&mut b).unwrap();
    emit_kernel(&b, root, &EmitOptions::default()).unwrap()
}

#[test]
fn single_x_glsl() {
    let doc = emit_catalog("singleX");
    insta::assert_snapshot!("single_x_glsl", doc.source);
}

#[test]
fn single_x_wrapper() {
    let doc = emit_catalog("singleX");
    insta::assert_snapshot!("single_x_wrapper", doc.wrapper("singleX", &EmitOptions::default()));
}

#[test]
fn or_fold_glsl() {
    let doc = emit_catalog("orFold");
    insta::assert_snapshot!("or_fold_glsl", doc.source);
}

#[test]
fn find_one_fold_glsl() {
    let doc = emit_catalog("findOneFold");
    insta::assert_snapshot!("find_one_fold_glsl", doc.source);
}
