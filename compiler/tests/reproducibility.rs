// Reproducibility tests for deterministic emission.
//
// These tests verify that independent builds of the same kernel produce
// byte-identical documents, through the library and through the binary.

use std::path::PathBuf;
use std::process::{Command, Output};

use sgc::catalog::{self, CATALOG};
use sgc::codegen::{emit_kernel, EmitOptions, KernelDocument};
use sgc::ir::Builder;

fn sgc_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_sgc"))
}

fn run_sgc_raw(args: &[&str]) -> Output {
    Command::new(sgc_binary())
        .args(args)
        .output()
        .expect("failed to run sgc")
}

fn run_sgc(args: &[&str]) -> String {
    let output = run_sgc_raw(args);
    assert!(
        output.status.success(),
        "sgc failed with args {:?}\nstderr: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).expect("non-UTF8 output")
}

fn emit(name: &str) -> KernelDocument {
    let entry = catalog::find(name).unwrap();
    let mut b = Builder::new();
    let root = (entry.build)(&mut b).unwrap();
    emit_kernel(&b, root, &EmitOptions::default()).unwrap()
}

/// Fresh builds of every catalog kernel are byte-identical.
#[test]
fn library_builds_are_identical() {
    for entry in CATALOG {
        let first = emit(entry.name);
        let second = emit(entry.name);
        assert_eq!(first, second, "kernel '{}' differs between builds", entry.name);
        assert_eq!(first.fingerprint(), second.fingerprint());
    }
}

/// A build does not depend on what an earlier build on another builder did.
#[test]
fn builds_are_independent() {
    let alone = emit("singleCZ");
    let _ = emit("surfaceCzsOVZ");
    let _ = emit("randomAdvance");
    assert_eq!(emit("singleCZ"), alone);
}

#[test]
fn binary_output_is_stable() {
    let first = run_sgc(&["singleHadamard"]);
    let second = run_sgc(&["singleHadamard"]);
    assert_eq!(first, second, "GLSL output should be byte-identical across runs");
    assert_eq!(first, format!("{}\n", emit("singleHadamard").source));
}

#[test]
fn binary_wrapper_matches_library() {
    let out = run_sgc(&["measureSetResult", "--emit", "wrapper"]);
    let expected = emit("measureSetResult").wrapper("measureSetResult", &EmitOptions::default());
    assert_eq!(out.trim_end(), expected);
}

#[test]
fn build_info_fingerprint_matches_source() {
    let info = run_sgc(&["eliminateCol", "--emit", "build-info"]);
    let json: serde_json::Value = serde_json::from_str(&info).unwrap();
    assert_eq!(json["kernel"], "eliminateCol");
    assert_eq!(json["fingerprint"], emit("eliminateCol").fingerprint());
    assert_eq!(json["compiler_version"], env!("CARGO_PKG_VERSION"));
}

#[test]
fn bindings_json_lists_descriptors() {
    let out = run_sgc(&["shifter", "--emit", "bindings"]);
    let json: serde_json::Value = serde_json::from_str(&out).unwrap();
    let kinds: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["kind"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, vec!["uniform", "texture"]);
    assert_eq!(json[0]["spreads"], true);
}

#[test]
fn config_file_changes_output() {
    let path = std::env::temp_dir().join("sgc_repro_test_config.json");
    std::fs::write(&path, r#"{"output_var": "fragOut", "indent": 2}"#).unwrap();
    let out = run_sgc(&["bitToInt", "--config", path.to_str().unwrap()]);
    let _ = std::fs::remove_file(&path);
    assert!(out.contains("out float fragOut;"));
    assert!(out.contains("\n  fragOut = float("));
}

#[test]
fn output_file_written() {
    let path = std::env::temp_dir().join("sgc_repro_test_dot.dot");
    run_sgc(&["orFold", "--emit", "dot", "-o", path.to_str().unwrap()]);
    let dot = std::fs::read_to_string(&path).unwrap();
    let _ = std::fs::remove_file(&path);
    assert!(dot.starts_with("digraph kernel {"));
}

#[test]
fn list_names_every_kernel() {
    let out = run_sgc(&["--list"]);
    for entry in CATALOG {
        assert!(out.contains(entry.name), "missing '{}' in --list", entry.name);
    }
}

#[test]
fn unknown_kernel_is_usage_error() {
    let output = run_sgc_raw(&["noSuchKernel"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown kernel 'noSuchKernel'"));
}
