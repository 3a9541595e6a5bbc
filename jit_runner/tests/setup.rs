// each test binary uses a different subset of these helpers
#![allow(dead_code)]

use std::{
    env,
    fs::write,
    path::{Path, PathBuf},
    process::Command,
};

use jit_runner::{
    ClientParameters, FunctionManifest, GateDescriptor, ModuleManifest, ValueData,
    serialize_manifest, serialize_parameters,
};
use rand::{RngCore, rng};
use tempfile::TempDir;

pub struct TestSetup {
    pub value: u64,
    pub manifest_path: PathBuf,
    pub params_path: PathBuf,
    pub lib_path: PathBuf,
    pub test_dir: TempDir,
}

fn scalar_function(name: &str) -> FunctionManifest {
    FunctionManifest {
        name: name.to_string(),
        parameters: ClientParameters::new(
            vec![GateDescriptor::clear_scalar()],
            vec![GateDescriptor::clear_scalar()],
        ),
    }
}

/// Manifest for `fixtures/inc_module.c`.
pub fn manifest() -> ModuleManifest {
    ModuleManifest {
        functions: vec![
            scalar_function("inc"),
            FunctionManifest {
                name: "echo_twice".to_string(),
                parameters: ClientParameters::new(
                    vec![GateDescriptor::clear_tensor([2])],
                    vec![
                        GateDescriptor::clear_tensor([2]),
                        GateDescriptor::clear_tensor([2]),
                    ],
                ),
            },
        ],
    }
}

/// Manifest for `fixtures/runtime_module.c`.
pub fn runtime_manifest() -> ModuleManifest {
    ModuleManifest {
        functions: vec![scalar_function("add_offset")],
    }
}

/// Offset returned by `fixtures/runtime.c`.
pub const RUNTIME_OFFSET: u64 = 100;

/// Compile `fixtures/<name>.c` into `lib<name>.so` under `out_dir` with the
/// system C compiler (`$CC`, defaulting to `cc`).
pub fn compile_fixture(name: &str, out_dir: &Path) -> PathBuf {
    let source = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(format!("{name}.c"));
    let library = out_dir.join(format!("lib{name}.so"));
    let compiler = env::var("CC").unwrap_or_else(|_| "cc".to_string());

    let mut command = Command::new(&compiler);
    command
        .arg("-shared")
        .arg("-fPIC")
        .arg("-o")
        .arg(&library)
        .arg(&source);
    if cfg!(target_os = "macos") {
        // runtime symbols are bound when the module is opened
        command.args(["-undefined", "dynamic_lookup"]);
    }
    let output = command
        .output()
        .unwrap_or_else(|err| panic!("failed to run C compiler '{compiler}': {err}"));
    assert!(
        output.status.success(),
        "compiling {} failed: {}",
        source.display(),
        String::from_utf8_lossy(&output.stderr)
    );
    library
}

pub fn setup() -> TestSetup {
    let test_dir = TempDir::new().unwrap();
    let value = rng().next_u32() as u64;

    let manifest_path = test_dir.path().join("module.manifest");
    write(&manifest_path, serialize_manifest(&manifest()).unwrap()).unwrap();

    let params_path = test_dir.path().join("params");
    write(
        &params_path,
        serialize_parameters(&[ValueData::Scalar { value }]).unwrap(),
    )
    .unwrap();

    // built on demand by `compile_fixture`
    let lib_path = test_dir.path().join("libmodule.so");

    TestSetup {
        value,
        manifest_path,
        params_path,
        lib_path,
        test_dir,
    }
}
