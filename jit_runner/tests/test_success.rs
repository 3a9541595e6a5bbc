use std::{fs::write, process::Command};

use jit_runner::{ValueData, deserialize_outputs, serialize_manifest, serialize_parameters};

mod setup;

#[test]
fn test_inc() {
    let setup = setup::setup();
    let lib = setup::compile_fixture("inc_module", setup.test_dir.path());
    let result_path = setup.test_dir.path().join("result.bin");

    let output = Command::new(env!("CARGO_BIN_EXE_jit_runner"))
        .arg("--lib")
        .arg(&lib)
        .arg("--manifest")
        .arg(&setup.manifest_path)
        .arg("--func")
        .arg("inc")
        .arg("--params")
        .arg(&setup.params_path)
        .arg("--output")
        .arg(&result_path)
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let result_bytes = std::fs::read(&result_path).unwrap();
    let outputs = deserialize_outputs(&result_bytes).unwrap();

    assert_eq!(
        outputs,
        vec![ValueData::Scalar {
            value: setup.value + 1
        }]
    );
}

#[test]
fn test_inc_stdout() {
    let setup = setup::setup();
    let lib = setup::compile_fixture("inc_module", setup.test_dir.path());

    let output = Command::new(env!("CARGO_BIN_EXE_jit_runner"))
        .arg("--lib")
        .arg(&lib)
        .arg("--manifest")
        .arg(&setup.manifest_path)
        .arg("--func")
        .arg("inc")
        .arg("--params")
        .arg(&setup.params_path)
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    // Output should be written to stdout
    let outputs = deserialize_outputs(&output.stdout).unwrap();

    assert_eq!(
        outputs,
        vec![ValueData::Scalar {
            value: setup.value + 1
        }]
    );
}

#[test]
fn test_aliased_tensor_outputs() {
    let setup = setup::setup();
    let lib = setup::compile_fixture("inc_module", setup.test_dir.path());
    let params_path = setup.test_dir.path().join("tensor_params");
    write(
        &params_path,
        serialize_parameters(&[ValueData::Tensor {
            sizes: vec![2],
            values: vec![setup.value, 7],
        }])
        .unwrap(),
    )
    .unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_jit_runner"))
        .arg("--lib")
        .arg(&lib)
        .arg("--manifest")
        .arg(&setup.manifest_path)
        .arg("--func")
        .arg("echo_twice")
        .arg("--params")
        .arg(&params_path)
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let expected = ValueData::Tensor {
        sizes: vec![2],
        values: vec![setup.value + 1, 8],
    };
    let outputs = deserialize_outputs(&output.stdout).unwrap();
    assert_eq!(outputs, vec![expected.clone(), expected]);
}

#[test]
fn test_runtime_library_symbols() {
    let setup = setup::setup();
    let runtime = setup::compile_fixture("runtime", setup.test_dir.path());
    let lib = setup::compile_fixture("runtime_module", setup.test_dir.path());
    let manifest_path = setup.test_dir.path().join("runtime_module.manifest");
    write(
        &manifest_path,
        serialize_manifest(&setup::runtime_manifest()).unwrap(),
    )
    .unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_jit_runner"))
        .arg("--lib")
        .arg(&lib)
        .arg("--manifest")
        .arg(&manifest_path)
        .arg("--func")
        .arg("add_offset")
        .arg("--runtime-lib")
        .arg(&runtime)
        .arg("--params")
        .arg(&setup.params_path)
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let outputs = deserialize_outputs(&output.stdout).unwrap();
    assert_eq!(
        outputs,
        vec![ValueData::Scalar {
            value: setup.value + setup::RUNTIME_OFFSET
        }]
    );
}

#[test]
fn test_module_needs_its_runtime_library() {
    let setup = setup::setup();
    let lib = setup::compile_fixture("runtime_module", setup.test_dir.path());
    let manifest_path = setup.test_dir.path().join("runtime_module.manifest");
    write(
        &manifest_path,
        serialize_manifest(&setup::runtime_manifest()).unwrap(),
    )
    .unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_jit_runner"))
        .arg("--lib")
        .arg(&lib)
        .arg("--manifest")
        .arg(&manifest_path)
        .arg("--func")
        .arg("add_offset")
        .arg("--params")
        .arg(&setup.params_path)
        .output()
        .unwrap();

    assert!(!output.status.success());

    let err_msg = String::from_utf8_lossy(&output.stderr);
    assert!(
        err_msg.contains("failed to load shared library")
            && err_msg.contains(lib.to_str().unwrap())
    );
}
