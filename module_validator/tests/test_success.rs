use tempfile::TempDir;


#[test]
fn test_inc() {
    let dir = TempDir::new().unwrap();
    let lib = setup::compile_fixture("inc_module", dir.path());
    let manifest = setup::write_manifest(dir.path(), &["inc"]);

    let (success, err_msg) = setup::validate(&lib, &manifest);

    assert!(success, "stderr: {err_msg}");
}

#[test]
fn test_every_manifest_function_resolves() {
    let dir = TempDir::new().unwrap();
    let lib = setup::compile_fixture("inc_module", dir.path());
    let manifest = setup::write_manifest(dir.path(), &["inc", "echo_twice"]);

    let (success, err_msg) = setup::validate(&lib, &manifest);

    assert!(success, "stderr: {err_msg}");
}
