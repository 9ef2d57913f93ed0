mod common;

use common::{run_cli, stderr_of, touch};
use starknet_docker::ErrorKind;

#[test]
fn int_compile_without_docker_exits_with_runtime_unavailable() {
    let dir = tempfile::tempdir().expect("tmpdir");
    touch(&dir.path().join("contracts/starknet/counter.cairo"));

    let out = run_cli(dir.path(), &["compile"]);
    assert_eq!(
        out.status.code(),
        Some(i32::from(ErrorKind::RuntimeUnavailable.exit_code())),
        "stderr:\n{}",
        stderr_of(&out)
    );
    assert!(
        stderr_of(&out).contains("check that docker is running"),
        "stderr:\n{}",
        stderr_of(&out)
    );
}

#[test]
fn int_doctor_succeeds_without_docker() {
    let dir = tempfile::tempdir().expect("tmpdir");
    let out = run_cli(dir.path(), &["doctor"]);
    let err = stderr_of(&out);
    assert!(out.status.success(), "doctor should succeed without docker");
    assert!(err.contains("docker: not found"), "stderr:\n{err}");
    assert!(err.contains("(built-in defaults)"), "stderr:\n{err}");
    assert!(err.contains("cairo: trufflesuite/cairo-starknet-cli:0.7.0"), "stderr:\n{err}");
}
