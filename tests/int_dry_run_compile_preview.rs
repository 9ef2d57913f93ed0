mod common;

use common::{run_cli, stderr_of, touch};

#[test]
fn int_dry_run_compile_previews_one_container_per_source() {
    let dir = tempfile::tempdir().expect("tmpdir");
    touch(&dir.path().join("contracts/starknet/counter.cairo"));
    touch(&dir.path().join("contracts/starknet/balance.cairo"));
    touch(&dir.path().join("contracts/starknet/README.md"));

    let out = run_cli(dir.path(), &["--dry-run", "compile"]);
    let err = stderr_of(&out);
    assert!(out.status.success(), "dry-run must not need docker; stderr:\n{err}");

    let previews: Vec<&str> = err
        .lines()
        .filter(|l| l.starts_with("starknet-docker: docker: "))
        .collect();
    assert_eq!(previews.len(), 2, "stderr:\n{err}");
    assert!(previews[0].contains(
        "starknet-compile contracts/starknet/balance.cairo --output build/starknet-contracts/balance.json --abi build/starknet-contracts/abis/balance.json"
    ));
    assert!(previews[1].contains("contracts/starknet/counter.cairo"));
    for line in &previews {
        assert!(line.contains("docker run --rm"), "{line}");
        assert!(line.contains(":/app -w /app"), "{line}");
        assert!(line.contains("trufflesuite/cairo-starknet-cli:0.7.0"), "{line}");
    }
    assert!(err.contains("dry-run requested; not executing Docker."));
    assert!(
        !dir.path().join("build").exists(),
        "dry-run leaves the build directory untouched"
    );
}

#[test]
fn int_dry_run_single_contract_accepts_disable_hints() {
    let dir = tempfile::tempdir().expect("tmpdir");
    let out = run_cli(
        dir.path(),
        &["--dry-run", "compile", "--contract", "counter.cairo", "--disable-hints"],
    );
    let err = stderr_of(&out);
    assert!(out.status.success(), "stderr:\n{err}");
    assert!(err.contains("--disable_hint_validation"), "stderr:\n{err}");
}
