use std::process::Command;

fn run(fixture: &str, env: &[(&str, &str)]) -> (String, String, bool) {
    let path = format!("tests/fixtures/{fixture}");
    let mut command = Command::new(env!("CARGO_BIN_EXE_market-ledger"));
    command
        .arg(&path)
        .env("RUST_LOG", "warn")
        .env("MARKET_CURRENCY", "NGN")
        .env_remove("MARKET_WITHDRAWAL_FEE_BPS");
    for (key, value) in env {
        command.env(key, value);
    }
    let output = command.output().expect("failed to run binary");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn valid_commands() {
    let (stdout, stderr, success) = run("valid.csv", &[]);

    assert!(success);
    assert!(stderr.is_empty());

    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        lines,
        ["user,balance,currency", "alice,60.00,NGN", "bob,40.50,NGN"]
    );
}

#[test]
fn errors_warn_but_do_not_block() {
    let (stdout, stderr, success) = run("with_errors.csv", &[]);

    assert!(success);
    assert!(stderr.contains("unrecognized command type"));
    assert!(stderr.contains("missing amount"));
    assert!(stderr.contains("missing recipient"));
    assert!(stderr.contains("insufficient balance"));

    // the rejected transfer leaves no trace of bob
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines, ["user,balance,currency", "alice,30.00,NGN"]);
}

#[test]
fn withdrawal_fee_from_env() {
    let (stdout, _, success) = run(
        "valid.csv",
        &[("MARKET_WITHDRAWAL_FEE_BPS", "100"), ("MARKET_CURRENCY", "usd")],
    );

    assert!(success);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines[2], "bob,40.40,USD");
}

#[test]
fn invalid_config_fails() {
    let (stdout, stderr, success) = run("valid.csv", &[("MARKET_CURRENCY", "doubloons")]);

    assert!(!success);
    assert!(stdout.is_empty());
    assert!(stderr.contains("MARKET_CURRENCY"));
}

#[test]
fn missing_argument_prints_usage() {
    let output = Command::new(env!("CARGO_BIN_EXE_market-ledger"))
        .output()
        .expect("failed to run binary");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("usage: market-ledger"));
}
