//! Black-box tests of the `ipn-relay` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

fn ipn_relay() -> Command {
    let mut command = Command::cargo_bin("ipn-relay").unwrap();
    command.env_remove("IPN_SIGNING_SECRET");
    command.env_remove("IPN_RELAY_CONFIG_FILE");
    command
}

fn signature_of(args: &[&str]) -> String {
    let output = ipn_relay().arg("sign").args(args).output().unwrap();
    assert!(output.status.success());
    String::from_utf8(output.stdout).unwrap().trim_end().to_string()
}

#[test]
fn test_sign_prints_upper_hex_digest() {
    ipn_relay()
        .args(["sign", "--secret", "S", "event=on_payment", "order_id=A1"])
        .assert()
        .success()
        .stdout(predicate::str::is_match("^[0-9A-F]{128}\n$").unwrap());
}

#[test]
fn test_sign_reads_secret_from_environment() {
    let from_flag = signature_of(&["--secret", "S", "a=1"]);

    ipn_relay()
        .env("IPN_SIGNING_SECRET", "S")
        .args(["sign", "a=1"])
        .assert()
        .success()
        .stdout(format!("{}\n", from_flag));
}

#[test]
fn test_sign_ignores_field_order_and_empty_values() {
    let a = signature_of(&["--secret", "S", "b=2", "a=1"]);
    let b = signature_of(&["--secret", "S", "a=1", "c=", "b=2"]);

    assert_eq!(a, b);
}

#[test]
fn test_sign_then_verify() {
    let signature = signature_of(&["--secret", "S", "event=on_payment", "order_id=A1"]);

    ipn_relay()
        .args(["verify", "--secret", "S", "event=on_payment", "order_id=A1"])
        .arg(format!("sha_sign={}", signature))
        .assert()
        .success()
        .stdout("valid\n");
}

#[test]
fn test_verify_tampered_message_fails() {
    let signature = signature_of(&["--secret", "S", "event=on_payment", "order_id=A1"]);

    ipn_relay()
        .args(["verify", "--secret", "S", "event=on_payment", "order_id=A2"])
        .arg(format!("sha_sign={}", signature))
        .assert()
        .code(2)
        .stdout("invalid\n");
}

#[test]
fn test_config_validation_failure_exit_code() {
    let mut file = tempfile::Builder::new()
        .suffix(".yaml")
        .tempfile()
        .unwrap();
    file.write_all(b"server:\n  port: 0\n").unwrap();

    ipn_relay()
        .args(["config", "--file"])
        .arg(file.path())
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_unknown_command_is_rejected() {
    ipn_relay().arg("frobnicate").assert().failure();
}
