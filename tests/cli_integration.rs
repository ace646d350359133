use std::io::Write;
use std::process::{Command, Stdio};
use tempfile::tempdir;

fn bin() -> String {
    env!("CARGO_BIN_EXE_scsu").to_string()
}

const SAMPLE: &str = "Grüße aus Köln. Привет из Москвы! 東京から 𝄞\n";

#[test]
fn cli_encode_decode_roundtrip() {
    let dir = tempdir().unwrap();
    let text = dir.path().join("text.txt");
    let encoded = dir.path().join("text.scsu");
    let output = dir.path().join("output.txt");

    std::fs::write(&text, SAMPLE.repeat(20)).unwrap();

    let st = Command::new(bin())
        .arg("--force")
        .arg("encode")
        .arg(&text)
        .arg(&encoded)
        .status()
        .unwrap();
    assert!(st.success());
    assert!(std::fs::metadata(&encoded).unwrap().len() < std::fs::metadata(&text).unwrap().len());

    let st = Command::new(bin())
        .arg("--force")
        .arg("decode")
        .arg(&encoded)
        .arg(&output)
        .status()
        .unwrap();
    assert!(st.success());
    assert_eq!(
        std::fs::read(&output).unwrap(),
        std::fs::read(&text).unwrap()
    );
}

#[test]
fn cli_stdin_stdout_pipeline() {
    let mut child = Command::new(bin())
        .args(["encode", "--define-run", "1", "--unicode-run", "3"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(SAMPLE.as_bytes())
        .unwrap();
    let out = child.wait_with_output().unwrap();
    assert!(out.status.success());
    assert_eq!(scsu::decode(&out.stdout).unwrap(), SAMPLE);
}

#[test]
fn cli_refuses_to_overwrite_without_force() {
    let dir = tempdir().unwrap();
    let text = dir.path().join("in.txt");
    let existing = dir.path().join("out.scsu");
    std::fs::write(&text, "payload").unwrap();
    std::fs::write(&existing, "keep me").unwrap();

    let st = Command::new(bin())
        .arg("encode")
        .arg(&text)
        .arg(&existing)
        .status()
        .unwrap();
    assert!(!st.success());
    assert_eq!(std::fs::read(&existing).unwrap(), b"keep me");
}

#[test]
fn cli_rejects_invalid_utf8() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("bad.txt");
    std::fs::write(&input, b"abc\xFF").unwrap();

    let out = Command::new(bin())
        .args(["encode", "-c"])
        .arg(&input)
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("encode error"));
}

#[test]
fn cli_rejects_malformed_scsu() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("bad.scsu");
    std::fs::write(&input, [b'a', 0x0C]).unwrap();

    let out = Command::new(bin())
        .args(["decode", "-c"])
        .arg(&input)
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("decode error"));
}

#[test]
fn cli_failed_commands_leave_no_output_file() {
    let dir = tempdir().unwrap();
    let bad_text = dir.path().join("bad.txt");
    let bad_scsu = dir.path().join("bad.scsu");
    let encoded = dir.path().join("out.scsu");
    let decoded = dir.path().join("out.txt");
    let mut text = "Москва".repeat(4000).into_bytes();
    text.push(0xFF);
    std::fs::write(&bad_text, text).unwrap();
    std::fs::write(&bad_scsu, [b"valid prefix ".as_slice(), &[0x0C]].concat()).unwrap();
    std::fs::write(&decoded, "old contents").unwrap();

    let st = Command::new(bin())
        .arg("encode")
        .arg(&bad_text)
        .arg(&encoded)
        .status()
        .unwrap();
    assert_eq!(st.code(), Some(1));
    assert!(!encoded.exists());

    let st = Command::new(bin())
        .args(["--force", "decode"])
        .arg(&bad_scsu)
        .arg(&decoded)
        .status()
        .unwrap();
    assert_eq!(st.code(), Some(1));
    assert!(!decoded.exists());
}

#[test]
fn cli_json_stats() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.txt");
    std::fs::write(&input, "Москва").unwrap();

    let out = Command::new(bin())
        .args(["--json", "encode", "-c"])
        .arg(&input)
        .output()
        .unwrap();
    assert!(out.status.success());
    assert_eq!(out.stdout, [0x12, 0x9C, 0xBE, 0xC1, 0xBA, 0xB2, 0xB0]);
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("\"chars\": 6"), "{stderr}");
    assert!(stderr.contains("\"encoded_size\": 7"), "{stderr}");
}

#[test]
fn cli_inspect_lists_events() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.scsu");
    std::fs::write(&input, [0x19, 0x08, 0x90, 0x0F, 0x4E, 0x00]).unwrap();

    let out = Command::new(bin())
        .arg("inspect")
        .arg(&input)
        .output()
        .unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("SD1"), "{stdout}");
    assert!(stdout.contains("define window 1 at U+0400"), "{stdout}");
    assert!(stdout.contains("U+0410 'А'"), "{stdout}");
    assert!(stdout.contains("SCU"), "{stdout}");
    assert!(stdout.contains("U+4E00 '一'"), "{stdout}");
}

#[test]
fn cli_config_works() {
    let out = Command::new(bin()).arg("config").output().unwrap();
    assert!(out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("FIXED_OFFSETS=00C0,0250,0370,0530,3040,30A0,FF60"));
}
