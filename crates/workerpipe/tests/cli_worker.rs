#![cfg(all(unix, feature = "cli"))]

use std::io::Read;
use std::process::{Command, Stdio};

use workerpipe::messages::{decode_json, encode_json, ConfigureResult, LogLevel, LogRecord};
use workerpipe_frame::{Channel, FrameError, MessageType, RecvState};

fn spawn_worker() -> std::process::Child {
    Command::new(env!("CARGO_BIN_EXE_workerpipe"))
        .arg("--log-level")
        .arg("error")
        .arg("worker")
        .arg("--logger")
        .arg("it")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("worker should start")
}

#[test]
fn configure_then_shutdown() {
    let mut child = spawn_worker();
    let mut channel = Channel::for_child(&mut child).expect("stdio should be piped");

    channel
        .send_message(MessageType::CONFIGURE, br#"{"interval":10,"port":80}"#)
        .expect("configure should send");

    let (msg_type, mut payload) = channel.receive_message().expect("configure result");
    assert_eq!(msg_type, MessageType::CONFIGURE_RESULT);
    let result: ConfigureResult = decode_json(&mut payload).expect("result body");
    assert!(result.is_ok());

    let (msg_type, mut payload) = channel.receive_message().expect("log record");
    assert_eq!(msg_type, MessageType::LOG);
    let record: LogRecord = decode_json(&mut payload).expect("log body");
    assert_eq!(record.level, LogLevel::Info);
    assert_eq!(record.message, "configured with 2 setting(s)");
    assert_eq!(record.logger.as_deref(), Some("it"));

    channel
        .send_message(MessageType::SHUTDOWN, &[])
        .expect("shutdown should send");

    assert!(matches!(
        channel.receive_message(),
        Err(FrameError::ConnectionClosed)
    ));
    channel.close().expect("close should succeed");

    let status = child.wait().expect("worker should exit");
    assert!(status.success());
}

#[test]
fn rejected_configuration_is_answered() {
    let mut child = spawn_worker();
    let mut channel = Channel::for_child(&mut child).expect("stdio should be piped");

    channel
        .send_message(MessageType::CONFIGURE, b"\"not an object\"")
        .unwrap();

    let (msg_type, mut payload) = channel.receive_message().unwrap();
    assert_eq!(msg_type, MessageType::CONFIGURE_RESULT);
    let result: ConfigureResult = decode_json(&mut payload).unwrap();
    assert_eq!(
        result.into_result(),
        Err("configuration must be a JSON object".to_string())
    );

    // Leave the LOG payload partly unread to exercise the draining rule.
    let (msg_type, mut payload) = channel.receive_message().unwrap();
    assert_eq!(msg_type, MessageType::LOG);
    let mut first = [0u8; 1];
    payload.read_exact(&mut first).unwrap();
    assert!(matches!(channel.state(), RecvState::PayloadPending { .. }));
    assert!(matches!(
        channel.receive_message(),
        Err(FrameError::PayloadNotDrained { .. })
    ));
    assert!(channel.discard_pending().unwrap() > 0);

    channel.send_message(MessageType::SHUTDOWN, &[]).unwrap();
    channel.close().unwrap();
    assert!(child.wait().unwrap().success());
}

#[test]
fn end_of_stream_stops_worker() {
    let mut child = spawn_worker();
    let mut channel = Channel::for_child(&mut child).unwrap();

    let body = encode_json(&LogRecord::new(LogLevel::Debug, "ignored")).unwrap();
    channel.send_message(MessageType::new(500), &body).unwrap();
    channel.close().unwrap();

    let status = child.wait().unwrap();
    assert!(status.success());
}

#[test]
fn supervise_drives_reference_worker() {
    let exe = env!("CARGO_BIN_EXE_workerpipe");
    let output = Command::new(exe)
        .args(["--log-level", "error", "--format", "json", "supervise"])
        .args(["--config", r#"{"interval":1}"#, "--"])
        .args([exe, "--log-level", "error", "worker"])
        .output()
        .expect("supervise should run");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"msg_type_name\":\"CONFIGURE_RESULT\""));
    assert!(stdout.contains(r#"{\"error\":null}"#));
}

#[test]
fn supervise_reports_rejected_configuration() {
    let exe = env!("CARGO_BIN_EXE_workerpipe");
    let output = Command::new(exe)
        .args(["--log-level", "error", "supervise", "--config", "[]", "--"])
        .args([exe, "--log-level", "error", "worker"])
        .output()
        .expect("supervise should run");

    assert_eq!(output.status.code(), Some(60));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("worker rejected configuration"));
}

#[test]
fn supervise_fails_when_worker_never_answers() {
    let output = Command::new(env!("CARGO_BIN_EXE_workerpipe"))
        .args(["--log-level", "error", "supervise", "--config", r#"{"a":1}"#, "--"])
        .args(["sh", "-c", "head -c 10 >/dev/null"])
        .output()
        .expect("supervise should run");

    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("worker exited before answering CONFIGURE"));
}

#[test]
fn supervise_reaps_worker_that_exits_immediately() {
    let output = Command::new(env!("CARGO_BIN_EXE_workerpipe"))
        .args(["--log-level", "error", "supervise", "--", "true"])
        .output()
        .expect("supervise should run");

    assert_eq!(output.status.code(), Some(3));
}
