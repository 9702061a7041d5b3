// Out-of-process tests: spawn the real binary the way a host would.

use plugin_core::SECRET_LEN;
use plugin_core::engine::protocol::{Request, Response};

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use serde_json::json;
use tempfile::tempdir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpStream, UnixStream};
use tokio::process::{Child, ChildStdout, Command};
use tokio::time::timeout;

const BINARY: &str = env!("CARGO_BIN_EXE_echo-plugin");

struct Announced {
    objects: String,
    token: String,
    proto: String,
    addr: String,
}

fn spawn(args: &[&str]) -> (Child, ChildStdout) {
    let mut child = Command::new(BINARY)
        .args(args)
        .env("PINGO_LOG", "warn")
        .stdout(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .expect("Failed to spawn echo-plugin");
    let stdout = child.stdout.take().expect("stdout is piped");
    (child, stdout)
}

/// Read handshake lines until `ready`.
async fn read_handshake(stdout: ChildStdout, prefix: &str) -> Announced {
    let mut lines = BufReader::new(stdout).lines();
    let mut objects = None;
    let mut token = None;

    let read = async {
        while let Some(line) = lines.next_line().await.expect("Failed to read stdout") {
            let Some(rest) = line.strip_prefix(&format!("{prefix}: ")) else {
                continue;
            };
            let (key, value) = rest.split_once(": ").expect("Malformed handshake line");
            match key {
                "objects" => objects = Some(value.to_string()),
                "auth-token" => token = Some(value.to_string()),
                "ready" => return value.to_string(),
                "fatal" => panic!("Plugin reported fatal: {value}"),
                _ => {}
            }
        }
        panic!("Plugin closed stdout before ready");
    };
    let ready = timeout(Duration::from_secs(10), read)
        .await
        .expect("Plugin never became ready");

    let (proto, addr) = ready
        .strip_prefix("proto=")
        .and_then(|rest| rest.split_once(" addr="))
        .expect("Malformed ready line");

    Announced {
        objects: objects.expect("objects line precedes ready"),
        token: token.expect("auth-token line precedes ready"),
        proto: proto.to_string(),
        addr: addr.to_string(),
    }
}

async fn send_calls(announced: &Announced, requests: &[Request]) -> Vec<Response> {
    let mut payload = announced.token.clone().into_bytes();
    for request in requests {
        payload.extend(request.to_ndjson_line().unwrap().into_bytes());
    }

    match announced.proto.as_str() {
        "tcp" => exchange(TcpStream::connect(&announced.addr).await.unwrap(), &payload, requests.len()).await,
        _ => exchange(UnixStream::connect(&announced.addr).await.unwrap(), &payload, requests.len()).await,
    }
}

async fn exchange<S>(stream: S, payload: &[u8], expected: usize) -> Vec<Response>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let mut stream = BufReader::new(stream);
    stream.write_all(payload).await.unwrap();
    stream.flush().await.unwrap();

    let mut responses = Vec::new();
    for _ in 0..expected {
        let mut line = String::new();
        if stream.read_line(&mut line).await.unwrap_or(0) == 0 {
            break;
        }
        responses.push(Response::from_ndjson_line(&line).unwrap());
    }
    responses
}

/// **VALUE**: Verifies the host's Exit(7) ends the plugin process with exit code 7.
///
/// **WHY THIS MATTERS**: The host uses the exit code to tell a requested stop from a crash.
///
/// **BUG THIS CATCHES**: Would catch the status being ignored or the process lingering.
#[tokio::test]
async fn given_running_plugin_when_exit_7_called_then_process_exits_with_7() {
    // GIVEN: The plugin on TCP in immediate mode
    let (mut child, stdout) = spawn(&["-pingo:proto=tcp"]);
    let announced = read_handshake(stdout, "pingo").await;
    assert_eq!(announced.objects, "PluginControl, Echo");
    assert_eq!(announced.token.len(), SECRET_LEN);

    // WHEN: Echo, then Exit(7) on the same connection
    let responses = send_calls(
        &announced,
        &[
            Request::new(1, "Echo.Echo", json!("hello")),
            Request::new(2, "PluginControl.Exit", json!(7)),
        ],
    )
    .await;

    // THEN: Echo answered; Exit never replies; process status is 7
    assert_eq!(responses[0], Response::success(1, json!("hello")));
    let status = timeout(Duration::from_secs(10), child.wait())
        .await
        .expect("Plugin should exit")
        .unwrap();
    assert_eq!(status.code(), Some(7));
}

/// **VALUE**: Verifies graceful mode also surfaces the requested status as the exit code,
/// after replying to the Exit call.
#[tokio::test]
async fn given_graceful_unix_plugin_when_exit_7_called_then_reply_then_exit_7() {
    // GIVEN
    let dir = tempdir().unwrap();
    let unixdir = format!("-pingo:unixdir={}", dir.path().display());
    let (mut child, stdout) = spawn(&[
        unixdir.as_str(),
        "-pingo:shutdown=graceful",
        "-pingo:drain-ms=100",
        "-pingo:prefix=hostx",
    ]);
    let announced = read_handshake(stdout, "hostx").await;
    assert_eq!(announced.proto, "unix");

    // WHEN
    let responses = send_calls(
        &announced,
        &[Request::new(5, "PluginControl.Exit", json!(7))],
    )
    .await;

    // THEN
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].id, 5);
    assert_eq!(responses[0].error, None);
    let status = timeout(Duration::from_secs(10), child.wait())
        .await
        .expect("Plugin should exit")
        .unwrap();
    assert_eq!(status.code(), Some(7));
}

/// **VALUE**: Verifies an immediate exit does not leave the socket file behind.
///
/// **WHY THIS MATTERS**: Immediate mode ends the process without running destructors;
/// stale sockets would pile up in the host's socket directory with every plugin run.
///
/// **BUG THIS CATCHES**: Would catch cleanup that only happens when the listener is dropped.
#[tokio::test]
async fn given_immediate_unix_plugin_when_exit_called_then_socket_file_removed() {
    // GIVEN
    let dir = tempdir().unwrap();
    let unixdir = format!("-pingo:unixdir={}", dir.path().display());
    let (mut child, stdout) = spawn(&[unixdir.as_str()]);
    let announced = read_handshake(stdout, "pingo").await;
    assert!(Path::new(&announced.addr).exists(), "Socket should exist while serving");

    // WHEN
    send_calls(&announced, &[Request::new(1, "PluginControl.Exit", json!(7))]).await;
    let status = timeout(Duration::from_secs(10), child.wait())
        .await
        .expect("Plugin should exit")
        .unwrap();

    // THEN
    assert_eq!(status.code(), Some(7));
    assert!(!Path::new(&announced.addr).exists(), "Socket file should be removed");
}

/// **VALUE**: Verifies an unusable socket directory makes the plugin report `fatal` and exit 1.
#[tokio::test]
async fn given_missing_unixdir_when_starting_then_fatal_line_and_exit_1() {
    // GIVEN
    let dir = tempdir().unwrap();
    let unixdir = format!("-pingo:unixdir={}", dir.path().join("missing").display());
    let (mut child, stdout) = spawn(&[unixdir.as_str()]);

    // WHEN
    let mut lines = BufReader::new(stdout).lines();
    let mut fatal = None;
    while let Ok(Some(line)) = lines.next_line().await {
        if let Some(value) = line.strip_prefix("pingo: fatal: ") {
            fatal = Some(value.to_string());
        }
    }

    // THEN
    assert!(fatal.unwrap().starts_with("err-connection-failed"));
    let status = child.wait().await.unwrap();
    assert_eq!(status.code(), Some(1));
}
