use crate::server_tests::helpers::{
    Client, EchoObject, build_server, connect, start_server, wait_ready,
};

use plugin_core::handshake::{KEY_FATAL, KEY_OBJECTS};
use plugin_core::{SECRET_LEN, ServerError, Shutdown};

use models::{Scheme, ServerConfigBuilder, ShutdownMode};

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tempfile::tempdir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::timeout;

/// **VALUE**: Verifies the whole life of a unix-socket plugin: announce, authenticate,
/// call, exit gracefully with the host's status, clean up the socket.
///
/// **WHY THIS MATTERS**: This is exactly what a host does with every plugin it spawns.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The socket is created outside the requested directory
/// - The announced secret does not authenticate
/// - Calls are not routed to registered objects
/// - The exit status is lost between the control call and the server result
/// - The socket file outlives the server
#[tokio::test]
async fn given_unix_plugin_when_host_calls_and_exits_then_status_returned() {
    // GIVEN: A graceful server in a private socket directory
    let dir = tempdir().expect("Failed to create temp dir");
    let config = ServerConfigBuilder::default()
        .with_unix_dir(dir.path())
        .with_shutdown_mode(ShutdownMode::Graceful)
        .with_drain_timeout(Duration::from_millis(200))
        .build()
        .unwrap();
    let (handle, handshake) = start_server(config);
    let ready = wait_ready(&handshake).await;

    assert_eq!(ready.proto, "unix");
    assert_eq!(Path::new(&ready.addr).parent(), Some(dir.path()));
    assert_eq!(ready.token.len(), SECRET_LEN);

    // WHEN: The host authenticates and calls
    let mut client = Client::connect(&ready).await;
    let echoed = client.call("Echo.Echo", json!({"k": [1, 2]})).await;
    let upper = client.call("Echo.Upper", json!("abc")).await;
    let exit = client.call("PluginControl.Exit", json!(7)).await;

    // THEN
    assert_eq!(echoed.result, Some(json!({"k": [1, 2]})));
    assert_eq!(upper.result, Some(json!("ABC")));
    assert_eq!(exit.error, None);

    drop(client);
    let shutdown = timeout(Duration::from_secs(5), handle)
        .await
        .expect("Server should stop")
        .unwrap()
        .unwrap();
    assert_eq!(shutdown, Shutdown { status: 7 });
    assert!(!Path::new(&ready.addr).exists(), "Socket file should be removed");
}

/// **VALUE**: Verifies the TCP variant listens on loopback in the non-privileged range.
///
/// **BUG THIS CATCHES**: Would catch binding on all interfaces or below port 1024.
#[tokio::test]
async fn given_tcp_plugin_when_ready_then_loopback_port_at_least_1024() {
    // GIVEN
    let config = ServerConfigBuilder::default()
        .with_scheme(Scheme::Tcp)
        .with_shutdown_mode(ShutdownMode::Graceful)
        .build()
        .unwrap();
    let (handle, handshake) = start_server(config);

    // WHEN
    let ready = wait_ready(&handshake).await;

    // THEN
    assert_eq!(ready.proto, "tcp");
    let (host, port) = ready.addr.rsplit_once(':').unwrap();
    assert_eq!(host, "127.0.0.1");
    assert!(port.parse::<u16>().unwrap() >= 1024);

    let mut client = Client::connect(&ready).await;
    let response = client.call("Echo.Echo", json!("over tcp")).await;
    assert_eq!(response.result, Some(json!("over tcp")));

    client.call("PluginControl.Exit", json!(0)).await;
    drop(client);
    handle.await.unwrap().unwrap();
}

/// **VALUE**: Verifies a client with the wrong secret is disconnected without a reply.
///
/// **WHY THIS MATTERS**: Any local user can reach a loopback port.
///
/// **BUG THIS CATCHES**: Would catch an error banner or partial service for bad secrets.
#[tokio::test]
async fn given_wrong_secret_when_connecting_then_closed_without_reply() {
    // GIVEN
    let config = ServerConfigBuilder::default()
        .with_scheme(Scheme::Tcp)
        .with_shutdown_mode(ShutdownMode::Graceful)
        .build()
        .unwrap();
    let (handle, handshake) = start_server(config);
    let ready = wait_ready(&handshake).await;

    // WHEN: Send a wrong secret followed by a call
    let mut conn = connect(&ready).await;
    conn.write_all(&[b'0'; SECRET_LEN]).await.unwrap();
    conn.write_all(b"{\"id\":1,\"method\":\"Echo.Echo\",\"params\":1}\n")
        .await
        .unwrap();

    // THEN: EOF, nothing received
    let mut received = Vec::new();
    let read = timeout(Duration::from_secs(5), conn.read_to_end(&mut received)).await;
    assert!(read.is_ok(), "Server should close the connection");
    assert!(received.is_empty());

    let mut client = Client::connect(&ready).await;
    client.call("PluginControl.Exit", json!(0)).await;
    drop(client);
    handle.await.unwrap().unwrap();
}

/// **VALUE**: Verifies the objects line lists the control object and registered objects.
#[tokio::test]
async fn given_registered_objects_when_ready_then_objects_line_lists_them() {
    let dir = tempdir().unwrap();
    let config = ServerConfigBuilder::default()
        .with_unix_dir(dir.path())
        .with_prefix("hostx")
        .with_shutdown_mode(ShutdownMode::Graceful)
        .build()
        .unwrap();
    let (handle, handshake) = start_server(config);
    let ready = wait_ready(&handshake).await;

    assert_eq!(handshake.first(KEY_OBJECTS).unwrap(), "PluginControl, Echo");
    assert!(handshake.lines()[0].starts_with("hostx: objects: "));

    let mut client = Client::connect(&ready).await;
    client.call("PluginControl.Exit", json!(0)).await;
    drop(client);
    handle.await.unwrap().unwrap();
}

/// **VALUE**: Verifies an unusable socket directory fails the run with a fatal line.
///
/// **BUG THIS CATCHES**: Would catch the server hanging or reporting ready without a listener.
#[tokio::test]
async fn given_missing_socket_dir_when_running_then_bind_error_and_fatal_line() {
    // GIVEN: A directory that does not exist
    let dir = tempdir().unwrap();
    let config = ServerConfigBuilder::default()
        .with_unix_dir(dir.path().join("missing"))
        .build()
        .unwrap();
    let (mut server, handshake) = build_server(config);

    // WHEN
    let result = server.run().await;

    // THEN
    assert!(matches!(result, Err(ServerError::Bind { .. })));
    assert!(server.is_running());
    assert!(
        handshake
            .first(KEY_FATAL)
            .unwrap()
            .contains("Could not connect in 4 attempts, using unix protocol")
    );
}

/// **VALUE**: Verifies registration is frozen once `run` was called, even if it failed.
///
/// **BUG THIS CATCHES**: Would catch a late object being silently added after the host
/// already received the object list.
#[tokio::test]
#[should_panic(expected = "register called after the plugin server started running")]
async fn given_server_already_run_when_registering_then_panics() {
    let dir = tempdir().unwrap();
    let config = ServerConfigBuilder::default()
        .with_unix_dir(dir.path().join("missing"))
        .build()
        .unwrap();
    let (mut server, _handshake) = build_server(config);
    let _ = server.run().await;

    server.register(Arc::new(EchoObject));
}

#[tokio::test]
#[should_panic(expected = "the plugin server can only be started once")]
async fn given_server_already_run_when_running_again_then_panics() {
    let dir = tempdir().unwrap();
    let config = ServerConfigBuilder::default()
        .with_unix_dir(dir.path().join("missing"))
        .build()
        .unwrap();
    let (mut server, _handshake) = build_server(config);
    let _ = server.run().await;

    let _ = server.run().await;
}
