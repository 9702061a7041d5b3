use super::support::{ChannelAcceptor, CountingEngine};
use crate::SECRET_LEN;
use crate::dispatcher::{DispatchContext, accept_loop};
use crate::error::ServerError;
use crate::handshake::{KEY_FATAL, MemoryHandshake};
use crate::shutdown::ShutdownSignal;
use crate::transport::{Acceptor, BoxedConnection};

use common::RedactedSecret;
use models::{ServerConfig, ServerConfigBuilder};

use std::io::{Error as IoError, Result as IoResult};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream, duplex};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};

struct Harness {
    engine: Arc<CountingEngine>,
    secret: Arc<RedactedSecret>,
    handshake: Arc<MemoryHandshake>,
    shutdown: ShutdownSignal,
}

impl Harness {
    fn new() -> Self {
        Self {
            engine: Arc::new(CountingEngine::default()),
            secret: Arc::new(RedactedSecret::generate(SECRET_LEN)),
            handshake: Arc::new(MemoryHandshake::new("pingo")),
            shutdown: ShutdownSignal::new(),
        }
    }

    fn context(&self) -> DispatchContext<CountingEngine> {
        DispatchContext {
            engine: Arc::clone(&self.engine),
            secret: Arc::clone(&self.secret),
            handshake: self.handshake.clone(),
            shutdown: self.shutdown.clone(),
        }
    }

    fn spawn<A: Acceptor + 'static>(
        &self,
        acceptor: A,
        config: ServerConfig,
    ) -> JoinHandle<Result<i32, ServerError>> {
        let context = self.context();
        tokio::spawn(async move { accept_loop(&acceptor, context, &config).await })
    }
}

fn pair() -> (BoxedConnection, DuplexStream) {
    let (server, client) = duplex(1024);
    (Box::new(server), client)
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    timeout(Duration::from_secs(5), async {
        while !condition() {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

/// Acceptor whose every accept fails.
struct BrokenAcceptor;

impl Acceptor for BrokenAcceptor {
    async fn accept(&self) -> IoResult<(BoxedConnection, String)> {
        Err(IoError::other("listener broken"))
    }
}

/// **VALUE**: Verifies that 20 concurrent clients with a wrong secret are all closed
/// without receiving a byte and none of them reaches the engine.
///
/// **WHY THIS MATTERS**: Authentication is the only access control. A single leak to
/// the engine means an unauthenticated process can call plugin procedures.
///
/// **BUG THIS CATCHES**: Would catch serving before the auth check completes, an error
/// reply leaking to the scanner, or rejected connections left hanging.
#[tokio::test]
async fn given_20_clients_with_wrong_secret_when_dispatching_then_all_closed_and_none_served() {
    // GIVEN: A running loop
    let harness = Harness::new();
    let (tx, acceptor) = ChannelAcceptor::new();
    let task = harness.spawn(acceptor, ServerConfig::default());

    // WHEN: 20 clients present a wrong secret
    let mut clients = Vec::new();
    for i in 0..20 {
        let (server, mut client) = pair();
        tx.send(Ok((server, format!("peer-{i}")))).unwrap();
        clients.push(tokio::spawn(async move {
            client.write_all(&[b'x'; SECRET_LEN]).await.unwrap();
            let mut received = Vec::new();
            client.read_to_end(&mut received).await.unwrap();
            received
        }));
    }

    // THEN: Each sees EOF with no bytes
    for client in clients {
        let received = timeout(Duration::from_secs(5), client).await.unwrap().unwrap();
        assert!(received.is_empty());
    }
    assert_eq!(harness.engine.served(), 0);

    harness.shutdown.request(0);
    assert_eq!(task.await.unwrap().unwrap(), 0);
}

/// **VALUE**: Verifies a client presenting the correct secret is handed to the engine.
///
/// **BUG THIS CATCHES**: Would catch the happy path being broken by the auth gate.
#[tokio::test]
async fn given_correct_secret_when_dispatching_then_connection_served() {
    // GIVEN
    let harness = Harness::new();
    let (tx, acceptor) = ChannelAcceptor::new();
    let task = harness.spawn(acceptor, ServerConfig::default());

    // WHEN
    let (server, mut client) = pair();
    tx.send(Ok((server, String::from("peer")))).unwrap();
    client.write_all(harness.secret.as_bytes()).await.unwrap();

    // THEN
    let engine = Arc::clone(&harness.engine);
    wait_until(|| engine.served() == 1).await;

    drop(client);
    harness.shutdown.request(0);
    task.await.unwrap().unwrap();
}

/// **VALUE**: Verifies an accept error is reported on the handshake channel and the loop
/// keeps serving afterwards.
///
/// **WHY THIS MATTERS**: A transient failure such as fd exhaustion must not take the
/// plugin down, but the host should hear about it.
///
/// **BUG THIS CATCHES**: Would catch the loop exiting on the first accept error.
#[tokio::test]
async fn given_transient_accept_error_when_dispatching_then_fatal_reported_and_loop_continues() {
    // GIVEN: An error followed by a good connection
    let harness = Harness::new();
    let (tx, acceptor) = ChannelAcceptor::new();
    let task = harness.spawn(acceptor, ServerConfig::default());

    tx.send(Err(IoError::other("too many open files"))).unwrap();
    let (server, mut client) = pair();
    tx.send(Ok((server, String::from("peer")))).unwrap();
    client.write_all(harness.secret.as_bytes()).await.unwrap();

    // WHEN/THEN: The good connection is still served
    let engine = Arc::clone(&harness.engine);
    wait_until(|| engine.served() == 1).await;

    assert_eq!(
        harness.handshake.values(KEY_FATAL),
        vec![String::from("err-http-serve: too many open files")]
    );
    assert!(!task.is_finished());

    drop(client);
    harness.shutdown.request(0);
    task.await.unwrap().unwrap();
}

/// **VALUE**: Verifies a listener that never recovers eventually ends the loop with an error.
///
/// **BUG THIS CATCHES**: Would catch a hot spin or an infinite retry on a dead listener.
#[tokio::test]
async fn given_persistent_accept_errors_when_dispatching_then_accept_error_after_window() {
    // GIVEN: A short backoff window
    let harness = Harness::new();
    let config = ServerConfigBuilder::default()
        .with_accept_backoff_max(Duration::from_millis(200))
        .build()
        .unwrap();

    // WHEN
    let result = timeout(Duration::from_secs(10), harness.spawn(BrokenAcceptor, config))
        .await
        .expect("loop should give up")
        .unwrap();

    // THEN
    assert!(matches!(result, Err(ServerError::Accept { .. })));
    let fatal = harness.handshake.values(KEY_FATAL);
    assert!(fatal.len() >= 2, "Each failure is reported, got {fatal:?}");
    assert!(fatal.len() < 50, "Retries must back off, got {}", fatal.len());
}

/// **VALUE**: Verifies the connection bound holds new connections back until a slot frees.
///
/// **BUG THIS CATCHES**: Would catch the permit being released before serving ends.
#[tokio::test]
async fn given_bound_of_one_when_two_clients_connect_then_second_waits_for_first() {
    // GIVEN: max_connections = 1
    let harness = Harness::new();
    let config = ServerConfigBuilder::default()
        .with_max_connections(Some(1))
        .build()
        .unwrap();
    let (tx, acceptor) = ChannelAcceptor::new();
    let task = harness.spawn(acceptor, config);

    let (first_server, mut first) = pair();
    let (second_server, mut second) = pair();
    tx.send(Ok((first_server, String::from("first")))).unwrap();
    tx.send(Ok((second_server, String::from("second")))).unwrap();
    first.write_all(harness.secret.as_bytes()).await.unwrap();
    second.write_all(harness.secret.as_bytes()).await.unwrap();

    // WHEN: Only the first can be in flight
    let engine = Arc::clone(&harness.engine);
    wait_until(|| engine.served() == 1).await;
    sleep(Duration::from_millis(100)).await;
    assert_eq!(harness.engine.served(), 1);

    // THEN: Closing the first admits the second
    drop(first);
    wait_until(|| engine.served() == 2).await;

    drop(second);
    harness.shutdown.request(0);
    task.await.unwrap().unwrap();
}

/// **VALUE**: Verifies a graceful shutdown ends the loop with the requested status,
/// even with a connection still open once the drain window passes.
///
/// **BUG THIS CATCHES**: Would catch the loop waiting forever on an idle client.
#[tokio::test]
async fn given_open_connection_when_shutdown_requested_then_loop_returns_after_drain() {
    // GIVEN: An authenticated client that never hangs up
    let harness = Harness::new();
    let config = ServerConfigBuilder::default()
        .with_drain_timeout(Duration::from_millis(100))
        .build()
        .unwrap();
    let (tx, acceptor) = ChannelAcceptor::new();
    let task = harness.spawn(acceptor, config);

    let (server, mut client) = pair();
    tx.send(Ok((server, String::from("idle")))).unwrap();
    client.write_all(harness.secret.as_bytes()).await.unwrap();
    let engine = Arc::clone(&harness.engine);
    wait_until(|| engine.served() == 1).await;

    // WHEN
    assert!(harness.shutdown.request(42));

    // THEN
    let status = timeout(Duration::from_secs(5), task)
        .await
        .expect("drain should end")
        .unwrap()
        .unwrap();
    assert_eq!(status, 42);

    let mut rest = Vec::new();
    client.read_to_end(&mut rest).await.unwrap();
    assert!(rest.is_empty());
}

#[tokio::test]
async fn given_shutdown_requested_before_start_when_dispatching_then_returns_immediately() {
    let harness = Harness::new();
    harness.shutdown.request(3);
    let (_tx, acceptor) = ChannelAcceptor::new();

    let status = timeout(
        Duration::from_secs(5),
        harness.spawn(acceptor, ServerConfig::default()),
    )
    .await
    .unwrap()
    .unwrap()
    .unwrap();

    assert_eq!(status, 3);
}

/// **VALUE**: Verifies that peers which connect and never send a secret cannot lock the
/// legitimate host out under the default configuration.
///
/// **WHY THIS MATTERS**: Any local process can open connections to the plugin. If idle
/// unauthenticated connections counted against a limit, a few hundred of them would
/// keep the host from ever being served.
///
/// **BUG THIS CATCHES**: Would catch a default connection bound, or a slot being taken
/// before authentication completes.
#[tokio::test]
async fn given_300_silent_peers_when_host_connects_then_host_still_served() {
    // GIVEN: Default config and 300 peers that never write
    let harness = Harness::new();
    let (tx, acceptor) = ChannelAcceptor::new();
    let task = harness.spawn(acceptor, ServerConfig::default());

    let mut silent = Vec::new();
    for i in 0..300 {
        let (server, client) = pair();
        tx.send(Ok((server, format!("silent-{i}")))).unwrap();
        silent.push(client);
    }

    // WHEN: The host presents the correct secret
    let (server, mut host) = pair();
    tx.send(Ok((server, String::from("host")))).unwrap();
    host.write_all(harness.secret.as_bytes()).await.unwrap();

    // THEN
    let engine = Arc::clone(&harness.engine);
    wait_until(|| engine.served() == 1).await;

    drop(host);
    drop(silent);
    harness.shutdown.request(0);
    task.await.unwrap().unwrap();
}

/// **VALUE**: Verifies that with an explicit bound, only authenticated connections occupy
/// a slot.
///
/// **BUG THIS CATCHES**: Would catch the permit being acquired before `authenticate`,
/// letting silent peers fill the bound.
#[tokio::test]
async fn given_bound_of_one_and_silent_peers_when_host_connects_then_host_served() {
    // GIVEN: max_connections = 1 and several peers that never authenticate
    let harness = Harness::new();
    let config = ServerConfigBuilder::default()
        .with_max_connections(Some(1))
        .build()
        .unwrap();
    let (tx, acceptor) = ChannelAcceptor::new();
    let task = harness.spawn(acceptor, config);

    let mut silent = Vec::new();
    for i in 0..5 {
        let (server, client) = pair();
        tx.send(Ok((server, format!("silent-{i}")))).unwrap();
        silent.push(client);
    }

    // WHEN
    let (server, mut host) = pair();
    tx.send(Ok((server, String::from("host")))).unwrap();
    host.write_all(harness.secret.as_bytes()).await.unwrap();

    // THEN
    let engine = Arc::clone(&harness.engine);
    wait_until(|| engine.served() == 1).await;

    drop(host);
    drop(silent);
    harness.shutdown.request(0);
    task.await.unwrap().unwrap();
}
