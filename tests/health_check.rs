//! Health-check tests against local TCP listeners

use clickhouse_harness::connection::DriverRegistry;
use clickhouse_harness::{wait_for, Client, ClientConfig, Error, RetryPolicy};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

async fn closed_addr() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr").to_string();
    drop(listener);
    addr
}

fn policy(attempts: u32) -> RetryPolicy {
    RetryPolicy::new(Duration::from_millis(100), Duration::from_millis(400), attempts)
        .expect("policy")
}

#[tokio::test]
async fn test_ping_until_healthy() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr").to_string();

    let registry = DriverRegistry::with_defaults();
    let client = Client::connect_with(&ClientConfig::new(addr), &registry)
        .await
        .expect("connect");

    let parent = CancellationToken::new();
    let pings = AtomicU32::new(0);
    wait_for(&parent, &policy(5), |ctx| {
        pings.fetch_add(1, Ordering::SeqCst);
        let client = &client;
        async move { client.ping(&ctx).await }
    })
    .await
    .expect("healthy");

    assert_eq!(pings.load(Ordering::SeqCst), 1);
    client.close().await.expect("close");
}

#[tokio::test]
async fn test_unreachable_server_reports_last_probe_error() {
    let addr = closed_addr().await;
    let config = ClientConfig::builder()
        .server(addr.clone())
        .option("dial_timeout=100ms")
        .build();
    let registry = DriverRegistry::with_defaults();

    let parent = CancellationToken::new();
    let attempts = AtomicU32::new(0);
    let err = wait_for(&parent, &policy(3), |ctx| {
        attempts.fetch_add(1, Ordering::SeqCst);
        let (config, registry) = (&config, &registry);
        async move {
            let client = Client::connect_with(config, registry).await?;
            client.ping(&ctx).await
        }
    })
    .await
    .expect_err("server is down");

    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    match err {
        Error::Connection(msg) => assert!(msg.contains(&addr), "diagnostic kept: {}", msg),
        other => panic!("expected connection error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_alt_host_takes_over() {
    let dead = closed_addr().await;
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let live = listener.local_addr().expect("addr").to_string();

    let config = ClientConfig::builder()
        .server(dead)
        .server(live.clone())
        .username("default")
        .option("dial_timeout=500ms")
        .build();
    let registry = DriverRegistry::with_defaults();

    let client = Client::connect_with(&config, &registry)
        .await
        .expect("connect");
    assert_eq!(client.peer(), live);
    client
        .ping_timeout(Duration::from_secs(1))
        .await
        .expect("ping");
}

#[tokio::test]
async fn test_cancelled_health_check_stops_early() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr").to_string();
    let registry = DriverRegistry::with_defaults();
    let client = Client::connect_with(&ClientConfig::new(addr), &registry)
        .await
        .expect("connect");

    let parent = CancellationToken::new();
    parent.cancel();

    let err = wait_for(&parent, &RetryPolicy::default(), |ctx| {
        let client = &client;
        async move { client.ping(&ctx).await }
    })
    .await
    .expect_err("cancelled");
    assert!(matches!(err, Error::Cancelled));
}
