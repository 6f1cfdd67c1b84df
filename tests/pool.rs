//! End-to-end scenarios against the public `Pool` API.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use poolcore::connection::Transport;
use poolcore::health::AlwaysHealthy;
use poolcore::{Connector, Endpoint, Pool, PoolError, PoolOptions, TimeoutMode};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

#[derive(Clone, Default)]
struct CountingConnector {
    attempts: Arc<AtomicU32>,
}

#[async_trait]
impl Connector for CountingConnector {
    type Error = std::io::Error;

    async fn connect(&self, _endpoint: Endpoint) -> Result<Box<dyn Transport>, Self::Error> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let (a, _b) = tokio::io::duplex(8);
        Ok(Box::new(a) as Box<dyn Transport>)
    }
}

/// A connector whose connections echo back whatever is written to them,
/// so a caller can exercise `stream_mut()` end to end.
#[derive(Clone, Default)]
struct EchoConnector;

#[async_trait]
impl Connector for EchoConnector {
    type Error = std::io::Error;

    async fn connect(&self, _endpoint: Endpoint) -> Result<Box<dyn Transport>, Self::Error> {
        let (ours, theirs) = tokio::io::duplex(64);
        tokio::spawn(async move {
            let mut theirs = theirs;
            let mut buf = [0u8; 64];
            while let Ok(n) = theirs.read(&mut buf).await {
                if n == 0 || theirs.write_all(&buf[..n]).await.is_err() {
                    break;
                }
            }
        });
        Ok(Box::new(ours) as Box<dyn Transport>)
    }
}

/// Scenario: I/O through an acquired connection's `stream_mut()`.
#[tokio::test]
async fn acquired_connection_round_trips_bytes_through_stream_mut() {
    let pool = Pool::new(
        endpoint(),
        PoolOptions::builder().capacity(1).build(),
        EchoConnector,
        AlwaysHealthy,
        None,
    )
    .unwrap();

    let mut conn = pool.acquire().await.unwrap();
    conn.stream_mut().write_all(b"ping").await.unwrap();

    let mut buf = [0u8; 4];
    conn.stream_mut().read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"ping");

    pool.release(conn).await.unwrap();
}

fn endpoint() -> Endpoint {
    Endpoint::new("127.0.0.1:5555".parse::<SocketAddr>().unwrap())
}

/// Scenario 1: cold start, queue, and recycle on release.
#[tokio::test]
async fn cold_start() {
    let connector = CountingConnector::default();
    let pool = Pool::new(
        endpoint(),
        PoolOptions::builder().capacity(2).max_pending(4).build(),
        connector.clone(),
        AlwaysHealthy,
        None,
    )
    .unwrap();

    let a = pool.acquire().await.unwrap();
    let b = pool.acquire().await.unwrap();
    assert_eq!(pool.acquired_count(), 2);
    assert_eq!(connector.attempts.load(Ordering::SeqCst), 2);

    let pool2 = pool.clone();
    let third = tokio::spawn(async move { pool2.acquire().await });
    tokio::task::yield_now().await;
    assert!(!third.is_finished());

    pool.release(a).await.unwrap();
    let recycled = third.await.unwrap().unwrap();
    assert_eq!(pool.acquired_count(), 2);
    // The third acquire recycled the released connection rather than dialing
    // a new one.
    assert_eq!(connector.attempts.load(Ordering::SeqCst), 2);

    pool.release(b).await.unwrap();
    pool.release(recycled).await.unwrap();
    assert_eq!(pool.acquired_count(), 0);
}

/// Scenario 2: queue overflow.
#[tokio::test]
async fn queue_overflow() {
    let pool = Pool::new(
        endpoint(),
        PoolOptions::builder().capacity(1).max_pending(1).build(),
        CountingConnector::default(),
        AlwaysHealthy,
        None,
    )
    .unwrap();

    let held = pool.acquire().await.unwrap();

    let pool2 = pool.clone();
    let queued = tokio::spawn(async move { pool2.acquire().await });
    tokio::task::yield_now().await;
    assert!(!queued.is_finished());

    let rejected = pool.acquire().await;
    assert!(matches!(rejected, Err(PoolError::TooManyOutstanding { .. })));

    pool.release(held).await.unwrap();
    queued.await.unwrap().unwrap();
}

/// Scenario 3: timeout_mode = fail.
#[tokio::test]
async fn timeout_fail() {
    let pool = Pool::new(
        endpoint(),
        PoolOptions::builder()
            .capacity(1)
            .max_pending(10)
            .acquire_timeout(Some(Duration::from_millis(50)))
            .timeout_mode(TimeoutMode::Fail)
            .build(),
        CountingConnector::default(),
        AlwaysHealthy,
        None,
    )
    .unwrap();

    let held = pool.acquire().await.unwrap();
    let second = pool.acquire().await;
    assert!(matches!(second, Err(PoolError::AcquireTimeout { .. })));

    pool.release(held).await.unwrap();
    assert_eq!(pool.acquired_count(), 0);
}

/// Scenario 4: timeout_mode = new.
#[tokio::test]
async fn timeout_new() {
    let connector = CountingConnector::default();
    let pool = Pool::new(
        endpoint(),
        PoolOptions::builder()
            .capacity(1)
            .max_pending(10)
            .acquire_timeout(Some(Duration::from_millis(50)))
            .timeout_mode(TimeoutMode::New)
            .build(),
        connector.clone(),
        AlwaysHealthy,
        None,
    )
    .unwrap();

    let held = pool.acquire().await.unwrap();
    let second = pool.acquire().await.unwrap();

    // The timer promoted the second waiter into its own connect attempt,
    // transiently exceeding capacity=1.
    assert_eq!(pool.acquired_count(), 2);
    assert_eq!(connector.attempts.load(Ordering::SeqCst), 2);

    pool.release(held).await.unwrap();
    pool.release(second).await.unwrap();
    assert_eq!(pool.acquired_count(), 0);
}

/// Scenario 5: close drains waiters and fails a racing release.
#[tokio::test]
async fn close_drains_waiters() {
    let pool = Pool::new(
        endpoint(),
        PoolOptions::builder().capacity(1).max_pending(10).build(),
        CountingConnector::default(),
        AlwaysHealthy,
        None,
    )
    .unwrap();

    let held = pool.acquire().await.unwrap();

    let pool2 = pool.clone();
    let mut waiters = Vec::new();
    for _ in 0..3 {
        let p = pool2.clone();
        waiters.push(tokio::spawn(async move { p.acquire().await }));
    }
    tokio::task::yield_now().await;

    pool.close_async().await.unwrap();

    for waiter in waiters {
        let result = waiter.await.unwrap();
        assert!(matches!(result, Err(PoolError::PoolClosed { .. })));
    }

    let release_result = pool.release(held).await;
    assert!(matches!(
        release_result,
        Err(poolcore::ReleaseError {
            error: PoolError::PoolClosed { .. },
            connection: None,
        })
    ));
}

/// Scenario 6: releasing to the wrong pool leaves both pools untouched.
#[tokio::test]
async fn wrong_pool() {
    let pool_a = Pool::new(
        endpoint(),
        PoolOptions::builder().capacity(1).build(),
        CountingConnector::default(),
        AlwaysHealthy,
        None,
    )
    .unwrap();
    let pool_b = Pool::new(
        endpoint(),
        PoolOptions::builder().capacity(1).build(),
        CountingConnector::default(),
        AlwaysHealthy,
        None,
    )
    .unwrap();

    let conn = pool_a.acquire().await.unwrap();
    let err = pool_b.release(conn).await.unwrap_err();

    assert!(matches!(err.error, PoolError::WrongPool { .. }));
    assert!(err.connection.is_some());
    assert_eq!(pool_a.acquired_count(), 1);
    assert_eq!(pool_b.acquired_count(), 0);

    // The connection was handed back, not closed by B; A can still release it.
    pool_a.release(err.connection.unwrap()).await.unwrap();
    assert_eq!(pool_a.acquired_count(), 0);
}
