//! A bounded, asynchronous connection pool fronting a TCP-backed client.
//!
//! Five components: a [`Connector`] that establishes new connections, a
//! [`HealthChecker`] that decides whether one is still usable, an idle
//! reservoir holding connections not currently checked out, a [`Pool`] that
//! enforces a fixed capacity and a bounded waiter queue, and a [`PoolMap`]
//! that lazily keeps one `Pool` per [`Endpoint`].
//!
//! ```no_run
//! use std::net::SocketAddr;
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use poolcore::{Connector, Endpoint, Pool, PoolOptions, health::AlwaysHealthy};
//! use tokio::net::TcpStream;
//!
//! struct TcpConnector;
//!
//! #[async_trait]
//! impl Connector for TcpConnector {
//!     type Error = std::io::Error;
//!
//!     async fn connect(&self, endpoint: Endpoint) -> Result<Box<dyn poolcore::connection::Transport>, Self::Error> {
//!         let stream = TcpStream::connect(endpoint.addr()).await?;
//!         Ok(Box::new(stream))
//!     }
//! }
//!
//! # async fn run() -> poolcore::Result<()> {
//! let endpoint = Endpoint::new("127.0.0.1:5432".parse::<SocketAddr>().unwrap());
//! let options = PoolOptions::builder().capacity(10).build();
//! let pool = Pool::new(endpoint, options, TcpConnector, AlwaysHealthy, None)?;
//!
//! let conn = pool.acquire().await?;
//! pool.release(conn).await.map_err(|e| e.error)?;
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod connector;
pub mod endpoint;
pub mod error;
pub mod events;
pub mod health;
pub mod map;
pub mod options;
pub mod pool;

mod reservoir;
mod task;
mod worker;

pub use connection::Connection;
pub use connector::Connector;
pub use endpoint::Endpoint;
pub use error::{PoolError, Result};
pub use events::PoolHandler;
pub use health::HealthChecker;
pub use map::PoolMap;
pub use options::{PoolOptions, SelectionOrder, TimeoutMode};
pub use pool::{Pool, ReleaseError};
