//! Muster Node - persistent attendance ledger daemon
//!
//! Runs one [`muster_ledger::Ledger`] and makes it durable and reachable.
//!
//! # Architecture
//!
//! - **Storage**: RocksDB-backed persistence, one atomic batch per operation
//! - **Service**: the ledger behind a single lock, persist-or-reload
//! - **Auth**: ed25519-signed requests name the calling principal
//! - **API**: HTTP endpoints for participants and public reads
//! - **Admin Socket**: Unix socket for local admin commands (muster-admin CLI)
//!
//! # Example
//!
//! ```no_run
//! use muster_node::{MusterNode, NodeConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = NodeConfig::from_env()?;
//!     let node = MusterNode::new(config).await?;
//!     node.run().await?;
//!     Ok(())
//! }
//! ```

pub mod admin_socket;
pub mod api;
pub mod auth;
pub mod error;
pub mod node;
pub mod service;
pub mod storage;
pub mod tokens;

pub use auth::Caller;
pub use error::{Error, Result};
pub use node::{MusterNode, NodeConfig, NodeState};
pub use service::LedgerService;
pub use storage::Storage;
