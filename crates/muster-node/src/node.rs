//! Muster Node - the main application entry point.
//!
//! Architecture:
//! - Single daemon process owning one ledger and one RocksDB instance
//! - HTTP API for participants (signed requests) and public reads
//! - Unix admin socket for local administration (muster-admin CLI)

use crate::admin_socket::AdminSocket;
use crate::api;
use crate::auth;
use crate::error::{Error, Result};
use crate::service::LedgerService;
use crate::storage::Storage;
use muster_ledger::{LedgerConfig, OverflowPolicy, Principal};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for a Muster node.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Data directory for storage
    pub data_dir: PathBuf,

    /// HTTP API listen address
    pub api_addr: SocketAddr,

    /// Admin socket path (for muster-admin CLI)
    pub admin_socket: PathBuf,

    /// Administrator principal; the node's own identity when unset
    pub administrator: Option<Principal>,

    /// What full bounded lists do
    pub overflow: OverflowPolicy,
}

impl NodeConfig {
    /// Create config from environment variables with sensible defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Create config from an arbitrary variable source.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let data_dir = PathBuf::from(
            var("MUSTER_DATA_DIR").unwrap_or_else(|| "./muster-data".to_string()),
        );

        let api_addr: SocketAddr = var("MUSTER_API_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8080".to_string())
            .parse()
            .map_err(|e| Error::Config(format!("MUSTER_API_ADDR: {}", e)))?;

        let admin_socket = var("MUSTER_ADMIN_SOCKET")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("admin.sock"));

        let administrator = var("MUSTER_ADMINISTRATOR")
            .map(|s| parse_principal(&s))
            .transpose()?;

        let overflow = match var("MUSTER_OVERFLOW") {
            Some(s) => s
                .parse::<OverflowPolicy>()
                .map_err(|e| Error::Config(format!("MUSTER_OVERFLOW: {}", e)))?,
            None => OverflowPolicy::default(),
        };

        Ok(Self {
            data_dir,
            api_addr,
            admin_socket,
            administrator,
            overflow,
        })
    }
}

/// A principal must be a hex-encoded 32-byte public key.
fn parse_principal(s: &str) -> Result<Principal> {
    let bytes = hex::decode(s.trim())
        .map_err(|e| Error::Config(format!("MUSTER_ADMINISTRATOR: {}", e)))?;
    if bytes.len() != 32 {
        return Err(Error::Config(format!(
            "MUSTER_ADMINISTRATOR: expected 32 bytes, got {}",
            bytes.len()
        )));
    }
    Ok(Principal::new(hex::encode(bytes)))
}

/// Shared state for the node - handed to API handlers and the admin socket.
pub struct NodeState {
    pub service: LedgerService,
    /// The node's own identity (used by the admin socket)
    pub node_principal: Principal,
    pub config: NodeConfig,
}

/// A Muster node instance.
pub struct MusterNode {
    state: Arc<NodeState>,
    config: NodeConfig,
}

impl MusterNode {
    /// Create a new node, loading the ledger from storage.
    pub async fn new(config: NodeConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;

        let storage = Arc::new(Storage::open(&config.data_dir)?);
        let node_key = storage.get_or_create_node_key()?;
        let node_principal = auth::principal_for(&node_key.verifying_key());

        let administrator = config
            .administrator
            .clone()
            .unwrap_or_else(|| node_principal.clone());
        let service = LedgerService::load(
            storage,
            administrator,
            LedgerConfig {
                overflow: config.overflow,
            },
        )?;

        let state = Arc::new(NodeState {
            service,
            node_principal,
            config: config.clone(),
        });

        Ok(Self { state, config })
    }

    /// Get the shared state (for API handlers).
    pub fn state(&self) -> Arc<NodeState> {
        Arc::clone(&self.state)
    }

    /// Run the node (starts HTTP server and admin socket).
    pub async fn run(self) -> Result<()> {
        tracing::info!("Muster node starting");
        tracing::info!("  API: http://{}", self.config.api_addr);
        tracing::info!("  Admin: {:?}", self.config.admin_socket);
        tracing::info!("  Data: {:?}", self.config.data_dir);
        tracing::info!("  Node identity: {}", self.state.node_principal);
        tracing::info!("  Administrator: {}", self.state.service.administrator());
        tracing::info!("  Overflow policy: {:?}", self.config.overflow);

        let admin_socket = AdminSocket::new(self.state(), self.config.admin_socket.clone());
        tokio::spawn(async move {
            if let Err(e) = admin_socket.run().await {
                tracing::error!("Admin socket error: {}", e);
            }
        });

        let app = api::build_router(self.state());

        let listener = tokio::net::TcpListener::bind(self.config.api_addr).await?;
        tracing::info!("HTTP server listening on {}", self.config.api_addr);

        axum::serve(listener, app).await?;

        Ok(())
    }
}
