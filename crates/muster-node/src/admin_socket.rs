//! Unix socket server for admin commands.
//!
//! Local IPC for the muster-admin CLI. Commands act as the node's own
//! identity, which is the ledger administrator unless one was configured.

use crate::auth::Caller;
use crate::error::{Error, Result};
use crate::node::NodeState;
use muster_ledger::{GatheringId, GatheringParams};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};

/// Admin command sent over the socket.
#[derive(Debug, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum AdminCommand {
    /// Register or update a partner network
    RegisterPartner { tag: String, multiplier: u32 },
    /// Create a gathering
    CreateGathering {
        title: String,
        scheduled_at: u64,
        capacity: u32,
        base_points: u64,
        #[serde(default)]
        network_tags: Vec<String>,
    },
    /// Show a gathering
    GetGathering { id: GatheringId },
    /// Show a partner network
    GetPartner { tag: String },
    /// Ledger counters
    Stats,
    /// Node identity and administrator
    Whoami,
    /// Ping (health check)
    Ping,
}

/// Response from admin command.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AdminResponse {
    Ok { message: String },
    Error { error: String, code: Option<u32> },
    Record { value: serde_json::Value },
    Pong,
}

impl AdminResponse {
    fn failed(e: Error) -> Self {
        let code = match &e {
            Error::Ledger(e) => Some(e.code()),
            _ => None,
        };
        AdminResponse::Error {
            error: e.to_string(),
            code,
        }
    }

    fn record<T: Serialize>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => AdminResponse::Record { value },
            Err(e) => AdminResponse::failed(e.into()),
        }
    }
}

/// Admin socket server.
pub struct AdminSocket {
    state: Arc<NodeState>,
    socket_path: PathBuf,
}

impl AdminSocket {
    /// Create a new admin socket server.
    pub fn new(state: Arc<NodeState>, socket_path: PathBuf) -> Self {
        Self { state, socket_path }
    }

    /// Run the admin socket server.
    pub async fn run(&self) -> Result<()> {
        // Remove existing socket file if present
        let _ = std::fs::remove_file(&self.socket_path);

        let listener = UnixListener::bind(&self.socket_path)?;
        tracing::info!("Admin socket listening on {:?}", self.socket_path);

        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, state).await {
                            tracing::error!("Admin connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    tracing::error!("Failed to accept admin connection: {}", e);
                }
            }
        }
    }
}

async fn handle_connection(stream: UnixStream, state: Arc<NodeState>) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    while reader.read_line(&mut line).await? > 0 {
        let response = match serde_json::from_str::<AdminCommand>(&line) {
            Ok(cmd) => execute_command(cmd, &state).await,
            Err(e) => AdminResponse::Error {
                error: format!("Invalid command: {}", e),
                code: None,
            },
        };

        let response_json = serde_json::to_string(&response)? + "\n";
        writer.write_all(response_json.as_bytes()).await?;
        line.clear();
    }

    Ok(())
}

/// Run one command as the node identity.
pub async fn execute_command(cmd: AdminCommand, state: &NodeState) -> AdminResponse {
    let me = &state.node_principal;
    let local = Caller::local(me.clone());

    match cmd {
        AdminCommand::RegisterPartner { tag, multiplier } => {
            match state.service.register_partner(&local, &tag, multiplier).await {
                Ok(tag) => AdminResponse::Ok {
                    message: format!("Registered partner {} (multiplier {})", tag, multiplier),
                },
                Err(e) => AdminResponse::failed(e),
            }
        }

        AdminCommand::CreateGathering {
            title,
            scheduled_at,
            capacity,
            base_points,
            network_tags,
        } => {
            let params = GatheringParams {
                title,
                scheduled_at,
                capacity,
                base_points,
                network_tags,
            };
            match state.service.create_gathering(&local, params).await {
                Ok(id) => AdminResponse::Ok {
                    message: format!("Created gathering {}", id),
                },
                Err(e) => AdminResponse::failed(e),
            }
        }

        AdminCommand::GetGathering { id } => match state.service.gathering(id).await {
            Some(gathering) => AdminResponse::record(&gathering),
            None => AdminResponse::failed(
                muster_ledger::LedgerError::NotFound(format!("gathering {}", id)).into(),
            ),
        },

        AdminCommand::GetPartner { tag } => match state.service.partner(&tag).await {
            Some(partner) => AdminResponse::record(&partner),
            None => AdminResponse::failed(
                muster_ledger::LedgerError::NotFound(format!("partner {}", tag)).into(),
            ),
        },

        AdminCommand::Stats => AdminResponse::record(&state.service.stats().await),

        AdminCommand::Whoami => AdminResponse::record(&serde_json::json!({
            "node": me,
            "administrator": state.service.administrator(),
            "is_administrator": me == state.service.administrator(),
        })),

        AdminCommand::Ping => AdminResponse::Pong,
    }
}
