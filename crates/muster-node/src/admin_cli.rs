//! muster-admin CLI tool
//!
//! Administers a running muster-node over its local admin socket.
//!
//! Usage:
//!   muster-admin register-partner <tag> <multiplier>
//!   muster-admin create-gathering <title> <scheduled_at> <capacity> <base_points> [tags...]
//!   muster-admin gathering <id>
//!   muster-admin partner <tag>
//!   muster-admin stats
//!   muster-admin whoami
//!   muster-admin ping

use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::str::FromStr;

/// Admin command sent over the socket.
#[derive(Debug, Serialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
enum AdminCommand {
    RegisterPartner {
        tag: String,
        multiplier: u32,
    },
    CreateGathering {
        title: String,
        scheduled_at: u64,
        capacity: u32,
        base_points: u64,
        network_tags: Vec<String>,
    },
    GetGathering {
        id: u64,
    },
    GetPartner {
        tag: String,
    },
    Stats,
    Whoami,
    Ping,
}

/// Response from admin command.
#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum AdminResponse {
    Ok { message: String },
    Error { error: String, code: Option<u32> },
    Record { value: serde_json::Value },
    Pong,
}

fn print_usage() {
    eprintln!("muster-admin - Administer a Muster node");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  muster-admin register-partner <tag> <multiplier>   Register or update a partner network");
    eprintln!("  muster-admin create-gathering <title> <scheduled_at> <capacity> <base_points> [tags...]");
    eprintln!("                                                     Create a gathering");
    eprintln!("  muster-admin gathering <id>                        Show a gathering");
    eprintln!("  muster-admin partner <tag>                         Show a partner network");
    eprintln!("  muster-admin stats                                 Ledger counters");
    eprintln!("  muster-admin whoami                                Node identity and administrator");
    eprintln!("  muster-admin ping                                  Check if daemon is running");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  MUSTER_SOCKET  Path to admin socket (default: ./muster-data/admin.sock)");
}

fn socket_path() -> PathBuf {
    match std::env::var_os("MUSTER_SOCKET") {
        Some(path) => PathBuf::from(path),
        None => PathBuf::from("./muster-data/admin.sock"),
    }
}

/// One request, one reply line.
fn request(cmd: &AdminCommand) -> Result<AdminResponse, String> {
    let path = socket_path();
    let stream = UnixStream::connect(&path).map_err(|e| {
        format!("Cannot reach muster-node at {}: {}\nIs the muster-node running?", path.display(), e)
    })?;

    let mut line = serde_json::to_string(cmd).map_err(|e| e.to_string())?;
    line.push('\n');
    (&stream).write_all(line.as_bytes()).map_err(|e| e.to_string())?;

    let mut reply = String::new();
    BufReader::new(&stream)
        .read_line(&mut reply)
        .map_err(|e| e.to_string())?;
    if reply.is_empty() {
        return Err("muster-node closed the connection without replying".into());
    }

    serde_json::from_str(&reply).map_err(|e| format!("Invalid response: {}", e))
}

/// Print a reply and return the process exit code.
fn report(response: AdminResponse) -> i32 {
    match response {
        AdminResponse::Ok { message } => {
            println!("{}", message);
            0
        }
        AdminResponse::Record { value } => {
            match serde_json::to_string_pretty(&value) {
                Ok(pretty) => println!("{}", pretty),
                Err(_) => println!("{}", value),
            }
            0
        }
        AdminResponse::Pong => {
            println!("pong - muster-node is running");
            0
        }
        AdminResponse::Error { error, code: Some(code) } => {
            eprintln!("Error [{}]: {}", code, error);
            1
        }
        AdminResponse::Error { error, code: None } => {
            eprintln!("Error: {}", error);
            1
        }
    }
}

fn fail(message: &str) -> ! {
    eprintln!("Error: {}", message);
    std::process::exit(1);
}

/// Fetch positional argument `i`, exiting with a usage error when absent.
fn arg<'a>(args: &'a [String], i: usize, command: &str, name: &str) -> &'a str {
    match args.get(i) {
        Some(a) => a.as_str(),
        None => fail(&format!("{} requires a {} argument", command, name)),
    }
}

fn number<T: FromStr>(args: &[String], i: usize, command: &str, name: &str) -> T {
    let raw = arg(args, i, command, name);
    match raw.parse() {
        Ok(n) => n,
        Err(_) => fail(&format!("{} must be a non-negative integer, got {:?}", name, raw)),
    }
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let Some(subcommand) = args.get(1) else {
        print_usage();
        std::process::exit(1);
    };

    let cmd = match subcommand.as_str() {
        "register-partner" => AdminCommand::RegisterPartner {
            tag: arg(&args, 2, "register-partner", "tag").to_string(),
            multiplier: number(&args, 3, "register-partner", "multiplier"),
        },
        "create-gathering" => AdminCommand::CreateGathering {
            title: arg(&args, 2, "create-gathering", "title").to_string(),
            scheduled_at: number(&args, 3, "create-gathering", "scheduled_at"),
            capacity: number(&args, 4, "create-gathering", "capacity"),
            base_points: number(&args, 5, "create-gathering", "base_points"),
            network_tags: args.iter().skip(6).cloned().collect(),
        },
        "gathering" => AdminCommand::GetGathering {
            id: number(&args, 2, "gathering", "id"),
        },
        "partner" => AdminCommand::GetPartner {
            tag: arg(&args, 2, "partner", "tag").to_string(),
        },
        "stats" => AdminCommand::Stats,
        "whoami" => AdminCommand::Whoami,
        "ping" => AdminCommand::Ping,
        "-h" | "--help" | "help" => {
            print_usage();
            std::process::exit(0);
        }
        other => {
            eprintln!("Unknown command: {}", other);
            print_usage();
            std::process::exit(1);
        }
    };

    let code = match request(&cmd) {
        Ok(response) => report(response),
        Err(e) => {
            eprintln!("{}", e);
            1
        }
    };
    std::process::exit(code);
}
