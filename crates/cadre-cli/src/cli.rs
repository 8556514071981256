//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "cadre", version, about = "Cooperating network daemons")]
pub struct Cli {
    /// Path to a TOML config file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a director: register agents, heartbeat them, coordinate
    /// fleet-wide shutdown.
    Director {
        /// Agent name, overriding the config file.
        #[arg(long)]
        name: Option<String>,
        /// Address to listen on.
        #[arg(long)]
        bind: Option<String>,
        /// Port to listen on.
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run an ordinary agent, registered with a director.
    Agent {
        #[arg(long)]
        name: Option<String>,
        /// Address to listen on, when the agent should accept peers.
        #[arg(long)]
        bind: Option<String>,
        #[arg(long)]
        port: Option<u16>,
        /// Director to register with, as host:port.
        #[arg(long)]
        director: Option<String>,
    },
    /// Ask a running agent to shut down (a director shuts down its
    /// whole fleet).
    Shutdown {
        /// Target agent, as host:port.
        target: String,
    },
    /// Query a running agent's status.
    Status {
        /// Target agent, as host:port.
        target: String,
    },
}
