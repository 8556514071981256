//! `cadre` — run and control cooperating network daemons.

mod cli;

use anyhow::{bail, Context as _};
use cadre_agent::bootstrap::{
    build_agent, build_director, build_shutdown_command, build_status_command,
};
use cadre_agent::jobs::ControlOutcome;
use cadre_agent::{load_config, AgentConfig};
use cadre_wire::AgentIdentity;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Cli::parse();
    let mut config = load_config(args.config.as_deref());

    match args.command {
        Commands::Director { name, bind, port } => {
            apply_identity(&mut config, name, bind, port);
            if config.identity.addr().is_none() {
                bail!("a director needs a bind address: pass --bind and --port");
            }
            let mut reactor = build_director(config).await?;
            info!(addr = ?reactor.local_addr(), "director starting");
            reactor.run().await?;
        }
        Commands::Agent { name, bind, port, director } => {
            apply_identity(&mut config, name, bind, port);
            if let Some(director) = director {
                let (host, port) = parse_target(&director)?;
                config.director = Some(AgentIdentity::with_addr("director", host, port));
            }
            if config.director.is_none() {
                bail!("an agent needs a director: pass --director host:port");
            }
            let mut reactor = build_agent(config).await?;
            reactor.run().await?;
        }
        Commands::Shutdown { target } => {
            let (host, port) = parse_target(&target)?;
            let target = AgentIdentity::with_addr("target", host, port);
            config.identity = AgentIdentity::new("shutdown-command");
            config.director = None;
            let (mut reactor, outcome) = build_shutdown_command(config, target).await?;
            reactor.run().await?;
            match outcome.await {
                Ok(ControlOutcome::Acknowledged) => println!("shutdown acknowledged"),
                Ok(ControlOutcome::Denied) => bail!("shutdown denied"),
                Ok(ControlOutcome::ConnectFailed) => bail!("could not reach the target"),
                Ok(other) => bail!("unexpected answer: {other:?}"),
                Err(_) => bail!("the command never completed"),
            }
        }
        Commands::Status { target } => {
            let (host, port) = parse_target(&target)?;
            let target = AgentIdentity::with_addr("target", host, port);
            config.identity = AgentIdentity::new("status-command");
            config.director = None;
            let (mut reactor, outcome) = build_status_command(config, target).await?;
            reactor.run().await?;
            match outcome.await {
                Ok(ControlOutcome::Status(report)) => {
                    println!("agent:   {}", report.identity);
                    println!("state:   {}", report.state);
                    if !report.details.is_empty() {
                        println!("details: {}", report.details);
                    }
                    if !report.agents.is_empty() {
                        println!("fleet:");
                        for agent in &report.agents {
                            println!("  - {agent}");
                        }
                    }
                }
                Ok(ControlOutcome::Denied) => bail!("status denied"),
                Ok(ControlOutcome::ConnectFailed) => bail!("could not reach the target"),
                Ok(other) => bail!("unexpected answer: {other:?}"),
                Err(_) => bail!("the command never completed"),
            }
        }
    }
    Ok(())
}

fn apply_identity(
    config: &mut AgentConfig,
    name: Option<String>,
    bind: Option<String>,
    port: Option<u16>,
) {
    if let Some(name) = name {
        config.identity.name = name;
    }
    if let Some(bind) = bind {
        config.identity.host = Some(bind);
    }
    if let Some(port) = port {
        config.identity.port = Some(port);
    }
}

fn parse_target(target: &str) -> anyhow::Result<(&str, u16)> {
    let (host, port) = target
        .rsplit_once(':')
        .with_context(|| format!("`{target}` is not host:port"))?;
    let port = port.parse().with_context(|| format!("`{port}` is not a port number"))?;
    Ok((host, port))
}
