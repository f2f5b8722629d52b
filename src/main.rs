//! alertmanager webhook receiver that remediates alerts by restarting containers
//!
//! Alerts whose `severity` label is `heal` name a container via their
//! `job` label; for each of them the service asks the container runtime
//! for a restart. Everything else is dropped silently. Concurrent
//! restarts of the same container are collapsed into one invocation.
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::{
    container::{ContainerRuntimeSettings, DockerCli},
    heal::HealDispatcher,
    restart_gate::RestartGate,
};

mod alert;
mod container;
mod heal;
mod log;
mod restart_gate;
mod settings;
mod telemetry_endpoint;
mod webhook_receiver;

/// exit the complete program if one thread panics
fn setup_panic_handler() {
    let default_panic = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        default_panic(info);
        std::process::exit(1);
    }));
}

/// the entry point of the program
#[tokio::main]
pub async fn main() -> Result<()> {
    setup_panic_handler();

    log::setup_logging().context("could not setup logging")?;

    let manager = Arc::new(DockerCli::new(
        ContainerRuntimeSettings::global().binary.clone(),
    ));
    let dispatcher = HealDispatcher::new(RestartGate::new(manager));

    tokio::spawn(async move {
        #[allow(clippy::expect_used)]
        webhook_receiver::run_webhook_receiver(dispatcher)
            .await
            .expect("webhook receiver endpoint failed to start or crashed");
    });

    telemetry_endpoint::run_telemetry_endpoint().await;

    Ok(())
}
