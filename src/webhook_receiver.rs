//! alertmanager webhook endpoint driving the remediation pipeline
use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, Extension, Json},
    http::StatusCode,
    routing::post,
    Router,
};
use once_cell::sync::Lazy;
use prometheus::{IntCounter, IntCounterVec};
use serde::Deserialize;

use crate::{alert::AlertBatch, heal::HealDispatcher, settings::Settings};

static RECEIVED_BATCHES: Lazy<IntCounterVec> = Lazy::new(|| {
    use prometheus::{opts, register_int_counter_vec};

    register_int_counter_vec!(
        opts!("received_batches", "total number of received webhook batches")
            .namespace("remediator")
            .subsystem("webhook"),
        &["status"]
    )
    .expect("failed to register batch counter")
});

static REJECTED_PAYLOADS: Lazy<IntCounter> = Lazy::new(|| {
    use prometheus::{opts, register_int_counter};

    register_int_counter!(opts!(
        "rejected_payloads",
        "total number of webhook bodies that failed to deserialize"
    )
    .namespace("remediator")
    .subsystem("webhook"))
    .expect("failed to register rejection counter")
});

#[derive(Debug, Deserialize, Clone)]
pub struct WebhookReceiverSettings {
    pub bind_address: IpAddr,
    pub port: u16,
}

impl WebhookReceiverSettings {
    pub fn global() -> &'static Self {
        &Settings::global().webhook_receiver
    }

    pub fn to_socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }
}

struct State {
    dispatcher: HealDispatcher,
}

/// `POST /webhook`
///
/// A well-formed batch runs the whole pipeline on this request's task and
/// always answers `200`, whatever the individual restarts did. A body that
/// fails to deserialize answers `400` without touching the pipeline.
async fn webhook(
    Extension(state): Extension<Arc<State>>,
    batch: Result<Json<AlertBatch>, JsonRejection>,
) -> StatusCode {
    match batch {
        Ok(Json(batch)) => {
            RECEIVED_BATCHES
                .with_label_values(&[batch.status.as_str()])
                .inc();

            state.dispatcher.dispatch(batch).await;
            StatusCode::OK
        }
        Err(err) => {
            REJECTED_PAYLOADS.inc();
            tracing::debug!("failed to deserialize alert batch: {:?}", err);
            StatusCode::BAD_REQUEST
        }
    }
}

/// build the router for one receiver instance
///
/// Explicitly constructed so tests can run any number of independent
/// receivers without shared registration state.
pub fn app(dispatcher: HealDispatcher) -> Router {
    let state = Arc::new(State { dispatcher });

    Router::new()
        .route("/webhook", post(webhook))
        .layer(Extension(state))
}

pub async fn run_webhook_receiver(dispatcher: HealDispatcher) -> Result<()> {
    let addr = WebhookReceiverSettings::global().to_socket_addr();

    axum::Server::bind(&addr)
        .serve(app(dispatcher).into_make_service())
        .await
        .context("webhook endpoint crashed")?;

    Ok(())
}
