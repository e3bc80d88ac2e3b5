use anyhow::{bail, Context};
use pfcpsim::PfcpSimService;
use pfcpsim_config::{load_config, load_from_env, SimConfig};
use pfcpsim_proto::{AssociateRequest, CreateSessionRequest, DeleteSessionRequest};
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Config file is optional; PFCPSIM_* variables still apply through it
    let config = match std::env::var("PFCPSIM_CONFIG_FILE") {
        Ok(path) => load_config::<SimConfig>(&path)
            .with_context(|| format!("loading configuration from {path}"))?,
        Err(_) => load_from_env::<SimConfig>().context("loading configuration from environment")?,
    };

    // Initialize logging
    pfcpsim_logging::init_with_format(
        &config.log_level,
        config.log_format.parse().unwrap_or_default(),
    );

    // Register metrics
    pfcpsim_metrics::register_metrics().context("registering metrics")?;

    info!(
        service = %config.service_name,
        version = env!("CARGO_PKG_VERSION"),
        peer = %config.peer_address,
        "Starting PFCP simulator"
    );

    let plan = config.sessions.clone();
    let service = PfcpSimService::new(config);

    let response = service.associate(AssociateRequest::default()).await;
    if !response.is_ok() {
        bail!("association failed: {}", response.message);
    }

    if let Some(plan) = &plan {
        let response = service
            .create_session(CreateSessionRequest {
                count: plan.count,
                base_id: plan.base_id,
                gnb_address: plan.gnb_address.to_string(),
                ue_address_pool: plan.ue_address_pool.clone(),
                qfi: plan.qfi,
            })
            .await;
        if !response.is_ok() {
            warn!(message = %response.message, "Initial sessions not created");
        }
    }

    let signal = shutdown_signal().await.context("waiting for shutdown signal")?;
    info!(signal, "Shutdown requested");

    if let Some(plan) = &plan {
        if service.session_count() > 0 {
            service
                .delete_session(DeleteSessionRequest {
                    count: plan.count,
                    base_id: plan.base_id,
                })
                .await;
        }
    }
    let response = service.disassociate().await;
    if !response.is_ok() {
        warn!(message = %response.message, "Disassociation incomplete");
    }

    if let Ok(metrics) = pfcpsim_metrics::gather_metrics() {
        debug!(%metrics, "Final metrics");
    }
    info!("PFCP simulator stopped");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM where the platform has it
#[cfg(unix)]
async fn shutdown_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.map(|()| "SIGINT"),
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await.map(|()| "ctrl-c")
}
