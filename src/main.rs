use anyhow::Context;
use prebep_index::{api, config, logging, pipeline::IntakePipeline};
use std::io::{Error, ErrorKind};
use std::net::Ipv4Addr;
use std::ops::RangeInclusive;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Ports tried in order when `SERVER_PORT` is not set.
const FALLBACK_PORTS: RangeInclusive<u16> = 4100..=4199;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_tracing();
    let config = config::init_config().context("Failed to load configuration")?;
    let pipeline = IntakePipeline::from_config(config)
        .context("Failed to initialize summarization client")?;
    let app = api::create_router(Arc::new(pipeline), config.max_upload_bytes);

    let (listener, port) = bind_listener(config.server_port)
        .await
        .context("Failed to bind listener")?;
    tracing::info!(
        port,
        staging_dir = %config.staging_dir.display(),
        export_dir = %config.export_dir.display(),
        "Listening on http://0.0.0.0:{port}"
    );
    axum::serve(listener, app).await.context("HTTP server stopped")?;
    Ok(())
}

/// Bind the configured port, or the first free port in [`FALLBACK_PORTS`].
async fn bind_listener(configured: Option<u16>) -> Result<(TcpListener, u16), Error> {
    if let Some(port) = configured {
        let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await?;
        return Ok((listener, port));
    }

    for port in FALLBACK_PORTS {
        match TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await {
            Ok(listener) => return Ok((listener, port)),
            Err(err) if err.kind() == ErrorKind::AddrInUse => {
                tracing::debug!(port, "Port already in use; trying next");
            }
            Err(err) => return Err(err),
        }
    }

    Err(Error::new(
        ErrorKind::AddrNotAvailable,
        format!(
            "No available port found in range {}-{}",
            FALLBACK_PORTS.start(),
            FALLBACK_PORTS.end()
        ),
    ))
}
