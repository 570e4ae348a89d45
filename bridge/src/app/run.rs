//! Main application run loop

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::app::options::AppOptions;
use crate::app::state::AppState;
use crate::errors::BridgeError;
use crate::server::serve::serve;
use crate::server::state::ServerState;
use crate::workers::events;

/// How long workers get to finish after the shutdown signal
const MAX_SHUTDOWN_DELAY: Duration = Duration::from_secs(30);

/// Run the bridge
pub async fn run(
    options: AppOptions,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), BridgeError> {
    info!("Initializing bridge...");

    let (shutdown_tx, _shutdown_rx): (broadcast::Sender<()>, _) = broadcast::channel(1);

    let app_state = Arc::new(AppState::init(&options)?);

    let server_handle = if options.enable_socket_server {
        Some(init_socket_server(&options, app_state.clone(), shutdown_tx.subscribe()).await?)
    } else {
        None
    };

    let worker_handle = if options.enable_event_worker {
        Some(init_event_worker(&options, app_state.clone(), shutdown_tx.subscribe()))
    } else {
        None
    };

    // Wait for the shutdown signal
    shutdown_signal.await;
    info!("Shutdown signal received, shutting down...");
    drop(shutdown_tx);

    if let Some(handle) = server_handle {
        await_handle("server", handle).await;
    }
    if let Some(handle) = worker_handle {
        await_worker("event worker", handle).await;
    }

    info!("Bridge stopped.");
    Ok(())
}

async fn init_socket_server(
    options: &AppOptions,
    app_state: Arc<AppState>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<JoinHandle<Result<(), BridgeError>>, BridgeError> {
    info!("Initializing directive server...");

    let server_state = Arc::new(ServerState {
        router: app_state.router.clone(),
    });

    serve(&options.server, server_state, async move {
        let _ = shutdown_rx.recv().await;
    })
    .await
}

fn init_event_worker(
    options: &AppOptions,
    app_state: Arc<AppState>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    info!("Initializing event worker...");

    let worker_options = options.event_worker.clone();
    let translator = app_state.translator.clone();

    tokio::spawn(async move {
        events::run(
            &worker_options,
            translator,
            |wait| tokio::time::sleep(wait),
            Box::pin(async move {
                let _ = shutdown_rx.recv().await;
            }),
        )
        .await;
    })
}

async fn await_handle(name: &str, handle: JoinHandle<Result<(), BridgeError>>) {
    match tokio::time::timeout(MAX_SHUTDOWN_DELAY, handle).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => error!("{} exited with error: {}", name, e),
        Ok(Err(e)) => error!("{} task panicked: {}", name, e),
        Err(_) => warn!("{} did not stop within {:?}", name, MAX_SHUTDOWN_DELAY),
    }
}

async fn await_worker(name: &str, handle: JoinHandle<()>) {
    match tokio::time::timeout(MAX_SHUTDOWN_DELAY, handle).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("{} task panicked: {}", name, e),
        Err(_) => warn!("{} did not stop within {:?}", name, MAX_SHUTDOWN_DELAY),
    }
}
