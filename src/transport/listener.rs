use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};

use crate::error::Result;
use crate::protocol::{self, Dispatcher, Services};
use crate::transport::connection::{serve_connection, ListenerRole};

/// Run both listeners until CTRL+C.
#[instrument(skip_all)]
pub async fn start_server(services: Services) -> Result<()> {
    let (bucp_tx, bucp_rx) = mpsc::channel::<()>(1);
    let (bos_tx, bos_rx) = mpsc::channel::<()>(1);

    tokio::spawn(async move {
        if let Ok(()) = tokio::signal::ctrl_c().await {
            info!("Received CTRL+C signal, shutting down");
            let _ = bucp_tx.send(()).await;
            let _ = bos_tx.send(()).await;
        }
    });

    start_server_with_shutdown(services, bucp_rx, bos_rx).await
}

/// Run both listeners with external shutdown channels, one per listener.
pub async fn start_server_with_shutdown(
    services: Services,
    bucp_shutdown: mpsc::Receiver<()>,
    bos_shutdown: mpsc::Receiver<()>,
) -> Result<()> {
    let bucp = start_listener_with_shutdown(
        ListenerRole::Bucp,
        services.clone(),
        protocol::bucp_dispatcher()?,
        bucp_shutdown,
    );
    let bos = start_listener_with_shutdown(
        ListenerRole::Bos,
        services.clone(),
        protocol::bos_dispatcher()?,
        bos_shutdown,
    );

    tokio::try_join!(bucp, bos)?;
    services.metrics.log_metrics();
    Ok(())
}

/// Bind the configured address for `role` and serve it.
pub async fn start_listener_with_shutdown(
    role: ListenerRole,
    services: Services,
    dispatcher: Dispatcher,
    shutdown_rx: mpsc::Receiver<()>,
) -> Result<()> {
    let address = match role {
        ListenerRole::Bucp => services.config.bucp_address.clone(),
        ListenerRole::Bos => services.config.bos_address.clone(),
    };

    let listener = TcpListener::bind(&address).await?;
    info!(role = %role, address = %address, "Listening");

    serve_listener(listener, role, services, dispatcher, shutdown_rx).await
}

/// Accept loop over an already bound listener. Each connection runs on its
/// own task.
#[instrument(skip(listener, services, dispatcher, shutdown_rx))]
pub async fn serve_listener(
    listener: TcpListener,
    role: ListenerRole,
    services: Services,
    dispatcher: Dispatcher,
    mut shutdown_rx: mpsc::Receiver<()>,
) -> Result<()> {
    // Track active connections
    let active_connections = Arc::new(AtomicUsize::new(0));

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                info!("Shutting down listener. Waiting for connections to close...");
                wait_for_drain(&active_connections, services.config.shutdown_timeout).await;
                return Ok(());
            }

            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer)) => {
                        let guard = ConnectionGuard::new(active_connections.clone());
                        let services = services.clone();
                        let dispatcher = dispatcher.clone();

                        tokio::spawn(async move {
                            let _guard = guard;
                            debug!(peer = %peer, "Connection accepted");
                            if let Err(e) = serve_connection(stream, role, services, dispatcher).await {
                                debug!(peer = %peer, error = %e, "Connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "Error accepting connection");
                    }
                }
            }
        }
    }
}

/// Counts a connection as active until dropped, including when its task
/// panics or is aborted.
struct ConnectionGuard(Arc<AtomicUsize>);

impl ConnectionGuard {
    fn new(active: Arc<AtomicUsize>) -> Self {
        active.fetch_add(1, Ordering::SeqCst);
        Self(active)
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

async fn wait_for_drain(active_connections: &AtomicUsize, timeout: Duration) {
    let timeout = tokio::time::sleep(timeout);
    tokio::pin!(timeout);

    loop {
        tokio::select! {
            _ = &mut timeout => {
                warn!("Shutdown timeout reached, forcing exit");
                break;
            }
            _ = tokio::time::sleep(Duration::from_millis(500)) => {
                let connections = active_connections.load(Ordering::SeqCst);
                info!(connections = %connections, "Waiting for connections to close");
                if connections == 0 {
                    info!("All connections closed, shutting down");
                    break;
                }
            }
        }
    }
}
