// Server module entry point
// Socket binding, the accept loop, and per-connection handling

pub mod connection;
pub mod listener;

use crate::config::Config;
use crate::cors::CorsLayer;
use crate::logger;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Shared per-server state: configuration plus the prebuilt CORS layer
pub struct ServerState {
    pub config: Config,
    pub cors: CorsLayer,
}

/// A bound file server instance
///
/// Binding and serving are separate steps: a bind failure surfaces before
/// any request is handled, and tests can bind port 0 on several instances
/// in-process and read the assigned addresses back.
pub struct Server {
    listener: TcpListener,
    state: Arc<ServerState>,
}

impl Server {
    /// Bind the listening socket for the configured address
    ///
    /// Fails if the port is in use or the process may not bind it; the
    /// caller is expected to treat that as fatal.
    pub fn bind(config: Config) -> io::Result<Self> {
        let addr = config
            .socket_addr()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let cors = CorsLayer::new(&config.cors)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let listener = listener::create_listener(addr)?;

        Ok(Self {
            listener,
            state: Arc::new(ServerState { config, cors }),
        })
    }

    /// The bound address, useful when the configured port was 0
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Run the accept loop forever
    ///
    /// There is no shutdown procedure; the loop ends only when the
    /// process is terminated.
    pub async fn serve(self) -> io::Result<()> {
        let active_connections = Arc::new(AtomicUsize::new(0));

        loop {
            match self.listener.accept().await {
                Ok((stream, peer_addr)) => {
                    connection::accept_connection(
                        stream,
                        peer_addr,
                        &self.state,
                        &active_connections,
                    );
                }
                Err(e) => {
                    logger::log_error(&format!("Failed to accept connection: {e}"));
                }
            }
        }
    }
}
