// Server module - TCP acceptor with admission control and shutdown handling

pub mod admission;
pub mod connection;
pub mod signals;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};

use crate::config::ServerConfig;
use crate::store::PrefixStore;
use crate::whois::messages::OUT_OF_RESOURCES;
use admission::Admission;

/// How long one accept waits before the loop checks in again
const ACCEPT_TICK: Duration = Duration::from_secs(1);
/// Pause after an accept error other than a timeout
const ACCEPT_BACKOFF: Duration = Duration::from_millis(200);

/// The whois acceptor. Owns the admission ceiling and spawns one worker task
/// per admitted connection.
pub struct WhoisServer<S> {
    store: Arc<S>,
    admission: Admission,
    shutdown_grace: Duration,
}

impl<S: PrefixStore> WhoisServer<S> {
    pub fn new(store: Arc<S>, config: &ServerConfig) -> Self {
        WhoisServer {
            store,
            admission: Admission::new(config.max_connections, config.slot_wait()),
            shutdown_grace: config.shutdown_grace(),
        }
    }

    /// Accept connections until `shutdown` resolves, then give in-flight
    /// connections the grace period and return. Workers still running after
    /// that are abandoned.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            let accepted = tokio::select! {
                _ = &mut shutdown => break,
                accepted = tokio::time::timeout(ACCEPT_TICK, listener.accept()) => accepted,
            };

            match accepted {
                Err(_) => {
                    tracing::trace!(
                        "Timeout waiting for accept, active connections {}",
                        self.admission.active()
                    );
                }
                Ok(Err(e)) => {
                    tracing::error!("Error accepting connection: {}", e);
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
                Ok(Ok((stream, peer))) => self.dispatch(stream, peer).await,
            }
        }

        tracing::info!(
            "Shutting down, waiting {}ms for {} active connection(s)",
            self.shutdown_grace.as_millis(),
            self.admission.active()
        );
        tokio::time::sleep(self.shutdown_grace).await;
    }

    async fn dispatch(&self, mut stream: TcpStream, peer: SocketAddr) {
        tracing::info!("Accepted new connection from {}", peer);

        let Some(permit) = self.admission.admit().await else {
            tracing::warn!("{}: rejected, out of resources", peer);
            let _ = stream.write_all(OUT_OF_RESOURCES.as_bytes()).await;
            let _ = stream.shutdown().await;
            return;
        };

        let store = self.store.clone();
        tokio::spawn(async move {
            let client = peer.to_string();
            connection::handle_connection(stream, &client, store.as_ref()).await;
            drop(permit);
        });
    }
}
