pub mod config;
pub mod page;
pub mod routes;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::errors::AppError;
use crate::pem_decoder::{DecodeEngine, LogSink};
pub use config::ServerConfig;
pub use routes::AppState;

const LOG_TARGET: &str = "pemview/server";
/// How long open connections get to finish after shutdown starts.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(15);

/// Bind the configured address and serve until `shutdown` resolves.
pub async fn serve(config: ServerConfig, shutdown: impl Future<Output = ()>) -> Result<(), AppError> {
    let listener = TcpListener::bind(config.addr).await.map_err(|err| {
        log::error!(target: LOG_TARGET, "failed to listen on {}: {err}", config.addr);
        AppError::from(err)
    })?;
    let engine = DecodeEngine::new(Arc::new(LogSink), config.engine_options());
    let state = Arc::new(AppState::new(engine, config));
    serve_listener(listener, state, shutdown).await
}

pub async fn serve_listener(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()>,
) -> Result<(), AppError> {
    let local = listener.local_addr()?;
    log::info!(target: LOG_TARGET, "server running on {local}");
    log::debug!(
        target: LOG_TARGET,
        "max request size {} bytes, chain {}, fingerprints {}",
        state.config.max_request_bytes,
        state.config.allow_chain,
        state.config.fingerprints
    );

    let token = CancellationToken::new();
    let tracker = TaskTracker::new();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                log::info!(target: LOG_TARGET, "server shutting down");
                break;
            }
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(conn) => conn,
                    Err(err) => {
                        log::warn!(target: LOG_TARGET, "accept failed: {err}");
                        continue;
                    }
                };
                let state = state.clone();
                let token = token.clone();
                tracker.spawn(async move {
                    let service = service_fn(move |req| routes::handle(state.clone(), req));
                    let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
                    tokio::pin!(conn);
                    let result = tokio::select! {
                        res = conn.as_mut() => res,
                        _ = token.cancelled() => {
                            conn.as_mut().graceful_shutdown();
                            conn.as_mut().await
                        }
                    };
                    if let Err(err) = result {
                        log::debug!(target: LOG_TARGET, "connection from {peer} ended: {err}");
                    }
                });
            }
        }
    }

    drop(listener);
    token.cancel();
    tracker.close();
    if tokio::time::timeout(SHUTDOWN_GRACE, tracker.wait()).await.is_err() {
        log::warn!(
            target: LOG_TARGET,
            "{} connection(s) still open after {}s, stopping anyway",
            tracker.len(),
            SHUTDOWN_GRACE.as_secs()
        );
    }
    Ok(())
}

/// Resolves on ctrl-c / SIGINT.
pub async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::error!(target: LOG_TARGET, "failed to listen for ctrl-c: {err}");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::{AppState, ServerConfig, serve_listener};
    use crate::pem_decoder::{DecodeEngine, NullSink};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn serves_until_shutdown() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let config = ServerConfig::default();
        let engine = DecodeEngine::new(Arc::new(NullSink), config.engine_options());
        let state = Arc::new(AppState::new(engine, config));
        let (stop, stopped) = oneshot::channel::<()>();
        let server = tokio::spawn(serve_listener(listener, state, async move {
            let _ = stopped.await;
        }));

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.contains("PEM viewer"));

        stop.send(()).unwrap();
        server.await.unwrap().unwrap();
    }
}
