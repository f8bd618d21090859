//! HTTP server with graceful shutdown

use axum::{
    response::{IntoResponse, Response},
    Router,
};
use std::any::Any;
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

use crate::{
    config::Config,
    error::{PanicCause, Result, StructuredError},
};

/// Server instance
#[derive(Debug, Clone)]
pub struct Server {
    config: Config,
}

impl Server {
    /// Create a new server instance
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Wrap `app` in the tracing and panic recovery layers
    ///
    /// A panic escaping a handler is answered with a `FATAL` error body.
    pub fn apply_layers(app: Router) -> Router {
        app.layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().include_headers(true))
                        .on_response(DefaultOnResponse::new().include_headers(true)),
                )
                // Innermost, so the trace layer records the recovered response
                .layer(CatchPanicLayer::custom(panic_response)),
        )
    }

    /// Run the server with the given router until SIGINT or SIGTERM
    pub async fn serve(self, app: Router) -> Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.service.port));
        let listener = TcpListener::bind(&addr).await?;
        self.serve_with_shutdown(listener, app, shutdown_signal())
            .await
    }

    /// Run the server on `listener` until `signal` completes
    pub async fn serve_with_shutdown<F>(
        self,
        listener: TcpListener,
        app: Router,
        signal: F,
    ) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(
            service = %self.config.service.name,
            environment = %self.config.service.environment,
            %addr,
            "server listening"
        );

        axum::serve(listener, Self::apply_layers(app))
            .with_graceful_shutdown(signal)
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let cause = PanicCause::from_payload(payload.as_ref());
    StructuredError::fatal("http_handler", cause.0).into_response()
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl+C), starting graceful shutdown");
        },
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }

    tracing::info!("Shutdown signal received, draining requests...");
}
