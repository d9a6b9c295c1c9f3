//! Start/stop/verify lifecycle around the router.
//!
//! # Design
//! `start` binds the listener and serves on a spawned tokio task with a
//! graceful-shutdown signal. `stop` fires the signal and waits a bounded time
//! for the task before aborting it. Dropping a running server fires the
//! signal and aborts the task, so a failing test still releases its port.
//! Neither path touches the provider lock, so stopping never waits on
//! verification or vice versa.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use mockhttp_core::{
    Expectation, ExpectedResponseProvider, FullHttpRequest, HttpResponse, RequestError,
    SimpleResponseProvider, UnsatisfiedExpectationError,
};
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};
use tracing::{info, warn};

use crate::error::ServerError;
use crate::{app, default_fallback};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

struct Running {
    addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<Result<(), std::io::Error>>,
}

/// Mock HTTP server answering from a provider of expected responses.
pub struct MockHttpServer<P: ExpectedResponseProvider + 'static = SimpleResponseProvider> {
    provider: Arc<P>,
    fallback: HttpResponse,
    running: Option<Running>,
}

impl MockHttpServer {
    /// Server with an empty provider using the default policy.
    pub fn new() -> Self {
        Self::with_provider(Arc::new(SimpleResponseProvider::new()))
    }

    /// Expects `pattern`, answered by `response`. See
    /// [`SimpleResponseProvider::register`].
    pub fn register(&self, pattern: impl Into<FullHttpRequest>, response: HttpResponse) -> &Self {
        self.provider.register(pattern, response);
        self
    }

    pub fn register_sequence(
        &self,
        pattern: impl Into<FullHttpRequest>,
        responses: impl IntoIterator<Item = HttpResponse>,
    ) -> Result<&Self, RequestError> {
        self.provider.register_sequence(pattern, responses)?;
        Ok(self)
    }

    pub fn expect(&self, expectation: Expectation) -> Result<&Self, RequestError> {
        self.provider.expect(expectation)?;
        Ok(self)
    }
}

impl Default for MockHttpServer {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: ExpectedResponseProvider + 'static> MockHttpServer<P> {
    pub fn with_provider(provider: Arc<P>) -> Self {
        Self {
            provider,
            fallback: default_fallback(),
            running: None,
        }
    }

    /// Replaces the response served to requests no expectation answers.
    pub fn with_fallback(mut self, fallback: HttpResponse) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    /// Binds `127.0.0.1:port` (`0` picks a free port) and starts serving.
    pub async fn start(&mut self, port: u16) -> Result<SocketAddr, ServerError> {
        if let Some(running) = &self.running {
            return Err(ServerError::AlreadyRunning(running.addr));
        }

        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let addr = listener.local_addr()?;

        let router = app(self.provider.clone(), self.fallback.clone());
        let (shutdown, signal) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = signal.await;
                })
                .await
        });

        info!(%addr, "mock server listening");
        self.running = Some(Running { addr, shutdown, task });
        Ok(addr)
    }

    /// Stops serving and releases the port. Does nothing if not running.
    pub async fn stop(&mut self) -> Result<(), ServerError> {
        let Some(Running {
            addr,
            shutdown,
            mut task,
        }) = self.running.take()
        else {
            return Ok(());
        };

        let _ = shutdown.send(());
        match tokio::time::timeout(SHUTDOWN_GRACE, &mut task).await {
            Ok(joined) => joined??,
            Err(_) => {
                warn!(%addr, "graceful shutdown timed out, aborting");
                task.abort();
            }
        }
        info!(%addr, "mock server stopped");
        Ok(())
    }

    /// Checks the provider's expectations. Call at the end of the test.
    pub fn verify(&self) -> Result<(), UnsatisfiedExpectationError> {
        self.provider.verify()
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.addr)
    }

    /// `http://127.0.0.1:{port}` of the running server.
    pub fn uri(&self) -> Option<String> {
        self.local_addr().map(|addr| format!("http://{addr}"))
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }
}

impl<P: ExpectedResponseProvider + 'static> Drop for MockHttpServer<P> {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            let _ = running.shutdown.send(());
            running.task.abort();
        }
    }
}
