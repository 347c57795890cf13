//! Server instances with an explicit start/stop lifecycle.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::{HttpServerConfig, WsServerConfig};
use crate::error::{FixtureLoadError, ServerError};
use crate::playbook::{HttpFixture, Playbook};
use crate::{http, ws};

/// A bound, running server.
#[derive(Debug)]
pub struct ServerHandle {
    name: &'static str,
    local_addr: SocketAddr,
    shutdown: CancellationToken,
    task: JoinHandle<std::io::Result<()>>,
}

impl ServerHandle {
    /// Address actually bound (resolves port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections, end live sessions and wait for the server task.
    pub async fn stop(self) -> Result<(), ServerError> {
        info!("Stopping {} server on {}", self.name, self.local_addr);
        self.shutdown.cancel();
        self.task.await?.map_err(ServerError::Serve)
    }
}

async fn spawn_server(
    name: &'static str,
    host: &str,
    port: u16,
    router: Router,
    shutdown: CancellationToken,
) -> Result<ServerHandle, ServerError> {
    let bind_error = |source| ServerError::Bind {
        addr: format!("{host}:{port}"),
        source,
    };
    let listener = TcpListener::bind((host, port)).await.map_err(bind_error)?;
    let local_addr = listener.local_addr().map_err(bind_error)?;

    info!("Starting {} server on {}", name, local_addr);

    let signal = shutdown.clone().cancelled_owned();
    let task = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(signal)
            .await
    });

    Ok(ServerHandle {
        name,
        local_addr,
        shutdown,
        task,
    })
}

/// WebSocket playback server. The playbook is loaded on construction, so a
/// broken fixture fails before anything binds.
#[derive(Debug)]
pub struct WsServer {
    config: WsServerConfig,
    playbook: Arc<Playbook>,
    shutdown: CancellationToken,
}

impl WsServer {
    pub fn new(config: WsServerConfig) -> Result<Self, FixtureLoadError> {
        let playbook = Playbook::load(&config.fixture)?;
        info!(
            "Loaded playbook from {} ({} init, {} room_msgs)",
            config.fixture.display(),
            playbook.init().len(),
            playbook.room_msgs().len()
        );
        Ok(Self::with_playbook(config, playbook))
    }

    /// Use an already parsed playbook; `config.fixture` is ignored.
    pub fn with_playbook(config: WsServerConfig, playbook: Playbook) -> Self {
        Self {
            config,
            playbook: Arc::new(playbook),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn playbook(&self) -> &Playbook {
        &self.playbook
    }

    pub fn router(&self) -> Router {
        ws::router(ws::WsState::new(
            Arc::clone(&self.playbook),
            self.config.match_policy,
            self.shutdown.clone(),
        ))
    }

    pub async fn start(self) -> Result<ServerHandle, ServerError> {
        let router = self.router();
        spawn_server(
            "websocket",
            &self.config.host,
            self.config.port,
            router,
            self.shutdown,
        )
        .await
    }
}

/// Static HTTP endpoint. The fixture is read once on construction.
#[derive(Debug)]
pub struct HttpServer {
    config: HttpServerConfig,
    fixture: Arc<HttpFixture>,
}

impl HttpServer {
    pub fn new(config: HttpServerConfig) -> Result<Self, FixtureLoadError> {
        let fixture = HttpFixture::load(&config.fixture)?;
        info!(
            "Loaded HTTP fixture from {} ({} bytes)",
            fixture.path().display(),
            fixture.body().len()
        );
        Ok(Self {
            config,
            fixture: Arc::new(fixture),
        })
    }

    pub fn router(&self) -> Router {
        http::router(Arc::clone(&self.fixture))
    }

    pub async fn start(self) -> Result<ServerHandle, ServerError> {
        let router = self.router();
        spawn_server(
            "http",
            &self.config.host,
            self.config.port,
            router,
            CancellationToken::new(),
        )
        .await
    }
}
