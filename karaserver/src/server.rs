//! # Module Server - API de haut niveau pour Axum
//!
//! Ce module cache la composition du routage Axum derrière quelques
//! méthodes d'ajout :
//!
//! - **Routers** : montez un sous-router avec `add_router()`
//! - **Handlers avec état** : SSE, dump JSON, etc. avec `add_handler_with_state()`
//! - **Documentation API** : OpenAPI/Swagger automatique avec `add_openapi()`
//! - **Arrêt gracieux** : sur Ctrl+C ou via `shutdown()`

use crate::logs::{
    LogState, LoggingOptions, LogsApiDoc, create_logs_router, init_logging, log_dump, log_sse,
};
use anyhow::{Context, Result};
use axum::Router;
use axum::handler::Handler;
use axum::routing::get;
use karaconfig::get_config;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::{signal, sync::RwLock, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

const DEFAULT_SERVER_NAME: &str = "Karaoke-Manager";

/// Serveur principal
pub struct Server {
    name: String,
    base_url: String,
    http_port: u16,
    router: Arc<RwLock<Router>>,
    join_handle: Option<JoinHandle<()>>,
    shutdown: CancellationToken,
}

impl Server {
    /// Crée une nouvelle instance de serveur
    ///
    /// # Arguments
    ///
    /// * `name` - Nom du serveur (pour les logs)
    /// * `base_url` - Adresse d'écoute (ex: "127.0.0.1")
    /// * `http_port` - Port HTTP à écouter (0 pour un port libre)
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, http_port: u16) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            http_port,
            router: Arc::new(RwLock::new(Router::new())),
            join_handle: None,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn new_configured() -> Self {
        let config = get_config();
        Self::new(
            DEFAULT_SERVER_NAME,
            config.get_base_url(),
            config.get_http_port(),
        )
    }

    /// Ajoute un handler GET avec état
    pub async fn add_handler_with_state<H, T, S>(&mut self, path: &str, handler: H, state: S)
    where
        H: Handler<T, S> + Clone + 'static,
        T: 'static,
        S: Clone + Send + Sync + 'static,
    {
        let route = Router::new().route("/", get(handler)).with_state(state);
        self.add_router(path, route).await;
    }

    /// Ajoute une API documentée avec OpenAPI et Swagger UI
    ///
    /// Chaque appel ajoute une API distincte, avec sa propre documentation :
    ///
    /// - les routes sont montées sous `/api/{name}`
    /// - `/swagger-ui/{name}` affiche la documentation Swagger
    /// - `/api-docs/{name}.json` fournit la spécification OpenAPI
    ///
    /// ```ignore
    /// server
    ///     .add_openapi(karaoke_api_router(engine), ApiDoc::openapi(), "karaoke")
    ///     .await;
    /// ```
    pub async fn add_openapi(
        &mut self,
        api_router: Router,
        openapi: utoipa::openapi::OpenApi,
        name: &str,
    ) {
        let swagger = SwaggerUi::new(format!("/swagger-ui/{}", name))
            .url(format!("/api-docs/{}.json", name), openapi);

        let nested_router = Router::new().nest(&format!("/api/{}", name), api_router);

        let mut r = self.router.write().await;
        *r = std::mem::take(&mut *r).merge(nested_router).merge(swagger);
    }

    /// Ajoute un sous-router au serveur
    ///
    /// - Si `path` est "/", merge directement au router principal
    /// - Sinon, nest le router sous le chemin donné
    pub async fn add_router(&mut self, path: &str, sub_router: Router) {
        let mut r = self.router.write().await;

        *r = if path == "/" {
            std::mem::take(&mut *r).merge(sub_router)
        } else {
            let normalized = format!("/{}", path.trim_start_matches('/'));
            std::mem::take(&mut *r).nest(&normalized, sub_router)
        };
    }

    /// Copie du router courant
    pub async fn router(&self) -> Router {
        self.router.read().await.clone()
    }

    /// Démarre le serveur HTTP
    ///
    /// Ouvre le port puis sert les requêtes en tâche de fond jusqu'à Ctrl+C
    /// ou l'appel de [`Server::shutdown`]. Retourne l'adresse
    /// effectivement liée.
    pub async fn start(&mut self) -> Result<SocketAddr> {
        let listener = tokio::net::TcpListener::bind((self.base_url.as_str(), self.http_port))
            .await
            .with_context(|| {
                format!("Cannot bind {}:{}", self.base_url, self.http_port)
            })?;
        let addr = listener.local_addr()?;
        info!(
            "Server {} running at http://{}:{}",
            self.name,
            addr.ip(),
            addr.port()
        );

        let router = self.router.read().await.clone();
        let shutdown = self.shutdown.clone();

        self.join_handle = Some(tokio::spawn(async move {
            let stop = async move {
                tokio::select! {
                    result = signal::ctrl_c() => match result {
                        Ok(()) => info!("Ctrl+C reçu, arrêt gracieux"),
                        Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
                    },
                    _ = shutdown.cancelled() => info!("Arrêt demandé"),
                }
            };

            if let Err(e) = axum::serve(listener, router.into_make_service())
                .with_graceful_shutdown(stop)
                .await
            {
                error!("HTTP server error: {}", e);
            }
        }));

        Ok(addr)
    }

    /// Demande l'arrêt et attend au plus `grace`.
    ///
    /// Les flux SSE ne se terminent jamais d'eux-mêmes : passé le délai, la
    /// tâche du serveur est abandonnée avec ses connexions.
    pub async fn shutdown(&mut self, grace: Duration) {
        self.shutdown.cancel();
        let Some(mut handle) = self.join_handle.take() else {
            return;
        };

        if tokio::time::timeout(grace, &mut handle).await.is_err() {
            warn!("Open connections after {:?}, aborting server task", grace);
            handle.abort();
        }
    }

    /// Initialise le système de logging et enregistre les routes de logs
    ///
    /// Routes enregistrées :
    /// - `GET /log-dump` : contenu JSON du buffer circulaire
    /// - `GET /log-sse` : flux SSE des logs
    /// - `GET|POST /api/logs/log_setup` : niveau de log courant
    ///
    /// ```rust,no_run
    /// # use karaserver::{ServerBuilder, logs::LoggingOptions};
    /// # #[tokio::main]
    /// # async fn main() {
    /// let mut server = ServerBuilder::new_configured().build();
    /// server.init_logging(LoggingOptions::from_config()).await;
    /// # }
    /// ```
    pub async fn init_logging(&mut self, options: LoggingOptions) {
        let log_state = init_logging(options);
        self.add_log_routes(log_state).await;
    }

    /// Enregistre les routes de logs pour un [`LogState`] déjà installé
    pub async fn add_log_routes(&mut self, log_state: LogState) {
        self.add_handler_with_state("/log-dump", log_dump, log_state.clone())
            .await;
        self.add_handler_with_state("/log-sse", log_sse, log_state.clone())
            .await;
        self.add_openapi(
            create_logs_router(log_state.clone()),
            LogsApiDoc::openapi(),
            "logs",
        )
        .await;
    }
}

/// Builder pattern
pub struct ServerBuilder {
    name: String,
    base_url: String,
    http_port: u16,
}

impl ServerBuilder {
    /// Crée un nouveau builder
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, http_port: u16) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            http_port,
        }
    }

    /// Builder initialisé depuis la section `host` de la configuration
    pub fn new_configured() -> Self {
        let config = get_config();
        Self {
            name: DEFAULT_SERVER_NAME.to_string(),
            base_url: config.get_base_url(),
            http_port: config.get_http_port(),
        }
    }

    /// Construit le serveur
    pub fn build(self) -> Server {
        Server::new(self.name, self.base_url, self.http_port)
    }
}
