//! # karaserver - Serveur web haut niveau basé sur Axum
//!
//! Cette crate fournit une abstraction simple pour monter les routes du
//! gestionnaire karaoké sur un serveur HTTP Axum.
//!
//! ## Fonctionnalités
//!
//! - **API de haut niveau** : composition de routers et de handlers avec état
//! - **Documentation OpenAPI** : Swagger UI par API montée
//! - **Logs** : buffer circulaire consultable via `/log-dump` et `/log-sse`
//! - **Arrêt gracieux** : sur Ctrl+C ou à la demande
//!
//! ## Architecture
//!
//! - [`server`] : serveur principal et builder
//! - [`logs`] : initialisation de `tracing` et routes de consultation
//!
//! ## Exemple d'utilisation
//!
//! ```rust,no_run
//! use karaserver::{ServerBuilder, logs::LoggingOptions};
//! use axum::{Router, routing::get};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut server = ServerBuilder::new("MyServer", "127.0.0.1", 8080).build();
//!     server.init_logging(LoggingOptions::default()).await;
//!
//!     let status = Router::new().route("/", get(|| async { "ok" }));
//!     server.add_router("/status", status).await;
//!
//!     server.start().await?;
//!     tokio::signal::ctrl_c().await?;
//!     server.shutdown(std::time::Duration::from_secs(2)).await;
//!     Ok(())
//! }
//! ```

pub mod logs;
pub mod server;

pub use logs::{BufferLayer, LogState, LoggingOptions, log_dump, log_sse};
pub use server::{Server, ServerBuilder};
