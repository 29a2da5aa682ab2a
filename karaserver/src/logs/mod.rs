// logs.rs
mod buffer_layer;

pub use buffer_layer::BufferLayer;

use std::{
    collections::VecDeque,
    sync::{Arc, RwLock},
    time::SystemTime,
};

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{
        IntoResponse,
        sse::{Event, KeepAlive, Sse},
    },
};
use karaconfig::get_config;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::Level;
use tracing_subscriber::{
    Registry, filter::LevelFilter, layer::SubscriberExt, reload, util::SubscriberInitExt,
};

const AVAILABLE_LEVELS: [&str; 5] = ["ERROR", "WARN", "INFO", "DEBUG", "TRACE"];

/// Représente une entrée de log
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: SystemTime,
    pub level: String,
    pub target: String,
    pub message: String,
}

/// Buffer circulaire partagé
#[derive(Clone)]
pub struct LogState {
    buffer: Arc<RwLock<VecDeque<LogEntry>>>,
    capacity: usize,
    tx: broadcast::Sender<LogEntry>,
    max_level: Arc<RwLock<Level>>,
    reload_handle: Arc<reload::Handle<LevelFilter, Registry>>,
}

impl LogState {
    pub fn new(
        capacity: usize,
        level: Level,
        reload_handle: reload::Handle<LevelFilter, Registry>,
    ) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
            capacity,
            tx: broadcast::channel(1000).0,
            max_level: Arc::new(RwLock::new(level)),
            reload_handle: Arc::new(reload_handle),
        }
    }

    /// Change le niveau minimal à chaud
    pub fn set_max_level(&self, level: Level) {
        match self.max_level.write() {
            Ok(mut max) => *max = level,
            Err(poisoned) => *poisoned.into_inner() = level,
        }

        if let Err(e) = self.reload_handle.reload(LevelFilter::from_level(level)) {
            eprintln!("Failed to reload log level filter: {}", e);
        }
    }

    pub fn get_max_level(&self) -> Level {
        match self.max_level.read() {
            Ok(level) => *level,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn push(&self, entry: LogEntry) {
        // Jamais de log ici : on est appelé depuis le subscriber
        let Ok(mut buf) = self.buffer.write() else {
            return;
        };
        if buf.len() == self.capacity {
            buf.pop_front();
        }
        buf.push_back(entry.clone());
        drop(buf);
        let _ = self.tx.send(entry);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.tx.subscribe()
    }

    pub fn dump(&self) -> Vec<LogEntry> {
        match self.buffer.read() {
            Ok(buf) => buf.iter().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().iter().cloned().collect(),
        }
    }
}

/// Query params pour /log-sse
#[derive(Debug, Default, Deserialize)]
pub struct LogQuery {
    #[serde(default)]
    pub error: Option<bool>,
    #[serde(default)]
    pub warn: Option<bool>,
    #[serde(default)]
    pub info: Option<bool>,
    #[serde(default)]
    pub debug: Option<bool>,
    #[serde(default)]
    pub trace: Option<bool>,
    #[serde(default)]
    pub search: Option<String>,
}

/// Handler SSE : historique puis logs en temps réel
pub async fn log_sse(
    State(state): State<LogState>,
    Query(params): Query<LogQuery>,
) -> impl IntoResponse {
    let mut rx = state.subscribe();
    let history = state.dump();
    let stream_state = state.clone();

    let stream = async_stream::stream! {
        let current_level = stream_state.get_max_level();
        for entry in history {
            if !is_level_allowed(&entry.level, current_level) || !filter_entry(&entry, &params) {
                continue;
            }
            if let Ok(json) = serde_json::to_string(&entry) {
                yield Ok::<_, axum::Error>(Event::default().data(json));
            }
        }

        loop {
            let entry = match rx.recv().await {
                Ok(entry) => entry,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            };
            if !is_level_allowed(&entry.level, stream_state.get_max_level())
                || !filter_entry(&entry, &params)
            {
                continue;
            }
            if let Ok(json) = serde_json::to_string(&entry) {
                yield Ok::<_, axum::Error>(Event::default().data(json));
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Handler REST (dump JSON du buffer)
pub async fn log_dump(State(state): State<LogState>) -> impl IntoResponse {
    Json(state.dump())
}

/// Un log est autorisé si son niveau est au moins aussi sévère que `max_level`
fn is_level_allowed(log_level: &str, max_level: Level) -> bool {
    match string_to_level(log_level) {
        // Level::ERROR < Level::WARN < ... < Level::TRACE côté verbosité
        Some(level) => level <= max_level,
        None => false,
    }
}

fn filter_entry(entry: &LogEntry, q: &LogQuery) -> bool {
    let lvl = entry.level.to_lowercase();
    let flags = [
        (q.error, "error"),
        (q.warn, "warn"),
        (q.info, "info"),
        (q.debug, "debug"),
        (q.trace, "trace"),
    ];

    let any_flag = flags.iter().any(|(flag, _)| flag.unwrap_or(false));
    let mut allowed = !any_flag
        || flags
            .iter()
            .any(|(flag, name)| flag.unwrap_or(false) && lvl == *name);

    if let Some(search) = &q.search {
        allowed &= entry.message.contains(search) || entry.target.contains(search);
    }

    allowed
}

/// Options d'initialisation du système de logging
#[derive(Debug, Clone)]
pub struct LoggingOptions {
    /// Capacité du buffer circulaire (nombre d'entrées conservées)
    pub buffer_capacity: usize,
    /// Niveau minimal au démarrage
    pub min_level: Level,
    /// Activer la sortie console (sur stderr, stdout étant réservé à la console karaoké)
    pub enable_console: bool,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            buffer_capacity: 1000,
            min_level: Level::INFO,
            enable_console: true,
        }
    }
}

impl LoggingOptions {
    /// Lit les options dans la section `host.logger` de la configuration
    pub fn from_config() -> Self {
        let config = get_config();
        let min_level_name = config.get_log_min_level();
        let min_level = string_to_level(&min_level_name).unwrap_or_else(|| {
            eprintln!("Unknown log level '{}', using INFO", min_level_name);
            Level::INFO
        });

        Self {
            buffer_capacity: config.get_log_cache_size(),
            min_level,
            enable_console: config.get_log_enable_console(),
        }
    }
}

/// Installe le subscriber global : filtre rechargeable, buffer mémoire et
/// éventuellement la sortie console.
///
/// # Exemple
/// ```rust,no_run
/// use karaserver::logs::{init_logging, LoggingOptions};
///
/// let log_state = init_logging(LoggingOptions::from_config());
/// ```
pub fn init_logging(options: LoggingOptions) -> LogState {
    let (filter, reload_handle) = reload::Layer::new(LevelFilter::from_level(options.min_level));
    let log_state = LogState::new(options.buffer_capacity, options.min_level, reload_handle);

    // L'ordre compte : le filtre doit être appliqué avant le buffer
    let console = options.enable_console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true)
            .with_ansi(true)
    });

    let installed = Registry::default()
        .with(filter)
        .with(BufferLayer::new(log_state.clone()))
        .with(console)
        .try_init();

    if let Err(e) = installed {
        eprintln!("Logging already initialised: {}", e);
    }

    log_state
}

/// Request body pour la configuration du logging
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LogSetupRequest {
    pub level: String,
}

/// Response pour la configuration du logging
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct LogSetupResponse {
    pub current_level: String,
    pub available_levels: Vec<String>,
}

impl LogSetupResponse {
    fn new(level: Level) -> Self {
        Self {
            current_level: level.to_string(),
            available_levels: AVAILABLE_LEVELS.iter().map(|l| l.to_string()).collect(),
        }
    }
}

/// Handler pour GET /api/logs/log_setup - retourne la configuration actuelle
#[utoipa::path(
    get,
    path = "/api/logs/log_setup",
    responses(
        (status = 200, description = "Log configuration retrieved successfully", body = LogSetupResponse)
    ),
    tag = "logs"
)]
pub async fn log_setup_get(State(state): State<LogState>) -> impl IntoResponse {
    Json(LogSetupResponse::new(state.get_max_level()))
}

/// Handler pour POST /api/logs/log_setup - met à jour le niveau de log
#[utoipa::path(
    post,
    path = "/api/logs/log_setup",
    request_body = LogSetupRequest,
    responses(
        (status = 200, description = "Log level updated successfully", body = LogSetupResponse),
        (status = 400, description = "Invalid log level")
    ),
    tag = "logs"
)]
pub async fn log_setup_post(
    State(state): State<LogState>,
    Json(payload): Json<LogSetupRequest>,
) -> impl IntoResponse {
    let Some(level) = string_to_level(&payload.level) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": "Invalid log level. Must be one of: ERROR, WARN, INFO, DEBUG, TRACE"
            })),
        )
            .into_response();
    };

    state.set_max_level(level);
    tracing::info!("Log level changed to: {}", level);

    (StatusCode::OK, Json(LogSetupResponse::new(level))).into_response()
}

fn string_to_level(s: &str) -> Option<Level> {
    match s.trim().to_uppercase().as_str() {
        "ERROR" => Some(Level::ERROR),
        "WARN" => Some(Level::WARN),
        "INFO" => Some(Level::INFO),
        "DEBUG" => Some(Level::DEBUG),
        "TRACE" => Some(Level::TRACE),
        _ => None,
    }
}

/// Crée le router pour l'API de gestion des logs
pub fn create_logs_router(log_state: LogState) -> axum::Router {
    use axum::routing::get;
    axum::Router::new()
        .route("/log_setup", get(log_setup_get).post(log_setup_post))
        .with_state(log_state)
}

/// API OpenAPI pour la gestion des logs
#[derive(utoipa::OpenApi)]
#[openapi(
    paths(
        log_setup_get,
        log_setup_post,
    ),
    components(
        schemas(LogSetupRequest, LogSetupResponse)
    ),
    tags(
        (name = "logs", description = "Log level configuration endpoints")
    )
)]
pub struct LogsApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(level: &str, target: &str, message: &str) -> LogEntry {
        LogEntry {
            timestamp: SystemTime::now(),
            level: level.to_string(),
            target: target.to_string(),
            message: message.to_string(),
        }
    }

    fn state(capacity: usize) -> (LogState, reload::Layer<LevelFilter, Registry>) {
        let (layer, handle) = reload::Layer::new(LevelFilter::TRACE);
        (LogState::new(capacity, Level::TRACE, handle), layer)
    }

    #[test]
    fn test_ring_buffer_keeps_last_entries() {
        let (state, _layer) = state(2);
        state.push(entry("INFO", "a", "one"));
        state.push(entry("INFO", "a", "two"));
        state.push(entry("INFO", "a", "three"));

        let messages: Vec<String> = state.dump().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["two", "three"]);
    }

    #[test]
    fn test_set_max_level() {
        let (state, _layer) = state(10);
        state.set_max_level(Level::WARN);
        assert_eq!(state.get_max_level(), Level::WARN);
    }

    #[test]
    fn test_is_level_allowed() {
        assert!(is_level_allowed("ERROR", Level::INFO));
        assert!(is_level_allowed("info", Level::INFO));
        assert!(!is_level_allowed("DEBUG", Level::INFO));
        assert!(is_level_allowed("TRACE", Level::TRACE));
        assert!(!is_level_allowed("LOUD", Level::TRACE));
    }

    #[test]
    fn test_filter_entry() {
        let warn = entry("WARN", "karaplaylist::hub", "Viewer lagging");
        assert!(filter_entry(&warn, &LogQuery::default()));

        let only_errors = LogQuery {
            error: Some(true),
            ..Default::default()
        };
        assert!(!filter_entry(&warn, &only_errors));

        let search = LogQuery {
            warn: Some(true),
            search: Some("hub".into()),
            ..Default::default()
        };
        assert!(filter_entry(&warn, &search));
    }
}
