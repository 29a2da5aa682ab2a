#![cfg(feature = "server")]

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use futures::StreamExt;
use karaplaylist::{
    karaoke_api_router, viewer_router, HubOptions, JsonSongStore, NotificationHub,
    PlaylistEngine, SharedEngine,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const PARAMS: &str = "autoplay=1";

struct TestApp {
    _dir: TempDir,
    engine: SharedEngine,
    hub: Arc<NotificationHub>,
}

impl TestApp {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonSongStore::new(dir.path().join("songs.json")));
        let hub = Arc::new(NotificationHub::new(HubOptions {
            initial: "https://www.youtube.com/embed/default?autoplay=1".into(),
            ..Default::default()
        }));
        let engine = PlaylistEngine::open(store, hub.clone(), PARAMS)
            .unwrap()
            .shared();
        Self {
            _dir: dir,
            engine,
            hub,
        }
    }

    fn api(&self) -> Router {
        karaoke_api_router(self.engine.clone())
    }

    async fn call(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .api()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }
}

fn song(person: &str, id: &str) -> Value {
    json!({
        "person": person,
        "name": format!("Song {}", id),
        "author": "Artist",
        "link": format!("https://www.youtube.com/watch?v={}", id),
    })
}

#[tokio::test]
async fn test_add_and_list_songs() {
    let app = TestApp::new();

    let (status, body) = app.call(Method::POST, "/songs", Some(song("Ann", "aaa"))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["songs"].as_array().unwrap().len(), 1);

    let (status, body) = app.call(Method::GET, "/songs", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["songs"][0]["person"], "Ann");
    assert_eq!(body["current"], Value::Null);
    assert_eq!(body["current_index"], Value::Null);
}

#[tokio::test]
async fn test_add_invalid_link_is_rejected() {
    let app = TestApp::new();

    let mut bad = song("Eve", "x");
    bad["link"] = json!("https://vimeo.com/42");
    let (status, body) = app.call(Method::POST, "/songs", Some(bad)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_LINK");
    assert!(app.engine.lock().await.is_empty());
}

#[tokio::test]
async fn test_edit_delete_and_move() {
    let app = TestApp::new();
    for (person, id) in [("Ann", "aaa"), ("Bob", "bbb"), ("Cid", "ccc")] {
        app.call(Method::POST, "/songs", Some(song(person, id))).await;
    }

    let (status, body) = app.call(Method::PUT, "/songs/1", Some(song("Dan", "ddd"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["songs"][1]["person"], "Dan");

    let (status, body) = app.call(Method::POST, "/songs/2/up", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["songs"][1]["person"], "Cid");

    let (status, body) = app.call(Method::POST, "/songs/0/down", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["songs"][0]["person"], "Cid");
    assert_eq!(body["songs"][1]["person"], "Ann");

    let (status, body) = app.call(Method::DELETE, "/songs/0", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["songs"].as_array().unwrap().len(), 2);

    let (status, body) = app.call(Method::DELETE, "/songs/9", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "INDEX_OUT_OF_RANGE");
}

#[tokio::test]
async fn test_advance_on_empty_playlist() {
    let app = TestApp::new();

    let (status, body) = app.call(Method::POST, "/advance", Some(json!({}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "EMPTY_PLAYLIST");

    let (status, body) = app.call(Method::GET, "/current", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Null);
}

#[tokio::test]
async fn test_advance_flow() {
    let app = TestApp::new();
    for (person, id) in [("Ann", "aaa"), ("Bob", "bbb"), ("Cid", "ccc")] {
        app.call(Method::POST, "/songs", Some(song(person, id))).await;
    }
    let mut viewer = app.hub.subscribe();

    let (status, body) = app.call(Method::POST, "/advance", Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["current"]["song"]["person"], "Ann");
    assert_eq!(body["current_index"], 0);
    assert_eq!(
        viewer.recv().await.as_deref(),
        Some("https://www.youtube.com/embed/aaa?autoplay=1")
    );

    let (_, body) = app
        .call(Method::POST, "/advance", Some(json!({ "decision": "requeue" })))
        .await;
    let people: Vec<&str> = body["songs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["person"].as_str().unwrap())
        .collect();
    assert_eq!(people, vec!["Bob", "Cid", "Ann"]);

    let (_, body) = app
        .call(Method::POST, "/advance", Some(json!({ "decision": "remove" })))
        .await;
    assert_eq!(body["songs"].as_array().unwrap().len(), 2);
    assert_eq!(body["current"]["song"]["person"], "Cid");

    let (status, body) = app.call(Method::GET, "/current", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["song"]["person"], "Cid");
}

#[tokio::test]
async fn test_advance_without_body_requeues() {
    let app = TestApp::new();
    for (person, id) in [("Ann", "aaa"), ("Bob", "bbb")] {
        app.call(Method::POST, "/songs", Some(song(person, id))).await;
    }

    let (status, body) = app.call(Method::POST, "/advance", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["current"]["song"]["person"], "Ann");

    let (status, body) = app.call(Method::POST, "/advance", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["current"]["song"]["person"], "Bob");
    let people: Vec<&str> = body["songs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["person"].as_str().unwrap())
        .collect();
    assert_eq!(people, vec!["Bob", "Ann"]);
}

#[tokio::test]
async fn test_viewer_page_embeds_last_published() {
    let app = TestApp::new();
    app.hub
        .publish("https://www.youtube.com/embed/aaa?autoplay=1&cc_lang_policy=0");

    let response = viewer_router(app.hub.clone())
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let page = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(page.contains("src=\"https://www.youtube.com/embed/aaa?autoplay=1&amp;cc_lang_policy=0\""));
    assert!(page.contains("/video-stream"));
}

#[tokio::test]
async fn test_video_stream_delivers_published_links() {
    let app = TestApp::new();

    let response = viewer_router(app.hub.clone())
        .oneshot(
            Request::builder()
                .uri("/video-stream")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );
    assert_eq!(app.hub.subscriber_count(), 1);

    app.hub.publish("https://www.youtube.com/embed/bbb?autoplay=1");

    let mut frames = response.into_body().into_data_stream();
    let frame = frames.next().await.unwrap().unwrap();
    assert_eq!(
        String::from_utf8(frame.to_vec()).unwrap(),
        "data: https://www.youtube.com/embed/bbb?autoplay=1\n\n"
    );

    drop(frames);
    assert_eq!(app.hub.subscriber_count(), 0);
}
