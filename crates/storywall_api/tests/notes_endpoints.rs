use serde_json::json;
use std::sync::Arc;
use storywall_api::{decode_notes, StoryWallApp};
use storywall_core::model::note::STICKY_NOTE_COLORS;
use storywall_core::{ManualClock, NoTilt, StoryWallConfig};
use tempfile::TempDir;

fn app_with(configure: impl FnOnce(&mut StoryWallConfig)) -> (StoryWallApp, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let mut config = StoryWallConfig::with_database(dir.path().join("wall.sqlite3"));
    configure(&mut config);
    let app = StoryWallApp::with_clock(config, Arc::new(ManualClock::new(1_000_000)));
    (app, dir)
}

fn note_body(content: &str) -> String {
    json!({ "content": content, "wall": "left", "color": "yellow" }).to_string()
}

#[test]
fn empty_wall_lists_no_notes() {
    let (app, _dir) = app_with(|_| {});
    let response = app.handle("GET", "/notes", "", None);
    assert_eq!(response.status, 200);
    assert_eq!(response.body, json!([]));
}

#[test]
fn posted_note_is_listed_without_origin_token() {
    let (app, _dir) = app_with(|_| {});
    let created = app.post_notes(&note_body("hello"), Some("203.0.113.9"));
    assert_eq!(created.status, 200);
    assert_eq!(created.body["wall"], "left");
    assert!(created.body.get("originToken").is_none());

    let listed = app.get_notes();
    let notes = decode_notes(&listed).unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].content, "hello");
    assert!(!listed.body.to_string().contains("203.0.113.9"));
}

#[test]
fn second_post_from_same_origin_is_forbidden() {
    let (app, _dir) = app_with(|_| {});
    assert_eq!(app.post_notes(&note_body("one"), Some("10.0.0.1")).status, 200);

    let second = app.post_notes(&note_body("two"), Some("10.0.0.1, 172.16.0.1"));
    assert_eq!(second.status, 403);
    assert!(second.error_message().is_some());

    let other_origin = app.post_notes(&note_body("three"), Some("10.0.0.2"));
    assert_eq!(other_origin.status, 200);
}

#[test]
fn eleventh_request_in_window_is_rate_limited() {
    let (app, _dir) = app_with(|config| config.quota.cap = 100);
    for index in 0..10 {
        let response = app.post_notes(&note_body(&format!("n{index}")), Some("10.0.0.7"));
        assert_eq!(response.status, 200, "request {index}");
    }
    let limited = app.post_notes(&note_body("n10"), Some("10.0.0.7"));
    assert_eq!(limited.status, 429);
    assert!(limited.body["retryAfterMs"].as_u64().unwrap() > 0);
}

#[test]
fn quota_denials_still_consume_rate_budget() {
    let (app, _dir) = app_with(|config| config.rate_limit.limit = 3);
    assert_eq!(app.post_notes(&note_body("a"), None).status, 200);
    assert_eq!(app.post_notes(&note_body("b"), None).status, 403);
    assert_eq!(app.post_notes(&note_body("c"), None).status, 403);
    assert_eq!(app.post_notes(&note_body("d"), None).status, 429);
}

#[test]
fn malformed_payloads_are_bad_requests() {
    let (app, _dir) = app_with(|_| {});
    assert_eq!(app.post_notes("{not json", None).status, 400);
    let blank = json!({ "content": "   ", "color": "pink" }).to_string();
    assert_eq!(app.post_notes(&blank, None).status, 400);
    let bad_color = json!({ "content": "hi", "color": "chartreuse" }).to_string();
    assert_eq!(app.post_notes(&bad_color, None).status, 400);
    assert_eq!(decode_notes(&app.get_notes()).unwrap().len(), 0);
}

#[test]
fn note_without_color_gets_a_sticky_note_color() {
    let (app, _dir) = app_with(|_| {});
    let body = json!({ "content": "no color given" }).to_string();
    let created = app.post_notes(&body, Some("10.0.0.3"));
    assert_eq!(created.status, 200);
    let color = created.body["color"].as_str().unwrap();
    assert!(STICKY_NOTE_COLORS.contains(&color), "unexpected color {color}");
}

#[test]
fn duplicate_client_id_is_a_bad_request() {
    let (app, _dir) = app_with(|_| {});
    let body = json!({ "id": "fixed", "content": "x", "color": "green" }).to_string();
    assert_eq!(app.post_notes(&body, Some("a")).status, 200);
    assert_eq!(app.post_notes(&body, Some("b")).status, 400);
}

#[test]
fn layout_places_notes_on_their_walls() {
    let (app, _dir) = app_with(|_| {});
    app.post_notes(&note_body("left one"), Some("a"));
    let floor = json!({ "content": "floor one", "wall": "floor", "color": "#FFD700" }).to_string();
    app.post_notes(&floor, Some("b"));
    let unknown = json!({ "content": "fallback", "wall": "ceiling", "color": "blue" }).to_string();
    app.post_notes(&unknown, Some("c"));

    let response = app.get_layout_with(&mut NoTilt);
    assert_eq!(response.status, 200);
    let slots = response.body.as_array().unwrap();
    assert_eq!(slots.len(), 3);
    let walls: Vec<&str> = slots.iter().map(|s| s["wall"].as_str().unwrap()).collect();
    assert_eq!(walls, vec!["left", "floor", "front"]);
    for slot in slots {
        assert_eq!(slot["gridColumn"], 0);
        assert_eq!(slot["gridRow"], 0);
    }
}

#[test]
fn router_rejects_unknown_paths_and_methods() {
    let (app, _dir) = app_with(|_| {});
    assert_eq!(app.handle("GET", "/walls", "", None).status, 404);
    assert_eq!(app.handle("DELETE", "/notes", "", None).status, 405);
    assert_eq!(app.handle("POST", "/notes/layout", "", None).status, 405);
    assert_eq!(app.handle("get", "/notes/?all=1", "", None).status, 200);
    assert_eq!(app.handle("GET", "/notes/layout", "", None).status, 200);
}

#[test]
fn unreachable_store_is_an_internal_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoryWallConfig::with_database(dir.path().join("missing").join("wall.sqlite3"));
    let app = StoryWallApp::new(config);
    let response = app.get_notes();
    assert_eq!(response.status, 500);
    assert_eq!(response.error_message(), Some("Internal server error"));
}
