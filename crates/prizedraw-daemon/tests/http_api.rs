//! Drives the HTTP API over a real socket.

use std::fs;
use std::net::SocketAddr;

use prizedraw_core::config::DelayRange;
use prizedraw_core::engine::{DrawEngine, OverrideRule};
use prizedraw_core::roster::{JsonRosterProvider, RosterProvider};
use prizedraw_core::store::SqliteStateStore;
use prizedraw_core::tier::TierTable;
use prizedraw_daemon::{AppState, router};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

async fn spawn_server(totals: &TierTable) -> (SocketAddr, TempDir) {
    let dir = TempDir::new().unwrap();
    let photo_dir = dir.path().join("images");
    fs::create_dir_all(&photo_dir).unwrap();

    let participants: Vec<_> = (1..=12)
        .map(|id| {
            fs::write(photo_dir.join(format!("{id}.jpg")), b"jpg").unwrap();
            // Ids as strings, the way roster exports usually arrive.
            json!({ "id": id.to_string(), "name": format!("Guest {id}"), "photo": format!("{id}.jpg") })
        })
        .collect();
    let roster_path = dir.path().join("participants.json");
    fs::write(&roster_path, serde_json::to_vec(&participants).unwrap()).unwrap();

    let roster = JsonRosterProvider::new(&roster_path, &photo_dir)
        .load_roster()
        .unwrap();
    let store = SqliteStateStore::open(dir.path().join("lottery.db"), totals).unwrap();
    let engine = DrawEngine::with_seed(store, roster, Some(OverrideRule::default()), 42);
    let state = AppState::new(engine, DelayRange::NONE);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });
    (addr, dir)
}

/// Sends one request and returns the status code and JSON body.
async fn request(addr: SocketAddr, method: &str, path: &str, body: Option<Value>) -> (u16, Value) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let payload = body.map(|b| b.to_string()).unwrap_or_default();
    let content_type = if payload.is_empty() {
        String::new()
    } else {
        "Content-Type: application/json\r\n".to_string()
    };
    let raw = format!(
        "{method} {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n{content_type}Content-Length: {}\r\n\r\n{payload}",
        payload.len()
    );
    stream.write_all(raw.as_bytes()).await.unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();

    let (head, body) = response.split_once("\r\n\r\n").unwrap();
    let status = head
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(body).unwrap_or(Value::Null)
    };
    (status, json)
}

#[tokio::test]
async fn draw_then_accept_flow() {
    let (addr, _dir) = spawn_server(&TierTable::default()).await;

    let (status, drawn) = request(addr, "GET", "/draw", None).await;
    assert_eq!(status, 200);
    assert_eq!(drawn["draw_count"], 0);
    assert_eq!(drawn["winner"]["prizeType"], "SMALL");
    assert_eq!(drawn["winner"]["prizeStatus"]["currentType"], "SMALL");
    let id = drawn["winner"]["id"].as_u64().unwrap();

    // Proposing again changes nothing.
    let (_, count) = request(addr, "GET", "/draw-count", None).await;
    assert_eq!(count, json!({ "drawCount": 0 }));

    let (status, accepted) = request(addr, "POST", &format!("/accept-winner/{id}"), None).await;
    assert_eq!(status, 200);
    assert_eq!(accepted["status"], "success");
    assert_eq!(accepted["prizeType"], "SMALL");
    assert_eq!(accepted["drawCount"], 1);
    assert_eq!(accepted["prizeStatus"]["remaining"]["small"], 19);

    let (_, winners) = request(addr, "GET", "/winners", None).await;
    assert_eq!(winners, json!([id]));

    let (status, records) = request(addr, "GET", "/winners/records", None).await;
    assert_eq!(status, 200);
    assert_eq!(records[0]["participant_id"], id);
    assert_eq!(records[0]["tier"], "SMALL");

    let (status, error) = request(addr, "POST", &format!("/accept-winner/{id}"), None).await;
    assert_eq!(status, 409);
    assert_eq!(error["error"], "duplicate_winner");
}

#[tokio::test]
async fn explicit_tier_must_follow_order() {
    let (addr, _dir) = spawn_server(&TierTable::default()).await;

    let (status, error) = request(
        addr,
        "POST",
        "/accept-winner/3",
        Some(json!({ "tier": "BIG" })),
    )
    .await;
    assert_eq!(status, 409);
    assert_eq!(error["error"], "tier_out_of_order");

    let (status, accepted) = request(
        addr,
        "POST",
        "/accept-winner/3",
        Some(json!({ "tier": "SMALL" })),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(accepted["prizeType"], "SMALL");
}

#[tokio::test]
async fn rejects_unknown_and_malformed_participants() {
    let (addr, _dir) = spawn_server(&TierTable::default()).await;

    let (status, error) = request(addr, "POST", "/accept-winner/500", None).await;
    assert_eq!(status, 404);
    assert_eq!(error["error"], "unknown_participant");

    let (status, _) = request(addr, "POST", "/accept-winner/abc", None).await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn absences_and_reset() {
    let (addr, _dir) = spawn_server(&TierTable::full(1, 0, 0)).await;

    let (status, body) = request(addr, "POST", "/mark-absent/5", None).await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({ "status": "success" }));

    let (status, error) = request(addr, "POST", "/mark-absent/5", None).await;
    assert_eq!(status, 409);
    assert_eq!(error["error"], "already_absent");

    let (_, absent) = request(addr, "GET", "/absent-participants", None).await;
    assert_eq!(absent, json!([5]));

    request(addr, "POST", "/accept-winner/1", None).await;
    let (status, error) = request(addr, "GET", "/draw", None).await;
    assert_eq!(status, 400);
    assert_eq!(error["error"], "pool_exhausted");

    let (_, prize_status) = request(addr, "GET", "/prize-status", None).await;
    assert_eq!(prize_status["currentType"], Value::Null);

    let (status, body) = request(addr, "POST", "/reset", None).await;
    assert_eq!(status, 200);
    assert_eq!(body["message"], "Draw reset successfully");

    let (_, absent) = request(addr, "GET", "/absent-participants", None).await;
    assert_eq!(absent, json!([]));
    let (_, count) = request(addr, "GET", "/draw-count", None).await;
    assert_eq!(count["drawCount"], 0);
}

#[tokio::test]
async fn participants_lists_roster() {
    let (addr, _dir) = spawn_server(&TierTable::default()).await;

    let (status, participants) = request(addr, "GET", "/participants", None).await;
    assert_eq!(status, 200);
    assert_eq!(participants.as_array().unwrap().len(), 12);
    assert_eq!(participants[0]["id"], 1);
    assert_eq!(participants[0]["name"], "Guest 1");
}
