//! Integration tests for the roomcast server: control plane, upgrade
//! routing and the full peer flow over real sockets.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use roomcast::prelude::*;
use serde_json::{Value, json};
use tokio_tungstenite::tungstenite::{self, Message};

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

struct TestServer {
    addr: String,
    http: reqwest::Client,
    registry: RoomRegistry,
}

impl TestServer {
    fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    async fn post(&self, path: &str, body: Value) -> (u16, Value) {
        let resp = self
            .http
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .expect("request should be sent");
        let status = resp.status().as_u16();
        (status, resp.json().await.expect("JSON body"))
    }

    async fn get(&self, path: &str) -> (u16, Value) {
        let resp = self
            .http
            .get(self.url(path))
            .send()
            .await
            .expect("request should be sent");
        let status = resp.status().as_u16();
        (status, resp.json().await.expect("JSON body"))
    }

    /// Creates a room and returns its public view.
    async fn create(&self, body: Value) -> Value {
        let (status, body) = self.post("/api/room", body).await;
        assert_eq!(status, 200, "create failed: {body}");
        assert_eq!(body["status"], "success");
        body["data"].clone()
    }

    async fn connect(&self, uid: &str) -> ClientWs {
        let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{}/{uid}", self.addr))
            .await
            .expect("should connect");
        ws
    }

    /// Polls until the room's data endpoint reports 404.
    async fn wait_gone(&self, uid: &str) {
        for _ in 0..100 {
            let (status, _) = self.get(&format!("/api/room/data/{uid}")).await;
            if status == 404 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("room {uid} was never torn down");
    }
}

/// Starts a server on a random port.
async fn start_server() -> TestServer {
    let server = RoomcastServer::builder()
        .bind("127.0.0.1:0")
        .build()
        .await
        .expect("server should build");

    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();
    let registry = server.registry().clone();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    TestServer {
        addr,
        http: reqwest::Client::new(),
        registry,
    }
}

/// Next text frame as JSON. Fails after two seconds of silence.
async fn next_json(ws: &mut ClientWs) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .expect("websocket error");
        match msg {
            Message::Text(_) => {
                let text = msg.to_text().expect("text frame");
                return serde_json::from_str(text).expect("frames are JSON");
            }
            Message::Close(_) => panic!("connection closed while waiting for a frame"),
            _ => continue,
        }
    }
}

/// Asserts the server closes the connection without sending more data.
async fn expect_closed(ws: &mut ClientWs) {
    loop {
        let next = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("timed out waiting for close");
        match next {
            None | Some(Err(_)) | Some(Ok(Message::Close(_))) => return,
            Some(Ok(Message::Text(t))) => panic!("unexpected frame: {t:?}"),
            Some(Ok(_)) => continue,
        }
    }
}

async fn send_json(ws: &mut ClientWs, value: Value) {
    ws.send(Message::Text(value.to_string().into()))
        .await
        .expect("send");
}

fn uid_of(room: &Value) -> String {
    room["uid"].as_str().expect("uid is a string").to_owned()
}

// =========================================================================
// Control plane
// =========================================================================

#[tokio::test]
async fn test_health() {
    let server = start_server().await;
    let resp = server.http.get(server.url("/api/health")).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_create_room_view() {
    let server = start_server().await;
    let room = server
        .create(json!({
            "game": "chess",
            "version": "1.0",
            "name": "lobby",
            "limit": "4",
            "data": {"map": "forest"}
        }))
        .await;

    assert!(!uid_of(&room).is_empty());
    assert_eq!(room["game"], "chess");
    assert_eq!(room["open"], true);
    assert_eq!(room["limit"], 4);
    assert_eq!(room["data"], json!({"map": "forest"}));
    assert_eq!(room["clients"], json!([]));
    assert_eq!(room["clientsCount"], 0);
    assert_eq!(server.registry.len(), 1);
}

#[tokio::test]
async fn test_create_errors() {
    let server = start_server().await;

    let (status, body) = server
        .post("/api/room", json!({"game": "chess", "name": "x"}))
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["status"], "error");
    assert_eq!(body["code"], "missing_parameters");

    let triple = json!({"game": "chess", "version": "1", "name": "x"});
    server.create(triple.clone()).await;
    let (status, body) = server.post("/api/room", triple).await;
    assert_eq!(status, 409);
    assert_eq!(body["code"], "name_already_exists");

    let (status, body) = server
        .post(
            "/api/room",
            json!({"game": "chess", "version": "1", "name": "y", "data": [1]}),
        )
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "invalid_data");
    assert_eq!(server.registry.len(), 1);
}

#[tokio::test]
async fn test_create_without_json_body() {
    let server = start_server().await;

    // Form-encoded and untyped bodies are refused, not read as empty.
    let resp = server
        .http
        .post(server.url("/api/room"))
        .body("game=chess&version=1&name=x")
        .send()
        .await
        .expect("request should be sent");
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.expect("JSON body");
    assert_eq!(body["status"], "error");
    assert_eq!(body["code"], "invalid_data");
    assert!(server.registry.is_empty());
}

#[tokio::test]
async fn test_list_with_filters() {
    let server = start_server().await;
    server
        .create(json!({"game": "chess", "version": "1", "name": "a"}))
        .await;
    server
        .create(json!({"game": "chess", "version": "1", "name": "b"}))
        .await;
    server
        .create(json!({"game": "go", "version": "1", "name": "a"}))
        .await;

    let (status, body) = server.get("/api/room").await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "success");
    assert_eq!(body["servers"].as_array().unwrap().len(), 3);

    let (_, body) = server.get("/api/room?game=chess&name=b").await;
    let servers = body["servers"].as_array().unwrap();
    assert_eq!(servers.len(), 1);
    assert_eq!(servers[0]["name"], "b");

    let (_, body) = server.get("/api/room?colour=red").await;
    assert!(body["servers"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_metadata_endpoints() {
    let server = start_server().await;
    let room = server
        .create(json!({"game": "g", "version": "1", "name": "n", "data": {"a": {"x": 1}}}))
        .await;
    let uid = uid_of(&room);
    let path = format!("/api/room/data/{uid}");

    let (status, body) = server
        .post(&path, json!({"merge": true, "data": {"a": {"y": 2}}}))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["data"], json!({"a": {"x": 1, "y": 2}}));

    server
        .post(&path, json!({"merge": false, "data": {"a": {"z": 3}}}))
        .await;
    let (status, body) = server.get(&path).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"], json!({"a": {"z": 3}}));

    let (status, body) = server.post(&path, json!({"merge": true, "data": "x"})).await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "invalid_data");
}

#[tokio::test]
async fn test_unknown_uid_is_not_found() {
    let server = start_server().await;
    let uid = RoomUid::generate().to_string();

    let (status, body) = server.get(&format!("/api/room/data/{uid}")).await;
    assert_eq!(status, 404);
    assert_eq!(body["code"], "not_found");

    let (status, _) = server
        .post(&format!("/api/room/close/{uid}"), json!({"close": true}))
        .await;
    assert_eq!(status, 404);

    let (status, _) = server.get("/api/room/data/garbage").await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_close_and_reopen() {
    let server = start_server().await;
    let uid = uid_of(
        &server
            .create(json!({"game": "g", "version": "1", "name": "n"}))
            .await,
    );
    let path = format!("/api/room/close/{uid}");

    let (_, body) = server.post(&path, json!({"close": "true"})).await;
    assert_eq!(body["data"]["open"], false);

    let mut ws = server.connect(&uid).await;
    let frame = next_json(&mut ws).await;
    assert_eq!(frame["status"], "error");
    assert_eq!(frame["code"], "room_closed");
    expect_closed(&mut ws).await;

    let (_, body) = server.post(&path, json!({})).await;
    assert_eq!(body["data"]["open"], true);

    let mut ws = server.connect(&uid).await;
    assert_eq!(next_json(&mut ws).await["code"], "connected");
}

// =========================================================================
// Upgrade routing
// =========================================================================

#[tokio::test]
async fn test_upgrade_to_unknown_room_refused() {
    let server = start_server().await;
    let url = format!("ws://{}/{}", server.addr, RoomUid::generate());

    let err = tokio_tungstenite::connect_async(url)
        .await
        .expect_err("handshake should be refused");
    match err {
        tungstenite::Error::Http(resp) => assert_eq!(resp.status().as_u16(), 404),
        other => panic!("expected an HTTP refusal, got {other:?}"),
    }
}

#[tokio::test]
async fn test_removed_room_disconnects_peers() {
    let server = start_server().await;
    let uid = uid_of(
        &server
            .create(json!({"game": "g", "version": "1", "name": "n"}))
            .await,
    );
    let mut ws = server.connect(&uid).await;
    assert_eq!(next_json(&mut ws).await["code"], "connected");

    let room_uid: RoomUid = uid.parse().unwrap();
    assert!(server.registry.remove(room_uid).await);
    expect_closed(&mut ws).await;
}

// =========================================================================
// Full flow
// =========================================================================

#[tokio::test]
async fn test_two_player_session() {
    let server = start_server().await;
    let room = server
        .create(json!({"game": "chess", "version": "1", "name": "duel", "limit": 2}))
        .await;
    let uid = uid_of(&room);

    // A joins.
    let mut a = server.connect(&uid).await;
    let connected = next_json(&mut a).await;
    assert_eq!(connected["status"], "success");
    assert_eq!(connected["code"], "connected");
    assert_eq!(connected["data"]["room"]["clientsCount"], 1);
    let a_id = connected["data"]["uid"].clone();

    // B joins; A hears about it; the room closes at its limit.
    let mut b = server.connect(&uid).await;
    let connected = next_json(&mut b).await;
    assert_eq!(connected["data"]["room"]["open"], false);
    let b_id = connected["data"]["uid"].clone();
    let joined = next_json(&mut a).await;
    assert_eq!(joined, json!({"code": "player_join", "data": {"uid": b_id}}));

    // C is turned away.
    let mut c = server.connect(&uid).await;
    let rejected = next_json(&mut c).await;
    assert_eq!(rejected["status"], "error");
    assert_eq!(rejected["code"], "room_full");
    expect_closed(&mut c).await;

    // B moves; A gets the relay and B the acknowledgement.
    send_json(&mut b, json!({"move": "e4"})).await;
    assert_eq!(
        next_json(&mut a).await,
        json!({"code": "broadcast", "data": {"move": "e4"}})
    );
    assert_eq!(
        next_json(&mut b).await,
        json!({"code": "msg_sent", "data": {"msg": {"move": "e4"}, "cnt": 1}})
    );

    // Garbage is dropped silently.
    b.send(Message::Text("not json".to_string().into())).await.unwrap();

    // A leaves: B is told and the room reopens.
    a.close(None).await.unwrap();
    let left = next_json(&mut b).await;
    assert_eq!(left, json!({"code": "player_leave", "data": {"uid": a_id}}));
    let (_, body) = server.get(&format!("/api/room?uid={uid}")).await;
    assert_eq!(body["servers"][0]["open"], true);
    assert_eq!(body["servers"][0]["clientsCount"], 1);

    // B leaves: the room is gone.
    b.close(None).await.unwrap();
    server.wait_gone(&uid).await;
    assert!(server.registry.is_empty());
}
