//! End-to-end tests: the real router on an ephemeral port, driven by
//! WebSocket clients.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::api;
use crate::config::ServerConfig;
use crate::games::SecretMooseFactory;
use crate::hub::test_support::fast_config;
use crate::hub::Hub;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(2);

async fn spawn_server() -> (SocketAddr, Arc<Hub>) {
    let config = ServerConfig {
        hub: fast_config(),
        max_message_bytes: 4096,
        ..ServerConfig::default()
    };
    let hub = Hub::new(config.hub.clone(), Arc::new(SecretMooseFactory));
    let router = api::router(hub.clone(), &config);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (addr, hub)
}

async fn ws_connect(addr: SocketAddr) -> (Client, String) {
    let (ws, response) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
    let user_id = response
        .headers()
        .get("x-user-id")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    (ws, user_id)
}

async fn ws_send(ws: &mut Client, frame: Value) {
    ws.send(WsMessage::Text(frame.to_string().into())).await.unwrap();
}

async fn ws_recv(ws: &mut Client) -> Value {
    loop {
        if let WsMessage::Text(text) = ws.next().await.unwrap().unwrap() {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

async fn ws_expect(ws: &mut Client, kind: &str) -> Value {
    tokio::time::timeout(WAIT, async {
        loop {
            let msg = ws_recv(ws).await;
            if msg["type"] == kind {
                return msg;
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("no {kind} within {WAIT:?}"))
}

#[tokio::test]
async fn new_connection_gets_identity_and_game_list() {
    let (addr, hub) = spawn_server().await;
    let (mut ws, user_id) = ws_connect(addr).await;

    let list = ws_expect(&mut ws, "GAME_LIST").await;
    assert_eq!(list["event_channel"], "GLOBAL");
    assert_eq!(list["message"], json!({}));

    let id = user_id.parse().unwrap();
    assert!(hub.session(id).await.is_some());
}

#[tokio::test]
async fn same_identity_shares_a_session_across_sockets() {
    let (addr, hub) = spawn_server().await;
    let (mut first, user_id) = ws_connect(addr).await;
    ws_expect(&mut first, "GAME_LIST").await;

    let mut request = format!("ws://{addr}/ws").into_client_request().unwrap();
    request
        .headers_mut()
        .insert("x-user-id", user_id.parse().unwrap());
    let (mut second, response) = connect_async(request).await.unwrap();
    assert_eq!(response.headers()["x-user-id"], user_id.as_str());

    ws_send(
        &mut second,
        json!({ "type": "CHANGE_NAME", "event_channel": "PLAYER", "message": "Mabel" }),
    )
    .await;

    // Both sockets hear the confirmation.
    for ws in [&mut first, &mut second] {
        let changed = ws_expect(ws, "NAME_CHANGED").await;
        assert_eq!(changed["message"]["name"], "Mabel");
    }
    assert_eq!(hub.lobby_size().await, 1);
}

#[tokio::test]
async fn five_ready_players_start_a_game() {
    let (addr, hub) = spawn_server().await;

    let mut players = Vec::new();
    for _ in 0..5 {
        let (mut ws, _) = ws_connect(addr).await;
        ws_expect(&mut ws, "GAME_LIST").await;
        players.push(ws);
    }

    ws_send(
        &mut players[0],
        json!({ "type": "CREATE_GAME", "event_channel": "GLOBAL", "message": { "name": "Moose Night" } }),
    )
    .await;
    let created = ws_expect(&mut players[0], "GAME_CREATED").await;
    assert_eq!(created["event_channel"], "PRIVATE");
    let game_id = created["message"]["id"].as_str().unwrap().to_string();

    for ws in players.iter_mut() {
        ws_send(
            ws,
            json!({ "type": "JOIN_GAME", "event_channel": "GAME", "game_id": game_id }),
        )
        .await;
    }
    // Wait until every seat is taken before readying up.
    for _ in 0..100 {
        let roster = hub.list_games().await.unwrap();
        if roster[&game_id]["players"].as_array().map(Vec::len) == Some(5) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    for ws in players.iter_mut() {
        ws_send(
            ws,
            json!({ "type": "ToggleReady", "event_channel": "GAME", "game_id": game_id }),
        )
        .await;
    }

    let mut fascists = 0;
    let mut moose = 0;
    for ws in players.iter_mut() {
        let role = ws_expect(ws, "ROLE_ASSIGNED").await;
        assert_eq!(role["event_channel"], "PRIVATE");
        assert_eq!(role["message"]["game_id"], game_id.as_str());
        if role["message"]["faction"] == "fascist" {
            fascists += 1;
        }
        if role["message"]["moose"] == true {
            moose += 1;
        }

        let started = ws_expect(ws, "GAME_STARTED").await;
        assert_eq!(started["event_channel"], "GAME");
        assert!(started["message"]["first_president"].is_object());
    }
    assert_eq!(fascists, 2);
    assert_eq!(moose, 1);

    let list = ws_expect(&mut players[0], "GAME_LIST").await;
    let mut status = list["message"][&game_id]["status"].clone();
    // Earlier roster updates may still be queued ahead of the started one.
    while status != "Started" {
        status = ws_expect(&mut players[0], "GAME_LIST").await["message"][&game_id]["status"].clone();
    }
}

#[tokio::test]
async fn bad_frames_get_private_errors() {
    let (addr, _hub) = spawn_server().await;
    let (mut ws, _) = ws_connect(addr).await;
    ws_expect(&mut ws, "GAME_LIST").await;

    ws.send(WsMessage::Text("{oops".to_string().into())).await.unwrap();
    let error = ws_expect(&mut ws, "ERROR").await;
    assert_eq!(error["event_channel"], "PRIVATE");
    assert_eq!(error["message"]["original_message"], "{oops");

    ws_send(
        &mut ws,
        json!({ "type": "JOIN_GAME", "event_channel": "GAME", "game_id": "missing" }),
    )
    .await;
    let error = ws_expect(&mut ws, "ERROR").await;
    assert_eq!(error["message"]["error"], "could not find game with id 'missing'");
}

#[tokio::test]
async fn closing_the_socket_detaches_but_keeps_the_session() {
    let (addr, hub) = spawn_server().await;
    let (mut ws, user_id) = ws_connect(addr).await;
    ws_expect(&mut ws, "GAME_LIST").await;
    let session = hub.session(user_id.parse().unwrap()).await.unwrap();
    assert_eq!(session.total_connections().await, Ok(1));

    ws.close(None).await.unwrap();

    let mut detached = false;
    for _ in 0..100 {
        if session.total_connections().await == Ok(0) {
            detached = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(detached);
    assert_eq!(hub.lobby_size().await, 1);
}
