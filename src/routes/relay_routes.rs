use std::{sync::Arc, ops::ControlFlow};

use axum::{Router, routing::get, extract::{ws::{Message, WebSocket, WebSocketUpgrade}, State}, response::IntoResponse};
use futures::{SinkExt, StreamExt};
use log::{debug, error};

use crate::services::relay_service::{Connection, RelayHub, SessionId};

pub fn routes(relay_hub: Arc<RelayHub>) -> Router {
    Router::new()
        // Routes
        .route("/socket", get(ws_handler))
        // State
        .with_state(relay_hub)
}

/// Called when the HTTP GET starting the websocket negotiation lands.
/// After it returns, the connection switches to the websocket protocol.
async fn ws_handler(ws: WebSocketUpgrade, State(relay_hub): State<Arc<RelayHub>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, relay_hub))
}

/// One writer task and one reader task per connection
async fn handle_socket(socket: WebSocket, relay_hub: Arc<RelayHub>) {
    let Connection { id, mut events, .. } = relay_hub.connect().await;
    let (mut sender, mut receiver) = socket.split();

    // Drains the session's queue onto the socket. Ends once the hub drops
    // the session (closing the queue) or the client goes away.
    let mut writer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    error!("Could not serialize relay event for session {id}: {:?}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        sender.close().await.ok();
    });

    let hub = relay_hub.clone();
    let mut reader = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if process_message(msg, id, &hub).await.is_break() {
                break;
            }
        }
    });

    // The writer finishing first means the hub dropped the session (or the
    // socket failed), so nothing the client sends can be answered any more
    let writer_done = tokio::select! {
        _ = &mut reader => false,
        res = &mut writer => {
            if let Err(e) = res {
                error!("Relay writer for session {id} failed: {:?}", e);
            }
            reader.abort();
            true
        }
    };

    relay_hub.disconnect(id).await;
    if !writer_done {
        if let Err(e) = writer.await {
            error!("Relay writer for session {id} failed: {:?}", e);
        }
    }
}

async fn process_message(msg: Message, id: SessionId, relay_hub: &RelayHub) -> ControlFlow<()> {
    match msg {
        Message::Text(text) => relay_hub.handle_text(id, &text).await,
        Message::Close(frame) => {
            debug!("Session {id} sent close {:?}", frame);
            ControlFlow::Break(())
        }
        // Pings are answered by the transport; binary frames are not part of the protocol
        _ => ControlFlow::Continue(()),
    }
}

#[cfg(test)]
mod tests {
    use std::{net::{SocketAddr, TcpListener}, time::Duration};

    use futures::{SinkExt, StreamExt};
    use serde_json::{json, Value};
    use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage, MaybeTlsStream, WebSocketStream};

    use crate::{app::AppServices, test_utils::test_app};

    type Client = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

    const UNUSED_UPSTREAM: &str = "http://127.0.0.1:9";

    async fn serve() -> (SocketAddr, AppServices) {
        let (router, services) = test_app(UNUSED_UPSTREAM.to_string(), UNUSED_UPSTREAM.to_string()).await;
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = axum::Server::from_tcp(listener).unwrap().serve(router.into_make_service());
        tokio::spawn(server);
        (addr, services)
    }

    async fn next_event(client: &mut Client) -> Value {
        match client.next().await {
            Some(Ok(WsMessage::Text(text))) => serde_json::from_str(&text).unwrap(),
            other => panic!("expected a text frame, got {:?}", other),
        }
    }

    async fn wait_for_sessions(services: &AppServices, expected: usize) {
        for _ in 0..100 {
            if services.relay_hub.connected().await == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(services.relay_hub.connected().await, expected);
    }

    #[tokio::test]
    async fn test_socket_round_trip_and_disconnect_request() {
        let (addr, services) = serve().await;
        let (mut client, _) = connect_async(format!("ws://{addr}/socket")).await.unwrap();

        assert_eq!(next_event(&mut client).await, json!({ "event": "my_response", "data": { "data": "Connected", "count": 0 } }));

        client.send(WsMessage::Text(r#"{"event":"my_event","data":"hello"}"#.to_string())).await.unwrap();
        assert_eq!(next_event(&mut client).await, json!({ "event": "my_response", "data": { "data": "hello", "count": 1 } }));

        client.send(WsMessage::Text(r#"{"event":"disconnect_request"}"#.to_string())).await.unwrap();
        assert_eq!(next_event(&mut client).await, json!({ "event": "my_response", "data": { "data": "Disconnected!", "count": 2 } }));

        // The goodbye is followed by the server closing the socket
        assert!(matches!(client.next().await, Some(Ok(WsMessage::Close(_))) | None));
        wait_for_sessions(&services, 0).await;
    }

    #[tokio::test]
    async fn test_dropped_client_releases_session() {
        let (addr, services) = serve().await;
        let (mut client, _) = connect_async(format!("ws://{addr}/socket")).await.unwrap();
        next_event(&mut client).await;
        assert_eq!(services.relay_hub.connected().await, 1);

        drop(client);

        wait_for_sessions(&services, 0).await;
    }

    #[tokio::test]
    async fn test_unknown_event_keeps_socket_open() {
        let (addr, _services) = serve().await;
        let (mut client, _) = connect_async(format!("ws://{addr}/socket")).await.unwrap();
        next_event(&mut client).await;

        client.send(WsMessage::Text(r#"{"event":"launch_rockets"}"#.to_string())).await.unwrap();
        assert_eq!(next_event(&mut client).await["event"], "relay_error");

        client.send(WsMessage::Text(r#"{"event":"my_ping"}"#.to_string())).await.unwrap();
        assert_eq!(next_event(&mut client).await, json!({ "event": "my_pong" }));
    }
}
