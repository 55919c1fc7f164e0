use std::{collections::{HashMap, HashSet}, ops::ControlFlow, sync::{Arc, Weak, atomic::{AtomicBool, AtomicU64, Ordering}}, time::Duration};

use base64::{engine::general_purpose, Engine};
use log::{info, warn};
use serde_json::Value;
use tokio::sync::{mpsc::{self, error::TrySendError}, RwLock};
use tokio::time::{interval_at, Instant};

use crate::models::relay_models::{ClientEvent, ServerEvent};

use super::nlu_service::NluService;

/// Room every session joins on connect; heartbeats are emitted to it.
pub const HEARTBEAT_ROOM: &str = "heartbeat";

/// Identity sent to the NLU backend for relayed messages.
pub const RELAY_SENDER: &str = "test-user";

pub type SessionId = u64;

struct Session {
    count: u64,
    rooms: HashSet<String>,
    tx: mpsc::Sender<ServerEvent>,
}

///
/// A registered channel: its id and the queue of events to write to it
///
pub struct Connection {
    pub id: SessionId,
    pub events: mpsc::Receiver<ServerEvent>,
    /// Whether this connect was the one that started the heartbeat task
    pub started_heartbeat: bool,
}

///
/// Process-wide hub of realtime sessions. Built once at startup and shared
/// by every websocket; owns the heartbeat task.
///
pub struct RelayHub {
    sessions: RwLock<HashMap<SessionId, Session>>,
    next_id: AtomicU64,
    heartbeat_started: AtomicBool,
    heartbeat_interval: Duration,
    queue_capacity: usize,
    nlu: Arc<dyn NluService>,
}

impl RelayHub {
    ///
    /// Each session may have at most `queue_capacity` events waiting to be
    /// written; a session that falls that far behind is disconnected.
    ///
    pub fn new(nlu: Arc<dyn NluService>, heartbeat_interval: Duration, queue_capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            sessions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            heartbeat_started: AtomicBool::new(false),
            heartbeat_interval,
            queue_capacity: queue_capacity.max(1),
            nlu,
        })
    }

    ///
    /// Registers a new session with a zeroed counter, acknowledges it and
    /// makes sure the heartbeat is running
    ///
    pub async fn connect(self: &Arc<Self>) -> Connection {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, events) = mpsc::channel(self.queue_capacity);
        // The queue is empty and the receiver alive, so this cannot fail
        let _ = tx.try_send(ServerEvent::response("Connected", 0));

        let rooms = HashSet::from([HEARTBEAT_ROOM.to_string()]);
        self.sessions.write().await.insert(id, Session { count: 0, rooms, tx });
        info!("Relay session {id} connected");

        let started_heartbeat = self.ensure_heartbeat();
        Connection { id, events, started_heartbeat }
    }

    ///
    /// Drops the session's state. Queued events are still delivered.
    ///
    pub async fn disconnect(&self, id: SessionId) {
        if self.sessions.write().await.remove(&id).is_some() {
            info!("Relay session {id} disconnected");
        }
    }

    ///
    /// Spawns the heartbeat task unless it is already running. Returns `true`
    /// only for the single call that started it.
    ///
    pub fn ensure_heartbeat(self: &Arc<Self>) -> bool {
        if self.heartbeat_started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        let hub = Arc::downgrade(self);
        let period = self.heartbeat_interval;
        tokio::spawn(heartbeat(hub, period));
        info!("Relay heartbeat started, every {:?}", period);
        true
    }

    pub async fn session_count(&self, id: SessionId) -> Option<u64> {
        self.sessions.read().await.get(&id).map(|s| s.count)
    }

    pub async fn connected(&self) -> usize {
        self.sessions.read().await.len()
    }

    ///
    /// Parses a raw text frame and handles it. Unparseable frames are
    /// answered with a `relay_error` and do not end the channel.
    ///
    pub async fn handle_text(&self, id: SessionId, text: &str) -> ControlFlow<()> {
        match serde_json::from_str::<ClientEvent>(text) {
            Ok(event) => self.handle_event(id, event).await,
            Err(e) => {
                let count = self.session_count(id).await.unwrap_or_default();
                self.send_to(id, ServerEvent::error(format!("Unrecognized event: {e}"), count)).await;
                ControlFlow::Continue(())
            }
        }
    }

    ///
    /// Handles one client event. `Break` means the channel should close.
    ///
    pub async fn handle_event(&self, id: SessionId, event: ClientEvent) -> ControlFlow<()> {
        if let ClientEvent::MyPing = event {
            self.send_to(id, ServerEvent::MyPong).await;
            return ControlFlow::Continue(());
        }

        let Some(count) = self.bump(id).await else {
            warn!("Event for unknown relay session {id}");
            return ControlFlow::Break(());
        };

        match event {
            ClientEvent::MyEvent(data) => {
                self.send_to(id, ServerEvent::response(data, count)).await;
            }
            ClientEvent::MyBroadcastEvent(data) => {
                self.broadcast(ServerEvent::response(data, count)).await;
            }
            ClientEvent::RasaText(text) => {
                let reply = match self.nlu.send_text(RELAY_SENDER, &text).await {
                    Ok(messages) => {
                        let text = messages.into_iter().find_map(|m| m.text).unwrap_or_default();
                        ServerEvent::response(text, count)
                    }
                    Err(e) => {
                        warn!("NLU text relay failed for session {id}: {e}");
                        ServerEvent::error(e.to_string(), count)
                    }
                };
                self.send_to(id, reply).await;
            }
            ClientEvent::RasaVoice(text) => {
                let reply = match self.nlu.send_voice(RELAY_SENDER, &text).await {
                    Ok(voice) => ServerEvent::response(general_purpose::STANDARD.encode(&voice.body), count),
                    Err(e) => {
                        warn!("NLU voice relay failed for session {id}: {e}");
                        ServerEvent::error(e.to_string(), count)
                    }
                };
                self.send_to(id, reply).await;
            }
            ClientEvent::Join(room) => {
                let rooms = self.update_rooms(id, |rooms| { rooms.insert(room); }).await;
                self.send_to(id, ServerEvent::response(format!("In rooms: {}", rooms.join(", ")), count)).await;
            }
            ClientEvent::Leave(room) => {
                let rooms = self.update_rooms(id, |rooms| { rooms.remove(&room); }).await;
                self.send_to(id, ServerEvent::response(format!("In rooms: {}", rooms.join(", ")), count)).await;
            }
            ClientEvent::CloseRoom(room) => {
                self.emit_to_room(&room, ServerEvent::response(format!("Room {room} is closing."), count)).await;
                for session in self.sessions.write().await.values_mut() {
                    session.rooms.remove(&room);
                }
            }
            ClientEvent::MyRoomEvent(msg) => {
                self.emit_to_room(&msg.room, ServerEvent::response(msg.data, count)).await;
            }
            ClientEvent::DisconnectRequest => {
                self.send_to(id, ServerEvent::response("Disconnected!", count)).await;
                return ControlFlow::Break(());
            }
            ClientEvent::MyPing => {}
        }
        ControlFlow::Continue(())
    }

    ///
    /// Increments the session's counter, returning the new value
    ///
    async fn bump(&self, id: SessionId) -> Option<u64> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(&id)?;
        session.count += 1;
        Some(session.count)
    }

    async fn update_rooms(&self, id: SessionId, f: impl FnOnce(&mut HashSet<String>)) -> Vec<String> {
        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.get_mut(&id) else {
            return Vec::new();
        };
        f(&mut session.rooms);

        let mut rooms: Vec<_> = session.rooms.iter().cloned().collect();
        rooms.sort();
        rooms
    }

    async fn send_to(&self, id: SessionId, event: ServerEvent) {
        self.deliver(event, |sid, _| sid == id).await;
    }

    async fn broadcast(&self, event: ServerEvent) {
        self.deliver(event, |_, _| true).await;
    }

    async fn emit_to_room(&self, room: &str, event: ServerEvent) {
        self.deliver(event, |_, session| session.rooms.contains(room)).await;
    }

    ///
    /// Queues `event` for every session `target` selects. Sessions whose queue
    /// is full are dropped from the hub, which closes their queue once the
    /// writer has drained it.
    ///
    async fn deliver(&self, event: ServerEvent, target: impl Fn(SessionId, &Session) -> bool) {
        let mut lagging = Vec::new();
        {
            let sessions = self.sessions.read().await;
            for (&id, session) in sessions.iter() {
                if !target(id, session) {
                    continue;
                }
                if let Err(TrySendError::Full(_)) = session.tx.try_send(event.clone()) {
                    lagging.push(id);
                }
            }
        }

        if lagging.is_empty() {
            return;
        }
        let mut sessions = self.sessions.write().await;
        for id in lagging {
            if sessions.remove(&id).is_some() {
                warn!("Relay session {id} stopped reading its events, disconnecting it");
            }
        }
    }
}

///
/// Emits an increasing counter to the heartbeat room every `period` until
/// the hub is dropped
///
async fn heartbeat(weak: Weak<RelayHub>, period: Duration) {
    let mut ticker = interval_at(Instant::now() + period, period);
    let mut count: u64 = 0;
    loop {
        ticker.tick().await;
        let Some(hub) = weak.upgrade() else {
            return;
        };
        count += 1;
        hub.emit_to_room(HEARTBEAT_ROOM, ServerEvent::response(Value::from("Server generated event"), count)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::relay_models::RoomMessage, services::{nlu_service::{NluMessage, VoiceReply}, upstream_error::{self, UpstreamError}}};
    use axum::{async_trait, body::Bytes};
    use serde_json::json;

    struct StubNlu {
        fail: bool,
    }

    #[async_trait]
    impl NluService for StubNlu {
        async fn send_text(&self, sender: &str, message: &str) -> upstream_error::Result<Vec<NluMessage>> {
            if self.fail {
                return Err(UpstreamError::Status { status: 500, body: "boom".to_string() });
            }
            Ok(vec![NluMessage {
                recipient_id: Some(sender.to_string()),
                text: Some(format!("echo: {message}")),
                image: None,
            }])
        }

        async fn send_voice(&self, _sender: &str, message: &str) -> upstream_error::Result<VoiceReply> {
            if self.fail {
                return Err(UpstreamError::Malformed("no audio".to_string()));
            }
            Ok(VoiceReply { content_type: Some("audio/wav".to_string()), body: Bytes::from(message.to_string()) })
        }
    }

    fn hub(fail: bool) -> Arc<RelayHub> {
        RelayHub::new(Arc::new(StubNlu { fail }), Duration::from_secs(3600), 16)
    }

    fn drain(conn: &mut Connection) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(ev) = conn.events.try_recv() {
            events.push(ev);
        }
        events
    }

    #[tokio::test]
    async fn test_connect_acknowledges_with_zero_count() {
        let hub = hub(false);
        let mut conn = hub.connect().await;

        assert_eq!(drain(&mut conn), vec![ServerEvent::response("Connected", 0)]);
        assert_eq!(hub.session_count(conn.id).await, Some(0));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_heartbeat_starts_once_under_concurrent_connects() {
        let hub = hub(false);

        let handles: Vec<_> = (0..64).map(|_| {
            let hub = hub.clone();
            tokio::spawn(async move { hub.connect().await.started_heartbeat })
        }).collect();

        let mut started = 0;
        for handle in handles {
            if handle.await.unwrap() {
                started += 1;
            }
        }

        assert_eq!(started, 1);
        assert!(!hub.ensure_heartbeat());
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_counts_up() {
        let hub = RelayHub::new(Arc::new(StubNlu { fail: false }), Duration::from_secs(100), 16);
        let mut conn = hub.connect().await;
        drain(&mut conn);

        tokio::time::sleep(Duration::from_secs(250)).await;

        assert_eq!(drain(&mut conn), vec![
            ServerEvent::response("Server generated event", 1),
            ServerEvent::response("Server generated event", 2),
        ]);
    }

    #[tokio::test]
    async fn test_text_relay_counts_per_session() {
        let hub = hub(false);
        let mut a = hub.connect().await;
        let mut b = hub.connect().await;
        drain(&mut a);
        drain(&mut b);

        hub.handle_event(a.id, ClientEvent::RasaText("hi".to_string())).await;
        hub.handle_event(a.id, ClientEvent::RasaVoice("yo".to_string())).await;

        assert_eq!(hub.session_count(a.id).await, Some(2));
        assert_eq!(hub.session_count(b.id).await, Some(0));
        assert_eq!(drain(&mut a), vec![
            ServerEvent::response("echo: hi", 1),
            ServerEvent::response(general_purpose::STANDARD.encode("yo"), 2),
        ]);
        // Relayed replies go to the sender only
        assert!(drain(&mut b).is_empty());
    }

    #[tokio::test]
    async fn test_nlu_failure_is_relayed_as_error() {
        let hub = hub(true);
        let mut conn = hub.connect().await;
        drain(&mut conn);

        let flow = hub.handle_event(conn.id, ClientEvent::RasaText("hi".to_string())).await;

        assert!(flow.is_continue());
        let events = drain(&mut conn);
        assert!(matches!(&events[..], [ServerEvent::RelayError(e)] if e.count == 1));
        assert_eq!(hub.connected().await, 1);
    }

    #[tokio::test]
    async fn test_broadcast_reaches_everyone() {
        let hub = hub(false);
        let mut a = hub.connect().await;
        let mut b = hub.connect().await;
        drain(&mut a);
        drain(&mut b);

        hub.handle_event(a.id, ClientEvent::MyBroadcastEvent(json!("sale!"))).await;
        hub.handle_event(b.id, ClientEvent::MyEvent(json!("just me"))).await;

        assert_eq!(drain(&mut a), vec![ServerEvent::response(json!("sale!"), 1)]);
        assert_eq!(drain(&mut b), vec![
            ServerEvent::response(json!("sale!"), 1),
            ServerEvent::response(json!("just me"), 1),
        ]);
    }

    #[tokio::test]
    async fn test_rooms() {
        let hub = hub(false);
        let mut a = hub.connect().await;
        let mut b = hub.connect().await;

        hub.handle_event(a.id, ClientEvent::Join("jackets".to_string())).await;
        drain(&mut a);
        drain(&mut b);

        let msg = RoomMessage { room: "jackets".to_string(), data: json!("new stock") };
        hub.handle_event(b.id, ClientEvent::MyRoomEvent(msg.clone())).await;
        assert_eq!(drain(&mut a), vec![ServerEvent::response(json!("new stock"), 1)]);
        assert!(drain(&mut b).is_empty());

        hub.handle_event(a.id, ClientEvent::CloseRoom("jackets".to_string())).await;
        drain(&mut a);
        hub.handle_event(b.id, ClientEvent::MyRoomEvent(msg)).await;
        assert!(drain(&mut a).is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_request_breaks() {
        let hub = hub(false);
        let mut conn = hub.connect().await;
        drain(&mut conn);

        assert!(hub.handle_event(conn.id, ClientEvent::MyPing).await.is_continue());
        assert!(hub.handle_event(conn.id, ClientEvent::DisconnectRequest).await.is_break());
        assert_eq!(drain(&mut conn), vec![
            ServerEvent::MyPong,
            ServerEvent::response("Disconnected!", 1),
        ]);

        hub.disconnect(conn.id).await;
        assert_eq!(hub.session_count(conn.id).await, None);
        assert_eq!(hub.connected().await, 0);
    }

    #[tokio::test]
    async fn test_unknown_event_is_reported() {
        let hub = hub(false);
        let mut conn = hub.connect().await;
        drain(&mut conn);

        let flow = hub.handle_text(conn.id, r#"{"event":"launch_rockets"}"#).await;

        assert!(flow.is_continue());
        assert!(matches!(&drain(&mut conn)[..], [ServerEvent::RelayError(_)]));
    }

    #[tokio::test]
    async fn test_lagging_session_is_disconnected() {
        let hub = RelayHub::new(Arc::new(StubNlu { fail: false }), Duration::from_secs(3600), 2);
        let mut slow = hub.connect().await;
        let mut sender = hub.connect().await;

        // `slow` never reads: its queue holds "Connected" plus one broadcast
        for n in 1..=3 {
            hub.handle_event(sender.id, ClientEvent::MyBroadcastEvent(json!(n))).await;
            drain(&mut sender);
        }

        assert_eq!(hub.session_count(slow.id).await, None);
        assert_eq!(hub.session_count(sender.id).await, Some(3));
        assert_eq!(hub.connected().await, 1);

        // What was queued before the cut is still delivered, then the queue closes
        assert_eq!(slow.events.recv().await, Some(ServerEvent::response("Connected", 0)));
        assert_eq!(slow.events.recv().await, Some(ServerEvent::response(json!(1), 1)));
        assert_eq!(slow.events.recv().await, None);
    }

    #[tokio::test]
    async fn test_reading_session_is_kept_under_load() {
        let hub = RelayHub::new(Arc::new(StubNlu { fail: false }), Duration::from_secs(3600), 2);
        let mut a = hub.connect().await;
        let mut b = hub.connect().await;
        drain(&mut a);
        drain(&mut b);

        for n in 1..=50 {
            hub.handle_event(a.id, ClientEvent::MyBroadcastEvent(json!(n))).await;
            assert_eq!(drain(&mut a), vec![ServerEvent::response(json!(n), n)]);
            assert_eq!(drain(&mut b), vec![ServerEvent::response(json!(n), n)]);
        }

        assert_eq!(hub.connected().await, 2);
    }
}
