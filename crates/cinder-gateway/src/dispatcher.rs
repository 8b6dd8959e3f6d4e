use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, broadcast, mpsc};
use uuid::Uuid;

use cinder_types::events::GatewayEvent;

/// One live gateway connection for a user. A user has at most one session;
/// a reconnect replaces it and the old connection loop finds its `conn_id`
/// no longer current when it tears down.
struct Session {
    conn_id: Uuid,
    username: String,
    tx: mpsc::UnboundedSender<GatewayEvent>,
}

/// Routes events to connected clients. Presence changes fan out over a
/// broadcast channel; match and preview events go only to the two members
/// of the match, over per-session targeted channels.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    broadcast_tx: broadcast::Sender<GatewayEvent>,
    sessions: RwLock<HashMap<Uuid, Session>>,
}

/// What a freshly opened session needs before its event loop starts:
/// the targeted receiver, the id that proves ownership at teardown, and a
/// snapshot of who was already online for the initial roster push.
pub struct SessionTicket {
    pub conn_id: Uuid,
    pub events: mpsc::UnboundedReceiver<GatewayEvent>,
    pub peers: Vec<(Uuid, String)>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(1024);
        Self {
            inner: Arc::new(DispatcherInner {
                broadcast_tx,
                sessions: RwLock::new(HashMap::new()),
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.inner.broadcast_tx.subscribe()
    }

    pub fn broadcast(&self, event: GatewayEvent) {
        let _ = self.inner.broadcast_tx.send(event);
    }

    /// Register a session for `user_id`, replacing any previous one, and
    /// announce the user online.
    pub async fn open_session(&self, user_id: Uuid, username: &str) -> SessionTicket {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();

        let peers = {
            let mut sessions = self.inner.sessions.write().await;
            let peers = sessions
                .iter()
                .filter(|(id, _)| **id != user_id)
                .map(|(id, s)| (*id, s.username.clone()))
                .collect();
            sessions.insert(
                user_id,
                Session {
                    conn_id,
                    username: username.to_string(),
                    tx,
                },
            );
            peers
        };

        self.broadcast(GatewayEvent::PresenceUpdate {
            user_id,
            username: username.to_string(),
            online: true,
        });

        SessionTicket {
            conn_id,
            events: rx,
            peers,
        }
    }

    /// Tear down a session and announce the user offline — but only if
    /// `conn_id` still owns the slot. A reconnect may have replaced the
    /// session while this connection's teardown was in flight.
    pub async fn close_session(&self, user_id: Uuid, conn_id: Uuid) {
        let username = {
            let mut sessions = self.inner.sessions.write().await;
            let owns_slot = sessions
                .get(&user_id)
                .is_some_and(|s| s.conn_id == conn_id);
            if !owns_slot {
                return;
            }
            sessions
                .remove(&user_id)
                .map(|s| s.username)
                .unwrap_or_default()
        };

        self.broadcast(GatewayEvent::PresenceUpdate {
            user_id,
            username,
            online: false,
        });
    }

    /// Deliver an event to both members of a match. Offline members simply
    /// miss the push and catch up over REST.
    pub async fn push_to_members(&self, members: [Uuid; 2], event: GatewayEvent) {
        let sessions = self.inner.sessions.read().await;
        for member in members {
            if let Some(s) = sessions.get(&member) {
                let _ = s.tx.send(event.clone());
            }
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
