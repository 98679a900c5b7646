use crate::publish::domain::session_registry::SessionId;
use crate::transport::engine_io::{self, ClientPacket, DEFAULT_NAMESPACE};

/// What the connection handler must do in response to a client frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionAction {
    /// Send this text frame to the client.
    Reply(String),
    /// Register the session with the connection tracker.
    Subscribe,
    /// Remove the session from the connection tracker.
    Unsubscribe,
    /// Close the WebSocket.
    Close,
}

/// Protocol state of one WebSocket connection.
///
/// Pure: it only turns client frames into [`SessionAction`]s, so the
/// handshake and heartbeat rules can be exercised without a socket.
pub struct SocketSession {
    engine_sid: SessionId,
    socket_sid: SessionId,
    subscribed: bool,
    awaiting_pong: bool,
}

impl SocketSession {
    pub fn new() -> Self {
        Self {
            engine_sid: SessionId::generate(),
            socket_sid: SessionId::generate(),
            subscribed: false,
            awaiting_pong: false,
        }
    }

    /// Socket.IO session id, the one registered with the tracker.
    pub fn id(&self) -> &SessionId {
        &self.socket_sid
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    /// True between a server ping and the client's pong.
    pub fn is_awaiting_pong(&self) -> bool {
        self.awaiting_pong
    }

    /// The Engine.IO open packet sent right after the upgrade.
    pub fn open(&self, ping_interval_ms: u64, ping_timeout_ms: u64) -> String {
        engine_io::open_packet(self.engine_sid.as_str(), ping_interval_ms, ping_timeout_ms)
    }

    pub fn on_text(&mut self, text: &str) -> Vec<SessionAction> {
        let packet = match ClientPacket::decode(text) {
            Ok(packet) => packet,
            Err(e) => {
                log::debug!("Ignoring packet from {}: {e}", self.socket_sid);
                return Vec::new();
            }
        };

        match packet {
            ClientPacket::Ping => vec![SessionAction::Reply(engine_io::PONG.to_string())],
            ClientPacket::Pong => {
                self.awaiting_pong = false;
                Vec::new()
            }
            ClientPacket::Close => self.close(),
            ClientPacket::Connect { namespace } if namespace == DEFAULT_NAMESPACE => {
                if self.subscribed {
                    return Vec::new();
                }
                self.subscribed = true;
                vec![
                    SessionAction::Subscribe,
                    SessionAction::Reply(engine_io::connect_ack(self.socket_sid.as_str())),
                ]
            }
            ClientPacket::Connect { namespace } => vec![SessionAction::Reply(
                engine_io::connect_error(&namespace, "Invalid namespace"),
            )],
            ClientPacket::Disconnect { namespace } if namespace == DEFAULT_NAMESPACE => {
                self.close()
            }
            ClientPacket::Event { name, .. } => {
                log::debug!("Ignoring client event {name:?} from {}", self.socket_sid);
                Vec::new()
            }
            ClientPacket::Disconnect { .. }
            | ClientPacket::Upgrade
            | ClientPacket::Noop
            | ClientPacket::Ignored => Vec::new(),
        }
    }

    /// Heartbeat tick. Returns the ping to send, or `Close` when the
    /// previous ping was never answered.
    pub fn on_ping_tick(&mut self) -> Vec<SessionAction> {
        if self.awaiting_pong {
            log::info!("Client {} missed a heartbeat", self.socket_sid);
            return self.close();
        }
        self.awaiting_pong = true;
        vec![SessionAction::Reply(engine_io::PING.to_string())]
    }

    /// The ping timeout elapsed. Closes unless the pong already arrived.
    pub fn on_pong_timeout(&mut self) -> Vec<SessionAction> {
        if !self.awaiting_pong {
            return Vec::new();
        }
        log::info!("Client {} did not answer a ping in time", self.socket_sid);
        self.close()
    }

    /// Actions to run when the connection goes away for any reason.
    pub fn on_closed(&mut self) -> Vec<SessionAction> {
        if self.subscribed {
            self.subscribed = false;
            vec![SessionAction::Unsubscribe]
        } else {
            Vec::new()
        }
    }

    fn close(&mut self) -> Vec<SessionAction> {
        let mut actions = self.on_closed();
        actions.push(SessionAction::Close);
        actions
    }
}

impl Default for SocketSession {
    fn default() -> Self {
        Self::new()
    }
}
