//! WebSocket transport for the join protocol.
//!
//! Each upgraded connection is one actor. Inbound text frames are forwarded
//! to the connection's `JoinSession` task; envelopes queued on the
//! connection's outbound channel are written back as text frames. A protocol
//! error or a missed heartbeat stops the actor, which ends the session task
//! and detaches the player. Every connection is greeted with a `connected`
//! envelope before anything else is written.

use crate::player::{ConnectionId, PlayerConnection};
use crate::registry::LobbyRegistry;
use crate::session::JoinSession;
use actix::{Actor, ActorContext, AsyncContext, Handler, Message, StreamHandler};
use actix_web::{web, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use trivia_lobby_protocol::{Envelope, JoinRequest};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);
const INBOUND_BUFFER: usize = 32;

/// Shared state for WebSocket handlers.
pub struct WsState {
    pub registry: Arc<LobbyRegistry>,
    /// Origins allowed to upgrade. Empty means any origin.
    pub allowed_origins: Vec<String>,
    /// Largest inbound frame accepted, in bytes.
    pub max_frame_size: usize,
    /// Envelopes buffered per connection before sends start failing.
    pub outbound_buffer: usize,
}

/// WebSocket actor for one joined (or joining) client.
pub struct LobbyWsActor {
    connection_id: ConnectionId,
    /// Feeds inbound frames to the session task. Dropped on stop.
    inbound_tx: Option<mpsc::Sender<String>>,
    session: Option<(JoinSession, mpsc::Receiver<String>)>,
    outbound_rx: Option<mpsc::Receiver<String>>,
    initial_join: Option<JoinRequest>,
    last_heartbeat: Instant,
}

/// Serialized envelope to write to the socket.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Outbound(pub String);

impl LobbyWsActor {
    pub fn new(
        registry: Arc<LobbyRegistry>,
        outbound_buffer: usize,
        initial_join: Option<JoinRequest>,
    ) -> Self {
        let (conn, outbound_rx) = PlayerConnection::channel(outbound_buffer);
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_BUFFER);
        let connection_id = conn.id();

        Self {
            connection_id,
            inbound_tx: Some(inbound_tx),
            session: Some((JoinSession::new(registry, conn), inbound_rx)),
            outbound_rx: Some(outbound_rx),
            initial_join,
            last_heartbeat: Instant::now(),
        }
    }

    fn heartbeat(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.last_heartbeat) > CLIENT_TIMEOUT {
                tracing::debug!(connection = ?act.connection_id, "WebSocket client heartbeat timeout");
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    fn start_listeners(&mut self, ctx: &mut ws::WebsocketContext<Self>) {
        // Envelopes from the lobby to the socket
        if let Some(mut outbound_rx) = self.outbound_rx.take() {
            let addr = ctx.address();
            actix::spawn(async move {
                while let Some(text) = outbound_rx.recv().await {
                    if addr.send(Outbound(text)).await.is_err() {
                        break;
                    }
                }
            });
        }

        // The join protocol loop for this connection only
        if let Some((mut session, inbound_rx)) = self.session.take() {
            let initial_join = self.initial_join.take();
            actix::spawn(async move {
                if let Some(request) = initial_join {
                    session.join(request).await;
                }
                session.run(inbound_rx).await;
            });
        }
    }

    fn forward(&self, text: String, ctx: &mut ws::WebsocketContext<Self>) {
        let Some(inbound_tx) = &self.inbound_tx else {
            return;
        };
        if let Err(e) = inbound_tx.try_send(text) {
            tracing::warn!(connection = ?self.connection_id, "Dropping inbound message: {}", e);
            if let Ok(text) = Envelope::failure("Too many pending messages").to_text() {
                ctx.text(text);
            }
        }
    }
}

impl Actor for LobbyWsActor {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::debug!(connection = ?self.connection_id, "WebSocket connection opened");
        if let Ok(text) = Envelope::connected("Connected to lobby").to_text() {
            ctx.text(text);
        }
        self.heartbeat(ctx);
        self.start_listeners(ctx);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        // Ends the session loop, which detaches the player.
        self.inbound_tx.take();
        tracing::debug!(connection = ?self.connection_id, "WebSocket connection closed");
    }
}

impl Handler<Outbound> for LobbyWsActor {
    type Result = ();

    fn handle(&mut self, msg: Outbound, ctx: &mut Self::Context) {
        ctx.text(msg.0);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for LobbyWsActor {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.last_heartbeat = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.last_heartbeat = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                self.last_heartbeat = Instant::now();
                self.forward(text.to_string(), ctx);
            }
            Ok(ws::Message::Binary(data)) => {
                self.last_heartbeat = Instant::now();
                match String::from_utf8(data.to_vec()) {
                    Ok(text) => self.forward(text, ctx),
                    Err(_) => {
                        if let Ok(text) = Envelope::failure("Expected UTF-8 text").to_text() {
                            ctx.text(text);
                        }
                    }
                }
            }
            Ok(ws::Message::Close(reason)) => {
                tracing::debug!(connection = ?self.connection_id, "WebSocket close: {:?}", reason);
                ctx.close(reason);
                ctx.stop();
            }
            Ok(ws::Message::Continuation(_)) | Ok(ws::Message::Nop) => (),
            Err(e) => {
                // A broken stream never recovers; stop instead of reading on.
                tracing::warn!(connection = ?self.connection_id, "WebSocket read error: {}", e);
                ctx.stop();
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct JoinQuery {
    pub nickname: Option<String>,
}

/// `GET /joinlobby` - upgrade, then join by message.
pub async fn join_lobby_ws(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<WsState>,
) -> Result<HttpResponse, actix_web::Error> {
    if let Some(rejected) = check_origin(&req, &state) {
        return Ok(rejected);
    }

    let actor = LobbyWsActor::new(Arc::clone(&state.registry), state.outbound_buffer, None);
    start(actor, &req, stream, state.max_frame_size)
}

/// `GET /lobbies/{code}/join[?nickname=..]` - join a known lobby on upgrade.
///
/// Without a nickname the connection joins under an assigned `player<N>` name.
pub async fn lobby_join_ws(
    req: HttpRequest,
    stream: web::Payload,
    path: web::Path<String>,
    query: web::Query<JoinQuery>,
    state: web::Data<WsState>,
) -> Result<HttpResponse, actix_web::Error> {
    if let Some(rejected) = check_origin(&req, &state) {
        return Ok(rejected);
    }

    let code = path.into_inner();
    if !state.registry.contains(&code) {
        return Ok(HttpResponse::NotFound().json(Envelope::failure(format!("No such lobby: {code}"))));
    }

    let initial_join = JoinRequest {
        code,
        nickname: query.into_inner().nickname.filter(|n| !n.trim().is_empty()),
    };
    let actor = LobbyWsActor::new(
        Arc::clone(&state.registry),
        state.outbound_buffer,
        Some(initial_join),
    );
    start(actor, &req, stream, state.max_frame_size)
}

fn start(
    actor: LobbyWsActor,
    req: &HttpRequest,
    stream: web::Payload,
    max_frame_size: usize,
) -> Result<HttpResponse, actix_web::Error> {
    ws::WsResponseBuilder::new(actor, req, stream)
        .frame_size(max_frame_size)
        .start()
        .map_err(|e| {
            tracing::warn!("Couldn't upgrade connection: {}", e);
            e
        })
}

/// `Some(403)` when the request's origin is not on the allow-list.
fn check_origin(req: &HttpRequest, state: &WsState) -> Option<HttpResponse> {
    if origin_allowed(req, &state.allowed_origins) {
        return None;
    }
    tracing::warn!(origin = ?req.headers().get("Origin"), "Rejected WebSocket origin");
    Some(HttpResponse::Forbidden().json(Envelope::failure("Origin not allowed")))
}

pub(crate) fn origin_allowed(req: &HttpRequest, allowed: &[String]) -> bool {
    if allowed.is_empty() {
        return true;
    }
    req.headers()
        .get("Origin")
        .and_then(|v| v.to_str().ok())
        .map(|origin| allowed.iter().any(|a| a == origin))
        .unwrap_or(false)
}
