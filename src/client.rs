//! Connection lifecycle state machine, frame router and public facade.
//!
//! One client owns at most one live transport handle. The lifecycle is
//! `Idle -> Running -> Closing -> Stopped`; the state itself is the intent
//! flag, so `Closing`/`Stopped` are what suppress the reconnect loop. While
//! `Running`, every connection starts with a freshly signed auth request, and
//! any unexpected transport death leads straight back to connect + re-auth.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};

use crate::config::{ClientConfig, Credentials, ReconnectPolicy};
use crate::error::ClientError;
use crate::logger::{default_logger, Logger};
use crate::protocol::{
    AuthOutcome, AuthParams, AuthRequest, Inbound, Pong, PushMessage, SubRequest,
};
use crate::signer;
use crate::transport::{Transport, TransportCommand, TransportEvent, TransportHandle, WsTransport};

/// Lifecycle of one client instance. `Closing` and `Stopped` double as the
/// "do not reconnect" intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Running,
    Closing,
    Stopped,
}

/// Caller-supplied event sink.
///
/// Dispatch is fire-and-forget: the router spawns each invocation and moves
/// on to the next inbound frame without awaiting it, so implementations must
/// not assume exclusive access between invocations.
#[async_trait]
pub trait PushHandler: Send + Sync {
    /// Every routed frame that is neither the keepalive nor the auth reply.
    /// The payload is channel-defined and delivered unmodified.
    async fn on_message(&self, message: PushMessage, client: Client);

    /// Outcome of the auth handshake, once per connection. The default does
    /// nothing; the router logs the outcome either way.
    async fn on_auth_result(&self, _outcome: AuthOutcome, _client: Client) {}
}

/// Construction parameters for [`Client`].
pub struct ClientOptions {
    pub name: String,
    pub endpoint_url: String,
    pub credentials: Credentials,
    pub reconnect: ReconnectPolicy,
    pub logger: Option<Arc<dyn Logger>>,
}

impl ClientOptions {
    pub fn new(endpoint_url: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            name: "PushClient".to_string(),
            endpoint_url: endpoint_url.into(),
            credentials,
            reconnect: ReconnectPolicy::default(),
            logger: None,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    pub fn logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }
}

struct ClientInner {
    config: ClientConfig,
    reconnect: ReconnectPolicy,
    logger: Arc<dyn Logger>,
    transport: Arc<dyn Transport>,
    handler: Arc<dyn PushHandler>,
    state: watch::Sender<ConnectionState>,
    /// Send path of the current connection. `None` between connections.
    conn: Mutex<Option<mpsc::UnboundedSender<TransportCommand>>>,
}

/// Push channel client facade: `run` / `subscribe` / `close`.
///
/// Cheap to clone; clones share the same connection. A clone is handed to
/// every handler invocation so handlers can subscribe or close from inside
/// the callback.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    /// Build a client over the production WebSocket transport. Fails only on
    /// an invalid endpoint URL.
    pub fn new(options: ClientOptions, handler: Arc<dyn PushHandler>) -> Result<Self, ClientError> {
        Self::with_transport(options, handler, Arc::new(WsTransport))
    }

    /// Build a client over a custom transport. This is the seam test doubles
    /// plug into.
    pub fn with_transport(
        options: ClientOptions,
        handler: Arc<dyn PushHandler>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ClientError> {
        let config = ClientConfig::new(options.name, options.endpoint_url, options.credentials)?;
        let (state, _) = watch::channel(ConnectionState::Idle);

        Ok(Self {
            inner: Arc::new(ClientInner {
                config,
                reconnect: options.reconnect,
                logger: options.logger.unwrap_or_else(default_logger),
                transport,
                handler,
                state,
                conn: Mutex::new(None),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    /// Start the connection, or force a reconnect when already running.
    ///
    /// Idle/Stopped: transitions to Running and spawns the supervisor task.
    /// Running: closes the current transport; the supervisor observes the
    /// state is still Running and opens a fresh connection. Failures while
    /// closing the stale transport are logged and the handle discarded.
    pub fn run(&self) {
        let mut reconnect_now = false;
        let mut spawn_supervisor = false;
        self.inner.state.send_if_modified(|state| match *state {
            ConnectionState::Running => {
                reconnect_now = true;
                false
            }
            // Supervisor is still winding down; revive it in place.
            ConnectionState::Closing => {
                *state = ConnectionState::Running;
                true
            }
            ConnectionState::Idle | ConnectionState::Stopped => {
                *state = ConnectionState::Running;
                spawn_supervisor = true;
                true
            }
        });

        if reconnect_now {
            self.inner
                .logger
                .info(&format!("[{}] reconnect requested", self.name()));
            if let Some(commands) = self.inner.conn.lock().as_ref() {
                if commands.send(TransportCommand::Close).is_err() {
                    self.inner
                        .logger
                        .error(&format!("[{}] closing stale transport failed", self.name()));
                }
            }
            return;
        }

        if spawn_supervisor {
            let inner = self.inner.clone();
            tokio::spawn(async move {
                inner.supervise().await;
            });
        }
    }

    /// Send a subscription request for `channel` over the current transport.
    ///
    /// Silent no-op when no transport is live. The client keeps no durable
    /// subscription set: after a reconnect the caller must re-subscribe,
    /// typically from its `on_auth_result` handler.
    pub fn subscribe(&self, channel: &str) {
        let frame = match serde_json::to_string(&SubRequest::new(channel)) {
            Ok(frame) => frame,
            Err(err) => {
                self.inner
                    .logger
                    .error(&format!("[{}] sub encode error: {}", self.name(), err));
                return;
            }
        };

        match self.inner.conn.lock().as_ref() {
            Some(commands) => {
                let _ = commands.send(TransportCommand::SendText(frame));
            }
            None => {
                self.inner.logger.debug(&format!(
                    "[{}] sub {} skipped: no active transport",
                    self.name(),
                    channel
                ));
            }
        }
    }

    /// Stop the client. Disables automatic reconnects and closes the active
    /// transport; safe to call when already stopped. A later explicit `run`
    /// starts the client again from scratch.
    pub fn close(&self) {
        let mut notify_conn = false;
        self.inner.state.send_if_modified(|state| match *state {
            ConnectionState::Running => {
                *state = ConnectionState::Closing;
                notify_conn = true;
                true
            }
            ConnectionState::Idle => {
                *state = ConnectionState::Stopped;
                true
            }
            ConnectionState::Closing | ConnectionState::Stopped => false,
        });

        if notify_conn {
            self.inner
                .logger
                .info(&format!("[{}] close requested", self.name()));
            if let Some(commands) = self.inner.conn.lock().as_ref() {
                let _ = commands.send(TransportCommand::Close);
            }
        }
    }
}

impl ClientInner {
    /// Exit check for the supervisor: when the state is no longer Running,
    /// settle in Stopped and report true. Runs atomically against `run()`'s
    /// Closing-revival, so a revived supervisor keeps looping instead.
    fn settle_if_stopping(&self) -> bool {
        self.state.send_if_modified(|state| {
            if *state == ConnectionState::Running {
                false
            } else {
                *state = ConnectionState::Stopped;
                true
            }
        })
    }

    /// Connect / authenticate / route until the connection dies, then either
    /// reconnect or settle, per state and retry policy.
    async fn supervise(self: Arc<Self>) {
        let mut failures: u32 = 0;

        loop {
            if self.settle_if_stopping() {
                return;
            }

            match self.transport.connect(&self.config.endpoint_url).await {
                Ok(handle) => {
                    failures = 0;
                    self.logger.debug(&format!("[{}] ws open", self.config.name));
                    if let Err(err) = self.drive(handle).await {
                        self.logger
                            .error(&format!("[{}] session error: {}", self.config.name, err));
                        if !err.is_recoverable() {
                            self.state.send_replace(ConnectionState::Stopped);
                            return;
                        }
                    }
                    self.logger.info(&format!("[{}] ws close", self.config.name));
                }
                Err(err) => {
                    self.logger
                        .error(&format!("[{}] ws connect error: {}", self.config.name, err));
                    if !err.is_recoverable() {
                        self.state.send_replace(ConnectionState::Stopped);
                        return;
                    }
                }
            }

            if self.settle_if_stopping() {
                return;
            }

            failures += 1;
            if self.reconnect.exhausted(failures) {
                self.logger.error(&format!(
                    "[{}] giving up after {} reconnect attempts",
                    self.config.name,
                    failures - 1
                ));
                self.state.send_replace(ConnectionState::Stopped);
                return;
            }

            self.logger.info(&format!("[{}] ws reopen", self.config.name));
            if !self.reconnect.delay.is_zero() {
                tokio::time::sleep(self.reconnect.delay).await;
            }
        }
    }

    /// Drive one connection: auth first, then route events in receipt order
    /// until the transport reports closed/errored or the state leaves
    /// Running. An error here means the session could not even start; the
    /// caller decides whether it is worth retrying.
    async fn drive(self: &Arc<Self>, handle: TransportHandle) -> Result<(), ClientError> {
        let TransportHandle {
            commands,
            mut events,
        } = handle;

        // Auth is the first frame on every connection.
        let frame = self.auth_frame()?;
        if commands.send(TransportCommand::SendText(frame)).is_err() {
            self.logger
                .error(&format!("[{}] auth send failed", self.config.name));
            return Ok(());
        }

        // Expose the send path only after auth went out, so nothing a caller
        // does can be ordered before the handshake on this connection.
        *self.conn.lock() = Some(commands.clone());

        let mut state_rx = self.state.subscribe();
        // close() may have landed between connect and here.
        if *state_rx.borrow_and_update() != ConnectionState::Running {
            let _ = commands.send(TransportCommand::Close);
            *self.conn.lock() = None;
            return Ok(());
        }

        let mut auth_notified = false;
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(TransportEvent::Message(text)) => {
                        self.route(&commands, &mut auth_notified, &text);
                    }
                    Some(TransportEvent::Closed) | None => break,
                    Some(TransportEvent::Errored(err)) => {
                        self.logger
                            .error(&format!("[{}] ws error: {}", self.config.name, err));
                        break;
                    }
                },
                changed = state_rx.changed() => {
                    if changed.is_err() || *state_rx.borrow() != ConnectionState::Running {
                        let _ = commands.send(TransportCommand::Close);
                        break;
                    }
                }
            }
        }

        *self.conn.lock() = None;
        Ok(())
    }

    /// Classify one inbound frame and act on it. A malformed frame is fatal
    /// for that frame only: logged and dropped, the connection survives.
    fn route(
        self: &Arc<Self>,
        commands: &mpsc::UnboundedSender<TransportCommand>,
        auth_notified: &mut bool,
        text: &str,
    ) {
        let inbound = match Inbound::parse(text) {
            Ok(inbound) => inbound,
            Err(err) => {
                self.logger.error(&format!(
                    "[{}] dropping malformed frame: {}",
                    self.config.name, err
                ));
                return;
            }
        };

        match inbound {
            Inbound::Ping { ts } => match serde_json::to_string(&Pong::new(ts)) {
                Ok(pong) => {
                    let _ = commands.send(TransportCommand::SendText(pong));
                }
                Err(err) => {
                    self.logger
                        .error(&format!("[{}] pong encode error: {}", self.config.name, err));
                }
            },
            Inbound::AuthReply { code, message } => {
                if *auth_notified {
                    self.logger
                        .debug(&format!("[{}] duplicate auth reply ignored", self.config.name));
                    return;
                }
                *auth_notified = true;

                let success = code == Some(200);
                if success {
                    self.logger
                        .info(&format!("[{}] auth success", self.config.name));
                } else {
                    self.logger.error(&format!(
                        "[{}] auth error: {}",
                        self.config.name,
                        message.raw()
                    ));
                }

                let outcome = AuthOutcome { success, message };
                self.dispatch_auth(outcome);
            }
            Inbound::Other(message) => self.dispatch_message(message),
        }
    }

    fn dispatch_auth(self: &Arc<Self>, outcome: AuthOutcome) {
        let handler = self.handler.clone();
        let client = Client {
            inner: self.clone(),
        };
        tokio::spawn(async move {
            handler.on_auth_result(outcome, client).await;
        });
    }

    fn dispatch_message(self: &Arc<Self>, message: PushMessage) {
        let handler = self.handler.clone();
        let client = Client {
            inner: self.clone(),
        };
        tokio::spawn(async move {
            handler.on_message(message, client).await;
        });
    }

    /// Serialize a freshly signed auth request. The timestamp and signature
    /// are new for every attempt.
    fn auth_frame(&self) -> Result<String, ClientError> {
        let timestamp = signer::utc_timestamp();
        let params = signer::signed_params(&self.config.credentials.access_key, &timestamp);
        let signature = signer::sign(
            "GET",
            &self.config.host,
            &self.config.path,
            &params,
            &self.config.credentials.secret_key,
        )?;

        let request = AuthRequest::new(AuthParams {
            auth_type: "api",
            access_key: self.config.credentials.access_key.clone(),
            signature_method: signer::SIGNATURE_METHOD,
            signature_version: signer::SIGNATURE_VERSION,
            timestamp,
            signature,
        });

        Ok(serde_json::to_string(&request)?)
    }
}
