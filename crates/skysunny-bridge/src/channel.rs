// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Request/reply correlation over the host bridge.
//
// Every request is registered under a fresh `RequestId` before it is
// dispatched. Replies arrive on any of three passive transports (structured
// event, raw message, global callback), are normalized, and are routed to a
// single pending request:
//
//   - by `requestId`, when the host echoes it;
//   - otherwise by action name (`<action>` or `<action>_REPLY`), to the
//     oldest pending request for that action.
//
// Routing removes the entry under the registry lock, so the first settlement
// wins and every later signal for that request finds nothing to settle.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use skysunny_core::config::BridgeConfig;
use skysunny_core::error::{Result, SkysunnyError};
use skysunny_core::types::{
    Delivery, HostRequest, Payload, REQUEST_ID_FIELD, Reply, ReplyChannel, RequestId,
    RequestState, TransportKind,
};

use crate::reply::{self, MessageData};
use crate::traits::HostTransport;

type Settlement = Result<Value>;

/// Stand-in deadline for timeouts too large to add to `Instant::now()`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

struct Entry {
    id: RequestId,
    action: String,
    tx: oneshot::Sender<Settlement>,
}

/// In-flight requests, oldest first.
#[derive(Default)]
struct Registry {
    entries: Mutex<Vec<Entry>>,
}

impl Registry {
    fn lock(&self) -> MutexGuard<'_, Vec<Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn register(&self, id: RequestId, action: &str) -> oneshot::Receiver<Settlement> {
        let (tx, rx) = oneshot::channel();
        let mut entries = self.lock();
        entries.push(Entry {
            id,
            action: action.to_string(),
            tx,
        });
        debug!(request_id = %id, action, pending = entries.len(), "registered pending request");
        rx
    }

    fn remove(&self, id: RequestId) -> Option<Entry> {
        let mut entries = self.lock();
        let index = entries.iter().position(|e| e.id == id)?;
        Some(entries.remove(index))
    }

    fn contains(&self, id: RequestId) -> bool {
        self.lock().iter().any(|e| e.id == id)
    }

    fn len(&self) -> usize {
        self.lock().len()
    }

    /// Detach the entry a reply belongs to, if any.
    fn claim(&self, reply: &Reply) -> Option<Entry> {
        let mut entries = self.lock();
        let index = match reply.request_id {
            Some(id) => entries.iter().position(|e| e.id == id)?,
            None => entries.iter().position(|e| reply.answers(&e.action))?,
        };
        Some(entries.remove(index))
    }
}

/// Handle through which hosts hand replies back to the channel.
///
/// Cheap to clone; all clones feed the same registry.
#[derive(Clone)]
pub struct ReplySink {
    registry: Arc<Registry>,
    namespace: Arc<str>,
    event_name: Arc<str>,
}

impl ReplySink {
    /// Structured reply event. Only events named `<namespace>:reply` are
    /// considered; `detail` is the reply body.
    pub fn deliver_event(&self, event_name: &str, detail: &Value) -> Result<Delivery> {
        if event_name != &*self.event_name {
            return Ok(Delivery::Foreign);
        }
        let reply = reply::normalize_body(detail)
            .inspect_err(|e| warn!(channel = %ReplyChannel::Event, error = %e, "ignoring reply"))?;
        Ok(self.route(ReplyChannel::Event, reply))
    }

    /// Raw cross-context message. Must carry `source == <namespace>`.
    pub fn deliver_message(&self, data: impl Into<MessageData>) -> Result<Delivery> {
        let parsed = data
            .into()
            .parse()
            .inspect_err(|e| warn!(channel = %ReplyChannel::Message, error = %e, "message parse error"))?;
        if parsed.get("source").and_then(Value::as_str) != Some(&*self.namespace) {
            return Ok(Delivery::Foreign);
        }
        let reply = reply::normalize(&parsed)
            .inspect_err(|e| warn!(channel = %ReplyChannel::Message, error = %e, "ignoring reply"))?;
        Ok(self.route(ReplyChannel::Message, reply))
    }

    /// Global callback slot invoked by the host.
    pub fn deliver_callback(&self, payload: &Value) -> Result<Delivery> {
        let reply = reply::normalize(payload)
            .inspect_err(|e| warn!(channel = %ReplyChannel::Callback, error = %e, "ignoring reply"))?;
        Ok(self.route(ReplyChannel::Callback, reply))
    }

    fn route(&self, channel: ReplyChannel, reply: Reply) -> Delivery {
        let Some(entry) = self.registry.claim(&reply) else {
            debug!(
                %channel,
                action = reply.action.as_deref().unwrap_or("<none>"),
                "reply matched no pending request"
            );
            return Delivery::Unmatched;
        };

        info!(
            %channel,
            request_id = %entry.id,
            action = %entry.action,
            ok = reply.ok,
            "reply received"
        );

        let settlement = if reply.ok {
            Ok(reply.data)
        } else {
            Err(SkysunnyError::RemoteRejected(
                reply
                    .error
                    .unwrap_or_else(|| format!("{} failed", entry.action)),
            ))
        };
        // The waiter may have been dropped between claim and send; nothing
        // is left to settle in that case.
        let _ = entry.tx.send(settlement);
        Delivery::Settled(entry.id)
    }
}

/// One in-flight round trip.
///
/// Dropping the handle (or calling [`PendingCall::cancel`]) deregisters the
/// request; a reply arriving afterwards is reported as unmatched.
pub struct PendingCall {
    id: RequestId,
    action: String,
    timeout: Duration,
    deadline: Instant,
    rx: Option<oneshot::Receiver<Settlement>>,
    registry: Arc<Registry>,
}

impl PendingCall {
    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn state(&self) -> RequestState {
        if self.registry.contains(self.id) {
            RequestState::Pending
        } else {
            RequestState::Settled
        }
    }

    /// Abandon the request.
    pub fn cancel(self) {
        debug!(request_id = %self.id, action = %self.action, "request cancelled by caller");
    }

    /// Wait for settlement: the reply's data, the host's rejection, or a
    /// timeout at the deadline.
    pub async fn wait(mut self) -> Result<Value> {
        let Some(mut rx) = self.rx.take() else {
            return Err(SkysunnyError::HostUnavailable("reply channel closed".into()));
        };

        match tokio::time::timeout_at(self.deadline, &mut rx).await {
            Ok(Ok(settlement)) => settlement,
            Ok(Err(_)) => Err(SkysunnyError::HostUnavailable("reply channel closed".into())),
            Err(_) => {
                if self.registry.remove(self.id).is_some() {
                    warn!(
                        request_id = %self.id,
                        action = %self.action,
                        timeout_ms = millis(self.timeout),
                        "host did not reply in time"
                    );
                    return Err(self.timeout_error());
                }
                // A reply claimed the entry just as the deadline fired.
                rx.try_recv().unwrap_or_else(|_| Err(self.timeout_error()))
            }
        }
    }

    fn timeout_error(&self) -> SkysunnyError {
        SkysunnyError::Timeout {
            action: self.action.clone(),
            after_ms: millis(self.timeout),
        }
    }
}

impl Drop for PendingCall {
    fn drop(&mut self) {
        if self.registry.remove(self.id).is_some() {
            debug!(request_id = %self.id, action = %self.action, "pending request disposed");
        }
    }
}

impl std::fmt::Debug for PendingCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingCall")
            .field("id", &self.id)
            .field("action", &self.action)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// The host bridge: sends actions to the native host and correlates replies.
#[derive(Clone)]
pub struct BridgeChannel {
    config: Arc<BridgeConfig>,
    transport: Arc<dyn HostTransport>,
    registry: Arc<Registry>,
}

impl BridgeChannel {
    pub fn new(config: BridgeConfig, transport: Arc<dyn HostTransport>) -> Self {
        info!(
            namespace = %config.namespace,
            transport = %transport.kind(),
            "host bridge ready"
        );
        Self {
            config: Arc::new(config),
            transport,
            registry: Arc::new(Registry::default()),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn transport_kind(&self) -> TransportKind {
        self.transport.kind()
    }

    /// Entry points for host replies.
    pub fn replies(&self) -> ReplySink {
        ReplySink {
            registry: Arc::clone(&self.registry),
            namespace: Arc::from(self.config.namespace.as_str()),
            event_name: Arc::from(self.config.reply_event_name()),
        }
    }

    /// Number of requests still waiting for settlement.
    pub fn pending_count(&self) -> usize {
        self.registry.len()
    }

    /// Register and dispatch a request without waiting for it.
    ///
    /// `timeout` defaults to the configured deadline. Dispatch failures are
    /// returned here and leave nothing registered.
    #[instrument(skip(self, payload), fields(transport = %self.transport.kind()))]
    pub fn call(
        &self,
        action: &str,
        mut payload: Payload,
        timeout: Option<Duration>,
    ) -> Result<PendingCall> {
        if action.trim().is_empty() {
            return Err(SkysunnyError::InvalidArgument("action must not be empty".into()));
        }

        let id = RequestId::new();
        if self.config.attach_request_id {
            payload.insert(REQUEST_ID_FIELD.into(), Value::String(id.to_string()));
        }

        let timeout = timeout.unwrap_or_else(|| self.config.default_timeout());
        let rx = self.registry.register(id, action);
        let pending = PendingCall {
            id,
            action: action.to_string(),
            timeout,
            deadline: deadline_after(timeout),
            rx: Some(rx),
            registry: Arc::clone(&self.registry),
        };

        let request = HostRequest {
            id,
            action: action.to_string(),
            payload,
        };
        info!(request_id = %id, "sending request to host");
        // On failure `pending` is dropped, which deregisters it.
        self.transport.dispatch(&request, &self.replies())?;
        Ok(pending)
    }

    /// Call a host procedure and wait for its single settlement.
    pub async fn send(
        &self,
        action: &str,
        payload: Payload,
        timeout: Option<Duration>,
    ) -> Result<Value> {
        self.call(action, payload, timeout)?.wait().await
    }

    /// Fire-and-forget message to the host; no reply is expected.
    pub fn notify(&self, action: &str, payload: &Payload) -> Result<()> {
        if action.trim().is_empty() {
            return Err(SkysunnyError::InvalidArgument("action must not be empty".into()));
        }
        debug!(action, transport = %self.transport.kind(), "notifying host");
        self.transport.notify(action, payload)
    }
}

fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout).unwrap_or(now + FAR_FUTURE)
}

/// Whole milliseconds, saturating at `u64::MAX`.
pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
