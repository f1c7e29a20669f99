//! Peripheral Session State Machine
//!
//! Owns the lifecycle of a single peripheral link: connect, settle,
//! discover, then serialized read/write transfers. All radio access goes
//! through [`RadioAdapter`]; completions belonging to a superseded cycle
//! are recognized by generation and discarded.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

use crate::adapter::{AdapterError, RadioAdapter};
use crate::codec;
use crate::error::SessionError;
use crate::models::{
    MessageSeverity, PeripheralHandle, SessionEvent, SessionState, StatusMessage, TargetEndpoint,
    Topology,
};
use crate::selector;

/// Protocol floor for the post-connect stabilization wait.
pub const MIN_SETTLE_DELAY: Duration = Duration::from_millis(2000);

/// Tunables for session behavior.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Wait between link establishment and topology discovery, in
    /// milliseconds. The wait lets link-layer bonding finish before the
    /// structure query; values below the 2000 ms floor are clamped up.
    pub settle_delay_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: 2000,
        }
    }
}

impl SessionConfig {
    /// Settle delay with the protocol floor applied.
    pub fn effective_settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms).max(MIN_SETTLE_DELAY)
    }
}

struct SessionInner {
    state: SessionState,
    /// Bumped whenever the session starts a new cycle or disconnects;
    /// completions carrying an older generation are discarded.
    generation: u64,
    topology: Option<Topology>,
    endpoint: Option<TargetEndpoint>,
    last_read: Option<String>,
}

/// State machine for one peripheral link.
///
/// Clones share the same session; the lock around the inner state is never
/// held across an adapter call.
pub struct PeripheralSession<A: RadioAdapter> {
    adapter: Arc<A>,
    peripheral: PeripheralHandle,
    config: SessionConfig,
    inner: Arc<Mutex<SessionInner>>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl<A: RadioAdapter> Clone for PeripheralSession<A> {
    fn clone(&self) -> Self {
        Self {
            adapter: Arc::clone(&self.adapter),
            peripheral: self.peripheral.clone(),
            config: self.config.clone(),
            inner: Arc::clone(&self.inner),
            events: self.events.clone(),
        }
    }
}

impl<A: RadioAdapter> PeripheralSession<A> {
    /// Create a session for one peripheral. Events are published on
    /// `events` for the embedding UI or orchestration layer.
    pub fn new(
        adapter: A,
        peripheral: PeripheralHandle,
        config: SessionConfig,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            adapter: Arc::new(adapter),
            peripheral,
            config,
            inner: Arc::new(Mutex::new(SessionInner {
                state: SessionState::Disconnected,
                generation: 0,
                topology: None,
                endpoint: None,
                last_read: None,
            })),
            events,
        }
    }

    /// Peripheral this session drives.
    pub fn peripheral(&self) -> &PeripheralHandle {
        &self.peripheral
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.state
    }

    /// Last successfully decoded characteristic text, if any.
    pub async fn last_read(&self) -> Option<String> {
        self.inner.lock().await.last_read.clone()
    }

    /// Whether discovery produced an endpoint transfers can address.
    pub async fn has_endpoint(&self) -> bool {
        self.inner.lock().await.endpoint.is_some()
    }

    /// Topology from the last successful discovery of this cycle, if any.
    pub async fn topology(&self) -> Option<Topology> {
        self.inner.lock().await.topology.clone()
    }

    /// Drive the peripheral to `Ready`: connect, settle, discover, then an
    /// informational signal-strength probe.
    ///
    /// Allowed from `Disconnected` and from `Error` (explicit reconnect);
    /// rejected while a cycle is active.
    pub async fn connect(&self) -> Result<(), SessionError> {
        let generation = {
            let mut inner = self.inner.lock().await;
            match inner.state {
                SessionState::Disconnected | SessionState::Error => {}
                other => return Err(SessionError::AlreadyActive(other)),
            }
            inner.generation += 1;
            inner.state = SessionState::Connecting;
            inner.topology = None;
            inner.endpoint = None;
            inner.generation
        };
        self.emit(SessionEvent::StateChanged(SessionState::Connecting));
        info!(
            "Connecting to {} ({})",
            self.peripheral.name, self.peripheral.id
        );
        self.send_status("Connecting...", MessageSeverity::Info);

        if let Err(e) = self.adapter.connect(&self.peripheral).await {
            return Err(self.fail(generation, e).await);
        }

        self.advance(generation, SessionState::Settling).await?;
        let settle = self.config.effective_settle_delay();
        debug!("Link up, settling for {:?} before discovery", settle);
        tokio::time::sleep(settle).await;

        self.advance(generation, SessionState::Discovering).await?;
        let topology = match self.adapter.discover_topology(&self.peripheral).await {
            Ok(topology) => topology,
            Err(e) => return Err(self.fail(generation, e).await),
        };

        let services = topology.services.len();
        let characteristics = topology.characteristics.len();
        let endpoint = selector::select_endpoint(&topology);
        {
            let mut inner = self.inner.lock().await;
            if inner.generation != generation {
                debug!("Discarding discovery result from a superseded cycle");
                return Err(SessionError::Superseded);
            }
            inner.topology = Some(topology);
            inner.endpoint = endpoint;
            inner.state = SessionState::Ready;
        }
        self.emit(SessionEvent::StateChanged(SessionState::Ready));
        info!(
            "Discovery complete: {} services, {} characteristics",
            services, characteristics
        );
        match endpoint {
            Some(ep) => info!(
                "Target endpoint: service {} characteristic {}",
                ep.service, ep.characteristic
            ),
            None => warn!("Topology exposes no usable endpoint; transfers will be refused"),
        }
        self.send_status("Connection established", MessageSeverity::Success);

        // Informational only; a failed probe never degrades the session.
        match self.adapter.probe_signal_strength(&self.peripheral).await {
            Ok(rssi) => {
                if self.inner.lock().await.generation == generation {
                    info!("Signal strength: {} dBm", rssi);
                    self.emit(SessionEvent::SignalStrength(rssi));
                } else {
                    debug!("Discarding signal strength from a superseded cycle");
                }
            }
            Err(e) => warn!("Signal strength probe failed: {}", e),
        }

        Ok(())
    }

    /// Read the target characteristic and decode it as text.
    ///
    /// Requires `Ready` and a defined endpoint. A failed read surfaces a
    /// transfer fault and leaves the previous text untouched; the session
    /// returns to `Ready` either way.
    pub async fn read(&self) -> Result<String, SessionError> {
        let (generation, endpoint) = self.begin_transfer().await?;
        debug!(
            "Reading service {} characteristic {}",
            endpoint.service, endpoint.characteristic
        );
        let result = self
            .adapter
            .read_characteristic(&self.peripheral, endpoint.service, endpoint.characteristic)
            .await;

        match result {
            Ok(bytes) => {
                let text = codec::decode_text(&bytes);
                {
                    let mut inner = self.inner.lock().await;
                    if inner.generation != generation {
                        debug!("Discarding read result from a superseded cycle");
                        return Err(SessionError::Superseded);
                    }
                    inner.last_read = Some(text.clone());
                    inner.state = SessionState::Ready;
                }
                self.emit(SessionEvent::StateChanged(SessionState::Ready));
                self.emit(SessionEvent::TextRead(text.clone()));
                info!("Read {} bytes: {:?}", bytes.len(), text);
                Ok(text)
            }
            Err(e) => Err(self.transfer_fault(generation, e).await),
        }
    }

    /// Encode `text` and write it to the target characteristic.
    ///
    /// Fire-and-forget: `Ok` means the adapter accepted the write, not that
    /// the peripheral acknowledged it.
    pub async fn write(&self, text: &str) -> Result<(), SessionError> {
        let (generation, endpoint) = self.begin_transfer().await?;
        let payload = codec::encode_text(text);
        debug!(
            "Writing {} bytes to service {} characteristic {}",
            payload.len(),
            endpoint.service,
            endpoint.characteristic
        );
        let result = self
            .adapter
            .write_characteristic(
                &self.peripheral,
                endpoint.service,
                endpoint.characteristic,
                &payload,
            )
            .await;

        match result {
            Ok(()) => {
                {
                    let mut inner = self.inner.lock().await;
                    if inner.generation != generation {
                        debug!("Discarding write completion from a superseded cycle");
                        return Err(SessionError::Superseded);
                    }
                    inner.state = SessionState::Ready;
                }
                self.emit(SessionEvent::StateChanged(SessionState::Ready));
                info!("Wrote {:?}", text);
                Ok(())
            }
            Err(e) => Err(self.transfer_fault(generation, e).await),
        }
    }

    /// Drop the link and clear discovery state.
    ///
    /// Valid from any state; a no-op when already disconnected. In-flight
    /// operations from the current cycle are superseded and their late
    /// completions discarded. Adapter failures during teardown are logged
    /// and swallowed; the session is `Disconnected` regardless.
    pub async fn disconnect(&self) {
        {
            let mut inner = self.inner.lock().await;
            if inner.state == SessionState::Disconnected {
                return;
            }
            inner.generation += 1;
            inner.state = SessionState::Disconnected;
            inner.topology = None;
            inner.endpoint = None;
        }
        self.emit(SessionEvent::StateChanged(SessionState::Disconnected));
        info!("Disconnected from {}", self.peripheral.name);
        self.send_status("Disconnected", MessageSeverity::Info);

        if let Err(e) = self.adapter.disconnect(&self.peripheral).await {
            warn!("Adapter disconnect failed: {}", e);
        }
    }

    /// Claim the transfer slot: requires `Ready` and a defined endpoint.
    async fn begin_transfer(&self) -> Result<(u64, TargetEndpoint), SessionError> {
        let (generation, endpoint) = {
            let mut inner = self.inner.lock().await;
            if inner.state != SessionState::Ready {
                return Err(SessionError::NotReady(inner.state));
            }
            let endpoint = inner.endpoint.ok_or(SessionError::EndpointUnavailable)?;
            inner.state = SessionState::Transferring;
            (inner.generation, endpoint)
        };
        self.emit(SessionEvent::StateChanged(SessionState::Transferring));
        Ok((generation, endpoint))
    }

    /// Record a connection-level fault for `generation` and return the
    /// error to surface. Stale faults become [`SessionError::Superseded`].
    async fn fail(&self, generation: u64, cause: AdapterError) -> SessionError {
        {
            let mut inner = self.inner.lock().await;
            if inner.generation != generation {
                debug!("Discarding fault from a superseded cycle: {}", cause);
                return SessionError::Superseded;
            }
            inner.state = SessionState::Error;
            inner.topology = None;
            inner.endpoint = None;
        }
        self.emit(SessionEvent::StateChanged(SessionState::Error));
        error!("Session fault: {}", cause);
        self.send_status(
            &format!("Connection failed: {}", cause),
            MessageSeverity::Error,
        );
        SessionError::Connection(cause)
    }

    /// Record a recoverable transfer fault and return to `Ready`.
    async fn transfer_fault(&self, generation: u64, cause: AdapterError) -> SessionError {
        {
            let mut inner = self.inner.lock().await;
            if inner.generation != generation {
                debug!("Discarding transfer fault from a superseded cycle: {}", cause);
                return SessionError::Superseded;
            }
            inner.state = SessionState::Ready;
        }
        self.emit(SessionEvent::StateChanged(SessionState::Ready));
        warn!("Transfer failed: {}", cause);
        self.send_status(
            &format!("Transfer failed: {}", cause),
            MessageSeverity::Warning,
        );
        SessionError::Transfer(cause)
    }

    /// Move to `next` if `generation` is still the active cycle.
    async fn advance(&self, generation: u64, next: SessionState) -> Result<(), SessionError> {
        {
            let mut inner = self.inner.lock().await;
            if inner.generation != generation {
                debug!("Cycle superseded before {:?}", next);
                return Err(SessionError::Superseded);
            }
            inner.state = next;
        }
        self.emit(SessionEvent::StateChanged(next));
        Ok(())
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    fn send_status(&self, message: &str, severity: MessageSeverity) {
        self.emit(SessionEvent::Status(StatusMessage {
            message: message.to_string(),
            severity,
        }));
    }
}
