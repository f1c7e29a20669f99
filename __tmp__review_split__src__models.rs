use uuid::Uuid;

/// Identity of one physical peripheral, as reported by the radio stack.
/// Immutable for the life of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeripheralHandle {
    /// Opaque platform identifier
    pub id: String,
    /// Display name
    pub name: String,
}

/// Capability flags reported by discovery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CharacteristicFlags {
    pub read: bool,
    pub write: bool,
    pub notify: bool,
}

/// One characteristic within a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacteristicInfo {
    pub uuid: Uuid,
    pub flags: CharacteristicFlags,
}

/// One service exposed by the peripheral, with its characteristics in
/// discovery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInfo {
    pub uuid: Uuid,
    pub characteristics: Vec<CharacteristicInfo>,
}

/// Complete discovery result for one session.
///
/// Both sequences preserve discovery order. The flattened characteristic
/// list is kept separately from the per-service lists because endpoint
/// selection is positional over the flattened order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Topology {
    /// Services in discovery order
    pub services: Vec<ServiceInfo>,
    /// All characteristics across all services, flattened in discovery order
    pub characteristics: Vec<CharacteristicInfo>,
}

impl Topology {
    /// Build a topology from services alone, flattening their
    /// characteristics in service order.
    pub fn from_services(services: Vec<ServiceInfo>) -> Self {
        let characteristics = services
            .iter()
            .flat_map(|s| s.characteristics.iter().cloned())
            .collect();
        Self {
            services,
            characteristics,
        }
    }
}

/// The (service, characteristic) pair a transfer is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetEndpoint {
    pub service: Uuid,
    pub characteristic: Uuid,
}

/// Lifecycle of one peripheral session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Settling,
    Discovering,
    Ready,
    Transferring,
    Error,
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    StateChanged(SessionState),
    SignalStrength(i16),
    TextRead(String),
    Status(StatusMessage),
}

#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub message: String,
    pub severity: MessageSeverity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSeverity {
    Info,
    Success,
    Warning,
    Error,
}


