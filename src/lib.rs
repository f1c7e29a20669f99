//! Single-peripheral GATT session driver.
//!
//! Connects to one wireless peripheral, waits out link settling, discovers
//! the service/characteristic topology, then exchanges UTF-8 text with a
//! selected characteristic. The radio stack sits behind the
//! [`RadioAdapter`] trait; the crate ships a scripted in-memory adapter in
//! [`mock`] for tests and demos instead of a platform driver.

pub mod adapter;
pub mod codec;
pub mod error;
pub mod logging;
pub mod mock;
pub mod models;
pub mod selector;
pub mod session;
pub mod settings;

pub use adapter::{AdapterError, RadioAdapter};
pub use error::SessionError;
pub use models::{
    CharacteristicFlags, CharacteristicInfo, MessageSeverity, PeripheralHandle, ServiceInfo,
    SessionEvent, SessionState, StatusMessage, TargetEndpoint, Topology,
};
pub use session::{PeripheralSession, SessionConfig, MIN_SETTLE_DELAY};
