//! Radio Adapter Boundary
//!
//! The session drives its peripheral exclusively through this trait and
//! never touches a platform radio stack directly. Implementations wrap
//! whatever transport is available; the crate ships a scripted in-memory
//! one in [`crate::mock`] for tests and demos.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{PeripheralHandle, Topology};

/// Faults reported by a radio adapter.
///
/// These never cross the session boundary raw; the session wraps them in
/// its own conditions before surfacing them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AdapterError {
    #[error("connection attempt failed")]
    ConnectFailed,
    #[error("topology discovery failed")]
    DiscoveryFailed,
    #[error("signal strength probe failed")]
    ProbeFailed,
    #[error("characteristic read failed")]
    ReadFailed,
    #[error("characteristic write failed")]
    WriteFailed,
    #[error("peripheral is not connected")]
    NotConnected,
    #[error("operation timed out")]
    Timeout,
}

/// Capability surface the session requires from a radio stack.
///
/// Every operation is asynchronous; timeout behavior is the adapter's own.
/// The session imposes no deadlines of its own on these calls.
#[async_trait]
pub trait RadioAdapter: Send + Sync {
    /// Establish a link to the peripheral.
    async fn connect(&self, peripheral: &PeripheralHandle) -> Result<(), AdapterError>;

    /// Enumerate the peripheral's services and characteristics, in
    /// discovery order, with characteristics additionally flattened across
    /// services.
    async fn discover_topology(
        &self,
        peripheral: &PeripheralHandle,
    ) -> Result<Topology, AdapterError>;

    /// Sample received signal strength in dBm.
    async fn probe_signal_strength(
        &self,
        peripheral: &PeripheralHandle,
    ) -> Result<i16, AdapterError>;

    /// Read the current value of one characteristic.
    async fn read_characteristic(
        &self,
        peripheral: &PeripheralHandle,
        service: Uuid,
        characteristic: Uuid,
    ) -> Result<Vec<u8>, AdapterError>;

    /// Write bytes to one characteristic without awaiting a response from
    /// the peripheral.
    async fn write_characteristic(
        &self,
        peripheral: &PeripheralHandle,
        service: Uuid,
        characteristic: Uuid,
        payload: &[u8],
    ) -> Result<(), AdapterError>;

    /// Tear the link down.
    async fn disconnect(&self, peripheral: &PeripheralHandle) -> Result<(), AdapterError>;
}
