//! Scripted Radio Adapter
//!
//! An in-memory [`RadioAdapter`] that stands in for a platform radio stack
//! in tests and in the demo binary. Results for each operation can be
//! queued ahead of time (unqueued calls succeed with canned data), each
//! operation can be given an artificial latency, and every call the adapter
//! receives is recorded with its arrival time so ordering and timing can be
//! asserted.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use uuid::Uuid;

use crate::adapter::{AdapterError, RadioAdapter};
use crate::models::{
    CharacteristicFlags, CharacteristicInfo, PeripheralHandle, ServiceInfo, Topology,
};

const DEVICE_INFO_SERVICE: Uuid = Uuid::from_u128(0x0000180A_0000_1000_8000_00805F9B34FB);
const MODEL_NUMBER_CHAR: Uuid = Uuid::from_u128(0x00002A24_0000_1000_8000_00805F9B34FB);
const UART_SERVICE: Uuid = Uuid::from_u128(0x6E400001_B5A3_F393_E0A9_E50E24DCCA9E);
const UART_RX_CHAR: Uuid = Uuid::from_u128(0x6E400002_B5A3_F393_E0A9_E50E24DCCA9E);
const UART_TX_CHAR: Uuid = Uuid::from_u128(0x6E400003_B5A3_F393_E0A9_E50E24DCCA9E);

/// One recorded adapter call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Connect,
    DiscoverTopology,
    ProbeSignalStrength,
    Read {
        service: Uuid,
        characteristic: Uuid,
    },
    Write {
        service: Uuid,
        characteristic: Uuid,
        payload: Vec<u8>,
    },
    Disconnect,
}

#[derive(Default)]
struct MockInner {
    connect_results: VecDeque<Result<(), AdapterError>>,
    topology_results: VecDeque<Result<Topology, AdapterError>>,
    probe_results: VecDeque<Result<i16, AdapterError>>,
    read_results: VecDeque<Result<Vec<u8>, AdapterError>>,
    write_results: VecDeque<Result<(), AdapterError>>,
    disconnect_results: VecDeque<Result<(), AdapterError>>,
    connect_delay: Duration,
    discovery_delay: Duration,
    read_delay: Duration,
    write_delay: Duration,
    calls: Vec<(MockCall, Instant)>,
}

/// Scripted in-memory adapter. Cheap to clone; clones share the script and
/// the call log.
#[derive(Clone, Default)]
pub struct MockAdapter {
    inner: Arc<Mutex<MockInner>>,
}

/// Canned discovery result: a device-information service followed by a
/// UART-style text service whose TX characteristic ends the flattened
/// order, so endpoint selection lands on (UART service, TX).
pub fn sample_topology() -> Topology {
    Topology::from_services(vec![
        ServiceInfo {
            uuid: DEVICE_INFO_SERVICE,
            characteristics: vec![CharacteristicInfo {
                uuid: MODEL_NUMBER_CHAR,
                flags: CharacteristicFlags {
                    read: true,
                    ..Default::default()
                },
            }],
        },
        ServiceInfo {
            uuid: UART_SERVICE,
            characteristics: vec![
                CharacteristicInfo {
                    uuid: UART_RX_CHAR,
                    flags: CharacteristicFlags {
                        write: true,
                        ..Default::default()
                    },
                },
                CharacteristicInfo {
                    uuid: UART_TX_CHAR,
                    flags: CharacteristicFlags {
                        read: true,
                        notify: true,
                        ..Default::default()
                    },
                },
            ],
        },
    ])
}

impl MockAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the result of the next unqueued-so-far connect call.
    /// Unqueued connects succeed.
    pub fn queue_connect(&self, result: Result<(), AdapterError>) {
        self.inner.lock().unwrap().connect_results.push_back(result);
    }

    /// Queue a discovery result. Unqueued discoveries return
    /// [`sample_topology`].
    pub fn queue_topology(&self, result: Result<Topology, AdapterError>) {
        self.inner.lock().unwrap().topology_results.push_back(result);
    }

    /// Queue a signal-strength result. Unqueued probes return -55 dBm.
    pub fn queue_probe(&self, result: Result<i16, AdapterError>) {
        self.inner.lock().unwrap().probe_results.push_back(result);
    }

    /// Queue a read result. Unqueued reads return the bytes of `"Hi"`.
    pub fn queue_read(&self, result: Result<Vec<u8>, AdapterError>) {
        self.inner.lock().unwrap().read_results.push_back(result);
    }

    /// Queue a write result. Unqueued writes succeed.
    pub fn queue_write(&self, result: Result<(), AdapterError>) {
        self.inner.lock().unwrap().write_results.push_back(result);
    }

    /// Queue a disconnect result. Unqueued disconnects succeed.
    pub fn queue_disconnect(&self, result: Result<(), AdapterError>) {
        self.inner
            .lock()
            .unwrap()
            .disconnect_results
            .push_back(result);
    }

    /// Hold every connect call in flight for `delay` before it resolves.
    pub fn set_connect_delay(&self, delay: Duration) {
        self.inner.lock().unwrap().connect_delay = delay;
    }

    /// Hold every discovery call in flight for `delay` before it resolves.
    pub fn set_discovery_delay(&self, delay: Duration) {
        self.inner.lock().unwrap().discovery_delay = delay;
    }

    /// Hold every read call in flight for `delay` before it resolves.
    pub fn set_read_delay(&self, delay: Duration) {
        self.inner.lock().unwrap().read_delay = delay;
    }

    /// Hold every write call in flight for `delay` before it resolves.
    pub fn set_write_delay(&self, delay: Duration) {
        self.inner.lock().unwrap().write_delay = delay;
    }

    /// Every call received so far, in arrival order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.inner
            .lock()
            .unwrap()
            .calls
            .iter()
            .map(|(call, _)| call.clone())
            .collect()
    }

    /// Every call received so far with its arrival time.
    pub fn timed_calls(&self) -> Vec<(MockCall, Instant)> {
        self.inner.lock().unwrap().calls.clone()
    }

    /// Payloads of every write received so far, in arrival order.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.inner
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter_map(|(call, _)| match call {
                MockCall::Write { payload, .. } => Some(payload.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: MockCall) {
        self.inner.lock().unwrap().calls.push((call, Instant::now()));
    }
}

#[async_trait]
impl RadioAdapter for MockAdapter {
    async fn connect(&self, _peripheral: &PeripheralHandle) -> Result<(), AdapterError> {
        self.record(MockCall::Connect);
        let (delay, result) = {
            let mut inner = self.inner.lock().unwrap();
            let result = inner.connect_results.pop_front().unwrap_or(Ok(()));
            (inner.connect_delay, result)
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        result
    }

    async fn discover_topology(
        &self,
        _peripheral: &PeripheralHandle,
    ) -> Result<Topology, AdapterError> {
        self.record(MockCall::DiscoverTopology);
        let (delay, result) = {
            let mut inner = self.inner.lock().unwrap();
            let result = inner
                .topology_results
                .pop_front()
                .unwrap_or_else(|| Ok(sample_topology()));
            (inner.discovery_delay, result)
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        result
    }

    async fn probe_signal_strength(
        &self,
        _peripheral: &PeripheralHandle,
    ) -> Result<i16, AdapterError> {
        self.record(MockCall::ProbeSignalStrength);
        let mut inner = self.inner.lock().unwrap();
        inner.probe_results.pop_front().unwrap_or(Ok(-55))
    }

    async fn read_characteristic(
        &self,
        _peripheral: &PeripheralHandle,
        service: Uuid,
        characteristic: Uuid,
    ) -> Result<Vec<u8>, AdapterError> {
        self.record(MockCall::Read {
            service,
            characteristic,
        });
        let (delay, result) = {
            let mut inner = self.inner.lock().unwrap();
            let result = inner
                .read_results
                .pop_front()
                .unwrap_or_else(|| Ok(b"Hi".to_vec()));
            (inner.read_delay, result)
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        result
    }

    async fn write_characteristic(
        &self,
        _peripheral: &PeripheralHandle,
        service: Uuid,
        characteristic: Uuid,
        payload: &[u8],
    ) -> Result<(), AdapterError> {
        self.record(MockCall::Write {
            service,
            characteristic,
            payload: payload.to_vec(),
        });
        let (delay, result) = {
            let mut inner = self.inner.lock().unwrap();
            let result = inner.write_results.pop_front().unwrap_or(Ok(()));
            (inner.write_delay, result)
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        result
    }

    async fn disconnect(&self, _peripheral: &PeripheralHandle) -> Result<(), AdapterError> {
        self.record(MockCall::Disconnect);
        let mut inner = self.inner.lock().unwrap();
        inner.disconnect_results.pop_front().unwrap_or(Ok(()))
    }
}


