//! Target Endpoint Selection
//!
//! Decides which (service, characteristic) pair transfers are addressed to
//! once discovery has produced a topology.

use crate::models::{TargetEndpoint, Topology};

/// Pick the endpoint transfers will address, or `None` when the topology
/// has no services or no characteristics.
///
/// Policy: the last service in discovery order, paired with the last
/// characteristic in the flattened discovery order, even when that
/// characteristic belongs to an earlier service. Capability flags are not
/// consulted. This suits demo peripherals that append their I/O
/// characteristic last; it is not a sound match for arbitrary devices and
/// should be replaced before pointing this crate at one.
pub fn select_endpoint(topology: &Topology) -> Option<TargetEndpoint> {
    let service = topology.services.last()?;
    let characteristic = topology.characteristics.last()?;
    Some(TargetEndpoint {
        service: service.uuid,
        characteristic: characteristic.uuid,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CharacteristicFlags, CharacteristicInfo, ServiceInfo};
    use uuid::Uuid;

    fn characteristic(n: u128) -> CharacteristicInfo {
        CharacteristicInfo {
            uuid: Uuid::from_u128(n),
            flags: CharacteristicFlags::default(),
        }
    }

    fn service(n: u128, characteristics: Vec<CharacteristicInfo>) -> ServiceInfo {
        ServiceInfo {
            uuid: Uuid::from_u128(n),
            characteristics,
        }
    }

    #[test]
    fn test_picks_last_service_and_last_characteristic() {
        let topology = Topology::from_services(vec![
            service(0x51, vec![characteristic(0xC1)]),
            service(0x52, vec![characteristic(0xC2), characteristic(0xC3)]),
        ]);

        let endpoint = select_endpoint(&topology).unwrap();
        assert_eq!(endpoint.service, Uuid::from_u128(0x52));
        assert_eq!(endpoint.characteristic, Uuid::from_u128(0xC3));
    }

    #[test]
    fn test_selected_characteristic_may_belong_to_an_earlier_service() {
        // Flattened order ends on a characteristic of the first service.
        let topology = Topology {
            services: vec![
                service(0x51, vec![characteristic(0xC1)]),
                service(0x52, vec![]),
            ],
            characteristics: vec![characteristic(0xC1)],
        };

        let endpoint = select_endpoint(&topology).unwrap();
        assert_eq!(endpoint.service, Uuid::from_u128(0x52));
        assert_eq!(endpoint.characteristic, Uuid::from_u128(0xC1));
    }

    #[test]
    fn test_no_services_yields_none() {
        let topology = Topology {
            services: vec![],
            characteristics: vec![characteristic(0xC1)],
        };
        assert!(select_endpoint(&topology).is_none());
    }

    #[test]
    fn test_no_characteristics_yields_none() {
        let topology = Topology::from_services(vec![service(0x51, vec![])]);
        assert!(select_endpoint(&topology).is_none());
    }

    #[test]
    fn test_empty_topology_yields_none() {
        assert!(select_endpoint(&Topology::default()).is_none());
    }
}
