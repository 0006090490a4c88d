//! Shared resource arbitration.

use std::collections::BTreeMap;

use tracing::debug;

use crate::deterministic::TickClock;
use crate::device::{Device, DeviceId, DeviceRecord};
use crate::errors::SimulationError;

/// Outcome of one arbitration round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arbitration {
    /// Nobody requested access.
    Idle,
    /// Exactly one device requested access and won.
    Granted(DeviceRecord),
    /// Two or more devices requested access; all of them failed.
    Collision {
        /// Devices that took part in the collision
        contenders: Vec<DeviceId>,
    },
}

impl Arbitration {
    /// Winning device, if any.
    pub fn winner(&self) -> Option<DeviceId> {
        match self {
            Arbitration::Granted(record) => Some(record.id),
            _ => None,
        }
    }

    /// Returns true if this round was a collision.
    pub fn is_collision(&self) -> bool {
        matches!(self, Arbitration::Collision { .. })
    }
}

/// The single shared resource devices contend for.
///
/// Collects every request made during a tick and resolves them together.
/// The request list is drained on every tick whatever the outcome.
#[derive(Debug, Clone, Default)]
pub struct Resource {
    clock: TickClock,
    requests: Vec<DeviceId>,
}

impl Resource {
    /// Creates an idle resource at tick zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an access attempt for the current tick.
    pub fn request_access(&mut self, device: DeviceId) {
        self.requests.push(device);
    }

    /// Number of attempts registered for the current tick.
    pub fn pending_requests(&self) -> usize {
        self.requests.len()
    }

    /// Tick the next arbitration will be stamped with.
    pub fn timestamp(&self) -> u64 {
        self.clock.now()
    }

    /// Resolves the current tick's requests and notifies the devices involved.
    ///
    /// # Errors
    ///
    /// - `SimulationError::UnknownContender` - A request names a device that is
    ///   not in `devices`
    pub fn tick(
        &mut self,
        devices: &mut BTreeMap<DeviceId, Device>,
    ) -> Result<Arbitration, SimulationError> {
        let timestamp = self.clock.now();
        let requests = std::mem::take(&mut self.requests);
        self.clock.advance();

        match requests.as_slice() {
            [] => Ok(Arbitration::Idle),
            [winner] => {
                let device = devices
                    .get(winner)
                    .ok_or(SimulationError::UnknownContender { device: *winner })?;
                debug!(timestamp, device = %winner, "Resource granted");
                Ok(Arbitration::Granted(device.acquire_success(timestamp)))
            }
            contenders => {
                for id in contenders {
                    devices
                        .get_mut(id)
                        .ok_or(SimulationError::UnknownContender { device: *id })?
                        .acquire_fail(timestamp);
                }
                debug!(timestamp, contenders = contenders.len(), "Collision");
                Ok(Arbitration::Collision {
                    contenders: contenders.to_vec(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backoff::BackoffStrategy;
    use crate::deterministic::DeterministicRng;

    fn population(count: u64, rng: &mut DeterministicRng) -> BTreeMap<DeviceId, Device> {
        (0..count)
            .map(|i| {
                let id = DeviceId::new(i);
                (
                    id,
                    Device::new(id, 0, BackoffStrategy::default(), u64::MAX, rng),
                )
            })
            .collect()
    }

    #[test]
    fn test_idle_tick_advances_clock() {
        let mut resource = Resource::new();
        let mut devices = BTreeMap::new();

        let outcome = resource.tick(&mut devices).unwrap();
        assert_eq!(outcome, Arbitration::Idle);
        assert_eq!(resource.timestamp(), 1);
    }

    #[test]
    fn test_single_request_is_granted() {
        let mut rng = DeterministicRng::from_seed(1);
        let mut devices = population(1, &mut rng);
        let mut resource = Resource::new();

        resource.request_access(DeviceId::new(0));
        let outcome = resource.tick(&mut devices).unwrap();

        assert_eq!(outcome.winner(), Some(DeviceId::new(0)));
        assert_eq!(resource.pending_requests(), 0);
    }

    #[test]
    fn test_multiple_requests_collide() {
        let mut rng = DeterministicRng::from_seed(1);
        let mut devices = population(3, &mut rng);
        let mut resource = Resource::new();

        for i in 0..3 {
            resource.request_access(DeviceId::new(i));
        }
        let outcome = resource.tick(&mut devices).unwrap();

        assert!(outcome.is_collision());
        assert_eq!(outcome.winner(), None);
        assert_eq!(resource.pending_requests(), 0);
        assert!(devices.values().all(|d| !d.is_waiting_to_acquire()));
    }

    #[test]
    fn test_unknown_contender_still_drains_requests() {
        let mut devices = BTreeMap::new();
        let mut resource = Resource::new();

        resource.request_access(DeviceId::new(42));
        let result = resource.tick(&mut devices);

        assert!(matches!(
            result,
            Err(SimulationError::UnknownContender { device }) if device == DeviceId::new(42)
        ));
        assert_eq!(resource.pending_requests(), 0);
        assert_eq!(resource.timestamp(), 1);
    }
}
