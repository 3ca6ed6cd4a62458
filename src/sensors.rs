//! Edge-triggered polling of position sensors.
//!
//! Sensors are active low: a train pulls the input down. Each poll reads every
//! registered sensor, inverts the level and reports the ones whose value
//! differs from the last poll. Before the first poll every reading is
//! [`SensorReading::Unknown`], so the first poll reports every sensor once.
//!
//! There is no hysteresis; a contact that bounces between polls is reported
//! on every change.

use heapless::Vec as HVec;

use crate::config::MAX_ACTUATORS;
use crate::registry::Registry;
use crate::state::{ActuatorStates, SensorReading};
use crate::traits::{PinInput, PinLevel};

/// Topic prefix for sensor change events.
pub const POSITION_TOPIC_PREFIX: &str = "lego/train/position/";

/// A sensor whose value changed since the previous poll.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SensorChange {
    /// Sensor id
    pub sensor: u8,
    /// New value: `0` clear, `1` occupied
    pub value: u8,
}

impl SensorChange {
    /// Payload published for this change.
    pub const fn payload(&self) -> &'static [u8] {
        if self.value == 0 {
            b"0"
        } else {
            b"1"
        }
    }

    /// Topic published for this change, `lego/train/position/<id>`.
    pub fn topic(&self) -> alloc::string::String {
        alloc::format!("{}{}", POSITION_TOPIC_PREFIX, self.sensor)
    }
}

/// Changes found by one poll, at most one per sensor.
pub type SensorChanges = HVec<SensorChange, MAX_ACTUATORS>;

/// Map a raw pin level to a reading.
pub const fn reading_for(level: PinLevel) -> SensorReading {
    match level {
        PinLevel::High => SensorReading::Clear,
        PinLevel::Low => SensorReading::Occupied,
    }
}

/// Read every registered sensor once and record the new readings.
pub fn poll_sensors<I: PinInput>(
    registry: &Registry,
    states: &mut ActuatorStates,
    input: &mut I,
) -> SensorChanges {
    let mut changes = SensorChanges::new();

    for sensor in registry.sensors() {
        let reading = reading_for(input.read_level(sensor.pin));
        if states.update_sensor(sensor.id, reading) {
            if let Some(value) = reading.value() {
                log::debug!("position {} -> {}", sensor.id, value);
                // One entry per registered sensor, so capacity is never exceeded
                let _ = changes.push(SensorChange {
                    sensor: sensor.id,
                    value,
                });
            }
        }
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::hal::MockBoard;

    fn setup() -> (Registry, ActuatorStates, MockBoard) {
        let registry = Registry::from_layout(&LayoutConfig::empty().with_sensor(34).with_sensor(35));
        let states = ActuatorStates::for_registry(&registry);
        (registry, states, MockBoard::new())
    }

    #[test]
    fn first_poll_reports_every_sensor() {
        let (registry, mut states, mut board) = setup();
        board.set_input(35, PinLevel::Low);

        let changes = poll_sensors(&registry, &mut states, &mut board);
        assert_eq!(
            changes.as_slice(),
            &[
                SensorChange { sensor: 0, value: 0 },
                SensorChange { sensor: 1, value: 1 },
            ]
        );
    }

    #[test]
    fn unchanged_levels_report_nothing() {
        let (registry, mut states, mut board) = setup();
        poll_sensors(&registry, &mut states, &mut board);
        assert!(poll_sensors(&registry, &mut states, &mut board).is_empty());
    }

    #[test]
    fn only_changed_sensor_is_reported() {
        let (registry, mut states, mut board) = setup();
        poll_sensors(&registry, &mut states, &mut board);

        board.set_input(34, PinLevel::Low);
        let changes = poll_sensors(&registry, &mut states, &mut board);
        assert_eq!(changes.as_slice(), &[SensorChange { sensor: 0, value: 1 }]);
        assert_eq!(states.sensor(0), Some(SensorReading::Occupied));
    }

    #[test]
    fn change_topic_and_payload() {
        let change = SensorChange { sensor: 3, value: 1 };
        assert_eq!(change.topic(), "lego/train/position/3");
        assert_eq!(change.payload(), b"1");
    }
}
