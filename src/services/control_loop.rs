//! Cooperative single-threaded control loop.
//!
//! One [`ControlLoop::tick`] does, in order:
//! 1. Answer at most one pending HTTP request
//! 2. Poll the position sensors
//! 3. Send one repeat of the pending IR frame
//! 4. Reconnect MQTT if needed, publish sensor changes, dispatch inbound messages
//!
//! Nothing in a tick blocks except the servo settle delay inside a switch or
//! barrier command. [`ControlLoop::poll`] paces ticks on a [`Clock`] so the
//! caller can spin on it from a bare `loop {}`.
//!
//! # Example
//!
//! ```rust
//! use rs_trackside::TrainController;
//! use rs_trackside::config::MqttConfig;
//! use rs_trackside::hal::{MockBoard, MockClock, MockHttp, MockMqtt};
//! use rs_trackside::registry::Registry;
//! use rs_trackside::services::{ControlLoop, MqttServiceRunner};
//! use rs_trackside::traits::HttpRequest;
//!
//! let controller = TrainController::new(Registry::default(), MockBoard::new(), 0);
//! let mqtt = MqttServiceRunner::new(MockMqtt::new(), &MqttConfig::default(), controller.registry());
//!
//! let mut http = MockHttp::new();
//! http.queue_request(HttpRequest::get("/lego/train/barrier/0/1"));
//!
//! let mut control = ControlLoop::new(controller, MockClock::new(), 20)
//!     .with_server(http)
//!     .with_mqtt(mqtt);
//!
//! let summary = control.tick();
//! assert!(summary.request_handled);
//! assert_eq!(control.controller().hardware().angle(14), Some(90));
//! ```

use crate::controller::TrainController;
use crate::sensors::SensorChanges;
use crate::traits::{Board, Clock, MqttClient, RequestServer};

use super::http_handler::HttpApiHandler;
use super::mqtt_runner::{MqttReport, MqttServiceRunner};

/// What one [`ControlLoop::tick`] did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Whether an HTTP request was answered
    pub request_handled: bool,
    /// Sensors whose value changed this tick
    pub sensor_changes: SensorChanges,
    /// Whether an IR repeat went out
    pub ir_sent: bool,
    /// MQTT activity, when an MQTT runner is attached
    pub mqtt: Option<MqttReport>,
}

/// Single-threaded loop over a controller and its transports.
pub struct ControlLoop<H, S, C, K>
where
    H: Board,
    S: RequestServer,
    C: MqttClient,
    K: Clock,
{
    controller: TrainController<H>,
    server: Option<S>,
    mqtt: Option<MqttServiceRunner<C>>,
    clock: K,
    tick_interval_ms: u64,
    last_tick_ms: Option<u64>,
}

impl<H, S, C, K> ControlLoop<H, S, C, K>
where
    H: Board,
    S: RequestServer,
    C: MqttClient,
    K: Clock,
{
    /// Create a loop with no transports attached.
    pub fn new(controller: TrainController<H>, clock: K, tick_interval_ms: u32) -> Self {
        Self {
            controller,
            server: None,
            mqtt: None,
            clock,
            tick_interval_ms: tick_interval_ms as u64,
            last_tick_ms: None,
        }
    }

    /// Attach a request server.
    pub fn with_server(mut self, server: S) -> Self {
        self.server = Some(server);
        self
    }

    /// Attach an MQTT runner.
    pub fn with_mqtt(mut self, mqtt: MqttServiceRunner<C>) -> Self {
        self.mqtt = Some(mqtt);
        self
    }

    /// Run one tick now, regardless of the interval.
    pub fn tick(&mut self) -> TickSummary {
        let now_ms = self.clock.now_ms();
        self.last_tick_ms = Some(now_ms);
        let mut summary = TickSummary::default();

        // ---------------------------------------------------------------------
        // HTTP: one request per tick
        // ---------------------------------------------------------------------
        if let Some(server) = self.server.as_mut() {
            if let Some(request) = server.try_recv_request() {
                let response = HttpApiHandler::new(&mut self.controller).handle_request(&request);
                if let Err(e) = server.send_response(response) {
                    log::warn!("failed to send HTTP response: {:?}", e);
                }
                summary.request_handled = true;
            }
        }

        // ---------------------------------------------------------------------
        // Sensors and IR
        // ---------------------------------------------------------------------
        summary.sensor_changes = self.controller.poll_sensors();
        match self.controller.drain_ir() {
            Ok(frame) => summary.ir_sent = frame.is_some(),
            Err(e) => log::warn!("IR transmit failed: {:?}", e),
        }

        // ---------------------------------------------------------------------
        // MQTT
        // ---------------------------------------------------------------------
        if let Some(mqtt) = self.mqtt.as_mut() {
            summary.mqtt = Some(mqtt.service(
                &mut self.controller,
                &summary.sensor_changes,
                now_ms,
            ));
        }

        summary
    }

    /// Run a tick if the tick interval has elapsed since the last one.
    pub fn poll(&mut self) -> Option<TickSummary> {
        let now_ms = self.clock.now_ms();
        let due = self
            .last_tick_ms
            .map_or(true, |last| now_ms.saturating_sub(last) >= self.tick_interval_ms);
        due.then(|| self.tick())
    }

    /// The controller.
    pub fn controller(&self) -> &TrainController<H> {
        &self.controller
    }

    /// Mutable access to the controller.
    pub fn controller_mut(&mut self) -> &mut TrainController<H> {
        &mut self.controller
    }

    /// The attached request server.
    pub fn server(&self) -> Option<&S> {
        self.server.as_ref()
    }

    /// Mutable access to the attached request server.
    pub fn server_mut(&mut self) -> Option<&mut S> {
        self.server.as_mut()
    }

    /// The attached MQTT runner.
    pub fn mqtt(&self) -> Option<&MqttServiceRunner<C>> {
        self.mqtt.as_ref()
    }

    /// Mutable access to the attached MQTT runner.
    pub fn mqtt_mut(&mut self) -> Option<&mut MqttServiceRunner<C>> {
        self.mqtt.as_mut()
    }

    /// Mutable access to the clock.
    pub fn clock_mut(&mut self) -> &mut K {
        &mut self.clock
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MqttConfig;
    use crate::hal::{MockBoard, MockClock, MockHttp, MockMqtt};
    use crate::registry::Registry;
    use crate::traits::{HttpMethod, HttpRequest, PinLevel};

    type TestLoop = ControlLoop<MockBoard, MockHttp, MockMqtt, MockClock>;

    fn test_loop() -> TestLoop {
        let controller = TrainController::new(Registry::default(), MockBoard::new(), 0);
        let mqtt =
            MqttServiceRunner::new(MockMqtt::new(), &MqttConfig::default(), controller.registry());
        ControlLoop::new(controller, MockClock::new(), 20)
            .with_server(MockHttp::new())
            .with_mqtt(mqtt)
    }

    #[test]
    fn test_one_request_per_tick() {
        let mut control = test_loop();
        let http = control.server_mut().unwrap();
        http.queue_request(HttpRequest::get("/lego/train/switch/0/1"));
        http.queue_request(HttpRequest::get("/lego/train/config"));

        control.tick();
        assert_eq!(control.server().unwrap().responses.len(), 1);
        assert_eq!(control.server().unwrap().requests.len(), 1);

        control.tick();
        let responses = &control.server().unwrap().responses;
        assert_eq!(responses[0].body_str(), Some(r#"{"isok":true}"#));
        assert!(responses[1].body_str().unwrap().contains(r#""switches""#));
    }

    #[test]
    fn test_non_get_request() {
        let mut control = test_loop();
        let mut request = HttpRequest::get("/lego/train/switch/0/1");
        request.method = HttpMethod::Delete;
        control.server_mut().unwrap().queue_request(request);

        control.tick();
        assert_eq!(control.server().unwrap().responses[0].status, 405);
    }

    #[test]
    fn test_sensor_changes_published() {
        let mut control = test_loop();
        control
            .controller_mut()
            .hardware_mut()
            .set_input(35, PinLevel::Low);

        let summary = control.tick();
        assert_eq!(summary.sensor_changes.len(), 2);

        let mqtt = control.mqtt().unwrap().client();
        assert_eq!(mqtt.published_to("lego/train/position/0")[0].1, b"0");
        assert_eq!(mqtt.published_to("lego/train/position/1")[0].1, b"1");

        // Unchanged sensors are not republished
        let summary = control.tick();
        assert!(summary.sensor_changes.is_empty());
        assert_eq!(control.mqtt().unwrap().client().published.len(), 2);
    }

    #[test]
    fn test_motor_command_repeats_over_ticks() {
        let mut control = test_loop();
        control
            .server_mut()
            .unwrap()
            .queue_request(HttpRequest::get("/lego/train/motor/pf/0/0/3"));

        let mut sent = 0;
        for _ in 0..10 {
            if control.tick().ir_sent {
                sent += 1;
            }
        }
        assert_eq!(sent, crate::ir::IR_REPEAT_COUNT as usize);
        assert_eq!(control.controller().hardware().frames_on(4).len(), sent);
    }

    #[test]
    fn test_ir_failure_does_not_stop_mqtt() {
        let mut control = test_loop();
        control
            .controller_mut()
            .dispatch("lego/train/motor/pf/0/0/3", crate::CommandSource::Local)
            .unwrap();
        control.controller_mut().hardware_mut().fail_writes = true;

        let summary = control.tick();
        assert!(!summary.ir_sent);
        assert_eq!(summary.mqtt.map(|m| m.published), Some(2));
    }

    #[test]
    fn test_mqtt_command_dispatched() {
        let mut control = test_loop();
        control
            .mqtt_mut()
            .unwrap()
            .client_mut()
            .queue_message("lego/train/signal/1/0", b"1".to_vec());

        let summary = control.tick();
        assert_eq!(summary.mqtt.map(|m| m.dispatched), Some(1));
        assert_eq!(control.controller().hardware().lamp(27), Some(true));
    }

    #[test]
    fn test_poll_respects_interval() {
        let mut control = test_loop();
        assert!(control.poll().is_some());
        assert!(control.poll().is_none());

        control.clock_mut().advance(19);
        assert!(control.poll().is_none());

        control.clock_mut().advance(1);
        assert!(control.poll().is_some());
    }

    #[test]
    fn test_without_transports() {
        let controller = TrainController::new(Registry::default(), MockBoard::new(), 0);
        let mut control: TestLoop = ControlLoop::new(controller, MockClock::new(), 20);

        let summary = control.tick();
        assert!(!summary.request_handled);
        assert!(summary.mqtt.is_none());
    }
}
