//! JSON documents describing the layout and command responses.
//!
//! The topology lists every registered actuator in registration order:
//!
//! ```text
//! {"train":{"motors":{"pf":[{"id":0,"pin":4}]},
//!           "positions":[{"id":0,"pin":34}, ...],
//!           "switches":[...],"barriers":[...],
//!           "signals":[{"id":0,"pins":[25,26]}, ...]}}
//! ```
//!
//! A command response is `{"isok":bool}`, with the topology attached under
//! `"lego"` when a `config` command asked for it. Rendering goes through
//! `serde-json-core` into fixed-capacity strings, so it needs no allocator
//! and produces the same bytes for the same registry every time.

use heapless::String as HString;
use serde::Serialize;

use crate::registry::{PinEntry, Registry, SignalEntry};

/// Capacity of a rendered topology document.
pub const TOPOLOGY_CAPACITY: usize = 2048;

/// Capacity of a rendered response document.
pub const RESPONSE_CAPACITY: usize = TOPOLOGY_CAPACITY + 32;

/// Rendered topology document.
pub type TopologyJson = HString<TOPOLOGY_CAPACITY>;

/// Rendered response document.
pub type ResponseJson = HString<RESPONSE_CAPACITY>;

/// Top-level topology document.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct Topology<'a> {
    train: TrainTopology<'a>,
}

#[derive(Clone, Copy, Debug, Serialize)]
struct TrainTopology<'a> {
    motors: Motors<'a>,
    positions: &'a [PinEntry],
    switches: &'a [PinEntry],
    barriers: &'a [PinEntry],
    signals: &'a [SignalEntry],
}

#[derive(Clone, Copy, Debug, Serialize)]
struct Motors<'a> {
    pf: &'a [PinEntry],
}

impl<'a> Topology<'a> {
    /// Borrow the registry as a topology document.
    pub fn of(registry: &'a Registry) -> Self {
        Self {
            train: TrainTopology {
                motors: Motors {
                    pf: registry.ir_outputs(),
                },
                positions: registry.sensors(),
                switches: registry.switches(),
                barriers: registry.barriers(),
                signals: registry.signals(),
            },
        }
    }

    /// Render to JSON.
    pub fn to_json(&self) -> Result<TopologyJson, serde_json_core::ser::Error> {
        serde_json_core::to_string(self)
    }
}

/// Acknowledgement sent back for every command.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct Response<'a> {
    isok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    lego: Option<Topology<'a>>,
}

impl<'a> Response<'a> {
    /// Plain acknowledgement.
    pub const fn ack(accepted: bool) -> Self {
        Self {
            isok: accepted,
            lego: None,
        }
    }

    /// Accepted acknowledgement carrying the topology.
    pub fn with_topology(registry: &'a Registry) -> Self {
        Self {
            isok: true,
            lego: Some(Topology::of(registry)),
        }
    }

    /// Whether the command was accepted.
    pub const fn is_ok(&self) -> bool {
        self.isok
    }

    /// Render to JSON.
    pub fn to_json(&self) -> Result<ResponseJson, serde_json_core::ser::Error> {
        serde_json_core::to_string(self)
    }
}

/// Rendered `{"isok":false}`, used when rendering itself fails.
pub const NOT_OK_JSON: &str = r#"{"isok":false}"#;
