pub mod classify;
pub mod controller;
pub mod inbound;
pub mod loop_worker;
pub mod reading;

pub use classify::{
    classify, is_valid_distance, HolderState, ProximityBand, ProximityState, ProximityThresholds,
    MAX_VALID_DISTANCE_CM, MIN_VALID_DISTANCE_CM,
};
pub use controller::SensingController;
pub use inbound::{parse_line, InboundMessage};
pub use reading::{decode_payload, Metric, SensorNode, SensorReading};
