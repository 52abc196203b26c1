pub mod commands;
pub mod controller;
pub mod state;
pub mod stats;

pub use controller::{Notification, SessionController};
pub use state::{
    LiveSensorState, LoadedSession, ReadingOutcome, RunStatus, SessionAccumulator, SessionSnapshot,
};
pub use stats::SessionStats;
