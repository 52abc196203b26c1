pub mod event;

pub use event::{EventKind, FocusEvent};
