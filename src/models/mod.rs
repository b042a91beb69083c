pub mod event;
pub mod timestamp;

pub use event::{Event, EventCreate, EventFilter, EventUpdate, DEFAULT_COLOR};
