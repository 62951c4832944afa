pub mod gate;

pub use gate::{SessionGate, SessionObserver};
