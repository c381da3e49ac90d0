pub mod recording;

pub use recording::{NewRecording, Recording};
