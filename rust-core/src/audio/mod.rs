//! Capture plumbing around the analysis session

pub mod buffer;
#[cfg(feature = "capture")]
pub mod input;
pub mod worker;

pub use buffer::{SampleConsumer, SampleProducer, SampleQueue};
#[cfg(feature = "capture")]
pub use input::{list_input_devices, AudioDeviceInfo, AudioInput};
pub use worker::ListeningWorker;
