pub mod config;
pub mod controller;
pub mod device;
pub mod error;
pub mod sink;
pub mod streaming_task;

#[cfg(feature = "dwf")]
pub mod dwf;
