pub mod capture_device;
pub mod stream_observer;
