pub mod connection_tracker;
pub mod domain;
pub mod realtime_publisher;
