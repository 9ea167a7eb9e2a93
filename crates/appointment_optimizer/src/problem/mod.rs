pub mod error;
pub mod schedule_request;
pub mod service_time;
