pub mod rate_limit;
pub mod request_trace;
pub mod structured_logger;

pub use rate_limit::RateLimit;
pub use request_trace::RequestTrace;
pub use structured_logger::StructuredLogger;
