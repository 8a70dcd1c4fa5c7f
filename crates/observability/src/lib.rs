//! Logging setup shared by every conduit binary.

/// Subscriber installation.
pub mod tracing;

pub use self::tracing::LogFormat;

/// Initialize process-wide logging for `service`.
///
/// Safe to call multiple times; only the first call installs a subscriber.
pub fn init(service: &'static str) {
    self::tracing::init(service, LogFormat::from_env());
}
