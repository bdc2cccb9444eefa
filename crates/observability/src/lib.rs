//! Process-wide logging setup for Insti Chain binaries and tests.

/// Initialize tracing with the format chosen by `INSTI_LOG_FORMAT`.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    self::tracing::init();
}

/// Tracing configuration (filters, output format).
pub mod tracing;

pub use self::tracing::LogFormat;
