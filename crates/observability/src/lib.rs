//! Process-wide tracing setup shared by the binary and tests.

pub mod tracing;

/// Initialize JSON logging for the process.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init() {
    tracing::init();
}

/// Human-readable debug logging captured by the test harness.
pub fn init_test() {
    tracing::init_test();
}
