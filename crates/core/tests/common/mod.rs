//! Shared test infrastructure.


pub use builder::TraceInstructionBuilder;

/// Initializes logging for a test; safe to call repeatedly.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
