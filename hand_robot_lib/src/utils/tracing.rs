//! Centralized tracing initialization for the relay and streamer nodes.
//!
//! Both binaries run on a single-threaded runtime, so a subscriber installed
//! as the default for the main thread covers every task they spawn.

use tracing::subscriber::DefaultGuard;
use tracing_subscriber::EnvFilter;

/// Initialize tracing with a thread-local subscriber.
///
/// - Respects the RUST_LOG environment variable (defaults to "info")
/// - Compact output without file/line metadata
///
/// The returned guard must stay in scope for the life of the program.
///
/// # Example
/// ```no_run
/// use hand_robot_lib::init_tracing;
///
/// fn main() {
///     let _guard = init_tracing();
///     // node code here
/// }
/// ```
pub fn init_tracing() -> DefaultGuard {
    init_tracing_with("info")
}

/// Same as [`init_tracing`] with a caller-chosen filter for when RUST_LOG is unset
pub fn init_tracing_with(default_filter: &str) -> DefaultGuard {
    use tracing_subscriber::layer::SubscriberExt;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let subscriber = tracing_subscriber::registry().with(filter).with(
        tracing_subscriber::fmt::layer()
            .compact()
            .with_target(false)
            .with_file(false)
            .with_line_number(false),
    );

    tracing::subscriber::set_default(subscriber)
}

/// Milliseconds since the Unix epoch, as carried in wire timestamps
pub fn now_millis() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}
