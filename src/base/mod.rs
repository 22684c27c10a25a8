pub mod stats;

use std::sync::Once;

static INIT: Once = Once::new();

/// Initialise runtime environment once per process. Safe to call from
/// multiple threads, only the first call has any effect.
pub fn init_env() {
    INIT.call_once(|| {
        env_logger::try_init().ok();
    });
}
