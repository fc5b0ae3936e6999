// Process-exit cleanup for resources whose lifetime is shared across processes.
//
// Handles register a weak reference on open. Normal exits run Drop; the hook
// below covers SIGINT/SIGTERM, where destructors would otherwise be skipped
// and the shared instance count would leak.

use lazy_static::lazy_static;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

/// Something that must be released before the process goes away.
pub trait ExitCleanup: Send + Sync {
    fn cleanup(&self);
}

lazy_static! {
    static ref REGISTRY: Mutex<Vec<Weak<dyn ExitCleanup>>> = Mutex::new(Vec::new());
}

static HOOK_INSTALLED: AtomicBool = AtomicBool::new(false);

/// Track `item` so [`close_all`] releases it.
pub fn register(item: &Arc<dyn ExitCleanup>) {
    let mut registry = REGISTRY.lock();
    registry.retain(|w| w.strong_count() > 0);
    registry.push(Arc::downgrade(item));
}

/// Release every live registered resource. Safe to call repeatedly.
pub fn close_all() {
    // Upgrade outside the lock; cleanup may itself touch the registry.
    let live: Vec<Arc<dyn ExitCleanup>> = {
        let mut registry = REGISTRY.lock();
        let live = registry.iter().filter_map(Weak::upgrade).collect();
        registry.clear();
        live
    };
    debug!(count = live.len(), "closing registered shared resources");
    for item in live {
        item.cleanup();
    }
}

/// Install a SIGINT/SIGTERM handler that runs [`close_all`] and exits with
/// status 130. Only the first call installs anything; returns whether the
/// handler is active.
pub fn install_exit_hook() -> bool {
    if HOOK_INSTALLED.swap(true, Ordering::SeqCst) {
        return true;
    }
    match ctrlc::set_handler(|| {
        close_all();
        std::process::exit(130);
    }) {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "failed to install exit hook");
            HOOK_INSTALLED.store(false, Ordering::SeqCst);
            false
        }
    }
}
