use std::sync::{
    Arc, Mutex, OnceLock,
    atomic::{AtomicBool, Ordering},
};

static SHUTDOWN_FLAGS: OnceLock<Mutex<Vec<Arc<AtomicBool>>>> = OnceLock::new();
static SHUTDOWN_HOOK_INSTALLED: OnceLock<()> = OnceLock::new();

fn shutdown_flags() -> &'static Mutex<Vec<Arc<AtomicBool>>> {
    SHUTDOWN_FLAGS.get_or_init(|| Mutex::new(Vec::new()))
}

fn install_shutdown_hook_once() {
    SHUTDOWN_HOOK_INSTALLED.get_or_init(|| {
        if let Err(err) = ctrlc::set_handler(|| {
            log::warn!("shutdown: interrupt received, stopping workers");
            raise_registered_flags();
        }) {
            log::warn!("shutdown: failed to install interrupt hook err={err}");
        }
    });
}

fn raise_registered_flags() {
    let flags: Vec<Arc<AtomicBool>> = match shutdown_flags().lock() {
        Ok(guard) => guard.clone(),
        Err(_) => Vec::new(),
    };
    for flag in flags {
        flag.store(true, Ordering::SeqCst);
    }
}

/// Raises `flag` when the process receives Ctrl-C.
pub fn register_for_interrupt(flag: &Arc<AtomicBool>) {
    install_shutdown_hook_once();
    if let Ok(mut guard) = shutdown_flags().lock()
        && !guard.iter().any(|known| Arc::ptr_eq(known, flag))
    {
        guard.push(Arc::clone(flag));
    }
}

pub fn unregister_for_interrupt(flag: &Arc<AtomicBool>) {
    if let Some(flags) = SHUTDOWN_FLAGS.get()
        && let Ok(mut guard) = flags.lock()
    {
        guard.retain(|known| !Arc::ptr_eq(known, flag));
    }
}
