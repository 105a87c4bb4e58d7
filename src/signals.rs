//! SIGINT/SIGTERM handling for cancelling a run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use nix::sys::signal::{self, SigHandler, Signal};

use crate::cleaner::CancelToken;

static CANCEL_FLAG: OnceLock<Arc<AtomicBool>> = OnceLock::new();

/// Install handlers that cancel the run on SIGINT or SIGTERM.
///
/// Roots already being processed finish; no new root is started. Calling
/// this more than once returns tokens sharing the same flag.
pub fn install_cancel_handlers() -> nix::Result<CancelToken> {
    let flag = CANCEL_FLAG.get_or_init(|| Arc::new(AtomicBool::new(false)));

    // SAFETY: the handler only performs an atomic store.
    unsafe {
        signal::signal(Signal::SIGINT, SigHandler::Handler(handle_cancel))?;
        signal::signal(Signal::SIGTERM, SigHandler::Handler(handle_cancel))?;
    }

    Ok(CancelToken::from_flag(Arc::clone(flag)))
}

extern "C" fn handle_cancel(_: i32) {
    if let Some(flag) = CANCEL_FLAG.get() {
        flag.store(true, Ordering::SeqCst);
    }
}
