/*!
 * Error Reporter
 * Global error handler of an isolated context
 *
 * Panics raised by module code on a context thread are captured with their
 * location and turned into `error` payloads; the host never sees them
 * unwind. Threads that are not contexts keep the previous panic hook.
 */

use crate::protocol::ErrorPayload;
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;
use tracing::error;

thread_local! {
    static IS_CONTEXT_THREAD: Cell<bool> = const { Cell::new(false) };
    static LAST_PANIC: RefCell<Option<ErrorPayload>> = const { RefCell::new(None) };
}

static HOOK: Once = Once::new();

/// Install the reporter for the current thread
///
/// The process-wide hook is chained once; it only intercepts panics on
/// threads that called this function.
pub fn install() {
    IS_CONTEXT_THREAD.with(|flag| flag.set(true));

    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if !IS_CONTEXT_THREAD.with(|flag| flag.get()) {
                previous(info);
                return;
            }

            let mut payload = ErrorPayload::new(panic_message(info.payload()));
            if let Some(location) = info.location() {
                payload = payload.with_location(location.file(), location.line(), location.column());
            }
            error!(
                message = %payload.message,
                source = ?payload.source,
                line = ?payload.line,
                "uncaught error in isolated context"
            );
            LAST_PANIC.with(|slot| *slot.borrow_mut() = Some(payload));
        }));
    });
}

/// Run `f`, converting an unwinding failure into an error payload
pub fn guard<R>(f: impl FnOnce() -> R) -> Result<R, ErrorPayload> {
    LAST_PANIC.with(|slot| slot.borrow_mut().take());

    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        LAST_PANIC
            .with(|slot| slot.borrow_mut().take())
            .unwrap_or_else(|| ErrorPayload::new(panic_message(payload.as_ref())))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "Uncaught exception".to_string()
    }
}
