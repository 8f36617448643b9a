//! Scoped changes to the process signal dispositions.
//!
//! Both guards capture the previous handlers when created and put them back
//! when dropped, so the change never outlives the subprocess it wraps.

#[cfg(unix)]
use std::sync::atomic::{AtomicBool, Ordering};

#[cfg(unix)]
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

#[cfg(unix)]
struct SavedDisposition {
    signal: libc::c_int,
    handler: libc::sighandler_t,
}

#[cfg(unix)]
fn replace_handlers(signals: &[libc::c_int], handler: libc::sighandler_t) -> Vec<SavedDisposition> {
    signals
        .iter()
        .filter_map(|&signal| {
            // SAFETY: installing SIG_IGN or an async-signal-safe handler.
            let previous = unsafe { libc::signal(signal, handler) };
            if previous == libc::SIG_ERR {
                tracing::warn!(signal, "failed to change signal disposition");
                None
            } else {
                Some(SavedDisposition {
                    signal,
                    handler: previous,
                })
            }
        })
        .collect()
}

#[cfg(unix)]
fn restore_handlers(saved: &mut Vec<SavedDisposition>) {
    for entry in saved.drain(..).rev() {
        // SAFETY: restoring a disposition previously returned by signal().
        unsafe {
            libc::signal(entry.signal, entry.handler);
        }
    }
}

/// Ignores Ctrl-C, Ctrl-\ and Ctrl-Z in this process while alive.
///
/// The child transport owns the terminal during an interactive shell; the
/// keystrokes belong to the remote session, not to us.
pub struct UserSignalsIgnored {
    #[cfg(unix)]
    saved: Vec<SavedDisposition>,
}

impl UserSignalsIgnored {
    pub fn install() -> Self {
        #[cfg(unix)]
        {
            let saved = replace_handlers(
                &[libc::SIGINT, libc::SIGQUIT, libc::SIGTSTP],
                libc::SIG_IGN,
            );
            Self { saved }
        }
        #[cfg(not(unix))]
        {
            Self {}
        }
    }
}

impl Drop for UserSignalsIgnored {
    fn drop(&mut self) {
        #[cfg(unix)]
        restore_handlers(&mut self.saved);
    }
}

#[cfg(unix)]
extern "C" fn record_interrupt(_signal: libc::c_int) {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Something that can report a pending Ctrl-C.
pub trait InterruptFlag {
    fn tripped(&self) -> bool;
}

/// Turns SIGINT into a recorded flag while alive, so an interrupt lets the
/// caller finish its cleanup instead of killing the process.
pub struct InterruptLatch {
    #[cfg(unix)]
    saved: Vec<SavedDisposition>,
}

impl InterruptLatch {
    pub fn install() -> Self {
        #[cfg(unix)]
        {
            INTERRUPTED.store(false, Ordering::SeqCst);
            let handler = record_interrupt as extern "C" fn(libc::c_int);
            let saved = replace_handlers(&[libc::SIGINT], handler as libc::sighandler_t);
            Self { saved }
        }
        #[cfg(not(unix))]
        {
            Self {}
        }
    }
}

impl InterruptFlag for InterruptLatch {
    /// Whether SIGINT arrived since the latch was installed.
    fn tripped(&self) -> bool {
        #[cfg(unix)]
        {
            INTERRUPTED.load(Ordering::SeqCst)
        }
        #[cfg(not(unix))]
        {
            false
        }
    }
}

impl Drop for InterruptLatch {
    fn drop(&mut self) {
        #[cfg(unix)]
        restore_handlers(&mut self.saved);
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn current_handler(signal: libc::c_int) -> libc::sighandler_t {
        // SAFETY: read the handler by swapping in SIG_DFL and back.
        unsafe {
            let handler = libc::signal(signal, libc::SIG_DFL);
            libc::signal(signal, handler);
            handler
        }
    }

    // Signal dispositions are process-wide, so every check lives in one test.
    #[test]
    fn test_guards_restore_previous_dispositions() {
        let before_quit = current_handler(libc::SIGQUIT);
        let before_tstp = current_handler(libc::SIGTSTP);
        let before_int = current_handler(libc::SIGINT);
        {
            let _guard = UserSignalsIgnored::install();
            assert_eq!(current_handler(libc::SIGQUIT), libc::SIG_IGN);
            assert_eq!(current_handler(libc::SIGTSTP), libc::SIG_IGN);
            assert_eq!(current_handler(libc::SIGINT), libc::SIG_IGN);
        }
        assert_eq!(current_handler(libc::SIGQUIT), before_quit);
        assert_eq!(current_handler(libc::SIGTSTP), before_tstp);
        assert_eq!(current_handler(libc::SIGINT), before_int);

        {
            let latch = InterruptLatch::install();
            assert!(!latch.tripped());
            // SAFETY: raising SIGINT with the recording handler installed.
            unsafe {
                libc::raise(libc::SIGINT);
            }
            assert!(latch.tripped());

            // A child span inside the latch hands SIGINT back to the latch.
            let latched = current_handler(libc::SIGINT);
            {
                let _guard = UserSignalsIgnored::install();
                assert_eq!(current_handler(libc::SIGINT), libc::SIG_IGN);
            }
            assert_eq!(current_handler(libc::SIGINT), latched);
        }
        assert_eq!(current_handler(libc::SIGINT), before_int);
    }
}
