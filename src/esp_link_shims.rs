//! Runtime symbol providers for the ESP-IDF std runtime.
//!
//! - `critical-section`: embassy-sync's `CriticalSectionRawMutex` needs a
//!   global acquire/release pair.  Workers are std threads over FreeRTOS
//!   tasks, so a process-wide reentrant lock keyed by thread id is enough: a
//!   nested acquire on the owning thread only bumps the depth.  Never entered
//!   from an ISR.
//! - `embassy-time` driver: the bounded channel waits race an
//!   `async_io_mini::Timer` against the receive.  Time is `esp_timer` in
//!   microseconds (the 1 MHz default tick rate), and wakeups are served by
//!   one lazily started timer thread.

use core::ffi::c_void;
use core::task::Waker;
use core::time::Duration;
use std::sync::{Condvar, Mutex, MutexGuard, Once, PoisonError};
use std::thread::{self, ThreadId};

// ── critical-section ─────────────────────────────────────────

struct Owner {
    thread: Option<ThreadId>,
    depth: u8,
}

static OWNER: Mutex<Owner> = Mutex::new(Owner { thread: None, depth: 0 });
static RELEASED: Condvar = Condvar::new();

#[unsafe(no_mangle)]
pub extern "C" fn _critical_section_1_0_acquire() -> u8 {
    let me = thread::current().id();
    let mut owner = OWNER.lock().unwrap_or_else(PoisonError::into_inner);
    while owner.thread.is_some_and(|t| t != me) {
        owner = RELEASED.wait(owner).unwrap_or_else(PoisonError::into_inner);
    }
    owner.thread = Some(me);
    owner.depth = owner.depth.saturating_add(1);
    owner.depth
}

#[unsafe(no_mangle)]
pub extern "C" fn _critical_section_1_0_release(_token: u8) {
    let mut owner = OWNER.lock().unwrap_or_else(PoisonError::into_inner);
    if owner.depth == 0 {
        return;
    }
    owner.depth -= 1;
    if owner.depth == 0 {
        owner.thread = None;
        RELEASED.notify_one();
    }
}

// ── embassy-time driver ──────────────────────────────────────

/// Pending wakeups as `(deadline_ticks, waker)`.  A waker appears at most
/// once, at its earliest deadline.
static WAKEUPS: Mutex<Vec<(u64, Waker)>> = Mutex::new(Vec::new());
static WAKEUPS_CHANGED: Condvar = Condvar::new();
static TIMER_THREAD: Once = Once::new();

#[unsafe(no_mangle)]
pub extern "C" fn _embassy_time_now() -> u64 {
    // SAFETY: esp_timer_get_time has no preconditions once the esp_timer
    // service is up, which happens before `main`.
    let us = unsafe { esp_idf_svc::sys::esp_timer_get_time() };
    us.max(0) as u64
}

#[unsafe(no_mangle)]
pub extern "C" fn _embassy_time_schedule_wake(at: u64, waker: *mut c_void) {
    if waker.is_null() {
        return;
    }
    // SAFETY: embassy-time passes a pointer to a live `Waker` for the
    // duration of this call; it is cloned before returning.
    let waker = unsafe { (*waker.cast::<Waker>()).clone() };

    TIMER_THREAD.call_once(|| {
        let spawned = thread::Builder::new()
            .name("time_wake".into())
            .stack_size(3 * 1024)
            .spawn(serve_wakeups);
        if let Err(e) = spawned {
            log::error!("time driver: wake thread not started: {}", e);
        }
    });

    let mut pending = lock_wakeups();
    match pending.iter_mut().find(|(_, w)| w.will_wake(&waker)) {
        Some(slot) => slot.0 = slot.0.min(at),
        None => pending.push((at, waker)),
    }
    WAKEUPS_CHANGED.notify_one();
}

fn lock_wakeups() -> MutexGuard<'static, Vec<(u64, Waker)>> {
    WAKEUPS.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Body of the timer thread: fire due wakers, then sleep until the earliest
/// remaining deadline or the next registration.
fn serve_wakeups() {
    let mut pending = lock_wakeups();
    loop {
        let now = _embassy_time_now();
        let mut due = Vec::new();
        pending.retain(|(at, w)| {
            if *at <= now {
                due.push(w.clone());
                false
            } else {
                true
            }
        });

        if !due.is_empty() {
            drop(pending);
            due.into_iter().for_each(Waker::wake);
            pending = lock_wakeups();
            continue;
        }

        pending = match pending.iter().map(|(at, _)| *at).min() {
            Some(next) => {
                let wait = Duration::from_micros(next - now);
                WAKEUPS_CHANGED
                    .wait_timeout(pending, wait)
                    .unwrap_or_else(PoisonError::into_inner)
                    .0
            }
            None => WAKEUPS_CHANGED.wait(pending).unwrap_or_else(PoisonError::into_inner),
        };
    }
}
