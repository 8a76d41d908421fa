//! Thread-to-core pinning.
//!
//! Bandwidth measurements are sensitive to thread migration: a thread that
//! hops cores mid-sweep drags its working set across cache domains. The
//! sequential driver pins the measuring thread for the duration of a run via
//! [`CpuPinGuard`]; parallel workers pin themselves to consecutive cores.
//!
//! Linux only; on other platforms every call is a successful no-op.

#[cfg(target_os = "linux")]
mod platform {
    use std::cell::RefCell;

    thread_local! {
        static SAVED_AFFINITY: RefCell<Option<libc::cpu_set_t>> = const { RefCell::new(None) };
    }

    pub fn core_count() -> Option<usize> {
        let n = unsafe { libc::sysconf(libc::_SC_NPROCESSORS_ONLN) };
        (n > 0).then_some(n as usize)
    }

    pub fn current_core() -> Option<usize> {
        let cpu = unsafe { libc::sched_getcpu() };
        (cpu >= 0).then_some(cpu as usize)
    }

    /// Remember the current affinity mask so a later unpin can restore it.
    pub fn save_affinity() -> bool {
        unsafe {
            let mut set: libc::cpu_set_t = std::mem::zeroed();
            if libc::sched_getaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &mut set) == 0
            {
                SAVED_AFFINITY.with(|cell| *cell.borrow_mut() = Some(set));
                true
            } else {
                false
            }
        }
    }

    pub fn set_affinity(core: usize) -> bool {
        unsafe {
            let mut set: libc::cpu_set_t = std::mem::zeroed();
            libc::CPU_ZERO(&mut set);
            libc::CPU_SET(core, &mut set);
            libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &set) == 0
        }
    }

    pub fn restore_affinity() -> bool {
        SAVED_AFFINITY.with(|cell| match cell.borrow_mut().take() {
            Some(set) => unsafe {
                libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &set) == 0
            },
            None => false,
        })
    }
}

#[cfg(not(target_os = "linux"))]
mod platform {
    pub fn core_count() -> Option<usize> {
        None
    }
    pub fn current_core() -> Option<usize> {
        None
    }
    pub fn save_affinity() -> bool {
        true
    }
    pub fn set_affinity(_core: usize) -> bool {
        false
    }
    pub fn restore_affinity() -> bool {
        true
    }
}

/// Number of online cores, if the platform can report it.
pub fn core_count() -> Option<usize> {
    platform::core_count()
}

/// Core the calling thread is currently running on.
pub fn current_core() -> Option<usize> {
    platform::current_core()
}

/// Pin the calling thread to `core`, wrapping around the online core count.
///
/// Saves the previous affinity mask first so [`unpin`] can undo the pin.
/// Returns `true` on success.
pub fn pin_to(core: usize) -> bool {
    let core = match platform::core_count() {
        Some(n) if n > 0 => core % n,
        _ => core,
    };
    platform::save_affinity();
    platform::set_affinity(core)
}

/// Restore the affinity mask saved by the last [`pin_to`] on this thread.
pub fn unpin() -> bool {
    platform::restore_affinity()
}

/// RAII pin for the measuring thread: pins to the core the thread is
/// currently on (avoiding a forced migration), unpins on drop.
pub struct CpuPinGuard {
    pinned: Option<usize>,
}

impl CpuPinGuard {
    pub fn new() -> Self {
        let pinned = match platform::current_core() {
            Some(core) if pin_to(core) => Some(core),
            // Unknown current core: fall back to core 0.
            _ if pin_to(0) => Some(0),
            _ => None,
        };
        Self { pinned }
    }

    pub fn core(&self) -> Option<usize> {
        self.pinned
    }

    pub fn is_pinned(&self) -> bool {
        self.pinned.is_some()
    }
}

impl Drop for CpuPinGuard {
    fn drop(&mut self) {
        if self.pinned.is_some() {
            unpin();
        }
    }
}

impl Default for CpuPinGuard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_guard_roundtrip() {
        let guard = CpuPinGuard::new();
        if guard.is_pinned() {
            assert!(guard.core().is_some());
        }
        drop(guard);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_pin_and_unpin() {
        // Core 0 may be masked out by a cpuset; only assert when the pin
        // itself succeeded.
        if pin_to(0) {
            assert_eq!(current_core(), Some(0));
            assert!(unpin());
        }
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_core_count_reported() {
        assert!(core_count().unwrap() >= 1);
    }
}
