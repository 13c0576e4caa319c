//! Atomic per-address nonce allocation.
//!
//! Grounded on `original_source/polymarket/utils/cache.py::AtomicNonceManager`.
//! Two-tier locking: a global lock guards only the creation of a new
//! per-address lock; the actual nonce read/increment happens under that
//! per-address lock so concurrent allocation for *different* addresses never
//! contends. `cleanup_inactive` removes both the nonce state and the
//! per-address lock together so neither leaks once a wallet goes idle.
//!
//! Locking order in this crate is always `subscription lock -> address lock
//! -> nonce global lock`; never the reverse.

use alloy_primitives::Address;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

struct AddressState {
    next_nonce: u64,
    last_used: Instant,
}

/// Per-address monotonic nonce counter with idle cleanup.
pub struct NonceManager {
    global: Mutex<HashMap<Address, Arc<Mutex<AddressState>>>>,
}

impl Default for NonceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl NonceManager {
    pub fn new() -> Self {
        Self {
            global: Mutex::new(HashMap::new()),
        }
    }

    fn address_lock(&self, address: Address) -> Arc<Mutex<AddressState>> {
        let mut global = self.global.lock().expect("nonce global lock poisoned");
        global
            .entry(address)
            .or_insert_with(|| {
                Arc::new(Mutex::new(AddressState {
                    next_nonce: 0,
                    last_used: Instant::now(),
                }))
            })
            .clone()
    }

    /// Allocate and consume the next nonce for `address`.
    pub fn next(&self, address: Address) -> u64 {
        let lock = self.address_lock(address);
        let mut state = lock.lock().expect("nonce address lock poisoned");
        let nonce = state.next_nonce;
        state.next_nonce += 1;
        state.last_used = Instant::now();
        nonce
    }

    /// Observe a nonce from an external source (e.g. the API reports an
    /// in-use nonce higher than our local counter) and fast-forward past it.
    pub fn observe(&self, address: Address, seen_nonce: u64) {
        let lock = self.address_lock(address);
        let mut state = lock.lock().expect("nonce address lock poisoned");
        if seen_nonce >= state.next_nonce {
            state.next_nonce = seen_nonce + 1;
        }
        state.last_used = Instant::now();
    }

    /// Last-resort nonce when the API's nonce endpoint is unavailable:
    /// current timestamp in milliseconds plus a small random offset, to
    /// reduce (but not eliminate) collision probability. Documented as a
    /// probabilistic fallback only, per `DESIGN.md` Open Question 1.
    pub fn bootstrap_from_timestamp(&self, address: Address) -> u64 {
        use rand::Rng;
        let millis = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time went backwards")
            .as_millis() as u64;
        let offset: u64 = rand::thread_rng().gen_range(0..1_000);
        let nonce = millis.wrapping_add(offset);
        self.observe(address, nonce);
        nonce
    }

    /// Drop state (and the per-address lock) for addresses whose last nonce
    /// allocation is older than `max_idle`. Returns the number removed.
    pub fn cleanup_inactive(&self, max_idle: Duration) -> usize {
        let mut global = self.global.lock().expect("nonce global lock poisoned");
        let stale: Vec<Address> = global
            .iter()
            .filter_map(|(addr, state)| {
                let last_used = state.lock().expect("nonce address lock poisoned").last_used;
                if last_used.elapsed() >= max_idle {
                    Some(*addr)
                } else {
                    None
                }
            })
            .collect();
        for addr in &stale {
            global.remove(addr);
        }
        stale.len()
    }

    pub fn tracked_addresses(&self) -> usize {
        self.global.lock().expect("nonce global lock poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    #[test]
    fn nonces_are_monotonic_per_address() {
        let mgr = NonceManager::new();
        let a = addr(1);
        assert_eq!(mgr.next(a), 0);
        assert_eq!(mgr.next(a), 1);
        assert_eq!(mgr.next(a), 2);
    }

    #[test]
    fn addresses_are_independent() {
        let mgr = NonceManager::new();
        let a = addr(1);
        let b = addr(2);
        assert_eq!(mgr.next(a), 0);
        assert_eq!(mgr.next(b), 0);
        assert_eq!(mgr.next(a), 1);
    }

    #[test]
    fn cleanup_removes_idle_addresses() {
        let mgr = NonceManager::new();
        let a = addr(1);
        mgr.next(a);
        assert_eq!(mgr.tracked_addresses(), 1);
        let removed = mgr.cleanup_inactive(Duration::from_secs(0));
        assert_eq!(removed, 1);
        assert_eq!(mgr.tracked_addresses(), 0);
    }
}
