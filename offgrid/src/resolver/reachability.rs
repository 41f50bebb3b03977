//! Network reachability seam.

use std::sync::atomic::{AtomicBool, Ordering};

/// Advisory answer to "is the live tile source worth trying".
///
/// Implementations must be cheap; the resolver asks on every cache miss.
pub trait Reachability: Send + Sync {
    fn is_reachable(&self) -> bool;
}

/// Reachability flag set by the host application.
#[derive(Debug, Default)]
pub struct StaticReachability {
    reachable: AtomicBool,
}

impl StaticReachability {
    pub fn new(reachable: bool) -> Self {
        Self {
            reachable: AtomicBool::new(reachable),
        }
    }

    pub fn set(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::Relaxed);
    }
}

impl Reachability for StaticReachability {
    fn is_reachable(&self) -> bool {
        self.reachable.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_reachability_toggles() {
        let r = StaticReachability::new(false);
        assert!(!r.is_reachable());
        r.set(true);
        assert!(r.is_reachable());
        assert!(!StaticReachability::default().is_reachable());
    }
}
