use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Admits iterations until the deadline passes, the optional iteration cap is spent,
/// or someone closes it. Iterations already admitted are never interrupted.
#[derive(Debug)]
pub struct IterationGate {
    admitted: AtomicU64,
    max_iterations: Option<u64>,
    duration: Duration,
    /// `None` when the deadline lies beyond what `Instant` can represent.
    deadline: OnceLock<Option<Instant>>,
    closed: AtomicBool,
}

impl IterationGate {
    pub fn new(duration: Duration, max_iterations: Option<u64>) -> Self {
        Self {
            admitted: AtomicU64::new(0),
            max_iterations,
            duration,
            deadline: OnceLock::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// First call wins.
    pub fn start_at(&self, started: Instant) {
        let _ = self.deadline.set(started.checked_add(self.duration));
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn next(&self) -> bool {
        if self.is_closed() {
            return false;
        }

        let now = Instant::now();
        let deadline = *self.deadline.get_or_init(|| now.checked_add(self.duration));
        if deadline.is_some_and(|d| now >= d) {
            return false;
        }

        if let Some(cap) = self.max_iterations {
            let idx = self.admitted.fetch_add(1, Ordering::Relaxed);
            if idx >= cap {
                return false;
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iteration_cap_is_shared_across_callers() {
        let gate = IterationGate::new(Duration::from_secs(60), Some(3));
        gate.start_at(Instant::now());
        let admitted = (0..10).filter(|_| gate.next()).count();
        assert_eq!(admitted, 3);
    }

    #[test]
    fn expired_deadline_admits_nothing() {
        let gate = IterationGate::new(Duration::from_millis(5), None);
        gate.start_at(Instant::now() - Duration::from_millis(10));
        assert!(!gate.next());
    }

    #[test]
    fn unrepresentable_deadline_keeps_admitting() {
        let gate = IterationGate::new(Duration::MAX, Some(2));
        gate.start_at(Instant::now());
        assert!(gate.next());
        assert!(gate.next());
        assert!(!gate.next());

        let lazy = IterationGate::new(Duration::MAX, None);
        assert!(lazy.next());
    }

    #[test]
    fn close_stops_admission() {
        let gate = IterationGate::new(Duration::from_secs(60), None);
        assert!(gate.next());
        gate.close();
        assert!(!gate.next());
    }
}
