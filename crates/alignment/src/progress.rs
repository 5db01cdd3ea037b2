//! Advisory progress reporting for long construction passes.

use tracing::info;

/// Universe size above which progress is reported in finer steps.
const FINE_GRAINED_UNIVERSE: usize = 30;

/// Reports percentage milestones while walking a known number of steps.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total: usize,
    done: usize,
    limits: Vec<u32>,
    next_limit: usize,
}

impl ProgressTracker {
    /// Milestones every 20%, or every 10% for universes above 30 instruments.
    pub fn new(total: usize, universe_size: usize) -> Self {
        let step = if universe_size > FINE_GRAINED_UNIVERSE { 10 } else { 20 };
        Self {
            total,
            done: 0,
            limits: (1..=100 / step).map(|i| i * step).collect(),
            next_limit: 0,
        }
    }

    /// Record one completed step.
    ///
    /// Returns the highest milestone crossed by this step, if any.
    pub fn advance(&mut self) -> Option<u32> {
        if self.total == 0 {
            return None;
        }
        self.done += 1;
        let pct_done = self.done as f64 * 100.0 / self.total as f64;

        let mut crossed = None;
        while let Some(&limit) = self.limits.get(self.next_limit) {
            if pct_done < limit as f64 {
                break;
            }
            crossed = Some(limit);
            self.next_limit += 1;
        }

        if let Some(pct) = crossed {
            info!("{}% done...", pct);
        }
        crossed
    }

    /// Steps completed so far.
    pub fn done(&self) -> usize {
        self.done
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coarse_milestones() {
        let mut progress = ProgressTracker::new(10, 5);
        let reported: Vec<u32> = (0..10).filter_map(|_| progress.advance()).collect();
        assert_eq!(reported, vec![20, 40, 60, 80, 100]);
    }

    #[test]
    fn test_fine_milestones_for_large_universe() {
        let mut progress = ProgressTracker::new(10, 31);
        let reported: Vec<u32> = (0..10).filter_map(|_| progress.advance()).collect();
        assert_eq!(reported.len(), 10);
        assert_eq!(reported[0], 10);
    }

    #[test]
    fn test_few_steps_jump_milestones() {
        let mut progress = ProgressTracker::new(2, 1);
        assert_eq!(progress.advance(), Some(40));
        assert_eq!(progress.advance(), Some(100));
        assert_eq!(progress.advance(), None);
    }

    #[test]
    fn test_empty_total() {
        let mut progress = ProgressTracker::new(0, 1);
        assert_eq!(progress.advance(), None);
        assert_eq!(progress.done(), 0);
    }
}
