//! Named stopwatch marks for one dispatch.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

pub const TOTAL_EXECUTION: &str = "total_execution";
pub const BOOTSTRAP: &str = "bootstrap";
pub const ROUTING: &str = "routing";
pub const CONTROLLER: &str = "controller";
pub const CONTROLLER_CONSTRUCTOR: &str = "controller_constructor";

#[derive(Debug, Clone, Copy)]
struct Mark {
    start: Instant,
    end: Option<Instant>,
}

#[derive(Debug, Default)]
pub struct Timer {
    marks: BTreeMap<&'static str, Mark>,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, name: &'static str) {
        self.marks.insert(
            name,
            Mark {
                start: Instant::now(),
                end: None,
            },
        );
    }

    /// Stop a running mark. Unknown names are ignored.
    pub fn stop(&mut self, name: &'static str) {
        if let Some(mark) = self.marks.get_mut(name) {
            mark.end.get_or_insert_with(Instant::now);
        }
    }

    /// Elapsed time of a mark; running marks measure up to now.
    pub fn elapsed(&self, name: &str) -> Option<Duration> {
        self.marks
            .get(name)
            .map(|m| m.end.unwrap_or_else(Instant::now).duration_since(m.start))
    }

    /// Elapsed seconds rounded to 4 decimals, 0.0 for unknown marks.
    pub fn seconds(&self, name: &str) -> f64 {
        self.elapsed(name)
            .map(|d| (d.as_secs_f64() * 10_000.0).round() / 10_000.0)
            .unwrap_or(0.0)
    }

    /// All marks as (name, seconds), in name order.
    pub fn summary(&self) -> Vec<(&'static str, f64)> {
        self.marks.keys().map(|name| (*name, self.seconds(name))).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_stop() {
        let mut timer = Timer::new();
        timer.start(ROUTING);
        timer.stop(ROUTING);
        let first = timer.elapsed(ROUTING).unwrap();
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(timer.elapsed(ROUTING).unwrap(), first); // Stopped marks are frozen
    }

    #[test]
    fn test_unknown_mark() {
        let mut timer = Timer::new();
        timer.stop(CONTROLLER);
        assert!(timer.elapsed(CONTROLLER).is_none());
        assert_eq!(timer.seconds(CONTROLLER), 0.0);
    }

    #[test]
    fn test_summary_lists_marks() {
        let mut timer = Timer::new();
        timer.start(TOTAL_EXECUTION);
        timer.start(BOOTSTRAP);
        let names: Vec<_> = timer.summary().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec![BOOTSTRAP, TOTAL_EXECUTION]);
    }
}
