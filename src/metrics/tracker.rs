use serde::{Serialize, Deserialize};

/// Running statistics of one tracked metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricStats {
    pub name: String,
    pub total: f64,
    pub count: usize,
    pub average: f64,
}

/// Accumulates per-batch metric values and keeps their running averages.
///
/// Metrics keep the order in which they were registered, which is also the
/// order of `result()`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricTracker {
    stats: Vec<MetricStats>,
}

impl MetricTracker {
    pub fn new<I, S>(names: I) -> MetricTracker
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MetricTracker {
            stats: names
                .into_iter()
                .map(|name| MetricStats { name: name.into(), total: 0.0, count: 0, average: 0.0 })
                .collect(),
        }
    }

    pub fn reset(&mut self) {
        for s in &mut self.stats {
            s.total = 0.0;
            s.count = 0;
            s.average = 0.0;
        }
    }

    /// Adds `value` observed `n` times. Unknown names are ignored.
    pub fn update(&mut self, name: &str, value: f64, n: usize) {
        if let Some(s) = self.stats.iter_mut().find(|s| s.name == name) {
            s.total += value * n as f64;
            s.count += n;
            s.average = s.total / s.count as f64;
        }
    }

    pub fn average(&self, name: &str) -> Option<f64> {
        self.stats.iter().find(|s| s.name == name).map(|s| s.average)
    }

    /// Average of the metric registered in position `index`.
    pub fn average_at(&self, index: usize) -> Option<f64> {
        self.stats.get(index).map(|s| s.average)
    }

    pub fn stats(&self) -> &[MetricStats] {
        &self.stats
    }

    /// `(name, average)` pairs in registration order.
    pub fn result(&self) -> Vec<(String, f64)> {
        self.stats.iter().map(|s| (s.name.clone(), s.average)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averages_are_weighted_by_count() {
        let mut t = MetricTracker::new(["residual", "inf_norm"]);
        t.update("residual", 1.0, 1);
        t.update("residual", 4.0, 2);
        t.update("unknown", 100.0, 1);
        assert_eq!(t.average("residual"), Some(3.0));
        assert_eq!(t.average("inf_norm"), Some(0.0));
        assert_eq!(t.average("unknown"), None);
        assert_eq!(t.average_at(0), Some(3.0));
        assert_eq!(t.average_at(2), None);

        t.reset();
        assert_eq!(t.result(), vec![("residual".into(), 0.0), ("inf_norm".into(), 0.0)]);
    }
}
