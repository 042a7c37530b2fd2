use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::time::{Duration, Instant};

use petgraph::graph::NodeIndex;

#[derive(Debug, Clone)]
pub struct TaskExecution {
    pub start: Instant,
    pub duration: Duration,
}

/// Build diagnostics and performance metrics.
///
/// Returned by [`Pipeline::run`](crate::Pipeline::run) alongside the outputs.
#[derive(Debug, Default)]
pub struct Diagnostics {
    /// A map of task node indices to their execution metrics.
    pub execution_times: HashMap<NodeIndex, TaskExecution>,
    names: HashMap<NodeIndex, String>,
}

impl Diagnostics {
    pub(crate) fn record(&mut self, index: NodeIndex, name: String, exec: TaskExecution) {
        self.names.insert(index, name);
        self.execution_times.insert(index, exec);
    }

    /// Wall-clock time between the first task starting and the last one
    /// finishing.
    pub fn wall_time(&self) -> Duration {
        let start = self.execution_times.values().map(|t| t.start).min();
        let end = self
            .execution_times
            .values()
            .map(|t| t.start + t.duration)
            .max();

        match (start, end) {
            (Some(start), Some(end)) => end.duration_since(start),
            _ => Duration::ZERO,
        }
    }

    /// Task names in the order they started.
    pub fn started_order(&self) -> Vec<&str> {
        let mut tasks: Vec<_> = self.execution_times.iter().collect();
        tasks.sort_by_key(|(_, t)| t.start);
        tasks
            .into_iter()
            .filter_map(|(index, _)| self.names.get(index).map(String::as_str))
            .collect()
    }
}

impl Display for Diagnostics {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut tasks: Vec<_> = self.execution_times.iter().collect();
        tasks.sort_by_key(|(_, t)| std::cmp::Reverse(t.duration));

        let width = self.names.values().map(String::len).max().unwrap_or(0);

        for (index, exec) in tasks {
            let name = self.names.get(index).map(String::as_str).unwrap_or("?");
            writeln!(f, "{name:<width$}  {:>10.2?}", exec.duration)?;
        }

        write!(f, "{:<width$}  {:>10.2?}", "total", self.wall_time())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_summary_sorted_by_duration() {
        let start = Instant::now();
        let mut diagnostics = Diagnostics::default();
        diagnostics.record(
            NodeIndex::new(0),
            "fast".into(),
            TaskExecution {
                start,
                duration: Duration::from_millis(1),
            },
        );
        diagnostics.record(
            NodeIndex::new(1),
            "slow".into(),
            TaskExecution {
                start: start + Duration::from_millis(1),
                duration: Duration::from_millis(10),
            },
        );

        let text = diagnostics.to_string();
        let slow = text.find("slow").unwrap();
        let fast = text.find("fast").unwrap();
        assert!(slow < fast);
        assert_eq!(diagnostics.wall_time(), Duration::from_millis(11));
        assert_eq!(diagnostics.started_order(), vec!["fast", "slow"]);
    }
}
