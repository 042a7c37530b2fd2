use std::collections::HashMap;
use std::sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError, channel};
use std::time::{Duration, Instant};

use petgraph::Graph;
use petgraph::graph::NodeIndex;
use tracing::Level;
use tracing_indicatif::span_ext::IndicatifSpanExt;

use crate::engine::{Diagnostics, Dynamic, GraphId, Handle, Task, TaskExecution};
use crate::error::{GraphError, KilnError};
use crate::{Environment, TaskContext};

/// Outputs of every task that ran, addressable by their handles.
pub struct Outputs {
    graph: GraphId,
    pub(crate) cache: HashMap<NodeIndex, Dynamic>,
}

impl Outputs {
    /// Returns the output of the task behind `handle`, if it ran. Handles of
    /// other graphs resolve to nothing.
    pub fn get<T: 'static>(&self, handle: Handle<T>) -> Option<&T> {
        if handle.graph != self.graph {
            return None;
        }
        self.cache.get(&handle.index)?.downcast_ref::<T>()
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

type TaskGraph = Graph<std::sync::Arc<dyn Task>, ()>;

/// This function executes the task graph using a thread pool. It performs a
/// parallel topological sort of the graph, where tasks are executed as soon as
/// their dependencies are met.
///
/// The algorithm works as follows:
/// 1. The graph is sorted once up front to reject cycles.
/// 2. A channel is created for receiving results back from the workers.
/// 3. The initial set of tasks (those with no dependencies) is spawned.
/// 4. The main thread enters a loop, waiting for results from the workers.
/// 5. When a task completes, its result is cached. The dependency counts of
///    all tasks that depend on the completed task are decremented.
/// 6. If a task's dependency count reaches zero, it is spawned.
/// 7. The loop continues until all tasks have been completed, or until the
///    first failure, after which nothing new is spawned.
pub(crate) fn run_tasks_parallel(
    graph: &TaskGraph,
    id: GraphId,
    env: &Environment,
) -> Result<(Outputs, Diagnostics), KilnError> {
    if let Err(cycle) = petgraph::algo::toposort(graph, None) {
        let name = graph[cycle.node_id()].get_name();
        return Err(GraphError::Cycle(name).into());
    }

    // Build a map from a dependency to the nodes that depend on it.
    let mut dependents: HashMap<NodeIndex, Vec<NodeIndex>> = HashMap::new();
    for edge in graph.raw_edges() {
        dependents
            .entry(edge.source())
            .or_default()
            .push(edge.target());
    }

    let mut dependency_counts: HashMap<NodeIndex, usize> = graph
        .node_indices()
        .map(|i| (i, graph[i].dependencies().len()))
        .collect();

    let total_tasks = graph.node_count() as u64;
    let mut completed_tasks = 0;
    let mut outputs = Outputs {
        graph: id,
        cache: HashMap::new(),
    };
    let mut diagnostics = Diagnostics::default();

    if total_tasks == 0 {
        return Ok((outputs, diagnostics));
    }

    let root_span = tracing::span!(Level::INFO, "pipeline", mode = %env.mode);
    root_span.pb_set_length(total_tasks);
    root_span.pb_set_style(&crate::utils::STYLE_PIPELINE);
    root_span.pb_set_message("Running tasks...");
    let _enter = root_span.enter();

    // The scheduler loop stays on the calling thread, tasks go to the pool.
    let result = rayon::in_place_scope(|s| -> Result<(), KilnError> {
        let (result_sender, result_receiver) =
            channel::<(NodeIndex, anyhow::Result<Dynamic>, Instant, Duration)>();

        // A helper closure to spawn a task
        let spawn_task = |cache: &HashMap<NodeIndex, Dynamic>, index: NodeIndex| {
            // Dependencies are collected in declaration order, which is the
            // order `Dependencies::resolve` consumes them in.
            let dependencies = graph[index]
                .dependencies()
                .into_iter()
                .filter_map(|dep| cache.get(&dep).cloned())
                .collect::<Vec<_>>();

            let task = graph[index].clone();
            let sender = result_sender.clone();

            s.spawn(move |_| {
                let span = tracing::span!(Level::INFO, "task", name = task.get_name());
                span.pb_set_style(&crate::utils::STYLE_TASK);
                span.pb_set_message(&format!("Running {}", task.get_name()));
                let _enter = span.enter();

                let context = TaskContext {
                    env,
                    span: span.clone(),
                };

                let start = Instant::now();

                let output = match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    task.execute(&context, &dependencies)
                })) {
                    Ok(result) => result,
                    Err(panic) => {
                        let msg = if let Some(s) = panic.downcast_ref::<&str>() {
                            format!("Task panicked: {s}")
                        } else if let Some(s) = panic.downcast_ref::<String>() {
                            format!("Task panicked: {s}")
                        } else {
                            String::from("Task panicked with unknown payload")
                        };

                        Err(anyhow::anyhow!(msg))
                    }
                };

                // The receiver is gone once the run has failed.
                let _ = sender.send((index, output, start, start.elapsed()));
            });
        };

        // Seed initial tasks
        for (&index, &count) in &dependency_counts {
            if count == 0 {
                spawn_task(&outputs.cache, index);
            }
        }

        // Scheduler loop
        while completed_tasks < total_tasks {
            let Some((index, output, start, duration)) = next_result(&result_receiver) else {
                break;
            };

            let output = output.map_err(|error| KilnError::Task {
                task: graph[index].get_name(),
                error,
            })?;

            tracing::debug!(
                task = graph[index].get_name(),
                "finished {}",
                crate::utils::as_overhead_duration(duration)
            );

            outputs.cache.insert(index, output);
            diagnostics.record(
                index,
                graph[index].get_name(),
                TaskExecution { start, duration },
            );
            completed_tasks += 1;
            root_span.pb_inc(1);

            if let Some(next) = dependents.get(&index) {
                for &index in next {
                    if let Some(count) = dependency_counts.get_mut(&index) {
                        *count -= 1;
                        if *count == 0 {
                            spawn_task(&outputs.cache, index);
                        }
                    }
                }
            }
        }

        Ok(())
    });

    result?;
    Ok((outputs, diagnostics))
}

/// Waits for the next finished task.
///
/// A pool worker must not block while waiting, it would starve a pool with a
/// single thread. Instead it runs queued tasks itself in the meantime.
fn next_result<T>(receiver: &Receiver<T>) -> Option<T> {
    if rayon::current_thread_index().is_none() {
        return receiver.recv().ok();
    }

    loop {
        match receiver.try_recv() {
            Ok(result) => return Some(result),
            Err(TryRecvError::Disconnected) => return None,
            Err(TryRecvError::Empty) => {}
        }

        if matches!(rayon::yield_now(), Some(rayon::Yield::Executed)) {
            continue;
        }

        match receiver.recv_timeout(Duration::from_millis(1)) {
            Ok(result) => return Some(result),
            Err(RecvTimeoutError::Disconnected) => return None,
            Err(RecvTimeoutError::Timeout) => {}
        }
    }
}
