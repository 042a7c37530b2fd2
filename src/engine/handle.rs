use std::marker::PhantomData;
use std::slice::Iter;
use std::sync::atomic::{AtomicU64, Ordering};

use petgraph::graph::NodeIndex;

use crate::engine::{Dependencies, Dynamic};

/// Identity of the blueprint a task was declared in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct GraphId(u64);

impl GraphId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        GraphId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// An untyped reference to a task, as seen by the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskRef {
    pub(crate) graph: GraphId,
    pub(crate) index: NodeIndex,
}

/// A type-safe reference to a task in the build graph.
///
/// A `Handle<T>` is a lightweight, copyable token that represents a future
/// result of type `T`. It is used to define dependencies between tasks. When
/// one task depends on another, it holds a handle to that dependency. The
/// runner ensures that the dependency is executed before the task that
/// depends on it.
///
/// # Diamond Dependencies
///
/// If Task C and Task B both depend on Task A, and Task D depends on both B
/// and C, Task A is executed *once* and its result is shared.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Handle<T> {
    pub(crate) graph: GraphId,
    pub(crate) index: NodeIndex,
    _phantom: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    pub(crate) fn new(graph: GraphId, index: NodeIndex) -> Self {
        Self {
            graph,
            index,
            _phantom: PhantomData,
        }
    }

    /// Returns the underlying `NodeIndex` of the task in the graph.
    pub fn index(&self) -> NodeIndex {
        self.index
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> Dependencies for Handle<T>
where
    T: Send + Sync + 'static,
{
    type Output<'a> = &'a T;

    fn dependencies(&self) -> Vec<TaskRef> {
        vec![TaskRef {
            graph: self.graph,
            index: self.index,
        }]
    }

    fn resolve<'a>(&self, outputs: &mut Iter<'a, Dynamic>) -> Self::Output<'a> {
        outputs
            .next()
            .and_then(|output| output.downcast_ref::<T>())
            .unwrap_or_else(|| {
                panic!(
                    "Expected {} but got something else",
                    std::any::type_name::<T>()
                )
            })
    }
}
