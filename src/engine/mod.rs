//! The generic task graph.
//!
//! A task is a unit of work producing a typed output. Tasks form a Directed
//! Acyclic Graph where every edge is an explicitly declared dependency.
//!
//! ## Phantom handles
//!
//! The graph itself is type-erased and stores outputs as
//! `Arc<dyn Any + Send + Sync>`. A [`Handle<T>`] carries no data, only the
//! node index and the output type `T` in `PhantomData`, so the compiler checks
//! that a task receives exactly what its dependency produces. The
//! [`Dependencies`] trait performs the `downcast_ref` when the task runs.
//!
//! Handles are only ever returned by adding a task to a blueprint, which means
//! a task can only depend on tasks declared before it and the graph cannot
//! contain cycles.

mod diagnostics;
mod handle;
mod runner;
mod task;

use std::slice::Iter;

pub use crate::engine::diagnostics::{Diagnostics, TaskExecution};
pub use crate::engine::handle::{Handle, TaskRef};
pub(crate) use crate::engine::handle::GraphId;
pub use crate::engine::runner::Outputs;

pub(crate) use crate::core::Dynamic;
pub(crate) use crate::engine::runner::run_tasks_parallel;
pub(crate) use crate::engine::task::{Task, TypedTask};

/// A collection of handles usable as the dependencies of a task.
///
/// Implemented for a single [`Handle<T>`], `Option` and `Vec` of dependencies,
/// and tuples of dependencies. Resolving consumes the matching outputs in
/// declaration order.
pub trait Dependencies {
    /// The resulting type when all dependencies are resolved.
    /// For a tuple of [`Handle<T>`]s, this will be a tuple of `&'a T`s.
    type Output<'a>;

    /// Returns a reference to each dependency in the collection.
    fn dependencies(&self) -> Vec<TaskRef>;

    /// Takes type-erased dependency outputs and resolves them into the
    /// concrete `Output` type.
    ///
    /// # Panics
    /// Panics if an output cannot be downcast to its expected type, which
    /// would mean a handle was used with a graph it does not belong to.
    fn resolve<'a>(&self, outputs: &mut Iter<'a, Dynamic>) -> Self::Output<'a>;
}

impl Dependencies for () {
    type Output<'a> = ();

    fn dependencies(&self) -> Vec<TaskRef> {
        vec![]
    }

    fn resolve<'a>(&self, _: &mut Iter<'a, Dynamic>) -> Self::Output<'a> {}
}

impl<D> Dependencies for Option<D>
where
    D: Dependencies,
{
    type Output<'a> = Option<D::Output<'a>>;

    fn dependencies(&self) -> Vec<TaskRef> {
        self.as_ref().map(D::dependencies).unwrap_or_default()
    }

    fn resolve<'a>(&self, outputs: &mut Iter<'a, Dynamic>) -> Self::Output<'a> {
        self.as_ref().map(|inner| inner.resolve(outputs))
    }
}

impl<D> Dependencies for Vec<D>
where
    D: Dependencies,
{
    type Output<'a> = Vec<D::Output<'a>>;

    fn dependencies(&self) -> Vec<TaskRef> {
        self.iter().flat_map(D::dependencies).collect()
    }

    fn resolve<'a>(&self, outputs: &mut Iter<'a, Dynamic>) -> Self::Output<'a> {
        self.iter().map(|inner| inner.resolve(outputs)).collect()
    }
}

macro_rules! impl_deps {
    ($($D:ident),*) => {
        #[allow(non_snake_case)]
        impl<$($D),*> Dependencies for ($($D,)*)
        where
            $($D: Dependencies),* {
            type Output<'a> = ($($D::Output<'a>,)*);

            fn dependencies(&self) -> Vec<TaskRef> {
                let ($($D,)*) = self;
                let mut acc = Vec::new();
                $(acc.extend($D.dependencies());)*
                acc
            }

            fn resolve<'a>(&self, outputs: &mut Iter<'a, Dynamic>) -> Self::Output<'a> {
                let ($($D,)*) = self;
                ($($D.resolve(outputs),)*)
            }
        }
    };
}

impl_deps!(A);
impl_deps!(A, B);
impl_deps!(A, B, C);
impl_deps!(A, B, C, D);
impl_deps!(A, B, C, D, E);
impl_deps!(A, B, C, D, E, F);
impl_deps!(A, B, C, D, E, F, G);
impl_deps!(A, B, C, D, E, F, G, H);
