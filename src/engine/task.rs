use std::sync::Arc;

use petgraph::graph::NodeIndex;

use crate::TaskContext;
use crate::engine::{Dynamic, TaskRef};

pub(crate) trait TypedTask: Send + Sync {
    /// The concrete output type of this task.
    type Output: Send + Sync + 'static;

    fn get_name(&self) -> String;

    fn dependencies(&self) -> Vec<TaskRef>;

    fn execute(
        &self,
        context: &TaskContext,
        dependencies: &[Dynamic],
    ) -> anyhow::Result<Self::Output>;
}

/// The type-erased foundation that allows the graph to hold tasks with
/// different output types.
pub(crate) trait Task: Send + Sync {
    fn get_name(&self) -> String;

    fn get_output_type_name(&self) -> &'static str;

    fn dependencies(&self) -> Vec<NodeIndex>;

    fn execute(&self, context: &TaskContext, dependencies: &[Dynamic]) -> anyhow::Result<Dynamic>;
}

// A blanket implementation to automatically bridge the two. This is where the
// type erasure actually happens.
impl<T> Task for T
where
    T: TypedTask + 'static,
{
    fn get_name(&self) -> String {
        T::get_name(self)
    }

    fn get_output_type_name(&self) -> &'static str {
        std::any::type_name::<T::Output>()
    }

    fn dependencies(&self) -> Vec<NodeIndex> {
        T::dependencies(self)
            .into_iter()
            .map(|dependency| dependency.index)
            .collect()
    }

    fn execute(&self, context: &TaskContext, dependencies: &[Dynamic]) -> anyhow::Result<Dynamic> {
        let output = T::execute(self, context, dependencies)?;
        Ok(Arc::new(output))
    }
}
