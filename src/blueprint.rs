use std::any::type_name;
use std::borrow::Cow;
use std::marker::PhantomData;
use std::sync::Arc;

use petgraph::Graph;

use crate::engine::{
    Dependencies, Diagnostics, Dynamic, GraphId, Handle, Outputs, Task, TaskRef, TypedTask,
};
use crate::error::{GraphError, KilnError};
use crate::{Environment, TaskContext};

/// The blueprint of a build.
///
/// `Blueprint` is used to define the task graph. You add tasks to it and wire
/// them together using the [`Handle`]s returned when adding them. Once
/// configured, convert it into a [`Pipeline`] to execute the build.
///
/// # Example
///
/// ```rust,no_run
/// use kiln::Blueprint;
///
/// let mut blueprint = Blueprint::new();
/// let a = blueprint.task().name("a").run(|_| Ok(1));
/// let b = blueprint.task().name("b").run(|_| Ok(2));
/// blueprint
///     .task()
///     .name("sum")
///     .depends_on((a, b))
///     .run(|_, (a, b)| Ok(a + b));
/// ```
pub struct Blueprint {
    id: GraphId,
    pub(crate) graph: Graph<Arc<dyn Task>, ()>,
    foreign: Vec<String>,
}

impl Blueprint {
    /// Creates a new, empty blueprint.
    pub fn new() -> Self {
        Self {
            id: GraphId::next(),
            graph: Graph::new(),
            foreign: Vec::new(),
        }
    }

    /// Validates the graph and turns it into an executable [`Pipeline`].
    pub fn finish(self) -> Result<Pipeline, GraphError> {
        if let Some(name) = self.foreign.into_iter().next() {
            return Err(GraphError::Foreign(name));
        }

        Ok(Pipeline {
            id: self.id,
            graph: self.graph,
        })
    }

    /// The entry point for declaring a task.
    pub fn task(&mut self) -> TaskDef<'_> {
        TaskDef {
            blueprint: self,
            name: None,
        }
    }

    /// Names of the declared tasks, in declaration order.
    pub fn task_names(&self) -> Vec<String> {
        self.graph
            .node_indices()
            .map(|index| self.graph[index].get_name())
            .collect()
    }

    /// Dependency edges as `(dependency, dependent)` task names, in
    /// declaration order.
    pub fn edges(&self) -> Vec<(String, String)> {
        self.graph
            .raw_edges()
            .iter()
            .map(|edge| {
                (
                    self.graph[edge.source()].get_name(),
                    self.graph[edge.target()].get_name(),
                )
            })
            .collect()
    }

    pub(crate) fn add_task<O, T>(&mut self, task: T) -> Handle<O>
    where
        O: 'static,
        T: TypedTask<Output = O> + 'static,
    {
        let dependencies = task.dependencies();
        let name = task.get_name();
        let index = self.graph.add_node(Arc::new(task));

        for dependency in dependencies {
            // A handle can only point at a node declared earlier in this graph.
            if dependency.graph != self.id || dependency.index >= index {
                self.foreign.push(name.clone());
                continue;
            }
            self.graph.add_edge(dependency.index, index, ());
        }

        Handle::new(self.id, index)
    }
}

impl Default for Blueprint {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Blueprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "graph LR")?;

        for index in self.graph.node_indices() {
            let name = self.graph[index].get_name().replace('"', "\\\"");
            writeln!(f, "    {:?}[\"{}\"]", index.index(), name)?;
        }

        for edge in self.graph.raw_edges() {
            let type_name = self.graph[edge.source()]
                .get_output_type_name()
                .replace('<', "&lt;")
                .replace('>', "&gt;");
            writeln!(
                f,
                "    {:?} -- \"{}\" --> {:?}",
                edge.source().index(),
                type_name,
                edge.target().index()
            )?;
        }

        Ok(())
    }
}

pub struct TaskDef<'a> {
    blueprint: &'a mut Blueprint,
    name: Option<Cow<'static, str>>,
}

impl<'a> TaskDef<'a> {
    pub fn name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn depends_on<D>(self, dependencies: D) -> TaskBinder<'a, D>
    where
        D: Dependencies,
    {
        TaskBinder {
            blueprint: self.blueprint,
            name: self.name,
            dependencies,
        }
    }

    pub fn run<F, R>(self, callback: F) -> Handle<R>
    where
        F: Fn(&TaskContext<'_>) -> anyhow::Result<R> + Send + Sync + 'static,
        R: Send + Sync + 'static,
    {
        self.blueprint.add_task(TaskNode {
            name: self.name.unwrap_or(type_name::<F>().into()),
            dependencies: (),
            callback: move |ctx, _| callback(ctx),
            _phantom: PhantomData,
        })
    }
}

pub struct TaskBinder<'a, D> {
    blueprint: &'a mut Blueprint,
    name: Option<Cow<'static, str>>,
    dependencies: D,
}

impl<'a, D> TaskBinder<'a, D>
where
    D: Dependencies + Send + Sync + 'static,
{
    pub fn name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn run<F, R>(self, callback: F) -> Handle<R>
    where
        F: for<'b, 'c> Fn(&TaskContext<'b>, D::Output<'c>) -> anyhow::Result<R>
            + Send
            + Sync
            + 'static,
        R: Send + Sync + 'static,
    {
        self.blueprint.add_task(TaskNode {
            name: self.name.unwrap_or(type_name::<F>().into()),
            dependencies: self.dependencies,
            callback,
            _phantom: PhantomData,
        })
    }
}

/// An executable task graph, created from a [`Blueprint`].
pub struct Pipeline {
    id: GraphId,
    pub(crate) graph: Graph<Arc<dyn Task>, ()>,
}

impl Pipeline {
    /// Executes every task once, running independent tasks concurrently.
    ///
    /// Stops at the first failing task; tasks already running are allowed to
    /// finish, nothing new is started.
    pub fn run(&self, env: &Environment) -> Result<(Outputs, Diagnostics), KilnError> {
        crate::engine::run_tasks_parallel(&self.graph, self.id, env)
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }
}

pub(crate) struct TaskNode<R, D, F>
where
    R: Send + Sync + 'static,
    D: Dependencies,
    F: for<'a, 'b> Fn(&TaskContext<'a>, D::Output<'b>) -> anyhow::Result<R> + Send + Sync,
{
    pub name: Cow<'static, str>,
    pub dependencies: D,
    pub callback: F,
    pub _phantom: PhantomData<fn() -> R>,
}

impl<R, D, F> TypedTask for TaskNode<R, D, F>
where
    R: Send + Sync + 'static,
    D: Dependencies + Send + Sync,
    F: for<'a, 'b> Fn(&TaskContext<'a>, D::Output<'b>) -> anyhow::Result<R>
        + Send
        + Sync
        + 'static,
{
    type Output = R;

    fn get_name(&self) -> String {
        self.name.to_string()
    }

    fn dependencies(&self) -> Vec<TaskRef> {
        self.dependencies.dependencies()
    }

    fn execute(&self, context: &TaskContext, dependencies: &[Dynamic]) -> anyhow::Result<R> {
        let dependencies = self.dependencies.resolve(&mut dependencies.iter());
        (self.callback)(context, dependencies)
    }
}
