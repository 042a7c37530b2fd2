use camino::Utf8PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KilnError {
    #[error("Error while reading the project configuration:\n{0}")]
    Config(#[from] ConfigError),

    #[error("Invalid task graph:\n{0}")]
    Graph(#[from] GraphError),

    #[error("Task '{task}' failed:\n{error:#}")]
    Task { task: String, error: anyhow::Error },

    #[error("Failed to initialize logging:\n{0}")]
    Logging(anyhow::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Couldn't read {0}.\n{1}")]
    Read(Utf8PathBuf, std::io::Error),

    #[error("Couldn't parse {0}.\n{1}")]
    Parse(Utf8PathBuf, serde_json::Error),
}

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Cycle detected at task '{0}'")]
    Cycle(String),

    #[error("Task '{0}' depends on a task from another graph")]
    Foreign(String),
}

#[derive(Debug, Error)]
pub enum ClearError {
    #[error("Failed to remove {0}.\n{1}")]
    Remove(Utf8PathBuf, std::io::Error),
}

/// Errors reported by the external script bundler.
#[derive(Debug, Error)]
pub enum BundleError {
    #[error("Couldn't spawn bundler '{0}'.\n{1}")]
    Spawn(String, std::io::Error),

    #[error("Bundler '{program}' exited with {status}.\n{stderr}")]
    Failed {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
}

#[derive(Debug, Error)]
pub enum PackageError {
    #[error("Nothing to package, {0} does not exist")]
    MissingApp(Utf8PathBuf),

    #[error("Shell executable {0} does not exist")]
    MissingShell(Utf8PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Couldn't write archive.\n{0}")]
    Zip(#[from] zip::result::ZipError),
}

#[derive(Debug, Error)]
pub enum CopyError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Couldn't compile glob pattern.\n{0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Couldn't run glob.\n{0}")]
    Glob(#[from] glob::GlobError),

    #[error("Couldn't convert path to UTF-8.\n{0}")]
    PathFormat(#[from] camino::FromPathBufError),
}

/// Errors raised by the shell bootstrap.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("The shell is already {0}")]
    State(&'static str),

    #[error("Couldn't build the document URL for {0}")]
    Url(Utf8PathBuf),

    #[error("Window error.\n{0}")]
    Window(anyhow::Error),
}
