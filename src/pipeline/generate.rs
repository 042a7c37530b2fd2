//! Generated config files.
//!
//! A config source is anything able to produce a JSON object given the build
//! flavor. The object is written into the application tree, where the shell
//! picks it up at startup. Generation never fails the build: a source that
//! can't be evaluated or written only produces a warning, and the shell falls
//! back to its defaults.

use std::fs;
use std::process::{Command, Stdio};
use std::sync::Arc;

use anyhow::{Context, bail};
use camino::{Utf8Path, Utf8PathBuf};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use serde::Serialize;
use serde_json::Value;

use crate::config::{ConfigEntry, ProjectConfig, SourceSpec};
use crate::{Environment, Mode};

/// The mapping produced by a generator. Key order is preserved.
pub type ConfigMap = serde_json::Map<String, Value>;

/// Something that produces a config mapping for a build flavor.
pub trait Generator: Send + Sync {
    fn generate(&self, release: bool) -> anyhow::Result<ConfigMap>;
}

impl<F> Generator for F
where
    F: Fn(bool) -> anyhow::Result<ConfigMap> + Send + Sync,
{
    fn generate(&self, release: bool) -> anyhow::Result<ConfigMap> {
        self(release)
    }
}

/// Reads a JSON object from disk.
///
/// The optional `$debug` and `$release` keys hold objects merged over the
/// remaining keys for the matching flavor; both are stripped from the result.
pub struct FileGenerator {
    path: Utf8PathBuf,
}

impl FileGenerator {
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Generator for FileGenerator {
    fn generate(&self, release: bool) -> anyhow::Result<ConfigMap> {
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("couldn't read {}", self.path))?;
        let value = serde_json::from_str::<Value>(&text)
            .with_context(|| format!("couldn't parse {}", self.path))?;

        let Value::Object(mut map) = value else {
            bail!("{} does not contain a JSON object", self.path);
        };

        let debug = map.remove("$debug");
        let release_overrides = map.remove("$release");
        let overrides = if release { release_overrides } else { debug };

        match overrides {
            Some(Value::Object(overrides)) => map.extend(overrides),
            Some(_) => bail!("{}: flavor overrides must be objects", self.path),
            None => {}
        }

        Ok(map)
    }
}

/// Runs a program that prints a JSON object on stdout. The flavor (`debug` or
/// `release`) is appended as the last argument.
pub struct CommandGenerator {
    program: String,
    args: Vec<String>,
    cwd: Utf8PathBuf,
}

impl CommandGenerator {
    pub fn new(program: impl Into<String>, args: Vec<String>, cwd: impl Into<Utf8PathBuf>) -> Self {
        Self {
            program: program.into(),
            args,
            cwd: cwd.into(),
        }
    }
}

impl Generator for CommandGenerator {
    fn generate(&self, release: bool) -> anyhow::Result<ConfigMap> {
        let flavor = if release { "release" } else { "debug" };

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(flavor)
            .current_dir(&self.cwd)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("couldn't run {}", self.program))?;

        if !output.status.success() {
            bail!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        serde_json::from_slice::<ConfigMap>(&output.stdout)
            .with_context(|| format!("{} did not print a JSON object", self.program))
    }
}

/// A generator paired with the name of the file it produces.
#[derive(Clone)]
pub struct ConfigSource {
    pub output: String,
    generator: Arc<dyn Generator>,
}

impl ConfigSource {
    pub fn new(output: impl Into<String>, generator: impl Generator + 'static) -> Self {
        Self {
            output: output.into(),
            generator: Arc::new(generator),
        }
    }

    /// Builds the source declared in the project configuration.
    pub fn from_entry(entry: &ConfigEntry, project: &ProjectConfig) -> Self {
        match &entry.source {
            SourceSpec::File { path } => {
                Self::new(&entry.output, FileGenerator::new(project.resolve(path)))
            }
            SourceSpec::Command { program, args } => Self::new(
                &entry.output,
                CommandGenerator::new(program, args.clone(), &project.root),
            ),
        }
    }

    pub fn from_project(project: &ProjectConfig) -> Vec<Self> {
        project
            .configs
            .iter()
            .map(|entry| Self::from_entry(entry, project))
            .collect()
    }
}

/// Serializes a config: 4-space pretty printing in debug, compact in release.
pub fn serialize(map: &ConfigMap, mode: Mode) -> serde_json::Result<Vec<u8>> {
    match mode {
        Mode::Release => serde_json::to_vec(map),
        Mode::Debug => {
            let mut buffer = Vec::new();
            let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
            let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
            map.serialize(&mut serializer)?;
            Ok(buffer)
        }
    }
}

/// Evaluates every source and writes the results into the application tree.
///
/// Returns the paths that were written. Failures are logged and skipped.
pub fn generate_configs(env: &Environment, sources: &[ConfigSource]) -> Vec<Utf8PathBuf> {
    let dir = env.project.app_out();

    sources
        .par_iter()
        .filter_map(|source| generate_one(env.mode, &dir, source))
        .collect()
}

fn generate_one(mode: Mode, dir: &Utf8Path, source: &ConfigSource) -> Option<Utf8PathBuf> {
    let map = match source.generator.generate(mode.is_release()) {
        Ok(map) => map,
        Err(e) => {
            tracing::warn!("config {}: {e:#}", source.output);
            return None;
        }
    };

    let data = match serialize(&map, mode) {
        Ok(data) => data,
        Err(e) => {
            tracing::warn!("config {}: couldn't serialize: {e}", source.output);
            return None;
        }
    };

    // The write below reports the real problem if the directory is missing.
    if let Err(e) = fs::create_dir_all(dir) {
        tracing::warn!("config {}: couldn't create {dir}: {e}", source.output);
    }

    let path = dir.join(&source.output);
    match fs::write(&path, data) {
        Ok(()) => {
            tracing::info!("wrote {path}");
            Some(path)
        }
        Err(e) => {
            tracing::warn!("config {}: couldn't write {path}: {e}", source.output);
            None
        }
    }
}
