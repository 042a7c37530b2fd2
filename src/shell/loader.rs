use std::fs;
use std::io::ErrorKind;

use camino::{Utf8Path, Utf8PathBuf};
use serde_json::Value;

/// Outcome of loading a generated config file.
#[derive(Debug, Clone, PartialEq)]
pub enum Loaded {
    Present(Value),
    /// The file could not be used, with the reason why.
    Absent(String),
}

impl Loaded {
    /// Unwraps the value, or logs the reason and falls back to an empty
    /// object.
    pub fn or_empty(self, what: &str) -> Value {
        match self {
            Loaded::Present(value) => value,
            Loaded::Absent(reason) => {
                tracing::warn!("{what}: {reason}");
                Value::Object(Default::default())
            }
        }
    }
}

/// Source of the configs read by the shell at startup.
pub trait ConfigLoader {
    fn load(&self, name: &str) -> Loaded;
}

impl<F> ConfigLoader for F
where
    F: Fn(&str) -> Loaded,
{
    fn load(&self, name: &str) -> Loaded {
        self(name)
    }
}

/// Reads JSON files from the application directory.
#[derive(Debug, Clone)]
pub struct DirLoader {
    dir: Utf8PathBuf,
}

impl DirLoader {
    pub fn new(dir: impl Into<Utf8PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }
}

impl ConfigLoader for DirLoader {
    fn load(&self, name: &str) -> Loaded {
        let path = self.dir.join(name);

        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Loaded::Absent(format!("{path} does not exist"));
            }
            Err(e) => return Loaded::Absent(format!("couldn't read {path}: {e}")),
        };

        match serde_json::from_str(&text) {
            Ok(value) => Loaded::Present(value),
            Err(e) => Loaded::Absent(format!("couldn't parse {path}: {e}")),
        }
    }
}
