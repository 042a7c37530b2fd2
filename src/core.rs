use std::any::Any;
use std::fmt::Display;
use std::sync::Arc;

use crate::config::ProjectConfig;

/// A type-erased, thread-safe container.
pub(crate) type Dynamic = Arc<dyn Any + Send + Sync>;

/// A 32-byte BLAKE3 hash used to fingerprint build artifacts.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Hash32([u8; 32]);

impl<T> From<T> for Hash32
where
    T: Into<[u8; 32]>,
{
    fn from(value: T) -> Self {
        Hash32(value.into())
    }
}

impl Hash32 {
    pub fn hash(buffer: impl AsRef<[u8]>) -> Self {
        blake3::Hasher::new()
            .update(buffer.as_ref())
            .finalize()
            .into()
    }

    pub fn hash_file(path: impl AsRef<std::path::Path>) -> std::io::Result<Self> {
        Ok(blake3::Hasher::new()
            .update_mmap_rayon(path)?
            .finalize()
            .into())
    }

    pub fn to_hex(self) -> String {
        const HEX: &[u8; 16] = b"0123456789abcdef";
        let mut acc = String::with_capacity(64);

        for byte in self.0 {
            acc.push(HEX[(byte >> 4) as usize] as char);
            acc.push(HEX[(byte & 0xF) as usize] as char);
        }

        acc
    }
}

impl std::fmt::Debug for Hash32 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Hash32({})", self.to_hex())
    }
}

impl Display for Hash32 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// The flavor of the build.
///
/// `Release` trims debug aids: the bundle is minified instead of carrying
/// inline source maps, generated JSON is compact instead of pretty-printed and
/// the packaged bundle is archived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Development build.
    #[default]
    Debug,
    /// Production build.
    Release,
}

impl Mode {
    pub fn is_release(self) -> bool {
        matches!(self, Mode::Release)
    }

    /// Flavor name understood by the application code.
    pub fn flavor(self) -> &'static str {
        match self {
            Mode::Debug => "debug",
            Mode::Release => "production",
        }
    }

    /// The flavor as a quoted string literal, the form expected by the bundler
    /// when it substitutes `process.env.NODE_ENV`.
    pub fn define(self) -> String {
        format!("\"{}\"", self.flavor())
    }
}

impl Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Debug => f.write_str("debug"),
            Mode::Release => f.write_str("release"),
        }
    }
}

/// Immutable build settings shared by every task of a run.
#[derive(Debug, Clone)]
pub struct Environment {
    /// The build flavor.
    pub mode: Mode,
    /// Project layout and tool settings.
    pub project: Arc<ProjectConfig>,
}

impl Environment {
    pub fn new(mode: Mode, project: ProjectConfig) -> Self {
        Self {
            mode,
            project: Arc::new(project),
        }
    }
}

/// The context passed to every task execution.
pub struct TaskContext<'a> {
    /// Access to the build settings.
    pub env: &'a Environment,
    /// Tracing span assigned to this task.
    pub(crate) span: tracing::Span,
}

impl TaskContext<'_> {
    /// Updates the progress message shown next to the task spinner.
    pub fn progress(&self, msg: impl Into<String>) {
        use tracing_indicatif::span_ext::IndicatifSpanExt;
        self.span.pb_set_message(&msg.into());
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_mode_flavor() {
        assert_eq!(Mode::Debug.flavor(), "debug");
        assert_eq!(Mode::Release.flavor(), "production");
        assert_eq!(Mode::Release.define(), r#""production""#);
        assert!(!Mode::default().is_release());
    }

    #[test]
    fn test_hash_hex() {
        let hash = Hash32::hash(b"kiln");
        let hex = hash.to_hex();
        assert_eq!(hex.len(), 64);
        assert_eq!(hex, blake3::hash(b"kiln").to_hex().as_str());
    }
}
