//! Project configuration.
//!
//! Every setting has a default matching the conventional project layout, so a
//! project without a `kiln.json` file builds out of the box:
//!
//! ```text
//! src/app/index.js     -> dist/app/app.js
//! src/app/**/*.html    -> dist/app/**/*.html
//! src/shell/**/*.json  -> dist/app/**/*.json
//! mainConfig.json      -> dist/app/mainConfig.json
//! renderConfig.json    -> dist/app/renderConfig.json
//! dist/app             -> dist/package/electron-app-win32-x64
//! ```

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;

use crate::error::ConfigError;

/// Name of the optional project file read from the project root.
pub const PROJECT_FILE: &str = "kiln.json";

/// Name of the generated config read by the shell to configure itself.
pub const MAIN_CONFIG: &str = "mainConfig.json";

/// Name of the generated config forwarded to the page as URL parameters.
pub const RENDER_CONFIG: &str = "renderConfig.json";

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    /// Project root; every relative path below is resolved against it.
    #[serde(skip)]
    pub root: Utf8PathBuf,
    /// Application name used for the packaged bundle.
    pub name: String,
    /// Output directory.
    pub dist: Utf8PathBuf,
    /// Application tree inside `dist`.
    pub app_dir: Utf8PathBuf,
    /// Packaging output inside `dist`.
    pub package_dir: Utf8PathBuf,
    /// Application sources.
    pub src_app: Utf8PathBuf,
    /// Shell sources.
    pub src_shell: Utf8PathBuf,
    /// Script entry point, relative to `src_app`.
    pub entry: Utf8PathBuf,
    /// Bundled script, relative to the application tree.
    pub output: Utf8PathBuf,
    /// Extensions of the static application files copied verbatim.
    pub app_assets: Vec<String>,
    /// Extensions of the static shell files copied verbatim.
    pub shell_assets: Vec<String>,
    pub bundler: BundlerConfig,
    pub target: Target,
    /// Shell executable placed next to the application tree when packaging.
    pub shell_binary: Option<Utf8PathBuf>,
    /// Generated config files.
    pub configs: Vec<ConfigEntry>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            root: Utf8PathBuf::from("."),
            name: "electron-app".into(),
            dist: "dist".into(),
            app_dir: "app".into(),
            package_dir: "package".into(),
            src_app: "src/app".into(),
            src_shell: "src/shell".into(),
            entry: "index.js".into(),
            output: "app.js".into(),
            app_assets: vec!["html".into()],
            shell_assets: vec!["js".into(), "json".into()],
            bundler: BundlerConfig::default(),
            target: Target::default(),
            shell_binary: None,
            configs: vec![
                ConfigEntry::file(MAIN_CONFIG, "mainConfig.json"),
                ConfigEntry::file(RENDER_CONFIG, "renderConfig.json"),
            ],
        }
    }
}

impl ProjectConfig {
    /// Reads `kiln.json` from `root`, falling back to the defaults when the
    /// file does not exist.
    pub fn load(root: impl AsRef<Utf8Path>) -> Result<Self, ConfigError> {
        let root = root.as_ref();
        let path = root.join(PROJECT_FILE);

        let mut config = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str::<ProjectConfig>(&text)
                .map_err(|e| ConfigError::Parse(path.clone(), e))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => ProjectConfig::default(),
            Err(e) => return Err(ConfigError::Read(path, e)),
        };

        config.root = root.to_path_buf();
        Ok(config)
    }

    /// Defaults rooted at `root`.
    pub fn at(root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    pub fn resolve(&self, path: impl AsRef<Utf8Path>) -> Utf8PathBuf {
        self.root.join(path)
    }

    pub fn dist_dir(&self) -> Utf8PathBuf {
        self.resolve(&self.dist)
    }

    pub fn app_out(&self) -> Utf8PathBuf {
        self.dist_dir().join(&self.app_dir)
    }

    pub fn package_out(&self) -> Utf8PathBuf {
        self.dist_dir().join(&self.package_dir)
    }

    pub fn entry_path(&self) -> Utf8PathBuf {
        self.resolve(&self.src_app).join(&self.entry)
    }

    pub fn bundle_path(&self) -> Utf8PathBuf {
        self.app_out().join(&self.output)
    }

    /// Name of the packaged bundle, e.g. `electron-app-win32-x64`.
    pub fn bundle_name(&self) -> String {
        format!("{}-{}-{}", self.name, self.target.platform, self.target.arch)
    }
}

/// External script bundler invocation.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BundlerConfig {
    pub program: String,
    /// Extra arguments placed before the generated ones.
    pub args: Vec<String>,
}

impl Default for BundlerConfig {
    fn default() -> Self {
        Self {
            program: "esbuild".into(),
            args: Vec::new(),
        }
    }
}

/// Packaging target. Fixed per project, there is no cross-target matrix.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Target {
    pub platform: String,
    pub arch: String,
}

impl Default for Target {
    fn default() -> Self {
        Self {
            platform: "win32".into(),
            arch: "x64".into(),
        }
    }
}

/// One generated config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigEntry {
    /// File name written into the application tree.
    pub output: String,
    pub source: SourceSpec,
}

impl ConfigEntry {
    pub fn file(output: impl Into<String>, path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            output: output.into(),
            source: SourceSpec::File { path: path.into() },
        }
    }
}

/// Where the mapping of a generated config comes from.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceSpec {
    /// JSON object with optional `$debug` and `$release` overrides.
    File { path: Utf8PathBuf },
    /// Program printing a JSON object, called with `debug` or `release`
    /// appended to its arguments.
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
    },
}
