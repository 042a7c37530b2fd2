use std::process::{Command, Stdio};
use std::time::Instant;

use camino::Utf8PathBuf;

use crate::Environment;
use crate::error::BundleError;

/// The bundled application script.
#[derive(Debug, Clone)]
pub struct Bundle {
    /// Path of the bundle inside the application tree.
    pub path: Utf8PathBuf,
    /// Diagnostics printed by the bundler.
    pub log: String,
}

/// Arguments passed to the bundler, esbuild flavored.
///
/// `process.env.NODE_ENV` is replaced by the quoted flavor so the bundler can
/// drop debug-only branches. Debug builds carry inline source maps, release
/// builds are minified.
pub fn bundler_args(env: &Environment) -> Vec<String> {
    let project = &env.project;

    let mut args = project.bundler.args.clone();
    args.push(project.entry_path().into_string());
    args.push("--bundle".into());
    args.push(format!("--outfile={}", project.bundle_path()));
    args.push(format!("--define:process.env.NODE_ENV={}", env.mode.define()));

    if env.mode.is_release() {
        args.push("--minify".into());
    } else {
        args.push("--sourcemap=inline".into());
    }

    args
}

/// Runs the external bundler.
///
/// **Note:** the bundler binary (by default `esbuild`) has to be available in
/// the system PATH.
pub fn bundle_script(env: &Environment) -> Result<Bundle, BundleError> {
    let s = Instant::now();
    let program = &env.project.bundler.program;
    let args = bundler_args(env);

    tracing::debug!("{program} {}", args.join(" "));

    let output = Command::new(program)
        .args(&args)
        .current_dir(&env.project.root)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| BundleError::Spawn(program.clone(), e))?;

    let log = String::from_utf8_lossy(&output.stderr).trim().to_string();

    if !output.status.success() {
        return Err(BundleError::Failed {
            program: program.clone(),
            status: output.status,
            stderr: log,
        });
    }

    if !log.is_empty() {
        tracing::info!("[{program}] {log}");
    }

    let path = env.project.bundle_path();
    tracing::info!("bundled {path} {}", crate::utils::as_overhead(s));

    Ok(Bundle { path, log })
}
