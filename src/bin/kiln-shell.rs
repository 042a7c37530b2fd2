#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use anyhow::Context;
use camino::Utf8PathBuf;
use kiln::shell::{Bootstrap, StartupArgs};

/// The application tree sits next to the executable once packaged, and in the
/// build output during development.
fn locate_app_dir() -> anyhow::Result<Utf8PathBuf> {
    let exe = std::env::current_exe().context("couldn't locate the shell executable")?;
    let packaged = exe.parent().map(|dir| dir.join("app"));

    let dir = match packaged {
        Some(dir) if dir.join(kiln::shell::DOCUMENT).is_file() => dir,
        _ => std::path::absolute("dist/app")?,
    };

    Ok(Utf8PathBuf::try_from(dir)?)
}

fn main() -> anyhow::Result<()> {
    kiln::init_logging()?;

    let args = StartupArgs::parse(std::env::args());
    let app_dir = locate_app_dir()?;
    tracing::debug!("application directory {app_dir}");

    kiln::shell::desktop::run(Bootstrap::new(app_dir, args), tauri::generate_context!())
}
