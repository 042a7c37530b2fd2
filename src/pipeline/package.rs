//! Packaging of the built application tree.
//!
//! The bundle layout is:
//!
//! ```text
//! dist/package/<name>-<platform>-<arch>/
//!     <shell executable>
//!     app/...
//! ```
//!
//! Release builds archive that directory into
//! `dist/package/<name>-<platform>-<arch>.zip` and remove the staging copy.

use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind};
use std::time::Instant;

use camino::{Utf8Path, Utf8PathBuf};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::core::Hash32;
use crate::error::PackageError;
use crate::pipeline::assets::copy_rec;
use crate::{Environment, Mode};

/// The result of packaging.
#[derive(Debug, Clone)]
pub struct Artifact {
    /// The bundle directory, or the archive in release mode.
    pub path: Utf8PathBuf,
    pub archived: bool,
    /// BLAKE3 digest of the archive.
    pub digest: Option<Hash32>,
}

pub fn package(env: &Environment) -> Result<Artifact, PackageError> {
    let s = Instant::now();
    let project = &env.project;

    let app = project.app_out();
    if !app.is_dir() {
        return Err(PackageError::MissingApp(app));
    }

    let shell = match &project.shell_binary {
        Some(path) => {
            let path = project.resolve(path);
            let file_name = path.file_name().filter(|_| path.is_file()).map(str::to_owned);
            let Some(file_name) = file_name else {
                return Err(PackageError::MissingShell(path));
            };
            Some((path, file_name))
        }
        None => None,
    };

    let out = project.package_out();
    let name = project.bundle_name();
    let staging = out.join(&name);
    let archive = out.join(format!("{name}.zip"));

    remove_if_exists(&staging)?;
    remove_if_exists(&archive)?;

    let count = copy_rec(&app, &staging.join("app"))?;

    if let Some((shell, file_name)) = shell {
        fs::copy(&shell, staging.join(file_name))?;
    } else {
        tracing::info!("no shell executable configured, packaging the application tree only");
    }

    let artifact = match env.mode {
        Mode::Debug => Artifact {
            path: staging,
            archived: false,
            digest: None,
        },
        Mode::Release => {
            write_archive(&staging, &name, &archive)?;
            fs::remove_dir_all(&staging)?;

            let digest = Hash32::hash_file(&archive)?;
            tracing::info!("archive digest blake3:{digest}");

            Artifact {
                path: archive,
                archived: true,
                digest: Some(digest),
            }
        }
    };

    tracing::info!(
        "packaged {count} files into {} {}",
        artifact.path,
        crate::utils::as_overhead(s)
    );

    Ok(artifact)
}

fn remove_if_exists(path: &Utf8Path) -> std::io::Result<()> {
    let result = if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };

    match result {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Writes `dir` into a zip archive, every entry nested under `prefix/`.
fn write_archive(dir: &Utf8Path, prefix: &str, archive: &Utf8Path) -> Result<(), PackageError> {
    let file = File::create(archive)?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    zip.add_directory(format!("{prefix}/"), options)?;
    add_dir(&mut zip, dir, prefix, options)?;
    zip.finish()?;

    Ok(())
}

fn add_dir<W>(
    zip: &mut ZipWriter<W>,
    dir: &Utf8Path,
    prefix: &str,
    options: SimpleFileOptions,
) -> Result<(), PackageError>
where
    W: std::io::Write + std::io::Seek,
{
    let mut entries = dir.read_dir_utf8()?.collect::<Result<Vec<_>, _>>()?;
    entries.sort_by(|a, b| a.file_name().cmp(b.file_name()));

    for entry in entries {
        // Zip entry names always use forward slashes.
        let name = format!("{prefix}/{}", entry.file_name());

        if entry.file_type()?.is_dir() {
            zip.add_directory(format!("{name}/"), options)?;
            add_dir(zip, entry.path(), &name, options)?;
        } else {
            zip.start_file(name, options.unix_permissions(permissions(entry.path())?))?;
            std::io::copy(&mut File::open(entry.path())?, zip)?;
        }
    }

    Ok(())
}

#[cfg(unix)]
fn permissions(path: &Utf8Path) -> std::io::Result<u32> {
    use std::os::unix::fs::PermissionsExt;
    Ok(fs::metadata(path)?.permissions().mode() & 0o777)
}

#[cfg(not(unix))]
fn permissions(_: &Utf8Path) -> std::io::Result<u32> {
    Ok(0o644)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ProjectConfig;

    fn project(root: &Utf8Path) -> ProjectConfig {
        let project = ProjectConfig::at(root);
        fs::create_dir_all(project.app_out().join("views")).unwrap();
        fs::write(project.app_out().join("index.html"), "<html>").unwrap();
        fs::write(project.app_out().join("views/a.html"), "<a>").unwrap();
        project
    }

    #[test]
    fn test_debug_is_unarchived() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let env = Environment::new(Mode::Debug, project(root));

        let artifact = package(&env).unwrap();
        let bundle = root.join("dist/package/electron-app-win32-x64");

        assert!(!artifact.archived);
        assert_eq!(artifact.path, bundle);
        assert!(bundle.join("app/views/a.html").is_file());
        assert!(!root.join("dist/package/electron-app-win32-x64.zip").exists());
    }

    #[test]
    fn test_release_is_archived() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let mut project = project(root);
        fs::write(root.join("shell.bin"), "binary").unwrap();
        project.shell_binary = Some("shell.bin".into());
        let env = Environment::new(Mode::Release, project);

        let artifact = package(&env).unwrap();
        let archive = root.join("dist/package/electron-app-win32-x64.zip");

        assert!(artifact.archived);
        assert_eq!(artifact.path, archive);
        assert!(archive.is_file());
        assert!(!root.join("dist/package/electron-app-win32-x64").exists());
        assert_eq!(artifact.digest, Some(Hash32::hash_file(&archive).unwrap()));

        let mut zip = zip::ZipArchive::new(File::open(&archive).unwrap()).unwrap();
        let mut names: Vec<_> = zip.file_names().map(str::to_string).collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "electron-app-win32-x64/",
                "electron-app-win32-x64/app/",
                "electron-app-win32-x64/app/index.html",
                "electron-app-win32-x64/app/views/",
                "electron-app-win32-x64/app/views/a.html",
                "electron-app-win32-x64/shell.bin",
            ]
        );

        let mut text = String::new();
        std::io::Read::read_to_string(
            &mut zip.by_name("electron-app-win32-x64/app/index.html").unwrap(),
            &mut text,
        )
        .unwrap();
        assert_eq!(text, "<html>");
    }

    #[test]
    fn test_repackaging_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let env = Environment::new(Mode::Debug, project(root));

        package(&env).unwrap();
        fs::remove_file(root.join("dist/app/views/a.html")).unwrap();
        let artifact = package(&env).unwrap();

        assert!(!artifact.path.join("app/views/a.html").exists());
        assert!(artifact.path.join("app/index.html").exists());
    }

    #[test]
    fn test_missing_app_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let env = Environment::new(Mode::Debug, ProjectConfig::at(root));

        assert!(matches!(package(&env), Err(PackageError::MissingApp(_))));
    }

    #[test]
    fn test_missing_shell_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let mut project = project(root);
        project.shell_binary = Some("target/release/kiln-shell".into());
        let env = Environment::new(Mode::Debug, project);

        assert!(matches!(package(&env), Err(PackageError::MissingShell(_))));
    }

    #[test]
    fn test_shell_path_without_file_name_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        fs::create_dir_all(root.join("bin")).unwrap();
        let mut project = project(root);
        project.shell_binary = Some("bin/..".into());
        let env = Environment::new(Mode::Debug, project);

        assert!(matches!(
            package(&env),
            Err(PackageError::MissingShell(path)) if path == root.join("bin/..")
        ));
        assert!(!root.join("dist/package").exists());
    }
}
