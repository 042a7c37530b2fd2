use std::fs;
use std::time::Instant;

use camino::{Utf8Path, Utf8PathBuf};
use glob::{Pattern, glob};
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::error::CopyError;

/// Copies every file under `src` whose extension is listed in `extensions`
/// into `dst`, preserving relative paths.
///
/// A missing `src` directory copies nothing. Returns the written paths,
/// sorted.
pub fn copy_assets(
    src: &Utf8Path,
    dst: &Utf8Path,
    extensions: &[String],
) -> Result<Vec<Utf8PathBuf>, CopyError> {
    let s = Instant::now();
    let base = Pattern::escape(src.as_str());

    let mut files = Vec::new();
    for ext in extensions {
        for path in glob(&format!("{base}/**/*.{ext}"))? {
            let path = Utf8PathBuf::try_from(path?)?;
            if path.is_file() {
                files.push(path);
            }
        }
    }

    files.sort();
    files.dedup();

    let mut written = files
        .into_par_iter()
        .map(|path| -> Result<_, CopyError> {
            // Every match lives under `src` by construction.
            let relative = path.strip_prefix(src).unwrap_or(&path);
            let target = dst.join(relative);

            if let Some(dir) = target.parent() {
                fs::create_dir_all(dir)?;
            }
            fs::copy(&path, &target)?;

            Ok(target)
        })
        .collect::<Result<Vec<_>, _>>()?;

    written.sort();
    tracing::info!(
        "copied {} files from {src} {}",
        written.len(),
        crate::utils::as_overhead(s)
    );

    Ok(written)
}

/// Recursively copies a directory tree.
pub(crate) fn copy_rec(src: &Utf8Path, dst: &Utf8Path) -> std::io::Result<u64> {
    fs::create_dir_all(dst)?;

    let mut count = 0;
    for entry in src.read_dir_utf8()? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            count += copy_rec(entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
            count += 1;
        }
    }

    Ok(count)
}
