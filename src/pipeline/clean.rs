use std::fs;
use std::io::ErrorKind;
use std::time::Instant;

use camino::Utf8Path;

use crate::error::ClearError;

/// Delete the entire output directory if it exists.
pub fn clean(dist: &Utf8Path) -> Result<(), ClearError> {
    let s = Instant::now();

    match fs::remove_dir_all(dist) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(ClearError::Remove(dist.to_path_buf(), e)),
    }

    tracing::info!("cleaned {dist} {}", crate::utils::as_overhead(s));

    Ok(())
}
