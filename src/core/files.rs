//! Owner-only file helpers.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use crate::core::constants::PRIVATE_FILE_MODE;
use crate::error::Result;

/// Write `contents` to `path` readable and writable by the owner only.
///
/// With `create_new` the call fails with `AlreadyExists` instead of
/// replacing an existing file. Otherwise the file is truncated and its
/// mode is tightened even if it was created earlier with a wider one.
pub fn write_private(path: &Path, contents: &[u8], create_new: bool) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut options = OpenOptions::new();
    options.write(true);
    if create_new {
        options.create_new(true);
    } else {
        options.create(true).truncate(true);
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(PRIVATE_FILE_MODE);
    }

    let mut file = options.open(path)?;
    file.write_all(contents)?;
    file.sync_all()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(PRIVATE_FILE_MODE))?;
    }

    Ok(())
}

/// Log a warning if `path` is readable by anyone but its owner.
#[cfg(unix)]
pub fn warn_if_exposed(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    use tracing::warn;

    if let Ok(metadata) = fs::metadata(path) {
        let mode = metadata.permissions().mode() & 0o777;
        if mode != PRIVATE_FILE_MODE {
            warn!(
                path = %path.display(),
                mode = %format!("{:o}", mode),
                "insecure permissions, run: chmod 600 {}",
                path.display()
            );
        }
    }
}

#[cfg(not(unix))]
pub fn warn_if_exposed(_path: &Path) {}
