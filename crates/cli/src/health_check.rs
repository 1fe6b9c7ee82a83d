use crate::error::{Error, Result};

use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use tokio::fs;
use tracing::info;

/// Copies the health-check script into place and marks it executable.
pub async fn install(source: &Path, destination: &Path) -> Result<()> {
    let io_error = |source| Error::Io {
        path: destination.to_path_buf(),
        source,
    };

    fs::copy(source, destination).await.map_err(io_error)?;
    fs::set_permissions(destination, std::fs::Permissions::from_mode(0o755))
        .await
        .map_err(io_error)?;

    info!("installed health check at {}", destination.display());

    Ok(())
}
