//! Atomic file replacement.

use std::path::Path;
use tokio::io::AsyncWriteExt;

/// Write `bytes` to `path` via a sibling temp file, fsync, then rename.
///
/// Readers never observe a half-written file; a crash leaves at most a stale `.tmp`.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    let mut f = tokio::fs::File::create(&tmp).await?;
    f.write_all(bytes).await?;
    f.sync_all().await?;
    drop(f);

    tokio::fs::rename(&tmp, path).await
}
