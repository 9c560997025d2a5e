use std::{fs, io::Write, path::Path};

/// Replace `path` with `bytes` via a synced temp file and rename, so a
/// crash leaves either the old image or the new one.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension("tmp");
    {
        let mut f = fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    fs::rename(tmp, path)
}
