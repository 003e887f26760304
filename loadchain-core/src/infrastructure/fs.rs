use crate::infrastructure::error::InfrastructureError;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Write content to a file atomically using a temporary file.
///
/// The temporary file lives in the target's directory (created if missing) so the final
/// rename stays on one filesystem. Readers see either the previous file or the complete
/// new one, and a crashed writer leaves no half-written target behind.
pub fn atomic_write<P: AsRef<Path>, C: AsRef<[u8]>>(
    path: P,
    content: C,
) -> Result<(), InfrastructureError> {
    atomic_write_with(path, |file| file.write_all(content.as_ref()).map_err(Into::into))
}

/// Like [`atomic_write`], but lets the caller stream into the temporary file.
pub fn atomic_write_with<P, F>(path: P, write: F) -> Result<(), InfrastructureError>
where
    P: AsRef<Path>,
    F: FnOnce(&mut fs::File) -> Result<(), InfrastructureError>,
{
    let path = path.as_ref();
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut temp_file = tempfile::NamedTempFile::new_in(parent)?;
    write(temp_file.as_file_mut())?;
    temp_file.as_file_mut().flush()?;

    temp_file
        .persist(path)
        .map_err(|e| InfrastructureError::Io(e.error))?;

    Ok(())
}
