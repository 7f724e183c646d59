//! Component E: Progress Store.
//!
//! Append-then-record, in that order: the pending batch's bytes are
//! durably appended to the target file before the progress record is
//! rewritten, so a crash between the two leaves the record stale (it will
//! be re-processed) rather than the target ahead of the record (lost
//! output would otherwise be invisible on resume).

use crate::errors::Result;
use crate::job::ProgressRecord;
use std::path::Path;

/// Load the progress record for a fingerprint. Missing or unparsable file
/// returns `Ok(None)` — a fresh job, not an error.
pub fn load(fingerprint: &str) -> Result<Option<ProgressRecord>> {
    let path = crate::paths::progress_path(fingerprint)?;
    match std::fs::read_to_string(&path) {
        Ok(content) => match serde_json::from_str(&content) {
            Ok(record) => Ok(Some(record)),
            Err(_) => Ok(None),
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Choose the separator to prepend before appending `pending_batch`, based
/// solely on the target's current last two bytes.
fn separator_for(target: &Path) -> Result<&'static str> {
    let metadata = match std::fs::metadata(target) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(""),
        Err(e) => return Err(e.into()),
    };

    if metadata.len() == 0 {
        return Ok("");
    }

    let tail_len = metadata.len().min(2) as usize;
    let mut file = std::fs::File::open(target)?;
    use std::io::{Read, Seek, SeekFrom};
    file.seek(SeekFrom::End(-(tail_len as i64)))?;
    let mut tail = vec![0u8; tail_len];
    file.read_exact(&mut tail)?;

    if tail.ends_with(b"\n\n") {
        Ok("")
    } else if tail.ends_with(b"\n") {
        Ok("\n")
    } else {
        Ok("\n\n")
    }
}

/// Append `pending_batch` to `target` with the correct separator, then
/// write the full record. Two phases, in this order, never reversed.
pub fn save(fingerprint: &str, target: &Path, record: &ProgressRecord, pending_batch: &str) -> Result<()> {
    use std::io::Write;

    let separator = separator_for(target)?;
    let mut file = std::fs::OpenOptions::new().create(true).append(true).open(target)?;
    file.write_all(separator.as_bytes())?;
    file.write_all(pending_batch.as_bytes())?;
    file.flush()?;
    drop(file);

    let path = crate::paths::progress_path(fingerprint)?;
    let json = serde_json::to_string_pretty(record)?;
    std::fs::write(&path, json)?;
    Ok(())
}

/// Remove the progress record for a fingerprint. Missing file is a
/// distinguishable error, not silently ignored.
pub fn delete(fingerprint: &str) -> Result<()> {
    let path = crate::paths::progress_path(fingerprint)?;
    std::fs::remove_file(&path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            crate::errors::EngineError::NotFound(path.clone())
        } else {
            e.into()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn separator_empty_for_empty_target() {
        let file = NamedTempFile::new().unwrap();
        assert_eq!(separator_for(file.path()).unwrap(), "");
    }

    #[test]
    fn separator_double_newline_for_no_trailing_newline() {
        let mut file = NamedTempFile::new().unwrap();
        use std::io::Write;
        file.write_all(b"r1").unwrap();
        assert_eq!(separator_for(file.path()).unwrap(), "\n\n");
    }

    #[test]
    fn separator_single_newline_when_one_trailing_newline() {
        let mut file = NamedTempFile::new().unwrap();
        use std::io::Write;
        file.write_all(b"r1\n").unwrap();
        assert_eq!(separator_for(file.path()).unwrap(), "\n");
    }

    #[test]
    fn separator_none_when_already_blank_line_separated() {
        let mut file = NamedTempFile::new().unwrap();
        use std::io::Write;
        file.write_all(b"r1\n\n").unwrap();
        assert_eq!(separator_for(file.path()).unwrap(), "");
    }

    #[test]
    fn missing_target_uses_empty_separator() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist.txt");
        assert_eq!(separator_for(&missing).unwrap(), "");
    }

    #[test]
    fn load_missing_record_returns_none() {
        assert!(load("definitely-not-a-real-fingerprint-xyz").unwrap().is_none());
    }
}
