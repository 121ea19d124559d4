//! Utility functions for file handling and common operations

use crate::{Mutpos2VcfError, Mutpos2VcfResult};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Check if a file is gzip compressed
pub fn is_gzipped<P: AsRef<Path>>(path: P) -> Mutpos2VcfResult<bool> {
    let mut file = File::open(path)?;
    let mut buffer = [0; 2];

    match file.read_exact(&mut buffer) {
        Ok(()) => Ok(buffer == [0x1f, 0x8b]),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(Mutpos2VcfError::Io(e)),
    }
}

/// Validate file paths and check if they exist
pub fn validate_file_exists<P: AsRef<Path>>(path: P) -> Mutpos2VcfResult<()> {
    if !path.as_ref().exists() {
        return Err(Mutpos2VcfError::FileNotFound(
            path.as_ref().to_string_lossy().to_string(),
        ));
    }
    Ok(())
}

/// Validate that a file is readable
pub fn validate_file_readable<P: AsRef<Path>>(path: P) -> Mutpos2VcfResult<()> {
    validate_file_exists(&path)?;

    File::open(&path)
        .map_err(|_| Mutpos2VcfError::FileNotFound(path.as_ref().to_string_lossy().to_string()))?;

    Ok(())
}

/// Check if a path has a specific extension
pub fn has_extension<P: AsRef<Path>>(path: P, extension: &str) -> bool {
    path.as_ref()
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.eq_ignore_ascii_case(extension))
        .unwrap_or(false)
}

/// Create parent directories if they don't exist
pub fn ensure_parent_dirs<P: AsRef<Path>>(path: P) -> Mutpos2VcfResult<()> {
    if let Some(parent) = path.as_ref().parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Timer utility for measuring execution time
pub struct Timer {
    start: std::time::Instant,
    name: String,
}

impl Timer {
    pub fn new(name: &str) -> Self {
        log::info!("Starting timer: {}", name);
        Timer {
            start: std::time::Instant::now(),
            name: name.to_string(),
        }
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }

    pub fn log_elapsed(&self) {
        let duration = self.elapsed();
        log::info!("Timer '{}' elapsed: {:.2?}", self.name, duration);
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.log_elapsed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_is_gzipped() {
        // Test with a regular file
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "test content").unwrap();
        assert_eq!(is_gzipped(temp_file.path()).unwrap(), false);

        // Test with gzipped content
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(&[0x1f, 0x8b]).unwrap();
        assert_eq!(is_gzipped(temp_file.path()).unwrap(), true);
    }

    #[test]
    fn test_validate_file_exists() {
        let temp_file = NamedTempFile::new().unwrap();
        assert!(validate_file_exists(temp_file.path()).is_ok());

        assert!(validate_file_exists("/nonexistent/file").is_err());
    }

    #[test]
    fn test_has_extension() {
        assert!(has_extension("test.vcf", "vcf"));
        assert!(has_extension("out.vcf.gz", "gz"));
        assert!(!has_extension("test.txt", "vcf"));
        assert!(!has_extension("test", "vcf"));
    }

    #[test]
    fn test_ensure_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b/out.vcf");
        ensure_parent_dirs(&nested).unwrap();
        assert!(nested.parent().unwrap().is_dir());
    }

    #[test]
    fn test_timer() {
        let timer = Timer::new("test");
        std::thread::sleep(std::time::Duration::from_millis(1));
        assert!(timer.elapsed().as_millis() >= 1);
    }
}
