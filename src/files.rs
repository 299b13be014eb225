//! File collaborator used by the gateway and available to agent code.
//!
//! Read and write report failures inside their result structs rather than
//! as errors, so callers can hand the outcome straight back to a model.

use std::fs;
use std::path::Path;
use base64::Engine;
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};

/// Outcome of [`read_file`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileReadResult
{   pub success: bool
  , pub content: String
  , pub line_count: usize
  , pub error: Option<String>
}

/// Outcome of [`write_file`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileWriteResult
{   pub success: bool
  , pub bytes_written: usize
  , pub error: Option<String>
}

fn require_path(path: &str) -> Result<&Path>
{   if path.trim().is_empty()
    {   return Err(Error::Validation(
          "file path must be a non-empty string".to_string()
        ));
    }
    Ok(Path::new(path))
}

/// Read a UTF-8 text file
pub fn read_file(path: &str) -> Result<FileReadResult>
{   let file = require_path(path)?;
    let failed = |msg: String| {
      error!("{}", msg);
      FileReadResult
      {   success: false
        , content: String::new()
        , line_count: 0
        , error: Some(msg)
      }
    };

    if !file.exists()
    {   return Ok(failed(format!("File not found: {}", path)));
    }
    if !file.is_file()
    {   return Ok(failed(format!("Path is not a file: {}", path)));
    }

    match fs::read_to_string(file)
    {   Ok(content) => {
          info!("Read file {}", path);
          Ok(FileReadResult
          {   success: true
            , line_count: content.lines().count()
            , content
            , error: None
          })
        }
      , Err(e) => Ok(failed(format!("Error reading {}: {}", path, e)))
    }
}

/// Write text to a file, creating parent directories as needed
pub fn write_file(path: &str, content: &str) -> Result<FileWriteResult>
{   let file = require_path(path)?;

    let outcome = file.parent()
      .filter(|dir| !dir.as_os_str().is_empty() && !dir.exists())
      .map(fs::create_dir_all)
      .unwrap_or(Ok(()))
      .and_then(|_| fs::write(file, content));

    match outcome
    {   Ok(()) => {
          info!("Wrote {} bytes to {}", content.len(), path);
          Ok(FileWriteResult
          {   success: true
            , bytes_written: content.len()
            , error: None
          })
        }
      , Err(e) => {
          error!("Error writing {}: {}", path, e);
          Ok(FileWriteResult
          {   success: false
            , bytes_written: 0
            , error: Some(format!("Error writing {}: {}", path, e))
          })
        }
    }
}

/// Read a file's bytes and encode them as standard base64
pub fn encode_base64(path: &str) -> Result<String>
{   let file = require_path(path.trim())?;
    if !file.is_file()
    {   error!("Image not found: {}", path);
        return Err(Error::Validation(
          format!("file not found: {}", path)
        ));
    }
    let bytes = fs::read(file).map_err(|e| {
      error!("Error reading {}: {}", path, e);
      Error::Io(format!("could not read {}: {}", path, e))
    })?;
    debug!("Encoding {} bytes from {}", bytes.len(), path);
    Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests
{   use super::*;

    #[test]
    fn read_missing_file_reports_failure()
    {   let result = read_file("/definitely/not/here.txt").unwrap();
        assert!(!result.success);
        assert!(result.error.unwrap().contains("File not found"));
    }

    #[test]
    fn empty_path_is_rejected()
    {   assert!(matches!(read_file("  "), Err(Error::Validation(_))));
        assert!(matches!(write_file("", "x"), Err(Error::Validation(_))));
        assert!(matches!(encode_base64(""), Err(Error::Validation(_))));
    }

    #[test]
    fn write_then_read()
    {   let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("notes.txt");
        let path = path.to_str().unwrap();

        let written = write_file(path, "one\ntwo\nthree").unwrap();
        assert!(written.success);
        assert_eq!(written.bytes_written, 13);

        let read = read_file(path).unwrap();
        assert!(read.success);
        assert_eq!(read.line_count, 3);
        assert_eq!(read.content, "one\ntwo\nthree");
    }

    #[test]
    fn reading_a_directory_fails()
    {   let dir = tempfile::tempdir().unwrap();
        let result = read_file(dir.path().to_str().unwrap()).unwrap();
        assert!(!result.success);
        assert!(result.error.unwrap().contains("not a file"));
    }

    #[test]
    fn encodes_file_bytes()
    {   let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("img.bin");
        fs::write(&path, b"hello").unwrap();
        assert_eq!(encode_base64(path.to_str().unwrap()).unwrap(), "aGVsbG8=");
    }

    #[test]
    fn encode_missing_file_is_validation_error()
    {   assert!(matches!(
          encode_base64("/no/such/image.png"),
          Err(Error::Validation(_))
        ));
    }
}
