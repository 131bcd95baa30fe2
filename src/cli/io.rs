//! JSON I/O handling for CLI
//!
//! - Input: a whole JSON document from a file, or stdin for `-`
//! - Output: one pretty-printed JSON value on stdout
//! - Logs never go to stdout

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use super::errors::{CliError, CliResult};

/// Reads a JSON document from `path`, or from stdin when `path` is `-`
pub fn read_input(path: &Path) -> CliResult<Value> {
    let text = if path.as_os_str() == "-" {
        let mut buffer = String::new();
        io::stdin().lock().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(path)
            .map_err(|e| CliError::io_error(format!("Failed to read {}: {}", path.display(), e)))?
    };

    if text.trim().is_empty() {
        return Err(CliError::io_error("Empty input"));
    }

    Ok(serde_json::from_str(&text)?)
}

/// Writes a value to stdout
pub fn write_response<T: Serialize>(data: &T) -> CliResult<()> {
    let mut stdout = io::stdout();
    serde_json::to_writer_pretty(&mut stdout, data)?;
    writeln!(stdout)?;
    stdout.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_input_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"queryPlanner": {{}}}}"#).unwrap();
        let value = read_input(file.path()).unwrap();
        assert!(value["queryPlanner"].is_object());
    }

    #[test]
    fn test_read_input_empty() {
        let file = NamedTempFile::new().unwrap();
        let err = read_input(file.path()).unwrap_err();
        assert_eq!(err.message(), "Empty input");
    }
}
