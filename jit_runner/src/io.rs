//! Parameter and output I/O operations.

use std::{
    fs::{File, write},
    io::{self, BufReader, Read, Write},
    path::Path,
};

use anyhow::{Context, Result};
use jit_runner::{HEADER_SIZE, peek_parameters_version};

/// Read the header, validate it and append the rest of the stream.
fn read_checked(mut reader: impl Read, capacity: usize, source: &str) -> Result<(Vec<u8>, u32)> {
    let mut header = [0u8; HEADER_SIZE];
    reader
        .read_exact(&mut header)
        .with_context(|| format!("failed to read header from {source}"))?;
    let version = peek_parameters_version(&header)
        .with_context(|| format!("invalid parameters header in {source}"))?;

    let mut buffer = Vec::with_capacity(capacity.max(HEADER_SIZE));
    buffer.extend_from_slice(&header);
    reader
        .read_to_end(&mut buffer)
        .with_context(|| format!("failed to read parameters payload from {source}"))?;
    Ok((buffer, version))
}

/// Read parameters from file or stdin, returning bytes, source description, and version.
pub(crate) fn read_parameters(params_path: Option<&Path>) -> Result<(Vec<u8>, String, u32)> {
    match params_path {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to read parameters file '{}'", path.display()))?;
            let file_size = file
                .metadata()
                .with_context(|| {
                    format!(
                        "failed to get metadata for parameters file '{}'",
                        path.display()
                    )
                })?
                .len() as usize;
            let source = format!("'{}'", path.display());
            let (bytes, version) = read_checked(BufReader::new(file), file_size, &source)?;
            Ok((bytes, path.display().to_string(), version))
        }
        None => {
            let stdin = io::stdin();
            let (bytes, version) = read_checked(stdin.lock(), 0, "stdin")?;
            Ok((bytes, "stdin".to_string(), version))
        }
    }
}

/// Write output bytes to a file or stdout.
pub(crate) fn write_output(output_path: Option<&Path>, bytes: &[u8]) -> Result<()> {
    match output_path {
        Some(path) => {
            write(path, bytes)
                .with_context(|| format!("failed to write output file '{}'", path.display()))?;
        }
        None => {
            io::stdout()
                .write_all(bytes)
                .context("failed to write to stdout")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use jit_runner::{PARAMETERS_VERSION, ValueData, serialize_parameters};
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn reads_parameters_file_with_its_version() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("params");
        let bytes = serialize_parameters(&[ValueData::Scalar { value: 3 }]).unwrap();
        write(&path, &bytes).unwrap();

        let (read, source, version) = read_parameters(Some(&path)).unwrap();

        assert_eq!(read, bytes);
        assert_eq!(source, path.display().to_string());
        assert_eq!(version, PARAMETERS_VERSION);
    }

    #[test]
    fn directory_is_not_a_parameters_file() {
        let dir = TempDir::new().unwrap();

        let err = read_parameters(Some(dir.path())).unwrap_err();

        assert!(format!("{err:#}").contains(&dir.path().display().to_string()));
    }

    #[test]
    fn short_header_is_reported() {
        let err = read_checked(&b"JIT"[..], 0, "'short'").unwrap_err();
        assert!(err.to_string().contains("failed to read header from 'short'"));
    }
}
