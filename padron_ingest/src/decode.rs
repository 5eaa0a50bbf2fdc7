//! Legacy text decoding for the registry input files.
//!
//! The registry files are published in an ISO-8859-1-family single-byte
//! encoding, not UTF-8; reading them as UTF-8 would mangle every accented
//! name (MARÍA, NÚÑEZ, LIMÓN). Decoding goes through `encoding_rs` with the
//! windows-1252 table, which agrees with ISO-8859-1 on every byte these
//! files use and cannot fail on single-byte input.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Read a registry file and decode it into lines.
///
/// Splits on `\n` and `\r\n`; no header row is expected or skipped.
pub fn read_legacy_lines(path: &Path) -> Result<Vec<String>> {
    let bytes = fs::read(path)
        .with_context(|| format!("Failed to read registry file {}", path.display()))?;
    let (text, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
    Ok(text.lines().map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn decodes_accented_characters() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        // "10101,SAN JOSÉ,SAN JOSÉ,CARMEN" in ISO-8859-1 (0xC9 = É).
        file.write_all(b"10101,SAN JOS\xC9,SAN JOS\xC9,CARMEN\n")
            .unwrap();
        let lines = read_legacy_lines(file.path()).unwrap();
        assert_eq!(lines, vec!["10101,SAN JOSÉ,SAN JOSÉ,CARMEN"]);
    }

    #[test]
    fn splits_crlf_and_skips_no_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"a,b,c,d\r\ne,f,g,h\n").unwrap();
        let lines = read_legacy_lines(file.path()).unwrap();
        assert_eq!(lines, vec!["a,b,c,d", "e,f,g,h"]);
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = read_legacy_lines(Path::new("/nonexistent/padron.txt")).unwrap_err();
        assert!(err.to_string().contains("padron.txt"));
    }
}
