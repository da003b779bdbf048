//! Line source: streams a delimited file into the first boundary.
//!
//! The header line is discarded. Lines are read as raw bytes; anything that
//! is not valid UTF-8 is decoded with the encoding sniffed from the start of
//! the file, so a stray Latin-1 title never costs a record.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};

use crate::error::{SourceError, SourceResult};

use super::stage::Outlet;

/// Bytes examined when sniffing the file encoding.
const SNIFF_BYTES: usize = 64 * 1024;

const READ_BUFFER: usize = 1 << 20;

/// One physical line of a dataset file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// 1-based line number in the file; the header is line 1.
    pub number: usize,
    pub text: String,
}

/// Detect the encoding of a sample using chardet.
pub fn detect_encoding(sample: &[u8]) -> &'static Encoding {
    if is_utf8_prefix(sample) {
        return UTF_8;
    }
    let (charset, _confidence, _language) = chardet::detect(sample);
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => UTF_8,
        "iso-8859-1" | "latin-1" | "latin1" | "windows-1252" | "cp1252" | "" => WINDOWS_1252,
        other => Encoding::for_label(other.as_bytes()).unwrap_or(WINDOWS_1252),
    }
}

/// A sample cut at an arbitrary byte may end inside a multi-byte character.
fn is_utf8_prefix(sample: &[u8]) -> bool {
    match std::str::from_utf8(sample) {
        Ok(_) => true,
        Err(e) => e.error_len().is_none() && sample.len() - e.valid_up_to() < 4,
    }
}

/// An opened dataset file, ready to stream.
pub struct LineSource {
    path: PathBuf,
    reader: BufReader<File>,
    fallback: &'static Encoding,
}

impl LineSource {
    /// Open `path` and sniff its encoding without consuming any input.
    pub fn open(path: &Path) -> SourceResult<Self> {
        let file = File::open(path).map_err(|source| SourceError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let mut reader = BufReader::with_capacity(READ_BUFFER, file);
        let sample = reader.fill_buf().map_err(|source| SourceError::Read {
            path: path.to_path_buf(),
            line: 0,
            source,
        })?;
        let sniffed = detect_encoding(&sample[..sample.len().min(SNIFF_BYTES)]);
        let fallback = if sniffed == UTF_8 { WINDOWS_1252 } else { sniffed };

        Ok(Self {
            path: path.to_path_buf(),
            reader,
            fallback,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Encoding used for lines that are not valid UTF-8.
    pub fn fallback_encoding(&self) -> &'static Encoding {
        self.fallback
    }

    /// Stream every data line into `outlet`, counting each into `read`.
    ///
    /// Blank lines are counted but not sent. The outlet is dropped on return,
    /// which closes the boundary whether the file ended or a read failed.
    pub fn pump(mut self, outlet: Outlet<'_, Line>, read: &AtomicU64) -> SourceResult<()> {
        let mut buf = Vec::with_capacity(256);
        if self.next_line(&mut buf, 1)? == 0 {
            return Err(SourceError::Empty(self.path));
        }

        let mut number = 1;
        loop {
            buf.clear();
            if self.next_line(&mut buf, number)? == 0 {
                return Ok(());
            }
            number += 1;
            read.fetch_add(1, Ordering::Relaxed);

            let text = self.decode(trim_line_end(&buf));
            if text.trim().is_empty() {
                continue;
            }
            if !outlet.send(Line { number, text }) {
                return Ok(());
            }
        }
    }

    fn next_line(&mut self, buf: &mut Vec<u8>, after: usize) -> SourceResult<usize> {
        self.reader
            .read_until(b'\n', buf)
            .map_err(|source| SourceError::Read {
                path: self.path.clone(),
                line: after,
                source,
            })
    }

    fn decode(&self, bytes: &[u8]) -> String {
        match std::str::from_utf8(bytes) {
            Ok(text) => text.to_owned(),
            Err(_) => self.fallback.decode_without_bom_handling(bytes).0.into_owned(),
        }
    }
}

fn trim_line_end(bytes: &[u8]) -> &[u8] {
    let bytes = bytes.strip_suffix(b"\n").unwrap_or(bytes);
    bytes.strip_suffix(b"\r").unwrap_or(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasets::Dataset;
    use crate::pipeline::stage::BoundaryMonitor;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn collect(path: &Path) -> (SourceResult<()>, Vec<Line>, u64) {
        let monitor = BoundaryMonitor::new(Dataset::Movies, "lines", 1024);
        let (outlet, inlet) = monitor.channel();
        let read = AtomicU64::new(0);
        let result = LineSource::open(path).and_then(|s| s.pump(outlet, &read));
        let mut lines = Vec::new();
        while let Some(line) = inlet.recv() {
            lines.push(line);
        }
        (result, lines, read.load(Ordering::Relaxed))
    }

    #[test]
    fn test_skips_header_and_numbers_lines() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "id\ttitle\r\ntt1\tA\r\n\r\ntt2\tB").unwrap();

        let (result, lines, read) = collect(file.path());
        assert!(result.is_ok());
        assert_eq!(read, 3);
        assert_eq!(
            lines,
            vec![
                Line { number: 2, text: "tt1\tA".into() },
                Line { number: 4, text: "tt2\tB".into() },
            ]
        );
    }

    #[test]
    fn test_header_only_file_is_ok() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "movieId,tagId,relevance").unwrap();

        let (result, lines, read) = collect(file.path());
        assert!(result.is_ok());
        assert!(lines.is_empty());
        assert_eq!(read, 0);
    }

    #[test]
    fn test_empty_file_is_an_error() {
        let file = NamedTempFile::new().unwrap();
        let (result, _, _) = collect(file.path());
        assert!(matches!(result, Err(SourceError::Empty(_))));
    }

    #[test]
    fn test_missing_file() {
        let err = LineSource::open(Path::new("/nonexistent/MovieCodes_IMDB.tsv"))
            .err()
            .unwrap();
        assert!(matches!(err, SourceError::Open { .. }));
        assert!(err.to_string().contains("MovieCodes_IMDB.tsv"));
    }

    #[test]
    fn test_latin1_line_is_decoded() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"id\ttitle\ntt1\tAm\xe9lie\n").unwrap();

        let (result, lines, _) = collect(file.path());
        assert!(result.is_ok());
        assert_eq!(lines.len(), 1);
        assert!(lines[0].text.starts_with("tt1\tAm"));
        assert!(lines[0].text.ends_with("lie"));
        assert!(!lines[0].text.contains('\u{fffd}'));
    }

    #[test]
    fn test_detect_encoding_utf8() {
        assert_eq!(detect_encoding("tt1\tCaf\u{e9}".as_bytes()), UTF_8);
        // sample cut inside a two-byte character
        assert_eq!(detect_encoding(&"\u{e9}\u{e9}".as_bytes()[..3]), UTF_8);
    }
}
