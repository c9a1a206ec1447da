//! Destination-file sink for downloaded bodies
//!
//! Resumed transfers append; fresh transfers truncate. A body that still
//! arrives gzip-compressed (despite the identity request header) is decoded
//! on the way to disk. Failure to open the destination is fatal: a download
//! with nowhere to land has no degraded mode.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use flate2::write::GzDecoder;
use indicatif::{ProgressBar, ProgressStyle};

use crate::errors::{Result, RurlError};
use crate::transfer::planner::TransferDecision;

#[derive(Debug)]
pub struct FileSink {
    dest: Destination,
    path: PathBuf,
    progress: Option<ProgressBar>,
}

#[derive(Debug)]
enum Destination {
    Plain(CountingWriter<BufWriter<File>>),
    Gunzip(GzDecoder<CountingWriter<BufWriter<File>>>),
}

/// Counts decoded bytes as they reach the file, so the final tally is what
/// is on disk rather than what came over the wire.
#[derive(Debug)]
struct CountingWriter<W: Write> {
    inner: W,
    written: u64,
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl FileSink {
    /// Open the decided destination, appending when the decision carries a
    /// resume offset. `total` is the expected remaining byte count, used for
    /// the progress bar when known; `gunzip` decodes a gzip-encoded body.
    pub fn open(
        decision: &TransferDecision,
        total: Option<u64>,
        show_progress: bool,
        gunzip: bool,
    ) -> Result<Self> {
        let path = decision
            .filename
            .clone()
            .ok_or_else(|| RurlError::File("no destination filename resolved".to_string()))?;

        let file = if decision.resume_offset > 0 {
            OpenOptions::new().append(true).open(&path)
        } else {
            File::create(&path)
        }
        .map_err(|e| RurlError::File(format!("cannot open {}: {}", path.display(), e)))?;

        let counter = CountingWriter {
            inner: BufWriter::new(file),
            written: 0,
        };
        let dest = if gunzip {
            Destination::Gunzip(GzDecoder::new(counter))
        } else {
            Destination::Plain(counter)
        };

        let progress = show_progress.then(|| init_progress(decision.resume_offset, total));

        Ok(FileSink { dest, path, progress })
    }

    pub fn write(&mut self, chunk: &[u8]) -> Result<()> {
        match &mut self.dest {
            Destination::Plain(w) => w.write_all(chunk)?,
            Destination::Gunzip(d) => d.write_all(chunk)?,
        }
        if let Some(ref pb) = self.progress {
            // wire bytes, matching a content-length derived total
            pb.inc(chunk.len() as u64);
        }
        Ok(())
    }

    /// Bytes written to the file so far (after any decoding).
    pub fn written(&self) -> u64 {
        match &self.dest {
            Destination::Plain(w) => w.written,
            Destination::Gunzip(d) => d.get_ref().written,
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Flush and report. Consumes the sink so nothing writes after the
    /// closing message.
    pub fn finish(self) -> Result<(PathBuf, u64)> {
        let mut counter = match self.dest {
            Destination::Plain(w) => w,
            Destination::Gunzip(d) => d
                .finish()
                .map_err(|e| RurlError::File(format!("gzip decode failed: {}", e)))?,
        };
        counter.flush()?;
        if let Some(ref pb) = self.progress {
            pb.finish_with_message("done");
        }
        Ok((self.path, counter.written))
    }

    /// Flush what arrived and leave the bar visibly unfinished.
    pub fn abandon(&mut self, reason: &str) {
        match &mut self.dest {
            Destination::Plain(w) => {
                let _ = w.flush();
            }
            Destination::Gunzip(d) => {
                let _ = d.try_finish();
            }
        }
        if let Some(ref pb) = self.progress {
            pb.abandon_with_message(reason.to_string());
        }
    }
}

fn init_progress(resumed_from: u64, total: Option<u64>) -> ProgressBar {
    match total {
        Some(remaining) => {
            let pb = ProgressBar::new(resumed_from + remaining);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            pb.set_position(resumed_from);
            pb
        }
        None => {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {bytes} downloaded")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::planner::OffsetSource;

    fn decision(path: PathBuf, resume_offset: u64) -> TransferDecision {
        TransferDecision {
            to_file: true,
            filename: Some(path),
            resume_offset,
            offset_source: if resume_offset > 0 {
                OffsetSource::LocalFile
            } else {
                OffsetSource::None
            },
        }
    }

    #[test]
    fn test_fresh_write_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fresh.bin");
        std::fs::write(&path, b"old contents that must vanish").unwrap();

        let mut sink = FileSink::open(&decision(path.clone(), 0), Some(5), false, false).unwrap();
        sink.write(b"hello").unwrap();
        let (out, written) = sink.finish().unwrap();
        assert_eq!(written, 5);
        assert_eq!(std::fs::read(&out).unwrap(), b"hello");
    }

    #[test]
    fn test_resume_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.bin");
        std::fs::write(&path, b"first-").unwrap();

        let mut sink = FileSink::open(&decision(path.clone(), 6), None, false, false).unwrap();
        sink.write(b"second").unwrap();
        sink.finish().unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"first-second");
    }

    #[test]
    fn test_gzip_body_is_decoded_to_disk() {
        use flate2::write::GzEncoder;
        use flate2::Compression;

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"plain text inside").unwrap();
        let compressed = encoder.finish().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("decoded.txt");
        let mut sink = FileSink::open(&decision(path.clone(), 0), None, false, true).unwrap();
        sink.write(&compressed).unwrap();
        let (_, written) = sink.finish().unwrap();

        assert_eq!(written, b"plain text inside".len() as u64);
        assert_eq!(std::fs::read(&path).unwrap(), b"plain text inside");
    }

    #[test]
    fn test_unopenable_destination_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no-such-subdir").join("out.bin");
        let err = FileSink::open(&decision(path, 0), None, false, false).unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("out.bin"));
    }

    #[test]
    fn test_missing_filename_is_fatal() {
        let decision = TransferDecision {
            to_file: true,
            filename: None,
            resume_offset: 0,
            offset_source: OffsetSource::None,
        };
        assert!(FileSink::open(&decision, None, false, false)
            .unwrap_err()
            .is_fatal());
    }
}
