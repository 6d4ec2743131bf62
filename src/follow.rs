//! Live tail of a log file that the game keeps appending to.

use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::AnalyzerError;
use crate::parser::{decode_line, LogLine};

/// Never-ending line source over a growing file.
///
/// When the reader runs dry on a file shorter than what was already read (the
/// game restarted and truncated it), reading starts over from the beginning
/// and a [`LogLine::Restarted`] marks the gap.
pub struct LogFollower {
    path: PathBuf,
    reader: BufReader<File>,
    /// Bytes consumed from the current file
    offset: u64,
    /// Bytes of a line the game has not finished writing yet
    partial: Vec<u8>,
    poll: Duration,
}

impl LogFollower {
    pub fn open(path: &Path, poll: Duration) -> Result<Self, AnalyzerError> {
        let file = File::open(path).map_err(|source| AnalyzerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "Following log");

        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
            offset: 0,
            partial: Vec::new(),
            poll,
        })
    }

    /// Check for truncation at end of input; on a restart, rewind to the start
    fn restarted(&mut self) -> bool {
        let size = match std::fs::metadata(&self.path) {
            Ok(metadata) => metadata.len(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Could not stat followed log");
                return false;
            }
        };
        if size >= self.offset {
            return false;
        }

        info!(path = %self.path.display(), "Log restart detected, reading from the start");
        // The game may recreate the file instead of truncating it in place.
        match File::open(&self.path) {
            Ok(file) => self.reader = BufReader::new(file),
            Err(e) => {
                warn!(error = %e, "Could not reopen followed log, rewinding the old handle");
                if let Err(e) = self.reader.seek(SeekFrom::Start(0)) {
                    warn!(error = %e, "Could not rewind followed log");
                }
            }
        }
        self.partial.clear();
        self.offset = 0;
        true
    }
}

impl Iterator for LogFollower {
    type Item = LogLine;

    fn next(&mut self) -> Option<LogLine> {
        loop {
            match self.reader.read_until(b'\n', &mut self.partial) {
                Ok(0) if self.restarted() => return Some(LogLine::Restarted),
                Ok(0) => thread::sleep(self.poll),
                Ok(read) => {
                    self.offset += read as u64;
                    if self.partial.ends_with(b"\n") {
                        let line = decode_line(&self.partial);
                        self.partial.clear();
                        return Some(LogLine::Text(line));
                    }
                    debug!(bytes = self.partial.len(), "Waiting for the rest of a line");
                }
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "Reading followed log failed");
                    thread::sleep(self.poll);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::OpenOptions;
    use std::io::Write;

    const POLL: Duration = Duration::from_millis(5);

    fn append(path: &Path, text: &str) {
        let mut file = OpenOptions::new().append(true).open(path).expect("open for append");
        file.write_all(text.as_bytes()).expect("append");
    }

    #[test]
    fn yields_existing_then_appended_lines() {
        let file = tempfile::NamedTempFile::new().expect("temp file");
        append(file.path(), "1.000 first\r\n");

        let mut follower = LogFollower::open(file.path(), POLL).expect("open");
        assert_eq!(follower.next(), Some(LogLine::Text("1.000 first".to_string())));

        append(file.path(), "2.000 second\n");
        assert_eq!(follower.next(), Some(LogLine::Text("2.000 second".to_string())));
    }

    #[test]
    fn partial_lines_are_joined() {
        let file = tempfile::NamedTempFile::new().expect("temp file");
        append(file.path(), "3.000 half");

        let path = file.path().to_path_buf();
        let writer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            append(&path, " and the rest\n");
        });

        let mut follower = LogFollower::open(file.path(), POLL).expect("open");
        assert_eq!(
            follower.next(),
            Some(LogLine::Text("3.000 half and the rest".to_string()))
        );
        writer.join().expect("writer thread");
    }

    #[test]
    fn truncation_restarts_from_the_beginning() {
        let file = tempfile::NamedTempFile::new().expect("temp file");
        append(file.path(), "1.000 old session line one\n1.000 old session line two\n");

        let mut follower = LogFollower::open(file.path(), POLL).expect("open");
        assert!(matches!(follower.next(), Some(LogLine::Text(_))));
        assert!(matches!(follower.next(), Some(LogLine::Text(_))));

        std::fs::write(file.path(), "0.500 new\n").expect("truncate");
        assert_eq!(follower.next(), Some(LogLine::Restarted));
        assert_eq!(follower.next(), Some(LogLine::Text("0.500 new".to_string())));
    }

    #[test]
    fn buffered_lines_drain_before_the_restart() {
        let file = tempfile::NamedTempFile::new().expect("temp file");
        append(file.path(), "1.000 a\n2.000 b\n3.000 c\n");

        let mut follower = LogFollower::open(file.path(), POLL).expect("open");
        assert_eq!(follower.next(), Some(LogLine::Text("1.000 a".to_string())));

        std::fs::write(file.path(), "9.000 z\n").expect("truncate");
        assert_eq!(follower.next(), Some(LogLine::Text("2.000 b".to_string())));
        assert_eq!(follower.next(), Some(LogLine::Text("3.000 c".to_string())));
        assert_eq!(follower.next(), Some(LogLine::Restarted));
        assert_eq!(follower.next(), Some(LogLine::Text("9.000 z".to_string())));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let result = LogFollower::open(&dir.path().join("EE.log"), POLL);
        assert!(matches!(result, Err(AnalyzerError::Io { .. })));
    }
}
