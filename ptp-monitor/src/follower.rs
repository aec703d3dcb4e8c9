//! Line follower for a growing log file
//!
//! The follower reads complete lines from a seekable source in one of two
//! modes (see [`FollowMode`]):
//!
//! - **Replay**: read everything available from the current position, then stop.
//! - **Tail**: seek to the end first, then poll for appended lines until cancelled.
//!
//! Lines are yielded without their terminator. Invalid UTF-8 is replaced
//! rather than reported. In tail mode a line is only yielded once its
//! terminator has been written, so a writer flushing half a line never
//! produces a fragment.

use crate::config::{FollowMode, DEFAULT_POLL_INTERVAL};
use crate::types::{MonitorError, Result};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Longest line kept in memory before it is yielded in pieces
pub const DEFAULT_MAX_LINE_LEN: usize = 1024 * 1024;

/// Cooperative cancellation flag shared between a follower and its owner
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; every clone observes it
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Outcome of a single read attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadEvent {
    /// A complete line, terminator stripped
    Line(String),
    /// Tail mode reached end of stream and waited one poll interval
    Idle,
    /// No more lines will be produced (replay finished or cancelled)
    End,
}

/// Reads lines from a growing source
pub struct LogFollower<R> {
    reader: BufReader<R>,
    mode: FollowMode,
    poll_interval: Duration,
    cancel: CancelToken,
    /// Bytes of a line whose terminator has not arrived yet
    pending: Vec<u8>,
    max_line_len: usize,
    started: bool,
    finished: bool,
}

impl LogFollower<File> {
    /// Open a log file for following
    ///
    /// A missing or unreadable file is reported as [`MonitorError::SourceUnavailable`].
    pub fn open(path: &Path, mode: FollowMode) -> Result<Self> {
        log::info!("Opening log source: {:?} ({:?} mode)", path, mode);
        let file = File::open(path).map_err(|source| MonitorError::SourceUnavailable {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(file, mode))
    }
}

impl<R: Read + Seek> LogFollower<R> {
    pub fn new(source: R, mode: FollowMode) -> Self {
        Self {
            reader: BufReader::new(source),
            mode,
            poll_interval: DEFAULT_POLL_INTERVAL,
            cancel: CancelToken::new(),
            pending: Vec::new(),
            max_line_len: DEFAULT_MAX_LINE_LEN,
            started: false,
            finished: false,
        }
    }

    /// Builder method: set the wait between polls in tail mode
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Builder method: observe an externally owned cancellation token
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Builder method: cap the bytes buffered for a single line
    ///
    /// A line reaching the cap without a terminator is yielded as is and the
    /// remainder follows as further lines.
    pub fn with_max_line_len(mut self, max_line_len: usize) -> Self {
        self.max_line_len = max_line_len.max(1);
        self
    }

    pub fn mode(&self) -> FollowMode {
        self.mode
    }

    /// Token that stops this follower when cancelled
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Attempt to read the next line
    ///
    /// In tail mode this blocks for at most one poll interval and returns
    /// [`ReadEvent::Idle`] when nothing new arrived, so callers can run
    /// periodic work between lines.
    pub fn read_next(&mut self) -> io::Result<ReadEvent> {
        if self.finished {
            return Ok(ReadEvent::End);
        }
        if self.cancel.is_cancelled() {
            log::debug!("Follower cancelled");
            self.finished = true;
            return Ok(ReadEvent::End);
        }
        if !self.started {
            self.started = true;
            if self.mode == FollowMode::Tail {
                let end = self.reader.seek(SeekFrom::End(0))?;
                log::debug!("Tailing from byte offset {}", end);
            }
        }

        let room = self.max_line_len.saturating_sub(self.pending.len()) as u64;
        let read = (&mut self.reader).take(room).read_until(b'\n', &mut self.pending)?;
        if read > 0 && self.pending.last() == Some(&b'\n') {
            return Ok(ReadEvent::Line(self.take_pending()));
        }
        if self.pending.len() >= self.max_line_len {
            log::warn!(
                "Line exceeds {} bytes without a terminator, splitting it",
                self.max_line_len
            );
            return Ok(ReadEvent::Line(self.take_pending()));
        }

        match self.mode {
            FollowMode::Replay => {
                self.finished = true;
                if self.pending.is_empty() {
                    Ok(ReadEvent::End)
                } else {
                    // Final line without a terminator
                    Ok(ReadEvent::Line(self.take_pending()))
                }
            }
            FollowMode::Tail => {
                thread::sleep(self.poll_interval);
                if self.cancel.is_cancelled() {
                    log::debug!("Follower cancelled during poll wait");
                    self.finished = true;
                    return Ok(ReadEvent::End);
                }
                Ok(ReadEvent::Idle)
            }
        }
    }

    fn take_pending(&mut self) -> String {
        let mut bytes = std::mem::take(&mut self.pending);
        if bytes.last() == Some(&b'\n') {
            bytes.pop();
            if bytes.last() == Some(&b'\r') {
                bytes.pop();
            }
        }
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

/// Iterates over lines only, skipping idle polls
///
/// Ends when replay is exhausted or the follower is cancelled.
impl<R: Read + Seek> Iterator for LogFollower<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.read_next() {
                Ok(ReadEvent::Line(line)) => return Some(Ok(line)),
                Ok(ReadEvent::Idle) => continue,
                Ok(ReadEvent::End) => return None,
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn cursor(text: &[u8]) -> Cursor<Vec<u8>> {
        Cursor::new(text.to_vec())
    }

    #[test]
    fn test_replay_reads_all_lines() {
        let follower = LogFollower::new(cursor(b"one\ntwo\r\nthree\n"), FollowMode::Replay);
        let lines: Vec<String> = follower.map(|l| l.unwrap()).collect();
        assert_eq!(lines, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_replay_yields_unterminated_last_line() {
        let follower = LogFollower::new(cursor(b"one\npartial"), FollowMode::Replay);
        let lines: Vec<String> = follower.map(|l| l.unwrap()).collect();
        assert_eq!(lines, vec!["one", "partial"]);
    }

    #[test]
    fn test_replay_keeps_empty_lines() {
        let follower = LogFollower::new(cursor(b"a\n\nb\n"), FollowMode::Replay);
        assert_eq!(follower.count(), 3);
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut follower = LogFollower::new(cursor(b"ok \xff\xfe here\n"), FollowMode::Replay);
        match follower.read_next().unwrap() {
            ReadEvent::Line(line) => {
                assert!(line.starts_with("ok "));
                assert!(line.ends_with(" here"));
                assert!(line.contains('\u{FFFD}'));
            }
            other => panic!("expected a line, got {:?}", other),
        }
    }

    #[test]
    fn test_replay_end_is_sticky() {
        let mut follower = LogFollower::new(cursor(b""), FollowMode::Replay);
        assert_eq!(follower.read_next().unwrap(), ReadEvent::End);
        assert_eq!(follower.read_next().unwrap(), ReadEvent::End);
    }

    #[test]
    fn test_tail_skips_existing_content() {
        let mut follower = LogFollower::new(cursor(b"old line\n"), FollowMode::Tail)
            .with_poll_interval(Duration::from_millis(1));
        assert_eq!(follower.read_next().unwrap(), ReadEvent::Idle);
        assert_eq!(follower.read_next().unwrap(), ReadEvent::Idle);
    }

    #[test]
    fn test_cancelled_tail_ends() {
        let cancel = CancelToken::new();
        let mut follower = LogFollower::new(cursor(b"old\n"), FollowMode::Tail)
            .with_poll_interval(Duration::from_millis(1))
            .with_cancel_token(cancel.clone());
        assert_eq!(follower.read_next().unwrap(), ReadEvent::Idle);
        cancel.cancel();
        assert_eq!(follower.read_next().unwrap(), ReadEvent::End);
        assert!(follower.next().is_none());
    }

    #[test]
    fn test_overlong_line_is_split() {
        let follower = LogFollower::new(cursor(b"abcdefghij\nxy\n"), FollowMode::Replay).with_max_line_len(4);
        let lines: Vec<String> = follower.map(|l| l.unwrap()).collect();
        assert_eq!(lines, vec!["abcd", "efgh", "ij", "xy"]);
    }

    #[test]
    fn test_tail_partial_line_stays_bounded() {
        let mut follower = LogFollower::new(cursor(b""), FollowMode::Tail)
            .with_poll_interval(Duration::from_millis(1))
            .with_max_line_len(8);
        assert_eq!(follower.read_next().unwrap(), ReadEvent::Idle);
        // Data appended after the follower started, never terminated
        follower.reader.get_mut().get_mut().extend_from_slice(b"0123456789ab");
        assert_eq!(follower.read_next().unwrap(), ReadEvent::Line("01234567".to_string()));
        assert_eq!(follower.read_next().unwrap(), ReadEvent::Idle);
        assert_eq!(follower.pending, b"89ab");
    }

    #[test]
    fn test_open_missing_file() {
        let result = LogFollower::open(Path::new("/nonexistent/ptp4l.log"), FollowMode::Replay);
        assert!(matches!(result, Err(MonitorError::SourceUnavailable { .. })));
    }
}
