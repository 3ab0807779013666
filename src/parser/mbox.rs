//! Streaming MBOX archive reader.
//!
//! Reads MBOX files line-by-line through a buffered reader and never loads
//! the whole file into memory. Tolerant of malformed input. Only the
//! envelope `From ` line and the header block of each message are surfaced;
//! bodies are skipped, since the import pipeline indexes metadata only.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{Result, ScopeError};

/// Size of the internal read buffer (1 MB for fast sequential reads).
const READ_BUFFER_SIZE: usize = 1024 * 1024;

/// Progress is reported to the callback every 4 MB of input.
const PROGRESS_INTERVAL: u64 = 4 * 1024 * 1024;

/// One message as surfaced by [`MboxArchive::stream`].
#[derive(Debug)]
pub struct RawMessage<'a> {
    /// Ordinal key: 0 for the first message in the archive, counting up in
    /// archive-native order. Unique and stable for a given archive file.
    pub key: u64,
    /// The envelope `From ` separator line, newline trimmed.
    pub envelope: &'a str,
    /// The raw header block (everything between the envelope line and the
    /// first blank line), undecoded.
    pub headers: &'a [u8],
}

/// Streaming MBOX archive reader.
///
/// Walks the file sequentially, invoking a caller-supplied callback for
/// every message found. Tolerant of:
///
/// - Mixed `\n` and `\r\n` line endings
/// - `From ` lines not preceded by a blank line (logs a warning)
/// - Truncated messages at EOF
/// - NUL bytes and other binary content in bodies
/// - UTF-8 BOM at the start of the file
#[derive(Debug)]
pub struct MboxArchive {
    path: PathBuf,
    file_size: u64,
}

impl MboxArchive {
    /// Open an archive for streaming.
    ///
    /// Verifies that the file exists and is readable, but does NOT validate
    /// that it is actually an MBOX.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let metadata = std::fs::metadata(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ScopeError::FileNotFound(path.clone())
            } else {
                ScopeError::io(&path, e)
            }
        })?;
        Ok(Self {
            path,
            file_size: metadata.len(),
        })
    }

    /// Total size of the underlying file in bytes.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Path to the archive file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stream all messages in archive-native order.
    ///
    /// The callback returns `true` to continue or `false` to abort early.
    /// The optional progress callback receives `(bytes_read, total_bytes)`.
    ///
    /// Returns the number of messages surfaced.
    pub fn stream(
        &self,
        callback: &mut dyn FnMut(RawMessage<'_>) -> bool,
        progress: Option<&dyn Fn(u64, u64)>,
    ) -> Result<u64> {
        if self.file_size == 0 {
            return Ok(0);
        }

        let file = File::open(&self.path).map_err(|e| ScopeError::io(&self.path, e))?;
        let mut reader = BufReader::with_capacity(READ_BUFFER_SIZE, file);

        let mut key: u64 = 0;
        let mut bytes_read: u64 = 0;
        let mut last_progress: u64 = 0;
        let mut prev_line_was_empty = true;
        let mut first_line = true;

        // State for the message currently being accumulated. `in_headers`
        // is true between the envelope line and the first blank line.
        let mut envelope = String::new();
        let mut header_buf: Vec<u8> = Vec::with_capacity(16 * 1024);
        let mut have_message = false;
        let mut in_headers = false;

        // Reusable line buffer — avoids allocation per line
        let mut line_buf: Vec<u8> = Vec::with_capacity(4096);

        loop {
            line_buf.clear();
            let line_len = {
                let buf = reader
                    .fill_buf()
                    .map_err(|e| ScopeError::io(&self.path, e))?;
                if buf.is_empty() {
                    break; // EOF
                }
                let consume_len = match buf.iter().position(|&b| b == b'\n') {
                    Some(pos) => pos + 1,
                    None => buf.len(),
                };
                line_buf.extend_from_slice(&buf[..consume_len]);
                reader.consume(consume_len);
                consume_len as u64
            };

            if is_mbox_separator(&line_buf) {
                if !first_line && !prev_line_was_empty {
                    warn!(
                        bytes_read,
                        "Found 'From ' separator without preceding blank line"
                    );
                }

                // Emit the previous message before starting a new one.
                if have_message {
                    let msg = RawMessage {
                        key,
                        envelope: &envelope,
                        headers: &header_buf,
                    };
                    if !callback(msg) {
                        return Ok(key);
                    }
                    key += 1;
                }

                envelope.clear();
                envelope.push_str(String::from_utf8_lossy(&line_buf).trim_end());
                header_buf.clear();
                have_message = true;
                in_headers = true;
            } else if in_headers {
                if is_blank_line(&line_buf) {
                    in_headers = false;
                } else {
                    header_buf.extend_from_slice(&line_buf);
                }
            }

            prev_line_was_empty = is_blank_line(&line_buf);
            first_line = false;
            bytes_read += line_len;

            if let Some(cb) = progress {
                if bytes_read - last_progress >= PROGRESS_INTERVAL {
                    cb(bytes_read, self.file_size);
                    last_progress = bytes_read;
                }
            }
        }

        // Flush the trailing message
        let mut count = key;
        if have_message {
            let msg = RawMessage {
                key,
                envelope: &envelope,
                headers: &header_buf,
            };
            if callback(msg) {
                count = key + 1;
            }
        }

        if let Some(cb) = progress {
            cb(self.file_size, self.file_size);
        }

        Ok(count)
    }
}

/// Check whether a line is an MBOX separator (`From ` at the start).
fn is_mbox_separator(line: &[u8]) -> bool {
    // Skip BOM if present at very start
    let line = if line.starts_with(&[0xEF, 0xBB, 0xBF]) {
        &line[3..]
    } else {
        line
    };
    line.starts_with(b"From ")
}

/// Check whether a line is blank (empty or only whitespace / CR / LF).
fn is_blank_line(line: &[u8]) -> bool {
    line.iter()
        .all(|&b| b == b'\n' || b == b'\r' || b == b' ' || b == b'\t')
}
