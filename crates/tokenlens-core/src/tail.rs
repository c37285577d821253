use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// Block size for backward reads.
const BLOCK_SIZE: u64 = 8 * 1024;

/// Read the last line of a file, or `None` when the file is missing, empty,
/// or unreadable.
pub fn last_line(path: &Path) -> Option<String> {
    last_lines(path, 1).into_iter().next()
}

/// Read the last `n` lines of a file, most recent first, using backward
/// block reads. The whole file is never materialized. Tolerates LF and CRLF
/// terminators; trailing newlines are stripped. Returns an empty vector on
/// any I/O error.
pub fn last_lines(path: &Path, n: usize) -> Vec<String> {
    if n == 0 {
        return Vec::new();
    }
    read_tail(path, n).unwrap_or_default()
}

fn read_tail(path: &Path, n: usize) -> Option<Vec<String>> {
    let mut file = File::open(path).ok()?;
    let metadata = file.metadata().ok()?;
    if !metadata.is_file() {
        return None;
    }

    let len = metadata.len();
    if len == 0 {
        return Some(Vec::new());
    }

    let mut buf: Vec<u8> = Vec::new();
    let mut pos = len;

    // Prepend blocks until the buffer holds n complete lines or the file is
    // exhausted. n+1 newlines guarantee the last n lines are complete even
    // when the buffer starts mid-line.
    while pos > 0 {
        let start = pos.saturating_sub(BLOCK_SIZE);
        let block_len = (pos - start) as usize;
        file.seek(SeekFrom::Start(start)).ok()?;
        let mut block = vec![0u8; block_len];
        file.read_exact(&mut block).ok()?;
        block.extend_from_slice(&buf);
        buf = block;
        pos = start;

        if newline_count(&buf) > n {
            break;
        }
    }

    let text = String::from_utf8_lossy(&buf);
    let mut lines: Vec<&str> = text.split('\n').collect();
    if lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    // When the read stopped mid-file, the first element is a partial line;
    // it is only returned if it is outside the requested window anyway.
    let take = lines.len().min(n);
    let mut out: Vec<String> = lines[lines.len() - take..]
        .iter()
        .map(|l| l.trim_end_matches('\r').to_string())
        .collect();
    out.reverse();
    Some(out)
}

fn newline_count(buf: &[u8]) -> usize {
    buf.iter().filter(|&&b| b == b'\n').count()
}
