use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{trace, warn};

use super::request::SearchRequest;
use crate::config::EncodingMode;
use crate::errors::{SearchError, SearchResult};
use crate::results::SearchHit;

const BUFFER_CAPACITY: usize = 65536;

/// Opening delimiter placed before each marked occurrence of the key
pub const MATCH_OPEN: &str = "**";
/// Closing delimiter placed after each marked occurrence of the key
pub const MATCH_CLOSE: &str = "**";
/// Elision marker at both ends of every snippet
pub const ELLIPSIS: &str = "...";

/// Finds the lines of a file that contain a literal key
#[derive(Debug, Clone)]
pub struct LineScanner {
    key: String,
    width: usize,
    encoding_mode: EncodingMode,
}

impl LineScanner {
    /// Creates a scanner; `width` is the snippet window in tokens and is at least 1
    pub fn new(key: impl Into<String>, width: usize, encoding_mode: EncodingMode) -> Self {
        Self {
            key: key.into(),
            width: width.max(1),
            encoding_mode,
        }
    }

    pub fn from_request(request: &SearchRequest) -> Self {
        Self::new(
            request.key(),
            request.snippet_width(),
            request.encoding_mode(),
        )
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Opens `path` and returns a lazy sequence over its matching lines.
    ///
    /// The sequence ends after the first error; hits yielded before it stay valid.
    pub fn scan(&self, path: &Path) -> SearchResult<LineHits<'_, BufReader<File>>> {
        trace!("Scanning file: {}", path.display());
        let file = File::open(path).map_err(|e| SearchError::from_io(path, e))?;
        let reader = BufReader::with_capacity(BUFFER_CAPACITY, file);
        Ok(self.scan_reader(path, reader))
    }

    /// Scans already-open content, attributing hits to `path`
    pub fn scan_reader<R: BufRead>(&self, path: &Path, reader: R) -> LineHits<'_, R> {
        LineHits {
            scanner: self,
            reader,
            path: path.to_path_buf(),
            line_number: 0,
            buf: Vec::with_capacity(256),
            replaced_warned: false,
            done: false,
        }
    }

    /// Scans a whole file. A file that fails part way through yields no hits at all.
    pub fn scan_file(&self, path: &Path) -> SearchResult<Vec<SearchHit>> {
        self.scan(path)?.collect()
    }

    /// Builds the snippet for `line`, or `None` when the key does not occur in it.
    ///
    /// The window holds up to `width` whitespace-delimited tokens centred on the token
    /// containing the first occurrence. Near either end of the line the window is
    /// clipped, not shifted, so it can be asymmetric. The first occurrence is always
    /// marked, cut to the window when it runs past either edge; later occurrences are
    /// marked when they lie fully inside the window.
    pub fn snippet(&self, line: &str) -> Option<String> {
        let pos = line.find(&self.key)?;
        let spans = token_spans(line);
        if spans.is_empty() {
            // Whitespace-only key on a whitespace-only line
            return Some(format!(
                "{}{}{}{}{}",
                ELLIPSIS, MATCH_OPEN, self.key, MATCH_CLOSE, ELLIPSIS
            ));
        }

        let center = spans
            .iter()
            .position(|&(_, end)| end > pos)
            .unwrap_or(spans.len() - 1);
        let before = self.width / 2;
        let after = self.width - 1 - before;
        let first = center.saturating_sub(before);
        let last = (center + after).min(spans.len() - 1);

        Some(mark_window(
            line,
            &self.key,
            pos,
            (spans[first].0, spans[last].1),
        ))
    }

    fn decode(&self, bytes: Vec<u8>, path: &Path, line_number: usize) -> SearchResult<String> {
        match self.encoding_mode {
            EncodingMode::FailFast => String::from_utf8(bytes)
                .map_err(|e| SearchError::encoding_error(path, line_number, e)),
            EncodingMode::Lossy => match String::from_utf8(bytes) {
                Ok(line) => Ok(line),
                Err(e) => Ok(String::from_utf8_lossy(e.as_bytes()).into_owned()),
            },
        }
    }
}

/// Byte ranges of the whitespace-delimited tokens of `line`
fn token_spans(line: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = None;
    for (i, c) in line.char_indices() {
        if c.is_whitespace() {
            if let Some(s) = start.take() {
                spans.push((s, i));
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        spans.push((s, line.len()));
    }
    spans
}

/// Renders `line[window]` between ellipses with the key marked.
///
/// `first` is the byte offset of the first occurrence on the line.
fn mark_window(line: &str, key: &str, first: usize, window: (usize, usize)) -> String {
    let (start, end) = window;
    let mut marks = Vec::new();

    let seed = (first.max(start), (first + key.len()).min(end));
    let mut from = start;
    if seed.0 < seed.1 {
        marks.push(seed);
        from = seed.1;
    }
    while !key.is_empty() {
        let Some(i) = line[from..end].find(key) else {
            break;
        };
        let at = from + i;
        marks.push((at, at + key.len()));
        from = at + key.len();
    }

    let marker_len = MATCH_OPEN.len() + MATCH_CLOSE.len();
    let mut out =
        String::with_capacity(end - start + 2 * ELLIPSIS.len() + (marks.len() + 1) * marker_len);
    out.push_str(ELLIPSIS);
    if seed.0 >= seed.1 && first < start {
        // Whitespace-only key sitting just outside the tokens
        push_marked(&mut out, key);
    }
    let mut cursor = start;
    for (s, e) in marks {
        out.push_str(&line[cursor..s]);
        push_marked(&mut out, &line[s..e]);
        cursor = e;
    }
    out.push_str(&line[cursor..end]);
    if seed.0 >= seed.1 && first >= end {
        push_marked(&mut out, key);
    }
    out.push_str(ELLIPSIS);
    out
}

fn push_marked(out: &mut String, text: &str) {
    out.push_str(MATCH_OPEN);
    out.push_str(text);
    out.push_str(MATCH_CLOSE);
}

/// Lazy sequence of the hits in one file, in ascending line order
pub struct LineHits<'a, R> {
    scanner: &'a LineScanner,
    reader: R,
    path: PathBuf,
    line_number: usize,
    buf: Vec<u8>,
    replaced_warned: bool,
    done: bool,
}

impl<R: BufRead> Iterator for LineHits<'_, R> {
    type Item = SearchResult<SearchHit>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => self.done = true,
                Ok(_) => {
                    self.line_number += 1;
                    if self.buf.last() == Some(&b'\n') {
                        self.buf.pop();
                        if self.buf.last() == Some(&b'\r') {
                            self.buf.pop();
                        }
                    }

                    let bytes = std::mem::take(&mut self.buf);
                    let was_valid = std::str::from_utf8(&bytes).is_ok();
                    let line = match self.scanner.decode(bytes, &self.path, self.line_number) {
                        Ok(line) => line,
                        Err(e) => {
                            self.done = true;
                            return Some(Err(e));
                        }
                    };
                    if !was_valid && !self.replaced_warned {
                        warn!("Invalid UTF-8 replaced in file: {}", self.path.display());
                        self.replaced_warned = true;
                    }

                    let snippet = self.scanner.snippet(&line);
                    self.buf = line.into_bytes();

                    if let Some(snippet) = snippet {
                        trace!(
                            "Found match at {}:{}",
                            self.path.display(),
                            self.line_number
                        );
                        return Some(Ok(SearchHit {
                            file_path: self.path.clone(),
                            line_number: self.line_number,
                            snippet,
                        }));
                    }
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(SearchError::from_io(&self.path, e)));
                }
            }
        }
        None
    }
}
