use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use crate::errors::SourceError;

/// Result of one successful pull from a message source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Payload(Vec<u8>),
    /// the source is healthy but had nothing to deliver this time, ask again
    Idle,
    /// the stream has ended and no more payloads will follow
    End,
}

/// Pull interface over a stream of raw payloads, delivered in arrival order.
pub trait MessageSource {
    /// Wait for the next payload. Sources that can go quiet return [`Delivery::Idle`]
    /// after a bounded wait instead of blocking forever.
    fn next_payload(&mut self) -> Result<Delivery, SourceError>;

    /// Human readable name used in logs.
    fn describe(&self) -> String;
}

impl<S: MessageSource + ?Sized> MessageSource for Box<S> {
    fn next_payload(&mut self) -> Result<Delivery, SourceError> { (**self).next_payload() }

    fn describe(&self) -> String { (**self).describe() }
}

/// Replays newline-delimited payloads, e.g. a file captured from the topic.
/// Blank lines are skipped, the stream ends at EOF.
pub struct ReplaySource<R> {
    name:   String,
    reader: R,
    buf:    Vec<u8>,
}

impl ReplaySource<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<ReplaySource<BufReader<File>>> {
        let path = path.as_ref();
        let file = File::open(path)?;
        Ok(ReplaySource::new(path.display().to_string(), BufReader::new(file)))
    }
}

impl<R: BufRead> ReplaySource<R> {
    pub fn new(name: impl Into<String>, reader: R) -> ReplaySource<R> {
        ReplaySource { name: name.into(), reader: reader, buf: Vec::new() }
    }
}

impl<R: BufRead> MessageSource for ReplaySource<R> {
    fn next_payload(&mut self) -> Result<Delivery, SourceError> {
        loop {
            self.buf.clear();
            let read = self
                .reader
                .read_until(b'\n', &mut self.buf)
                .map_err(|err| SourceError::fatal(format!("reading {}: {}", self.name, err)))?;
            if read == 0 {
                return Ok(Delivery::End);
            }

            let line = trim_line_end(&self.buf);
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            return Ok(Delivery::Payload(line.to_vec()));
        }
    }

    fn describe(&self) -> String { format!("replay of {}", self.name) }
}

fn trim_line_end(line: &[u8]) -> &[u8] {
    let mut end = line.len();
    while end > 0 && (line[end - 1] == b'\n' || line[end - 1] == b'\r') {
        end -= 1;
    }
    &line[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn drain<S: MessageSource>(mut source: S) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        while let Delivery::Payload(payload) = source.next_payload().unwrap() {
            out.push(payload);
        }
        out
    }

    #[test]
    fn replays_lines_in_order() {
        let input = "{\"category\":\"cats\"}\r\n\n   \n{\"category\":\"dogs\"}\nnot json";
        let source = ReplaySource::new("memory", Cursor::new(input));
        assert_eq!(
            drain(source),
            vec![
                b"{\"category\":\"cats\"}".to_vec(),
                b"{\"category\":\"dogs\"}".to_vec(),
                b"not json".to_vec(),
            ]
        );
    }

    #[test]
    fn end_of_stream_is_sticky() {
        let mut source = ReplaySource::new("memory", Cursor::new("{}\n"));
        assert_eq!(source.next_payload().unwrap(), Delivery::Payload(b"{}".to_vec()));
        assert_eq!(source.next_payload().unwrap(), Delivery::End);
        assert_eq!(source.next_payload().unwrap(), Delivery::End);
    }

    #[test]
    fn boxed_sources_delegate() {
        let mut source: Box<dyn MessageSource> = Box::new(ReplaySource::new("memory", Cursor::new("a\n")));
        assert_eq!(source.describe(), "replay of memory");
        assert_eq!(source.next_payload().unwrap(), Delivery::Payload(b"a".to_vec()));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(ReplaySource::open("/definitely/not/here.jsonl").is_err());
    }
}
