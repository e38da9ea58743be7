//! Incremental framing of CoT documents out of a byte stream.
//!
//! A network read may carry a partial document, several concatenated
//! documents, or the tail of one and the head of the next. The framer
//! accumulates chunks and yields complete `<event>…</event>` documents by
//! tracking the nesting depth of the `event` element, so a nested `<event>`
//! inside a detail section cannot end a frame early and chunk boundaries
//! never change the output.
//!
//! Bytes that cannot begin a document are discarded up to the next `<event`
//! boundary and reported through [`EventFramer::discarded_bytes`].

use bytes::{Buf, Bytes, BytesMut};
use thiserror::Error;

/// Maximum frame size (10MB)
pub const MAX_FRAME_SIZE: usize = 10 * 1024 * 1024;

const EVENT_OPEN: &[u8] = b"<event";
const EVENT_CLOSE: &[u8] = b"</event";

#[derive(Error, Debug)]
pub enum FrameError {
    /// No document boundary found within the maximum frame size; the
    /// accumulated bytes were dropped and framing resumes at the next
    /// `<event` boundary.
    #[error("frame exceeds maximum size")]
    FrameTooLarge,
}

/// Incremental CoT document framer.
#[derive(Debug, Default)]
pub struct EventFramer {
    buf: BytesMut,
    discarded: u64,
}

impl EventFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk of received bytes.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Bytes buffered but not yet framed.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Total bytes discarded as unframeable so far.
    pub fn discarded_bytes(&self) -> u64 {
        self.discarded
    }

    /// Extract the next complete document, if one is buffered.
    ///
    /// Returns `Ok(None)` when more input is needed. `FrameError` drops the
    /// buffered bytes; the framer stays usable afterwards.
    pub fn next_event(&mut self) -> Result<Option<Bytes>, FrameError> {
        self.align_to_event_start();

        if self.is_aligned() {
            if let Some(end) = self.find_document_end() {
                return Ok(Some(self.buf.split_to(end).freeze()));
            }
        }

        if self.buf.len() > MAX_FRAME_SIZE {
            self.discarded += self.buf.len() as u64;
            self.buf.clear();
            return Err(FrameError::FrameTooLarge);
        }

        Ok(None)
    }

    /// Whether the buffer currently begins at a root `<event` tag.
    fn is_aligned(&self) -> bool {
        self.buf.len() > EVENT_OPEN.len()
            && self.buf.starts_with(EVENT_OPEN)
            && is_name_boundary(self.buf[EVENT_OPEN.len()])
    }

    /// Discard leading bytes until the buffer starts at `<event`, or until
    /// more input is required to decide. Whitespace and prologue constructs
    /// (XML declaration, comments) are skipped without counting as junk.
    fn align_to_event_start(&mut self) {
        loop {
            let ws = self
                .buf
                .iter()
                .take_while(|b| b.is_ascii_whitespace())
                .count();
            if ws > 0 {
                self.buf.advance(ws);
            }
            if self.buf.is_empty() {
                return;
            }

            if self.buf[0] != b'<' {
                // junk up to the next markup character
                let skip = self
                    .buf
                    .iter()
                    .position(|&b| b == b'<')
                    .unwrap_or(self.buf.len());
                self.discarded += skip as u64;
                self.buf.advance(skip);
                if self.buf.is_empty() {
                    return;
                }
            }

            match prologue_len(&self.buf) {
                // incomplete construct, wait for more input
                None => return,
                Some(0) => {}
                Some(n) => {
                    self.buf.advance(n);
                    continue;
                }
            }

            if self.buf.len() <= EVENT_OPEN.len() {
                if EVENT_OPEN.starts_with(&self.buf[..]) {
                    // could still grow into the boundary token
                    return;
                }
            } else if self.is_aligned() {
                return;
            }

            // some other tag; discard its '<' and keep scanning
            self.discarded += 1;
            self.buf.advance(1);
        }
    }

    /// Scan a buffer known to start at `<event` and locate the byte just past
    /// the end of the document, tracking `event` nesting depth.
    fn find_document_end(&self) -> Option<usize> {
        let buf = &self.buf[..];
        let mut depth = 0usize;
        let mut i = 0;

        while i < buf.len() {
            if buf[i] != b'<' {
                i += 1;
                continue;
            }

            if buf[i..].starts_with(b"<!--") {
                match find_from(buf, i + 4, b"-->") {
                    Some(j) => {
                        i = j + 3;
                        continue;
                    }
                    None => return None,
                }
            }
            if buf[i..].starts_with(b"<![CDATA[") {
                match find_from(buf, i + 9, b"]]>") {
                    Some(j) => {
                        i = j + 3;
                        continue;
                    }
                    None => return None,
                }
            }
            if buf[i..].starts_with(b"<?") {
                match find_from(buf, i + 2, b"?>") {
                    Some(j) => {
                        i = j + 2;
                        continue;
                    }
                    None => return None,
                }
            }

            let gt = tag_end(buf, i)?;
            let tag = &buf[i..=gt];

            if is_event_open(tag) {
                if tag[tag.len() - 2] == b'/' {
                    // self-closing: a complete document only as the root
                    if depth == 0 {
                        return Some(gt + 1);
                    }
                } else {
                    depth += 1;
                }
            } else if is_event_close(tag) {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(gt + 1);
                }
            }

            i = gt + 1;
        }

        None
    }
}

/// Length of a prologue construct (XML declaration, processing instruction,
/// or comment) at the start of the buffer. `Some(0)` means the buffer does
/// not start with one; `None` means it might, but more input is needed.
fn prologue_len(buf: &[u8]) -> Option<usize> {
    if buf.starts_with(b"<?") {
        return find_from(buf, 2, b"?>").map(|j| j + 2);
    }
    if buf.starts_with(b"<!--") {
        return find_from(buf, 4, b"-->").map(|j| j + 3);
    }
    if b"<?".starts_with(buf) || b"<!--".starts_with(buf) {
        return None;
    }
    Some(0)
}

fn find_from(buf: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if from >= buf.len() {
        return None;
    }
    buf[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| from + p)
}

/// Find the '>' terminating the tag that starts at `start`, honoring quoted
/// attribute values.
fn tag_end(buf: &[u8], start: usize) -> Option<usize> {
    let mut quote: Option<u8> = None;
    for (j, &b) in buf.iter().enumerate().skip(start + 1) {
        match quote {
            Some(q) => {
                if b == q {
                    quote = None;
                }
            }
            None => match b {
                b'"' | b'\'' => quote = Some(b),
                b'>' => return Some(j),
                _ => {}
            },
        }
    }
    None
}

fn is_name_boundary(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n' | b'>' | b'/')
}

fn is_event_open(tag: &[u8]) -> bool {
    tag.starts_with(EVENT_OPEN) && tag.len() > EVENT_OPEN.len() && is_name_boundary(tag[EVENT_OPEN.len()])
}

fn is_event_close(tag: &[u8]) -> bool {
    tag.starts_with(EVENT_CLOSE)
        && tag.len() > EVENT_CLOSE.len()
        && matches!(tag[EVENT_CLOSE.len()], b'>' | b' ' | b'\t' | b'\r' | b'\n')
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC_A: &str = r#"<event version="2.0" uid="a" type="a-f-G" time="2024-01-15T10:30:00Z" start="2024-01-15T10:30:00Z" stale="2024-01-15T10:35:00Z" how="h-e"><point lat="1" lon="2" hae="3"/></event>"#;
    const DOC_B: &str = r#"<event version="2.0" uid="b" type="a-h-G" time="2024-01-15T10:31:00Z" start="2024-01-15T10:31:00Z" stale="2024-01-15T10:36:00Z" how="m-g"><point lat="4" lon="5" hae="6"/><detail><remarks>two</remarks></detail></event>"#;

    fn collect(framer: &mut EventFramer) -> Vec<Bytes> {
        let mut out = Vec::new();
        while let Ok(Some(frame)) = framer.next_event() {
            out.push(frame);
        }
        out
    }

    #[test]
    fn test_single_document() {
        let mut framer = EventFramer::new();
        framer.push(DOC_A.as_bytes());
        let frames = collect(&mut framer);
        assert_eq!(frames.len(), 1);
        assert_eq!(&frames[0][..], DOC_A.as_bytes());
        assert_eq!(framer.pending(), 0);
    }

    #[test]
    fn test_concatenated_documents() {
        let mut framer = EventFramer::new();
        let stream = format!("{DOC_A}\n{DOC_B}");
        framer.push(stream.as_bytes());
        let frames = collect(&mut framer);
        assert_eq!(frames.len(), 2);
        assert_eq!(&frames[0][..], DOC_A.as_bytes());
        assert_eq!(&frames[1][..], DOC_B.as_bytes());
    }

    #[test]
    fn test_partial_document_waits() {
        let mut framer = EventFramer::new();
        let (head, tail) = DOC_A.split_at(50);
        framer.push(head.as_bytes());
        assert!(framer.next_event().unwrap().is_none());
        framer.push(tail.as_bytes());
        let frame = framer.next_event().unwrap().expect("complete frame");
        assert_eq!(&frame[..], DOC_A.as_bytes());
    }

    #[test]
    fn test_chunk_boundary_independence() {
        let stream = format!("{DOC_A}{DOC_B}{DOC_A}");

        let mut whole = EventFramer::new();
        whole.push(stream.as_bytes());
        let expected = collect(&mut whole);
        assert_eq!(expected.len(), 3);

        // byte-at-a-time
        let mut trickle = EventFramer::new();
        let mut got = Vec::new();
        for b in stream.as_bytes() {
            trickle.push(std::slice::from_ref(b));
            got.extend(collect(&mut trickle));
        }
        assert_eq!(got, expected);

        // every split point of a two-chunk feed
        for split in 0..stream.len() {
            let mut framer = EventFramer::new();
            framer.push(&stream.as_bytes()[..split]);
            let mut got = collect(&mut framer);
            framer.push(&stream.as_bytes()[split..]);
            got.extend(collect(&mut framer));
            assert_eq!(got, expected, "split at {split}");
        }
    }

    #[test]
    fn test_garbage_discarded_to_next_boundary() {
        let mut framer = EventFramer::new();
        let stream = format!("%%% not xml %%%{DOC_A}");
        framer.push(stream.as_bytes());
        let frames = collect(&mut framer);
        assert_eq!(frames.len(), 1);
        assert_eq!(&frames[0][..], DOC_A.as_bytes());
        assert_eq!(framer.discarded_bytes(), 15);
    }

    #[test]
    fn test_xml_declaration_skipped() {
        let mut framer = EventFramer::new();
        let stream = format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{DOC_A}");
        framer.push(stream.as_bytes());
        let frames = collect(&mut framer);
        assert_eq!(frames.len(), 1);
        assert_eq!(&frames[0][..], DOC_A.as_bytes());
        // the declaration is prologue, not junk
        assert_eq!(framer.discarded_bytes(), 0);
    }

    #[test]
    fn test_nested_event_element() {
        let doc = r#"<event version="2.0" uid="outer" type="t" time="2024-01-15T10:30:00Z" start="2024-01-15T10:30:00Z" stale="2024-01-15T10:35:00Z" how="m-g"><point lat="1" lon="2" hae="3"/><detail><event uid="inner"><point lat="9" lon="9" hae="9"/></event></detail></event>"#;
        let mut framer = EventFramer::new();
        framer.push(doc.as_bytes());
        let frames = collect(&mut framer);
        assert_eq!(frames.len(), 1);
        assert_eq!(&frames[0][..], doc.as_bytes());
    }

    #[test]
    fn test_self_closing_root() {
        let doc = r#"<event uid="ping" type="t-x-c-t"/>"#;
        let mut framer = EventFramer::new();
        framer.push(doc.as_bytes());
        let frames = collect(&mut framer);
        assert_eq!(frames.len(), 1);
        assert_eq!(&frames[0][..], doc.as_bytes());
    }

    #[test]
    fn test_attribute_containing_gt() {
        let doc = r#"<event uid="a>b" type="t"><point lat="1" lon="2" hae="3"/></event>"#;
        let mut framer = EventFramer::new();
        framer.push(doc.as_bytes());
        let frames = collect(&mut framer);
        assert_eq!(frames.len(), 1);
        assert_eq!(&frames[0][..], doc.as_bytes());
    }

    #[test]
    fn test_token_split_across_chunks() {
        let mut framer = EventFramer::new();
        framer.push(b"junk junk <ev");
        assert!(framer.next_event().unwrap().is_none());
        framer.push(b"ent uid=\"x\" type=\"t\"/>");
        let frame = framer.next_event().unwrap().expect("complete frame");
        assert_eq!(&frame[..], br#"<event uid="x" type="t"/>"#);
        assert_eq!(framer.discarded_bytes(), 10);
    }

    #[test]
    fn test_oversize_frame_dropped_and_recovers() {
        let mut framer = EventFramer::new();
        framer.push(b"<event uid=\"huge\" type=\"t\">");
        let filler = vec![b'a'; MAX_FRAME_SIZE];
        framer.push(&filler);
        assert!(matches!(framer.next_event(), Err(FrameError::FrameTooLarge)));

        // still usable afterwards
        framer.push(DOC_A.as_bytes());
        let frame = framer.next_event().unwrap().expect("recovered frame");
        assert_eq!(&frame[..], DOC_A.as_bytes());
    }
}
