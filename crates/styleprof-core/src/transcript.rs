//! Chunked interview transcript model and markdown parser.
//!
//! Transcripts arrive as markdown with one block per chunk:
//!
//! ```text
//! ## [Chunk 6]
//! **Timestamp**: 00:05:10 - 00:06:02
//! > Speaker 1: What kept you going?
//! > Speaker 2: Honestly, I just refused to give up.
//! ```
//!
//! Only lines from the configured speaker are kept. Chunk ids are derived
//! from the header ordinal (`chunk_06`) and are unique within a transcript.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::TranscriptError;

static CHUNK_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^##\s*\[\s*Chunk\s*(\d+)?[^\]]*\]").expect("chunk header regex is valid")
});

static TIMESTAMP_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\*\*Timestamp\*\*:\s*(\S+)\s*(?:-|–|to)\s*(\S+)")
        .expect("timestamp regex is valid")
});

/// Start and end offsets of a chunk, in milliseconds from the start of the
/// recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampRange {
    pub start_ms: u64,
    pub end_ms: u64,
}

impl TimestampRange {
    /// Parse `"00:05:10 - 00:06:02"`-style bounds. Returns `None` when either
    /// side is malformed or the range runs backwards.
    #[must_use]
    pub fn parse(start: &str, end: &str) -> Option<Self> {
        let start_ms = parse_clock(start)?;
        let end_ms = parse_clock(end)?;
        (end_ms >= start_ms).then_some(Self { start_ms, end_ms })
    }
}

/// `HH:MM:SS`, `MM:SS`, or either with a fractional `.mmm` / `,mmm` suffix.
fn parse_clock(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    let (clock, frac) = match raw.split_once(['.', ',']) {
        Some((clock, frac)) => (clock, Some(frac)),
        None => (raw, None),
    };

    let parts: Vec<u64> = clock
        .split(':')
        .map(|p| p.parse::<u64>().ok())
        .collect::<Option<_>>()?;

    let seconds = match parts.as_slice() {
        [h, m, s] if *m < 60 && *s < 60 => h * 3600 + m * 60 + s,
        [m, s] if *s < 60 => m * 60 + s,
        _ => return None,
    };

    let millis = match frac {
        None => 0,
        Some(f) if !f.is_empty() && f.len() <= 3 && f.bytes().all(|b| b.is_ascii_digit()) => {
            // "5" means 500ms, "05" means 50ms.
            let padded = format!("{f:0<3}");
            padded.parse::<u64>().ok()?
        }
        Some(_) => return None,
    };

    Some(seconds * 1000 + millis)
}

/// One timestamped narrative unit of a transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptChunk {
    pub id: String,
    pub timestamp_range: Option<TimestampRange>,
    /// Speaker-filtered, whitespace-normalized text. May be empty when the
    /// chunk held no lines from the analysed speaker.
    pub text: String,
}

/// A parsed transcript: chunks in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTranscript {
    chunks: Vec<TranscriptChunk>,
}

impl ParsedTranscript {
    #[must_use]
    pub fn chunks(&self) -> &[TranscriptChunk] {
        &self.chunks
    }

    #[must_use]
    pub fn into_chunks(self) -> Vec<TranscriptChunk> {
        self.chunks
    }

    /// The speaker-filtered transcript as a single blob, one line per
    /// non-empty chunk.
    #[must_use]
    pub fn clean_text(&self) -> String {
        self.chunks
            .iter()
            .map(|c| c.text.as_str())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Parse chunked transcript markdown, keeping only `speaker_label`'s lines.
///
/// # Errors
///
/// Returns [`TranscriptError::NoChunks`] when the document contains no chunk
/// header at all.
pub fn parse_transcript(
    markdown: &str,
    speaker_label: &str,
) -> Result<ParsedTranscript, TranscriptError> {
    let speaker_prefix = format!("> {}:", speaker_label.trim());
    let mut chunks: Vec<TranscriptChunk> = Vec::new();
    let mut seen_ids: HashSet<String> = HashSet::new();
    let mut current: Option<ChunkBuilder> = None;

    for line in markdown.lines() {
        let line = line.trim_end();

        if let Some(caps) = CHUNK_HEADER.captures(line) {
            if let Some(done) = current.take() {
                chunks.push(done.finish());
            }
            let ordinal = chunks.len() + 1;
            let number = caps
                .get(1)
                .and_then(|m| m.as_str().parse::<usize>().ok())
                .unwrap_or(ordinal);
            let mut id = format!("chunk_{number:02}");
            if !seen_ids.insert(id.clone()) {
                id = format!("chunk_{number:02}_{ordinal}");
                seen_ids.insert(id.clone());
            }
            current = Some(ChunkBuilder::new(id));
            continue;
        }

        let Some(builder) = current.as_mut() else {
            continue;
        };

        if let Some(caps) = TIMESTAMP_LINE.captures(line) {
            builder.timestamp_range = TimestampRange::parse(&caps[1], &caps[2]);
        } else if let Some(spoken) = line.trim_start().strip_prefix(&speaker_prefix) {
            builder.lines.push(spoken.trim().to_string());
        }
    }

    if let Some(done) = current.take() {
        chunks.push(done.finish());
    }

    if chunks.is_empty() {
        return Err(TranscriptError::NoChunks);
    }

    Ok(ParsedTranscript { chunks })
}

struct ChunkBuilder {
    id: String,
    timestamp_range: Option<TimestampRange>,
    lines: Vec<String>,
}

impl ChunkBuilder {
    fn new(id: String) -> Self {
        Self {
            id,
            timestamp_range: None,
            lines: Vec::new(),
        }
    }

    fn finish(self) -> TranscriptChunk {
        let text = self
            .lines
            .iter()
            .flat_map(|l| l.split_whitespace())
            .collect::<Vec<_>>()
            .join(" ");
        TranscriptChunk {
            id: self.id,
            timestamp_range: self.timestamp_range,
            text,
        }
    }
}
