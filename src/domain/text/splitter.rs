use super::model::{Chunk, SourcePosition};
use regex::Regex;
use std::num::NonZeroUsize;
use std::sync::OnceLock;

/// Sentence terminators (latin ones need trailing whitespace), blank lines, and form feeds.
const BOUNDARY_PATTERN: &str =
    r#"[.!?]+["'”’»)\]]*\s+|[。！？]+["'”’」』)\]]*\s*|\s*\n[ \t\r]*\n\s*|\s*\x0c\s*"#;

/// A word together with the whitespace around it.
const WORD_PATTERN: &str = r"\s*\S+\s*";

const TERMINATORS: &[char] = &['.', '!', '?', '。', '！', '？'];
const CLOSERS: &[char] = &['"', '\'', '”', '’', '»', ')', ']', '」', '』'];

fn boundary_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(BOUNDARY_PATTERN).expect("boundary pattern is valid"))
}

fn word_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(WORD_PATTERN).expect("word pattern is valid"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Break {
    None,
    Paragraph,
    Page,
}

/// Contiguous byte span of the source. Segments tile the source without gaps.
#[derive(Debug, Clone, Copy)]
struct Segment {
    start: usize,
    end: usize,
    sentence: bool,
    brk: Break,
}

/// Splits text into chunks of at most `max_chars` spoken characters.
///
/// Cuts happen at sentence ends first, then between words, then between characters. A
/// complete sentence is never cut: if it alone exceeds the limit it becomes one oversized
/// chunk. Chunks never straddle a paragraph or page break.
#[derive(Debug, Clone)]
pub struct UnitSplitter {
    max_chars: usize,
}

impl UnitSplitter {
    pub fn new(max_chars: NonZeroUsize) -> Self {
        Self {
            max_chars: max_chars.get(),
        }
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    pub fn split(&self, text: &str) -> Vec<Chunk> {
        if text.is_empty() {
            return Vec::new();
        }

        let segments = self.expand_fragments(text, segment(text));
        let mut builder = ChunkBuilder::new(text, self.max_chars);
        let mut position = SourcePosition {
            page: 1,
            paragraph: 1,
        };

        for seg in segments {
            builder.push(seg, position);
            match seg.brk {
                Break::None => {}
                Break::Paragraph => {
                    if builder.end_paragraph() {
                        position.paragraph += 1;
                    }
                }
                Break::Page => {
                    if builder.end_paragraph() {
                        position.paragraph += 1;
                    }
                    position.page += 1;
                }
            }
        }

        let chunks = builder.finish();
        tracing::debug!(
            text_length = text.len(),
            chunk_count = chunks.len(),
            max_chars = self.max_chars,
            "Text split into chunks"
        );
        chunks
    }

    /// Replace oversized non-sentence segments (headings, run-on text) with word-sized pieces.
    fn expand_fragments(&self, text: &str, segments: Vec<Segment>) -> Vec<Segment> {
        let mut expanded = Vec::with_capacity(segments.len());

        for seg in segments {
            if seg.sentence || spoken_len(&text[seg.start..seg.end]) <= self.max_chars {
                expanded.push(seg);
                continue;
            }

            let pieces = split_words(text, seg.start, seg.end, self.max_chars);
            let last = pieces.len().saturating_sub(1);
            for (i, (start, end)) in pieces.into_iter().enumerate() {
                expanded.push(Segment {
                    start,
                    end,
                    sentence: false,
                    brk: if i == last { seg.brk } else { Break::None },
                });
            }
        }

        expanded
    }
}

/// Cut `text` into pieces of at most `max_chars` spoken characters, for providers with a hard
/// request limit. Pieces are packed at sentence ends like `UnitSplitter::split`, but a sentence
/// over the limit is cut between words instead of kept whole. Concatenating the pieces yields
/// `text` again.
pub fn split_within(text: &str, max_chars: usize) -> Vec<&str> {
    let max = max_chars.max(1);
    if spoken_len(text) <= max {
        return vec![text];
    }

    let mut pieces = Vec::new();
    let mut open: Option<(usize, usize)> = None;

    for seg in segment(text) {
        let spans = if spoken_len(&text[seg.start..seg.end]) <= max {
            vec![(seg.start, seg.end)]
        } else {
            split_words(text, seg.start, seg.end, max)
        };

        for (start, end) in spans {
            open = match open {
                Some((open_start, _)) if spoken_len(&text[open_start..end]) <= max => {
                    Some((open_start, end))
                }
                Some(span) => {
                    pieces.push(span);
                    Some((start, end))
                }
                None => Some((start, end)),
            };
        }
    }
    if let Some(span) = open {
        pieces.push(span);
    }

    pieces.into_iter().map(|(start, end)| &text[start..end]).collect()
}

fn spoken_len(text: &str) -> usize {
    text.trim().chars().count()
}

fn ends_sentence(piece: &str) -> bool {
    piece
        .trim_end()
        .trim_end_matches(CLOSERS)
        .ends_with(TERMINATORS)
}

fn segment(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut last = 0;

    for m in boundary_pattern().find_iter(text) {
        let separator = m.as_str();
        let brk = if separator.contains('\x0c') {
            Break::Page
        } else if separator.matches('\n').count() >= 2 {
            Break::Paragraph
        } else {
            Break::None
        };

        segments.push(Segment {
            start: last,
            end: m.end(),
            sentence: ends_sentence(&text[last..m.end()]),
            brk,
        });
        last = m.end();
    }

    if last < text.len() {
        segments.push(Segment {
            start: last,
            end: text.len(),
            sentence: ends_sentence(&text[last..]),
            brk: Break::None,
        });
    }

    segments
}

/// Greedily pack words into spans of at most `max` spoken characters. A single word longer
/// than `max` is cut at character boundaries.
fn split_words(text: &str, start: usize, end: usize, max: usize) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut open: Option<usize> = None;
    let mut open_end = start;

    for word in word_pattern().find_iter(&text[start..end]) {
        let word_start = start + word.start();
        let word_end = start + word.end();

        if let Some(open_start) = open {
            if spoken_len(&text[open_start..word_end]) <= max {
                open_end = word_end;
                continue;
            }
            spans.push((open_start, open_end));
            open = None;
        }

        if spoken_len(&text[word_start..word_end]) <= max {
            open = Some(word_start);
            open_end = word_end;
        } else {
            spans.extend(split_chars(text, word_start, word_end, max));
        }
    }

    if let Some(open_start) = open {
        spans.push((open_start, open_end));
    }

    // Whitespace the word pattern did not cover stays attached to the neighbouring span.
    if spans.is_empty() {
        spans.push((start, end));
    } else {
        let last = spans.len() - 1;
        spans[0].0 = start;
        spans[last].1 = end;
    }

    spans
}

fn split_chars(text: &str, start: usize, end: usize, max: usize) -> Vec<(usize, usize)> {
    let span = &text[start..end];
    let content_start = start + (span.len() - span.trim_start().len());
    let content_end = start + span.trim_end().len();

    let mut pieces = Vec::new();
    let mut piece_start = start;
    let mut count = 0;

    for (offset, _) in text[content_start..content_end].char_indices() {
        if count == max {
            let cut = content_start + offset;
            pieces.push((piece_start, cut));
            piece_start = cut;
            count = 0;
        }
        count += 1;
    }
    pieces.push((piece_start, end));

    pieces
}

struct ChunkBuilder<'a> {
    text: &'a str,
    max_chars: usize,
    chunks: Vec<Chunk>,
    open: Option<(usize, usize)>,
    open_position: SourcePosition,
    paragraph_has_content: bool,
}

impl<'a> ChunkBuilder<'a> {
    fn new(text: &'a str, max_chars: usize) -> Self {
        Self {
            text,
            max_chars,
            chunks: Vec::new(),
            open: None,
            open_position: SourcePosition {
                page: 1,
                paragraph: 1,
            },
            paragraph_has_content: false,
        }
    }

    fn push(&mut self, seg: Segment, position: SourcePosition) {
        let seg_has_content = spoken_len(&self.text[seg.start..seg.end]) > 0;
        if seg_has_content {
            self.paragraph_has_content = true;
        }

        match self.open {
            None => {
                self.open = Some((seg.start, seg.end));
                self.open_position = position;
            }
            Some((start, end)) => {
                let open_blank = spoken_len(&self.text[start..end]) == 0;
                if open_blank {
                    // Leading whitespace is carried into the first chunk that has content.
                    self.open = Some((start, seg.end));
                    self.open_position = position;
                } else if spoken_len(&self.text[start..seg.end]) <= self.max_chars {
                    self.open = Some((start, seg.end));
                } else {
                    self.flush();
                    self.open = Some((seg.start, seg.end));
                    self.open_position = position;
                }
            }
        }
    }

    /// Close the current paragraph. Returns whether it contained any spoken text.
    fn end_paragraph(&mut self) -> bool {
        if let Some((start, end)) = self.open {
            if spoken_len(&self.text[start..end]) > 0 {
                self.flush();
            }
        }
        std::mem::replace(&mut self.paragraph_has_content, false)
    }

    fn flush(&mut self) {
        if let Some((start, end)) = self.open.take() {
            let text = &self.text[start..end];
            self.chunks.push(Chunk {
                index: self.chunks.len(),
                text: text.to_string(),
                byte_offset: start,
                char_len: text.chars().count(),
                position: Some(self.open_position),
            });
        }
    }

    fn finish(mut self) -> Vec<Chunk> {
        if let Some((start, end)) = self.open {
            let blank = spoken_len(&self.text[start..end]) == 0;
            match self.chunks.last_mut() {
                Some(last) if blank => {
                    let tail = &self.text[start..end];
                    last.text.push_str(tail);
                    last.char_len += tail.chars().count();
                    self.open = None;
                }
                _ => self.flush(),
            }
        }
        self.chunks
    }
}
