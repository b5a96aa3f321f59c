// Document Segmenter
// Splits a document into bounded-size sections for per-section classification

use crate::models::Section;
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SegmentError {
    #[error("document contains no analyzable text")]
    EmptyDocument,
    #[error("max section length must be greater than zero")]
    InvalidSectionLength,
}

static PARAGRAPH_RE: OnceLock<Regex> = OnceLock::new();

fn paragraph_re() -> &'static Regex {
    // Blank lines (one or more consecutive empty lines) separate paragraphs.
    PARAGRAPH_RE.get_or_init(|| Regex::new(r"\n[ \t]*\n[\s]*").unwrap())
}

/// Split `text` into sections of at most `max_section_length` characters.
///
/// Boundaries prefer paragraphs (blank lines), then sentences, and fall back
/// to hard character cuts for a single sentence longer than the limit.
/// Sections partition the text exactly: offsets are contiguous and
/// concatenating all section texts reconstructs the input byte for byte
/// (separators stay attached to the preceding sentence).
pub fn segment(text: &str, max_section_length: usize) -> Result<Vec<Section>, SegmentError> {
    if max_section_length == 0 {
        return Err(SegmentError::InvalidSectionLength);
    }
    if text.trim().is_empty() {
        return Err(SegmentError::EmptyDocument);
    }

    // Atoms are sentence-level spans that never cross a paragraph separator.
    let mut atoms: Vec<(usize, usize)> = Vec::new();
    for (start, end) in paragraph_spans(text) {
        sentence_spans_in(text, start, end, &mut atoms);
    }

    // Cut any atom longer than the limit at character boundaries.
    let mut bounded: Vec<(usize, usize)> = Vec::new();
    for (start, end) in atoms {
        if text[start..end].chars().count() > max_section_length {
            hard_cut(text, start, end, max_section_length, &mut bounded);
        } else {
            bounded.push((start, end));
        }
    }

    // Greedy packing of atoms into sections up to the character budget.
    let mut sections: Vec<Section> = Vec::new();
    let mut cur_start: Option<usize> = None;
    let mut cur_end = 0usize;
    let mut cur_chars = 0usize;

    for (start, end) in bounded {
        let atom_chars = text[start..end].chars().count();
        match cur_start {
            Some(_) if cur_chars + atom_chars <= max_section_length => {
                cur_end = end;
                cur_chars += atom_chars;
            }
            Some(s) => {
                push_section(text, &mut sections, s, cur_end);
                cur_start = Some(start);
                cur_end = end;
                cur_chars = atom_chars;
            }
            None => {
                cur_start = Some(start);
                cur_end = end;
                cur_chars = atom_chars;
            }
        }
    }
    if let Some(s) = cur_start {
        push_section(text, &mut sections, s, cur_end);
    }

    debug!(
        "[SEGMENTER] split {} chars into {} sections (max={})",
        text.chars().count(),
        sections.len(),
        max_section_length
    );

    Ok(sections)
}

fn push_section(text: &str, sections: &mut Vec<Section>, start: usize, end: usize) {
    sections.push(Section {
        index: sections.len(),
        start,
        end,
        text: text[start..end].to_string(),
    });
}

/// Paragraph spans partition the whole text; each paragraph carries its own
/// trailing separator so nothing is lost between spans.
fn paragraph_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut cursor = 0usize;

    for m in paragraph_re().find_iter(text) {
        if cursor < m.end() {
            spans.push((cursor, m.end()));
            cursor = m.end();
        }
    }
    if cursor < text.len() {
        spans.push((cursor, text.len()));
    }
    if spans.is_empty() {
        spans.push((0, text.len()));
    }
    spans
}

/// Sentence spans within `[start, end)`, relative to the whole text.
/// A sentence ends at terminal punctuation plus any following whitespace;
/// the remainder of the range becomes a final span.
fn sentence_spans_in(text: &str, start: usize, end: usize, out: &mut Vec<(usize, usize)>) {
    let slice = &text[start..end];
    let mut sent_start = 0usize;
    let mut iter = slice.char_indices().peekable();

    while let Some((idx, ch)) = iter.next() {
        if !matches!(ch, '。' | '！' | '？' | '.' | '!' | '?') {
            continue;
        }
        // Decimal numbers are not sentence boundaries.
        if ch == '.' {
            let prev_digit = slice[..idx]
                .chars()
                .next_back()
                .map(|c| c.is_ascii_digit())
                .unwrap_or(false);
            let next_digit = iter
                .peek()
                .map(|&(_, c)| c.is_ascii_digit())
                .unwrap_or(false);
            if prev_digit && next_digit {
                continue;
            }
        }

        let mut sent_end = idx + ch.len_utf8();
        while let Some(&(nidx, nch)) = iter.peek() {
            if nch.is_whitespace() {
                sent_end = nidx + nch.len_utf8();
                iter.next();
            } else {
                break;
            }
        }
        out.push((start + sent_start, start + sent_end));
        sent_start = sent_end;
    }

    if sent_start < slice.len() {
        out.push((start + sent_start, end));
    }
}

/// Cut an oversized span into chunks of at most `max_chars` characters,
/// always on UTF-8 character boundaries.
fn hard_cut(
    text: &str,
    start: usize,
    end: usize,
    max_chars: usize,
    out: &mut Vec<(usize, usize)>,
) {
    let mut chunk_start = start;
    let mut count = 0usize;

    for (idx, _) in text[start..end].char_indices() {
        if count == max_chars {
            out.push((chunk_start, start + idx));
            chunk_start = start + idx;
            count = 0;
        }
        count += 1;
    }
    if chunk_start < end {
        out.push((chunk_start, end));
    }
}
