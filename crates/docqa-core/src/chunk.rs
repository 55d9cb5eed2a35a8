//! Recursive character text splitter.
//!
//! Splits document text into [`Chunk`]s of at most `chunk_size` characters.
//! The splitter tries a list of separators in order (`"\n\n"`, `"\n"`,
//! `" "`, `""`) and uses the first one that occurs in the text. Pieces
//! shorter than `chunk_size` are greedily merged back together; a piece
//! that is still too long is split again with the remaining, finer
//! separators.
//!
//! Separators are kept at the start of the piece that follows them, so
//! every chunk is a contiguous (trimmed) slice of the source text. That
//! makes line locations exact: they are computed from byte offsets rather
//! than by searching for the chunk text.
//!
//! Lengths are measured in `char`s.

use std::collections::VecDeque;
use std::ops::Range;

use anyhow::{bail, Result};

use crate::models::{Chunk, ChunkLocation, Document, LineSpan};

/// Default maximum chunk length, in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Separators tried from coarsest to finest.
pub const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Fixed-size recursive splitter.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: 0,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl TextSplitter {
    /// Creates a splitter with the default separators.
    ///
    /// # Errors
    ///
    /// `chunk_size` must be > 0 and `chunk_overlap` must be smaller than it.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            bail!("chunk_size must be > 0");
        }
        if chunk_overlap >= chunk_size {
            bail!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap,
                chunk_size
            );
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
            ..Self::default()
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Splits raw text into trimmed, non-empty pieces.
    pub fn split_text<'a>(&self, text: &'a str) -> Vec<&'a str> {
        self.split_ranges(text)
            .into_iter()
            .map(|r| &text[r])
            .collect()
    }

    /// Splits a document into chunks with 0-based ordinals and line spans.
    ///
    /// Empty or whitespace-only documents produce no chunks.
    pub fn split_document(&self, doc: &Document) -> Vec<Chunk> {
        let text = doc.text.as_str();
        self.split_ranges(text)
            .into_iter()
            .enumerate()
            .map(|(ordinal, range)| {
                let from = 1 + count_newlines(&text[..range.start]);
                let to = from + count_newlines(&text[range.clone()]);
                Chunk {
                    source_path: doc.path.clone(),
                    ordinal,
                    text: text[range].to_string(),
                    loc: ChunkLocation {
                        lines: LineSpan { from, to },
                    },
                }
            })
            .collect()
    }

    fn split_ranges(&self, text: &str) -> Vec<Range<usize>> {
        let mut out = Vec::new();
        let separators: Vec<&str> = self.separators.iter().map(String::as_str).collect();
        self.split_recursive(text, 0..text.len(), &separators, &mut out);
        out
    }

    fn split_recursive(
        &self,
        text: &str,
        range: Range<usize>,
        separators: &[&str],
        out: &mut Vec<Range<usize>>,
    ) {
        let segment = &text[range.clone()];

        // Pick the first separator present; "" always matches.
        let mut separator = separators.last().copied().unwrap_or("");
        let mut finer: &[&str] = &[];
        for (i, sep) in separators.iter().enumerate() {
            if sep.is_empty() {
                separator = sep;
                break;
            }
            if segment.contains(sep) {
                separator = sep;
                finer = &separators[i + 1..];
                break;
            }
        }

        let mut good: Vec<Range<usize>> = Vec::new();
        for piece in split_keep_separator(segment, separator, range.start) {
            if char_len(text, &piece) < self.chunk_size {
                good.push(piece);
                continue;
            }
            if !good.is_empty() {
                self.merge(text, &good, out);
                good.clear();
            }
            if finer.is_empty() {
                if let Some(trimmed) = trim_range(text, piece) {
                    out.push(trimmed);
                }
            } else {
                self.split_recursive(text, piece, finer, out);
            }
        }
        if !good.is_empty() {
            self.merge(text, &good, out);
        }
    }

    /// Greedily merges consecutive pieces into chunks of at most
    /// `chunk_size` chars, carrying up to `chunk_overlap` chars forward.
    fn merge(&self, text: &str, pieces: &[Range<usize>], out: &mut Vec<Range<usize>>) {
        let mut current: VecDeque<(Range<usize>, usize)> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(text, piece);
            if total + len > self.chunk_size && !current.is_empty() {
                push_joined(text, &current, out);
                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    match current.pop_front() {
                        Some((_, dropped)) => total -= dropped,
                        None => break,
                    }
                }
            }
            current.push_back((piece.clone(), len));
            total += len;
        }
        push_joined(text, &current, out);
    }
}

/// Splits `segment` before every occurrence of `separator`, keeping the
/// separator at the start of the following piece. Returned ranges are
/// absolute (shifted by `offset`) and never empty.
fn split_keep_separator(segment: &str, separator: &str, offset: usize) -> Vec<Range<usize>> {
    if separator.is_empty() {
        return segment
            .char_indices()
            .map(|(i, c)| offset + i..offset + i + c.len_utf8())
            .collect();
    }

    let mut cuts = vec![0];
    cuts.extend(
        segment
            .char_indices()
            .map(|(i, _)| i)
            .filter(|&i| i > 0 && segment[i..].starts_with(separator)),
    );
    cuts.push(segment.len());

    cuts.windows(2)
        .filter(|w| w[1] > w[0])
        .map(|w| offset + w[0]..offset + w[1])
        .collect()
}

fn push_joined(text: &str, current: &VecDeque<(Range<usize>, usize)>, out: &mut Vec<Range<usize>>) {
    let (Some((first, _)), Some((last, _))) = (current.front(), current.back()) else {
        return;
    };
    if let Some(trimmed) = trim_range(text, first.start..last.end) {
        out.push(trimmed);
    }
}

fn trim_range(text: &str, range: Range<usize>) -> Option<Range<usize>> {
    let slice = &text[range.clone()];
    let trimmed = slice.trim();
    if trimmed.is_empty() {
        return None;
    }
    let start = range.start + (slice.len() - slice.trim_start().len());
    Some(start..start + trimmed.len())
}

fn char_len(text: &str, range: &Range<usize>) -> usize {
    text[range.clone()].chars().count()
}

fn count_newlines(s: &str) -> usize {
    s.bytes().filter(|&b| b == b'\n').count()
}
