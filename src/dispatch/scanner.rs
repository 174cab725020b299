//! Source scanner
//!
//! A byte-level lexer that only distinguishes code, string literals and
//! comments. That is enough to match braces and to hide commented-out
//! branches from the extractor. Regex literals are not recognized.

use crate::error::SourceError;
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Region {
    Code,
    Str(u8),
    LineComment,
    BlockComment,
}

/// Walks source bytes and tags each one with the region it belongs to.
/// Quote characters and comment delimiters are tagged as part of their region.
struct Lexer<'a> {
    bytes: &'a [u8],
    pos: usize,
    region: Region,
    escaped: bool,
    comment_start: usize,
}

impl<'a> Lexer<'a> {
    /// Start lexing at `pos`, which must be in code
    fn new(text: &'a str, pos: usize) -> Self {
        Self {
            bytes: text.as_bytes(),
            pos,
            region: Region::Code,
            escaped: false,
            comment_start: 0,
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = (usize, u8, Region);

    fn next(&mut self) -> Option<Self::Item> {
        let i = self.pos;
        let b = *self.bytes.get(i)?;
        let next = self.bytes.get(i + 1).copied();
        self.pos += 1;

        let tag = match self.region {
            Region::Code => match (b, next) {
                (b'\'' | b'"' | b'`', _) => {
                    self.region = Region::Str(b);
                    self.escaped = false;
                    Region::Str(b)
                }
                (b'/', Some(b'/')) => {
                    self.region = Region::LineComment;
                    Region::LineComment
                }
                (b'/', Some(b'*')) => {
                    self.region = Region::BlockComment;
                    self.comment_start = i;
                    Region::BlockComment
                }
                _ => Region::Code,
            },
            Region::Str(quote) => {
                if self.escaped {
                    self.escaped = false;
                } else if b == b'\\' {
                    self.escaped = true;
                } else if b == quote || (b == b'\n' && quote != b'`') {
                    // Unterminated single-line strings end at the newline
                    self.region = Region::Code;
                }
                Region::Str(quote)
            }
            Region::LineComment => {
                if b == b'\n' {
                    self.region = Region::Code;
                    Region::Code
                } else {
                    Region::LineComment
                }
            }
            Region::BlockComment => {
                if b == b'/' && i >= self.comment_start + 3 && self.bytes[i - 1] == b'*' {
                    self.region = Region::Code;
                }
                Region::BlockComment
            }
        };

        Some((i, b, tag))
    }
}

/// Index of the `}` matching the `{` at `open`, ignoring braces inside
/// strings and comments
pub fn matching_brace(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, b, region) in Lexer::new(text, open) {
        if region != Region::Code {
            continue;
        }
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// First `{` in code at or after `from`
pub fn next_open_brace(text: &str, from: usize) -> Option<usize> {
    Lexer::new(text, from)
        .find(|&(_, b, region)| region == Region::Code && b == b'{')
        .map(|(i, _, _)| i)
}

/// End of the statement starting at `from`: the first `;` in code outside
/// any brackets opened after `from`, or the first unmatched closing
/// bracket. Text length if neither occurs.
pub fn statement_end(text: &str, from: usize) -> usize {
    let mut depth = 0usize;
    for (i, b, region) in Lexer::new(text, from) {
        if region != Region::Code {
            continue;
        }
        match b {
            b'{' | b'(' | b'[' => depth += 1,
            b'}' | b')' | b']' => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return i,
            },
            b';' if depth == 0 => return i,
            _ => {}
        }
    }
    text.len()
}

/// Copy of `text` with comment bytes replaced by spaces.
///
/// Newlines and byte offsets are preserved so positions found in the mask
/// index the original text. String literals are kept.
pub fn mask_comments(text: &str) -> String {
    let masked: Vec<u8> = Lexer::new(text, 0)
        .map(|(_, b, region)| match region {
            Region::LineComment | Region::BlockComment if b != b'\n' => b' ',
            _ => b,
        })
        .collect();
    // Every byte of a multi-byte char inside a comment becomes a space,
    // and bytes outside comments are copied unchanged.
    String::from_utf8(masked).unwrap_or_default()
}

/// Byte span of the generation routine inside the source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutineSpan {
    /// Start of the declaration marker
    pub start: usize,
    /// The routine's opening brace
    pub open: usize,
    /// The routine's closing brace
    pub close: usize,
}

impl RoutineSpan {
    /// Range of the text between the braces
    pub fn body(&self) -> Range<usize> {
        self.open + 1..self.close
    }
}

/// Locate the routine declared by `marker` and its balanced body
pub fn routine_span(source: &str, marker: &str) -> Result<RoutineSpan, SourceError> {
    let start = source
        .find(marker)
        .ok_or_else(|| SourceError::RoutineNotFound {
            marker: marker.to_string(),
        })?;

    let unbalanced = || SourceError::Unbalanced {
        marker: marker.to_string(),
    };

    let open = next_open_brace(source, start + marker.len()).ok_or_else(unbalanced)?;
    let close = matching_brace(source, open).ok_or_else(unbalanced)?;

    tracing::debug!("Routine `{}` spans bytes {}..={}", marker, start, close);
    Ok(RoutineSpan { start, open, close })
}

/// Offset of the start of the line containing `pos`
pub fn line_start(text: &str, pos: usize) -> usize {
    text[..pos].rfind('\n').map(|i| i + 1).unwrap_or(0)
}

/// Leading whitespace of the line containing `pos`
pub fn line_indent(text: &str, pos: usize) -> &str {
    let start = line_start(text, pos);
    let line = &text[start..];
    let width = line.len() - line.trim_start_matches([' ', '\t']).len();
    &line[..width]
}
