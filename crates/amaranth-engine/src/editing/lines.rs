use xi_rope::Rope;

use super::span::Span;

/// A reference to a single line in the buffer.
///
/// Lines are a derived view: they are recomputed on every pass and never
/// cached across edits, because any edit invalidates every downstream offset.
#[derive(Debug, Clone)]
pub struct LineRef {
    /// 1-based line number.
    pub number: usize,
    /// Byte span of the line's text, excluding the trailing newline.
    pub span: Span,
    /// The line text without its trailing newline.
    pub text: String,
}

impl LineRef {
    /// Returns true if the line contains no characters or only whitespace.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Returns an iterator over lines with their byte spans and 1-based numbers.
///
/// Uses `lines_raw` so newline bytes are accounted for in the running offset,
/// which keeps spans exact; the newline itself is stripped from both the span
/// and the text since no overlay may ever cover a line break.
pub fn lines_with_spans(rope: &Rope) -> impl Iterator<Item = LineRef> + '_ {
    let mut offset = 0usize;
    let mut number = 0usize;
    rope.lines_raw(..).map(move |line| {
        let start = offset;
        offset += line.len();
        number += 1;

        let mut text = line.into_owned();
        let mut end = offset;
        if text.ends_with('\n') {
            text.pop();
            end -= 1;
            if text.ends_with('\r') {
                text.pop();
                end -= 1;
            }
        }

        LineRef {
            number,
            span: Span { start, end },
            text,
        }
    })
}

/// Returns the 1-based line number containing `offset`.
///
/// Offsets past the end of the buffer clamp to the last line.
pub fn line_of_offset(rope: &Rope, offset: usize) -> usize {
    let offset = offset.min(rope.len());
    rope.line_of_offset(offset) + 1
}
