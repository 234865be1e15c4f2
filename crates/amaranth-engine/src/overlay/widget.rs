//! Inline replacement rendering.
//!
//! Some things cannot be expressed by hiding and styling buffer text alone:
//! a list marker displayed as a synthesized bullet glyph, a task checkbox,
//! or the fully-formatted rendition of a line when the whole document is
//! unfocused. For those the engine emits an [`InlineWidget`].
//!
//! A widget must occupy a single inline flow position. The host text surface
//! treats every line as an independent layout unit, so a replacement that
//! introduced a block box or a forced line break would corrupt line heights
//! and caret geometry. That is why [`render_line`] returns one node per
//! line, never a tree of blocks.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::StyleClass;
use crate::editing::images::{self, ResourceResolver};

static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.*)$").unwrap());
static LIST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([-*+]|\d+\.)\s+(?:\[([ xX])\]\s+)?(.*)$").unwrap());
static BOLD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").unwrap());
static ITALIC_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*([^*]+)\*").unwrap());
static STRIKE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"~~(.+?)~~").unwrap());
static CODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`([^`]+)`").unwrap());
static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").unwrap());

/// A run of display text with the styles that apply to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetSpan {
    pub text: String,
    pub styles: Vec<StyleClass>,
}

impl WidgetSpan {
    #[must_use]
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            styles: Vec::new(),
        }
    }

    #[must_use]
    pub fn styled(text: impl Into<String>, styles: Vec<StyleClass>) -> Self {
        Self {
            text: text.into(),
            styles,
        }
    }
}

/// A single inline-safe replacement node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "widget")]
pub enum InlineWidget {
    /// Synthesized bullet glyph for unordered list markers.
    Bullet,
    /// The original ordinal text of an ordered list marker ("12.").
    Ordinal { text: String },
    /// Task-list checkbox.
    Checkbox { checked: bool },
    /// A formatted rendition of line content as styled text runs.
    Spans { spans: Vec<WidgetSpan> },
}

impl InlineWidget {
    /// The glyph or text the host should draw for marker widgets.
    #[must_use]
    pub fn marker_text(&self) -> Option<String> {
        match self {
            InlineWidget::Bullet => Some("\u{2022}".to_string()),
            InlineWidget::Ordinal { text } => Some(text.clone()),
            InlineWidget::Checkbox { checked } => {
                Some(if *checked { "\u{2611}" } else { "\u{2610}" }.to_string())
            }
            InlineWidget::Spans { .. } => None,
        }
    }
}

/// Render one line of raw markdown as a formatted inline node.
///
/// Used for the degraded whole-document preview when the surface loses
/// focus; the steady-state path styles buffer text in place instead.
#[must_use]
pub fn render_line(text: &str) -> InlineWidget {
    if let Some(caps) = HEADING_RE.captures(text) {
        let mut spans = render_inline(&caps[2]);
        for span in &mut spans {
            if !span.styles.contains(&StyleClass::Bold) {
                span.styles.insert(0, StyleClass::Bold);
            }
        }
        return InlineWidget::Spans { spans };
    }

    if let Some(caps) = LIST_RE.captures(text) {
        let marker = &caps[1];
        let prefix = match caps.get(2) {
            Some(c) => {
                let checked = !c.as_str().trim().is_empty();
                if checked { "\u{2611} " } else { "\u{2610} " }.to_string()
            }
            None if marker.ends_with('.') => format!("{marker} "),
            None => "\u{2022} ".to_string(),
        };
        let mut spans = vec![WidgetSpan::plain(prefix)];
        spans.extend(render_inline(&caps[3]));
        return InlineWidget::Spans { spans };
    }

    InlineWidget::Spans {
        spans: render_inline(text),
    }
}

/// Render a single-line image reference through the host's resolver.
///
/// Returns `None` when `text` is not an image-reference line. Resolution
/// failure is non-fatal: it is logged and the reference degrades to an
/// inline placeholder so the rest of the document still renders.
pub fn render_image_line(text: &str, resolver: &dyn ResourceResolver) -> Option<InlineWidget> {
    let image = images::parse_image_reference(text)?;
    let spans = match resolver.resolve(&image.target) {
        Ok(_) => {
            let label = if image.alt.is_empty() {
                image.target.as_str().to_string()
            } else {
                image.alt
            };
            vec![WidgetSpan::styled(
                format!("\u{1f5bc} {label}"),
                vec![StyleClass::Link],
            )]
        }
        Err(err) => {
            tracing::warn!(target = %image.target, %err, "image resolution failed");
            vec![WidgetSpan::styled(
                format!("[image unavailable: {}]", image.target),
                vec![StyleClass::Strikethrough],
            )]
        }
    };
    Some(InlineWidget::Spans { spans })
}

/// Apply the ordered substitution passes to produce styled runs.
///
/// Bold runs before italic so a lone `*` rule never matches inside a
/// `**`-delimited span; code and link substitution run last over whatever
/// text remains. Inner matches inherit the styles of the run they split.
pub fn render_inline(text: &str) -> Vec<WidgetSpan> {
    let mut spans = vec![WidgetSpan::plain(text)];
    for (re, class) in [
        (&*BOLD_RE, StyleClass::Bold),
        (&*ITALIC_RE, StyleClass::Italic),
        (&*STRIKE_RE, StyleClass::Strikethrough),
        (&*CODE_RE, StyleClass::Code),
    ] {
        spans = substitute(spans, re, class, 1);
    }
    spans = substitute(spans, &LINK_RE, StyleClass::Link, 1);
    spans.retain(|s| !s.text.is_empty());
    if spans.is_empty() {
        spans.push(WidgetSpan::plain(""));
    }
    spans
}

/// Split every run on `re`, replacing each match with its capture group
/// styled by `class` on top of the run's existing styles.
fn substitute(spans: Vec<WidgetSpan>, re: &Regex, class: StyleClass, group: usize) -> Vec<WidgetSpan> {
    let mut out = Vec::with_capacity(spans.len());
    for span in spans {
        // Already-substituted runs of the same class need no second pass.
        if span.styles.contains(&class) {
            out.push(span);
            continue;
        }
        let mut cursor = 0;
        for caps in re.captures_iter(&span.text) {
            let whole = caps.get(0).unwrap();
            let inner = caps.get(group).unwrap();
            if whole.start() > cursor {
                out.push(WidgetSpan::styled(
                    &span.text[cursor..whole.start()],
                    span.styles.clone(),
                ));
            }
            let mut styles = span.styles.clone();
            styles.push(class);
            out.push(WidgetSpan::styled(inner.as_str(), styles));
            cursor = whole.end();
        }
        if cursor == 0 {
            out.push(span);
        } else if cursor < span.text.len() {
            out.push(WidgetSpan::styled(&span.text[cursor..], span.styles.clone()));
        }
    }
    out
}
