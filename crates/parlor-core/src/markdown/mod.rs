//! Markdown content of text blocks.
//!
//! Text is selected per block, math delimiters are normalized according to
//! the settings, and the result is parsed into a flat list of nodes that the
//! UI renders with plain widgets.

mod document;
mod latex;
mod source;

pub use document::{Inline, ListMarker, MarkdownDocument, Node, SpanStyle};
pub use latex::{escape_single_dollars, process_latex_brackets};
pub use source::{MarkdownOptions, MarkdownSource};
