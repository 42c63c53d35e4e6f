//! Choosing the Markdown text of a block and how to parse it.

use std::borrow::Cow;

use super::latex::{escape_single_dollars, process_latex_brackets};
use crate::message::{BlockStatus, MessageBlock};
use crate::settings::{MathEngine, Settings};

/// Markdown text selected for a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkdownSource<'a> {
    /// Text to render.
    pub text: &'a str,
    /// True when `text` is the paused label rather than block content.
    pub is_placeholder: bool,
}

impl<'a> MarkdownSource<'a> {
    /// Select the text of a main text, thinking or translation block.
    ///
    /// A paused block with no content shows `paused_label`. Returns `None`
    /// for blocks without text.
    #[must_use]
    pub fn for_block(block: &'a MessageBlock, paused_label: &'a str) -> Option<Self> {
        let content = block.text()?;

        if content.is_empty() && block.status == BlockStatus::Paused {
            return Some(Self {
                text: paused_label,
                is_placeholder: true,
            });
        }

        Some(Self {
            text: content,
            is_placeholder: false,
        })
    }
}

/// Parser options derived from settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkdownOptions {
    /// Math syntax to recognize.
    pub math_engine: MathEngine,
    /// Whether `$...$` is inline math.
    pub single_dollar: bool,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            math_engine: MathEngine::default(),
            single_dollar: true,
        }
    }
}

impl MarkdownOptions {
    /// Options from user settings.
    #[must_use]
    pub const fn from_settings(settings: &Settings) -> Self {
        Self {
            math_engine: settings.math_engine,
            single_dollar: settings.math_enable_single_dollar,
        }
    }

    /// Whether math is parsed at all.
    #[must_use]
    pub const fn math_enabled(&self) -> bool {
        self.math_engine.is_enabled()
    }

    /// Normalize math delimiters before parsing.
    #[must_use]
    pub fn prepare<'t>(&self, text: &'t str) -> Cow<'t, str> {
        if !self.math_enabled() {
            return Cow::Borrowed(text);
        }

        let text = process_latex_brackets(text);
        if self.single_dollar {
            Cow::Owned(text)
        } else {
            Cow::Owned(escape_single_dollars(&text))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::message::{BlockContent, MessageId};

    fn text_block(content: &str, status: BlockStatus) -> MessageBlock {
        MessageBlock::new(
            MessageId::from("m1"),
            status,
            BlockContent::MainText {
                content: content.to_string(),
            },
        )
    }

    #[test]
    fn test_content_is_used() {
        let block = text_block("Test content", BlockStatus::Success);
        let source = MarkdownSource::for_block(&block, "Paused").unwrap();
        assert_eq!(source.text, "Test content");
        assert!(!source.is_placeholder);
    }

    #[test]
    fn test_paused_label_for_empty_paused_block() {
        let block = text_block("", BlockStatus::Paused);
        let source = MarkdownSource::for_block(&block, "Paused").unwrap();
        assert_eq!(source.text, "Paused");
        assert!(source.is_placeholder);
    }

    #[test]
    fn test_content_wins_over_paused_label() {
        let block = text_block("Partial answer", BlockStatus::Paused);
        assert_eq!(
            MarkdownSource::for_block(&block, "Paused").unwrap().text,
            "Partial answer"
        );

        let empty = text_block("", BlockStatus::Success);
        assert_eq!(MarkdownSource::for_block(&empty, "Paused").unwrap().text, "");
    }

    #[test]
    fn test_thinking_and_translation_blocks() {
        let thinking = MessageBlock::new(
            MessageId::from("m1"),
            BlockStatus::Success,
            BlockContent::Thinking {
                content: "hmm".to_string(),
                thinking_millis: 1200,
            },
        );
        let translation = MessageBlock::new(
            MessageId::from("m1"),
            BlockStatus::Success,
            BlockContent::Translation {
                content: "bonjour".to_string(),
                target_language: "fr".to_string(),
            },
        );
        let image = MessageBlock::generated_images(MessageId::from("m1"), BlockStatus::Success, vec![]);

        assert_eq!(MarkdownSource::for_block(&thinking, "P").unwrap().text, "hmm");
        assert_eq!(MarkdownSource::for_block(&translation, "P").unwrap().text, "bonjour");
        assert!(MarkdownSource::for_block(&image, "P").is_none());
    }

    #[test]
    fn test_prepare_respects_math_engine() {
        let none = MarkdownOptions {
            math_engine: MathEngine::None,
            single_dollar: true,
        };
        assert_eq!(none.prepare(r"\(x\)"), r"\(x\)");

        let katex = MarkdownOptions::default();
        assert_eq!(katex.prepare(r"\(x\) costs $5"), r"$x$ costs $5");

        let no_single = MarkdownOptions {
            math_engine: MathEngine::MathJax,
            single_dollar: false,
        };
        assert_eq!(no_single.prepare("costs $5"), r"costs \$5");
    }
}
