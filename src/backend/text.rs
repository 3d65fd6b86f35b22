use std::path::Path;
use std::sync::LazyLock;

use async_trait::async_trait;
use pulldown_cmark::{html, Parser};
use regex::Regex;
use tracing::debug;

use crate::contract::Converter;
use crate::error::ConvertError;
use crate::format::Format;

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

/// Renders markdown to HTML, then strips the tags.
pub struct MarkdownToText;

#[async_trait]
impl Converter for MarkdownToText {
    async fn convert(
        &self,
        source: &Path,
        output: &Path,
        source_format: Format,
        target: Format,
    ) -> Result<(), ConvertError> {
        if (source_format, target) != (Format::Md, Format::Txt) {
            return Err(ConvertError::Unsupported {
                source_format,
                target,
            });
        }
        let markdown = String::from_utf8(tokio::fs::read(source).await?)?;
        let text = markdown_to_text(&markdown);
        debug!(
            input_len = markdown.len(),
            output_len = text.len(),
            "Rendered markdown to plain text"
        );
        tokio::fs::write(output, text).await?;
        Ok(())
    }
}

pub fn markdown_to_text(markdown: &str) -> String {
    let mut rendered = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut rendered, Parser::new(markdown));
    let stripped = TAG.replace_all(&rendered, "");
    unescape_entities(&stripped)
}

/// Reverses the escaping the HTML renderer applies to text content.
fn unescape_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Plain text is already valid markdown: copies the bytes unchanged.
pub struct TextCopy;

#[async_trait]
impl Converter for TextCopy {
    async fn convert(
        &self,
        source: &Path,
        output: &Path,
        source_format: Format,
        target: Format,
    ) -> Result<(), ConvertError> {
        if (source_format, target) != (Format::Txt, Format::Md) {
            return Err(ConvertError::Unsupported {
                source_format,
                target,
            });
        }
        let copied = tokio::fs::copy(source, output).await?;
        debug!(bytes = copied, "Copied text to markdown");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn strips_heading_and_emphasis_markup() {
        let text = markdown_to_text("# Title\n\nSome *emphasis* and a [link](https://x.y).\n");
        assert_eq!(text, "Title\nSome emphasis and a link.\n");
    }

    #[test]
    fn list_items_keep_their_text() {
        let text = markdown_to_text("- one\n- two\n");
        assert!(text.contains("one"));
        assert!(text.contains("two"));
        assert!(!text.contains('<'));
    }

    #[test]
    fn escaped_characters_come_back_literal() {
        assert_eq!(markdown_to_text("a & b < c\n"), "a & b < c\n");
    }

    #[tokio::test]
    async fn text_copy_is_byte_identical() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("a.txt");
        let output = dir.path().join("a.md");
        let bytes = b"*not* markdown escaped\n\xff raw byte".to_vec();
        std::fs::write(&source, &bytes).unwrap();

        TextCopy
            .convert(&source, &output, Format::Txt, Format::Md)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&output).unwrap(), bytes);
    }

    #[tokio::test]
    async fn markdown_rejects_invalid_utf8() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("a.md");
        std::fs::write(&source, b"\xff\xfe").unwrap();
        let err = MarkdownToText
            .convert(&source, &dir.path().join("a.txt"), Format::Md, Format::Txt)
            .await
            .unwrap_err();
        assert!(matches!(err, ConvertError::Encoding(_)));
    }
}
