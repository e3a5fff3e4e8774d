use regex::bytes::{Captures, Regex};

use crate::errors::WikiError;
use crate::types::Markup;

const LINK_PATTERN: &str = r"\[([a-zA-Z0-9]+)\]";

/// Turns `[Title]` tokens in a page body into anchors.
///
/// Everything outside a token is copied through untouched and is NOT escaped:
/// page bodies are trusted author content.
#[derive(Debug, Clone)]
pub struct LinkRewriter {
    pattern: Regex,
}

impl LinkRewriter {
    pub fn new() -> Result<Self, WikiError> {
        let pattern = Regex::new(LINK_PATTERN)
            .map_err(|e| WikiError::TemplateError(format!("invalid link pattern: {}", e)))?;
        Ok(Self { pattern })
    }

    /// Replace every link token in `body` with `<a href="{base_url}{name}">{name}</a>`
    pub fn link_pages(&self, body: &[u8], base_url: &str) -> Markup {
        let rewritten = self.pattern.replace_all(body, |caps: &Captures<'_>| {
            let name = &caps[1];
            let mut anchor = Vec::with_capacity(base_url.len() + name.len() * 2 + 15);
            anchor.extend_from_slice(b"<a href=\"");
            anchor.extend_from_slice(base_url.as_bytes());
            anchor.extend_from_slice(name);
            anchor.extend_from_slice(b"\">");
            anchor.extend_from_slice(name);
            anchor.extend_from_slice(b"</a>");
            anchor
        });
        Markup::new(rewritten.into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(body: &str) -> String {
        let markup = LinkRewriter::new().unwrap().link_pages(body.as_bytes(), "http://localhost:8080/view/");
        String::from_utf8(markup.into_bytes()).unwrap()
    }

    #[test]
    fn rewrites_a_single_token() {
        assert_eq!(
            link("Some text with a [link]."),
            "Some text with a <a href=\"http://localhost:8080/view/link\">link</a>."
        );
    }

    #[test]
    fn rewrites_adjacent_tokens_left_to_right() {
        assert_eq!(
            link("[One][Two]"),
            "<a href=\"http://localhost:8080/view/One\">One</a><a href=\"http://localhost:8080/view/Two\">Two</a>"
        );
    }

    #[test]
    fn text_without_tokens_is_unchanged() {
        assert_eq!(link("plain text\n"), "plain text\n");
        assert_eq!(link(""), "");
    }

    #[test]
    fn malformed_tokens_are_unchanged() {
        for input in ["[link with space]", "[]", "[dot.ted]", "[under_score]", "[unclosed"] {
            assert_eq!(link(input), input);
        }
    }

    #[test]
    fn only_the_inner_brackets_of_a_nested_token_match() {
        assert_eq!(link("[[nested]]"), "[<a href=\"http://localhost:8080/view/nested\">nested</a>]");
    }

    #[test]
    fn non_utf8_bytes_pass_through_untouched() {
        let markup = LinkRewriter::new().unwrap().link_pages(b"caf\xe9 [Home] \xff", "/view/");
        assert_eq!(markup.as_bytes(), b"caf\xe9 <a href=\"/view/Home\">Home</a> \xff");
    }

    #[test]
    fn surrounding_html_is_passed_through_raw() {
        assert_eq!(
            link("<b>[Home]</b>"),
            "<b><a href=\"http://localhost:8080/view/Home\">Home</a></b>"
        );
    }
}
