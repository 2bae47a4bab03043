//! Minimal HTML extraction helpers
//!
//! The archive pages are simple, server-rendered tables, so a handful of
//! cached regular expressions covers everything the parsers need.

use regex::{Captures, Regex};
use std::sync::OnceLock;

fn re_anchor() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"(?is)<a\b([^>]*)>(.*?)</a\s*>").unwrap())
}

fn re_row() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"(?is)<tr\b[^>]*>(.*?)</tr\s*>").unwrap())
}

fn re_cell() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"(?is)<td\b([^>]*)>(.*?)</td\s*>").unwrap())
}

fn re_h2() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"(?is)<h2\b[^>]*>(.*?)</h2\s*>").unwrap())
}

fn re_table() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"(?is)<table\b([^>]*)>(.*?)</table\s*>").unwrap())
}

fn re_audio() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"(?is)<(?:audio|source)\b([^>]*)>").unwrap())
}

fn re_attribute() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| {
        Regex::new(r#"(?s)([^\s"'<>/=]+)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#).unwrap()
    })
}

fn re_all_tags() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"(?is)<[^>]+>").unwrap())
}

fn re_numeric_entity() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"&#([xX]?)([0-9a-fA-F]+);").unwrap())
}

fn re_whitespace() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"\s+").unwrap())
}

/// An `<a>` element with its raw href and visible text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub href: String,
    pub text: String,
}

/// Value of `name` inside a tag's attribute string, entity-decoded
pub fn attr(attrs: &str, name: &str) -> Option<String> {
    re_attribute()
        .captures_iter(attrs)
        .find(|caps| caps[1].eq_ignore_ascii_case(name))
        .and_then(|caps| caps.get(2).or(caps.get(3)).or(caps.get(4)))
        .map(|value| decode_entities(value.as_str()))
}

fn has_class(attrs: &str, class: &str) -> bool {
    attr(attrs, "class")
        .map(|value| value.split_whitespace().any(|c| c == class))
        .unwrap_or(false)
}

/// Decode the common named entities and all numeric ones
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }

    let numeric = re_numeric_entity().replace_all(s, |caps: &Captures| {
        let radix = if caps[1].is_empty() { 10 } else { 16 };
        u32::from_str_radix(&caps[2], radix)
            .ok()
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    });

    numeric
        .replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Visible text of an HTML fragment with whitespace collapsed
pub fn text(fragment: &str) -> String {
    let stripped = re_all_tags().replace_all(fragment, " ");
    let decoded = decode_entities(&stripped);
    re_whitespace().replace_all(&decoded, " ").trim().to_string()
}

/// Text of the first `<h2>` heading
pub fn first_h2(html: &str) -> Option<String> {
    re_h2()
        .captures(html)
        .map(|caps| text(&caps[1]))
        .filter(|t| !t.is_empty())
}

/// Inner HTML of the `<table>` carrying the given id
pub fn table_by_id<'a>(html: &'a str, id: &str) -> Option<&'a str> {
    re_table().captures_iter(html).find_map(|caps| {
        let attrs = caps.get(1)?.as_str();
        if attr(attrs, "id").as_deref() == Some(id) {
            caps.get(2).map(|m| m.as_str())
        } else {
            None
        }
    })
}

/// Inner HTML of every `<tr>`
pub fn rows(html: &str) -> impl Iterator<Item = &str> {
    re_row()
        .captures_iter(html)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
}

/// Inner HTML of every `<td>` carrying `class`
pub fn cells_with_class<'a>(row: &'a str, class: &str) -> Vec<&'a str> {
    re_cell()
        .captures_iter(row)
        .filter(|caps| has_class(&caps[1], class))
        .filter_map(|caps| caps.get(2).map(|m| m.as_str()))
        .collect()
}

/// Every anchor that has a non-empty href
pub fn anchors(html: &str) -> Vec<Anchor> {
    re_anchor()
        .captures_iter(html)
        .filter_map(|caps| {
            let href = attr(&caps[1], "href")?;
            let href = href.trim();
            if href.is_empty() {
                return None;
            }
            Some(Anchor {
                href: href.to_string(),
                text: text(&caps[2]),
            })
        })
        .collect()
}

/// `src` attributes of `<audio>` and `<source>` elements
pub fn audio_sources(html: &str) -> Vec<String> {
    re_audio()
        .captures_iter(html)
        .filter_map(|caps| attr(&caps[1], "src"))
        .map(|src| src.trim().to_string())
        .filter(|src| !src.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("Tom &amp; Jerry"), "Tom & Jerry");
        assert_eq!(decode_entities("&#39;quoted&#x27;"), "'quoted'");
        assert_eq!(decode_entities("&amp;lt;"), "&lt;");
        assert_eq!(decode_entities("plain"), "plain");
    }

    #[test]
    fn test_text_strips_tags_and_collapses_whitespace() {
        assert_eq!(text("  <b>Hello</b>\n   <i>World</i> "), "Hello World");
    }

    #[test]
    fn test_attr_quoting_styles() {
        assert_eq!(attr(r#" href="/a b""#, "href").as_deref(), Some("/a b"));
        assert_eq!(attr(" href='/x'", "href").as_deref(), Some("/x"));
        assert_eq!(attr(" href=/y class=z", "href").as_deref(), Some("/y"));
        assert_eq!(attr(r#" data-href="/no""#, "href"), None);
    }

    #[test]
    fn test_attr_ignores_names_inside_values() {
        let attrs = r#" title="class=fake" CLASS="clickable-row" id=songlist"#;
        assert_eq!(attr(attrs, "class").as_deref(), Some("clickable-row"));
        assert_eq!(attr(attrs, "id").as_deref(), Some("songlist"));
        assert_eq!(attr(attrs, "href"), None);
    }

    #[test]
    fn test_table_by_id() {
        let html = r#"<table id="other"><tr><td>x</td></tr></table>
            <table class="t" id="songlist"><tr><td>y</td></tr></table>"#;
        let inner = table_by_id(html, "songlist").unwrap();
        assert!(inner.contains('y'));
        assert!(!inner.contains('x'));
        assert!(table_by_id(html, "missing").is_none());
    }

    #[test]
    fn test_cells_with_class() {
        let row = r#"<td class="playTrack">p</td><td class="clickable-row wide">a</td><td class="clickable-row">b</td>"#;
        assert_eq!(cells_with_class(row, "clickable-row"), vec!["a", "b"]);
    }

    #[test]
    fn test_anchors_skip_empty_href() {
        let html = r#"<a href="">none</a><a name="top">x</a><a href="/f.mp3"><span>Get</span> it</a>"#;
        let found = anchors(html);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].href, "/f.mp3");
        assert_eq!(found[0].text, "Get it");
    }

    #[test]
    fn test_audio_sources() {
        let html = r#"<audio id="audio" src="https://c/x.mp3" controls></audio>"#;
        assert_eq!(audio_sources(html), vec!["https://c/x.mp3"]);
    }
}
