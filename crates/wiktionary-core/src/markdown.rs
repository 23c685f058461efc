//! HTML to Markdown conversion for dictionary fragments and whole pages.
//!
//! The mapping is the usual one (headings, emphasis, lists, quotes, code).
//! Anchors are the single customization point: by default they collapse to
//! their inner text so lookup results never carry link markup.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use serde::{Deserialize, Serialize};

/// Elements that make a string count as HTML. Anything else in angle
/// brackets (`Vec<String>`, `<noun>`) is left as plain text.
const HTML_TAGS: &[&str] = &[
    "a", "abbr", "address", "article", "aside", "b", "base", "bdi", "bdo", "blockquote", "body",
    "br", "caption", "center", "cite", "code", "dd", "del", "details", "dfn", "div", "dl", "dt",
    "em", "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5",
    "h6", "head", "header", "hr", "html", "i", "img", "ins", "kbd", "li", "link", "main", "mark",
    "meta", "nav", "noscript", "ol", "p", "pre", "q", "s", "samp", "script", "section", "small",
    "span", "strong", "style", "sub", "summary", "sup", "table", "tbody", "td", "template",
    "tfoot", "th", "thead", "title", "tr", "u", "ul", "var", "wbr",
];

static MARKUP_RE: Lazy<Regex> = Lazy::new(|| {
    let pattern = format!(
        r"(?i)<!--|<!doctype\s|</?(?:{})(?:\s[^>]*)?/?>|&(?:#[0-9]+|#x[0-9a-f]+|[a-z][a-z0-9]*);",
        HTML_TAGS.join("|")
    );
    Regex::new(&pattern).expect("markup regex")
});

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

static DEFAULT_CONVERTER: Lazy<HtmlConverter> = Lazy::new(HtmlConverter::default);

const SKIPPED_TAGS: &[&str] = &[
    "head", "title", "script", "style", "meta", "link", "noscript", "template", "base",
];

const BLOCK_TAGS: &[&str] = &[
    "html", "body", "p", "div", "section", "article", "main", "header", "footer", "aside", "nav",
    "figure", "figcaption", "dl", "dt", "dd", "table", "thead", "tbody", "tfoot", "caption",
    "details", "summary", "address", "center", "fieldset", "form",
];

const EMPHASIS: &str = "_";
const STRONG: &str = "**";
const BULLET: char = '-';

/// How `<a>` elements are written out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStyle {
    /// Keep only the anchor's inner text.
    #[default]
    TextOnly,
    /// `[text](href)`
    Inline,
}

/// Reusable HTML to Markdown converter. Build once, call [`convert`] for
/// every fragment.
///
/// [`convert`]: HtmlConverter::convert
#[derive(Debug, Clone, Default)]
pub struct HtmlConverter {
    links: LinkStyle,
}

#[derive(Debug, Clone, Copy, Default)]
struct Context {
    preformatted: bool,
}

impl HtmlConverter {
    #[must_use]
    pub fn with_links(links: LinkStyle) -> Self {
        Self { links }
    }

    pub fn links(&self) -> LinkStyle {
        self.links
    }

    /// Convert an HTML fragment or document to Markdown.
    ///
    /// Input without any markup is returned untouched, so plain text never
    /// picks up escapes or whitespace changes.
    #[must_use]
    pub fn convert(&self, html: &str) -> String {
        if !contains_markup(html) {
            return html.to_string();
        }

        let rendered = if looks_like_document(html) {
            let document = Html::parse_document(html);
            let body = Selector::parse("body")
                .ok()
                .and_then(|selector| document.select(&selector).next());
            match body {
                Some(body) => self.render_children(body, Context::default()),
                None => self.render_children(document.root_element(), Context::default()),
            }
        } else {
            let fragment = Html::parse_fragment(html);
            self.render_children(fragment.root_element(), Context::default())
        };

        tidy(&rendered)
    }

    fn render_children(&self, element: ElementRef<'_>, ctx: Context) -> String {
        let mut out = String::new();
        for child in element.children() {
            match child.value() {
                Node::Text(text) => {
                    if ctx.preformatted {
                        out.push_str(text);
                        continue;
                    }
                    let collapsed = WHITESPACE_RE.replace_all(text, " ");
                    if out.ends_with('\n') {
                        out.push_str(collapsed.trim_start());
                    } else {
                        out.push_str(&collapsed);
                    }
                }
                Node::Element(_) => {
                    if let Some(child) = ElementRef::wrap(child) {
                        let rendered = self.render_element(child, ctx);
                        if rendered.starts_with('\n') {
                            trim_trailing_spaces(&mut out);
                        }
                        out.push_str(&rendered);
                    }
                }
                _ => {}
            }
        }
        out
    }

    fn render_element(&self, element: ElementRef<'_>, ctx: Context) -> String {
        let name = element.value().name();
        if SKIPPED_TAGS.contains(&name) {
            return String::new();
        }
        if ctx.preformatted {
            return self.render_children(element, ctx);
        }
        if BLOCK_TAGS.contains(&name) {
            return block(&tidy(&self.render_children(element, ctx)));
        }

        match name {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = name[1..].parse::<usize>().unwrap_or(1);
                let text = single_line(&self.render_children(element, ctx));
                if text.is_empty() {
                    String::new()
                } else {
                    block(&header(level, &text))
                }
            }
            "br" => "\n".to_string(),
            "hr" => block("---"),
            "strong" | "b" => delimit(&self.render_children(element, ctx), STRONG),
            "em" | "i" => delimit(&self.render_children(element, ctx), EMPHASIS),
            "code" | "kbd" | "samp" => {
                let text = element.text().collect::<String>();
                let text = WHITESPACE_RE.replace_all(&text, " ");
                if text.trim().is_empty() {
                    String::new()
                } else {
                    format!("`{}`", text.trim())
                }
            }
            "pre" => {
                let code = self.render_children(element, Context { preformatted: true });
                let code = code.trim_matches('\n');
                if code.trim().is_empty() {
                    String::new()
                } else {
                    block(&format!("```\n{code}\n```"))
                }
            }
            "blockquote" => {
                let inner = tidy(&self.render_children(element, ctx));
                if inner.is_empty() {
                    String::new()
                } else {
                    block(&quote(&inner))
                }
            }
            "ul" => self.render_list(element, false, ctx),
            "ol" => self.render_list(element, true, ctx),
            "li" => {
                let marker = format!("{BULLET} ");
                block(&indent_continuation(
                    &marker,
                    &tighten(&tidy(&self.render_children(element, ctx))),
                ))
            }
            "tr" => self.render_row(element, ctx),
            "a" => self.render_link(element, ctx),
            "img" => {
                let alt = element.value().attr("alt").unwrap_or_default().trim();
                let src = element.value().attr("src").unwrap_or_default().trim();
                if src.is_empty() {
                    alt.to_string()
                } else {
                    format!("![{alt}]({src})")
                }
            }
            _ => self.render_children(element, ctx),
        }
    }

    fn render_link(&self, element: ElementRef<'_>, ctx: Context) -> String {
        let content = self.render_children(element, ctx);
        match self.links {
            LinkStyle::TextOnly => content,
            LinkStyle::Inline => {
                let href = element.value().attr("href").unwrap_or_default().trim();
                let text = content.trim();
                if href.is_empty() || text.is_empty() {
                    content
                } else {
                    format!("[{text}]({href})")
                }
            }
        }
    }

    fn render_list(&self, element: ElementRef<'_>, ordered: bool, ctx: Context) -> String {
        let mut index = if ordered {
            element
                .value()
                .attr("start")
                .and_then(|start| start.trim().parse::<usize>().ok())
                .unwrap_or(1)
        } else {
            1
        };

        let mut items = Vec::new();
        for item in element.children().filter_map(ElementRef::wrap) {
            let body = tighten(&tidy(&self.render_children(item, ctx)));
            if body.is_empty() {
                // Empty items keep their number so later items stay aligned.
                index += 1;
                continue;
            }
            let marker = if ordered {
                format!("{index}. ")
            } else {
                format!("{BULLET} ")
            };
            index += 1;
            items.push(indent_continuation(&marker, &body));
        }

        if items.is_empty() {
            String::new()
        } else {
            block(&items.join("\n"))
        }
    }

    fn render_row(&self, element: ElementRef<'_>, ctx: Context) -> String {
        let cells: Vec<String> = element
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|cell| matches!(cell.value().name(), "td" | "th"))
            .map(|cell| single_line(&self.render_children(cell, ctx)))
            .filter(|cell| !cell.is_empty())
            .collect();
        if cells.is_empty() {
            String::new()
        } else {
            format!("{}\n", cells.join(" | "))
        }
    }
}

/// Convert `html` with the default configuration (links reduced to text).
#[must_use]
pub fn html_to_text(html: &str) -> String {
    DEFAULT_CONVERTER.convert(html)
}

#[must_use]
pub fn contains_markup(text: &str) -> bool {
    MARKUP_RE.is_match(text)
}

fn looks_like_document(html: &str) -> bool {
    let head = html.trim_start();
    ["<!doctype", "<html"].iter().any(|prefix| {
        head.get(..prefix.len())
            .is_some_and(|start| start.eq_ignore_ascii_case(prefix))
    })
}

pub fn header(level: usize, text: &str) -> String {
    let level = level.clamp(1, 6);
    format!("{} {}", "#".repeat(level), text)
}

/// Italicize the whole of `text`. A lone `_…_` span is already italic;
/// text with other `_` emphasis inside is wrapped in `*…*` so the outer
/// span never closes early.
pub fn italic(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let inner = text
        .strip_prefix('_')
        .and_then(|rest| rest.strip_suffix('_'));
    match inner {
        Some(inner) if !inner.is_empty() && !inner.contains('_') => text.to_string(),
        _ if text.contains('_') => format!("*{text}*"),
        _ => format!("_{text}_"),
    }
}

pub fn blank_line() -> String {
    String::new()
}

/// Collapse a rendered fragment onto one line.
pub fn single_line(text: &str) -> String {
    WHITESPACE_RE.replace_all(text.trim(), " ").into_owned()
}

/// Prefix the first line with `marker` and indent the following lines to
/// line up under the text after the marker.
pub fn indent_continuation(marker: &str, body: &str) -> String {
    let padding = " ".repeat(marker.chars().count());
    let mut out = String::new();
    for (idx, line) in body.lines().enumerate() {
        if idx == 0 {
            out.push_str(marker);
            out.push_str(line);
        } else {
            out.push('\n');
            if !line.is_empty() {
                out.push_str(&padding);
                out.push_str(line);
            }
        }
    }
    if out.is_empty() {
        out.push_str(marker.trim_end());
    }
    out
}

fn block(content: &str) -> String {
    if content.is_empty() {
        String::new()
    } else {
        format!("\n\n{content}\n\n")
    }
}

fn quote(content: &str) -> String {
    content
        .lines()
        .map(|line| {
            if line.is_empty() {
                ">".to_string()
            } else {
                format!("> {line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn delimit(content: &str, delimiter: &str) -> String {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return content.to_string();
    }
    let lead = if content.starts_with(char::is_whitespace) { " " } else { "" };
    let trail = if content.ends_with(char::is_whitespace) { " " } else { "" };
    format!("{lead}{delimiter}{trimmed}{delimiter}{trail}")
}

fn trim_trailing_spaces(out: &mut String) {
    let kept = out.trim_end_matches(' ').len();
    out.truncate(kept);
}

/// Drop blank lines inside list items.
fn tighten(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Strip trailing whitespace per line, keep at most one blank line between
/// blocks and trim the ends.
fn tidy(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0usize;
    for line in text.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
            if blank_run > 0 {
                out.push('\n');
            }
        }
        blank_run = 0;
        out.push_str(line);
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchors_keep_inner_text_only() {
        let converted = html_to_text("<p>a <a href='#'>test</a> unit</p>");
        assert_eq!(converted, "a test unit");

        let converted =
            html_to_text(r#"see <a href="/wiki/cat" title="cat">[[cat]]</a>s and <a href="x"><b>dog</b></a>"#);
        assert_eq!(converted, "see [[cat]]s and **dog**");
        assert!(!converted.contains("]("));
        assert!(!converted.contains("href"));
    }

    #[test]
    fn inline_links_when_requested() {
        let converter = HtmlConverter::with_links(LinkStyle::Inline);
        assert_eq!(
            converter.convert(r#"<a href="https://example.org">site</a>"#),
            "[site](https://example.org)"
        );
    }

    #[test]
    fn plain_text_is_returned_unchanged() {
        for sample in [
            "hello world",
            "  spaced   out  ",
            "1. not a list * _ # [x](y)",
            "a < b and c > d",
            "Vec<String>",
            "e.g. <noun>",
            "use x <y> z",
            "<T: Clone>",
            "AT&T",
            "",
            "line one\n\nline two\t",
        ] {
            assert_eq!(html_to_text(sample), sample);
        }
    }

    #[test]
    fn only_html_elements_count_as_markup() {
        for html in ["<br/>", "<b>x</b>", "<a href=\"#\">x</a>", "<!-- c -->", "x &amp; y"] {
            assert!(contains_markup(html), "{html}");
        }
        for text in ["Vec<String>", "<noun>", "<bold>", "a <-> b", "AT&T"] {
            assert!(!contains_markup(text), "{text}");
        }
    }

    #[test]
    fn emphasis_and_strong() {
        assert_eq!(html_to_text("<i>a test case</i>"), "_a test case_");
        assert_eq!(html_to_text("a<i> b </i>c"), "a _b_ c");
        assert_eq!(html_to_text("<strong>bold</strong> move"), "**bold** move");
        assert_eq!(html_to_text("<em>  </em>x"), "x");
    }

    #[test]
    fn headings_paragraphs_and_breaks() {
        let html = "<h2>Etymology</h2>\n<p>From  Latin\n<i>cattus</i>.</p><p>Second<br>line</p>";
        assert_eq!(
            html_to_text(html),
            "## Etymology\n\nFrom Latin _cattus_.\n\nSecond\nline"
        );
    }

    #[test]
    fn lists_are_numbered_and_nested() {
        let html = "<ol><li>first</li><li>second<ul><li>inner</li></ul></li></ol>";
        assert_eq!(html_to_text(html), "1. first\n2. second\n   - inner");

        let html = r#"<ol start="4"><li>four</li><li>five</li></ol>"#;
        assert_eq!(html_to_text(html), "4. four\n5. five");
    }

    #[test]
    fn blockquote_and_code() {
        assert_eq!(
            html_to_text("<blockquote><p>one</p><p>two</p></blockquote>"),
            "> one\n>\n> two"
        );
        assert_eq!(html_to_text("use <code>cat  -n</code>"), "use `cat -n`");
        assert_eq!(
            html_to_text("<pre>fn main() {\n    x();\n}</pre>"),
            "```\nfn main() {\n    x();\n}\n```"
        );
    }

    #[test]
    fn entities_are_decoded() {
        assert_eq!(html_to_text("caf&eacute; &amp; bar"), "café & bar");
    }

    #[test]
    fn empty_markup_converts_to_empty_text() {
        assert_eq!(html_to_text("<p></p>"), "");
        assert_eq!(html_to_text("<span> </span>"), "");
        assert_eq!(html_to_text("<a href='#'></a>"), "");
    }

    #[test]
    fn full_document_skips_head_and_scripts() {
        let html = "<!DOCTYPE html><html><head><title>cat</title><style>p{}</style></head>\
                    <body><h1>cat</h1><script>alert(1)</script><p>A small <a href='/wiki/feline'>feline</a>.</p></body></html>";
        assert_eq!(html_to_text(html), "# cat\n\nA small feline.");
    }

    #[test]
    fn malformed_markup_does_not_panic() {
        let converted = html_to_text("<p>unclosed <b>bold <i>both</p></div><li>stray");
        assert!(converted.contains("unclosed"));
        assert!(converted.contains("stray"));
    }

    #[test]
    fn table_rows_join_cells() {
        let html = "<table><tr><th>sg</th><th>pl</th></tr><tr><td>cat</td><td>cats</td></tr></table>";
        assert_eq!(html_to_text(html), "sg | pl\ncat | cats");
    }

    #[test]
    fn continuation_lines_align_under_marker() {
        assert_eq!(indent_continuation("12. ", "a\nb"), "12. a\n    b");
        assert_eq!(italic("_x_"), "_x_");
        assert_eq!(italic("x"), "_x_");
        assert_eq!(italic("**bold**"), "_**bold**_");
        assert_eq!(italic("_one_ and _two_"), "*_one_ and _two_*");
        assert_eq!(italic(""), "");
        assert_eq!(header(9, "deep"), "###### deep");
    }
}
