//! Conversion of the small markdown subset the model answers in (bold, italics
//! and `* ` bullet lists) into terminal lines, HTML and ANSI text.

use std::sync::OnceLock;

use colored::Colorize;
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emphasis {
    Plain,
    Bold,
    Italic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inline {
    pub text: String,
    pub emphasis: Emphasis,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Paragraph(Vec<Inline>),
    List(Vec<Vec<Inline>>),
}

/// Spacing between blocks: chat bubbles are compact, the result view is roomy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Density {
    Compact,
    Roomy,
}

fn bold_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*\*(.*?)\*\*").expect("valid bold regex"))
}

fn italic_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*(.+?)\*").expect("valid italic regex"))
}

/// Split `text` on `re`, wrapping the captured group with `emphasis`
fn split_emphasis(text: &str, re: &Regex, emphasis: Emphasis, out: &mut Vec<Inline>, rest: Emphasis) {
    let mut last = 0;
    for caps in re.captures_iter(text) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if whole.start() > last {
            out.push(Inline {
                text: text[last..whole.start()].to_string(),
                emphasis: rest,
            });
        }
        out.push(Inline {
            text: inner.as_str().to_string(),
            emphasis,
        });
        last = whole.end();
    }
    if last < text.len() {
        out.push(Inline {
            text: text[last..].to_string(),
            emphasis: rest,
        });
    }
}

/// Parse `**bold**` first, then `*italic*` inside what is left plain
pub fn parse_inline(text: &str) -> Vec<Inline> {
    let mut bold_pass = Vec::new();
    split_emphasis(text, bold_re(), Emphasis::Bold, &mut bold_pass, Emphasis::Plain);

    let mut inlines = Vec::new();
    for inline in bold_pass {
        if inline.emphasis == Emphasis::Plain {
            split_emphasis(&inline.text, italic_re(), Emphasis::Italic, &mut inlines, Emphasis::Plain);
        } else {
            inlines.push(inline);
        }
    }
    inlines
}

/// Parse an answer line by line into paragraphs and bullet lists
pub fn parse(text: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut list: Option<Vec<Vec<Inline>>> = None;

    for line in text.split('\n') {
        let trimmed = line.trim();
        if let Some(item) = trimmed.strip_prefix("* ") {
            list.get_or_insert_with(Vec::new)
                .push(parse_inline(item.trim_start()));
            continue;
        }

        if let Some(items) = list.take() {
            blocks.push(Block::List(items));
        }
        if !trimmed.is_empty() {
            blocks.push(Block::Paragraph(parse_inline(line.trim_end())));
        }
    }

    if let Some(items) = list.take() {
        blocks.push(Block::List(items));
    }
    blocks
}

fn to_spans(inlines: &[Inline], base: Style) -> Vec<Span<'static>> {
    inlines
        .iter()
        .map(|inline| {
            let style = match inline.emphasis {
                Emphasis::Plain => base,
                Emphasis::Bold => base.fg(Color::White).add_modifier(Modifier::BOLD),
                Emphasis::Italic => base.add_modifier(Modifier::ITALIC),
            };
            Span::styled(inline.text.clone(), style)
        })
        .collect()
}

/// Render blocks as terminal lines in the given base style
pub fn to_lines(blocks: &[Block], density: Density, base: Style) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();

    for (i, block) in blocks.iter().enumerate() {
        if density == Density::Roomy && i > 0 {
            lines.push(Line::default());
        }
        match block {
            Block::Paragraph(inlines) => lines.push(Line::from(to_spans(inlines, base))),
            Block::List(items) => {
                for item in items {
                    let mut spans = vec![Span::styled("  • ", base.fg(Color::Cyan))];
                    spans.extend(to_spans(item, base));
                    lines.push(Line::from(spans));
                }
            }
        }
    }
    lines
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn inlines_to_html(inlines: &[Inline]) -> String {
    let mut html = String::new();
    for inline in inlines {
        let text = escape_html(&inline.text);
        match inline.emphasis {
            Emphasis::Plain => html.push_str(&text),
            Emphasis::Bold => {
                html.push_str(&format!("<strong class=\"font-semibold text-white\">{}</strong>", text))
            }
            Emphasis::Italic => html.push_str(&format!("<em>{}</em>", text)),
        }
    }
    html
}

/// Render blocks as HTML markup
pub fn to_html(blocks: &[Block], density: Density) -> String {
    let (list_class, p_class) = match density {
        Density::Compact => ("list-disc list-inside space-y-1 my-2", "my-2"),
        Density::Roomy => ("list-disc list-inside space-y-2 my-4", "my-4"),
    };

    let mut html = String::new();
    for block in blocks {
        match block {
            Block::Paragraph(inlines) => {
                html.push_str(&format!("<p class=\"{}\">{}</p>", p_class, inlines_to_html(inlines)));
            }
            Block::List(items) => {
                html.push_str(&format!("<ul class=\"{}\">", list_class));
                for item in items {
                    html.push_str(&format!("<li>{}</li>", inlines_to_html(item)));
                }
                html.push_str("</ul>");
            }
        }
    }
    html
}

fn inlines_to_ansi(inlines: &[Inline]) -> String {
    inlines
        .iter()
        .map(|inline| match inline.emphasis {
            Emphasis::Plain => inline.text.clone(),
            Emphasis::Bold => inline.text.bold().to_string(),
            Emphasis::Italic => inline.text.italic().to_string(),
        })
        .collect()
}

/// Render blocks as ANSI-styled text for plain stdout output
pub fn to_ansi(blocks: &[Block]) -> String {
    let mut out = Vec::new();
    for block in blocks {
        match block {
            Block::Paragraph(inlines) => out.push(inlines_to_ansi(inlines)),
            Block::List(items) => {
                let list: Vec<String> = items
                    .iter()
                    .map(|item| format!("  • {}", inlines_to_ansi(item)))
                    .collect();
                out.push(list.join("\n"));
            }
        }
    }
    out.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(text: &str) -> Inline {
        Inline {
            text: text.to_string(),
            emphasis: Emphasis::Plain,
        }
    }

    fn bold(text: &str) -> Inline {
        Inline {
            text: text.to_string(),
            emphasis: Emphasis::Bold,
        }
    }

    fn italic(text: &str) -> Inline {
        Inline {
            text: text.to_string(),
            emphasis: Emphasis::Italic,
        }
    }

    #[test]
    fn test_bold_and_italic_spans() {
        assert_eq!(
            parse_inline("a **b** c *d* e"),
            vec![plain("a "), bold("b"), plain(" c "), italic("d"), plain(" e")]
        );
    }

    #[test]
    fn test_unclosed_markers_stay_literal() {
        assert_eq!(parse_inline("2 ** 3"), vec![plain("2 ** 3")]);
        assert_eq!(parse_inline("**open"), vec![plain("**open")]);
    }

    #[test]
    fn test_empty_bold_pair_is_consumed() {
        assert_eq!(parse_inline("a **** b"), vec![plain("a "), bold(""), plain(" b")]);
        assert_eq!(
            to_html(&parse("****"), Density::Compact),
            "<p class=\"my-2\"><strong class=\"font-semibold text-white\"></strong></p>"
        );
    }

    #[test]
    fn test_italic_inside_bold_is_not_split() {
        assert_eq!(parse_inline("**a *b* c**"), vec![bold("a *b* c")]);
    }

    #[test]
    fn test_bullets_group_into_one_list() {
        let blocks = parse("Intro\n* one\n* **two**\n  * three\nOutro");
        assert_eq!(
            blocks,
            vec![
                Block::Paragraph(vec![plain("Intro")]),
                Block::List(vec![vec![plain("one")], vec![bold("two")], vec![plain("three")]]),
                Block::Paragraph(vec![plain("Outro")]),
            ]
        );
    }

    #[test]
    fn test_blank_line_splits_lists_without_empty_paragraph() {
        let blocks = parse("* a\n\n* b\n");
        assert_eq!(
            blocks,
            vec![
                Block::List(vec![vec![plain("a")]]),
                Block::List(vec![vec![plain("b")]]),
            ]
        );
    }

    #[test]
    fn test_blank_lines_produce_nothing() {
        assert!(parse("").is_empty());
        assert!(parse("\n   \n\r\n").is_empty());
        assert_eq!(parse("a\n\n\nb").len(), 2);
    }

    #[test]
    fn test_bullet_with_wide_marker_spacing() {
        assert_eq!(
            parse("*   **Name:** value"),
            vec![Block::List(vec![vec![bold("Name:"), plain(" value")]])]
        );
    }

    #[test]
    fn test_to_html_roomy() {
        let html = to_html(&parse("**Hi** there\n* *x*\n* y"), Density::Roomy);
        assert_eq!(
            html,
            "<p class=\"my-4\"><strong class=\"font-semibold text-white\">Hi</strong> there</p>\
             <ul class=\"list-disc list-inside space-y-2 my-4\"><li><em>x</em></li><li>y</li></ul>"
        );
    }

    #[test]
    fn test_to_html_compact_escapes_text() {
        let html = to_html(&parse("a < b & c"), Density::Compact);
        assert_eq!(html, "<p class=\"my-2\">a &lt; b &amp; c</p>");
    }

    #[test]
    fn test_to_lines_styles_and_spacing() {
        let blocks = parse("**B** text\n\n* item");
        let roomy = to_lines(&blocks, Density::Roomy, Style::default());
        assert_eq!(roomy.len(), 3);
        assert!(roomy[0].spans[0].style.add_modifier.contains(Modifier::BOLD));
        assert_eq!(roomy[1], Line::default());
        assert_eq!(roomy[2].spans[0].content, "  • ");
        assert_eq!(roomy[2].spans[1].content, "item");

        let compact = to_lines(&blocks, Density::Compact, Style::default());
        assert_eq!(compact.len(), 2);
    }

    #[test]
    fn test_to_ansi_keeps_list_items() {
        colored::control::set_override(false);
        let out = to_ansi(&parse("Top\n* a\n* b"));
        assert_eq!(out, "Top\n\n  • a\n  • b");
    }
}
