// SPDX-FileCopyrightText: 2026 markdown-cms contributors
// SPDX-License-Identifier: Apache-2.0

//! Markdown-to-HTML transform pipeline.
//!
//! Rendering runs in strictly ordered stages:
//!
//! 1. parse markdown with GFM tables and strikethrough enabled,
//! 2. convert the event stream to an HTML tree ([`crate::ast`]),
//! 3. highlight fenced code blocks (unknown languages are left as plain text),
//! 4. append a copy-button element to every `<pre>` block,
//! 5. mark `http(s)` links as external (`target="_blank"`, `rel="noopener noreferrer"`),
//! 6. serialize the tree to an HTML string.
//!
//! Stages 3-5 are pure tree transforms applied via a fold over an explicit
//! ordered list; highlighting must run first so the later stages never touch
//! highlighter output. Malformed markdown yields best-effort HTML, never an
//! error, for any well-formed UTF-8 input.

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use syntect::html::{ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;
use tracing::debug;

use crate::ast::{self, Element, HtmlNode};
use crate::sanitize::sanitize;

/// Markdown renderer holding the loaded syntax definitions.
///
/// Construction is relatively expensive (syntax set load); build one per
/// process and share it.
pub struct MarkdownRenderer {
    syntaxes: SyntaxSet,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self {
            syntaxes: SyntaxSet::load_defaults_newlines(),
        }
    }

    /// Render a markdown body to HTML.
    pub fn render(&self, markdown: &str) -> String {
        let tree = parse_to_tree(markdown);

        // Ordered stage list; highlighting runs before the structural stages.
        let stages: [&dyn Fn(Vec<HtmlNode>) -> Vec<HtmlNode>; 3] = [
            &|tree| self.highlight_code_blocks(tree),
            &add_copy_buttons,
            &mark_external_links,
        ];
        let tree = stages.iter().fold(tree, |tree, stage| stage(tree));

        ast::serialize(&tree)
    }

    /// Render and then sanitize, for untrusted input such as admin previews.
    pub fn render_sanitized(&self, markdown: &str) -> String {
        sanitize(&self.render(markdown))
    }

    /// Replace the text of every fenced code block that names a known language
    /// with highlighter output, and mark it `data-highlighted`.
    fn highlight_code_blocks(&self, mut tree: Vec<HtmlNode>) -> Vec<HtmlNode> {
        ast::visit_elements_mut(&mut tree, &mut |el| {
            if el.tag != "pre" {
                return;
            }
            for child in &mut el.children {
                let HtmlNode::Element(code) = child else { continue };
                if code.tag != "code" {
                    continue;
                }
                let Some(lang) = code.attr("data-language").map(str::to_string) else {
                    continue;
                };
                let Some(syntax) = self.syntaxes.find_syntax_by_token(&lang) else {
                    debug!(language = %lang, "no syntax definition, leaving code block plain");
                    continue;
                };
                let source = ast::text_content(&code.children);
                let mut generator = ClassedHTMLGenerator::new_with_class_style(
                    syntax,
                    &self.syntaxes,
                    ClassStyle::Spaced,
                );
                let mut failed = false;
                for line in LinesWithEndings::from(&source) {
                    if generator
                        .parse_html_for_line_which_includes_newline(line)
                        .is_err()
                    {
                        failed = true;
                        break;
                    }
                }
                if failed {
                    debug!(language = %lang, "highlighting failed, leaving code block plain");
                    continue;
                }
                code.children = vec![HtmlNode::Raw(generator.finalize())];
                code.set_attr("data-highlighted", "true");
            }
        });
        tree
    }
}

/// Append a copy-button element as an extra child of every `<pre>` block.
fn add_copy_buttons(mut tree: Vec<HtmlNode>) -> Vec<HtmlNode> {
    ast::visit_elements_mut(&mut tree, &mut |el| {
        if el.tag != "pre" {
            return;
        }
        let mut button = Element::new("button");
        button.set_attr("class", "copy-button");
        button.set_attr("data-copy", "true");
        button.children.push(HtmlNode::Text("Copy".into()));
        el.children.push(HtmlNode::Element(button));
    });
    tree
}

/// Open links whose href starts with `http` in a new tab, with the rel
/// attributes that keep the opener window unreachable.
fn mark_external_links(mut tree: Vec<HtmlNode>) -> Vec<HtmlNode> {
    ast::visit_elements_mut(&mut tree, &mut |el| {
        if el.tag != "a" {
            return;
        }
        if el.attr("href").is_some_and(|href| href.starts_with("http")) {
            el.set_attr("target", "_blank");
            el.set_attr("rel", "noopener noreferrer");
        }
    });
    tree
}

/// Parse markdown and convert the event stream to an HTML tree.
fn parse_to_tree(markdown: &str) -> Vec<HtmlNode> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    let parser = Parser::new_ext(markdown, options);

    let mut builder = TreeBuilder::new();
    for event in parser {
        builder.handle(event);
    }
    builder.finish()
}

/// Incremental tree construction over the parser's start/end event pairs.
struct TreeBuilder {
    root: Vec<HtmlNode>,
    stack: Vec<Element>,
    in_table_head: bool,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            root: Vec::new(),
            stack: Vec::new(),
            in_table_head: false,
        }
    }

    fn finish(mut self) -> Vec<HtmlNode> {
        // An unbalanced parse should not happen, but close defensively rather
        // than dropping content.
        while !self.stack.is_empty() {
            self.close();
        }
        self.root
    }

    fn append(&mut self, node: HtmlNode) {
        match self.stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.root.push(node),
        }
    }

    fn open(&mut self, element: Element) {
        self.stack.push(element);
    }

    fn close(&mut self) {
        if let Some(element) = self.stack.pop() {
            self.append(HtmlNode::Element(element));
        }
    }

    fn handle(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => self.append(HtmlNode::Text(text.to_string())),
            Event::Code(text) => {
                let mut code = Element::new("code");
                code.children.push(HtmlNode::Text(text.to_string()));
                self.append(HtmlNode::Element(code));
            }
            Event::Html(html) | Event::InlineHtml(html) => {
                self.append(HtmlNode::Raw(html.to_string()));
            }
            Event::SoftBreak => self.append(HtmlNode::Text("\n".into())),
            Event::HardBreak => self.append(HtmlNode::Element(Element::new("br"))),
            Event::Rule => self.append(HtmlNode::Element(Element::new("hr"))),
            // Footnotes, task lists and math are not enabled.
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => self.open(Element::new("p")),
            Tag::Heading { level, .. } => self.open(Element::new(heading_tag(level))),
            Tag::BlockQuote(_) => self.open(Element::new("blockquote")),
            Tag::CodeBlock(kind) => {
                self.open(Element::new("pre"));
                let mut code = Element::new("code");
                if let CodeBlockKind::Fenced(info) = kind {
                    if let Some(lang) = language_token(&info) {
                        code.set_attr("class", &format!("language-{lang}"));
                        code.set_attr("data-language", lang);
                    }
                }
                self.open(code);
            }
            Tag::List(Some(start)) => {
                let mut ol = Element::new("ol");
                if start != 1 {
                    ol.set_attr("start", &start.to_string());
                }
                self.open(ol);
            }
            Tag::List(None) => self.open(Element::new("ul")),
            Tag::Item => self.open(Element::new("li")),
            Tag::Emphasis => self.open(Element::new("em")),
            Tag::Strong => self.open(Element::new("strong")),
            Tag::Strikethrough => self.open(Element::new("del")),
            Tag::Link {
                dest_url, title, ..
            } => {
                let mut anchor = Element::new("a");
                anchor.set_attr("href", &dest_url);
                if !title.is_empty() {
                    anchor.set_attr("title", &title);
                }
                self.open(anchor);
            }
            Tag::Image {
                dest_url, title, ..
            } => {
                let mut img = Element::new("img");
                img.set_attr("src", &dest_url);
                if !title.is_empty() {
                    img.set_attr("title", &title);
                }
                self.open(img);
            }
            Tag::Table(_) => self.open(Element::new("table")),
            Tag::TableHead => {
                self.open(Element::new("thead"));
                self.open(Element::new("tr"));
                self.in_table_head = true;
            }
            Tag::TableRow => self.open(Element::new("tr")),
            Tag::TableCell => {
                let tag = if self.in_table_head { "th" } else { "td" };
                self.open(Element::new(tag));
            }
            // HTML blocks contribute their raw events directly.
            Tag::HtmlBlock => {}
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph
            | TagEnd::Heading(_)
            | TagEnd::BlockQuote(_)
            | TagEnd::List(_)
            | TagEnd::Item
            | TagEnd::Emphasis
            | TagEnd::Strong
            | TagEnd::Strikethrough
            | TagEnd::Link
            | TagEnd::TableRow
            | TagEnd::TableCell => self.close(),
            TagEnd::CodeBlock => {
                self.close(); // code
                self.close(); // pre
            }
            TagEnd::Image => {
                // Pulldown models the alt text as children; fold it into the
                // alt attribute of the void element.
                if let Some(mut img) = self.stack.pop() {
                    let alt = ast::text_content(&img.children);
                    img.children.clear();
                    img.set_attr("alt", &alt);
                    self.append(HtmlNode::Element(img));
                }
            }
            TagEnd::TableHead => {
                self.close(); // tr
                self.close(); // thead
                self.in_table_head = false;
                self.open(Element::new("tbody"));
            }
            TagEnd::Table => {
                self.close(); // tbody
                self.close(); // table
            }
            TagEnd::HtmlBlock => {}
            _ => {}
        }
    }
}

fn heading_tag(level: HeadingLevel) -> &'static str {
    match level {
        HeadingLevel::H1 => "h1",
        HeadingLevel::H2 => "h2",
        HeadingLevel::H3 => "h3",
        HeadingLevel::H4 => "h4",
        HeadingLevel::H5 => "h5",
        HeadingLevel::H6 => "h6",
    }
}

/// First token of a fence info string (`rust,ignore` -> `rust`).
fn language_token(info: &str) -> Option<&str> {
    let token = info.split([' ', ',', '\t']).next().unwrap_or("").trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer() -> MarkdownRenderer {
        MarkdownRenderer::new()
    }

    #[test]
    fn renders_basic_blocks() {
        let html = renderer().render("# Title\n\nHello *world*.");
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<p>Hello <em>world</em>.</p>"));
    }

    #[test]
    fn renders_blockquotes() {
        let html = renderer().render("> quoted\n> lines");
        assert!(html.contains("<blockquote><p>quoted\nlines</p></blockquote>"));
    }

    #[test]
    fn renders_gfm_table_and_strikethrough() {
        let html = renderer().render("| a | b |\n|---|---|\n| 1 | 2 |\n\n~~gone~~");
        assert!(html.contains("<table><thead><tr><th>a</th><th>b</th></tr></thead>"));
        assert!(html.contains("<tbody><tr><td>1</td><td>2</td></tr></tbody></table>"));
        assert!(html.contains("<del>gone</del>"));
    }

    #[test]
    fn highlights_known_language_and_keeps_metadata() {
        let html = renderer().render("```rust\nfn main() {}\n```");
        assert!(html.contains("data-language=\"rust\""));
        assert!(html.contains("data-highlighted=\"true\""));
        assert!(html.contains("class=\"language-rust\""));
        assert!(html.contains("<span"));
    }

    #[test]
    fn tolerates_unknown_language() {
        let html = renderer().render("```zzz-nolang\nplain text\n```");
        assert!(html.contains("data-language=\"zzz-nolang\""));
        assert!(!html.contains("data-highlighted"));
        assert!(html.contains("plain text"));
    }

    #[test]
    fn indented_code_blocks_carry_no_language() {
        let html = renderer().render("    let x = 1;\n");
        assert!(html.contains("<pre><code>"));
        assert!(!html.contains("data-language"));
    }

    #[test]
    fn every_code_block_gets_a_copy_button() {
        let html = renderer().render("```rust\nfn main() {}\n```\n\n```\nplain\n```");
        let buttons = html
            .matches("<button class=\"copy-button\" data-copy=\"true\">Copy</button></pre>")
            .count();
        assert_eq!(buttons, 2);
    }

    #[test]
    fn external_links_open_in_new_tab() {
        let html = renderer().render("[out](https://example.com) and [in](/about)");
        assert!(html.contains(
            "<a href=\"https://example.com\" target=\"_blank\" rel=\"noopener noreferrer\">out</a>"
        ));
        assert!(html.contains("<a href=\"/about\">in</a>"));
    }

    #[test]
    fn image_alt_text_comes_from_children() {
        let html = renderer().render("![a cat](/cat.png)");
        assert!(html.contains("<img src=\"/cat.png\" alt=\"a cat\">"));
    }

    #[test]
    fn escapes_html_special_text() {
        let html = renderer().render("AT&T says 1 < 2");
        assert!(html.contains("AT&amp;T says 1 &lt; 2"));
    }

    #[test]
    fn malformed_markdown_is_best_effort_not_an_error() {
        // Unterminated constructs must still render something.
        let html = renderer().render("[unclosed](http://x\n\n```\nnever closed");
        assert!(!html.is_empty());
    }

    #[test]
    fn render_sanitized_strips_inline_script() {
        let html = renderer().render_sanitized("hello\n\n<script>alert(1)</script>");
        assert!(!html.contains("<script>"));
        assert!(html.contains("<p>hello</p>"));
    }
}
