// SPDX-FileCopyrightText: 2026 markdown-cms contributors
// SPDX-License-Identifier: Apache-2.0

//! Minimal HTML tree used as the intermediate representation of the markdown
//! pipeline.
//!
//! Transform stages mutate this tree structurally (adding attributes, appending
//! children) before a single serialization pass produces the final HTML string.
//! Text nodes are escaped at serialization time; `Raw` nodes pass through
//! verbatim and carry either author-written inline HTML or highlighter output.

/// A node in the HTML tree.
#[derive(Debug, Clone, PartialEq)]
pub enum HtmlNode {
    Element(Element),
    Text(String),
    Raw(String),
}

/// An element with ordered attributes and children.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<HtmlNode>,
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Value of an attribute, if present.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, replacing any existing value.
    pub fn set_attr(&mut self, name: &str, value: &str) {
        match self.attrs.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value.to_string(),
            None => self.attrs.push((name.to_string(), value.to_string())),
        }
    }
}

/// Depth-first pre-order visit of every element, mutably.
pub fn visit_elements_mut(nodes: &mut [HtmlNode], f: &mut impl FnMut(&mut Element)) {
    for node in nodes {
        if let HtmlNode::Element(el) = node {
            f(el);
            visit_elements_mut(&mut el.children, f);
        }
    }
}

/// Concatenated text content of a subtree, ignoring raw HTML.
pub fn text_content(nodes: &[HtmlNode]) -> String {
    let mut out = String::new();
    collect_text(nodes, &mut out);
    out
}

fn collect_text(nodes: &[HtmlNode], out: &mut String) {
    for node in nodes {
        match node {
            HtmlNode::Text(t) => out.push_str(t),
            HtmlNode::Element(el) => collect_text(&el.children, out),
            HtmlNode::Raw(_) => {}
        }
    }
}

const VOID_TAGS: &[&str] = &["br", "hr", "img"];

/// Serialize a tree to an HTML string.
pub fn serialize(nodes: &[HtmlNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(node, &mut out);
    }
    out
}

fn write_node(node: &HtmlNode, out: &mut String) {
    match node {
        HtmlNode::Text(t) => out.push_str(&escape_text(t)),
        HtmlNode::Raw(html) => out.push_str(html),
        HtmlNode::Element(el) => {
            out.push('<');
            out.push_str(&el.tag);
            for (name, value) in &el.attrs {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                out.push_str(&escape_attr(value));
                out.push('"');
            }
            out.push('>');
            if VOID_TAGS.contains(&el.tag.as_str()) {
                return;
            }
            for child in &el.children {
                write_node(child, out);
            }
            out.push_str("</");
            out.push_str(&el.tag);
            out.push('>');
        }
    }
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn el(tag: &str, children: Vec<HtmlNode>) -> HtmlNode {
        let mut e = Element::new(tag);
        e.children = children;
        HtmlNode::Element(e)
    }

    #[test]
    fn serializes_nested_elements_with_attrs() {
        let mut anchor = Element::new("a");
        anchor.set_attr("href", "https://example.com?a=1&b=2");
        anchor.children.push(HtmlNode::Text("link".into()));

        let tree = vec![el("p", vec![HtmlNode::Element(anchor)])];
        assert_eq!(
            serialize(&tree),
            "<p><a href=\"https://example.com?a=1&amp;b=2\">link</a></p>"
        );
    }

    #[test]
    fn escapes_text_nodes() {
        let tree = vec![el("p", vec![HtmlNode::Text("<script>alert(1)</script>".into())])];
        assert_eq!(
            serialize(&tree),
            "<p>&lt;script&gt;alert(1)&lt;/script&gt;</p>"
        );
    }

    #[test]
    fn void_elements_have_no_closing_tag() {
        let mut img = Element::new("img");
        img.set_attr("src", "/cat.png");
        img.set_attr("alt", "cat");
        assert_eq!(
            serialize(&[HtmlNode::Element(img)]),
            "<img src=\"/cat.png\" alt=\"cat\">"
        );
    }

    #[test]
    fn raw_nodes_pass_through() {
        let tree = vec![HtmlNode::Raw("<span class=\"kw\">fn</span>".into())];
        assert_eq!(serialize(&tree), "<span class=\"kw\">fn</span>");
    }

    #[test]
    fn set_attr_replaces_existing_value() {
        let mut e = Element::new("a");
        e.set_attr("href", "/one");
        e.set_attr("href", "/two");
        assert_eq!(e.attr("href"), Some("/two"));
        assert_eq!(e.attrs.len(), 1);
    }

    #[test]
    fn text_content_skips_raw_html() {
        let tree = vec![el(
            "pre",
            vec![
                HtmlNode::Text("let x = 1;".into()),
                HtmlNode::Raw("<span>ignored</span>".into()),
            ],
        )];
        assert_eq!(text_content(&tree), "let x = 1;");
    }
}
