// Copyright © 2024 Shire. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Document Trees
//!
//! Templates are parsed with `html5ever` into an `RcDom` and immediately
//! converted into an owned [`Node`] tree. The owned tree is `Send + Sync`, so
//! resolved templates can be shared by every render worker.
//!
//! The serializer writes HTML5: void elements have no closing tag, text
//! inside `script` and `style` is written verbatim, and everything else is
//! escaped.

use html5ever::tendril::TendrilSink;
use html5ever::{parse_document, QualName};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

/// HTML5 void elements, which never have children or closing tags.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link",
    "meta", "param", "source", "track", "wbr",
];

/// Elements whose text content is not escaped.
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "script", "style", "xmp", "iframe", "noembed", "noframes", "plaintext",
];

/// A node of an owned document tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// An element and its subtree.
    Element(Element),
    /// Character data.
    Text(String),
    /// An HTML comment.
    Comment(String),
    /// A doctype declaration, by name.
    Doctype(String),
}

/// An element with its attributes and children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    /// Tag name as written, lowercased by the parser.
    pub name: String,
    /// Attributes in source order.
    pub attrs: Vec<(String, String)>,
    /// Child nodes in document order.
    pub children: Vec<Node>,
}

impl Element {
    /// Returns the value of attribute `name`.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// A parsed HTML document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    /// Top-level nodes: usually a doctype and the `html` element.
    pub nodes: Vec<Node>,
}

impl Document {
    /// Parses `text` as a complete HTML document.
    ///
    /// Parsing never fails; the HTML5 algorithm recovers from any input.
    pub fn parse(text: &str) -> Self {
        let dom = parse_document(RcDom::default(), Default::default()).one(text);
        let mut nodes = Vec::new();
        convert(&dom.document, &mut nodes);
        Self { nodes }
    }

    /// The `body` element, if the document has one.
    pub fn body(&self) -> Option<&Element> {
        self.html().and_then(|html| child_element(&html.children, "body"))
    }

    /// Consumes the document and returns the children of its `body`.
    pub fn into_body_children(self) -> Vec<Node> {
        self.nodes
            .into_iter()
            .find_map(|node| match node {
                Node::Element(html) if html.name == "html" => {
                    html.children.into_iter().find_map(|child| match child {
                        Node::Element(body) if body.name == "body" => {
                            Some(body.children)
                        }
                        _ => None,
                    })
                }
                _ => None,
            })
            .unwrap_or_default()
    }

    /// Returns every element named `name`, in document order.
    pub fn elements_named(&self, name: &str) -> Vec<&Element> {
        let mut found = Vec::new();
        collect_named(&self.nodes, name, &mut found);
        found
    }

    /// Serializes the document to HTML.
    pub fn to_html(&self) -> String {
        serialize(&self.nodes)
    }

    fn html(&self) -> Option<&Element> {
        child_element(&self.nodes, "html")
    }
}

fn child_element<'a>(nodes: &'a [Node], name: &str) -> Option<&'a Element> {
    nodes.iter().find_map(|node| match node {
        Node::Element(element) if element.name == name => Some(element),
        _ => None,
    })
}

fn collect_named<'a>(
    nodes: &'a [Node],
    name: &str,
    found: &mut Vec<&'a Element>,
) {
    for node in nodes {
        if let Node::Element(element) = node {
            if element.name == name {
                found.push(element);
            }
            collect_named(&element.children, name, found);
        }
    }
}

fn qualified(name: &QualName) -> String {
    match &name.prefix {
        Some(prefix) => format!("{}:{}", prefix, name.local),
        None => name.local.to_string(),
    }
}

fn convert(handle: &Handle, out: &mut Vec<Node>) {
    match &handle.data {
        NodeData::Document => {
            for child in handle.children.borrow().iter() {
                convert(child, out);
            }
        }
        NodeData::Doctype { name, .. } => {
            out.push(Node::Doctype(name.to_string()));
        }
        NodeData::Text { contents } => {
            out.push(Node::Text(contents.borrow().to_string()));
        }
        NodeData::Comment { contents } => {
            out.push(Node::Comment(contents.to_string()));
        }
        NodeData::Element {
            name,
            attrs,
            template_contents,
            ..
        } => {
            let mut children = Vec::new();
            if let Some(contents) = template_contents.borrow().as_ref() {
                for child in contents.children.borrow().iter() {
                    convert(child, &mut children);
                }
            }
            for child in handle.children.borrow().iter() {
                convert(child, &mut children);
            }
            out.push(Node::Element(Element {
                name: qualified(name),
                attrs: attrs
                    .borrow()
                    .iter()
                    .map(|attr| (qualified(&attr.name), attr.value.to_string()))
                    .collect(),
                children,
            }));
        }
        NodeData::ProcessingInstruction { .. } => {}
    }
}

/// Serializes a list of nodes to HTML.
pub fn serialize(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(&mut out, node, false);
    }
    out
}

fn write_node(out: &mut String, node: &Node, raw_text: bool) {
    match node {
        Node::Doctype(name) => {
            out.push_str("<!DOCTYPE ");
            out.push_str(name);
            out.push('>');
        }
        Node::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        Node::Text(text) if raw_text => out.push_str(text),
        Node::Text(text) => out.push_str(&escape_text(text)),
        Node::Element(element) => {
            out.push('<');
            out.push_str(&element.name);
            for (key, value) in &element.attrs {
                out.push(' ');
                out.push_str(key);
                out.push_str("=\"");
                out.push_str(&escape_attr(value));
                out.push('"');
            }
            out.push('>');

            if VOID_ELEMENTS.contains(&element.name.as_str()) {
                return;
            }

            let raw = RAW_TEXT_ELEMENTS.contains(&element.name.as_str());
            for child in &element.children {
                write_node(out, child, raw);
            }

            out.push_str("</");
            out.push_str(&element.name);
            out.push('>');
        }
    }
}

/// Escapes `&`, `<` and `>` for use in HTML text.
pub fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\u{a0}' => escaped.push_str("&nbsp;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Escapes `&` and `"` for use in a double-quoted attribute value.
pub fn escape_attr(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\u{a0}' => escaped.push_str("&nbsp;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
