//---------------------------------------------------------------------------//
// Copyright (c) 2017-2025 Ismael Gutiérrez González. All rights reserved.
//
// This file is part of the Rusted BCF Manager (RBCF) project,
// which can be found here: https://github.com/Frodo45127/rbcf.
//
// This file is licensed under the MIT license, which can be found here:
// https://github.com/Frodo45127/rbcf/blob/master/LICENSE.
//---------------------------------------------------------------------------//

//! This module contains a neutral, owned representation of an XML element tree.
//!
//! The validator lifts documents into this representation for the reader, and
//! the entities serialise themselves into it for the writer. It's deliberately
//! dumb: names, attributes in document order, children in document order, text.

use quick_xml::escape::escape;

use crate::error::{RLibError, Result};

/// Default indentation unit used when serialising fresh documents/fragments.
pub const INDENT: &str = "  ";

//---------------------------------------------------------------------------//
//                              Enum & Structs
//---------------------------------------------------------------------------//

/// One XML element: name, attributes, element children and text content.
///
/// Text is only kept when it's not pure inter-element whitespace.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct XmlTree {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<XmlTree>,
    text: String,
}

//---------------------------------------------------------------------------//
//                           Implementations
//---------------------------------------------------------------------------//

impl XmlTree {

    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            ..Default::default()
        }
    }

    /// This function lifts a parsed element (and everything below it) into an owned tree.
    pub fn from_node(node: roxmltree::Node) -> Self {
        let mut tree = Self::new(node.tag_name().name());

        for attribute in node.attributes() {
            tree.attributes.push((attribute.name().to_owned(), attribute.value().to_owned()));
        }

        let mut text = String::new();
        for child in node.children() {
            if child.is_element() {
                tree.children.push(Self::from_node(child));
            } else if child.is_text() {
                if let Some(chunk) = child.text() {
                    text.push_str(chunk);
                }
            }
        }

        // Pure inter-element whitespace is layout, not content.
        if !text.trim().is_empty() {
            tree.text = text;
        }

        tree
    }

    /// This function parses a whole document into a tree, rooted on its root element.
    pub fn from_str(text: &str, path_for_errors: &str) -> Result<Self> {
        let document = roxmltree::Document::parse(text)
            .map_err(|error| RLibError::XmlNotParseable(path_for_errors.to_owned(), error.to_string()))?;
        Ok(Self::from_node(document.root_element()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    pub fn children(&self) -> &[XmlTree] {
        &self.children
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.iter().find(|(key, _)| key == name).map(|(_, value)| &**value)
    }

    /// First child element with the provided name, if any.
    pub fn child(&self, name: &str) -> Option<&XmlTree> {
        self.children.iter().find(|child| child.name == name)
    }

    /// All child elements with the provided name, in document order.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlTree> {
        self.children.iter().filter(move |child| child.name == name)
    }

    /// Text of the first child element with the provided name, if any.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(|child| child.text())
    }

    pub fn set_text(&mut self, text: &str) {
        self.text = text.to_owned();
    }

    pub fn push_attribute(&mut self, name: &str, value: &str) {
        self.attributes.push((name.to_owned(), value.to_owned()));
    }

    pub fn push_child(&mut self, child: XmlTree) {
        self.children.push(child);
    }

    /// This function serialises the tree as an XML fragment.
    ///
    /// Lines after the first are indented relative to the fragment itself; the
    /// caller re-indents the whole block to its insertion point.
    pub fn to_fragment(&self) -> String {
        let mut buffer = String::new();
        self.write_into(&mut buffer, 0);
        buffer
    }

    /// This function serialises the tree as a full standalone document.
    pub fn to_document(&self) -> String {
        let mut buffer = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        self.write_into(&mut buffer, 0);
        buffer.push('\n');
        buffer
    }

    fn write_into(&self, buffer: &mut String, level: usize) {
        for _ in 0..level {
            buffer.push_str(INDENT);
        }

        buffer.push('<');
        buffer.push_str(&self.name);
        for (name, value) in &self.attributes {
            buffer.push(' ');
            buffer.push_str(name);
            buffer.push_str("=\"");
            buffer.push_str(&escape(&**value));
            buffer.push('"');
        }

        if self.children.is_empty() && self.text.is_empty() {
            buffer.push_str("/>");
        } else if self.children.is_empty() {
            buffer.push('>');
            buffer.push_str(&escape(&*self.text));
            buffer.push_str("</");
            buffer.push_str(&self.name);
            buffer.push('>');
        } else {
            buffer.push('>');
            for child in &self.children {
                buffer.push('\n');
                child.write_into(buffer, level + 1);
            }
            buffer.push('\n');
            for _ in 0..level {
                buffer.push_str(INDENT);
            }
            buffer.push_str("</");
            buffer.push_str(&self.name);
            buffer.push('>');
        }
    }
}
