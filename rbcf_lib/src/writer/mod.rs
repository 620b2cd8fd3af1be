//---------------------------------------------------------------------------//
// Copyright (c) 2017-2025 Ismael Gutiérrez González. All rights reserved.
//
// This file is part of the Rusted BCF Manager (RBCF) project,
// which can be found here: https://github.com/Frodo45127/rbcf.
//
// This file is licensed under the MIT license, which can be found here:
// https://github.com/Frodo45127/rbcf/blob/master/LICENSE.
//---------------------------------------------------------------------------//

//! This module contains the differential writer of BCF documents.
//!
//! Third-party tools are touchy about the formatting of the XML they wrote, so
//! this writer never re-serialises a whole document to change one value.
//! Instead it locates the affected element through the entity back-chain and
//! splices the smallest possible byte range of the original text: one child
//! element, one start tag, one inserted fragment, one removed span. Everything
//! outside the splice stays bit-identical.
//!
//! Locating is done on the parsed document, walking the chain of
//! [`ElementMatcher`]s level by level: candidates are filtered by element name,
//! then disambiguated by `Guid`, by exact text (list items), by the text of
//! non-default child cells, and last by non-default attributes. Zero survivors
//! mean the file drifted from the model; more than one survivor means we
//! refuse to guess. Neither mutates anything.

use quick_xml::escape::escape;

use std::ops::Range;

use crate::error::{RLibError, Result};
use crate::model::ElementMatcher;
use crate::schema::Xsd;
use crate::xml::INDENT;

pub mod update;

#[cfg(test)] mod writer_test;

//---------------------------------------------------------------------------//
//                           Locate functions
//---------------------------------------------------------------------------//

/// This function walks the matcher chain down a parsed document and returns the
/// element of the last matcher. The first matcher must name the document root.
fn find_in_doc<'a, 'input>(
    doc: &'a roxmltree::Document<'input>,
    chain: &[ElementMatcher],
    doc_path: &str,
) -> Result<roxmltree::Node<'a, 'input>> {
    let root = doc.root_element();
    let Some((first, rest)) = chain.split_first() else {
        return Err(RLibError::WriterElementNotFound("<empty chain>".to_owned(), doc_path.to_owned()));
    };

    if root.tag_name().name() != first.name().as_str() {
        return Err(RLibError::WriterElementNotFound(first.describe(), doc_path.to_owned()));
    }

    let mut current = root;
    for matcher in rest {
        current = select_child(current, matcher, doc_path)?;
    }

    Ok(current)
}

/// This function picks the unique child of `parent` matching the provided matcher.
fn select_child<'a, 'input>(
    parent: roxmltree::Node<'a, 'input>,
    matcher: &ElementMatcher,
    doc_path: &str,
) -> Result<roxmltree::Node<'a, 'input>> {
    let mut candidates = parent.children()
        .filter(|child| child.is_element() && child.tag_name().name() == matcher.name().as_str())
        .collect::<Vec<_>>();

    // An identifying guid is never negotiable: a candidate with the wrong one
    // is not the element, no matter how alone it is.
    if let Some(guid) = matcher.guid() {
        candidates.retain(|candidate| candidate.attribute("Guid") == Some(guid.as_str()));
    }

    // Disambiguation ladder. Each rung only runs while more than one candidate survives.

    if candidates.len() > 1 {
        if let Some(exact) = matcher.exact_text() {
            candidates.retain(|candidate| {
                element_text(candidate) == *exact || candidate.attribute("Guid") == Some(exact.as_str())
            });
        }
    }

    if candidates.len() > 1 {
        for (name, value) in matcher.texts() {
            if candidates.len() <= 1 {
                break;
            }
            candidates.retain(|candidate| {
                candidate.children()
                    .find(|child| child.is_element() && child.tag_name().name() == name.as_str())
                    .map(|child| element_text(&child) == *value)
                    .unwrap_or(false)
            });
        }
    }

    if candidates.len() > 1 {
        for (name, value) in matcher.attrs() {
            if candidates.len() <= 1 {
                break;
            }
            candidates.retain(|candidate| candidate.attribute(name.as_str()) == Some(value.as_str()));
        }
    }

    // With a single name match we don't second-guess: if it's there, it's it.
    match candidates.len() {
        0 => Err(RLibError::WriterElementNotFound(matcher.describe(), doc_path.to_owned())),
        1 => Ok(candidates[0]),
        _ => Err(RLibError::WriterElementAmbiguous(matcher.describe(), doc_path.to_owned())),
    }
}

/// Text content of an element, trimmed of layout whitespace.
fn element_text(node: &roxmltree::Node) -> String {
    node.children()
        .filter_map(|child| if child.is_text() { child.text() } else { None })
        .collect::<String>()
        .trim()
        .to_owned()
}

fn parse<'input>(buffer: &'input str, doc_path: &str) -> Result<roxmltree::Document<'input>> {
    roxmltree::Document::parse(buffer)
        .map_err(|error| RLibError::XmlNotParseable(doc_path.to_owned(), error.to_string()))
}

//---------------------------------------------------------------------------//
//                          Mutation primitives
//---------------------------------------------------------------------------//

/// This function sets, replaces or removes (`value == None`) one attribute of
/// the element at the end of the chain, rewriting only its start tag.
pub(crate) fn set_attribute(
    buffer: &mut String,
    chain: &[ElementMatcher],
    attr: &str,
    value: Option<&str>,
    doc_path: &str,
) -> Result<()> {
    let (range, new_tag) = {
        let doc = parse(buffer, doc_path)?;
        let node = find_in_doc(&doc, chain, doc_path)?;
        let range = node.range();
        let tag_end = start_tag_end(buffer, &range);
        let tag = buffer[range.start..tag_end].to_owned();
        (range.start..tag_end, edit_start_tag(&tag, attr, value))
    };

    splice(buffer, range, &new_tag);
    Ok(())
}

/// This function replaces one child element of the element at the end of the
/// chain with a freshly rendered fragment, or inserts it at its schema position
/// if it's absent and `must_exist` is false.
pub(crate) fn replace_child(
    buffer: &mut String,
    chain: &[ElementMatcher],
    child_name: &str,
    exact: Option<&str>,
    fragment: &str,
    xsd: &Xsd,
    doc_path: &str,
    must_exist: bool,
) -> Result<()> {
    let found = {
        let doc = parse(buffer, doc_path)?;
        let host = find_in_doc(&doc, chain, doc_path)?;
        find_child_range(host, child_name, exact, doc_path)?
    };

    match found {
        Some(range) => {
            splice(buffer, range, fragment);
            Ok(())
        }
        None if must_exist => {
            Err(RLibError::WriterElementNotFound(format!("{}/{child_name}", chain_describe(chain)), doc_path.to_owned()))
        }
        None => insert_child(buffer, chain, child_name, fragment, xsd, doc_path),
    }
}

/// This function removes one child element of the element at the end of the
/// chain. A child that's already absent is not an error: there's nothing to do.
pub(crate) fn delete_child(
    buffer: &mut String,
    chain: &[ElementMatcher],
    child_name: &str,
    exact: Option<&str>,
    doc_path: &str,
) -> Result<()> {
    let found = {
        let doc = parse(buffer, doc_path)?;
        let host = find_in_doc(&doc, chain, doc_path)?;
        find_child_range(host, child_name, exact, doc_path)?
    };

    if let Some(range) = found {
        remove_with_indent(buffer, range);
    }
    Ok(())
}

/// This function inserts a rendered fragment as a new child of the element at
/// the end of the chain, at the position the schema prescribes for its name.
pub(crate) fn insert_child(
    buffer: &mut String,
    chain: &[ElementMatcher],
    child_name: &str,
    fragment: &str,
    xsd: &Xsd,
    doc_path: &str,
) -> Result<()> {
    enum Insertion {
        BeforeSibling(usize),
        AfterLastChild(usize),
        IntoEmpty(Range<usize>),
        IntoSelfClosing(Range<usize>, String),
    }

    let insertion = {
        let doc = parse(buffer, doc_path)?;
        let parent = find_in_doc(&doc, chain, doc_path)?;
        let parent_range = parent.range();
        let parent_name = parent.tag_name().name().to_owned();

        let order = xsd.child_position(&parent_name, child_name).unwrap_or(usize::MAX);
        let children = parent.children().filter(|child| child.is_element()).collect::<Vec<_>>();

        let next_sibling = children.iter().find(|child| {
            xsd.child_position(&parent_name, child.tag_name().name()).unwrap_or(usize::MAX) > order
        });

        if let Some(sibling) = next_sibling {
            Insertion::BeforeSibling(sibling.range().start)
        } else if let Some(last) = children.last() {
            Insertion::AfterLastChild(last.range().end)
        } else {
            let tag_end = start_tag_end(buffer, &parent_range);
            if buffer[..tag_end].ends_with("/>") {
                let tag = buffer[parent_range.start..tag_end].to_owned();
                Insertion::IntoSelfClosing(parent_range, tag)
            } else {
                let close = close_tag_start(buffer, &parent_range)
                    .ok_or_else(|| RLibError::WriterElementNotFound(parent_name.to_owned(), doc_path.to_owned()))?;
                Insertion::IntoEmpty(tag_end..close)
            }
        }
    };

    match insertion {
        Insertion::BeforeSibling(pos) => {
            let indent = line_indent(buffer, pos);
            let block = format!("{}\n{indent}", indent_block(fragment, &indent));
            splice(buffer, pos..pos, &block);
        }

        Insertion::AfterLastChild(pos) => {
            let indent = line_indent_of_range_start(buffer, pos);
            let block = format!("\n{indent}{}", indent_block(fragment, &indent));
            splice(buffer, pos..pos, &block);
        }

        Insertion::IntoEmpty(range) => {
            let parent_indent = line_indent(buffer, range.start);
            let child_indent = format!("{parent_indent}{INDENT}");
            let block = format!("\n{child_indent}{}\n{parent_indent}", indent_block(fragment, &child_indent));
            splice(buffer, range, &block);
        }

        Insertion::IntoSelfClosing(range, tag) => {
            let parent_indent = line_indent(buffer, range.start);
            let child_indent = format!("{parent_indent}{INDENT}");
            let name = tag_name_of(&tag);
            let open = format!("{}>", tag[..tag.len() - 2].trim_end());
            let block = format!("{open}\n{child_indent}{}\n{parent_indent}</{name}>", indent_block(fragment, &child_indent));
            splice(buffer, range, &block);
        }
    }

    Ok(())
}

/// This function removes the element at the end of the chain. If its parent
/// ends up with no element children and the schema declares it optional, the
/// parent is removed too, recursively.
pub(crate) fn delete_element(
    buffer: &mut String,
    chain: &[ElementMatcher],
    xsd: &Xsd,
    doc_path: &str,
) -> Result<()> {
    let range = {
        let doc = parse(buffer, doc_path)?;
        find_in_doc(&doc, chain, doc_path)?.range()
    };
    remove_with_indent(buffer, range);

    // Clear newly emptied optional ancestors, bottom up.
    let mut chain = &chain[..chain.len() - 1];
    while chain.len() >= 2 {
        let parent_name = chain[chain.len() - 1].name().to_owned();
        let grandparent_name = chain[chain.len() - 2].name().to_owned();
        if !xsd.is_optional_child(&grandparent_name, &parent_name) {
            break;
        }

        let range = {
            let doc = parse(buffer, doc_path)?;
            let parent = find_in_doc(&doc, chain, doc_path)?;
            if parent.children().any(|child| child.is_element()) {
                break;
            }
            parent.range()
        };

        remove_with_indent(buffer, range);
        chain = &chain[..chain.len() - 1];
    }

    Ok(())
}

//---------------------------------------------------------------------------//
//                        Rendering helpers
//---------------------------------------------------------------------------//

/// This function renders one scalar cell as a child element of its host.
///
/// Two children of the markup schema carry their value as a `Guid` attribute
/// instead of text: a comment's viewpoint link and a topic's related topics.
pub(crate) fn render_scalar_child(host_name: &str, child_name: &str, text: &str) -> String {
    if (host_name == "Comment" && child_name == "Viewpoint")
        || (host_name == "Topic" && child_name == "RelatedTopic") {
        format!("<{child_name} Guid=\"{}\"/>", escape(text))
    } else {
        format!("<{child_name}>{}</{child_name}>", escape(text))
    }
}

/// Description of a whole chain, for error messages.
pub(crate) fn chain_describe(chain: &[ElementMatcher]) -> String {
    chain.iter().map(ElementMatcher::describe).collect::<Vec<_>>().join("/")
}

//---------------------------------------------------------------------------//
//                        Byte-splicing helpers
//---------------------------------------------------------------------------//

fn splice(buffer: &mut String, range: Range<usize>, replacement: &str) {
    buffer.replace_range(range, replacement);
}

/// This function removes a byte range plus the indentation (and line break)
/// preceding it, so no blank line is left behind.
fn remove_with_indent(buffer: &mut String, range: Range<usize>) {
    let mut start = range.start;
    let bytes = buffer.as_bytes();
    while start > 0 && (bytes[start - 1] == b' ' || bytes[start - 1] == b'\t') {
        start -= 1;
    }
    if start > 0 && bytes[start - 1] == b'\n' {
        start -= 1;
        if start > 0 && bytes[start - 1] == b'\r' {
            start -= 1;
        }
    }
    splice(buffer, start..range.end, "");
}

/// This function finds the first children matching a name (and optionally an
/// exact value), and returns its range. More than one match is ambiguous.
fn find_child_range(
    host: roxmltree::Node,
    child_name: &str,
    exact: Option<&str>,
    doc_path: &str,
) -> Result<Option<Range<usize>>> {
    let matches = host.children()
        .filter(|child| child.is_element() && child.tag_name().name() == child_name)
        .filter(|child| match exact {
            Some(exact) => element_text(child) == exact || child.attribute("Guid") == Some(exact),
            None => true,
        })
        .collect::<Vec<_>>();

    match matches.len() {
        0 => Ok(None),
        1 => Ok(Some(matches[0].range())),
        _ => Err(RLibError::WriterElementAmbiguous(child_name.to_owned(), doc_path.to_owned())),
    }
}

/// Position right after the `>` closing the start tag of the element spanning `range`.
///
/// The scan is quote-aware: a `>` inside an attribute value doesn't count.
fn start_tag_end(buffer: &str, range: &Range<usize>) -> usize {
    let bytes = buffer.as_bytes();
    let mut quote = 0u8;
    let mut pos = range.start;
    while pos < range.end {
        let byte = bytes[pos];
        if quote != 0 {
            if byte == quote {
                quote = 0;
            }
        } else if byte == b'"' || byte == b'\'' {
            quote = byte;
        } else if byte == b'>' {
            return pos + 1;
        }
        pos += 1;
    }
    range.end
}

/// Position of the `</` opening the end tag of the element spanning `range`,
/// or `None` if the element is self-closing.
fn close_tag_start(buffer: &str, range: &Range<usize>) -> Option<usize> {
    buffer[range.start..range.end].rfind("</").map(|pos| range.start + pos)
}

/// The whitespace run at the start of the line `pos` sits on.
fn line_indent(buffer: &str, pos: usize) -> String {
    let line_start = buffer[..pos].rfind('\n').map(|nl| nl + 1).unwrap_or(0);
    buffer[line_start..pos].chars().take_while(|c| *c == ' ' || *c == '\t').collect()
}

/// Like [`line_indent`], but for a position at the END of an element: the
/// indentation is taken from the line the element starts on.
fn line_indent_of_range_start(buffer: &str, end_pos: usize) -> String {
    let line_start = buffer[..end_pos].rfind('\n').map(|nl| nl + 1).unwrap_or(0);
    buffer[line_start..].chars().take_while(|c| *c == ' ' || *c == '\t').collect()
}

/// This function indents every line of a fragment but the first one.
fn indent_block(fragment: &str, indent: &str) -> String {
    fragment.replace('\n', &format!("\n{indent}"))
}

/// Element name of a raw start tag like `<File isExternal="true"/>`.
fn tag_name_of(tag: &str) -> String {
    tag.trim_start_matches('<')
        .chars()
        .take_while(|c| !c.is_whitespace() && *c != '>' && *c != '/')
        .collect()
}

/// This function rewrites one attribute inside a raw start tag, preserving
/// every other byte of it. `value == None` removes the attribute; a value for
/// an attribute not present yet appends it before the tag close.
fn edit_start_tag(tag: &str, attr: &str, value: Option<&str>) -> String {
    // Tokenize the attributes of the tag, quote-aware.
    let bytes = tag.as_bytes();
    let mut pos = 0;

    // Skip the element name.
    while pos < bytes.len() && bytes[pos] != b' ' && bytes[pos] != b'\t' && bytes[pos] != b'\n' && bytes[pos] != b'>' && bytes[pos] != b'/' {
        pos += 1;
    }

    while pos < bytes.len() {
        // Skip whitespace before the next attribute.
        while pos < bytes.len() && (bytes[pos] as char).is_whitespace() {
            pos += 1;
        }
        if pos >= bytes.len() || bytes[pos] == b'>' || bytes[pos] == b'/' {
            break;
        }

        // Attribute name.
        let name_start = pos;
        while pos < bytes.len() && bytes[pos] != b'=' && !(bytes[pos] as char).is_whitespace() {
            pos += 1;
        }
        let name = &tag[name_start..pos];

        // Equals sign and quoted value.
        while pos < bytes.len() && bytes[pos] != b'"' && bytes[pos] != b'\'' {
            pos += 1;
        }
        if pos >= bytes.len() {
            break;
        }
        let quote = bytes[pos];
        pos += 1;
        let value_start = pos;
        while pos < bytes.len() && bytes[pos] != quote {
            pos += 1;
        }
        let value_end = pos;
        pos += 1;

        if name == attr {
            return match value {
                // Replace just the value bytes.
                Some(value) => format!("{}{}{}", &tag[..value_start], escape(value), &tag[value_end..]),

                // Remove the whole ` name="value"` token.
                None => {
                    let mut token_start = name_start;
                    while token_start > 0 && (bytes[token_start - 1] as char).is_whitespace() {
                        token_start -= 1;
                    }
                    format!("{}{}", &tag[..token_start], &tag[pos..])
                }
            };
        }
    }

    // Attribute not present: append it before the tag close.
    match value {
        Some(value) => {
            let close_len = if tag.ends_with("/>") { 2 } else { 1 };
            let body = tag[..tag.len() - close_len].trim_end();
            format!("{body} {attr}=\"{}\"{}", escape(value), &tag[tag.len() - close_len..])
        }
        None => tag.to_owned(),
    }
}
