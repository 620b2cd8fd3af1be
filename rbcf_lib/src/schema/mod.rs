//---------------------------------------------------------------------------//
// Copyright (c) 2017-2025 Ismael Gutiérrez González. All rights reserved.
//
// This file is part of the Rusted BCF Manager (RBCF) project,
// which can be found here: https://github.com/Frodo45127/rbcf.
//
// This file is licensed under the MIT license, which can be found here:
// https://github.com/Frodo45127/rbcf/blob/master/LICENSE.
//---------------------------------------------------------------------------//

//! This module contains the XSD support of this lib.
//!
//! BCF 2.1 documents are validated against their XSD before they're lifted into
//! the data model, and re-validated after every surgical edit. The engine here
//! implements the subset of XML Schema the 2.1 schemas actually use: top-level
//! element declarations, inline complex types, sequences with min/max occurs,
//! attributes with `use`, and named simple types restricted by enumerations or
//! the guid pattern.
//!
//! The five 2.1 schemas ship embedded in the lib (schema download is a host
//! concern, not ours), but any schema file can be loaded from disk too.

use std::collections::HashMap;
use std::fs::read_to_string;
use std::path::Path;

use crate::cells::XmlDateTime;
use crate::error::{RLibError, Result};
use crate::utils::parse_str_as_bool;
use crate::xml::XmlTree;


/// Embedded copies of the BCF 2.1 schemas.
const XSD_VERSION: &str = include_str!("../../schemas/version.xsd");
const XSD_PROJECT: &str = include_str!("../../schemas/project.xsd");
const XSD_MARKUP: &str = include_str!("../../schemas/markup.xsd");
const XSD_VISINFO: &str = include_str!("../../schemas/visinfo.xsd");
const XSD_EXTENSIONS: &str = include_str!("../../schemas/extensions.xsd");

const XSD_NAMES: [&str; 5] = ["version.xsd", "project.xsd", "markup.xsd", "visinfo.xsd", "extensions.xsd"];

//---------------------------------------------------------------------------//
//                              Enum & Structs
//---------------------------------------------------------------------------//

/// One parsed XSD file.
#[derive(Clone, Debug)]
pub struct Xsd {

    /// File name of the schema, for diagnostics.
    name: String,

    /// Top-level element declarations, by name.
    roots: HashMap<String, ElementDecl>,

    /// Flattened sequence order of every element that has element children.
    child_orders: HashMap<String, Vec<String>>,

    /// Occurrence bounds of each (parent, child) pair.
    occurs: HashMap<(String, String), (u32, MaxOccurs)>,
}

/// The set of schemas needed to process one BCF container.
#[derive(Clone, Debug)]
pub struct SchemaSet {
    version: Xsd,
    project: Xsd,
    markup: Xsd,
    visinfo: Xsd,
    extensions: Xsd,
}

/// One element declaration, with its occurrence bounds within its parent.
#[derive(Clone, Debug)]
struct ElementDecl {
    name: String,
    min: u32,
    max: MaxOccurs,
    attributes: Vec<AttributeDecl>,
    content: Content,
}

/// One attribute declaration.
#[derive(Clone, Debug)]
struct AttributeDecl {
    name: String,
    required: bool,
    kind: SimpleKind,
}

/// Content model of an element.
#[derive(Clone, Debug)]
enum Content {

    /// No children, no text.
    Empty,

    /// Text content of the given kind.
    Text(SimpleKind),

    /// A sequence of child element declarations, in schema order.
    Sequence(Vec<ElementDecl>),
}

/// The simple types the 2.1 schemas use.
#[derive(Clone, Debug, PartialEq)]
enum SimpleKind {
    String,
    Boolean,
    Integer,
    Double,
    DateTime,
    Guid,
    Enumeration(Vec<String>),
}

/// Maximum amount of occurrences of an element within its parent.
#[derive(Clone, Copy, Debug, PartialEq)]
enum MaxOccurs {
    Bounded(u32),
    Unbounded,
}

//---------------------------------------------------------------------------//
//                         Implementation of Xsd
//---------------------------------------------------------------------------//

impl Xsd {

    /// This function parses an XSD file's contents into a schema.
    pub fn parse(name: &str, text: &str) -> Result<Self> {
        let document = roxmltree::Document::parse(text)
            .map_err(|error| RLibError::SchemaNotLoadable(name.to_owned(), error.to_string()))?;

        let root = document.root_element();
        if root.tag_name().name() != "schema" {
            return Err(RLibError::SchemaNotLoadable(name.to_owned(), "the root element is not xs:schema".to_owned()));
        }

        // Named simple types first, as element declarations refer to them by name.
        let mut simple_types = HashMap::new();
        for node in root.children().filter(|node| node.tag_name().name() == "simpleType") {
            if let Some(type_name) = node.attribute("name") {
                simple_types.insert(type_name.to_owned(), Self::parse_simple_type(node));
            }
        }

        let mut schema = Self {
            name: name.to_owned(),
            roots: HashMap::new(),
            child_orders: HashMap::new(),
            occurs: HashMap::new(),
        };

        for node in root.children().filter(|node| node.tag_name().name() == "element") {
            let decl = schema.parse_element(name, node, &simple_types)?;
            schema.roots.insert(decl.name.to_owned(), decl);
        }

        if schema.roots.is_empty() {
            return Err(RLibError::SchemaNotLoadable(name.to_owned(), "no top-level element declarations found".to_owned()));
        }

        Ok(schema)
    }

    /// This function loads and parses an XSD file from disk.
    pub fn from_file(path: &Path) -> Result<Self> {
        let name = path.file_name().map(|name| name.to_string_lossy().to_string()).unwrap_or_default();
        let text = read_to_string(path)
            .map_err(|error| RLibError::SchemaNotLoadable(path.to_string_lossy().to_string(), error.to_string()))?;
        Self::parse(&name, &text)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Schema-declared order of the children of the provided element, if it has any.
    pub fn child_order(&self, parent: &str) -> Option<&[String]> {
        self.child_orders.get(parent).map(|order| &**order)
    }

    /// Position of a child within its parent's schema-declared sequence.
    pub fn child_position(&self, parent: &str, child: &str) -> Option<usize> {
        self.child_order(parent)?.iter().position(|name| name == child)
    }

    /// Whether a child may be absent from its parent.
    pub fn is_optional_child(&self, parent: &str, child: &str) -> bool {
        match self.occurs.get(&(parent.to_owned(), child.to_owned())) {
            Some((min, _)) => *min == 0,
            None => false,
        }
    }

    /// This function validates a document, returning every violation found.
    pub fn validate_str(&self, text: &str, doc_path: &str) -> Result<()> {
        let document = roxmltree::Document::parse(text)
            .map_err(|error| RLibError::XmlNotParseable(doc_path.to_owned(), error.to_string()))?;

        let root = document.root_element();
        let decl = self.roots.get(root.tag_name().name())
            .ok_or_else(|| RLibError::SchemaValidationError(
                doc_path.to_owned(),
                self.name.to_owned(),
                format!("unexpected root element \"{}\"", root.tag_name().name())
            ))?;

        let mut errors = vec![];
        Self::validate_element(root, decl, root.tag_name().name(), &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(RLibError::SchemaValidationError(doc_path.to_owned(), self.name.to_owned(), errors.join("\n")))
        }
    }

    /// This function validates a document on disk.
    pub fn validate_file(&self, path: &Path) -> Result<()> {
        let text = read_to_string(path)?;
        self.validate_str(&text, &path.to_string_lossy())
    }

    /// This function validates a document on disk and lifts it into a neutral tree.
    pub fn to_tree(&self, path: &Path) -> Result<XmlTree> {
        let text = read_to_string(path)?;
        let doc_path = path.to_string_lossy();
        self.validate_str(&text, &doc_path)?;
        XmlTree::from_str(&text, &doc_path)
    }

    //---------------------------------------------------------------------------//
    // XSD parsing internals.
    //---------------------------------------------------------------------------//

    fn parse_element(&mut self, schema_name: &str, node: roxmltree::Node, simple_types: &HashMap<String, SimpleKind>) -> Result<ElementDecl> {
        let name = node.attribute("name")
            .ok_or_else(|| RLibError::SchemaNotLoadable(schema_name.to_owned(), "an element declaration has no name".to_owned()))?
            .to_owned();

        let min = node.attribute("minOccurs").map(|value| value.parse::<u32>()).transpose()?.unwrap_or(1);
        let max = match node.attribute("maxOccurs") {
            Some("unbounded") => MaxOccurs::Unbounded,
            Some(value) => MaxOccurs::Bounded(value.parse()?),
            None => MaxOccurs::Bounded(1),
        };

        // Elements either carry a type attribute (simple content) or an inline complex type.
        let mut attributes = vec![];
        let mut content = match node.attribute("type") {
            Some(type_name) => Content::Text(Self::resolve_simple_kind(type_name, simple_types)),
            None => Content::Empty,
        };

        if let Some(complex) = node.children().find(|child| child.tag_name().name() == "complexType") {
            for child in complex.children() {
                match child.tag_name().name() {
                    "sequence" => {
                        let mut particles = vec![];
                        for particle in child.children().filter(|particle| particle.tag_name().name() == "element") {
                            particles.push(self.parse_element(schema_name, particle, simple_types)?);
                        }
                        content = Content::Sequence(particles);
                    }
                    "attribute" => {
                        attributes.push(Self::parse_attribute(schema_name, child, simple_types)?);
                    }
                    _ => {}
                }
            }
        }

        // Index the sequence for the writer's insertion-order lookups.
        if let Content::Sequence(ref particles) = content {
            let order = particles.iter().map(|particle| particle.name.to_owned()).collect();
            self.child_orders.insert(name.to_owned(), order);
            for particle in particles {
                self.occurs.insert((name.to_owned(), particle.name.to_owned()), (particle.min, particle.max));
            }
        }

        Ok(ElementDecl {
            name,
            min,
            max,
            attributes,
            content,
        })
    }

    fn parse_attribute(schema_name: &str, node: roxmltree::Node, simple_types: &HashMap<String, SimpleKind>) -> Result<AttributeDecl> {
        let name = node.attribute("name")
            .ok_or_else(|| RLibError::SchemaNotLoadable(schema_name.to_owned(), "an attribute declaration has no name".to_owned()))?
            .to_owned();

        let required = node.attribute("use") == Some("required");
        let kind = match node.attribute("type") {
            Some(type_name) => Self::resolve_simple_kind(type_name, simple_types),
            None => SimpleKind::String,
        };

        Ok(AttributeDecl {
            name,
            required,
            kind,
        })
    }

    fn parse_simple_type(node: roxmltree::Node) -> SimpleKind {
        if let Some(restriction) = node.children().find(|child| child.tag_name().name() == "restriction") {
            let enumerations = restriction.children()
                .filter(|child| child.tag_name().name() == "enumeration")
                .filter_map(|child| child.attribute("value").map(str::to_owned))
                .collect::<Vec<_>>();
            if !enumerations.is_empty() {
                return SimpleKind::Enumeration(enumerations);
            }

            // The only pattern-restricted type in the 2.1 schemas is the guid.
            if restriction.children().any(|child| child.tag_name().name() == "pattern") {
                return SimpleKind::Guid;
            }
        }

        SimpleKind::String
    }

    fn resolve_simple_kind(type_name: &str, simple_types: &HashMap<String, SimpleKind>) -> SimpleKind {
        match type_name {
            "xs:string" | "xs:normalizedString" | "xs:anyURI" => SimpleKind::String,
            "xs:boolean" => SimpleKind::Boolean,
            "xs:integer" | "xs:int" | "xs:long" => SimpleKind::Integer,
            "xs:double" | "xs:float" | "xs:decimal" => SimpleKind::Double,
            "xs:dateTime" | "xs:date" => SimpleKind::DateTime,
            _ => simple_types.get(type_name).cloned().unwrap_or(SimpleKind::String),
        }
    }

    //---------------------------------------------------------------------------//
    // Validation internals.
    //---------------------------------------------------------------------------//

    fn validate_element(node: roxmltree::Node, decl: &ElementDecl, path: &str, errors: &mut Vec<String>) {

        // Attributes: required ones present, present ones well-typed, unknown
        // un-namespaced ones rejected. Foreign-namespaced attributes (xsi and
        // friends) pass through untouched.
        for attribute in decl.attributes.iter().filter(|attribute| attribute.required) {
            if node.attribute(attribute.name.as_str()).is_none() {
                errors.push(format!("{path}: missing required attribute \"{}\"", attribute.name));
            }
        }

        for attribute in node.attributes() {
            if attribute.namespace().is_some() {
                continue;
            }
            match decl.attributes.iter().find(|declared| declared.name == attribute.name()) {
                Some(declared) => {
                    if let Err(error) = Self::check_simple(attribute.value(), &declared.kind) {
                        errors.push(format!("{path}@{}: {error}", attribute.name()));
                    }
                }
                None => errors.push(format!("{path}: unexpected attribute \"{}\"", attribute.name())),
            }
        }

        let element_children = node.children().filter(|child| child.is_element()).collect::<Vec<_>>();
        let text = node.children()
            .filter_map(|child| if child.is_text() { child.text() } else { None })
            .collect::<String>();

        match &decl.content {
            Content::Empty => {
                if !element_children.is_empty() {
                    errors.push(format!("{path}: no children allowed here"));
                }
                if !text.trim().is_empty() {
                    errors.push(format!("{path}: no text content allowed here"));
                }
            }

            Content::Text(kind) => {
                if !element_children.is_empty() {
                    errors.push(format!("{path}: no children allowed here"));
                }
                if let Err(error) = Self::check_simple(text.trim(), kind) {
                    errors.push(format!("{path}: {error}"));
                }
            }

            Content::Sequence(particles) => {
                if !text.trim().is_empty() {
                    errors.push(format!("{path}: no text content allowed here"));
                }

                // Sequence semantics: children appear in particle order, each
                // particle consuming a contiguous run of same-named children.
                let mut cursor = 0;
                for particle in particles {
                    let mut count: u32 = 0;
                    while cursor < element_children.len()
                        && element_children[cursor].tag_name().name() == particle.name {

                        let child = element_children[cursor];
                        let child_path = format!("{path}/{}", particle.name);
                        Self::validate_element(child, particle, &child_path, errors);

                        count += 1;
                        cursor += 1;
                    }

                    if count < particle.min {
                        errors.push(format!("{path}: missing required element \"{}\"", particle.name));
                    }
                    if let MaxOccurs::Bounded(max) = particle.max {
                        if count > max {
                            errors.push(format!("{path}: too many \"{}\" elements ({count} found, {max} allowed)", particle.name));
                        }
                    }
                }

                for child in &element_children[cursor.min(element_children.len())..] {
                    errors.push(format!("{path}: unexpected element \"{}\"", child.tag_name().name()));
                }
            }
        }
    }

    fn check_simple(value: &str, kind: &SimpleKind) -> std::result::Result<(), String> {
        match kind {
            SimpleKind::String => Ok(()),
            SimpleKind::Boolean => parse_str_as_bool(value).map(|_| ()).map_err(|_| format!("\"{value}\" is not a boolean")),
            SimpleKind::Integer => value.parse::<i64>().map(|_| ()).map_err(|_| format!("\"{value}\" is not an integer")),
            SimpleKind::Double => value.parse::<f64>().map(|_| ()).map_err(|_| format!("\"{value}\" is not a number")),
            SimpleKind::DateTime => XmlDateTime::parse(value).map(|_| ()).map_err(|_| format!("\"{value}\" is not an ISO-8601 datetime")),
            SimpleKind::Guid => uuid::Uuid::parse_str(value).map(|_| ()).map_err(|_| format!("\"{value}\" is not a guid")),
            SimpleKind::Enumeration(values) => if values.iter().any(|allowed| allowed == value) {
                Ok(())
            } else {
                Err(format!("\"{value}\" is not one of {values:?}"))
            },
        }
    }
}

//---------------------------------------------------------------------------//
//                      Implementation of SchemaSet
//---------------------------------------------------------------------------//

impl SchemaSet {

    /// This function returns the embedded BCF 2.1 schemas.
    pub fn bcf_2_1() -> Result<Self> {
        Ok(Self {
            version: Xsd::parse("version.xsd", XSD_VERSION)?,
            project: Xsd::parse("project.xsd", XSD_PROJECT)?,
            markup: Xsd::parse("markup.xsd", XSD_MARKUP)?,
            visinfo: Xsd::parse("visinfo.xsd", XSD_VISINFO)?,
            extensions: Xsd::parse("extensions.xsd", XSD_EXTENSIONS)?,
        })
    }

    /// This function loads the schema set from a folder containing the five
    /// 2.1 XSD files, for callers that keep their own copies.
    pub fn from_dir(path: &Path) -> Result<Self> {
        for name in XSD_NAMES {
            if !path.join(name).is_file() {
                return Err(RLibError::SchemaNotLoadable(name.to_owned(), format!("not found in {}", path.to_string_lossy())));
            }
        }

        Ok(Self {
            version: Xsd::from_file(&path.join("version.xsd"))?,
            project: Xsd::from_file(&path.join("project.xsd"))?,
            markup: Xsd::from_file(&path.join("markup.xsd"))?,
            visinfo: Xsd::from_file(&path.join("visinfo.xsd"))?,
            extensions: Xsd::from_file(&path.join("extensions.xsd"))?,
        })
    }

    pub fn version(&self) -> &Xsd {
        &self.version
    }

    pub fn project(&self) -> &Xsd {
        &self.project
    }

    pub fn markup(&self) -> &Xsd {
        &self.markup
    }

    pub fn visinfo(&self) -> &Xsd {
        &self.visinfo
    }

    pub fn extensions(&self) -> &Xsd {
        &self.extensions
    }
}
