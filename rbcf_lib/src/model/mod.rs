//---------------------------------------------------------------------------//
// Copyright (c) 2017-2025 Ismael Gutiérrez González. All rights reserved.
//
// This file is part of the Rusted BCF Manager (RBCF) project,
// which can be found here: https://github.com/Frodo45127/rbcf.
//
// This file is licensed under the MIT license, which can be found here:
// https://github.com/Frodo45127/rbcf/blob/master/LICENSE.
//---------------------------------------------------------------------------//

//! This module contains the in-memory data model of a BCF project.
//!
//! The model is owned strictly top-down: a [`Project`] owns its [`Markup`]s, a
//! Markup owns its [`Topic`], [`Header`], [`Comment`]s and
//! [`ViewpointReference`]s, and a ViewpointReference optionally owns its loaded
//! [`Viewpoint`]. Back links are plain [`NodeId`]s, resolved by walking down
//! from the Project, so there are no ownership cycles.
//!
//! Every mutable field lives in a value cell (see [`crate::cells`]); the writer
//! uses the cell states plus the [`ElementMatcher`]s produced here to apply
//! surgical updates to the container.
//!
//! [`Project`]: project::Project
//! [`Markup`]: markup::Markup
//! [`Topic`]: topic::Topic
//! [`Header`]: markup::Header
//! [`Comment`]: markup::Comment
//! [`ViewpointReference`]: markup::ViewpointReference
//! [`Viewpoint`]: viewpoint::Viewpoint

use getset::*;
use uuid::Uuid;

use crate::cells::{Attribute, CellState, SimpleElement, SimpleList, XmlValue};
use crate::xml::XmlTree;

pub mod markup;
pub mod modification;
pub mod project;
pub mod topic;
pub mod uri;
pub mod viewpoint;


use self::markup::{Comment, Header, HeaderFile, Markup, ViewpointReference};
use self::project::Project;
use self::topic::{BimSnippet, DocumentReference, Topic};
use self::viewpoint::Viewpoint;

//---------------------------------------------------------------------------//
//                              Enum & Structs
//---------------------------------------------------------------------------//

/// Non-owning identity of one entity within its project.
///
/// Ids are assigned by the project when an entity is attached to the tree, and
/// are stable until the project is dropped. The upper half of the id is a
/// per-project tag, so an id from one project never resolves in another.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct NodeId(pub(crate) u64);

/// Reference to one cell within its owning entity.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CellRef {

    /// An attribute cell, by XML attribute name.
    Attribute(&'static str),

    /// A simple-element cell, by XML element name.
    Element(&'static str),

    /// One item of a list cell, by shared XML element name and item position.
    ListItem(&'static str, usize),
}

/// Everything the writer needs to know about one cell to act on it.
#[derive(Clone, Debug, Getters)]
#[getset(get = "pub")]
pub struct CellSnapshot {

    /// Which cell this is.
    cell: CellRef,

    /// Its current state.
    state: CellState,

    /// Its current serialised text.
    text: String,

    /// The serialised text it had before its first modification, if modified.
    previous: Option<String>,

    /// The serialised text of its default value.
    default_text: String,
}

/// Matching data used to find the XML element of an entity inside a document.
///
/// Only cells in `Original` state and different from their default contribute:
/// added cells don't exist on disk yet, default-valued cells may be absent, and
/// modified cells no longer equal the on-disk text.
#[derive(Clone, Debug, Default, Getters)]
#[getset(get = "pub")]
pub struct ElementMatcher {

    /// Expected element name.
    name: String,

    /// Identifying `Guid` attribute, when the entity has one.
    guid: Option<String>,

    /// Non-default attribute cells, as (name, expected value).
    attrs: Vec<(String, String)>,

    /// Non-default simple-element cells, as (child name, expected text).
    texts: Vec<(String, String)>,

    /// Exact text content, for list items located by value.
    exact_text: Option<String>,
}

/// One pending update, queued by the caller and drained by the writer.
#[derive(Clone, Debug, Getters)]
#[getset(get = "pub")]
pub struct ProjectUpdate {

    /// The affected entity.
    node: NodeId,

    /// The affected cell within the entity, or `None` for whole-entity updates.
    cell: Option<CellRef>,

    /// The serialised previous value of the cell, when one is known.
    previous: Option<String>,
}

/// Shared surface of every entity of the model.
pub trait XmlEntity {

    /// Name of the XML element this entity serialises to.
    fn xml_name(&self) -> &'static str;

    /// Identity of this entity within its project.
    fn node_id(&self) -> NodeId;

    /// Identity of the owning entity.
    fn parent_id(&self) -> NodeId;

    /// Modification state of the entity itself.
    fn state(&self) -> CellState;

    /// Identifying UUID, for entities that carry one.
    fn guid(&self) -> Option<Uuid> {
        None
    }

    /// Matching data to find this entity's element on disk.
    fn matcher(&self) -> ElementMatcher;

    /// This method populates an empty XML element with the entity's attributes
    /// and children, in canonical schema order. Cells equal to their default
    /// are omitted unless they're in `Added` state.
    fn to_tree(&self) -> XmlTree;

    /// Cells of this entity that hold uncommitted changes.
    fn dirty_cells(&self) -> Vec<CellRef> {
        vec![]
    }

    /// Snapshot of one cell of this entity.
    fn cell_snapshot(&self, _cell: &CellRef) -> Option<CellSnapshot> {
        None
    }
}

/// A borrowed reference to any entity of the model.
#[derive(Clone, Copy, Debug)]
pub enum EntityRef<'a> {
    Project(&'a Project),
    Markup(&'a Markup),
    Header(&'a Header),
    HeaderFile(&'a HeaderFile),
    Topic(&'a Topic),
    Comment(&'a Comment),
    ViewpointReference(&'a ViewpointReference),
    Viewpoint(&'a Viewpoint),
    BimSnippet(&'a BimSnippet),
    DocumentReference(&'a DocumentReference),
}

//---------------------------------------------------------------------------//
//                           Implementations
//---------------------------------------------------------------------------//

impl NodeId {

    /// Id of an entity not yet attached to a project.
    pub const UNSET: Self = Self(u64::MAX);

    pub fn is_unset(self) -> bool {
        self == Self::UNSET
    }
}

/// Sequence of per-project tags, so node ids never collide across projects.
static PROJECT_TAGS: std::sync::atomic::AtomicU32 = std::sync::atomic::AtomicU32::new(0);

/// Generator for fresh node ids, owned by the project.
#[derive(Clone, Debug)]
pub(crate) struct NodeIdGen {
    tag: u64,
    next: u64,
}

impl NodeIdGen {
    pub fn new() -> Self {
        let tag = (PROJECT_TAGS.fetch_add(1, std::sync::atomic::Ordering::Relaxed) as u64) << 32;
        Self {
            tag,
            next: 1,
        }
    }

    /// Id of the project root itself.
    pub fn root(&self) -> NodeId {
        NodeId(self.tag)
    }

    pub fn next(&mut self) -> NodeId {
        let id = NodeId(self.tag | self.next);
        self.next += 1;
        id
    }
}

impl CellRef {

    /// XML name of the referenced cell.
    pub fn xml_name(&self) -> &'static str {
        match self {
            Self::Attribute(name) | Self::Element(name) | Self::ListItem(name, _) => name,
        }
    }
}

impl CellSnapshot {
    pub(crate) fn new(cell: CellRef, state: CellState, text: String, previous: Option<String>, default_text: String) -> Self {
        Self {
            cell,
            state,
            text,
            previous,
            default_text,
        }
    }

    /// Whether this cell had a presence on disk before the pending change.
    ///
    /// A cell that was at its default value was omitted when the document was
    /// last written, so there's nothing to modify or delete for it.
    pub fn was_on_disk(&self) -> bool {
        match self.state {
            CellState::Added => false,
            CellState::Modified => self.previous.as_deref() != Some(self.default_text.as_str()),
            _ => self.text != self.default_text,
        }
    }

    /// The text to match against the on-disk document.
    pub fn text_on_disk(&self) -> &str {
        match self.previous.as_deref() {
            Some(previous) => previous,
            None => &self.text,
        }
    }
}

impl ElementMatcher {

    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            ..Default::default()
        }
    }

    pub fn with_guid(mut self, guid: Uuid) -> Self {
        self.guid = Some(guid.to_string());
        self
    }

    pub fn push_attr(&mut self, name: &str, value: String) {
        self.attrs.push((name.to_owned(), value));
    }

    pub fn push_text(&mut self, name: &str, value: String) {
        self.texts.push((name.to_owned(), value));
    }

    pub fn set_exact_text(&mut self, value: String) {
        self.exact_text = Some(value);
    }

    /// Short description of the matcher, used in error messages.
    pub fn describe(&self) -> String {
        match &self.guid {
            Some(guid) => format!("{}[Guid={}]", self.name, guid),
            None => match &self.exact_text {
                Some(text) => format!("{}[{}]", self.name, text),
                None => self.name.to_owned(),
            }
        }
    }
}

impl ProjectUpdate {
    pub(crate) fn new(node: NodeId, cell: Option<CellRef>, previous: Option<String>) -> Self {
        Self {
            node,
            cell,
            previous,
        }
    }
}

//---------------------------------------------------------------------------//
// Cell plumbing shared by the entity implementations.
//---------------------------------------------------------------------------//

/// A cell contributes to its entity's matcher when its value can still be
/// trusted to equal the container: untouched cells and deleted-but-unchanged
/// cells qualify, added and modified ones don't.
fn matches_disk(state: CellState) -> bool {
    state.is_original() || state.is_deleted()
}

pub(crate) fn match_attribute<T: XmlValue>(cell: &Attribute<T>, matcher: &mut ElementMatcher) {
    if matches_disk(cell.state()) && cell.previous().is_none() && !cell.is_default() {
        matcher.push_attr(cell.xml_name(), cell.xml_text());
    }
}

pub(crate) fn match_element<T: XmlValue>(cell: &SimpleElement<T>, matcher: &mut ElementMatcher) {
    if matches_disk(cell.state()) && cell.previous().is_none() && !cell.is_default() {
        matcher.push_text(cell.xml_name(), cell.xml_text());
    }
}

pub(crate) fn tree_attribute<T: XmlValue>(cell: &Attribute<T>, tree: &mut XmlTree, required: bool) {
    if !cell.state().is_deleted() && (required || cell.is_serialized()) {
        tree.push_attribute(cell.xml_name(), &cell.xml_text());
    }
}

pub(crate) fn tree_element<T: XmlValue>(cell: &SimpleElement<T>, tree: &mut XmlTree, required: bool) {
    if !cell.state().is_deleted() && (required || cell.is_serialized()) {
        let mut child = XmlTree::new(cell.xml_name());
        child.set_text(&cell.xml_text());
        tree.push_child(child);
    }
}

pub(crate) fn tree_list<T: XmlValue>(list: &SimpleList<T>, tree: &mut XmlTree) {
    for item in list.items().iter().filter(|item| !item.state().is_deleted()) {
        let mut child = XmlTree::new(list.xml_name());
        child.set_text(&item.xml_text());
        tree.push_child(child);
    }
}

pub(crate) fn dirty_attribute<T: XmlValue>(cell: &Attribute<T>, out: &mut Vec<CellRef>) {
    if !cell.state().is_original() {
        out.push(CellRef::Attribute(cell.xml_name()));
    }
}

pub(crate) fn dirty_element<T: XmlValue>(cell: &SimpleElement<T>, out: &mut Vec<CellRef>) {
    if !cell.state().is_original() {
        out.push(CellRef::Element(cell.xml_name()));
    }
}

pub(crate) fn dirty_list<T: XmlValue>(list: &SimpleList<T>, out: &mut Vec<CellRef>) {
    for (index, item) in list.items().iter().enumerate() {
        if !item.state().is_original() {
            out.push(CellRef::ListItem(list.xml_name(), index));
        }
    }
}

pub(crate) fn snapshot_attribute<T: XmlValue>(cell: &Attribute<T>) -> CellSnapshot {
    CellSnapshot::new(
        CellRef::Attribute(cell.xml_name()),
        cell.state(),
        cell.xml_text(),
        cell.previous().map(str::to_owned),
        cell.default_value().to_xml_text(),
    )
}

pub(crate) fn snapshot_element<T: XmlValue>(cell: &SimpleElement<T>) -> CellSnapshot {
    CellSnapshot::new(
        CellRef::Element(cell.xml_name()),
        cell.state(),
        cell.xml_text(),
        cell.previous().map(str::to_owned),
        cell.default_value().to_xml_text(),
    )
}

pub(crate) fn snapshot_list_item<T: XmlValue>(list: &SimpleList<T>, index: usize) -> Option<CellSnapshot> {
    list.get(index).map(|item| CellSnapshot::new(
        CellRef::ListItem(list.xml_name(), index),
        item.state(),
        item.xml_text(),
        item.previous().map(str::to_owned),
        String::new(),
    ))
}

impl<'a> EntityRef<'a> {

    /// The entity as its shared trait surface.
    pub fn as_entity(&self) -> &'a dyn XmlEntity {
        match self {
            Self::Project(entity) => *entity,
            Self::Markup(entity) => *entity,
            Self::Header(entity) => *entity,
            Self::HeaderFile(entity) => *entity,
            Self::Topic(entity) => *entity,
            Self::Comment(entity) => *entity,
            Self::ViewpointReference(entity) => *entity,
            Self::Viewpoint(entity) => *entity,
            Self::BimSnippet(entity) => *entity,
            Self::DocumentReference(entity) => *entity,
        }
    }

    /// Owned children of this entity, in document order.
    pub fn children(&self) -> Vec<EntityRef<'a>> {
        match self {
            Self::Project(project) => project.markups().iter().map(EntityRef::Markup).collect(),
            Self::Markup(markup) => {
                let mut children = vec![];
                if let Some(header) = markup.header() {
                    children.push(EntityRef::Header(header));
                }
                children.push(EntityRef::Topic(markup.topic()));
                children.extend(markup.comments().iter().map(EntityRef::Comment));
                children.extend(markup.viewpoint_refs().iter().map(EntityRef::ViewpointReference));
                children
            }
            Self::Header(header) => header.files().iter().map(EntityRef::HeaderFile).collect(),
            Self::Topic(topic) => {
                let mut children = vec![];
                if let Some(snippet) = topic.bim_snippet() {
                    children.push(EntityRef::BimSnippet(snippet));
                }
                children.extend(topic.doc_refs().iter().map(EntityRef::DocumentReference));
                children
            }
            Self::ViewpointReference(vp_ref) => match vp_ref.viewpoint() {
                Some(viewpoint) => vec![EntityRef::Viewpoint(viewpoint)],
                None => vec![],
            },
            _ => vec![],
        }
    }

    /// Depth-first search for an entity by id, returning the ownership chain
    /// from the searched root (inclusive) down to the entity (inclusive).
    pub fn chain_to(&self, node: NodeId) -> Option<Vec<EntityRef<'a>>> {
        if self.as_entity().node_id() == node {
            return Some(vec![*self]);
        }

        for child in self.children() {
            if let Some(mut chain) = child.chain_to(node) {
                chain.insert(0, *self);
                return Some(chain);
            }
        }

        None
    }
}
