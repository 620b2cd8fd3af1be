//---------------------------------------------------------------------------//
// Copyright (c) 2017-2025 Ismael Gutiérrez González. All rights reserved.
//
// This file is part of the Rusted BCF Manager (RBCF) project,
// which can be found here: https://github.com/Frodo45127/rbcf.
//
// This file is licensed under the MIT license, which can be found here:
// https://github.com/Frodo45127/rbcf/blob/master/LICENSE.
//---------------------------------------------------------------------------//

//! This module contains the Topic and the two entities only topics own:
//! document references and bim snippets.

use getset::*;
use uuid::Uuid;

use crate::cells::{Attribute, CellState, SimpleElement, SimpleList, XmlDateTime};
use crate::model::*;
use crate::model::modification::{Modification, ModificationKind};
use crate::model::uri::Uri;
use crate::xml::XmlTree;

//---------------------------------------------------------------------------//
//                              Enum & Structs
//---------------------------------------------------------------------------//

/// A single issue, with all its metadata.
///
/// Children appear in the field order below, which is the schema-declared
/// sequence of the `Topic` element.
#[derive(Clone, Debug, Getters, MutGetters)]
#[getset(get = "pub", get_mut = "pub")]
pub struct Topic {
    guid: Attribute<Uuid>,
    topic_type: Attribute<String>,
    topic_status: Attribute<String>,
    reference_links: SimpleList<String>,
    title: SimpleElement<String>,
    priority: SimpleElement<String>,
    index: SimpleElement<Option<i32>>,
    labels: SimpleList<String>,
    creation: Modification,
    last_modification: Option<Modification>,
    due_date: SimpleElement<Option<XmlDateTime>>,
    assignee: SimpleElement<String>,
    stage: SimpleElement<String>,
    description: SimpleElement<String>,
    bim_snippet: Option<BimSnippet>,
    doc_refs: Vec<DocumentReference>,
    related_topics: SimpleList<Uuid>,

    #[getset(skip)]
    state: CellState,
    #[getset(skip)]
    node: NodeId,
    #[getset(skip)]
    parent: NodeId,
}

/// A reference from a topic to an external or internal document.
#[derive(Clone, Debug, Getters, MutGetters)]
#[getset(get = "pub", get_mut = "pub")]
pub struct DocumentReference {
    guid: Attribute<Option<Uuid>>,
    is_external: Attribute<bool>,
    referenced_document: SimpleElement<Uri>,
    description: SimpleElement<String>,

    #[getset(skip)]
    state: CellState,
    #[getset(skip)]
    node: NodeId,
    #[getset(skip)]
    parent: NodeId,
}

/// A piece of model data attached to a topic, by reference or embedded.
#[derive(Clone, Debug, Getters, MutGetters)]
#[getset(get = "pub", get_mut = "pub")]
pub struct BimSnippet {
    snippet_type: Attribute<String>,
    is_external: Attribute<bool>,
    reference: SimpleElement<Uri>,
    reference_schema: SimpleElement<Uri>,

    #[getset(skip)]
    state: CellState,
    #[getset(skip)]
    node: NodeId,
    #[getset(skip)]
    parent: NodeId,
}

//---------------------------------------------------------------------------//
//                        Implementation of Topic
//---------------------------------------------------------------------------//

impl Topic {

    /// This function builds a topic from its required fields. Optional cells
    /// start at their defaults and can be replaced (reader) or written through
    /// (caller) afterwards.
    pub fn new(guid: Uuid, title: &str, author: &str, date: XmlDateTime, state: CellState) -> Self {
        let added = state.is_added();

        Self {
            guid: Attribute::build(guid, Uuid::nil(), "Guid", added),
            topic_type: Attribute::original(String::new(), String::new(), "TopicType"),
            topic_status: Attribute::original(String::new(), String::new(), "TopicStatus"),
            reference_links: SimpleList::empty("ReferenceLink"),
            title: SimpleElement::build(title.to_owned(), String::new(), "Title", added),
            priority: SimpleElement::original(String::new(), String::new(), "Priority"),
            index: SimpleElement::original(None, None, "Index"),
            labels: SimpleList::empty("Labels"),
            creation: if added {
                Modification::added(author, date, ModificationKind::TopicCreation)
            } else {
                Modification::original(author, date, ModificationKind::TopicCreation)
            },
            last_modification: None,
            due_date: SimpleElement::original(None, None, "DueDate"),
            assignee: SimpleElement::original(String::new(), String::new(), "AssignedTo"),
            stage: SimpleElement::original(String::new(), String::new(), "Stage"),
            description: SimpleElement::original(String::new(), String::new(), "Description"),
            bim_snippet: None,
            doc_refs: vec![],
            related_topics: SimpleList::empty("RelatedTopic"),
            state,
            node: NodeId::UNSET,
            parent: NodeId::UNSET,
        }
    }

    /// This function stamps (or creates) the last-modification pair of the topic.
    pub fn touch(&mut self, author: &str, date: XmlDateTime) {
        match self.last_modification.as_mut() {
            Some(modification) => {
                modification.date_mut().set(date);
                modification.author_mut().set(author.to_owned());
            }
            None => self.last_modification = Some(Modification::added(author, date, ModificationKind::Modification)),
        }
    }

    pub(crate) fn attach(&mut self, parent: NodeId, ids: &mut NodeIdGen) {
        if self.node.is_unset() {
            self.node = ids.next();
        }
        self.parent = parent;

        if let Some(snippet) = self.bim_snippet.as_mut() {
            snippet.attach(self.node, ids);
        }
        for doc_ref in &mut self.doc_refs {
            doc_ref.attach(self.node, ids);
        }
    }

    pub(crate) fn mark_all_deleted(&mut self) {
        self.state = CellState::Deleted;
        self.guid.mark_deleted();
        self.topic_type.mark_deleted();
        self.topic_status.mark_deleted();
        self.reference_links.mark_all_deleted();
        self.title.mark_deleted();
        self.priority.mark_deleted();
        self.index.mark_deleted();
        self.labels.mark_all_deleted();
        self.creation.mark_all_deleted();
        if let Some(modification) = self.last_modification.as_mut() {
            modification.mark_all_deleted();
        }
        self.due_date.mark_deleted();
        self.assignee.mark_deleted();
        self.stage.mark_deleted();
        self.description.mark_deleted();
        if let Some(snippet) = self.bim_snippet.as_mut() {
            snippet.mark_all_deleted();
        }
        for doc_ref in &mut self.doc_refs {
            doc_ref.mark_all_deleted();
        }
        self.related_topics.mark_all_deleted();
    }

    pub(crate) fn mark_deleted_by_node(&mut self, node: NodeId) -> bool {
        if self.node == node {
            self.mark_all_deleted();
            return true;
        }
        if let Some(snippet) = self.bim_snippet.as_mut() {
            if snippet.node == node {
                snippet.mark_all_deleted();
                return true;
            }
        }
        for doc_ref in &mut self.doc_refs {
            if doc_ref.node == node {
                doc_ref.mark_all_deleted();
                return true;
            }
        }
        false
    }

    pub(crate) fn purge_deleted(&mut self) {
        if self.bim_snippet.as_ref().map(|snippet| snippet.state.is_deleted()).unwrap_or(false) {
            self.bim_snippet = None;
        }
        self.doc_refs.retain(|doc_ref| !doc_ref.state.is_deleted());
        if self.last_modification.as_ref().map(|modification| modification.state().is_deleted()).unwrap_or(false) {
            self.last_modification = None;
        }
    }

    pub(crate) fn reset(&mut self) {
        self.state = CellState::Original;
        self.guid.reset();
        self.topic_type.reset();
        self.topic_status.reset();
        self.reference_links.reset();
        self.title.reset();
        self.priority.reset();
        self.index.reset();
        self.labels.reset();
        self.creation.reset();
        if let Some(modification) = self.last_modification.as_mut() {
            modification.reset();
        }
        self.due_date.reset();
        self.assignee.reset();
        self.stage.reset();
        self.description.reset();
        if let Some(snippet) = self.bim_snippet.as_mut() {
            snippet.reset();
        }
        for doc_ref in &mut self.doc_refs {
            doc_ref.reset();
        }
        self.related_topics.reset();
    }
}

impl XmlEntity for Topic {

    fn xml_name(&self) -> &'static str {
        "Topic"
    }

    fn node_id(&self) -> NodeId {
        self.node
    }

    fn parent_id(&self) -> NodeId {
        self.parent
    }

    fn state(&self) -> CellState {
        self.state
    }

    fn guid(&self) -> Option<Uuid> {
        Some(*self.guid.value())
    }

    fn matcher(&self) -> ElementMatcher {
        ElementMatcher::new(self.xml_name()).with_guid(*self.guid.value())
    }

    fn to_tree(&self) -> XmlTree {
        let mut tree = XmlTree::new(self.xml_name());
        tree_attribute(&self.guid, &mut tree, true);
        tree_attribute(&self.topic_type, &mut tree, false);
        tree_attribute(&self.topic_status, &mut tree, false);
        tree_list(&self.reference_links, &mut tree);
        tree_element(&self.title, &mut tree, true);
        tree_element(&self.priority, &mut tree, false);
        tree_element(&self.index, &mut tree, false);
        tree_list(&self.labels, &mut tree);
        self.creation.contribute_to_tree(&mut tree);
        if let Some(modification) = &self.last_modification {
            if !modification.state().is_deleted() {
                modification.contribute_to_tree(&mut tree);
            }
        }
        tree_element(&self.due_date, &mut tree, false);
        tree_element(&self.assignee, &mut tree, false);
        tree_element(&self.stage, &mut tree, false);
        tree_element(&self.description, &mut tree, false);
        if let Some(snippet) = &self.bim_snippet {
            if !snippet.state.is_deleted() {
                tree.push_child(snippet.to_tree());
            }
        }
        for doc_ref in self.doc_refs.iter().filter(|doc_ref| !doc_ref.state.is_deleted()) {
            tree.push_child(doc_ref.to_tree());
        }
        for related in self.related_topics.items().iter().filter(|item| !item.state().is_deleted()) {
            let mut child = XmlTree::new(self.related_topics.xml_name());
            child.push_attribute("Guid", &related.xml_text());
            tree.push_child(child);
        }
        tree
    }

    fn dirty_cells(&self) -> Vec<CellRef> {
        let mut cells = vec![];
        dirty_attribute(&self.guid, &mut cells);
        dirty_attribute(&self.topic_type, &mut cells);
        dirty_attribute(&self.topic_status, &mut cells);
        dirty_list(&self.reference_links, &mut cells);
        dirty_element(&self.title, &mut cells);
        dirty_element(&self.priority, &mut cells);
        dirty_element(&self.index, &mut cells);
        dirty_list(&self.labels, &mut cells);
        cells.extend(self.creation.dirty_cells());
        if let Some(modification) = &self.last_modification {
            cells.extend(modification.dirty_cells());
        }
        dirty_element(&self.due_date, &mut cells);
        dirty_element(&self.assignee, &mut cells);
        dirty_element(&self.stage, &mut cells);
        dirty_element(&self.description, &mut cells);
        dirty_list(&self.related_topics, &mut cells);
        cells
    }

    fn cell_snapshot(&self, cell: &CellRef) -> Option<CellSnapshot> {
        match cell {
            CellRef::Attribute("Guid") => Some(snapshot_attribute(&self.guid)),
            CellRef::Attribute("TopicType") => Some(snapshot_attribute(&self.topic_type)),
            CellRef::Attribute("TopicStatus") => Some(snapshot_attribute(&self.topic_status)),
            CellRef::Element("Title") => Some(snapshot_element(&self.title)),
            CellRef::Element("Priority") => Some(snapshot_element(&self.priority)),
            CellRef::Element("Index") => Some(snapshot_element(&self.index)),
            CellRef::Element("DueDate") => Some(snapshot_element(&self.due_date)),
            CellRef::Element("AssignedTo") => Some(snapshot_element(&self.assignee)),
            CellRef::Element("Stage") => Some(snapshot_element(&self.stage)),
            CellRef::Element("Description") => Some(snapshot_element(&self.description)),
            CellRef::Element(name) if *name == ModificationKind::TopicCreation.date_name()
                || *name == ModificationKind::TopicCreation.author_name() => self.creation.cell_snapshot(cell),
            CellRef::Element(name) if *name == ModificationKind::Modification.date_name()
                || *name == ModificationKind::Modification.author_name() => {
                self.last_modification.as_ref().and_then(|modification| modification.cell_snapshot(cell))
            }
            CellRef::ListItem("ReferenceLink", index) => snapshot_list_item(&self.reference_links, *index),
            CellRef::ListItem("Labels", index) => snapshot_list_item(&self.labels, *index),
            CellRef::ListItem("RelatedTopic", index) => snapshot_list_item(&self.related_topics, *index),
            _ => None,
        }
    }
}

/// Equality is structural over all value cells.
impl PartialEq for Topic {
    fn eq(&self, other: &Self) -> bool {
        self.guid == other.guid
            && self.topic_type == other.topic_type
            && self.topic_status == other.topic_status
            && self.reference_links == other.reference_links
            && self.title == other.title
            && self.priority == other.priority
            && self.index == other.index
            && self.labels == other.labels
            && self.creation == other.creation
            && self.last_modification == other.last_modification
            && self.due_date == other.due_date
            && self.assignee == other.assignee
            && self.stage == other.stage
            && self.description == other.description
            && self.bim_snippet == other.bim_snippet
            && self.doc_refs == other.doc_refs
            && self.related_topics == other.related_topics
    }
}

//---------------------------------------------------------------------------//
//                 Implementation of DocumentReference
//---------------------------------------------------------------------------//

impl DocumentReference {

    pub fn new(guid: Option<Uuid>, is_external: bool, referenced_document: Uri, description: &str, state: CellState) -> Self {
        let added = state.is_added();

        Self {
            guid: Attribute::build(guid, None, "Guid", added),
            is_external: Attribute::build(is_external, false, "isExternal", added),
            referenced_document: SimpleElement::build(referenced_document, Uri::default(), "ReferencedDocument", added),
            description: SimpleElement::build(description.to_owned(), String::new(), "Description", added),
            state,
            node: NodeId::UNSET,
            parent: NodeId::UNSET,
        }
    }

    pub(crate) fn attach(&mut self, parent: NodeId, ids: &mut NodeIdGen) {
        if self.node.is_unset() {
            self.node = ids.next();
        }
        self.parent = parent;
    }

    pub(crate) fn mark_all_deleted(&mut self) {
        self.state = CellState::Deleted;
        self.guid.mark_deleted();
        self.is_external.mark_deleted();
        self.referenced_document.mark_deleted();
        self.description.mark_deleted();
    }

    pub(crate) fn reset(&mut self) {
        self.state = CellState::Original;
        self.guid.reset();
        self.is_external.reset();
        self.referenced_document.reset();
        self.description.reset();
    }
}

impl XmlEntity for DocumentReference {

    fn xml_name(&self) -> &'static str {
        "DocumentReference"
    }

    fn node_id(&self) -> NodeId {
        self.node
    }

    fn parent_id(&self) -> NodeId {
        self.parent
    }

    fn state(&self) -> CellState {
        self.state
    }

    fn guid(&self) -> Option<Uuid> {
        *self.guid.value()
    }

    fn matcher(&self) -> ElementMatcher {
        let mut matcher = match self.guid.value() {
            Some(guid) if self.guid.state().is_original() => ElementMatcher::new(self.xml_name()).with_guid(*guid),
            _ => ElementMatcher::new(self.xml_name()),
        };
        match_attribute(&self.is_external, &mut matcher);
        match_element(&self.referenced_document, &mut matcher);
        match_element(&self.description, &mut matcher);
        matcher
    }

    fn to_tree(&self) -> XmlTree {
        let mut tree = XmlTree::new(self.xml_name());
        tree_attribute(&self.guid, &mut tree, false);
        tree_attribute(&self.is_external, &mut tree, false);
        tree_element(&self.referenced_document, &mut tree, false);
        tree_element(&self.description, &mut tree, false);
        tree
    }

    fn dirty_cells(&self) -> Vec<CellRef> {
        let mut cells = vec![];
        dirty_attribute(&self.guid, &mut cells);
        dirty_attribute(&self.is_external, &mut cells);
        dirty_element(&self.referenced_document, &mut cells);
        dirty_element(&self.description, &mut cells);
        cells
    }

    fn cell_snapshot(&self, cell: &CellRef) -> Option<CellSnapshot> {
        match cell {
            CellRef::Attribute("Guid") => Some(snapshot_attribute(&self.guid)),
            CellRef::Attribute("isExternal") => Some(snapshot_attribute(&self.is_external)),
            CellRef::Element("ReferencedDocument") => Some(snapshot_element(&self.referenced_document)),
            CellRef::Element("Description") => Some(snapshot_element(&self.description)),
            _ => None,
        }
    }
}

/// Equality is structural over all value cells.
impl PartialEq for DocumentReference {
    fn eq(&self, other: &Self) -> bool {
        self.guid == other.guid
            && self.is_external == other.is_external
            && self.referenced_document == other.referenced_document
            && self.description == other.description
    }
}

//---------------------------------------------------------------------------//
//                    Implementation of BimSnippet
//---------------------------------------------------------------------------//

impl BimSnippet {

    pub fn new(snippet_type: &str, is_external: bool, reference: Uri, reference_schema: Uri, state: CellState) -> Self {
        let added = state.is_added();

        Self {
            snippet_type: Attribute::build(snippet_type.to_owned(), String::new(), "SnippetType", added),
            is_external: Attribute::build(is_external, false, "isExternal", added),
            reference: SimpleElement::build(reference, Uri::default(), "Reference", added),
            reference_schema: SimpleElement::build(reference_schema, Uri::default(), "ReferenceSchema", added),
            state,
            node: NodeId::UNSET,
            parent: NodeId::UNSET,
        }
    }

    pub(crate) fn attach(&mut self, parent: NodeId, ids: &mut NodeIdGen) {
        if self.node.is_unset() {
            self.node = ids.next();
        }
        self.parent = parent;
    }

    pub(crate) fn mark_all_deleted(&mut self) {
        self.state = CellState::Deleted;
        self.snippet_type.mark_deleted();
        self.is_external.mark_deleted();
        self.reference.mark_deleted();
        self.reference_schema.mark_deleted();
    }

    pub(crate) fn reset(&mut self) {
        self.state = CellState::Original;
        self.snippet_type.reset();
        self.is_external.reset();
        self.reference.reset();
        self.reference_schema.reset();
    }
}

impl XmlEntity for BimSnippet {

    fn xml_name(&self) -> &'static str {
        "BimSnippet"
    }

    fn node_id(&self) -> NodeId {
        self.node
    }

    fn parent_id(&self) -> NodeId {
        self.parent
    }

    fn state(&self) -> CellState {
        self.state
    }

    fn matcher(&self) -> ElementMatcher {
        let mut matcher = ElementMatcher::new(self.xml_name());
        match_attribute(&self.snippet_type, &mut matcher);
        match_attribute(&self.is_external, &mut matcher);
        match_element(&self.reference, &mut matcher);
        match_element(&self.reference_schema, &mut matcher);
        matcher
    }

    fn to_tree(&self) -> XmlTree {
        let mut tree = XmlTree::new(self.xml_name());
        tree_attribute(&self.snippet_type, &mut tree, true);
        tree_attribute(&self.is_external, &mut tree, false);
        tree_element(&self.reference, &mut tree, false);
        tree_element(&self.reference_schema, &mut tree, false);
        tree
    }

    fn dirty_cells(&self) -> Vec<CellRef> {
        let mut cells = vec![];
        dirty_attribute(&self.snippet_type, &mut cells);
        dirty_attribute(&self.is_external, &mut cells);
        dirty_element(&self.reference, &mut cells);
        dirty_element(&self.reference_schema, &mut cells);
        cells
    }

    fn cell_snapshot(&self, cell: &CellRef) -> Option<CellSnapshot> {
        match cell {
            CellRef::Attribute("SnippetType") => Some(snapshot_attribute(&self.snippet_type)),
            CellRef::Attribute("isExternal") => Some(snapshot_attribute(&self.is_external)),
            CellRef::Element("Reference") => Some(snapshot_element(&self.reference)),
            CellRef::Element("ReferenceSchema") => Some(snapshot_element(&self.reference_schema)),
            _ => None,
        }
    }
}

/// Equality is structural over all value cells.
impl PartialEq for BimSnippet {
    fn eq(&self, other: &Self) -> bool {
        self.snippet_type == other.snippet_type
            && self.is_external == other.is_external
            && self.reference == other.reference
            && self.reference_schema == other.reference_schema
    }
}
