//---------------------------------------------------------------------------//
// Copyright (c) 2017-2025 Ismael Gutiérrez González. All rights reserved.
//
// This file is part of the Rusted BCF Manager (RBCF) project,
// which can be found here: https://github.com/Frodo45127/rbcf.
//
// This file is licensed under the MIT license, which can be found here:
// https://github.com/Frodo45127/rbcf/blob/master/LICENSE.
//---------------------------------------------------------------------------//

//! This module contains the Markup, the in-memory image of one topic directory
//! of the container, and the entities that live inside its `markup.bcf`.

use getset::*;
use uuid::Uuid;

use crate::cells::{Attribute, CellState, ListItem, SimpleElement, XmlDateTime};
use crate::model::*;
use crate::model::modification::{Modification, ModificationKind};
use crate::model::topic::Topic;
use crate::model::uri::Uri;
use crate::model::viewpoint::Viewpoint;
use crate::xml::XmlTree;

//---------------------------------------------------------------------------//
//                              Enum & Structs
//---------------------------------------------------------------------------//

/// One topic directory: its topic, header, comments and viewpoint references.
#[derive(Clone, Debug, Getters, MutGetters)]
#[getset(get = "pub", get_mut = "pub")]
pub struct Markup {

    /// Name of the topic directory inside the container.
    topic_dir: String,

    header: Option<Header>,
    topic: Topic,
    comments: Vec<Comment>,
    viewpoint_refs: Vec<ViewpointReference>,

    /// Names of the `.png` snapshots found in the topic directory, as `Extra`
    /// items: no XML document backs them, the model just carries them around.
    snapshots: Vec<ListItem<String>>,

    #[getset(skip)]
    state: CellState,
    #[getset(skip)]
    node: NodeId,
    #[getset(skip)]
    parent: NodeId,
}

/// The list of model files relevant to a topic.
#[derive(Clone, Debug, Getters, MutGetters)]
#[getset(get = "pub", get_mut = "pub")]
pub struct Header {
    files: Vec<HeaderFile>,

    #[getset(skip)]
    state: CellState,
    #[getset(skip)]
    node: NodeId,
    #[getset(skip)]
    parent: NodeId,
}

/// A reference to one IFC model file tied to a topic.
#[derive(Clone, Debug, Getters, MutGetters)]
#[getset(get = "pub", get_mut = "pub")]
pub struct HeaderFile {
    ifc_project: Attribute<String>,
    ifc_spatial_structure_element: Attribute<String>,
    is_external: Attribute<bool>,
    filename: SimpleElement<String>,
    date: SimpleElement<Option<XmlDateTime>>,
    reference: SimpleElement<Uri>,

    #[getset(skip)]
    state: CellState,
    #[getset(skip)]
    node: NodeId,
    #[getset(skip)]
    parent: NodeId,
}

/// One comment of a topic.
#[derive(Clone, Debug, Getters, MutGetters)]
#[getset(get = "pub", get_mut = "pub")]
pub struct Comment {
    guid: Attribute<Uuid>,
    creation: Modification,
    text: SimpleElement<String>,

    /// Guid of the ViewpointReference this comment refers to, if any. It's a
    /// weak link, resolved by guid within the same markup.
    viewpoint: SimpleElement<Option<Uuid>>,

    last_modification: Option<Modification>,

    #[getset(skip)]
    state: CellState,
    #[getset(skip)]
    node: NodeId,
    #[getset(skip)]
    parent: NodeId,
}

/// The `Viewpoints` entry of a markup: file names plus the loaded viewpoint.
#[derive(Clone, Debug, Getters, MutGetters)]
#[getset(get = "pub", get_mut = "pub")]
pub struct ViewpointReference {
    guid: Attribute<Uuid>,
    viewpoint_file: SimpleElement<Uri>,
    snapshot_file: SimpleElement<Uri>,
    index: SimpleElement<Option<i32>>,

    /// The loaded `.bcfv` document, if it was readable.
    viewpoint: Option<Viewpoint>,

    #[getset(skip)]
    state: CellState,
    #[getset(skip)]
    node: NodeId,
    #[getset(skip)]
    parent: NodeId,
}

//---------------------------------------------------------------------------//
//                        Implementation of Markup
//---------------------------------------------------------------------------//

impl Markup {

    pub fn new(topic_dir: &str, topic: Topic, state: CellState) -> Self {
        Self {
            topic_dir: topic_dir.to_owned(),
            header: None,
            topic,
            comments: vec![],
            viewpoint_refs: vec![],
            snapshots: vec![],
            state,
            node: NodeId::UNSET,
            parent: NodeId::UNSET,
        }
    }

    /// This function returns the viewpoint reference with the provided guid, if it exists.
    pub fn viewpoint_ref_by_guid(&self, guid: Uuid) -> Option<&ViewpointReference> {
        self.viewpoint_refs.iter().find(|vp_ref| *vp_ref.guid.value() == guid)
    }

    pub(crate) fn attach(&mut self, parent: NodeId, ids: &mut NodeIdGen) {
        if self.node.is_unset() {
            self.node = ids.next();
        }
        self.parent = parent;

        if let Some(header) = self.header.as_mut() {
            header.attach(self.node, ids);
        }
        self.topic.attach(self.node, ids);
        for comment in &mut self.comments {
            comment.attach(self.node, ids);
        }
        for vp_ref in &mut self.viewpoint_refs {
            vp_ref.attach(self.node, ids);
        }
    }

    pub(crate) fn mark_all_deleted(&mut self) {
        self.state = CellState::Deleted;
        if let Some(header) = self.header.as_mut() {
            header.mark_all_deleted();
        }
        self.topic.mark_all_deleted();
        for comment in &mut self.comments {
            comment.mark_all_deleted();
        }
        for vp_ref in &mut self.viewpoint_refs {
            vp_ref.mark_all_deleted();
        }
    }

    pub(crate) fn mark_deleted_by_node(&mut self, node: NodeId) -> bool {
        if self.node == node {
            self.mark_all_deleted();
            return true;
        }

        if let Some(header) = self.header.as_mut() {
            if header.mark_deleted_by_node(node) {
                return true;
            }
        }
        if self.topic.mark_deleted_by_node(node) {
            return true;
        }
        for comment in &mut self.comments {
            if comment.node == node {
                comment.mark_all_deleted();
                return true;
            }
        }
        for vp_ref in &mut self.viewpoint_refs {
            if vp_ref.mark_deleted_by_node(node) {
                return true;
            }
        }
        false
    }

    pub(crate) fn purge_deleted(&mut self) {
        if self.header.as_ref().map(|header| header.state.is_deleted()).unwrap_or(false) {
            self.header = None;
        }
        if let Some(header) = self.header.as_mut() {
            header.files.retain(|file| !file.state.is_deleted());
        }
        self.topic.purge_deleted();
        self.comments.retain(|comment| !comment.state.is_deleted());
        for comment in &mut self.comments {
            comment.purge_deleted();
        }
        self.viewpoint_refs.retain(|vp_ref| !vp_ref.state.is_deleted());
    }

    pub(crate) fn reset(&mut self) {
        self.state = CellState::Original;
        if let Some(header) = self.header.as_mut() {
            header.reset();
        }
        self.topic.reset();
        for comment in &mut self.comments {
            comment.reset();
        }
        for vp_ref in &mut self.viewpoint_refs {
            vp_ref.reset();
        }
    }
}

impl XmlEntity for Markup {

    fn xml_name(&self) -> &'static str {
        "Markup"
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
        Some(*self.topic.guid().value())
    }

    fn matcher(&self) -> ElementMatcher {
        ElementMatcher::new(self.xml_name())
    }

    fn to_tree(&self) -> XmlTree {
        let mut tree = XmlTree::new(self.xml_name());
        if let Some(header) = &self.header {
            if !header.state.is_deleted() {
                tree.push_child(header.to_tree());
            }
        }
        tree.push_child(self.topic.to_tree());
        for comment in self.comments.iter().filter(|comment| !comment.state.is_deleted()) {
            tree.push_child(comment.to_tree());
        }
        for vp_ref in self.viewpoint_refs.iter().filter(|vp_ref| !vp_ref.state.is_deleted()) {
            tree.push_child(vp_ref.to_tree());
        }
        tree
    }
}

/// Equality is structural over all value cells.
impl PartialEq for Markup {
    fn eq(&self, other: &Self) -> bool {
        self.topic_dir == other.topic_dir
            && self.header == other.header
            && self.topic == other.topic
            && self.comments == other.comments
            && self.viewpoint_refs == other.viewpoint_refs
            && self.snapshots == other.snapshots
    }
}

//---------------------------------------------------------------------------//
//                        Implementation of Header
//---------------------------------------------------------------------------//

impl Header {

    pub fn new(state: CellState) -> Self {
        Self {
            files: vec![],
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

        for file in &mut self.files {
            file.attach(self.node, ids);
        }
    }

    pub(crate) fn mark_all_deleted(&mut self) {
        self.state = CellState::Deleted;
        for file in &mut self.files {
            file.mark_all_deleted();
        }
    }

    pub(crate) fn mark_deleted_by_node(&mut self, node: NodeId) -> bool {
        if self.node == node {
            self.mark_all_deleted();
            return true;
        }
        for file in &mut self.files {
            if file.node == node {
                file.mark_all_deleted();
                return true;
            }
        }
        false
    }

    pub(crate) fn reset(&mut self) {
        self.state = CellState::Original;
        for file in &mut self.files {
            file.reset();
        }
    }
}

impl XmlEntity for Header {

    fn xml_name(&self) -> &'static str {
        "Header"
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
        ElementMatcher::new(self.xml_name())
    }

    fn to_tree(&self) -> XmlTree {
        let mut tree = XmlTree::new(self.xml_name());
        for file in self.files.iter().filter(|file| !file.state.is_deleted()) {
            tree.push_child(file.to_tree());
        }
        tree
    }
}

/// Equality is structural over all value cells.
impl PartialEq for Header {
    fn eq(&self, other: &Self) -> bool {
        self.files == other.files
    }
}

//---------------------------------------------------------------------------//
//                      Implementation of HeaderFile
//---------------------------------------------------------------------------//

impl HeaderFile {

    pub fn new(
        ifc_project: &str,
        ifc_spatial_structure_element: &str,
        is_external: bool,
        filename: &str,
        date: Option<XmlDateTime>,
        reference: Uri,
        state: CellState,
    ) -> Self {
        let added = state.is_added();

        Self {
            ifc_project: Attribute::build(ifc_project.to_owned(), String::new(), "IfcProject", added),
            ifc_spatial_structure_element: Attribute::build(ifc_spatial_structure_element.to_owned(), String::new(), "IfcSpatialStructureElement", added),

            // The only boolean of the format that defaults to true.
            is_external: Attribute::build(is_external, true, "isExternal", added),
            filename: SimpleElement::build(filename.to_owned(), String::new(), "Filename", added),
            date: SimpleElement::build(date, None, "Date", added),
            reference: SimpleElement::build(reference, Uri::default(), "Reference", added),
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
        self.ifc_project.mark_deleted();
        self.ifc_spatial_structure_element.mark_deleted();
        self.is_external.mark_deleted();
        self.filename.mark_deleted();
        self.date.mark_deleted();
        self.reference.mark_deleted();
    }

    pub(crate) fn reset(&mut self) {
        self.state = CellState::Original;
        self.ifc_project.reset();
        self.ifc_spatial_structure_element.reset();
        self.is_external.reset();
        self.filename.reset();
        self.date.reset();
        self.reference.reset();
    }
}

impl XmlEntity for HeaderFile {

    fn xml_name(&self) -> &'static str {
        "File"
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
        match_attribute(&self.ifc_project, &mut matcher);
        match_attribute(&self.ifc_spatial_structure_element, &mut matcher);
        match_attribute(&self.is_external, &mut matcher);
        match_element(&self.filename, &mut matcher);
        match_element(&self.date, &mut matcher);
        match_element(&self.reference, &mut matcher);
        matcher
    }

    fn to_tree(&self) -> XmlTree {
        let mut tree = XmlTree::new(self.xml_name());
        tree_attribute(&self.ifc_project, &mut tree, false);
        tree_attribute(&self.ifc_spatial_structure_element, &mut tree, false);
        tree_attribute(&self.is_external, &mut tree, false);
        tree_element(&self.filename, &mut tree, false);
        tree_element(&self.date, &mut tree, false);
        tree_element(&self.reference, &mut tree, false);
        tree
    }

    fn dirty_cells(&self) -> Vec<CellRef> {
        let mut cells = vec![];
        dirty_attribute(&self.ifc_project, &mut cells);
        dirty_attribute(&self.ifc_spatial_structure_element, &mut cells);
        dirty_attribute(&self.is_external, &mut cells);
        dirty_element(&self.filename, &mut cells);
        dirty_element(&self.date, &mut cells);
        dirty_element(&self.reference, &mut cells);
        cells
    }

    fn cell_snapshot(&self, cell: &CellRef) -> Option<CellSnapshot> {
        match cell {
            CellRef::Attribute("IfcProject") => Some(snapshot_attribute(&self.ifc_project)),
            CellRef::Attribute("IfcSpatialStructureElement") => Some(snapshot_attribute(&self.ifc_spatial_structure_element)),
            CellRef::Attribute("isExternal") => Some(snapshot_attribute(&self.is_external)),
            CellRef::Element("Filename") => Some(snapshot_element(&self.filename)),
            CellRef::Element("Date") => Some(snapshot_element(&self.date)),
            CellRef::Element("Reference") => Some(snapshot_element(&self.reference)),
            _ => None,
        }
    }
}

/// Equality is structural over all value cells.
impl PartialEq for HeaderFile {
    fn eq(&self, other: &Self) -> bool {
        self.ifc_project == other.ifc_project
            && self.ifc_spatial_structure_element == other.ifc_spatial_structure_element
            && self.is_external == other.is_external
            && self.filename == other.filename
            && self.date == other.date
            && self.reference == other.reference
    }
}

//---------------------------------------------------------------------------//
//                       Implementation of Comment
//---------------------------------------------------------------------------//

impl Comment {

    pub fn new(guid: Uuid, author: &str, date: XmlDateTime, text: &str, viewpoint: Option<Uuid>, state: CellState) -> Self {
        let added = state.is_added();

        Self {
            guid: Attribute::build(guid, Uuid::nil(), "Guid", added),
            creation: if added {
                Modification::added(author, date, ModificationKind::CommentCreation)
            } else {
                Modification::original(author, date, ModificationKind::CommentCreation)
            },
            text: SimpleElement::build(text.to_owned(), String::new(), "Comment", added),
            viewpoint: SimpleElement::build(viewpoint, None, "Viewpoint", added),
            last_modification: None,
            state,
            node: NodeId::UNSET,
            parent: NodeId::UNSET,
        }
    }

    /// This function stamps (or creates) the last-modification pair of the comment.
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
    }

    pub(crate) fn mark_all_deleted(&mut self) {
        self.state = CellState::Deleted;
        self.guid.mark_deleted();
        self.creation.mark_all_deleted();
        self.text.mark_deleted();
        self.viewpoint.mark_deleted();
        if let Some(modification) = self.last_modification.as_mut() {
            modification.mark_all_deleted();
        }
    }

    pub(crate) fn purge_deleted(&mut self) {
        if self.last_modification.as_ref().map(|modification| modification.state().is_deleted()).unwrap_or(false) {
            self.last_modification = None;
        }
    }

    pub(crate) fn reset(&mut self) {
        self.state = CellState::Original;
        self.guid.reset();
        self.creation.reset();
        self.text.reset();
        self.viewpoint.reset();
        if let Some(modification) = self.last_modification.as_mut() {
            modification.reset();
        }
    }
}

impl XmlEntity for Comment {

    fn xml_name(&self) -> &'static str {
        "Comment"
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
        let mut matcher = ElementMatcher::new(self.xml_name()).with_guid(*self.guid.value());
        self.creation.contribute_to_matcher(&mut matcher);
        match_element(&self.text, &mut matcher);
        matcher
    }

    fn to_tree(&self) -> XmlTree {
        let mut tree = XmlTree::new(self.xml_name());
        tree_attribute(&self.guid, &mut tree, true);
        self.creation.contribute_to_tree(&mut tree);
        tree_element(&self.text, &mut tree, true);
        if !self.viewpoint.state().is_deleted() && self.viewpoint.value().is_some() {
            let mut child = XmlTree::new(self.viewpoint.xml_name());
            child.push_attribute("Guid", &self.viewpoint.xml_text());
            tree.push_child(child);
        }
        if let Some(modification) = &self.last_modification {
            if !modification.state().is_deleted() {
                modification.contribute_to_tree(&mut tree);
            }
        }
        tree
    }

    fn dirty_cells(&self) -> Vec<CellRef> {
        let mut cells = vec![];
        dirty_attribute(&self.guid, &mut cells);
        cells.extend(self.creation.dirty_cells());
        dirty_element(&self.text, &mut cells);
        dirty_element(&self.viewpoint, &mut cells);
        if let Some(modification) = &self.last_modification {
            cells.extend(modification.dirty_cells());
        }
        cells
    }

    fn cell_snapshot(&self, cell: &CellRef) -> Option<CellSnapshot> {
        match cell {
            CellRef::Attribute("Guid") => Some(snapshot_attribute(&self.guid)),
            CellRef::Element("Comment") => Some(snapshot_element(&self.text)),
            CellRef::Element("Viewpoint") => Some(snapshot_element(&self.viewpoint)),
            CellRef::Element(name) if *name == ModificationKind::CommentCreation.date_name()
                || *name == ModificationKind::CommentCreation.author_name() => self.creation.cell_snapshot(cell),
            CellRef::Element(name) if *name == ModificationKind::Modification.date_name()
                || *name == ModificationKind::Modification.author_name() => {
                self.last_modification.as_ref().and_then(|modification| modification.cell_snapshot(cell))
            }
            _ => None,
        }
    }
}

/// Equality is structural over all value cells.
impl PartialEq for Comment {
    fn eq(&self, other: &Self) -> bool {
        self.guid == other.guid
            && self.creation == other.creation
            && self.text == other.text
            && self.viewpoint == other.viewpoint
            && self.last_modification == other.last_modification
    }
}

//---------------------------------------------------------------------------//
//                  Implementation of ViewpointReference
//---------------------------------------------------------------------------//

impl ViewpointReference {

    pub fn new(guid: Uuid, viewpoint_file: Uri, snapshot_file: Uri, index: Option<i32>, state: CellState) -> Self {
        let added = state.is_added();

        Self {
            guid: Attribute::build(guid, Uuid::nil(), "Guid", added),
            viewpoint_file: SimpleElement::build(viewpoint_file, Uri::default(), "Viewpoint", added),
            snapshot_file: SimpleElement::build(snapshot_file, Uri::default(), "Snapshot", added),
            index: SimpleElement::build(index, None, "Index", added),
            viewpoint: None,
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

        if let Some(viewpoint) = self.viewpoint.as_mut() {
            viewpoint.attach(self.node, ids);
        }
    }

    pub(crate) fn mark_all_deleted(&mut self) {
        self.state = CellState::Deleted;
        self.guid.mark_deleted();
        self.viewpoint_file.mark_deleted();
        self.snapshot_file.mark_deleted();
        self.index.mark_deleted();
        if let Some(viewpoint) = self.viewpoint.as_mut() {
            viewpoint.mark_all_deleted();
        }
    }

    pub(crate) fn mark_deleted_by_node(&mut self, node: NodeId) -> bool {
        if self.node == node {
            self.mark_all_deleted();
            return true;
        }
        if let Some(viewpoint) = self.viewpoint.as_mut() {
            if viewpoint.node_id() == node {
                viewpoint.mark_all_deleted();
                return true;
            }
        }
        false
    }

    pub(crate) fn reset(&mut self) {
        self.state = CellState::Original;
        self.guid.reset();
        self.viewpoint_file.reset();
        self.snapshot_file.reset();
        self.index.reset();
        if let Some(viewpoint) = self.viewpoint.as_mut() {
            viewpoint.reset();
        }
    }
}

impl XmlEntity for ViewpointReference {

    fn xml_name(&self) -> &'static str {
        "Viewpoints"
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
        tree_element(&self.viewpoint_file, &mut tree, false);
        tree_element(&self.snapshot_file, &mut tree, false);
        tree_element(&self.index, &mut tree, false);
        tree
    }

    fn dirty_cells(&self) -> Vec<CellRef> {
        let mut cells = vec![];
        dirty_attribute(&self.guid, &mut cells);
        dirty_element(&self.viewpoint_file, &mut cells);
        dirty_element(&self.snapshot_file, &mut cells);
        dirty_element(&self.index, &mut cells);
        cells
    }

    fn cell_snapshot(&self, cell: &CellRef) -> Option<CellSnapshot> {
        match cell {
            CellRef::Attribute("Guid") => Some(snapshot_attribute(&self.guid)),
            CellRef::Element("Viewpoint") => Some(snapshot_element(&self.viewpoint_file)),
            CellRef::Element("Snapshot") => Some(snapshot_element(&self.snapshot_file)),
            CellRef::Element("Index") => Some(snapshot_element(&self.index)),
            _ => None,
        }
    }
}

/// Equality is structural over all value cells.
impl PartialEq for ViewpointReference {
    fn eq(&self, other: &Self) -> bool {
        self.guid == other.guid
            && self.viewpoint_file == other.viewpoint_file
            && self.snapshot_file == other.snapshot_file
            && self.index == other.index
            && self.viewpoint == other.viewpoint
    }
}
