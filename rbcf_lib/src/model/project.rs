//---------------------------------------------------------------------------//
// Copyright (c) 2017-2025 Ismael Gutiérrez González. All rights reserved.
//
// This file is part of the Rusted BCF Manager (RBCF) project,
// which can be found here: https://github.com/Frodo45127/rbcf.
//
// This file is licensed under the MIT license, which can be found here:
// https://github.com/Frodo45127/rbcf/blob/master/LICENSE.
//---------------------------------------------------------------------------//

//! This module contains the Project, the top-level aggregate of the model.
//!
//! Besides the project-level metadata (`project.bcfp`) and the markups, an open
//! Project owns the session data of its container: the path of the archive on
//! disk, the scratch directory it was extracted to, the original member order
//! (so a repack is deterministic) and the queue of pending updates.

use getset::*;
use tempfile::TempDir;
use uuid::Uuid;

use std::path::{Path, PathBuf};

use crate::cells::{Attribute, CellState, SimpleElement};
use crate::error::{RLibError, Result};
use crate::model::*;
use crate::model::markup::Markup;
use crate::xml::XmlTree;

//---------------------------------------------------------------------------//
//                              Enum & Structs
//---------------------------------------------------------------------------//

/// An open BCF project: the whole entity graph plus its container session.
#[derive(Debug, Getters, MutGetters)]
pub struct Project {

    #[getset(get = "pub", get_mut = "pub")]
    id: Attribute<Uuid>,

    #[getset(get = "pub", get_mut = "pub")]
    name: SimpleElement<String>,

    #[getset(get = "pub", get_mut = "pub")]
    extension_schema: SimpleElement<String>,

    /// One markup per topic directory of the container, in directory order.
    #[getset(get = "pub", get_mut = "pub")]
    markups: Vec<Markup>,

    state: CellState,

    /// Path of the `.bcf` archive this project was read from.
    #[getset(get = "pub")]
    archive_path: PathBuf,

    /// Scratch directory the archive is extracted to. `None` once closed.
    scratch: Option<TempDir>,

    /// Member paths of the original archive, in their original order.
    #[getset(get = "pub", get_mut = "pub(crate)")]
    member_order: Vec<String>,

    /// Whether the container carried a `project.bcfp`.
    #[getset(get = "pub")]
    has_project_file: bool,

    /// Pending updates, in arrival order.
    #[getset(get = "pub")]
    updates: Vec<ProjectUpdate>,

    ids: NodeIdGen,
}

//---------------------------------------------------------------------------//
//                       Implementation of Project
//---------------------------------------------------------------------------//

impl Project {

    /// This function builds a project from its metadata. Markups and session
    /// data are filled in afterwards.
    pub fn new(id: Uuid, name: &str, extension_schema: &str, state: CellState) -> Self {
        let added = state.is_added();

        Self {
            id: Attribute::build(id, Uuid::nil(), "ProjectId", added),
            name: SimpleElement::build(name.to_owned(), String::new(), "Name", added),
            extension_schema: SimpleElement::build(extension_schema.to_owned(), String::new(), "ExtensionSchema", added),
            markups: vec![],
            state,
            archive_path: PathBuf::new(),
            scratch: None,
            member_order: vec![],
            has_project_file: false,
            updates: vec![],
            ids: NodeIdGen::new(),
        }
    }

    pub(crate) fn set_session(&mut self, archive_path: &Path, scratch: TempDir, member_order: Vec<String>, has_project_file: bool) {
        self.archive_path = archive_path.to_owned();
        self.scratch = Some(scratch);
        self.member_order = member_order;
        self.has_project_file = has_project_file;
    }

    pub(crate) fn set_has_project_file(&mut self, has_project_file: bool) {
        self.has_project_file = has_project_file;
    }

    /// Whether the project still owns its scratch directory.
    pub fn is_open(&self) -> bool {
        self.scratch.is_some()
    }

    /// Scratch directory of the project. Fails once the project is closed.
    pub fn scratch_dir(&self) -> Result<&Path> {
        match &self.scratch {
            Some(scratch) => Ok(scratch.path()),
            None => Err(RLibError::UsageProjectClosed),
        }
    }

    /// This function closes the project, cleaning up its scratch directory.
    /// Any operation needing the container fails from this point on.
    pub fn close(&mut self) {
        self.scratch = None;
        self.updates.clear();
    }

    /// This function assigns node ids to every entity that doesn't have one yet
    /// and refreshes all the parent links.
    pub(crate) fn attach_all(&mut self) {
        let root = self.ids.root();
        let ids = &mut self.ids;
        for markup in &mut self.markups {
            markup.attach(root, ids);
        }
    }

    /// This function returns a mutable reference to the comment with the
    /// provided node id, if it exists.
    pub(crate) fn comment_mut(&mut self, node: NodeId) -> Option<&mut crate::model::markup::Comment> {
        self.markups.iter_mut()
            .flat_map(|markup| markup.comments_mut().iter_mut())
            .find(|comment| comment.node_id() == node)
    }

    /// This function returns a mutable reference to the topic with the
    /// provided node id, if it exists.
    pub(crate) fn topic_mut_by_node(&mut self, node: NodeId) -> Option<&mut crate::model::topic::Topic> {
        self.markups.iter_mut()
            .map(|markup| markup.topic_mut())
            .find(|topic| topic.node_id() == node)
    }

    /// This function finds an entity by id anywhere in the project.
    pub fn entity(&self, node: NodeId) -> Option<EntityRef> {
        self.chain(node).and_then(|chain| chain.last().copied())
    }

    /// This function returns the ownership chain from the project root down to
    /// the provided entity, both inclusive.
    pub fn chain(&self, node: NodeId) -> Option<Vec<EntityRef>> {
        EntityRef::Project(self).chain_to(node)
    }

    /// This function returns the markup owning the topic with the provided guid.
    pub fn markup_by_topic_guid(&self, guid: Uuid) -> Option<&Markup> {
        self.markups.iter().find(|markup| *markup.topic().guid().value() == guid)
    }

    pub fn markup_by_topic_guid_mut(&mut self, guid: Uuid) -> Option<&mut Markup> {
        self.markups.iter_mut().find(|markup| *markup.topic().guid().value() == guid)
    }

    /// This function marks an entity, and everything it owns, for deletion.
    pub(crate) fn mark_deleted(&mut self, node: NodeId) -> bool {
        for markup in &mut self.markups {
            if markup.mark_deleted_by_node(node) {
                return true;
            }
        }
        false
    }

    /// This function drops every entity marked for deletion.
    pub(crate) fn purge_deleted(&mut self) {
        self.markups.retain(|markup| !markup.state().is_deleted());
        for markup in &mut self.markups {
            markup.purge_deleted();
        }
    }

    /// This function resets every cell of the project to `Original`, once the
    /// container matches the model again.
    pub(crate) fn reset_all(&mut self) {
        self.state = CellState::Original;
        self.id.reset();
        self.name.reset();
        self.extension_schema.reset();
        for markup in &mut self.markups {
            markup.reset();
        }
    }

    pub(crate) fn push_update(&mut self, update: ProjectUpdate) {
        self.updates.push(update);
    }

    pub(crate) fn clear_updates(&mut self) {
        self.updates.clear();
    }
}

impl XmlEntity for Project {

    fn xml_name(&self) -> &'static str {
        "ProjectExtension"
    }

    fn node_id(&self) -> NodeId {
        self.ids.root()
    }

    fn parent_id(&self) -> NodeId {
        self.ids.root()
    }

    fn state(&self) -> CellState {
        self.state
    }

    fn guid(&self) -> Option<Uuid> {
        Some(*self.id.value())
    }

    fn matcher(&self) -> ElementMatcher {
        ElementMatcher::new(self.xml_name())
    }

    fn to_tree(&self) -> XmlTree {
        let mut tree = XmlTree::new(self.xml_name());

        let mut project = XmlTree::new("Project");
        project.push_attribute(self.id.xml_name(), &self.id.xml_text());
        if self.name.is_serialized() {
            let mut name = XmlTree::new(self.name.xml_name());
            name.set_text(&self.name.xml_text());
            project.push_child(name);
        }
        tree.push_child(project);

        if self.extension_schema.is_serialized() {
            let mut schema = XmlTree::new(self.extension_schema.xml_name());
            schema.set_text(&self.extension_schema.xml_text());
            tree.push_child(schema);
        }

        tree
    }

    fn dirty_cells(&self) -> Vec<CellRef> {
        let mut cells = vec![];
        dirty_attribute(&self.id, &mut cells);
        dirty_element(&self.name, &mut cells);
        dirty_element(&self.extension_schema, &mut cells);
        cells
    }

    fn cell_snapshot(&self, cell: &CellRef) -> Option<CellSnapshot> {
        match cell {
            CellRef::Attribute("ProjectId") => Some(snapshot_attribute(&self.id)),
            CellRef::Element("Name") => Some(snapshot_element(&self.name)),
            CellRef::Element("ExtensionSchema") => Some(snapshot_element(&self.extension_schema)),
            _ => None,
        }
    }
}

/// Equality is structural over all value cells.
impl PartialEq for Project {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.extension_schema == other.extension_schema
            && self.markups == other.markups
    }
}
