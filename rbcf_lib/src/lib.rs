//---------------------------------------------------------------------------//
// Copyright (c) 2017-2025 Ismael Gutiérrez González. All rights reserved.
//
// This file is part of the Rusted BCF Manager (RBCF) project,
// which can be found here: https://github.com/Frodo45127/rbcf.
//
// This file is licensed under the MIT license, which can be found here:
// https://github.com/Frodo45127/rbcf/blob/master/LICENSE.
//---------------------------------------------------------------------------//

//! This is the RBCF Lib, a lib to read, edit and write BCF 2.1 files, the
//! zip-packaged XML containers BIM tools use to exchange issues.
//!
//! The functions here are the programmatic surface any host (GUI, CLI, another
//! lib) calls into. The heavy lifting lives in the submodules: the typed data
//! model with per-field state tracking ([`model`] and [`cells`]), the
//! schema-validating reader ([`reader`] and [`schema`]) and the differential
//! writer that edits the container without rewriting untouched bytes
//! ([`writer`]).
//!
//! Every mutating function here only returns success once the change has been
//! committed to the archive on disk.

use itertools::Itertools;
use uuid::Uuid;

use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::cells::{CellState, XmlDateTime};
use crate::error::{RLibError, Result};
use crate::model::{NodeId, XmlEntity};
use crate::model::markup::{Comment, HeaderFile, Markup};
use crate::model::project::Project;
use crate::model::topic::Topic;
use crate::model::viewpoint::Viewpoint;
use crate::schema::SchemaSet;

pub mod archive;
pub mod cells;
pub mod error;
pub mod model;
pub mod reader;
pub mod schema;
pub mod utils;
pub mod writer;
pub mod xml;

#[cfg(test)] mod lib_test;
#[cfg(test)] pub(crate) mod test_common;

/// The embedded 2.1 schemas, parsed once.
static SCHEMAS: OnceLock<SchemaSet> = OnceLock::new();

/// This function returns the built-in BCF 2.1 schema set.
///
/// The embedded schemas are part of the crate, so failing to parse them is a
/// packaging bug, not a runtime condition.
pub fn builtin_schemas() -> &'static SchemaSet {
    SCHEMAS.get_or_init(|| SchemaSet::bcf_2_1().expect("The embedded BCF 2.1 schemas failed to parse."))
}

/*
--------------------------------------------------------
                Project-Related Functions
--------------------------------------------------------
*/

/// This function reads a whole BCF container into memory, validating every
/// document against the 2.1 schemas on the way in.
///
/// Reader errors are fatal: a partial project is never returned.
pub fn open_project(path: &Path) -> Result<Project> {
    reader::read(path, builtin_schemas())
}

/// This function commits any pending updates and writes the container to the
/// provided path.
pub fn save_project(project: &mut Project, path: &Path) -> Result<()> {
    writer::update::process_updates(project, builtin_schemas())?;

    let scratch = project.scratch_dir()?.to_owned();
    archive::repack(&scratch, path, project.member_order())
}

/// This function closes a project, dropping its scratch directory. Every
/// operation needing the container fails with an usage error afterwards.
pub fn close_project(project: &mut Project) {
    project.close();
}

/*
--------------------------------------------------------
                  Retrieval Functions
--------------------------------------------------------
*/

/// This function returns the topics of the project, ordered by their index.
/// Topics without an index trail the rest, in stable order.
pub fn get_topics(project: &Project) -> Vec<&Topic> {
    let mut topics = project.markups().iter().map(Markup::topic).collect::<Vec<_>>();
    topics.sort_by(|a, b| match (a.index().value(), b.index().value()) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    topics
}

/// This function returns the comments of a topic, ordered by creation date
/// ascending. If a viewpoint guid is provided, only the comments referencing
/// that viewpoint are returned.
pub fn get_comments<'a>(project: &'a Project, topic: Uuid, viewpoint: Option<Uuid>) -> Result<Vec<&'a Comment>> {
    let markup = markup_of(project, topic)?;
    Ok(markup.comments().iter()
        .filter(|comment| match viewpoint {
            Some(viewpoint) => *comment.viewpoint().value() == Some(viewpoint),
            None => true,
        })
        .sorted_by_key(|comment| comment.creation().date().value().instant())
        .collect())
}

/// This function returns the loaded viewpoints of a topic, as (file name,
/// viewpoint) pairs. Viewpoint files that failed to load are not included.
pub fn get_viewpoints<'a>(project: &'a Project, topic: Uuid) -> Result<Vec<(&'a str, &'a Viewpoint)>> {
    let markup = markup_of(project, topic)?;
    Ok(markup.viewpoint_refs().iter()
        .filter_map(|vp_ref| vp_ref.viewpoint().as_ref())
        .map(|viewpoint| (viewpoint.file_name().as_str(), viewpoint))
        .collect())
}

/// This function returns the paths of the snapshot images of a topic, inside
/// the project's scratch directory.
pub fn get_snapshots(project: &Project, topic: Uuid) -> Result<Vec<PathBuf>> {
    let markup = markup_of(project, topic)?;
    let topic_path = project.scratch_dir()?.join(markup.topic_dir());
    Ok(markup.snapshots().iter().map(|snapshot| topic_path.join(snapshot.value())).collect())
}

/// This function returns the header files of a topic that actually point at an
/// IFC model: the ones with both an ifc project id and a reference.
pub fn get_relevant_ifc_files<'a>(project: &'a Project, topic: Uuid) -> Result<Vec<&'a HeaderFile>> {
    let markup = markup_of(project, topic)?;
    Ok(match markup.header() {
        Some(header) => header.files().iter()
            .filter(|file| !file.ifc_project().is_default() && !file.reference().is_default())
            .collect(),
        None => vec![],
    })
}

/*
--------------------------------------------------------
                  Mutation Functions
--------------------------------------------------------
*/

/// This function appends a new comment to a topic and commits it to the
/// container. If a viewpoint guid is provided, the comment links to it.
pub fn add_comment(project: &mut Project, topic: Uuid, text: &str, author: &str, viewpoint: Option<Uuid>) -> Result<()> {
    let node = {
        let markup = project.markup_by_topic_guid_mut(topic)
            .ok_or_else(|| RLibError::UsageTopicNotFound(topic.to_string()))?;

        if let Some(viewpoint) = viewpoint {
            if markup.viewpoint_ref_by_guid(viewpoint).is_none() {
                return Err(RLibError::UsageObjectNotInProject(viewpoint.to_string()));
            }
        }

        let guid = Uuid::new_v4();
        let comment = Comment::new(guid, author, XmlDateTime::now(), text, viewpoint, CellState::Added);
        markup.comments_mut().push(comment);

        project.attach_all();
        project.markup_by_topic_guid(topic)
            .and_then(|markup| markup.comments().iter().find(|comment| *comment.guid().value() == guid))
            .map(|comment| comment.node_id())
            .ok_or_else(|| RLibError::UsageTopicNotFound(topic.to_string()))?
    };

    writer::update::add_update(project, node, None, None)?;
    writer::update::process_updates(project, builtin_schemas())
}

/// This function commits every modified cell of an entity to the container,
/// stamping the entity's last-modification data with the provided author.
///
/// The caller mutates the entity through its cell setters first, then calls
/// this with the entity's node id.
pub fn modify_element(project: &mut Project, node: NodeId, author: &str) -> Result<()> {
    if project.entity(node).is_none() {
        return Err(RLibError::UsageObjectNotInProject(format!("node {node:?}")));
    }

    // Topics and comments record who touched them last.
    let now = XmlDateTime::now();
    let is_comment = match project.comment_mut(node) {
        Some(comment) => {
            comment.touch(author, now.clone());
            true
        }
        None => false,
    };
    if !is_comment {
        if let Some(topic) = project.topic_mut_by_node(node) {
            topic.touch(author, now);
        }
    }

    let dirty = match project.entity(node) {
        Some(entity) => entity.as_entity().dirty_cells(),
        None => vec![],
    };

    for cell in dirty {
        writer::update::add_update(project, node, Some(cell), None)?;
    }

    writer::update::process_updates(project, builtin_schemas())
}

/// This function deletes an entity (and everything it owns) from the model and
/// from the container. Deleting a whole markup removes its topic directory.
pub fn delete_object(project: &mut Project, node: NodeId) -> Result<()> {
    if node == project.node_id() {
        return Err(RLibError::WriterUpdateNotApplicable(
            "ProjectExtension".to_owned(),
            "the project root cannot be deleted".to_owned(),
        ));
    }

    if project.entity(node).is_none() {
        return Err(RLibError::UsageObjectNotInProject(format!("node {node:?}")));
    }

    project.mark_deleted(node);
    writer::update::add_update(project, node, None, None)?;
    writer::update::process_updates(project, builtin_schemas())
}

/*
--------------------------------------------------------
                       Helpers
--------------------------------------------------------
*/

fn markup_of(project: &Project, topic: Uuid) -> Result<&Markup> {
    project.markup_by_topic_guid(topic)
        .ok_or_else(|| RLibError::UsageTopicNotFound(topic.to_string()))
}
