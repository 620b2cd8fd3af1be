//---------------------------------------------------------------------------//
// Copyright (c) 2017-2025 Ismael Gutiérrez González. All rights reserved.
//
// This file is part of the Rusted BCF Manager (RBCF) project,
// which can be found here: https://github.com/Frodo45127/rbcf.
//
// This file is licensed under the MIT license, which can be found here:
// https://github.com/Frodo45127/rbcf/blob/master/LICENSE.
//---------------------------------------------------------------------------//

//! This module contains the validating reader of BCF containers.
//!
//! Every document is validated against its XSD before it's lifted into the
//! data model, and any reader error is fatal to the whole read: a partial
//! project is never returned. The one exception, mandated by the format, is a
//! broken viewpoint file, which is logged and skipped without dropping the
//! rest of its topic.

use log::{error, warn};
use uuid::Uuid;

use std::collections::HashMap;
use std::fs::read_to_string;
use std::path::Path;

use crate::archive;
use crate::cells::{Attribute, CellState, ListItem, SimpleElement, SimpleList, XmlDateTime};
use crate::error::{RLibError, Result};
use crate::model::markup::{Comment, Header, HeaderFile, Markup, ViewpointReference};
use crate::model::modification::{Modification, ModificationKind};
use crate::model::project::Project;
use crate::model::topic::{BimSnippet, DocumentReference, Topic};
use crate::model::uri::Uri;
use crate::model::viewpoint::Viewpoint;
use crate::schema::SchemaSet;
use crate::utils::{files_with_extension, parse_str_as_bool};
use crate::xml::XmlTree;

#[cfg(test)] mod reader_test;

/// The only BCF version this lib reads and writes.
pub const SUPPORTED_VERSION: &str = "2.1";

/// Fixed member names of a container.
pub const VERSION_FILE: &str = "bcf.version";
pub const PROJECT_FILE: &str = "project.bcfp";
pub const MARKUP_FILE: &str = "markup.bcf";

//---------------------------------------------------------------------------//
//                          Reading functions
//---------------------------------------------------------------------------//

/// This function reads a whole BCF container into memory, validating every
/// document on the way in. All cells of the returned project are `Original`.
pub fn read(archive_path: &Path, schemas: &SchemaSet) -> Result<Project> {
    let (scratch, member_order) = archive::extract(archive_path)?;

    // The version file is not optional, and only 2.1 is supported.
    let version_path = scratch.path().join(VERSION_FILE);
    if !version_path.is_file() {
        return Err(RLibError::FormatMissingVersion);
    }

    let version_tree = schemas.version().to_tree(&version_path)?;
    let version_id = version_tree.attribute("VersionId").unwrap_or_default().to_owned();
    if version_id != SUPPORTED_VERSION {
        return Err(RLibError::FormatUnsupportedVersion(version_id));
    }

    // project.bcfp is optional, but the data model needs a root regardless.
    let project_path = scratch.path().join(PROJECT_FILE);
    let has_project_file = project_path.is_file();
    let mut project = if has_project_file {
        let project_tree = schemas.project().to_tree(&project_path)?;
        build_project(&project_tree)?
    } else {
        Project::new(Uuid::nil(), "", "", CellState::Original)
    };

    for topic_dir in archive::list_topic_dirs(scratch.path())? {
        let topic_path = scratch.path().join(&topic_dir);

        // A broken viewpoint only loses itself, not its topic.
        let mut viewpoints = HashMap::new();
        for viewpoint_path in files_with_extension(&topic_path, ".bcfv")? {
            let file_name = viewpoint_path.file_name().map(|name| name.to_string_lossy().to_string()).unwrap_or_default();
            match build_viewpoint(&viewpoint_path, &file_name, schemas) {
                Ok(viewpoint) => {
                    viewpoints.insert(file_name, viewpoint);
                }
                Err(error) => error!("Viewpoint file \"{file_name}\" of topic \"{topic_dir}\" failed to load and will be skipped: {error}"),
            }
        }

        let snapshots = files_with_extension(&topic_path, ".png")?
            .iter()
            .filter_map(|path| path.file_name().map(|name| name.to_string_lossy().to_string()))
            .map(ListItem::extra)
            .collect::<Vec<_>>();

        let markup_path = topic_path.join(MARKUP_FILE);
        let markup_tree = schemas.markup().to_tree(&markup_path)
            .map_err(|error| RLibError::FormatInvalidMarkup(topic_dir.to_owned(), error.to_string()))?;

        let mut markup = build_markup(&markup_tree, &topic_dir, viewpoints)?;
        *markup.snapshots_mut() = snapshots;
        project.markups_mut().push(markup);
    }

    project.set_session(archive_path, scratch, member_order, has_project_file);
    project.attach_all();
    Ok(project)
}

//---------------------------------------------------------------------------//
//                          Builder functions
//---------------------------------------------------------------------------//

fn build_project(tree: &XmlTree) -> Result<Project> {
    let (id, name) = match tree.child("Project") {
        Some(project) => {
            let id = parse_uuid(project.attribute("ProjectId")
                .ok_or_else(|| missing_field("ProjectId", "ProjectExtension/Project"))?)?;
            (id, project.child_text("Name").unwrap_or_default())
        }
        None => (Uuid::nil(), ""),
    };

    let extension_schema = tree.child_text("ExtensionSchema").unwrap_or_default();
    Ok(Project::new(id, name, extension_schema, CellState::Original))
}

fn build_viewpoint(path: &Path, file_name: &str, schemas: &SchemaSet) -> Result<Viewpoint> {
    let tree = schemas.visinfo().to_tree(path)?;
    let guid = tree.attribute("Guid").map(parse_uuid).transpose()?;
    let raw = read_to_string(path)?;
    Ok(Viewpoint::new(file_name, &raw, guid, CellState::Original))
}

fn build_markup(tree: &XmlTree, topic_dir: &str, mut viewpoints: HashMap<String, Viewpoint>) -> Result<Markup> {
    let topic_tree = tree.child("Topic")
        .ok_or_else(|| missing_field("Topic", "Markup"))?;
    let topic = build_topic(topic_tree)?;

    let mut markup = Markup::new(topic_dir, topic, CellState::Original);

    // Some tools write an empty Header element. That's not a header.
    if let Some(header_tree) = tree.child("Header") {
        if header_tree.child("File").is_some() {
            let mut header = Header::new(CellState::Original);
            for file_tree in header_tree.children_named("File") {
                header.files_mut().push(build_header_file(file_tree)?);
            }
            *markup.header_mut() = Some(header);
        }
    }

    for vp_tree in tree.children_named("Viewpoints") {
        let mut vp_ref = build_viewpoint_reference(vp_tree)?;
        let file_name = vp_ref.viewpoint_file().value().as_str().to_owned();
        if !file_name.is_empty() {
            *vp_ref.viewpoint_mut() = viewpoints.remove(&file_name);
        }
        markup.viewpoint_refs_mut().push(vp_ref);
    }

    for comment_tree in tree.children_named("Comment") {
        let mut comment = build_comment(comment_tree)?;

        // The viewpoint link is weak: a link to an unknown reference is dropped.
        let link = *comment.viewpoint().value();
        if let Some(guid) = link {
            if markup.viewpoint_ref_by_guid(guid).is_none() {
                warn!("A comment of topic \"{topic_dir}\" links to the unknown viewpoint reference \"{guid}\". Dropping the link.");
                *comment.viewpoint_mut() = SimpleElement::original(None, None, "Viewpoint");
            }
        }
        markup.comments_mut().push(comment);
    }

    Ok(markup)
}

fn build_topic(tree: &XmlTree) -> Result<Topic> {
    let guid = parse_uuid(tree.attribute("Guid").ok_or_else(|| missing_field("Guid", "Markup/Topic"))?)?;
    let title = tree.child_text("Title").ok_or_else(|| missing_field("Title", "Markup/Topic"))?;
    let author = tree.child_text("CreationAuthor").ok_or_else(|| missing_field("CreationAuthor", "Markup/Topic"))?;
    let date = parse_datetime(tree.child_text("CreationDate").ok_or_else(|| missing_field("CreationDate", "Markup/Topic"))?)?;

    let mut topic = Topic::new(guid, title, author, date, CellState::Original);

    if let Some(value) = tree.attribute("TopicType") {
        *topic.topic_type_mut() = Attribute::original(value.to_owned(), String::new(), "TopicType");
    }
    if let Some(value) = tree.attribute("TopicStatus") {
        *topic.topic_status_mut() = Attribute::original(value.to_owned(), String::new(), "TopicStatus");
    }

    let reference_links = tree.children_named("ReferenceLink").map(|child| child.text().to_owned()).collect::<Vec<_>>();
    if !reference_links.is_empty() {
        *topic.reference_links_mut() = SimpleList::original(reference_links, "ReferenceLink");
    }

    if let Some(value) = tree.child_text("Priority") {
        *topic.priority_mut() = SimpleElement::original(value.to_owned(), String::new(), "Priority");
    }
    if let Some(value) = tree.child_text("Index") {
        *topic.index_mut() = SimpleElement::original(Some(value.trim().parse()?), None, "Index");
    }

    let labels = tree.children_named("Labels").map(|child| child.text().to_owned()).collect::<Vec<_>>();
    if !labels.is_empty() {
        *topic.labels_mut() = SimpleList::original(labels, "Labels");
    }

    if let Some(date) = tree.child_text("ModifiedDate") {
        let author = tree.child_text("ModifiedAuthor").unwrap_or_default();
        *topic.last_modification_mut() = Some(Modification::original(author, parse_datetime(date)?, ModificationKind::Modification));
    }

    if let Some(value) = tree.child_text("DueDate") {
        *topic.due_date_mut() = SimpleElement::original(Some(parse_datetime(value)?), None, "DueDate");
    }
    if let Some(value) = tree.child_text("AssignedTo") {
        *topic.assignee_mut() = SimpleElement::original(value.to_owned(), String::new(), "AssignedTo");
    }
    if let Some(value) = tree.child_text("Stage") {
        *topic.stage_mut() = SimpleElement::original(value.to_owned(), String::new(), "Stage");
    }
    if let Some(value) = tree.child_text("Description") {
        *topic.description_mut() = SimpleElement::original(value.to_owned(), String::new(), "Description");
    }

    if let Some(snippet_tree) = tree.child("BimSnippet") {
        *topic.bim_snippet_mut() = Some(build_bim_snippet(snippet_tree)?);
    }

    for doc_ref_tree in tree.children_named("DocumentReference") {
        topic.doc_refs_mut().push(build_doc_ref(doc_ref_tree)?);
    }

    let related = tree.children_named("RelatedTopic")
        .map(|child| parse_uuid(child.attribute("Guid").unwrap_or_default()))
        .collect::<Result<Vec<_>>>()?;
    if !related.is_empty() {
        *topic.related_topics_mut() = SimpleList::original(related, "RelatedTopic");
    }

    Ok(topic)
}

fn build_comment(tree: &XmlTree) -> Result<Comment> {
    let guid = parse_uuid(tree.attribute("Guid").ok_or_else(|| missing_field("Guid", "Markup/Comment"))?)?;
    let author = tree.child_text("Author").ok_or_else(|| missing_field("Author", "Markup/Comment"))?;
    let date = parse_datetime(tree.child_text("Date").ok_or_else(|| missing_field("Date", "Markup/Comment"))?)?;
    let text = tree.child_text("Comment").ok_or_else(|| missing_field("Comment", "Markup/Comment"))?;

    let viewpoint = tree.child("Viewpoint")
        .and_then(|child| child.attribute("Guid"))
        .map(parse_uuid)
        .transpose()?;

    let mut comment = Comment::new(guid, author, date, text, viewpoint, CellState::Original);

    if let Some(date) = tree.child_text("ModifiedDate") {
        let author = tree.child_text("ModifiedAuthor").unwrap_or_default();
        *comment.last_modification_mut() = Some(Modification::original(author, parse_datetime(date)?, ModificationKind::Modification));
    }

    Ok(comment)
}

fn build_viewpoint_reference(tree: &XmlTree) -> Result<ViewpointReference> {
    let guid = parse_uuid(tree.attribute("Guid").ok_or_else(|| missing_field("Guid", "Markup/Viewpoints"))?)?;
    let viewpoint_file = Uri::new(tree.child_text("Viewpoint").unwrap_or_default());
    let snapshot_file = Uri::new(tree.child_text("Snapshot").unwrap_or_default());
    let index = tree.child_text("Index").map(|value| value.trim().parse()).transpose()?;

    Ok(ViewpointReference::new(guid, viewpoint_file, snapshot_file, index, CellState::Original))
}

fn build_header_file(tree: &XmlTree) -> Result<HeaderFile> {
    let is_external = tree.attribute("isExternal").map(parse_str_as_bool).transpose()?.unwrap_or(true);
    let date = tree.child_text("Date").map(parse_datetime).transpose()?;

    Ok(HeaderFile::new(
        tree.attribute("IfcProject").unwrap_or_default(),
        tree.attribute("IfcSpatialStructureElement").unwrap_or_default(),
        is_external,
        tree.child_text("Filename").unwrap_or_default(),
        date,
        Uri::new(tree.child_text("Reference").unwrap_or_default()),
        CellState::Original,
    ))
}

fn build_bim_snippet(tree: &XmlTree) -> Result<BimSnippet> {
    let snippet_type = tree.attribute("SnippetType").ok_or_else(|| missing_field("SnippetType", "Markup/Topic/BimSnippet"))?;
    let is_external = tree.attribute("isExternal").map(parse_str_as_bool).transpose()?.unwrap_or(false);

    Ok(BimSnippet::new(
        snippet_type,
        is_external,
        Uri::new(tree.child_text("Reference").unwrap_or_default()),
        Uri::new(tree.child_text("ReferenceSchema").unwrap_or_default()),
        CellState::Original,
    ))
}

fn build_doc_ref(tree: &XmlTree) -> Result<DocumentReference> {
    let guid = tree.attribute("Guid").map(parse_uuid).transpose()?;
    let is_external = tree.attribute("isExternal").map(parse_str_as_bool).transpose()?.unwrap_or(false);

    Ok(DocumentReference::new(
        guid,
        is_external,
        Uri::new(tree.child_text("ReferencedDocument").unwrap_or_default()),
        tree.child_text("Description").unwrap_or_default(),
        CellState::Original,
    ))
}

//---------------------------------------------------------------------------//
//                          Scalar parsing helpers
//---------------------------------------------------------------------------//

fn parse_uuid(text: &str) -> Result<Uuid> {
    Uuid::parse_str(text.trim()).map_err(|_| RLibError::FormatInvalidUuid(text.to_owned()))
}

fn parse_datetime(text: &str) -> Result<XmlDateTime> {
    XmlDateTime::parse(text.trim())
}

fn missing_field(field: &str, path: &str) -> RLibError {
    RLibError::FormatMissingField(field.to_owned(), path.to_owned())
}
