//---------------------------------------------------------------------------//
// Copyright (c) 2017-2025 Ismael Gutiérrez González. All rights reserved.
//
// This file is part of the Rusted BCF Manager (RBCF) project,
// which can be found here: https://github.com/Frodo45127/rbcf.
//
// This file is licensed under the MIT license, which can be found here:
// https://github.com/Frodo45127/rbcf/blob/master/LICENSE.
//---------------------------------------------------------------------------//

//! This module contains the update pipeline: the piece that turns queued model
//! changes into committed container bytes.
//!
//! Updates are queued with [`add_update`] and drained by [`process_updates`] in
//! arrival order, with deletions stably first. Every affected document is
//! cloned into an in-memory staging buffer, mutated there, and re-validated
//! against its XSD; only then are the buffers flushed and the archive repacked
//! through an atomic rename. A failure at any point leaves the archive on disk
//! untouched, the queue intact and the model as the caller left it, so the
//! caller can fix the model and retry.

use log::debug;

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fs::{File, create_dir_all, remove_dir_all, remove_file, read_to_string};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::archive;
use crate::cells::CellState;
use crate::error::{RLibError, Result};
use crate::model::{CellRef, CellSnapshot, ElementMatcher, EntityRef, NodeId, ProjectUpdate, XmlEntity};
use crate::model::project::Project;
use crate::reader::{MARKUP_FILE, PROJECT_FILE};
use crate::schema::{SchemaSet, Xsd};

//---------------------------------------------------------------------------//
//                           Queue functions
//---------------------------------------------------------------------------//

/// This function appends a pending update for an entity (or one of its cells)
/// to the project's queue.
///
/// `previous` is the serialised value the cell had before the change; when not
/// provided, the value remembered by the cell itself is used at process time.
pub fn add_update(project: &mut Project, node: NodeId, cell: Option<CellRef>, previous: Option<String>) -> Result<()> {
    if !project.is_open() {
        return Err(RLibError::UsageProjectClosed);
    }

    if project.entity(node).is_none() {
        return Err(RLibError::UsageObjectNotInProject(format!("node {node:?}")));
    }

    project.push_update(ProjectUpdate::new(node, cell, previous));
    Ok(())
}

/// This function drains the queue, applies every update to staging buffers,
/// re-validates the touched documents and commits the archive atomically.
///
/// On success all cell states reset to `Original` and deleted entities leave
/// the model. On failure nothing on disk changes and the queue is preserved.
pub fn process_updates(project: &mut Project, schemas: &SchemaSet) -> Result<()> {
    if !project.is_open() {
        return Err(RLibError::UsageProjectClosed);
    }
    if project.updates().is_empty() {
        return Ok(());
    }

    let scratch = project.scratch_dir()?.to_owned();

    // Deletions go first so that add/delete pairs on the same parent can't
    // collide. The sort is stable, so everything else keeps arrival order.
    let mut records = project.updates().to_vec();
    {
        let project: &Project = &*project;
        records.sort_by_key(|record| !is_delete(project, record));
    }

    let mut staging: HashMap<String, String> = HashMap::new();
    let mut deleted_dirs: Vec<String> = vec![];
    let mut deleted_files: Vec<String> = vec![];

    for record in &records {
        apply_record(project, record, schemas, &scratch, &mut staging, &mut deleted_dirs, &mut deleted_files)?;
    }

    // Nothing hits the disk before every touched document validates again.
    for (path, content) in &staging {
        let xsd = xsd_for(path, schemas);
        xsd.validate_str(content, path)
            .map_err(|error| RLibError::WriterRevalidationFailed(path.to_owned(), "the queued updates".to_owned(), error.to_string()))?;
    }

    // Flush the staging buffers and the pending removals to the scratch tree.
    for (path, content) in &staging {
        let full_path = scratch.join(path);
        if let Some(parent) = full_path.parent() {
            create_dir_all(parent)?;
        }
        let mut file = BufWriter::new(File::create(&full_path)?);
        file.write_all(content.as_bytes())?;
        file.flush()?;
        debug!("Flushed {path}");
    }

    for path in &deleted_files {
        let full_path = scratch.join(path);
        if full_path.is_file() {
            remove_file(full_path)?;
        }
    }

    for dir in &deleted_dirs {
        let full_path = scratch.join(dir);
        if full_path.is_dir() {
            remove_dir_all(full_path)?;
        }
    }

    let archive_path = project.archive_path().to_owned();
    archive::repack(&scratch, &archive_path, project.member_order())?;

    // The container matches the model again: committed state is the new Original.
    if staging.contains_key(PROJECT_FILE) {
        project.set_has_project_file(true);
    }
    project.purge_deleted();
    project.reset_all();
    project.clear_updates();
    Ok(())
}

//---------------------------------------------------------------------------//
//                        Record application
//---------------------------------------------------------------------------//

fn is_delete(project: &Project, record: &ProjectUpdate) -> bool {
    let Some(entity) = project.entity(*record.node()) else {
        return false;
    };

    match record.cell() {
        Some(cell) => entity.as_entity().cell_snapshot(cell)
            .map(|snapshot| snapshot.state().is_deleted())
            .unwrap_or(false),
        None => entity.as_entity().state().is_deleted(),
    }
}

fn apply_record(
    project: &Project,
    record: &ProjectUpdate,
    schemas: &SchemaSet,
    scratch: &Path,
    staging: &mut HashMap<String, String>,
    deleted_dirs: &mut Vec<String>,
    deleted_files: &mut Vec<String>,
) -> Result<()> {
    let chain = project.chain(*record.node())
        .ok_or_else(|| RLibError::UsageObjectNotInProject(format!("node {:?}", record.node())))?;
    let target = chain.last().copied()
        .ok_or_else(|| RLibError::UsageObjectNotInProject(format!("node {:?}", record.node())))?;

    match target {
        // Project-level metadata lives in project.bcfp.
        EntityRef::Project(_) => apply_project_record(project, record, schemas, scratch, staging),

        // Viewpoint documents are leaves: they're written or removed whole.
        EntityRef::Viewpoint(_) => apply_viewpoint_record(&chain, staging, deleted_files),

        // Deleting a whole markup removes its directory, nothing else: the 2.1
        // project file carries no topic list to patch.
        EntityRef::Markup(markup) if record.cell().is_none() && markup.state().is_deleted() => {
            deleted_dirs.push(markup.topic_dir().to_owned());
            Ok(())
        }

        // A whole new markup means a fresh directory with a fresh document.
        EntityRef::Markup(markup) if record.cell().is_none() && markup.state().is_added() => {
            let rel_path = format!("{}/{MARKUP_FILE}", markup.topic_dir());
            staging.insert(rel_path, markup.to_tree().to_document());
            Ok(())
        }

        // Everything else is a surgical edit of a markup.bcf.
        _ => apply_markup_record(record, &chain, target, schemas, scratch, staging, deleted_files),
    }
}

fn apply_markup_record(
    record: &ProjectUpdate,
    chain: &[EntityRef],
    target: EntityRef,
    schemas: &SchemaSet,
    scratch: &Path,
    staging: &mut HashMap<String, String>,
    deleted_files: &mut Vec<String>,
) -> Result<()> {
    let Some(EntityRef::Markup(markup)) = chain.get(1) else {
        return Err(RLibError::WriterUpdateNotApplicable(
            target.as_entity().xml_name().to_owned(),
            "the entity is not part of any markup".to_owned(),
        ));
    };

    let topic_dir = markup.topic_dir().to_owned();
    let rel_path = format!("{topic_dir}/{MARKUP_FILE}");
    let buffer = staged_doc(staging, scratch, &rel_path)?;

    // Matchers from the document root (the Markup element) down to the target.
    let matchers = chain[1..].iter().map(|entity| entity.as_entity().matcher()).collect::<Vec<_>>();
    let xsd = schemas.markup();

    match record.cell() {
        Some(cell) => {
            let snapshot = target.as_entity().cell_snapshot(cell)
                .ok_or_else(|| RLibError::WriterUpdateNotApplicable(
                    super::chain_describe(&matchers),
                    format!("it has no cell named \"{}\"", cell.xml_name()),
                ))?;
            apply_cell(buffer, &matchers, target.as_entity().xml_name(), &snapshot, record.previous().as_deref(), xsd, &rel_path)
        }

        None => match target.as_entity().state() {
            CellState::Added => {
                apply_added_entity(buffer, chain, &matchers, xsd, &rel_path)?;

                // A new viewpoint reference can carry a new viewpoint document.
                if let EntityRef::ViewpointReference(vp_ref) = target {
                    if let Some(viewpoint) = vp_ref.viewpoint() {
                        if viewpoint.state().is_added() {
                            staging.insert(format!("{topic_dir}/{}", viewpoint.file_name()), viewpoint.raw().to_owned());
                        }
                    }
                }
                Ok(())
            }

            CellState::Deleted => {
                super::delete_element(buffer, &matchers, xsd, &rel_path)?;

                // A deleted viewpoint reference takes its document with it.
                if let EntityRef::ViewpointReference(vp_ref) = target {
                    if let Some(viewpoint) = vp_ref.viewpoint() {
                        deleted_files.push(format!("{topic_dir}/{}", viewpoint.file_name()));
                    }
                }
                Ok(())
            }

            // A whole-entity record over a live entity commits its dirty cells.
            _ => {
                let host_name = target.as_entity().xml_name();
                for cell in target.as_entity().dirty_cells() {
                    let snapshot = target.as_entity().cell_snapshot(&cell)
                        .ok_or_else(|| RLibError::WriterUpdateNotApplicable(
                            super::chain_describe(&matchers),
                            format!("it has no cell named \"{}\"", cell.xml_name()),
                        ))?;
                    apply_cell(buffer, &matchers, host_name, &snapshot, None, xsd, &rel_path)?;
                }
                Ok(())
            }
        }
    }
}

/// This function applies one cell-level change to a staged document.
fn apply_cell(
    buffer: &mut String,
    matchers: &[ElementMatcher],
    host_name: &str,
    snapshot: &CellSnapshot,
    record_previous: Option<&str>,
    xsd: &Xsd,
    doc_path: &str,
) -> Result<()> {
    let state = snapshot.state();

    match snapshot.cell() {
        CellRef::Attribute(name) => match state {
            CellState::Original | CellState::Extra => Ok(()),
            CellState::Added | CellState::Modified => super::set_attribute(buffer, matchers, name, Some(snapshot.text().as_str()), doc_path),
            CellState::Deleted => if snapshot.was_on_disk() {
                super::set_attribute(buffer, matchers, name, None, doc_path)
            } else {
                Ok(())
            },
        },

        CellRef::Element(name) => {
            let fragment = super::render_scalar_child(host_name, name, snapshot.text());
            match state {
                CellState::Original | CellState::Extra => Ok(()),

                // A modified cell whose previous value was the default has no
                // element on disk to modify: it degrades to an add.
                CellState::Added | CellState::Modified => {
                    let must_exist = state.is_modified() && snapshot.was_on_disk();
                    super::replace_child(buffer, matchers, name, None, &fragment, xsd, doc_path, must_exist)
                }

                CellState::Deleted => if snapshot.was_on_disk() {
                    super::delete_child(buffer, matchers, name, None, doc_path)
                } else {
                    Ok(())
                },
            }
        }

        CellRef::ListItem(name, _) => {
            let fragment = super::render_scalar_child(host_name, name, snapshot.text());
            match state {
                CellState::Original | CellState::Extra => Ok(()),
                CellState::Added => super::insert_child(buffer, matchers, name, &fragment, xsd, doc_path),
                CellState::Modified => {
                    let previous = record_previous
                        .or_else(|| snapshot.previous().as_deref())
                        .unwrap_or_else(|| snapshot.text_on_disk());
                    super::replace_child(buffer, matchers, name, Some(previous), &fragment, xsd, doc_path, true)
                }
                CellState::Deleted => super::delete_child(buffer, matchers, name, Some(snapshot.text().as_str()), doc_path),
            }
        }
    }
}

/// This function inserts the fragment of a freshly added entity.
///
/// If an ancestor of the target is itself new, the outermost added ancestor is
/// serialised instead, children included, so the whole new subtree lands at
/// once. A target already present in the buffer (added by an earlier record of
/// the same batch) is left alone.
fn apply_added_entity(
    buffer: &mut String,
    chain: &[EntityRef],
    matchers: &[ElementMatcher],
    xsd: &Xsd,
    doc_path: &str,
) -> Result<()> {
    // chain[0] is the Project; matchers mirror chain[1..], starting at the
    // document root, which can't be the added element here.
    let entities = &chain[1..];
    let added_index = entities.iter().enumerate().skip(1)
        .find(|(_, entity)| entity.as_entity().state().is_added())
        .map(|(index, _)| index)
        .unwrap_or(entities.len() - 1);

    // Already present? Then an earlier record of this batch carried it in. The
    // probe is only trustworthy for guid-bearing elements: anything weaker
    // could mistake a sibling for the new element.
    if matchers[added_index].guid().is_some() {
        let doc = super::parse(buffer, doc_path)?;
        if super::find_in_doc(&doc, &matchers[..=added_index], doc_path).is_ok() {
            return Ok(());
        }
    }

    let added = entities[added_index];
    let fragment = added.as_entity().to_tree().to_fragment();
    super::insert_child(buffer, &matchers[..added_index], added.as_entity().xml_name(), &fragment, xsd, doc_path)
}

//---------------------------------------------------------------------------//
//                   Project and viewpoint documents
//---------------------------------------------------------------------------//

fn apply_project_record(
    project: &Project,
    record: &ProjectUpdate,
    schemas: &SchemaSet,
    scratch: &Path,
    staging: &mut HashMap<String, String>,
) -> Result<()> {
    // With no project.bcfp on disk, the whole manifest is generated from the
    // model; that includes every pending project-level change at once.
    if !project.has_project_file() && !staging.contains_key(PROJECT_FILE) {
        staging.insert(PROJECT_FILE.to_owned(), project.to_tree().to_document());
        return Ok(());
    }

    let Some(cell) = record.cell() else {
        // Whole-entity project records commit the dirty metadata cells.
        for cell in project.dirty_cells() {
            apply_project_cell(project, &cell, schemas, scratch, staging)?;
        }
        return Ok(());
    };

    apply_project_cell(project, cell, schemas, scratch, staging)
}

fn apply_project_cell(
    project: &Project,
    cell: &CellRef,
    schemas: &SchemaSet,
    scratch: &Path,
    staging: &mut HashMap<String, String>,
) -> Result<()> {
    let snapshot = project.cell_snapshot(cell)
        .ok_or_else(|| RLibError::WriterUpdateNotApplicable(
            "ProjectExtension".to_owned(),
            format!("it has no cell named \"{}\"", cell.xml_name()),
        ))?;

    let buffer = staged_doc(staging, scratch, PROJECT_FILE)?;
    let xsd = schemas.project();
    let root = ElementMatcher::new("ProjectExtension");
    let project_child = ElementMatcher::new("Project");

    match cell {
        // The id is an attribute of the nested Project element.
        CellRef::Attribute("ProjectId") => {
            apply_cell(buffer, &[root, project_child], "Project", &snapshot, None, xsd, PROJECT_FILE)
        }

        // The name is a child of the nested Project element, which may be
        // missing entirely from an existing manifest.
        CellRef::Element("Name") => {
            let has_project_child = {
                let doc = super::parse(buffer, PROJECT_FILE)?;
                super::find_in_doc(&doc, &[root.clone(), project_child.clone()], PROJECT_FILE).is_ok()
            };

            if has_project_child {
                apply_cell(buffer, &[root, project_child], "Project", &snapshot, None, xsd, PROJECT_FILE)
            } else if !snapshot.state().is_deleted() {
                let tree = project.to_tree();
                let fragment = tree.children().first()
                    .map(|child| child.to_fragment())
                    .unwrap_or_default();
                super::insert_child(buffer, &[root], "Project", &fragment, xsd, PROJECT_FILE)
            } else {
                Ok(())
            }
        }

        // The extension schema hangs off the manifest root.
        CellRef::Element("ExtensionSchema") => {
            apply_cell(buffer, &[root], "ProjectExtension", &snapshot, None, xsd, PROJECT_FILE)
        }

        _ => Err(RLibError::WriterUpdateNotApplicable(
            "ProjectExtension".to_owned(),
            format!("it has no cell named \"{}\"", cell.xml_name()),
        )),
    }
}

fn apply_viewpoint_record(
    chain: &[EntityRef],
    staging: &mut HashMap<String, String>,
    deleted_files: &mut Vec<String>,
) -> Result<()> {
    let Some(EntityRef::Markup(markup)) = chain.get(1) else {
        return Err(RLibError::WriterUpdateNotApplicable(
            "VisualizationInfo".to_owned(),
            "the viewpoint is not part of any markup".to_owned(),
        ));
    };
    let Some(EntityRef::Viewpoint(viewpoint)) = chain.last() else {
        return Err(RLibError::WriterUpdateNotApplicable(
            "VisualizationInfo".to_owned(),
            "the record does not point to a viewpoint".to_owned(),
        ));
    };

    let rel_path = format!("{}/{}", markup.topic_dir(), viewpoint.file_name());
    match viewpoint.state() {
        CellState::Added | CellState::Modified => {
            staging.insert(rel_path, viewpoint.raw().to_owned());
            Ok(())
        }
        CellState::Deleted => {
            deleted_files.push(rel_path);
            Ok(())
        }
        CellState::Original | CellState::Extra => Ok(()),
    }
}

//---------------------------------------------------------------------------//
//                              Helpers
//---------------------------------------------------------------------------//

/// This function returns the staging buffer of a document, loading it from the
/// scratch tree on first access.
fn staged_doc<'a>(staging: &'a mut HashMap<String, String>, scratch: &Path, rel_path: &str) -> Result<&'a mut String> {
    match staging.entry(rel_path.to_owned()) {
        Entry::Occupied(entry) => Ok(entry.into_mut()),
        Entry::Vacant(entry) => {
            let content = read_to_string(scratch.join(rel_path))?;
            Ok(entry.insert(content))
        }
    }
}

fn xsd_for<'a>(path: &str, schemas: &'a SchemaSet) -> &'a Xsd {
    if path.ends_with(MARKUP_FILE) {
        schemas.markup()
    } else if path.ends_with(PROJECT_FILE) {
        schemas.project()
    } else {
        schemas.visinfo()
    }
}
