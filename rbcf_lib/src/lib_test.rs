//---------------------------------------------------------------------------//
// Copyright (c) 2017-2025 Ismael Gutiérrez González. All rights reserved.
//
// This file is part of the Rusted BCF Manager (RBCF) project,
// which can be found here: https://github.com/Frodo45127/rbcf.
//
// This file is licensed under the MIT license, which can be found here:
// https://github.com/Frodo45127/rbcf/blob/master/LICENSE.
//---------------------------------------------------------------------------//

/*!
Module containing end-to-end tests for the programmatic surface: open, query,
mutate, commit, reopen.
!*/

use uuid::Uuid;

use std::fs::{read, read_to_string};

use crate::cells::CellState;
use crate::error::RLibError;
use crate::model::XmlEntity;
use crate::model::markup::HeaderFile;
use crate::model::uri::Uri;
use crate::test_common::*;

use super::*;

fn guid(text: &str) -> Uuid {
    Uuid::parse_str(text).unwrap()
}

#[test]
fn test_get_topics_is_ordered_by_index_with_unindexed_last() {
    let dir = tempfile::tempdir().unwrap();
    let path = sample_archive(dir.path());
    let project = open_project(&path).unwrap();

    // One topic per uuid-named directory of the container.
    let topics = get_topics(&project);
    assert_eq!(topics.len(), 2);

    // Topic 1 carries index 0; topic 2 has none and trails.
    assert_eq!(topics[0].title().value(), "Doors are in the wrong place");
    assert_eq!(topics[1].title().value(), "Stairwell is missing a railing");
}

#[test]
fn test_get_comments_sorts_and_filters() {
    let dir = tempfile::tempdir().unwrap();
    let path = sample_archive(dir.path());
    let project = open_project(&path).unwrap();

    let comments = get_comments(&project, guid(TOPIC_DIR_1), None).unwrap();
    assert_eq!(comments.len(), 2);
    assert_eq!(comments[0].text().value(), "The walls are too thin.");
    assert_eq!(comments[1].text().value(), "The walls are too thick.");

    let filtered = get_comments(&project, guid(TOPIC_DIR_1), Some(guid(VIEWPOINT_GUID))).unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].text().value(), "The walls are too thin.");
}

#[test]
fn test_get_viewpoints_snapshots_and_ifc_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = sample_archive(dir.path());
    let project = open_project(&path).unwrap();

    let viewpoints = get_viewpoints(&project, guid(TOPIC_DIR_1)).unwrap();
    assert_eq!(viewpoints.len(), 1);
    assert_eq!(viewpoints[0].0, "viewpoint.bcfv");

    let snapshots = get_snapshots(&project, guid(TOPIC_DIR_1)).unwrap();
    assert_eq!(snapshots.len(), 1);
    assert!(snapshots[0].is_file());

    // The one header file has both an ifc project id and a reference.
    let files = get_relevant_ifc_files(&project, guid(TOPIC_DIR_1)).unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].ifc_project().value(), "0M6o7Znnv7hxsbWgeu7oQq");

    // The second topic has no header at all.
    assert!(get_relevant_ifc_files(&project, guid(TOPIC_DIR_2)).unwrap().is_empty());
}

#[test]
fn test_round_trip_preserves_the_project() {
    let dir = tempfile::tempdir().unwrap();
    let path = sample_archive(dir.path());

    let mut project = open_project(&path).unwrap();
    let out = dir.path().join("out.bcf");
    save_project(&mut project, &out).unwrap();

    let reread = open_project(&out).unwrap();
    assert_eq!(project, reread);
}

#[test]
fn test_saving_twice_writes_identical_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let path = sample_archive(dir.path());

    let mut project = open_project(&path).unwrap();
    let out_1 = dir.path().join("out_1.bcf");
    let out_2 = dir.path().join("out_2.bcf");
    save_project(&mut project, &out_1).unwrap();
    save_project(&mut project, &out_2).unwrap();

    assert_eq!(read(&out_1).unwrap(), read(&out_2).unwrap());
}

#[test]
fn test_add_comment_survives_a_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = sample_archive(dir.path());
    let mut project = open_project(&path).unwrap();

    let author = get_topics(&project)[0].creation().author().value().to_owned();
    add_comment(&mut project, guid(TOPIC_DIR_1), "hello this is me mario!", &author, None).unwrap();

    // The comment is committed and canonicalised right away.
    assert!(project.updates().is_empty());
    assert_eq!(project.markups()[0].comments().last().unwrap().state(), CellState::Original);

    let out = dir.path().join("out.bcf");
    save_project(&mut project, &out).unwrap();

    let reread = open_project(&out).unwrap();
    let comments = get_comments(&reread, guid(TOPIC_DIR_1), None).unwrap();
    assert_eq!(comments.len(), 3);
    assert_eq!(comments.last().unwrap().text().value(), "hello this is me mario!");
    assert_eq!(comments.last().unwrap().creation().author().value(), "mario@example.com");
}

#[test]
fn test_add_header_file_survives_a_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = sample_archive(dir.path());
    let mut project = open_project(&path).unwrap();

    {
        let markup = project.markup_by_topic_guid_mut(guid(TOPIC_DIR_1)).unwrap();
        let header = markup.header_mut().as_mut().unwrap();
        header.files_mut().push(HeaderFile::new(
            "abcdefghij",
            "",
            false,
            "this is some file name",
            None,
            Uri::new("/path/to/the/file"),
            CellState::Added,
        ));
    }
    project.attach_all();

    let node = project.markup_by_topic_guid(guid(TOPIC_DIR_1)).unwrap()
        .header().as_ref().unwrap()
        .files().last().unwrap()
        .node_id();
    writer::update::add_update(&mut project, node, None, None).unwrap();
    writer::update::process_updates(&mut project, builtin_schemas()).unwrap();

    let reread = open_project(&path).unwrap();
    let markup = reread.markup_by_topic_guid(guid(TOPIC_DIR_1)).unwrap();
    let files = markup.header().as_ref().unwrap().files();
    assert_eq!(files.len(), 2);

    let file = &files[1];
    assert_eq!(file.ifc_project().value(), "abcdefghij");
    assert_eq!(*file.is_external().value(), false);
    assert_eq!(file.filename().value(), "this is some file name");
    assert_eq!(file.reference().value().as_str(), "/path/to/the/file");
}

#[test]
fn test_assigning_a_topic_writes_exactly_one_assigned_to() {
    let dir = tempfile::tempdir().unwrap();
    let path = sample_archive(dir.path());
    let mut project = open_project(&path).unwrap();

    let node = {
        let markup = project.markup_by_topic_guid_mut(guid(TOPIC_DIR_1)).unwrap();
        markup.topic_mut().assignee_mut().set("a@b.c".to_owned());
        markup.topic().node_id()
    };
    modify_element(&mut project, node, "mario@example.com").unwrap();

    let reread = open_project(&path).unwrap();
    let topic = reread.markup_by_topic_guid(guid(TOPIC_DIR_1)).unwrap().topic();
    assert_eq!(topic.assignee().value(), "a@b.c");

    let modification = topic.last_modification().as_ref().unwrap();
    assert_eq!(modification.author().value(), "mario@example.com");

    let markup_text = read_to_string(reread.scratch_dir().unwrap().join(TOPIC_DIR_1).join("markup.bcf")).unwrap();
    assert_eq!(markup_text.matches("<AssignedTo>a@b.c</AssignedTo>").count(), 1);
}

#[test]
fn test_delete_comment_keeps_the_others_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = sample_archive(dir.path());
    let mut project = open_project(&path).unwrap();

    let (node, remaining) = {
        let comments = get_comments(&project, guid(TOPIC_DIR_1), None).unwrap();
        let node = comments[0].node_id();
        let remaining = comments[1..].iter().map(|comment| comment.text().value().to_owned()).collect::<Vec<_>>();
        (node, remaining)
    };

    delete_object(&mut project, node).unwrap();

    let reread = open_project(&path).unwrap();
    let comments = get_comments(&reread, guid(TOPIC_DIR_1), None).unwrap();
    assert_eq!(comments.len(), remaining.len());
    assert_eq!(comments.iter().map(|comment| comment.text().value().to_owned()).collect::<Vec<_>>(), remaining);
}

#[test]
fn test_delete_markup_removes_the_topic_directory() {
    let dir = tempfile::tempdir().unwrap();
    let path = sample_archive(dir.path());
    let mut project = open_project(&path).unwrap();

    let node = project.markups()[1].node_id();
    delete_object(&mut project, node).unwrap();

    let reread = open_project(&path).unwrap();
    assert_eq!(reread.markups().len(), 1);
    assert_eq!(reread.markups()[0].topic_dir(), TOPIC_DIR_1);
}

#[test]
fn test_deleting_an_object_from_another_project_is_an_usage_error() {
    let dir_a = tempfile::tempdir().unwrap();
    let dir_b = tempfile::tempdir().unwrap();
    let path_a = sample_archive(dir_a.path());
    let path_b = sample_archive(dir_b.path());

    let project_a = open_project(&path_a).unwrap();
    let mut project_b = open_project(&path_b).unwrap();

    let foreign_node = get_comments(&project_a, guid(TOPIC_DIR_1), None).unwrap()[0].node_id();
    let before = read(&path_b).unwrap();

    match delete_object(&mut project_b, foreign_node) {
        Err(RLibError::UsageObjectNotInProject(_)) => {}
        other => panic!("expected UsageObjectNotInProject, got {other:?}"),
    }

    // The archive on disk is untouched.
    assert_eq!(read(&path_b).unwrap(), before);
}

#[test]
fn test_add_then_delete_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let path = sample_archive(dir.path());
    let mut project = open_project(&path).unwrap();

    // Normalise the container bytes through our own repack first.
    save_project(&mut project, &path).unwrap();
    let before = read(&path).unwrap();

    add_comment(&mut project, guid(TOPIC_DIR_1), "temporary note", "mario@example.com", None).unwrap();
    let node = {
        let comments = get_comments(&project, guid(TOPIC_DIR_1), None).unwrap();
        comments.last().unwrap().node_id()
    };
    delete_object(&mut project, node).unwrap();

    assert_eq!(read(&path).unwrap(), before);
}

#[test]
fn test_operations_on_a_closed_project_fail() {
    let dir = tempfile::tempdir().unwrap();
    let path = sample_archive(dir.path());
    let mut project = open_project(&path).unwrap();

    close_project(&mut project);

    match save_project(&mut project, &path) {
        Err(RLibError::UsageProjectClosed) => {}
        other => panic!("expected UsageProjectClosed, got {other:?}"),
    }

    match add_comment(&mut project, guid(TOPIC_DIR_1), "too late", "mario@example.com", None) {
        Err(RLibError::UsageProjectClosed) => {}
        other => panic!("expected UsageProjectClosed, got {other:?}"),
    }
}

#[test]
fn test_unknown_topic_is_an_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = sample_archive(dir.path());
    let project = open_project(&path).unwrap();

    match get_comments(&project, Uuid::nil(), None) {
        Err(RLibError::UsageTopicNotFound(_)) => {}
        other => panic!("expected UsageTopicNotFound, got {other:?}"),
    }
}
