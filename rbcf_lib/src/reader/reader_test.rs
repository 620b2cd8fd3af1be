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
Module containing tests for the validating reader.
!*/

use uuid::Uuid;

use crate::cells::CellState;
use crate::error::RLibError;
use crate::model::{EntityRef, XmlEntity};
use crate::schema::SchemaSet;
use crate::test_common::*;

use super::*;

fn schemas() -> SchemaSet {
    SchemaSet::bcf_2_1().unwrap()
}

#[test]
fn test_read_sample_archive() {
    let dir = tempfile::tempdir().unwrap();
    let path = sample_archive(dir.path());
    let project = read(&path, &schemas()).unwrap();

    assert_eq!(*project.id().value(), Uuid::parse_str(PROJECT_GUID).unwrap());
    assert_eq!(project.name().value(), "Example project");
    assert_eq!(project.extension_schema().value(), "extensions.xsd");
    assert!(project.has_project_file());
    assert_eq!(project.markups().len(), 2);

    let markup = &project.markups()[0];
    assert_eq!(markup.topic_dir(), TOPIC_DIR_1);

    let topic = markup.topic();
    assert_eq!(topic.title().value(), "Doors are in the wrong place");
    assert_eq!(topic.topic_type().value(), "Issue");
    assert_eq!(topic.topic_status().value(), "Open");
    assert_eq!(topic.priority().value(), "High");
    assert_eq!(*topic.index().value(), Some(0));
    assert_eq!(topic.labels().values().cloned().collect::<Vec<_>>(), vec!["Architecture".to_owned(), "Structural".to_owned()]);
    assert_eq!(topic.creation().author().value(), "mario@example.com");
    assert_eq!(topic.creation().date().value().as_str(), "2014-10-16T14:35:29+00:00");
    assert_eq!(topic.description().value(), "The doors need to move half a meter east.");

    assert_eq!(markup.comments().len(), 2);
    let comment = &markup.comments()[0];
    assert_eq!(comment.text().value(), "The walls are too thin.");
    assert_eq!(*comment.viewpoint().value(), Some(Uuid::parse_str(VIEWPOINT_GUID).unwrap()));
    assert_eq!(*markup.comments()[1].viewpoint().value(), None);

    assert_eq!(markup.viewpoint_refs().len(), 1);
    let vp_ref = &markup.viewpoint_refs()[0];
    assert_eq!(vp_ref.viewpoint_file().value().as_str(), "viewpoint.bcfv");
    assert_eq!(vp_ref.snapshot_file().value().as_str(), "snapshot.png");
    let viewpoint = vp_ref.viewpoint().as_ref().unwrap();
    assert_eq!(viewpoint.raw(), VIEWPOINT_XML);

    // Snapshots are carried as Extra items: present in the model, backed by no XML.
    assert_eq!(markup.snapshots().iter().map(|snapshot| snapshot.value().to_owned()).collect::<Vec<_>>(), vec!["snapshot.png".to_owned()]);
    assert!(markup.snapshots().iter().all(|snapshot| snapshot.state() == CellState::Extra));

    let header = markup.header().as_ref().unwrap();
    assert_eq!(header.files().len(), 1);
    let file = &header.files()[0];
    assert_eq!(file.ifc_project().value(), "0M6o7Znnv7hxsbWgeu7oQq");
    assert_eq!(*file.is_external().value(), false);
    assert_eq!(file.filename().value(), "structure.ifc");

    // Second topic: no header, no index, no viewpoints.
    let markup_2 = &project.markups()[1];
    assert!(markup_2.header().is_none());
    assert_eq!(*markup_2.topic().index().value(), None);
    assert!(markup_2.viewpoint_refs().is_empty());
}

#[test]
fn test_fresh_projects_are_entirely_original_and_chained_to_the_root() {
    let dir = tempfile::tempdir().unwrap();
    let path = sample_archive(dir.path());
    let project = read(&path, &schemas()).unwrap();

    fn check(project: &crate::model::project::Project, entity: EntityRef) {
        assert_eq!(entity.as_entity().state(), CellState::Original);

        // The back-chain of every entity starts at the project root.
        let chain = project.chain(entity.as_entity().node_id()).unwrap();
        assert!(matches!(chain[0], EntityRef::Project(_)));

        for child in entity.children() {
            assert_eq!(child.as_entity().parent_id(), entity.as_entity().node_id());
            check(project, child);
        }
    }

    check(&project, EntityRef::Project(&project));
}

#[test]
fn test_structural_equality_across_reads() {
    let dir = tempfile::tempdir().unwrap();
    let path = sample_archive(dir.path());
    let project_a = read(&path, &schemas()).unwrap();
    let project_b = read(&path, &schemas()).unwrap();
    assert_eq!(project_a, project_b);
}

#[test]
fn test_missing_version_file_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let members = sample_members().into_iter().filter(|(name, _)| *name != "bcf.version").collect::<Vec<_>>();
    let path = dir.path().join("no_version.bcf");
    write_archive(&path, &members);

    match read(&path, &schemas()) {
        Err(RLibError::FormatMissingVersion) => {}
        other => panic!("expected FormatMissingVersion, got {other:?}"),
    }
}

#[test]
fn test_unsupported_version_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let version = VERSION_XML.replace("2.1", "3.0");
    let mut members: Vec<(&str, &str)> = sample_members();
    members[0] = ("bcf.version", version.as_str());
    let path = dir.path().join("wrong_version.bcf");
    write_archive(&path, &members);

    match read(&path, &schemas()) {
        Err(RLibError::FormatUnsupportedVersion(version)) => assert_eq!(version, "3.0"),
        other => panic!("expected FormatUnsupportedVersion, got {other:?}"),
    }
}

#[test]
fn test_invalid_markup_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let broken = MARKUP_XML_2.replace("<Title>Stairwell is missing a railing</Title>", "");
    let mut members: Vec<(&str, &str)> = sample_members();
    members[5] = ("7d4bb687-3f86-4035-a881-6e64d1b72d56/markup.bcf", broken.as_str());
    let path = dir.path().join("broken_markup.bcf");
    write_archive(&path, &members);

    match read(&path, &schemas()) {
        Err(RLibError::FormatInvalidMarkup(topic_dir, _)) => assert_eq!(topic_dir, TOPIC_DIR_2),
        other => panic!("expected FormatInvalidMarkup, got {other:?}"),
    }
}

#[test]
fn test_broken_viewpoint_only_loses_itself() {
    init_logs();

    let dir = tempfile::tempdir().unwrap();
    let mut members = sample_members();
    members[3] = ("2e92784b-80fc-4e0e-ac02-b424dfd8e664/viewpoint.bcfv", "<VisualizationInfo><Nope/>");
    let path = dir.path().join("broken_viewpoint.bcf");
    write_archive(&path, &members);

    let project = read(&path, &schemas()).unwrap();
    let markup = &project.markups()[0];

    // The reference survives, the loaded viewpoint doesn't.
    assert_eq!(markup.viewpoint_refs().len(), 1);
    assert!(markup.viewpoint_refs()[0].viewpoint().is_none());
}

#[test]
fn test_archive_without_topics_reads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.bcf");
    write_archive(&path, &[("bcf.version", VERSION_XML)]);

    let project = read(&path, &schemas()).unwrap();
    assert!(project.markups().is_empty());
    assert_eq!(*project.id().value(), Uuid::nil());
    assert!(!project.has_project_file());
}

#[test]
fn test_comment_link_to_unknown_viewpoint_is_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let markup = MARKUP_XML_2.replace(
        "<Comment>Confirmed on site.</Comment>",
        "<Comment>Confirmed on site.</Comment>\n    <Viewpoint Guid=\"b496c1f0-9c31-4fab-8b56-2a9a0ad4d2c2\"/>",
    );
    let mut members: Vec<(&str, &str)> = sample_members();
    members[5] = ("7d4bb687-3f86-4035-a881-6e64d1b72d56/markup.bcf", markup.as_str());
    let path = dir.path().join("dangling_link.bcf");
    write_archive(&path, &members);

    let project = read(&path, &schemas()).unwrap();
    assert_eq!(*project.markups()[1].comments()[0].viewpoint().value(), None);
}
