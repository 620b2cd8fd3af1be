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
Module containing tests for the container-level I/O.
!*/

use std::fs::read;

use crate::error::RLibError;
use crate::test_common::*;

use super::*;

#[test]
fn test_extract_returns_members_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = sample_archive(dir.path());

    let (scratch, member_order) = extract(&path).unwrap();
    assert_eq!(member_order, sample_members().iter().map(|(name, _)| name.to_string()).collect::<Vec<_>>());
    assert!(scratch.path().join("bcf.version").is_file());
    assert!(scratch.path().join(TOPIC_DIR_1).join("markup.bcf").is_file());
    assert!(scratch.path().join(TOPIC_DIR_1).join("viewpoint.bcfv").is_file());
}

#[test]
fn test_extract_rejects_non_zip_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("garbage.bcf");
    std::fs::write(&path, "definitely not a zip").unwrap();

    match extract(&path) {
        Err(RLibError::ArchiveNotAZip(_)) => {}
        other => panic!("expected ArchiveNotAZip, got {other:?}"),
    }
}

#[test]
fn test_list_topic_dirs_only_returns_uuid_dirs() {
    let dir = tempfile::tempdir().unwrap();
    let mut members = sample_members();
    members.push(("not-a-topic/readme.txt", "hello"));

    let path = dir.path().join("extra.bcf");
    write_archive(&path, &members);

    let (scratch, _) = extract(&path).unwrap();
    let topic_dirs = list_topic_dirs(scratch.path()).unwrap();
    assert_eq!(topic_dirs, vec![TOPIC_DIR_1.to_owned(), TOPIC_DIR_2.to_owned()]);
}

#[test]
fn test_repack_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let path = sample_archive(dir.path());
    let (scratch, member_order) = extract(&path).unwrap();

    let out_1 = dir.path().join("out_1.bcf");
    let out_2 = dir.path().join("out_2.bcf");
    repack(scratch.path(), &out_1, &member_order).unwrap();
    repack(scratch.path(), &out_2, &member_order).unwrap();

    assert_eq!(read(&out_1).unwrap(), read(&out_2).unwrap());
}

#[test]
fn test_repack_round_trips_contents_and_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = sample_archive(dir.path());
    let (scratch, member_order) = extract(&path).unwrap();

    let out = dir.path().join("out.bcf");
    repack(scratch.path(), &out, &member_order).unwrap();

    let (_, order_after) = extract(&out).unwrap();
    assert_eq!(order_after, member_order);

    let (scratch_after, _) = extract(&out).unwrap();
    for (name, content) in sample_members() {
        let data = read(scratch_after.path().join(name)).unwrap();
        assert_eq!(data, content.as_bytes(), "member {name} changed across the round trip");
    }
}

#[test]
fn test_repack_appends_new_members_after_the_original_ones() {
    let dir = tempfile::tempdir().unwrap();
    let path = sample_archive(dir.path());
    let (scratch, member_order) = extract(&path).unwrap();

    std::fs::write(scratch.path().join(TOPIC_DIR_2).join("extra.bcfv"), VIEWPOINT_XML).unwrap();

    let out = dir.path().join("out.bcf");
    repack(scratch.path(), &out, &member_order).unwrap();

    let (_, order_after) = extract(&out).unwrap();
    assert_eq!(order_after.len(), member_order.len() + 1);
    assert_eq!(order_after[..member_order.len()], member_order[..]);
    assert_eq!(order_after[member_order.len()], format!("{TOPIC_DIR_2}/extra.bcfv"));
}
