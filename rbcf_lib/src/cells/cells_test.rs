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
Module containing tests for the value cells, mostly around the state machine.
!*/

use super::*;

#[test]
fn test_attribute_state_machine() {
    let mut cell = Attribute::original("Open".to_owned(), String::new(), "TopicStatus");
    assert_eq!(cell.state(), CellState::Original);

    // Writing the same value back is not a modification.
    cell.set("Open".to_owned());
    assert_eq!(cell.state(), CellState::Original);
    assert!(cell.previous().is_none());

    // The first differing write flips to Modified and remembers the old text.
    cell.set("Closed".to_owned());
    assert_eq!(cell.state(), CellState::Modified);
    assert_eq!(cell.previous(), Some("Open"));

    // Later writes keep the first previous value.
    cell.set("Resolved".to_owned());
    assert_eq!(cell.state(), CellState::Modified);
    assert_eq!(cell.previous(), Some("Open"));

    cell.mark_deleted();
    assert_eq!(cell.state(), CellState::Deleted);

    cell.reset();
    assert_eq!(cell.state(), CellState::Original);
    assert!(cell.previous().is_none());
}

#[test]
fn test_added_cell_stays_added() {
    let mut cell = SimpleElement::added("a@b.c".to_owned(), String::new(), "AssignedTo");
    cell.set("x@y.z".to_owned());
    assert_eq!(cell.state(), CellState::Added);
    assert!(cell.previous().is_none());
}

#[test]
fn test_default_cells_are_omitted_unless_added() {
    let original = SimpleElement::original(String::new(), String::new(), "Priority");
    assert!(original.is_default());
    assert!(!original.is_serialized());

    let added = SimpleElement::added(String::new(), String::new(), "Priority");
    assert!(added.is_default());
    assert!(added.is_serialized());

    let valued = SimpleElement::original("High".to_owned(), String::new(), "Priority");
    assert!(!valued.is_default());
    assert!(valued.is_serialized());
}

#[test]
fn test_build_only_adds_non_default_values() {
    let empty = Attribute::build(String::new(), String::new(), "IfcProject", true);
    assert_eq!(empty.state(), CellState::Original);
    assert!(!empty.is_serialized());

    let valued = Attribute::build("abcdefghij".to_owned(), String::new(), "IfcProject", true);
    assert_eq!(valued.state(), CellState::Added);
    assert!(valued.is_serialized());
}

#[test]
fn test_list_items_have_individual_states() {
    let mut list = SimpleList::original(vec!["Architecture".to_owned(), "Structural".to_owned()], "Labels");
    list.push("Electrical".to_owned());

    assert_eq!(list.items()[0].state(), CellState::Original);
    assert_eq!(list.items()[1].state(), CellState::Original);
    assert_eq!(list.items()[2].state(), CellState::Added);
    assert_eq!(list.len(), 3);

    list.set(0, "Landscape".to_owned());
    assert_eq!(list.items()[0].state(), CellState::Modified);
    assert_eq!(list.items()[0].previous(), Some("Architecture"));

    list.mark_deleted(1);
    assert_eq!(list.len(), 2);
    assert_eq!(list.values().cloned().collect::<Vec<_>>(), vec!["Landscape".to_owned(), "Electrical".to_owned()]);

    list.reset();
    assert_eq!(list.items().len(), 2);
    assert!(list.items().iter().all(|item| item.state() == CellState::Original));
}

#[test]
fn test_cell_equality_ignores_state() {
    let a = SimpleElement::original("High".to_owned(), String::new(), "Priority");
    let b = SimpleElement::added("High".to_owned(), String::new(), "Priority");
    assert_eq!(a, b);
}

#[test]
fn test_booleans_serialise_lowercase() {
    assert_eq!(true.to_xml_text(), "true");
    assert_eq!(false.to_xml_text(), "false");
}

#[test]
fn test_datetime_keeps_raw_text() {
    let date = XmlDateTime::parse("2014-10-16T14:35:29+00:00").unwrap();
    assert_eq!(date.as_str(), "2014-10-16T14:35:29+00:00");
    assert_eq!(date.to_xml_text(), "2014-10-16T14:35:29+00:00");
}

#[test]
fn test_datetime_without_offset_is_utc() {
    let with_offset = XmlDateTime::parse("2014-10-16T14:35:29+00:00").unwrap();
    let without_offset = XmlDateTime::parse("2014-10-16T14:35:29").unwrap();
    assert_eq!(with_offset.instant(), without_offset.instant());
}

#[test]
fn test_datetime_ordering() {
    let older = XmlDateTime::parse("2014-10-16T14:35:29+00:00").unwrap();
    let newer = XmlDateTime::parse("2014-10-17T09:12:03+00:00").unwrap();
    assert!(older.instant() < newer.instant());
}

#[test]
fn test_datetime_garbage_is_rejected() {
    assert!(XmlDateTime::parse("yesterday").is_err());
    assert!(XmlDateTime::parse("2014-13-40T99:00:00Z").is_err());
}

#[test]
fn test_datetime_now_is_canonical() {
    let now = XmlDateTime::now();
    assert!(now.as_str().ends_with('Z'));
    assert!(XmlDateTime::parse(now.as_str()).is_ok());
}
