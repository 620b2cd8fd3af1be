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
Module containing tests for the locate algorithm and the splicing primitives.
!*/

use uuid::Uuid;

use crate::error::RLibError;
use crate::model::ElementMatcher;
use crate::schema::{SchemaSet, Xsd};
use crate::test_common::*;

use super::*;

const DOC: &str = "markup.bcf";

fn markup_xsd() -> Xsd {
    SchemaSet::bcf_2_1().unwrap().markup().clone()
}

fn markup_chain() -> Vec<ElementMatcher> {
    vec![ElementMatcher::new("Markup")]
}

fn topic_chain() -> Vec<ElementMatcher> {
    vec![ElementMatcher::new("Markup"), ElementMatcher::new("Topic").with_guid(Uuid::parse_str(TOPIC_DIR_1).unwrap())]
}

fn comment_chain(guid: &str) -> Vec<ElementMatcher> {
    vec![ElementMatcher::new("Markup"), ElementMatcher::new("Comment").with_guid(Uuid::parse_str(guid).unwrap())]
}

//---------------------------------------------------------------------------//
// Locate tests.
//---------------------------------------------------------------------------//

#[test]
fn test_find_comment_by_guid() {
    let doc = parse(MARKUP_XML_1, DOC).unwrap();
    let node = find_in_doc(&doc, &comment_chain(COMMENT_GUID_2), DOC).unwrap();
    assert_eq!(node.children().find(|child| child.tag_name().name() == "Comment").and_then(|child| child.text()), Some("The walls are too thick."));
}

#[test]
fn test_find_comment_by_text_differing_in_one_char() {
    let doc = parse(MARKUP_XML_1, DOC).unwrap();

    // "thin" vs "thick": no guid, disambiguation falls to the child text.
    let mut matcher = ElementMatcher::new("Comment");
    matcher.push_text("Comment", "The walls are too thin.".to_owned());
    let chain = vec![ElementMatcher::new("Markup"), matcher];

    let node = find_in_doc(&doc, &chain, DOC).unwrap();
    assert_eq!(node.attribute("Guid"), Some(COMMENT_GUID_1));
}

#[test]
fn test_find_label_by_text() {
    let doc = parse(MARKUP_XML_1, DOC).unwrap();

    let mut matcher = ElementMatcher::new("Labels");
    matcher.set_exact_text("Structural".to_owned());
    let mut chain = topic_chain();
    chain.push(matcher);

    let node = find_in_doc(&doc, &chain, DOC).unwrap();
    assert_eq!(node.text(), Some("Structural"));
}

#[test]
fn test_find_file_by_attributes() {
    let two_files = r#"<Markup>
  <Header>
    <File IfcProject="aaa" isExternal="false"/>
    <File IfcProject="bbb" isExternal="false"/>
  </Header>
</Markup>"#;
    let doc = parse(two_files, DOC).unwrap();

    let mut matcher = ElementMatcher::new("File");
    matcher.push_attr("IfcProject", "bbb".to_owned());
    let chain = vec![ElementMatcher::new("Markup"), ElementMatcher::new("Header"), matcher];

    let node = find_in_doc(&doc, &chain, DOC).unwrap();
    assert_eq!(node.attribute("IfcProject"), Some("bbb"));
}

#[test]
fn test_missing_element_is_not_found() {
    let doc = parse(MARKUP_XML_1, DOC).unwrap();
    let chain = comment_chain("9e9e9e9e-9e9e-9e9e-9e9e-9e9e9e9e9e9e");
    match find_in_doc(&doc, &chain, DOC) {
        Err(RLibError::WriterElementNotFound(_, _)) => {}
        other => panic!("expected WriterElementNotFound, got {other:?}"),
    }
}

#[test]
fn test_undistinguishable_candidates_are_ambiguous() {
    let doc = parse(MARKUP_XML_1, DOC).unwrap();
    let chain = vec![ElementMatcher::new("Markup"), ElementMatcher::new("Comment")];
    match find_in_doc(&doc, &chain, DOC) {
        Err(RLibError::WriterElementAmbiguous(_, _)) => {}
        other => panic!("expected WriterElementAmbiguous, got {other:?}"),
    }
}

//---------------------------------------------------------------------------//
// Splicing tests.
//---------------------------------------------------------------------------//

#[test]
fn test_modify_attribute_touches_only_the_start_tag() {
    let mut buffer = MARKUP_XML_1.to_owned();
    set_attribute(&mut buffer, &topic_chain(), "TopicStatus", Some("Closed"), DOC).unwrap();
    assert_eq!(buffer, MARKUP_XML_1.replace("TopicStatus=\"Open\"", "TopicStatus=\"Closed\""));
}

#[test]
fn test_add_attribute_lands_before_the_tag_close() {
    let mut buffer = MARKUP_XML_1.to_owned();
    set_attribute(&mut buffer, &comment_chain(COMMENT_GUID_2), "Status", Some("Unread"), DOC).unwrap();
    assert!(buffer.contains("<Comment Guid=\"8a91ee98-dbb7-4e11-92f9-c32bbf0a4ca5\" Status=\"Unread\">"));
}

#[test]
fn test_delete_attribute() {
    let mut buffer = MARKUP_XML_1.to_owned();
    set_attribute(&mut buffer, &topic_chain(), "TopicType", None, DOC).unwrap();
    assert_eq!(buffer, MARKUP_XML_1.replace(" TopicType=\"Issue\"", ""));
}

#[test]
fn test_replace_child_text() {
    let mut buffer = MARKUP_XML_1.to_owned();
    replace_child(&mut buffer, &topic_chain(), "Priority", None, "<Priority>Low</Priority>", &markup_xsd(), DOC, true).unwrap();
    assert_eq!(buffer, MARKUP_XML_1.replace("<Priority>High</Priority>", "<Priority>Low</Priority>"));
}

#[test]
fn test_replace_missing_child_degrades_to_insert_at_schema_position() {
    let mut buffer = MARKUP_XML_1.to_owned();
    replace_child(&mut buffer, &topic_chain(), "AssignedTo", None, "<AssignedTo>a@b.c</AssignedTo>", &markup_xsd(), DOC, false).unwrap();

    // AssignedTo slots in right before Description, per the schema sequence.
    assert!(buffer.contains("<AssignedTo>a@b.c</AssignedTo>\n    <Description>"));
    assert_eq!(buffer.matches("<AssignedTo>").count(), 1);
}

#[test]
fn test_replace_missing_child_errors_when_it_must_exist() {
    let mut buffer = MARKUP_XML_1.to_owned();
    let result = replace_child(&mut buffer, &topic_chain(), "AssignedTo", None, "<AssignedTo>a@b.c</AssignedTo>", &markup_xsd(), DOC, true);
    assert!(matches!(result, Err(RLibError::WriterElementNotFound(_, _))));
    assert_eq!(buffer, MARKUP_XML_1);
}

#[test]
fn test_insert_comment_goes_before_the_viewpoints() {
    let mut buffer = MARKUP_XML_1.to_owned();
    let fragment = "<Comment Guid=\"11111111-2222-3333-4444-555555555555\">\n  <Date>2015-01-01T00:00:00Z</Date>\n  <Author>toad@example.com</Author>\n  <Comment>Looks fine now.</Comment>\n</Comment>";
    insert_child(&mut buffer, &markup_chain(), "Comment", fragment, &markup_xsd(), DOC).unwrap();

    let comment_pos = buffer.find("Looks fine now.").unwrap();
    let viewpoints_pos = buffer.find("<Viewpoints").unwrap();
    let topic_end_pos = buffer.find("</Topic>").unwrap();
    assert!(comment_pos > topic_end_pos);
    assert!(comment_pos < viewpoints_pos);

    // The nested lines picked up the insertion indentation.
    assert!(buffer.contains("\n  <Comment Guid=\"11111111-2222-3333-4444-555555555555\">\n    <Date>"));
}

#[test]
fn test_insert_into_self_closing_parent() {
    let doc = "<Markup>\n  <Header/>\n</Markup>\n";
    let mut buffer = doc.to_owned();
    let chain = vec![ElementMatcher::new("Markup"), ElementMatcher::new("Header")];
    insert_child(&mut buffer, &chain, "File", "<File IfcProject=\"aaa\"/>", &markup_xsd(), DOC).unwrap();
    assert_eq!(buffer, "<Markup>\n  <Header>\n    <File IfcProject=\"aaa\"/>\n  </Header>\n</Markup>\n");
}

#[test]
fn test_insert_into_empty_parent() {
    let doc = "<Markup>\n  <Header></Header>\n</Markup>\n";
    let mut buffer = doc.to_owned();
    let chain = vec![ElementMatcher::new("Markup"), ElementMatcher::new("Header")];
    insert_child(&mut buffer, &chain, "File", "<File IfcProject=\"aaa\"/>", &markup_xsd(), DOC).unwrap();
    assert_eq!(buffer, "<Markup>\n  <Header>\n    <File IfcProject=\"aaa\"/>\n  </Header>\n</Markup>\n");
}

#[test]
fn test_delete_element_leaves_no_blank_line() {
    let mut buffer = MARKUP_XML_1.to_owned();
    delete_element(&mut buffer, &comment_chain(COMMENT_GUID_1), &markup_xsd(), DOC).unwrap();

    assert!(!buffer.contains("The walls are too thin."));
    assert!(buffer.contains("The walls are too thick."));
    assert!(!buffer.contains("\n\n"));
}

#[test]
fn test_deleting_the_last_file_clears_the_optional_header() {
    let mut buffer = MARKUP_XML_1.to_owned();
    let mut chain = vec![ElementMatcher::new("Markup"), ElementMatcher::new("Header")];
    let mut file_matcher = ElementMatcher::new("File");
    file_matcher.push_attr("IfcProject", "0M6o7Znnv7hxsbWgeu7oQq".to_owned());
    chain.push(file_matcher);

    delete_element(&mut buffer, &chain, &markup_xsd(), DOC).unwrap();
    assert!(!buffer.contains("<Header"));
    assert!(buffer.contains("<Topic"));
}

#[test]
fn test_add_then_delete_restores_the_original_bytes() {
    let mut buffer = MARKUP_XML_1.to_owned();
    let fragment = "<Comment Guid=\"11111111-2222-3333-4444-555555555555\">\n  <Date>2015-01-01T00:00:00Z</Date>\n  <Author>toad@example.com</Author>\n  <Comment>Looks fine now.</Comment>\n</Comment>";
    insert_child(&mut buffer, &markup_chain(), "Comment", fragment, &markup_xsd(), DOC).unwrap();
    delete_element(&mut buffer, &comment_chain("11111111-2222-3333-4444-555555555555"), &markup_xsd(), DOC).unwrap();
    assert_eq!(buffer, MARKUP_XML_1);
}

//---------------------------------------------------------------------------//
// Start-tag editing tests.
//---------------------------------------------------------------------------//

#[test]
fn test_edit_start_tag_replaces_only_the_value() {
    assert_eq!(edit_start_tag("<Topic Guid=\"abc\" TopicStatus=\"Open\">", "TopicStatus", Some("Closed")),
        "<Topic Guid=\"abc\" TopicStatus=\"Closed\">");
}

#[test]
fn test_edit_start_tag_appends_missing_attributes() {
    assert_eq!(edit_start_tag("<File isExternal=\"true\">", "IfcProject", Some("abc")),
        "<File isExternal=\"true\" IfcProject=\"abc\">");
    assert_eq!(edit_start_tag("<File/>", "IfcProject", Some("abc")),
        "<File IfcProject=\"abc\"/>");
}

#[test]
fn test_edit_start_tag_removes_attributes() {
    assert_eq!(edit_start_tag("<Topic Guid=\"abc\" TopicStatus=\"Open\">", "TopicStatus", None),
        "<Topic Guid=\"abc\">");
    assert_eq!(edit_start_tag("<Topic Guid=\"abc\">", "TopicType", None),
        "<Topic Guid=\"abc\">");
}

#[test]
fn test_edit_start_tag_escapes_values() {
    assert_eq!(edit_start_tag("<File/>", "Note", Some("a<b&\"c\"")),
        "<File Note=\"a&lt;b&amp;&quot;c&quot;\"/>");
}
