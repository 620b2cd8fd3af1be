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
Module with the shared fixtures of the test suite.

BCF containers are plain zips, so instead of shipping binary blobs the tests
assemble their archives on the fly from the XML strings below.
!*/

use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// This function initialises logging for a test, so skipped-file warnings are
/// visible when running with `--nocapture`. Repeated calls are harmless.
pub fn init_logs() {
    let _ = TermLogger::init(LevelFilter::Debug, Config::default(), TerminalMode::Mixed, ColorChoice::Auto);
}

pub const TOPIC_DIR_1: &str = "2e92784b-80fc-4e0e-ac02-b424dfd8e664";
pub const TOPIC_DIR_2: &str = "7d4bb687-3f86-4035-a881-6e64d1b72d56";
pub const COMMENT_GUID_1: &str = "5f8f6e50-8c2b-4a2c-9a8f-1b1b0f5a3f6a";
pub const COMMENT_GUID_2: &str = "8a91ee98-dbb7-4e11-92f9-c32bbf0a4ca5";
pub const COMMENT_GUID_3: &str = "23f7c352-29e7-4b7e-9a4c-f0a8a65b1fd3";
pub const VIEWPOINT_GUID: &str = "b496c1f0-9c31-4fab-8b56-2a9a0ad4d2c2";
pub const PROJECT_GUID: &str = "c9c2ad47-8962-45ae-a2a8-1ba9e1f0c4c8";

pub const VERSION_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Version VersionId="2.1">
  <DetailedVersion>2.1</DetailedVersion>
</Version>
"#;

pub const PROJECT_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ProjectExtension>
  <Project ProjectId="c9c2ad47-8962-45ae-a2a8-1ba9e1f0c4c8">
    <Name>Example project</Name>
  </Project>
  <ExtensionSchema>extensions.xsd</ExtensionSchema>
</ProjectExtension>
"#;

/// First topic: header, two comments (one linking the viewpoint), one viewpoint.
pub const MARKUP_XML_1: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Markup>
  <Header>
    <File IfcProject="0M6o7Znnv7hxsbWgeu7oQq" isExternal="false">
      <Filename>structure.ifc</Filename>
      <Date>2014-10-27T16:27:27+00:00</Date>
      <Reference>../structure.ifc</Reference>
    </File>
  </Header>
  <Topic Guid="2e92784b-80fc-4e0e-ac02-b424dfd8e664" TopicType="Issue" TopicStatus="Open">
    <Title>Doors are in the wrong place</Title>
    <Priority>High</Priority>
    <Index>0</Index>
    <Labels>Architecture</Labels>
    <Labels>Structural</Labels>
    <CreationDate>2014-10-16T14:35:29+00:00</CreationDate>
    <CreationAuthor>mario@example.com</CreationAuthor>
    <Description>The doors need to move half a meter east.</Description>
  </Topic>
  <Comment Guid="5f8f6e50-8c2b-4a2c-9a8f-1b1b0f5a3f6a">
    <Date>2014-10-16T14:35:29+00:00</Date>
    <Author>mario@example.com</Author>
    <Comment>The walls are too thin.</Comment>
    <Viewpoint Guid="b496c1f0-9c31-4fab-8b56-2a9a0ad4d2c2"/>
  </Comment>
  <Comment Guid="8a91ee98-dbb7-4e11-92f9-c32bbf0a4ca5">
    <Date>2014-10-17T09:12:03+00:00</Date>
    <Author>peach@example.com</Author>
    <Comment>The walls are too thick.</Comment>
  </Comment>
  <Viewpoints Guid="b496c1f0-9c31-4fab-8b56-2a9a0ad4d2c2">
    <Viewpoint>viewpoint.bcfv</Viewpoint>
    <Snapshot>snapshot.png</Snapshot>
  </Viewpoints>
</Markup>
"#;

/// Second topic: no header, no index, a single comment.
pub const MARKUP_XML_2: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Markup>
  <Topic Guid="7d4bb687-3f86-4035-a881-6e64d1b72d56" TopicStatus="Closed">
    <Title>Stairwell is missing a railing</Title>
    <CreationDate>2014-11-02T10:00:00+00:00</CreationDate>
    <CreationAuthor>luigi@example.com</CreationAuthor>
  </Topic>
  <Comment Guid="23f7c352-29e7-4b7e-9a4c-f0a8a65b1fd3">
    <Date>2014-11-02T10:05:00+00:00</Date>
    <Author>luigi@example.com</Author>
    <Comment>Confirmed on site.</Comment>
  </Comment>
</Markup>
"#;

pub const VIEWPOINT_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<VisualizationInfo Guid="b496c1f0-9c31-4fab-8b56-2a9a0ad4d2c2">
  <PerspectiveCamera>
    <CameraViewPoint>
      <X>12.5</X>
      <Y>-7.25</Y>
      <Z>2.75</Z>
    </CameraViewPoint>
    <CameraDirection>
      <X>1.0</X>
      <Y>0.0</Y>
      <Z>0.0</Z>
    </CameraDirection>
    <CameraUpVector>
      <X>0.0</X>
      <Y>0.0</Y>
      <Z>1.0</Z>
    </CameraUpVector>
    <FieldOfView>60.0</FieldOfView>
  </PerspectiveCamera>
</VisualizationInfo>
"#;

/// Not a real image, but nothing ever parses it.
pub const SNAPSHOT_PNG: &str = "png-bytes";

/// This function writes a zip container with the provided members, in order.
pub fn write_archive(path: &Path, members: &[(&str, &str)]) {
    let options = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    let mut writer = ZipWriter::new(File::create(path).unwrap());
    for (name, content) in members {
        writer.start_file(name.to_string(), options).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap();
}

/// This function returns the member list of the standard two-topic container.
pub fn sample_members() -> Vec<(&'static str, &'static str)> {
    vec![
        ("bcf.version", VERSION_XML),
        ("project.bcfp", PROJECT_XML),
        ("2e92784b-80fc-4e0e-ac02-b424dfd8e664/markup.bcf", MARKUP_XML_1),
        ("2e92784b-80fc-4e0e-ac02-b424dfd8e664/viewpoint.bcfv", VIEWPOINT_XML),
        ("2e92784b-80fc-4e0e-ac02-b424dfd8e664/snapshot.png", SNAPSHOT_PNG),
        ("7d4bb687-3f86-4035-a881-6e64d1b72d56/markup.bcf", MARKUP_XML_2),
    ]
}

/// This function writes the standard two-topic container into the provided
/// folder and returns its path.
pub fn sample_archive(dir: &Path) -> PathBuf {
    let path = dir.join("sample.bcf");
    write_archive(&path, &sample_members());
    path
}
