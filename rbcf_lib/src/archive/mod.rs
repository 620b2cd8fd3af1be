//---------------------------------------------------------------------------//
// Copyright (c) 2017-2025 Ismael Gutiérrez González. All rights reserved.
//
// This file is part of the Rusted BCF Manager (RBCF) project,
// which can be found here: https://github.com/Frodo45127/rbcf.
//
// This file is licensed under the MIT license, which can be found here:
// https://github.com/Frodo45127/rbcf/blob/master/LICENSE.
//---------------------------------------------------------------------------//

//! This module contains the zip-level I/O of the BCF containers.
//!
//! A container is extracted whole into a scratch directory under the system
//! temp root; every read and edit happens on the extracted tree, and saving
//! repacks the tree into a new archive. Repacking preserves the member order
//! of the original archive for members that survive, appends new members in
//! path order, and publishes atomically (write a sibling, fsync, rename), so
//! a failed save never corrupts the archive on disk.

use tempfile::TempDir;
use uuid::Uuid;
use zip::{ZipArchive, ZipWriter};
use zip::write::SimpleFileOptions;

use std::fs::{File, create_dir_all, read_dir, rename};
use std::io::{BufReader, BufWriter, Write, copy};
use std::path::{Path, PathBuf};

use crate::error::{RLibError, Result};

#[cfg(test)] mod archive_test;

/// Extension used by BCF containers.
pub const EXTENSION: &str = ".bcf";

//---------------------------------------------------------------------------//
//                         Extraction functions
//---------------------------------------------------------------------------//

/// This function unpacks a container into a fresh scratch directory under the
/// system temp root, named after the archive.
///
/// It returns the scratch directory and the member paths of the archive, in
/// their original order.
pub fn extract(archive_path: &Path) -> Result<(TempDir, Vec<String>)> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(BufReader::new(file))
        .map_err(|_| RLibError::ArchiveNotAZip(archive_path.to_string_lossy().to_string()))?;

    let basename = archive_path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "bcf".to_owned());

    let scratch = tempfile::Builder::new()
        .prefix(&basename)
        .tempdir()?;

    let mut member_order = vec![];
    for index in 0..archive.len() {
        let mut member = archive.by_index(index)
            .map_err(|_| RLibError::ArchiveNotAZip(archive_path.to_string_lossy().to_string()))?;

        // Members with paths escaping the scratch directory are hostile. Skip them.
        let Some(relative_path) = member.enclosed_name() else {
            continue;
        };

        if member.is_dir() {
            create_dir_all(scratch.path().join(&relative_path))?;
            continue;
        }

        if let Some(parent) = relative_path.parent() {
            create_dir_all(scratch.path().join(parent))?;
        }

        let mut out = BufWriter::new(File::create(scratch.path().join(&relative_path))?);
        copy(&mut member, &mut out)?;
        out.flush()?;

        member_order.push(relative_path.to_string_lossy().replace('\\', "/"));
    }

    Ok((scratch, member_order))
}

/// This function returns the topic directories of an extracted container: the
/// immediate subdirectories whose names parse as UUIDs, sorted by name.
pub fn list_topic_dirs(scratch: &Path) -> Result<Vec<String>> {
    let dirs = crate::utils::dirs_in_folder(scratch)?;
    Ok(dirs.into_iter().filter(|dir| Uuid::parse_str(dir).is_ok()).collect())
}

//---------------------------------------------------------------------------//
//                          Repacking functions
//---------------------------------------------------------------------------//

/// This function repacks an extracted tree into a container at the provided path.
///
/// Surviving members are written in their original order, new members in path
/// order after them. The archive is built on a sibling path, synced, and only
/// then renamed over the destination.
pub fn repack(scratch: &Path, out_path: &Path, member_order: &[String]) -> Result<()> {
    let mut current_files = vec![];
    collect_files(scratch, scratch, &mut current_files)?;
    current_files.sort();

    let mut ordered = member_order.iter()
        .filter(|member| current_files.iter().any(|file| file == *member))
        .cloned()
        .collect::<Vec<_>>();

    for file in &current_files {
        if !ordered.iter().any(|member| member == file) {
            ordered.push(file.to_owned());
        }
    }

    let tmp_path = sibling_tmp_path(out_path);
    let options = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    let mut writer = ZipWriter::new(File::create(&tmp_path)?);
    for member in &ordered {
        writer.start_file(member.to_owned(), options)?;
        let mut source = BufReader::new(File::open(scratch.join(member))?);
        copy(&mut source, &mut writer)?;
    }

    let file = writer.finish()?;
    file.sync_all()?;
    drop(file);

    rename(&tmp_path, out_path)?;
    Ok(())
}

/// This function builds the temporal sibling path used for atomic publishes.
fn sibling_tmp_path(out_path: &Path) -> PathBuf {
    let mut name = out_path.file_name().map(|name| name.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    out_path.with_file_name(name)
}

/// This function collects every file under the provided root, as forward-slash
/// paths relative to it.
fn collect_files(root: &Path, current: &Path, out: &mut Vec<String>) -> Result<()> {
    for entry in read_dir(current).map_err(|_| RLibError::ReadFileFolderError(current.to_string_lossy().to_string()))? {
        let path = entry.map_err(|_| RLibError::ReadFileFolderError(current.to_string_lossy().to_string()))?.path();
        if path.is_dir() {
            collect_files(root, &path, out)?;
        } else if let Ok(relative) = path.strip_prefix(root) {
            out.push(relative.to_string_lossy().replace('\\', "/"));
        }
    }
    Ok(())
}
