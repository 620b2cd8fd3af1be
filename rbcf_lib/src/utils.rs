//---------------------------------------------------------------------------//
// Copyright (c) 2017-2025 Ismael Gutiérrez González. All rights reserved.
//
// This file is part of the Rusted BCF Manager (RBCF) project,
// which can be found here: https://github.com/Frodo45127/rbcf.
//
// This file is licensed under the MIT license, which can be found here:
// https://github.com/Frodo45127/rbcf/blob/master/LICENSE.
//---------------------------------------------------------------------------//

//! Module with generic functions used by the crate.
//!
//! If a function doesn't fit anywhere, it goes here.

use std::fs::read_dir;
use std::path::{Path, PathBuf};

use crate::error::{RLibError, Result};

//--------------------------------------------------------//
// Generic utils.
//--------------------------------------------------------//

/// This function parses strings to booleans, properly.
pub fn parse_str_as_bool(string: &str) -> Result<bool> {
    let str_lower_case = string.to_lowercase();
    if str_lower_case == "true" || str_lower_case == "1" {
        Ok(true)
    }
    else if str_lower_case == "false" || str_lower_case == "0" {
        Ok(false)
    }
    else {
        Err(RLibError::ParseBoolError(string.to_owned()))
    }
}

//--------------------------------------------------------//
// Path utils.
//--------------------------------------------------------//

/// This function returns all the files directly under the provided folder
/// whose name ends with the provided extension, sorted by name.
pub fn files_with_extension(current_path: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut file_list = vec![];
    for file in read_dir(current_path).map_err(|_| RLibError::ReadFileFolderError(current_path.to_string_lossy().to_string()))? {
        let file_path = file.map_err(|_| RLibError::ReadFileFolderError(current_path.to_string_lossy().to_string()))?.path();
        if file_path.is_file() && file_path.file_name().map(|name| name.to_string_lossy().ends_with(extension)).unwrap_or(false) {
            file_list.push(file_path);
        }
    }

    file_list.sort();
    Ok(file_list)
}

/// This function returns the names of all the directories directly under the provided folder, sorted by name.
pub fn dirs_in_folder(current_path: &Path) -> Result<Vec<String>> {
    let mut dir_list = vec![];
    for file in read_dir(current_path).map_err(|_| RLibError::ReadFileFolderError(current_path.to_string_lossy().to_string()))? {
        let file_path = file.map_err(|_| RLibError::ReadFileFolderError(current_path.to_string_lossy().to_string()))?.path();
        if file_path.is_dir() {
            if let Some(name) = file_path.file_name() {
                dir_list.push(name.to_string_lossy().to_string());
            }
        }
    }

    dir_list.sort();
    Ok(dir_list)
}
