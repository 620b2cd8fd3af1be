//---------------------------------------------------------------------------//
// Copyright (c) 2017-2025 Ismael Gutiérrez González. All rights reserved.
//
// This file is part of the Rusted BCF Manager (RBCF) project,
// which can be found here: https://github.com/Frodo45127/rbcf.
//
// This file is licensed under the MIT license, which can be found here:
// https://github.com/Frodo45127/rbcf/blob/master/LICENSE.
//---------------------------------------------------------------------------//

//! This module contains all kind of errors used inside this crate.
//!
//! Not much to say appart of that, really.

use thiserror::Error;

/// Custom `Result` type, to always return our custom error.
pub type Result<T, E = RLibError> = core::result::Result<T, E>;

/// Custom error type for the lib.
#[derive(Error, Debug)]
pub enum RLibError {

    //-----------------------------------//
    // Archive errors.
    //-----------------------------------//

    #[error("The file \"{0}\" is not a readable zip container, so it cannot be opened as a BCF file.")]
    ArchiveNotAZip(String),

    #[error("The member \"{0}\" is missing from the BCF container.")]
    ArchiveMemberMissing(String),

    //-----------------------------------//
    // Format errors.
    //-----------------------------------//

    #[error("No bcf.version file found in the BCF container. This file is not optional.")]
    FormatMissingVersion,

    #[error("BCF version \"{0}\" is not supported by this lib. The only supported version is \"2.1\".")]
    FormatUnsupportedVersion(String),

    #[error("The markup.bcf file of the topic \"{0}\" failed to validate: {1}")]
    FormatInvalidMarkup(String, String),

    #[error("The required field \"{0}\" is missing from \"{1}\".")]
    FormatMissingField(String, String),

    #[error("Error trying to parse \"{0}\" as an ISO-8601 datetime.")]
    FormatInvalidDateTime(String),

    #[error("Error trying to parse \"{0}\" as an UUID.")]
    FormatInvalidUuid(String),

    #[error("Error trying to convert the following value to a bool: {0}.")]
    ParseBoolError(String),

    #[error(transparent)]
    ParseIntError(#[from] std::num::ParseIntError),

    #[error("Error while trying to read the following file/folder: {0}. \
        This means that path may not be readable (permissions? other programs locking access to it?) or may not exists at all.")]
    ReadFileFolderError(String),

    //-----------------------------------//
    // Validation errors.
    //-----------------------------------//

    #[error("The file \"{0}\" is not valid XML: {1}")]
    XmlNotParseable(String, String),

    #[error("The file \"{0}\" failed to validate against \"{1}\":\n{2}")]
    SchemaValidationError(String, String, String),

    #[error("The schema \"{0}\" could not be loaded: {1}")]
    SchemaNotLoadable(String, String),

    //-----------------------------------//
    // Writer errors.
    //-----------------------------------//

    #[error("No element matching \"{0}\" was found in \"{1}\". The file on disk has drifted from the in-memory data and will not be touched.")]
    WriterElementNotFound(String, String),

    #[error("More than one element matches \"{0}\" in \"{1}\". Refusing to mutate an ambiguous target.")]
    WriterElementAmbiguous(String, String),

    #[error("The document \"{0}\" failed to re-validate after applying \"{1}\": {2}")]
    WriterRevalidationFailed(String, String, String),

    #[error("The update for \"{0}\" cannot be applied: {1}")]
    WriterUpdateNotApplicable(String, String),

    //-----------------------------------//
    // Usage errors.
    //-----------------------------------//

    #[error("This operation requires an open project, but the project has already been closed.")]
    UsageProjectClosed,

    #[error("The object \"{0}\" is not part of the currently open project.")]
    UsageObjectNotInProject(String),

    #[error("No topic with the guid \"{0}\" exists in the currently open project.")]
    UsageTopicNotFound(String),

    //-----------------------------------//
    // Wrapped errors.
    //-----------------------------------//

    /// Represents all other cases of `std::io::Error`.
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Represents all other cases of `zip::result::ZipError`.
    #[error(transparent)]
    ZipError(#[from] zip::result::ZipError),
}
