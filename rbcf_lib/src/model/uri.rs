//---------------------------------------------------------------------------//
// Copyright (c) 2017-2025 Ismael Gutiérrez González. All rights reserved.
//
// This file is part of the Rusted BCF Manager (RBCF) project,
// which can be found here: https://github.com/Frodo45127/rbcf.
//
// This file is licensed under the MIT license, which can be found here:
// https://github.com/Frodo45127/rbcf/blob/master/LICENSE.
//---------------------------------------------------------------------------//

//! This module contains the Uri type used by reference-like fields of the model.
//!
//! BCF uris are opaque: they may point inside the container (viewpoint and
//! snapshot files), into the file system (ifc files) or to the web (document
//! references). We never resolve them, only carry them around.

use std::fmt;

use crate::cells::XmlValue;

//---------------------------------------------------------------------------//
//                              Enum & Structs
//---------------------------------------------------------------------------//

/// An opaque uri, as found in the XML documents.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Uri(String);

//---------------------------------------------------------------------------//
//                           Implementations
//---------------------------------------------------------------------------//

impl Uri {

    pub fn new(uri: &str) -> Self {
        Self(uri.to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl XmlValue for Uri {
    fn to_xml_text(&self) -> String {
        self.0.to_owned()
    }
}
