//---------------------------------------------------------------------------//
// Copyright (c) 2017-2025 Ismael Gutiérrez González. All rights reserved.
//
// This file is part of the Rusted BCF Manager (RBCF) project,
// which can be found here: https://github.com/Frodo45127/rbcf.
//
// This file is licensed under the MIT license, which can be found here:
// https://github.com/Frodo45127/rbcf/blob/master/LICENSE.
//---------------------------------------------------------------------------//

//! This module contains the Viewpoint, a loaded `.bcfv` visualization document.
//!
//! Viewpoints are leaf entities: the camera, clipping planes and component
//! visibility inside them carry no semantics for this lib. We validate the
//! document, lift its root guid for cross-linking, and keep the text verbatim
//! so a round trip is byte-identical.

use getset::*;
use uuid::Uuid;

use crate::cells::CellState;
use crate::model::{ElementMatcher, NodeId, NodeIdGen, XmlEntity};
use crate::xml::XmlTree;

//---------------------------------------------------------------------------//
//                              Enum & Structs
//---------------------------------------------------------------------------//

/// One visualization document of a topic, kept verbatim.
#[derive(Clone, Debug, Getters)]
pub struct Viewpoint {

    /// Guid of the root `VisualizationInfo` element, if present.
    #[getset(get = "pub")]
    vp_guid: Option<Uuid>,

    /// Name of the `.bcfv` file inside the topic directory.
    #[getset(get = "pub")]
    file_name: String,

    /// The whole document, as read from (or to be written to) the container.
    #[getset(get = "pub")]
    raw: String,

    state: CellState,
    node: NodeId,
    parent: NodeId,
}

//---------------------------------------------------------------------------//
//                           Implementations
//---------------------------------------------------------------------------//

impl Viewpoint {

    pub fn new(file_name: &str, raw: &str, vp_guid: Option<Uuid>, state: CellState) -> Self {
        Self {
            vp_guid,
            file_name: file_name.to_owned(),
            raw: raw.to_owned(),
            state,
            node: NodeId::UNSET,
            parent: NodeId::UNSET,
        }
    }

    /// This function replaces the document text, driving the same state machine
    /// as the value cells.
    pub fn set_raw(&mut self, raw: &str) {
        if self.state.is_original() && raw != self.raw.as_str() {
            self.state = CellState::Modified;
        }
        self.raw = raw.to_owned();
    }

    pub(crate) fn attach(&mut self, parent: NodeId, ids: &mut NodeIdGen) {
        if self.node.is_unset() {
            self.node = ids.next();
        }
        self.parent = parent;
    }

    pub(crate) fn mark_all_deleted(&mut self) {
        self.state = CellState::Deleted;
    }

    pub(crate) fn reset(&mut self) {
        self.state = CellState::Original;
    }
}

impl XmlEntity for Viewpoint {

    fn xml_name(&self) -> &'static str {
        "VisualizationInfo"
    }

    fn node_id(&self) -> NodeId {
        self.node
    }

    fn parent_id(&self) -> NodeId {
        self.parent
    }

    fn state(&self) -> CellState {
        self.state
    }

    fn guid(&self) -> Option<Uuid> {
        self.vp_guid
    }

    fn matcher(&self) -> ElementMatcher {
        match self.vp_guid {
            Some(guid) => ElementMatcher::new(self.xml_name()).with_guid(guid),
            None => ElementMatcher::new(self.xml_name()),
        }
    }

    fn to_tree(&self) -> XmlTree {
        XmlTree::from_str(&self.raw, &self.file_name).unwrap_or_else(|_| XmlTree::new(self.xml_name()))
    }
}

/// Equality is structural over the document text.
impl PartialEq for Viewpoint {
    fn eq(&self, other: &Self) -> bool {
        self.file_name == other.file_name && self.raw == other.raw
    }
}
