//---------------------------------------------------------------------------//
// Copyright (c) 2017-2025 Ismael Gutiérrez González. All rights reserved.
//
// This file is part of the Rusted BCF Manager (RBCF) project,
// which can be found here: https://github.com/Frodo45127/rbcf.
//
// This file is licensed under the MIT license, which can be found here:
// https://github.com/Frodo45127/rbcf/blob/master/LICENSE.
//---------------------------------------------------------------------------//

//! This module contains the author/date pairs attached to topics and comments.
//!
//! A Modification is not an XML element of its own: its two cells serialise as
//! sibling children of the host element, and their names depend on what the
//! pair records. A comment's creation uses `Date`/`Author`, a topic's creation
//! uses `CreationDate`/`CreationAuthor`, and the last modification of either
//! uses `ModifiedDate`/`ModifiedAuthor`.

use getset::*;

use crate::cells::{CellState, SimpleElement, XmlDateTime, XmlValue};
use crate::model::{CellRef, CellSnapshot, ElementMatcher};
use crate::xml::XmlTree;

//---------------------------------------------------------------------------//
//                              Enum & Structs
//---------------------------------------------------------------------------//

/// What an author/date pair records, which decides its XML names.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ModificationKind {
    TopicCreation,
    CommentCreation,
    Modification,
}

/// An author plus the date they acted, as found on topics and comments.
#[derive(Clone, Debug, Getters, MutGetters)]
#[getset(get = "pub", get_mut = "pub")]
pub struct Modification {
    date: SimpleElement<XmlDateTime>,
    author: SimpleElement<String>,
    kind: ModificationKind,
}

//---------------------------------------------------------------------------//
//                           Implementations
//---------------------------------------------------------------------------//

impl ModificationKind {

    pub fn date_name(self) -> &'static str {
        match self {
            Self::TopicCreation => "CreationDate",
            Self::CommentCreation => "Date",
            Self::Modification => "ModifiedDate",
        }
    }

    pub fn author_name(self) -> &'static str {
        match self {
            Self::TopicCreation => "CreationAuthor",
            Self::CommentCreation => "Author",
            Self::Modification => "ModifiedAuthor",
        }
    }
}

impl Modification {

    /// This function builds a pair out of data read from the container.
    pub fn original(author: &str, date: XmlDateTime, kind: ModificationKind) -> Self {
        Self {
            date: SimpleElement::original(date, XmlDateTime::unset(), kind.date_name()),
            author: SimpleElement::original(author.to_owned(), String::new(), kind.author_name()),
            kind,
        }
    }

    /// This function builds a pair for data created by the caller.
    pub fn added(author: &str, date: XmlDateTime, kind: ModificationKind) -> Self {
        Self {
            date: SimpleElement::added(date, XmlDateTime::unset(), kind.date_name()),
            author: SimpleElement::added(author.to_owned(), String::new(), kind.author_name()),
            kind,
        }
    }

    /// This function contributes both cells to the matcher of the host element.
    pub(crate) fn contribute_to_matcher(&self, matcher: &mut ElementMatcher) {
        crate::model::match_element(&self.date, matcher);
        crate::model::match_element(&self.author, matcher);
    }

    /// This function contributes both cells, in schema order, to a fresh
    /// serialisation of the host element.
    pub(crate) fn contribute_to_tree(&self, tree: &mut XmlTree) {
        if !self.date.state().is_deleted() {
            let mut date = XmlTree::new(self.date.xml_name());
            date.set_text(&self.date.xml_text());
            tree.push_child(date);
        }
        if !self.author.state().is_deleted() {
            let mut author = XmlTree::new(self.author.xml_name());
            author.set_text(&self.author.xml_text());
            tree.push_child(author);
        }
    }

    pub(crate) fn dirty_cells(&self) -> Vec<CellRef> {
        let mut cells = vec![];
        if !self.date.state().is_original() {
            cells.push(CellRef::Element(self.kind.date_name()));
        }
        if !self.author.state().is_original() {
            cells.push(CellRef::Element(self.kind.author_name()));
        }
        cells
    }

    pub(crate) fn cell_snapshot(&self, cell: &CellRef) -> Option<CellSnapshot> {
        let name = cell.xml_name();
        if name == self.kind.date_name() {
            Some(CellSnapshot::new(
                cell.clone(),
                self.date.state(),
                self.date.xml_text(),
                self.date.previous().map(str::to_owned),
                self.date.default_value().to_xml_text(),
            ))
        } else if name == self.kind.author_name() {
            Some(CellSnapshot::new(
                cell.clone(),
                self.author.state(),
                self.author.xml_text(),
                self.author.previous().map(str::to_owned),
                String::new(),
            ))
        } else {
            None
        }
    }

    pub(crate) fn mark_all_deleted(&mut self) {
        self.date.mark_deleted();
        self.author.mark_deleted();
    }

    pub(crate) fn reset(&mut self) {
        self.date.reset();
        self.author.reset();
    }

    pub(crate) fn state(&self) -> CellState {
        if self.date.state().is_original() && self.author.state().is_original() {
            CellState::Original
        } else if self.date.state().is_deleted() && self.author.state().is_deleted() {
            CellState::Deleted
        } else if self.date.state().is_added() && self.author.state().is_added() {
            CellState::Added
        } else {
            CellState::Modified
        }
    }
}

/// Equality is structural over the two cell values.
impl PartialEq for Modification {
    fn eq(&self, other: &Self) -> bool {
        self.date == other.date && self.author == other.author && self.kind == other.kind
    }
}
