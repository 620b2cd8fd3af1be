//---------------------------------------------------------------------------//
// Copyright (c) 2017-2025 Ismael Gutiérrez González. All rights reserved.
//
// This file is part of the Rusted BCF Manager (RBCF) project,
// which can be found here: https://github.com/Frodo45127/rbcf.
//
// This file is licensed under the MIT license, which can be found here:
// https://github.com/Frodo45127/rbcf/blob/master/LICENSE.
//---------------------------------------------------------------------------//

//! This module contains the value cells, the unit of state tracking of this lib.
//!
//! Every mutable field of every entity of the data model is wrapped in one of
//! three cell types:
//! - [`Attribute`]: a scalar serialised as an XML attribute.
//! - [`SimpleElement`]: a scalar serialised as the text of a child element.
//! - [`SimpleList`]: an ordered sequence of scalars, each serialised as one
//!   child element sharing the same name.
//!
//! Each cell records its XML name, its default value and its [`CellState`],
//! which is what allows the writer to apply attribute-level updates to the
//! container without rewriting unrelated data.

use time::OffsetDateTime;
use time::PrimitiveDateTime;
use time::format_description::well_known::Iso8601;
use uuid::Uuid;

use crate::error::{RLibError, Result};

#[cfg(test)] mod cells_test;

//---------------------------------------------------------------------------//
//                              Enum & Structs
//---------------------------------------------------------------------------//

/// This enum represents the modification state of a cell or entity.
///
/// A freshly read cell is `Original`. A cell created by the caller is `Added`.
/// Writing a different value to an `Original` cell turns it `Modified`, and an
/// explicit removal turns any cell `Deleted`. `Extra` marks content carried by
/// the model but not backed by any XML of the container (snapshot images).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum CellState {
    #[default]
    Original,
    Added,
    Modified,
    Deleted,
    Extra,
}

/// A scalar cell serialised as an XML attribute of its host element.
#[derive(Clone, Debug)]
pub struct Attribute<T: XmlValue> {
    value: T,
    default: T,
    name: &'static str,
    state: CellState,
    previous: Option<String>,
}

/// A scalar cell serialised as the text of a dedicated child element.
#[derive(Clone, Debug)]
pub struct SimpleElement<T: XmlValue> {
    value: T,
    default: T,
    name: &'static str,
    state: CellState,
    previous: Option<String>,
}

/// An ordered sequence of scalars, all serialised under the same element name.
///
/// Items carry individual states, so appending one item doesn't rewrite the
/// others in the container.
#[derive(Clone, Debug)]
pub struct SimpleList<T: XmlValue> {
    items: Vec<ListItem<T>>,
    name: &'static str,
}

/// One item of a [`SimpleList`], with its own state.
#[derive(Clone, Debug)]
pub struct ListItem<T: XmlValue> {
    value: T,
    state: CellState,
    previous: Option<String>,
}

/// Trait to implement over any scalar that can live inside a cell.
pub trait XmlValue: Clone + PartialEq + std::fmt::Debug {

    /// This method returns the value as it has to be written into the XML document.
    fn to_xml_text(&self) -> String;
}

/// An ISO-8601 datetime that remembers the exact text it was read from.
///
/// Unmodified dates must survive a round trip byte-identical, and the writer
/// must be able to match elements by their on-disk text, so we keep both the
/// parsed instant (for ordering) and the original string (for serialisation).
#[derive(Clone, Debug)]
pub struct XmlDateTime {
    instant: OffsetDateTime,
    raw: String,
}

//---------------------------------------------------------------------------//
//                           Implementations
//---------------------------------------------------------------------------//

impl CellState {
    pub fn is_original(self) -> bool { self == Self::Original }
    pub fn is_added(self) -> bool { self == Self::Added }
    pub fn is_modified(self) -> bool { self == Self::Modified }
    pub fn is_deleted(self) -> bool { self == Self::Deleted }
}

/// Shared implementation of the two scalar cell types.
macro_rules! scalar_cell_impl {
    ($name:ident) => {
        impl<T: XmlValue> $name<T> {

            /// This function builds a cell out of data read from the container.
            pub fn original(value: T, default: T, name: &'static str) -> Self {
                Self {
                    value,
                    default,
                    name,
                    state: CellState::Original,
                    previous: None,
                }
            }

            /// This function builds a cell for data created by the caller.
            pub fn added(value: T, default: T, name: &'static str) -> Self {
                Self {
                    value,
                    default,
                    name,
                    state: CellState::Added,
                    previous: None,
                }
            }

            /// This function builds a cell for a freshly constructed entity: the cell
            /// only counts as explicitly added when it carries a non-default value.
            pub fn build(value: T, default: T, name: &'static str, added: bool) -> Self {
                if added && value != default {
                    Self::added(value, default, name)
                } else {
                    Self::original(value, default, name)
                }
            }

            pub fn value(&self) -> &T {
                &self.value
            }

            pub fn default_value(&self) -> &T {
                &self.default
            }

            pub fn xml_name(&self) -> &'static str {
                self.name
            }

            pub fn state(&self) -> CellState {
                self.state
            }

            /// The serialised text the cell had before its first modification, if any.
            pub fn previous(&self) -> Option<&str> {
                self.previous.as_deref()
            }

            /// This function writes a new value into the cell, driving the state machine:
            /// an `Original` cell becomes `Modified` on the first differing write, an
            /// `Added` cell stays `Added`.
            pub fn set(&mut self, value: T) {
                if self.state.is_original() && value != self.value {
                    self.previous = Some(self.value.to_xml_text());
                    self.state = CellState::Modified;
                }
                self.value = value;
            }

            /// This function marks the cell for removal from the container.
            pub fn mark_deleted(&mut self) {
                self.state = CellState::Deleted;
            }

            /// A cell holding its default value is omitted on write unless it was
            /// explicitly added.
            pub fn is_default(&self) -> bool {
                self.value == self.default
            }

            /// Whether the cell has to appear in a fresh serialisation of its entity.
            pub fn is_serialized(&self) -> bool {
                !self.state.is_deleted() && (!self.is_default() || self.state.is_added())
            }

            pub fn xml_text(&self) -> String {
                self.value.to_xml_text()
            }

            /// This function resets the cell to `Original`, once its current value has
            /// been committed to the container.
            pub(crate) fn reset(&mut self) {
                self.state = CellState::Original;
                self.previous = None;
            }
        }

        /// Equality of cells is structural over the value: states and defaults are bookkeeping.
        impl<T: XmlValue> PartialEq for $name<T> {
            fn eq(&self, other: &Self) -> bool {
                self.value == other.value && self.name == other.name
            }
        }
    };
}

scalar_cell_impl!(Attribute);
scalar_cell_impl!(SimpleElement);

impl<T: XmlValue> SimpleList<T> {

    /// This function builds a list cell out of data read from the container.
    pub fn original(values: Vec<T>, name: &'static str) -> Self {
        Self {
            items: values.into_iter().map(|value| ListItem {
                value,
                state: CellState::Original,
                previous: None,
            }).collect(),
            name,
        }
    }

    /// This function builds an empty list cell.
    pub fn empty(name: &'static str) -> Self {
        Self {
            items: vec![],
            name,
        }
    }

    pub fn xml_name(&self) -> &'static str {
        self.name
    }

    pub fn items(&self) -> &[ListItem<T>] {
        &self.items
    }

    /// This function returns the values of the list that are not marked for deletion.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.items.iter().filter(|item| !item.state.is_deleted()).map(|item| &item.value)
    }

    /// Amount of items not marked for deletion.
    pub fn len(&self) -> usize {
        self.items.iter().filter(|item| !item.state.is_deleted()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<&ListItem<T>> {
        self.items.get(index)
    }

    /// This function appends a new item to the list, in `Added` state.
    pub fn push(&mut self, value: T) {
        self.items.push(ListItem {
            value,
            state: CellState::Added,
            previous: None,
        });
    }

    /// This function replaces the value of an item, driving the same state machine
    /// as the scalar cells.
    pub fn set(&mut self, index: usize, value: T) -> bool {
        match self.items.get_mut(index) {
            Some(item) => {
                if item.state.is_original() && value != item.value {
                    item.previous = Some(item.value.to_xml_text());
                    item.state = CellState::Modified;
                }
                item.value = value;
                true
            }
            None => false,
        }
    }

    /// This function marks an item for removal from the container.
    pub fn mark_deleted(&mut self, index: usize) -> bool {
        match self.items.get_mut(index) {
            Some(item) => {
                item.state = CellState::Deleted;
                true
            }
            None => false,
        }
    }

    /// This function marks the whole list for removal from the container.
    pub fn mark_all_deleted(&mut self) {
        for item in &mut self.items {
            item.state = CellState::Deleted;
        }
    }

    /// This function drops deleted items and resets the rest to `Original`.
    pub(crate) fn reset(&mut self) {
        self.items.retain(|item| !item.state.is_deleted());
        for item in &mut self.items {
            item.state = CellState::Original;
            item.previous = None;
        }
    }
}

/// Equality of lists is structural over the live values.
impl<T: XmlValue> PartialEq for SimpleList<T> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.values().eq(other.values())
    }
}

/// Equality of items is structural over the value: the state is bookkeeping.
impl<T: XmlValue> PartialEq for ListItem<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T: XmlValue> ListItem<T> {

    /// This function builds a standalone `Extra` item: content the model
    /// carries around but no XML document of the container backs, like the
    /// snapshot images of a topic directory.
    pub fn extra(value: T) -> Self {
        Self {
            value,
            state: CellState::Extra,
            previous: None,
        }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn state(&self) -> CellState {
        self.state
    }

    pub fn previous(&self) -> Option<&str> {
        self.previous.as_deref()
    }

    pub fn xml_text(&self) -> String {
        self.value.to_xml_text()
    }
}

//---------------------------------------------------------------------------//
//                        XmlValue implementations
//---------------------------------------------------------------------------//

impl XmlValue for String {
    fn to_xml_text(&self) -> String {
        self.to_owned()
    }
}

/// Booleans are always written lowercase, as the schemas demand.
impl XmlValue for bool {
    fn to_xml_text(&self) -> String {
        if *self { "true".to_owned() } else { "false".to_owned() }
    }
}

impl XmlValue for i32 {
    fn to_xml_text(&self) -> String {
        self.to_string()
    }
}

impl XmlValue for u32 {
    fn to_xml_text(&self) -> String {
        self.to_string()
    }
}

impl XmlValue for Uuid {
    fn to_xml_text(&self) -> String {
        self.to_string()
    }
}

impl<T: XmlValue> XmlValue for Option<T> {
    fn to_xml_text(&self) -> String {
        match self {
            Some(value) => value.to_xml_text(),
            None => String::new(),
        }
    }
}

//---------------------------------------------------------------------------//
//                     Implementation of XmlDateTime
//---------------------------------------------------------------------------//

impl XmlDateTime {

    /// This function parses an `xs:dateTime` string, strictly.
    ///
    /// Values without an UTC offset (legal per the schema) are assumed UTC.
    pub fn parse(text: &str) -> Result<Self> {
        let instant = match OffsetDateTime::parse(text, &Iso8601::DEFAULT) {
            Ok(instant) => instant,
            Err(_) => PrimitiveDateTime::parse(text, &Iso8601::DEFAULT)
                .map(PrimitiveDateTime::assume_utc)
                .map_err(|_| RLibError::FormatInvalidDateTime(text.to_owned()))?,
        };

        Ok(Self {
            instant,
            raw: text.to_owned(),
        })
    }

    /// This function returns the placeholder used as default value of required
    /// datetime cells. Its raw text is empty, so it never matches real content.
    pub fn unset() -> Self {
        Self {
            instant: OffsetDateTime::UNIX_EPOCH,
            raw: String::new(),
        }
    }

    /// This function returns the current instant, in UTC, with second precision.
    pub fn now() -> Self {
        Self::from_datetime(OffsetDateTime::now_utc())
    }

    /// This function builds a datetime from an instant, with canonical serialisation.
    pub fn from_datetime(instant: OffsetDateTime) -> Self {
        let instant = instant.replace_nanosecond(0).unwrap_or(instant);
        let utc = instant.to_offset(time::UtcOffset::UTC);
        let raw = format!("{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
            utc.year(), utc.month() as u8, utc.day(),
            utc.hour(), utc.minute(), utc.second());

        Self {
            instant: utc,
            raw,
        }
    }

    pub fn instant(&self) -> OffsetDateTime {
        self.instant
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// Structural equality compares the serialised text, so a round trip is exact.
impl PartialEq for XmlDateTime {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl XmlValue for XmlDateTime {
    fn to_xml_text(&self) -> String {
        self.raw.to_owned()
    }
}
