//! Items attached to reader states: entries, feeds and links.
use alloc::{string::String, vec::Vec};

use crate::value::{Property, StreamReferenceValue};

/// An action or function advertised by an entry.
#[cfg_attr(any(test, feature = "serde"), derive(serde::Serialize))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OperationLink {
    /// The metadata URI naming the operation.
    pub metadata: String,
    pub title: Option<String>,
    pub target: Option<String>,
}

#[cfg_attr(any(test, feature = "serde"), derive(serde::Serialize))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AssociationLink {
    pub name: String,
    pub url: String,
}

#[cfg_attr(any(test, feature = "serde"), derive(serde::Serialize))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Entry {
    pub id: Option<String>,
    pub edit_link: Option<String>,
    pub read_link: Option<String>,
    pub etag: Option<String>,
    /// The type name as declared in the payload's `__metadata`.
    pub type_name: Option<String>,
    pub media_resource: Option<StreamReferenceValue>,
    pub properties: Vec<Property>,
    pub actions: Vec<OperationLink>,
    pub functions: Vec<OperationLink>,
    pub association_links: Vec<AssociationLink>,
}

impl Entry {
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }
}

#[cfg_attr(any(test, feature = "serde"), derive(serde::Serialize))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Feed {
    pub id: Option<String>,
    pub count: Option<i64>,
    pub next_page_link: Option<String>,
}

#[cfg_attr(any(test, feature = "serde"), derive(serde::Serialize))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NavigationLink {
    pub name: String,
    /// `None` when the link is undeclared and its content does not tell.
    pub is_collection: Option<bool>,
    /// Target of a deferred link.
    pub url: Option<String>,
}

#[cfg_attr(any(test, feature = "serde"), derive(serde::Serialize))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EntityReferenceLink {
    pub url: String,
}

/// The item attached to the reader's current state.
#[cfg_attr(any(test, feature = "serde"), derive(serde::Serialize))]
#[derive(Clone, Debug, Default, PartialEq)]
pub enum ReaderItem {
    #[default]
    None,
    Feed(Feed),
    /// `None` for an expanded singleton link whose value is `null`.
    Entry(Option<Entry>),
    NavigationLink(NavigationLink),
    EntityReferenceLink(EntityReferenceLink),
}

impl ReaderItem {
    #[must_use]
    pub fn as_entry(&self) -> Option<&Entry> {
        match self {
            ReaderItem::Entry(entry) => entry.as_ref(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_feed(&self) -> Option<&Feed> {
        match self {
            ReaderItem::Feed(feed) => Some(feed),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_navigation_link(&self) -> Option<&NavigationLink> {
        match self {
            ReaderItem::NavigationLink(link) => Some(link),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_entity_reference_link(&self) -> Option<&EntityReferenceLink> {
        match self {
            ReaderItem::EntityReferenceLink(link) => Some(link),
            _ => None,
        }
    }
}
