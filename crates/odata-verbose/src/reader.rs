//! The pull reader: a state machine over an explicit scope stack.
//!
//! Each call to [`VerboseJsonReader::read`] performs exactly one transition
//! and leaves the reader in the new state, with the item for that state
//! available through [`VerboseJsonReader::item`].
//!
//! ```rust
//! use odata_verbose::{ReaderSettings, ReaderState, VerboseJsonReader};
//!
//! let payload = br#"{"d": {"results": [{"Name": "Ann"}], "__count": "1"}}"#;
//! let mut reader = VerboseJsonReader::for_feed(payload, None, None, ReaderSettings::default()).unwrap();
//! let mut states = Vec::new();
//! while reader.read().unwrap() {
//!     states.push(reader.state());
//! }
//! assert_eq!(
//!     states,
//!     [
//!         ReaderState::FeedStart,
//!         ReaderState::EntryStart,
//!         ReaderState::EntryEnd,
//!         ReaderState::FeedEnd,
//!     ]
//! );
//! assert_eq!(reader.state(), ReaderState::Completed);
//! ```
use alloc::{boxed::Box, string::ToString};
use core::fmt;

use tracing::{debug, trace};

use crate::{
    deserializer::VerboseJsonDeserializer,
    duplicate_names::DuplicatePropertyNamesChecker,
    entry_and_feed::{FeedWrapper, PendingLink},
    error::{ErrorKind, ReaderError},
    item::{Feed, ReaderItem},
    json_value::JsonNodeType,
    model::{EdmModel, EntityType},
    options::ReaderSettings,
    scope::{EntryScope, FeedScope, LinkScope, ReaderState, Scope, ScopeData, ScopeStack},
};

/// Observer of reader transitions.
///
/// Every method has an empty default, so implementors pick what they need.
pub trait ReaderListener {
    /// Called after every successful transition except the one to
    /// [`ReaderState::Completed`].
    fn on_state_changed(&mut self, state: ReaderState, item: &ReaderItem) {
        let _ = (state, item);
    }

    /// Called once, when a read fails.
    fn on_exception(&mut self, error: &ReaderError) {
        let _ = error;
    }

    /// Called once, when the reader reaches [`ReaderState::Completed`].
    fn on_completed(&mut self) {}
}

/// A state together with its item, as yielded by the reader's iterator.
#[cfg_attr(any(test, feature = "serde"), derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct ReaderEvent {
    pub state: ReaderState,
    pub item: ReaderItem,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ParentKind {
    TopLevel,
    Feed,
    Link,
}

/// Reads a verbose JSON feed or entry payload.
pub struct VerboseJsonReader<'src, 'm> {
    deserializer: VerboseJsonDeserializer<'src, 'm>,
    scopes: ScopeStack<'m>,
    reading_feed: bool,
    expected_type: Option<&'m EntityType>,
    listener: Option<Box<dyn ReaderListener + 'm>>,
}

impl fmt::Debug for VerboseJsonReader<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerboseJsonReader")
            .field("state", &self.state())
            .field("depth", &self.scopes.len())
            .field("reading_feed", &self.reading_feed)
            .finish_non_exhaustive()
    }
}

impl<'src, 'm> VerboseJsonReader<'src, 'm> {
    /// Creates a reader for a top-level feed.
    ///
    /// `expected_type` names the entity type every entry must derive from;
    /// it is only meaningful together with a `model`.
    ///
    /// # Errors
    ///
    /// Fails when `expected_type` is not an entity type of `model`.
    pub fn for_feed(
        input: &'src [u8],
        model: Option<&'m EdmModel>,
        expected_type: Option<&str>,
        settings: ReaderSettings,
    ) -> Result<Self, ReaderError> {
        Self::new(input, model, expected_type, settings, true)
    }

    /// Creates a reader for a top-level entry.
    ///
    /// # Errors
    ///
    /// Fails when `expected_type` is not an entity type of `model`.
    pub fn for_entry(
        input: &'src [u8],
        model: Option<&'m EdmModel>,
        expected_type: Option<&str>,
        settings: ReaderSettings,
    ) -> Result<Self, ReaderError> {
        Self::new(input, model, expected_type, settings, false)
    }

    fn new(
        input: &'src [u8],
        model: Option<&'m EdmModel>,
        expected_type: Option<&str>,
        settings: ReaderSettings,
        reading_feed: bool,
    ) -> Result<Self, ReaderError> {
        let expected_type = match (model, expected_type) {
            (Some(model), Some(name)) => Some(
                model
                    .entity_type(name)
                    .ok_or_else(|| ReaderError::new(ErrorKind::UnknownTypeName(name.to_string()), 1, 1))?,
            ),
            _ => None,
        };
        Ok(Self {
            deserializer: VerboseJsonDeserializer::new(input, model, settings),
            scopes: ScopeStack::new(),
            reading_feed,
            expected_type,
            listener: None,
        })
    }

    /// Installs a listener that observes every transition.
    #[must_use]
    pub fn with_listener(mut self, listener: impl ReaderListener + 'm) -> Self {
        self.listener = Some(Box::new(listener));
        self
    }

    #[must_use]
    pub fn state(&self) -> ReaderState {
        self.scopes.current().state
    }

    /// The item of the current state: the feed for feed states, the entry
    /// for entry states and so on. [`ReaderItem::None`] for `Start`,
    /// `Exception` and `Completed`.
    #[must_use]
    pub fn item(&self) -> &ReaderItem {
        &self.scopes.current().item
    }

    /// Advances to the next state.
    ///
    /// Returns `Ok(false)` once the reader has reached
    /// [`ReaderState::Completed`], and on every call after that.
    ///
    /// # Errors
    ///
    /// Any error leaves the reader in [`ReaderState::Exception`]; all later
    /// calls fail with [`ErrorKind::ReaderFailed`].
    pub fn read(&mut self) -> Result<bool, ReaderError> {
        let result = match self.state() {
            ReaderState::Exception => return Err(self.deserializer.error(ErrorKind::ReaderFailed)),
            ReaderState::Completed => return Ok(false),
            ReaderState::Start => self.read_at_start(),
            ReaderState::FeedStart => self.read_feed_content(),
            ReaderState::FeedEnd => self.read_at_feed_end(),
            ReaderState::EntryStart => self.read_at_entry_start(),
            ReaderState::EntryEnd => self.read_at_entry_end(),
            ReaderState::NavigationLinkStart => self.read_at_navigation_link_start(),
            ReaderState::NavigationLinkEnd => self.read_at_navigation_link_end(),
            ReaderState::EntityReferenceLink => self.read_at_entity_reference_link(),
        };

        match result {
            Ok(()) => {
                #[cfg(any(test, feature = "fuzzing"))]
                assert!(
                    !self.deserializer.json.is_buffering(),
                    "Internal error: look-ahead window left open after a transition"
                );
                let state = self.state();
                trace!(?state, depth = self.scopes.len(), "transition");
                if let Some(listener) = self.listener.as_mut() {
                    if state == ReaderState::Completed {
                        listener.on_completed();
                    } else {
                        listener.on_state_changed(state, &self.scopes.current().item);
                    }
                }
                Ok(state != ReaderState::Completed)
            }
            Err(error) => {
                debug!(%error, "read failed");
                self.scopes.push(Scope::marker(ReaderState::Exception));
                if let Some(listener) = self.listener.as_mut() {
                    listener.on_exception(&error);
                }
                Err(error)
            }
        }
    }

    fn settings(&self) -> ReaderSettings {
        self.deserializer.settings
    }

    fn push(&mut self, scope: Scope<'m>) -> Result<(), ReaderError> {
        let limit = self.settings().max_nesting_depth;
        if self.scopes.len() > limit {
            return Err(self.deserializer.error(ErrorKind::NestingTooDeep(limit)));
        }
        self.scopes.push(scope);
        Ok(())
    }

    fn parent_kind(&self) -> ParentKind {
        match self.scopes.parent().map(|parent| &parent.data) {
            Some(ScopeData::Feed(_)) => ParentKind::Feed,
            Some(ScopeData::Link(_)) => ParentKind::Link,
            _ => ParentKind::TopLevel,
        }
    }

    fn read_at_start(&mut self) -> Result<(), ReaderError> {
        self.deserializer.read_payload_start()?;
        if self.reading_feed {
            let mut feed = Feed::default();
            let wrapper = self.deserializer.read_feed_start(&mut feed)?;
            self.push_feed(feed, wrapper, false, self.expected_type)
        } else {
            self.start_entry(self.expected_type, false)
        }
    }

    /// Finishes the top-level item and the payload.
    fn complete(&mut self) -> Result<(), ReaderError> {
        self.deserializer.read_payload_end()?;
        self.scopes.pop();
        self.scopes.replace_state(ReaderState::Completed);
        Ok(())
    }

    fn push_feed(
        &mut self,
        feed: Feed,
        wrapper: Option<FeedWrapper>,
        in_request_collection: bool,
        expected_type: Option<&'m EntityType>,
    ) -> Result<(), ReaderError> {
        self.push(Scope::new(
            ReaderState::FeedStart,
            ReaderItem::Feed(feed),
            expected_type,
            ScopeData::Feed(FeedScope {
                wrapper,
                in_request_collection,
                ..FeedScope::default()
            }),
        ))
    }

    /// Starts the entry at the current node: reads its metadata and its
    /// properties up to the first navigation link. `null` is an entry only
    /// as the value of a singleton navigation link.
    fn start_entry(&mut self, expected_type: Option<&'m EntityType>, allow_null: bool) -> Result<(), ReaderError> {
        if allow_null && self.deserializer.is_null() {
            self.deserializer.json.read()?;
            return self.push(Scope::new(
                ReaderState::EntryStart,
                ReaderItem::Entry(None),
                expected_type,
                ScopeData::None,
            ));
        }

        let mut entry = self.deserializer.read_entry_start()?;
        let mut checker = DuplicatePropertyNamesChecker::new(self.settings().allow_duplicate_property_names);
        let item_types = match self.scopes.current_mut() {
            Scope {
                data: ScopeData::Feed(feed),
                expected_type: None,
                ..
            } => Some(&mut feed.item_types),
            _ => None,
        };
        let entity_type = self
            .deserializer
            .read_entry_metadata(&mut entry, expected_type, item_types, &mut checker)?;
        let pending_link = self
            .deserializer
            .read_entry_content(&mut entry, entity_type, &mut checker)?;

        self.push(Scope::new(
            ReaderState::EntryStart,
            ReaderItem::Entry(Some(entry)),
            expected_type,
            ScopeData::Entry(EntryScope {
                entity_type,
                pending_link,
                checker,
            }),
        ))
    }

    /// Decides what follows inside a feed's array: another entry or the end
    /// of the feed.
    fn read_feed_content(&mut self) -> Result<(), ReaderError> {
        let scope = self.scopes.current();
        let expected_type = scope.expected_type;
        let in_request_collection = matches!(
            &scope.data,
            ScopeData::Feed(FeedScope {
                in_request_collection: true,
                ..
            })
        );
        match self.deserializer.node_type() {
            JsonNodeType::StartObject => {
                if in_request_collection && self.deserializer.is_entity_reference_link()? {
                    self.scopes.replace_state(ReaderState::FeedEnd);
                    return Ok(());
                }
                self.start_entry(expected_type, false)
            }
            JsonNodeType::EndArray => self.end_feed(),
            found => Err(self.deserializer.error(ErrorKind::CannotReadFeedContent(found))),
        }
    }

    fn end_feed(&mut self) -> Result<(), ReaderError> {
        let scope = self.scopes.current_mut();
        if let (ReaderItem::Feed(feed), ScopeData::Feed(data)) = (&mut scope.item, &scope.data) {
            // The array of a request collection feed belongs to its link.
            if !data.in_request_collection {
                self.deserializer.read_feed_end(feed, data.wrapper)?;
            }
        }
        self.scopes.replace_state(ReaderState::FeedEnd);
        Ok(())
    }

    fn read_at_feed_end(&mut self) -> Result<(), ReaderError> {
        match self.parent_kind() {
            ParentKind::TopLevel => self.complete(),
            ParentKind::Link => {
                self.scopes.pop();
                if self.settings().reading_response {
                    self.scopes.replace_state(ReaderState::NavigationLinkEnd);
                    Ok(())
                } else {
                    self.read_request_collection_content()
                }
            }
            ParentKind::Feed => Err(self.deserializer.error(ErrorKind::ReaderFailed)),
        }
    }

    fn read_at_entry_start(&mut self) -> Result<(), ReaderError> {
        let pending = match &mut self.scopes.current_mut().data {
            ScopeData::Entry(entry) => entry.pending_link.take(),
            _ => None,
        };
        match pending {
            Some(link) => self.start_navigation_link(link),
            None => {
                self.scopes.replace_state(ReaderState::EntryEnd);
                Ok(())
            }
        }
    }

    fn read_at_entry_end(&mut self) -> Result<(), ReaderError> {
        if !self.scopes.current().is_null_entry() {
            self.deserializer.json.read_end_object()?;
        }
        match self.parent_kind() {
            ParentKind::TopLevel => self.complete(),
            ParentKind::Feed => {
                self.scopes.pop();
                self.read_feed_content()
            }
            ParentKind::Link => {
                self.scopes.pop();
                self.scopes.replace_state(ReaderState::NavigationLinkEnd);
                Ok(())
            }
        }
    }

    fn start_navigation_link(&mut self, pending: PendingLink<'m>) -> Result<(), ReaderError> {
        trace!(name = %pending.link.name, deferred = pending.deferred, "navigation link");
        self.push(Scope::new(
            ReaderState::NavigationLinkStart,
            ReaderItem::NavigationLink(pending.link),
            pending.target,
            ScopeData::Link(LinkScope {
                deferred: pending.deferred,
                array_started: false,
                has_content: false,
            }),
        ))
    }

    fn read_at_navigation_link_start(&mut self) -> Result<(), ReaderError> {
        let scope = self.scopes.current();
        let expected_type = scope.expected_type;
        let deferred = matches!(&scope.data, ScopeData::Link(LinkScope { deferred: true, .. }));
        let is_collection = match &scope.item {
            ReaderItem::NavigationLink(link) => link.is_collection,
            _ => None,
        };
        if deferred {
            self.scopes.replace_state(ReaderState::NavigationLinkEnd);
            return Ok(());
        }

        let response = self.settings().reading_response;
        match is_collection {
            Some(false) => {
                if !response && self.deserializer.is_entity_reference_link()? {
                    let link = self.deserializer.read_entity_reference_link()?;
                    return self.push(Scope::new(
                        ReaderState::EntityReferenceLink,
                        ReaderItem::EntityReferenceLink(link),
                        None,
                        ScopeData::None,
                    ));
                }
                self.start_entry(expected_type, true)
            }
            Some(true) if response => {
                let mut feed = Feed::default();
                let wrapper = self.deserializer.read_feed_start(&mut feed)?;
                self.push_feed(feed, wrapper, false, expected_type)
            }
            Some(true) => self.read_request_collection_content(),
            None => Err(self.deserializer.error(ErrorKind::UnexpectedNode {
                expected: "a deferred link",
                found: self.deserializer.node_type(),
            })),
        }
    }

    /// Continues the array of an expanded collection link in a request.
    ///
    /// Runs of entries are reported as feeds, reference links one by one.
    /// An array with no content still yields one empty feed, so that the link
    /// is never mistaken for a deferred one.
    fn read_request_collection_content(&mut self) -> Result<(), ReaderError> {
        let expected_type = self.scopes.current().expected_type;
        let ScopeData::Link(link) = &mut self.scopes.current_mut().data else {
            return Err(self.deserializer.error(ErrorKind::ReaderFailed));
        };
        if !link.array_started {
            self.deserializer.json.read_start_array()?;
            link.array_started = true;
        }
        let had_content = core::mem::replace(&mut link.has_content, true);

        match self.deserializer.node_type() {
            JsonNodeType::EndArray if had_content => {
                self.deserializer.json.read_end_array()?;
                self.scopes.replace_state(ReaderState::NavigationLinkEnd);
                Ok(())
            }
            JsonNodeType::EndArray => self.push_feed(Feed::default(), None, true, expected_type),
            JsonNodeType::StartObject if self.deserializer.is_entity_reference_link()? => {
                let link = self.deserializer.read_entity_reference_link()?;
                self.push(Scope::new(
                    ReaderState::EntityReferenceLink,
                    ReaderItem::EntityReferenceLink(link),
                    None,
                    ScopeData::None,
                ))
            }
            JsonNodeType::StartObject => self.push_feed(Feed::default(), None, true, expected_type),
            found => Err(self.deserializer.error(ErrorKind::CannotReadFeedContent(found))),
        }
    }

    fn read_at_entity_reference_link(&mut self) -> Result<(), ReaderError> {
        self.scopes.pop();
        if self.scopes.current().link_is_collection() {
            self.read_request_collection_content()
        } else {
            self.scopes.replace_state(ReaderState::NavigationLinkEnd);
            Ok(())
        }
    }

    fn read_at_navigation_link_end(&mut self) -> Result<(), ReaderError> {
        self.scopes.pop();
        let scope = self.scopes.current_mut();
        let (ReaderItem::Entry(Some(entry)), ScopeData::Entry(data)) = (&mut scope.item, &mut scope.data) else {
            return Err(self.deserializer.error(ErrorKind::ReaderFailed));
        };
        let pending = self
            .deserializer
            .read_entry_content(entry, data.entity_type, &mut data.checker)?;
        match pending {
            Some(link) => self.start_navigation_link(link),
            None => {
                self.scopes.replace_state(ReaderState::EntryEnd);
                Ok(())
            }
        }
    }
}

impl Iterator for VerboseJsonReader<'_, '_> {
    type Item = Result<ReaderEvent, ReaderError>;

    /// Yields one event per transition and ends after `Completed` or after
    /// the first error.
    fn next(&mut self) -> Option<Self::Item> {
        if self.state() == ReaderState::Exception {
            return None;
        }
        match self.read() {
            Ok(true) => Some(Ok(ReaderEvent {
                state: self.state(),
                item: self.item().clone(),
            })),
            Ok(false) => None,
            Err(error) => Some(Err(error)),
        }
    }
}
