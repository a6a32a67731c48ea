//! Activation records of the reader state machine.
use crate::{
    duplicate_names::DuplicatePropertyNamesChecker,
    entry_and_feed::{FeedWrapper, PendingLink},
    item::ReaderItem,
    model::EntityType,
    validation::FeedItemTypeValidator,
};

/// The states a [`VerboseJsonReader`](crate::VerboseJsonReader) reports.
#[cfg_attr(any(test, feature = "serde"), derive(serde::Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReaderState {
    /// Nothing has been read yet.
    Start,
    /// A feed has begun; its `__count` is known if it came before `results`.
    FeedStart,
    /// A feed is complete, including any trailing `__count` or `__next`.
    FeedEnd,
    /// An entry has begun and its metadata has been read.
    EntryStart,
    /// An entry and all its properties and links have been read.
    EntryEnd,
    /// A navigation link has begun; expanded content follows.
    NavigationLinkStart,
    /// A navigation link is complete.
    NavigationLinkEnd,
    /// An entity reference link inside a request-side link was read.
    EntityReferenceLink,
    /// A read failed; the reader cannot be used any more.
    Exception,
    /// The whole payload has been read.
    Completed,
}

#[derive(Debug)]
pub(crate) struct EntryScope<'m> {
    pub(crate) entity_type: Option<&'m EntityType>,
    /// First navigation link, found while the entry was being started.
    pub(crate) pending_link: Option<PendingLink<'m>>,
    pub(crate) checker: DuplicatePropertyNamesChecker,
}

#[derive(Debug, Default)]
pub(crate) struct FeedScope<'m> {
    pub(crate) wrapper: Option<FeedWrapper>,
    /// Run of entries inside the array of a request's expanded collection
    /// link. Such a feed has no array of its own.
    pub(crate) in_request_collection: bool,
    pub(crate) item_types: FeedItemTypeValidator<'m>,
}

#[derive(Debug)]
pub(crate) struct LinkScope {
    pub(crate) deferred: bool,
    /// Request collection link: the array has been entered.
    pub(crate) array_started: bool,
    /// Request collection link: a feed or entity reference link has been
    /// reported.
    pub(crate) has_content: bool,
}

#[derive(Debug)]
pub(crate) enum ScopeData<'m> {
    None,
    Entry(EntryScope<'m>),
    Feed(FeedScope<'m>),
    Link(LinkScope),
}

#[derive(Debug)]
pub(crate) struct Scope<'m> {
    pub(crate) state: ReaderState,
    pub(crate) item: ReaderItem,
    /// The type an entry read in this scope must derive from.
    pub(crate) expected_type: Option<&'m EntityType>,
    pub(crate) data: ScopeData<'m>,
}

impl<'m> Scope<'m> {
    pub(crate) fn new(state: ReaderState, item: ReaderItem, expected_type: Option<&'m EntityType>, data: ScopeData<'m>) -> Self {
        Self {
            state,
            item,
            expected_type,
            data,
        }
    }

    pub(crate) fn marker(state: ReaderState) -> Self {
        Self::new(state, ReaderItem::None, None, ScopeData::None)
    }

    pub(crate) fn is_null_entry(&self) -> bool {
        matches!(self.item, ReaderItem::Entry(None))
    }

    pub(crate) fn link_is_collection(&self) -> bool {
        matches!(&self.item, ReaderItem::NavigationLink(link) if link.is_collection == Some(true))
    }
}

/// The reader's scope stack. Never empty: the bottom scope is the `Start`
/// (later `Completed`) marker.
#[derive(Debug)]
pub(crate) struct ScopeStack<'m> {
    scopes: alloc::vec::Vec<Scope<'m>>,
}

impl<'m> ScopeStack<'m> {
    pub(crate) fn new() -> Self {
        Self {
            scopes: alloc::vec![Scope::marker(ReaderState::Start)],
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.scopes.len()
    }

    pub(crate) fn current(&self) -> &Scope<'m> {
        &self.scopes[self.scopes.len() - 1]
    }

    pub(crate) fn current_mut(&mut self) -> &mut Scope<'m> {
        let last = self.scopes.len() - 1;
        &mut self.scopes[last]
    }

    pub(crate) fn parent(&self) -> Option<&Scope<'m>> {
        self.scopes.len().checked_sub(2).map(|i| &self.scopes[i])
    }

    pub(crate) fn push(&mut self, scope: Scope<'m>) {
        self.scopes.push(scope);
    }

    /// Pops the current scope. The bottom marker is never popped.
    pub(crate) fn pop(&mut self) -> Option<Scope<'m>> {
        if self.scopes.len() > 1 { self.scopes.pop() } else { None }
    }

    /// Keeps the current scope's item and data under a new state.
    pub(crate) fn replace_state(&mut self, state: ReaderState) {
        self.current_mut().state = state;
    }
}
