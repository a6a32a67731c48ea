use alloc::{collections::BTreeMap, string::String};

use crate::error::ErrorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Seen {
    Property,
    NavigationLink,
    AssociationLink,
    /// A navigation link and an association link sharing one name.
    Both,
}

/// Tracks the names used inside one entry or complex value.
///
/// Data properties must be unique. A navigation link and an association link
/// may share a name, but neither may repeat on its own.
#[derive(Debug, Clone, Default)]
pub(crate) struct DuplicatePropertyNamesChecker {
    allow_duplicates: bool,
    names: BTreeMap<String, Seen>,
}

impl DuplicatePropertyNamesChecker {
    pub(crate) fn new(allow_duplicates: bool) -> Self {
        Self {
            allow_duplicates,
            names: BTreeMap::new(),
        }
    }

    pub(crate) fn check_property(&mut self, name: &str) -> Result<(), ErrorKind> {
        self.record(name, Seen::Property)
    }

    pub(crate) fn check_navigation_link(&mut self, name: &str) -> Result<(), ErrorKind> {
        self.record(name, Seen::NavigationLink)
    }

    pub(crate) fn check_association_link(&mut self, name: &str) -> Result<(), ErrorKind> {
        self.record(name, Seen::AssociationLink)
    }

    fn record(&mut self, name: &str, kind: Seen) -> Result<(), ErrorKind> {
        let Some(previous) = self.names.get(name).copied() else {
            self.names.insert(String::from(name), kind);
            return Ok(());
        };
        let merged = match (previous, kind) {
            (Seen::NavigationLink, Seen::AssociationLink) | (Seen::AssociationLink, Seen::NavigationLink) => {
                Some(Seen::Both)
            }
            _ => None,
        };
        match merged {
            Some(both) => {
                self.names.insert(String::from(name), both);
                Ok(())
            }
            None if self.allow_duplicates => Ok(()),
            None if kind == Seen::AssociationLink => Err(ErrorKind::DuplicateAssociationLink(String::from(name))),
            None => Err(ErrorKind::DuplicatePropertyName(String::from(name))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_property_is_rejected() {
        let mut checker = DuplicatePropertyNamesChecker::new(false);
        checker.check_property("Name").unwrap();
        checker.check_property("Other").unwrap();
        assert_eq!(
            checker.check_property("Name"),
            Err(ErrorKind::DuplicatePropertyName("Name".into()))
        );
    }

    #[test]
    fn navigation_and_association_link_may_share_a_name() {
        let mut checker = DuplicatePropertyNamesChecker::new(false);
        checker.check_association_link("Orders").unwrap();
        checker.check_navigation_link("Orders").unwrap();
        assert_eq!(
            checker.check_association_link("Orders"),
            Err(ErrorKind::DuplicateAssociationLink("Orders".into()))
        );
        assert_eq!(
            checker.check_navigation_link("Orders"),
            Err(ErrorKind::DuplicatePropertyName("Orders".into()))
        );
    }

    #[test]
    fn link_and_property_collide() {
        let mut checker = DuplicatePropertyNamesChecker::new(false);
        checker.check_property("Orders").unwrap();
        assert!(checker.check_navigation_link("Orders").is_err());
    }

    #[test]
    fn duplicates_can_be_allowed() {
        let mut checker = DuplicatePropertyNamesChecker::new(true);
        checker.check_property("Name").unwrap();
        checker.check_property("Name").unwrap();
        checker.check_association_link("A").unwrap();
        checker.check_association_link("A").unwrap();
    }
}
