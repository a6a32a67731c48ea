//! A minimal metadata model: entity types, complex types and their
//! properties.
//!
//! The reader only needs lookups by name, inheritance walks and property
//! declarations, so the model is a plain in-memory registry built with
//! chained `with_*` calls.
//!
//! ```rust
//! use odata_verbose::{EdmModel, EntityType, NavigationProperty, PrimitiveKind};
//!
//! let model = EdmModel::new()
//!     .with_entity_type(
//!         EntityType::new("NS.Customer")
//!             .with_primitive("ID", PrimitiveKind::Int32)
//!             .with_navigation(NavigationProperty::collection("Orders", "NS.Order")),
//!     )
//!     .with_entity_type(EntityType::new("NS.Order").with_primitive("ID", PrimitiveKind::Int32));
//!
//! let customer = model.entity_type("NS.Customer").unwrap();
//! assert!(model.find_navigation_property(customer, "Orders").is_some());
//! ```
use alloc::{
    boxed::Box,
    collections::BTreeMap,
    string::{String, ToString},
    vec::Vec,
};
use core::fmt;

/// OData protocol versions that have a verbose JSON format.
#[cfg_attr(any(test, feature = "serde"), derive(serde::Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum ODataVersion {
    V1,
    V2,
    #[default]
    V3,
}

impl fmt::Display for ODataVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ODataVersion::V1 => "1.0",
            ODataVersion::V2 => "2.0",
            ODataVersion::V3 => "3.0",
        })
    }
}

/// The EDM primitive types the verbose format can carry.
#[cfg_attr(any(test, feature = "serde"), derive(serde::Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    Binary,
    Boolean,
    Byte,
    DateTime,
    DateTimeOffset,
    Decimal,
    Double,
    Guid,
    Int16,
    Int32,
    Int64,
    SByte,
    Single,
    String,
    Time,
    Geography,
    GeographyPoint,
    Geometry,
    GeometryPoint,
}

impl PrimitiveKind {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Binary => "Edm.Binary",
            PrimitiveKind::Boolean => "Edm.Boolean",
            PrimitiveKind::Byte => "Edm.Byte",
            PrimitiveKind::DateTime => "Edm.DateTime",
            PrimitiveKind::DateTimeOffset => "Edm.DateTimeOffset",
            PrimitiveKind::Decimal => "Edm.Decimal",
            PrimitiveKind::Double => "Edm.Double",
            PrimitiveKind::Guid => "Edm.Guid",
            PrimitiveKind::Int16 => "Edm.Int16",
            PrimitiveKind::Int32 => "Edm.Int32",
            PrimitiveKind::Int64 => "Edm.Int64",
            PrimitiveKind::SByte => "Edm.SByte",
            PrimitiveKind::Single => "Edm.Single",
            PrimitiveKind::String => "Edm.String",
            PrimitiveKind::Time => "Edm.Time",
            PrimitiveKind::Geography => "Edm.Geography",
            PrimitiveKind::GeographyPoint => "Edm.GeographyPoint",
            PrimitiveKind::Geometry => "Edm.Geometry",
            PrimitiveKind::GeometryPoint => "Edm.GeometryPoint",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        const ALL: [PrimitiveKind; 19] = [
            PrimitiveKind::Binary,
            PrimitiveKind::Boolean,
            PrimitiveKind::Byte,
            PrimitiveKind::DateTime,
            PrimitiveKind::DateTimeOffset,
            PrimitiveKind::Decimal,
            PrimitiveKind::Double,
            PrimitiveKind::Guid,
            PrimitiveKind::Int16,
            PrimitiveKind::Int32,
            PrimitiveKind::Int64,
            PrimitiveKind::SByte,
            PrimitiveKind::Single,
            PrimitiveKind::String,
            PrimitiveKind::Time,
            PrimitiveKind::Geography,
            PrimitiveKind::GeographyPoint,
            PrimitiveKind::Geometry,
            PrimitiveKind::GeometryPoint,
        ];
        ALL.into_iter().find(|kind| kind.name() == name)
    }

    #[must_use]
    pub fn is_spatial(self) -> bool {
        matches!(
            self,
            PrimitiveKind::Geography
                | PrimitiveKind::GeographyPoint
                | PrimitiveKind::Geometry
                | PrimitiveKind::GeometryPoint
        )
    }
}

/// The declared type of a structural property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyType {
    Primitive(PrimitiveKind),
    /// Qualified name of a complex type.
    Complex(String),
    Collection(Box<PropertyType>),
    /// A named stream (stream reference value).
    Stream,
}

impl PropertyType {
    /// The name used for this type in payload `type` annotations.
    #[must_use]
    pub fn type_name(&self) -> String {
        match self {
            PropertyType::Primitive(kind) => kind.name().to_string(),
            PropertyType::Complex(name) => name.clone(),
            PropertyType::Collection(item) => alloc::format!("Collection({})", item.type_name()),
            PropertyType::Stream => "Edm.Stream".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuralProperty {
    pub name: String,
    pub ty: PropertyType,
    pub nullable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationProperty {
    pub name: String,
    /// Qualified name of the target entity type.
    pub target: String,
    pub is_collection: bool,
}

impl NavigationProperty {
    #[must_use]
    pub fn single(name: &str, target: &str) -> Self {
        Self {
            name: name.to_string(),
            target: target.to_string(),
            is_collection: false,
        }
    }

    #[must_use]
    pub fn collection(name: &str, target: &str) -> Self {
        Self {
            name: name.to_string(),
            target: target.to_string(),
            is_collection: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityType {
    pub name: String,
    pub base_type: Option<String>,
    pub is_abstract: bool,
    pub is_open: bool,
    /// Media link entry: the entity has a default stream.
    pub has_stream: bool,
    pub properties: Vec<StructuralProperty>,
    pub navigation_properties: Vec<NavigationProperty>,
}

impl EntityType {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            base_type: None,
            is_abstract: false,
            is_open: false,
            has_stream: false,
            properties: Vec::new(),
            navigation_properties: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_base(mut self, base: &str) -> Self {
        self.base_type = Some(base.to_string());
        self
    }

    #[must_use]
    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    #[must_use]
    pub fn open(mut self) -> Self {
        self.is_open = true;
        self
    }

    #[must_use]
    pub fn media_link_entry(mut self) -> Self {
        self.has_stream = true;
        self
    }

    #[must_use]
    pub fn with_property(mut self, name: &str, ty: PropertyType, nullable: bool) -> Self {
        self.properties.push(StructuralProperty {
            name: name.to_string(),
            ty,
            nullable,
        });
        self
    }

    /// Adds a nullable primitive property.
    #[must_use]
    pub fn with_primitive(self, name: &str, kind: PrimitiveKind) -> Self {
        self.with_property(name, PropertyType::Primitive(kind), true)
    }

    #[must_use]
    pub fn with_navigation(mut self, navigation: NavigationProperty) -> Self {
        self.navigation_properties.push(navigation);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplexType {
    pub name: String,
    pub properties: Vec<StructuralProperty>,
}

impl ComplexType {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            properties: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_property(mut self, name: &str, ty: PropertyType, nullable: bool) -> Self {
        self.properties.push(StructuralProperty {
            name: name.to_string(),
            ty,
            nullable,
        });
        self
    }

    #[must_use]
    pub fn with_primitive(self, name: &str, kind: PrimitiveKind) -> Self {
        self.with_property(name, PropertyType::Primitive(kind), true)
    }

    #[must_use]
    pub fn find_property(&self, name: &str) -> Option<&StructuralProperty> {
        self.properties.iter().find(|p| p.name == name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct EdmModel {
    entity_types: BTreeMap<String, EntityType>,
    complex_types: BTreeMap<String, ComplexType>,
}

impl EdmModel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_entity_type(mut self, entity_type: EntityType) -> Self {
        self.entity_types.insert(entity_type.name.clone(), entity_type);
        self
    }

    #[must_use]
    pub fn with_complex_type(mut self, complex_type: ComplexType) -> Self {
        self.complex_types.insert(complex_type.name.clone(), complex_type);
        self
    }

    #[must_use]
    pub fn entity_type(&self, name: &str) -> Option<&EntityType> {
        self.entity_types.get(name)
    }

    #[must_use]
    pub fn complex_type(&self, name: &str) -> Option<&ComplexType> {
        self.complex_types.get(name)
    }

    pub fn base_type_of<'m>(&'m self, entity_type: &'m EntityType) -> Option<&'m EntityType> {
        entity_type
            .base_type
            .as_deref()
            .and_then(|name| self.entity_type(name))
    }

    /// Iterates `entity_type` and its ancestors, most derived first.
    ///
    /// A cyclic base type chain stops after every type has been visited once.
    pub fn ancestry<'m>(&'m self, entity_type: &'m EntityType) -> impl Iterator<Item = &'m EntityType> {
        core::iter::successors(Some(entity_type), move |t| self.base_type_of(t)).take(self.entity_types.len().max(1))
    }

    /// Whether a value of `derived` may stand where `base` is expected.
    #[must_use]
    pub fn is_assignable(&self, base: &EntityType, derived: &EntityType) -> bool {
        self.ancestry(derived).any(|t| t.name == base.name)
    }

    /// The most derived type both `a` and `b` inherit from, if any.
    pub fn common_base_type<'m>(&'m self, a: &'m EntityType, b: &'m EntityType) -> Option<&'m EntityType> {
        self.ancestry(a).find(|candidate| self.is_assignable(candidate, b))
    }

    pub fn find_property<'m>(&'m self, entity_type: &'m EntityType, name: &str) -> Option<&'m StructuralProperty> {
        self.ancestry(entity_type)
            .find_map(|t| t.properties.iter().find(|p| p.name == name))
    }

    pub fn find_navigation_property<'m>(
        &'m self,
        entity_type: &'m EntityType,
        name: &str,
    ) -> Option<&'m NavigationProperty> {
        self.ancestry(entity_type)
            .find_map(|t| t.navigation_properties.iter().find(|p| p.name == name))
    }

    #[must_use]
    pub fn is_open(&self, entity_type: &EntityType) -> bool {
        self.ancestry(entity_type).any(|t| t.is_open)
    }

    #[must_use]
    pub fn has_stream(&self, entity_type: &EntityType) -> bool {
        self.ancestry(entity_type).any(|t| t.has_stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> EdmModel {
        EdmModel::new()
            .with_entity_type(
                EntityType::new("NS.Person")
                    .abstract_type()
                    .with_primitive("Name", PrimitiveKind::String),
            )
            .with_entity_type(EntityType::new("NS.Employee").with_base("NS.Person"))
            .with_entity_type(
                EntityType::new("NS.Manager")
                    .with_base("NS.Employee")
                    .with_navigation(NavigationProperty::collection("Reports", "NS.Employee")),
            )
            .with_entity_type(EntityType::new("NS.Customer").with_base("NS.Person").open())
            .with_entity_type(EntityType::new("NS.Product"))
    }

    #[test]
    fn inheritance_lookups() {
        let model = model();
        let person = model.entity_type("NS.Person").unwrap();
        let employee = model.entity_type("NS.Employee").unwrap();
        let manager = model.entity_type("NS.Manager").unwrap();
        let customer = model.entity_type("NS.Customer").unwrap();
        let product = model.entity_type("NS.Product").unwrap();

        assert!(model.is_assignable(person, manager));
        assert!(!model.is_assignable(manager, employee));
        assert_eq!(model.common_base_type(manager, employee).unwrap().name, "NS.Employee");
        assert_eq!(model.common_base_type(manager, customer).unwrap().name, "NS.Person");
        assert!(model.common_base_type(product, customer).is_none());

        assert!(model.find_property(manager, "Name").is_some());
        assert!(model.is_open(customer));
        assert!(!model.is_open(manager));
    }

    #[test]
    fn cyclic_base_types_terminate() {
        let model = EdmModel::new()
            .with_entity_type(EntityType::new("NS.A").with_base("NS.B"))
            .with_entity_type(EntityType::new("NS.B").with_base("NS.A"));
        let a = model.entity_type("NS.A").unwrap();
        assert_eq!(model.ancestry(a).count(), 2);
        assert!(model.find_property(a, "Missing").is_none());
    }

    #[test]
    fn primitive_names_round_trip() {
        assert_eq!(PrimitiveKind::from_name("Edm.Int64"), Some(PrimitiveKind::Int64));
        assert_eq!(PrimitiveKind::from_name("Edm.Nope"), None);
        assert_eq!(
            PropertyType::Collection(Box::new(PropertyType::Complex("NS.Address".into()))).type_name(),
            "Collection(NS.Address)"
        );
    }
}
