//! Metadata-driven checks: entry type resolution, feed item typing, media
//! resources and protocol-version gating.
use alloc::string::{String, ToString};

use crate::{
    error::ErrorKind,
    model::{EdmModel, EntityType, ODataVersion},
};

/// Resolves the type of an entry from the name in its `__metadata` block.
///
/// Without a model nothing is resolved. With one, the payload type must be
/// known and derive from `expected`; with no payload type the expected type
/// is used, and one of the two must exist. Abstract types never resolve.
pub(crate) fn resolve_entry_type<'m>(
    model: Option<&'m EdmModel>,
    payload_type: Option<&str>,
    expected: Option<&'m EntityType>,
) -> Result<Option<&'m EntityType>, ErrorKind> {
    let Some(model) = model else {
        return Ok(None);
    };
    let resolved = match payload_type {
        Some(name) => {
            let actual = model
                .entity_type(name)
                .ok_or_else(|| ErrorKind::UnknownTypeName(name.to_string()))?;
            match expected {
                Some(expected) if !model.is_assignable(expected, actual) => {
                    return Err(ErrorKind::IncompatibleType {
                        expected: expected.name.clone(),
                        actual: actual.name.clone(),
                    });
                }
                _ => {}
            }
            actual
        }
        None => expected.ok_or(ErrorKind::MissingTypeName)?,
    };
    if resolved.is_abstract {
        return Err(ErrorKind::AbstractType(resolved.name.clone()));
    }
    Ok(Some(resolved))
}

/// Keeps the entries of a feed that has no expected type on a common base
/// type.
#[derive(Debug, Default)]
pub(crate) struct FeedItemTypeValidator<'m> {
    base: Option<&'m EntityType>,
}

impl<'m> FeedItemTypeValidator<'m> {
    pub(crate) fn validate(&mut self, model: &'m EdmModel, item: &'m EntityType) -> Result<(), ErrorKind> {
        let base = match self.base {
            None => item,
            Some(base) => model
                .common_base_type(base, item)
                .ok_or_else(|| ErrorKind::IncompatibleFeedItemTypes {
                    first: base.name.clone(),
                    second: item.name.clone(),
                })?,
        };
        self.base = Some(base);
        Ok(())
    }
}

pub(crate) fn validate_media_resource(
    model: &EdmModel,
    entity_type: &EntityType,
    has_media_resource: bool,
) -> Result<(), ErrorKind> {
    match (model.has_stream(entity_type), has_media_resource) {
        (true, false) => Err(ErrorKind::MissingMediaResource(entity_type.name.clone())),
        (false, true) => Err(ErrorKind::UnexpectedMediaResource(entity_type.name.clone())),
        _ => Ok(()),
    }
}

pub(crate) fn require_version(
    actual: ODataVersion,
    required: ODataVersion,
    feature: &'static str,
) -> Result<(), ErrorKind> {
    if actual < required {
        return Err(ErrorKind::VersionNotSupported {
            feature,
            required,
            actual,
        });
    }
    Ok(())
}

pub(crate) fn validate_null(property: &str, nullable: bool) -> Result<(), ErrorKind> {
    if nullable {
        Ok(())
    } else {
        Err(ErrorKind::NullValueForNonNullable(String::from(property)))
    }
}
