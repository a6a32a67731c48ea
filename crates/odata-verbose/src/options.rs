#![allow(clippy::struct_excessive_bools)]

use crate::model::ODataVersion;

/// Configuration options for the verbose JSON reader.
///
/// # Examples
///
/// ```rust
/// use odata_verbose::{ODataVersion, ReaderSettings};
///
/// let settings = ReaderSettings {
///     reading_response: false,
///     version: ODataVersion::V2,
///     ..Default::default()
/// };
/// assert!(!settings.server_compatibility);
/// ```
///
/// # Default
///
/// A strict V3 response reader: no property de-duplication, in-stream error
/// detection on, undeclared properties rejected, nesting limited to 100.
#[derive(Debug, Clone, Copy)]
pub struct ReaderSettings {
    /// Whether the payload is a response (as opposed to a request body).
    ///
    /// Responses may be wrapped in a `{"d": ...}` envelope, may contain
    /// deferred navigation links and may carry in-stream error objects.
    /// Requests may contain entity reference links instead of expanded
    /// entries.
    ///
    /// # Default
    ///
    /// `true`
    pub reading_response: bool,

    /// The protocol version the payload was written for.
    ///
    /// Stream properties, association links, actions, functions and spatial
    /// values require [`ODataVersion::V3`].
    ///
    /// # Default
    ///
    /// [`ODataVersion::V3`]
    pub version: ODataVersion,

    /// Server compatibility mode.
    ///
    /// When `true`, every object is buffered as it is first read and repeated
    /// property names are collapsed to a single occurrence: the position of
    /// the first occurrence with the value of the last one. When `false`,
    /// repeated names are reported as errors.
    ///
    /// # Default
    ///
    /// `false`
    pub server_compatibility: bool,

    /// Whether to look for `{"error": {...}}` objects in responses.
    ///
    /// Has no effect when reading a request.
    ///
    /// # Default
    ///
    /// `true`
    pub detect_in_stream_errors: bool,

    /// Whether a property that is not declared on a closed entity type but
    /// has the shape of a deferred link is reported as a navigation link.
    ///
    /// # Default
    ///
    /// `false`
    pub report_undeclared_link_properties: bool,

    /// Whether undeclared value properties on closed types are skipped
    /// instead of rejected.
    ///
    /// # Default
    ///
    /// `false`
    pub ignore_undeclared_value_properties: bool,

    /// Whether repeated property and association link names are accepted.
    ///
    /// Independent of [`server_compatibility`](Self::server_compatibility):
    /// de-duplication removes repeats before they are seen, this flag only
    /// silences the check on whatever repeats remain.
    ///
    /// # Default
    ///
    /// `false`
    pub allow_duplicate_property_names: bool,

    /// Maximum depth of nested feeds, entries, links and complex values. Also
    /// bounds the JSON read for `__metadata` objects and spatial values.
    ///
    /// # Default
    ///
    /// `100`
    pub max_nesting_depth: usize,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            reading_response: true,
            version: ODataVersion::V3,
            server_compatibility: false,
            detect_in_stream_errors: true,
            report_undeclared_link_properties: false,
            ignore_undeclared_value_properties: false,
            allow_duplicate_property_names: false,
            max_nesting_depth: 100,
        }
    }
}

impl ReaderSettings {
    /// Settings for reading a request body, otherwise default.
    #[must_use]
    pub fn request() -> Self {
        Self {
            reading_response: false,
            ..Self::default()
        }
    }
}
