//! Element paths
//!
//! An [`ElementPath`] is the dotted FHIR path of an element with slice names kept per segment,
//! e.g. `Patient.extension:race.extension:ombCategory.value[x]`. Equality and ordering only look
//! at `(name, slice_name)` pairs; the extension url and choice types a segment carries are
//! resolution details used by the instance walker.

use std::fmt;
use std::hash::{Hash, Hasher};

/// One segment of an [`ElementPath`]
#[derive(Debug, Clone)]
pub struct PathSegment {
    name: String,
    slice_name: Option<String>,
    url: Option<String>,
    choice_types: Vec<String>,
}

impl PathSegment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slice_name: None,
            url: None,
            choice_types: Vec::new(),
        }
    }

    pub fn sliced(name: impl Into<String>, slice_name: impl Into<String>) -> Self {
        Self {
            slice_name: Some(slice_name.into()),
            ..Self::new(name)
        }
    }

    /// Parse the `name[:slice]` form used by element ids and rendered paths.
    fn parse(raw: &str) -> Self {
        match raw.split_once(':') {
            Some((name, slice)) if !slice.is_empty() => Self::sliced(name, slice),
            Some((name, _)) => Self::new(name),
            None => Self::new(raw),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn slice_name(&self) -> Option<&str> {
        self.slice_name.as_deref()
    }

    /// Canonical url identifying the extension this segment selects
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Concrete type suffixes accepted by a choice segment (`Quantity`, `String`, ...)
    pub fn choice_types(&self) -> &[String] {
        &self.choice_types
    }

    pub fn is_choice(&self) -> bool {
        self.name.ends_with("[x]")
    }

    /// Name without the `[x]` marker, for choice segments
    pub fn choice_base(&self) -> Option<&str> {
        self.name.strip_suffix("[x]")
    }

    pub fn is_extension(&self) -> bool {
        self.name == "extension" || self.name == "modifierExtension"
    }

    pub(crate) fn set_url(&mut self, url: impl Into<String>) {
        self.url = Some(url.into());
    }

    pub(crate) fn set_choice_types(&mut self, types: Vec<String>) {
        self.choice_types = types;
    }

    fn identity(&self) -> (&str, Option<&str>) {
        (&self.name, self.slice_name.as_deref())
    }
}

impl PartialEq for PathSegment {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for PathSegment {}

impl Hash for PathSegment {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl PartialOrd for PathSegment {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PathSegment {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.identity().cmp(&other.identity())
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.slice_name {
            Some(slice) => write!(f, "{}:{}", self.name, slice),
            None => f.write_str(&self.name),
        }
    }
}

/// Dotted FHIR element path with per-segment slice names
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementPath {
    segments: Vec<PathSegment>,
}

impl ElementPath {
    pub fn new(segments: Vec<PathSegment>) -> Self {
        Self { segments }
    }

    /// Build a path from an ElementDefinition `path` and optional `sliceName`.
    ///
    /// The slice name annotates the last segment, so `("ServiceRequest.extension", "statusReason")`
    /// renders as `ServiceRequest.extension:statusReason`.
    pub fn parse_differential(raw_path: &str, slice_name: Option<&str>) -> Self {
        let mut segments: Vec<PathSegment> = raw_path.split('.').map(PathSegment::new).collect();
        if let (Some(last), Some(slice)) = (segments.last_mut(), slice_name) {
            if !slice.is_empty() {
                last.slice_name = Some(slice.to_string());
            }
        }
        Self { segments }
    }

    /// Parse the rendered form, which is also the ElementDefinition `id` form.
    pub fn parse(display: &str) -> Self {
        Self {
            segments: display.split('.').map(PathSegment::parse).collect(),
        }
    }

    /// Canonical display form (`ResourceType.seg1.seg2:sliceName`)
    pub fn render(&self) -> String {
        self.to_string()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub(crate) fn segments_mut(&mut self) -> &mut [PathSegment] {
        &mut self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Resource or type name the path starts with
    pub fn root(&self) -> Option<&str> {
        self.segments.first().map(PathSegment::name)
    }

    pub fn last(&self) -> Option<&PathSegment> {
        self.segments.last()
    }

    /// The first `len` segments
    pub fn prefix(&self, len: usize) -> ElementPath {
        Self {
            segments: self.segments[..len.min(self.segments.len())].to_vec(),
        }
    }

    /// True when both paths have the same segment names, slices ignored
    pub fn same_names(&self, other: &ElementPath) -> bool {
        self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|(a, b)| a.name == b.name)
    }
}

impl fmt::Display for ElementPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

/// Does `instance_key` (a JSON property name) select `segment`?
///
/// Plain segments need an exact name. Choice segments (`value[x]`) match the base name followed
/// by an upper-case type suffix (`valueQuantity`), restricted to the segment's choice types when
/// known, or to one concrete key when the choice is type-sliced (`value[x]:valueQuantity`).
pub fn matches_instance_segment(segment: &PathSegment, instance_key: &str) -> bool {
    let Some(base) = segment.choice_base() else {
        return segment.name == instance_key;
    };

    let Some(suffix) = instance_key.strip_prefix(base) else {
        return false;
    };
    if !suffix.starts_with(|c: char| c.is_ascii_uppercase()) {
        return false;
    }

    if let Some(slice) = segment.slice_name() {
        if slice.len() > base.len() && slice.starts_with(base) {
            return slice == instance_key;
        }
    }

    segment.choice_types.is_empty() || segment.choice_types.iter().any(|t| t == suffix)
}

/// JSON property suffix for a FHIR type code (`dateTime` -> `DateTime`).
///
/// System type urls (`http://hl7.org/fhirpath/System.String`) keep their last name part.
pub fn type_suffix(code: &str) -> String {
    let name = code.rsplit(|c: char| c == '/' || c == '.').next().unwrap_or(code);
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
