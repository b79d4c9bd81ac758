//! Instance walking
//!
//! Counts how many populated values a resource holds at the path of a mustSupport element.

use crate::diagnostics::Diagnostics;
use crate::element::MustSupportElement;
use crate::error::Warning;
use crate::path::{matches_instance_segment, PathSegment};
use serde_json::{Map, Value};

/// Number of populated leaf occurrences of `element` in `resource`.
///
/// Arrays fan out and their counts are summed, so `Patient.name` on a patient with two names
/// counts 2. Missing fields count 0. A resource of another type counts 0.
pub fn count_usage(
    element: &MustSupportElement,
    resource: &Value,
    diagnostics: &mut Diagnostics,
) -> u64 {
    let segments = element.path.segments();
    let Some((root, rest)) = segments.split_first() else {
        return 0;
    };
    if resource.get("resourceType").and_then(Value::as_str) != Some(root.name()) {
        return 0;
    }

    let mut walker = Walker {
        element,
        diagnostics,
    };
    walker.walk(resource, rest)
}

/// FHIR notion of "has a value"
pub fn is_populated(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => items.iter().any(is_populated),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

fn count_populated(value: &Value) -> u64 {
    match value {
        Value::Array(items) => items.iter().map(count_populated).sum(),
        other => u64::from(is_populated(other)),
    }
}

struct Walker<'a> {
    element: &'a MustSupportElement,
    diagnostics: &'a mut Diagnostics,
}

impl Walker<'_> {
    fn walk(&mut self, value: &Value, segments: &[PathSegment]) -> u64 {
        let Some((segment, rest)) = segments.split_first() else {
            return count_populated(value);
        };

        match value {
            Value::Array(items) => items.iter().map(|item| self.walk(item, segments)).sum(),
            Value::Object(map) => self.step(map, segment, rest),
            _ => 0,
        }
    }

    fn step(&mut self, map: &Map<String, Value>, segment: &PathSegment, rest: &[PathSegment]) -> u64 {
        let Some(key) = self.select_key(map, segment) else {
            return 0;
        };

        let mut count = match map.get(key) {
            Some(child) if segment.is_extension() => {
                let entries = matching_extensions(child, segment);
                entries.into_iter().map(|entry| self.walk(entry, rest)).sum()
            }
            Some(child) => self.walk(child, rest),
            None => 0,
        };

        // Extensions on primitives live in the `_name` shadow property.
        if !rest.is_empty() {
            if let Some(shadow) = map.get(&format!("_{}", key)) {
                count += self.walk(shadow, rest);
            }
        }
        count
    }

    /// Instance key selected by `segment`, if any. Shadow keys (`_name`) select `name`.
    fn select_key<'m>(
        &mut self,
        map: &'m Map<String, Value>,
        segment: &PathSegment,
    ) -> Option<&'m str> {
        let plain_keys = map.keys().map(|k| k.strip_prefix('_').unwrap_or(k.as_str()));

        if !segment.is_choice() {
            return plain_keys.into_iter().find(|k| *k == segment.name());
        }

        let mut keys: Vec<&str> = Vec::new();
        for key in plain_keys.filter(|k| matches_instance_segment(segment, k)) {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        let first = *keys.first()?;

        if keys.len() > 1 {
            self.diagnostics.push(Warning::PathWalkAmbiguity {
                path: self.element.element(),
                keys: keys.iter().map(|k| k.to_string()).collect(),
                chosen: first.to_string(),
            });
        }
        Some(first)
    }
}

/// Entries of an extension array selected by `segment`.
///
/// With a known url, entries must carry that url. With only a slice name, the url must be the
/// slice name itself or end in `/<slice>`. A bare `extension` segment keeps every entry.
fn matching_extensions<'v>(extensions: &'v Value, segment: &PathSegment) -> Vec<&'v Value> {
    let entries: Vec<&Value> = match extensions {
        Value::Array(items) => items.iter().collect(),
        Value::Null => Vec::new(),
        other => vec![other],
    };

    match (segment.url(), segment.slice_name()) {
        (Some(url), _) => entries
            .into_iter()
            .filter(|e| extension_url(e) == Some(url))
            .collect(),
        (None, Some(slice)) => {
            let suffix = format!("/{}", slice);
            entries
                .into_iter()
                .filter(|e| extension_url(e).is_some_and(|u| u == slice || u.ends_with(&suffix)))
                .collect()
        }
        (None, None) => entries,
    }
}

fn extension_url(entry: &Value) -> Option<&str> {
    entry.get("url").and_then(Value::as_str)
}
