// Copyright 2024 Vincent Chan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//	http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Dotted field paths (`"songs.title"`) over documents.
//!
//! Reads come in two flavours. [`resolve_path`] follows MongoDB semantics and
//! fans out over every array met on the way, which is what predicates and
//! indexes need. [`get_path`] is strict: a numeric segment indexes into an
//! array and anything else must be a document field. Writes are always strict.

use bson::{Bson, Document};
use crate::{Error, Result};
use crate::errors::FieldTypeUnexpectedStruct;
use crate::utils::bson::type_name;

/// How far past the end of an array a write may land, the gap being
/// filled with nulls.
const MAX_ARRAY_GAP: usize = 1024;

pub(crate) fn validate_field_path(path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(Error::IllegalFieldPath(path.to_string()));
    }
    for segment in path.split('.') {
        if segment.is_empty() || segment.starts_with('$') {
            return Err(Error::IllegalFieldPath(path.to_string()));
        }
    }
    Ok(())
}

/// All values reachable through `path`. Arrays met before the last
/// segment are flattened; a value found at the last segment is returned as
/// is, arrays included.
pub(crate) fn resolve_path<'a>(doc: &'a Document, path: &str) -> Vec<&'a Bson> {
    let segments = path.split('.').collect::<Vec<&str>>();
    let mut result = Vec::new();
    resolve_in_document(doc, &segments, &mut result);
    result
}

fn resolve_in_document<'a>(doc: &'a Document, segments: &[&str], result: &mut Vec<&'a Bson>) {
    let (first, remains) = match segments.split_first() {
        Some(pair) => pair,
        None => return,
    };
    if let Some(value) = doc.get(*first) {
        resolve_in_value(value, remains, result);
    }
}

fn resolve_in_value<'a>(value: &'a Bson, segments: &[&str], result: &mut Vec<&'a Bson>) {
    if segments.is_empty() {
        result.push(value);
        return;
    }
    match value {
        Bson::Document(doc) => resolve_in_document(doc, segments, result),
        Bson::Array(arr) => {
            if let Ok(index) = segments[0].parse::<usize>() {
                if let Some(item) = arr.get(index) {
                    resolve_in_value(item, &segments[1..], result);
                }
                return;
            }
            for item in arr {
                if let Bson::Document(doc) = item {
                    resolve_in_document(doc, segments, result);
                }
            }
        }
        _ => (),
    }
}

/// Expand arrays found at the end of a path into their elements.
pub(crate) fn flatten_arrays<'a>(values: Vec<&'a Bson>) -> Vec<&'a Bson> {
    let mut result = Vec::with_capacity(values.len());
    for value in values {
        match value {
            Bson::Array(arr) => result.extend(arr.iter()),
            _ => result.push(value),
        }
    }
    result
}

pub(crate) fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = doc.get(first)?;
    for segment in segments {
        current = match current {
            Bson::Document(sub) => sub.get(segment)?,
            Bson::Array(arr) => arr.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn get_container_mut<'a>(doc: &'a mut Document, path: &str, create: bool) -> Result<Option<(&'a mut Bson, String)>> {
    let segments = path.split('.').collect::<Vec<&str>>();
    let (last, parents) = match segments.split_last() {
        Some(pair) => pair,
        None => return Err(Error::IllegalFieldPath(path.to_string())),
    };
    if parents.is_empty() {
        return Ok(None);
    }

    let first = parents[0];
    if doc.get(first).is_none() {
        if !create {
            return Err(Error::IllegalFieldPath(path.to_string()));
        }
        doc.insert(first, Document::new());
    }
    let mut current = match doc.get_mut(first) {
        Some(value) => value,
        None => return Err(Error::IllegalFieldPath(path.to_string())),
    };

    for segment in &parents[1..] {
        current = step_mut(current, segment, path, create)?;
    }

    Ok(Some((current, last.to_string())))
}

fn step_mut<'a>(value: &'a mut Bson, segment: &str, path: &str, create: bool) -> Result<&'a mut Bson> {
    match value {
        Bson::Document(sub) => {
            if sub.get(segment).is_none() {
                if !create {
                    return Err(Error::IllegalFieldPath(path.to_string()));
                }
                sub.insert(segment, Document::new());
            }
            sub.get_mut(segment).ok_or_else(|| Error::IllegalFieldPath(path.to_string()))
        }
        Bson::Array(arr) => {
            let index = segment.parse::<usize>().map_err(|_| Error::IllegalFieldPath(path.to_string()))?;
            arr.get_mut(index).ok_or_else(|| Error::IllegalFieldPath(path.to_string()))
        }
        other => Err(FieldTypeUnexpectedStruct {
            field_name: segment.to_string(),
            expected_ty: "Document".into(),
            actual_ty: type_name(other),
        }.into()),
    }
}

/// Write `value` at `path`, creating intermediate documents when needed.
pub(crate) fn set_path(doc: &mut Document, path: &str, value: Bson) -> Result<()> {
    match get_container_mut(doc, path, true)? {
        None => {
            doc.insert(path, value);
            Ok(())
        }
        Some((container, last)) => match container {
            Bson::Document(sub) => {
                sub.insert(last, value);
                Ok(())
            }
            Bson::Array(arr) => {
                let index = last.parse::<usize>().map_err(|_| Error::IllegalFieldPath(path.to_string()))?;
                if index < arr.len() {
                    arr[index] = value;
                } else if index - arr.len() <= MAX_ARRAY_GAP {
                    arr.resize(index, Bson::Null);
                    arr.push(value);
                } else {
                    return Err(Error::ValidationError(format!(
                        "can not write '{}', index {} is more than {} past the end of an array of {}",
                        path, index, MAX_ARRAY_GAP, arr.len(),
                    )));
                }
                Ok(())
            }
            other => Err(FieldTypeUnexpectedStruct {
                field_name: path.to_string(),
                expected_ty: "Document".into(),
                actual_ty: type_name(other),
            }.into()),
        },
    }
}

/// Remove the value at `path`. Missing parents are not an error.
pub(crate) fn remove_path(doc: &mut Document, path: &str) -> Option<Bson> {
    match get_container_mut(doc, path, false) {
        Ok(None) => doc.remove(path),
        Ok(Some((Bson::Document(sub), last))) => sub.remove(last),
        Ok(Some((Bson::Array(arr), last))) => {
            let index = last.parse::<usize>().ok()?;
            let slot = arr.get_mut(index)?;
            Some(std::mem::replace(slot, Bson::Null))
        }
        _ => None,
    }
}

/// Visit every value stored at `path`, descending through arrays on the
/// way and into the elements of an array found at the end.
pub(crate) fn for_each_path_value_mut<F>(doc: &mut Document, path: &[String], f: &mut F) -> Result<()>
where
    F: FnMut(&mut Bson) -> Result<()>,
{
    let (first, remains) = match path.split_first() {
        Some(pair) => pair,
        None => return Ok(()),
    };
    match doc.get_mut(first) {
        Some(value) => visit_value_mut(value, remains, f),
        None => Ok(()),
    }
}

fn visit_value_mut<F>(value: &mut Bson, path: &[String], f: &mut F) -> Result<()>
where
    F: FnMut(&mut Bson) -> Result<()>,
{
    if path.is_empty() {
        if let Bson::Array(arr) = value {
            for item in arr.iter_mut() {
                f(item)?;
            }
            return Ok(());
        }
        return f(value);
    }
    match value {
        Bson::Document(sub) => for_each_path_value_mut(sub, path, f),
        Bson::Array(arr) => {
            for item in arr.iter_mut() {
                if let Bson::Document(sub) = item {
                    for_each_path_value_mut(sub, path, f)?;
                }
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use bson::{bson, doc, Bson};
    use super::*;

    #[test]
    fn test_resolve_path_through_arrays() {
        let doc = doc! {
            "title": "Issues",
            "songs": [
                { "title": "Dead" },
                { "title": "Falling Away From Me" },
            ],
        };
        let values = resolve_path(&doc, "songs.title");
        assert_eq!(values, vec![&bson!("Dead"), &bson!("Falling Away From Me")]);

        let values = resolve_path(&doc, "songs.1.title");
        assert_eq!(values, vec![&bson!("Falling Away From Me")]);

        assert!(resolve_path(&doc, "year").is_empty());
    }

    #[test]
    fn test_set_and_remove_nested() {
        let mut doc = doc! { "a": 1 };
        set_path(&mut doc, "b.c", Bson::Int32(2)).unwrap();
        assert_eq!(doc, doc! { "a": 1, "b": { "c": 2 } });

        assert_eq!(remove_path(&mut doc, "b.c"), Some(Bson::Int32(2)));
        assert_eq!(doc, doc! { "a": 1, "b": {} });
        assert_eq!(remove_path(&mut doc, "x.y"), None);
    }

    #[test]
    fn test_set_path_pads_arrays() {
        let mut doc = doc! { "tags": ["nu"] };
        set_path(&mut doc, "tags.3", Bson::String("metal".into())).unwrap();
        assert_eq!(doc, doc! { "tags": ["nu", null, null, "metal"] });

        let result = set_path(&mut doc, "tags.4000000000", Bson::Int32(1));
        assert!(matches!(result, Err(Error::ValidationError(_))));
        assert_eq!(doc.get_array("tags").unwrap().len(), 4);
    }

    #[test]
    fn test_set_path_into_scalar_fails() {
        let mut doc = doc! { "a": 1 };
        assert!(set_path(&mut doc, "a.b", Bson::Int32(2)).is_err());
    }

    #[test]
    fn test_validate_field_path() {
        assert!(validate_field_path("songs.title").is_ok());
        assert!(validate_field_path("").is_err());
        assert!(validate_field_path("a..b").is_err());
        assert!(validate_field_path("$where").is_err());
    }
}
