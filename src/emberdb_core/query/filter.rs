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

//! Filter documents compiled into an expression tree.
//!
//! A filter is a document such as
//! `{ "year": { "$gte": 2000 }, "songs.title": "Dead" }`. Top-level keys are
//! either dotted field paths or one of the logical operators `$and`, `$or`
//! and `$nor`. [`Filter::compile`] turns the document into a [`Filter`] once,
//! then [`Filter::matches`] evaluates it against every candidate document.

use bson::{Bson, Document, Regex as BsonRegex};
use regex::{Regex, RegexBuilder};
use std::cmp::Ordering;
use crate::{BsonMapper, Error, Result};
use crate::errors::RegexError;
use crate::utils::bson::{bson_equals, compare_bson, type_bracket};
use crate::utils::path::resolve_path;

#[derive(Debug, Clone)]
pub(crate) enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Nor(Vec<Filter>),
    Field { path: String, condition: Condition },
}

#[derive(Debug, Clone)]
pub(crate) enum Condition {
    Eq(Bson),
    Ne(Bson),
    Gt(Bson),
    Gte(Bson),
    Lt(Bson),
    Lte(Bson),
    In(Vec<Bson>),
    Nin(Vec<Bson>),
    All(Vec<Bson>),
    Exists(bool),
    Regex(Regex),
    Size(usize),
    ElemMatchDoc(Box<Filter>),
    ElemMatchValue(Vec<Condition>),
    Not(Vec<Condition>),
}

fn is_operator(key: &str) -> bool {
    key.starts_with('$')
}

fn as_filter_array<'a>(op: &str, value: &'a Bson) -> Result<Vec<&'a Document>> {
    let arr = match value {
        Bson::Array(arr) if !arr.is_empty() => arr,
        _ => return Err(Error::ValidationError(format!("{} requires a non-empty array", op))),
    };
    let mut result = Vec::with_capacity(arr.len());
    for item in arr {
        match item {
            Bson::Document(doc) => result.push(doc),
            _ => return Err(Error::ValidationError(format!("every element of {} must be a document", op))),
        }
    }
    Ok(result)
}

fn as_value_array(op: &str, value: &Bson) -> Result<Vec<Bson>> {
    match value {
        Bson::Array(arr) => Ok(arr.clone()),
        _ => Err(Error::ValidationError(format!("{} requires an array", op))),
    }
}

fn compile_regex(pattern: &str, options: &str) -> Result<Regex> {
    let mut builder = RegexBuilder::new(pattern);
    for option in options.chars() {
        match option {
            'i' => { builder.case_insensitive(true); }
            'm' => { builder.multi_line(true); }
            's' => { builder.dot_matches_new_line(true); }
            'x' => { builder.ignore_whitespace(true); }
            _ => {
                return Err(RegexError {
                    error: format!("unknown option '{}'", option),
                    expression: pattern.to_string(),
                    options: options.to_string(),
                }.into());
            }
        }
    }
    builder.build().map_err(|err| RegexError {
        error: err.to_string(),
        expression: pattern.to_string(),
        options: options.to_string(),
    }.into())
}

impl Filter {

    pub fn compile(doc: &Document) -> Result<Filter> {
        let mut parts = Vec::with_capacity(doc.len());

        for (key, value) in doc.iter() {
            match key.as_str() {
                "$and" => {
                    let children = Filter::compile_all("$and", value)?;
                    parts.push(Filter::And(children));
                }
                "$or" => {
                    let children = Filter::compile_all("$or", value)?;
                    parts.push(Filter::Or(children));
                }
                "$nor" => {
                    let children = Filter::compile_all("$nor", value)?;
                    parts.push(Filter::Nor(children));
                }
                _ if is_operator(key) => {
                    return Err(Error::UnknownQueryOperator(key.clone()));
                }
                _ => Filter::compile_field(key, value, &mut parts)?,
            }
        }

        if parts.len() == 1 {
            return Ok(parts.remove(0));
        }
        Ok(Filter::And(parts))
    }

    fn compile_all(op: &str, value: &Bson) -> Result<Vec<Filter>> {
        as_filter_array(op, value)?
            .into_iter()
            .map(Filter::compile)
            .collect()
    }

    fn compile_field(path: &str, value: &Bson, parts: &mut Vec<Filter>) -> Result<()> {
        if path.is_empty() {
            return Err(Error::IllegalFieldPath(path.to_string()));
        }
        let conditions = match value {
            Bson::Document(doc) if doc.keys().next().map(|k| is_operator(k)).unwrap_or(false) => {
                Condition::compile_operators(doc)?
            }
            Bson::RegularExpression(re) => vec![Condition::from_bson_regex(re)?],
            _ => vec![Condition::Eq(value.clone())],
        };
        for condition in conditions {
            parts.push(Filter::Field {
                path: path.to_string(),
                condition,
            });
        }
        Ok(())
    }

    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Filter::And(children) => children.iter().all(|child| child.matches(doc)),
            Filter::Or(children) => children.iter().any(|child| child.matches(doc)),
            Filter::Nor(children) => !children.iter().any(|child| child.matches(doc)),
            Filter::Field { path, condition } => {
                let values = resolve_path(doc, path);
                condition.matches_values(&values)
            }
        }
    }

    /// Run the constants of the filter through `mapper`, so they compare
    /// against values the way the mapper stores them.
    pub fn bind(&mut self, mapper: &BsonMapper) -> Result<()> {
        self.bind_at("", mapper)
    }

    fn bind_at(&mut self, prefix: &str, mapper: &BsonMapper) -> Result<()> {
        match self {
            Filter::And(children) | Filter::Or(children) | Filter::Nor(children) => {
                for child in children.iter_mut() {
                    child.bind_at(prefix, mapper)?;
                }
                Ok(())
            }
            Filter::Field { path, condition } => {
                if prefix.is_empty() {
                    condition.bind(path, mapper)
                } else {
                    condition.bind(&format!("{}.{}", prefix, path), mapper)
                }
            }
        }
    }

    /// Whether the filter accepts every document.
    pub fn is_empty(&self) -> bool {
        matches!(self, Filter::And(children) if children.is_empty())
    }

}

/// Every value a comparison is tried on: the resolved values and, for
/// arrays, their elements.
fn candidates<'a>(values: &[&'a Bson]) -> Vec<&'a Bson> {
    let mut result = Vec::with_capacity(values.len());
    for value in values {
        result.push(*value);
        if let Bson::Array(arr) = value {
            result.extend(arr.iter());
        }
    }
    result
}

fn range_matches(values: &[&Bson], target: &Bson, accept: fn(Ordering) -> bool) -> bool {
    let bracket = type_bracket(target);
    candidates(values)
        .into_iter()
        .filter(|value| !matches!(value, Bson::Array(_)) && type_bracket(value) == bracket)
        .any(|value| accept(compare_bson(value, target)))
}

fn eq_matches(values: &[&Bson], target: &Bson) -> bool {
    if let Bson::Null = target {
        return values.is_empty() || candidates(values).into_iter().any(|value| matches!(value, Bson::Null));
    }
    candidates(values).into_iter().any(|value| bson_equals(value, target))
}

impl Condition {

    fn compile_operators(doc: &Document) -> Result<Vec<Condition>> {
        let mut result = Vec::with_capacity(doc.len());

        for (key, value) in doc.iter() {
            let condition = match key.as_str() {
                "$eq" => Condition::Eq(value.clone()),
                "$ne" => Condition::Ne(value.clone()),
                "$gt" => Condition::Gt(value.clone()),
                "$gte" => Condition::Gte(value.clone()),
                "$lt" => Condition::Lt(value.clone()),
                "$lte" => Condition::Lte(value.clone()),
                "$in" => Condition::In(as_value_array("$in", value)?),
                "$nin" => Condition::Nin(as_value_array("$nin", value)?),
                "$all" => Condition::All(as_value_array("$all", value)?),
                "$exists" => {
                    let exists = match value {
                        Bson::Boolean(bl) => *bl,
                        Bson::Int32(i) => *i != 0,
                        Bson::Int64(i) => *i != 0,
                        _ => return Err(Error::ValidationError("$exists requires a boolean".to_string())),
                    };
                    Condition::Exists(exists)
                }
                "$regex" => {
                    let options = match doc.get("$options") {
                        Some(Bson::String(options)) => options.as_str(),
                        Some(_) => return Err(Error::ValidationError("$options requires a string".to_string())),
                        None => "",
                    };
                    match value {
                        Bson::String(pattern) => Condition::Regex(compile_regex(pattern, options)?),
                        Bson::RegularExpression(re) => {
                            let mut merged = re.options.clone();
                            merged.push_str(options);
                            Condition::Regex(compile_regex(&re.pattern, &merged)?)
                        }
                        _ => return Err(Error::ValidationError("$regex requires a string".to_string())),
                    }
                }
                "$options" => {
                    if !doc.contains_key("$regex") {
                        return Err(Error::ValidationError("$options needs a $regex".to_string()));
                    }
                    continue;
                }
                "$size" => {
                    let size = match value {
                        Bson::Int32(i) if *i >= 0 => *i as usize,
                        Bson::Int64(i) if *i >= 0 => *i as usize,
                        _ => return Err(Error::ValidationError("$size requires a non-negative integer".to_string())),
                    };
                    Condition::Size(size)
                }
                "$elemMatch" => {
                    let sub = match value {
                        Bson::Document(sub) => sub,
                        _ => return Err(Error::ValidationError("$elemMatch requires a document".to_string())),
                    };
                    let is_value_match = sub.keys().next()
                        .map(|k| is_operator(k) && !matches!(k.as_str(), "$and" | "$or" | "$nor"))
                        .unwrap_or(false);
                    if is_value_match {
                        Condition::ElemMatchValue(Condition::compile_operators(sub)?)
                    } else {
                        Condition::ElemMatchDoc(Box::new(Filter::compile(sub)?))
                    }
                }
                "$not" => match value {
                    Bson::Document(sub) if !sub.is_empty() => Condition::Not(Condition::compile_operators(sub)?),
                    Bson::RegularExpression(re) => Condition::Not(vec![Condition::from_bson_regex(re)?]),
                    _ => return Err(Error::ValidationError("$not requires an operator document".to_string())),
                },
                _ if is_operator(key) => return Err(Error::UnknownQueryOperator(key.clone())),
                _ => {
                    return Err(Error::ValidationError(format!(
                        "field '{}' can not be mixed with operators", key
                    )));
                }
            };
            result.push(condition);
        }

        Ok(result)
    }

    fn bind(&mut self, path: &str, mapper: &BsonMapper) -> Result<()> {
        match self {
            Condition::Eq(value)
            | Condition::Ne(value)
            | Condition::Gt(value)
            | Condition::Gte(value)
            | Condition::Lt(value)
            | Condition::Lte(value) => {
                let taken = std::mem::replace(value, Bson::Null);
                *value = mapper.write_field_value(path, taken)?;
            }
            Condition::In(values) | Condition::Nin(values) | Condition::All(values) => {
                for value in values.iter_mut() {
                    let taken = std::mem::replace(value, Bson::Null);
                    *value = mapper.write_field_value(path, taken)?;
                }
            }
            Condition::ElemMatchDoc(filter) => filter.bind_at(path, mapper)?,
            Condition::ElemMatchValue(conditions) | Condition::Not(conditions) => {
                for condition in conditions.iter_mut() {
                    condition.bind(path, mapper)?;
                }
            }
            Condition::Exists(_) | Condition::Regex(_) | Condition::Size(_) => (),
        }
        Ok(())
    }

    fn from_bson_regex(re: &BsonRegex) -> Result<Condition> {
        Ok(Condition::Regex(compile_regex(&re.pattern, &re.options)?))
    }

    pub fn matches_values(&self, values: &[&Bson]) -> bool {
        match self {
            Condition::Eq(target) => eq_matches(values, target),
            Condition::Ne(target) => !eq_matches(values, target),
            Condition::Gt(target) => range_matches(values, target, |ord| ord == Ordering::Greater),
            Condition::Gte(target) => range_matches(values, target, |ord| ord != Ordering::Less),
            Condition::Lt(target) => range_matches(values, target, |ord| ord == Ordering::Less),
            Condition::Lte(target) => range_matches(values, target, |ord| ord != Ordering::Greater),
            Condition::In(targets) => targets.iter().any(|target| eq_matches(values, target)),
            Condition::Nin(targets) => !targets.iter().any(|target| eq_matches(values, target)),
            Condition::All(targets) => {
                !targets.is_empty() && targets.iter().all(|target| eq_matches(values, target))
            }
            Condition::Exists(exists) => values.is_empty() != *exists,
            Condition::Regex(re) => candidates(values).into_iter().any(|value| match value {
                Bson::String(str) => re.is_match(str),
                _ => false,
            }),
            Condition::Size(size) => values.iter().any(|value| match value {
                Bson::Array(arr) => arr.len() == *size,
                _ => false,
            }),
            Condition::ElemMatchDoc(filter) => values.iter().any(|value| match value {
                Bson::Array(arr) => arr.iter().any(|item| match item {
                    Bson::Document(doc) => filter.matches(doc),
                    _ => false,
                }),
                _ => false,
            }),
            Condition::ElemMatchValue(conditions) => values.iter().any(|value| match value {
                Bson::Array(arr) => arr.iter().any(|item| {
                    conditions.iter().all(|condition| condition.matches_values(&[item]))
                }),
                _ => false,
            }),
            Condition::Not(conditions) => {
                !conditions.iter().all(|condition| condition.matches_values(values))
            }
        }
    }

}

#[cfg(test)]
mod tests {
    use bson::{doc, Document};
    use crate::Error;
    use super::Filter;

    fn issues() -> Document {
        doc! {
            "_id": 1,
            "title": "Issues",
            "year": 1999,
            "tags": ["nu", "metal"],
            "songs": [
                { "track_number": 1, "title": "Dead", "length": 72000_i64 },
                { "track_number": 2, "title": "Falling Away From Me", "length": 270000_i64 },
            ],
        }
    }

    fn check(filter: Document) -> bool {
        Filter::compile(&filter).unwrap().matches(&issues())
    }

    #[test]
    fn test_equality_and_ranges() {
        assert!(check(doc! {}));
        assert!(check(doc! { "title": "Issues" }));
        assert!(!check(doc! { "title": "issues" }));
        assert!(check(doc! { "year": 1999_i64 }));
        assert!(check(doc! { "year": { "$gte": 1999, "$lt": 2000.5 } }));
        assert!(!check(doc! { "year": { "$gte": 2000 } }));
        // ranges do not cross types
        assert!(!check(doc! { "year": { "$gt": "1000" } }));
        assert!(check(doc! { "year": { "$ne": 2000 } }));
    }

    #[test]
    fn test_nested_paths() {
        assert!(check(doc! { "songs.title": "Falling Away From Me" }));
        assert!(!check(doc! { "songs.title": "Trash" }));
        assert!(check(doc! { "songs.length": { "$gt": 200000 } }));
        assert!(check(doc! { "songs.0.title": "Dead" }));
        assert!(check(doc! { "tags": "metal" }));
        assert!(check(doc! { "tags": ["nu", "metal"] }));
    }

    #[test]
    fn test_null_and_exists() {
        assert!(check(doc! { "artist": null }));
        assert!(!check(doc! { "title": null }));
        assert!(check(doc! { "artist": { "$exists": false } }));
        assert!(check(doc! { "songs": { "$exists": true } }));
    }

    #[test]
    fn test_logical_operators() {
        assert!(check(doc! { "$or": [ { "year": 2000 }, { "title": "Issues" } ] }));
        assert!(!check(doc! { "$and": [ { "year": 1999 }, { "title": "Untouchables" } ] }));
        assert!(check(doc! { "$nor": [ { "year": 2000 } ] }));
        assert!(check(doc! { "year": { "$not": { "$gt": 2000 } } }));
    }

    #[test]
    fn test_array_operators() {
        assert!(check(doc! { "year": { "$in": [1998, 1999] } }));
        assert!(check(doc! { "year": { "$nin": [2000] } }));
        assert!(check(doc! { "tags": { "$all": ["metal", "nu"] } }));
        assert!(check(doc! { "tags": { "$size": 2 } }));
        assert!(check(doc! { "songs": { "$elemMatch": { "track_number": 2, "title": { "$regex": "^fall", "$options": "i" } } } }));
        assert!(!check(doc! { "songs": { "$elemMatch": { "track_number": 1, "title": "Falling Away From Me" } } }));
    }

    #[test]
    fn test_regex() {
        assert!(check(doc! { "title": { "$regex": "^Iss" } }));
        assert!(!check(doc! { "title": { "$regex": "^iss" } }));
        assert!(check(doc! { "title": bson::Regex { pattern: "^iss".to_string(), options: "i".to_string() } }));
    }

    #[test]
    fn test_invalid_filters() {
        let err = Filter::compile(&doc! { "year": { "$between": [1, 2] } }).unwrap_err();
        assert!(matches!(err, Error::UnknownQueryOperator(_)));

        let err = Filter::compile(&doc! { "$where": "true" }).unwrap_err();
        assert!(matches!(err, Error::UnknownQueryOperator(_)));

        let err = Filter::compile(&doc! { "year": { "$in": 1999 } }).unwrap_err();
        assert!(matches!(err, Error::ValidationError(_)));

        let err = Filter::compile(&doc! { "$or": [] }).unwrap_err();
        assert!(matches!(err, Error::ValidationError(_)));
    }
}
