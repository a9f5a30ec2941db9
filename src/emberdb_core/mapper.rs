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

//! Conversion between typed values and stored documents.
//!
//! [`BsonMapper`] runs on both sides of a collection: typed values go
//! through `bson`'s serde support and then through the mapper's policies
//! before they are stored, and stored documents go through the same
//! policies again before they are deserialized. Applying every policy on
//! both paths keeps a round trip stable.

use bson::{Bson, Document};
use serde::de::DeserializeOwned;
use serde::Serialize;
use crate::db_ref::DbRef;
use crate::{Error, Result};

#[derive(Debug, Clone)]
struct EnumRegistration {
    path: Vec<String>,
    variants: &'static [&'static str],
}

#[derive(Debug, Clone)]
struct RefRegistration {
    path: Vec<String>,
    collection: String,
}

#[derive(Debug, Clone)]
pub struct BsonMapper {
    /// Store registered enum fields as their ordinal instead of their name.
    pub enum_as_integer: bool,
    /// Keep document fields whose value is null.
    pub serialize_null_values: bool,
    /// Trim leading and trailing whitespace of strings.
    pub trim_whitespace: bool,
    /// Turn empty strings into null.
    pub empty_string_to_null: bool,
    enums: Vec<EnumRegistration>,
    refs: Vec<RefRegistration>,
}

impl Default for BsonMapper {

    fn default() -> Self {
        BsonMapper {
            enum_as_integer: false,
            serialize_null_values: false,
            trim_whitespace: true,
            empty_string_to_null: true,
            enums: Vec::new(),
            refs: Vec::new(),
        }
    }

}

fn split_path(path: &str) -> Vec<String> {
    path.split('.').map(|s| s.to_string()).collect()
}

impl BsonMapper {

    pub fn new() -> BsonMapper {
        BsonMapper::default()
    }

    /// Declare the field at `path` as an enum with the given variant names,
    /// in declaration order. The ordinal of a variant is its position.
    pub fn register_enum(&mut self, path: &str, variants: &'static [&'static str]) -> &mut Self {
        self.enums.push(EnumRegistration {
            path: split_path(path),
            variants,
        });
        self
    }

    /// Declare the field at `path` as a reference into `collection`. A
    /// document written there is stored as a [`DbRef`] to its `_id`.
    pub fn register_ref(&mut self, path: &str, collection: &str) -> &mut Self {
        self.refs.push(RefRegistration {
            path: split_path(path),
            collection: collection.to_string(),
        });
        self
    }

    pub fn to_document<T: Serialize>(&self, value: &T) -> Result<Document> {
        let doc = bson::to_document(value)?;
        self.write(doc)
    }

    /// Apply the write policies to a document built inside the store, such
    /// as the result of an update.
    pub(crate) fn write(&self, doc: Document) -> Result<Document> {
        let mut path = Vec::new();
        self.write_document(&mut path, doc)
    }

    /// Apply the write policies to a value compared against or stored at
    /// the field `path`. Array positions in the path are skipped.
    pub(crate) fn write_field_value(&self, path: &str, value: Bson) -> Result<Bson> {
        let mut segments = path.split('.')
            .filter(|segment| segment.parse::<usize>().is_err())
            .map(|segment| segment.to_string())
            .collect::<Vec<String>>();
        self.write_value(&mut segments, value)
    }

    pub fn from_document<T: DeserializeOwned>(&self, doc: Document) -> Result<T> {
        let mut path = Vec::new();
        let doc = self.read_document(&mut path, doc)?;
        let value = bson::from_document::<T>(doc)?;
        Ok(value)
    }

    fn find_enum(&self, path: &[String]) -> Option<&EnumRegistration> {
        self.enums.iter().find(|reg| reg.path == path)
    }

    fn find_ref(&self, path: &[String]) -> Option<&RefRegistration> {
        self.refs.iter().find(|reg| reg.path == path)
    }

    fn convert_string(&self, value: String) -> Bson {
        let value = if self.trim_whitespace {
            let trimmed = value.trim();
            if trimmed.len() == value.len() {
                value
            } else {
                trimmed.to_string()
            }
        } else {
            value
        };
        if self.empty_string_to_null && value.is_empty() {
            return Bson::Null;
        }
        Bson::String(value)
    }

    fn write_document(&self, path: &mut Vec<String>, doc: Document) -> Result<Document> {
        let mut result = Document::new();
        for (key, value) in doc {
            path.push(key.clone());
            let value = self.write_value(path, value);
            path.pop();
            let value = value?;

            if value == Bson::Null && !self.serialize_null_values {
                continue;
            }
            result.insert(key, value);
        }
        Ok(result)
    }

    fn write_value(&self, path: &mut Vec<String>, value: Bson) -> Result<Bson> {
        if let Some(reg) = self.find_ref(path) {
            return Ok(write_ref(reg, value));
        }
        match value {
            Bson::String(str) => {
                let value = self.convert_string(str);
                match (self.find_enum(path), value) {
                    (Some(reg), Bson::String(name)) if self.enum_as_integer => {
                        let ordinal = reg.variants.iter().position(|v| *v == name).ok_or_else(|| {
                            Error::ValidationError(format!("'{}' is not a variant of enum field '{}'", name, path.join(".")))
                        })?;
                        Ok(Bson::Int32(ordinal as i32))
                    }
                    (_, value) => Ok(value),
                }
            }
            Bson::Document(doc) => Ok(Bson::Document(self.write_document(path, doc)?)),
            Bson::Array(arr) => {
                let mut result = Vec::with_capacity(arr.len());
                for item in arr {
                    result.push(self.write_value(path, item)?);
                }
                Ok(Bson::Array(result))
            }
            other => Ok(other),
        }
    }

    fn read_document(&self, path: &mut Vec<String>, doc: Document) -> Result<Document> {
        let mut result = Document::new();
        for (key, value) in doc {
            path.push(key.clone());
            let value = self.read_value(path, value);
            path.pop();
            let value = value?;

            if value == Bson::Null && !self.serialize_null_values {
                continue;
            }
            result.insert(key, value);
        }
        Ok(result)
    }

    fn read_value(&self, path: &mut Vec<String>, value: Bson) -> Result<Bson> {
        if self.find_ref(path).is_some() {
            return Ok(read_ref(value));
        }
        if let Some(reg) = self.find_enum(path) {
            let ordinal = match &value {
                Bson::Int32(i) => Some(*i as i64),
                Bson::Int64(i) => Some(*i),
                _ => None,
            };
            if let Some(ordinal) = ordinal {
                let name = usize::try_from(ordinal).ok()
                    .and_then(|index| reg.variants.get(index))
                    .ok_or_else(|| {
                        Error::ValidationError(format!("{} is not an ordinal of enum field '{}'", ordinal, path.join(".")))
                    })?;
                return Ok(Bson::String(name.to_string()));
            }
        }
        match value {
            Bson::String(str) => Ok(self.convert_string(str)),
            Bson::Document(doc) => Ok(Bson::Document(self.read_document(path, doc)?)),
            Bson::Array(arr) => {
                let mut result = Vec::with_capacity(arr.len());
                for item in arr {
                    result.push(self.read_value(path, item)?);
                }
                Ok(Bson::Array(result))
            }
            other => Ok(other),
        }
    }

}

fn write_ref(reg: &RefRegistration, value: Bson) -> Bson {
    match value {
        Bson::Array(arr) => Bson::Array(arr.into_iter().map(|item| write_ref(reg, item)).collect()),
        Bson::Document(doc) => {
            if DbRef::from_document(&doc).is_some() {
                return Bson::Document(doc);
            }
            match doc.get("_id") {
                Some(id) => DbRef::new(reg.collection.clone(), id.clone()).into(),
                None => Bson::Document(doc),
            }
        }
        other => other,
    }
}

/// A reference that was not materialized reads back as a stub holding the
/// id only.
fn read_ref(value: Bson) -> Bson {
    match value {
        Bson::Array(arr) => Bson::Array(arr.into_iter().map(read_ref).collect()),
        Bson::Document(doc) => match DbRef::from_document(&doc) {
            Some(db_ref) => {
                let mut stub = Document::new();
                stub.insert("_id", db_ref.id);
                Bson::Document(stub)
            }
            None => Bson::Document(doc),
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use bson::{doc, Bson};
    use serde::{Deserialize, Serialize};
    use crate::mapper::BsonMapper;

    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    enum Genre {
        Rock,
        Metal,
        Jazz,
    }

    const GENRES: &[&str] = &["Rock", "Metal", "Jazz"];

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Record {
        title: String,
        year: Option<i32>,
        genre: Genre,
        tags: Vec<Option<String>>,
    }

    fn record() -> Record {
        Record {
            title: " Issues ".to_string(),
            year: None,
            genre: Genre::Metal,
            tags: vec![Some("nu".to_string()), None],
        }
    }

    #[test]
    fn test_default_policies() {
        let mapper = BsonMapper::default();
        let doc = mapper.to_document(&record()).unwrap();
        assert_eq!(doc, doc! {
            "title": "Issues",
            "genre": "Metal",
            "tags": ["nu", Bson::Null],
        });

        let back: Record = mapper.from_document(doc).unwrap();
        assert_eq!(back.title, "Issues");
        assert_eq!(back.year, None);
        assert_eq!(back.tags, vec![Some("nu".to_string()), None]);
    }

    #[test]
    fn test_keep_strings_and_nulls() {
        let mut mapper = BsonMapper::default();
        mapper.serialize_null_values = true;
        mapper.trim_whitespace = false;
        mapper.empty_string_to_null = false;

        let mut value = record();
        value.tags = vec![Some(String::new())];
        let doc = mapper.to_document(&value).unwrap();
        assert_eq!(doc, doc! {
            "title": " Issues ",
            "year": Bson::Null,
            "genre": "Metal",
            "tags": [""],
        });

        let back: Record = mapper.from_document(doc).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_empty_string_becomes_absent() {
        let mapper = BsonMapper::default();
        let doc = mapper.to_document(&doc! { "a": "  ", "b": "x" }).unwrap();
        assert_eq!(doc, doc! { "b": "x" });
    }

    #[test]
    fn test_enum_as_integer_round_trip() {
        let mut mapper = BsonMapper::default();
        mapper.enum_as_integer = true;
        mapper.register_enum("genre", GENRES);

        let doc = mapper.to_document(&record()).unwrap();
        assert_eq!(doc.get("genre"), Some(&Bson::Int32(1)));

        let back: Record = mapper.from_document(doc).unwrap();
        assert_eq!(back.genre, Genre::Metal);
    }

    #[test]
    fn test_enum_reads_both_forms() {
        let mut mapper = BsonMapper::default();
        mapper.register_enum("genre", GENRES);

        let by_name: Record = mapper.from_document(doc! {
            "title": "a", "genre": "Jazz", "tags": [],
        }).unwrap();
        assert_eq!(by_name.genre, Genre::Jazz);

        let by_ordinal: Record = mapper.from_document(doc! {
            "title": "a", "genre": 0, "tags": [],
        }).unwrap();
        assert_eq!(by_ordinal.genre, Genre::Rock);

        let out_of_range = mapper.from_document::<Record>(doc! {
            "title": "a", "genre": 7, "tags": [],
        });
        assert!(out_of_range.is_err());
    }

    #[test]
    fn test_enum_inside_array() {
        let mut mapper = BsonMapper::default();
        mapper.enum_as_integer = true;
        mapper.register_enum("songs.genre", GENRES);

        let doc = mapper.to_document(&doc! {
            "songs": [ { "genre": "Jazz" }, { "genre": "Rock" } ],
        }).unwrap();
        assert_eq!(doc, doc! {
            "songs": [ { "genre": 2 }, { "genre": 0 } ],
        });
    }

    #[test]
    fn test_ref_fields() {
        let mut mapper = BsonMapper::default();
        mapper.register_ref("artist", "artists");

        let doc = mapper.to_document(&doc! {
            "title": "Issues",
            "artist": { "_id": 7, "name": "Korn" },
        }).unwrap();
        assert_eq!(doc, doc! {
            "title": "Issues",
            "artist": { "$id": 7, "$ref": "artists" },
        });

        let back: bson::Document = mapper.from_document(doc).unwrap();
        assert_eq!(back, doc! {
            "title": "Issues",
            "artist": { "_id": 7 },
        });
    }
}
