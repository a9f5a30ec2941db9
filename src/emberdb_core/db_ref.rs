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

use bson::{doc, Bson, Document};
use serde::{Deserialize, Serialize};

/// A reference from one document to a document of another collection,
/// stored as `{ "$id": <id>, "$ref": <collection> }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbRef {
    #[serde(rename = "$id")]
    pub id: Bson,
    #[serde(rename = "$ref")]
    pub collection: String,
}

impl DbRef {

    pub fn new(collection: impl Into<String>, id: impl Into<Bson>) -> DbRef {
        DbRef {
            id: id.into(),
            collection: collection.into(),
        }
    }

    /// Recognize the stored form. Extra keys disqualify the document.
    pub fn from_document(doc: &Document) -> Option<DbRef> {
        if doc.len() != 2 {
            return None;
        }
        let id = doc.get("$id")?;
        let collection = doc.get_str("$ref").ok()?;
        Some(DbRef {
            id: id.clone(),
            collection: collection.to_string(),
        })
    }

    pub fn from_bson(value: &Bson) -> Option<DbRef> {
        match value {
            Bson::Document(doc) => DbRef::from_document(doc),
            _ => None,
        }
    }

    pub fn to_document(&self) -> Document {
        doc! {
            "$id": self.id.clone(),
            "$ref": self.collection.clone(),
        }
    }

}

impl From<DbRef> for Bson {

    fn from(value: DbRef) -> Self {
        Bson::Document(value.to_document())
    }

}
