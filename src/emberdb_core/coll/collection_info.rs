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

use bson::Document;
use indexmap::IndexMap;
use log::debug;
use crate::index::IndexInfo;

/// Everything stored under one collection name: the documents keyed by
/// their encoded primary key, in insertion order, and the indexes keyed by
/// field path, in declaration order.
#[derive(Debug)]
pub(crate) struct CollectionSpecification {
    name: String,
    pub(crate) documents: IndexMap<Vec<u8>, Document>,
    pub(crate) indexes: IndexMap<String, IndexInfo>,
}

impl CollectionSpecification {

    pub(crate) fn new(name: String) -> CollectionSpecification {
        CollectionSpecification {
            name,
            documents: IndexMap::new(),
            indexes: IndexMap::new(),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// A collection with neither documents nor indexes is not listed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty() && self.indexes.is_empty()
    }

    /// Insert or replace. A replaced document keeps its position.
    pub fn put(&mut self, pkey: Vec<u8>, doc: Document) {
        if let Some(old) = self.documents.get(&pkey) {
            for index in self.indexes.values_mut() {
                index.remove(&pkey, old);
            }
        }
        for index in self.indexes.values_mut() {
            index.insert(&pkey, &doc);
        }
        self.documents.insert(pkey, doc);
    }

    pub fn remove(&mut self, pkey: &[u8]) -> Option<Document> {
        let doc = self.documents.shift_remove(pkey)?;
        for index in self.indexes.values_mut() {
            index.remove(pkey, &doc);
        }
        Some(doc)
    }

    /// Remove every document, keep the index declarations.
    pub fn clear(&mut self) {
        self.documents.clear();
        for index in self.indexes.values_mut() {
            index.clear();
        }
    }

    /// Returns `false` when the index already exists.
    pub fn create_index(&mut self, field: &str) -> bool {
        if self.indexes.contains_key(field) {
            return false;
        }
        let mut index = IndexInfo::new(field.to_string());
        for (pkey, doc) in self.documents.iter() {
            index.insert(pkey, doc);
        }
        debug!("index '{}' built on {} documents of '{}'", field, self.documents.len(), self.name);
        self.indexes.insert(field.to_string(), index);
        true
    }

    pub fn drop_index(&mut self, field: &str) -> bool {
        self.indexes.shift_remove(field).is_some()
    }

}
