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

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use bson::{Bson, Document};
use crate::utils::bson::compare_bson;
use crate::utils::path::{flatten_arrays, resolve_path};

/// A value as an index key, ordered by [`compare_bson`].
#[derive(Debug, Clone)]
pub(crate) struct IndexKey(pub Bson);

impl PartialEq for IndexKey {
    fn eq(&self, other: &Self) -> bool {
        compare_bson(&self.0, &other.0) == Ordering::Equal
    }
}

impl Eq for IndexKey {}

impl PartialOrd for IndexKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for IndexKey {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_bson(&self.0, &other.0)
    }
}

/// In-memory secondary index over one dotted field path.
///
/// Every scalar found at the path is a key; arrays contribute each of
/// their elements (multikey). Embedded documents and nested arrays are not
/// indexed.
#[derive(Debug, Clone)]
pub(crate) struct IndexInfo {
    field: String,
    entries: BTreeMap<IndexKey, BTreeSet<Vec<u8>>>,
}

impl IndexInfo {

    pub fn new(field: String) -> IndexInfo {
        IndexInfo {
            field,
            entries: BTreeMap::new(),
        }
    }

    fn keys_of(&self, doc: &Document) -> Vec<Bson> {
        let values = flatten_arrays(resolve_path(doc, &self.field));
        values
            .into_iter()
            .filter(|value| !matches!(value, Bson::Document(_) | Bson::Array(_)))
            .cloned()
            .collect()
    }

    pub fn insert(&mut self, pkey: &[u8], doc: &Document) {
        for key in self.keys_of(doc) {
            self.entries
                .entry(IndexKey(key))
                .or_default()
                .insert(pkey.to_vec());
        }
    }

    pub fn remove(&mut self, pkey: &[u8], doc: &Document) {
        for key in self.keys_of(doc) {
            let key = IndexKey(key);
            let now_empty = match self.entries.get_mut(&key) {
                Some(set) => {
                    set.remove(pkey);
                    set.is_empty()
                }
                None => false,
            };
            if now_empty {
                self.entries.remove(&key);
            }
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn lookup(&self, value: &Bson) -> Option<&BTreeSet<Vec<u8>>> {
        self.entries.get(&IndexKey(value.clone()))
    }

    fn is_aggregatable(key: &IndexKey) -> bool {
        !matches!(key.0, Bson::Null | Bson::Undefined)
    }

    /// Smallest non-null key.
    pub fn min_key(&self) -> Option<&Bson> {
        self.entries.keys().find(|key| IndexInfo::is_aggregatable(key)).map(|key| &key.0)
    }

    /// Largest non-null key.
    pub fn max_key(&self) -> Option<&Bson> {
        self.entries.keys().rev().find(|key| IndexInfo::is_aggregatable(key)).map(|key| &key.0)
    }

    #[cfg(test)]
    pub fn key_count(&self) -> usize {
        self.entries.len()
    }

}
