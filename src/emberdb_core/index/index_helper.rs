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

use std::collections::BTreeSet;
use bson::Bson;
use crate::coll::collection_info::CollectionSpecification;
use crate::query::{Condition, Filter};

/// Picks an index able to answer part of a filter.
///
/// Only equality (`$eq` and `$in`) on scalar values is served, either at
/// the top level of the filter or inside a top-level `$and`. The candidates
/// found still go through the whole filter.
pub(crate) struct IndexHelper<'a> {
    col_spec: &'a CollectionSpecification,
}

fn is_indexable_value(value: &Bson) -> bool {
    !matches!(
        value,
        Bson::Null | Bson::Undefined | Bson::Document(_) | Bson::Array(_) | Bson::RegularExpression(_)
    )
}

impl<'a> IndexHelper<'a> {

    pub fn new(col_spec: &'a CollectionSpecification) -> IndexHelper<'a> {
        IndexHelper {
            col_spec,
        }
    }

    /// Primary keys of the documents that may match, in insertion order.
    /// `None` means no index applies and the collection must be scanned.
    pub fn candidates(&self, filter: &Filter) -> Option<Vec<Vec<u8>>> {
        let found = match filter {
            Filter::And(children) => children.iter().find_map(|child| self.try_field(child)),
            _ => self.try_field(filter),
        }?;

        let mut pkeys = found.into_iter().collect::<Vec<Vec<u8>>>();
        pkeys.sort_by_cached_key(|pkey| {
            self.col_spec.documents.get_index_of(pkey).unwrap_or(usize::MAX)
        });
        Some(pkeys)
    }

    fn try_field(&self, filter: &Filter) -> Option<BTreeSet<Vec<u8>>> {
        let (path, condition) = match filter {
            Filter::Field { path, condition } => (path, condition),
            _ => return None,
        };
        let index = self.col_spec.indexes.get(path)?;

        match condition {
            Condition::Eq(value) if is_indexable_value(value) => {
                Some(index.lookup(value).cloned().unwrap_or_default())
            }
            Condition::In(values) if values.iter().all(is_indexable_value) => {
                let mut result = BTreeSet::new();
                for value in values {
                    if let Some(pkeys) = index.lookup(value) {
                        result.extend(pkeys.iter().cloned());
                    }
                }
                Some(result)
            }
            _ => None,
        }
    }

}

#[cfg(test)]
mod tests {
    use bson::doc;
    use crate::coll::collection_info::CollectionSpecification;
    use crate::query::Filter;
    use crate::utils::bson::stacked_key;
    use super::IndexHelper;

    fn spec() -> CollectionSpecification {
        let mut spec = CollectionSpecification::new("albums".to_string());
        spec.create_index("title");
        for (id, title) in [(1, "Issues"), (2, "Untouchables"), (3, "Issues")] {
            let doc = doc! { "_id": id, "title": title };
            let pkey = stacked_key([doc.get("_id").unwrap()]).unwrap();
            spec.put(pkey, doc);
        }
        spec
    }

    #[test]
    fn test_candidates_in_insertion_order() {
        let spec = spec();
        let helper = IndexHelper::new(&spec);

        let filter = Filter::compile(&doc! { "title": "Issues", "year": 1999 }).unwrap();
        let pkeys = helper.candidates(&filter).unwrap();
        assert_eq!(pkeys.len(), 2);
        assert_eq!(spec.documents.get_index_of(&pkeys[0]), Some(0));
        assert_eq!(spec.documents.get_index_of(&pkeys[1]), Some(2));

        let filter = Filter::compile(&doc! { "title": { "$in": ["Untouchables", "Take a Look"] } }).unwrap();
        assert_eq!(helper.candidates(&filter).unwrap().len(), 1);
    }

    #[test]
    fn test_no_index_applies() {
        let spec = spec();
        let helper = IndexHelper::new(&spec);

        let filter = Filter::compile(&doc! { "year": 1999 }).unwrap();
        assert!(helper.candidates(&filter).is_none());

        let filter = Filter::compile(&doc! { "title": { "$gt": "A" } }).unwrap();
        assert!(helper.candidates(&filter).is_none());

        let filter = Filter::compile(&doc! { "title": null }).unwrap();
        assert!(helper.candidates(&filter).is_none());
    }
}
