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
use bson::Document;
use crate::Result;
use crate::query::update_operators::{UpdateOperator, UpdateResult};
use crate::utils::bson::compare_bson;
use crate::utils::path::{get_path, set_path};

pub(crate) struct MaxOperator {
    doc: Document,
}

impl MaxOperator {

    pub fn compile(doc: Document) -> Result<MaxOperator> {
        <dyn UpdateOperator>::validate_key(&doc)?;
        Ok(MaxOperator {
            doc
        })
    }

}

impl UpdateOperator for MaxOperator {
    fn name(&self) -> &str {
        "max"
    }

    fn update(&self, _source: &Document, target: &mut Document) -> Result<UpdateResult> {
        let mut updated = false;
        for (k, v) in self.doc.iter() {
            let replace = match get_path(target, k) {
                Some(current_val) => compare_bson(v, current_val) == Ordering::Greater,
                None => true,
            };
            if replace {
                set_path(target, k, v.clone())?;
                updated = true;
            }
        }

        Ok(UpdateResult {
            updated,
        })
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;
    use crate::query::update_operators::UpdateOperator;
    use super::MaxOperator;

    #[test]
    fn test_max_across_numeric_types() {
        let op = MaxOperator::compile(doc! { "score": 7.5, "year": 1999_i64 }).unwrap();
        let source = doc! { "score": 7, "year": 2000 };
        let mut target = source.clone();
        let result = op.update(&source, &mut target).unwrap();
        assert!(result.updated);
        assert_eq!(target, doc! { "score": 7.5, "year": 2000 });
    }
}
