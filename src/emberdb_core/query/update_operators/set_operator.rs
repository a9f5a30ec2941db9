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
use crate::query::expression::evaluate;
use crate::query::update_operators::{UpdateOperator, UpdateResult};
use crate::Result;
use crate::utils::path::{get_path, set_path};

pub(crate) struct SetOperator {
    doc: Document,
}

impl SetOperator {

    pub fn compile(doc: Document) -> Result<SetOperator> {
        <dyn UpdateOperator>::validate_key(&doc)?;
        Ok(SetOperator {
            doc
        })
    }

}

impl UpdateOperator for SetOperator {

    fn name(&self) -> &str {
        "set"
    }

    fn update(&self, source: &Document, target: &mut Document) -> Result<UpdateResult> {
        let mut updated = false;
        for (k, v) in self.doc.iter() {
            let value = evaluate(v, source)?;
            if get_path(target, k) == Some(&value) {
                continue;
            }
            set_path(target, k, value)?;
            updated = true;
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
    use super::SetOperator;

    #[test]
    fn test_set_nested_path() {
        let op = SetOperator::compile(doc! { "info.label": "Immortal" }).unwrap();
        let source = doc! { "_id": 1 };
        let mut target = source.clone();
        let result = op.update(&source, &mut target).unwrap();
        assert!(result.updated);
        assert_eq!(target, doc! { "_id": 1, "info": { "label": "Immortal" } });
        assert_eq!(op.name(), "set");
    }
}
