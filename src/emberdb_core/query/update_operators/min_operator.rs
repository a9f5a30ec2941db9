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

pub(crate) struct MinOperator {
    doc: Document,
}

impl MinOperator {

    pub fn compile(doc: Document) -> Result<MinOperator> {
        <dyn UpdateOperator>::validate_key(&doc)?;
        Ok(MinOperator {
            doc
        })
    }

}

impl UpdateOperator for MinOperator {
    fn name(&self) -> &str {
        "min"
    }

    fn update(&self, _source: &Document, target: &mut Document) -> Result<UpdateResult> {
        let mut updated = false;
        for (k, v) in self.doc.iter() {
            let replace = match get_path(target, k) {
                Some(current_val) => compare_bson(v, current_val) == Ordering::Less,
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
