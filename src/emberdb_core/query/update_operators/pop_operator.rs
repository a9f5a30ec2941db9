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

use bson::{Bson, Document};
use indexmap::IndexMap;
use crate::query::update_operators::{UpdateOperator, UpdateResult};
use crate::{Error, Result};
use crate::errors::{mk_invalid_update_field, CannotApplyOperationForTypes};
use crate::utils::bson::type_name;
use crate::utils::path::{get_path, set_path};

pub(crate) struct PopOperator {
    /// field -> pop the first element
    pop_map: IndexMap<String, bool>,
}

impl PopOperator {

    pub fn compile(doc: Document) -> Result<PopOperator> {
        <dyn UpdateOperator>::validate_key(&doc)?;
        let mut pop_map = IndexMap::new();
        for (key, value) in doc.iter() {
            let num = match value {
                Bson::Int32(i) => *i as i64,
                Bson::Int64(i) => *i,
                _ => {
                    return Err(Error::InvalidField(mk_invalid_update_field(
                        "$pop".to_string(),
                        key.clone(),
                    )))
                }
            };
            let is_first = match num {
                -1 => true,
                1 => false,
                _ => {
                    return Err(Error::InvalidField(mk_invalid_update_field(
                        "$pop".to_string(),
                        key.clone(),
                    )))
                }
            };
            pop_map.insert(key.clone(), is_first);
        }
        Ok(PopOperator {
            pop_map,
        })
    }

}

impl UpdateOperator for PopOperator {

    fn name(&self) -> &str {
        "pop"
    }

    fn update(&self, _source: &Document, target: &mut Document) -> Result<UpdateResult> {
        let mut updated = false;
        for (k, is_first) in self.pop_map.iter() {
            let mut arr = match get_path(target, k) {
                None | Some(Bson::Null) => continue,
                Some(Bson::Array(arr)) => arr.clone(),
                Some(other) => {
                    return Err(CannotApplyOperationForTypes {
                        op_name: "$pop".into(),
                        field_name: k.into(),
                        field_type: type_name(other),
                        target_type: "Array".into(),
                    }
                        .into());
                }
            };
            if arr.is_empty() {
                continue;
            }
            if *is_first {
                arr.remove(0);
            } else {
                arr.pop();
            }
            set_path(target, k, Bson::Array(arr))?;
            updated = true;
        }

        Ok(UpdateResult {
            updated,
        })
    }
}
