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
use crate::query::update_operators::{UpdateOperator, UpdateResult};
use crate::Result;
use crate::errors::CannotApplyOperationForTypes;
use crate::utils::bson::type_name;
use crate::utils::path::{get_path, set_path};

pub(crate) struct PushOperator {
    /// field -> values to append
    items: Vec<(String, Vec<Bson>)>,
}

impl PushOperator {

    pub fn compile(doc: Document) -> Result<PushOperator> {
        <dyn UpdateOperator>::validate_key(&doc)?;
        let mut items = Vec::with_capacity(doc.len());
        for (key, value) in doc.into_iter() {
            let values = match value {
                Bson::Document(mut sub) if sub.len() == 1 && sub.contains_key("$each") => {
                    match sub.remove("$each") {
                        Some(Bson::Array(arr)) => arr,
                        _ => return Err(crate::Error::ValidationError("$each requires an array".to_string())),
                    }
                }
                other => vec![other],
            };
            items.push((key, values));
        }
        Ok(PushOperator {
            items
        })
    }

}

impl UpdateOperator for PushOperator {

    fn name(&self) -> &str {
        "push"
    }

    fn update(&self, _source: &Document, target: &mut Document) -> Result<UpdateResult> {
        let mut updated = false;
        for (k, values) in self.items.iter() {
            let current = get_path(target, k).unwrap_or(&Bson::Null);
            let result = match current.clone() {
                Bson::Array(mut arr) => {
                    arr.extend(values.iter().cloned());
                    Bson::Array(arr)
                }
                Bson::Null => {
                    Bson::Array(values.clone())
                }
                other => {
                    return Err(CannotApplyOperationForTypes {
                        op_name: "$push".into(),
                        field_name: k.into(),
                        field_type: type_name(&other),
                        target_type: "Array".into(),
                    }
                        .into());
                }
            };
            set_path(target, k, result)?;
            updated = true;
        }

        Ok(UpdateResult {
            updated,
        })
    }
}
