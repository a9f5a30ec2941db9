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
use crate::errors::FieldTypeUnexpectedStruct;
use crate::query::update_operators::{UpdateOperator, UpdateResult};
use crate::Result;
use crate::utils::bson::type_name;
use crate::utils::path::{remove_path, set_path};

pub(crate) struct RenameOperator {
    pairs: Vec<(String, String)>,
}

impl RenameOperator {

    pub fn compile(doc: Document) -> Result<RenameOperator> {
        let mut pairs = Vec::with_capacity(doc.len());
        for (key, value) in doc.iter() {
            <dyn UpdateOperator>::validate_path(key)?;
            let new_name = match value {
                Bson::String(new_name) => new_name.clone(),
                t => {
                    return Err(FieldTypeUnexpectedStruct {
                        field_name: key.into(),
                        expected_ty: "String".into(),
                        actual_ty: type_name(t),
                    }
                        .into());
                }
            };
            <dyn UpdateOperator>::validate_path(&new_name)?;
            pairs.push((key.clone(), new_name));
        }
        Ok(RenameOperator {
            pairs
        })
    }

}

impl UpdateOperator for RenameOperator {

    fn name(&self) -> &str {
        "rename"
    }

    /// Renaming a missing field does nothing.
    fn update(&self, _source: &Document, target: &mut Document) -> Result<UpdateResult> {
        let mut updated = false;
        for (from, to) in &self.pairs {
            if let Some(value) = remove_path(target, from) {
                set_path(target, to, value)?;
                updated = true;
            }
        }

        Ok(UpdateResult {
            updated,
        })
    }

}
