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
use crate::query::update_operators::{UpdateOperator, UpdateResult};
use crate::Result;
use crate::utils::path::remove_path;

pub(crate) struct UnsetOperator {
    fields: Vec<String>,
}

impl UnsetOperator {

    pub fn compile(doc: Document) -> Result<UnsetOperator> {
        <dyn UpdateOperator>::validate_key(&doc)?;
        let fields = doc.keys().cloned().collect::<Vec<String>>();
        Ok(UnsetOperator {
            fields
        })
    }

}

impl UpdateOperator for UnsetOperator {
    fn name(&self) -> &str {
        "unset"
    }

    fn update(&self, _source: &Document, target: &mut Document) -> Result<UpdateResult> {
        let mut updated = false;
        for field in &self.fields {
            if remove_path(target, field).is_some() {
                updated = true;
            }
        }

        Ok(UpdateResult {
            updated,
        })
    }
}
