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

mod set_operator;
mod inc_operator;
mod mul_operator;
mod rename_operator;
mod unset_operator;
mod push_operator;
mod pop_operator;
mod min_operator;
mod max_operator;

use bson::{Bson, Document};
use log::trace;
use crate::{Error, Result};
use crate::utils::path::validate_field_path;

#[derive(Debug, Default)]
pub(crate) struct UpdateResult {
    pub(crate) updated: bool,
}

pub(crate) trait UpdateOperator {
    fn name(&self) -> &str;

    /// Apply the operator to `target`. `source` is the document as it was
    /// before the update started; expressions read from it.
    fn update(&self, source: &Document, target: &mut Document) -> Result<UpdateResult>;
}

impl dyn UpdateOperator {

    pub(crate) fn validate_key(doc: &Document) -> Result<()> {
        for (k, _) in doc.iter() {
            <dyn UpdateOperator>::validate_path(k)?;
        }
        Ok(())
    }

    pub(crate) fn validate_path(path: &str) -> Result<()> {
        if path == "_id" || path.starts_with("_id.") {
            return Err(Error::UnableToUpdatePrimaryKey);
        }
        validate_field_path(path)
    }

}

pub(crate) use set_operator::SetOperator;
pub(crate) use inc_operator::IncOperator;
pub(crate) use mul_operator::MulOperator;
pub(crate) use rename_operator::RenameOperator;
pub(crate) use unset_operator::UnsetOperator;
pub(crate) use push_operator::PushOperator;
pub(crate) use pop_operator::PopOperator;
pub(crate) use min_operator::MinOperator;
pub(crate) use max_operator::MaxOperator;

/// A compiled update document such as
/// `{ "$set": { "title": "Untouchables" }, "$inc": { "plays": 1 } }`.
pub(crate) struct Update {
    operators: Vec<Box<dyn UpdateOperator>>,
}

impl Update {

    pub fn compile(update: &Document) -> Result<Update> {
        if update.is_empty() {
            return Err(Error::ValidationError("update document is empty".to_string()));
        }

        let mut operators: Vec<Box<dyn UpdateOperator>> = Vec::with_capacity(update.len());
        for (key, value) in update.iter() {
            let doc = match value {
                Bson::Document(doc) => doc.clone(),
                _ if !key.starts_with('$') => {
                    return Err(Error::ValidationError(format!(
                        "update document requires operators, found field '{}'", key
                    )));
                }
                _ => {
                    return Err(Error::ValidationError(format!("{} requires a document", key)));
                }
            };
            let operator: Box<dyn UpdateOperator> = match key.as_str() {
                "$set" => Box::new(SetOperator::compile(doc)?),
                "$unset" => Box::new(UnsetOperator::compile(doc)?),
                "$inc" => Box::new(IncOperator::compile(doc)?),
                "$mul" => Box::new(MulOperator::compile(doc)?),
                "$min" => Box::new(MinOperator::compile(doc)?),
                "$max" => Box::new(MaxOperator::compile(doc)?),
                "$rename" => Box::new(RenameOperator::compile(doc)?),
                "$push" => Box::new(PushOperator::compile(doc)?),
                "$pop" => Box::new(PopOperator::compile(doc)?),
                _ if key.starts_with('$') => {
                    return Err(Error::UnknownUpdateOperation(key.clone()));
                }
                _ => {
                    return Err(Error::ValidationError(format!(
                        "update document requires operators, found field '{}'", key
                    )));
                }
            };
            operators.push(operator);
        }

        Ok(Update {
            operators,
        })
    }

    /// Run every operator on a copy of `doc`. Returns the new document
    /// when something changed.
    pub fn apply(&self, doc: &Document) -> Result<Option<Document>> {
        let mut target = doc.clone();
        let mut updated = false;
        for operator in &self.operators {
            let result = operator.update(doc, &mut target)?;
            if result.updated {
                trace!("${} changed the document", operator.name());
            }
            updated |= result.updated;
        }
        if !updated || target == *doc {
            return Ok(None);
        }
        Ok(Some(target))
    }

}
