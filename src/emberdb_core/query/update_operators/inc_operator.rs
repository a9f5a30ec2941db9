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
use crate::{Error, Result};
use crate::errors::CannotApplyOperationForTypes;
use crate::utils::bson::type_name;
use crate::utils::path::{get_path, set_path};

pub(crate) struct IncOperator {
    doc: Document,
}

impl IncOperator {

    pub fn compile(doc: Document) -> Result<IncOperator> {
        <dyn UpdateOperator>::validate_key(&doc)?;
        Ok(IncOperator {
            doc
        })
    }

    pub(super) fn inc_numeric(key: &str, a: &Bson, b: &Bson) -> Result<Bson> {
        let val = match (a, b) {
            (Bson::Int32(a), Bson::Int32(b)) => match a.checked_add(*b) {
                Some(sum) => Bson::Int32(sum),
                None => Bson::Int64(*a as i64 + *b as i64),
            },
            (Bson::Int32(a), Bson::Int64(b)) => Bson::Int64(*a as i64 + *b),
            (Bson::Int32(a), Bson::Double(b)) => Bson::Double(*a as f64 + *b),
            (Bson::Int64(a), Bson::Int64(b)) => Bson::Int64(a.wrapping_add(*b)),
            (Bson::Int64(a), Bson::Int32(b)) => Bson::Int64(a.wrapping_add(*b as i64)),
            (Bson::Int64(a), Bson::Double(b)) => Bson::Double(*a as f64 + *b),
            (Bson::Double(a), Bson::Double(b)) => Bson::Double(*a + *b),
            (Bson::Double(a), Bson::Int32(b)) => Bson::Double(*a + *b as f64),
            (Bson::Double(a), Bson::Int64(b)) => Bson::Double(*a + *b as f64),

            _ => {
                return Err(CannotApplyOperationForTypes {
                    op_name: "$inc".into(),
                    field_name: key.into(),
                    field_type: type_name(a),
                    target_type: type_name(b),
                }
                    .into());
            }
        };
        Ok(val)
    }

    fn inc_field(doc: &mut Document, key: &str, value: &Bson) -> Result<()> {
        let result = match get_path(doc, key) {
            Some(Bson::Null) => {
                return Err(Error::IncrementNullField);
            }

            Some(original_value) => IncOperator::inc_numeric(key, original_value, value)?,

            None => {
                // check the operand is a number
                IncOperator::inc_numeric(key, &Bson::Int32(0), value)?;
                value.clone()
            }
        };
        set_path(doc, key, result)
    }

}

impl UpdateOperator for IncOperator {

    fn name(&self) -> &str {
        "inc"
    }

    fn update(&self, _source: &Document, target: &mut Document) -> Result<UpdateResult> {
        let mut updated = false;
        for (k, v) in self.doc.iter() {
            IncOperator::inc_field(target, k.as_str(), v)?;
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
    use crate::Error;
    use crate::query::update_operators::UpdateOperator;
    use super::IncOperator;

    #[test]
    fn test_inc() {
        let op = IncOperator::compile(doc! { "plays": 1, "stats.skips": 2.5 }).unwrap();
        let source = doc! { "plays": 41_i64 };
        let mut target = source.clone();
        op.update(&source, &mut target).unwrap();
        assert_eq!(target, doc! { "plays": 42_i64, "stats": { "skips": 2.5 } });
    }

    #[test]
    fn test_inc_null_and_string() {
        let op = IncOperator::compile(doc! { "plays": 1 }).unwrap();

        let source = doc! { "plays": null };
        let mut target = source.clone();
        let err = op.update(&source, &mut target).unwrap_err();
        assert!(matches!(err, Error::IncrementNullField));

        let source = doc! { "plays": "many" };
        let mut target = source.clone();
        let err = op.update(&source, &mut target).unwrap_err();
        assert!(matches!(err, Error::CannotApplyOperation(_)));
    }
}
