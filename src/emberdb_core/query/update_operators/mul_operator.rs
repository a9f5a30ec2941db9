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

pub(crate) struct MulOperator {
    doc: Document,
}

impl MulOperator {

    pub fn compile(doc: Document) -> Result<MulOperator> {
        <dyn UpdateOperator>::validate_key(&doc)?;
        Ok(MulOperator {
            doc
        })
    }

    fn mul_numeric(key: &str, a: &Bson, b: &Bson) -> Result<Bson> {
        let val = match (a, b) {
            (Bson::Int32(a), Bson::Int32(b)) => match a.checked_mul(*b) {
                Some(product) => Bson::Int32(product),
                None => Bson::Int64(*a as i64 * *b as i64),
            },
            (Bson::Int32(a), Bson::Int64(b)) => Bson::Int64((*a as i64).wrapping_mul(*b)),
            (Bson::Int32(a), Bson::Double(b)) => Bson::Double(*a as f64 * *b),
            (Bson::Int64(a), Bson::Int64(b)) => Bson::Int64(a.wrapping_mul(*b)),
            (Bson::Int64(a), Bson::Int32(b)) => Bson::Int64(a.wrapping_mul(*b as i64)),
            (Bson::Int64(a), Bson::Double(b)) => Bson::Double(*a as f64 * *b),
            (Bson::Double(a), Bson::Double(b)) => Bson::Double(*a * *b),
            (Bson::Double(a), Bson::Int32(b)) => Bson::Double(*a * *b as f64),
            (Bson::Double(a), Bson::Int64(b)) => Bson::Double(*a * *b as f64),

            _ => {
                return Err(CannotApplyOperationForTypes {
                    op_name: "$mul".into(),
                    field_name: key.into(),
                    field_type: type_name(a),
                    target_type: type_name(b),
                }
                    .into());
            }
        };
        Ok(val)
    }

    /// A missing field is set to zero of the operand's type.
    fn mul_field(doc: &mut Document, key: &str, value: &Bson) -> Result<()> {
        let zero = match value {
            Bson::Int64(_) => Bson::Int64(0),
            Bson::Double(_) => Bson::Double(0.0),
            _ => Bson::Int32(0),
        };
        let original_value = get_path(doc, key).cloned().unwrap_or(zero);
        let new_value = MulOperator::mul_numeric(key, &original_value, value)?;
        set_path(doc, key, new_value)
    }

}

impl UpdateOperator for MulOperator {

    fn name(&self) -> &str {
        "mul"
    }

    fn update(&self, _source: &Document, target: &mut Document) -> Result<UpdateResult> {
        let mut updated = false;
        for (k, v) in self.doc.iter() {
            MulOperator::mul_field(target, k, v)?;
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
    use super::MulOperator;

    #[test]
    fn test_mul() {
        let op = MulOperator::compile(doc! { "price": 2, "discount": 0.5 }).unwrap();
        let source = doc! { "price": 10 };
        let mut target = source.clone();
        op.update(&source, &mut target).unwrap();
        assert_eq!(target, doc! { "price": 20, "discount": 0.0 });
    }
}
