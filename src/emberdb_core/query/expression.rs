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

//! Expressions evaluated against the current document by `$set`.
//!
//! A string starting with `$` refers to a field of the document being
//! updated. A single-key document whose key starts with `$` is an operator.

use bson::{Bson, Document};
use crate::{Error, Result};
use crate::errors::CannotApplyOperationForTypes;
use crate::utils::bson::type_name;
use crate::utils::path::get_path;

pub(crate) fn evaluate(expr: &Bson, doc: &Document) -> Result<Bson> {
    match expr {
        Bson::String(str) if str.starts_with('$') && str.len() > 1 => {
            Ok(get_path(doc, &str[1..]).cloned().unwrap_or(Bson::Null))
        }
        Bson::Document(sub) => {
            if sub.len() == 1 {
                if let Some((key, operand)) = sub.iter().next() {
                    if key.starts_with('$') {
                        return evaluate_operator(key, operand, doc);
                    }
                }
            }
            let mut result = Document::new();
            for (key, value) in sub.iter() {
                result.insert(key.clone(), evaluate(value, doc)?);
            }
            Ok(Bson::Document(result))
        }
        Bson::Array(arr) => {
            let mut result = Vec::with_capacity(arr.len());
            for item in arr {
                result.push(evaluate(item, doc)?);
            }
            Ok(Bson::Array(result))
        }
        _ => Ok(expr.clone()),
    }
}

/// Evaluate the operands of an operator. A non-array operand counts as a
/// single argument.
fn evaluate_args(operand: &Bson, doc: &Document) -> Result<Vec<Bson>> {
    match operand {
        Bson::Array(arr) => arr.iter().map(|item| evaluate(item, doc)).collect(),
        _ => Ok(vec![evaluate(operand, doc)?]),
    }
}

fn is_nullish(value: &Bson) -> bool {
    matches!(value, Bson::Null | Bson::Undefined)
}

fn evaluate_operator(op: &str, operand: &Bson, doc: &Document) -> Result<Bson> {
    match op {
        "$literal" => Ok(operand.clone()),
        "$concat" => {
            let args = evaluate_args(operand, doc)?;
            let mut result = String::new();
            for arg in &args {
                match arg {
                    Bson::String(str) => result.push_str(str),
                    value if is_nullish(value) => return Ok(Bson::Null),
                    value => return Err(type_error(op, "String", value)),
                }
            }
            Ok(Bson::String(result))
        }
        "$add" => fold_numeric(op, evaluate_args(operand, doc)?, Bson::Int32(0), arith_add),
        "$multiply" => fold_numeric(op, evaluate_args(operand, doc)?, Bson::Int32(1), arith_mul),
        "$subtract" => {
            let args = evaluate_args(operand, doc)?;
            if args.len() != 2 {
                return Err(Error::ValidationError("$subtract takes exactly 2 arguments".to_string()));
            }
            if args.iter().any(is_nullish) {
                return Ok(Bson::Null);
            }
            arith_sub(&args[0], &args[1]).ok_or_else(|| type_error(op, "Number", &args[1]))
        }
        "$toUpper" | "$toLower" => {
            let args = evaluate_args(operand, doc)?;
            if args.len() != 1 {
                return Err(Error::ValidationError(format!("{} takes exactly 1 argument", op)));
            }
            let text = match &args[0] {
                Bson::String(str) => str.clone(),
                value if is_nullish(value) => String::new(),
                Bson::Int32(i) => i.to_string(),
                Bson::Int64(i) => i.to_string(),
                Bson::Double(d) => d.to_string(),
                value => return Err(type_error(op, "String", value)),
            };
            if op == "$toUpper" {
                Ok(Bson::String(text.to_uppercase()))
            } else {
                Ok(Bson::String(text.to_lowercase()))
            }
        }
        "$ifNull" => {
            let args = evaluate_args(operand, doc)?;
            if args.len() < 2 {
                return Err(Error::ValidationError("$ifNull takes at least 2 arguments".to_string()));
            }
            let last = args.len() - 1;
            let found = args.iter()
                .take(last)
                .find(|value| !is_nullish(value))
                .cloned();
            Ok(found.unwrap_or_else(|| args[last].clone()))
        }
        _ => Err(Error::UnknownExpressionOperator(op.to_string())),
    }
}

fn type_error(op: &str, expected: &str, value: &Bson) -> Error {
    CannotApplyOperationForTypes {
        op_name: op.into(),
        field_name: expected.into(),
        field_type: type_name(value),
        target_type: expected.into(),
    }.into()
}

fn fold_numeric(op: &str, args: Vec<Bson>, init: Bson, f: fn(&Bson, &Bson) -> Option<Bson>) -> Result<Bson> {
    let mut acc = init;
    for arg in &args {
        if is_nullish(arg) {
            return Ok(Bson::Null);
        }
        acc = f(&acc, arg).ok_or_else(|| type_error(op, "Number", arg))?;
    }
    Ok(acc)
}

fn as_i64(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int32(i) => Some(*i as i64),
        Bson::Int64(i) => Some(*i),
        _ => None,
    }
}

fn as_double(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(i) => Some(*i as f64),
        Bson::Int64(i) => Some(*i as f64),
        Bson::Double(d) => Some(*d),
        _ => None,
    }
}

/// Integers stay integers as long as they fit, the narrowest width wins.
fn narrow(value: i64, wide: bool) -> Bson {
    if !wide {
        if let Ok(small) = i32::try_from(value) {
            return Bson::Int32(small);
        }
    }
    Bson::Int64(value)
}

fn integer_op(a: &Bson, b: &Bson, f: fn(i64, i64) -> Option<i64>, g: fn(f64, f64) -> f64) -> Option<Bson> {
    if let (Some(x), Some(y)) = (as_i64(a), as_i64(b)) {
        let wide = matches!(a, Bson::Int64(_)) || matches!(b, Bson::Int64(_));
        return match f(x, y) {
            Some(result) => Some(narrow(result, wide)),
            None => Some(Bson::Double(g(x as f64, y as f64))),
        };
    }
    let (x, y) = (as_double(a)?, as_double(b)?);
    Some(Bson::Double(g(x, y)))
}

fn arith_add(a: &Bson, b: &Bson) -> Option<Bson> {
    integer_op(a, b, i64::checked_add, |x, y| x + y)
}

fn arith_sub(a: &Bson, b: &Bson) -> Option<Bson> {
    integer_op(a, b, i64::checked_sub, |x, y| x - y)
}

fn arith_mul(a: &Bson, b: &Bson) -> Option<Bson> {
    integer_op(a, b, i64::checked_mul, |x, y| x * y)
}

#[cfg(test)]
mod tests {
    use bson::{bson, doc, Bson};
    use crate::Error;
    use super::evaluate;

    #[test]
    fn test_field_reference_and_concat() {
        let doc = doc! { "title": "Issues", "year": 2021 };
        let expr = bson!({ "$concat": ["Updated: ", "$title"] });
        assert_eq!(evaluate(&expr, &doc).unwrap(), Bson::String("Updated: Issues".into()));

        let expr = bson!({ "$concat": ["Updated: ", "$artist"] });
        assert_eq!(evaluate(&expr, &doc).unwrap(), Bson::Null);

        assert_eq!(evaluate(&bson!("$year"), &doc).unwrap(), Bson::Int32(2021));
    }

    #[test]
    fn test_arithmetic() {
        let doc = doc! { "a": 2, "b": 3_i64, "c": 0.5 };
        assert_eq!(evaluate(&bson!({ "$add": ["$a", 1] }), &doc).unwrap(), Bson::Int32(3));
        assert_eq!(evaluate(&bson!({ "$add": ["$a", "$b"] }), &doc).unwrap(), Bson::Int64(5));
        assert_eq!(evaluate(&bson!({ "$multiply": ["$a", "$c"] }), &doc).unwrap(), Bson::Double(1.0));
        assert_eq!(evaluate(&bson!({ "$subtract": ["$a", 5] }), &doc).unwrap(), Bson::Int32(-3));
        assert_eq!(evaluate(&bson!({ "$add": ["$a", "$missing"] }), &doc).unwrap(), Bson::Null);
        assert!(evaluate(&bson!({ "$add": ["$a", "x"] }), &doc).is_err());
    }

    #[test]
    fn test_string_operators() {
        let doc = doc! { "title": "Issues" };
        assert_eq!(evaluate(&bson!({ "$toUpper": "$title" }), &doc).unwrap(), Bson::String("ISSUES".into()));
        assert_eq!(evaluate(&bson!({ "$toLower": ["$title"] }), &doc).unwrap(), Bson::String("issues".into()));
        assert_eq!(evaluate(&bson!({ "$ifNull": ["$artist", "Unknown"] }), &doc).unwrap(), Bson::String("Unknown".into()));
        assert_eq!(evaluate(&bson!({ "$literal": "$title" }), &doc).unwrap(), Bson::String("$title".into()));
    }

    #[test]
    fn test_nested_values() {
        let doc = doc! { "title": "Issues" };
        let expr = bson!({ "name": "$title", "tags": ["$title", 1] });
        assert_eq!(evaluate(&expr, &doc).unwrap(), bson!({ "name": "Issues", "tags": ["Issues", 1] }));
    }

    #[test]
    fn test_unknown_operator() {
        let err = evaluate(&bson!({ "$split": ["a b", " "] }), &doc! {}).unwrap_err();
        assert!(matches!(err, Error::UnknownExpressionOperator(_)));
    }
}
