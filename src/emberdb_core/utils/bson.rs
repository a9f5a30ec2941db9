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

use crate::{Error, Result};
use bson::spec::ElementType as BsonElementType;
use bson::{Bson, Document};
use byteorder::{BigEndian, WriteBytesExt};
use std::cmp::Ordering;
use std::io::Write;

/// Encode the primary key of a document into the byte form the collection
/// map is keyed by.
///
/// Numbers that compare equal encode equal: an integral value is written
/// as an `Int64` whatever its BSON type, so `1`, `1i64` and `1.0` are the
/// same key.
pub(crate) fn stacked_key<'a, T: IntoIterator<Item = &'a Bson>>(keys: T) -> Result<Vec<u8>> {
    let mut result = Vec::<u8>::new();

    for key in keys {
        stacked_key_bytes(&mut result, key)?;
    }

    Ok(result)
}

pub(crate) fn stacked_key_bytes<W: Write>(writer: &mut W, key: &Bson) -> Result<()> {
    match key {
        Bson::Double(dbl) if is_integral(*dbl) => {
            writer.write_u8(BsonElementType::Int64 as u8)?;
            writer.write_i64::<BigEndian>(*dbl as i64)?;
        }
        Bson::Double(dbl) => {
            writer.write_u8(BsonElementType::Double as u8)?;
            writer.write_f64::<BigEndian>(*dbl)?;
        }
        Bson::String(str) => {
            writer.write_u8(BsonElementType::String as u8)?;
            writer.write_all(str.as_bytes())?;
            writer.write_u8(0)?;
        }
        Bson::Boolean(bl) => {
            writer.write_u8(BsonElementType::Boolean as u8)?;
            writer.write_u8(*bl as u8)?;
        }
        Bson::Int32(i32) => {
            writer.write_u8(BsonElementType::Int64 as u8)?;
            writer.write_i64::<BigEndian>(*i32 as i64)?;
        }
        Bson::Int64(i64) => {
            writer.write_u8(BsonElementType::Int64 as u8)?;
            writer.write_i64::<BigEndian>(*i64)?;
        }
        Bson::ObjectId(oid) => {
            writer.write_u8(BsonElementType::ObjectId as u8)?;
            writer.write_all(&oid.bytes())?;
        }
        Bson::DateTime(dt) => {
            writer.write_u8(BsonElementType::DateTime as u8)?;
            writer.write_i64::<BigEndian>(dt.timestamp_millis())?;
        }
        Bson::Decimal128(dcl) => {
            writer.write_u8(BsonElementType::Decimal128 as u8)?;
            writer.write_all(&dcl.bytes())?;
        }
        _ => {
            let val = format!("{:?}", key);
            return Err(Error::NotAValidKeyType(val));
        }
    }

    Ok(())
}

fn is_integral(value: f64) -> bool {
    value.fract() == 0.0 && value >= i64::MIN as f64 && value < i64::MAX as f64
}

/// Canonical sort bracket of a value. Values from different brackets
/// never compare equal and range operators never cross brackets.
pub(crate) fn type_bracket(value: &Bson) -> u8 {
    match value {
        Bson::MinKey => 0,
        Bson::Null | Bson::Undefined => 1,
        Bson::Double(_) | Bson::Int32(_) | Bson::Int64(_) | Bson::Decimal128(_) => 2,
        Bson::String(_) | Bson::Symbol(_) => 3,
        Bson::Document(_) => 4,
        Bson::Array(_) => 5,
        Bson::Binary(_) => 6,
        Bson::ObjectId(_) => 7,
        Bson::Boolean(_) => 8,
        Bson::DateTime(_) => 9,
        Bson::Timestamp(_) => 10,
        Bson::RegularExpression(_) => 11,
        Bson::MaxKey => 13,
        _ => 12,
    }
}

fn numeric_cmp(a: &Bson, b: &Bson) -> Ordering {
    match (a, b) {
        (Bson::Int32(i1), Bson::Int32(i2)) => i1.cmp(i2),
        (Bson::Int64(i1), Bson::Int64(i2)) => i1.cmp(i2),
        (Bson::Int32(i1), Bson::Int64(i2)) => (*i1 as i64).cmp(i2),
        (Bson::Int64(i1), Bson::Int32(i2)) => i1.cmp(&(*i2 as i64)),
        _ => {
            let (f1, f2) = (as_f64(a), as_f64(b));
            f1.partial_cmp(&f2).unwrap_or_else(|| f1.total_cmp(&f2))
        }
    }
}

pub(crate) fn as_f64(value: &Bson) -> f64 {
    match value {
        Bson::Int32(i) => *i as f64,
        Bson::Int64(i) => *i as f64,
        Bson::Double(d) => *d,
        Bson::Decimal128(d) => d.to_string().parse::<f64>().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

fn string_of(value: &Bson) -> &str {
    match value {
        Bson::String(s) | Bson::Symbol(s) => s.as_str(),
        _ => "",
    }
}

fn document_cmp(a: &Document, b: &Document) -> Ordering {
    let mut left = a.iter();
    let mut right = b.iter();
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some((k1, v1)), Some((k2, v2))) => {
                let ord = compare_bson(v1, v2).then_with(|| k1.cmp(k2));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

/// Total order over BSON values: first by bracket, then by value.
pub(crate) fn compare_bson(a: &Bson, b: &Bson) -> Ordering {
    let bracket_a = type_bracket(a);
    let bracket_b = type_bracket(b);
    if bracket_a != bracket_b {
        return bracket_a.cmp(&bracket_b);
    }

    match (a, b) {
        _ if bracket_a == 2 => numeric_cmp(a, b),
        _ if bracket_a == 3 => string_of(a).cmp(string_of(b)),
        (Bson::Document(d1), Bson::Document(d2)) => document_cmp(d1, d2),
        (Bson::Array(a1), Bson::Array(a2)) => {
            for (v1, v2) in a1.iter().zip(a2.iter()) {
                let ord = compare_bson(v1, v2);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            a1.len().cmp(&a2.len())
        }
        (Bson::Binary(b1), Bson::Binary(b2)) => b1.bytes.cmp(&b2.bytes),
        (Bson::ObjectId(o1), Bson::ObjectId(o2)) => o1.cmp(o2),
        (Bson::Boolean(b1), Bson::Boolean(b2)) => b1.cmp(b2),
        (Bson::DateTime(d1), Bson::DateTime(d2)) => d1.cmp(d2),
        (Bson::Timestamp(t1), Bson::Timestamp(t2)) => {
            t1.time.cmp(&t2.time).then(t1.increment.cmp(&t2.increment))
        }
        (Bson::RegularExpression(r1), Bson::RegularExpression(r2)) => {
            r1.pattern.cmp(&r2.pattern).then_with(|| r1.options.cmp(&r2.options))
        }
        _ if bracket_a == 12 => format!("{:?}", a).cmp(&format!("{:?}", b)),
        _ => Ordering::Equal,
    }
}

#[inline]
pub(crate) fn bson_equals(a: &Bson, b: &Bson) -> bool {
    compare_bson(a, b) == Ordering::Equal
}

/// The name of the element type, used in error messages.
pub(crate) fn type_name(value: &Bson) -> String {
    format!("{:?}", value.element_type())
}

#[cfg(test)]
mod tests {
    use crate::utils::bson::{compare_bson, stacked_key};
    use bson::oid::ObjectId;
    use bson::{doc, Bson};
    use std::cmp::Ordering;

    #[test]
    fn test_stacked_key_distinguishes_types() {
        let int_key = stacked_key([&Bson::Int32(0)]).unwrap();
        let str_key = stacked_key([&Bson::String("0".to_string())]).unwrap();
        assert_ne!(int_key, str_key);

        let oid = ObjectId::new();
        let oid_key = stacked_key([&Bson::ObjectId(oid)]).unwrap();
        assert_eq!(oid_key.len(), 13);
    }

    #[test]
    fn test_stacked_key_of_equal_numbers() {
        let int_key = stacked_key([&Bson::Int32(1)]).unwrap();
        assert_eq!(stacked_key([&Bson::Int64(1)]).unwrap(), int_key);
        assert_eq!(stacked_key([&Bson::Double(1.0)]).unwrap(), int_key);
        assert_eq!(stacked_key([&Bson::Double(-0.0)]).unwrap(), stacked_key([&Bson::Int32(0)]).unwrap());

        assert_ne!(stacked_key([&Bson::Double(1.5)]).unwrap(), int_key);
        assert_ne!(stacked_key([&Bson::Int64(1 << 40)]).unwrap(), stacked_key([&Bson::Int32(0)]).unwrap());
    }

    #[test]
    fn test_stacked_key_rejects_documents() {
        let result = stacked_key([&Bson::Document(doc! {})]);
        assert!(result.is_err());
    }

    #[test]
    fn test_compare_numbers_across_types() {
        assert_eq!(compare_bson(&Bson::Int32(2), &Bson::Int64(2)), Ordering::Equal);
        assert_eq!(compare_bson(&Bson::Double(1.5), &Bson::Int32(2)), Ordering::Less);
        assert_eq!(compare_bson(&Bson::Int64(-3), &Bson::Int32(2)), Ordering::Less);
        assert_eq!(compare_bson(&Bson::Double(-0.0), &Bson::Int32(0)), Ordering::Equal);
    }

    #[test]
    fn test_compare_brackets() {
        // null < numbers < strings < documents
        assert_eq!(compare_bson(&Bson::Null, &Bson::Int32(-100)), Ordering::Less);
        assert_eq!(compare_bson(&Bson::Double(1e9), &Bson::String("a".into())), Ordering::Less);
        assert_eq!(compare_bson(&Bson::String("z".into()), &Bson::Document(doc! {})), Ordering::Less);
    }
}
