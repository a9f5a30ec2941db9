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

use bson::ser::Error as BsonErr;
use std::fmt;
use std::io;
use std::sync::PoisonError;
use thiserror::Error;

#[derive(Debug)]
pub struct FieldTypeUnexpectedStruct {
    pub field_name: String,
    pub expected_ty: String,
    pub actual_ty: String,
}

impl From<FieldTypeUnexpectedStruct> for Error {
    fn from(value: FieldTypeUnexpectedStruct) -> Self {
        Error::FieldTypeUnexpected(Box::new(value))
    }
}

impl fmt::Display for FieldTypeUnexpectedStruct {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "unexpected type for field '{}', expected: {}, actual: {}",
            self.field_name, self.expected_ty, self.actual_ty
        )
    }
}

#[derive(Debug)]
pub struct CannotApplyOperationForTypes {
    pub op_name: String,
    pub field_name: String,
    pub field_type: String,
    pub target_type: String,
}

impl From<CannotApplyOperationForTypes> for Error {
    fn from(value: CannotApplyOperationForTypes) -> Self {
        Error::CannotApplyOperation(Box::new(value))
    }
}

#[derive(Debug)]
pub struct InvalidFieldStruct {
    pub field_type: &'static str,
    pub field_name: String,
    pub path: Option<String>,
}

pub(crate) fn mk_invalid_update_field(name: String, path: String) -> Box<InvalidFieldStruct> {
    Box::new(InvalidFieldStruct {
        field_type: "update",
        field_name: name,
        path: Some(path),
    })
}

#[derive(Debug)]
pub struct VersionMismatchError {
    pub actual_version: [u8; 4],
    pub expect_version: [u8; 4],
}

#[derive(Debug)]
pub struct BtWrapper<T> {
    pub source: T,
    pub backtrace: std::backtrace::Backtrace,
}

#[derive(Debug)]
pub struct DuplicateKeyError {
    pub name: String, // index name
    pub key: String,  // key value
    pub ns: String,   // collection name
}

#[derive(Debug)]
pub struct RegexError {
    pub error: String,
    pub expression: String,
    pub options: String,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("type '{0}' is not a valid key type")]
    NotAValidKeyType(String),
    #[error("the {} field name: '{}' is invalid, path: {:?}", .0.field_type, .0.field_name, .0.path)]
    InvalidField(Box<InvalidFieldStruct>),
    #[error("validation error: {0}")]
    ValidationError(String),
    #[error("{0}")]
    FieldTypeUnexpected(Box<FieldTypeUnexpectedStruct>),
    #[error("io error: {}, backtrace: {}", .0.source, .0.backtrace)]
    IOErr(Box<BtWrapper<io::Error>>),
    #[error("bson error: {}, backtrace: {}", .0.source, .0.backtrace)]
    BsonErr(Box<BtWrapper<BsonErr>>),
    #[error("bson de error: {0}")]
    BsonDeErr(Box<bson::de::Error>),
    #[error("data has no primary key")]
    DataHasNoPrimaryKey,
    #[error("no document with primary key '{0}' in collection")]
    DocumentNotFound(String),
    #[error("journal's checksum is mismatch with data, database maybe corrupt")]
    ChecksumMismatch,
    #[error("unknown journal operation: 0x{0:02X}")]
    UnknownJournalOp(u8),
    #[error("collection name '{0}' is illegal")]
    IllegalCollectionName(String),
    #[error("field path '{0}' is illegal")]
    IllegalFieldPath(String),
    #[error("unknown update operation: '{0}'")]
    UnknownUpdateOperation(String),
    #[error("unknown query operator: '{0}'")]
    UnknownQueryOperator(String),
    #[error("unknown expression operator: '{0}'")]
    UnknownExpressionOperator(String),
    #[error("can not increment a field which is null")]
    IncrementNullField,
    #[error("it's illegal to update '_id' field")]
    UnableToUpdatePrimaryKey,
    #[error("the file is not a valid database")]
    NotAValidDatabase,
    #[error("this file is occupied by another connection")]
    DatabaseOccupied,
    #[error("db version mismatched, expected: {:?}, actual: {:?}", .0.expect_version, .0.actual_version)]
    VersionMismatch(Box<VersionMismatchError>),
    #[error("the lock is poisoned")]
    LockError,
    #[error("can not operation {} for '{}' with types {} and {}", .0.op_name, .0.field_name, .0.field_type, .0.target_type)]
    CannotApplyOperation(Box<CannotApplyOperationForTypes>),
    #[error("the database is closed")]
    DbIsClosed,
    #[error("duplicate key error collection: {}, index: {}, key: {}", .0.ns, .0.name, .0.key)]
    DuplicateKey(Box<DuplicateKeyError>),
    #[error("failed to run regex expression: {}, expression: {}, options: {}", .0.error, .0.expression, .0.options)]
    RegexError(Box<RegexError>),
}

impl Error {
    /// Numeric status for a process exiting because of this error.
    ///
    /// I/O failures report the OS error number when there is one; the other
    /// kinds map onto the `sysexits.h` codes.
    pub fn code(&self) -> i32 {
        match self {
            Error::IOErr(wrapper) => wrapper.source.raw_os_error().unwrap_or(74),
            Error::DatabaseOccupied => 75,
            Error::LockError | Error::DbIsClosed => 70,
            Error::NotAValidKeyType(_)
            | Error::InvalidField(_)
            | Error::ValidationError(_)
            | Error::FieldTypeUnexpected(_)
            | Error::IllegalCollectionName(_)
            | Error::IllegalFieldPath(_)
            | Error::UnknownUpdateOperation(_)
            | Error::UnknownQueryOperator(_)
            | Error::UnknownExpressionOperator(_)
            | Error::IncrementNullField
            | Error::UnableToUpdatePrimaryKey
            | Error::CannotApplyOperation(_)
            | Error::RegexError(_) => 64,
            Error::BsonErr(_)
            | Error::BsonDeErr(_)
            | Error::DataHasNoPrimaryKey
            | Error::DocumentNotFound(_)
            | Error::ChecksumMismatch
            | Error::UnknownJournalOp(_)
            | Error::NotAValidDatabase
            | Error::VersionMismatch(_)
            | Error::DuplicateKey(_) => 65,
        }
    }
}

impl From<bson::de::Error> for Error {
    fn from(error: bson::de::Error) -> Self {
        Error::BsonDeErr(Box::new(error))
    }
}

impl From<BsonErr> for Error {
    fn from(error: BsonErr) -> Self {
        Error::BsonErr(Box::new(BtWrapper {
            source: error,
            backtrace: std::backtrace::Backtrace::capture(),
        }))
    }
}

impl<T> From<PoisonError<T>> for Error {
    fn from(_: PoisonError<T>) -> Self {
        Error::LockError
    }
}

impl From<DuplicateKeyError> for Error {
    fn from(value: DuplicateKeyError) -> Self {
        Error::DuplicateKey(Box::new(value))
    }
}

impl From<io::Error> for Error {
    fn from(value: io::Error) -> Self {
        Error::IOErr(Box::new(BtWrapper {
            source: value,
            backtrace: std::backtrace::Backtrace::capture(),
        }))
    }
}

impl From<RegexError> for Error {
    fn from(value: RegexError) -> Self {
        Error::RegexError(Box::new(value))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use std::io;
    use crate::Error;

    #[test]
    fn print_value_size() {
        let size = std::mem::size_of::<Error>();
        assert!(size <= 32, "size of Error grew to {}", size);
    }

    #[test]
    fn test_io_error_code_is_os_error() {
        let err: Error = io::Error::from_raw_os_error(13).into();
        assert_eq!(err.code(), 13);

        let err: Error = io::Error::new(io::ErrorKind::Other, "no errno").into();
        assert_eq!(err.code(), 74);
    }

    #[test]
    fn test_codes_are_non_zero() {
        let errors = vec![
            Error::DatabaseOccupied,
            Error::DbIsClosed,
            Error::NotAValidDatabase,
            Error::DocumentNotFound("x".to_string()),
            Error::UnknownQueryOperator("$foo".to_string()),
        ];
        for err in errors {
            assert_ne!(err.code(), 0, "{}", err);
        }
    }
}
