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

use bson::{doc, Bson, Document};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use crate::{Error, Result};

/// Operation byte of a journal frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub(crate) enum JournalOp {
    Put         = 0x06,
    Delete      = 0x08,
    Clear       = 0x0A,
    Drop        = 0x0C,
    CreateIndex = 0x10,
    DropIndex   = 0x12,
}

/// One mutation of the store. Every write goes through a record, so the
/// in-memory state and the file replay share the same code path.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum JournalRecord {
    Put { collection: String, doc: Document },
    Delete { collection: String, id: Bson },
    Clear { collection: String },
    Drop { collection: String },
    CreateIndex { collection: String, field: String },
    DropIndex { collection: String, field: String },
}

impl JournalRecord {

    pub fn op(&self) -> JournalOp {
        match self {
            JournalRecord::Put { .. } => JournalOp::Put,
            JournalRecord::Delete { .. } => JournalOp::Delete,
            JournalRecord::Clear { .. } => JournalOp::Clear,
            JournalRecord::Drop { .. } => JournalOp::Drop,
            JournalRecord::CreateIndex { .. } => JournalOp::CreateIndex,
            JournalRecord::DropIndex { .. } => JournalOp::DropIndex,
        }
    }

    pub fn collection(&self) -> &str {
        match self {
            JournalRecord::Put { collection, .. }
            | JournalRecord::Delete { collection, .. }
            | JournalRecord::Clear { collection }
            | JournalRecord::Drop { collection }
            | JournalRecord::CreateIndex { collection, .. }
            | JournalRecord::DropIndex { collection, .. } => collection.as_str(),
        }
    }

    fn payload(&self) -> Document {
        match self {
            JournalRecord::Put { collection, doc } => doc! {
                "c": collection.as_str(),
                "d": doc.clone(),
            },
            JournalRecord::Delete { collection, id } => doc! {
                "c": collection.as_str(),
                "id": id.clone(),
            },
            JournalRecord::Clear { collection } | JournalRecord::Drop { collection } => doc! {
                "c": collection.as_str(),
            },
            JournalRecord::CreateIndex { collection, field }
            | JournalRecord::DropIndex { collection, field } => doc! {
                "c": collection.as_str(),
                "f": field.as_str(),
            },
        }
    }

    pub fn encode_payload(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.payload().to_writer(&mut buffer)?;
        Ok(buffer)
    }

    pub fn decode(op: u8, bytes: &[u8]) -> Result<JournalRecord> {
        let op = JournalOp::try_from(op).map_err(|_| Error::UnknownJournalOp(op))?;
        let mut payload = Document::from_reader(bytes)?;

        let collection = take_string(&mut payload, "c")?;
        let record = match op {
            JournalOp::Put => {
                let doc = match payload.remove("d") {
                    Some(Bson::Document(doc)) => doc,
                    _ => return Err(Error::NotAValidDatabase),
                };
                JournalRecord::Put { collection, doc }
            }
            JournalOp::Delete => {
                let id = payload.remove("id").ok_or(Error::NotAValidDatabase)?;
                JournalRecord::Delete { collection, id }
            }
            JournalOp::Clear => JournalRecord::Clear { collection },
            JournalOp::Drop => JournalRecord::Drop { collection },
            JournalOp::CreateIndex => {
                let field = take_string(&mut payload, "f")?;
                JournalRecord::CreateIndex { collection, field }
            }
            JournalOp::DropIndex => {
                let field = take_string(&mut payload, "f")?;
                JournalRecord::DropIndex { collection, field }
            }
        };
        Ok(record)
    }

}

fn take_string(payload: &mut Document, key: &str) -> Result<String> {
    match payload.remove(key) {
        Some(Bson::String(value)) => Ok(value),
        _ => Err(Error::NotAValidDatabase),
    }
}
