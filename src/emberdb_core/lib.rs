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

//! EmberDB is an embedded document database.
//!
//! Documents are BSON, grouped in named collections and kept in memory. A
//! file-backed database journals every write to a single append-only file
//! and replays it on open.
//!
//! # Usage
//!
//! [Database]: ./struct.Database.html
//!
//! The [Database] structure provides all the API to get access to the DB file.
//!
//! ```rust
//! use emberdb_core::{Database, bson::doc};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Serialize, Deserialize)]
//! struct Book {
//!     title: String,
//!     author: String,
//! }
//!
//! let db = Database::open_memory().unwrap();
//! let books = db.collection::<Book>("books");
//! books.insert_one(Book {
//!     title: "The Three-Body Problem".to_string(),
//!     author: "Liu Cixin".to_string(),
//! }).unwrap();
//!
//! let book = books.find_one(doc! { "author": "Liu Cixin" }).unwrap();
//! assert!(book.is_some());
//! ```

mod coll;
mod config;
mod db;
mod db_ref;
mod index;
mod journal;
mod mapper;
mod metrics;
mod query;
mod utils;

pub mod errors;
pub mod results;

#[cfg(test)]
pub(crate) mod test_utils;

pub use coll::Collection;
pub use config::Config;
pub use db::{ClientCursor, Database};
pub use db_ref::DbRef;
pub use errors::{Error, Result};
pub use mapper::BsonMapper;
pub use metrics::Metrics;

pub extern crate bson;
