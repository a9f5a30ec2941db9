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

use crate::mapper::BsonMapper;

/// Options of a [`Database`](crate::Database).
#[derive(Debug, Clone)]
pub struct Config {
    /// Number of dead frames the journal may carry before it is compacted.
    pub journal_full_size: u64,
    /// Call `fsync` after every committed frame.
    pub sync_writes: bool,
    /// How typed values are turned into documents and back.
    pub mapper: BsonMapper,
}

impl Default for Config {

    fn default() -> Self {
        Config {
            journal_full_size: 1000,
            sync_writes: false,
            mapper: BsonMapper::default(),
        }
    }

}

impl Config {

    pub fn with_mapper(mut self, mapper: BsonMapper) -> Config {
        self.mapper = mapper;
        self
    }

    pub fn with_journal_full_size(mut self, size: u64) -> Config {
        self.journal_full_size = size;
        self
    }

    pub fn with_sync_writes(mut self, sync: bool) -> Config {
        self.sync_writes = sync;
        self
    }

}
