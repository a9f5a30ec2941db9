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

use std::fmt;
use std::time::Duration;
use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Album {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(default)]
    pub year: Option<i32>,
    pub title: String,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub songs: Option<Vec<Song>>,
}

impl Album {

    pub fn new(year: i32, title: &str, songs: Vec<Song>) -> Album {
        Album {
            id: None,
            year: Some(year),
            title: title.to_string(),
            artist: None,
            songs: Some(songs),
        }
    }

}

impl fmt::Display for Album {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.year {
            Some(year) => write!(f, "{} - {}", year, self.title),
            None => write!(f, " - {}", self.title),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub track_number: i32,
    pub title: String,
    #[serde(with = "duration_millis")]
    pub length: Duration,
}

impl Song {

    pub fn new(track_number: i32, title: &str, minutes: u64, seconds: u64) -> Song {
        Song {
            track_number,
            title: title.to_string(),
            length: Duration::from_secs(minutes * 60 + seconds),
        }
    }

}

/// Render a list of albums on one line.
pub struct AlbumList<'a>(pub &'a [Album]);

impl fmt::Display for AlbumList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (index, album) in self.0.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", album)?;
        }
        write!(f, "]")
    }
}

/// Durations are stored as whole milliseconds.
mod duration_millis {
    use std::time::Duration;
    use serde::{Deserialize, Deserializer, Serializer};
    use serde::de::Error;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = i64::try_from(value.as_millis()).map_err(serde::ser::Error::custom)?;
        serializer.serialize_i64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let millis = i64::deserialize(deserializer)?;
        let millis = u64::try_from(millis).map_err(|_| D::Error::custom("negative duration"))?;
        Ok(Duration::from_millis(millis))
    }
}
