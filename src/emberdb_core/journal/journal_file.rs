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

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use byteorder::{BigEndian, ByteOrder, LittleEndian, WriteBytesExt};
use crc64fast::Digest;
use log::{debug, warn};
use memmap2::Mmap;
use crate::{Config, Error, Result};
use crate::errors::VersionMismatchError;
use crate::journal::JournalRecord;
use crate::utils::file_lock::{exclusive_lock_file, unlock_file};

static HEADER_DESP: &str        = "EmberDB Journal v1";
const DATABASE_VERSION: [u8; 4] = [0, 0, 1, 0];
const DATA_BEGIN_OFFSET: u64    = 64;

/// op + length
const FRAME_HEAD_SIZE: usize = 5;
const FRAME_CHECKSUM_SIZE: usize = 8;

/// A 16 MiB document plus the record envelope around it.
const MAX_PAYLOAD_SIZE: usize = 16 * 1024 * 1024 + 64 * 1024;

/// The smallest BSON document: its length and the trailing zero.
const MIN_PAYLOAD_SIZE: usize = 5;

fn crc64(bytes: &[u8]) -> u64 {
    let mut c = Digest::new();
    c.write(bytes);
    c.sum64()
}

fn write_header(file: &mut File) -> Result<()> {
    let mut header48: Vec<u8> = vec![0; 48];

    let title_bytes = HEADER_DESP.as_bytes();
    header48[0..title_bytes.len()].copy_from_slice(title_bytes);

    header48[32..36].copy_from_slice(&DATABASE_VERSION);

    file.seek(SeekFrom::Start(0))?;
    file.write_all(&header48)?;

    let checksum = crc64(&header48);
    file.write_u64::<BigEndian>(checksum)?;

    file.set_len(DATA_BEGIN_OFFSET)?;
    Ok(())
}

fn encode_frame(record: &JournalRecord) -> Result<Vec<u8>> {
    let payload = record.encode_payload()?;
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(Error::ValidationError(format!(
            "record of {} bytes exceeds the limit of {} bytes",
            payload.len(), MAX_PAYLOAD_SIZE,
        )));
    }

    let mut frame = Vec::with_capacity(FRAME_HEAD_SIZE + payload.len() + FRAME_CHECKSUM_SIZE);
    frame.write_u8(record.op().into())?;
    frame.write_u32::<BigEndian>(payload.len() as u32)?;
    frame.extend_from_slice(&payload);

    let checksum = crc64(&frame);
    frame.write_u64::<BigEndian>(checksum)?;

    Ok(frame)
}

/// The file behind a [`Database`](crate::Database).
///
/// name:       32 bytes
/// version:    4 bytes(offset 32)
/// checksum before 48:   8 bytes(offset 48)
/// frames begin at 64:   [op: u8][len: u32][payload][crc64 of op, len and payload]
pub(crate) struct JournalFile {
    file_path:   PathBuf,
    file:        File,
    offset:      u64,
    frame_count: u64,
    sync_writes: bool,
}

impl JournalFile {

    /// Open or create the file at `path` and return the records it holds.
    pub fn open(path: &Path, config: &Config) -> Result<(JournalFile, Vec<JournalRecord>)> {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .read(true)
            .open(path)?;
        exclusive_lock_file(&file)?;

        let meta = file.metadata()?;

        let mut result = JournalFile {
            file_path: path.to_path_buf(),
            file,
            offset: 0,
            frame_count: 0,
            sync_writes: config.sync_writes,
        };

        if meta.len() == 0 {
            result.force_init_header()?;
            debug!("journal created: {}", path.display());
            return Ok((result, Vec::new()));
        }

        result.read_and_check_header(meta.len())?;
        let records = result.replay()?;
        debug!("journal opened: {}, {} frames", path.display(), records.len());

        Ok((result, records))
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.file_path
    }

    #[inline]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    fn force_init_header(&mut self) -> Result<()> {
        write_header(&mut self.file)?;
        self.file.sync_all()?;
        self.offset = self.file.seek(SeekFrom::End(0))?;

        Ok(())
    }

    fn read_and_check_header(&mut self, file_len: u64) -> Result<()> {
        if file_len < DATA_BEGIN_OFFSET {
            return Err(Error::NotAValidDatabase);
        }

        let mut header: Vec<u8> = vec![0; DATA_BEGIN_OFFSET as usize];
        self.file.seek(SeekFrom::Start(0))?;
        self.file.read_exact(&mut header)?;

        let mut expected_title = [0u8; 32];
        let title_bytes = HEADER_DESP.as_bytes();
        expected_title[0..title_bytes.len()].copy_from_slice(title_bytes);
        if header[0..32] != expected_title {
            return Err(Error::NotAValidDatabase);
        }

        let checksum = crc64(&header[0..48]);
        let checksum_from_file = BigEndian::read_u64(&header[48..56]);
        if checksum != checksum_from_file {
            return Err(Error::ChecksumMismatch);
        }

        let mut version = [0u8; 4];
        version.copy_from_slice(&header[32..36]);
        if version != DATABASE_VERSION {
            return Err(Error::VersionMismatch(Box::new(VersionMismatchError {
                actual_version: version,
                expect_version: DATABASE_VERSION,
            })));
        }

        Ok(())
    }

    fn replay(&mut self) -> Result<Vec<JournalRecord>> {
        let file_len = self.file.metadata()?.len();
        let (records, end) = if file_len > DATA_BEGIN_OFFSET {
            let mmap = unsafe {
                Mmap::map(&self.file)?
            };
            read_frames(&mmap, DATA_BEGIN_OFFSET as usize)?
        } else {
            (Vec::new(), DATA_BEGIN_OFFSET)
        };

        if end < file_len {
            warn!(
                "journal {} ends with a torn frame, truncated from {} to {} bytes",
                self.file_path.display(), file_len, end,
            );
            self.file.set_len(end)?;
        }

        self.frame_count = records.len() as u64;
        self.offset = self.file.seek(SeekFrom::End(0))?;

        Ok(records)
    }

    /// Append one record at the end of the file.
    pub fn append(&mut self, record: &JournalRecord) -> Result<()> {
        let frame = encode_frame(record)?;

        self.file.seek(SeekFrom::Start(self.offset))?;
        if let Err(err) = self.file.write_all(&frame) {
            // drop whatever part of the frame reached the file
            let _ = self.file.set_len(self.offset);
            return Err(err.into());
        }
        self.file.flush()?;
        self.offset += frame.len() as u64;
        self.frame_count += 1;

        if self.sync_writes {
            self.file.sync_data()?;
        }

        Ok(())
    }

    fn compact_path(&self) -> PathBuf {
        let mut name = self.file_path.as_os_str().to_os_string();
        name.push(".compact");
        PathBuf::from(name)
    }

    /// Replace every frame of the file by `records`.
    ///
    /// The records go to a sibling file which is synced and then renamed
    /// over the journal. The journal is untouched until the rename, so a
    /// failure leaves it as it was.
    pub fn rewrite<I>(&mut self, records: I) -> Result<()>
    where
        I: IntoIterator<Item = JournalRecord>,
    {
        let compact_path = self.compact_path();
        let written = write_compacted(&compact_path, records);
        let (file, offset, frame_count) = match written {
            Ok(result) => result,
            Err(err) => {
                let _ = std::fs::remove_file(&compact_path);
                return Err(err);
            }
        };

        if let Err(err) = std::fs::rename(&compact_path, &self.file_path) {
            let _ = unlock_file(&file);
            let _ = std::fs::remove_file(&compact_path);
            return Err(err.into());
        }

        let old_file = std::mem::replace(&mut self.file, file);
        let _ = unlock_file(&old_file);

        debug!(
            "journal {} compacted from {} to {} frames",
            self.file_path.display(), self.frame_count, frame_count,
        );

        self.offset = offset;
        self.frame_count = frame_count;

        sync_parent_dir(&self.file_path)
    }

    pub fn sync(&mut self) -> Result<()> {
        self.file.flush()?;
        self.file.sync_all()?;
        Ok(())
    }

}

impl Drop for JournalFile {

    fn drop(&mut self) {
        let _ = unlock_file(&self.file);
    }

}

/// Write a fresh journal holding `records` at `path`, synced and locked.
/// Returns the file, its length and the number of frames.
fn write_compacted<I>(path: &Path, records: I) -> Result<(File, u64, u64)>
where
    I: IntoIterator<Item = JournalRecord>,
{
    let mut file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .read(true)
        .open(path)?;
    exclusive_lock_file(&file)?;

    write_header(&mut file)?;
    file.seek(SeekFrom::Start(DATA_BEGIN_OFFSET))?;

    let mut offset = DATA_BEGIN_OFFSET;
    let mut frame_count: u64 = 0;
    for record in records {
        let frame = encode_frame(&record)?;
        file.write_all(&frame)?;
        offset += frame.len() as u64;
        frame_count += 1;
    }

    file.flush()?;
    file.sync_all()?;

    Ok((file, offset, frame_count))
}

#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        File::open(parent)?.sync_all()?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> Result<()> {
    Ok(())
}

/// Decode frames from `start` until the end of the buffer. Returns the
/// records and the offset where the last complete frame ends.
///
/// Only the last frame may be cut short by the end of the buffer, and it
/// is left out. A length that no written frame can have is reported as a
/// checksum mismatch: the payload is a BSON document, so a length must be
/// in range and agree with the document's own length prefix.
fn read_frames(buffer: &[u8], start: usize) -> Result<(Vec<JournalRecord>, u64)> {
    let mut records = Vec::new();
    let mut pos = start;

    while pos < buffer.len() {
        if buffer.len() - pos < FRAME_HEAD_SIZE {
            break;
        }

        let op = buffer[pos];
        let len = BigEndian::read_u32(&buffer[pos + 1..pos + FRAME_HEAD_SIZE]) as usize;
        if !(MIN_PAYLOAD_SIZE..=MAX_PAYLOAD_SIZE).contains(&len) {
            return Err(Error::ChecksumMismatch);
        }

        let payload_begin = pos + FRAME_HEAD_SIZE;
        if buffer.len() - payload_begin >= 4 {
            let doc_len = LittleEndian::read_i32(&buffer[payload_begin..payload_begin + 4]);
            if doc_len < 0 || doc_len as usize != len {
                return Err(Error::ChecksumMismatch);
            }
        }

        let payload_end = payload_begin + len;
        let frame_end = payload_end + FRAME_CHECKSUM_SIZE;
        if frame_end > buffer.len() {
            break;
        }

        let checksum = crc64(&buffer[pos..payload_end]);
        let checksum_from_file = BigEndian::read_u64(&buffer[payload_end..frame_end]);
        if checksum != checksum_from_file {
            return Err(Error::ChecksumMismatch);
        }

        let record = JournalRecord::decode(op, &buffer[pos + FRAME_HEAD_SIZE..payload_end])?;
        records.push(record);

        pos = frame_end;
    }

    Ok((records, pos as u64))
}

#[cfg(test)]
mod tests {
    use std::fs::OpenOptions;
    use std::io::Write;
    use bson::doc;
    use crate::{Config, Error};
    use crate::journal::JournalRecord;
    use crate::test_utils::mk_test_path;
    use super::{JournalFile, MAX_PAYLOAD_SIZE};

    fn put(title: &str) -> JournalRecord {
        JournalRecord::Put {
            collection: "albums".to_string(),
            doc: doc! { "title": title },
        }
    }

    #[test]
    fn test_append_and_replay() {
        let path = mk_test_path("test-journal-replay");
        let config = Config::default();
        {
            let (mut journal, records) = JournalFile::open(&path, &config).unwrap();
            assert!(records.is_empty());
            journal.append(&put("Issues")).unwrap();
            journal.append(&put("Untouchables")).unwrap();
            assert_eq!(journal.frame_count(), 2);
        }

        let (journal, records) = JournalFile::open(&path, &config).unwrap();
        assert_eq!(records, vec![put("Issues"), put("Untouchables")]);
        assert_eq!(journal.frame_count(), 2);
    }

    #[test]
    fn test_torn_tail_is_truncated() {
        let path = mk_test_path("test-journal-torn");
        let config = Config::default();
        let full_len = {
            let (mut journal, _) = JournalFile::open(&path, &config).unwrap();
            journal.append(&put("Issues")).unwrap();
            std::fs::metadata(journal.path()).unwrap().len()
        };

        {
            let mut file = OpenOptions::new().append(true).open(&path).unwrap();
            file.write_all(&[0x06, 0, 0, 0, 100, 1, 2, 3]).unwrap();
        }

        let (_journal, records) = JournalFile::open(&path, &config).unwrap();
        assert_eq!(records, vec![put("Issues")]);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), full_len);
    }

    #[test]
    fn test_corrupt_frame_is_reported() {
        let path = mk_test_path("test-journal-corrupt");
        let config = Config::default();
        {
            let (mut journal, _) = JournalFile::open(&path, &config).unwrap();
            journal.append(&put("Issues")).unwrap();
        }

        let mut bytes = std::fs::read(&path).unwrap();
        let last = bytes.len() - 12;
        bytes[last] ^= 0xFF;
        std::fs::write(&path, &bytes).unwrap();

        let result = JournalFile::open(&path, &config);
        assert!(matches!(result, Err(Error::ChecksumMismatch)));
    }

    #[test]
    fn test_corrupt_length_is_reported() {
        let path = mk_test_path("test-journal-corrupt-length");
        let config = Config::default();
        {
            let (mut journal, _) = JournalFile::open(&path, &config).unwrap();
            journal.append(&put("Issues")).unwrap();
            journal.append(&put("Untouchables")).unwrap();
            journal.append(&put("Take a Look in the Mirror")).unwrap();
        }
        let full_len = std::fs::metadata(&path).unwrap().len();

        // high byte of the first frame's length
        let mut bytes = std::fs::read(&path).unwrap();
        bytes[65] = 0x7F;
        std::fs::write(&path, &bytes).unwrap();

        let result = JournalFile::open(&path, &config);
        assert!(matches!(result, Err(Error::ChecksumMismatch)));
        assert_eq!(std::fs::metadata(&path).unwrap().len(), full_len);

        // a length that still fits in the file
        bytes[65] = 0;
        bytes[68] = bytes[68].wrapping_add(1);
        std::fs::write(&path, &bytes).unwrap();

        let result = JournalFile::open(&path, &config);
        assert!(matches!(result, Err(Error::ChecksumMismatch)));
        assert_eq!(std::fs::metadata(&path).unwrap().len(), full_len);
    }

    #[test]
    fn test_failed_rewrite_keeps_journal() {
        let path = mk_test_path("test-journal-failed-rewrite");
        let config = Config::default();
        {
            let (mut journal, _) = JournalFile::open(&path, &config).unwrap();
            journal.append(&put("Issues")).unwrap();
            journal.append(&put("Untouchables")).unwrap();

            let huge = "x".repeat(MAX_PAYLOAD_SIZE);
            let result = journal.rewrite(vec![put("Issues"), put(&huge)]);
            assert!(matches!(result, Err(Error::ValidationError(_))));
            assert_eq!(journal.frame_count(), 2);
            assert!(!journal.compact_path().exists());

            journal.append(&put("Take a Look in the Mirror")).unwrap();
        }

        let (_journal, records) = JournalFile::open(&path, &config).unwrap();
        assert_eq!(records, vec![
            put("Issues"),
            put("Untouchables"),
            put("Take a Look in the Mirror"),
        ]);
    }

    #[test]
    fn test_rewrite() {
        let path = mk_test_path("test-journal-rewrite");
        let config = Config::default();
        {
            let (mut journal, _) = JournalFile::open(&path, &config).unwrap();
            for i in 0..10 {
                journal.append(&put(&format!("title-{}", i))).unwrap();
            }
            journal.rewrite(vec![put("title-9")]).unwrap();
            assert_eq!(journal.frame_count(), 1);
            assert!(!journal.compact_path().exists());
            assert!(matches!(JournalFile::open(&path, &config), Err(Error::DatabaseOccupied)));

            journal.append(&put("title-10")).unwrap();
        }

        let (_journal, records) = JournalFile::open(&path, &config).unwrap();
        assert_eq!(records, vec![put("title-9"), put("title-10")]);
    }
}
