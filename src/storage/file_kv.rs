use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::error::Result;
use crate::storage::kv::KvStore;

/// Append-only log-backed key-value store.
///
/// Every mutation is appended as a length-prefixed, crc-checked bincode
/// frame; opening replays the log into an in-memory map, which serves all
/// reads. Replay stops at the first corrupt frame (a torn tail write), so
/// everything before it survives a crash. The log is never compacted;
/// snapshot traffic is one frame per document write, which stays small for
/// the short-document workloads this engine targets.
pub struct FileKvStore {
    path: PathBuf,
    file: Mutex<File>,
    map: RwLock<HashMap<Vec<u8>, Vec<u8>>>,
}

#[derive(Serialize, Deserialize)]
enum LogRecord {
    Set { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

impl FileKvStore {
    /// Opens the store at `path`, creating it when absent.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let map = replay(&path)?;
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(FileKvStore {
            path,
            file: Mutex::new(file),
            map: RwLock::new(map),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, record: &LogRecord) -> Result<()> {
        let payload = bincode::serialize(record)?;
        let mut file = self.file.lock();
        file.write_all(&(payload.len() as u32).to_le_bytes())?;
        file.write_all(&crc32fast::hash(&payload).to_le_bytes())?;
        file.write_all(&payload)?;
        Ok(())
    }
}

fn replay(path: &Path) -> Result<HashMap<Vec<u8>, Vec<u8>>> {
    let mut map = HashMap::new();
    let mut contents = Vec::new();
    match File::open(path) {
        Ok(mut file) => {
            file.read_to_end(&mut contents)?;
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(map),
        Err(err) => return Err(err.into()),
    }

    let mut offset = 0;
    while offset + 8 <= contents.len() {
        let length = u32::from_le_bytes(contents[offset..offset + 4].try_into().unwrap()) as usize;
        let checksum = u32::from_le_bytes(contents[offset + 4..offset + 8].try_into().unwrap());
        let start = offset + 8;
        let Some(payload) = contents.get(start..start + length) else {
            warn!(path = %path.display(), offset, "truncated record, dropping log tail");
            break;
        };
        if crc32fast::hash(payload) != checksum {
            warn!(path = %path.display(), offset, "checksum mismatch, dropping log tail");
            break;
        }
        match bincode::deserialize(payload) {
            Ok(LogRecord::Set { key, value }) => {
                map.insert(key, value);
            }
            Ok(LogRecord::Delete { key }) => {
                map.remove(&key);
            }
            Err(err) => {
                warn!(path = %path.display(), offset, error = %err, "undecodable record, skipping");
            }
        }
        offset = start + length;
    }
    Ok(map)
}

impl KvStore for FileKvStore {
    fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.append(&LogRecord::Set {
            key: key.to_vec(),
            value: value.to_vec(),
        })?;
        self.map.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.map.read().get(key).cloned())
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.append(&LogRecord::Delete { key: key.to_vec() })?;
        self.map.write().remove(key);
        Ok(())
    }

    fn for_each(&self, visit: &mut dyn FnMut(&[u8], &[u8])) -> Result<()> {
        for (key, value) in self.map.read().iter() {
            visit(key, value);
        }
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.file.lock().sync_all()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKvStore::open(dir.path().join("test.kv")).unwrap();

        store.set(b"alpha", b"1").unwrap();
        store.set(b"beta", b"2").unwrap();
        store.set(b"alpha", b"3").unwrap();
        assert_eq!(store.get(b"alpha").unwrap(), Some(b"3".to_vec()));

        store.delete(b"beta").unwrap();
        assert_eq!(store.get(b"beta").unwrap(), None);
    }

    #[test]
    fn reopen_replays_the_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.kv");
        {
            let store = FileKvStore::open(&path).unwrap();
            store.set(b"alpha", b"1").unwrap();
            store.set(b"beta", b"2").unwrap();
            store.delete(b"alpha").unwrap();
            store.close().unwrap();
        }

        let store = FileKvStore::open(&path).unwrap();
        assert_eq!(store.get(b"alpha").unwrap(), None);
        assert_eq!(store.get(b"beta").unwrap(), Some(b"2".to_vec()));

        let mut seen = Vec::new();
        store
            .for_each(&mut |key, value| seen.push((key.to_vec(), value.to_vec())))
            .unwrap();
        assert_eq!(seen, vec![(b"beta".to_vec(), b"2".to_vec())]);
    }

    #[test]
    fn torn_tail_write_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.kv");
        {
            let store = FileKvStore::open(&path).unwrap();
            store.set(b"alpha", b"1").unwrap();
            store.set(b"beta", b"2").unwrap();
            store.close().unwrap();
        }
        // Chop into the last frame to simulate a crash mid-append.
        let length = std::fs::metadata(&path).unwrap().len();
        let file = OpenOptions::new().write(true).open(&path).unwrap();
        file.set_len(length - 3).unwrap();

        let store = FileKvStore::open(&path).unwrap();
        assert_eq!(store.get(b"alpha").unwrap(), Some(b"1".to_vec()));
        assert_eq!(store.get(b"beta").unwrap(), None);
    }
}
