//! File-backed stores.
//!
//! Layout inside the store directory:
//! ```text
//! <stream>.jsonl               - one JSON event per line, sequence stamped
//! <stream>.snapshot.cbor.zst   - latest snapshot, CBOR envelope + zstd
//! ```

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use crate::log::{EventStore, LogEvent, ReadPage, Snapshot, SnapshotStore, StoreError};

/// Current snapshot envelope version.
const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

fn check_stream_name(stream: &str) -> Result<(), StoreError> {
    let valid = !stream.is_empty()
        && stream
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && !stream.starts_with('.');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidStream(stream.to_string()))
    }
}

/// Event store writing one newline-delimited JSON file per stream.
pub struct JsonlEventStore<E> {
    root: PathBuf,
    write_lock: Mutex<()>,
    _events: PhantomData<fn() -> E>,
}

impl<E: LogEvent> JsonlEventStore<E> {
    /// Open (creating if needed) a store rooted at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = path.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
            _events: PhantomData,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file_for(&self, stream: &str) -> Result<PathBuf, StoreError> {
        check_stream_name(stream)?;
        Ok(self.root.join(format!("{stream}.jsonl")))
    }

    /// Lines of the stream's file, or `None` when nothing was written yet.
    fn lines(&self, stream: &str) -> Result<Option<std::io::Lines<BufReader<File>>>, StoreError> {
        let path = self.file_for(stream)?;
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(BufReader::new(File::open(&path)?).lines()))
    }

    /// Number of stored events. Lines are counted, not parsed.
    fn count(&self, stream: &str) -> Result<u64, StoreError> {
        let Some(lines) = self.lines(stream)? else {
            return Ok(0);
        };
        let mut count = 0;
        for line in lines {
            if !line?.trim().is_empty() {
                count += 1;
            }
        }
        Ok(count)
    }
}

fn parse_line<E: LogEvent>(stream: &str, line_no: usize, line: &str) -> Result<E, StoreError> {
    serde_json::from_str(line).map_err(|e| {
        tracing::warn!(stream, line = line_no, "unreadable event line");
        StoreError::Corrupt {
            stream: stream.to_string(),
            line: line_no,
            reason: e.to_string(),
        }
    })
}

impl<E: LogEvent> EventStore<E> for JsonlEventStore<E> {
    fn append(
        &self,
        stream: &str,
        events: &[E],
        expected_seq: Option<u64>,
    ) -> Result<u64, StoreError> {
        let _guard = self.write_lock.lock();
        let path = self.file_for(stream)?;
        let current = self.count(stream)?;
        if let Some(expected) = expected_seq {
            if expected != current {
                return Err(StoreError::Conflict {
                    stream: stream.to_string(),
                    expected,
                    actual: current,
                });
            }
        }

        let mut buf = Vec::new();
        for (idx, event) in events.iter().enumerate() {
            let mut stamped = event.clone();
            stamped.set_sequence(current + idx as u64 + 1);
            serde_json::to_writer(&mut buf, &stamped)?;
            buf.push(b'\n');
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        file.write_all(&buf)?;
        file.sync_data()?;
        tracing::debug!(stream, count = events.len(), "appended events to jsonl log");
        Ok(current + events.len() as u64)
    }

    /// Skips earlier events unparsed and stops one line past the page, so
    /// only the requested events are deserialized.
    fn read(&self, stream: &str, from_seq: u64, limit: usize) -> Result<ReadPage<E>, StoreError> {
        let skip = from_seq.max(1) - 1;
        let mut events = Vec::new();
        let mut eof = true;
        if let Some(lines) = self.lines(stream)? {
            let mut seen = 0u64;
            for (idx, line) in lines.enumerate() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                seen += 1;
                if seen <= skip {
                    continue;
                }
                if events.len() == limit {
                    eof = false;
                    break;
                }
                events.push(parse_line(stream, idx + 1, &line)?);
            }
        }
        let last_seq = events
            .last()
            .and_then(LogEvent::sequence)
            .unwrap_or(from_seq.saturating_sub(1));
        Ok(ReadPage {
            events,
            last_seq,
            eof,
        })
    }
}

/// On-disk snapshot envelope. The digest covers the CBOR state bytes.
#[derive(Debug, Serialize, Deserialize)]
struct SnapshotEnvelope {
    schema_version: u32,
    sequence: u64,
    sha256: String,
    state: Vec<u8>,
}

/// Snapshot store keeping the latest snapshot per stream as compressed CBOR.
///
/// Loads fail closed: a digest or schema mismatch is an error, never a
/// silently empty snapshot.
pub struct FileSnapshotStore<S> {
    root: PathBuf,
    _state: PhantomData<fn() -> S>,
}

impl<S> FileSnapshotStore<S> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = path.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            _state: PhantomData,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file_for(&self, stream: &str) -> Result<PathBuf, StoreError> {
        check_stream_name(stream)?;
        Ok(self.root.join(format!("{stream}.snapshot.cbor.zst")))
    }
}

impl<S: Serialize + DeserializeOwned> SnapshotStore<S> for FileSnapshotStore<S> {
    fn load(&self, stream: &str) -> Result<Option<Snapshot<S>>, StoreError> {
        let path = self.file_for(stream)?;
        if !path.exists() {
            return Ok(None);
        }
        let compressed = std::fs::read(&path)?;
        let envelope: SnapshotEnvelope = cbor_deserialize(&zstd_decompress(&compressed)?)?;
        if envelope.schema_version != SNAPSHOT_SCHEMA_VERSION {
            return Err(StoreError::SchemaMismatch {
                file_version: envelope.schema_version,
                expected_version: SNAPSHOT_SCHEMA_VERSION,
            });
        }
        let actual = sha256_hex(&envelope.state);
        if actual != envelope.sha256 {
            tracing::warn!(stream, "snapshot digest mismatch");
            return Err(StoreError::Integrity {
                expected: envelope.sha256,
                actual,
            });
        }
        Ok(Some(Snapshot {
            state: cbor_deserialize(&envelope.state)?,
            sequence: envelope.sequence,
        }))
    }

    fn save(&self, stream: &str, state: &S, sequence: u64) -> Result<(), StoreError> {
        let path = self.file_for(stream)?;
        let state_bytes = cbor_serialize(state)?;
        let envelope = SnapshotEnvelope {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            sequence,
            sha256: sha256_hex(&state_bytes),
            state: state_bytes,
        };
        let compressed = zstd_compress(&cbor_serialize(&envelope)?)?;

        // Write-then-rename so a crash never leaves a torn snapshot behind.
        let tmp = path.with_extension("zst.tmp");
        let mut file = File::create(&tmp)?;
        file.write_all(&compressed)?;
        file.sync_all()?;
        drop(file);
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }
}

pub(crate) fn cbor_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, StoreError> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| StoreError::CborEncode(e.to_string()))?;
    Ok(buf)
}

pub(crate) fn cbor_deserialize<T: DeserializeOwned>(data: &[u8]) -> Result<T, StoreError> {
    ciborium::from_reader(data).map_err(|e| StoreError::CborDecode(e.to_string()))
}

fn zstd_compress(data: &[u8]) -> Result<Vec<u8>, StoreError> {
    let mut encoder = zstd::Encoder::new(Vec::new(), 3)?;
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn zstd_decompress(data: &[u8]) -> Result<Vec<u8>, StoreError> {
    let mut decoder = zstd::Decoder::new(data)?;
    let mut buf = Vec::new();
    decoder.read_to_end(&mut buf)?;
    Ok(buf)
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}
