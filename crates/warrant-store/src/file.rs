//! File-backed key-value engine.
//!
//! The engine keeps every live entry in memory and persists mutations to an
//! append-only JSON Lines log (`tokens.log`), one line per batch:
//!
//! ```text
//! {"ops":[{"op":"put","k":"dDph...","v":"eyJz..."},{"op":"put","k":"czow...","v":"YWJj..."}]}
//! {"ops":[{"op":"del","k":"dDph..."},{"op":"del","k":"czow..."}]}
//! ```
//!
//! Keys and values are base64 encoded. The log is replayed on open. Only an
//! unterminated final line (a write torn by a crash) may be unreadable: it is
//! dropped and the log is rewritten without it. Any other unreadable line
//! makes `open` fail.
//!
//! A failed append is truncated away before the error is returned, so the
//! next batch always starts on a clean line. If the truncation itself fails
//! the engine rejects every later write.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::KvError;
use crate::kv::{KvOp, KvStore, Map, apply, scan};

/// Name of the log file inside the data directory.
pub const LOG_FILE: &str = "tokens.log";

/// Logs with fewer entries than this are never compacted on open.
const COMPACT_MIN_ENTRIES: usize = 1024;

/// Compact on open when the log holds this many times more entries than
/// there are live keys.
const COMPACT_RATIO: usize = 2;

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
enum LogOp {
    Put { k: String, v: String },
    Del { k: String },
}

#[derive(Debug, Serialize, Deserialize)]
struct LogBatch {
    ops: Vec<LogOp>,
}

impl LogBatch {
    fn encode(ops: &[KvOp]) -> Self {
        let ops = ops
            .iter()
            .map(|op| match op {
                KvOp::Put { key, value } => LogOp::Put {
                    k: STANDARD.encode(key),
                    v: STANDARD.encode(value),
                },
                KvOp::Delete { key } => LogOp::Del {
                    k: STANDARD.encode(key),
                },
            })
            .collect();
        Self { ops }
    }

    fn decode(self) -> Result<Vec<KvOp>, base64::DecodeError> {
        self.ops
            .into_iter()
            .map(|op| match op {
                LogOp::Put { k, v } => Ok(KvOp::Put {
                    key: STANDARD.decode(k)?,
                    value: STANDARD.decode(v)?,
                }),
                LogOp::Del { k } => Ok(KvOp::Delete {
                    key: STANDARD.decode(k)?,
                }),
            })
            .collect()
    }
}

struct State {
    map: Map,
    log: File,
    /// Operations currently recorded in the log file.
    entries: usize,
    /// Set when a failed append could not be rolled back.
    failed: bool,
}

/// Durable engine rooted at a data directory.
pub struct FileKv {
    path: PathBuf,
    sync_writes: bool,
    state: RwLock<State>,
}

impl FileKv {
    /// Open (or create) the log inside `directory` and replay it.
    pub fn open(directory: impl AsRef<Path>, sync_writes: bool) -> Result<Self, KvError> {
        let directory = directory.as_ref();
        if !directory.exists() {
            fs::create_dir_all(directory).map_err(KvError::io(directory))?;
        }
        let path = directory.join(LOG_FILE);

        let (map, entries, torn) = Self::replay(&path)?;
        let log = Self::open_log(&path)?;

        let kv = Self {
            path,
            sync_writes,
            state: RwLock::new(State {
                map,
                log,
                entries,
                failed: false,
            }),
        };

        let live = {
            let state = kv.state.read().map_err(|_| KvError::LockError)?;
            tracing::info!(
                path = %kv.path.display(),
                keys = state.map.len(),
                entries = state.entries,
                "Loaded credential log"
            );
            state.map.len()
        };

        if torn || (entries >= COMPACT_MIN_ENTRIES && entries > live * COMPACT_RATIO) {
            kv.compact()?;
        }

        Ok(kv)
    }

    /// Path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_log(path: &Path) -> Result<File, KvError> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(KvError::io(path))
    }

    /// Rebuild the key space from the log. Returns the map, the number of
    /// operations replayed, and whether a torn final line was dropped.
    fn replay(path: &Path) -> Result<(Map, usize, bool), KvError> {
        let mut map = Map::new();
        let mut entries = 0;
        let mut torn = false;

        if !path.exists() {
            return Ok((map, entries, torn));
        }

        let data = fs::read(path).map_err(KvError::io(path))?;
        let terminated = data.last().is_none_or(|b| *b == b'\n');
        let lines: Vec<&[u8]> = data.split(|b| *b == b'\n').collect();
        let last = lines.len() - 1;

        for (idx, line) in lines.into_iter().enumerate() {
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            let ops = serde_json::from_slice::<LogBatch>(line)
                .map_err(|e| e.to_string())
                .and_then(|batch| batch.decode().map_err(|e| e.to_string()));

            match ops {
                Ok(ops) => {
                    entries += ops.len();
                    apply(&mut map, ops);
                }
                Err(e) if idx == last && !terminated => {
                    torn = true;
                    tracing::warn!(
                        "Dropping torn entry on line {} of {}: {}",
                        idx + 1,
                        path.display(),
                        e
                    );
                }
                Err(reason) => {
                    return Err(KvError::Corrupt {
                        path: path.to_path_buf(),
                        line: idx + 1,
                        reason,
                    });
                }
            }
        }

        Ok((map, entries, torn))
    }

    /// Append one encoded batch, truncating the log back to its previous
    /// length if any part of the write fails.
    fn append(&self, state: &mut State, line: &[u8]) -> Result<(), KvError> {
        if state.failed {
            return Err(KvError::Failed(self.path.clone()));
        }

        let offset = state.log.metadata().map_err(KvError::io(&self.path))?.len();
        let written = state
            .log
            .write_all(line)
            .and_then(|()| state.log.flush())
            .and_then(|()| {
                if self.sync_writes {
                    state.log.sync_data()
                } else {
                    Ok(())
                }
            });

        let Err(source) = written else {
            return Ok(());
        };

        match state.log.set_len(offset) {
            Ok(()) => tracing::warn!(
                path = %self.path.display(),
                offset,
                error = %source,
                "Rolled back failed append"
            ),
            Err(e) => {
                state.failed = true;
                tracing::error!(
                    path = %self.path.display(),
                    error = %e,
                    "Could not roll back failed append; rejecting further writes"
                );
            }
        }
        Err(KvError::io(&self.path)(source))
    }

    /// Rewrite the log so it holds exactly one put per live key.
    ///
    /// The new log is written to a temporary file and renamed over the old
    /// one, so a crash mid-compaction leaves the previous log intact.
    pub fn compact(&self) -> Result<(), KvError> {
        let mut state = self.state.write().map_err(|_| KvError::LockError)?;
        let tmp_path = self.path.with_extension("log.tmp");

        {
            let tmp = File::create(&tmp_path).map_err(KvError::io(&tmp_path))?;
            let mut writer = BufWriter::new(tmp);
            for (key, value) in &state.map {
                let batch = LogBatch::encode(&[KvOp::Put {
                    key: key.clone(),
                    value: value.clone(),
                }]);
                let json =
                    serde_json::to_string(&batch).map_err(|e| KvError::Encoding(e.to_string()))?;
                writeln!(writer, "{}", json).map_err(KvError::io(&tmp_path))?;
            }
            let tmp = writer
                .into_inner()
                .map_err(|e| KvError::io(&tmp_path)(e.into_error()))?;
            tmp.sync_all().map_err(KvError::io(&tmp_path))?;
        }

        fs::rename(&tmp_path, &self.path).map_err(KvError::io(&self.path))?;

        let before = state.entries;
        state.log = Self::open_log(&self.path)?;
        state.entries = state.map.len();
        state.failed = false;

        tracing::info!(
            path = %self.path.display(),
            before,
            after = state.entries,
            "Compacted credential log"
        );
        Ok(())
    }
}

impl KvStore for FileKv {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KvError> {
        let state = self.state.read().map_err(|_| KvError::LockError)?;
        Ok(state.map.get(key).cloned())
    }

    fn write_batch(&self, ops: Vec<KvOp>) -> Result<(), KvError> {
        if ops.is_empty() {
            return Ok(());
        }

        let mut line = serde_json::to_vec(&LogBatch::encode(&ops))
            .map_err(|e| KvError::Encoding(e.to_string()))?;
        line.push(b'\n');

        let mut state = self.state.write().map_err(|_| KvError::LockError)?;

        // The batch becomes visible only after it is in the log.
        self.append(&mut state, &line)?;

        state.entries += ops.len();
        apply(&mut state.map, ops);
        Ok(())
    }

    fn scan_range(
        &self,
        start: &[u8],
        end: &[u8],
        skip: usize,
        limit: usize,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, KvError> {
        let state = self.state.read().map_err(|_| KvError::LockError)?;
        Ok(scan(&state.map, start, end, skip, limit))
    }
}

impl std::fmt::Debug for FileKv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileKv")
            .field("path", &self.path)
            .field("sync_writes", &self.sync_writes)
            .finish_non_exhaustive()
    }
}
