//! Append-only event log backed by a binary protobuf file.
//!
//! Storage format: length-prefixed protobuf frames.
//!   [4-byte LE length][protobuf bytes][4-byte LE length][protobuf bytes]...
//!
//! Rules:
//!   - Strict append only: no mutation, no reordering
//!   - One write per record, fsync after every write
//!   - Sequence strictly increasing from 1 (validated on append and load)
//!   - A partial frame at the tail is a torn write and is cut off on open;
//!     any other damage fails the open

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};

use bieter_engine::SCHEMA_VERSION;
use prost::Message;
use thiserror::Error;
use tracing::{debug, warn};

use crate::proto_bridge::record_checksum;
use crate::proto_types::ProtoLogRecord;

/// Largest frame we accept.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Errors of the durable log. None of these are shown to end users.
#[derive(Debug, Error)]
pub enum EventLogError {
    #[error("event log i/o: {0}")]
    Io(#[from] io::Error),

    #[error("sequence violation in event log: expected {expected}, got {got}")]
    SequenceViolation { expected: u64, got: u64 },

    #[error("invalid frame length {len} at offset {offset}")]
    InvalidFrameLength { offset: u64, len: usize },

    #[error("protobuf decode error at offset {offset}: {source}")]
    Decode {
        offset: u64,
        #[source]
        source: prost::DecodeError,
    },

    #[error("checksum mismatch in record {sequence}")]
    ChecksumMismatch { sequence: u64 },

    #[error("record {sequence} has unsupported schema version {version}")]
    UnsupportedSchema { sequence: u64, version: u32 },

    #[error("record {sequence} cannot be decoded: {source}")]
    Event {
        sequence: u64,
        #[source]
        source: bieter_engine::error::DecodeError,
    },

    #[error("event cannot be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Result of scanning a log file.
struct Scan {
    records: Vec<ProtoLogRecord>,
    /// Offset just past the last complete frame.
    valid_len: u64,
    file_len: u64,
}

/// Append-only event log backed by a binary file.
#[derive(Debug)]
pub struct EventLog {
    path: PathBuf,
    last_sequence: u64,
}

impl EventLog {
    /// Open or create an event log at the given path.
    ///
    /// Reads existing records to determine the last sequence number and
    /// truncates a torn trailing frame.
    pub fn open(path: &Path) -> Result<Self, EventLogError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let last_sequence = if path.exists() {
            let scan = Self::scan_file(path)?;
            if scan.valid_len < scan.file_len {
                warn!(
                    path = %path.display(),
                    valid_len = scan.valid_len,
                    file_len = scan.file_len,
                    "truncating partial trailing record"
                );
                let file = OpenOptions::new().write(true).open(path)?;
                file.set_len(scan.valid_len)?;
                file.sync_all()?;
            }
            scan.records.last().map(|r| r.sequence).unwrap_or(0)
        } else {
            0
        };

        Ok(Self {
            path: path.to_path_buf(),
            last_sequence,
        })
    }

    /// Append a single record.
    ///
    /// Validates strict sequence ordering, writes the length prefix and the
    /// protobuf bytes with one write, then fsyncs.
    pub fn append(&mut self, record: &ProtoLogRecord) -> Result<(), EventLogError> {
        let expected = self.last_sequence + 1;
        if record.sequence != expected {
            return Err(EventLogError::SequenceViolation {
                expected,
                got: record.sequence,
            });
        }

        let body = record.encode_to_vec();
        let mut frame = Vec::with_capacity(4 + body.len());
        frame.extend_from_slice(&(body.len() as u32).to_le_bytes());
        frame.extend_from_slice(&body);

        // A missing file is only acceptable before the first record.
        let mut file = OpenOptions::new()
            .create(self.last_sequence == 0)
            .append(true)
            .open(&self.path)?;
        let start = file.metadata()?.len();
        if let Err(err) = write_frame(&mut file, &frame) {
            // Cut off a torn frame so later appends stay readable.
            if let Err(rollback) = file.set_len(start) {
                warn!(error = %rollback, "cannot roll back failed append");
            }
            return Err(err.into());
        }

        debug!(
            sequence = record.sequence,
            event_type = %record.event_type,
            bytes = frame.len(),
            "appended record"
        );
        self.last_sequence = record.sequence;
        Ok(())
    }

    /// Load all records in sequence order.
    pub fn load_all(&self) -> Result<Vec<ProtoLogRecord>, EventLogError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        Ok(Self::scan_file(&self.path)?.records)
    }

    /// Last durable sequence number, 0 for an empty log.
    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    /// Sequence the next appended record must carry.
    pub fn next_sequence(&self) -> u64 {
        self.last_sequence + 1
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every complete frame, validating integrity and ordering.
    fn scan_file(path: &Path) -> Result<Scan, EventLogError> {
        let file = File::open(path)?;
        let file_len = file.metadata()?.len();
        let mut reader = BufReader::new(file);
        let mut records = Vec::new();
        let mut offset: u64 = 0;

        loop {
            let mut len_buf = [0u8; 4];
            if !read_full(&mut reader, &mut len_buf)? {
                break;
            }

            let len = u32::from_le_bytes(len_buf) as usize;
            if len == 0 && rest_is_zero(&mut reader)? {
                // Zero-filled tail: the file grew before the frame reached disk.
                break;
            }
            if len == 0 || len > MAX_FRAME_LEN {
                return Err(EventLogError::InvalidFrameLength { offset, len });
            }

            let mut frame = vec![0u8; len];
            if !read_full(&mut reader, &mut frame)? {
                break;
            }

            let record = ProtoLogRecord::decode(frame.as_slice())
                .map_err(|source| EventLogError::Decode { offset, source })?;
            let previous = records.last().map_or(0, |r: &ProtoLogRecord| r.sequence);
            verify_record(&record, previous)?;

            records.push(record);
            offset += 4 + len as u64;
        }

        Ok(Scan {
            records,
            valid_len: offset,
            file_len,
        })
    }
}

fn write_frame(file: &mut File, frame: &[u8]) -> io::Result<()> {
    file.write_all(frame)?;
    file.flush()?;
    file.sync_all()
}

/// Fill `buf` completely. Returns false if the input ended first, whether
/// at a frame boundary or inside a torn frame.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<bool> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}

/// Consume the rest of the input. True if every remaining byte is zero.
fn rest_is_zero<R: Read>(reader: &mut R) -> io::Result<bool> {
    let mut buf = [0u8; 4096];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => return Ok(true),
            Ok(n) => {
                if buf[..n].iter().any(|&b| b != 0) {
                    return Ok(false);
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
}

fn verify_record(record: &ProtoLogRecord, previous: u64) -> Result<(), EventLogError> {
    if record.schema_version != SCHEMA_VERSION {
        return Err(EventLogError::UnsupportedSchema {
            sequence: record.sequence,
            version: record.schema_version,
        });
    }
    let expected = previous + 1;
    if record.sequence != expected {
        return Err(EventLogError::SequenceViolation {
            expected,
            got: record.sequence,
        });
    }
    let checksum = record_checksum(record.sequence, &record.event_type, &record.payload);
    if checksum != record.checksum {
        return Err(EventLogError::ChecksumMismatch {
            sequence: record.sequence,
        });
    }
    Ok(())
}
