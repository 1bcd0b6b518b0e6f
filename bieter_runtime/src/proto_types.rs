//! Hand-written protobuf types for the log record.
//!
//! Uses prost derive macros for encode/decode without prost-build.
//!
//! ```text
//! message LogRecord {
//!   uint64 sequence       = 1;
//!   uint32 schema_version = 2;
//!   string event_type     = 3;
//!   bytes  payload        = 4;
//!   bytes  checksum       = 5;
//! }
//! ```

use prost::Message;

// ── Log Record ─────────────────────────────────────────────────

#[derive(Clone, PartialEq, Message)]
pub struct ProtoLogRecord {
    #[prost(uint64, tag = "1")]
    pub sequence: u64,
    #[prost(uint32, tag = "2")]
    pub schema_version: u32,
    /// Event tag, e.g. `"create"` or `"offer-clear"`.
    #[prost(string, tag = "3")]
    pub event_type: String,
    /// JSON body of the event.
    #[prost(bytes = "vec", tag = "4")]
    pub payload: Vec<u8>,
    /// SHA-256 over sequence (LE) ‖ event_type ‖ 0x00 ‖ payload.
    #[prost(bytes = "vec", tag = "5")]
    pub checksum: Vec<u8>,
}
