//! PeakTech 2510 core library: serial frame synchronization and decoding.
//!
//! The instrument streams fixed 16-byte frames over a one-way serial line
//! with no length prefix and no checksum. This crate recovers frame
//! boundaries from that stream, decodes each frame into a validated
//! [`Reading`], and aggregates a run into a deterministic report.
//!
//! Layering follows the data path: byte sources (`source`) feed the
//! synchronizer and acquisition loop (`acquisition`), which hand raw frames
//! to the protocol decoder (`protocol`: layout/reader/parser). The decoder is
//! pure and never performs I/O; device access stays behind [`ByteSource`].
//!
//! Invariants:
//! - A frame is only decoded once exactly 16 bytes starting with one start
//!   word have been collected.
//! - A rejected frame never ends acquisition; only source exhaustion, a
//!   source failure or the stop signal do.
//! - Report outputs are deterministic for a given input and configuration.
//!
//! # Examples
//! ```
//! use peaktech_core::{AcquisitionConfig, InputInfo, ReplaySource, decode_source};
//!
//! let bytes = b"\x55\x0203500100002305\r".to_vec();
//! let input = InputInfo {
//!     path: "capture.bin".to_string(),
//!     format: "raw".to_string(),
//! };
//! let report = decode_source(input, ReplaySource::new(bytes), AcquisitionConfig::default());
//! assert_eq!(report.summary.readings, 1);
//! assert_eq!(report.readings[0].value, "0000230.5");
//! ```

use serde::{Deserialize, Serialize};

mod acquisition;
pub mod protocol;
mod reading;
mod source;

pub use acquisition::{
    AcquisitionConfig, AcquisitionEvent, AcquisitionLoop, AcquisitionStats, AnalysisError,
    ConfigError, DEFAULT_READ_TIMEOUT, EventSink, FnSink, FrameError, FrameSynchronizer,
    LoopExit, ReportBuilder, SinkClosed, StopSignal, SyncError, decode_capture_file,
    decode_source, sink_fn,
};
pub use protocol::{
    ANNUNCIATOR_TABLE, Annunciator, DecodeError, FrameField, RawFrame, decode_bytes,
    decode_frame, encode_reading, lookup_unit,
};
pub use reading::{DecimalPoint, DisplayId, Polarity, Reading};
pub use source::{
    ByteSource, CaptureFormat, EndOfCapture, IoSource, ReadError, ReplaySource, SourceError,
    load_capture, open_capture, parse_repr_capture,
};

/// Current report schema version.
pub const REPORT_VERSION: u32 = 1;
/// Placeholder timestamp; callers stamp the real generation time.
pub const DEFAULT_GENERATED_AT: &str = "1970-01-01T00:00:00Z";

/// Aggregated acquisition report with deterministic ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureReport {
    /// Report schema version (not the binary version).
    pub report_version: u32,
    pub tool: ToolInfo,
    /// RFC3339 timestamp representing the report generation time.
    pub generated_at: String,
    pub input: InputInfo,
    pub config: ConfigInfo,
    pub summary: CaptureSummary,
    /// Per-display summaries ordered by display id.
    pub channels: Vec<ChannelSummary>,
    /// Decoded readings in arrival order.
    pub readings: Vec<ReadingRecord>,
    /// Rejections grouped by id, ordered by id.
    pub rejections: Vec<RejectionSummary>,
}

/// Tool metadata embedded in reports.
///
/// # Examples
/// ```
/// use peaktech_core::ToolInfo;
///
/// let tool = ToolInfo {
///     name: "peaktech".to_string(),
///     version: "0.1.0".to_string(),
/// };
/// assert_eq!(tool.name, "peaktech");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    /// Tool version (semver).
    pub version: String,
}

/// Input metadata embedded in reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputInfo {
    /// Input path as provided to the decoder (`-` for stdin).
    pub path: String,
    /// Capture format name (`raw` or `repr`).
    pub format: String,
}

/// Acquisition settings the run used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigInfo {
    pub byte_budget: u64,
    pub read_timeout_ms: u64,
}

/// Run totals and the reason acquisition ended.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaptureSummary {
    pub iterations: u64,
    pub readings: u64,
    pub rejected: u64,
    /// Bytes actually delivered by the source; timeouts are not counted.
    pub bytes_read: u64,
    /// One of `stopped`, `source_exhausted`, `source_failed`, `sink_closed`.
    pub exit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_error: Option<String>,
}

/// Per-display summary.
///
/// # Examples
/// ```
/// use peaktech_core::ChannelSummary;
///
/// let channel = ChannelSummary {
///     display: 1,
///     readings: 2,
///     units: vec!["DCV".to_string()],
///     last_value: "0012.345".to_string(),
///     last_unit: "DCV".to_string(),
/// };
/// assert_eq!(channel.display, 1);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelSummary {
    /// Display id (1..=4).
    pub display: u8,
    pub readings: u64,
    /// Distinct units seen on this display, sorted.
    pub units: Vec<String>,
    pub last_value: String,
    pub last_unit: String,
}

/// One decoded reading as it appears in the report.
///
/// Values are kept as display strings so reports stay byte-for-byte stable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadingRecord {
    /// Acquisition iteration that produced the reading.
    pub index: u64,
    pub display: u8,
    /// Sign, digits and separator, e.g. `-0000230.5`.
    pub value: String,
    /// The eight display digits as sent.
    pub raw: String,
    pub decimal_point: u8,
    pub polarity: String,
    pub annunciator: String,
    pub unit: String,
}

/// Rejection class aggregated over a run.
///
/// # Examples
/// ```
/// use peaktech_core::RejectionSummary;
///
/// let rejection = RejectionSummary {
///     id: "PT-SYNC-TIMEOUT".to_string(),
///     message: "No start word within the byte budget".to_string(),
///     count: 1,
///     examples: vec!["frame 0: no frame start found within 32 bytes".to_string()],
/// };
/// assert_eq!(rejection.count, 1);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectionSummary {
    /// Stable rejection identifier (e.g., `PT-FIELD-RANGE`).
    pub id: String,
    pub message: String,
    pub count: u64,
    /// At most three examples, formatted as `frame N: error`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
}

/// Build a stub report with base fields filled and empty aggregates.
///
/// # Examples
/// ```
/// use peaktech_core::{InputInfo, make_stub_report};
///
/// let report = make_stub_report(InputInfo {
///     path: "capture.bin".to_string(),
///     format: "raw".to_string(),
/// });
/// assert_eq!(report.report_version, peaktech_core::REPORT_VERSION);
/// assert!(report.readings.is_empty());
/// ```
pub fn make_stub_report(input: InputInfo) -> CaptureReport {
    let defaults = AcquisitionConfig::default();
    CaptureReport {
        report_version: REPORT_VERSION,
        tool: ToolInfo {
            name: "peaktech".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        generated_at: DEFAULT_GENERATED_AT.to_string(),
        input,
        config: ConfigInfo::from(&defaults),
        summary: CaptureSummary::default(),
        channels: vec![],
        readings: vec![],
        rejections: vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::{InputInfo, make_stub_report};

    #[test]
    fn stub_report_serializes_without_optional_fields() {
        let report = make_stub_report(InputInfo {
            path: "capture.bin".to_string(),
            format: "raw".to_string(),
        });
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["tool"]["name"], "peaktech");
        assert_eq!(value["config"]["byte_budget"], 32);
        assert!(value["summary"].get("source_error").is_none());
        assert!(value["rejections"].as_array().unwrap().is_empty());
    }
}
