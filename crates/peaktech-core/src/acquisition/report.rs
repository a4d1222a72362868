use std::collections::BTreeMap;

use super::config::AcquisitionConfig;
use super::error::FrameError;
use super::sink::{AcquisitionEvent, EventSink, SinkClosed};
use super::{AcquisitionStats, LoopExit};
use crate::reading::Reading;
use crate::{
    CaptureReport, CaptureSummary, ChannelSummary, ConfigInfo, InputInfo, ReadingRecord,
    RejectionSummary, make_stub_report,
};

const MAX_EXAMPLES: usize = 3;

#[derive(Debug, Default)]
struct ChannelStats {
    readings: u64,
    units: Vec<String>,
    last_value: String,
    last_unit: String,
}

#[derive(Debug)]
struct RejectionStats {
    message: &'static str,
    count: u64,
    examples: Vec<String>,
}

/// Event sink that aggregates a whole run into a [`CaptureReport`].
///
/// Each event is numbered by the acquisition iteration that produced it.
#[derive(Debug, Default)]
pub struct ReportBuilder {
    next_index: u64,
    readings: Vec<ReadingRecord>,
    channels: BTreeMap<u8, ChannelStats>,
    rejections: BTreeMap<&'static str, RejectionStats>,
    source_error: Option<String>,
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn add_reading(&mut self, index: u64, reading: &Reading) {
        let record = ReadingRecord::from_reading(index, reading);
        let channel = self.channels.entry(record.display).or_default();
        channel.readings += 1;
        if !channel.units.iter().any(|unit| unit == &record.unit) {
            channel.units.push(record.unit.clone());
            channel.units.sort();
        }
        channel.last_value = record.value.clone();
        channel.last_unit = record.unit.clone();
        self.readings.push(record);
    }

    fn add_rejection(&mut self, index: u64, err: &FrameError) {
        let entry = self.rejections.entry(err.id()).or_insert(RejectionStats {
            message: err.summary(),
            count: 0,
            examples: Vec::new(),
        });
        entry.count += 1;
        if entry.examples.len() < MAX_EXAMPLES {
            entry.examples.push(format!("frame {index}: {err}"));
        }
    }

    pub fn finish(
        self,
        input: InputInfo,
        config: &AcquisitionConfig,
        stats: AcquisitionStats,
        exit: LoopExit,
    ) -> CaptureReport {
        let mut report = make_stub_report(input);
        report.config = ConfigInfo::from(config);
        report.summary = CaptureSummary {
            iterations: stats.iterations,
            readings: stats.readings,
            rejected: stats.rejected,
            bytes_read: stats.bytes_read,
            exit: exit.as_str().to_string(),
            source_error: self.source_error,
        };
        report.channels = self
            .channels
            .into_iter()
            .map(|(display, stats)| ChannelSummary {
                display,
                readings: stats.readings,
                units: stats.units,
                last_value: stats.last_value,
                last_unit: stats.last_unit,
            })
            .collect();
        report.readings = self.readings;
        report.rejections = self
            .rejections
            .into_iter()
            .map(|(id, stats)| RejectionSummary {
                id: id.to_string(),
                message: stats.message.to_string(),
                count: stats.count,
                examples: stats.examples,
            })
            .collect();
        report
    }
}

impl EventSink for ReportBuilder {
    fn accept(&mut self, event: AcquisitionEvent) -> Result<(), SinkClosed> {
        let index = self.next_index;
        match &event {
            AcquisitionEvent::Reading(reading) => self.add_reading(index, reading),
            AcquisitionEvent::Rejected(err) => self.add_rejection(index, err),
            AcquisitionEvent::SourceExhausted => {}
            AcquisitionEvent::SourceFailed(message) => self.source_error = Some(message.clone()),
        }
        self.next_index += 1;
        Ok(())
    }
}

impl ReadingRecord {
    pub(crate) fn from_reading(index: u64, reading: &Reading) -> Self {
        Self {
            index,
            display: reading.display().get(),
            value: reading.display_reading(),
            raw: reading.display_reading_raw().to_string(),
            decimal_point: reading.decimal_point().places(),
            polarity: reading.polarity().as_str().to_string(),
            annunciator: reading.annunciator().code().to_string(),
            unit: reading.unit().to_string(),
        }
    }
}

impl From<&AcquisitionConfig> for ConfigInfo {
    fn from(config: &AcquisitionConfig) -> Self {
        Self {
            byte_budget: config.byte_budget() as u64,
            read_timeout_ms: config.read_timeout().as_millis() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ReportBuilder;
    use crate::acquisition::sink::{AcquisitionEvent, EventSink};
    use crate::acquisition::{AcquisitionConfig, AcquisitionStats, FrameError, LoopExit};
    use crate::protocol::decode_bytes;
    use crate::{DecodeError, InputInfo};

    fn input() -> InputInfo {
        InputInfo {
            path: "capture.bin".to_string(),
            format: "raw".to_string(),
        }
    }

    fn reading(wire: &[u8; 16]) -> AcquisitionEvent {
        AcquisitionEvent::Reading(decode_bytes(wire).unwrap())
    }

    #[test]
    fn channels_track_units_and_last_value() {
        let mut builder = ReportBuilder::new();
        builder.accept(reading(b"\x0203500100002305\r")).unwrap();
        builder.accept(reading(b"\x0203340200001200\r")).unwrap();
        builder.accept(reading(b"\x0213501100002310\r")).unwrap();
        let report = builder.finish(
            input(),
            &AcquisitionConfig::default(),
            AcquisitionStats::default(),
            LoopExit::SourceExhausted,
        );

        assert_eq!(report.channels.len(), 1);
        let channel = &report.channels[0];
        assert_eq!(channel.display, 3);
        assert_eq!(channel.readings, 3);
        assert_eq!(channel.units, vec!["ACV".to_string(), "DCV".to_string()]);
        assert_eq!(channel.last_value, "-0000231.0");
        assert_eq!(channel.last_unit, "ACV");
        assert_eq!(report.readings[1].value, "000012.00");
        assert_eq!(report.readings[2].index, 2);
    }

    #[test]
    fn rejections_are_grouped_with_bounded_examples() {
        let mut builder = ReportBuilder::new();
        for _ in 0..5 {
            builder
                .accept(AcquisitionEvent::Rejected(FrameError::SynchronizationTimeout {
                    budget: 32,
                }))
                .unwrap();
        }
        builder
            .accept(AcquisitionEvent::Rejected(FrameError::Decode(
                DecodeError::UnknownAnnunciatorCode { code: *b"99" },
            )))
            .unwrap();
        let report = builder.finish(
            input(),
            &AcquisitionConfig::default(),
            AcquisitionStats::default(),
            LoopExit::Stopped,
        );

        let ids: Vec<&str> = report.rejections.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["PT-SYNC-TIMEOUT", "PT-UNKNOWN-ANNUNCIATOR"]);
        assert_eq!(report.rejections[0].count, 5);
        assert_eq!(report.rejections[0].examples.len(), 3);
        assert_eq!(
            report.rejections[1].examples,
            vec!["frame 5: unknown annunciator code '99'".to_string()]
        );
        assert_eq!(report.summary.exit, "stopped");
    }

    #[test]
    fn source_failure_is_recorded() {
        let mut builder = ReportBuilder::new();
        builder
            .accept(AcquisitionEvent::SourceFailed("unplugged".to_string()))
            .unwrap();
        let report = builder.finish(
            input(),
            &AcquisitionConfig::default(),
            AcquisitionStats::default(),
            LoopExit::SourceFailed,
        );
        assert_eq!(report.summary.source_error.as_deref(), Some("unplugged"));
        assert_eq!(report.config.byte_budget, 32);
        assert_eq!(report.config.read_timeout_ms, 1000);
    }
}
