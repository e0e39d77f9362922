use chrono::{DateTime, Datelike, TimeZone, Timelike};
use csv::{Writer, WriterBuilder};
use flow_lab_abstract::{FlowStatus, FlowStatusRecord, RecordSink, SinkError, TcpVariant};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use tracing::info;

pub const CSV_HEADER: [&str; 7] = [
    "Time",
    "FlowID",
    "Source->Dest",
    "Throughput(Mbps)",
    "Delay(s)",
    "LinkStatus",
    "TCPVariant",
];

/// One line of the record CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsvRow {
    #[serde(rename = "Time")]
    pub time: f64,
    #[serde(rename = "FlowID")]
    pub flow_id: u32,
    #[serde(rename = "Source->Dest")]
    pub endpoints: String,
    #[serde(rename = "Throughput(Mbps)")]
    pub throughput: f64,
    #[serde(rename = "Delay(s)")]
    pub delay: f64,
    #[serde(rename = "LinkStatus")]
    pub status: FlowStatus,
    #[serde(rename = "TCPVariant")]
    pub variant: TcpVariant,
}

impl From<&FlowStatusRecord> for CsvRow {
    fn from(record: &FlowStatusRecord) -> Self {
        Self {
            time: record.time,
            flow_id: record.flow.id,
            endpoints: record.flow.endpoints(),
            throughput: record.throughput,
            delay: record.delay,
            status: record.status,
            variant: record.variant,
        }
    }
}

/// Writes records as CSV, header first, one row per record in arrival order.
pub struct CsvSink<W: Write> {
    writer: Writer<W>,
    rows: u64,
}

impl CsvSink<File> {
    pub fn create(path: &Path) -> Result<Self, SinkError> {
        info!("Writing flow records to {}", path.display());
        let file = File::create(path)?;
        Self::new(file)
    }
}

impl<W: Write> CsvSink<W> {
    pub fn new(inner: W) -> Result<Self, SinkError> {
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(inner);
        writer.write_record(CSV_HEADER).map_err(io::Error::from)?;
        Ok(Self { writer, rows: 0 })
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn into_inner(self) -> Result<W, SinkError> {
        self.writer
            .into_inner()
            .map_err(|err| SinkError::Io(io::Error::other(err.error().to_string())))
    }
}

impl<W: Write> RecordSink for CsvSink<W> {
    fn emit(&mut self, record: FlowStatusRecord) -> Result<(), SinkError> {
        self.writer
            .serialize(CsvRow::from(&record))
            .map_err(io::Error::from)?;
        self.rows += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Keeps every record in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Vec<FlowStatusRecord>,
}

impl MemorySink {
    pub fn records(&self) -> &[FlowStatusRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<FlowStatusRecord> {
        self.records
    }
}

impl RecordSink for MemorySink {
    fn emit(&mut self, record: FlowStatusRecord) -> Result<(), SinkError> {
        self.records.push(record);
        Ok(())
    }
}

/// `flow_metrics_<year>-<month>-<day>_<hour>-<min>-<sec>.csv`, fields unpadded.
pub fn timestamped_filename<Tz: TimeZone>(now: &DateTime<Tz>) -> String {
    format!(
        "flow_metrics_{}-{}-{}_{}-{}-{}.csv",
        now.year(),
        now.month(),
        now.day(),
        now.hour(),
        now.minute(),
        now.second()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use flow_lab_abstract::FlowKey;
    use flow_lab_abstract::flow::protocol;
    use std::net::{Ipv4Addr, SocketAddrV4};

    fn record(time: f64, status: FlowStatus) -> FlowStatusRecord {
        FlowStatusRecord {
            time,
            flow: FlowKey::new(
                2,
                SocketAddrV4::new(Ipv4Addr::new(10, 1, 1, 2), 50000),
                SocketAddrV4::new(Ipv4Addr::new(10, 1, 1, 1), 49153),
                protocol::TCP,
            ),
            throughput: 0.25,
            delay: 0.5,
            status,
            variant: TcpVariant::TcpWestwood,
        }
    }

    #[test]
    fn header_is_written_even_without_records() {
        let sink = CsvSink::new(Vec::new()).unwrap();
        let bytes = sink.into_inner().unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "Time,FlowID,Source->Dest,Throughput(Mbps),Delay(s),LinkStatus,TCPVariant\n"
        );
    }

    #[test]
    fn rows_follow_emission_order() {
        let mut sink = CsvSink::new(Vec::new()).unwrap();
        sink.emit(record(1.0, FlowStatus::Ok)).unwrap();
        sink.emit(record(2.0, FlowStatus::Failure)).unwrap();
        sink.flush().unwrap();
        assert_eq!(sink.rows(), 2);

        let text = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("1"));
        assert!(lines[1].ends_with(",2,10.1.1.2->10.1.1.1,0.25,0.5,OK,TcpWestwood"));
        assert!(lines[2].ends_with(",FAILURE,TcpWestwood"));

        let mut reader = csv::Reader::from_reader(text.as_bytes());
        let rows: Vec<CsvRow> = reader.deserialize().collect::<Result<_, _>>().unwrap();
        assert_eq!(rows[1], CsvRow::from(&record(2.0, FlowStatus::Failure)));
    }

    #[test]
    fn filename_fields_are_unpadded() {
        let now = Utc.with_ymd_and_hms(2025, 7, 3, 9, 5, 7).unwrap();
        assert_eq!(timestamped_filename(&now), "flow_metrics_2025-7-3_9-5-7.csv");
    }
}
