//! 일별 JSON lines 파일 싱크
//!
//! `<log_dir>/<prefix>_<YYYY-MM-DD>.json.log` 파일에 이벤트를 한 줄에 하나씩 추가합니다.
//! 날짜는 이벤트의 **수신 시각**(로컬 시간) 기준이며, 날짜가 바뀌면 새 파일로 넘어갑니다.
//!
//! 이 싱크가 자기 파일의 유일한 writer입니다.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use syslens_core::error::SinkError;
use syslens_core::pipeline::EventSink;
use syslens_core::types::LogEvent;
use tracing::info;

const SINK_NAME: &str = "daily-file";

/// 파일 한 줄에 기록되는 레코드
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    /// 수신 시각 (RFC 3339)
    pub received_at: DateTime<Local>,
    /// 송신자 주소 (`ip:port`)
    pub source: String,
    /// 구조 파싱 성공 여부
    pub parsed: bool,
    /// PRI 값
    pub priority: Option<u8>,
    /// facility 이름
    pub facility: Option<String>,
    /// severity 이름
    pub severity: Option<String>,
    /// 헤더 타임스탬프
    pub timestamp: Option<NaiveDateTime>,
    pub hostname: Option<String>,
    pub process: Option<String>,
    pub pid: Option<u32>,
    pub message: String,
    /// 원본 페이로드
    pub raw_message: String,
}

impl From<&LogEvent> for DailyRecord {
    fn from(event: &LogEvent) -> Self {
        Self {
            received_at: event.received_at,
            source: event.source.to_string(),
            parsed: event.parse_ok,
            priority: event.priority.map(|p| p.value()),
            facility: event.facility().map(|f| f.as_str().to_owned()),
            severity: event.severity().map(|s| s.as_str().to_owned()),
            timestamp: event.timestamp,
            hostname: event.hostname.clone(),
            process: event.process.clone(),
            pid: event.pid,
            message: event.message.clone(),
            raw_message: event.raw_message.clone(),
        }
    }
}

/// 현재 열려 있는 날짜 파일
#[derive(Debug)]
struct DayFile {
    date: NaiveDate,
    path: PathBuf,
    writer: BufWriter<File>,
}

/// 로컬 날짜별 파일에 JSON lines로 저장하는 싱크
///
/// 파일은 첫 이벤트가 들어올 때 열립니다 (디렉토리가 없으면 생성).
#[derive(Debug)]
pub struct DailyFileSink {
    log_dir: PathBuf,
    prefix: String,
    current: Option<DayFile>,
}

impl DailyFileSink {
    /// 새 싱크를 만듭니다. 파일은 아직 열지 않습니다.
    pub fn new(log_dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            log_dir: log_dir.into(),
            prefix: prefix.into(),
            current: None,
        }
    }

    /// 주어진 날짜의 파일 경로
    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.log_dir
            .join(format!("{}_{}.json.log", self.prefix, date.format("%Y-%m-%d")))
    }

    /// 현재 열려 있는 파일 경로
    pub fn current_path(&self) -> Option<&Path> {
        self.current.as_ref().map(|day| day.path.as_path())
    }

    fn write_error(source: io::Error) -> SinkError {
        SinkError::Write {
            sink: SINK_NAME.to_owned(),
            source,
        }
    }

    /// 날짜에 맞는 writer를 돌려줍니다. 날짜가 바뀌었으면 이전 파일을 flush하고 새 파일을 엽니다.
    fn writer_for(&mut self, date: NaiveDate) -> Result<&mut BufWriter<File>, SinkError> {
        let stale = self.current.as_ref().is_some_and(|day| day.date != date);
        if stale {
            if let Some(mut previous) = self.current.take() {
                previous.writer.flush().map_err(Self::write_error)?;
                info!(path = %previous.path.display(), "closed daily log file");
            }
        }

        if self.current.is_none() {
            fs::create_dir_all(&self.log_dir).map_err(Self::write_error)?;
            let path = self.path_for(date);
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(Self::write_error)?;
            info!(path = %path.display(), "opened daily log file");
            self.current = Some(DayFile {
                date,
                path,
                writer: BufWriter::new(file),
            });
        }

        match self.current.as_mut() {
            Some(day) => Ok(&mut day.writer),
            None => Err(Self::write_error(io::Error::other("daily log file unavailable"))),
        }
    }
}

impl EventSink for DailyFileSink {
    fn name(&self) -> &str {
        SINK_NAME
    }

    fn accept(&mut self, event: &LogEvent) -> Result<(), SinkError> {
        let record = DailyRecord::from(event);
        let mut line = serde_json::to_vec(&record).map_err(|e| SinkError::Serialize {
            sink: SINK_NAME.to_owned(),
            reason: e.to_string(),
        })?;
        line.push(b'\n');

        let writer = self.writer_for(event.received_at.date_naive())?;
        writer.write_all(&line).map_err(Self::write_error)
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        match self.current.as_mut() {
            Some(day) => day.writer.flush().map_err(Self::write_error),
            None => Ok(()),
        }
    }
}
