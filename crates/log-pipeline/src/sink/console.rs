//! 콘솔 싱크

use std::io::{self, Write};

use syslens_core::error::SinkError;
use syslens_core::pipeline::EventSink;
use syslens_core::types::LogEvent;

const SINK_NAME: &str = "console";

/// 이벤트를 `LogEvent`의 `Display` 형식으로 한 줄씩 씁니다.
///
/// 출력 대상은 `Write`를 구현하는 무엇이든 됩니다 (표준 출력, 테스트용 `Vec<u8>`).
#[derive(Debug)]
pub struct ConsoleSink<W> {
    writer: W,
}

impl ConsoleSink<io::Stdout> {
    /// 표준 출력에 쓰는 싱크
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> ConsoleSink<W> {
    /// 주어진 writer로 싱크를 만듭니다.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// 내부 writer를 돌려받습니다.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_error(source: io::Error) -> SinkError {
        SinkError::Write {
            sink: SINK_NAME.to_owned(),
            source,
        }
    }
}

impl<W: Write + Send> EventSink for ConsoleSink<W> {
    fn name(&self) -> &str {
        SINK_NAME
    }

    fn accept(&mut self, event: &LogEvent) -> Result<(), SinkError> {
        writeln!(self.writer, "{event}").map_err(Self::write_error)
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.writer.flush().map_err(Self::write_error)
    }
}
