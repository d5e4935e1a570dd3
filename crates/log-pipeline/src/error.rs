//! 로그 파이프라인 에러 타입
//!
//! [`LogPipelineError`]는 로그 파이프라인 내부에서 발생하는 모든 에러를 표현합니다.
//! `From<LogPipelineError> for SyslensError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use syslens_core::error::{PipelineError, SinkError, SyslensError};

use crate::filter::FilterSyntaxError;

/// 로그 파이프라인 도메인 에러
///
/// 소켓 바인드, 수집, 필터 컴파일, 싱크 쓰기 등 파이프라인 내부의
/// 에러 상황을 포괄합니다. 디코딩 실패는 에러가 아니라 데이터입니다
/// (`LogEvent::parse_ok == false`).
#[derive(Debug, thiserror::Error)]
pub enum LogPipelineError {
    /// UDP 소켓 바인드 실패 (포트 사용 중, 권한 부족 등)
    #[error("failed to bind syslog socket on {addr}: {source}")]
    SocketBind {
        /// 바인드 시도한 주소
        addr: String,
        /// 원인
        #[source]
        source: std::io::Error,
    },

    /// 수집기 에러 (수신 루프, 태스크 조인 등)
    #[error("collector error: {source_type}: {reason}")]
    Collector {
        /// 수집 소스 유형 (syslog_udp)
        source_type: String,
        /// 에러 사유
        reason: String,
    },

    /// 필터 쿼리 문법 오류
    #[error(transparent)]
    FilterSyntax(#[from] FilterSyntaxError),

    /// 싱크 쓰기 실패
    #[error(transparent)]
    Sink(#[from] SinkError),

    /// 큐 오버플로우 (보고용, 전파되지 않음)
    #[error("queue overflow: capacity {capacity}, dropped {dropped} events")]
    BufferOverflow {
        /// 큐 최대 용량
        capacity: usize,
        /// 드롭된 이벤트 수
        dropped: u64,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LogPipelineError> for SyslensError {
    fn from(err: LogPipelineError) -> Self {
        match err {
            LogPipelineError::FilterSyntax(e) => {
                SyslensError::Pipeline(PipelineError::FilterRejected(e.to_string()))
            }
            LogPipelineError::Sink(e) => SyslensError::Sink(e),
            other => SyslensError::Pipeline(PipelineError::InitFailed(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_bind_error_display() {
        let err = LogPipelineError::SocketBind {
            addr: "0.0.0.0:514".to_owned(),
            source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "address in use"),
        };
        let msg = err.to_string();
        assert!(msg.contains("0.0.0.0:514"));
        assert!(msg.contains("address in use"));
    }

    #[test]
    fn converts_to_syslens_error() {
        let err = LogPipelineError::Collector {
            source_type: "syslog_udp".to_owned(),
            reason: "task panicked".to_owned(),
        };
        let top: SyslensError = err.into();
        assert!(matches!(
            top,
            SyslensError::Pipeline(PipelineError::InitFailed(_))
        ));
    }

    #[test]
    fn filter_syntax_maps_to_filter_rejected() {
        let err = LogPipelineError::from(FilterSyntaxError::new(3, "unexpected '&'"));
        let top: SyslensError = err.into();
        assert!(matches!(
            top,
            SyslensError::Pipeline(PipelineError::FilterRejected(_))
        ));
    }

    #[test]
    fn buffer_overflow_display() {
        let err = LogPipelineError::BufferOverflow {
            capacity: 10000,
            dropped: 5,
        };
        let msg = err.to_string();
        assert!(msg.contains("10000"));
        assert!(msg.contains("5"));
    }
}
