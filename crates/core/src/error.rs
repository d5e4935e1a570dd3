//! 에러 타입 — 도메인별 에러 정의

/// syslens 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum SyslensError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 파이프라인 처리 에러
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// 이벤트 싱크 (표시/저장) 에러
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 파이프라인 처리 에러
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 파이프라인 초기화 실패 (소켓 바인드 실패 포함)
    #[error("pipeline init failed: {0}")]
    InitFailed(String),

    /// 이미 실행 중
    #[error("pipeline is already running")]
    AlreadyRunning,

    /// 실행 중이 아님
    #[error("pipeline is not running")]
    NotRunning,

    /// 필터 쿼리 거부
    #[error("filter rejected: {0}")]
    FilterRejected(String),
}

/// 이벤트 싱크 에러
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// 레코드 직렬화 실패
    #[error("failed to serialize record for sink '{sink}': {reason}")]
    Serialize { sink: String, reason: String },

    /// 출력 대상 쓰기 실패
    #[error("failed to write to sink '{sink}': {source}")]
    Write {
        sink: String,
        #[source]
        source: std::io::Error,
    },
}
