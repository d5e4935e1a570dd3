//! 설정 관리 — syslens.toml 파싱 및 런타임 설정
//!
//! [`SyslensConfig`]는 모든 모듈의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`SYSLENS_LISTENER_PORT=5514` 형식)
//! 3. 설정 파일 (`syslens.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), syslens_core::error::SyslensError> {
//! use syslens_core::config::SyslensConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = SyslensConfig::load("syslens.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = SyslensConfig::parse("[listener]\nport = 5514")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, SyslensError};
use crate::types::Severity;

/// 1024 미만 포트는 특권 포트로 취급
const PRIVILEGED_PORT_LIMIT: u16 = 1024;

/// syslens 통합 설정
///
/// `syslens.toml` 파일의 최상위 구조를 나타냅니다.
/// 각 모듈은 자기 섹션만 읽어 사용합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyslensConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// UDP 리스너 설정
    #[serde(default)]
    pub listener: ListenerConfig,
    /// 이벤트 큐 설정
    #[serde(default)]
    pub queue: QueueConfig,
    /// 필터 설정
    #[serde(default)]
    pub filter: FilterConfig,
    /// 콘솔 표시 설정
    #[serde(default)]
    pub display: DisplayConfig,
    /// 일별 파일 저장 설정
    #[serde(default)]
    pub storage: StorageConfig,
    /// Prometheus 메트릭 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl SyslensConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    ///
    /// 설정 로딩 순서:
    /// 1. TOML 파일 파싱
    /// 2. 환경변수 오버라이드 적용
    /// 3. 검증
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, SyslensError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, SyslensError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SyslensError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                SyslensError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, SyslensError> {
        toml::from_str(toml_str).map_err(|e| {
            SyslensError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `SYSLENS_{SECTION}_{FIELD}`
    /// 예: `SYSLENS_STORAGE_LOG_DIR=/var/log/syslens`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "SYSLENS_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "SYSLENS_GENERAL_LOG_FORMAT");

        // Listener
        override_string(
            &mut self.listener.bind_addr,
            "SYSLENS_LISTENER_BIND_ADDR",
        );
        override_u16(&mut self.listener.port, "SYSLENS_LISTENER_PORT");
        override_usize(
            &mut self.listener.max_message_size,
            "SYSLENS_LISTENER_MAX_MESSAGE_SIZE",
        );

        // Queue
        override_usize(&mut self.queue.capacity, "SYSLENS_QUEUE_CAPACITY");
        override_string(&mut self.queue.drop_policy, "SYSLENS_QUEUE_DROP_POLICY");

        // Filter
        override_string(&mut self.filter.query, "SYSLENS_FILTER_QUERY");
        override_string(
            &mut self.filter.min_severity,
            "SYSLENS_FILTER_MIN_SEVERITY",
        );

        // Display
        override_bool(&mut self.display.enabled, "SYSLENS_DISPLAY_ENABLED");

        // Storage
        override_bool(&mut self.storage.enabled, "SYSLENS_STORAGE_ENABLED");
        override_string(&mut self.storage.log_dir, "SYSLENS_STORAGE_LOG_DIR");
        override_string(
            &mut self.storage.file_prefix,
            "SYSLENS_STORAGE_FILE_PREFIX",
        );
        override_bool(
            &mut self.storage.record_unfiltered,
            "SYSLENS_STORAGE_RECORD_UNFILTERED",
        );

        // Metrics
        override_bool(&mut self.metrics.enabled, "SYSLENS_METRICS_ENABLED");
        override_string(
            &mut self.metrics.listen_addr,
            "SYSLENS_METRICS_LISTEN_ADDR",
        );
        override_u16(&mut self.metrics.port, "SYSLENS_METRICS_PORT");
        override_string(&mut self.metrics.endpoint, "SYSLENS_METRICS_ENDPOINT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), SyslensError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if self.listener.bind_addr.trim().is_empty() {
            return Err(invalid("listener.bind_addr", "must not be empty"));
        }
        if self.listener.max_message_size == 0 {
            return Err(invalid("listener.max_message_size", "must be greater than 0"));
        }
        if self.listener.port != 0 && self.listener.port < PRIVILEGED_PORT_LIMIT {
            warn!(
                port = self.listener.port,
                "listener port is privileged; binding may require elevated rights and many agents refuse ports below 1024"
            );
        }

        if self.queue.capacity == 0 {
            return Err(invalid("queue.capacity", "must be greater than 0"));
        }
        let valid_policies = ["oldest", "newest"];
        if !valid_policies.contains(&self.queue.drop_policy.to_lowercase().as_str()) {
            return Err(invalid(
                "queue.drop_policy",
                format!("must be one of: {}", valid_policies.join(", ")),
            ));
        }

        if self.filter.min_severity_level().is_none() {
            return Err(invalid(
                "filter.min_severity",
                format!("unknown severity '{}'", self.filter.min_severity),
            ));
        }

        if self.storage.enabled {
            if self.storage.log_dir.trim().is_empty() {
                return Err(invalid("storage.log_dir", "must not be empty"));
            }
            if self.storage.file_prefix.trim().is_empty() {
                return Err(invalid("storage.file_prefix", "must not be empty"));
            }
        }

        if self.metrics.enabled && !self.metrics.endpoint.starts_with('/') {
            return Err(invalid("metrics.endpoint", "must start with '/'"));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> SyslensError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.into(),
    }
    .into()
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// UDP 리스너 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// 바인드 주소
    pub bind_addr: String,
    /// 바인드 포트 (0이면 OS가 할당)
    pub port: u16,
    /// 데이터그램 최대 크기 (바이트). 초과분은 잘립니다.
    pub max_message_size: usize,
}

impl ListenerConfig {
    /// `bind_addr:port` 형식의 소켓 주소 문자열
    pub fn socket_addr(&self) -> String {
        if self.bind_addr.contains(':') && !self.bind_addr.starts_with('[') {
            // IPv6 리터럴
            format!("[{}]:{}", self.bind_addr, self.port)
        } else {
            format!("{}:{}", self.bind_addr, self.port)
        }
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".to_owned(),
            port: 5140,
            max_message_size: 8192,
        }
    }
}

/// 이벤트 큐 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// 소비자별 큐 용량
    pub capacity: usize,
    /// 큐가 가득 찼을 때의 정책 (oldest, newest)
    pub drop_policy: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: 10_000,
            drop_policy: "oldest".to_owned(),
        }
    }
}

/// 필터 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// 시작 시 적용할 필터 쿼리 (빈 문자열이면 전체 통과)
    pub query: String,
    /// 최소 심각도 (이보다 덜 심각한 이벤트는 제외)
    pub min_severity: String,
}

impl FilterConfig {
    /// `min_severity`를 [`Severity`]로 해석합니다.
    pub fn min_severity_level(&self) -> Option<Severity> {
        Severity::from_name(&self.min_severity)
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            query: String::new(),
            min_severity: "debug".to_owned(),
        }
    }
}

/// 콘솔 표시 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// 활성화 여부
    pub enabled: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// 일별 파일 저장 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 로그 파일 디렉토리
    pub log_dir: String,
    /// 파일명 접두사 (`<prefix>_<YYYY-MM-DD>.json.log`)
    pub file_prefix: String,
    /// true면 필터와 심각도 임계값과 무관하게 수신한 모든 이벤트를 저장
    pub record_unfiltered: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_dir: "syslog_data".to_owned(),
            file_prefix: "syslog".to_owned(),
            record_unfiltered: false,
        }
    }
}

/// Prometheus 메트릭 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 리슨 주소
    pub listen_addr: String,
    /// 리슨 포트
    pub port: u16,
    /// 엔드포인트 경로
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9100,
            endpoint: "/metrics".to_owned(),
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}
