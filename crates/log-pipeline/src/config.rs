//! 로그 파이프라인 설정
//!
//! [`PipelineConfig`]는 core의 [`SyslensConfig`]를
//! 기반으로 파이프라인 전용 설정을 제공합니다.
//!
//! # 사용 예시
//! ```
//! use syslens_core::config::SyslensConfig;
//! use syslens_log_pipeline::config::PipelineConfig;
//!
//! let core_config = SyslensConfig::default();
//! let config = PipelineConfig::from_core(&core_config);
//! assert_eq!(config.bind_addr, "0.0.0.0:5140");
//! ```

use std::path::{Component, Path};

use serde::{Deserialize, Serialize};
use syslens_core::config::SyslensConfig;
use syslens_core::types::Severity;

use crate::error::LogPipelineError;
use crate::filter::EventFilter;

/// 큐 오버플로우 시 드롭 정책
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DropPolicy {
    /// 가장 오래된 이벤트를 드롭 (기본값)
    #[default]
    Oldest,
    /// 가장 최신 이벤트를 드롭 (새 유입 거부)
    Newest,
}

impl DropPolicy {
    /// 설정 문자열을 해석합니다 (대소문자 무시).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "oldest" => Some(Self::Oldest),
            "newest" => Some(Self::Newest),
            _ => None,
        }
    }
}

/// 로그 파이프라인 설정
///
/// core의 `SyslensConfig`에서 파생됩니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// UDP 바인드 주소 (`ip:port`)
    pub bind_addr: String,
    /// 데이터그램 최대 크기 (바이트)
    pub max_message_size: usize,
    /// 소비자별 큐 용량
    pub queue_capacity: usize,
    /// 큐 오버플로우 드롭 정책
    pub drop_policy: DropPolicy,
    /// 시작 필터 쿼리
    pub filter_query: String,
    /// 최소 심각도
    pub min_severity: Severity,
    /// 콘솔 표시 여부
    pub display_enabled: bool,
    /// 일별 파일 저장 여부
    pub storage_enabled: bool,
    /// 일별 파일 디렉토리
    pub log_dir: String,
    /// 일별 파일 이름 접두사
    pub file_prefix: String,
    /// 저장 시 필터와 임계값을 건너뛸지 여부
    pub record_unfiltered: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5140".to_owned(),
            max_message_size: 8192,
            queue_capacity: 10_000,
            drop_policy: DropPolicy::Oldest,
            filter_query: String::new(),
            min_severity: Severity::Debug,
            display_enabled: true,
            storage_enabled: true,
            log_dir: "syslog_data".to_owned(),
            file_prefix: "syslog".to_owned(),
            record_unfiltered: false,
        }
    }
}

impl PipelineConfig {
    /// core 설정에서 파이프라인 설정을 생성합니다.
    ///
    /// 해석할 수 없는 드롭 정책이나 심각도는 기본값으로 대체됩니다.
    /// (core의 `validate()`가 먼저 걸러냅니다.)
    pub fn from_core(core: &SyslensConfig) -> Self {
        Self {
            bind_addr: core.listener.socket_addr(),
            max_message_size: core.listener.max_message_size,
            queue_capacity: core.queue.capacity,
            drop_policy: DropPolicy::from_name(&core.queue.drop_policy).unwrap_or_default(),
            filter_query: core.filter.query.clone(),
            min_severity: core.filter.min_severity_level().unwrap_or(Severity::Debug),
            display_enabled: core.display.enabled,
            storage_enabled: core.storage.enabled,
            log_dir: core.storage.log_dir.clone(),
            file_prefix: core.storage.file_prefix.clone(),
            record_unfiltered: core.storage.record_unfiltered,
        }
    }

    /// 파일 이름 접두사가 안전한지 검증합니다 (path traversal 방지).
    fn validate_file_prefix(prefix: &str) -> Result<(), LogPipelineError> {
        if prefix.is_empty() {
            return Err(LogPipelineError::Config {
                field: "file_prefix".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }
        if prefix.contains(['/', '\\']) || prefix.contains("..") {
            return Err(LogPipelineError::Config {
                field: "file_prefix".to_owned(),
                reason: format!("'{prefix}' must be a plain file name"),
            });
        }
        Ok(())
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), LogPipelineError> {
        const MAX_MESSAGE_SIZE: usize = 65_535;
        const MAX_QUEUE_CAPACITY: usize = 10_000_000;

        if self.bind_addr.trim().is_empty() {
            return Err(LogPipelineError::Config {
                field: "bind_addr".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        if self.max_message_size == 0 || self.max_message_size > MAX_MESSAGE_SIZE {
            return Err(LogPipelineError::Config {
                field: "max_message_size".to_owned(),
                reason: format!("must be 1-{MAX_MESSAGE_SIZE}"),
            });
        }

        if self.queue_capacity == 0 || self.queue_capacity > MAX_QUEUE_CAPACITY {
            return Err(LogPipelineError::Config {
                field: "queue_capacity".to_owned(),
                reason: format!("must be 1-{MAX_QUEUE_CAPACITY}"),
            });
        }

        if self.storage_enabled {
            if self.log_dir.trim().is_empty() {
                return Err(LogPipelineError::Config {
                    field: "log_dir".to_owned(),
                    reason: "must not be empty when storage is enabled".to_owned(),
                });
            }
            if Path::new(&self.log_dir)
                .components()
                .any(|c| c == Component::ParentDir)
            {
                tracing::warn!(
                    log_dir = %self.log_dir,
                    "log_dir contains '..'; files will be written outside the working tree"
                );
            }
            Self::validate_file_prefix(&self.file_prefix)?;
        }

        // 시작 쿼리도 문법 검사
        EventFilter::compile(&self.filter_query)?;

        Ok(())
    }
}

/// 파이프라인 설정 빌더
#[derive(Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// UDP 바인드 주소를 설정합니다.
    pub fn bind_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.bind_addr = addr.into();
        self
    }

    /// 데이터그램 최대 크기를 설정합니다.
    pub fn max_message_size(mut self, size: usize) -> Self {
        self.config.max_message_size = size;
        self
    }

    /// 큐 용량을 설정합니다.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    /// 드롭 정책을 설정합니다.
    pub fn drop_policy(mut self, policy: DropPolicy) -> Self {
        self.config.drop_policy = policy;
        self
    }

    /// 시작 필터 쿼리를 설정합니다.
    pub fn filter_query(mut self, query: impl Into<String>) -> Self {
        self.config.filter_query = query.into();
        self
    }

    /// 최소 심각도를 설정합니다.
    pub fn min_severity(mut self, severity: Severity) -> Self {
        self.config.min_severity = severity;
        self
    }

    /// 콘솔 표시 여부를 설정합니다.
    pub fn display_enabled(mut self, enabled: bool) -> Self {
        self.config.display_enabled = enabled;
        self
    }

    /// 일별 파일 저장 여부를 설정합니다.
    pub fn storage_enabled(mut self, enabled: bool) -> Self {
        self.config.storage_enabled = enabled;
        self
    }

    /// 일별 파일 디렉토리를 설정합니다.
    pub fn log_dir(mut self, dir: impl Into<String>) -> Self {
        self.config.log_dir = dir.into();
        self
    }

    /// 일별 파일 이름 접두사를 설정합니다.
    pub fn file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.file_prefix = prefix.into();
        self
    }

    /// 저장 시 필터를 건너뛸지 설정합니다.
    pub fn record_unfiltered(mut self, unfiltered: bool) -> Self {
        self.config.record_unfiltered = unfiltered;
        self
    }

    /// 설정을 검증하고 `PipelineConfig`를 생성합니다.
    pub fn build(self) -> Result<PipelineConfig, LogPipelineError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = PipelineConfig::default();
        config.validate().unwrap();
    }

    #[test]
    fn from_core_preserves_values() {
        let mut core = SyslensConfig::default();
        core.listener.bind_addr = "127.0.0.1".to_owned();
        core.listener.port = 5514;
        core.queue.capacity = 200;
        core.queue.drop_policy = "Newest".to_owned();
        core.filter.min_severity = "warn".to_owned();
        core.storage.file_prefix = "edge".to_owned();

        let config = PipelineConfig::from_core(&core);
        assert_eq!(config.bind_addr, "127.0.0.1:5514");
        assert_eq!(config.queue_capacity, 200);
        assert_eq!(config.drop_policy, DropPolicy::Newest);
        assert_eq!(config.min_severity, Severity::Warning);
        assert_eq!(config.file_prefix, "edge");
    }

    #[test]
    fn drop_policy_from_name() {
        assert_eq!(DropPolicy::from_name("oldest"), Some(DropPolicy::Oldest));
        assert_eq!(DropPolicy::from_name(" NEWEST "), Some(DropPolicy::Newest));
        assert_eq!(DropPolicy::from_name("random"), None);
    }

    #[test]
    fn validate_rejects_zero_queue_capacity() {
        let config = PipelineConfig {
            queue_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_oversized_datagram_limit() {
        let config = PipelineConfig {
            max_message_size: 70_000,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_message_size"));
    }

    #[test]
    fn validate_rejects_prefix_with_separator() {
        for prefix in ["../escape", "a/b", "a\\b", ""] {
            let config = PipelineConfig {
                file_prefix: prefix.to_owned(),
                ..Default::default()
            };
            assert!(config.validate().is_err(), "prefix {prefix:?} should be rejected");
        }
    }

    #[test]
    fn prefix_not_checked_when_storage_disabled() {
        let config = PipelineConfig {
            storage_enabled: false,
            file_prefix: String::new(),
            ..Default::default()
        };
        config.validate().unwrap();
    }

    #[test]
    fn validate_rejects_bad_filter_query() {
        let config = PipelineConfig {
            filter_query: "process=".to_owned(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(LogPipelineError::FilterSyntax(_))
        ));
    }

    #[test]
    fn builder_creates_valid_config() {
        let config = PipelineConfigBuilder::new()
            .bind_addr("127.0.0.1:0")
            .queue_capacity(5000)
            .filter_query("severity=error")
            .log_dir("/tmp/syslens")
            .build()
            .unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:0");
        assert_eq!(config.queue_capacity, 5000);
        assert_eq!(config.log_dir, "/tmp/syslens");
    }

    #[test]
    fn builder_rejects_invalid_config() {
        let result = PipelineConfigBuilder::new().queue_capacity(0).build();
        assert!(result.is_err());
    }

    #[test]
    fn drop_policy_default_is_oldest() {
        assert_eq!(DropPolicy::default(), DropPolicy::Oldest);
    }
}
