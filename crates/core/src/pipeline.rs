//! 파이프라인 trait — 생명주기와 이벤트 전달 지점 정의

use std::future::Future;

use serde::Serialize;

use crate::error::{SinkError, SyslensError};
use crate::types::LogEvent;

/// 모듈 상태
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum HealthStatus {
    /// 정상 동작
    Healthy,
    /// 동작하지만 성능 저하 (예: 큐 포화)
    Degraded(String),
    /// 동작 불가
    Unhealthy(String),
}

impl HealthStatus {
    /// 정상 상태인지 확인합니다.
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// 동작 불가 상태인지 확인합니다.
    pub fn is_unhealthy(&self) -> bool {
        matches!(self, Self::Unhealthy(_))
    }
}

/// 모듈 생명주기 trait
///
/// 데몬은 이 trait으로 파이프라인을 시작/정지하고 상태를 확인합니다.
pub trait Pipeline: Send {
    /// 백그라운드 태스크를 시작합니다.
    ///
    /// 이미 실행 중이면 `PipelineError::AlreadyRunning`.
    fn start(&mut self) -> impl Future<Output = Result<(), SyslensError>> + Send;

    /// 태스크를 정지하고 남은 데이터를 처리합니다.
    ///
    /// 실행 중이 아니면 `PipelineError::NotRunning`.
    fn stop(&mut self) -> impl Future<Output = Result<(), SyslensError>> + Send;

    /// 현재 상태를 보고합니다.
    fn health_check(&self) -> impl Future<Output = HealthStatus> + Send;
}

/// 이벤트 소비자 trait
///
/// 필터를 통과한 이벤트를 표시하거나 저장하는 협력자입니다.
/// 소비자마다 전용 태스크에서 순서대로 호출되므로 구현은 동기적이어도 됩니다.
pub trait EventSink: Send {
    /// 싱크 이름 (로그/메트릭 레이블)
    fn name(&self) -> &str;

    /// 이벤트 하나를 처리합니다.
    fn accept(&mut self, event: &LogEvent) -> Result<(), SinkError>;

    /// 버퍼링된 출력을 내보냅니다.
    fn flush(&mut self) -> Result<(), SinkError>;
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn accept(&mut self, event: &LogEvent) -> Result<(), SinkError> {
        (**self).accept(event)
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        (**self).flush()
    }
}
