//! 파이프라인 오케스트레이션 -- 수신/디코딩/필터/전달의 전체 흐름을 관리합니다.
//!
//! [`LogPipeline`]은 core의 [`Pipeline`] trait을 구현하여
//! `syslens-daemon`에서 start/stop/health_check 생명주기로 관리됩니다.
//!
//! # 내부 아키텍처
//! ```text
//!                                  ┌─> EventQueue ─> [consumer] ─> threshold ─> filter ─> ConsoleSink
//! UdpSocket ─> Rfc3164Decoder ─────┤
//!   (listener task, 블록 없음)      └─> EventQueue ─> [consumer] ─> threshold ─> filter ─> DailyFileSink
//! ```
//!
//! 리스너는 큐에 넣기만 하고 절대 기다리지 않습니다. 큐가 가득 차면 드롭 정책이 적용됩니다.
//! 필터는 소비자 쪽에서 이벤트마다 한 번 평가되며, [`ActiveFilter`]로 원자적으로 교체됩니다.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use metrics::counter;
use syslens_core::error::{PipelineError, SyslensError};
use syslens_core::metrics as m;
use syslens_core::pipeline::{EventSink, HealthStatus, Pipeline};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::buffer::EventQueue;
use crate::collector::{ListenerHandle, SyslogUdpConfig, SyslogUdpListener};
use crate::config::PipelineConfig;
use crate::error::LogPipelineError;
use crate::filter::{ActiveFilter, EventFilter, FilterSyntaxError, SeverityThreshold};
use crate::sink::{ConsoleSink, DailyFileSink};

/// 큐 사용률이 이 값을 넘으면 Degraded
const DEGRADED_UTILIZATION: f64 = 0.9;

/// 파이프라인 실행 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PipelineState {
    /// 초기화됨, 아직 시작하지 않음
    Initialized,
    /// 실행 중
    Running,
    /// 정지됨
    Stopped,
}

/// 소비자 하나의 구성
struct Consumer {
    sink: Box<dyn EventSink>,
    /// true면 임계값과 필터를 건너뜀
    unfiltered: bool,
}

/// 실행 중인 소비자
struct RunningConsumer {
    queue: Arc<EventQueue>,
    task: JoinHandle<Consumer>,
}

/// 소비자들이 공유하는 전달 통계
#[derive(Debug, Default)]
struct DeliveryStats {
    delivered: AtomicU64,
    filtered: AtomicU64,
    sink_errors: AtomicU64,
}

/// 로그 파이프라인 -- 수신/디코딩/필터/전달의 전체 흐름을 관리합니다.
///
/// # 사용 예시
/// ```no_run
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// use syslens_core::pipeline::Pipeline;
/// use syslens_log_pipeline::{LogPipelineBuilder, PipelineConfigBuilder};
///
/// let config = PipelineConfigBuilder::new()
///     .bind_addr("0.0.0.0:5140")
///     .filter_query("severity=error")
///     .build()?;
/// let mut pipeline = LogPipelineBuilder::new().config(config).build()?;
///
/// pipeline.start().await?;
/// pipeline.set_filter(r#"process=sshd && message("failed login")"#)?;
/// pipeline.stop().await?;
/// # Ok(())
/// # }
/// ```
pub struct LogPipeline {
    /// 파이프라인 설정
    config: PipelineConfig,
    /// 현재 상태
    state: PipelineState,
    /// 공유 필터
    filter: Arc<ActiveFilter>,
    /// 최소 심각도
    threshold: SeverityThreshold,
    /// 정지 상태의 소비자 (Sync를 위해 Mutex로 감쌈)
    idle: Mutex<Vec<Consumer>>,
    /// 실행 중인 소비자
    running: Vec<RunningConsumer>,
    /// UDP 리스너
    listener: Option<ListenerHandle>,
    /// 전달 통계
    stats: Arc<DeliveryStats>,
}

impl LogPipeline {
    /// 현재 상태 이름을 반환합니다.
    pub fn state_name(&self) -> &str {
        match self.state {
            PipelineState::Initialized => "initialized",
            PipelineState::Running => "running",
            PipelineState::Stopped => "stopped",
        }
    }

    /// 설정을 반환합니다.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// 리스너가 실제로 바인드한 주소 (실행 중일 때만)
    pub fn local_addr(&self) -> Option<std::net::SocketAddr> {
        self.listener.as_ref().map(ListenerHandle::local_addr)
    }

    /// 공유 필터 핸들
    ///
    /// 파이프라인이 다른 태스크에 소유되어 있어도 필터를 교체할 수 있습니다.
    pub fn active_filter(&self) -> Arc<ActiveFilter> {
        Arc::clone(&self.filter)
    }

    /// 필터 쿼리를 교체합니다. 실패하면 이전 필터가 유지됩니다.
    pub fn set_filter(&self, query: &str) -> Result<Arc<EventFilter>, FilterSyntaxError> {
        self.filter.replace(query)
    }

    /// 필터를 해제합니다.
    pub fn clear_filter(&self) {
        self.filter.clear();
    }

    /// 최소 심각도 임계값
    pub fn threshold(&self) -> SeverityThreshold {
        self.threshold
    }

    /// 소비자 수를 반환합니다.
    pub fn sink_count(&self) -> usize {
        self.running.len()
            + self
                .idle
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .len()
    }

    /// 싱크에 전달된 이벤트 수 (모든 싱크 합계)
    pub fn delivered_count(&self) -> u64 {
        self.stats.delivered.load(Ordering::Relaxed)
    }

    /// 임계값 또는 필터로 제외된 이벤트 수 (모든 싱크 합계)
    pub fn filtered_count(&self) -> u64 {
        self.stats.filtered.load(Ordering::Relaxed)
    }

    /// 싱크 쓰기 실패 수
    pub fn sink_error_count(&self) -> u64 {
        self.stats.sink_errors.load(Ordering::Relaxed)
    }

    /// 큐 오버플로우로 버려진 이벤트 수 (현재 실행 기준)
    pub fn dropped_count(&self) -> u64 {
        self.running.iter().map(|c| c.queue.dropped_count()).sum()
    }

    /// 가장 붐비는 큐의 사용률
    pub fn queue_utilization(&self) -> f64 {
        self.running
            .iter()
            .map(|c| c.queue.utilization())
            .fold(0.0, f64::max)
    }

    /// 드롭이 있었던 큐에 대한 보고용 에러
    pub fn overflow_reports(&self) -> Vec<LogPipelineError> {
        self.running
            .iter()
            .filter(|c| c.queue.dropped_count() > 0)
            .map(|c| LogPipelineError::BufferOverflow {
                capacity: c.queue.capacity(),
                dropped: c.queue.dropped_count(),
            })
            .collect()
    }
}

impl Drop for LogPipeline {
    fn drop(&mut self) {
        // stop() 없이 버려져도 블로킹 소비자가 종료되도록 큐를 닫음
        for consumer in &self.running {
            consumer.queue.close();
        }
    }
}

impl Pipeline for LogPipeline {
    async fn start(&mut self) -> Result<(), SyslensError> {
        if self.state == PipelineState::Running {
            return Err(PipelineError::AlreadyRunning.into());
        }

        tracing::info!(bind_addr = %self.config.bind_addr, "starting log pipeline");

        let consumers: Vec<Consumer> = self
            .idle
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();

        // 1. 소비자별 큐
        let queues: Vec<Arc<EventQueue>> = consumers
            .iter()
            .map(|c| {
                Arc::new(EventQueue::new(
                    c.sink.name(),
                    self.config.queue_capacity,
                    self.config.drop_policy,
                ))
            })
            .collect();

        // 2. 리스너 바인드 (실패하면 소비자를 되돌려 놓고 에러 반환)
        let fan_out = queues.clone();
        let started = SyslogUdpListener::start(SyslogUdpConfig::from(&self.config), move |event| {
            let event = Arc::new(event);
            for queue in &fan_out {
                queue.push(Arc::clone(&event));
            }
        })
        .await;

        let listener = match started {
            Ok(listener) => listener,
            Err(e) => {
                tracing::error!(error = %e, "log pipeline failed to start");
                self.idle
                    .get_mut()
                    .unwrap_or_else(PoisonError::into_inner)
                    .extend(consumers);
                return Err(e.into());
            }
        };

        // 3. 소비자는 블로킹 풀에서 실행 (싱크 I/O가 리스너의 워커를 점유하지 않음)
        let handle = Handle::current();
        for (consumer, queue) in consumers.into_iter().zip(queues) {
            let gate = (!consumer.unfiltered)
                .then(|| (Arc::clone(&self.filter), self.threshold));
            let task = {
                let handle = handle.clone();
                let queue = Arc::clone(&queue);
                let stats = Arc::clone(&self.stats);
                tokio::task::spawn_blocking(move || {
                    run_consumer(&handle, &queue, consumer, gate.as_ref(), &stats)
                })
            };
            self.running.push(RunningConsumer { queue, task });
        }

        tracing::info!(
            local_addr = %listener.local_addr(),
            sinks = self.running.len(),
            filter = self.filter.load().query(),
            min_severity = %self.threshold.minimum(),
            "log pipeline started"
        );
        self.listener = Some(listener);
        self.state = PipelineState::Running;
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), SyslensError> {
        if self.state != PipelineState::Running {
            return Err(PipelineError::NotRunning.into());
        }

        tracing::info!("stopping log pipeline");

        // 1. 수신 중단 (소켓 해제)
        if let Some(listener) = self.listener.take() {
            listener.stop().await;
        }

        // 2. 큐를 닫으면 소비자는 남은 이벤트를 처리하고 flush한 뒤 종료
        for consumer in &self.running {
            consumer.queue.close();
        }

        // 3. 조인, 싱크는 재시작을 위해 보관
        let mut recovered = Vec::with_capacity(self.running.len());
        for running in self.running.drain(..) {
            let name = running.queue.name().to_owned();
            if running.queue.dropped_count() > 0 {
                tracing::warn!(
                    sink = %name,
                    dropped = running.queue.dropped_count(),
                    received = running.queue.total_received(),
                    "events were dropped due to queue overflow"
                );
            }
            match running.task.await {
                Ok(consumer) => recovered.push(consumer),
                Err(e) => tracing::error!(sink = %name, error = %e, "consumer task failed"),
            }
        }
        self.idle
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(recovered);

        self.state = PipelineState::Stopped;
        tracing::info!(
            delivered = self.delivered_count(),
            filtered = self.filtered_count(),
            "log pipeline stopped"
        );
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        match self.state {
            PipelineState::Running => {
                if !self.listener.as_ref().is_some_and(ListenerHandle::is_running) {
                    return HealthStatus::Unhealthy("listener task ended".to_owned());
                }
                let utilization = self.queue_utilization();
                if utilization > DEGRADED_UTILIZATION {
                    HealthStatus::Degraded(format!(
                        "queue utilization high: {:.1}%",
                        utilization * 100.0
                    ))
                } else {
                    HealthStatus::Healthy
                }
            }
            PipelineState::Initialized => HealthStatus::Unhealthy("not started".to_owned()),
            PipelineState::Stopped => HealthStatus::Unhealthy("stopped".to_owned()),
        }
    }
}

/// 소비자 루프: 큐에서 꺼내 임계값과 필터를 통과한 이벤트만 싱크로 넘깁니다.
///
/// 블로킹 스레드에서 실행됩니다. 큐가 비면 flush하고,
/// 큐가 닫히면 남은 이벤트를 모두 처리한 뒤 싱크를 돌려줍니다.
fn run_consumer(
    handle: &Handle,
    queue: &EventQueue,
    mut consumer: Consumer,
    gate: Option<&(Arc<ActiveFilter>, SeverityThreshold)>,
    stats: &DeliveryStats,
) -> Consumer {
    let sink_name = consumer.sink.name().to_owned();

    while let Some(event) = queue.blocking_recv(handle) {
        if let Some((filter, threshold)) = gate {
            let reason = if !threshold.admits(&event) {
                Some("severity")
            } else if !filter.matches(&event) {
                Some("query")
            } else {
                None
            };
            if let Some(reason) = reason {
                stats.filtered.fetch_add(1, Ordering::Relaxed);
                counter!(
                    m::EVENTS_FILTERED_TOTAL,
                    m::LABEL_SINK => sink_name.clone(),
                    m::LABEL_REASON => reason
                )
                .increment(1);
                continue;
            }
        }

        match consumer.sink.accept(&event) {
            Ok(()) => {
                stats.delivered.fetch_add(1, Ordering::Relaxed);
                counter!(m::EVENTS_DELIVERED_TOTAL, m::LABEL_SINK => sink_name.clone())
                    .increment(1);
            }
            Err(e) => {
                stats.sink_errors.fetch_add(1, Ordering::Relaxed);
                counter!(m::SINK_ERRORS_TOTAL, m::LABEL_SINK => sink_name.clone()).increment(1);
                tracing::warn!(sink = %sink_name, error = %e, "sink rejected event");
            }
        }

        if queue.is_empty() {
            flush_sink(&mut consumer, &sink_name);
        }
    }

    flush_sink(&mut consumer, &sink_name);
    tracing::debug!(sink = %sink_name, "consumer drained");
    consumer
}

fn flush_sink(consumer: &mut Consumer, sink_name: &str) {
    if let Err(e) = consumer.sink.flush() {
        counter!(m::SINK_ERRORS_TOTAL, m::LABEL_SINK => sink_name.to_owned()).increment(1);
        tracing::warn!(sink = %sink_name, error = %e, "sink flush failed");
    }
}

/// 로그 파이프라인 빌더
///
/// 싱크를 직접 추가하지 않으면 설정(`display_enabled`, `storage_enabled`)에 따라
/// [`ConsoleSink`]와 [`DailyFileSink`]를 만듭니다.
pub struct LogPipelineBuilder {
    config: PipelineConfig,
    consumers: Vec<Consumer>,
    filter: Option<Arc<ActiveFilter>>,
}

impl LogPipelineBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            consumers: Vec::new(),
            filter: None,
        }
    }

    /// 파이프라인 설정을 지정합니다.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// 임계값과 필터를 거치는 싱크를 추가합니다.
    pub fn sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.consumers.push(Consumer {
            sink: Box::new(sink),
            unfiltered: false,
        });
        self
    }

    /// 임계값과 필터를 건너뛰고 모든 이벤트를 받는 싱크를 추가합니다.
    pub fn unfiltered_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.consumers.push(Consumer {
            sink: Box::new(sink),
            unfiltered: true,
        });
        self
    }

    /// 외부에서 만든 공유 필터를 사용합니다.
    ///
    /// 지정하면 설정의 `filter_query` 대신 이 필터의 현재 쿼리가 쓰입니다.
    pub fn active_filter(mut self, filter: Arc<ActiveFilter>) -> Self {
        self.filter = Some(filter);
        self
    }

    /// 파이프라인을 빌드합니다.
    pub fn build(self) -> Result<LogPipeline, LogPipelineError> {
        self.config.validate()?;

        let filter = match self.filter {
            Some(filter) => filter,
            None => Arc::new(ActiveFilter::new(EventFilter::compile(
                &self.config.filter_query,
            )?)),
        };

        let mut consumers = self.consumers;
        if consumers.is_empty() {
            if self.config.display_enabled {
                consumers.push(Consumer {
                    sink: Box::new(ConsoleSink::stdout()),
                    unfiltered: false,
                });
            }
            if self.config.storage_enabled {
                consumers.push(Consumer {
                    sink: Box::new(DailyFileSink::new(
                        &self.config.log_dir,
                        self.config.file_prefix.clone(),
                    )),
                    unfiltered: self.config.record_unfiltered,
                });
            }
        }
        if consumers.is_empty() {
            tracing::warn!("no sinks configured; events will be received and discarded");
        }

        Ok(LogPipeline {
            threshold: SeverityThreshold::new(self.config.min_severity),
            config: self.config,
            state: PipelineState::Initialized,
            filter,
            idle: Mutex::new(consumers),
            running: Vec::new(),
            listener: None,
            stats: Arc::new(DeliveryStats::default()),
        })
    }
}

impl Default for LogPipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
