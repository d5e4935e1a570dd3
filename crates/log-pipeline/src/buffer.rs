//! 이벤트 큐 -- 소비자별 유한 큐
//!
//! [`EventQueue`]는 리스너 태스크와 소비자(sink) 태스크 사이에서
//! 디코딩된 이벤트를 보관합니다. `push`는 동기 함수이며 절대 블록하지 않으므로,
//! 느린 소비자가 다음 데이터그램의 디코딩을 막지 않습니다.
//!
//! # 오버플로우 정책
//! 큐가 가득 찬 경우:
//! - [`DropPolicy::Oldest`](crate::config::DropPolicy::Oldest): 가장 오래된 이벤트를 드롭
//! - [`DropPolicy::Newest`](crate::config::DropPolicy::Newest): 새 이벤트를 거부

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use metrics::{counter, gauge};
use syslens_core::metrics as m;
use syslens_core::types::LogEvent;
use tokio::runtime::Handle;
use tokio::sync::Notify;

use crate::config::DropPolicy;

/// 소비자 하나에 할당된 유한 이벤트 큐
///
/// 생산자(리스너 콜백)와 소비자 태스크가 `Arc`로 공유합니다.
#[derive(Debug)]
pub struct EventQueue {
    /// 소비자 이름 (메트릭 라벨, 로그 필드)
    name: String,
    /// 내부 저장소
    events: Mutex<VecDeque<Arc<LogEvent>>>,
    /// 최대 용량
    capacity: usize,
    /// 드롭 정책
    drop_policy: DropPolicy,
    /// 소비자 깨우기
    notify: Notify,
    /// 닫힘 여부 (닫힌 뒤에는 push가 무시됨)
    closed: AtomicBool,
    /// 드롭된 이벤트 수
    dropped_count: AtomicU64,
    /// 총 유입 이벤트 수
    total_received: AtomicU64,
}

impl EventQueue {
    /// 새 이벤트 큐를 생성합니다.
    pub fn new(name: impl Into<String>, capacity: usize, drop_policy: DropPolicy) -> Self {
        Self {
            name: name.into(),
            events: Mutex::new(VecDeque::with_capacity(capacity.min(10_000))),
            capacity,
            drop_policy,
            notify: Notify::new(),
            closed: AtomicBool::new(false),
            dropped_count: AtomicU64::new(0),
            total_received: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Arc<LogEvent>>> {
        // 임계 구역에서 패닉이 나도 큐 내용은 일관적이므로 그대로 사용
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 이벤트를 큐에 추가합니다.
    ///
    /// 큐가 가득 찬 경우 드롭 정책에 따라 처리합니다.
    /// 드롭이 발생하면 `true`를 반환합니다. 닫힌 큐에는 아무것도 추가되지 않습니다.
    pub fn push(&self, event: Arc<LogEvent>) -> bool {
        if self.closed.load(Ordering::Acquire) {
            return false;
        }
        self.total_received.fetch_add(1, Ordering::Relaxed);

        let (dropped, depth) = {
            let mut events = self.lock();
            let dropped = if events.len() >= self.capacity {
                match self.drop_policy {
                    DropPolicy::Oldest => {
                        events.pop_front();
                        events.push_back(event);
                    }
                    DropPolicy::Newest => {}
                }
                true
            } else {
                events.push_back(event);
                false
            };
            (dropped, events.len())
        };

        gauge!(m::QUEUE_DEPTH, m::LABEL_SINK => self.name.clone()).set(depth as f64);
        self.notify.notify_one();

        if dropped {
            let total = self.dropped_count.fetch_add(1, Ordering::Relaxed) + 1;
            counter!(m::EVENTS_DROPPED_TOTAL, m::LABEL_SINK => self.name.clone()).increment(1);
            match self.drop_policy {
                DropPolicy::Oldest => tracing::warn!(
                    sink = %self.name,
                    dropped = total,
                    capacity = self.capacity,
                    "queue full, dropped oldest event"
                ),
                DropPolicy::Newest => tracing::warn!(
                    sink = %self.name,
                    dropped = total,
                    capacity = self.capacity,
                    "queue full, rejected new event"
                ),
            }
        }

        dropped
    }

    /// 기다리지 않고 이벤트를 하나 꺼냅니다.
    pub fn try_pop(&self) -> Option<Arc<LogEvent>> {
        let mut events = self.lock();
        let event = events.pop_front();
        if event.is_some() {
            gauge!(m::QUEUE_DEPTH, m::LABEL_SINK => self.name.clone()).set(events.len() as f64);
        }
        event
    }

    /// 다음 이벤트를 기다립니다.
    ///
    /// 큐가 닫혔고 비어 있으면 `None`을 반환합니다.
    /// 닫힌 뒤에도 남은 이벤트는 모두 전달됩니다.
    pub async fn recv(&self) -> Option<Arc<LogEvent>> {
        loop {
            // notified()를 먼저 만들어야 확인과 대기 사이의 깨우기를 놓치지 않음
            let notified = self.notify.notified();
            if let Some(event) = self.try_pop() {
                return Some(event);
            }
            if self.is_closed() {
                return None;
            }
            notified.await;
        }
    }

    /// 블로킹 스레드에서 다음 이벤트를 기다립니다.
    ///
    /// `spawn_blocking` 스레드처럼 비동기 컨텍스트 밖에서만 호출해야 합니다.
    /// 이벤트가 남아 있으면 런타임을 거치지 않고 바로 꺼냅니다.
    pub fn blocking_recv(&self, handle: &Handle) -> Option<Arc<LogEvent>> {
        self.try_pop().or_else(|| handle.block_on(self.recv()))
    }

    /// 큐를 닫고 대기 중인 소비자를 깨웁니다.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.notify.notify_waiters();
        // recv가 notified를 만들기 직전에 닫힌 경우를 위한 permit
        self.notify.notify_one();
    }

    /// 큐가 닫혔는지 확인합니다.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// 소비자 이름
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 현재 큐에 저장된 이벤트 수를 반환합니다.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// 큐가 비어있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// 큐 최대 용량을 반환합니다.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 지금까지 드롭된 이벤트 수를 반환합니다.
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    /// 총 유입 이벤트 수를 반환합니다.
    pub fn total_received(&self) -> u64 {
        self.total_received.load(Ordering::Relaxed)
    }

    /// 큐 사용률을 0.0~1.0 범위로 반환합니다.
    pub fn utilization(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        f64::from(u32::try_from(self.len()).unwrap_or(u32::MAX))
            / f64::from(u32::try_from(self.capacity).unwrap_or(u32::MAX))
    }
}
