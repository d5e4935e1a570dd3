//! 활성 필터 -- 원자적 교체
//!
//! ```text
//! [consumer task] → [ArcSwap::load()] → [EventFilter::matches()]
//!                         ↑
//! [operator edit] → [compile] → (성공 시) [ArcSwap::store()]
//! ```
//!
//! 컴파일이 성공해야만 교체되므로, 잘못된 쿼리를 입력해도 이전 필터가 유지됩니다.
//! 읽는 쪽은 락 없이 항상 완전한 식 트리를 봅니다.

use std::sync::Arc;

use arc_swap::ArcSwap;
use metrics::counter;
use syslens_core::metrics as m;
use syslens_core::types::LogEvent;
use tracing::{info, warn};

use super::{EventFilter, FilterSyntaxError};

/// 모든 소비자가 공유하는 현재 필터
#[derive(Debug)]
pub struct ActiveFilter {
    current: ArcSwap<EventFilter>,
}

impl ActiveFilter {
    /// 주어진 필터로 시작합니다.
    pub fn new(filter: EventFilter) -> Self {
        Self {
            current: ArcSwap::new(Arc::new(filter)),
        }
    }

    /// 현재 필터의 스냅샷
    pub fn load(&self) -> Arc<EventFilter> {
        self.current.load_full()
    }

    /// 현재 필터로 이벤트를 평가합니다.
    pub fn matches(&self, event: &LogEvent) -> bool {
        self.current.load().matches(event)
    }

    /// 쿼리를 컴파일하여 성공하면 교체합니다.
    ///
    /// 실패하면 이전 필터가 그대로 남고 에러를 반환합니다.
    pub fn replace(&self, query: &str) -> Result<Arc<EventFilter>, FilterSyntaxError> {
        match EventFilter::compile(query) {
            Ok(filter) => {
                let filter = Arc::new(filter);
                self.current.store(Arc::clone(&filter));
                counter!(m::FILTER_UPDATES_TOTAL).increment(1);
                info!(query = filter.query(), "filter applied");
                Ok(filter)
            }
            Err(e) => {
                counter!(m::FILTER_SYNTAX_ERRORS_TOTAL).increment(1);
                warn!(
                    query,
                    position = e.position,
                    reason = e.reason.as_str(),
                    "filter rejected, keeping previous filter"
                );
                Err(e)
            }
        }
    }

    /// 필터를 해제합니다 (전체 통과).
    pub fn clear(&self) {
        self.current.store(Arc::new(EventFilter::match_all()));
        counter!(m::FILTER_UPDATES_TOTAL).increment(1);
        info!("filter cleared");
    }
}

impl Default for ActiveFilter {
    fn default() -> Self {
        Self::new(EventFilter::match_all())
    }
}
