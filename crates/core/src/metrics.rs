//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`
//! 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `syslens_`
//! - 접미어: `_total` (counter), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(syslens_core::metrics::DATAGRAMS_RECEIVED_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 소비자(싱크) 레이블 키 (console, daily-file)
pub const LABEL_SINK: &str = "sink";

/// 필터 제외 사유 레이블 키 (severity, query)
pub const LABEL_REASON: &str = "reason";

// ─── 수집 메트릭 ────────────────────────────────────────────────────

/// 수신한 UDP 데이터그램 수 (counter)
pub const DATAGRAMS_RECEIVED_TOTAL: &str = "syslens_datagrams_received_total";

/// 구조 파싱에 실패하여 원문으로 대체된 이벤트 수 (counter)
pub const DECODE_FALLBACKS_TOTAL: &str = "syslens_decode_fallbacks_total";

// ─── 전달 메트릭 ────────────────────────────────────────────────────

/// 싱크에 전달된 이벤트 수 (counter, label: sink)
pub const EVENTS_DELIVERED_TOTAL: &str = "syslens_events_delivered_total";

/// 필터로 제외된 이벤트 수 (counter, labels: sink, reason)
pub const EVENTS_FILTERED_TOTAL: &str = "syslens_events_filtered_total";

/// 큐 오버플로우로 버려진 이벤트 수 (counter, label: sink)
pub const EVENTS_DROPPED_TOTAL: &str = "syslens_events_dropped_total";

/// 현재 큐에 쌓인 이벤트 수 (gauge, label: sink)
pub const QUEUE_DEPTH: &str = "syslens_queue_depth";

/// 싱크 쓰기 실패 수 (counter, label: sink)
pub const SINK_ERRORS_TOTAL: &str = "syslens_sink_errors_total";

// ─── 필터 메트릭 ────────────────────────────────────────────────────

/// 적용된 필터 교체 수 (counter)
pub const FILTER_UPDATES_TOTAL: &str = "syslens_filter_updates_total";

/// 문법 오류로 거부된 필터 쿼리 수 (counter)
pub const FILTER_SYNTAX_ERRORS_TOTAL: &str = "syslens_filter_syntax_errors_total";

// ─── 데몬 메트릭 ────────────────────────────────────────────────────

/// 데몬 가동 시간 (gauge, 초)
pub const DAEMON_UPTIME_SECONDS: &str = "syslens_daemon_uptime_seconds";

/// 빌드 정보 (gauge, 항상 1, label: version)
pub const DAEMON_BUILD_INFO: &str = "syslens_daemon_build_info";

/// 정의된 모든 메트릭 이름
pub const ALL_METRIC_NAMES: &[&str] = &[
    DATAGRAMS_RECEIVED_TOTAL,
    DECODE_FALLBACKS_TOTAL,
    EVENTS_DELIVERED_TOTAL,
    EVENTS_FILTERED_TOTAL,
    EVENTS_DROPPED_TOTAL,
    QUEUE_DEPTH,
    SINK_ERRORS_TOTAL,
    FILTER_UPDATES_TOTAL,
    FILTER_SYNTAX_ERRORS_TOTAL,
    DAEMON_UPTIME_SECONDS,
    DAEMON_BUILD_INFO,
];

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번만 호출해야 합니다.
/// 일반적으로 `syslens-daemon`의 시작 시점에서 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge};

    describe_counter!(
        DATAGRAMS_RECEIVED_TOTAL,
        "Total number of UDP datagrams received by the listener"
    );
    describe_counter!(
        DECODE_FALLBACKS_TOTAL,
        "Total number of datagrams that could not be fully decoded"
    );
    describe_counter!(
        EVENTS_DELIVERED_TOTAL,
        "Total number of events handed to a sink"
    );
    describe_counter!(
        EVENTS_FILTERED_TOTAL,
        "Total number of events rejected by the severity threshold or the active filter"
    );
    describe_counter!(
        EVENTS_DROPPED_TOTAL,
        "Total number of events dropped due to queue overflow"
    );
    describe_gauge!(QUEUE_DEPTH, "Current number of events waiting in a sink queue");
    describe_counter!(SINK_ERRORS_TOTAL, "Total number of failed sink writes");
    describe_counter!(
        FILTER_UPDATES_TOTAL,
        "Total number of filter queries applied"
    );
    describe_counter!(
        FILTER_SYNTAX_ERRORS_TOTAL,
        "Total number of filter queries rejected with a syntax error"
    );
    describe_gauge!(DAEMON_UPTIME_SECONDS, "Seconds since the daemon started");
    describe_gauge!(DAEMON_BUILD_INFO, "Build information (always 1)");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_metrics_start_with_syslens_prefix() {
        for name in ALL_METRIC_NAMES {
            assert!(
                name.starts_with("syslens_"),
                "Metric '{}' does not start with 'syslens_' prefix",
                name
            );
        }
    }

    #[test]
    fn metric_names_are_unique() {
        let mut names = ALL_METRIC_NAMES.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ALL_METRIC_NAMES.len());
    }

    #[test]
    fn counters_end_with_total() {
        let gauges = [QUEUE_DEPTH, DAEMON_UPTIME_SECONDS, DAEMON_BUILD_INFO];
        for name in ALL_METRIC_NAMES.iter().filter(|n| !gauges.contains(*n)) {
            assert!(name.ends_with("_total"), "Counter '{}' lacks _total", name);
        }
    }

    #[test]
    fn describe_all_does_not_panic() {
        // 레코더 없이 호출해도 패닉하지 않아야 함
        describe_all();
    }

    #[test]
    fn label_keys_are_lowercase() {
        for label in [LABEL_SINK, LABEL_REASON] {
            assert_eq!(label.to_lowercase(), label);
        }
    }
}
