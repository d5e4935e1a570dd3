//! 필터 쿼리 언어 -- 렉서, 파서, 평가기, 활성 필터
//!
//! 운영자가 입력한 쿼리로 실시간 이벤트 스트림을 거릅니다.
//!
//! # 문법
//! - 비교: `field=value`, `field==value`, `field!=value`
//!   (필드: process, hostname, severity, facility, pid, message, priority, source, timestamp)
//! - 함수: `message("text")`, `hostname("text")`, `process("text")`
//!   (대소문자 무시 부분 문자열 검색)
//! - 논리: `&&`, `||`, `!`, `( )` (우선순위: `!` > `&&` > `||`)
//! - 문자열: `"..."` 또는 `'...'`, `\"` 와 `\\` 이스케이프
//!
//! # 사용 예시
//! ```
//! use syslens_log_pipeline::filter::EventFilter;
//!
//! let filter = EventFilter::compile(r#"process=sshd && message("failed login")"#).unwrap();
//! assert!(!filter.is_match_all());
//!
//! let err = EventFilter::compile("process=sshd &").unwrap_err();
//! assert_eq!(err.position, 13);
//! ```

pub mod active;
pub mod ast;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod parser;

pub use active::ActiveFilter;
pub use ast::{Field, FilterExpression, Function};
pub use error::FilterSyntaxError;
pub use eval::evaluate;

use syslens_core::types::{LogEvent, Severity};

/// 컴파일된 필터
///
/// 빈 쿼리는 파서를 거치지 않고 전체 통과 필터가 됩니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFilter {
    query: String,
    expr: Option<FilterExpression>,
}

impl EventFilter {
    /// 모든 이벤트를 통과시키는 필터
    pub fn match_all() -> Self {
        Self {
            query: String::new(),
            expr: None,
        }
    }

    /// 쿼리를 컴파일합니다.
    pub fn compile(query: &str) -> Result<Self, FilterSyntaxError> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Ok(Self::match_all());
        }
        let expr = parser::parse(query)?;
        Ok(Self {
            query: trimmed.to_owned(),
            expr: Some(expr),
        })
    }

    /// 이벤트가 필터를 통과하는지 평가합니다.
    pub fn matches(&self, event: &LogEvent) -> bool {
        self.expr.as_ref().is_none_or(|expr| evaluate(expr, event))
    }

    /// 원래 쿼리 (앞뒤 공백 제거)
    pub fn query(&self) -> &str {
        &self.query
    }

    /// 식 트리 (전체 통과 필터면 `None`)
    pub fn expression(&self) -> Option<&FilterExpression> {
        self.expr.as_ref()
    }

    /// 전체 통과 필터인지 확인합니다.
    pub fn is_match_all(&self) -> bool {
        self.expr.is_none()
    }
}

impl Default for EventFilter {
    fn default() -> Self {
        Self::match_all()
    }
}

/// 최소 심각도 임계값
///
/// 쿼리보다 먼저 적용됩니다. 심각도가 없는 이벤트는 임계값이 `debug`일 때만 통과합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeverityThreshold(Severity);

impl SeverityThreshold {
    /// 임계값을 생성합니다.
    pub fn new(minimum: Severity) -> Self {
        Self(minimum)
    }

    /// 임계값
    pub fn minimum(self) -> Severity {
        self.0
    }

    /// 이벤트가 임계값 이상으로 심각한지 확인합니다.
    pub fn admits(self, event: &LogEvent) -> bool {
        match event.severity() {
            Some(severity) => severity.is_at_least(self.0),
            None => self.0 == Severity::Debug,
        }
    }
}

impl Default for SeverityThreshold {
    fn default() -> Self {
        Self(Severity::Debug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use syslens_core::types::Priority;

    fn event_with_priority(priority: Option<u8>) -> LogEvent {
        LogEvent {
            priority: priority.and_then(Priority::new),
            ..LogEvent::unparsed("x", "127.0.0.1:9".parse().unwrap(), Local::now())
        }
    }

    #[test]
    fn empty_query_matches_everything() {
        for query in ["", "   ", "\t\n"] {
            let filter = EventFilter::compile(query).unwrap();
            assert!(filter.is_match_all());
            assert!(filter.matches(&event_with_priority(None)));
        }
    }

    #[test]
    fn compile_keeps_trimmed_query() {
        let filter = EventFilter::compile("  pid=1  ").unwrap();
        assert_eq!(filter.query(), "pid=1");
        assert!(filter.expression().is_some());
    }

    #[test]
    fn compile_reports_original_offsets() {
        // 앞 공백이 있어도 위치는 원래 쿼리 기준
        let err = EventFilter::compile("  pid=").unwrap_err();
        assert_eq!(err.position, 6);
    }

    #[test]
    fn threshold_admits_at_least_as_severe() {
        let warning = SeverityThreshold::new(Severity::Warning);
        assert!(warning.admits(&event_with_priority(Some(11)))); // user.error
        assert!(warning.admits(&event_with_priority(Some(12)))); // user.warning
        assert!(!warning.admits(&event_with_priority(Some(13)))); // user.notice
    }

    #[test]
    fn threshold_without_severity() {
        let event = event_with_priority(None);
        assert!(SeverityThreshold::default().admits(&event));
        assert!(!SeverityThreshold::new(Severity::Informational).admits(&event));
    }
}
