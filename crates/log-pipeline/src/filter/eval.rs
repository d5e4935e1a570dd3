//! 필터 평가기
//!
//! 순수 함수입니다: 같은 식과 같은 이벤트는 항상 같은 결과를 냅니다.
//! 이벤트에 없는 필드와의 비교/검색은 `false`입니다.

use syslens_core::types::{Facility, LogEvent};

use super::ast::{Field, FilterExpression, Function};

/// `timestamp` 비교에 쓰는 텍스트 형식
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 식을 이벤트에 대해 평가합니다.
pub fn evaluate(expr: &FilterExpression, event: &LogEvent) -> bool {
    match expr {
        FilterExpression::Compare { field, value } => compare(*field, value, event),
        FilterExpression::Call { function, argument } => call(*function, argument, event),
        FilterExpression::And(lhs, rhs) => evaluate(lhs, event) && evaluate(rhs, event),
        FilterExpression::Or(lhs, rhs) => evaluate(lhs, event) || evaluate(rhs, event),
        FilterExpression::Not(inner) => !evaluate(inner, event),
        FilterExpression::Group(inner) => evaluate(inner, event),
    }
}

/// 필드 값과 대소문자를 구분해 일치 여부를 비교합니다.
///
/// severity는 정규 이름(대소문자 무시) 또는 숫자 코드와 일치하면 참입니다.
/// facility는 [`Facility::from_name`]이 받아들이는 이름이나 숫자 코드,
/// source는 `ip:port` 또는 IP만 일치해도 참입니다.
/// timestamp는 헤더 타임스탬프를 [`TIMESTAMP_FORMAT`]으로 그린 값과 비교합니다.
fn compare(field: Field, value: &str, event: &LogEvent) -> bool {
    match field {
        Field::Process => event.process.as_deref() == Some(value),
        Field::Hostname => event.hostname.as_deref() == Some(value),
        Field::Message => event.message == value,
        Field::Pid => event.pid.is_some_and(|pid| pid.to_string() == value),
        Field::Priority => event
            .priority
            .is_some_and(|p| p.value().to_string() == value),
        Field::Severity => event.severity().is_some_and(|s| {
            s.as_str().eq_ignore_ascii_case(value) || s.code().to_string() == value
        }),
        Field::Facility => event.facility().is_some_and(|f| {
            Facility::from_name(value) == Some(f) || f.code().to_string() == value
        }),
        Field::Source => {
            event.source.to_string() == value || event.source.ip().to_string() == value
        }
        Field::Timestamp => event
            .timestamp
            .is_some_and(|ts| ts.format(TIMESTAMP_FORMAT).to_string() == value),
    }
}

/// 필드에 인자가 포함되어 있는지 대소문자 없이 검사합니다.
fn call(function: Function, argument: &str, event: &LogEvent) -> bool {
    let haystack = match function {
        Function::Message => Some(event.message.as_str()),
        Function::Hostname => event.hostname.as_deref(),
        Function::Process => event.process.as_deref(),
    };
    haystack.is_some_and(|text| contains_ignore_case(text, argument))
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
