//! 필터 식 트리

use std::fmt;

/// 비교 가능한 이벤트 필드
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Process,
    Hostname,
    Severity,
    Facility,
    Pid,
    Message,
    Priority,
    Source,
    /// 헤더 타임스탬프, `YYYY-MM-DD HH:MM:SS` 형식으로 비교
    Timestamp,
}

impl Field {
    /// 필드 이름을 해석합니다 (대소문자 무시).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "process" => Some(Self::Process),
            "hostname" => Some(Self::Hostname),
            "severity" => Some(Self::Severity),
            "facility" => Some(Self::Facility),
            "pid" => Some(Self::Pid),
            "message" => Some(Self::Message),
            "priority" => Some(Self::Priority),
            "source" => Some(Self::Source),
            "timestamp" => Some(Self::Timestamp),
            _ => None,
        }
    }

    /// 정규 이름
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Process => "process",
            Self::Hostname => "hostname",
            Self::Severity => "severity",
            Self::Facility => "facility",
            Self::Pid => "pid",
            Self::Message => "message",
            Self::Priority => "priority",
            Self::Source => "source",
            Self::Timestamp => "timestamp",
        }
    }
}

/// 필드 단위 부분 문자열 검색 함수
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    Message,
    Hostname,
    Process,
}

impl Function {
    /// 함수 이름을 해석합니다 (대소문자 무시).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "message" => Some(Self::Message),
            "hostname" => Some(Self::Hostname),
            "process" => Some(Self::Process),
            _ => None,
        }
    }

    /// 정규 이름
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::Hostname => "hostname",
            Self::Process => "process",
        }
    }
}

/// 컴파일된 필터 식
///
/// 쿼리가 바뀔 때마다 한 번 만들어지고 이후로는 변경되지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterExpression {
    /// `field = value`
    Compare { field: Field, value: String },
    /// `function("argument")`
    Call { function: Function, argument: String },
    /// `lhs && rhs`
    And(Box<FilterExpression>, Box<FilterExpression>),
    /// `lhs || rhs`
    Or(Box<FilterExpression>, Box<FilterExpression>),
    /// `!expr`
    Not(Box<FilterExpression>),
    /// `( expr )`
    Group(Box<FilterExpression>),
}

impl fmt::Display for FilterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compare { field, value } => write!(f, "{}={:?}", field.as_str(), value),
            Self::Call { function, argument } => {
                write!(f, "{}({:?})", function.as_str(), argument)
            }
            Self::And(lhs, rhs) => write!(f, "{lhs} && {rhs}"),
            Self::Or(lhs, rhs) => write!(f, "{lhs} || {rhs}"),
            Self::Not(inner) => write!(f, "!{inner}"),
            Self::Group(inner) => write!(f, "({inner})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_names_roundtrip() {
        for field in [
            Field::Process,
            Field::Hostname,
            Field::Severity,
            Field::Facility,
            Field::Pid,
            Field::Message,
            Field::Priority,
            Field::Source,
            Field::Timestamp,
        ] {
            assert_eq!(Field::from_name(field.as_str()), Some(field));
        }
        assert_eq!(Field::from_name("HOSTNAME"), Some(Field::Hostname));
        assert_eq!(Field::from_name("user"), None);
    }

    #[test]
    fn function_names() {
        assert_eq!(Function::from_name("Message"), Some(Function::Message));
        assert_eq!(Function::from_name("severity"), None);
    }

    #[test]
    fn display_renders_canonical_query() {
        let expr = FilterExpression::And(
            Box::new(FilterExpression::Compare {
                field: Field::Process,
                value: "sshd".to_owned(),
            }),
            Box::new(FilterExpression::Not(Box::new(FilterExpression::Call {
                function: Function::Message,
                argument: "ok".to_owned(),
            }))),
        );
        assert_eq!(expr.to_string(), r#"process="sshd" && !message("ok")"#);
    }
}
