//! 도메인 타입 — 시스템 전역에서 사용되는 공통 타입
//!
//! 수신한 syslog 데이터그램을 디코딩한 결과인 [`LogEvent`]와
//! RFC 3164 우선순위 체계([`Priority`], [`Facility`], [`Severity`])를 정의합니다.
//! 리스너, 필터, 표시/저장 싱크는 모두 이 타입으로 이벤트를 교환합니다.

use std::fmt;
use std::net::SocketAddr;

use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// RFC 3164에서 유효한 최대 PRI 값
/// facility 최댓값 23 * 8 + severity 최댓값 7 = 191
pub const MAX_PRIORITY: u8 = 191;

/// Syslog facility (RFC 3164 Section 4.1.1)
///
/// 메시지를 생성한 서브시스템의 분류입니다. 코드 0-23.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facility {
    Kernel,
    User,
    Mail,
    Daemon,
    Auth,
    Syslog,
    Lpr,
    News,
    Uucp,
    Clock,
    Security2,
    Ftp,
    Ntp,
    LogAudit,
    LogAlert,
    Clock2,
    Local0,
    Local1,
    Local2,
    Local3,
    Local4,
    Local5,
    Local6,
    Local7,
}

impl Facility {
    /// 코드 순서의 전체 facility 목록
    pub const ALL: [Facility; 24] = [
        Self::Kernel,
        Self::User,
        Self::Mail,
        Self::Daemon,
        Self::Auth,
        Self::Syslog,
        Self::Lpr,
        Self::News,
        Self::Uucp,
        Self::Clock,
        Self::Security2,
        Self::Ftp,
        Self::Ntp,
        Self::LogAudit,
        Self::LogAlert,
        Self::Clock2,
        Self::Local0,
        Self::Local1,
        Self::Local2,
        Self::Local3,
        Self::Local4,
        Self::Local5,
        Self::Local6,
        Self::Local7,
    ];

    /// 숫자 코드에서 facility를 찾습니다. 범위를 벗어나면 `None`.
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(usize::from(code)).copied()
    }

    /// 숫자 코드 (0-23)
    pub fn code(self) -> u8 {
        self as u8
    }

    /// 이름에서 facility를 찾습니다.
    ///
    /// 정규 이름은 대소문자를 구분하지 않으며, syslog.conf 표기
    /// (`kern`, `authpriv`, `cron`, `security`)도 허용합니다.
    pub fn from_name(s: &str) -> Option<Self> {
        let lower = s.to_ascii_lowercase();
        match lower.as_str() {
            "kern" => Some(Self::Kernel),
            "security" => Some(Self::Auth),
            "authpriv" => Some(Self::Security2),
            "cron" => Some(Self::Clock),
            name => Self::ALL.into_iter().find(|f| f.as_str() == name),
        }
    }

    /// 정규 이름 (필터 비교와 저장 레코드에 사용)
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Kernel => "kernel",
            Self::User => "user",
            Self::Mail => "mail",
            Self::Daemon => "daemon",
            Self::Auth => "auth",
            Self::Syslog => "syslog",
            Self::Lpr => "lpr",
            Self::News => "news",
            Self::Uucp => "uucp",
            Self::Clock => "clock",
            Self::Security2 => "security2",
            Self::Ftp => "ftp",
            Self::Ntp => "ntp",
            Self::LogAudit => "logaudit",
            Self::LogAlert => "logalert",
            Self::Clock2 => "clock2",
            Self::Local0 => "local0",
            Self::Local1 => "local1",
            Self::Local2 => "local2",
            Self::Local3 => "local3",
            Self::Local4 => "local4",
            Self::Local5 => "local5",
            Self::Local6 => "local6",
            Self::Local7 => "local7",
        }
    }

    /// RFC 3164 표의 설명
    pub fn description(self) -> &'static str {
        match self {
            Self::Kernel => "kernel messages",
            Self::User => "user-level messages",
            Self::Mail => "mail system",
            Self::Daemon => "system daemons",
            Self::Auth => "security/authorization messages",
            Self::Syslog => "messages generated internally by syslogd",
            Self::Lpr => "line printer subsystem",
            Self::News => "network news subsystem",
            Self::Uucp => "UUCP subsystem",
            Self::Clock => "clock daemon",
            Self::Security2 => "security/authorization messages (private)",
            Self::Ftp => "FTP daemon",
            Self::Ntp => "NTP subsystem",
            Self::LogAudit => "log audit",
            Self::LogAlert => "log alert",
            Self::Clock2 => "clock daemon (note 2)",
            Self::Local0 => "local use 0",
            Self::Local1 => "local use 1",
            Self::Local2 => "local use 2",
            Self::Local3 => "local use 3",
            Self::Local4 => "local use 4",
            Self::Local5 => "local use 5",
            Self::Local6 => "local use 6",
            Self::Local7 => "local use 7",
        }
    }
}

impl fmt::Display for Facility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Syslog 심각도 (RFC 3164 Section 4.1.1)
///
/// 코드가 작을수록 심각합니다. `Ord`는 코드 순서를 따르므로
/// `Emergency < Debug`이며, 임계값 비교에는 [`Severity::is_at_least`]를 사용합니다.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// 시스템 사용 불가
    Emergency,
    /// 즉시 조치 필요
    Alert,
    /// 치명적 상태
    Critical,
    /// 에러 상태
    Error,
    /// 경고 상태
    Warning,
    /// 정상이지만 주목할 상태
    Notice,
    /// 정보성 메시지
    Informational,
    /// 디버그 메시지
    Debug,
}

impl Severity {
    /// 코드 순서의 전체 심각도 목록
    pub const ALL: [Severity; 8] = [
        Self::Emergency,
        Self::Alert,
        Self::Critical,
        Self::Error,
        Self::Warning,
        Self::Notice,
        Self::Informational,
        Self::Debug,
    ];

    /// 숫자 코드에서 심각도를 찾습니다. 범위를 벗어나면 `None`.
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(usize::from(code)).copied()
    }

    /// 숫자 코드 (0-7)
    pub fn code(self) -> u8 {
        self as u8
    }

    /// 이름에서 심각도를 파싱합니다.
    ///
    /// 대소문자를 구분하지 않으며 흔히 쓰이는 축약형도 허용합니다.
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "emergency" | "emerg" | "panic" => Some(Self::Emergency),
            "alert" => Some(Self::Alert),
            "critical" | "crit" => Some(Self::Critical),
            "error" | "err" => Some(Self::Error),
            "warning" | "warn" => Some(Self::Warning),
            "notice" => Some(Self::Notice),
            "informational" | "info" => Some(Self::Informational),
            "debug" => Some(Self::Debug),
            _ => None,
        }
    }

    /// 정규 이름
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Emergency => "emergency",
            Self::Alert => "alert",
            Self::Critical => "critical",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Notice => "notice",
            Self::Informational => "informational",
            Self::Debug => "debug",
        }
    }

    /// RFC 3164 표의 설명
    pub fn description(self) -> &'static str {
        match self {
            Self::Emergency => "system is unusable",
            Self::Alert => "action must be taken immediately",
            Self::Critical => "critical conditions",
            Self::Error => "error conditions",
            Self::Warning => "warning conditions",
            Self::Notice => "normal but significant condition",
            Self::Informational => "informational messages",
            Self::Debug => "debug-level messages",
        }
    }

    /// `threshold`와 같거나 더 심각한지 확인합니다.
    ///
    /// 예: `Severity::Error.is_at_least(Severity::Warning) == true`
    pub fn is_at_least(self, threshold: Severity) -> bool {
        self <= threshold
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 범위를 벗어난 PRI 값
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("priority {0} out of valid range (0-191)")]
pub struct InvalidPriority(pub u8);

/// 검증된 syslog PRI 값 (0-191)
///
/// facility와 severity는 항상 이 값에서 파생되므로 둘 중 하나만
/// 존재하는 상태는 표현할 수 없습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Priority(u8);

impl Priority {
    /// PRI 값을 검증하여 생성합니다. 191을 넘으면 `None`.
    pub fn new(value: u8) -> Option<Self> {
        (value <= MAX_PRIORITY).then_some(Self(value))
    }

    /// facility와 severity로부터 PRI 값을 조합합니다.
    pub fn from_parts(facility: Facility, severity: Severity) -> Self {
        Self(facility.code() * 8 + severity.code())
    }

    /// 원래 정수 값
    pub fn value(self) -> u8 {
        self.0
    }

    /// `value / 8`
    pub fn facility(self) -> Facility {
        // 0..=191 / 8 는 항상 0..=23
        Facility::ALL[usize::from(self.0 / 8)]
    }

    /// `value % 8`
    pub fn severity(self) -> Severity {
        Severity::ALL[usize::from(self.0 % 8)]
    }
}

impl TryFrom<u8> for Priority {
    type Error = InvalidPriority;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(InvalidPriority(value))
    }
}

impl From<Priority> for u8 {
    fn from(priority: Priority) -> Self {
        priority.0
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 디코딩된 syslog 이벤트
///
/// 리스너가 데이터그램 하나를 받을 때마다 한 번 생성되며, 이후로는 변경되지 않습니다.
/// 여러 소비자(표시, 저장)가 공유할 수 있도록 `Arc<LogEvent>`로 전달됩니다.
///
/// 구조 파싱이 실패해도 이벤트는 버려지지 않습니다: `parse_ok == false`이고
/// `message`는 최선 노력으로 남은 본문이거나 `raw_message` 자체입니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    /// 수신 시각 (리스너가 부여)
    pub received_at: DateTime<Local>,
    /// 송신자 주소
    pub source: SocketAddr,
    /// 원본 페이로드 텍스트
    pub raw_message: String,
    /// `<N>` 태그의 PRI 값
    pub priority: Option<Priority>,
    /// 메시지 헤더의 타임스탬프 (연도는 수신 연도로 추정)
    pub timestamp: Option<NaiveDateTime>,
    /// 호스트명
    pub hostname: Option<String>,
    /// 프로세스(태그) 이름
    pub process: Option<String>,
    /// 프로세스 ID
    pub pid: Option<u32>,
    /// 메시지 본문
    pub message: String,
    /// hostname, process, message를 모두 분리해냈는지 여부
    pub parse_ok: bool,
}

impl LogEvent {
    /// 구조 파싱 없이 원본만 담은 이벤트를 생성합니다.
    pub fn unparsed(
        raw_message: impl Into<String>,
        source: SocketAddr,
        received_at: DateTime<Local>,
    ) -> Self {
        let raw_message = raw_message.into();
        Self {
            received_at,
            source,
            message: raw_message.clone(),
            raw_message,
            priority: None,
            timestamp: None,
            hostname: None,
            process: None,
            pid: None,
            parse_ok: false,
        }
    }

    /// PRI에서 파생된 facility
    pub fn facility(&self) -> Option<Facility> {
        self.priority.map(Priority::facility)
    }

    /// PRI에서 파생된 severity
    pub fn severity(&self) -> Option<Severity> {
        self.priority.map(Priority::severity)
    }
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let when = match self.timestamp {
            Some(ts) => ts.format("%b %e %H:%M:%S").to_string(),
            None => self.received_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        };
        let host = match &self.hostname {
            Some(h) => h.clone(),
            None => self.source.ip().to_string(),
        };
        let severity = self.severity().map_or("-", Severity::as_str);

        write!(f, "[{when} | {host} | {severity}] ")?;

        if !self.parse_ok {
            return write!(f, "(unparsed) {}", self.message);
        }

        if let Some(process) = &self.process {
            f.write_str(process)?;
        }
        if let Some(pid) = self.pid {
            write!(f, "[{pid}]")?;
        }
        write!(f, ": {}", self.message)
    }
}
