//! Syslog RFC 3164 디코더
//!
//! [RFC 3164](https://tools.ietf.org/html/rfc3164) (BSD syslog) 형식의 메시지를
//! 최선 노력 방식으로 디코딩합니다.
//!
//! # RFC 3164 메시지 형식
//! ```text
//! <PRI>MMM DD HH:MM:SS HOSTNAME PROCESS[PID]: MESSAGE
//! ```
//!
//! 디코딩은 실패하지 않습니다. 구조를 분리하지 못하면 `parse_ok == false`인
//! 이벤트를 만들고, `message`에는 남은 본문 또는 원문을 담습니다.
//!
//! # 사용 예시
//! ```ignore
//! use syslens_log_pipeline::parser::Rfc3164Decoder;
//!
//! let event = Rfc3164Decoder::new().decode(&datagram);
//! assert_eq!(event.process.as_deref(), Some("su"));
//! ```

use std::net::SocketAddr;

use chrono::{DateTime, Datelike, Local, NaiveDateTime};
use syslens_core::types::LogEvent;
use tracing::debug;

use super::priority::{PriTag, split_pri};
use crate::collector::RawDatagram;

/// `HH:MM:SS` 길이
const CLOCK_LEN: usize = 8;

/// RFC 3164 디코더
///
/// 상태가 없으므로 여러 태스크에서 공유해도 됩니다.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rfc3164Decoder;

impl Rfc3164Decoder {
    /// 새 디코더를 생성합니다.
    pub fn new() -> Self {
        Self
    }

    /// 데이터그램 하나를 [`LogEvent`]로 디코딩합니다.
    ///
    /// 페이로드는 손실 허용 UTF-8로 변환되고 끝의 CR/LF/NUL이 제거됩니다.
    pub fn decode(&self, datagram: &RawDatagram) -> LogEvent {
        let text = String::from_utf8_lossy(&datagram.data);
        let raw = text.trim_end_matches(['\r', '\n', '\0']);
        self.decode_str(raw, datagram.source, datagram.received_at)
    }

    /// 이미 텍스트로 변환된 메시지를 디코딩합니다.
    pub fn decode_str(
        &self,
        raw: &str,
        source: SocketAddr,
        received_at: DateTime<Local>,
    ) -> LogEvent {
        let mut event = LogEvent::unparsed(raw, source, received_at);

        // 1. PRI
        let (pri, mut rest) = split_pri(raw);
        match pri {
            PriTag::Valid(priority) => event.priority = Some(priority),
            PriTag::OutOfRange(value) => {
                debug!(value, %source, "PRI out of range, leaving priority empty");
            }
            PriTag::Missing => {}
        }

        // 2. 타임스탬프 (연도는 수신 연도)
        if let Some((timestamp, after)) = split_timestamp(rest.trim_start(), received_at.year())
        {
            event.timestamp = timestamp;
            rest = after;
        }

        // 3-5. HOSTNAME, TAG, MESSAGE
        let header = rest.trim_start();
        let (hostname, tag) = split_host_and_tag(header);

        let Some(tag) = tag else {
            // 태그가 없으면 호스트명도 신뢰할 수 없음: 남은 본문만 메시지로 사용
            if !header.is_empty() {
                event.message = header.to_owned();
            }
            return event;
        };

        event.hostname = hostname.map(str::to_owned);
        event.process = Some(tag.process.to_owned());
        event.pid = tag.pid;

        let body = tag.body.strip_prefix(' ').unwrap_or(tag.body);
        if !body.is_empty() {
            event.message = body.to_owned();
        }

        event.parse_ok = event.hostname.is_some() && !body.is_empty();
        event
    }
}

/// `PROCESS[PID]:` 태그와 그 뒤의 본문
#[derive(Debug, PartialEq, Eq)]
struct Tag<'a> {
    process: &'a str,
    pid: Option<u32>,
    body: &'a str,
}

/// 입력 앞의 `MMM DD HH:MM:SS`를 분리합니다.
///
/// 형식이 맞지 않으면 `None` (아무것도 소비하지 않음).
/// 형식은 맞지만 날짜가 유효하지 않으면 타임스탬프 없이 소비합니다.
fn split_timestamp(input: &str, year: i32) -> Option<(Option<NaiveDateTime>, &str)> {
    let bytes = input.as_bytes();

    let month = bytes.get(..3)?;
    if !month.iter().all(u8::is_ascii_alphabetic) {
        return None;
    }
    let mut pos = 3;

    // 한 자리 날짜는 공백으로 채워짐 ("Oct  1")
    let spaces = bytes[pos..].iter().take_while(|b| **b == b' ').count();
    if !(1..=2).contains(&spaces) {
        return None;
    }
    pos += spaces;

    let day_start = pos;
    let day_len = bytes[pos..].iter().take_while(|b| b.is_ascii_digit()).count();
    if !(1..=2).contains(&day_len) {
        return None;
    }
    pos += day_len;

    if bytes.get(pos) != Some(&b' ') {
        return None;
    }
    pos += 1;

    let clock_start = pos;
    let clock = bytes.get(pos..pos + CLOCK_LEN)?;
    let clock_ok = clock.iter().enumerate().all(|(i, b)| match i {
        2 | 5 => *b == b':',
        _ => b.is_ascii_digit(),
    });
    if !clock_ok {
        return None;
    }
    pos += CLOCK_LEN;

    if bytes.get(pos).is_some_and(|b| !b.is_ascii_whitespace()) {
        return None;
    }

    // 검사한 구간은 모두 ASCII이므로 슬라이스 경계가 안전함
    let text = format!(
        "{year} {} {} {}",
        &input[..3],
        &input[day_start..day_start + day_len],
        &input[clock_start..pos]
    );
    let timestamp = NaiveDateTime::parse_from_str(&text, "%Y %b %d %H:%M:%S").ok();
    if timestamp.is_none() {
        debug!(timestamp = %&input[..pos], "invalid RFC 3164 timestamp, leaving it empty");
    }

    Some((timestamp, &input[pos..]))
}

/// 헤더에서 호스트명과 태그를 분리합니다.
///
/// 첫 토큰이 그 자체로 태그면 호스트명이 생략된 것이고,
/// 아니면 첫 토큰 뒤에 태그가 와야 첫 토큰을 호스트명으로 인정합니다.
fn split_host_and_tag(header: &str) -> (Option<&str>, Option<Tag<'_>>) {
    if let Some(tag) = parse_tag(header) {
        return (None, Some(tag));
    }

    let Some(token_end) = header.find(char::is_whitespace) else {
        return (None, None);
    };
    let hostname = &header[..token_end];
    match parse_tag(header[token_end..].trim_start()) {
        Some(tag) => (Some(hostname), Some(tag)),
        None => (None, None),
    }
}

/// `PROCESS[PID]:` 또는 `PROCESS:` 태그를 파싱합니다.
///
/// 콜론 뒤에는 공백이나 입력 끝이 와야 합니다. PID는 10진수여야 합니다.
fn parse_tag(input: &str) -> Option<Tag<'_>> {
    let name_len = input
        .find(|c: char| c.is_whitespace() || matches!(c, '[' | ']' | ':'))
        .unwrap_or(input.len());
    if name_len == 0 {
        return None;
    }
    let process = &input[..name_len];
    let mut rest = &input[name_len..];

    let mut pid = None;
    if let Some(after_open) = rest.strip_prefix('[') {
        let close = after_open.find(']')?;
        let digits = &after_open[..close];
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        pid = Some(digits.parse::<u32>().ok()?);
        rest = &after_open[close + 1..];
    }

    let body = rest.strip_prefix(':')?;
    if body.chars().next().is_some_and(|c| !c.is_whitespace()) {
        return None;
    }

    Some(Tag { process, pid, body })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use chrono::{NaiveDate, TimeZone};
    use syslens_core::types::{Facility, Severity};

    fn source() -> SocketAddr {
        "192.0.2.7:51514".parse().unwrap()
    }

    fn received() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 10, 11, 22, 14, 16).unwrap()
    }

    fn decode(raw: &str) -> LogEvent {
        Rfc3164Decoder::new().decode_str(raw, source(), received())
    }

    #[test]
    fn decode_rfc3164_example() {
        let event = decode("<34>Oct 11 22:14:15 mymachine su: 'su root' failed for lonvick");
        assert_eq!(event.priority.map(|p| p.value()), Some(34));
        assert_eq!(event.facility(), Some(Facility::Auth));
        assert_eq!(event.severity(), Some(Severity::Critical));
        assert_eq!(
            event.timestamp,
            NaiveDate::from_ymd_opt(2024, 10, 11)
                .unwrap()
                .and_hms_opt(22, 14, 15)
        );
        assert_eq!(event.hostname.as_deref(), Some("mymachine"));
        assert_eq!(event.process.as_deref(), Some("su"));
        assert_eq!(event.pid, None);
        assert_eq!(event.message, "'su root' failed for lonvick");
        assert!(event.parse_ok);
    }

    #[test]
    fn decode_with_pid() {
        let event = decode("<38>Oct  1 08:00:00 web-01 sshd[4242]: Accepted publickey for root");
        assert_eq!(event.hostname.as_deref(), Some("web-01"));
        assert_eq!(event.process.as_deref(), Some("sshd"));
        assert_eq!(event.pid, Some(4242));
        assert_eq!(event.message, "Accepted publickey for root");
        assert_eq!(
            event.timestamp.map(|t| t.date()),
            NaiveDate::from_ymd_opt(2024, 10, 1)
        );
        assert!(event.parse_ok);
    }

    #[test]
    fn decode_message_keeps_inner_colons() {
        let event = decode("<13>Oct 11 22:14:15 host app: error: disk full: /var");
        assert_eq!(event.process.as_deref(), Some("app"));
        assert_eq!(event.message, "error: disk full: /var");
    }

    #[test]
    fn decode_without_hostname() {
        let event = decode("<13>Oct 11 22:14:15 su: 'su root' failed");
        assert_eq!(event.hostname, None);
        assert_eq!(event.process.as_deref(), Some("su"));
        assert_eq!(event.message, "'su root' failed");
        assert!(!event.parse_ok);
    }

    #[test]
    fn decode_without_priority() {
        let event = decode("Oct 11 22:14:15 mymachine cron[77]: job done");
        assert!(event.priority.is_none());
        assert!(event.facility().is_none());
        assert_eq!(event.hostname.as_deref(), Some("mymachine"));
        assert_eq!(event.pid, Some(77));
        assert_eq!(event.message, "job done");
        assert!(event.parse_ok);
    }

    #[test]
    fn decode_out_of_range_priority_is_consumed() {
        let event = decode("<200>Oct 11 22:14:15 host app: hello");
        assert!(event.priority.is_none());
        assert_eq!(event.hostname.as_deref(), Some("host"));
        assert_eq!(event.message, "hello");
    }

    #[test]
    fn decode_invalid_date_keeps_going() {
        let event = decode("<13>Feb 30 10:00:00 host app: impossible date");
        assert!(event.timestamp.is_none());
        assert_eq!(event.hostname.as_deref(), Some("host"));
        assert_eq!(event.message, "impossible date");
        assert!(event.parse_ok);
    }

    #[test]
    fn decode_without_timestamp() {
        let event = decode("<13>host app: no clock here");
        assert!(event.timestamp.is_none());
        assert_eq!(event.hostname.as_deref(), Some("host"));
        assert_eq!(event.process.as_deref(), Some("app"));
        assert!(event.parse_ok);
    }

    #[test]
    fn decode_garbage_falls_back_to_raw() {
        let raw = "this is not syslog at all";
        let event = decode(raw);
        assert!(!event.parse_ok);
        assert!(event.priority.is_none());
        assert!(event.hostname.is_none());
        assert_eq!(event.message, raw);
        assert_eq!(event.raw_message, raw);
    }

    #[test]
    fn decode_header_only_uses_remainder() {
        let event = decode("<13>Oct 11 22:14:15 just some words");
        assert!(event.priority.is_some());
        assert!(event.timestamp.is_some());
        assert!(event.hostname.is_none());
        assert_eq!(event.message, "just some words");
        assert!(!event.parse_ok);
    }

    #[test]
    fn decode_empty_body_falls_back_to_raw() {
        let raw = "<13>Oct 11 22:14:15 host app:";
        let event = decode(raw);
        assert_eq!(event.process.as_deref(), Some("app"));
        assert_eq!(event.message, raw);
        assert!(!event.parse_ok);
    }

    #[test]
    fn decode_priority_only() {
        let event = decode("<13>");
        assert!(event.priority.is_some());
        assert_eq!(event.message, "<13>");
        assert!(!event.parse_ok);
    }

    #[test]
    fn decode_non_decimal_pid_is_not_a_tag() {
        let event = decode("<13>Oct 11 22:14:15 host sshd[abc]: hi");
        assert!(event.process.is_none());
        assert!(!event.parse_ok);
        assert_eq!(event.message, "host sshd[abc]: hi");
    }

    #[test]
    fn decode_empty_payload() {
        let event = decode("");
        assert!(!event.parse_ok);
        assert!(event.message.is_empty());
    }

    #[test]
    fn decode_datagram_trims_line_endings_and_nul() {
        let datagram = RawDatagram::new(
            Bytes::from_static(b"<13>Oct 11 22:14:15 host app: hi\r\n\0"),
            source(),
        )
        .with_received_at(received());
        let event = Rfc3164Decoder::new().decode(&datagram);
        assert_eq!(event.raw_message, "<13>Oct 11 22:14:15 host app: hi");
        assert_eq!(event.message, "hi");
    }

    #[test]
    fn decode_datagram_invalid_utf8_is_lossy() {
        let datagram = RawDatagram::new(
            Bytes::from_static(b"<13>Oct 11 22:14:15 host app: caf\xff"),
            source(),
        );
        let event = Rfc3164Decoder::new().decode(&datagram);
        assert!(event.parse_ok);
        assert!(event.message.starts_with("caf"));
        assert!(event.message.contains('\u{FFFD}'));
    }

    #[test]
    fn decode_ipv6_hostname() {
        let event = decode("<13>Oct 11 22:14:15 fe80::1 ntpd[9]: synced");
        assert_eq!(event.hostname.as_deref(), Some("fe80::1"));
        assert_eq!(event.process.as_deref(), Some("ntpd"));
    }

    #[test]
    fn split_timestamp_shapes() {
        assert!(split_timestamp("Oct 11 22:14:15 rest", 2024).is_some());
        assert!(split_timestamp("Oct  1 22:14:15", 2024).is_some());
        assert!(split_timestamp("Oct 11 22:14", 2024).is_none());
        assert!(split_timestamp("Oct 11 22:14:15x", 2024).is_none());
        assert!(split_timestamp("2024-10-11T22:14:15Z", 2024).is_none());
        assert!(split_timestamp("Oc 11 22:14:15", 2024).is_none());
    }

    #[test]
    fn split_timestamp_uses_given_year() {
        let (ts, rest) = split_timestamp("Feb 29 12:00:00 x", 2024).unwrap();
        assert_eq!(
            ts.map(|t| t.date()),
            NaiveDate::from_ymd_opt(2024, 2, 29)
        );
        assert_eq!(rest, " x");

        let (ts, _) = split_timestamp("Feb 29 12:00:00", 2023).unwrap();
        assert!(ts.is_none());
    }

    #[test]
    fn parse_tag_forms() {
        assert_eq!(
            parse_tag("su: hi"),
            Some(Tag { process: "su", pid: None, body: " hi" })
        );
        assert_eq!(
            parse_tag("sshd[1]:"),
            Some(Tag { process: "sshd", pid: Some(1), body: "" })
        );
        assert!(parse_tag("sshd[]: x").is_none());
        assert!(parse_tag("sshd[99999999999]: x").is_none());
        assert!(parse_tag("host sshd: x").is_none());
        assert!(parse_tag("a:b c").is_none());
        assert!(parse_tag(": x").is_none());
    }

    proptest::proptest! {
        #[test]
        fn decode_never_panics_and_message_is_nonempty(s in "\\PC{1,120}") {
            let event = decode(&s);
            proptest::prop_assert!(!event.message.is_empty());
            proptest::prop_assert_eq!(&event.raw_message, &s);
        }

        #[test]
        fn decode_is_deterministic(s in "<[0-9]{1,3}>[A-Z][a-z]{2} [0-9]{1,2} [0-9]{2}:[0-9]{2}:[0-9]{2} [a-z]{1,8} [a-z]{1,8}: [ -~]{0,40}") {
            proptest::prop_assert_eq!(decode(&s), decode(&s));
        }
    }
}
