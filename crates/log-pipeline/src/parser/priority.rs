//! PRI 디코더 -- `<N>` 태그와 facility/severity 분해
//!
//! RFC 3164 Section 4.1.1: `PRI = facility * 8 + severity`, 유효 범위 0-191.

use syslens_core::types::{Facility, Priority, Severity};

/// PRI 숫자의 최대 자릿수
const MAX_PRI_DIGITS: usize = 3;

/// PRI 값을 facility와 severity로 분해합니다.
///
/// 191을 넘는 값은 `None`이며, 호출자는 우선순위를 비워 두어야 합니다.
pub fn decode(priority: u8) -> Option<(Facility, Severity)> {
    Priority::new(priority).map(|p| (p.facility(), p.severity()))
}

/// 입력 앞의 `<digits>` 태그를 해석한 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriTag {
    /// 유효한 태그
    Valid(Priority),
    /// 형식은 맞지만 범위를 벗어난 태그 (소비됨, 우선순위는 비어 있음)
    OutOfRange(u16),
    /// `<digits>` 형식이 아님 (소비되지 않음)
    Missing,
}

/// 입력 앞의 `<digits>` 태그를 분리합니다.
///
/// 1-3자리 숫자만 태그로 인정합니다. 반환값은 (태그, 태그 이후 나머지)이며,
/// [`PriTag::Missing`]이면 나머지는 입력 전체입니다.
pub fn split_pri(input: &str) -> (PriTag, &str) {
    let Some(after_open) = input.strip_prefix('<') else {
        return (PriTag::Missing, input);
    };

    let digits = after_open
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    if digits == 0 || digits > MAX_PRI_DIGITS {
        return (PriTag::Missing, input);
    }

    let Some(rest) = after_open[digits..].strip_prefix('>') else {
        return (PriTag::Missing, input);
    };

    // 최대 3자리이므로 u16 파싱은 실패하지 않음
    let value: u16 = after_open[..digits].parse().unwrap_or(u16::MAX);
    let tag = u8::try_from(value)
        .ok()
        .and_then(Priority::new)
        .map_or(PriTag::OutOfRange(value), PriTag::Valid);

    (tag, rest)
}
