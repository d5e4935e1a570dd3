//! 필터 문법 에러

/// 필터 쿼리 문법 오류
///
/// `position`은 쿼리 문자열의 바이트 오프셋입니다.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("filter syntax error at position {position}: {reason}")]
pub struct FilterSyntaxError {
    /// 오류 위치 (바이트 오프셋)
    pub position: usize,
    /// 오류 사유
    pub reason: String,
}

impl FilterSyntaxError {
    /// 새 문법 에러를 생성합니다.
    pub fn new(position: usize, reason: impl Into<String>) -> Self {
        Self {
            position,
            reason: reason.into(),
        }
    }

    /// 쿼리 아래에 오류 위치를 가리키는 캐럿 줄을 만듭니다.
    ///
    /// ```text
    /// process=sshd & x
    ///              ^ expected '&&'
    /// ```
    pub fn caret(&self, query: &str) -> String {
        let end = self.position.min(query.len());
        let column = query
            .char_indices()
            .take_while(|(i, _)| *i < end)
            .count();
        format!("{}^ {}", " ".repeat(column), self.reason)
    }
}
