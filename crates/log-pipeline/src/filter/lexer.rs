//! 필터 쿼리 토크나이저

use super::error::FilterSyntaxError;

/// 토큰 종류
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// 필드명, 함수명, 따옴표 없는 값
    Word(String),
    /// 따옴표 문자열 (이스케이프 해제됨)
    Str(String),
    /// `=`
    Eq,
    /// `==`
    EqEq,
    /// `!=`
    NotEq,
    /// `&&`
    And,
    /// `||`
    Or,
    /// `!`
    Not,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// 입력 끝
    Eof,
}

impl TokenKind {
    /// 에러 메시지용 표기
    pub fn describe(&self) -> String {
        match self {
            Self::Word(w) => format!("'{w}'"),
            Self::Str(s) => format!("string {s:?}"),
            Self::Eq => "'='".to_owned(),
            Self::EqEq => "'=='".to_owned(),
            Self::NotEq => "'!='".to_owned(),
            Self::And => "'&&'".to_owned(),
            Self::Or => "'||'".to_owned(),
            Self::Not => "'!'".to_owned(),
            Self::LParen => "'('".to_owned(),
            Self::RParen => "')'".to_owned(),
            Self::Eof => "end of query".to_owned(),
        }
    }
}

/// 위치가 붙은 토큰
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// 토큰 시작 바이트 오프셋
    pub position: usize,
}

/// 따옴표 없는 단어에 쓸 수 없는 문자
fn is_word_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '=' | '!' | '&' | '|' | '(' | ')' | '"' | '\'')
}

/// 쿼리를 토큰 목록으로 분해합니다. 마지막 토큰은 항상 [`TokenKind::Eof`]입니다.
pub fn tokenize(input: &str) -> Result<Vec<Token>, FilterSyntaxError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some((position, c)) = chars.next() {
        let kind = match c {
            c if c.is_whitespace() => continue,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '=' => {
                if chars.next_if(|(_, n)| *n == '=').is_some() {
                    TokenKind::EqEq
                } else {
                    TokenKind::Eq
                }
            }
            '!' => {
                if chars.next_if(|(_, n)| *n == '=').is_some() {
                    TokenKind::NotEq
                } else {
                    TokenKind::Not
                }
            }
            '&' => {
                if chars.next_if(|(_, n)| *n == '&').is_none() {
                    return Err(FilterSyntaxError::new(position, "expected '&&'"));
                }
                TokenKind::And
            }
            '|' => {
                if chars.next_if(|(_, n)| *n == '|').is_none() {
                    return Err(FilterSyntaxError::new(position, "expected '||'"));
                }
                TokenKind::Or
            }
            '"' | '\'' => {
                let quote = c;
                let mut value = String::new();
                let mut closed = false;
                while let Some((_, ch)) = chars.next() {
                    match ch {
                        '\\' => match chars.next() {
                            Some((_, escaped)) => value.push(escaped),
                            None => break,
                        },
                        ch if ch == quote => {
                            closed = true;
                            break;
                        }
                        ch => value.push(ch),
                    }
                }
                if !closed {
                    return Err(FilterSyntaxError::new(
                        position,
                        "unterminated string literal",
                    ));
                }
                TokenKind::Str(value)
            }
            first => {
                let mut word = String::from(first);
                while let Some((_, ch)) = chars.next_if(|(_, n)| is_word_char(*n)) {
                    word.push(ch);
                }
                TokenKind::Word(word)
            }
        };
        tokens.push(Token { kind, position });
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        position: input.len(),
    });
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn tokenize_comparison_and_call() {
        assert_eq!(
            kinds(r#"process=sshd && message("failed login")"#),
            vec![
                TokenKind::Word("process".to_owned()),
                TokenKind::Eq,
                TokenKind::Word("sshd".to_owned()),
                TokenKind::And,
                TokenKind::Word("message".to_owned()),
                TokenKind::LParen,
                TokenKind::Str("failed login".to_owned()),
                TokenKind::RParen,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn tokenize_operators() {
        assert_eq!(
            kinds("== != ! || ="),
            vec![
                TokenKind::EqEq,
                TokenKind::NotEq,
                TokenKind::Not,
                TokenKind::Or,
                TokenKind::Eq,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn tokenize_positions_are_byte_offsets() {
        let tokens = tokenize("pid = 42").unwrap();
        let positions: Vec<usize> = tokens.iter().map(|t| t.position).collect();
        assert_eq!(positions, vec![0, 4, 6, 8]);
    }

    #[test]
    fn tokenize_escapes_in_strings() {
        assert_eq!(
            kinds(r#""say \"hi\" \\ now""#),
            vec![TokenKind::Str(r#"say "hi" \ now"#.to_owned()), TokenKind::Eof]
        );
    }

    #[test]
    fn tokenize_single_quoted_string() {
        assert_eq!(
            kinds("'it''s'"),
            vec![
                TokenKind::Str("it".to_owned()),
                TokenKind::Str("s".to_owned()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn tokenize_word_allows_dots_colons_and_dashes() {
        assert_eq!(
            kinds("source=10.0.0.1:514 hostname=web-01"),
            vec![
                TokenKind::Word("source".to_owned()),
                TokenKind::Eq,
                TokenKind::Word("10.0.0.1:514".to_owned()),
                TokenKind::Word("hostname".to_owned()),
                TokenKind::Eq,
                TokenKind::Word("web-01".to_owned()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lone_ampersand_is_error() {
        let err = tokenize("a=1 & b=2").unwrap_err();
        assert_eq!(err.position, 4);
        assert!(err.reason.contains("&&"));
    }

    #[test]
    fn lone_pipe_is_error() {
        let err = tokenize("a=1 | b=2").unwrap_err();
        assert_eq!(err.position, 4);
    }

    #[test]
    fn unterminated_string_points_at_quote() {
        let err = tokenize(r#"message("oops)"#).unwrap_err();
        assert_eq!(err.position, 8);
        assert!(err.reason.contains("unterminated"));
    }

    #[test]
    fn empty_input_is_just_eof() {
        assert_eq!(kinds("   "), vec![TokenKind::Eof]);
    }
}
