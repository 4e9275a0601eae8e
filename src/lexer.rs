//! 过滤语言的词法分析器

use crate::error::Error;
use crate::token::{Span, Token, TokenKind};

pub struct Lexer<'a> {
    input: &'a str,
    /// 输入字符串中的当前位置（字节索引）
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer { input, position: 0 }
    }

    /// 返回当前位置的字符，不推进位置
    fn peek(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    /// 返回下一个位置的字符，不推进位置
    fn peek_next(&self) -> Option<char> {
        self.input[self.position..].chars().nth(1)
    }

    /// 推进位置一个字符并返回该字符
    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if let Some(c) = c {
            self.position += c.len_utf8();
        }
        c
    }

    /// 跳过空白字符
    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
    }

    /// 读取数字字面量，支持小数部分
    /// 注意：符号与首位数字已经被调用者消费
    fn read_number(&mut self, start: usize) -> Token<'a> {
        self.consume_digits();
        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            self.bump(); // 消费 '.'
            self.consume_digits();
        }
        Token {
            kind: TokenKind::Number(&self.input[start..self.position]),
            span: Span::new(start, self.position),
        }
    }

    fn consume_digits(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.bump();
            } else {
                break;
            }
        }
    }

    /// 读取以 '-' 开头的值：相对时间字面量或负数
    /// 数字后紧跟字母时按相对时间处理，单位合法性由编译器检查
    fn read_relative_or_number(&mut self, start: usize) -> Token<'a> {
        if !self.peek().is_some_and(|c| c.is_ascii_digit()) {
            return Token {
                kind: TokenKind::Illegal,
                span: Span::new(start, self.position),
            };
        }
        self.consume_digits();
        if self.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
            while let Some(c) = self.peek() {
                if c.is_ascii_alphabetic() {
                    self.bump();
                } else {
                    break;
                }
            }
            return Token {
                kind: TokenKind::RelativeTime(&self.input[start..self.position]),
                span: Span::new(start, self.position),
            };
        }
        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
            self.consume_digits();
        }
        Token {
            kind: TokenKind::Number(&self.input[start..self.position]),
            span: Span::new(start, self.position),
        }
    }

    /// 读取引号包围的字符串字面量，支持单引号和双引号，反斜杠转义
    /// 注意：开始的引号已经被调用者消费
    fn read_string(&mut self, start: usize, quote: char) -> Token<'a> {
        let content_start = self.position;
        loop {
            match self.peek() {
                Some(c) if c == quote => {
                    let content_end = self.position;
                    self.bump(); // 消费结束引号
                    return Token {
                        kind: TokenKind::String(&self.input[content_start..content_end]),
                        span: Span::new(start, self.position),
                    };
                }
                Some('\\') => {
                    self.bump(); // 消费反斜杠
                    self.bump(); // 消费被转义的字符
                }
                Some(_) => {
                    self.bump();
                }
                None => {
                    // 未闭合的字符串
                    return Token {
                        kind: TokenKind::Illegal,
                        span: Span::new(start, self.position),
                    };
                }
            }
        }
    }

    /// 读取标识符：`[A-Za-z_][A-Za-z0-9_]*`
    fn read_identifier(&mut self, start: usize) -> Token<'a> {
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                self.bump();
            } else {
                break;
            }
        }
        Token {
            kind: TokenKind::Ident(&self.input[start..self.position]),
            span: Span::new(start, self.position),
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.skip_whitespace();
        let start = self.position;

        let Some(c) = self.bump() else {
            return None; // 到达输入末尾
        };

        let token = match c {
            '=' => Token { kind: TokenKind::Eq, span: Span::new(start, self.position) },
            '~' => Token { kind: TokenKind::Like, span: Span::new(start, self.position) },
            '.' => Token { kind: TokenKind::Dot, span: Span::new(start, self.position) },
            ';' => Token { kind: TokenKind::Semicolon, span: Span::new(start, self.position) },
            '<' => {
                if self.peek() == Some('=') {
                    self.bump();
                    Token { kind: TokenKind::Lte, span: Span::new(start, self.position) }
                } else {
                    Token { kind: TokenKind::Lt, span: Span::new(start, self.position) }
                }
            }
            '>' => {
                if self.peek() == Some('=') {
                    self.bump();
                    Token { kind: TokenKind::Gte, span: Span::new(start, self.position) }
                } else {
                    Token { kind: TokenKind::Gt, span: Span::new(start, self.position) }
                }
            }
            '!' => match self.peek() {
                Some('=') => {
                    self.bump();
                    Token { kind: TokenKind::NotEq, span: Span::new(start, self.position) }
                }
                Some('~') => {
                    self.bump();
                    Token { kind: TokenKind::NotLike, span: Span::new(start, self.position) }
                }
                _ => Token { kind: TokenKind::Illegal, span: Span::new(start, self.position) },
            },
            '-' => self.read_relative_or_number(start),
            '\'' | '"' => self.read_string(start, c),
            c if c.is_ascii_digit() => self.read_number(start),
            c if c.is_ascii_alphabetic() || c == '_' => self.read_identifier(start),
            _ => Token { kind: TokenKind::Illegal, span: Span::new(start, self.position) },
        };
        Some(token)
    }
}

/// 一次性完成整个输入的分词，遇到非法字符立即返回词法错误
pub fn tokenize(input: &str) -> Result<Vec<Token<'_>>, Error> {
    let mut tokens = Vec::new();
    for token in Lexer::new(input) {
        if token.kind == TokenKind::Illegal {
            let ch = input[token.span.start..].chars().next().unwrap_or(' ');
            if ch == '\'' || ch == '"' {
                return Err(Error::Syntax {
                    message: "unterminated string literal".to_string(),
                    span: Some(token.span),
                });
            }
            return Err(Error::Lexical { ch, position: token.span.start });
        }
        tokens.push(token);
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_filter() {
        let input = "service_name='api'";
        let mut lexer = Lexer::new(input);

        assert_eq!(lexer.next().unwrap().kind, TokenKind::Ident("service_name"));
        assert_eq!(lexer.next().unwrap().kind, TokenKind::Eq);
        assert_eq!(lexer.next().unwrap().kind, TokenKind::String("api"));
        assert_eq!(lexer.next(), None);
    }

    #[test]
    fn test_all_operators_and_punctuation() {
        let input = "!= = > < >= <= ~ !~ . ;";
        let kinds: Vec<_> = Lexer::new(input).map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::NotEq, TokenKind::Eq, TokenKind::Gt, TokenKind::Lt,
                TokenKind::Gte, TokenKind::Lte, TokenKind::Like, TokenKind::NotLike,
                TokenKind::Dot, TokenKind::Semicolon,
            ]
        );
    }

    #[test]
    fn test_dotted_field() {
        let input = "p.error.code=500";
        let kinds: Vec<_> = Lexer::new(input).map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Ident("p"),
                TokenKind::Dot,
                TokenKind::Ident("error"),
                TokenKind::Dot,
                TokenKind::Ident("code"),
                TokenKind::Eq,
                TokenKind::Number("500"),
            ]
        );
    }

    #[test]
    fn test_numbers_and_strings() {
        let input = r#"12345 67.5 -3 "hello world" 'single'"#;
        let kinds: Vec<_> = Lexer::new(input).map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Number("12345"),
                TokenKind::Number("67.5"),
                TokenKind::Number("-3"),
                TokenKind::String("hello world"),
                TokenKind::String("single"),
            ]
        );
    }

    #[test]
    fn test_escaped_quote_in_string() {
        let input = r"'it\'s'";
        let kinds: Vec<_> = Lexer::new(input).map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TokenKind::String(r"it\'s")]);
    }

    #[test]
    fn test_relative_time() {
        let input = "timestamp>-1h";
        let kinds: Vec<_> = Lexer::new(input).map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Ident("timestamp"),
                TokenKind::Gt,
                TokenKind::RelativeTime("-1h"),
            ]
        );
    }

    #[test]
    fn test_invalid_unit_still_lexes_as_relative_time() {
        // 单位合法性由编译器判定，词法层只负责切分
        let kinds: Vec<_> = Lexer::new("-1x -15min").map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![TokenKind::RelativeTime("-1x"), TokenKind::RelativeTime("-15min")]
        );
    }

    #[test]
    fn test_underscore_identifier() {
        let kinds: Vec<_> = Lexer::new("_internal severity_text").map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![TokenKind::Ident("_internal"), TokenKind::Ident("severity_text")]
        );
    }

    #[test]
    fn test_tokenize_reports_illegal_character() {
        let err = tokenize("service_name@'api'").unwrap_err();
        assert_eq!(err, Error::Lexical { ch: '@', position: 12 });
    }

    #[test]
    fn test_tokenize_reports_unterminated_string() {
        let err = tokenize("message='oops").unwrap_err();
        assert!(matches!(err, Error::Syntax { .. }));
    }

    #[test]
    fn test_bare_dash_is_illegal() {
        let err = tokenize("a=-").unwrap_err();
        assert!(matches!(err, Error::Lexical { ch: '-', .. }));
    }

    #[test]
    fn test_spans_are_byte_offsets() {
        let tokens: Vec<_> = Lexer::new("abc >= 10").collect();
        assert_eq!(tokens[0].span, Span::new(0, 3));
        assert_eq!(tokens[1].span, Span::new(4, 6));
        assert_eq!(tokens[2].span, Span::new(7, 9));
    }
}
