//! Lexer for the TAC dialect
//!
//! Tokenizes TAC source into a stream of tokens terminated by [`Token::Eof`].
//! Logos splits the input into words and delimiters; each word is then
//! classified against the keyword table, the hex literal pattern and finally
//! as an identifier.

use logos::Logos;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::opcode::Opcode;

/// Raw scanner output, before word classification
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"==+")]
enum Lexeme {
    /// Any run up to whitespace, a delimiter or a control character
    #[regex(r"[^\x00-\x20\x7F{}\[\](),:=]+")]
    Word,

    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token("=")]
    Assign,
}

/// Structural and type keywords
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Function,
    Private,
    Public,
    Prev,
    Succ,
    Begin,
    Block,
    Bool,
    Uint256,
    Bytes,
}

impl Keyword {
    const TABLE: [(&'static str, Keyword); 10] = [
        ("FUNCTION", Keyword::Function),
        ("PRIVATE", Keyword::Private),
        ("PUBLIC", Keyword::Public),
        ("PREV", Keyword::Prev),
        ("SUCC", Keyword::Succ),
        ("BEGIN", Keyword::Begin),
        ("BLOCK", Keyword::Block),
        ("BOOL", Keyword::Bool),
        ("UINT256", Keyword::Uint256),
        ("BYTES", Keyword::Bytes),
    ];

    /// Look up an already upper-cased word
    fn from_upper(word: &str) -> Option<Keyword> {
        Self::TABLE.iter().find(|(name, _)| *name == word).map(|(_, kw)| *kw)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Function => "FUNCTION",
            Keyword::Private => "PRIVATE",
            Keyword::Public => "PUBLIC",
            Keyword::Prev => "PREV",
            Keyword::Succ => "SUCC",
            Keyword::Begin => "BEGIN",
            Keyword::Block => "BLOCK",
            Keyword::Bool => "BOOL",
            Keyword::Uint256 => "UINT256",
            Keyword::Bytes => "BYTES",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Keyword(Keyword),
    /// Operation keyword
    Op(Opcode),
    /// `0x` followed only by hex digits, original text
    Hex(String),
    Ident(String),

    // Delimiters
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Comma,
    Colon,
    Assign,

    Eof,
}

/// Coarse token classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Keyword,
    Identifier,
    HexLiteral,
    Delimiter,
    Eof,
}

impl Token {
    pub fn kind(&self) -> TokenKind {
        match self {
            Token::Keyword(_) | Token::Op(_) => TokenKind::Keyword,
            Token::Hex(_) => TokenKind::HexLiteral,
            Token::Ident(_) => TokenKind::Identifier,
            Token::Eof => TokenKind::Eof,
            _ => TokenKind::Delimiter,
        }
    }

    /// Human readable description used in diagnostics
    pub fn describe(&self) -> String {
        match self {
            Token::Keyword(kw) => kw.as_str().to_string(),
            Token::Op(op) => op.mnemonic().to_string(),
            Token::Hex(text) => format!("hex literal {}", text),
            Token::Ident(text) => format!("identifier {}", text),
            Token::LBrace => "'{'".to_string(),
            Token::RBrace => "'}'".to_string(),
            Token::LBracket => "'['".to_string(),
            Token::RBracket => "']'".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::Comma => "','".to_string(),
            Token::Colon => "':'".to_string(),
            Token::Assign => "'='".to_string(),
            Token::Eof => "end of input".to_string(),
        }
    }
}

/// Source location span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub col: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, line: usize, col: usize) -> Self {
        Self { start, end, line, col }
    }
}

/// Token with its exact source text and location
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub text: String,
    pub span: Span,
}

pub struct Lexer {
    source: String,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
        }
    }

    /// Tokenize returning tokens without spans
    pub fn tokenize(&self) -> Result<Vec<Token>> {
        Ok(self.tokenize_with_spans()?.into_iter().map(|st| st.token).collect())
    }

    /// Tokenize returning tokens with source spans, ending with `Eof`
    pub fn tokenize_with_spans(&self) -> Result<Vec<SpannedToken>> {
        let mut tokens = Vec::new();
        let mut lex = Lexeme::lexer(&self.source);

        // Pre-compute line starts for fast line/col lookup
        let line_starts: Vec<usize> = std::iter::once(0)
            .chain(self.source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();

        while let Some(lexeme) = lex.next() {
            let byte_span = lex.span();
            let (line, col) = offset_to_line_col(&line_starts, byte_span.start);
            let text = &self.source[byte_span.clone()];

            let token = match lexeme {
                Ok(Lexeme::Word) => classify(text),
                Ok(Lexeme::LBrace) => Token::LBrace,
                Ok(Lexeme::RBrace) => Token::RBrace,
                Ok(Lexeme::LBracket) => Token::LBracket,
                Ok(Lexeme::RBracket) => Token::RBracket,
                Ok(Lexeme::LParen) => Token::LParen,
                Ok(Lexeme::RParen) => Token::RParen,
                Ok(Lexeme::Comma) => Token::Comma,
                Ok(Lexeme::Colon) => Token::Colon,
                Ok(Lexeme::Assign) => Token::Assign,
                Err(_) => {
                    return Err(Error::LexError {
                        message: format!("Unexpected character: '{}'", text.escape_debug()),
                        line,
                        col,
                    });
                }
            };

            tokens.push(SpannedToken {
                token,
                text: text.to_string(),
                span: Span::new(byte_span.start, byte_span.end, line, col),
            });
        }

        let end = self.source.len();
        let (line, col) = offset_to_line_col(&line_starts, end);
        tokens.push(SpannedToken {
            token: Token::Eof,
            text: String::new(),
            span: Span::new(end, end, line, col),
        });

        tracing::debug!(tokens = tokens.len(), "tokenized TAC source");
        Ok(tokens)
    }
}

/// Classify a word: keyword, then hex literal, then identifier
fn classify(word: &str) -> Token {
    let upper = word.to_ascii_uppercase();
    if let Some(kw) = Keyword::from_upper(&upper) {
        Token::Keyword(kw)
    } else if let Some(op) = Opcode::from_mnemonic(&upper) {
        Token::Op(op)
    } else if is_hex(&upper) {
        Token::Hex(word.to_string())
    } else {
        Token::Ident(word.to_string())
    }
}

fn is_hex(upper: &str) -> bool {
    upper
        .strip_prefix("0X")
        .is_some_and(|digits| digits.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Convert byte offset to line and column (1-indexed)
fn offset_to_line_col(line_starts: &[usize], offset: usize) -> (usize, usize) {
    let line = line_starts.partition_point(|&start| start <= offset);
    let line_start = line_starts.get(line.saturating_sub(1)).copied().unwrap_or(0);
    let col = offset - line_start + 1;
    (line, col)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<Token> {
        Lexer::new(source).tokenize().unwrap()
    }

    #[test]
    fn test_keywords() {
        let tokens = lex("function Private PUBLIC prev succ Begin block bool uint256 bytes");
        assert_eq!(
            tokens,
            vec![
                Token::Keyword(Keyword::Function),
                Token::Keyword(Keyword::Private),
                Token::Keyword(Keyword::Public),
                Token::Keyword(Keyword::Prev),
                Token::Keyword(Keyword::Succ),
                Token::Keyword(Keyword::Begin),
                Token::Keyword(Keyword::Block),
                Token::Keyword(Keyword::Bool),
                Token::Keyword(Keyword::Uint256),
                Token::Keyword(Keyword::Bytes),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_keyword_keeps_original_case() {
        let tokens = Lexer::new("jumpI").tokenize_with_spans().unwrap();
        assert_eq!(tokens[0].token, Token::Op(Opcode::JumpI));
        assert_eq!(tokens[0].text, "jumpI");
    }

    #[test]
    fn test_operations() {
        let tokens = lex("add CALLPRIVATE returnprivate address");
        assert_eq!(
            tokens,
            vec![
                Token::Op(Opcode::Add),
                Token::Op(Opcode::CallPrivate),
                Token::Op(Opcode::ReturnPrivate),
                Token::Op(Opcode::Address),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_hex_and_identifiers() {
        let tokens = lex("0x1f 0XAB 0x 0x1g v1a __function_selector__ 0x4f0x7a");
        assert_eq!(
            tokens,
            vec![
                Token::Hex("0x1f".to_string()),
                Token::Hex("0XAB".to_string()),
                Token::Hex("0x".to_string()),
                Token::Ident("0x1g".to_string()),
                Token::Ident("v1a".to_string()),
                Token::Ident("__function_selector__".to_string()),
                Token::Ident("0x4f0x7a".to_string()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_delimiters() {
        let tokens = lex("{}[](),:=");
        assert_eq!(
            tokens,
            vec![
                Token::LBrace,
                Token::RBrace,
                Token::LBracket,
                Token::RBracket,
                Token::LParen,
                Token::RParen,
                Token::Comma,
                Token::Colon,
                Token::Assign,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_words_split_on_delimiters() {
        let tokens = lex("v1(0x20)=CONST");
        assert_eq!(
            tokens,
            vec![
                Token::Ident("v1".to_string()),
                Token::LParen,
                Token::Hex("0x20".to_string()),
                Token::RParen,
                Token::Assign,
                Token::Op(Opcode::Const),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_separator_lines_are_skipped() {
        let tokens = lex("prev=[], succ=[]\n=================\n0x1: STOP");
        let assigns = tokens.iter().filter(|t| **t == Token::Assign).count();
        assert_eq!(assigns, 2);
        assert!(tokens.contains(&Token::Op(Opcode::Stop)));
    }

    #[test]
    fn test_positions() {
        let tokens = Lexer::new("FUNCTION f\n  BEGIN").tokenize_with_spans().unwrap();
        assert_eq!((tokens[0].span.line, tokens[0].span.col), (1, 1));
        assert_eq!((tokens[1].span.line, tokens[1].span.col), (1, 10));
        assert_eq!((tokens[2].span.line, tokens[2].span.col), (2, 3));
        assert_eq!(tokens[3].token, Token::Eof);
        assert_eq!(tokens[3].span.line, 2);
    }

    #[test]
    fn test_unexpected_character() {
        let err = Lexer::new("0x1: STOP\n  \u{7}bad").tokenize().unwrap_err();
        assert_eq!(
            err,
            Error::LexError {
                message: "Unexpected character: '\\u{7}'".to_string(),
                line: 2,
                col: 3,
            }
        );
    }

    #[test]
    fn test_words_run_to_delimiters() {
        assert_eq!(lex("v-1"), vec![Token::Ident("v-1".to_string()), Token::Eof]);
        assert_eq!(
            lex("x#b café a@b"),
            vec![
                Token::Ident("x#b".to_string()),
                Token::Ident("café".to_string()),
                Token::Ident("a@b".to_string()),
                Token::Eof,
            ]
        );
        assert_eq!(
            lex("v-1(0x2)=ADD"),
            vec![
                Token::Ident("v-1".to_string()),
                Token::LParen,
                Token::Hex("0x2".to_string()),
                Token::RParen,
                Token::Assign,
                Token::Op(Opcode::Add),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_keyword_names_round_trip() {
        for (name, keyword) in Keyword::TABLE {
            assert_eq!(keyword.as_str(), name);
            assert_eq!(Keyword::from_upper(name), Some(keyword));
        }
    }

    #[test]
    fn test_empty_source_is_just_eof() {
        assert_eq!(lex(""), vec![Token::Eof]);
        assert_eq!(lex("  \n\t "), vec![Token::Eof]);
    }

    #[test]
    fn test_token_kinds() {
        assert_eq!(Token::Keyword(Keyword::Block).kind(), TokenKind::Keyword);
        assert_eq!(Token::Op(Opcode::Add).kind(), TokenKind::Keyword);
        assert_eq!(Token::Hex("0x1".into()).kind(), TokenKind::HexLiteral);
        assert_eq!(Token::Ident("x".into()).kind(), TokenKind::Identifier);
        assert_eq!(Token::Comma.kind(), TokenKind::Delimiter);
        assert_eq!(Token::Eof.kind(), TokenKind::Eof);
    }
}
