//! Parser for the TAC dialect
//!
//! Parses the buffered token sequence into the CFG representation in
//! [`crate::ast`]. The whole token stream is available up front, so the
//! parser peeks as far ahead as it needs to tell an assignment target from
//! an operand of the previous statement.

use alloy_primitives::U256;

use crate::ast::*;
use crate::error::{Error, Result};
use crate::lexer::{Keyword, Span, SpannedToken, Token};
use crate::opcode::Opcode;

pub struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<SpannedToken>) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn parse(&mut self) -> Result<Program> {
        let mut functions = Vec::new();

        while matches!(self.peek_token(), Some(Token::Keyword(Keyword::Function))) {
            functions.push(self.parse_function()?);
        }

        if !self.is_at_end() {
            return Err(self.error("Expected FUNCTION or end of input"));
        }

        tracing::debug!(functions = functions.len(), "parsed TAC program");
        Ok(Program { functions })
    }

    // ===== Function Parsing =====

    fn parse_function(&mut self) -> Result<Function> {
        let span = self.current_span();
        self.expect_keyword(Keyword::Function)?;

        let (name, visibility) = match self.peek_token() {
            Some(Token::Ident(name)) => (name.clone(), Visibility::Public),
            Some(Token::Hex(name)) => (name.clone(), Visibility::Private),
            _ => return Err(self.error("Expected function name")),
        };
        self.advance();

        let params = match visibility {
            Visibility::Public => {
                let params = self.parse_typed_params()?;
                // TAC printers sometimes emit an extra empty `()` after the signature
                if matches!(self.peek_token(), Some(Token::LParen))
                    && matches!(self.peek_at(1), Some(Token::RParen))
                {
                    self.advance();
                    self.advance();
                }
                self.expect_keyword(Keyword::Public)?;
                params
            }
            Visibility::Private => {
                let params = self.parse_bare_params()?;
                self.expect_keyword(Keyword::Private)?;
                params
            }
        };

        self.expect(Token::LBrace)?;
        let mut blocks = Vec::new();
        while !matches!(self.peek_token(), Some(Token::RBrace)) {
            blocks.push(self.parse_block()?);
        }
        self.expect(Token::RBrace)?;

        Ok(Function { name, visibility, params, blocks, span })
    }

    /// `( TYPE [name] (, TYPE [name])* )`
    fn parse_typed_params(&mut self) -> Result<Vec<Param>> {
        self.expect(Token::LParen)?;
        let mut params = Vec::new();

        if !matches!(self.peek_token(), Some(Token::RParen)) {
            loop {
                let ty = self.parse_param_type()?;
                let name = match self.peek_token() {
                    Some(Token::Ident(name)) => {
                        let name = name.clone();
                        self.advance();
                        Some(name)
                    }
                    _ => None,
                };
                params.push(Param { ty: Some(ty), name });

                if matches!(self.peek_token(), Some(Token::Comma)) {
                    self.advance();
                } else {
                    break;
                }
            }
        }

        self.expect(Token::RParen)?;
        Ok(params)
    }

    fn parse_param_type(&mut self) -> Result<ParamType> {
        let ty = match self.peek_token() {
            Some(Token::Keyword(Keyword::Uint256)) => ParamType::Uint256,
            Some(Token::Keyword(Keyword::Bool)) => ParamType::Bool,
            Some(Token::Keyword(Keyword::Bytes)) => ParamType::Bytes,
            Some(Token::Op(Opcode::Address)) => ParamType::Address,
            _ => return Err(self.error("Expected parameter type (ADDRESS, UINT256, BOOL or BYTES)")),
        };
        self.advance();
        Ok(ty)
    }

    /// `( name (, name)* )`
    fn parse_bare_params(&mut self) -> Result<Vec<Param>> {
        self.expect(Token::LParen)?;
        let mut params = Vec::new();

        if !matches!(self.peek_token(), Some(Token::RParen)) {
            loop {
                let name = self.expect_ident()?;
                params.push(Param { ty: None, name: Some(name) });
                if matches!(self.peek_token(), Some(Token::Comma)) {
                    self.advance();
                } else {
                    break;
                }
            }
        }

        self.expect(Token::RParen)?;
        Ok(params)
    }

    // ===== Block Parsing =====

    /// `BEGIN BLOCK addr [:] PREV = [..] , SUCC = [..] [:] statement*`
    fn parse_block(&mut self) -> Result<Block> {
        let span = self.current_span();
        self.expect_keyword(Keyword::Begin)?;
        self.expect_keyword(Keyword::Block)?;
        let address = self.expect_address()?;
        self.skip(Token::Colon);

        self.expect_keyword(Keyword::Prev)?;
        self.expect(Token::Assign)?;
        let predecessors = self.parse_address_list()?;
        self.expect(Token::Comma)?;

        self.expect_keyword(Keyword::Succ)?;
        self.expect(Token::Assign)?;
        let successors = self.parse_address_list()?;
        self.skip(Token::Colon);

        let mut statements = Vec::new();
        while !matches!(
            self.peek_token(),
            Some(Token::Keyword(Keyword::Begin)) | Some(Token::RBrace) | Some(Token::Eof) | None
        ) {
            statements.push(self.parse_statement()?);
        }

        Ok(Block { address, predecessors, successors, statements, span })
    }

    /// `[ addr (, addr)* ]`
    fn parse_address_list(&mut self) -> Result<Vec<String>> {
        self.expect(Token::LBracket)?;
        let mut addresses = Vec::new();

        if !matches!(self.peek_token(), Some(Token::RBracket)) {
            loop {
                addresses.push(self.expect_address()?);
                if matches!(self.peek_token(), Some(Token::Comma)) {
                    self.advance();
                } else {
                    break;
                }
            }
        }

        self.expect(Token::RBracket)?;
        Ok(addresses)
    }

    // ===== Statement Parsing =====

    /// `[addr :] [target (, target)* =] OP [operand (, operand)*]`
    fn parse_statement(&mut self) -> Result<Statement> {
        let span = self.current_span();

        let address = if matches!(self.peek_token(), Some(Token::Hex(_)) | Some(Token::Ident(_)))
            && matches!(self.peek_at(1), Some(Token::Colon))
        {
            let address = self.expect_address()?;
            self.advance(); // consume :
            Some(address)
        } else {
            None
        };

        let mut operands = Vec::new();
        let mut defs = 0;
        if self.has_assignment() {
            loop {
                operands.push(self.parse_operand()?);
                defs += 1;
                if matches!(self.peek_token(), Some(Token::Comma)) {
                    self.advance();
                } else {
                    break;
                }
            }
            self.expect(Token::Assign)?;
        }

        let operation = match self.peek_token() {
            Some(Token::Op(op)) => *op,
            _ => return Err(self.error("Expected operation")),
        };
        self.advance();

        if self.starts_operand() {
            operands.push(self.parse_operand()?);
            while matches!(self.peek_token(), Some(Token::Comma)) {
                self.advance();
                operands.push(self.parse_operand()?);
            }
        }

        Ok(Statement { address, operation, operands, defs, span })
    }

    /// `name` or `name(0xVALUE)`; the parenthesized literal marks a constant
    fn parse_operand(&mut self) -> Result<Operand> {
        let name = self.expect_ident()?;

        if !matches!(self.peek_token(), Some(Token::LParen)) {
            return Ok(Operand::variable(name));
        }
        self.advance(); // consume (

        let value = match self.peek_token() {
            Some(Token::Hex(text)) => parse_u256(text),
            _ => return Err(self.error("Expected hex literal")),
        };
        let value = value.ok_or_else(|| self.error("Hex literal does not fit in 256 bits"))?;
        self.advance();
        self.expect(Token::RParen)?;

        Ok(Operand::constant(name, value))
    }

    /// Does the lookahead read `target (, target)* =`?
    fn has_assignment(&self) -> bool {
        let mut i = 0;
        loop {
            if !matches!(self.peek_at(i), Some(Token::Ident(_))) {
                return false;
            }
            i += 1;
            if matches!(self.peek_at(i), Some(Token::LParen)) {
                if !matches!(self.peek_at(i + 1), Some(Token::Hex(_)))
                    || !matches!(self.peek_at(i + 2), Some(Token::RParen))
                {
                    return false;
                }
                i += 3;
            }
            match self.peek_at(i) {
                Some(Token::Assign) => return true,
                Some(Token::Comma) => i += 1,
                _ => return false,
            }
        }
    }

    /// An identifier that does not open the next statement
    fn starts_operand(&self) -> bool {
        matches!(self.peek_token(), Some(Token::Ident(_)))
            && !matches!(self.peek_at(1), Some(Token::Colon))
            && !self.has_assignment()
    }

    // ===== Helper Methods =====

    fn peek_token(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|st| &st.token)
    }

    /// Peek `offset` tokens ahead without consuming
    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|st| &st.token)
    }

    /// Get the span of the current token
    fn current_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|st| st.span)
            .unwrap_or_default()
    }

    fn advance(&mut self) -> Option<&SpannedToken> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek_token(), Some(Token::Eof) | None)
    }

    fn skip(&mut self, token: Token) {
        if self.peek_token() == Some(&token) {
            self.advance();
        }
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        match self.peek_token() {
            Some(token) if *token == expected => {
                self.advance();
                Ok(())
            }
            _ => Err(self.error(&format!("Expected {}", expected.describe()))),
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> Result<()> {
        self.expect(Token::Keyword(keyword))
    }

    fn expect_ident(&mut self) -> Result<String> {
        match self.peek_token() {
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.error("Expected identifier")),
        }
    }

    /// Block address: hex literal or identifier
    fn expect_address(&mut self) -> Result<String> {
        match self.peek_token() {
            Some(Token::Hex(address)) | Some(Token::Ident(address)) => {
                let address = address.clone();
                self.advance();
                Ok(address)
            }
            _ => Err(self.error("Expected block address")),
        }
    }

    fn error(&self, message: &str) -> Error {
        let span = self.current_span();
        let found = self
            .peek_token()
            .map(Token::describe)
            .unwrap_or_else(|| Token::Eof.describe());
        Error::ParseError {
            message: format!("{}, found {}", message, found),
            line: span.line,
            col: span.col,
        }
    }
}

/// Parse the digits of a `0x` literal into a 256-bit value
fn parse_u256(text: &str) -> Option<U256> {
    let digits = text.get(2..)?;
    if digits.is_empty() {
        return Some(U256::ZERO);
    }
    U256::from_str_radix(digits, 16).ok()
}
