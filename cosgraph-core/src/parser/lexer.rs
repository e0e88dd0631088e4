//! Tokenizer over the raw bytes of a file

use crate::error::{PdfError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Boolean: true or false
    Boolean(bool),

    /// Integer number
    Integer(i64),

    /// Real number
    Real(f64),

    /// Literal string `( ... )`
    String(Vec<u8>),

    /// Hexadecimal string `< ... >`
    HexString(Vec<u8>),

    /// Name object (e.g., /Type), `#xx` escapes decoded
    Name(String),

    /// Left square bracket [
    ArrayStart,

    /// Right square bracket ]
    ArrayEnd,

    /// Dictionary start <<
    DictStart,

    /// Dictionary end >>
    DictEnd,

    Stream,
    EndStream,
    Obj,
    EndObj,
    StartXRef,
    XRef,
    Trailer,

    /// The `R` of an indirect reference
    R,

    /// Null object
    Null,

    /// Any other bare word (`n` and `f` in xref tables, operators)
    Keyword(String),

    /// Comment (usually ignored)
    Comment(String),

    /// End of input
    Eof,
}

fn is_whitespace(ch: u8) -> bool {
    matches!(ch, b' ' | b'\t' | b'\n' | b'\r' | b'\x0C' | b'\0')
}

fn is_delimiter(ch: u8) -> bool {
    matches!(
        ch,
        b'/' | b'<' | b'>' | b'[' | b']' | b'(' | b')' | b'{' | b'}' | b'%'
    )
}

pub struct Lexer<'a> {
    data: &'a [u8],
    position: usize,
    token_buffer: Vec<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self::at(data, 0)
    }

    pub fn at(data: &'a [u8], position: usize) -> Self {
        Self {
            data,
            position: position.min(data.len()),
            token_buffer: Vec::new(),
        }
    }

    /// Byte position just past the last token read from the input.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn set_position(&mut self, position: usize) {
        self.position = position.min(self.data.len());
        self.token_buffer.clear();
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn push_token(&mut self, token: Token) {
        self.token_buffer.push(token);
    }

    pub fn peek_token(&mut self) -> Result<Token> {
        let token = self.next_token()?;
        self.push_token(token.clone());
        Ok(token)
    }

    /// Next token, skipping comments.
    pub fn next_significant(&mut self) -> Result<Token> {
        loop {
            match self.next_token()? {
                Token::Comment(_) => continue,
                token => return Ok(token),
            }
        }
    }

    pub fn next_token(&mut self) -> Result<Token> {
        if let Some(token) = self.token_buffer.pop() {
            return Ok(token);
        }

        self.skip_whitespace();

        let Some(ch) = self.peek_char() else {
            return Ok(Token::Eof);
        };

        match ch {
            b'%' => Ok(self.read_comment()),
            b'/' => self.read_name(),
            b'(' => self.read_literal_string(),
            b'<' => self.read_angle_bracket(),
            b'>' => {
                self.position += 1;
                if self.peek_char() == Some(b'>') {
                    self.position += 1;
                    Ok(Token::DictEnd)
                } else {
                    Err(self.error("Expected '>' after '>'"))
                }
            }
            b'[' => {
                self.position += 1;
                Ok(Token::ArrayStart)
            }
            b']' => {
                self.position += 1;
                Ok(Token::ArrayEnd)
            }
            b'+' | b'-' | b'0'..=b'9' | b'.' => self.read_number(),
            _ if !is_delimiter(ch) => Ok(self.read_keyword()),
            _ => Err(self.error(format!("Unexpected character: {}", ch as char))),
        }
    }

    fn peek_char(&self) -> Option<u8> {
        self.data.get(self.position).copied()
    }

    fn consume_char(&mut self) -> Option<u8> {
        let ch = self.peek_char()?;
        self.position += 1;
        Some(ch)
    }

    pub(crate) fn skip_whitespace(&mut self) -> usize {
        let start = self.position;
        while self.peek_char().is_some_and(is_whitespace) {
            self.position += 1;
        }
        self.position - start
    }

    /// Consumes the end-of-line marker that follows the `stream` keyword.
    pub(crate) fn skip_stream_eol(&mut self) {
        match self.peek_char() {
            Some(b'\r') => {
                self.position += 1;
                if self.peek_char() == Some(b'\n') {
                    self.position += 1;
                }
            }
            Some(b'\n') => self.position += 1,
            _ => {}
        }
    }

    fn error(&self, message: impl Into<String>) -> PdfError {
        PdfError::parse(self.position, message)
    }

    fn read_comment(&mut self) -> Token {
        self.position += 1;
        let start = self.position;
        while self.peek_char().is_some_and(|ch| ch != b'\n' && ch != b'\r') {
            self.position += 1;
        }
        Token::Comment(String::from_utf8_lossy(&self.data[start..self.position]).into_owned())
    }

    /// Read a name object (e.g., /Type)
    fn read_name(&mut self) -> Result<Token> {
        self.position += 1;
        let mut name = Vec::new();

        while let Some(ch) = self.peek_char() {
            if is_whitespace(ch) || is_delimiter(ch) {
                break;
            }
            self.position += 1;

            // Hex codes in names (e.g., /A#20B means /A B)
            if ch == b'#' {
                let digits = self
                    .data
                    .get(self.position..self.position + 2)
                    .and_then(|hex| std::str::from_utf8(hex).ok())
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok());
                match digits {
                    Some(value) => {
                        self.position += 2;
                        name.push(value);
                    }
                    None => name.push(ch),
                }
            } else {
                name.push(ch);
            }
        }

        Ok(Token::Name(String::from_utf8_lossy(&name).into_owned()))
    }

    /// Read a literal string (parentheses)
    fn read_literal_string(&mut self) -> Result<Token> {
        self.position += 1;
        let mut string = Vec::new();
        let mut paren_depth = 1;

        while paren_depth > 0 {
            let ch = self
                .consume_char()
                .ok_or_else(|| self.error("Unterminated string"))?;

            match ch {
                b'\\' => {
                    let escaped = self
                        .consume_char()
                        .ok_or_else(|| self.error("Unterminated string"))?;
                    match escaped {
                        b'n' => string.push(b'\n'),
                        b'r' => string.push(b'\r'),
                        b't' => string.push(b'\t'),
                        b'b' => string.push(b'\x08'),
                        b'f' => string.push(b'\x0C'),
                        b'0'..=b'7' => {
                            let mut value = (escaped - b'0') as u32;
                            for _ in 0..2 {
                                match self.peek_char() {
                                    Some(next @ b'0'..=b'7') => {
                                        self.position += 1;
                                        value = value * 8 + (next - b'0') as u32;
                                    }
                                    _ => break,
                                }
                            }
                            string.push((value & 0xFF) as u8);
                        }
                        // Line continuation
                        b'\r' => {
                            if self.peek_char() == Some(b'\n') {
                                self.position += 1;
                            }
                        }
                        b'\n' => {}
                        other => string.push(other),
                    }
                }
                b'(' => {
                    paren_depth += 1;
                    string.push(ch);
                }
                b')' => {
                    paren_depth -= 1;
                    if paren_depth > 0 {
                        string.push(ch);
                    }
                }
                _ => string.push(ch),
            }
        }

        Ok(Token::String(string))
    }

    /// Read angle bracket tokens (hex strings or dict markers)
    fn read_angle_bracket(&mut self) -> Result<Token> {
        self.position += 1;

        if self.peek_char() == Some(b'<') {
            self.position += 1;
            return Ok(Token::DictStart);
        }

        let mut digits = Vec::new();
        loop {
            let ch = self
                .consume_char()
                .ok_or_else(|| self.error("Unterminated hex string"))?;
            if ch == b'>' {
                break;
            }
            if ch.is_ascii_hexdigit() {
                digits.push(ch);
            } else if !is_whitespace(ch) {
                return Err(self.error("Invalid character in hex string"));
            }
        }

        // Odd digit count: the last digit is followed by an implicit 0
        if digits.len() % 2 != 0 {
            digits.push(b'0');
        }

        let bytes = digits
            .chunks(2)
            .map(|pair| {
                let high = (pair[0] as char).to_digit(16).unwrap_or(0);
                let low = (pair[1] as char).to_digit(16).unwrap_or(0);
                (high * 16 + low) as u8
            })
            .collect();
        Ok(Token::HexString(bytes))
    }

    /// Read a number (integer or real)
    fn read_number(&mut self) -> Result<Token> {
        let start = self.position;
        if matches!(self.peek_char(), Some(b'+' | b'-')) {
            self.position += 1;
        }
        let mut has_dot = false;
        while let Some(ch) = self.peek_char() {
            match ch {
                b'0'..=b'9' => self.position += 1,
                b'.' if !has_dot => {
                    has_dot = true;
                    self.position += 1;
                }
                _ => break,
            }
        }

        let text = std::str::from_utf8(&self.data[start..self.position])
            .map_err(|_| self.error("Invalid number"))?;
        if text.is_empty() || matches!(text, "+" | "-" | "." | "+." | "-.") {
            return Err(self.error(format!("Invalid number: '{text}'")));
        }

        if has_dot {
            text.parse::<f64>()
                .map(Token::Real)
                .map_err(|_| self.error(format!("Invalid real number: '{text}'")))
        } else {
            text.parse::<i64>()
                .map(Token::Integer)
                .map_err(|_| self.error(format!("Invalid integer: '{text}'")))
        }
    }

    fn read_keyword(&mut self) -> Token {
        let start = self.position;
        while self
            .peek_char()
            .is_some_and(|ch| !is_whitespace(ch) && !is_delimiter(ch))
        {
            self.position += 1;
        }
        let word = String::from_utf8_lossy(&self.data[start..self.position]).into_owned();
        match word.as_str() {
            "true" => Token::Boolean(true),
            "false" => Token::Boolean(false),
            "null" => Token::Null,
            "stream" => Token::Stream,
            "endstream" => Token::EndStream,
            "obj" => Token::Obj,
            "endobj" => Token::EndObj,
            "startxref" => Token::StartXRef,
            "xref" => Token::XRef,
            "trailer" => Token::Trailer,
            "R" => Token::R,
            _ => Token::Keyword(word),
        }
    }
}
