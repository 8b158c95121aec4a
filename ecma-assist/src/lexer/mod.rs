use thiserror::Error;

use crate::source::SourceFile;

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub line: usize,
    pub column: usize,
    /// Byte offset of the first character in the source text.
    pub offset: usize,
    /// A line terminator appeared between this token and the previous one.
    pub newline_before: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Identifier,
    NumberLiteral(f64),
    StringLiteral(String),
    BooleanLiteral(bool),
    RegExpLiteral { pattern: String, flags: String },
    Keyword(Keyword),
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Colon,
    Semicolon,
    Question,
    Equal,
    DoubleEqual,
    TripleEqual,
    Bang,
    BangEqual,
    BangDoubleEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    LessLess,
    GreaterGreater,
    GreaterGreaterGreater,
    Plus,
    PlusPlus,
    Minus,
    MinusMinus,
    Star,
    Slash,
    Percent,
    Ampersand,
    AmpersandAmpersand,
    Pipe,
    PipePipe,
    Caret,
    Tilde,
    PlusEqual,
    MinusEqual,
    StarEqual,
    SlashEqual,
    PercentEqual,
    LessLessEqual,
    GreaterGreaterEqual,
    GreaterGreaterGreaterEqual,
    AmpersandEqual,
    PipeEqual,
    CaretEqual,
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Break,
    Case,
    Catch,
    Continue,
    Default,
    Delete,
    Do,
    Else,
    Finally,
    For,
    Function,
    If,
    In,
    Instanceof,
    New,
    Null,
    Return,
    Switch,
    This,
    Throw,
    Try,
    Typeof,
    Var,
    Void,
    While,
    With,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexerError {
    #[error("unexpected character '{ch}' at line {line}, column {column}")]
    UnexpectedCharacter {
        ch: char,
        line: usize,
        column: usize,
    },
    #[error("unterminated string literal starting at line {line}, column {column}")]
    UnterminatedString { line: usize, column: usize },
    #[error("unterminated comment starting at line {line}, column {column}")]
    UnterminatedComment { line: usize, column: usize },
    #[error("unterminated regular expression starting at line {line}, column {column}")]
    UnterminatedRegExp { line: usize, column: usize },
    #[error("invalid numeric literal '{lexeme}' at line {line}, column {column}")]
    InvalidNumber {
        lexeme: String,
        line: usize,
        column: usize,
    },
}

impl LexerError {
    pub fn line(&self) -> usize {
        match self {
            LexerError::UnexpectedCharacter { line, .. }
            | LexerError::UnterminatedString { line, .. }
            | LexerError::UnterminatedComment { line, .. }
            | LexerError::UnterminatedRegExp { line, .. }
            | LexerError::InvalidNumber { line, .. } => *line,
        }
    }

    pub fn column(&self) -> usize {
        match self {
            LexerError::UnexpectedCharacter { column, .. }
            | LexerError::UnterminatedString { column, .. }
            | LexerError::UnterminatedComment { column, .. }
            | LexerError::UnterminatedRegExp { column, .. }
            | LexerError::InvalidNumber { column, .. } => *column,
        }
    }
}

pub struct Lexer<'a> {
    input: &'a str,
    position: usize,
    line: usize,
    column: usize,
    newline_pending: bool,
    /// The previous significant token can end an operand, so `/` divides.
    after_operand: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a SourceFile) -> Self {
        Self {
            input: &source.contents,
            position: 0,
            line: 1,
            column: 1,
            newline_pending: false,
            after_operand: false,
        }
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexerError> {
        let mut tokens = Vec::new();

        while let Some(ch) = self.peek_char() {
            let token = match ch {
                ' ' | '\t' | '\u{000B}' | '\u{000C}' | '\u{00A0}' | '\u{FEFF}' => {
                    self.advance_char();
                    continue;
                }
                '\r' | '\n' | '\u{2028}' | '\u{2029}' => {
                    self.advance_char();
                    self.newline_pending = true;
                    continue;
                }
                '/' if self.peek_next_char() == Some('/') => {
                    self.skip_line_comment();
                    continue;
                }
                '/' if self.peek_next_char() == Some('*') => {
                    self.skip_block_comment()?;
                    continue;
                }
                '/' if !self.after_operand => self.lex_regexp()?,
                '"' | '\'' => self.lex_string(ch)?,
                '0'..='9' => self.lex_number()?,
                '.' if self.peek_next_char().is_some_and(|next| next.is_ascii_digit()) => {
                    self.lex_number()?
                }
                ch if is_identifier_start(ch) => self.lex_identifier_or_keyword(),
                _ => self.lex_punctuator()?,
            };

            self.after_operand = ends_operand(&token.kind);
            tokens.push(token);
        }

        let eof = self.make_token(TokenKind::Eof, self.position, self.line, self.column);
        tokens.push(eof);

        Ok(tokens)
    }

    fn make_token(&mut self, kind: TokenKind, start: usize, line: usize, column: usize) -> Token {
        let newline_before = std::mem::take(&mut self.newline_pending);
        Token {
            kind,
            lexeme: self.slice(start, self.position).to_string(),
            line,
            column,
            offset: start,
            newline_before,
        }
    }

    fn skip_line_comment(&mut self) {
        while let Some(ch) = self.peek_char() {
            if is_line_terminator(ch) {
                break;
            }
            self.advance_char();
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), LexerError> {
        let line = self.line;
        let column = self.column;
        self.advance_char(); // consume '/'
        self.advance_char(); // consume '*'

        while let Some(ch) = self.advance_char() {
            if is_line_terminator(ch) {
                self.newline_pending = true;
            }
            if ch == '*' && self.peek_char() == Some('/') {
                self.advance_char();
                return Ok(());
            }
        }

        Err(LexerError::UnterminatedComment { line, column })
    }

    fn lex_string(&mut self, quote: char) -> Result<Token, LexerError> {
        let start = self.position;
        let start_line = self.line;
        let start_column = self.column;
        self.advance_char(); // consume opening quote

        let mut value = String::new();
        while let Some(ch) = self.peek_char() {
            match ch {
                ch if ch == quote => {
                    self.advance_char(); // consume closing quote
                    return Ok(self.make_token(
                        TokenKind::StringLiteral(value),
                        start,
                        start_line,
                        start_column,
                    ));
                }
                '\\' => {
                    self.advance_char();
                    let escaped = self
                        .advance_char()
                        .ok_or(LexerError::UnterminatedString {
                            line: start_line,
                            column: start_column,
                        })?;
                    match escaped {
                        'n' => value.push('\n'),
                        'r' => value.push('\r'),
                        't' => value.push('\t'),
                        'b' => value.push('\u{0008}'),
                        'f' => value.push('\u{000C}'),
                        'v' => value.push('\u{000B}'),
                        '0' => value.push('\0'),
                        'x' => value.push(self.lex_hex_escape(2, 'x')),
                        'u' => value.push(self.lex_hex_escape(4, 'u')),
                        // Line continuation contributes nothing to the value.
                        '\r' => {
                            if self.peek_char() == Some('\n') {
                                self.advance_char();
                            }
                        }
                        '\n' | '\u{2028}' | '\u{2029}' => {}
                        other => value.push(other),
                    }
                }
                ch if is_line_terminator(ch) => break,
                _ => {
                    value.push(ch);
                    self.advance_char();
                }
            }
        }

        Err(LexerError::UnterminatedString {
            line: start_line,
            column: start_column,
        })
    }

    /// Decode `\xHH` / `\uHHHH`; malformed escapes keep their letter verbatim.
    fn lex_hex_escape(&mut self, digits: usize, letter: char) -> char {
        let candidate = self
            .input
            .get(self.position..self.position + digits)
            .filter(|text| text.chars().all(|ch| ch.is_ascii_hexdigit()));
        let Some(text) = candidate else {
            return letter;
        };
        match u32::from_str_radix(text, 16).ok().and_then(char::from_u32) {
            Some(decoded) => {
                for _ in 0..digits {
                    self.advance_char();
                }
                decoded
            }
            None => letter,
        }
    }

    fn lex_number(&mut self) -> Result<Token, LexerError> {
        let start = self.position;
        let start_line = self.line;
        let start_column = self.column;

        let is_hex = self.peek_char() == Some('0')
            && matches!(self.peek_next_char(), Some('x') | Some('X'));
        if is_hex {
            self.advance_char(); // consume '0'
            self.advance_char(); // consume 'x'
            while self.peek_char().is_some_and(|ch| ch.is_ascii_hexdigit()) {
                self.advance_char();
            }
            let digits = self.slice(start + 2, self.position).to_string();
            let value = u64::from_str_radix(&digits, 16).map_err(|_| LexerError::InvalidNumber {
                lexeme: self.slice(start, self.position).to_string(),
                line: start_line,
                column: start_column,
            })?;
            return Ok(self.make_token(
                TokenKind::NumberLiteral(value as f64),
                start,
                start_line,
                start_column,
            ));
        }

        self.consume_digits();
        if self.peek_char() == Some('.') {
            self.advance_char();
            self.consume_digits();
        }
        if matches!(self.peek_char(), Some('e') | Some('E')) {
            let exponent_follows = match self.peek_next_char() {
                Some('+') | Some('-') => self
                    .input
                    .get(self.position + 2..)
                    .and_then(|rest| rest.chars().next())
                    .is_some_and(|ch| ch.is_ascii_digit()),
                Some(ch) => ch.is_ascii_digit(),
                None => false,
            };
            if exponent_follows {
                self.advance_char(); // consume 'e'
                if matches!(self.peek_char(), Some('+') | Some('-')) {
                    self.advance_char();
                }
                self.consume_digits();
            }
        }

        let lexeme = self.slice(start, self.position).to_string();
        if self.peek_char().is_some_and(is_identifier_start) {
            return Err(LexerError::InvalidNumber {
                lexeme,
                line: start_line,
                column: start_column,
            });
        }
        let value = lexeme.parse::<f64>().map_err(|_| LexerError::InvalidNumber {
            lexeme: lexeme.clone(),
            line: start_line,
            column: start_column,
        })?;
        Ok(self.make_token(
            TokenKind::NumberLiteral(value),
            start,
            start_line,
            start_column,
        ))
    }

    fn consume_digits(&mut self) {
        while self.peek_char().is_some_and(|ch| ch.is_ascii_digit()) {
            self.advance_char();
        }
    }

    fn lex_regexp(&mut self) -> Result<Token, LexerError> {
        let start = self.position;
        let start_line = self.line;
        let start_column = self.column;
        self.advance_char(); // consume opening '/'

        let mut pattern = String::new();
        let mut in_class = false;
        loop {
            let ch = match self.peek_char() {
                Some(ch) if !is_line_terminator(ch) => ch,
                _ => {
                    return Err(LexerError::UnterminatedRegExp {
                        line: start_line,
                        column: start_column,
                    })
                }
            };
            self.advance_char();
            match ch {
                '/' if !in_class => break,
                '[' => in_class = true,
                ']' => in_class = false,
                '\\' => {
                    pattern.push(ch);
                    match self.peek_char() {
                        Some(next) if !is_line_terminator(next) => {
                            pattern.push(next);
                            self.advance_char();
                        }
                        _ => {
                            return Err(LexerError::UnterminatedRegExp {
                                line: start_line,
                                column: start_column,
                            })
                        }
                    }
                    continue;
                }
                _ => {}
            }
            pattern.push(ch);
        }

        let flags_start = self.position;
        while self.peek_char().is_some_and(is_identifier_part) {
            self.advance_char();
        }
        let flags = self.slice(flags_start, self.position).to_string();

        Ok(self.make_token(
            TokenKind::RegExpLiteral { pattern, flags },
            start,
            start_line,
            start_column,
        ))
    }

    fn lex_identifier_or_keyword(&mut self) -> Token {
        let start = self.position;
        let start_line = self.line;
        let start_column = self.column;
        self.advance_char();

        while self.peek_char().is_some_and(is_identifier_part) {
            self.advance_char();
        }

        let lexeme = self.slice(start, self.position);
        let kind = if let Some(keyword) = keyword_from_lexeme(lexeme) {
            TokenKind::Keyword(keyword)
        } else if lexeme == "true" {
            TokenKind::BooleanLiteral(true)
        } else if lexeme == "false" {
            TokenKind::BooleanLiteral(false)
        } else {
            TokenKind::Identifier
        };
        self.make_token(kind, start, start_line, start_column)
    }

    /// Longest-match over the punctuator table; every punctuator is ASCII.
    fn lex_punctuator(&mut self) -> Result<Token, LexerError> {
        let start = self.position;
        let start_line = self.line;
        let start_column = self.column;

        for len in (1..=4).rev() {
            let Some(candidate) = self.input.get(start..start + len) else {
                continue;
            };
            if let Some(kind) = punctuator_from_lexeme(candidate) {
                for _ in 0..len {
                    self.advance_char();
                }
                return Ok(self.make_token(kind, start, start_line, start_column));
            }
        }

        Err(LexerError::UnexpectedCharacter {
            ch: self.peek_char().unwrap_or_default(),
            line: start_line,
            column: start_column,
        })
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn peek_next_char(&self) -> Option<char> {
        let mut iter = self.input[self.position..].chars();
        iter.next()?;
        iter.next()
    }

    fn advance_char(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        self.position += ch.len_utf8();
        if is_line_terminator(ch) {
            if ch == '\r' && self.peek_char() == Some('\n') {
                self.position += 1;
            }
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn slice(&self, start: usize, end: usize) -> &str {
        &self.input[start..end]
    }
}

fn is_line_terminator(ch: char) -> bool {
    matches!(ch, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

fn is_identifier_start(ch: char) -> bool {
    ch == '_' || ch == '$' || ch.is_alphabetic()
}

fn is_identifier_part(ch: char) -> bool {
    is_identifier_start(ch) || ch.is_alphanumeric()
}

fn ends_operand(kind: &TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Identifier
            | TokenKind::NumberLiteral(_)
            | TokenKind::StringLiteral(_)
            | TokenKind::BooleanLiteral(_)
            | TokenKind::RegExpLiteral { .. }
            | TokenKind::RParen
            | TokenKind::RBracket
            | TokenKind::RBrace
            | TokenKind::PlusPlus
            | TokenKind::MinusMinus
            | TokenKind::Keyword(Keyword::This)
            | TokenKind::Keyword(Keyword::Null)
    )
}

fn keyword_from_lexeme(lexeme: &str) -> Option<Keyword> {
    match lexeme {
        "break" => Some(Keyword::Break),
        "case" => Some(Keyword::Case),
        "catch" => Some(Keyword::Catch),
        "continue" => Some(Keyword::Continue),
        "default" => Some(Keyword::Default),
        "delete" => Some(Keyword::Delete),
        "do" => Some(Keyword::Do),
        "else" => Some(Keyword::Else),
        "finally" => Some(Keyword::Finally),
        "for" => Some(Keyword::For),
        "function" => Some(Keyword::Function),
        "if" => Some(Keyword::If),
        "in" => Some(Keyword::In),
        "instanceof" => Some(Keyword::Instanceof),
        "new" => Some(Keyword::New),
        "null" => Some(Keyword::Null),
        "return" => Some(Keyword::Return),
        "switch" => Some(Keyword::Switch),
        "this" => Some(Keyword::This),
        "throw" => Some(Keyword::Throw),
        "try" => Some(Keyword::Try),
        "typeof" => Some(Keyword::Typeof),
        "var" => Some(Keyword::Var),
        "void" => Some(Keyword::Void),
        "while" => Some(Keyword::While),
        "with" => Some(Keyword::With),
        _ => None,
    }
}

fn punctuator_from_lexeme(lexeme: &str) -> Option<TokenKind> {
    let kind = match lexeme {
        ">>>=" => TokenKind::GreaterGreaterGreaterEqual,
        "===" => TokenKind::TripleEqual,
        "!==" => TokenKind::BangDoubleEqual,
        ">>>" => TokenKind::GreaterGreaterGreater,
        "<<=" => TokenKind::LessLessEqual,
        ">>=" => TokenKind::GreaterGreaterEqual,
        "==" => TokenKind::DoubleEqual,
        "!=" => TokenKind::BangEqual,
        "<=" => TokenKind::LessEqual,
        ">=" => TokenKind::GreaterEqual,
        "<<" => TokenKind::LessLess,
        ">>" => TokenKind::GreaterGreater,
        "++" => TokenKind::PlusPlus,
        "--" => TokenKind::MinusMinus,
        "&&" => TokenKind::AmpersandAmpersand,
        "||" => TokenKind::PipePipe,
        "+=" => TokenKind::PlusEqual,
        "-=" => TokenKind::MinusEqual,
        "*=" => TokenKind::StarEqual,
        "/=" => TokenKind::SlashEqual,
        "%=" => TokenKind::PercentEqual,
        "&=" => TokenKind::AmpersandEqual,
        "|=" => TokenKind::PipeEqual,
        "^=" => TokenKind::CaretEqual,
        "(" => TokenKind::LParen,
        ")" => TokenKind::RParen,
        "{" => TokenKind::LBrace,
        "}" => TokenKind::RBrace,
        "[" => TokenKind::LBracket,
        "]" => TokenKind::RBracket,
        "," => TokenKind::Comma,
        "." => TokenKind::Dot,
        ":" => TokenKind::Colon,
        ";" => TokenKind::Semicolon,
        "?" => TokenKind::Question,
        "=" => TokenKind::Equal,
        "!" => TokenKind::Bang,
        ">" => TokenKind::Greater,
        "<" => TokenKind::Less,
        "+" => TokenKind::Plus,
        "-" => TokenKind::Minus,
        "*" => TokenKind::Star,
        "/" => TokenKind::Slash,
        "%" => TokenKind::Percent,
        "&" => TokenKind::Ampersand,
        "|" => TokenKind::Pipe,
        "^" => TokenKind::Caret,
        "~" => TokenKind::Tilde,
        _ => return None,
    };
    Some(kind)
}
