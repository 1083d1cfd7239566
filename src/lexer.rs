use crate::diagnostic::Diagnostic;
use crate::lexeme::Lexeme;
use crate::span::{Span, Spanned};

pub struct Lexer<'src> {
    text: &'src str,
    source: &'src [u8],
    file_id: u16,
    pos: usize,
    diagnostics: Vec<Diagnostic>,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str, file_id: u16) -> Self {
        Self {
            text: source,
            source: source.as_bytes(),
            file_id,
            pos: 0,
            diagnostics: Vec::new(),
        }
    }

    pub fn tokenize(mut self) -> (Vec<Spanned<Lexeme>>, Vec<Diagnostic>) {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token();
            let is_eof = tok.node == Lexeme::Eof;
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        (tokens, self.diagnostics)
    }

    fn next_token(&mut self) -> Spanned<Lexeme> {
        loop {
            self.skip_whitespace_and_comments();

            if self.pos >= self.source.len() {
                return self.make_token(Lexeme::Eof, self.pos, self.pos);
            }

            let start = self.pos;
            let ch = self.source[self.pos];

            if is_ident_start(ch) {
                return self.scan_ident_or_keyword();
            }

            if ch.is_ascii_digit() {
                return self.scan_number();
            }

            if let Some(tok) = self.scan_symbol(start) {
                return tok;
            }
            // scan_symbol returned None → error was recorded, try again
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while self.pos < self.source.len() && self.source[self.pos].is_ascii_whitespace() {
                self.pos += 1;
            }

            // Line comments: // ... to end of line
            if self.pos + 1 < self.source.len()
                && self.source[self.pos] == b'/'
                && self.source[self.pos + 1] == b'/'
            {
                while self.pos < self.source.len() && self.source[self.pos] != b'\n' {
                    self.pos += 1;
                }
                continue;
            }

            break;
        }
    }

    fn scan_ident_or_keyword(&mut self) -> Spanned<Lexeme> {
        let start = self.pos;
        while self.pos < self.source.len() && is_ident_continue(self.source[self.pos]) {
            self.pos += 1;
        }
        // Identifier bytes are ASCII, so the offsets sit on char
        // boundaries.
        let text = &self.text[start..self.pos];
        let token = Lexeme::from_keyword(text).unwrap_or_else(|| Lexeme::Ident(text.to_string()));
        self.make_token(token, start, self.pos)
    }

    fn scan_number(&mut self) -> Spanned<Lexeme> {
        let start = self.pos;
        while self.pos < self.source.len() && self.source[self.pos].is_ascii_digit() {
            self.pos += 1;
        }
        let text = &self.text[start..self.pos];
        match text.parse::<i64>() {
            Ok(value) => self.make_token(Lexeme::Integer(value), start, self.pos),
            Err(_) => {
                self.error(
                    format!("integer literal '{}' is too large", text),
                    start,
                    self.pos,
                );
                self.make_token(Lexeme::Integer(0), start, self.pos)
            }
        }
    }

    fn scan_symbol(&mut self, start: usize) -> Option<Spanned<Lexeme>> {
        let ch = self.source[self.pos];
        let next = self.source.get(self.pos + 1).copied();

        let (token, len) = match (ch, next) {
            (b':', Some(b'=')) => (Lexeme::Walrus, 2),
            (b'=', Some(b'=')) => (Lexeme::EqEq, 2),
            (b'!', Some(b'=')) => (Lexeme::NotEq, 2),
            (b'<', Some(b'=')) => (Lexeme::Le, 2),
            (b'>', Some(b'=')) => (Lexeme::Ge, 2),
            (b'=', _) => (Lexeme::Eq, 1),
            (b'<', _) => (Lexeme::Lt, 1),
            (b'>', _) => (Lexeme::Gt, 1),
            (b'(', _) => (Lexeme::LParen, 1),
            (b')', _) => (Lexeme::RParen, 1),
            (b'{', _) => (Lexeme::LBrace, 1),
            (b'}', _) => (Lexeme::RBrace, 1),
            (b';', _) => (Lexeme::Semicolon, 1),
            (b'+', _) => (Lexeme::Plus, 1),
            (b'-', _) => (Lexeme::Minus, 1),
            (b'*', _) => (Lexeme::Star, 1),
            (b'/', _) => (Lexeme::Slash, 1),
            _ => {
                self.pos += 1;
                self.error(
                    format!("unexpected character '{}'", ch as char),
                    start,
                    self.pos,
                );
                return None;
            }
        };

        self.pos += len;
        Some(self.make_token(token, start, self.pos))
    }

    fn make_token(&self, token: Lexeme, start: usize, end: usize) -> Spanned<Lexeme> {
        Spanned::new(token, Span::new(self.file_id, start as u32, end as u32))
    }

    fn error(&mut self, message: String, start: usize, end: usize) {
        self.diagnostics.push(Diagnostic::error(
            message,
            Span::new(self.file_id, start as u32, end as u32),
        ));
    }
}

fn is_ident_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_'
}

fn is_ident_continue(ch: u8) -> bool {
    ch.is_ascii_alphanumeric() || ch == b'_'
}
