/// All lexemes in the MiniLang grammar.
#[derive(Clone, Debug, PartialEq)]
pub enum Lexeme {
    // Keywords
    If,
    Else,
    While,
    For,
    Assert,

    // Symbols
    LParen,    // (
    RParen,    // )
    LBrace,    // {
    RBrace,    // }
    Semicolon, // ;
    Walrus,    // :=
    Plus,      // +
    Minus,     // -
    Star,      // *
    Slash,     // /
    EqEq,      // ==
    NotEq,     // !=
    Lt,        // <
    Le,        // <=
    Gt,        // >
    Ge,        // >=
    Eq,        // = (always an error; kept so the parser can suggest :=)

    // Literals
    Integer(i64),
    Ident(String),

    // End of file
    Eof,
}

impl Lexeme {
    /// Try to match an identifier string to a keyword lexeme.
    pub fn from_keyword(s: &str) -> Option<Lexeme> {
        match s {
            "if" => Some(Lexeme::If),
            "else" => Some(Lexeme::Else),
            "while" => Some(Lexeme::While),
            "for" => Some(Lexeme::For),
            "assert" => Some(Lexeme::Assert),
            _ => None,
        }
    }

    /// Short human-readable description for diagnostics.
    pub fn describe(&self) -> String {
        match self {
            Lexeme::If => "'if'".to_string(),
            Lexeme::Else => "'else'".to_string(),
            Lexeme::While => "'while'".to_string(),
            Lexeme::For => "'for'".to_string(),
            Lexeme::Assert => "'assert'".to_string(),
            Lexeme::LParen => "'('".to_string(),
            Lexeme::RParen => "')'".to_string(),
            Lexeme::LBrace => "'{'".to_string(),
            Lexeme::RBrace => "'}'".to_string(),
            Lexeme::Semicolon => "';'".to_string(),
            Lexeme::Walrus => "':='".to_string(),
            Lexeme::Plus => "'+'".to_string(),
            Lexeme::Minus => "'-'".to_string(),
            Lexeme::Star => "'*'".to_string(),
            Lexeme::Slash => "'/'".to_string(),
            Lexeme::EqEq => "'=='".to_string(),
            Lexeme::NotEq => "'!='".to_string(),
            Lexeme::Lt => "'<'".to_string(),
            Lexeme::Le => "'<='".to_string(),
            Lexeme::Gt => "'>'".to_string(),
            Lexeme::Ge => "'>='".to_string(),
            Lexeme::Eq => "'='".to_string(),
            Lexeme::Integer(n) => format!("integer {}", n),
            Lexeme::Ident(name) => format!("identifier '{}'", name),
            Lexeme::Eof => "end of file".to_string(),
        }
    }
}
