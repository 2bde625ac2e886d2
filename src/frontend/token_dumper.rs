use crate::frontend::lexer::Spanned;
use crate::frontend::token::Token;

/// Renders a token stream one token per line, for `--tokens`.
pub struct TokenDumper {
    pub color: bool,
    pub show_debug_repr: bool, // if false, prints source text instead of Debug
}

impl Default for TokenDumper {
    fn default() -> Self {
        Self {
            color: true,
            show_debug_repr: true,
        }
    }
}

impl TokenDumper {
    // ANSI colors
    const RESET: &'static str = "\x1b[0m";
    const DIM: &'static str = "\x1b[2m";
    const GRN: &'static str = "\x1b[32m";
    const YEL: &'static str = "\x1b[33m";
    const CYN: &'static str = "\x1b[36m";
    const MAG: &'static str = "\x1b[35m";
    const BLU: &'static str = "\x1b[34m";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn no_color(mut self) -> Self {
        self.color = false;
        self
    }

    pub fn pretty(mut self) -> Self {
        self.show_debug_repr = false;
        self
    }

    pub fn dump(&self, tokens: &[Spanned]) {
        print!("{}", self.render(tokens));
    }

    pub fn render(&self, tokens: &[Spanned]) -> String {
        let mut out = String::new();
        for s in tokens {
            self.render_one(&mut out, s);
        }
        out
    }

    fn render_one(&self, out: &mut String, s: &Spanned) {
        let kind = self.kind(&s.token);
        let colr = if self.color { self.color(&s.token) } else { "" };
        let reset = if self.color { Self::RESET } else { "" };

        let text = if self.show_debug_repr {
            format!("{:?}", s.token)
        } else {
            match &s.token {
                Token::Comment(c) => format!("// {}", c),
                Token::Newline => "\\n".to_string(),
                Token::Eof => "<eof>".to_string(),
                other => other.to_string(),
            }
        };

        out.push_str(&format!(
            "[{:02}:{:02}] {}{:<8} {}{}\n",
            s.span.line, s.span.col, colr, kind, text, reset
        ));
    }

    fn kind(&self, t: &Token) -> &'static str {
        use Token::*;
        match t {
            Newline => "NEWLINE",
            Comment(_) => "COMMENT",
            Eof => "EOF",

            Integer(_) => "INT",
            String(_) => "STRING",
            Bool(_) | Null => "LITERAL",

            Ident(_) => "IDENT",

            LParen | RParen => "PAREN",
            LBrace | RBrace => "BRACE",
            Comma | Semi => "PUNCT",

            Plus | Minus | Star | Slash | Dot | Assign | Bang | AndAnd | OrOr => "OP",
            EqEq | NotEq | Lt | LtEq | Gt | GtEq => "CMP",

            Var | Fn | If | Else | While | Return => "KEYWORD",
        }
    }

    fn color(&self, t: &Token) -> &'static str {
        use Token::*;
        match t {
            Newline | Comment(_) | Eof => Self::DIM,
            String(_) => Self::GRN,
            Integer(_) | Bool(_) | Null => Self::CYN,
            Ident(_) => Self::YEL,
            Var | Fn | If | Else | While | Return => Self::BLU,
            Plus | Minus | Star | Slash | Dot | Assign | Bang | AndAnd | OrOr => Self::MAG,
            EqEq | NotEq | Lt | LtEq | Gt | GtEq => Self::MAG,
            _ => Self::RESET,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::lexer::Lexer;

    #[test]
    fn test_render_plain() {
        let tokens = Lexer::new("var x = 1;").tokenize().unwrap();
        let out = TokenDumper::new().no_color().pretty().render(&tokens);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], "[01:01] KEYWORD  var");
        assert_eq!(lines[1], "[01:05] IDENT    x");
        assert_eq!(lines[3], "[01:09] INT      1");
        assert_eq!(lines[5], "[01:11] EOF      <eof>");
    }

    #[test]
    fn test_render_debug_repr_with_color() {
        let tokens = Lexer::new("\"hi\"").tokenize().unwrap();
        let out = TokenDumper::new().render(&tokens);
        assert!(out.contains("String(\"hi\")"));
        assert!(out.contains(TokenDumper::GRN));
    }
}
