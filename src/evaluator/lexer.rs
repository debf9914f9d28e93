use super::error::{EvalError, EvalResult};
use std::{fmt, str};
use tracing::trace;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// An integer literal.
    Number(usize),
    /// A module or symbol name.
    Identifier(String),
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
}

impl fmt::Display for Token {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(fmt, "{:#x}", n),
            Token::Identifier(name) => fmt.write_str(name),
            Token::Plus => fmt.write_str("+"),
            Token::Minus => fmt.write_str("-"),
            Token::Star => fmt.write_str("*"),
            Token::Slash => fmt.write_str("/"),
        }
    }
}

/// A token together with the byte offset it started at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned {
    pub token: Token,
    pub pos: usize,
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

/// Iterate over an input string and emits tokens.
#[derive(Debug)]
pub struct Lexer<'a> {
    /// The raw input.
    input: &'a str,
    /// Iterator over the input.
    iter: str::CharIndices<'a>,
    /// First character lookahead.
    c1: Option<(usize, char)>,
    /// Second character lookahead.
    c2: Option<(usize, char)>,
}

impl<'a> Lexer<'a> {
    /// Construct a new lexer for the given string.
    pub fn new(input: &'a str) -> Lexer<'a> {
        let mut iter = input.char_indices();
        let c1 = iter.next();
        let c2 = iter.next();

        Lexer { input, iter, c1, c2 }
    }

    /// Advance the iterator one step.
    fn step(&mut self) {
        self.c1 = self.c2.take();
        self.c2 = self.iter.next();
    }

    /// Peek a single character.
    fn peek(&self) -> Option<(usize, char)> {
        self.c1
    }

    /// Peek two characters.
    fn peek2(&self) -> Option<(usize, char)> {
        self.c2
    }

    /// Get the current position of the iterator.
    fn pos(&self) -> usize {
        self.c1.map(|(pos, _)| pos).unwrap_or(self.input.len())
    }

    /// Consume characters while `cond` holds and return the consumed slice.
    fn take_while(&mut self, start: usize, cond: impl Fn(char) -> bool) -> &'a str {
        while let Some((_, c)) = self.peek() {
            if !cond(c) {
                break;
            }
            self.step();
        }
        &self.input[start..self.pos()]
    }

    /// `0x` prefixed hex literal.
    fn hex_literal(&mut self, start: usize) -> EvalResult<Token> {
        // skip `0x`
        self.step();
        self.step();

        let digits_start = self.pos();
        let digits = self.take_while(digits_start, |c| c.is_ascii_hexdigit());

        if digits.is_empty() {
            return Err(EvalError::InvalidNumber(self.input[start..self.pos()].to_string()));
        }

        let n = usize::from_str_radix(digits, 16)
            .map_err(|_| EvalError::InvalidNumber(self.input[start..self.pos()].to_string()))?;
        Ok(Token::Number(n))
    }

    /// A run of hex digits, or an identifier that happens to start with one.
    ///
    /// Runs of plain decimal digits are decimal, runs containing `a-f` are hex.
    fn number_or_identifier(&mut self, start: usize) -> EvalResult<Token> {
        // lookahead without consuming, so the run can be re-read as an identifier
        let rest = &self.input[start..];
        let run_len = rest
            .find(|c: char| !c.is_ascii_hexdigit())
            .unwrap_or(rest.len());
        let follows_identifier = rest[run_len..]
            .chars()
            .next()
            .map(is_identifier_char)
            .unwrap_or(false);

        if follows_identifier {
            return Ok(self.identifier(start));
        }

        let digits = self.take_while(start, |c| c.is_ascii_hexdigit());

        let parsed = if digits.bytes().all(|b| b.is_ascii_digit()) {
            digits.parse::<usize>().ok()
        } else {
            usize::from_str_radix(digits, 16).ok()
        };

        parsed
            .map(Token::Number)
            .ok_or_else(|| EvalError::InvalidNumber(digits.to_string()))
    }

    fn identifier(&mut self, start: usize) -> Token {
        Token::Identifier(self.take_while(start, is_identifier_char).to_string())
    }

    /// Produce the next token, or `None` at the end of input.
    pub fn next_token(&mut self) -> EvalResult<Option<Spanned>> {
        while let Some((start, c)) = self.peek() {
            let token = match c {
                c if c.is_whitespace() => {
                    self.step();
                    continue;
                }
                '+' => {
                    self.step();
                    Token::Plus
                }
                '-' => {
                    self.step();
                    Token::Minus
                }
                '*' => {
                    self.step();
                    Token::Star
                }
                '/' => {
                    self.step();
                    Token::Slash
                }
                '0' if matches!(self.peek2(), Some((_, 'x' | 'X'))) => self.hex_literal(start)?,
                c if c.is_ascii_hexdigit() => self.number_or_identifier(start)?,
                c if c.is_ascii_alphabetic() || c == '_' => self.identifier(start),
                character => {
                    return Err(EvalError::InvalidCharacter {
                        character,
                        position: start,
                    })
                }
            };

            trace!(?token, pos = start, "lexed");
            return Ok(Some(Spanned { token, pos: start }));
        }

        Ok(None)
    }

    /// Tokenize the whole input, stopping at the first error.
    pub fn tokenize(mut self) -> EvalResult<Vec<Spanned>> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::{Lexer, Token};
    use crate::evaluator::error::EvalError;

    fn lex(input: &str) -> Result<Vec<Token>, EvalError> {
        Ok(Lexer::new(input)
            .tokenize()?
            .into_iter()
            .map(|s| s.token)
            .collect())
    }

    fn ident(name: &str) -> Token {
        Token::Identifier(name.to_string())
    }

    #[test]
    fn test_numbers() {
        assert_eq!(lex("0x10").unwrap(), vec![Token::Number(0x10)]);
        assert_eq!(lex("0XfF").unwrap(), vec![Token::Number(0xFF)]);
        assert_eq!(lex("10").unwrap(), vec![Token::Number(10)]);
        assert_eq!(lex("1F").unwrap(), vec![Token::Number(0x1F)]);
        assert_eq!(lex("dead").unwrap(), vec![Token::Number(0xDEAD)]);
    }

    #[test]
    fn test_identifiers() {
        assert_eq!(lex("game.exe").unwrap(), vec![ident("game.exe")]);
        assert_eq!(lex("1234abcz").unwrap(), vec![ident("1234abcz")]);
        assert_eq!(lex("abc_x").unwrap(), vec![ident("abc_x")]);
        assert_eq!(lex("_start").unwrap(), vec![ident("_start")]);
        assert_eq!(lex("d3d11.dll").unwrap(), vec![ident("d3d11.dll")]);
    }

    #[test]
    fn test_expression() {
        assert_eq!(
            lex(" game.exe + 0x1F0 * 2 - 8 / base ").unwrap(),
            vec![
                ident("game.exe"),
                Token::Plus,
                Token::Number(0x1F0),
                Token::Star,
                Token::Number(2),
                Token::Minus,
                Token::Number(8),
                Token::Slash,
                ident("base"),
            ]
        );
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            lex("1 $ 2"),
            Err(EvalError::InvalidCharacter {
                character: '$',
                position: 2
            })
        );
        assert!(matches!(lex("0x"), Err(EvalError::InvalidNumber(_))));
        assert!(matches!(
            lex("0xFFFFFFFFFFFFFFFFFF"),
            Err(EvalError::InvalidNumber(_))
        ));
    }
}
