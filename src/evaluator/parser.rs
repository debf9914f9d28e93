use super::ast::{BinaryOp, Expr};
use super::error::{EvalError, EvalResult};
use super::lexer::{Spanned, Token};

/// Recursive descent parser over a token list.
///
/// ```text
/// expr    := term (('+' | '-') term)*
/// term    := primary (('*' | '/') primary)*
/// primary := NUMBER | IDENTIFIER
/// ```
pub struct Parser {
    tokens: Vec<Spanned>,
    cursor: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Spanned>) -> Self {
        Parser { tokens, cursor: 0 }
    }

    /// Parse a complete expression, rejecting trailing tokens.
    pub fn parse(mut self) -> EvalResult<Expr> {
        let expr = self.expr()?;

        if let Some(extra) = self.tokens.get(self.cursor) {
            return Err(unexpected(extra));
        }

        Ok(expr)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.cursor).map(|s| &s.token)
    }

    fn expr(&mut self) -> EvalResult<Expr> {
        let mut lhs = self.term()?;

        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.cursor += 1;
            let rhs = self.term()?;
            lhs = Expr::binary(op, lhs, rhs);
        }

        Ok(lhs)
    }

    fn term(&mut self) -> EvalResult<Expr> {
        let mut lhs = self.primary()?;

        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => break,
            };
            self.cursor += 1;
            let rhs = self.primary()?;
            lhs = Expr::binary(op, lhs, rhs);
        }

        Ok(lhs)
    }

    fn primary(&mut self) -> EvalResult<Expr> {
        let spanned = self
            .tokens
            .get(self.cursor)
            .ok_or(EvalError::UnexpectedEndOfInput)?;

        let expr = match &spanned.token {
            Token::Number(value) => Expr::Literal(*value),
            Token::Identifier(name) => Expr::Identifier(name.clone()),
            _ => return Err(unexpected(spanned)),
        };

        self.cursor += 1;
        Ok(expr)
    }
}

fn unexpected(spanned: &Spanned) -> EvalError {
    EvalError::UnexpectedToken {
        token: spanned.token.to_string(),
        position: spanned.pos,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::lexer::Lexer;

    fn parse(input: &str) -> EvalResult<Expr> {
        Parser::new(Lexer::new(input).tokenize()?).parse()
    }

    #[test]
    fn test_left_associative() {
        let expr = parse("10 - 2 - 3").unwrap();
        assert_eq!(expr.to_string(), "((0xa - 0x2) - 0x3)");
    }

    #[test]
    fn test_multiplicative_binds_tighter() {
        assert_eq!(parse("1 + 2 * 3").unwrap().to_string(), "(0x1 + (0x2 * 0x3))");
        assert_eq!(parse("8 / 2 / 2").unwrap().to_string(), "((0x8 / 0x2) / 0x2)");
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse(""), Err(EvalError::UnexpectedEndOfInput));
        assert_eq!(parse("10 +"), Err(EvalError::UnexpectedEndOfInput));
        assert_eq!(
            parse("+ 1"),
            Err(EvalError::UnexpectedToken {
                token: "+".to_string(),
                position: 0
            })
        );
        assert_eq!(
            parse("1 2"),
            Err(EvalError::UnexpectedToken {
                token: "0x2".to_string(),
                position: 2
            })
        );
    }
}
