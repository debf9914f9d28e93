//! Address expression evaluation
//!
//! Turns text such as `game.exe+0x1F0` or `client.dll + 4 * 0x10` into an
//! address. Expressions mix integer literals, module or symbol names and the
//! four arithmetic operators.
//!
//! Literal rules:
//! * `0x`/`0X` prefixed digits are hex.
//! * A bare run of digits is decimal; a bare run containing `a-f` is hex.
//! * A bare run immediately followed by another identifier character
//!   (`1234abcz`, `d3d11.dll`) is an identifier instead.
//!
//! `*` and `/` bind tighter than `+` and `-`; all operators are
//! left-associative. Arithmetic wraps at pointer width.

mod ast;
mod error;
mod lexer;
mod parser;

pub use ast::{BinaryOp, Expr};
pub use error::{EvalError, EvalResult};
pub use lexer::{Lexer, Token};
pub use parser::Parser;

use crate::core::types::ModuleInfo;
use std::collections::HashMap;
use tracing::debug;

/// Parse an expression without evaluating it.
pub fn parse(source: &str) -> EvalResult<Expr> {
    let tokens = Lexer::new(source).tokenize()?;
    Parser::new(tokens).parse()
}

/// Evaluate `source` against a name to address map.
///
/// Identifier lookup ignores case.
pub fn evaluate(source: &str, identifiers: &HashMap<String, usize>) -> EvalResult<usize> {
    let expr = parse(source)?;
    let value = expr.eval(identifiers)?;
    debug!(%expr, value = format_args!("{:#x}", value), "evaluated address expression");
    Ok(value)
}

/// Builds the identifier map for a module list, keyed by lower-cased name.
pub fn module_identifiers(modules: &[ModuleInfo]) -> HashMap<String, usize> {
    modules
        .iter()
        .map(|m| (m.name.to_lowercase(), m.base_address.as_usize()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Address;

    fn no_identifiers() -> HashMap<String, usize> {
        HashMap::new()
    }

    #[test]
    fn test_mixed_literals() {
        assert_eq!(evaluate("10+0x10", &no_identifiers()), Ok(26));
        assert_eq!(evaluate("FF + 1", &no_identifiers()), Ok(0x100));
        assert_eq!(evaluate("2 * 3 + 4", &no_identifiers()), Ok(10));
    }

    #[test]
    fn test_module_identifiers() {
        let modules = vec![
            ModuleInfo::new("Game.exe", Address::new(0x140000000), 0x10000),
            ModuleInfo::new("d3d11.dll", Address::new(0x7FF800000000), 0x1000),
        ];
        let identifiers = module_identifiers(&modules);

        assert_eq!(evaluate("game.exe+0x1F0", &identifiers), Ok(0x1400001F0));
        assert_eq!(evaluate("D3D11.DLL + 8", &identifiers), Ok(0x7FF800000008));
    }
}
