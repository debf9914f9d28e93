//! Integration tests for address expression evaluation

use memory_inspect::core::types::{Address, ModuleInfo};
use memory_inspect::evaluator::{evaluate, module_identifiers, parse, EvalError};
use memory_inspect::process::{ProcessMemory, SnapshotProcess};
use std::collections::HashMap;

fn identifiers(pairs: &[(&str, usize)]) -> HashMap<String, usize> {
    pairs.iter().map(|&(name, value)| (name.to_string(), value)).collect()
}

#[test]
fn test_literals() {
    let none = HashMap::new();
    assert_eq!(evaluate("0x10", &none), Ok(16));
    assert_eq!(evaluate("10", &none), Ok(10));
    assert_eq!(evaluate("10+0x10", &none), Ok(26));
    assert_eq!(evaluate("1A", &none), Ok(0x1A));
    assert_eq!(evaluate("  0XFF  ", &none), Ok(255));
}

#[test]
fn test_precedence_and_associativity() {
    let none = HashMap::new();
    assert_eq!(evaluate("1 + 2 * 3", &none), Ok(7));
    assert_eq!(evaluate("10 - 4 - 3", &none), Ok(3));
    assert_eq!(evaluate("100 / 10 / 5", &none), Ok(2));
    assert_eq!(evaluate("0x100 - 8 * 2 + 1", &none), Ok(0xF1));
}

#[test]
fn test_wrapping() {
    let none = HashMap::new();
    assert_eq!(evaluate("0 - 1", &none), Ok(usize::MAX));
    assert_eq!(evaluate("0xFFFFFFFFFFFFFFFF + 2", &none), Ok(1));
}

#[test]
fn test_identifiers_ignore_case() {
    let ids = identifiers(&[("game.exe", 0x140000000), ("player", 0x2000)]);
    assert_eq!(evaluate("GAME.EXE + 0x10", &ids), Ok(0x140000010));
    assert_eq!(evaluate("Player*2", &ids), Ok(0x4000));
    // Identifiers that start with hex digits
    let ids = identifiers(&[("1234abcz", 5)]);
    assert_eq!(evaluate("1234abcz+1", &ids), Ok(6));
}

#[test]
fn test_errors() {
    let none = HashMap::new();
    assert_eq!(evaluate("", &none), Err(EvalError::UnexpectedEndOfInput));
    assert_eq!(evaluate("1 +", &none), Err(EvalError::UnexpectedEndOfInput));
    assert_eq!(evaluate("8 / 0", &none), Err(EvalError::DivisionByZero));
    assert_eq!(
        evaluate("missing.dll", &none),
        Err(EvalError::UnknownIdentifier("missing.dll".to_string()))
    );
    assert!(matches!(
        evaluate("1 $ 2", &none),
        Err(EvalError::InvalidCharacter { character: '$', position: 2 })
    ));
    assert!(matches!(
        evaluate("1 2", &none),
        Err(EvalError::UnexpectedToken { position: 2, .. })
    ));
    assert!(matches!(evaluate("0x", &none), Err(EvalError::InvalidNumber(_))));
}

#[test]
fn test_parse_display() {
    let expr = parse("player + 2 * 3").unwrap();
    assert_eq!(expr.to_string(), "(player + (0x2 * 0x3))");
}

#[test]
fn test_against_process_modules() {
    let process = SnapshotProcess::new();
    process.add_module(ModuleInfo::new("Game.exe", Address::new(0x140000000), 0x50000));
    process.add_module(ModuleInfo::new("kernel32.dll", Address::new(0x7FF810000000), 0x1000));

    let ids = module_identifiers(&process.enumerate_modules().unwrap());
    assert_eq!(evaluate("game.exe+1F0", &ids), Ok(0x1400001F0));
    assert_eq!(evaluate("KERNEL32.DLL + 0x20 - 0x10", &ids), Ok(0x7FF810000010));
}
