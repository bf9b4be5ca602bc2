//! Scanner tests: token sequences, literal handling, error accumulation,
//! and the rescan-of-lexemes idempotence property.

use rox::error::Diagnostics;
use rox::scanner::{scan, Scanner};
use rox::token::{Token, TokenType};

fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
    let scanner = Scanner::new(source.as_bytes());
    let tokens: Vec<Token> = scanner.filter_map(Result::ok).collect();

    assert_eq!(tokens.len(), expected.len());

    for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
        assert_eq!(actual.token_type, *expected_type);
        assert_eq!(actual.lexeme, *expected_lexeme);
    }
}

#[test]
fn symbols() {
    assert_token_sequence(
        "({*.,+*})",
        &[
            (TokenType::LEFT_PAREN, "("),
            (TokenType::LEFT_BRACE, "{"),
            (TokenType::STAR, "*"),
            (TokenType::DOT, "."),
            (TokenType::COMMA, ","),
            (TokenType::PLUS, "+"),
            (TokenType::STAR, "*"),
            (TokenType::RIGHT_BRACE, "}"),
            (TokenType::RIGHT_PAREN, ")"),
            (TokenType::EOF, ""),
        ],
    );
}

#[test]
fn maximal_munch_operators() {
    assert_token_sequence(
        "! != = == < <= > >=",
        &[
            (TokenType::BANG, "!"),
            (TokenType::BANG_EQUAL, "!="),
            (TokenType::EQUAL, "="),
            (TokenType::EQUAL_EQUAL, "=="),
            (TokenType::LESS, "<"),
            (TokenType::LESS_EQUAL, "<="),
            (TokenType::GREATER, ">"),
            (TokenType::GREATER_EQUAL, ">="),
            (TokenType::EOF, ""),
        ],
    );
}

#[test]
fn keywords_and_identifiers() {
    assert_token_sequence(
        "class classy var x while whiles",
        &[
            (TokenType::CLASS, "class"),
            (TokenType::IDENTIFIER, "classy"),
            (TokenType::VAR, "var"),
            (TokenType::IDENTIFIER, "x"),
            (TokenType::WHILE, "while"),
            (TokenType::IDENTIFIER, "whiles"),
            (TokenType::EOF, ""),
        ],
    );
}

#[test]
fn number_trailing_dot_not_consumed() {
    // "123." scans as the number 123 followed by a DOT token.
    assert_token_sequence(
        "123. 3.14",
        &[
            (TokenType::NUMBER(123.0), "123"),
            (TokenType::DOT, "."),
            (TokenType::NUMBER(3.14), "3.14"),
            (TokenType::EOF, ""),
        ],
    );
}

#[test]
fn string_literal_spans_lines() {
    let source = "\"one\ntwo\" x";
    let mut diagnostics = Diagnostics::new();
    let tokens = scan(source.as_bytes(), &mut diagnostics);

    assert!(!diagnostics.had_errors());
    assert_eq!(tokens.len(), 3); // STRING, IDENTIFIER, EOF

    match &tokens[0].token_type {
        TokenType::STRING(s) => assert_eq!(s, "one\ntwo"),
        other => panic!("expected STRING, got {:?}", other),
    }

    // The identifier after the string sits on line 2.
    assert_eq!(tokens[1].line, 2);
}

#[test]
fn unterminated_string_is_an_error() {
    let mut diagnostics = Diagnostics::new();
    let tokens = scan(b"\"oops", &mut diagnostics);

    assert!(diagnostics.had_errors());
    assert!(diagnostics.errors()[0]
        .to_string()
        .contains("Unterminated string."));

    // The pass still finished and emitted EOF.
    assert_eq!(tokens.last().unwrap().token_type, TokenType::EOF);
}

#[test]
fn comments_and_whitespace_are_skipped() {
    assert_token_sequence(
        "a // the rest is noise + - *\nb",
        &[
            (TokenType::IDENTIFIER, "a"),
            (TokenType::IDENTIFIER, "b"),
            (TokenType::EOF, ""),
        ],
    );
}

#[test]
fn unexpected_characters_accumulate_without_stopping() {
    let mut diagnostics = Diagnostics::new();
    let tokens = scan(b",.$(#", &mut diagnostics);

    // Both bad characters were reported...
    assert_eq!(diagnostics.errors().len(), 2);
    for error in diagnostics.errors() {
        assert!(error.to_string().contains("Unexpected character"));
    }

    // ...and every valid token around them still came through.
    let kinds: Vec<&'static str> = tokens.iter().map(|t| t.token_type.name()).collect();
    assert_eq!(kinds, vec!["COMMA", "DOT", "LEFT_PAREN", "EOF"]);
}

#[test]
fn rescan_of_reprinted_lexemes_is_idempotent() {
    let source = "var x = 1.5 + 2; print \"hi\"; // comment\nif (x >= 3) { x = x / 2; }";

    let mut diagnostics = Diagnostics::new();
    let first = scan(source.as_bytes(), &mut diagnostics);
    assert!(!diagnostics.had_errors());

    // Re-print every lexeme (whitespace/comments are gone) and scan again.
    let reprinted: String = first
        .iter()
        .filter(|t| t.token_type != TokenType::EOF)
        .map(|t| t.lexeme.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    let second = scan(reprinted.as_bytes(), &mut diagnostics);
    assert!(!diagnostics.had_errors());

    // Same kinds and literal payloads, line numbers aside.
    let strip = |tokens: &[Token]| -> Vec<String> {
        tokens
            .iter()
            .map(|t| format!("{:?}", t.token_type))
            .collect()
    };

    assert_eq!(strip(&first), strip(&second));
}
