#[cfg(test)]
mod scanner_tests {
    use mico::scanner::*;
    use mico::token::*;

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let scanner = Scanner::new(source.as_bytes());
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), expected.len());

        for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.token_type, *expected_type);
            assert_eq!(actual.lexeme, *expected_lexeme);
        }
    }

    #[test]
    fn test_scanner_01_symbols() {
        assert_token_sequence(
            "({[*.,+*]})",
            &[
                (TokenType::LEFT_PAREN, "("),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::LEFT_BRACKET, "["),
                (TokenType::STAR, "*"),
                (TokenType::DOT, "."),
                (TokenType::COMMA, ","),
                (TokenType::PLUS, "+"),
                (TokenType::STAR, "*"),
                (TokenType::RIGHT_BRACKET, "]"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_02_dots_and_intervals() {
        // '..' between integers must not be folded into a float.
        assert_token_sequence(
            "0..3 a.b ...rest",
            &[
                (TokenType::INT(0), "0"),
                (TokenType::DOT_DOT, ".."),
                (TokenType::INT(3), "3"),
                (TokenType::IDENTIFIER, "a"),
                (TokenType::DOT, "."),
                (TokenType::IDENTIFIER, "b"),
                (TokenType::ELLIPSIS, "..."),
                (TokenType::IDENTIFIER, "rest"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_03_numbers() {
        assert_token_sequence(
            "42 3.14 0",
            &[
                (TokenType::INT(42), "42"),
                (TokenType::FLOAT(3.14), "3.14"),
                (TokenType::INT(0), "0"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_04_keywords_and_identifiers() {
        assert_token_sequence(
            "let fn if elif else for in module quote unquote foo _bar",
            &[
                (TokenType::LET, "let"),
                (TokenType::FN, "fn"),
                (TokenType::IF, "if"),
                (TokenType::ELIF, "elif"),
                (TokenType::ELSE, "else"),
                (TokenType::FOR, "for"),
                (TokenType::IN, "in"),
                (TokenType::MODULE, "module"),
                (TokenType::QUOTE, "quote"),
                (TokenType::UNQUOTE, "unquote"),
                (TokenType::IDENTIFIER, "foo"),
                (TokenType::IDENTIFIER, "_bar"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_05_operators() {
        assert_token_sequence(
            "== != <= >= && || | = ! < >",
            &[
                (TokenType::EQUAL_EQUAL, "=="),
                (TokenType::BANG_EQUAL, "!="),
                (TokenType::LESS_EQUAL, "<="),
                (TokenType::GREATER_EQUAL, ">="),
                (TokenType::AND_AND, "&&"),
                (TokenType::OR_OR, "||"),
                (TokenType::PIPE, "|"),
                (TokenType::EQUAL, "="),
                (TokenType::BANG, "!"),
                (TokenType::LESS, "<"),
                (TokenType::GREATER, ">"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_06_string_char_rawstring() {
        let scanner = Scanner::new(br#""hi\n" 'x' b"ab""#.as_slice());
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), 4);

        // TokenType equality compares discriminants only, so payloads
        // are checked by matching.
        match &tokens[0].token_type {
            TokenType::STRING(s) => assert_eq!(s, "hi\n"),
            other => panic!("expected STRING, got {:?}", other),
        }
        match &tokens[1].token_type {
            TokenType::CHAR(c) => assert_eq!(*c, 'x'),
            other => panic!("expected CHAR, got {:?}", other),
        }
        match &tokens[2].token_type {
            TokenType::RAWSTRING(b) => assert_eq!(b, b"ab"),
            other => panic!("expected RAWSTRING, got {:?}", other),
        }
        assert_eq!(tokens[3].token_type, TokenType::EOF);
    }

    #[test]
    fn test_scanner_07_comments_and_newlines() {
        assert_token_sequence(
            "1 // ignored to end of line\n2",
            &[
                (TokenType::INT(1), "1"),
                (TokenType::INT(2), "2"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_08_positions() {
        let scanner = Scanner::new(b"let x\n  = 1".as_slice());
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens[0].pos, Position::new(1, 1)); // let
        assert_eq!(tokens[1].pos, Position::new(1, 5)); // x
        assert_eq!(tokens[2].pos, Position::new(2, 3)); // =
        assert_eq!(tokens[3].pos, Position::new(2, 5)); // 1
    }

    #[test]
    fn test_scanner_09_unexpected_character() {
        let scanner = Scanner::new(b"1 $ 2".as_slice());
        let results: Vec<_> = scanner.collect();

        let error_count = results.iter().filter(|r| r.is_err()).count();
        assert_eq!(error_count, 1);

        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            assert!(
                err.to_string().contains("Unexpected character"),
                "unexpected message: {}",
                err
            );
        }
    }

    #[test]
    fn test_scanner_10_lone_ampersand_is_error() {
        let scanner = Scanner::new(b"a & b".as_slice());
        let error_count = scanner.filter(|r| r.is_err()).count();
        assert_eq!(error_count, 1);
    }
}
