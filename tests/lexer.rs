#[cfg(test)]
mod lexer_tests {
    use pretty_assertions::assert_eq;
    use sharp_script as sharp;

    use sharp::lexer::*;
    use sharp::token::*;

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let tokens: Vec<Token> = Lexer::new(source).tokenize();

        let actual: Vec<(TokenType, &str)> =
            tokens.iter().map(|t| (t.token_type, t.lexeme)).collect();

        assert_eq!(actual, expected);
    }

    #[test]
    fn test_lexer_01_delimiters() {
        assert_token_sequence(
            "({[;,.:]})",
            &[
                (TokenType::LEFT_PAREN, "("),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::LEFT_BRACKET, "["),
                (TokenType::SEMICOLON, ";"),
                (TokenType::COMMA, ","),
                (TokenType::DOT, "."),
                (TokenType::COLON, ":"),
                (TokenType::RIGHT_BRACKET, "]"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_lexer_02_operators_prefer_two_characters() {
        assert_token_sequence(
            "+ += - -= = == ! != < <= > >= && || * / %",
            &[
                (TokenType::PLUS, "+"),
                (TokenType::PLUS_EQUAL, "+="),
                (TokenType::MINUS, "-"),
                (TokenType::MINUS_EQUAL, "-="),
                (TokenType::EQUAL, "="),
                (TokenType::EQUAL_EQUAL, "=="),
                (TokenType::BANG, "!"),
                (TokenType::BANG_EQUAL, "!="),
                (TokenType::LESS, "<"),
                (TokenType::LESS_EQUAL, "<="),
                (TokenType::GREATER, ">"),
                (TokenType::GREATER_EQUAL, ">="),
                (TokenType::AND_AND, "&&"),
                (TokenType::OR_OR, "||"),
                (TokenType::STAR, "*"),
                (TokenType::SLASH, "/"),
                (TokenType::PERCENT, "%"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_lexer_03_keywords_and_identifiers() {
        assert_token_sequence(
            "var function class static public private return if else while for true false null new this base varx _tmp",
            &[
                (TokenType::VAR, "var"),
                (TokenType::FUNCTION, "function"),
                (TokenType::CLASS, "class"),
                (TokenType::STATIC, "static"),
                (TokenType::PUBLIC, "public"),
                (TokenType::PRIVATE, "private"),
                (TokenType::RETURN, "return"),
                (TokenType::IF, "if"),
                (TokenType::ELSE, "else"),
                (TokenType::WHILE, "while"),
                (TokenType::FOR, "for"),
                (TokenType::TRUE, "true"),
                (TokenType::FALSE, "false"),
                (TokenType::NULL, "null"),
                (TokenType::NEW, "new"),
                (TokenType::THIS, "this"),
                (TokenType::BASE, "base"),
                (TokenType::IDENTIFIER, "varx"),
                (TokenType::IDENTIFIER, "_tmp"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_lexer_04_numbers_and_strings() {
        assert_token_sequence(
            r#"42 3.14 1.2.3 "hi" "a\"b""#,
            &[
                (TokenType::NUMBER, "42"),
                (TokenType::NUMBER, "3.14"),
                (TokenType::NUMBER, "1.2.3"),
                (TokenType::STRING, "\"hi\""),
                (TokenType::STRING, r#""a\"b""#),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_unterminated_string_runs_to_end() {
        assert_token_sequence(
            "print(\"oops",
            &[
                (TokenType::IDENTIFIER, "print"),
                (TokenType::LEFT_PAREN, "("),
                (TokenType::STRING, "\"oops"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_unknown_characters_pass_through_as_identifiers() {
        assert_token_sequence(
            "a $ # & b",
            &[
                (TokenType::IDENTIFIER, "a"),
                (TokenType::IDENTIFIER, "$"),
                (TokenType::IDENTIFIER, "#"),
                (TokenType::IDENTIFIER, "&"),
                (TokenType::IDENTIFIER, "b"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_token_sequence(
            "var a = 1; // trailing comment\n// whole line\nprint(a);",
            &[
                (TokenType::VAR, "var"),
                (TokenType::IDENTIFIER, "a"),
                (TokenType::EQUAL, "="),
                (TokenType::NUMBER, "1"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::IDENTIFIER, "print"),
                (TokenType::LEFT_PAREN, "("),
                (TokenType::IDENTIFIER, "a"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_positions_are_one_based_start_coordinates() {
        let tokens: Vec<Token> = Lexer::new("var x = 10;\n  print(x);").tokenize();

        let positions: Vec<(usize, usize)> = tokens.iter().map(|t| (t.line, t.column)).collect();

        assert_eq!(
            positions,
            vec![
                (1, 1),
                (1, 5),
                (1, 7),
                (1, 9),
                (1, 11),
                (2, 3),
                (2, 8),
                (2, 9),
                (2, 10),
                (2, 11),
                (2, 12),
            ]
        );
    }

    #[test]
    fn test_unicode_identifiers_count_columns_in_characters() {
        let tokens: Vec<Token> = Lexer::new("переменная = 1;").tokenize();

        assert_eq!(tokens[0].token_type, TokenType::IDENTIFIER);
        assert_eq!(tokens[0].lexeme, "переменная");
        assert_eq!(tokens[1].column, 12);
    }

    #[test]
    fn test_exactly_one_eof() {
        for source in ["", "   \n\t", "// only a comment", "x"] {
            let tokens: Vec<Token> = Lexer::new(source).tokenize();
            let eofs = tokens
                .iter()
                .filter(|t| t.token_type == TokenType::EOF)
                .count();

            assert_eq!(eofs, 1, "source {:?}", source);
            assert_eq!(tokens.last().map(|t| t.token_type), Some(TokenType::EOF));
        }
    }

    #[test]
    fn test_token_display() {
        let tokens: Vec<Token> = Lexer::new("var").tokenize();

        assert_eq!(tokens[0].to_string(), "VAR var [1:1]");
    }

    #[test]
    fn test_tokens_serialize_to_json() {
        let tokens: Vec<Token> = Lexer::new("x").tokenize();
        let json = serde_json::to_value(&tokens[0]).expect("token serializes");

        assert_eq!(json["token_type"], "IDENTIFIER");
        assert_eq!(json["lexeme"], "x");
        assert_eq!(json["line"], 1);
        assert_eq!(json["column"], 1);
    }
}
