#[cfg(test)]
mod generator_tests {
    use mico::interpreter::Interpreter;

    fn eval(source: &str) -> String {
        let mut interpreter = Interpreter::new();
        let value = interpreter
            .run(source.as_bytes())
            .unwrap_or_else(|e| panic!("program failed: {}", e));
        interpreter.render(&value)
    }

    fn eval_err(source: &str) -> String {
        let mut interpreter = Interpreter::new();
        match interpreter.run(source.as_bytes()) {
            Ok(value) => panic!(
                "program unexpectedly succeeded with {}",
                interpreter.render(&value)
            ),
            Err(e) => e.to_string(),
        }
    }

    /// Collect every loop element into an array and render it.
    fn collect(source_expr: &str) -> String {
        eval(&format!(
            "let out = []; for v in {} {{ out = out + [v] }}; out",
            source_expr
        ))
    }

    // ── interval boundary rule: half-open on the right, in the
    //    direction of travel ────────────────────────────────────────────

    #[test]
    fn test_ascending_int_interval_excludes_right() {
        assert_eq!(collect("0..3"), "[0, 1, 2]");
    }

    #[test]
    fn test_descending_int_interval_excludes_right() {
        assert_eq!(collect("3..0"), "[3, 2, 1]");
    }

    #[test]
    fn test_empty_interval_runs_zero_iterations() {
        assert_eq!(collect("0..0"), "[]");
        assert_eq!(collect("5..5"), "[]");
    }

    #[test]
    fn test_float_interval_steps_by_one() {
        assert_eq!(collect("0.0..3.0"), "[0.0, 1.0, 2.0]");
        assert_eq!(collect("2.0..0.0"), "[2.0, 1.0]");
    }

    #[test]
    fn test_char_interval() {
        assert_eq!(collect("'a'..'d'"), "['a', 'b', 'c']");
        assert_eq!(collect("'c'..'a'"), "['c', 'b']");
    }

    // ── sequence sources ─────────────────────────────────────────────────

    #[test]
    fn test_array_iteration_in_order() {
        assert_eq!(collect("[10, 20, 30]"), "[10, 20, 30]");
    }

    #[test]
    fn test_string_iteration_yields_chars() {
        assert_eq!(collect("\"abc\""), "['a', 'b', 'c']");
    }

    #[test]
    fn test_index_variable_for_sequences() {
        assert_eq!(
            eval(
                "let out = [];
                 for i, c in \"abc\" { out = out + [i] };
                 out"
            ),
            "[0, 1, 2]"
        );
    }

    #[test]
    fn test_slice_iteration_respects_view() {
        assert_eq!(
            eval(
                "let a = [0, 1, 2, 3, 4];
                 let out = [];
                 for v in a[1..4] { out = out + [v] };
                 out"
            ),
            "[1, 2, 3]"
        );
        assert_eq!(
            eval(
                "let a = [0, 1, 2, 3, 4];
                 let out = [];
                 for v in a[3..0] { out = out + [v] };
                 out"
            ),
            "[3, 2, 1]"
        );
    }

    #[test]
    fn test_string_slice_is_text() {
        assert_eq!(eval("\"hello\"[1..3]"), "el");
        assert_eq!(eval("\"hello\"[1..3] == \"el\""), "true");
    }

    // ── tables ───────────────────────────────────────────────────────────

    #[test]
    fn test_table_iteration_in_insertion_order() {
        assert_eq!(
            eval(
                "let t = {\"a\": 1, \"b\": 2, \"c\": 3};
                 let keys = [];
                 let vals = [];
                 for k, v in t { keys = keys + [k]; vals = vals + [v] };
                 keys + vals"
            ),
            "[\"a\", \"b\", \"c\", 1, 2, 3]"
        );
    }

    #[test]
    fn test_table_single_name_binds_values() {
        assert_eq!(
            eval(
                "let t = {\"a\": 10, \"b\": 20};
                 let total = 0;
                 for v in t { total = total + v };
                 total"
            ),
            "30"
        );
    }

    // ── error cases ──────────────────────────────────────────────────────

    #[test]
    fn test_non_iterable_source_fails() {
        let msg = eval_err("for v in 42 { v }");
        assert!(msg.contains("not iterable"), "got: {}", msg);
    }

    #[test]
    fn test_bool_interval_is_not_iterable() {
        let msg = eval_err("for v in false..true { v }");
        assert!(msg.contains("not iterable"), "got: {}", msg);
    }

    #[test]
    fn test_mixed_interval_endpoints_fail() {
        let msg = eval_err("1..'a'");
        assert!(msg.contains("share a domain"), "got: {}", msg);
    }

    // ── mutation during iteration ────────────────────────────────────────

    #[test]
    fn test_rebinding_source_does_not_affect_cursor() {
        // `a + [9]` builds a fresh array; the cursor keeps walking the
        // one it was created over.
        assert_eq!(
            eval(
                "let a = [1, 2];
                 let n = 0;
                 for v in a {
                     n = n + 1;
                     if n == 2 { a = a + [9] }
                 };
                 n"
            ),
            "2"
        );
    }
}
