#[cfg(test)]
mod interpreter_tests {
    use mico::interpreter::Interpreter;
    use mico::value::Value;

    /// Run a program and render its final value.
    fn eval(source: &str) -> String {
        let mut interpreter = Interpreter::new();
        let value = interpreter
            .run(source.as_bytes())
            .unwrap_or_else(|e| panic!("program failed: {}", e));
        interpreter.render(&value)
    }

    /// Run a program expected to fail; returns the error message.
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

    // ── scoping ──────────────────────────────────────────────────────────

    #[test]
    fn test_lexical_scoping_and_shadowing() {
        assert_eq!(
            eval("let x = 1; let f = fn() { let x = 2; x }; f(); x"),
            "1"
        );
        assert_eq!(eval("let x = 1; if true { let x = 5; x } else { 0 }"), "5");
        assert_eq!(eval("let x = 1; if true { x = 5 } else { 0 }; x"), "5");
    }

    #[test]
    fn test_closure_captures_environment() {
        assert_eq!(
            eval(
                "let make = fn() { let n = 0; fn() { n = n + 1; n } };
                 let counter = make();
                 counter(); counter(); counter()"
            ),
            "3"
        );
    }

    #[test]
    fn test_undefined_variable_fails() {
        let msg = eval_err("nope");
        assert!(msg.contains("undefined variable nope"), "got: {}", msg);
    }

    // ── reference semantics ──────────────────────────────────────────────

    #[test]
    fn test_array_aliasing() {
        assert_eq!(eval("let a = [1, 2, 3]; let b = a; b[0] = 9; a[0]"), "9");
    }

    #[test]
    fn test_negative_index_counts_from_end() {
        assert_eq!(eval("let a = [1, 2, 3]; a[-1]"), "3");
        assert_eq!(eval("let a = [1, 2, 3]; a[-3]"), "1");
    }

    #[test]
    fn test_index_out_of_range_fails() {
        let msg = eval_err("let a = [1, 2]; a[5]");
        assert!(msg.contains("out of range"), "got: {}", msg);
    }

    #[test]
    fn test_deep_clone_detaches_storage() {
        assert_eq!(
            eval("let a = [1, 2]; let b = debug.clone(a); b[0] = 9; a[0]"),
            "1"
        );
        assert_eq!(eval("let a = [1, [2, 3]]; a == debug.clone(a)"), "true");
    }

    #[test]
    fn test_slice_writes_through_to_parent() {
        assert_eq!(
            eval("let a = [0, 1, 2, 3, 4]; let s = a[1..3]; s[0] = 9; a[1]"),
            "9"
        );
    }

    // ── calls, tail calls, partial application ───────────────────────────

    #[test]
    fn test_tail_recursion_is_stack_bounded() {
        assert_eq!(
            eval(
                "let count = fn(n, acc) {
                     if n == 0 { return acc };
                     return count(n - 1, acc + 1)
                 };
                 count(100000, 0)"
            ),
            "100000"
        );
    }

    #[test]
    fn test_non_tail_recursion_overflows_cleanly() {
        // 8 MiB mirrors the default main-thread stack; the depth guard
        // must trip before native recursion exhausts it.
        let handle = std::thread::Builder::new()
            .stack_size(8 * 1024 * 1024)
            .spawn(|| {
                eval_err(
                    "let f = fn(n) {
                         if n == 0 { return 0 };
                         return f(n - 1) + 1
                     };
                     f(100000)",
                )
            })
            .unwrap();

        let msg = handle.join().unwrap();
        assert!(msg.contains("Stack overflow"), "got: {}", msg);
    }

    #[test]
    fn test_partial_application() {
        assert_eq!(eval("let add = fn(a, b) { a + b }; add(1)(2)"), "3");
        assert_eq!(
            eval("let add3 = fn(a, b, c) { a + b + c }; add3(1)(2)(3)"),
            "6"
        );
        // Zero-argument call of an unsaturated function is a no-op partial.
        assert_eq!(eval("let add = fn(a, b) { a + b }; add()(1, 2)"), "3");
    }

    #[test]
    fn test_ellipsis_collects_surplus() {
        assert_eq!(
            eval("let f = fn(a, ...rest) { string.len(rest) }; f(1, 2, 3, 4)"),
            "3"
        );
        assert_eq!(eval("let f = fn(...all) { all }; f(1, 2)"), "[1, 2]");
    }

    #[test]
    fn test_spread_arguments() {
        assert_eq!(
            eval("let add = fn(a, b) { a + b }; let args = [1, 2]; add(...args)"),
            "3"
        );
    }

    #[test]
    fn test_too_many_arguments_fail() {
        let msg = eval_err("let f = fn(a) { a }; f(1, 2)");
        assert!(msg.contains("expected 1 arguments"), "got: {}", msg);
    }

    #[test]
    fn test_pipe_calls_right_operand() {
        assert_eq!(eval("5 | fn(x) { x * 2 }"), "10");
        assert_eq!(eval("let double = fn(x) { x * 2 }; 3 | double | double"), "12");
    }

    // ── operators and promotion ──────────────────────────────────────────

    #[test]
    fn test_numeric_promotion() {
        assert_eq!(eval("1 + 2.5"), "3.5");
        assert_eq!(eval("true + 1"), "2");
        assert_eq!(eval("1 == 1.0"), "true"); // the operator promotes; table keys do not
        assert_eq!(eval("2 < 2.5"), "true");
    }

    #[test]
    fn test_division_and_modulo_by_zero_fail() {
        assert!(eval_err("5 / 0").contains("division by zero"));
        assert!(eval_err("5 % 0").contains("modulo by zero"));
    }

    #[test]
    fn test_string_operators() {
        assert_eq!(eval("\"ab\" + \"cd\""), "abcd");
        assert_eq!(eval("\"ab\" + 'c'"), "abc");
        assert_eq!(eval("\"ab\" * 3"), "ababab");
        assert_eq!(eval("\"abc\"[1]"), "b");
        assert_eq!(eval("\"apple\" < \"banana\""), "true");
    }

    #[test]
    fn test_char_arithmetic() {
        assert_eq!(eval("'a' + 1"), "b");
        assert_eq!(eval("'d' - 'a'"), "3");
    }

    #[test]
    fn test_short_circuit() {
        // The right side must not evaluate when the left decides.
        assert_eq!(eval("false && nope"), "false");
        assert_eq!(eval("true || nope"), "true");
    }

    #[test]
    fn test_undefined_operator_fails() {
        let msg = eval_err("[1] - [2]");
        assert!(msg.contains("operator - not defined"), "got: {}", msg);
    }

    // ── tables ───────────────────────────────────────────────────────────

    #[test]
    fn test_table_keys_are_tag_strict() {
        assert_eq!(eval("let t = {1: \"int\"}; t[1]"), "int");
        assert_eq!(eval("let t = {1: \"int\"}; t[1.0]"), "null");
    }

    #[test]
    fn test_table_structural_keys_round_trip() {
        assert_eq!(
            eval("let t = {}; let k = [1, 2]; t[k] = \"v\"; t[debug.clone(k)]"),
            "v"
        );
    }

    #[test]
    fn test_table_key_zero_hashes_ignoring_sign() {
        // 0.0 == -0.0, so both spellings must find the same bucket.
        assert_eq!(eval("let t = {}; t[0.0] = 1; t[-0.0]"), "1");
        assert_eq!(eval("0.0 == -0.0"), "true");
    }

    #[test]
    fn test_table_auto_insert_on_assignment() {
        assert_eq!(eval("let t = {}; t[\"a\"] = 1; t[\"a\"]"), "1");
        assert_eq!(eval("let t = {}; t.name = \"mico\"; t.name"), "mico");
    }

    #[test]
    fn test_table_equality_ignores_insertion_order() {
        assert_eq!(eval("{\"a\": 1, \"b\": 2} == {\"b\": 2, \"a\": 1}"), "true");
    }

    // ── control flow ─────────────────────────────────────────────────────

    #[test]
    fn test_if_is_an_expression() {
        assert_eq!(eval("if 1 < 2 { \"yes\" } else { \"no\" }"), "yes");
        assert_eq!(eval("if false { 1 } elif true { 2 } else { 3 }"), "2");
        assert_eq!(eval("if false { 1 }"), "null");
    }

    #[test]
    fn test_break_propagates_through_nested_if() {
        assert_eq!(
            eval(
                "let total = 0;
                 for v in 0..10 {
                     if v == 3 { break };
                     total = total + v
                 };
                 total"
            ),
            "3"
        );
    }

    #[test]
    fn test_continue_skips_iteration() {
        assert_eq!(
            eval(
                "let total = 0;
                 for v in 0..5 {
                     if v % 2 == 0 { continue };
                     total = total + v
                 };
                 total"
            ),
            "4"
        );
    }

    #[test]
    fn test_loop_value_is_the_source() {
        assert_eq!(eval("for v in 0..3 { v }"), "0..3");
        assert_eq!(eval("for v in 0..10 { break }"), "0..10");
    }

    #[test]
    fn test_break_outside_loop_fails() {
        let msg = eval_err("break");
        assert!(msg.contains("break outside of a loop"), "got: {}", msg);
    }

    // ── modules ──────────────────────────────────────────────────────────

    #[test]
    fn test_module_member_access() {
        assert_eq!(eval("module math { let pi = 3.14 }; math.pi"), "3.14");
        assert_eq!(
            eval("module math { let sq = fn(x) { x * x } }; math.sq(4)"),
            "16"
        );
    }

    #[test]
    fn test_module_members_are_read_only() {
        let msg = eval_err("module math { let pi = 3.14 }; math.pi = 1");
        assert!(msg.contains("read-only"), "got: {}", msg);
    }

    #[test]
    fn test_module_binding_is_constant() {
        let msg = eval_err("module math { let pi = 3.14 }; math = 5");
        assert!(msg.contains("constant"), "got: {}", msg);
    }

    #[test]
    fn test_redefining_constant_rebinds_to_fresh_cell() {
        // `let` over a constant name creates a new variable binding; it
        // does not rewrite the constant cell in place.
        assert_eq!(eval("module m { let a = 1 }; let m = 5; m = 6; m"), "6");
        assert_eq!(
            eval("module m { let a = 1 }; let keep = m; let m = 5; keep.a"),
            "1"
        );
    }

    #[test]
    fn test_module_does_not_leak_outer_names() {
        let msg = eval_err("let secret = 1; module m { let x = 2 }; m.secret");
        assert!(msg.contains("no member secret"), "got: {}", msg);
    }

    // ── quote / unquote ──────────────────────────────────────────────────

    #[test]
    fn test_quote_defers_evaluation() {
        assert_eq!(eval("debug.type(quote(1 + 2))"), "quote");
        assert_eq!(eval("debug.eval(quote(1 + 2))"), "3");
    }

    #[test]
    fn test_unquote_splices_values() {
        assert_eq!(
            eval("let x = 5; debug.eval(quote(unquote(x) + 1))"),
            "6"
        );
        assert_eq!(
            eval("let inner = quote(2 * 3); debug.eval(quote(unquote(inner) + 1))"),
            "7"
        );
    }

    #[test]
    fn test_unquote_of_plain_value_is_identity() {
        assert_eq!(eval("unquote(42)"), "42");
    }

    // ── builtins ─────────────────────────────────────────────────────────

    #[test]
    fn test_string_module() {
        assert_eq!(eval("string.len(\"hello\")"), "5");
        assert_eq!(eval("string.upper(\"abc\")"), "ABC");
        assert_eq!(eval("string.trim(\"  x  \")"), "x");
        assert_eq!(eval("string.split(\"a,b,c\", \",\")"), "[\"a\", \"b\", \"c\"]");
        assert_eq!(eval("string.int(\"42\") + 1"), "43");
        assert_eq!(eval("string.str(3.5)"), "3.5");
    }

    #[test]
    fn test_gc_collect_keeps_live_values() {
        assert_eq!(
            eval(
                "let keep = [1, 2, 3];
                 let make = fn() { [9, 9, 9]; null };
                 for i in 0..100 { make() };
                 gc.collect();
                 keep[2]"
            ),
            "3"
        );
    }

    #[test]
    fn test_gc_keeps_indexed_object_alive_during_index_eval() {
        // `churn` allocates enough to cross the collection threshold
        // while the outer array is held only in the evaluator.
        assert_eq!(
            eval(
                "let id = fn(x) { x };
                 let churn = fn(n) { for i in 0..n { id([1, 2, 3]) }; 0 };
                 [7, 8, 9][churn(9000)]"
            ),
            "7"
        );
    }

    #[test]
    fn test_gc_keeps_earlier_arguments_alive() {
        assert_eq!(
            eval(
                "let churn = fn(n) { for i in 0..n { [i] }; 2 };
                 let arr = [[1], churn(9000)];
                 arr[0][0] + arr[1]"
            ),
            "3"
        );
    }

    #[test]
    fn test_gc_keeps_table_literal_alive_during_construction() {
        assert_eq!(
            eval(
                "let churn = fn(n) { for i in 0..n { [i] }; 2 };
                 let t = {\"a\": 1, \"b\": churn(9000)};
                 t.a + t.b"
            ),
            "3"
        );
    }

    #[test]
    fn test_gc_stats_reports_a_table() {
        assert_eq!(eval("debug.type(gc.stats())"), "table");
    }

    #[test]
    fn test_builtin_arity_mismatch_fails() {
        let msg = eval_err("string.len(1, 2)");
        assert!(msg.contains("expects 1 arguments"), "got: {}", msg);
    }

    // ── programs end to end ──────────────────────────────────────────────

    #[test]
    fn test_final_int_value() {
        let mut interpreter = Interpreter::new();
        let value = interpreter.run(b"let x = 40; x + 2").unwrap();
        assert!(matches!(value, Value::Int(42)));
    }

    #[test]
    fn test_parse_error_surfaces_with_position() {
        let mut interpreter = Interpreter::new();
        let err = interpreter.run(b"let = 3").unwrap_err();
        assert!(err.to_string().contains("Error"), "got: {}", err);
    }

    #[test]
    fn test_constant_folding_preserves_behavior() {
        // Foldable and non-foldable mixes must agree.
        assert_eq!(eval("1 + 2 * 3"), "7");
        assert_eq!(eval("let x = 2; 1 + 2 * x"), "5");
        assert_eq!(eval("\"a\" + \"b\" + \"c\""), "abc");
        // A folded failure must still fail at runtime, not at parse time.
        assert!(eval_err("let f = fn() { 1 / 0 }; f()").contains("division by zero"));
    }
}
