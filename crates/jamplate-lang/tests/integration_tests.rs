use jamplate_lang::{Document, Engine};
use rstest::{fixture, rstest};

#[fixture]
fn engine() -> Engine {
    Engine::new()
}

#[rstest]
#[case::precedence("1 + 2 * (3 + 5)", "17")]
#[case::negation_and_concat("!!!false + !!!true", "truefalse")]
#[case::more_than("5>3", "true")]
#[case::more_than_false("3>5", "false")]
#[case::more_than_equal_operands("3>3", "false")]
#[case::less_than("3<5", "true")]
#[case::less_or_equal("3<=3", "true")]
#[case::more_or_equal("2>=3", "false")]
#[case::equality("4==4", "true")]
#[case::inequality("4!=4", "false")]
#[case::logic("true && false || true", "true")]
#[case::subtraction("10 - 4", "6")]
#[case::subtraction_chain("10 - 3 - 2", "5")]
#[case::division("9 / 2", "4.5")]
#[case::division_chain("20 / 4 / 5", "1")]
#[case::modulo("9 % 2", "1")]
#[case::modulo_chain("10 % 7 % 2", "1")]
#[case::mixed_additive_chain("10 - 3 + 2", "9")]
#[case::mixed_multiplicative_chain("12 / 3 % 4", "0")]
#[case::multiplication_chain("2 * 3 * 4", "24")]
#[case::unary_minus("-3 + 10", "7")]
#[case::hex_literal("0x10 + 1", "17")]
#[case::binary_literal("0b101", "5")]
#[case::octal_literal("010", "8")]
#[case::float_format("1.5 + 1.5", "3")]
fn test_expressions(#[case] input: &str, #[case] expected: &str, mut engine: Engine) {
    assert_eq!(engine.render("test.jp", input).unwrap(), expected);
}

#[rstest]
#[case::plain_text("hello world", "hello world")]
#[case::unknown_names_pass_through("x=y", "x=y")]
#[case::line_comment("a//gone\nb", "a\nb")]
#[case::block_comment("a/* gone */b", "ab")]
#[case::escaped_newline("a\\\nb", "ab")]
#[case::literal_braces_outside_parameters("a {b} c", "a {b} c")]
fn test_text_passthrough(#[case] input: &str, #[case] expected: &str, mut engine: Engine) {
    assert_eq!(engine.render("test.jp", input).unwrap(), expected);
}

#[rstest]
fn test_for_loop(mut engine: Engine) {
    let output = engine
        .render("test.jp", "#for X [1,2,3]\nx=#{X}#\n#endfor")
        .unwrap();
    assert_eq!(output, "x=1\nx=2\nx=3\n");
}

#[rstest]
fn test_declare_and_member_access(mut engine: Engine) {
    let output = engine
        .render("test.jp", "#declare A {k:'v'}\n#{A.k}#")
        .unwrap();
    assert_eq!(output, "v");
}

#[rstest]
fn test_capture(mut engine: Engine) {
    let output = engine
        .render("test.jp", "#capture X\nhello\n#endcapture\n#{X}#")
        .unwrap();
    assert_eq!(output, "hello\n");
}

#[rstest]
fn test_if_branches(mut engine: Engine) {
    let template = "#if N > 2\nbig\n#elif N > 0\nsmall\n#else\nnone\n#endif";
    let cases = [("3", "big\n"), ("1", "small\n"), ("0", "none\n")];
    for (value, expected) in cases {
        let mut engine = Engine::new();
        let input = format!("#declare N {value}\n{template}");
        assert_eq!(engine.render("test.jp", input).unwrap(), expected);
    }
    // an #if with no #elif/#else takes or skips its whole body
    assert_eq!(
        engine.render("plain.jp", "#if 5>3\nyes\n#endif").unwrap(),
        "yes\n"
    );
}

#[rstest]
fn test_while_loop(mut engine: Engine) {
    let output = engine
        .render(
            "test.jp",
            "#declare N 3\n#while N > 0\nx\n#declare N N - 1\n#endwhile",
        )
        .unwrap();
    assert_eq!(output, "x\nx\nx\n");
}

#[rstest]
fn test_nested_for_loops(mut engine: Engine) {
    let output = engine
        .render(
            "test.jp",
            "#for A [1,2]\n#for B [x,y]\n#{A}##{B}#\n#endfor\n#endfor",
        )
        .unwrap();
    assert_eq!(output, "1x\n1y\n2x\n2y\n");
}

#[rstest]
fn test_declare_overwrites(mut engine: Engine) {
    let output = engine
        .render("test.jp", "#declare A 1\n#declare A 2\n#{A}#")
        .unwrap();
    assert_eq!(output, "2");
}

#[rstest]
fn test_dotted_declare_touches_members(mut engine: Engine) {
    let output = engine
        .render("test.jp", "#declare A {k:'v'}\n#declare A.k 'w'\n#{A.k}#")
        .unwrap();
    assert_eq!(output, "w");
}

#[rstest]
fn test_define_keeps_raw_text(mut engine: Engine) {
    let output = engine
        .render("test.jp", "#define A 1 + 2\n#{A}#")
        .unwrap();
    // the value is glued text, so injection evaluates it when expanded
    assert_eq!(output, "3");
}

#[rstest]
fn test_array_indexing(mut engine: Engine) {
    let output = engine
        .render("test.jp", "#declare A ['a','b','c']\n#{A[1]}#")
        .unwrap();
    assert_eq!(output, "b");
}

#[rstest]
fn test_member_chain_selects_from_the_left(mut engine: Engine) {
    let output = engine
        .render(
            "test.jp",
            "#declare A {b:{c:'deep'}}\n#{A.b.c}#",
        )
        .unwrap();
    assert_eq!(output, "deep");
}

#[rstest]
fn test_spread_allocates_entries(mut engine: Engine) {
    let output = engine
        .render("test.jp", "#spread {a:'1',b:'2'}\n#{a}##{b}#")
        .unwrap();
    assert_eq!(output, "12");
}

#[rstest]
fn test_make_builds_an_object(mut engine: Engine) {
    let output = engine
        .render("test.jp", "#make M {k:'v'}\n#{M.k}#")
        .unwrap();
    assert_eq!(output, "v");
}

#[rstest]
fn test_message_prints(mut engine: Engine) {
    let output = engine.render("test.jp", "#message hi\ndone").unwrap();
    assert_eq!(output, "hidone");
}

#[rstest]
fn test_error_records_a_diagnostic(mut engine: Engine) {
    let output = engine.render("test.jp", "#error 'boom'\nok").unwrap();
    assert_eq!(output, "ok");
    assert!(engine.diagnostics().contains("boom"));
}

#[rstest]
fn test_include_executes_another_document(mut engine: Engine) {
    engine.load(Document::pseudo("lib.jp", "from lib\n"));
    engine
        .process(Document::pseudo("lib.jp", "from lib\n"))
        .unwrap();
    let output = engine
        .render("main.jp", "start\n#include 'lib.jp'\nend")
        .unwrap();
    assert_eq!(output, "start\nfrom lib\nend");
}

#[rstest]
fn test_include_of_an_unknown_document_fails(mut engine: Engine) {
    let result = engine.render("main.jp", "#include 'missing.jp'\n");
    assert!(result.is_err());
}

#[rstest]
fn test_builtin_addresses(mut engine: Engine) {
    let output = engine
        .render("dir/test.jp", "#{__FILE__}#:#{__LINE__}#")
        .unwrap();
    assert_eq!(output, "test.jp:1");
}

#[rstest]
fn test_line_tracking(mut engine: Engine) {
    let output = engine.render("test.jp", "a\nb\n#{__LINE__}#").unwrap();
    assert_eq!(output, "a\nb\n3");
}

#[rstest]
fn test_unknown_command_fails_to_compile(mut engine: Engine) {
    let result = engine.render("test.jp", "#nonsense x\n");
    assert!(result.is_err());
    assert!(engine.diagnostics().contains("unknown command"));
}

#[rstest]
fn test_unbalanced_flow_fails_to_compile(mut engine: Engine) {
    let result = engine.render("test.jp", "#endfor\n");
    assert!(result.is_err());
}

#[rstest]
fn test_string_literals_keep_their_quotes_in_text(mut engine: Engine) {
    assert_eq!(engine.render("test.jp", "say 'hi'").unwrap(), "say 'hi'");
}

#[rstest]
fn test_injection_unquotes_strings(mut engine: Engine) {
    assert_eq!(engine.render("test.jp", "#{'hi'}#").unwrap(), "hi");
}

#[rstest]
fn test_string_concatenation(mut engine: Engine) {
    assert_eq!(engine.render("test.jp", "#{'a' + 'b'}#").unwrap(), "ab");
}

#[rstest]
fn test_object_renders_whole(mut engine: Engine) {
    let output = engine
        .render("test.jp", "#declare A {k:'v'}\n#{A}#")
        .unwrap();
    assert_eq!(output, "{k:'v'}");
}
