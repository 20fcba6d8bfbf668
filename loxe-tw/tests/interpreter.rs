//! End-to-end tests driving scan → parse → resolve → interpret and checking
//! the resulting global environment.

use loxe_lib::{
    object::LoxObject, parser::Parser, scanner::Scanner, span::Span, span::WithSpan, Interpreter,
};
use loxe_tw::TwInterpreter;

/// Run the given code in a fresh interpreter.
fn run(code: &str) -> TwInterpreter {
    let mut interpreter = TwInterpreter::new();
    interpreter.interpret(&Parser::parse(Scanner::scan_tokens(code)));
    interpreter
}

/// Get a global variable from the interpreter, if it is defined.
fn global(interpreter: &TwInterpreter, name: &str) -> Option<LoxObject> {
    interpreter
        .get_current_env()
        .borrow()
        .get(&WithSpan::new(Span { start: 0, end: 0 }, name.to_string()))
        .ok()
}

/// Assert that a global holds the given number.
fn assert_number(interpreter: &TwInterpreter, name: &str, expected: f64) {
    assert_eq!(
        global(interpreter, name),
        Some(LoxObject::Number(expected)),
        "global '{name}'"
    );
}

/// Assert that a global holds the given string.
fn assert_string(interpreter: &TwInterpreter, name: &str, expected: &str) {
    assert_eq!(
        global(interpreter, name),
        Some(LoxObject::String(expected.to_string())),
        "global '{name}'"
    );
}

/// Assert that a global holds the given boolean.
fn assert_boolean(interpreter: &TwInterpreter, name: &str, expected: bool) {
    assert_eq!(
        global(interpreter, name),
        Some(LoxObject::Boolean(expected)),
        "global '{name}'"
    );
}

#[test]
fn arithmetic_and_precedence() {
    let interpreter = run("var r = 1 + 2 * 3; var s = (1 + 2) * 3; var n = -4 + 1;");
    assert_number(&interpreter, "r", 7.0);
    assert_number(&interpreter, "s", 9.0);
    assert_number(&interpreter, "n", -3.0);
}

#[test]
fn plus_concatenates_with_either_string_operand() {
    let interpreter = run(
        "var a = \"a\" + 1; var b = 1 + \"a\"; var c = 1 + 2; var d = \"x\" + true; var e = \"n\" + nil;",
    );
    assert_string(&interpreter, "a", "a1");
    assert_string(&interpreter, "b", "1a");
    assert_number(&interpreter, "c", 3.0);
    assert_string(&interpreter, "d", "xtrue");
    assert_string(&interpreter, "e", "nnil");
}

#[test]
fn uninitialized_variable_is_nil() {
    let interpreter = run("var a;");
    assert_eq!(global(&interpreter, "a"), Some(LoxObject::Nil));
}

#[test]
fn division_by_zero_follows_ieee754() {
    let interpreter = run("var inf = 1 / 0; var neg = -1 / 0; var nan = 0 / 0;");
    assert_eq!(
        global(&interpreter, "inf"),
        Some(LoxObject::Number(f64::INFINITY))
    );
    assert_eq!(
        global(&interpreter, "neg"),
        Some(LoxObject::Number(f64::NEG_INFINITY))
    );
    let Some(LoxObject::Number(nan)) = global(&interpreter, "nan") else {
        panic!("nan should be a number");
    };
    assert!(nan.is_nan());
}

#[test]
fn truthiness_and_short_circuit() {
    let interpreter = run(concat!(
        "var called = false;\n",
        "fun side() { called = true; return true; }\n",
        "var a = false and side();\n",
        "var b = \"lhs\" or side();\n",
        "var c = nil or \"rhs\";\n",
        "var zero_is_truthy = 0 and true;\n",
    ));
    assert_boolean(&interpreter, "called", false);
    assert_boolean(&interpreter, "a", false);
    assert_string(&interpreter, "b", "lhs");
    assert_string(&interpreter, "c", "rhs");
    assert_boolean(&interpreter, "zero_is_truthy", true);
}

#[test]
fn closures_capture_by_reference() {
    let interpreter = run(concat!(
        "fun makeCounter() { var i = 0; fun c() { i += 1; return i; } return c; }\n",
        "var c = makeCounter();\n",
        "var r1 = c(); var r2 = c(); var r3 = c();\n",
    ));
    assert_number(&interpreter, "r1", 1.0);
    assert_number(&interpreter, "r2", 2.0);
    assert_number(&interpreter, "r3", 3.0);
}

#[test]
fn closures_bind_lexically_not_dynamically() {
    let interpreter = run(concat!(
        "var a = \"global\";\n",
        "var r1; var r2;\n",
        "{\n",
        "  fun show() { return a; }\n",
        "  r1 = show();\n",
        "  var a = \"block\";\n",
        "  r2 = show();\n",
        "}\n",
    ));
    assert_string(&interpreter, "r1", "global");
    assert_string(&interpreter, "r2", "global");
}

#[test]
fn anonymous_functions() {
    let interpreter = run("var f = fun (x) { return x * 2; }; var r = f(21);");
    assert_number(&interpreter, "r", 42.0);
}

#[test]
fn augmented_assignment() {
    let interpreter = run(concat!(
        "var x = 10;\n",
        "x += 5; var a = x;\n",
        "x -= 3; var b = x;\n",
        "x *= 2; var c = x;\n",
        "x /= 4; var d = x;\n",
        "var s = \"ab\"; s += \"c\";\n",
    ));
    assert_number(&interpreter, "a", 15.0);
    assert_number(&interpreter, "b", 12.0);
    assert_number(&interpreter, "c", 24.0);
    assert_number(&interpreter, "d", 6.0);
    assert_string(&interpreter, "s", "abc");
}

#[test]
fn instance_fields_and_methods() {
    let interpreter = run(concat!(
        "class Counter {\n",
        "  init(start) { this.count = start; }\n",
        "  bump() { this.count += 1; return this.count; }\n",
        "}\n",
        "var c = Counter(10);\n",
        "var r1 = c.bump();\n",
        "var r2 = c.bump();\n",
        "var count = c.count;\n",
        "c.extra = \"field\";\n",
        "var extra = c.extra;\n",
    ));
    assert_number(&interpreter, "r1", 11.0);
    assert_number(&interpreter, "r2", 12.0);
    assert_number(&interpreter, "count", 12.0);
    assert_string(&interpreter, "extra", "field");
}

#[test]
fn inheritance_and_super() {
    let interpreter = run(concat!(
        "class A { greet() { return \"hi from A\"; } }\n",
        "class B < A { greet() { return super.greet() + \" and B\"; } }\n",
        "var g = B().greet();\n",
    ));
    assert_string(&interpreter, "g", "hi from A and B");
}

#[test]
fn methods_bind_their_receiver() {
    let interpreter = run(concat!(
        "class Greeter { init(name) { this.name = name; } greet() { return this.name; } }\n",
        "var m = Greeter(\"bound\").greet;\n",
        "var r = m();\n",
    ));
    assert_string(&interpreter, "r", "bound");
}

#[test]
fn static_methods_and_inheritance() {
    let interpreter = run(concat!(
        "class A { class m() { return \"A.m\"; } }\n",
        "class B < A {}\n",
        "var r = B.m();\n",
        "var direct = A.m();\n",
    ));
    assert_string(&interpreter, "r", "A.m");
    assert_string(&interpreter, "direct", "A.m");
}

#[test]
fn static_fields_use_instance_machinery() {
    let interpreter = run(concat!(
        "class C { class next() { C.counter += 1; return C.counter; } }\n",
        "C.counter = 0;\n",
        "var r1 = C.next();\n",
        "var r2 = C.next();\n",
    ));
    assert_number(&interpreter, "r1", 1.0);
    assert_number(&interpreter, "r2", 2.0);
}

#[test]
fn static_super_reaches_the_parent_metaclass() {
    let interpreter = run(concat!(
        "class A { class m() { return \"A\"; } }\n",
        "class B < A { class m() { return super.m() + \"B\"; } }\n",
        "var r = B.m();\n",
    ));
    assert_string(&interpreter, "r", "AB");
}

#[test]
fn this_in_static_methods_is_the_class() {
    let interpreter = run(concat!(
        "class C { class make() { return this(); } init() { this.ok = true; } }\n",
        "var instance = C.make();\n",
        "var ok = instance.ok;\n",
    ));
    assert_boolean(&interpreter, "ok", true);
}

#[test]
fn initializer_returns_the_instance() {
    let interpreter = run(concat!(
        "class C { init() { this.v = 1; } }\n",
        "var c = C();\n",
        "var again = c.init();\n",
        "var same = c == again;\n",
        "var v = c.v;\n",
    ));
    assert_boolean(&interpreter, "same", true);
    assert_number(&interpreter, "v", 1.0);
}

#[test]
fn equality_is_identity_for_objects() {
    let interpreter = run(concat!(
        "class C {}\n",
        "var a = C(); var b = a; var c = C();\n",
        "var same = a == b;\n",
        "var diff = a == c;\n",
        "fun f() {}\n",
        "var g = f;\n",
        "var fn_same = f == g;\n",
        "var class_same = C == C;\n",
    ));
    assert_boolean(&interpreter, "same", true);
    assert_boolean(&interpreter, "diff", false);
    assert_boolean(&interpreter, "fn_same", true);
    assert_boolean(&interpreter, "class_same", true);
}

#[test]
fn array_literals_and_indexing() {
    let interpreter = run(concat!(
        "var a = [10, 20, 30];\n",
        "var first = a[0];\n",
        "a[1] = 25;\n",
        "var second = a.get(1);\n",
        "a.set(2, 35);\n",
        "var third = a[2];\n",
        "var len = a.length();\n",
    ));
    assert_number(&interpreter, "first", 10.0);
    assert_number(&interpreter, "second", 25.0);
    assert_number(&interpreter, "third", 35.0);
    assert_number(&interpreter, "len", 3.0);
}

#[test]
fn array_constructor_fill_and_foreach() {
    let interpreter = run(concat!(
        "var a = Array(3);\n",
        "var empty = a[0];\n",
        "a.fill(7);\n",
        "var filled = a[2];\n",
        "var sum = 0;\n",
        "[10, 20, 30].foreach(fun (v, i) { sum += v + i; });\n",
    ));
    assert_eq!(global(&interpreter, "empty"), Some(LoxObject::Nil));
    assert_number(&interpreter, "filled", 7.0);
    assert_number(&interpreter, "sum", 63.0);
}

#[test]
fn arrays_stringify_their_elements() {
    let interpreter = run("var s = string([1, \"two\", nil]);");
    assert_string(&interpreter, "s", "[1, two, nil]");
}

#[test]
fn to_string_drives_stringification() {
    let interpreter = run(concat!(
        "class P {\n",
        "  init(name) { this.name = name; }\n",
        "  toString() { return \"P(\" + this.name + \")\"; }\n",
        "}\n",
        "var s = string(P(\"x\"));\n",
        "var concatenated = \"v=\" + P(\"y\");\n",
        "var plain = string(1.5);\n",
        "var integral = string(3);\n",
    ));
    assert_string(&interpreter, "s", "P(x)");
    assert_string(&interpreter, "concatenated", "v=P(y)");
    assert_string(&interpreter, "plain", "1.5");
    assert_string(&interpreter, "integral", "3");
}

#[test]
fn string_builtins_use_utf16_code_units() {
    let interpreter = run(concat!(
        "var s = \"abc\";\n",
        "var n = String.length(s) + String.charCodeAt(s, 1);\n",
        "var ch = String.charAt(s, 2);\n",
    ));
    assert_number(&interpreter, "n", 101.0);
    assert_string(&interpreter, "ch", "c");
}

#[test]
fn math_builtins() {
    let interpreter = run(concat!(
        "var m = Math.mod(7, 3);\n",
        "var r = Math.round(3.14159, 2);\n",
        "var whole = Math.round(2.5, 0);\n",
    ));
    assert_number(&interpreter, "m", 1.0);
    assert_number(&interpreter, "r", 3.14);
    assert_number(&interpreter, "whole", 3.0);
}

#[test]
fn conversion_and_introspection_builtins() {
    let interpreter = run(concat!(
        "var n = number(\"3.5\");\n",
        "var bad = number(\"xyz\");\n",
        "var t1 = typeOf(nil); var t2 = typeOf(1); var t3 = typeOf(\"s\");\n",
        "class C { m() {} }\n",
        "var c = C();\n",
        "var t4 = typeOf(C); var t5 = typeOf(c); var t6 = typeOf(c.m);\n",
        "var is_class = is(c, C);\n",
        "var is_code = is(1, \"number\");\n",
        "var is_not = is(1, \"string\");\n",
    ));
    assert_number(&interpreter, "n", 3.5);
    assert_eq!(global(&interpreter, "bad"), Some(LoxObject::Nil));
    assert_string(&interpreter, "t1", "nil");
    assert_string(&interpreter, "t2", "number");
    assert_string(&interpreter, "t3", "string");
    assert_string(&interpreter, "t4", "class");
    assert_string(&interpreter, "t5", "instance");
    assert_string(&interpreter, "t6", "function");
    assert_boolean(&interpreter, "is_class", true);
    assert_boolean(&interpreter, "is_code", true);
    assert_boolean(&interpreter, "is_not", false);
}

#[test]
fn is_walks_the_superclass_chain() {
    let interpreter = run(concat!(
        "class A {}\n",
        "class B < A {}\n",
        "var b = B();\n",
        "var is_b = is(b, B); var is_a = is(b, A);\n",
        "var a = A();\n",
        "var a_is_b = is(a, B);\n",
    ));
    assert_boolean(&interpreter, "is_b", true);
    assert_boolean(&interpreter, "is_a", true);
    assert_boolean(&interpreter, "a_is_b", false);
}

#[test]
fn field_and_method_introspection() {
    let interpreter = run(concat!(
        "class C { m() {} n() {} }\n",
        "var c = C();\n",
        "c.f = 1;\n",
        "var hf = hasField(c, \"f\"); var no_hf = hasField(c, \"g\");\n",
        "var hm = hasMethod(c, \"m\"); var no_hm = hasMethod(c, \"q\");\n",
        "var fs = fields(c);\n",
        "var first_field = fs.get(0);\n",
        "var ms = methods(c);\n",
        "var method_count = ms.length();\n",
        "var first_method = ms.get(0);\n",
    ));
    assert_boolean(&interpreter, "hf", true);
    assert_boolean(&interpreter, "no_hf", false);
    assert_boolean(&interpreter, "hm", true);
    assert_boolean(&interpreter, "no_hm", false);
    assert_string(&interpreter, "first_field", "f");
    assert_number(&interpreter, "method_count", 2.0);
    assert_string(&interpreter, "first_method", "m");
}

#[test]
fn control_flow() {
    let interpreter = run(concat!(
        "var total = 0;\n",
        "for (var i = 1; i <= 4; i += 1) { total += i; }\n",
        "var branch;\n",
        "if (total > 5) branch = \"big\"; else branch = \"small\";\n",
        "var countdown = 3;\n",
        "while (countdown > 0) countdown -= 1;\n",
    ));
    assert_number(&interpreter, "total", 10.0);
    assert_string(&interpreter, "branch", "big");
    assert_number(&interpreter, "countdown", 0.0);
}

#[test]
fn runtime_error_aborts_execution() {
    let interpreter = run("var a = 1; var b = true + 1; var c = 2;");
    assert_number(&interpreter, "a", 1.0);
    assert_eq!(global(&interpreter, "b"), None);
    assert_eq!(global(&interpreter, "c"), None);
}

#[test]
fn out_of_bounds_array_access_is_an_error() {
    let interpreter = run("var a = [1]; var before = 1; var oob = a[1]; var after = 2;");
    assert_number(&interpreter, "before", 1.0);
    assert_eq!(global(&interpreter, "oob"), None);
    assert_eq!(global(&interpreter, "after"), None);
}

#[test]
fn resolve_error_skips_execution_entirely() {
    let interpreter = run("var a = 1; return 2;");
    // The resolver rejects the program before anything runs.
    assert_eq!(global(&interpreter, "a"), None);
}

#[test]
fn environment_chain_is_balanced_after_evaluation() {
    let interpreter = run("{ var a = 1; { var b = 2; } } fun f() { return 1; } f();");
    // After interpretation the current environment is the global root again.
    assert!(interpreter
        .get_current_env()
        .borrow()
        .enclosing
        .is_none());
}

#[test]
fn repeated_runs_are_deterministic() {
    let code = concat!(
        "class A { class m() { return \"A.m\"; } }\n",
        "class B < A {}\n",
        "var r = B.m() + string([1, 2]) + (1 / 0);\n",
    );
    let first = global(&run(code), "r");
    let second = global(&run(code), "r");
    assert_eq!(first, Some(LoxObject::String("A.m[1, 2]inf".to_string())));
    assert_eq!(first, second);
}
