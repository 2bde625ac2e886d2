use simplec::bytecode::{AssembleError, Bytecode, Constant, Opcode};
use simplec::codegen::CompileError;
use simplec::resolve::ResolveError;
use simplec::{Error, compile_source, stdlib};

fn compile_bare(source: &str) -> Bytecode {
    compile_source(source, &[]).unwrap().bytecode
}

fn main_code(source: &str) -> Vec<u8> {
    compile_bare(source).chunks[0].code.clone()
}

#[test]
fn test_global_declaration_bytes() {
    let bytes = compile_bare("var x = 1;").to_bytes().unwrap();
    assert_eq!(
        bytes,
        vec![
            0x02, // two constants
            0x00, 0x01, 0x00, 0x00, 0x00, // Int(1), little endian
            0x01, 0x01, 0x00, b'x', // String("x")
            0x04, 0x00, // code length
            0x00, 0x00, // Constant @0
            0x08, 0x01, // SetGlobal @1
        ]
    );
}

#[test]
fn test_or_skips_right_operand() {
    let code = main_code("fn explodes() { return 1; }\ntrue || explodes();");
    assert_eq!(
        code,
        vec![
            0x00, 0x00, // Constant <fn #1>
            0x08, 0x01, // SetGlobal "explodes"
            0x02, // True
            0x17, 0x02, // JumpForwardIfFalse -> 9
            0x16, 0x05, // JumpForward -> 14
            0x04, // Pop
            0x07, 0x01, // GetGlobal "explodes"
            0x19, 0x00, // Call 0
            0x04, // Pop
        ]
    );
    // a true left operand takes the unconditional jump past the call
    let call_at = code
        .iter()
        .position(|&b| b == Opcode::Call.byte())
        .unwrap();
    let jump_target = 9 + code[8] as usize;
    assert!(call_at < jump_target);
    assert_eq!(jump_target, code.len() - 1);
}

#[test]
fn test_and_pops_left_before_right() {
    let code = main_code("var a = false && true;");
    assert_eq!(
        code,
        vec![
            0x03, // False
            0x17, 0x02, // JumpForwardIfFalse -> 5
            0x04, // Pop
            0x02, // True
            0x08, 0x00, // SetGlobal "a"
        ]
    );
}

#[test]
fn test_builtin_function_chunk() {
    let compilation = compile_source("fact(5);", &stdlib::builtins()).unwrap();
    let chunks = &compilation.bytecode.chunks;
    assert_eq!(chunks.len(), 4);

    let fact = &chunks[1];
    assert_eq!(fact.name.as_deref(), Some("fact"));
    assert_eq!(fact.constants[0], Constant::String("fact".to_string()));
    assert_eq!(fact.constants[1], Constant::Int(1));

    let main = &chunks[0];
    assert_eq!(main.constants[0], Constant::Function(1));
    let bytes = compilation.bytecode.to_bytes().unwrap();
    assert_eq!(&bytes[1..3], &[0x02, 0x01]);
}

#[test]
fn test_user_function_declaration() {
    let source = "fn fact(n) {\n  if (n == 1) { return 1; }\n  return n * fact(n - 1);\n}";
    let bytecode = compile_bare(source);
    assert_eq!(bytecode.chunks.len(), 2);

    let fact = &bytecode.chunks[1];
    assert_eq!(fact.name.as_deref(), Some("fact"));
    assert_eq!(fact.constants[0], Constant::String("fact".to_string()));
    assert_eq!(fact.constants[1], Constant::Int(1));
    // fact(n - 1): GetGlobal "fact", GetLocal n, Constant 1, Subtract, Call 1
    let recursive_call = [0x07, 0x00, 0x05, 0x01, 0x00, 0x01, 0x10, 0x19, 0x01];
    assert!(fact.code.windows(recursive_call.len()).any(|w| w == recursive_call));

    let bytes = bytecode.to_bytes().unwrap();
    // main's first constant is the function reference to chunk #1
    assert_eq!(&bytes[..3], &[0x02, 0x02, 0x01]);
}

#[test]
fn test_deep_nesting_is_a_syntax_error() {
    let source = format!("var x = {}1{};", "(".repeat(10_000), ")".repeat(10_000));
    let err = compile_source(&source, &[]).unwrap_err();
    assert!(matches!(err, Error::Syntax(_)));
    assert!(err.to_string().contains("nested too deeply"));
}

#[test]
fn test_duplicate_declaration_fails() {
    let err = compile_source("var a = 1;\nvar a = 2;", &[]).unwrap_err();
    match err {
        Error::Resolve(ResolveError::Duplicate { name, span, .. }) => {
            assert_eq!(name, "a");
            assert_eq!(span.line, 2);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_use_before_declaration_fails() {
    let err = compile_source("explodes();\nfn explodes() { }", &[]).unwrap_err();
    assert!(matches!(
        err,
        Error::Resolve(ResolveError::Undeclared { ref name, .. }) if name == "explodes"
    ));
}

#[test]
fn test_syntax_errors_are_reported_together() {
    let err = compile_source("var = 1;\nvar y 2;", &[]).unwrap_err();
    match err {
        Error::Syntax(errors) => assert_eq!(errors.len(), 2),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_block_locals_are_popped() {
    assert_eq!(
        main_code("{ var a = 1; var b = 2; }"),
        vec![0x00, 0x00, 0x00, 0x01, 0x04, 0x04]
    );
}

#[test]
fn test_function_locals_live_in_slots() {
    let bytecode = compile_bare("fn f(a) { var b = a; return b; }");
    let f = &bytecode.chunks[1];
    assert_eq!(
        f.code,
        vec![
            0x05, 0x01, // GetLocal a
            0x05, 0x02, // GetLocal b
            0x1A, // Return
            0x01, 0x1A, // implicit return null
        ]
    );
}

#[test]
fn test_while_loop_jumps_land_on_labels() {
    let code = main_code("var i = 0; while (i < 3) { i = i + 1; }");
    assert_eq!(code[9], Opcode::JumpForwardIfFalse.byte());
    assert_eq!(code[19], Opcode::JumpBackward.byte());
    // backward jump returns to the condition at offset 4
    assert_eq!(21 - code[20] as usize, 4);
    // forward jump lands on the trailing pop
    assert_eq!(11 + code[10] as usize, 21);
    assert_eq!(code[21], Opcode::Pop.byte());
    assert_eq!(code.len(), 22);
}

#[test]
fn test_long_loop_body_is_rejected() {
    let body = "i = i + 1; ".repeat(20);
    let source = format!("var i = 0; while (i < 3) {{ {body}}}");
    let err = compile_source(&source, &[]).unwrap_err();
    assert!(matches!(
        err,
        Error::Compile(CompileError::Assemble(AssembleError::JumpOutOfRange { .. }))
    ));
}

#[test]
fn test_loop_jumps_stay_in_signed_range() {
    let body = "i = i + 1; ".repeat(15);
    let source = format!("var i = 0; while (i < 3) {{ {body}}}");
    let code = main_code(&source);
    let back_at = code.len() - 3;
    assert_eq!(code[back_at], Opcode::JumpBackward.byte());
    assert!((code[back_at + 1] as i8) > 0);
}

#[test]
fn test_binary_form_decodes() {
    let source = "var o = object();\no.count = 0;\nfn bump(x) { x.count = x.count + 1; return x; }\nprintln(fact(bump(o).count));";
    let bytecode = compile_source(source, &stdlib::builtins()).unwrap().bytecode;
    let decoded = Bytecode::decode(&bytecode.to_bytes().unwrap()).unwrap();

    assert_eq!(decoded.chunks.len(), bytecode.chunks.len());
    for (original, decoded) in bytecode.chunks.iter().zip(&decoded.chunks) {
        assert_eq!(decoded.name, None);
        assert_eq!(decoded.constants, original.constants);
        assert_eq!(decoded.code, original.code);
    }
}

#[test]
fn test_ir_keeps_chunk_names() {
    let bytecode = compile_source("fn f() { }", &stdlib::builtins())
        .unwrap()
        .bytecode;
    let restored = Bytecode::from_ir_bytes(&bytecode.to_ir_bytes().unwrap()).unwrap();
    assert_eq!(restored, bytecode);
    assert_eq!(restored.chunks[4].name.as_deref(), Some("f"));
}

#[test]
fn test_assembly_lists_every_chunk() {
    let assembly = compile_source("if (1 > 2) { println(1); } else { println(2); }", &stdlib::builtins())
        .unwrap()
        .assembly;
    let mut last = 0;
    for header in [
        "Chunk '<main>' #0",
        "Chunk 'fact' #1",
        "Chunk 'println' #2",
        "Chunk 'object' #3",
    ] {
        let at = assembly.find(header).unwrap();
        assert!(at >= last, "{header} out of order");
        last = at;
    }
    assert!(assembly.contains("after if"));
}

#[test]
fn test_assign_to_builtin_fails() {
    let err = compile_source("println = 1;", &stdlib::builtins()).unwrap_err();
    assert!(err.to_string().contains("cannot assign to 'println'"));
}
