use crate::bytecode::assemble_error::AssembleError;
use crate::bytecode::builder::BytecodeBuilder;
use crate::bytecode::chunk::{ChunkBuilder, Directive};
use crate::bytecode::constant::ConstantValue;
use crate::bytecode::op::Opcode;

/// Render the assembly listing of every chunk, in id order.
pub fn render(builder: &BytecodeBuilder) -> Result<String, AssembleError> {
    let mut out = String::new();
    for (i, chunk) in builder.ordered_chunks()?.into_iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        render_chunk(builder, chunk, &mut out)?;
    }
    Ok(out)
}

/// Render a single chunk
fn render_chunk(
    builder: &BytecodeBuilder,
    chunk: &ChunkBuilder,
    out: &mut String,
) -> Result<(), AssembleError> {
    let id = builder.chunk_id(chunk.self_ref())?;
    line(out, format!("Chunk '{}' #{}", chunk.display_name(), id));

    line(out, "----- Constants -----".to_string());
    for (index, constant) in chunk.constants().constants().iter().enumerate() {
        let text = constant_text(builder, constant)?;
        line(out, format!("@{}: {}", index, text));
    }

    line(out, "----- Code -----".to_string());
    let mut position = 0;
    for directive in chunk.directives() {
        render_labels(chunk, position, out);
        let text = directive_text(chunk, directive, position)?;
        line(out, format!("{:04}    {}", position, text));
        position += directive.byte_len();
    }
    // labels placed after the last instruction
    render_labels(chunk, position, out);
    Ok(())
}

fn render_labels(chunk: &ChunkBuilder, position: usize, out: &mut String) {
    for label in chunk.named_labels_at(position) {
        line(out, format!("{}:", chunk.label_name(label)));
    }
}

fn directive_text(
    chunk: &ChunkBuilder,
    directive: &Directive,
    position: usize,
) -> Result<String, AssembleError> {
    let instruction = chunk.resolve(directive)?;
    let text = match (*directive, instruction.argument) {
        (Directive::Jump { dest, .. } | Directive::JumpIfFalse { dest, .. }, Some(offset)) => {
            let after = position + directive.byte_len();
            let target = if instruction.opcode == Opcode::JumpBackward {
                after - offset as usize
            } else {
                after + offset as usize
            };
            format!(
                "{} {} -> {:04} ({})",
                instruction.opcode,
                offset,
                target,
                chunk.label_name(dest)
            )
        }
        (_, Some(index)) if instruction.opcode.takes_constant() => {
            match chunk.constants().get(index) {
                Some(ConstantValue::String(s)) => format!("{} @{} ({:?})", instruction.opcode, index, s),
                Some(ConstantValue::Int(n)) => format!("{} @{} ({})", instruction.opcode, index, n),
                _ => instruction.to_string(),
            }
        }
        _ => instruction.to_string(),
    };
    Ok(text)
}

fn constant_text(builder: &BytecodeBuilder, constant: &ConstantValue) -> Result<String, AssembleError> {
    Ok(match constant {
        ConstantValue::Int(n) => n.to_string(),
        ConstantValue::String(s) => format!("{:?}", s),
        ConstantValue::Function(chunk_ref) => {
            let id = builder.chunk_id(*chunk_ref)?;
            let name = builder
                .chunk(*chunk_ref)
                .map(|chunk| chunk.display_name().to_string())
                .unwrap_or_else(|| "?".to_string());
            format!("<fn '{}' #{}>", name, id)
        }
    })
}

fn line(out: &mut String, text: String) {
    out.push_str(&text);
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use crate::bytecode::builder::BytecodeBuilder;
    use crate::bytecode::dsl::*;

    #[test]
    fn test_listing_shape() {
        let mut builder = BytecodeBuilder::new();
        builder
            .main(sequence(vec![
                set_global("x", int(1)),
                while_loop(get_global("x"), print(get_global("x"))),
            ]))
            .unwrap();
        let listing = builder.assembly().unwrap();
        let expected = "\
Chunk '<main>' #0
----- Constants -----
@0: 1
@1: \"x\"
----- Code -----
0000    Constant @0 (1)
0002    SetGlobal @1 (\"x\")
before loop 0:
0004    GetGlobal @1 (\"x\")
0006    JumpForwardIfFalse 6 -> 0014 (after body 1)
0008    Pop
0009    GetGlobal @1 (\"x\")
0011    Print
0012    JumpBackward 10 -> 0004 (before loop 0)
after body 1:
0014    Pop
";
        assert_eq!(listing, expected);
    }

    #[test]
    fn test_listing_orders_chunks_by_id() {
        let mut builder = BytecodeBuilder::new();
        builder
            .main(sequence(vec![call(get_global("f"), vec![])]))
            .unwrap();
        builder.add_function("f", 0, ret(self_function())).unwrap();
        let listing = builder.assembly().unwrap();
        let main_at = listing.find("Chunk '<main>' #0").unwrap();
        let f_at = listing.find("Chunk 'f' #1").unwrap();
        assert!(main_at < f_at);
        assert!(listing.contains("@2: <fn 'f' #1>"));
    }
}
