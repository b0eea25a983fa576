//! Canonical formula text from an AST.
//!
//! Output re-parses to an equal tree: parentheses appear only where
//! precedence or left-associativity would otherwise regroup operands.

use gridcalc_common::{LiteralValue, format_number};

use crate::parser::{ASTNode, ASTNodeType, UNARY_PRECEDENCE, infix_precedence};

const PRIMARY_PRECEDENCE: u8 = UNARY_PRECEDENCE + 1;

/// Render `ast` as `=`-prefixed formula text.
pub fn render_formula(ast: &ASTNode) -> String {
    let mut out = String::from("=");
    write_node(ast, &mut out);
    out
}

/// Render without the leading `=`.
pub fn render_expression(ast: &ASTNode) -> String {
    let mut out = String::new();
    write_node(ast, &mut out);
    out
}

fn precedence(node: &ASTNode) -> u8 {
    match &node.node_type {
        ASTNodeType::BinaryOp { op, .. } => infix_precedence(op).unwrap_or(0),
        ASTNodeType::UnaryOp { .. } => UNARY_PRECEDENCE,
        // a negative literal reads back as unary minus
        ASTNodeType::Literal(LiteralValue::Number(n)) if *n < 0.0 => UNARY_PRECEDENCE,
        _ => PRIMARY_PRECEDENCE,
    }
}

fn write_child(node: &ASTNode, needs_parens: bool, out: &mut String) {
    if needs_parens {
        out.push('(');
        write_node(node, out);
        out.push(')');
    } else {
        write_node(node, out);
    }
}

fn write_node(node: &ASTNode, out: &mut String) {
    match &node.node_type {
        ASTNodeType::Literal(value) => write_literal(value, out),
        ASTNodeType::Reference { reference, .. } => out.push_str(&reference.to_string()),
        ASTNodeType::UnaryOp { op, expr } => {
            out.push_str(op);
            write_child(expr, precedence(expr) < UNARY_PRECEDENCE, out);
        }
        ASTNodeType::BinaryOp { op, left, right } => {
            let p = infix_precedence(op).unwrap_or(0);
            write_child(left, precedence(left) < p, out);
            out.push_str(op);
            write_child(right, precedence(right) <= p, out);
        }
        ASTNodeType::Function { name, args } => {
            out.push_str(&name.to_ascii_uppercase());
            out.push('(');
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_node(arg, out);
            }
            out.push(')');
        }
    }
}

fn write_literal(value: &LiteralValue, out: &mut String) {
    match value {
        LiteralValue::Number(n) => out.push_str(&format_number(*n)),
        LiteralValue::Text(s) => {
            out.push('"');
            out.push_str(&s.replace('"', "\"\""));
            out.push('"');
        }
        LiteralValue::Boolean(b) => out.push_str(if *b { "TRUE" } else { "FALSE" }),
        LiteralValue::Error(e) => out.push_str(e.kind.token()),
        LiteralValue::Empty => out.push_str("\"\""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    fn canon(src: &str) -> String {
        render_formula(&parse(src).unwrap())
    }

    #[test]
    fn drops_redundant_parentheses() {
        assert_eq!(canon("=(A1+B1)"), "=A1+B1");
        assert_eq!(canon("=(1+2)+3"), "=1+2+3");
        assert_eq!(canon("=1*(2*3)"), "=1*(2*3)");
        assert_eq!(canon("=(1+2)*3"), "=(1+2)*3");
        assert_eq!(canon("=-(2^2)"), "=-(2^2)");
        assert_eq!(canon("=-2^2"), "=-2^2");
    }

    #[test]
    fn normalizes_case_and_spacing() {
        assert_eq!(canon("= sum( a1:$b$2 , 1.50 )"), "=SUM(A1:$B$2,1.5)");
        assert_eq!(canon("=\"a\"\"b\" & true"), "=\"a\"\"b\"&TRUE");
        assert_eq!(canon("=#ref!+1"), "=#REF!+1");
    }

    #[test]
    fn rendered_text_reparses_to_same_tree() {
        for src in ["=1-(2-3)", "=2^(3^2)", "=A1<>B1&\"x\"", "=IF(A1>=0,A1,-A1)", "=(1<2)=TRUE"] {
            let ast = parse(src).unwrap();
            let again = parse(render_formula(&ast)).unwrap();
            assert_eq!(render_formula(&again), render_formula(&ast), "{src}");
        }
    }
}
