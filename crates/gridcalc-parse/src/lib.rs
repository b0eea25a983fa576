pub mod parser;
pub mod pretty;
pub mod tokenizer;

pub use parser::{
    ASTNode, ASTNodeType, CellReference, MAX_NESTING_DEPTH, Parser, ParserError, ReferenceType, parse,
};
pub use pretty::{render_expression, render_formula};
pub use tokenizer::{RefPart, RefToken, Token, TokenType, Tokenizer, TokenizerError};

// Re-export common types
pub use gridcalc_common::{CellError, CellErrorKind, LiteralValue};
