use std::error::Error;
use std::fmt::{self, Display};

use gridcalc_common::{CellAddr, CellError, GridBounds, LiteralValue, column_to_letters};

use crate::tokenizer::{RefPart, Token, TokenType, Tokenizer};

/// A custom error type for the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserError {
    pub message: String,
    /// Byte offset into the formula text, when known.
    pub position: Option<usize>,
}

impl ParserError {
    fn at(message: impl Into<String>, position: usize) -> Self {
        ParserError {
            message: message.into(),
            position: Some(position),
        }
    }
}

impl Display for ParserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(pos) = self.position {
            write!(f, "ParserError at position {}: {}", pos, self.message)
        } else {
            write!(f, "ParserError: {}", self.message)
        }
    }
}

impl Error for ParserError {}

impl From<ParserError> for CellError {
    fn from(err: ParserError) -> Self {
        CellError::parse_error(err.message)
    }
}

/// A single-cell reference with independent absolute flags. Coordinates are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellReference {
    pub col: u32,
    pub row: u32,
    pub col_abs: bool,
    pub row_abs: bool,
}

impl CellReference {
    pub const fn new(col: u32, row: u32, col_abs: bool, row_abs: bool) -> Self {
        Self {
            col,
            row,
            col_abs,
            row_abs,
        }
    }

    /// A fully relative reference.
    pub const fn relative(col: u32, row: u32) -> Self {
        Self::new(col, row, false, false)
    }

    pub fn addr(&self) -> CellAddr {
        CellAddr::new(self.row, self.col)
    }
}

impl From<&RefPart> for CellReference {
    fn from(part: &RefPart) -> Self {
        CellReference::new(part.col, part.row, part.col_abs, part.row_abs)
    }
}

impl Display for CellReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.col_abs {
            f.write_str("$")?;
        }
        f.write_str(&column_to_letters(self.col))?;
        if self.row_abs {
            f.write_str("$")?;
        }
        write!(f, "{}", self.row)
    }
}

/// A reference as written in a formula. Range endpoints keep written order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ReferenceType {
    Cell(CellReference),
    Range {
        start: CellReference,
        end: CellReference,
    },
}

impl ReferenceType {
    /// Top-left and bottom-right corners (min/max per axis).
    pub fn normalized(&self) -> (CellAddr, CellAddr) {
        match self {
            ReferenceType::Cell(c) => (c.addr(), c.addr()),
            ReferenceType::Range { start, end } => (
                CellAddr::new(start.row.min(end.row), start.col.min(end.col)),
                CellAddr::new(start.row.max(end.row), start.col.max(end.col)),
            ),
        }
    }

    /// Every cell covered, row-major, clipped to `bounds`.
    pub fn cells(&self, bounds: GridBounds) -> Vec<CellAddr> {
        let (tl, br) = self.normalized();
        let max_row = br.row.min(bounds.max_rows);
        let max_col = br.col.min(bounds.max_cols);
        let mut out = Vec::new();
        for row in tl.row.max(1)..=max_row {
            for col in tl.col.max(1)..=max_col {
                out.push(CellAddr::new(row, col));
            }
        }
        out
    }

    pub fn within(&self, bounds: GridBounds) -> bool {
        let (tl, br) = self.normalized();
        bounds.contains(tl) && bounds.contains(br)
    }
}

impl Display for ReferenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceType::Cell(c) => write!(f, "{c}"),
            ReferenceType::Range { start, end } => write!(f, "{start}:{end}"),
        }
    }
}

/// The different types of AST nodes.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ASTNodeType {
    Literal(LiteralValue),
    Reference {
        original: String, // text as written, e.g. "$A1"
        reference: ReferenceType,
    },
    UnaryOp {
        op: String,
        expr: Box<ASTNode>,
    },
    BinaryOp {
        op: String,
        left: Box<ASTNode>,
        right: Box<ASTNode>,
    },
    Function {
        name: String,
        args: Vec<ASTNode>,
    },
}

impl Display for ASTNodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ASTNodeType::Literal(value) => write!(f, "Literal({value})"),
            ASTNodeType::Reference { reference, .. } => write!(f, "Reference({reference})"),
            ASTNodeType::UnaryOp { op, expr } => write!(f, "UnaryOp({op}, {expr})"),
            ASTNodeType::BinaryOp { op, left, right } => {
                write!(f, "BinaryOp({op}, {left}, {right})")
            }
            ASTNodeType::Function { name, args } => {
                write!(f, "Function({name}")?;
                for arg in args {
                    write!(f, ", {arg}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// An AST node represents a parsed formula element
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ASTNode {
    pub node_type: ASTNodeType,
    pub source_token: Option<Token>,
}

impl ASTNode {
    pub fn new(node_type: ASTNodeType, source_token: Option<Token>) -> Self {
        ASTNode {
            node_type,
            source_token,
        }
    }

    pub fn literal(value: LiteralValue) -> Self {
        ASTNode::new(ASTNodeType::Literal(value), None)
    }

    pub fn get_dependencies(&self) -> Vec<&ReferenceType> {
        let mut dependencies = Vec::new();
        self.collect_dependencies(&mut dependencies);
        dependencies
    }

    fn collect_dependencies<'a>(&'a self, dependencies: &mut Vec<&'a ReferenceType>) {
        match &self.node_type {
            ASTNodeType::Reference { reference, .. } => {
                dependencies.push(reference);
            }
            ASTNodeType::UnaryOp { expr, .. } => {
                expr.collect_dependencies(dependencies);
            }
            ASTNodeType::BinaryOp { left, right, .. } => {
                left.collect_dependencies(dependencies);
                right.collect_dependencies(dependencies);
            }
            ASTNodeType::Function { args, .. } => {
                for arg in args {
                    arg.collect_dependencies(dependencies);
                }
            }
            ASTNodeType::Literal(_) => {}
        }
    }
}

impl Display for ASTNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.node_type)
    }
}

/// Binding strength of an infix operator (higher binds tighter).
pub(crate) fn infix_precedence(op: &str) -> Option<u8> {
    match op {
        "=" | "<>" | "<" | ">" | "<=" | ">=" => Some(1),
        "&" => Some(2),
        "+" | "-" => Some(3),
        "*" | "/" => Some(4),
        "^" => Some(5),
        _ => None,
    }
}

pub(crate) const UNARY_PRECEDENCE: u8 = 6;

/// Deepest expression the parser accepts. Parentheses, function calls,
/// unary operators and each chained binary operator count one level, so the
/// resulting AST is never deeper than this and every recursive walk over it
/// stays within a bounded stack.
pub const MAX_NESTING_DEPTH: usize = 256;

/// A parser for converting tokens into an AST.
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
    depth: usize,
}

impl<T> From<T> for Parser
where
    T: AsRef<str>,
{
    fn from(formula: T) -> Self {
        Self::new(Tokenizer::new(formula.as_ref()).into_tokens())
    }
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map(|t| t.token_type) != Some(TokenType::Eof) {
            let end = tokens.last().map_or(0, |t| t.end);
            tokens.push(Token::new(TokenType::Eof, "", end, end));
        }
        Parser {
            tokens,
            position: 0,
            depth: 0,
        }
    }

    /// Parse the tokens into an AST.
    pub fn parse(&mut self) -> Result<ASTNode, ParserError> {
        if let Some(bad) = self
            .tokens
            .iter()
            .find(|t| t.token_type == TokenType::Error)
        {
            let message = if bad.value.starts_with('"') {
                "Unterminated string literal".to_string()
            } else {
                format!("Unexpected character '{}'", bad.value)
            };
            return Err(ParserError::at(message, bad.start));
        }
        if self.peek().token_type == TokenType::Eof {
            return Err(ParserError::at("Empty formula", self.peek().start));
        }

        let ast = self.parse_expression()?;
        let token = self.peek();
        if token.token_type != TokenType::Eof {
            return Err(ParserError::at(
                format!("Unexpected token '{}'", token.value),
                token.start,
            ));
        }
        Ok(ast)
    }

    #[inline]
    fn peek(&self) -> &Token {
        // `new` guarantees a trailing Eof, and `advance` never moves past it.
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.token_type != TokenType::Eof {
            self.position += 1;
        }
        token
    }

    fn enter(&mut self, position: usize) -> Result<(), ParserError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(ParserError::at(
                format!("Formula nests deeper than {MAX_NESTING_DEPTH} levels"),
                position,
            ));
        }
        self.depth += 1;
        Ok(())
    }

    fn parse_expression(&mut self) -> Result<ASTNode, ParserError> {
        self.parse_binary_op(0)
    }

    /// Precedence climbing; every infix level is left-associative.
    fn parse_binary_op(&mut self, min_precedence: u8) -> Result<ASTNode, ParserError> {
        let mut left = self.parse_unary_op()?;
        let mut chained = 0;

        loop {
            let token = self.peek();
            if token.token_type != TokenType::Operator {
                break;
            }
            let Some(precedence) = infix_precedence(&token.value) else {
                break;
            };
            if precedence < min_precedence {
                break;
            }

            let op_token = self.advance();
            // a left-deep chain grows the tree by one level per operator
            self.enter(op_token.start)?;
            chained += 1;
            let right = self.parse_binary_op(precedence + 1)?;
            left = ASTNode::new(
                ASTNodeType::BinaryOp {
                    op: op_token.value.clone(),
                    left: Box::new(left),
                    right: Box::new(right),
                },
                Some(op_token),
            );
        }

        self.depth -= chained;
        Ok(left)
    }

    fn parse_unary_op(&mut self) -> Result<ASTNode, ParserError> {
        if self.peek().is_operator("-") || self.peek().is_operator("+") {
            let op_token = self.advance();
            self.enter(op_token.start)?;
            let expr = self.parse_unary_op()?;
            self.depth -= 1;
            return Ok(ASTNode::new(
                ASTNodeType::UnaryOp {
                    op: op_token.value.clone(),
                    expr: Box::new(expr),
                },
                Some(op_token),
            ));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<ASTNode, ParserError> {
        let token = self.advance();
        match token.token_type {
            TokenType::Number => {
                let value = token.value.parse::<f64>().map_err(|_| {
                    ParserError::at(format!("Invalid number: {}", token.value), token.start)
                })?;
                if !value.is_finite() {
                    return Err(ParserError::at(
                        format!("Number out of range: {}", token.value),
                        token.start,
                    ));
                }
                Ok(ASTNode::new(
                    ASTNodeType::Literal(LiteralValue::Number(value)),
                    Some(token),
                ))
            }
            TokenType::String => {
                let inner = &token.value[1..token.value.len() - 1];
                let text = inner.replace("\"\"", "\"");
                Ok(ASTNode::new(
                    ASTNodeType::Literal(LiteralValue::Text(text)),
                    Some(token),
                ))
            }
            TokenType::Boolean => {
                let value = token.value.eq_ignore_ascii_case("TRUE");
                Ok(ASTNode::new(
                    ASTNodeType::Literal(LiteralValue::Boolean(value)),
                    Some(token),
                ))
            }
            TokenType::ErrorLiteral => {
                let error = CellError::from_error_string(&token.value).ok_or_else(|| {
                    ParserError::at(format!("Unknown error literal {}", token.value), token.start)
                })?;
                Ok(ASTNode::new(
                    ASTNodeType::Literal(LiteralValue::Error(error)),
                    Some(token),
                ))
            }
            TokenType::CellRef | TokenType::RangeRef => {
                let reference = reference_from_token(&token)?;
                Ok(ASTNode::new(
                    ASTNodeType::Reference {
                        original: token.value.clone(),
                        reference,
                    },
                    Some(token),
                ))
            }
            TokenType::Identifier => {
                if self.peek().token_type != TokenType::LParen {
                    return Err(ParserError::at(
                        format!("Unknown name '{}'", token.value),
                        token.start,
                    ));
                }
                self.advance();
                self.enter(token.start)?;
                let call = self.parse_function(token)?;
                self.depth -= 1;
                Ok(call)
            }
            TokenType::LParen => {
                self.enter(token.start)?;
                let expr = self.parse_expression()?;
                let closer = self.peek();
                if closer.token_type != TokenType::RParen {
                    return Err(ParserError::at("Expected closing parenthesis", closer.start));
                }
                self.advance();
                self.depth -= 1;
                Ok(expr)
            }
            TokenType::Eof => Err(ParserError::at("Unexpected end of formula", token.start)),
            _ => Err(ParserError::at(
                format!("Unexpected token '{}'", token.value),
                token.start,
            )),
        }
    }

    /// Arguments after the opening parenthesis of `func_token`.
    fn parse_function(&mut self, func_token: Token) -> Result<ASTNode, ParserError> {
        let name = func_token.value.clone();
        let mut args = Vec::new();

        if self.peek().token_type == TokenType::RParen {
            self.advance();
            return Ok(ASTNode::new(
                ASTNodeType::Function { name, args },
                Some(func_token),
            ));
        }

        loop {
            let next = self.peek();
            if matches!(next.token_type, TokenType::Comma | TokenType::RParen) {
                return Err(ParserError::at(
                    format!("Empty argument in call to {name}"),
                    next.start,
                ));
            }
            args.push(self.parse_expression()?);

            let sep = self.advance();
            match sep.token_type {
                TokenType::Comma => continue,
                TokenType::RParen => break,
                TokenType::Eof => {
                    return Err(ParserError::at(
                        format!("Missing closing parenthesis for {name}"),
                        sep.start,
                    ));
                }
                _ => {
                    return Err(ParserError::at(
                        format!("Expected ',' or ')' but found '{}'", sep.value),
                        sep.start,
                    ));
                }
            }
        }

        Ok(ASTNode::new(
            ASTNodeType::Function { name, args },
            Some(func_token),
        ))
    }
}

fn reference_from_token(token: &Token) -> Result<ReferenceType, ParserError> {
    let payload = token
        .reference
        .as_ref()
        .ok_or_else(|| ParserError::at(format!("Invalid reference '{}'", token.value), token.start))?;
    let start = CellReference::from(&payload.start);
    Ok(match &payload.end {
        Some(end) => ReferenceType::Range {
            start,
            end: CellReference::from(end),
        },
        None => ReferenceType::Cell(start),
    })
}

/// Parse formula text; a leading `=` is optional.
pub fn parse<T: AsRef<str>>(formula: T) -> Result<ASTNode, ParserError> {
    Parser::from(formula.as_ref()).parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(ast: &ASTNode) -> f64 {
        match &ast.node_type {
            ASTNodeType::Literal(LiteralValue::Number(n)) => *n,
            other => panic!("expected number literal, got {other}"),
        }
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let ast = parse("=1+2*3").unwrap();
        let ASTNodeType::BinaryOp { op, left, right } = &ast.node_type else {
            panic!("expected binary op");
        };
        assert_eq!(op, "+");
        assert_eq!(num(left), 1.0);
        assert!(matches!(&right.node_type, ASTNodeType::BinaryOp { op, .. } if op == "*"));
    }

    #[test]
    fn subtraction_is_left_associative() {
        let ast = parse("10-4-3").unwrap();
        let ASTNodeType::BinaryOp { left, right, .. } = &ast.node_type else {
            panic!("expected binary op");
        };
        assert!(matches!(&left.node_type, ASTNodeType::BinaryOp { op, .. } if op == "-"));
        assert_eq!(num(right), 3.0);
    }

    #[test]
    fn unary_minus_binds_tighter_than_power() {
        let ast = parse("-2^2").unwrap();
        let ASTNodeType::BinaryOp { op, left, .. } = &ast.node_type else {
            panic!("expected binary op");
        };
        assert_eq!(op, "^");
        assert!(matches!(&left.node_type, ASTNodeType::UnaryOp { op, .. } if op == "-"));
    }

    #[test]
    fn comparison_is_loosest() {
        let ast = parse("A1&\"x\"=B1+1").unwrap();
        assert!(matches!(&ast.node_type, ASTNodeType::BinaryOp { op, .. } if op == "="));
    }

    #[test]
    fn range_keeps_written_order() {
        let ast = parse("SUM(B2:A1)").unwrap();
        let ASTNodeType::Function { name, args } = &ast.node_type else {
            panic!("expected function");
        };
        assert_eq!(name, "SUM");
        let ASTNodeType::Reference { original, reference } = &args[0].node_type else {
            panic!("expected reference");
        };
        assert_eq!(original, "B2:A1");
        let ReferenceType::Range { start, end } = reference else {
            panic!("expected range");
        };
        assert_eq!((start.col, start.row), (2, 2));
        assert_eq!((end.col, end.row), (1, 1));
        assert_eq!(
            reference.normalized(),
            (CellAddr::new(1, 1), CellAddr::new(2, 2))
        );
    }

    #[test]
    fn zero_arg_function_and_nested_calls() {
        let ast = parse("IF(TRUE(), SUM(1, 2), 0)").unwrap();
        let ASTNodeType::Function { args, .. } = &ast.node_type else {
            panic!("expected function");
        };
        assert_eq!(args.len(), 3);
        assert!(matches!(&args[0].node_type, ASTNodeType::Function { args, .. } if args.is_empty()));
    }

    #[test]
    fn unknown_identifier_still_parses_as_call() {
        assert!(parse("FOO(1)").is_ok());
    }

    #[test]
    fn malformed_formulas_are_errors() {
        for bad in [
            "", "=", "1+", "(1", "1)", "SUM(1,,2)", "SUM(,1)", "SUM(1", "foo", "1 2", "*3", "A1:",
        ] {
            assert!(parse(bad).is_err(), "expected parse error for {bad:?}");
        }
    }

    #[test]
    fn nesting_is_bounded() {
        let deep = format!("={}1{}", "(".repeat(10_000), ")".repeat(10_000));
        let err = parse(&deep).unwrap_err();
        assert!(err.message.contains("nests deeper"), "{}", err.message);
        assert_eq!(err.position, Some(1 + MAX_NESTING_DEPTH));

        let negations = format!("={}1", "-".repeat(100_000));
        assert!(parse(&negations).is_err());

        let calls = format!("={}1{}", "ABS(".repeat(5_000), ")".repeat(5_000));
        assert!(parse(&calls).is_err());

        let chain = format!("=1{}", "+1".repeat(MAX_NESTING_DEPTH + 1));
        assert!(parse(&chain).is_err());
    }

    #[test]
    fn nesting_up_to_the_limit_parses() {
        let ok = format!("={}1{}", "(".repeat(MAX_NESTING_DEPTH), ")".repeat(MAX_NESTING_DEPTH));
        assert!(parse(&ok).is_ok());
        let chain = format!("=1{}", "+1".repeat(MAX_NESTING_DEPTH));
        assert!(parse(&chain).is_ok());
        // siblings do not add depth
        let args = vec!["(1)"; 2_000].join(",");
        assert!(parse(format!("=SUM({args})")).is_ok());
    }

    #[test]
    fn error_position_points_at_offending_token() {
        let err = parse("=1+)").unwrap_err();
        assert_eq!(err.position, Some(3));
    }

    #[test]
    fn dependencies_are_collected_in_order() {
        let ast = parse("A1+SUM(B1:B3, $C$2)").unwrap();
        let deps: Vec<String> = ast.get_dependencies().iter().map(|d| d.to_string()).collect();
        assert_eq!(deps, vec!["A1", "B1:B3", "$C$2"]);
    }

    #[test]
    fn range_cells_are_row_major_and_clipped() {
        let r = ReferenceType::Range {
            start: CellReference::relative(1, 1),
            end: CellReference::relative(2, 2),
        };
        let cells = r.cells(GridBounds::default());
        assert_eq!(
            cells,
            vec![
                CellAddr::new(1, 1),
                CellAddr::new(1, 2),
                CellAddr::new(2, 1),
                CellAddr::new(2, 2)
            ]
        );
        let wide = ReferenceType::Range {
            start: CellReference::relative(26, 1),
            end: CellReference::relative(28, 1),
        };
        assert_eq!(wide.cells(GridBounds::default()).len(), 1);
        assert!(!wide.within(GridBounds::default()));
    }
}
