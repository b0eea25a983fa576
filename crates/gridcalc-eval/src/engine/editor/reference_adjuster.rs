use gridcalc_common::{CellError, CellErrorKind, GridBounds, LiteralValue};
use gridcalc_parse::parser::{ASTNode, ASTNodeType, CellReference, ParserError, ReferenceType, parse};
use gridcalc_parse::pretty::render_formula;
use gridcalc_parse::tokenizer::{Token, Tokenizer};

/// Reference arithmetic for copy/paste within a bounded grid.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceAdjuster {
    bounds: GridBounds,
}

impl ReferenceAdjuster {
    pub fn new(bounds: GridBounds) -> Self {
        Self { bounds }
    }

    /// Shift the relative components of `cell`. `None` when the result
    /// leaves the grid; nothing is clamped or wrapped.
    pub fn translate_cell(
        &self,
        cell: &CellReference,
        row_delta: i64,
        col_delta: i64,
    ) -> Option<CellReference> {
        let col = if cell.col_abs {
            i64::from(cell.col)
        } else {
            i64::from(cell.col) + col_delta
        };
        let row = if cell.row_abs {
            i64::from(cell.row)
        } else {
            i64::from(cell.row) + row_delta
        };
        if !self.bounds.contains_col(col) || !self.bounds.contains_row(row) {
            return None;
        }
        Some(CellReference::new(col as u32, row as u32, cell.col_abs, cell.row_abs))
    }

    /// Both endpoints of a range must stay on the grid.
    pub fn translate_reference(
        &self,
        reference: &ReferenceType,
        row_delta: i64,
        col_delta: i64,
    ) -> Option<ReferenceType> {
        match reference {
            ReferenceType::Cell(cell) => self
                .translate_cell(cell, row_delta, col_delta)
                .map(ReferenceType::Cell),
            ReferenceType::Range { start, end } => Some(ReferenceType::Range {
                start: self.translate_cell(start, row_delta, col_delta)?,
                end: self.translate_cell(end, row_delta, col_delta)?,
            }),
        }
    }

    /// Rebuild `ast` with every reference shifted. A reference that falls
    /// off the grid is replaced by a `#REF!` literal.
    pub fn translate_ast(&self, ast: &ASTNode, row_delta: i64, col_delta: i64) -> ASTNode {
        match &ast.node_type {
            ASTNodeType::Reference { reference, .. } => {
                match self.translate_reference(reference, row_delta, col_delta) {
                    Some(moved) => ASTNode::new(
                        ASTNodeType::Reference {
                            original: moved.to_string(),
                            reference: moved,
                        },
                        None,
                    ),
                    None => ASTNode::literal(LiteralValue::Error(
                        CellError::new(CellErrorKind::Ref)
                            .with_message(format!("{reference} moved off the grid")),
                    )),
                }
            }
            ASTNodeType::UnaryOp { op, expr } => ASTNode::new(
                ASTNodeType::UnaryOp {
                    op: op.clone(),
                    expr: Box::new(self.translate_ast(expr, row_delta, col_delta)),
                },
                ast.source_token.clone(),
            ),
            ASTNodeType::BinaryOp { op, left, right } => ASTNode::new(
                ASTNodeType::BinaryOp {
                    op: op.clone(),
                    left: Box::new(self.translate_ast(left, row_delta, col_delta)),
                    right: Box::new(self.translate_ast(right, row_delta, col_delta)),
                },
                ast.source_token.clone(),
            ),
            ASTNodeType::Function { name, args } => ASTNode::new(
                ASTNodeType::Function {
                    name: name.clone(),
                    args: args
                        .iter()
                        .map(|a| self.translate_ast(a, row_delta, col_delta))
                        .collect(),
                },
                ast.source_token.clone(),
            ),
            ASTNodeType::Literal(_) => ast.clone(),
        }
    }
}

/// Parse, shift and re-render a formula.
pub fn translate_formula(
    formula: &str,
    row_delta: i64,
    col_delta: i64,
    bounds: GridBounds,
) -> Result<String, ParserError> {
    let ast = parse(formula)?;
    let moved = ReferenceAdjuster::new(bounds).translate_ast(&ast, row_delta, col_delta);
    Ok(render_formula(&moved))
}

/* ─────────────── absolute/relative cycling ─────────────── */

/// Which components of a reference are pinned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AbsoluteMode {
    /// `A1`
    Relative,
    /// `$A$1`
    Absolute,
    /// `A$1`
    RowAbsolute,
    /// `$A1`
    ColumnAbsolute,
}

impl AbsoluteMode {
    pub fn from_flags(col_abs: bool, row_abs: bool) -> Self {
        match (col_abs, row_abs) {
            (false, false) => AbsoluteMode::Relative,
            (true, true) => AbsoluteMode::Absolute,
            (false, true) => AbsoluteMode::RowAbsolute,
            (true, false) => AbsoluteMode::ColumnAbsolute,
        }
    }

    /// `(col_abs, row_abs)`
    pub fn flags(self) -> (bool, bool) {
        match self {
            AbsoluteMode::Relative => (false, false),
            AbsoluteMode::Absolute => (true, true),
            AbsoluteMode::RowAbsolute => (false, true),
            AbsoluteMode::ColumnAbsolute => (true, false),
        }
    }

    pub fn next(self) -> Self {
        match self {
            AbsoluteMode::Relative => AbsoluteMode::Absolute,
            AbsoluteMode::Absolute => AbsoluteMode::RowAbsolute,
            AbsoluteMode::RowAbsolute => AbsoluteMode::ColumnAbsolute,
            AbsoluteMode::ColumnAbsolute => AbsoluteMode::Relative,
        }
    }
}

/// One F4 press: `A1 → $A$1 → A$1 → $A1 → A1`.
pub fn cycle_absolute(cell: &CellReference) -> CellReference {
    let (col_abs, row_abs) = AbsoluteMode::from_flags(cell.col_abs, cell.row_abs)
        .next()
        .flags();
    CellReference::new(cell.col, cell.row, col_abs, row_abs)
}

/// Steps each endpoint of a range once.
pub fn cycle_reference(reference: &ReferenceType) -> ReferenceType {
    match reference {
        ReferenceType::Cell(cell) => ReferenceType::Cell(cycle_absolute(cell)),
        ReferenceType::Range { start, end } => ReferenceType::Range {
            start: cycle_absolute(start),
            end: cycle_absolute(end),
        },
    }
}

fn reference_of(token: &Token) -> Option<ReferenceType> {
    let r = token.reference.as_ref()?;
    let start = CellReference::from(&r.start);
    Some(match &r.end {
        Some(end) => ReferenceType::Range {
            start,
            end: CellReference::from(end),
        },
        None => ReferenceType::Cell(start),
    })
}

/// Cycle the reference under `cursor` (a byte offset into `formula`), or
/// every reference when the cursor is not on one. Returns the new text and
/// the new cursor position.
pub fn cycle_reference_at(formula: &str, cursor: usize) -> (String, usize) {
    let tokenizer = Tokenizer::new(formula);
    let refs: Vec<&Token> = tokenizer
        .tokens()
        .iter()
        .filter(|t| t.is_reference())
        .collect();

    let targeted = refs
        .iter()
        .copied()
        .find(|t| t.start <= cursor && cursor <= t.end);
    let selected: Vec<&Token> = match targeted {
        Some(t) => vec![t],
        None => refs,
    };

    let mut text = formula.to_string();
    let mut new_cursor = cursor.min(formula.len());
    let mut shift: i64 = 0;
    // splice back to front so earlier offsets stay valid
    for token in selected.iter().rev() {
        let Some(reference) = reference_of(token) else {
            continue;
        };
        let replacement = cycle_reference(&reference).to_string();
        let delta = replacement.len() as i64 - (token.end - token.start) as i64;
        text.replace_range(token.start..token.end, &replacement);
        if targeted.is_some() {
            new_cursor = token.start + replacement.len();
        } else if token.end <= cursor {
            shift += delta;
        }
    }

    if targeted.is_none() {
        new_cursor = (new_cursor as i64 + shift).max(0) as usize;
    }
    let new_cursor = new_cursor.min(text.len());
    (text, new_cursor)
}
