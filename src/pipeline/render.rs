//! Sheet rendering: turn a parsed grid into delimited text.
//!
//! ## Quoting rule
//!
//! A field is wrapped in double quotes, with inner quotes doubled, whenever
//! its text contains a comma, a double quote or a line break. Absent cells
//! render as empty fields, integers exactly and floats via their shortest
//! plain form. Rows are
//! joined with `\n`; a row with no cells renders as an empty line. The output
//! is therefore readable back by any RFC 4180 parser.
//!
//! Rendering checks the cancellation token every [`CANCEL_CHECK_ROWS`] rows
//! so a very tall sheet can be abandoned part way through.

use tokio_util::sync::CancellationToken;

/// Rows rendered between two cancellation checks.
pub const CANCEL_CHECK_ROWS: usize = 1024;

/// One cell of a parsed sheet.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Number(f64),
    Empty,
}

impl From<&calamine::Data> for CellValue {
    fn from(data: &calamine::Data) -> Self {
        use calamine::Data;
        match data {
            Data::Empty => CellValue::Empty,
            Data::String(s) => CellValue::Text(s.clone()),
            Data::Float(f) => CellValue::Number(*f),
            Data::Int(i) => CellValue::Integer(*i),
            other => CellValue::Text(other.to_string()),
        }
    }
}

/// A named sheet with its rows in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub grid: Vec<Vec<CellValue>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, grid: Vec<Vec<CellValue>>) -> Self {
        Self {
            name: name.into(),
            grid,
        }
    }

    pub fn row_count(&self) -> usize {
        self.grid.len()
    }
}

/// Returned when rendering stopped because the token was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

/// Render `grid` to delimited text.
pub fn render_grid(grid: &[Vec<CellValue>], cancel: &CancellationToken) -> Result<String, Cancelled> {
    let mut out = String::new();
    for (i, row) in grid.iter().enumerate() {
        if i % CANCEL_CHECK_ROWS == 0 && cancel.is_cancelled() {
            return Err(Cancelled);
        }
        if i > 0 {
            out.push('\n');
        }
        for (j, cell) in row.iter().enumerate() {
            if j > 0 {
                out.push(',');
            }
            push_field(&mut out, cell);
        }
    }
    Ok(out)
}

fn push_field(out: &mut String, cell: &CellValue) {
    match cell {
        CellValue::Empty => {}
        CellValue::Integer(i) => out.push_str(&i.to_string()),
        CellValue::Number(n) => out.push_str(&n.to_string()),
        CellValue::Text(s) => push_text(out, s),
    }
}

fn push_text(out: &mut String, s: &str) {
    if s.contains([',', '"', '\n', '\r']) {
        out.push('"');
        out.push_str(&s.replace('"', "\"\""));
        out.push('"');
    } else {
        out.push_str(s);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn render(grid: &[Vec<CellValue>]) -> String {
        render_grid(grid, &CancellationToken::new()).unwrap()
    }

    #[test]
    fn plain_cells() {
        let grid = vec![
            vec![text("name"), text("qty")],
            vec![text("apple"), CellValue::Number(3.0)],
            vec![text("pear"), CellValue::Number(2.5)],
        ];
        assert_eq!(render(&grid), "name,qty\napple,3\npear,2.5");
    }

    #[test]
    fn empty_cells_and_rows() {
        let grid = vec![
            vec![text("a"), CellValue::Empty, text("c")],
            vec![],
            vec![CellValue::Empty, CellValue::Empty],
        ];
        assert_eq!(render(&grid), "a,,c\n\n,");
    }

    #[test]
    fn quoting() {
        let grid = vec![vec![
            text("a,b"),
            text("say \"hi\""),
            text("two\nlines"),
            text("plain"),
        ]];
        assert_eq!(
            render(&grid),
            "\"a,b\",\"say \"\"hi\"\"\",\"two\nlines\",plain"
        );
    }

    #[test]
    fn large_integers_render_exactly() {
        let big = 9_007_199_254_740_993_i64;
        let grid = vec![vec![
            CellValue::from(&calamine::Data::Int(big)),
            CellValue::Integer(i64::MIN),
        ]];
        assert_eq!(render(&grid), format!("{big},{}", i64::MIN));
    }

    #[test]
    fn calamine_cells_map() {
        use calamine::Data;
        assert_eq!(CellValue::from(&Data::Empty), CellValue::Empty);
        assert_eq!(CellValue::from(&Data::Int(7)), CellValue::Integer(7));
        assert_eq!(CellValue::from(&Data::Bool(true)), text("true"));
        assert_eq!(CellValue::from(&Data::String("x".into())), text("x"));
    }

    #[test]
    fn cancelled_token_stops_rendering() {
        let token = CancellationToken::new();
        token.cancel();
        let grid = vec![vec![text("a")]];
        assert_eq!(render_grid(&grid, &token), Err(Cancelled));
    }
}
