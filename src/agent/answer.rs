//! Answer rendering
//!
//! Deterministic text answer derived from a successful result set.

use crate::constants::execution::MAX_ANSWER_ROWS;
use crate::types::{ResultSet, display_value};

pub fn render_answer(result: &ResultSet) -> String {
    if result.is_empty() {
        return "The query returned no rows.".to_string();
    }

    if let (Some(value), [column]) = (result.scalar(), result.columns.as_slice()) {
        return format!("{}: {}", column, display_value(value));
    }

    let shown = result.rows.iter().take(MAX_ANSWER_ROWS);
    let mut lines = Vec::with_capacity(MAX_ANSWER_ROWS + 3);
    lines.push(result.columns.join(" | "));
    for row in shown {
        let cells: Vec<String> = result
            .columns
            .iter()
            .map(|c| row.get(c).map(display_value).unwrap_or_default())
            .collect();
        lines.push(cells.join(" | "));
    }

    let hidden = result.len().saturating_sub(MAX_ANSWER_ROWS);
    if hidden > 0 {
        lines.push(format!("... and {} more rows", hidden));
    }
    if result.truncated {
        lines.push("(result truncated at the row limit)".to_string());
    }

    let noun = if result.len() == 1 { "row" } else { "rows" };
    format!("{} {}:\n{}", result.len(), noun, lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Row;
    use serde_json::{Value, json};

    fn result(columns: &[&str], rows: Vec<Vec<Value>>, truncated: bool) -> ResultSet {
        let columns: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
        let rows = rows
            .into_iter()
            .map(|values| {
                let mut row = Row::new();
                for (c, v) in columns.iter().zip(values) {
                    row.insert(c.clone(), v);
                }
                row
            })
            .collect();
        ResultSet::new(columns, rows, truncated)
    }

    #[test]
    fn test_empty_result() {
        let r = result(&["id"], vec![], false);
        assert_eq!(render_answer(&r), "The query returned no rows.");
    }

    #[test]
    fn test_scalar_result() {
        let r = result(&["COUNT(*)"], vec![vec![json!(500)]], false);
        assert_eq!(render_answer(&r), "COUNT(*): 500");
    }

    #[test]
    fn test_table_result() {
        let r = result(
            &["style", "n"],
            vec![vec![json!("Casual"), json!(2)], vec![json!("Party"), json!(1)]],
            false,
        );
        assert_eq!(
            render_answer(&r),
            "2 rows:\nstyle | n\nCasual | 2\nParty | 1"
        );
    }

    #[test]
    fn test_long_result_is_cut_and_flagged() {
        let rows = (0..25).map(|i| vec![json!(i)]).collect::<Vec<_>>();
        let r = result(&["id"], rows, true);
        let text = render_answer(&r);

        assert!(text.starts_with("25 rows:"));
        assert!(text.contains("... and 5 more rows"));
        assert!(text.contains("truncated"));
    }
}
