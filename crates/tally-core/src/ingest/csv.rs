//! Quote-aware CSV tokenizer.
//!
//! A naive `split('\n')` / `split(',')` breaks on quoted fields containing
//! separators or embedded newlines — the order export's line-items column
//! routinely contains both — so record and field boundaries are tracked
//! through quoting state instead.

/// Splits raw CSV text into rows of unquoted field values.
///
/// Handles:
/// - a leading BOM (which would otherwise corrupt the first header),
/// - separators and newlines inside quoted fields,
/// - doubled-quote escapes (`""` → `"`),
/// - `\r\n` line endings,
/// - a final row without a trailing newline.
///
/// Rows whose every field is blank are dropped.
#[must_use]
pub fn parse(content: &str) -> Vec<Vec<String>> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;

    let mut chars = content.chars().peekable();
    while let Some(ch) = chars.next() {
        if in_quotes {
            if ch == '"' {
                if chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(ch);
            }
            continue;
        }

        match ch {
            '"' => in_quotes = true,
            ',' => row.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
            }
            _ => field.push(ch),
        }
    }

    // Flush the trailing field and row when the text does not end in '\n'.
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
    }
    if !row.is_empty() {
        rows.push(row);
    }

    rows.retain(|r| r.iter().any(|value| !value.trim().is_empty()));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_rows() {
        let rows = parse("a,b,c\n1,2,3\n");
        assert_eq!(rows, vec![vec!["a", "b", "c"], vec!["1", "2", "3"]]);
    }

    #[test]
    fn test_quoted_field_with_comma() {
        let rows = parse("name,items\nAlice,\"beer, sake\"\n");
        assert_eq!(rows[1], vec!["Alice", "beer, sake"]);
    }

    #[test]
    fn test_quoted_field_with_embedded_newline() {
        let rows = parse("name,note\nBob,\"line one\nline two\"\n");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], vec!["Bob", "line one\nline two"]);
    }

    #[test]
    fn test_doubled_quote_escape() {
        let rows = parse("a\n\"say \"\"hi\"\"\"\n");
        assert_eq!(rows[1], vec!["say \"hi\""]);
    }

    #[test]
    fn test_strips_leading_bom() {
        let rows = parse("\u{feff}header,other\n1,2\n");
        assert_eq!(rows[0][0], "header");
    }

    #[test]
    fn test_crlf_line_endings() {
        let rows = parse("a,b\r\n1,2\r\n");
        assert_eq!(rows, vec![vec!["a", "b"], vec!["1", "2"]]);
    }

    #[test]
    fn test_last_row_without_trailing_newline() {
        let rows = parse("a,b\n1,2");
        assert_eq!(rows, vec![vec!["a", "b"], vec!["1", "2"]]);
    }

    #[test]
    fn test_blank_rows_dropped() {
        let rows = parse("a,b\n,\n  ,  \n1,2\n\n");
        assert_eq!(rows, vec![vec!["a", "b"], vec!["1", "2"]]);
    }

    #[test]
    fn test_empty_input() {
        assert!(parse("").is_empty());
        assert!(parse("\n\n").is_empty());
    }

    #[test]
    fn test_preserves_empty_fields_inside_populated_rows() {
        let rows = parse("a,b,c\n1,,3\n");
        assert_eq!(rows[1], vec!["1", "", "3"]);
    }
}
