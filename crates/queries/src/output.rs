//! Console rendering of example results

use serde::Serialize;

use crate::error::QueryResult;

/// Renders `data` as `label: <indented JSON>`.
pub fn render<T: Serialize + ?Sized>(label: &str, data: &T) -> QueryResult<String> {
    let json = serde_json::to_string_pretty(data)?;
    Ok(format!("{label}: {json}"))
}

/// Prints `data` to stdout in the [`render`] format and returns the text.
pub fn pretty_print<T: Serialize + ?Sized>(label: &str, data: &T) -> QueryResult<String> {
    let rendered = render(label, data)?;
    println!("{rendered}");
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn render_prefixes_label_and_indents() {
        let rendered = render("totals", &json!({"requested": 2})).unwrap();
        assert_eq!(rendered, "totals: {\n  \"requested\": 2\n}");
    }

    #[test]
    fn render_handles_empty_lists() {
        let empty: Vec<i64> = Vec::new();
        assert_eq!(render("ids", &empty).unwrap(), "ids: []");
    }
}
