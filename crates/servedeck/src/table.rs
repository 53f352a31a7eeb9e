use unicode_width::UnicodeWidthStr;

use servedeck_core::{AlertRecord, ApiSnapshot};

use crate::color;

/// Styles an already padded cell.
pub type CellStyle = fn(&str) -> String;

/// Box-drawn table with per-column styling.
pub struct Table {
    headers: Vec<&'static str>,
    styles: Vec<CellStyle>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(columns: &[(&'static str, CellStyle)]) -> Self {
        Self {
            headers: columns.iter().map(|(h, _)| *h).collect(),
            styles: columns.iter().map(|(_, s)| *s).collect(),
            rows: Vec::new(),
        }
    }

    /// Missing cells render empty; extra cells are ignored.
    pub fn push_row(&mut self, mut row: Vec<String>) {
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }

    fn widths(&self) -> Vec<usize> {
        self.headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                self.rows
                    .iter()
                    .map(|row| display_width(&row[i]))
                    .chain(std::iter::once(display_width(header)))
                    .max()
                    .unwrap_or(0)
            })
            .collect()
    }

    pub fn render(&self) -> String {
        let widths = self.widths();
        let border = |left: &str, mid: &str, right: &str| {
            let segments: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
            color::muted(&format!("{}{}{}", left, segments.join(mid), right))
        };
        let sep = color::muted("│");

        let mut lines = vec![border("┌", "┬", "┐")];
        let header: Vec<String> = self
            .headers
            .iter()
            .zip(&widths)
            .map(|(h, w)| color::bold(&pad(h, *w)))
            .collect();
        lines.push(format!("{sep} {} {sep}", header.join(&format!(" {sep} "))));
        lines.push(border("├", "┼", "┤"));

        for row in &self.rows {
            let cells: Vec<String> = row
                .iter()
                .zip(&widths)
                .zip(&self.styles)
                .map(|((cell, w), style)| style(&pad(cell, *w)))
                .collect();
            lines.push(format!("{sep} {} {sep}", cells.join(&format!(" {sep} "))));
        }
        lines.push(border("└", "┴", "┘"));
        lines.join("\n")
    }

    pub fn print(&self) {
        println!("{}", self.render());
    }
}

pub fn api_table(apis: &[ApiSnapshot]) -> Table {
    let mut table = Table::new(&[
        ("ID", color::accent),
        ("Name", color::plain),
        ("Status", color::status),
        ("Listening", color::plain),
        ("Port", color::plain),
        ("Model", color::plain),
    ]);
    for api in apis {
        table.push_row(vec![
            api.id.to_string(),
            api.name.clone(),
            api.status.to_string(),
            if api.is_listening { "yes" } else { "no" }.to_string(),
            api.port.map_or("-".to_string(), |p| p.to_string()),
            api.model.clone().unwrap_or_else(|| "-".to_string()),
        ]);
    }
    table
}

pub fn alert_table(alerts: &[AlertRecord]) -> Table {
    let mut table = Table::new(&[
        ("Level", color::level),
        ("API", color::accent),
        ("Message", color::plain),
        ("Raised", color::muted),
    ]);
    for alert in alerts {
        table.push_row(vec![
            alert.level.to_string(),
            alert
                .api_id
                .as_ref()
                .map_or("-".to_string(), |id| id.to_string()),
            alert.message.clone(),
            alert.created_at.map_or("-".to_string(), |at| {
                at.format("%Y-%m-%d %H:%M:%S").to_string()
            }),
        ]);
    }
    table
}

/// Terminal display width. Wide characters (CJK, emoji) count as 2 columns.
pub(crate) fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Pad to a minimum display width without truncating.
pub(crate) fn pad(s: &str, min_width: usize) -> String {
    let width = display_width(s);
    if width >= min_width {
        s.to_string()
    } else {
        format!("{}{}", s, " ".repeat(min_width - width))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use servedeck_core::{ApiId, ApiStatus};

    #[test]
    fn test_pad_shorter_than_width() {
        assert_eq!(pad("hi", 5), "hi   ");
    }

    #[test]
    fn test_pad_longer_than_width() {
        assert_eq!(pad("hello world", 5), "hello world");
    }

    #[test]
    fn test_pad_with_wide_chars() {
        assert_eq!(display_width("日本"), 4);
        assert_eq!(pad("日本", 6), "日本  ");
    }

    #[test]
    fn test_render_aligns_columns() {
        crate::color::set_no_color();
        let mut table = Table::new(&[("ID", color::plain), ("Status", color::status)]);
        table.push_row(vec!["llama-3-70b".to_string(), "running".to_string()]);
        table.push_row(vec!["q".to_string()]);

        let rendered = table.render();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[1], "│ ID          │ Status  │");
        assert_eq!(lines[3], "│ llama-3-70b │ running │");
        assert_eq!(lines[4], "│ q           │         │");
        let widths: Vec<usize> = lines.iter().map(|l| display_width(l)).collect();
        assert!(widths.iter().all(|w| *w == widths[0]));
    }

    #[test]
    fn test_api_table_placeholders() {
        crate::color::set_no_color();
        let table = api_table(&[ApiSnapshot {
            id: ApiId::from("qwen"),
            name: "Qwen".to_string(),
            status: ApiStatus::Stopped,
            is_listening: false,
            port: None,
            model: None,
        }]);
        let rendered = table.render();
        assert!(rendered.contains("│ qwen │ Qwen │ stopped │ no        │ -    │ -     │"));
    }
}
