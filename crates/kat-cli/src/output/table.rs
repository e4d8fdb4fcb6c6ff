#[derive(Clone, Copy, Debug)]
pub struct TableOptions {
    pub max_width: Option<usize>,
    pub color: bool,
}

const MIN_WIDTH: usize = 4;

/// Render an aligned plain-text table. Numeric cells are right-aligned.
#[must_use]
pub fn render(headers: &[&str], rows: &[Vec<String>], options: TableOptions) -> String {
    let mut widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, header)| {
            rows.iter()
                .filter_map(|row| row.get(i))
                .map(|value| value.chars().count())
                .chain([header.chars().count(), MIN_WIDTH])
                .max()
                .unwrap_or(MIN_WIDTH)
        })
        .collect();
    shrink(&mut widths, options.max_width);

    let header_line = headers
        .iter()
        .zip(&widths)
        .map(|(header, width)| pad(&clip(header, *width), *width, false))
        .collect::<Vec<_>>()
        .join("  ");
    let divider = "-".repeat(header_line.chars().count());

    let mut lines = vec![header_line.trim_end().to_string(), divider];
    for row in rows {
        let line = widths
            .iter()
            .enumerate()
            .map(|(i, width)| {
                let value = clip(row.get(i).map_or("-", String::as_str), *width);
                let numeric = is_numeric(&value);
                let padded = pad(&value, *width, numeric);
                if options.color { paint(&padded, &value) } else { padded }
            })
            .collect::<Vec<_>>()
            .join("  ");
        lines.push(line.trim_end().to_string());
    }
    lines.join("\n")
}

/// Narrow the widest column one character at a time until the table fits.
fn shrink(widths: &mut [usize], max_width: Option<usize>) {
    let Some(max_width) = max_width else {
        return;
    };
    let gaps = widths.len().saturating_sub(1) * 2;
    while widths.iter().sum::<usize>() + gaps > max_width {
        let Some((idx, _)) = widths
            .iter()
            .enumerate()
            .filter(|(_, w)| **w > MIN_WIDTH)
            .max_by_key(|(_, w)| **w)
        else {
            break;
        };
        widths[idx] -= 1;
    }
}

fn clip(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    let mut out: String = value.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}

fn pad(value: &str, width: usize, right_align: bool) -> String {
    if right_align {
        format!("{value:>width$}")
    } else {
        format!("{value:<width$}")
    }
}

fn is_numeric(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit() || c == '-' || c == '.')
        && value.chars().any(|c| c.is_ascii_digit())
}

/// Color change types and index states.
fn paint(padded: &str, value: &str) -> String {
    let code = match value {
        "insert" | "synced" | "true" => "32",
        "update" | "skipped" => "33",
        "delete" | "failed" | "false" => "31",
        _ => return padded.to_string(),
    };
    format!("\u{1b}[{code}m{padded}\u{1b}[0m")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAIN: TableOptions = TableOptions {
        max_width: None,
        color: false,
    };

    #[test]
    fn columns_align_and_numbers_right_justify() {
        let rows = vec![
            vec!["orders".to_string(), "42".to_string()],
            vec!["refunds_archive".to_string(), "7".to_string()],
        ];
        let out = render(&["table", "rows"], &rows, PLAIN);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].chars().all(|c| c == '-'));
        assert!(lines[2].ends_with("  42"));
        assert!(lines[3].ends_with("   7"));
        assert_eq!(lines[2].find("42").map(|i| i + 2), Some(lines[3].len()));
    }

    #[test]
    fn narrow_terminal_clips_widest_column() {
        let rows = vec![vec!["a".repeat(60), "x".to_string()]];
        let out = render(
            &["name", "kind"],
            &rows,
            TableOptions {
                max_width: Some(40),
                color: false,
            },
        );
        let row = out.lines().nth(2).unwrap_or_default();
        assert!(row.chars().count() <= 40);
        assert!(row.contains('…'));
    }

    #[test]
    fn color_wraps_known_states_only() {
        let rows = vec![vec!["delete".to_string()], vec!["orders".to_string()]];
        let out = render(
            &["change_type"],
            &rows,
            TableOptions {
                max_width: None,
                color: true,
            },
        );
        assert!(out.contains("\u{1b}[31mdelete"));
        assert!(!out.contains("\u{1b}[0morders"));
    }
}
