use colored::*;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use bookfinder::BookRecord;

const TITLE_WIDTH: usize = 40;
const AUTHOR_WIDTH: usize = 24;
const CATEGORY_WIDTH: usize = 16;

/// Cut `s` to at most `max` display columns, marking the cut with `…`
pub fn truncate(s: &str, max: usize) -> String {
    if s.width() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > max {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push('…');
    out
}

/// Left-align to `width` display columns
fn pad(s: &str, width: usize) -> String {
    let cut = truncate(s, width);
    let fill = width.saturating_sub(cut.width());
    format!("{}{}", cut, " ".repeat(fill))
}

pub fn print_books(records: &[BookRecord]) {
    println!(
        "{} {} {} {:>8} {:>6}",
        pad("Title", TITLE_WIDTH).bold(),
        pad("Authors", AUTHOR_WIDTH).bold(),
        pad("Category", CATEGORY_WIDTH).bold(),
        "Price".bold(),
        "Year".bold()
    );
    println!(
        "{}",
        "-".repeat(TITLE_WIDTH + AUTHOR_WIDTH + CATEGORY_WIDTH + 18)
    );
    for r in records {
        let category = if r.category.is_empty() { "-" } else { &r.category };
        println!(
            "{} {} {} {:>8} {:>6}",
            pad(&r.title, TITLE_WIDTH).cyan(),
            pad(&r.authors, AUTHOR_WIDTH),
            pad(category, CATEGORY_WIDTH).dimmed(),
            format!("{:.2}", r.price),
            r.publish_year
        );
    }
}

pub fn print_more(matched: usize, shown: usize) {
    if matched > shown {
        println!();
        println!(
            "{}",
            format!("... and {} more matches", matched - shown).dimmed()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_ascii() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
    }

    #[test]
    fn test_truncate_wide_chars() {
        // each hangul syllable is two columns
        let cut = truncate("한국어책제목", 7);
        assert_eq!(cut, "한국어…");
        assert!(cut.width() <= 7);
    }

    #[test]
    fn test_pad_fills_to_width() {
        assert_eq!(pad("ab", 4), "ab  ");
        assert_eq!(pad("한", 4).width(), 4);
    }
}
