//! Article listing helpers: keyword search, per-author filtering, ordering
//! and match highlighting.

use std::cmp::Reverse;

use folio_core::constants::TITLE_MAX_CHARS;
use folio_core::error::{FolioError, Result};
use folio_core::types::{truncate_chars, Article};

/// Trims and lowercases a search query, rejecting an empty one.
pub fn normalize_query(query: &str) -> Result<String> {
    let keyword = query.trim().to_lowercase();
    if keyword.is_empty() {
        return Err(FolioError::ValidationError(
            "search keyword is required".into(),
        ));
    }
    Ok(keyword)
}

/// Articles whose title, content or tags contain `query`, case-insensitively.
pub fn filter(articles: &[Article], query: &str) -> Result<Vec<Article>> {
    let keyword = normalize_query(query)?;
    Ok(articles
        .iter()
        .filter(|a| a.matches_keyword(&keyword))
        .cloned()
        .collect())
}

/// Articles written by `user_id`.
pub fn by_user(articles: &[Article], user_id: &str) -> Vec<Article> {
    articles
        .iter()
        .filter(|a| a.is_owned_by(user_id))
        .cloned()
        .collect()
}

/// Sorts by publication date, newest first. Undated articles go last and
/// keep their relative order.
pub fn newest_first(mut articles: Vec<Article>) -> Vec<Article> {
    articles.sort_by_key(|a| (a.published_at.is_none(), Reverse(a.published_at)));
    articles
}

/// Title shortened for compact listings.
pub fn truncate_title(title: &str) -> String {
    truncate_chars(title, TITLE_MAX_CHARS)
}

/// Escapes text for inclusion in HTML.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn fold(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

/// Escapes `text` and wraps every case-insensitive occurrence of `keyword`
/// in `<mark>` tags, keeping the original casing.
pub fn highlight(text: &str, keyword: &str) -> String {
    let needle: Vec<char> = keyword.trim().chars().map(fold).collect();
    if needle.is_empty() {
        return escape_html(text);
    }

    let chars: Vec<char> = text.chars().collect();
    let folded: Vec<char> = chars.iter().copied().map(fold).collect();

    let mut out = String::with_capacity(text.len());
    let mut plain_start = 0;
    let mut i = 0;
    while i + needle.len() <= chars.len() {
        if folded[i..i + needle.len()] == needle[..] {
            out.push_str(&escape_html(&chars[plain_start..i].iter().collect::<String>()));
            out.push_str("<mark>");
            out.push_str(&escape_html(&chars[i..i + needle.len()].iter().collect::<String>()));
            out.push_str("</mark>");
            i += needle.len();
            plain_start = i;
        } else {
            i += 1;
        }
    }
    out.push_str(&escape_html(&chars[plain_start..].iter().collect::<String>()));
    out
}
