/// Database access layer
///
/// Free functions over a `PgPool`, one module per table. Every read filters
/// soft-deleted rows (`deleted_at IS NULL`) unless its name says otherwise.
pub mod comment_repo;
pub mod donation_repo;
pub mod follow_repo;
pub mod like_comment_repo;
pub mod like_repo;
pub mod post_repo;
pub mod user_repo;

/// Turn a free-text filter into an `ILIKE` pattern matching it as a substring.
///
/// Blank filters yield `None` (no filtering). LIKE metacharacters in the input
/// are escaped so they match literally.
pub fn contains_pattern(filter: Option<&str>) -> Option<String> {
    let filter = filter.map(str::trim).filter(|f| !f.is_empty())?;
    let mut pattern = String::with_capacity(filter.len() + 2);
    pattern.push('%');
    for ch in filter.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    Some(pattern)
}
