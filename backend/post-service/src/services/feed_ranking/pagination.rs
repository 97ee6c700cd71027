//! Cursor paging over a ranked list
//!
//! The cursor is the id of the last post the client received. Paging resumes
//! right after that post in the freshly ranked list. When the post is no longer
//! there the page restarts from the top and the resolution says so.

use uuid::Uuid;

use super::ranker::ScoredPost;
use crate::error::{AppError, Result};

/// Anything that can be located by a cursor.
pub trait CursorKey {
    fn cursor_key(&self) -> Uuid;
}

impl CursorKey for ScoredPost {
    fn cursor_key(&self) -> Uuid {
        self.id()
    }
}

/// How the request cursor mapped onto the ranked list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorResolution {
    /// No cursor was sent; first page.
    Start,
    /// Cursor found at `index`; the page starts right after it.
    Resumed { index: usize },
    /// Cursor not in the ranked list; restarted from the first page.
    Reset,
}

impl CursorResolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            CursorResolution::Start => "start",
            CursorResolution::Resumed { .. } => "resumed",
            CursorResolution::Reset => "reset",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FeedPage<T> {
    pub items: Vec<T>,
    /// Id of the last item on this page; `None` when the page is empty.
    pub next_cursor: Option<Uuid>,
    pub has_next: bool,
    /// Backward paging is not supported; always false.
    pub has_previous: bool,
    pub total_count: usize,
    pub resolution: CursorResolution,
}

/// Check a requested page size against the configured maximum.
pub fn validate_page_size(page_size: i64, max_page_size: usize) -> Result<usize> {
    if page_size <= 0 {
        return Err(AppError::Validation(
            "page_size must be a positive integer".into(),
        ));
    }
    let page_size = usize::try_from(page_size).unwrap_or(usize::MAX);
    if page_size > max_page_size {
        return Err(AppError::Validation(format!(
            "page_size must not exceed {}",
            max_page_size
        )));
    }
    Ok(page_size)
}

pub fn resolve_cursor<T: CursorKey>(ranked: &[T], cursor: Option<Uuid>) -> CursorResolution {
    match cursor {
        None => CursorResolution::Start,
        Some(cursor) => match ranked.iter().position(|item| item.cursor_key() == cursor) {
            Some(index) => CursorResolution::Resumed { index },
            None => CursorResolution::Reset,
        },
    }
}

/// Slice the page that follows `cursor` out of `ranked`.
///
/// `page_size` must already be validated (non-zero).
pub fn paginate<T: CursorKey>(
    ranked: Vec<T>,
    cursor: Option<Uuid>,
    page_size: usize,
) -> FeedPage<T> {
    let total_count = ranked.len();
    let resolution = resolve_cursor(&ranked, cursor);
    let start = match resolution {
        CursorResolution::Resumed { index } => index + 1,
        CursorResolution::Start | CursorResolution::Reset => 0,
    };

    let has_next = total_count > start.saturating_add(page_size);
    let items: Vec<T> = ranked.into_iter().skip(start).take(page_size).collect();
    let next_cursor = items.last().map(CursorKey::cursor_key);

    FeedPage {
        items,
        next_cursor,
        has_next,
        has_previous: false,
        total_count,
        resolution,
    }
}
