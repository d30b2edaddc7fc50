/// Task list filtering, search, and pagination
///
/// Turns raw query-string values into a validated [`TaskFilter`] and
/// [`PageRequest`], and computes page metadata once the total row count is
/// known. The SQL side lives in [`crate::models::task::Task::list`].
///
/// # Example
///
/// ```
/// use teamboard_shared::listing::{PageRequest, TaskFilter};
///
/// let filter = TaskFilter::default()
///     .with_statuses("todo,in_progress")
///     .unwrap()
///     .with_search(Some("  Invoice  "));
/// assert_eq!(filter.active_filter_count(), 1);
/// assert_eq!(filter.search_pattern().as_deref(), Some("%Invoice%"));
///
/// let page = PageRequest::new(Some(3), Some(10)).resolve(25);
/// assert_eq!(page.total_pages, 3);
/// assert!(!page.has_next_page);
/// ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::task::{TaskStatus, UnknownStatus};

/// Page size when the client doesn't ask for one
pub const DEFAULT_PER_PAGE: u32 = 10;

/// Largest page size a client may request
pub const MAX_PER_PAGE: u32 = 100;

/// Requested page, 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl PageRequest {
    /// Normalizes client input: page >= 1, 1 <= per_page <= MAX_PER_PAGE
    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE),
        }
    }

    /// Number of pages needed for `total_items` (0 when there are none)
    pub fn total_pages(&self, total_items: u64) -> u32 {
        let per_page = u64::from(self.per_page);
        let pages = total_items.div_ceil(per_page);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    /// Resolves the request against a known row count
    ///
    /// A page past the end is pulled back to the last page, so asking for
    /// page 9 of 3 shows page 3.
    pub fn resolve(&self, total_items: u64) -> PageInfo {
        let total_pages = self.total_pages(total_items);
        let current_page = self.page.min(total_pages.max(1));

        PageInfo {
            current_page,
            total_pages,
            total_items,
            items_per_page: self.per_page,
            has_next_page: current_page < total_pages,
            has_prev_page: current_page > 1,
        }
    }
}

/// Page metadata returned next to the items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_items: u64,
    pub items_per_page: u32,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl PageInfo {
    /// SQL OFFSET for this page
    pub fn offset(&self) -> i64 {
        i64::from(self.current_page - 1) * i64::from(self.items_per_page)
    }

    /// SQL LIMIT for this page
    pub fn limit(&self) -> i64 {
        i64::from(self.items_per_page)
    }
}

/// One page of results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,

    #[serde(flatten)]
    pub info: PageInfo,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, info: PageInfo) -> Self {
        Self { items, info }
    }
}

/// Filters applied to an organization's task list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    /// Allowed statuses; empty means any
    pub statuses: Vec<TaskStatus>,

    pub project_id: Option<Uuid>,

    pub assigned_to: Option<Uuid>,

    /// Raw search term; blank terms are dropped
    pub search: Option<String>,
}

impl TaskFilter {
    /// Sets the status filter from a comma-separated list ("todo,done")
    ///
    /// Blank entries are ignored and duplicates collapse, so `""` clears the
    /// filter.
    pub fn with_statuses(mut self, raw: &str) -> Result<Self, UnknownStatus> {
        let mut statuses = Vec::new();
        for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let status: TaskStatus = part.parse()?;
            if !statuses.contains(&status) {
                statuses.push(status);
            }
        }
        self.statuses = statuses;
        Ok(self)
    }

    pub fn with_search(mut self, term: Option<&str>) -> Self {
        self.search = term
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);
        self
    }

    /// Number of non-empty filters (the search term is not a filter)
    pub fn active_filter_count(&self) -> usize {
        [
            !self.statuses.is_empty(),
            self.project_id.is_some(),
            self.assigned_to.is_some(),
        ]
        .into_iter()
        .filter(|active| *active)
        .count()
    }

    /// Status names for binding as `text[]`, None when unfiltered
    pub fn status_names(&self) -> Option<Vec<String>> {
        if self.statuses.is_empty() {
            return None;
        }
        Some(self.statuses.iter().map(|s| s.as_str().to_string()).collect())
    }

    /// ILIKE pattern for the search term, with wildcards escaped
    pub fn search_pattern(&self) -> Option<String> {
        self.search.as_deref().map(|term| format!("%{}%", escape_like(term)))
    }
}

/// Escapes `\`, `%`, and `_` so they match literally in LIKE patterns
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_defaults_and_bounds() {
        assert_eq!(PageRequest::new(None, None), PageRequest::default());
        assert_eq!(PageRequest::new(Some(0), Some(0)), PageRequest { page: 1, per_page: 1 });
        assert_eq!(PageRequest::new(Some(2), Some(500)).per_page, MAX_PER_PAGE);
    }

    #[test]
    fn test_total_pages() {
        let req = PageRequest::new(None, Some(10));
        assert_eq!(req.total_pages(0), 0);
        assert_eq!(req.total_pages(1), 1);
        assert_eq!(req.total_pages(10), 1);
        assert_eq!(req.total_pages(11), 2);
    }

    #[test]
    fn test_resolve_middle_page() {
        let info = PageRequest::new(Some(2), Some(10)).resolve(35);
        assert_eq!(info.current_page, 2);
        assert_eq!(info.total_pages, 4);
        assert!(info.has_next_page);
        assert!(info.has_prev_page);
        assert_eq!(info.offset(), 10);
        assert_eq!(info.limit(), 10);
    }

    #[test]
    fn test_resolve_clamps_past_the_end() {
        let info = PageRequest::new(Some(9), Some(10)).resolve(25);
        assert_eq!(info.current_page, 3);
        assert!(!info.has_next_page);
        assert!(info.has_prev_page);
        assert_eq!(info.offset(), 20);
    }

    #[test]
    fn test_resolve_empty_list() {
        let info = PageRequest::new(Some(4), None).resolve(0);
        assert_eq!(info.current_page, 1);
        assert_eq!(info.total_pages, 0);
        assert_eq!(info.total_items, 0);
        assert!(!info.has_next_page);
        assert!(!info.has_prev_page);
        assert_eq!(info.offset(), 0);
    }

    #[test]
    fn test_page_serializes_flat() {
        let page = Page::new(vec![1, 2], PageRequest::default().resolve(2));
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["items"], serde_json::json!([1, 2]));
        assert_eq!(json["current_page"], 1);
        assert_eq!(json["total_items"], 2);
    }

    #[test]
    fn test_status_filter_parsing() {
        let filter = TaskFilter::default().with_statuses("todo, done,todo,").unwrap();
        assert_eq!(filter.statuses, vec![TaskStatus::Todo, TaskStatus::Done]);
        assert_eq!(
            filter.status_names(),
            Some(vec!["todo".to_string(), "done".to_string()])
        );

        let cleared = filter.with_statuses("").unwrap();
        assert!(cleared.statuses.is_empty());
        assert!(cleared.status_names().is_none());

        assert!(TaskFilter::default().with_statuses("todo,blocked").is_err());
    }

    #[test]
    fn test_active_filter_count() {
        let mut filter = TaskFilter::default().with_search(Some("report"));
        assert_eq!(filter.active_filter_count(), 0);

        filter.project_id = Some(Uuid::new_v4());
        filter.assigned_to = Some(Uuid::new_v4());
        let filter = filter.with_statuses("in_progress").unwrap();
        assert_eq!(filter.active_filter_count(), 3);
    }

    #[test]
    fn test_blank_search_is_ignored() {
        assert!(TaskFilter::default().with_search(Some("   ")).search.is_none());
        assert!(TaskFilter::default().with_search(None).search_pattern().is_none());
    }

    #[test]
    fn test_search_pattern_escapes_wildcards() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        let filter = TaskFilter::default().with_search(Some("100%"));
        assert_eq!(filter.search_pattern().as_deref(), Some("%100\\%%"));
    }
}
