use serde::Serialize;

use super::tcin::PAGE_SIZE;

/// One TCIN seen in the search results for a keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResultRecord {
    pub tcin: String,
    /// 1-based rank across every page crawled for the keyword.
    pub position: u32,
    pub page: u32,
}

impl SearchResultRecord {
    /// Records for the TCINs of one page, in extraction order.
    pub fn from_page(page: u32, tcins: Vec<String>) -> Vec<SearchResultRecord> {
        let offset = page_offset(page);
        tcins
            .into_iter()
            .enumerate()
            .map(|(index, tcin)| SearchResultRecord {
                tcin,
                position: offset + index as u32 + 1,
                page,
            })
            .collect()
    }
}

/// Number of results that precede `page` (1-based).
pub fn page_offset(page: u32) -> u32 {
    page.saturating_sub(1) * PAGE_SIZE as u32
}

/// Why a keyword's crawl stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Termination {
    /// A page came back with fewer than a full page of results.
    LastPage { page: u32 },
    /// `max_pages` pages were crawled.
    PageBudget { page: u32 },
    RetryExhausted {
        page: u32,
        attempts: u32,
        error: String,
    },
    SessionFailed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeywordResult {
    pub keyword: String,
    pub records: Vec<SearchResultRecord>,
    pub pages_fetched: u32,
    pub termination: Termination,
}

impl KeywordResult {
    pub fn failed(keyword: &str, error: String) -> Self {
        KeywordResult {
            keyword: keyword.to_string(),
            records: vec![],
            pages_fetched: 0,
            termination: Termination::SessionFailed { error },
        }
    }

    pub fn first_record_for(&self, tcin: &str) -> Option<&SearchResultRecord> {
        self.records.iter().find(|record| record.tcin == tcin)
    }
}

/// Per-keyword results in crawl order. Every requested keyword has an entry,
/// failed ones included.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KeywordResultSet {
    results: Vec<KeywordResult>,
}

impl KeywordResultSet {
    pub fn new() -> Self {
        KeywordResultSet::default()
    }

    /// Replaces an existing entry for the same keyword.
    pub fn insert(&mut self, result: KeywordResult) {
        match self
            .results
            .iter_mut()
            .find(|existing| existing.keyword == result.keyword)
        {
            Some(existing) => *existing = result,
            None => self.results.push(result),
        }
    }

    pub fn get(&self, keyword: &str) -> Option<&KeywordResult> {
        self.results.iter().find(|result| result.keyword == keyword)
    }

    pub fn records(&self, keyword: &str) -> &[SearchResultRecord] {
        self.get(keyword)
            .map(|result| result.records.as_slice())
            .unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeywordResult> {
        self.results.iter()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{KeywordResult, KeywordResultSet, SearchResultRecord, Termination};

    #[test]
    fn positions_follow_page_offset() {
        let records = SearchResultRecord::from_page(3, vec!["a".into(), "b".into()]);

        assert_eq!(records[0].position, 49);
        assert_eq!(records[1].position, 50);
        assert!(records.iter().all(|r| r.page == 3));
    }

    #[test]
    fn insert_keeps_crawl_order_and_replaces() {
        let mut set = KeywordResultSet::new();
        set.insert(KeywordResult::failed("b", "down".into()));
        set.insert(KeywordResult::failed("a", "down".into()));
        set.insert(KeywordResult {
            keyword: "b".into(),
            records: SearchResultRecord::from_page(1, vec!["1".into()]),
            pages_fetched: 1,
            termination: Termination::LastPage { page: 1 },
        });

        let keywords: Vec<&str> = set.iter().map(|r| r.keyword.as_str()).collect();
        assert_eq!(keywords, vec!["b", "a"]);
        assert_eq!(set.records("b").len(), 1);
        assert!(set.records("a").is_empty());
        assert!(set.records("missing").is_empty());
    }
}
