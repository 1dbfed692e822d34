use thiserror::Error;
use tokio::time;
use url::Url;

use crate::{
    configuration::SearchSettings,
    domain::{
        search_result::{page_offset, KeywordResult, SearchResultRecord, Termination},
        tcin::{extract_tcins, PAGE_SIZE, RESULTS_READY_SELECTOR},
    },
};

use super::{FetchError, PageFetcher, ProgressEvent, ProgressSink, ReadyCondition};

#[derive(Debug, Error)]
pub enum SearchError {
    /// The browser session died mid-crawl. Records gathered before that are kept.
    #[error("Browser session failed while searching '{keyword}': {error}")]
    SessionFailure {
        keyword: String,
        error: FetchError,
        records: Vec<SearchResultRecord>,
    },
}

enum PageFailure {
    Exhausted { attempts: u32, error: FetchError },
    Session(FetchError),
}

/// Crawls the paginated results of one keyword, one page at a time.
pub struct KeywordSearcher {
    base_url: Url,
    settings: SearchSettings,
}

impl KeywordSearcher {
    pub fn new(settings: SearchSettings) -> Result<Self, url::ParseError> {
        let base_url = Url::parse(&settings.base_url)?;
        Ok(KeywordSearcher { base_url, settings })
    }

    pub fn search_url(&self, keyword: &str, page: u32) -> String {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("searchTerm", keyword)
            .append_pair("Nao", &page_offset(page).to_string());
        url.to_string()
    }

    /// Collects ranked records for `keyword` over at most `max_pages` pages.
    ///
    /// Stops early on a short page. A page that keeps failing past `max_retries`
    /// ends the crawl with whatever was already collected.
    pub async fn search(
        &self,
        fetcher: &dyn PageFetcher,
        keyword: &str,
        max_pages: u32,
        progress: &dyn ProgressSink,
    ) -> Result<KeywordResult, SearchError> {
        let mut records: Vec<SearchResultRecord> = vec![];
        let mut pages_fetched = 0;

        for page in 1..=max_pages {
            let tcins = match self
                .fetch_page(fetcher, keyword, page, max_pages, progress)
                .await
            {
                Ok(tcins) => tcins,
                Err(PageFailure::Exhausted { attempts, error }) => {
                    progress.report(ProgressEvent::RetryExhausted {
                        keyword: keyword.to_string(),
                        page,
                        attempts,
                        error: error.to_string(),
                    });
                    return Ok(KeywordResult {
                        keyword: keyword.to_string(),
                        records,
                        pages_fetched,
                        termination: Termination::RetryExhausted {
                            page,
                            attempts,
                            error: error.to_string(),
                        },
                    });
                }
                Err(PageFailure::Session(error)) => {
                    return Err(SearchError::SessionFailure {
                        keyword: keyword.to_string(),
                        error,
                        records,
                    });
                }
            };

            let found = tcins.len();
            records.extend(SearchResultRecord::from_page(page, tcins));
            pages_fetched = page;

            progress.report(ProgressEvent::PageFinished {
                keyword: keyword.to_string(),
                page,
                max_pages,
                found,
                fraction: page as f64 / max_pages as f64,
            });

            let termination = if found < PAGE_SIZE {
                Some(Termination::LastPage { page })
            } else if page == max_pages {
                Some(Termination::PageBudget { page })
            } else {
                None
            };

            if let Some(termination) = termination {
                return Ok(KeywordResult {
                    keyword: keyword.to_string(),
                    records,
                    pages_fetched,
                    termination,
                });
            }

            time::sleep(self.settings.inter_page_delay()).await;
        }

        Ok(KeywordResult {
            keyword: keyword.to_string(),
            records,
            pages_fetched,
            termination: Termination::PageBudget {
                page: pages_fetched,
            },
        })
    }

    async fn fetch_page(
        &self,
        fetcher: &dyn PageFetcher,
        keyword: &str,
        page: u32,
        max_pages: u32,
        progress: &dyn ProgressSink,
    ) -> Result<Vec<String>, PageFailure> {
        let url = self.search_url(keyword, page);
        let ready = ReadyCondition {
            selector: RESULTS_READY_SELECTOR,
            timeout: self.settings.ready_timeout(),
            settle: self.settings.settle_delay(),
        };
        let mut attempt = 0;

        loop {
            attempt += 1;
            progress.report(ProgressEvent::PageStarted {
                keyword: keyword.to_string(),
                page,
                max_pages,
                attempt,
            });
            log::debug!("Fetching {} (attempt {})", url, attempt);

            match fetcher.fetch(&url, ready).await {
                Ok(html) => return Ok(extract_tcins(&html)),
                Err(error) if error.is_session_failure() => {
                    return Err(PageFailure::Session(error));
                }
                Err(error) => {
                    if attempt > self.settings.max_retries {
                        return Err(PageFailure::Exhausted {
                            attempts: attempt,
                            error,
                        });
                    }
                    log::warn!(
                        "Page {} for '{}' failed on attempt {}: {}",
                        page,
                        keyword,
                        attempt,
                        error
                    );
                    time::sleep(self.settings.retry_backoff()).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        domain::search_result::Termination,
        services::{
            testing::{
                crash, full_page, instant_settings, results_page, tcin_run, timeout, Script,
                ScriptedFetcher,
            },
            ProgressEvent, RecordedProgress, SearchError,
        },
    };

    use super::KeywordSearcher;

    fn searcher() -> KeywordSearcher {
        KeywordSearcher::new(instant_settings()).unwrap()
    }

    #[test]
    fn search_url_encodes_keyword_and_offset() {
        let url = searcher().search_url("juice box", 3);

        assert_eq!(url, "https://www.target.com/s?searchTerm=juice+box&Nao=48");
    }

    #[tokio::test]
    async fn short_page_ends_the_crawl() {
        let script = Script::new(vec![Ok(results_page(&tcin_run(1, 10))), Ok(full_page(100))]);
        let fetcher = ScriptedFetcher {
            script: script.clone(),
        };

        let result = searcher()
            .search(&fetcher, "y", 5, &RecordedProgress::default())
            .await
            .unwrap();

        assert_eq!(script.fetched().len(), 1);
        assert_eq!(result.records.len(), 10);
        assert_eq!(result.termination, Termination::LastPage { page: 1 });
    }

    #[tokio::test]
    async fn positions_are_absolute_across_pages() {
        let script = Script::new(vec![
            Ok(full_page(1000)),
            Ok(full_page(2000)),
            Ok(results_page(&tcin_run(3000, 5))),
        ]);
        let fetcher = ScriptedFetcher {
            script: script.clone(),
        };

        let result = searcher()
            .search(&fetcher, "apple juice", 3, &RecordedProgress::default())
            .await
            .unwrap();

        assert_eq!(result.records.len(), 53);
        for (index, record) in result.records.iter().enumerate() {
            let local = index as u32 - (record.page - 1) * 24;
            assert_eq!(record.position, (record.page - 1) * 24 + local + 1);
            assert_eq!(record.position, index as u32 + 1);
        }
        assert_eq!(result.records[24].tcin, "2000");
        assert_eq!(result.records[24].page, 2);
        assert!(script.fetched()[1].ends_with("Nao=24"));
    }

    #[tokio::test]
    async fn page_budget_stops_on_full_pages() {
        let script = Script::new(vec![Ok(full_page(1)), Ok(full_page(100)), Ok(full_page(200))]);
        let fetcher = ScriptedFetcher {
            script: script.clone(),
        };

        let result = searcher()
            .search(&fetcher, "kids drinks", 2, &RecordedProgress::default())
            .await
            .unwrap();

        assert_eq!(script.fetched().len(), 2);
        assert_eq!(result.termination, Termination::PageBudget { page: 2 });
    }

    #[tokio::test]
    async fn retries_then_succeeds_without_duplicates() {
        let script = Script::new(vec![
            Err(timeout()),
            Err(timeout()),
            Ok(results_page(&tcin_run(1, 3))),
        ]);
        let fetcher = ScriptedFetcher {
            script: script.clone(),
        };
        let progress = RecordedProgress::default();

        let result = searcher()
            .search(&fetcher, "fruit punch", 3, &progress)
            .await
            .unwrap();

        assert_eq!(script.fetched().len(), 3);
        assert_eq!(result.records.len(), 3);
        let attempts: Vec<u32> = progress
            .events()
            .into_iter()
            .filter_map(|event| match event {
                ProgressEvent::PageStarted { attempt, .. } => Some(attempt),
                _ => None,
            })
            .collect();
        assert_eq!(attempts, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn exhausted_retries_keep_earlier_pages() {
        let script = Script::new(vec![
            Ok(full_page(1)),
            Err(timeout()),
            Err(timeout()),
            Err(timeout()),
            Ok(full_page(500)),
        ]);
        let fetcher = ScriptedFetcher {
            script: script.clone(),
        };

        let result = searcher()
            .search(&fetcher, "good2grow", 5, &RecordedProgress::default())
            .await
            .unwrap();

        assert_eq!(script.fetched().len(), 4);
        assert_eq!(result.records.len(), 24);
        assert!(result.records.iter().all(|r| r.page == 1));
        assert!(matches!(
            result.termination,
            Termination::RetryExhausted {
                page: 2,
                attempts: 3,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn session_failure_is_raised_immediately() {
        let script = Script::new(vec![Ok(full_page(1)), Err(crash())]);
        let fetcher = ScriptedFetcher {
            script: script.clone(),
        };

        let error = searcher()
            .search(&fetcher, "juice box", 3, &RecordedProgress::default())
            .await
            .unwrap_err();

        assert_eq!(script.fetched().len(), 2);
        let SearchError::SessionFailure { records, .. } = error;
        assert_eq!(records.len(), 24);
    }

    #[tokio::test]
    async fn progress_reports_page_fractions() {
        let script = Script::new(vec![Ok(full_page(1)), Ok(results_page(&tcin_run(50, 2)))]);
        let fetcher = ScriptedFetcher { script };
        let progress = RecordedProgress::default();

        searcher()
            .search(&fetcher, "x", 4, &progress)
            .await
            .unwrap();

        let fractions: Vec<f64> = progress
            .events()
            .into_iter()
            .filter_map(|event| match event {
                ProgressEvent::PageFinished { fraction, .. } => Some(fraction),
                _ => None,
            })
            .collect();
        assert_eq!(fractions, vec![0.25, 0.5]);
    }
}
