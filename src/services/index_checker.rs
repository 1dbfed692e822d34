use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::{sync::Mutex, time};
use uuid::Uuid;

use crate::{
    configuration::SearchSettings,
    domain::{
        check_request::{CheckPlan, CheckRequest, RequestError},
        indexing_matrix::{IndexingMatrix, IndexingSummary, IndexingTable},
        search_result::{KeywordResult, KeywordResultSet},
    },
};

use super::{
    BrowserLauncher, FetchError, KeywordSearcher, PageFetcher, ProgressEvent, ProgressSink,
    SearchError,
};

#[derive(Debug, Error)]
pub enum CheckError {
    #[error(transparent)]
    InvalidRequest(#[from] RequestError),
    #[error("Browser session could not be recovered: {0}")]
    SessionUnrecoverable(FetchError),
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexingReport {
    pub run_id: Uuid,
    pub tcins: Vec<String>,
    pub keywords: Vec<String>,
    pub max_pages: u32,
    pub results: KeywordResultSet,
    pub matrix: IndexingMatrix,
    pub summary: IndexingSummary,
    pub table: IndexingTable,
}

/// Runs indexing checks: crawl every keyword with one browser session, then
/// build the TCIN x keyword matrix.
pub struct IndexChecker {
    launcher: Arc<dyn BrowserLauncher>,
    searcher: KeywordSearcher,
    settings: SearchSettings,
    // One crawl at a time against the site.
    run_gate: Mutex<()>,
}

impl IndexChecker {
    pub fn new(
        launcher: Arc<dyn BrowserLauncher>,
        settings: SearchSettings,
    ) -> Result<Self, url::ParseError> {
        let searcher = KeywordSearcher::new(settings.clone())?;
        Ok(IndexChecker {
            launcher,
            searcher,
            settings,
            run_gate: Mutex::new(()),
        })
    }

    pub async fn run(
        &self,
        request: CheckRequest,
        progress: &dyn ProgressSink,
    ) -> Result<IndexingReport, CheckError> {
        let plan = request.into_plan(&self.settings)?;
        self.run_plan(plan, progress).await
    }

    pub async fn run_plan(
        &self,
        plan: CheckPlan,
        progress: &dyn ProgressSink,
    ) -> Result<IndexingReport, CheckError> {
        let _gate = self.run_gate.lock().await;
        let run_id = Uuid::new_v4();
        log::info!(
            "[{}] Checking {} tcins across {} keywords ({} searches)",
            run_id,
            plan.tcins.len(),
            plan.keywords.len(),
            plan.planned_searches()
        );

        let fetcher = self.launcher.open().await.map_err(|e| {
            log::error!("[{}] Failed to initialize browser: {}", run_id, e);
            CheckError::SessionUnrecoverable(e)
        })?;
        let mut session = Some(fetcher);

        let crawl = self
            .crawl_keywords(run_id, &plan, &mut session, progress)
            .await;

        if let Some(fetcher) = session.take() {
            if let Err(e) = fetcher.close().await {
                log::warn!("[{}] Failed to close browser: {}", run_id, e);
            }
        }

        let results = crawl?;
        let matrix = IndexingMatrix::build(&plan.tcins, &plan.keywords, &results);
        let summary = matrix.summary();
        let table = matrix.to_table(&plan.keywords);

        log::info!(
            "[{}] Done: found {} of {} checks ({})",
            run_id,
            summary.found,
            summary.total_checks,
            summary.success_rate_display
        );

        Ok(IndexingReport {
            run_id,
            tcins: plan.tcins,
            keywords: plan.keywords,
            max_pages: plan.max_pages,
            results,
            matrix,
            summary,
            table,
        })
    }

    async fn crawl_keywords(
        &self,
        run_id: Uuid,
        plan: &CheckPlan,
        session: &mut Option<Box<dyn PageFetcher>>,
        progress: &dyn ProgressSink,
    ) -> Result<KeywordResultSet, CheckError> {
        let mut results = KeywordResultSet::new();
        let total = plan.keywords.len();

        for (index, keyword) in plan.keywords.iter().enumerate() {
            log::info!("[{}] Searching: {}", run_id, keyword);

            let result = self
                .search_with_recovery(run_id, keyword, plan.max_pages, session, progress)
                .await?;
            let found = result.records.len();
            results.insert(result);

            progress.report(ProgressEvent::KeywordFinished {
                keyword: keyword.clone(),
                index,
                total,
                found,
                fraction: (index + 1) as f64 / total as f64,
            });

            if index + 1 < total {
                time::sleep(self.settings.inter_keyword_delay()).await;
            }
        }

        Ok(results)
    }

    /// A dead session is replaced once per keyword and the keyword restarts
    /// from page 1. A second failure only costs this keyword.
    async fn search_with_recovery(
        &self,
        run_id: Uuid,
        keyword: &str,
        max_pages: u32,
        session: &mut Option<Box<dyn PageFetcher>>,
        progress: &dyn ProgressSink,
    ) -> Result<KeywordResult, CheckError> {
        let first_failure = {
            let fetcher = open_session(session)?;
            match self
                .searcher
                .search(fetcher, keyword, max_pages, progress)
                .await
            {
                Ok(result) => return Ok(result),
                Err(SearchError::SessionFailure { error, .. }) => error,
            }
        };

        progress.report(ProgressEvent::SessionRestarted {
            keyword: keyword.to_string(),
            reason: first_failure.to_string(),
        });
        self.restart_session(run_id, session).await?;

        let fetcher = open_session(session)?;
        match self
            .searcher
            .search(fetcher, keyword, max_pages, progress)
            .await
        {
            Ok(result) => Ok(result),
            Err(SearchError::SessionFailure { error, .. }) => {
                log::error!(
                    "[{}] Giving up on '{}' after browser restart: {}",
                    run_id,
                    keyword,
                    error
                );
                Ok(KeywordResult::failed(keyword, error.to_string()))
            }
        }
    }

    async fn restart_session(
        &self,
        run_id: Uuid,
        session: &mut Option<Box<dyn PageFetcher>>,
    ) -> Result<(), CheckError> {
        if let Some(crashed) = session.take() {
            if let Err(e) = crashed.close().await {
                log::debug!("[{}] Closing crashed browser failed: {}", run_id, e);
            }
        }

        let fresh = self.launcher.open().await.map_err(|e| {
            log::error!("[{}] Failed to reinitialize browser: {}", run_id, e);
            CheckError::SessionUnrecoverable(e)
        })?;
        *session = Some(fresh);

        Ok(())
    }
}

fn open_session(
    session: &Option<Box<dyn PageFetcher>>,
) -> Result<&dyn PageFetcher, CheckError> {
    session.as_deref().ok_or_else(|| {
        CheckError::SessionUnrecoverable(FetchError::Session(
            "no open browser session".to_string(),
        ))
    })
}
