use itertools::Itertools;
use serde::Deserialize;
use thiserror::Error;

use crate::configuration::SearchSettings;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("Please enter at least one TCIN")]
    NoTcins,
    #[error("Please enter at least one keyword")]
    NoKeywords,
}

/// Raw input as submitted by a caller.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckRequest {
    pub tcins: Vec<String>,
    pub keywords: Vec<String>,
    pub max_pages: Option<u32>,
}

impl CheckRequest {
    /// One entry per line, the way the lists are typed into a text box.
    pub fn from_text(tcins: &str, keywords: &str, max_pages: Option<u32>) -> Self {
        CheckRequest {
            tcins: tcins.lines().map(str::to_string).collect(),
            keywords: keywords.lines().map(str::to_string).collect(),
            max_pages,
        }
    }

    pub fn into_plan(self, settings: &SearchSettings) -> Result<CheckPlan, RequestError> {
        let tcins = clean_entries(self.tcins);
        let keywords = clean_entries(self.keywords);

        if tcins.is_empty() {
            return Err(RequestError::NoTcins);
        }
        if keywords.is_empty() {
            return Err(RequestError::NoKeywords);
        }

        let limit = settings.max_pages_limit.max(1);
        let max_pages = self
            .max_pages
            .unwrap_or(settings.default_max_pages)
            .clamp(1, limit);

        Ok(CheckPlan {
            tcins,
            keywords,
            max_pages,
        })
    }
}

/// Validated input for one indexing run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckPlan {
    pub tcins: Vec<String>,
    pub keywords: Vec<String>,
    pub max_pages: u32,
}

impl CheckPlan {
    pub fn planned_searches(&self) -> usize {
        self.keywords.len() * self.max_pages as usize
    }
}

fn clean_entries(entries: Vec<String>) -> Vec<String> {
    entries
        .into_iter()
        .map(|entry| entry.trim().to_string())
        .filter(|entry| !entry.is_empty())
        .unique()
        .collect()
}
