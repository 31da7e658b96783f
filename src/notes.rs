//! Integration-notes lookup on the issue tracker.
//!
//! Every referenced ticket page is fetched and searched for an
//! "Integration notes" heading. One request per issue; the tracker offers
//! no bulk query for this.

use std::time::Duration;

use regex::Regex;
use tracing::{debug, info};

use depup::DepupError;

const NOTES_PATTERN: &str = r"(?i)Integration\s*notes";

pub struct NotesLookup {
    tracker_url: String,
    pattern: Regex,
    agent: ureq::Agent,
}

impl NotesLookup {
    pub fn new(tracker_url: &str, timeout: Option<Duration>) -> Result<Self, DepupError> {
        let pattern = Regex::new(NOTES_PATTERN).map_err(|source| DepupError::InvalidRegex {
            pattern: NOTES_PATTERN.to_string(),
            source,
        })?;
        let mut builder = ureq::AgentBuilder::new();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(NotesLookup {
            tracker_url: tracker_url.trim_end_matches('/').to_string(),
            pattern,
            agent: builder.build(),
        })
    }

    pub fn ticket_url(&self, issue_id: &str) -> String {
        format!("{}/ticket/{}", self.tracker_url, issue_id)
    }

    pub fn mentions_notes(&self, page: &str) -> bool {
        self.pattern.is_match(page)
    }

    /// Ticket URLs (in `issue_ids` order) whose page mentions integration
    /// notes.
    pub fn lookup(&self, issue_ids: &[String]) -> Result<Vec<String>, DepupError> {
        let mut found = Vec::new();
        for id in issue_ids {
            let url = self.ticket_url(id);
            debug!(url = %url, "Fetching ticket");
            let page = self.fetch(&url)?;
            if self.mentions_notes(&page) {
                info!(url = %url, "Integration notes found");
                found.push(url);
            }
        }
        Ok(found)
    }

    fn fetch(&self, url: &str) -> Result<String, DepupError> {
        let response = self.agent.get(url).call().map_err(|e| DepupError::Http {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        response.into_string().map_err(|e| DepupError::Http {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
#[path = "notes_tests.rs"]
mod tests;
