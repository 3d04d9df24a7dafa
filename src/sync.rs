//! Fire-and-forget push of the full lead list to a spreadsheet webhook.
//!
//! Best effort by design: a sync failure is logged and forgotten, and no
//! core operation ever waits on or fails because of it.

use std::time::Duration;

use reqwest::blocking::Client;

use crate::types::Lead;

const PUSH_TIMEOUT: Duration = Duration::from_secs(15);

pub struct SheetSync {
    url: String,
    client: Client,
}

impl SheetSync {
    /// `url` is the spreadsheet webhook endpoint. An empty string disables
    /// syncing entirely.
    pub fn new(url: impl Into<String>) -> Self {
        SheetSync {
            url: url.into(),
            client: Client::builder()
                .timeout(PUSH_TIMEOUT)
                .build()
                .unwrap_or_default(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.url.is_empty()
    }

    /// Push the current lead list. Returns whether the push landed;
    /// failures are logged, never propagated.
    pub fn push(&self, leads: &[Lead]) -> bool {
        if !self.is_configured() {
            return false;
        }
        match self.client.post(&self.url).json(&leads).send() {
            Ok(response) if response.status().is_success() => {
                log::info!("Synced {} leads to sheet", leads.len());
                true
            }
            Ok(response) => {
                log::warn!("Sheet sync rejected: HTTP {}", response.status());
                false
            }
            Err(e) => {
                log::warn!("Sheet sync failed: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_sync_is_a_no_op() {
        let sync = SheetSync::new("");
        assert!(!sync.is_configured());
        assert!(!sync.push(&[Lead::default()]));
    }

    #[test]
    fn unreachable_endpoint_reports_failure_without_panicking() {
        let sync = SheetSync::new("http://127.0.0.1:9/hook");
        assert!(!sync.push(&[Lead::default()]));
    }
}
