//! Debounced country dial-code lookup.
//!
//! Every keystroke calls [`CountryCodeLookup::search`]. A call waits out the
//! debounce window and only then asks the directory; a newer keystroke
//! aborts whatever request is still running and makes every older call
//! resolve to `None`, so stale results are never applied.

use async_trait::async_trait;
use murmur_core::Result;
use murmur_core::config::LookupConfig;
use murmur_execution::Generation;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// A directory entry: one country and its international dialing prefix.
///
/// Dial codes are `root + suffix`, e.g. root `+4` and suffix `4` for `+44`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryRecord {
    pub name: String,
    pub root: String,
    pub suffixes: Vec<String>,
}

impl CountryRecord {
    pub fn new(name: &str, root: &str, suffixes: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            root: root.to_string(),
            suffixes: suffixes.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// One option per dial code. Records without a root or suffixes have none.
    pub fn options(&self) -> Vec<CountryOption> {
        if self.root.is_empty() {
            return Vec::new();
        }
        self.suffixes
            .iter()
            .map(|suffix| CountryOption::new(&self.name, &format!("{}{}", self.root, suffix)))
            .collect()
    }
}

/// A selectable dial code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryOption {
    /// `Name (+dial)`
    pub label: String,
    /// `+dial`
    pub value: String,
}

impl CountryOption {
    pub fn new(name: &str, dial: &str) -> Self {
        Self {
            label: format!("{} ({})", name, dial),
            value: dial.to_string(),
        }
    }
}

/// Offered before the user types anything.
pub fn default_options() -> Vec<CountryOption> {
    vec![
        CountryOption::new("India", "+91"),
        CountryOption::new("United States", "+1"),
        CountryOption::new("United Kingdom", "+44"),
    ]
}

/// Source of country records matching a name fragment.
#[async_trait]
pub trait CountryDirectory: Send + Sync {
    /// Returns records whose name matches `query`.
    ///
    /// Implementations that do real I/O should stop early once `cancel`
    /// fires; the lookup discards the result either way.
    async fn search(&self, query: &str, cancel: CancellationToken) -> Result<Vec<CountryRecord>>;
}

/// Fixed in-process table, matched case-insensitively by substring.
#[derive(Debug, Clone)]
pub struct StaticCountryDirectory {
    records: Vec<CountryRecord>,
}

impl StaticCountryDirectory {
    pub fn new(records: Vec<CountryRecord>) -> Self {
        Self { records }
    }
}

impl Default for StaticCountryDirectory {
    fn default() -> Self {
        Self::new(vec![
            CountryRecord::new("Australia", "+6", &["1"]),
            CountryRecord::new("Bangladesh", "+8", &["80"]),
            CountryRecord::new("Brazil", "+5", &["5"]),
            CountryRecord::new("Canada", "+1", &[""]),
            CountryRecord::new("China", "+8", &["6"]),
            CountryRecord::new("France", "+3", &["3"]),
            CountryRecord::new("Germany", "+4", &["9"]),
            CountryRecord::new("India", "+9", &["1"]),
            CountryRecord::new("Indonesia", "+6", &["2"]),
            CountryRecord::new("Ireland", "+3", &["53"]),
            CountryRecord::new("Italy", "+3", &["9"]),
            CountryRecord::new("Japan", "+8", &["1"]),
            CountryRecord::new("Kazakhstan", "+7", &["6", "7"]),
            CountryRecord::new("Mexico", "+5", &["2"]),
            CountryRecord::new("Nepal", "+9", &["77"]),
            CountryRecord::new("Netherlands", "+3", &["1"]),
            CountryRecord::new("Pakistan", "+9", &["2"]),
            CountryRecord::new("Russia", "+7", &["3", "4", "5", "8", "9"]),
            CountryRecord::new("Singapore", "+6", &["5"]),
            CountryRecord::new("South Africa", "+2", &["7"]),
            CountryRecord::new("Spain", "+3", &["4"]),
            CountryRecord::new("Sri Lanka", "+9", &["4"]),
            CountryRecord::new("United Arab Emirates", "+9", &["71"]),
            CountryRecord::new("United Kingdom", "+4", &["4"]),
            CountryRecord::new("United States", "+1", &["201", "202", "203", "205"]),
            CountryRecord::new("United States Minor Outlying Islands", "+2", &["68"]),
        ])
    }
}

#[async_trait]
impl CountryDirectory for StaticCountryDirectory {
    async fn search(&self, query: &str, _cancel: CancellationToken) -> Result<Vec<CountryRecord>> {
        let needle = query.trim().to_lowercase();
        Ok(self
            .records
            .iter()
            .filter(|record| record.name.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }
}

/// Debounced, abortable search over a [`CountryDirectory`].
pub struct CountryCodeLookup {
    directory: Arc<dyn CountryDirectory>,
    debounce: Duration,
    generation: Generation,
    in_flight: Mutex<Option<CancellationToken>>,
}

impl CountryCodeLookup {
    pub fn new(directory: Arc<dyn CountryDirectory>, config: &LookupConfig) -> Self {
        Self {
            directory,
            debounce: config.debounce(),
            generation: Generation::new(),
            in_flight: Mutex::new(None),
        }
    }

    fn replace_in_flight(&self, next: Option<CancellationToken>) {
        let mut slot = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(previous) = std::mem::replace(&mut *slot, next) {
            previous.cancel();
        }
    }

    /// Returns the options for `query`, or `None` if a newer call superseded
    /// this one. Blank queries yield [`default_options`].
    pub async fn search(&self, query: &str) -> Result<Option<Vec<CountryOption>>> {
        let ticket = self.generation.begin();
        self.replace_in_flight(None);

        tokio::time::sleep(self.debounce).await;
        if !self.generation.is_current(ticket) {
            tracing::debug!(target: "country_lookup", query, "Superseded during debounce");
            return Ok(None);
        }

        if query.trim().is_empty() {
            return Ok(Some(default_options()));
        }

        let token = CancellationToken::new();
        self.replace_in_flight(Some(token.clone()));

        let records = tokio::select! {
            _ = token.cancelled() => {
                tracing::debug!(target: "country_lookup", query, "Request aborted");
                return Ok(None);
            }
            result = self.directory.search(query, token.clone()) => result?,
        };

        if !self.generation.is_current(ticket) || token.is_cancelled() {
            tracing::debug!(target: "country_lookup", query, "Dropping stale results");
            return Ok(None);
        }

        let mut seen = HashSet::new();
        let options: Vec<CountryOption> = records
            .iter()
            .flat_map(CountryRecord::options)
            .filter(|option| seen.insert(option.value.clone()))
            .collect();

        tracing::debug!(target: "country_lookup", query, count = options.len(), "Lookup resolved");
        Ok(Some(options))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Directory that takes a while to answer and records what it saw.
    struct SlowDirectory {
        inner: StaticCountryDirectory,
        latency: Duration,
        calls: AtomicUsize,
    }

    impl SlowDirectory {
        fn new(latency: Duration) -> Self {
            Self {
                inner: StaticCountryDirectory::default(),
                latency,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CountryDirectory for SlowDirectory {
        async fn search(
            &self,
            query: &str,
            cancel: CancellationToken,
        ) -> Result<Vec<CountryRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::select! {
                _ = cancel.cancelled() => Ok(Vec::new()),
                _ = tokio::time::sleep(self.latency) => self.inner.search(query, cancel.clone()).await,
            }
        }
    }

    fn lookup(directory: Arc<dyn CountryDirectory>) -> Arc<CountryCodeLookup> {
        Arc::new(CountryCodeLookup::new(directory, &LookupConfig::default()))
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_query_returns_defaults() {
        let lookup = lookup(Arc::new(StaticCountryDirectory::default()));
        let options = lookup.search("  ").await.unwrap().unwrap();
        assert_eq!(options, default_options());
        assert_eq!(options[0].label, "India (+91)");
    }

    #[tokio::test(start_paused = true)]
    async fn test_labels_and_dedup() {
        let lookup = lookup(Arc::new(StaticCountryDirectory::default()));
        let options = lookup.search("united").await.unwrap().unwrap();

        let values: Vec<&str> = options.iter().map(|o| o.value.as_str()).collect();
        assert_eq!(values.iter().filter(|v| **v == "+1201").count(), 1);
        assert!(options.iter().any(|o| o.label == "United Kingdom (+44)"));
        assert!(options.iter().any(|o| o.label == "United Arab Emirates (+971)"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_dial_codes_keep_first_seen() {
        let directory = StaticCountryDirectory::new(vec![
            CountryRecord::new("Kazakhstan", "+7", &["6", "7"]),
            CountryRecord::new("Russia", "+7", &["7", "9"]),
        ]);
        let lookup = lookup(Arc::new(directory));
        let options = lookup.search("a").await.unwrap().unwrap();

        let labels: Vec<&str> = options.iter().map(|o| o.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["Kazakhstan (+76)", "Kazakhstan (+77)", "Russia (+79)"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_keystrokes_within_debounce_hit_directory_once() {
        let directory = Arc::new(SlowDirectory::new(Duration::from_millis(10)));
        let lookup = lookup(directory.clone());

        let first = tokio::spawn({
            let lookup = lookup.clone();
            async move { lookup.search("in").await }
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        let second = lookup.search("ind").await.unwrap();

        assert!(first.await.unwrap().unwrap().is_none());
        let options = second.unwrap();
        assert!(options.iter().any(|o| o.value == "+91"));
        assert_eq!(directory.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_keystroke_aborts_in_flight_request() {
        let directory = Arc::new(SlowDirectory::new(Duration::from_secs(5)));
        let lookup = lookup(directory.clone());

        let first = tokio::spawn({
            let lookup = lookup.clone();
            async move { lookup.search("ja").await }
        });
        // Past the debounce; the first request is now in flight
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(directory.calls.load(Ordering::SeqCst), 1);

        let second = tokio::spawn({
            let lookup = lookup.clone();
            async move { lookup.search("japan").await }
        });

        assert!(first.await.unwrap().unwrap().is_none());

        let options = second.await.unwrap().unwrap().unwrap();
        assert_eq!(options, vec![CountryOption::new("Japan", "+81")]);
        assert_eq!(directory.calls.load(Ordering::SeqCst), 2);
    }
}
