// Reconciliation Engine - merge a remote quote snapshot into the catalog
//
// Matching rule: quote text is the key. Unmatched remote text is appended
// as a new quote; matched text with a different category is a conflict.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::catalog::{Catalog, Quote};

/// Synthetic category assigned to every remote-derived quote.
pub const SERVER_CATEGORY: &str = "Server";

const DEFAULT_FETCH_LIMIT: usize = 5;

// ============================================================================
// REMOTE FEED
// ============================================================================

/// One item of the remote snapshot. Only the title matters; the remote
/// source has its own schema and everything else is ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemotePost {
    #[serde(default)]
    pub title: String,
}

/// The remote collaborator: a bounded snapshot read and a non-durable
/// write sink.
#[async_trait]
pub trait QuoteFeed: Send + Sync {
    async fn fetch_snapshot(&self, limit: usize) -> Result<Vec<RemotePost>>;

    /// Push one quote to the remote sink. The response body is ignored;
    /// the remote does not persist across calls.
    async fn push_quote(&self, quote: &Quote) -> Result<()>;
}

/// `QuoteFeed` against a JSONPlaceholder-style HTTP endpoint.
pub struct HttpQuoteFeed {
    client: Client,
    base_url: String,
}

impl HttpQuoteFeed {
    pub fn new(base_url: impl Into<String>) -> Self {
        HttpQuoteFeed {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl QuoteFeed for HttpQuoteFeed {
    async fn fetch_snapshot(&self, limit: usize) -> Result<Vec<RemotePost>> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("_limit", limit.to_string())])
            .send()
            .await
            .context("fetch from remote source failed")?
            .error_for_status()
            .context("remote source returned an error status")?;

        let posts = response
            .json::<Vec<RemotePost>>()
            .await
            .context("remote snapshot is not a JSON array of posts")?;

        Ok(posts)
    }

    async fn push_quote(&self, quote: &Quote) -> Result<()> {
        self.client
            .post(&self.base_url)
            .json(quote)
            .send()
            .await
            .context("push to remote sink failed")?
            .error_for_status()
            .context("remote sink returned an error status")?;

        Ok(())
    }
}

// ============================================================================
// CONFLICT POLICY
// ============================================================================

/// What to do when local and remote share a text but disagree on category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Overwrite the local quote with the remote one and flag the conflict
    /// as resolved.
    RemoteWins,
    /// Leave the local quote untouched and only flag the conflict.
    PreserveLocal,
}

impl ConflictPolicy {
    pub fn name(&self) -> &'static str {
        match self {
            ConflictPolicy::RemoteWins => "remote-wins",
            ConflictPolicy::PreserveLocal => "preserve-local",
        }
    }
}

impl std::str::FromStr for ConflictPolicy {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "remote-wins" | "remote_wins" => Ok(ConflictPolicy::RemoteWins),
            "preserve-local" | "preserve_local" => Ok(ConflictPolicy::PreserveLocal),
            other => Err(format!("unknown conflict policy: {}", other)),
        }
    }
}

// ============================================================================
// MERGE
// ============================================================================

/// A local/remote category mismatch on the same text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub text: String,
    pub local_category: String,
    pub remote_category: String,
    /// Whether the remote value was applied (policy dependent).
    pub resolved: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    /// Remote quotes appended as new.
    pub added: usize,
    /// Category mismatches found, in snapshot order.
    pub conflicts: Vec<Conflict>,
    /// Local quotes whose text the snapshot did not contain, candidates
    /// for the push step.
    pub local_only: Vec<Quote>,
}

/// Map a raw snapshot into local quote shape. Items whose title trims to
/// empty are dropped.
pub fn map_snapshot(posts: Vec<RemotePost>) -> Vec<Quote> {
    posts
        .into_iter()
        .filter_map(|post| {
            let text = post.title.trim();
            if text.is_empty() {
                tracing::debug!("skipping remote item with blank title");
                None
            } else {
                Some(Quote::new(text, SERVER_CATEGORY))
            }
        })
        .collect()
}

/// Merge a mapped snapshot into the catalog under the given policy.
///
/// For each remote quote: unmatched text is appended as new (no conflict);
/// matched text with a different category records a `Conflict` and, under
/// `RemoteWins`, replaces the local quote in place. Identical text and
/// category is a no-op.
pub fn merge_snapshot(
    catalog: &mut Catalog,
    snapshot: Vec<Quote>,
    policy: ConflictPolicy,
) -> MergeOutcome {
    let mut outcome = MergeOutcome::default();

    let snapshot_texts: HashSet<String> =
        snapshot.iter().map(|quote| quote.text.clone()).collect();

    for remote in &snapshot {
        match catalog.position_by_text(&remote.text) {
            None => {
                catalog.append(remote.clone());
                outcome.added += 1;
            }
            Some(index) => {
                let local_category = catalog.quotes()[index].category.clone();
                if local_category != remote.category {
                    let resolved = policy == ConflictPolicy::RemoteWins;
                    outcome.conflicts.push(Conflict {
                        text: remote.text.clone(),
                        local_category,
                        remote_category: remote.category.clone(),
                        resolved,
                    });
                    if resolved {
                        catalog.replace_at(index, remote.clone());
                    }
                }
            }
        }
    }

    outcome.local_only = catalog
        .quotes()
        .iter()
        .filter(|quote| !snapshot_texts.contains(&quote.text))
        .cloned()
        .collect();

    outcome
}

// ============================================================================
// SYNC REPORT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    pub added: usize,
    pub conflicts: Vec<Conflict>,
    pub pushed: usize,
    pub synced_at: DateTime<Utc>,
}

impl SyncReport {
    pub fn new(outcome: MergeOutcome, pushed: usize) -> Self {
        SyncReport {
            added: outcome.added,
            conflicts: outcome.conflicts,
            pushed,
            synced_at: Utc::now(),
        }
    }

    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }

    /// Whether the merge changed the catalog, so displays need a refresh.
    pub fn changed(&self) -> bool {
        self.added > 0 || self.conflicts.iter().any(|conflict| conflict.resolved)
    }

    pub fn summary(&self) -> String {
        if self.has_conflicts() {
            let resolved = self
                .conflicts
                .iter()
                .filter(|conflict| conflict.resolved)
                .count();
            format!(
                "Sync finished with {} conflict(s) ({} resolved from server), {} new quote(s) added",
                self.conflicts.len(),
                resolved,
                self.added
            )
        } else {
            format!(
                "Quotes synced successfully with server: {} new, {} pushed",
                self.added, self.pushed
            )
        }
    }
}

// ============================================================================
// RECONCILER
// ============================================================================

pub struct Reconciler {
    feed: Box<dyn QuoteFeed>,
    policy: ConflictPolicy,
    fetch_limit: usize,
    push_after_merge: bool,
}

impl Reconciler {
    pub fn new(feed: Box<dyn QuoteFeed>) -> Self {
        Reconciler {
            feed,
            policy: ConflictPolicy::RemoteWins,
            fetch_limit: DEFAULT_FETCH_LIMIT,
            push_after_merge: true,
        }
    }

    pub fn with_policy(mut self, policy: ConflictPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_fetch_limit(mut self, limit: usize) -> Self {
        self.fetch_limit = limit;
        self
    }

    pub fn with_push(mut self, enabled: bool) -> Self {
        self.push_after_merge = enabled;
        self
    }

    pub fn policy(&self) -> ConflictPolicy {
        self.policy
    }

    /// Fetch the remote snapshot, already mapped into local quote shape.
    /// Any fetch or parse failure aborts the cycle here, before any
    /// catalog mutation.
    pub async fn fetch(&self) -> Result<Vec<Quote>> {
        let posts = self.feed.fetch_snapshot(self.fetch_limit).await?;
        Ok(map_snapshot(posts))
    }

    pub fn merge(&self, catalog: &mut Catalog, snapshot: Vec<Quote>) -> MergeOutcome {
        merge_snapshot(catalog, snapshot, self.policy)
    }

    /// Push local-only quotes to the remote sink one at a time,
    /// fire-and-forget. Individual failures are logged and skipped; they
    /// never fail the cycle. Returns the number of completed pushes.
    pub async fn push_local(&self, quotes: &[Quote]) -> usize {
        if !self.push_after_merge {
            return 0;
        }

        let mut pushed = 0;
        for quote in quotes {
            match self.feed.push_quote(quote).await {
                Ok(()) => pushed += 1,
                Err(error) => {
                    tracing::warn!(%error, text = %quote.text, "push to remote sink failed");
                }
            }
        }
        pushed
    }

    /// One full reconciliation cycle against a catalog the caller owns.
    pub async fn sync(&self, catalog: &mut Catalog) -> Result<SyncReport> {
        let snapshot = self.fetch().await?;
        tracing::debug!(remote = snapshot.len(), "merging remote snapshot");

        let outcome = self.merge(catalog, snapshot);
        let pushed = self.push_local(&outcome.local_only).await;

        let report = SyncReport::new(outcome, pushed);
        tracing::info!(
            added = report.added,
            conflicts = report.conflicts.len(),
            pushed = report.pushed,
            "sync cycle finished"
        );
        Ok(report)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FilterOptions;
    use anyhow::anyhow;
    use std::sync::Mutex;

    struct FakeFeed {
        titles: Vec<&'static str>,
        fail_fetch: bool,
        fail_push: bool,
        pushed: Mutex<Vec<Quote>>,
    }

    impl FakeFeed {
        fn with_titles(titles: Vec<&'static str>) -> Self {
            FakeFeed {
                titles,
                fail_fetch: false,
                fail_push: false,
                pushed: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl QuoteFeed for FakeFeed {
        async fn fetch_snapshot(&self, limit: usize) -> Result<Vec<RemotePost>> {
            if self.fail_fetch {
                return Err(anyhow!("connection refused"));
            }
            Ok(self
                .titles
                .iter()
                .take(limit)
                .map(|title| RemotePost {
                    title: title.to_string(),
                })
                .collect())
        }

        async fn push_quote(&self, quote: &Quote) -> Result<()> {
            if self.fail_push {
                return Err(anyhow!("write endpoint unavailable"));
            }
            self.pushed.lock().unwrap().push(quote.clone());
            Ok(())
        }
    }

    fn catalog_with(quotes: Vec<Quote>) -> Catalog {
        Catalog::from_quotes(quotes, FilterOptions::default())
    }

    #[test]
    fn test_merge_appends_new_and_overwrites_conflict_remote_wins() {
        let mut catalog = catalog_with(vec![Quote::new("A", "X")]);
        let snapshot = vec![
            Quote::new("A", SERVER_CATEGORY),
            Quote::new("B", SERVER_CATEGORY),
        ];

        let outcome = merge_snapshot(&mut catalog, snapshot, ConflictPolicy::RemoteWins);

        assert_eq!(outcome.added, 1);
        assert_eq!(outcome.conflicts.len(), 1);
        assert!(outcome.conflicts[0].resolved);
        assert_eq!(outcome.conflicts[0].local_category, "X");
        assert_eq!(outcome.conflicts[0].remote_category, SERVER_CATEGORY);

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.quotes()[0].category, SERVER_CATEGORY);
        assert_eq!(catalog.quotes()[1].text, "B");

        println!("✅ Merge test passed: 1 added, 1 conflict resolved");
    }

    #[test]
    fn test_merge_preserve_local_flags_without_overwrite() {
        let mut catalog = catalog_with(vec![Quote::new("A", "X")]);
        let snapshot = vec![Quote::new("A", SERVER_CATEGORY)];

        let outcome = merge_snapshot(&mut catalog, snapshot, ConflictPolicy::PreserveLocal);

        assert_eq!(outcome.conflicts.len(), 1);
        assert!(!outcome.conflicts[0].resolved);
        assert_eq!(catalog.quotes()[0].category, "X");
    }

    #[test]
    fn test_merge_identical_quote_is_noop() {
        let mut catalog = catalog_with(vec![Quote::new("A", SERVER_CATEGORY)]);
        let snapshot = vec![Quote::new("A", SERVER_CATEGORY)];

        let outcome = merge_snapshot(&mut catalog, snapshot, ConflictPolicy::RemoteWins);

        assert_eq!(outcome.added, 0);
        assert!(outcome.conflicts.is_empty());
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_merge_local_only_excludes_remote_matches() {
        let mut catalog = catalog_with(vec![
            Quote::new("shared", "X"),
            Quote::new("mine", "Local"),
        ]);
        let snapshot = vec![
            Quote::new("shared", SERVER_CATEGORY),
            Quote::new("theirs", SERVER_CATEGORY),
        ];

        let outcome = merge_snapshot(&mut catalog, snapshot, ConflictPolicy::RemoteWins);

        let local_texts: Vec<&str> = outcome
            .local_only
            .iter()
            .map(|quote| quote.text.as_str())
            .collect();
        assert_eq!(local_texts, vec!["mine"]);
    }

    #[test]
    fn test_map_snapshot_skips_blank_titles() {
        let posts = vec![
            RemotePost {
                title: "keep".to_string(),
            },
            RemotePost {
                title: "   ".to_string(),
            },
            RemotePost {
                title: String::new(),
            },
        ];

        let mapped = map_snapshot(posts);

        assert_eq!(mapped.len(), 1);
        assert_eq!(mapped[0], Quote::new("keep", SERVER_CATEGORY));
    }

    #[test]
    fn test_conflict_policy_parse() {
        assert_eq!(
            "remote-wins".parse::<ConflictPolicy>().unwrap(),
            ConflictPolicy::RemoteWins
        );
        assert_eq!(
            "Preserve_Local".parse::<ConflictPolicy>().unwrap(),
            ConflictPolicy::PreserveLocal
        );
        assert!("newest-wins".parse::<ConflictPolicy>().is_err());
    }

    #[tokio::test]
    async fn test_sync_fetch_failure_leaves_catalog_untouched() {
        let mut feed = FakeFeed::with_titles(vec!["never seen"]);
        feed.fail_fetch = true;
        let reconciler = Reconciler::new(Box::new(feed));

        let mut catalog = catalog_with(vec![Quote::new("A", "X")]);
        let before = catalog.quotes().to_vec();

        let result = reconciler.sync(&mut catalog).await;

        assert!(result.is_err());
        assert_eq!(catalog.quotes(), before.as_slice());
    }

    #[tokio::test]
    async fn test_sync_pushes_only_local_only_quotes() {
        let feed = Box::new(FakeFeed::with_titles(vec!["remote one"]));
        let reconciler = Reconciler::new(feed);

        let mut catalog = catalog_with(vec![Quote::new("local keeper", "Mine")]);
        let report = reconciler.sync(&mut catalog).await.unwrap();

        assert_eq!(report.added, 1);
        assert_eq!(report.pushed, 1);
        assert!(!report.has_conflicts());
        assert_eq!(catalog.len(), 2);
    }

    #[tokio::test]
    async fn test_sync_push_failures_do_not_fail_cycle() {
        let mut feed = FakeFeed::with_titles(vec!["remote one"]);
        feed.fail_push = true;
        let reconciler = Reconciler::new(Box::new(feed));

        let mut catalog = catalog_with(vec![Quote::new("local keeper", "Mine")]);
        let report = reconciler.sync(&mut catalog).await.unwrap();

        assert_eq!(report.pushed, 0);
        assert_eq!(catalog.len(), 2, "merge result is kept despite push failures");
    }

    #[tokio::test]
    async fn test_sync_respects_fetch_limit() {
        let feed = Box::new(FakeFeed::with_titles(vec!["a", "b", "c", "d"]));
        let reconciler = Reconciler::new(feed).with_fetch_limit(2).with_push(false);

        let mut catalog = catalog_with(vec![]);
        let report = reconciler.sync(&mut catalog).await.unwrap();

        assert_eq!(report.added, 2);
        assert_eq!(report.pushed, 0);
    }

    #[test]
    fn test_report_summary_wording_differs_on_conflict() {
        let clean = SyncReport::new(
            MergeOutcome {
                added: 2,
                conflicts: vec![],
                local_only: vec![],
            },
            1,
        );
        let conflicted = SyncReport::new(
            MergeOutcome {
                added: 0,
                conflicts: vec![Conflict {
                    text: "A".to_string(),
                    local_category: "X".to_string(),
                    remote_category: SERVER_CATEGORY.to_string(),
                    resolved: true,
                }],
                local_only: vec![],
            },
            0,
        );

        assert!(clean.summary().contains("synced successfully"));
        assert!(conflicted.summary().contains("conflict"));
        assert!(conflicted.changed());
    }
}
