//! The validated, de-duplicated set of endpoints the engine may operate on.

use std::collections::{HashMap, HashSet};

use anyhow::Context;
use serde::Serialize;

use crate::core::endpoint::Endpoint;

/// A feed line that failed validation. Reported, never fatal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedLine {
    /// 1-based line number in the feed text.
    pub line_number: usize,
    pub text: String,
    pub reason: String,
}

/// Source of newline-separated endpoint text.
pub trait EndpointFeed {
    fn fetch(&self) -> anyhow::Result<String>;
}

/// Feed backed by a local text file.
pub struct FileFeed {
    path: std::path::PathBuf,
}

impl FileFeed {
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl EndpointFeed for FileFeed {
    fn fetch(&self) -> anyhow::Result<String> {
        std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read endpoint feed {}", self.path.display()))
    }
}

/// Endpoints in feed order, first occurrence wins.
#[derive(Debug, Default)]
pub struct Catalog {
    entries: Vec<Endpoint>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// Classify every non-blank line as a single address or a range.
    pub fn parse(raw: &str) -> (Self, Vec<RejectedLine>) {
        let mut catalog = Catalog::default();
        let mut rejected = Vec::new();

        for (idx, line) in raw.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match line.parse::<Endpoint>() {
                Ok(endpoint) => {
                    if !catalog.insert(endpoint) {
                        tracing::debug!("Skipping duplicate endpoint {endpoint} on line {}", idx + 1);
                    }
                }
                Err(e) => rejected.push(RejectedLine {
                    line_number: idx + 1,
                    text: line.to_string(),
                    reason: e.to_string(),
                }),
            }
        }

        (catalog, rejected)
    }

    /// Fetch from a feed and parse, logging every rejected line.
    pub fn load(feed: &dyn EndpointFeed) -> anyhow::Result<(Self, Vec<RejectedLine>)> {
        let text = feed.fetch()?;
        let (catalog, rejected) = Self::parse(&text);
        for r in &rejected {
            tracing::warn!("Rejected feed line {}: '{}' ({})", r.line_number, r.text, r.reason);
        }
        tracing::info!(
            "Loaded {} entries ({} IPs, {} ranges), {} rejected",
            catalog.len(),
            catalog.single_count(),
            catalog.range_count(),
            rejected.len()
        );
        Ok((catalog, rejected))
    }

    fn insert(&mut self, endpoint: Endpoint) -> bool {
        let key = endpoint.key();
        if self.index.contains_key(&key) {
            return false;
        }
        self.index.insert(key, self.entries.len());
        self.entries.push(endpoint);
        true
    }

    pub fn get(&self, key: &str) -> Option<&Endpoint> {
        self.index.get(key).map(|&i| &self.entries[i])
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Canonical keys of every entry.
    pub fn key_set(&self) -> HashSet<String> {
        self.index.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Endpoint> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn single_count(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_range()).count()
    }

    pub fn range_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_range()).count()
    }
}
