//! Directory listings for the file browser.
//!
//! Listing content comes from an external provider (local walk, remote
//! index), asynchronously. Same shape as the frame plumbing: requests go out
//! through a provider seam, completions come back on a channel and are
//! drained by an explicit [`DirectoryListing::pump`] call, which publishes
//! `listing_loaded` for the browser to consume.

use std::sync::{Arc, Mutex};

use crossbeam_channel::{unbounded, Receiver, Sender};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::signal::Signal;

/// One row of a directory listing.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DirEntry {
    /// Full path, used as the navigation target for directories.
    pub path: String,
    pub name: String,
    pub dir: bool,
    /// File size in bytes; meaningless for directories.
    #[serde(default)]
    pub size: u64,
    /// The provider saw the entry but may not read it.
    #[serde(default)]
    pub restricted: bool,
}

/// Completion message from a listing provider.
#[derive(Clone, Debug)]
pub struct ListingDone {
    pub path: String,
    pub entries: Vec<DirEntry>,
}

/// Seam to whatever produces listings. `fetch` must not block; completion
/// is reported through `done`, possibly from another thread.
pub trait ListingProvider: Send + Sync {
    fn fetch(&self, path: String, done: Sender<ListingDone>);
}

/// Channels owned by the listing layer.
#[derive(Default)]
pub struct ListingSignals {
    /// Published on [`DirectoryListing::pump`] for each completed fetch,
    /// with the listed path and its entries.
    pub listing_loaded: Signal<ListingDone>,
}

pub struct DirectoryListing {
    provider: Arc<dyn ListingProvider>,
    tx: Sender<ListingDone>,
    rx: Receiver<ListingDone>,
    pub signals: ListingSignals,
}

impl DirectoryListing {
    pub fn new(provider: Arc<dyn ListingProvider>) -> Self {
        let (tx, rx) = unbounded();
        Self {
            provider,
            tx,
            rx,
            signals: ListingSignals::default(),
        }
    }

    /// Ask the provider for a listing. The result arrives on a later
    /// [`pump`].
    ///
    /// [`pump`]: DirectoryListing::pump
    pub fn get_listing(&self, path: impl Into<String>) {
        let path = path.into();
        log::debug!("get_listing: {path}");
        self.provider.fetch(path, self.tx.clone());
    }

    /// Drain completed fetches and publish them. Call once per host turn.
    /// Returns the number of listings published.
    pub fn pump(&self) -> usize {
        let mut n = 0;
        while let Ok(done) = self.rx.try_recv() {
            self.signals.listing_loaded.publish(done);
            n += 1;
        }
        n
    }
}

/// Breadcrumb dictionary for a path: each ancestor mapped to its own name,
/// root first, in navigation order.
///
/// `"/data/md"` yields `{"/": "/", "/data": "data", "/data/md": "md"}`.
pub fn folder_dict(path: &str) -> IndexMap<String, String> {
    let mut dict = IndexMap::new();
    dict.insert("/".to_string(), "/".to_string());
    let mut cumulative = String::new();
    for part in path.split('/').filter(|p| !p.is_empty()) {
        cumulative.push('/');
        cumulative.push_str(part);
        dict.insert(cumulative.clone(), part.to_string());
    }
    dict
}

/// Cross-dialog session state. One instance is shared by every browser so
/// a new dialog opens where the last one left off.
#[derive(Debug)]
pub struct Session {
    last_used_directory: Mutex<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            last_used_directory: Mutex::new("/".to_string()),
        }
    }

    pub fn last_used_directory(&self) -> String {
        self.last_used_directory
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn set_last_used_directory(&self, path: impl Into<String>) {
        *self
            .last_used_directory
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = path.into();
    }
}
