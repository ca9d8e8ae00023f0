//! Directory browser - navigable file picker over the listing service.
//!
//! Holds the rows a picker dialog would render: one per entry that survives
//! the extension filter, with an SI size label for files and a lock marker
//! for entries the provider may not read. Navigation updates the shared
//! [`Session`] so the next dialog opens in the same place.

use std::sync::{Arc, Mutex};

use indexmap::IndexMap;

use crate::core::signal::Subscriptions;
use crate::dirlist::{folder_dict, DirectoryListing, Session};
use crate::utils::file_size_si;

type OpenFile = Box<dyn Fn(&str) + Send + Sync>;

/// One rendered row of the browser.
#[derive(Clone, Debug)]
pub struct BrowserRow {
    pub path: String,
    pub name: String,
    pub dir: bool,
    /// Empty for directories.
    pub size_label: String,
    /// Render a lock marker; opening is refused.
    pub restricted: bool,
}

struct BrowserState {
    path: String,
    rows: Vec<BrowserRow>,
}

pub struct DirectoryBrowser {
    listing: Arc<DirectoryListing>,
    state: Arc<Mutex<BrowserState>>,
    on_open: OpenFile,
    subs: Subscriptions,
}

impl DirectoryBrowser {
    /// `filter` lists the file extensions to show, lowercased and without
    /// the dot; empty means show everything. Directories always pass. The
    /// browser opens at the session's last used directory.
    pub fn new(
        listing: Arc<DirectoryListing>,
        session: Arc<Session>,
        filter: Vec<String>,
        on_open: OpenFile,
    ) -> Self {
        let state = Arc::new(Mutex::new(BrowserState {
            path: session.last_used_directory(),
            rows: Vec::new(),
        }));
        let mut subs = Subscriptions::new();

        let st = Arc::clone(&state);
        let sess = session;
        subs.track(listing.signals.listing_loaded.subscribe(move |done| {
            let rows = done
                .entries
                .iter()
                .filter(|e| e.dir || passes_filter(&filter, &e.name))
                .map(|e| BrowserRow {
                    path: e.path.clone(),
                    name: e.name.clone(),
                    dir: e.dir,
                    size_label: if e.dir {
                        String::new()
                    } else {
                        file_size_si(e.size)
                    },
                    restricted: e.restricted,
                })
                .collect();
            {
                let mut state = st.lock().unwrap_or_else(|e| e.into_inner());
                state.path = done.path.clone();
                state.rows = rows;
            }
            sess.set_last_used_directory(done.path.clone());
        }));

        let browser = Self {
            listing,
            state,
            on_open,
            subs,
        };
        browser.listing.get_listing(browser.path());
        browser
    }

    /// Path of the listing currently shown (or being fetched).
    pub fn path(&self) -> String {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .path
            .clone()
    }

    pub fn rows(&self) -> Vec<BrowserRow> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .rows
            .clone()
    }

    /// Breadcrumb options for the current path, root first.
    pub fn folder_options(&self) -> IndexMap<String, String> {
        folder_dict(&self.path())
    }

    /// Jump to a breadcrumb target.
    pub fn navigate(&self, path: impl Into<String>) {
        self.listing.get_listing(path.into());
    }

    /// Double-click on a row: directories re-fetch, files go to the load
    /// callback. Restricted entries are refused.
    pub fn open(&self, index: usize) {
        let row = {
            let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.rows.get(index).cloned()
        };
        let Some(row) = row else {
            return;
        };
        if row.restricted {
            log::info!("open: {} is restricted", row.path);
            return;
        }
        if row.dir {
            self.listing.get_listing(row.path);
        } else {
            (self.on_open)(&row.path);
        }
    }

    pub fn dispose(&mut self) {
        self.subs.dispose();
    }
}

fn passes_filter(filter: &[String], name: &str) -> bool {
    if filter.is_empty() {
        return true;
    }
    let ext = name.rsplit_once('.').map(|(_, ext)| ext.to_lowercase());
    ext.map(|ext| filter.iter().any(|f| *f == ext))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dirlist::{DirEntry, ListingDone, ListingProvider};
    use crossbeam_channel::Sender;

    struct TreeProvider;

    impl ListingProvider for TreeProvider {
        fn fetch(&self, path: String, done: Sender<ListingDone>) {
            let entries = match path.as_str() {
                "/" => vec![
                    entry("/data", "data", true, 0, false),
                    entry("/readme.txt", "readme.txt", false, 120, false),
                ],
                "/data" => vec![
                    entry("/data/md", "md", true, 0, false),
                    entry("/data/1crn.pdb", "1crn.pdb", false, 135_000, false),
                    entry("/data/md.xtc", "md.xtc", false, 5_000_000, false),
                    entry("/data/private.pdb", "private.pdb", false, 99, true),
                ],
                _ => Vec::new(),
            };
            let _ = done.send(ListingDone { path, entries });
        }
    }

    fn entry(path: &str, name: &str, dir: bool, size: u64, restricted: bool) -> DirEntry {
        DirEntry {
            path: path.to_string(),
            name: name.to_string(),
            dir,
            size,
            restricted,
        }
    }

    fn browser(filter: &[&str]) -> (Arc<DirectoryListing>, Arc<Session>, DirectoryBrowser, Arc<Mutex<Vec<String>>>) {
        let listing = Arc::new(DirectoryListing::new(Arc::new(TreeProvider)));
        let session = Arc::new(Session::new());
        let opened = Arc::new(Mutex::new(Vec::new()));
        let o = Arc::clone(&opened);
        let browser = DirectoryBrowser::new(
            Arc::clone(&listing),
            Arc::clone(&session),
            filter.iter().map(|s| s.to_string()).collect(),
            Box::new(move |path| o.lock().unwrap().push(path.to_string())),
        );
        (listing, session, browser, opened)
    }

    #[test]
    fn test_filter_keeps_dirs_and_matching_files() {
        let (listing, _session, browser, _opened) = browser(&["pdb"]);
        listing.pump();
        browser.navigate("/data");
        listing.pump();

        let names: Vec<String> = browser.rows().iter().map(|r| r.name.clone()).collect();
        assert_eq!(names, vec!["md", "1crn.pdb", "private.pdb"]);
    }

    #[test]
    fn test_rows_carry_size_labels_and_lock_marker() {
        let (listing, _session, browser, _opened) = browser(&[]);
        listing.pump();
        browser.navigate("/data");
        listing.pump();

        let rows = browser.rows();
        assert_eq!(rows[0].size_label, ""); // directory
        assert_eq!(rows[1].size_label, "135.00 kB");
        assert!(rows[3].restricted);
    }

    #[test]
    fn test_open_dir_navigates_and_updates_session() {
        let (listing, session, browser, _opened) = browser(&[]);
        listing.pump();
        assert_eq!(browser.path(), "/");

        browser.open(0); // "data" directory
        listing.pump();
        assert_eq!(browser.path(), "/data");
        assert_eq!(session.last_used_directory(), "/data");

        let options: Vec<String> = browser.folder_options().keys().cloned().collect();
        assert_eq!(options, vec!["/", "/data"]);
    }

    #[test]
    fn test_open_file_invokes_callback_but_not_restricted() {
        let (listing, _session, browser, opened) = browser(&[]);
        listing.pump();
        browser.navigate("/data");
        listing.pump();

        browser.open(1); // 1crn.pdb
        browser.open(3); // restricted
        assert_eq!(&*opened.lock().unwrap(), &["/data/1crn.pdb"]);
    }

    #[test]
    fn test_dispose_detaches_from_listing() {
        let (listing, _session, mut browser, _opened) = browser(&[]);
        listing.pump();
        browser.dispose();

        browser.navigate("/data");
        listing.pump();
        assert_eq!(browser.path(), "/");
        assert_eq!(listing.signals.listing_loaded.subscriber_count(), 0);
    }
}
