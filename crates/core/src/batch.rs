//! Batch encode/decode on a worker pool.
//!
//! A batch starts from a list of paths. [`plan`] expands directories and
//! decides, per file, whether it is encoded or decoded and where the result
//! goes. [`BatchRunner`] then runs every item as its own job on a rayon
//! pool and reports progress as [`BatchEvent`]s over a channel.
//!
//! # Cancellation
//!
//! A [`CancellationToken`] is checked before each item starts. Items already
//! running finish normally; items not yet started report
//! [`BatchEvent::Cancelled`] without touching the filesystem.
//!
//! # Collisions
//!
//! No two items may write the same path, and no item may write a path
//! another item reads. Both are rejected at planning time, before any job
//! runs.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::codec::{decode_file, encode_file, verify_file};
use crate::error::{Error, Result};

/// Extension given to encoded files.
pub const ENCODED_EXTENSION: &str = "huff";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Encode,
    Decode,
}

/// One file to process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub operation: Operation,
    pub source: PathBuf,
    pub destination: PathBuf,
}

impl WorkItem {
    /// Choose the operation from the file name.
    ///
    /// `name.huff` decodes to `name`; anything else encodes to `<path>.huff`.
    pub fn for_path(path: &Path) -> Self {
        match decoded_path(path) {
            Some(destination) => Self {
                operation: Operation::Decode,
                source: path.to_path_buf(),
                destination,
            },
            None => Self {
                operation: Operation::Encode,
                source: path.to_path_buf(),
                destination: encoded_path(path),
            },
        }
    }
}

/// `path` with `.huff` appended.
pub fn encoded_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(ENCODED_EXTENSION);
    PathBuf::from(name)
}

/// `path` with its `.huff` extension removed, or `None` if it has none.
pub fn decoded_path(path: &Path) -> Option<PathBuf> {
    path.extension()
        .filter(|ext| *ext == ENCODED_EXTENSION)
        .map(|_| path.with_extension(""))
}

/// Turn `paths` into work items.
///
/// Directories are walked recursively in name order. Items whose
/// destination already exists are skipped unless `overwrite` is set. A
/// source listed more than once, under any spelling, is planned once.
/// Paths are compared after resolving `..`, symlinks and relative paths.
///
/// # Errors
/// - `Error::Io` if a path cannot be read
/// - `Error::Config` if two items would write the same destination, or an
///   item would write another item's source
pub fn plan<P: AsRef<Path>>(paths: &[P], overwrite: bool) -> Result<Vec<WorkItem>> {
    let mut files = Vec::new();
    for path in paths {
        collect_files(path.as_ref(), &mut files)?;
    }

    let mut seen = HashSet::new();
    let mut planned = Vec::new();
    for source in files {
        let source_key = fs::canonicalize(&source)?;
        if !seen.insert(source_key.clone()) {
            continue;
        }
        let item = WorkItem::for_path(&source);
        if !overwrite && item.destination.exists() {
            debug!(destination = %item.destination.display(), "destination exists, skipping");
            continue;
        }
        let destination_key = canonical_destination(&item.destination)?;
        planned.push((item, source_key, destination_key));
    }

    let sources: HashSet<&Path> = planned.iter().map(|(_, source, _)| source.as_path()).collect();
    let mut claimed = HashSet::new();
    for (item, _, destination) in &planned {
        if !claimed.insert(destination.as_path()) {
            return Err(Error::Config(format!(
                "more than one item writes {}",
                item.destination.display()
            )));
        }
        if sources.contains(destination.as_path()) {
            return Err(Error::Config(format!(
                "{} is both read and written by this batch",
                item.destination.display()
            )));
        }
    }

    Ok(planned.into_iter().map(|(item, _, _)| item).collect())
}

/// Resolve a destination that may not exist yet: its directory is
/// canonicalized and the file name joined back on.
fn canonical_destination(path: &Path) -> Result<PathBuf> {
    if path.exists() {
        return Ok(fs::canonicalize(path)?);
    }
    let file_name = path
        .file_name()
        .ok_or_else(|| Error::Config(format!("{} has no file name", path.display())))?;
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    Ok(fs::canonicalize(parent)?.join(file_name))
}

fn collect_files(path: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    if fs::metadata(path)?.is_dir() {
        let mut entries = fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<Vec<_>>>()?;
        entries.sort();
        for entry in entries {
            collect_files(&entry, files)?;
        }
    } else {
        files.push(path.to_path_buf());
    }
    Ok(())
}

/// Shared flag for stopping a batch between items.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Result of a completed item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Encoded {
        input_bytes: u64,
        output_bytes: u64,
        /// Encoded size as a whole percentage of the original
        ratio_percent: u64,
    },
    Decoded {
        input_bytes: u64,
        output_bytes: u64,
        /// Whether the output matches the digest recorded at encode time
        verified: bool,
    },
}

/// Progress report for one item. `index` is the item's position in the
/// submitted list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchEvent {
    Started {
        index: usize,
        item: WorkItem,
    },
    Finished {
        index: usize,
        item: WorkItem,
        outcome: ItemOutcome,
    },
    Failed {
        index: usize,
        item: WorkItem,
        error: String,
    },
    Cancelled {
        index: usize,
        item: WorkItem,
    },
}

impl BatchEvent {
    pub fn index(&self) -> usize {
        match self {
            BatchEvent::Started { index, .. }
            | BatchEvent::Finished { index, .. }
            | BatchEvent::Failed { index, .. }
            | BatchEvent::Cancelled { index, .. } => *index,
        }
    }

    pub fn item(&self) -> &WorkItem {
        match self {
            BatchEvent::Started { item, .. }
            | BatchEvent::Finished { item, .. }
            | BatchEvent::Failed { item, .. }
            | BatchEvent::Cancelled { item, .. } => item,
        }
    }

    /// Whether this is the last event for its item.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, BatchEvent::Started { .. })
    }
}

/// Runs work items on a fixed-size thread pool.
pub struct BatchRunner {
    pool: rayon::ThreadPool,
    cancel: CancellationToken,
}

impl BatchRunner {
    /// Create a runner with `workers` threads (at least one).
    ///
    /// # Errors
    /// Returns `Error::Channel` if the pool cannot be created.
    pub fn new(workers: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|i| format!("huffpack-worker-{i}"))
            .build()
            .map_err(|e| Error::Channel(format!("failed to create thread pool: {e}")))?;

        Ok(Self {
            pool,
            cancel: CancellationToken::new(),
        })
    }

    /// Token that stops this runner's remaining items when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Queue every item and return the event stream.
    ///
    /// Each item reports either `Cancelled`, or `Started` followed by
    /// `Finished` or `Failed`. The channel closes once every item has
    /// reported.
    pub fn submit(&self, items: Vec<WorkItem>) -> Receiver<BatchEvent> {
        let (tx, rx) = mpsc::channel();

        debug!(items = items.len(), workers = self.workers(), "submitting batch");

        for (index, item) in items.into_iter().enumerate() {
            let tx = tx.clone();
            let cancel = self.cancel.clone();
            self.pool.spawn(move || run_item(index, item, &cancel, &tx));
        }

        rx
    }

    /// Submit `items` and wait for every event.
    pub fn run(&self, items: Vec<WorkItem>) -> Vec<BatchEvent> {
        self.submit(items).into_iter().collect()
    }
}

fn run_item(index: usize, item: WorkItem, cancel: &CancellationToken, tx: &Sender<BatchEvent>) {
    // A closed receiver only means nobody is listening any more.
    if cancel.is_cancelled() {
        let _ = tx.send(BatchEvent::Cancelled { index, item });
        return;
    }

    let _ = tx.send(BatchEvent::Started {
        index,
        item: item.clone(),
    });

    let event = match process(&item) {
        Ok(outcome) => BatchEvent::Finished {
            index,
            item,
            outcome,
        },
        Err(e) => {
            warn!(source = %item.source.display(), error = %e, "item failed");
            BatchEvent::Failed {
                index,
                item,
                error: e.to_string(),
            }
        }
    };
    let _ = tx.send(event);
}

fn process(item: &WorkItem) -> Result<ItemOutcome> {
    match item.operation {
        Operation::Encode => {
            let summary = encode_file(&item.source, &item.destination)?;
            Ok(ItemOutcome::Encoded {
                input_bytes: summary.input_bytes,
                output_bytes: summary.output_bytes,
                ratio_percent: summary.ratio_percent(),
            })
        }
        Operation::Decode => {
            let digest = decode_file(&item.source, &item.destination)?;
            let verified = verify_file(&item.destination, &digest)?;
            if !verified {
                warn!(destination = %item.destination.display(), "decoded output does not match recorded digest");
            }
            Ok(ItemOutcome::Decoded {
                input_bytes: fs::metadata(&item.source)?.len(),
                output_bytes: fs::metadata(&item.destination)?.len(),
                verified,
            })
        }
    }
}
