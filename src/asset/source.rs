//! Asset sources and pending loads
//!
//! Loads are plain futures. A `PendingLoad` owns one and is polled once per
//! frame from the render loop, so a slow fetch never blocks drawing. This is
//! the same cooperative scheme macroquad uses to drive `load_file` on the web.

use super::AssetError;
use std::cell::Cell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

/// Where asset bytes come from
pub trait AssetSource {
    async fn read(&self, path: &str) -> Result<Vec<u8>, AssetError>;
}

/// Reads through macroquad: the filesystem on native, `fetch` on the web
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSource;

impl AssetSource for FileSource {
    async fn read(&self, path: &str) -> Result<Vec<u8>, AssetError> {
        macroquad::file::load_file(path)
            .await
            .map_err(|e| AssetError::Fetch {
                path: path.to_string(),
                message: e.to_string(),
            })
    }
}

/// In-memory source keyed by path
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: std::collections::HashMap<String, Vec<u8>>,
}

#[cfg(test)]
impl MemorySource {
    pub fn with_file(mut self, path: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.files.insert(path.to_string(), bytes.into());
        self
    }
}

#[cfg(test)]
impl AssetSource for MemorySource {
    async fn read(&self, path: &str) -> Result<Vec<u8>, AssetError> {
        self.files.get(path).cloned().ok_or_else(|| AssetError::Fetch {
            path: path.to_string(),
            message: "not found".to_string(),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Progress
// ─────────────────────────────────────────────────────────────────────────────

/// Resources fetched or decoded so far, out of a total that grows as the
/// loader discovers dependencies (buffers, images)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadProgress {
    pub loaded: u32,
    pub total: u32,
}

impl LoadProgress {
    pub fn percent(&self) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            (self.loaded as f32 / self.total as f32 * 100.0).min(100.0)
        }
    }
}

/// Shared progress cell, written by the loader future and read by the loop
#[derive(Debug, Clone, Default)]
pub struct ProgressTracker(Rc<Cell<LoadProgress>>);

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_work(&self, steps: u32) {
        let mut p = self.0.get();
        p.total += steps;
        self.0.set(p);
    }

    pub fn complete_step(&self) {
        let mut p = self.0.get();
        p.loaded = (p.loaded + 1).min(p.total);
        self.0.set(p);
    }

    pub fn get(&self) -> LoadProgress {
        self.0.get()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Pending load
// ─────────────────────────────────────────────────────────────────────────────

pub type AsyncResult<T> = Result<T, AssetError>;

type LoadFuture<T> = Pin<Box<dyn Future<Output = AsyncResult<T>>>>;

/// A load in flight. Completes at most once; `take` hands the result out once.
pub struct PendingLoad<T> {
    pub label: String,
    future: Option<LoadFuture<T>>,
    result: Option<AsyncResult<T>>,
    progress: ProgressTracker,
    last_reported: Option<u32>,
}

impl<T> PendingLoad<T> {
    pub fn spawn(
        label: impl Into<String>,
        progress: ProgressTracker,
        future: impl Future<Output = AsyncResult<T>> + 'static,
    ) -> Self {
        Self {
            label: label.into(),
            future: Some(Box::pin(future)),
            result: None,
            progress,
            last_reported: None,
        }
    }

    /// Poll the load once. Returns true when a result is ready (or was already taken).
    pub fn is_complete(&mut self) -> bool {
        if let Some(future) = self.future.as_mut() {
            let mut cx = Context::from_waker(Waker::noop());
            if let Poll::Ready(result) = future.as_mut().poll(&mut cx) {
                self.future = None;
                self.result = Some(result);
            }
        }
        self.report_progress();
        self.future.is_none()
    }

    /// Take the result if complete
    pub fn take(&mut self) -> Option<AsyncResult<T>> {
        self.result.take()
    }

    fn report_progress(&mut self) {
        let progress = self.progress.get();
        if progress.total == 0 {
            return;
        }
        let percent = progress.percent().floor() as u32;
        if self.last_reported != Some(percent) {
            self.last_reported = Some(percent);
            log::info!("{}: {}% loaded", self.label, percent);
        }
    }
}

/// Drive a future to completion on the current thread. Only valid for
/// futures that never wait on an external wakeup (in-memory sources).
#[cfg(test)]
pub fn block_on<F: Future>(future: F) -> F::Output {
    let mut future = std::pin::pin!(future);
    let mut cx = Context::from_waker(Waker::noop());
    loop {
        if let Poll::Ready(out) = future.as_mut().poll(&mut cx) {
            return out;
        }
    }
}
