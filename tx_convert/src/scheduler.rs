//! Batch scheduler
//!
//! Splits a run into consecutive groups of `concurrency` textures. Each group
//! is spawned onto a rayon pool of `concurrency` threads and fully drained
//! before the next one starts, which caps live compiler processes at
//! `concurrency`.
//!
//! Workers never touch shared state: they send log lines and results back
//! over a channel, and the coordinating thread is the only caller of the
//! event callback. Progress is therefore serialized and monotonic, and the
//! `Finished` event is emitted exactly once.

use crate::color_space::TextureItem;
use crate::error::{Result, TxError};
use crate::executor::ConversionResult;
use shared_utils::{BatchResult, CancelToken};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use tracing::{error, info, warn};

/// Converts one texture. Called concurrently from pool threads.
pub trait Converter: Sync {
    fn convert(&self, item: &TextureItem, log: &dyn Fn(String)) -> ConversionResult;
}

impl<F> Converter for F
where
    F: Fn(&TextureItem, &dyn Fn(String)) -> ConversionResult + Sync,
{
    fn convert(&self, item: &TextureItem, log: &dyn Fn(String)) -> ConversionResult {
        self(item, log)
    }
}

#[derive(Debug, Clone)]
pub enum BatchEvent {
    /// One human-readable line for the user-facing log
    Log(String),
    Progress { processed: usize, total: usize },
    Finished(BatchSummary),
}

#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub total: usize,
    pub result: BatchResult,
    pub cancelled: bool,
    /// One result per input texture, in input order
    pub results: Vec<ConversionResult>,
}

enum WorkerMsg {
    Log(String),
    Done(usize, ConversionResult),
}

pub struct BatchScheduler {
    concurrency: usize,
    pool: rayon::ThreadPool,
    cancel: CancelToken,
    in_flight: AtomicBool,
}

impl BatchScheduler {
    pub fn new(concurrency: usize) -> Result<Self> {
        if concurrency == 0 {
            return Err(TxError::InvalidConcurrency(concurrency));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(concurrency)
            .thread_name(|i| format!("tx-convert-{i}"))
            .build()
            .map_err(|e| TxError::ThreadPool(e.to_string()))?;
        Ok(Self {
            concurrency,
            pool,
            cancel: CancelToken::new(),
            in_flight: AtomicBool::new(false),
        })
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Number of groups a run of `items` textures is split into.
    pub fn group_count(&self, items: usize) -> usize {
        items.div_ceil(self.concurrency)
    }

    /// Run every item through `converter`.
    ///
    /// Fails only when another run on this scheduler is still active; all
    /// per-texture failures (including worker panics) end up in the summary.
    pub fn run<C, F>(&self, items: &[TextureItem], converter: &C, mut on_event: F) -> Result<BatchSummary>
    where
        C: Converter + ?Sized,
        F: FnMut(BatchEvent),
    {
        let _guard = InFlightGuard::acquire(&self.in_flight)?;

        let total = items.len();
        info!(
            total,
            concurrency = self.concurrency,
            groups = self.group_count(total),
            "Starting batch"
        );

        let mut tally = Tally::new(total);

        for (group_index, group) in items.chunks(self.concurrency).enumerate() {
            let offset = group_index * self.concurrency;

            if self.cancel.is_cancelled() {
                tally.cancelled = true;
                for (i, item) in group.iter().enumerate() {
                    on_event(BatchEvent::Log(format!(
                        "⏹️ Cancelled: {}",
                        item.source_path().display()
                    )));
                    tally.record(offset + i, ConversionResult::cancelled(item.source_path()), &mut on_event);
                }
                continue;
            }

            let (tx, rx) = mpsc::channel::<WorkerMsg>();

            self.pool.in_place_scope(|scope| {
                for (i, item) in group.iter().enumerate() {
                    let tx = tx.clone();
                    scope.spawn(move |_| {
                        let log_tx = tx.clone();
                        let log = move |line: String| {
                            let _ = log_tx.send(WorkerMsg::Log(line));
                        };
                        let result = panic::catch_unwind(AssertUnwindSafe(|| converter.convert(item, &log)))
                            .unwrap_or_else(|payload| {
                                let source = item.source_path();
                                let reason = format!("converter panicked: {}", panic_message(&*payload));
                                error!(path = %source.display(), reason = %reason, "Worker failed");
                                log(format!("❌ Failed: {} ({})", source.display(), reason));
                                ConversionResult::failed(source, None, reason)
                            });
                        let _ = tx.send(WorkerMsg::Done(offset + i, result));
                    });
                }
                drop(tx);

                // coordinator stays on the calling thread
                for msg in rx {
                    match msg {
                        WorkerMsg::Log(line) => on_event(BatchEvent::Log(line)),
                        WorkerMsg::Done(index, result) => tally.record(index, result, &mut on_event),
                    }
                }
            });
        }

        let summary = tally.finish();
        if summary.cancelled {
            warn!(skipped = summary.result.skipped, "Batch cancelled");
        }
        info!(
            succeeded = summary.result.succeeded,
            failed = summary.result.failed,
            skipped = summary.result.skipped,
            "Batch finished"
        );
        on_event(BatchEvent::Finished(summary.clone()));
        Ok(summary)
    }
}

struct Tally {
    total: usize,
    processed: usize,
    result: BatchResult,
    cancelled: bool,
    slots: Vec<Option<ConversionResult>>,
}

impl Tally {
    fn new(total: usize) -> Self {
        Self {
            total,
            processed: 0,
            result: BatchResult::new(),
            cancelled: false,
            slots: vec![None; total],
        }
    }

    fn record<F: FnMut(BatchEvent)>(&mut self, index: usize, result: ConversionResult, on_event: &mut F) {
        // each slot is filled once
        if self.slots[index].is_some() {
            return;
        }
        if result.success {
            self.result.success();
        } else if result.skipped {
            self.result.skip();
        } else {
            self.result.fail(result.source.clone(), result.message.clone());
        }
        self.slots[index] = Some(result);
        self.processed += 1;
        on_event(BatchEvent::Progress {
            processed: self.processed,
            total: self.total,
        });
    }

    fn finish(self) -> BatchSummary {
        BatchSummary {
            total: self.total,
            result: self.result,
            cancelled: self.cancelled,
            results: self.slots.into_iter().flatten().collect(),
        }
    }
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| TxError::BatchInFlight)?;
        Ok(Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
