// FallWatch — Window Buffer
//
// The sampler task owns a `WindowBuffer` and fills it one feature vector at a
// time.  When the 301st vector lands the window is complete and is handed to
// the inference task through a `WindowExchange`, which moves the frozen
// storage by ownership and gives the sampler a second storage to keep
// filling.  Neither task ever touches storage the other one owns.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::config::{FEATURES, MODEL_INPUT_SIZE, SEQUENCE_LENGTH};
use crate::error::{PipelineError, Result};
use crate::events::Sample;

/// Fixed backing storage of one window (301 × 6 floats, ~7 KiB).
pub type WindowData = [f32; MODEL_INPUT_SIZE];

// ---------------------------------------------------------------------------
// Window — one complete classifier input
// ---------------------------------------------------------------------------
#[derive(Clone)]
pub struct Window {
    data: Box<WindowData>,
    completed_at_us: u64,
}

impl Window {
    pub fn zeroed() -> Self {
        // Built through a Vec so the 7 KiB array never sits on a task stack.
        let data: Box<WindowData> = vec![0.0f32; MODEL_INPUT_SIZE]
            .into_boxed_slice()
            .try_into()
            .unwrap_or_else(|_| unreachable!("vec has MODEL_INPUT_SIZE elements"));
        Self {
            data,
            completed_at_us: 0,
        }
    }

    pub fn data(&self) -> &WindowData {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut WindowData {
        &mut self.data
    }

    /// Feature vector of timestep `step` (0 = oldest).
    pub fn frame(&self, step: usize) -> Option<&[f32]> {
        let start = step.checked_mul(FEATURES)?;
        let end = start.checked_add(FEATURES)?;
        self.data.get(start..end)
    }

    /// Timestamp of the sample that completed this window.
    pub fn completed_at_us(&self) -> u64 {
        self.completed_at_us
    }
}

impl std::fmt::Debug for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Window")
            .field("len", &self.data.len())
            .field("completed_at_us", &self.completed_at_us)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// WindowBuffer — producer-side accumulator
// ---------------------------------------------------------------------------

/// What a single `append` did to the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferState {
    /// Stored; the window is not complete yet.
    Filling,
    /// Stored, and this write completed the window. The cursor is back at 0.
    Full,
    /// The slot at the cursor lies outside the storage; nothing was written.
    Skipped,
}

pub struct WindowBuffer {
    storage: Window,
    cursor: usize,
    full: bool,
    last_update_us: u64,
}

impl WindowBuffer {
    pub fn new() -> Self {
        Self {
            storage: Window::zeroed(),
            cursor: 0,
            full: false,
            last_update_us: 0,
        }
    }

    /// Zero every slot and forget any completed window.
    pub fn reset(&mut self) {
        self.storage.data.fill(0.0);
        self.storage.completed_at_us = 0;
        self.cursor = 0;
        self.full = false;
        self.last_update_us = 0;
    }

    /// Write one feature vector at the cursor.
    ///
    /// `features` must hold exactly [`FEATURES`] values.
    pub fn append(&mut self, features: &[f32], timestamp_us: u64) -> Result<BufferState> {
        if features.len() != FEATURES {
            return Err(PipelineError::InvalidArgument(format!(
                "feature vector has {} values, expected {}",
                features.len(),
                FEATURES
            )));
        }

        let base = self.cursor * FEATURES;
        if base + FEATURES > MODEL_INPUT_SIZE {
            // Cursor drifted past capacity; tolerate it as a no-op.
            return Ok(BufferState::Skipped);
        }

        self.storage.data[base..base + FEATURES].copy_from_slice(features);
        self.cursor += 1;
        self.last_update_us = timestamp_us;

        if self.cursor >= SEQUENCE_LENGTH {
            self.full = true;
            self.cursor = 0;
            log::debug!("Window complete, ready for inference");
            return Ok(BufferState::Full);
        }
        Ok(BufferState::Filling)
    }

    pub fn append_sample(&mut self, sample: &Sample) -> Result<BufferState> {
        self.append(&sample.features(), sample.timestamp_us)
    }

    pub fn is_full(&self) -> bool {
        self.full
    }

    /// Index of the next timestep to be written.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn last_update_us(&self) -> u64 {
        self.last_update_us
    }

    /// Copy of the whole backing storage as it is right now.
    pub fn snapshot(&self) -> Window {
        let mut copy = self.storage.clone();
        copy.completed_at_us = self.last_update_us;
        copy
    }

    /// Detach the completed window, continuing to fill into `replacement`.
    pub fn take_completed(&mut self, mut replacement: Window) -> Result<Window> {
        if !self.full {
            return Err(PipelineError::InvalidState("window not full"));
        }
        replacement.completed_at_us = 0;
        let mut done = std::mem::replace(&mut self.storage, replacement);
        done.completed_at_us = self.last_update_us;
        self.full = false;
        Ok(done)
    }

    /// Give up on the completed window; its storage will simply be overwritten.
    pub fn discard_completed(&mut self) {
        self.full = false;
    }

    #[cfg(test)]
    fn force_cursor(&mut self, cursor: usize) {
        self.cursor = cursor;
    }
}

impl Default for WindowBuffer {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// BufferGauge — lock-free fill status for the status task
// ---------------------------------------------------------------------------

// Xtensa has no 64-bit atomics, so the timestamp is kept in milliseconds
// since boot (wraps at ~49 days, fine for an age display).
#[derive(Debug, Default)]
pub struct BufferGauge {
    cursor: AtomicUsize,
    last_update_ms: AtomicU32,
}

impl BufferGauge {
    pub fn record(&self, buffer: &WindowBuffer) {
        self.cursor.store(buffer.cursor(), Ordering::Relaxed);
        self.last_update_ms
            .store((buffer.last_update_us() / 1000) as u32, Ordering::Relaxed);
    }

    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::Relaxed)
    }

    /// Fraction of the window filled in the current cycle, 0.0..1.0.
    pub fn fill_fraction(&self) -> f32 {
        self.cursor() as f32 / SEQUENCE_LENGTH as f32
    }

    pub fn last_update_ms(&self) -> u32 {
        self.last_update_ms.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// WindowExchange — single-producer / single-consumer hand-off
// ---------------------------------------------------------------------------

/// Outcome of publishing a completed window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handoff {
    /// The spare storage was free; the window is now pending.
    Delivered,
    /// The previous window was never taken; the newer one replaced it.
    Replaced,
    /// Inference still holds the spare storage; the window was dropped.
    Dropped,
}

struct Slots {
    pending: Option<Window>,
    free: Option<Window>,
}

pub struct WindowExchange {
    slots: Mutex<Slots>,
    ready: Condvar,
}

impl WindowExchange {
    /// `spare` is the second storage; the first lives in the sampler's buffer.
    pub fn new(spare: Window) -> Self {
        Self {
            slots: Mutex::new(Slots {
                pending: None,
                free: Some(spare),
            }),
            ready: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move the completed window out of `buffer` and make it available to the
    /// consumer. Never blocks on the consumer.
    pub fn publish(&self, buffer: &mut WindowBuffer) -> Result<Handoff> {
        if !buffer.is_full() {
            return Err(PipelineError::InvalidState("window not full"));
        }

        let mut slots = self.lock();
        let outcome = if let Some(free) = slots.free.take() {
            slots.pending = Some(buffer.take_completed(free)?);
            Handoff::Delivered
        } else if let Some(stale) = slots.pending.take() {
            slots.pending = Some(buffer.take_completed(stale)?);
            Handoff::Replaced
        } else {
            buffer.discard_completed();
            return Ok(Handoff::Dropped);
        };
        drop(slots);

        self.ready.notify_one();
        Ok(outcome)
    }

    /// Non-blocking: is a completed window waiting to be taken?
    pub fn is_ready(&self) -> bool {
        self.lock().pending.is_some()
    }

    /// Take the pending window, waiting at most `timeout` for one to arrive.
    pub fn wait_window(&self, timeout: Duration) -> Option<Window> {
        let slots = self.lock();
        let (mut slots, _) = self
            .ready
            .wait_timeout_while(slots, timeout, |s| s.pending.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        slots.pending.take()
    }

    /// Return a consumed window's storage so the producer can reuse it.
    pub fn recycle(&self, window: Window) {
        self.lock().free = Some(window);
    }
}
