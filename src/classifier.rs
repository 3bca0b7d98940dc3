// FallWatch — Classifier Interface
//
// The inference task only sees the `Classifier` trait: a blocking,
// non-reentrant `infer(window) -> probabilities` call.
//
// Back-ends:
//   1. PLACEHOLDER (default) — returns fixed probabilities after a simulated
//      delay, so the pipeline can be developed without the TFLM runtime.
//   2. FFI — enable the `tflite-micro` feature; build.rs compiles the model
//      shim and `TfliteClassifier` drives it through a fixed tensor arena.

use std::time::{Duration, Instant};

use crate::config::*;
use crate::error::{PipelineError, Result};
use crate::events::Probabilities;
use crate::window::WindowData;

pub trait Classifier: Send {
    /// Classify one normalised window. At most one call is in flight.
    fn infer(&mut self, input: &WindowData) -> Result<Probabilities>;
}

impl<C: Classifier + ?Sized> Classifier for Box<C> {
    fn infer(&mut self, input: &WindowData) -> Result<Probabilities> {
        (**self).infer(input)
    }
}

/// Run `classifier` and measure how long the call blocked.
pub fn timed_infer<C: Classifier + ?Sized>(
    classifier: &mut C,
    input: &WindowData,
) -> Result<(Probabilities, Duration)> {
    let start = Instant::now();
    let probabilities = classifier.infer(input)?;
    let elapsed = start.elapsed();

    if elapsed > Duration::from_millis(MAX_INFERENCE_TIME_MS) {
        log::warn!(
            "Inference took {} ms (budget {} ms)",
            elapsed.as_millis(),
            MAX_INFERENCE_TIME_MS
        );
    }
    Ok((probabilities, elapsed))
}

/// Fail with `ResourceExhausted` when the model asks for more scratch memory
/// than the fixed tensor arena provides.
pub fn check_arena(required: usize) -> Result<()> {
    if required > TENSOR_ARENA_SIZE {
        log::error!(
            "Tensor arena too small: {} > {}",
            required,
            TENSOR_ARENA_SIZE
        );
        return Err(PipelineError::ResourceExhausted {
            required,
            capacity: TENSOR_ARENA_SIZE,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Placeholder back-end
// ---------------------------------------------------------------------------

/// Mostly-"Normal" scores used until a real model is linked.
pub const PLACEHOLDER_PROBABILITIES: Probabilities = [0.85, 0.05, 0.03, 0.04, 0.03];

pub struct PlaceholderClassifier {
    probabilities: Probabilities,
    latency: Duration,
    loaded: bool,
}

impl PlaceholderClassifier {
    /// An unloaded classifier; `infer` fails with `ModelNotReady` until
    /// [`load`](Self::load) is called.
    pub fn new(probabilities: Probabilities, latency: Duration) -> Self {
        Self {
            probabilities,
            latency,
            loaded: false,
        }
    }

    pub fn load(&mut self) -> Result<()> {
        log::info!("Loading placeholder model (no TFLM runtime linked)");
        self.loaded = true;
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn set_probabilities(&mut self, probabilities: Probabilities) {
        self.probabilities = probabilities;
    }
}

impl Default for PlaceholderClassifier {
    fn default() -> Self {
        Self::new(PLACEHOLDER_PROBABILITIES, Duration::from_millis(50))
    }
}

impl Classifier for PlaceholderClassifier {
    fn infer(&mut self, _input: &WindowData) -> Result<Probabilities> {
        if !self.loaded {
            return Err(PipelineError::ModelNotReady);
        }
        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }
        log::debug!("Placeholder inference, preds = {:?}", self.probabilities);
        Ok(self.probabilities)
    }
}

// ---------------------------------------------------------------------------
// TFLite Micro back-end — calls the C++ shim compiled by build.rs
// ---------------------------------------------------------------------------
#[cfg(feature = "tflite-micro")]
mod ffi {
    extern "C" {
        /// Parse the embedded flatbuffer and allocate tensors inside `arena`.
        /// Writes the arena bytes the model needs to `required`.
        /// Returns 0 on success, -1 on a bad model, -2 when the arena is too small.
        pub fn fd_model_init(arena: *mut u8, arena_len: usize, required: *mut usize) -> i32;

        /// Copy `input` into the input tensor, invoke, copy the output tensor.
        pub fn fd_model_invoke(
            input: *const f32,
            input_len: usize,
            output: *mut f32,
            output_len: usize,
        ) -> i32;
    }
}

#[cfg(feature = "tflite-micro")]
pub struct TfliteClassifier {
    // Must outlive the interpreter that points into it.
    _arena: Vec<u8>,
}

#[cfg(feature = "tflite-micro")]
impl TfliteClassifier {
    pub fn load() -> Result<Self> {
        let mut arena = vec![0u8; TENSOR_ARENA_SIZE];
        let mut required = 0usize;

        // SAFETY: the arena is a live, exclusively owned allocation of
        // `arena.len()` bytes and `required` is a valid out-pointer.
        let rc = unsafe { ffi::fd_model_init(arena.as_mut_ptr(), arena.len(), &mut required) };
        match rc {
            0 => {
                check_arena(required)?;
                log::info!("TFLM model ready, arena use {} / {} bytes", required, TENSOR_ARENA_SIZE);
                Ok(Self { _arena: arena })
            }
            -2 => Err(PipelineError::ResourceExhausted {
                required,
                capacity: TENSOR_ARENA_SIZE,
            }),
            _ => {
                log::error!("TFLM model init failed ({})", rc);
                Err(PipelineError::ModelNotReady)
            }
        }
    }
}

#[cfg(feature = "tflite-micro")]
impl Classifier for TfliteClassifier {
    fn infer(&mut self, input: &WindowData) -> Result<Probabilities> {
        let mut preds = [0.0f32; MODEL_OUTPUT_SIZE];

        // SAFETY: both buffers are valid for the lengths passed; `&mut self`
        // guarantees no concurrent invocation.
        let rc = unsafe {
            ffi::fd_model_invoke(input.as_ptr(), input.len(), preds.as_mut_ptr(), preds.len())
        };
        if rc != 0 {
            log::error!("TFLM invoke error: {}", rc);
            return Err(PipelineError::InvalidState("model invoke failed"));
        }
        Ok(preds)
    }
}
