// SPDX-License-Identifier: GPL-2.0-or-later

use serde::{Deserialize, Serialize};

/// Most strips a frame may use before the count is clamped.
pub const DEFAULT_MAX_STRIPS: u16 = 32;
/// Most chunks processed inside one strip.
pub const DEFAULT_MAX_CHUNKS_PER_STRIP: u32 = 1000;
/// Most forward skips taken while looking for a valid strip tag.
pub const DEFAULT_MAX_RESYNC_ATTEMPTS: u32 = 10;

/// Caps that bound the work done on a corrupt or hostile stream.
///
/// The bitstream carries no checksum, so these are the only guard against
/// inputs that would otherwise allocate or loop without bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeLimits {
    pub max_strips: u16,
    pub max_chunks_per_strip: u32,
    pub max_resync_attempts: u32,
    /// Fail with `TooManyStrips` instead of clamping to `max_strips`.
    pub reject_excess_strips: bool,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_strips: DEFAULT_MAX_STRIPS,
            max_chunks_per_strip: DEFAULT_MAX_CHUNKS_PER_STRIP,
            max_resync_attempts: DEFAULT_MAX_RESYNC_ATTEMPTS,
            reject_excess_strips: false,
        }
    }
}

/// Outcome of [`retry_bounded`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Retry<T> {
    /// `step` produced a value after `retries` failed attempts.
    Found { value: T, retries: u32 },
    /// Every attempt came back empty.
    Exhausted { retries: u32 },
}

/// Run `step` once, then up to `max_retries` more times until it yields a value.
///
/// `step` receives the attempt number (0 for the first try). Errors from
/// `step` stop the loop immediately.
pub(crate) fn retry_bounded<T, E>(
    max_retries: u32,
    mut step: impl FnMut(u32) -> Result<Option<T>, E>,
) -> Result<Retry<T>, E> {
    for attempt in 0..=max_retries {
        if let Some(value) = step(attempt)? {
            return Ok(Retry::Found {
                value,
                retries: attempt,
            });
        }
    }
    Ok(Retry::Exhausted {
        retries: max_retries,
    })
}
