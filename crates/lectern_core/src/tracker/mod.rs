//! Visibility-based reading position tracking.
//!
//! # Responsibility
//! - Fold per-element visibility ratios into one "last read" position.
//! - Persist qualifying positions durably and mirror them in memory.
//!
//! # Invariants
//! - Automatic saves require ratio > threshold, a changed unit key, and an
//!   elapsed debounce window; this keeps the slot from oscillating between
//!   two nearly-equally-visible units during slow scroll.
//! - Explicit selection persists immediately and is never overridden by an
//!   automatic observation in the same tick.

use crate::model::position::ReadingPosition;
use crate::model::unit::UnitKey;
use crate::repo::meta_store::MetaStore;
use log::{debug, warn};
use std::collections::HashMap;

/// Minimum visibility ratio before a unit can become the saved position.
pub const VISIBILITY_THRESHOLD: f64 = 0.5;
/// Minimum interval between automatic position saves.
pub const DEBOUNCE_WINDOW_MS: i64 = 500;

/// One visibility observation delivered by the viewport collaborator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibilitySample {
    pub key: UnitKey,
    pub page_number: i64,
    /// Fraction of the element inside the viewport, 0.0..=1.0.
    pub ratio: f64,
}

/// External listener for position changes (e.g. a "continue reading"
/// affordance elsewhere in the app).
pub trait PositionListener {
    fn position_changed(&mut self, position: &ReadingPosition);
}

/// Tracks the most visible unit and persists it as the reading position.
pub struct PositionTracker<'a> {
    meta: &'a dyn MetaStore,
    ratios: HashMap<UnitKey, (i64, f64)>,
    current: Option<ReadingPosition>,
    loaded_from_slot: bool,
    last_auto_save_ms: Option<i64>,
    explicit_at_ms: Option<i64>,
    listener: Option<Box<dyn PositionListener + 'a>>,
}

impl<'a> PositionTracker<'a> {
    pub fn new(meta: &'a dyn MetaStore) -> Self {
        Self {
            meta,
            ratios: HashMap::new(),
            current: None,
            loaded_from_slot: false,
            last_auto_save_ms: None,
            explicit_at_ms: None,
            listener: None,
        }
    }

    /// Registers the single external change listener.
    pub fn set_listener(&mut self, listener: Box<dyn PositionListener + 'a>) {
        self.listener = Some(listener);
    }

    /// Applies one observation batch and persists a new position when the
    /// most visible unit qualifies.
    ///
    /// # Contract
    /// - Entries with ratio 0 are removed from the visibility map.
    /// - At most one automatic save per [`DEBOUNCE_WINDOW_MS`], and only
    ///   when the winning key differs from the last saved one.
    pub fn observe(&mut self, samples: &[VisibilitySample], now_ms: i64) {
        for sample in samples {
            if sample.ratio <= 0.0 {
                self.ratios.remove(&sample.key);
            } else {
                self.ratios
                    .insert(sample.key, (sample.page_number, sample.ratio));
            }
        }

        let Some((key, (page_number, ratio))) = self
            .ratios
            .iter()
            // Tie-break on the key so alternating equal ratios stay stable.
            .max_by(|a, b| {
                a.1 .1
                    .partial_cmp(&b.1 .1)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| b.0.cmp(a.0))
            })
            .map(|(key, value)| (*key, *value))
        else {
            return;
        };

        if ratio <= VISIBILITY_THRESHOLD {
            return;
        }
        if self.explicit_at_ms == Some(now_ms) {
            // Explicit selection wins this tick.
            return;
        }

        let slot_value = key.slot_value();
        if self
            .current_key()
            .is_some_and(|current| current == slot_value)
        {
            return;
        }
        if self
            .last_auto_save_ms
            .is_some_and(|last| now_ms - last < DEBOUNCE_WINDOW_MS)
        {
            return;
        }

        self.last_auto_save_ms = Some(now_ms);
        self.persist(ReadingPosition::new(slot_value, page_number, now_ms));
    }

    /// User tapped a unit: persist immediately, bypassing threshold and
    /// debounce, and suppress automatic saves for this tick.
    pub fn set_explicit(&mut self, key: UnitKey, page_number: i64, now_ms: i64) {
        self.explicit_at_ms = Some(now_ms);
        self.persist(ReadingPosition::new(key.slot_value(), page_number, now_ms));
    }

    /// Current position: the in-memory mirror, falling back to the durable
    /// slot on first access.
    pub fn current(&mut self) -> Option<ReadingPosition> {
        if self.current.is_none() && !self.loaded_from_slot {
            self.loaded_from_slot = true;
            match self.meta.reading_position() {
                Ok(position) => self.current = position,
                Err(err) => {
                    warn!(
                        "event=position_load module=tracker status=degraded error={err}"
                    );
                }
            }
        }
        self.current.clone()
    }

    /// Explicit reset: clears both the mirror and the durable slot.
    pub fn reset(&mut self) {
        self.current = None;
        self.loaded_from_slot = true;
        self.last_auto_save_ms = None;
        if let Err(err) = self.meta.clear_reading_position() {
            warn!("event=position_reset module=tracker status=degraded error={err}");
        }
    }

    fn current_key(&self) -> Option<&str> {
        self.current.as_ref().map(|position| position.unit_key.as_str())
    }

    fn persist(&mut self, position: ReadingPosition) {
        if let Err(err) = self.meta.set_reading_position(&position) {
            // Best-effort: keep the in-memory mirror even when the durable
            // write fails, so the session still tracks.
            warn!("event=position_save module=tracker status=degraded error={err}");
        }
        if let Err(err) = self.meta.set_last_page(position.page_number) {
            warn!("event=position_save module=tracker status=degraded error={err}");
        }
        debug!(
            "event=position_save module=tracker status=ok unit={} page={}",
            position.unit_key, position.page_number
        );
        self.current = Some(position.clone());
        self.loaded_from_slot = true;
        if let Some(listener) = self.listener.as_mut() {
            listener.position_changed(&position);
        }
    }
}
