//! Pointer and viewport inputs
//!
//! Input handlers only ever write into [`PointerState`]; the frame tick reads
//! it and keeps its own cursor of which events it has already consumed. No
//! entity logic runs inside a handler.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::CLICK_MOVE_THRESHOLD;

/// Logical viewport plus device pixel ratio
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    pub dpr: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32, dpr: f32) -> Self {
        let sane = |v: f32| if v.is_finite() { v.max(1.0) } else { 1.0 };
        Self {
            width: sane(width),
            height: sane(height),
            dpr: sane(dpr),
        }
    }

    /// Drawing-surface size in device pixels
    pub fn pixel_size(&self) -> (u32, u32) {
        (
            ((self.width * self.dpr).floor() as u32).max(1),
            ((self.height * self.dpr).floor() as u32).max(1),
        )
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width, self.height) * 0.5
    }

    /// Spawn area shrunk by `margin` on every side (never inverted)
    pub fn inner_bounds(&self, margin: f32) -> (Vec2, Vec2) {
        let mx = margin.min(self.width * 0.5);
        let my = margin.min(self.height * 0.5);
        (
            Vec2::new(mx, my),
            Vec2::new(self.width - mx, self.height - my),
        )
    }
}

/// Shared pointer state written by input handlers
#[derive(Debug, Clone, PartialEq)]
pub struct PointerState {
    /// Set once the pointer has reported a position
    pub present: bool,
    pub position: Vec2,
    pub last_move_ms: f64,
    pub down: bool,
    pub down_at_ms: f64,
    /// Where the current (or last) press started
    pub down_pos: Vec2,
    /// Distance travelled since the last pointer down
    pub travel_while_down: f32,
    /// Incremented on every pointer down
    pub press_seq: u64,
    /// Incremented on every completed click
    pub click_seq: u64,
    pub click_pos: Vec2,
}

impl PointerState {
    pub fn new(position: Vec2, now_ms: f64) -> Self {
        Self {
            present: false,
            position,
            last_move_ms: now_ms,
            down: false,
            down_at_ms: 0.0,
            down_pos: position,
            travel_while_down: 0.0,
            press_seq: 0,
            click_seq: 0,
            click_pos: position,
        }
    }

    pub fn on_move(&mut self, pos: Vec2, now_ms: f64) {
        if !pos.is_finite() {
            return;
        }
        if self.down {
            self.travel_while_down += pos.distance(self.position);
        }
        self.present = true;
        self.position = pos;
        self.last_move_ms = now_ms;
    }

    pub fn on_down(&mut self, pos: Vec2, now_ms: f64) {
        if pos.is_finite() {
            self.present = true;
            self.position = pos;
        }
        self.down = true;
        self.down_at_ms = now_ms;
        self.down_pos = self.position;
        self.travel_while_down = 0.0;
        self.press_seq += 1;
    }

    pub fn on_up(&mut self) {
        if !self.down {
            return;
        }
        self.down = false;
        if self.travel_while_down <= CLICK_MOVE_THRESHOLD {
            self.click_seq += 1;
            self.click_pos = self.position;
        }
    }

    /// Pressed and moved too far to count as a click
    pub fn is_dragging(&self) -> bool {
        self.down && self.travel_while_down > CLICK_MOVE_THRESHOLD
    }
}

/// The tick's private record of which pointer events it has consumed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PointerCursor {
    pub seen_click_seq: u64,
    pub seen_press_seq: u64,
}

impl PointerCursor {
    /// Clicks completed since the last frame (collapsed to at most one)
    pub fn take_click(&mut self, pointer: &PointerState) -> Option<Vec2> {
        if pointer.click_seq != self.seen_click_seq {
            self.seen_click_seq = pointer.click_seq;
            Some(pointer.click_pos)
        } else {
            None
        }
    }

    /// True once per pointer press
    pub fn take_press(&mut self, pointer: &PointerState) -> bool {
        if pointer.press_seq != self.seen_press_seq {
            self.seen_press_seq = pointer.press_seq;
            true
        } else {
            false
        }
    }
}
