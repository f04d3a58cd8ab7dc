//! Logical extruders and the physical state they share.
//!
//! Several logical extruders (one per configured material) may drive the
//! same physical channel. They share one `PhysicalState` through a
//! `SharedExtruderState` handle, so a mutation made through any of them is
//! seen by all the others.

use crate::config::ExtruderConfig;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct PhysicalState {
    /// Absolute feed position since the last layer reset.
    pub extruded_length: f64,
    /// Retracted length not yet paid back.
    pub retraction_debt: f64,
    /// Feeding backwards (retracting).
    pub reversed: bool,
    pub extruding: bool,
}

pub type SharedExtruderState = Rc<RefCell<PhysicalState>>;

pub fn new_shared_state() -> SharedExtruderState {
    Rc::new(RefCell::new(PhysicalState::default()))
}

#[derive(Debug, Clone)]
pub struct Extruder {
    index: usize,
    config: ExtruderConfig,
    state: SharedExtruderState,
}

impl Extruder {
    /// Build a logical extruder over an existing physical state handle.
    pub fn new(index: usize, config: ExtruderConfig, state: SharedExtruderState) -> Self {
        Self { index, config, state }
    }

    /// One extruder per config. Configs on the same channel share a state.
    pub fn from_configs(configs: &[ExtruderConfig]) -> Vec<Extruder> {
        let mut by_channel: HashMap<usize, SharedExtruderState> = HashMap::new();
        configs
            .iter()
            .enumerate()
            .map(|(i, cfg)| {
                let state = by_channel.entry(cfg.channel).or_insert_with(new_shared_state).clone();
                Extruder::new(i, cfg.clone(), state)
            })
            .collect()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn config(&self) -> &ExtruderConfig {
        &self.config
    }

    /// Tool number sent to the machine.
    pub fn tool(&self) -> usize {
        self.config.channel
    }

    pub fn state(&self) -> &SharedExtruderState {
        &self.state
    }

    pub fn shares_state_with(&self, other: &Extruder) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }

    pub fn snapshot(&self) -> PhysicalState {
        *self.state.borrow()
    }

    pub fn is_extruding(&self) -> bool {
        self.state.borrow().extruding
    }

    pub fn extruded_length(&self) -> f64 {
        self.state.borrow().extruded_length
    }

    pub fn retraction_debt(&self) -> f64 {
        self.state.borrow().retraction_debt
    }

    /// Feed length for an XY move of length `dist`; zero unless extruding forward.
    pub fn extrusion_for(&self, dist: f64) -> f64 {
        let s = self.state.borrow();
        if s.extruding && !s.reversed {
            dist * self.config.extrusion_per_mm()
        } else {
            0.0
        }
    }

    /// Priming length for the next start.
    pub fn prime_length(&self, first_in_layer: bool) -> f64 {
        if first_in_layer {
            self.config.extra_extrude_first
        } else {
            self.config.extra_extrude_polygon
        }
    }

    /// Set the absolute feed position, returning the signed change.
    pub fn feed_to(&self, abs: f64) -> f64 {
        let mut s = self.state.borrow_mut();
        let delta = abs - s.extruded_length;
        s.extruded_length = abs;
        delta
    }

    pub fn begin(&self) {
        let mut s = self.state.borrow_mut();
        s.extruding = true;
        s.reversed = false;
    }

    pub fn stop(&self) {
        let mut s = self.state.borrow_mut();
        s.extruding = false;
        s.reversed = false;
    }

    pub fn set_reversed(&self, reversed: bool) {
        self.state.borrow_mut().reversed = reversed;
    }

    pub fn add_debt(&self, len: f64) {
        self.state.borrow_mut().retraction_debt += len;
    }

    /// Clear the outstanding retraction and return it.
    pub fn take_debt(&self) -> f64 {
        std::mem::take(&mut self.state.borrow_mut().retraction_debt)
    }

    /// Zero the feed position at a layer boundary. Debt is kept.
    pub fn reset_layer(&self) {
        self.state.borrow_mut().extruded_length = 0.0;
    }
}
