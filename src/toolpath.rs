//! Toolpath emission: the machine cursor, run/layer state and extruder control.

use crate::config::MachineConfig;
use crate::error::{ConfigError, EmitError, EmitResult};
use crate::extruder::Extruder;
use crate::gcode::{Command, CommandSink};
use crate::geom::{Pt, round_to};
use crate::mpoly::MPoly;
use crate::poly::Polygon;
use crate::purge::PurgePlanner;
use crate::slice_bitmap::Material;
use tracing::{debug, info, warn};

// Decimal places of emitted values.
pub const XY_PLACES: i32 = 2;
pub const Z_PLACES: i32 = 4;
pub const F_PLACES: i32 = 1;
pub const E_PLACES: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitterState {
    Idle,
    RunStarted,
    LayerStarted,
    Extruding,
    Traveling,
    Terminated,
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Turns motion and extrusion requests into rounded machine commands.
///
/// Out-of-range coordinates and feed rates are clamped and logged. Only a
/// failing sink or a call after `terminate` is an error.
pub struct Emitter<S: CommandSink> {
    machine: MachineConfig,
    extruders: Vec<Extruder>,
    purge: PurgePlanner,
    sink: S,
    state: EmitterState,
    pos: Position,
    feedrate: f64,
    force_feedrate: bool,
    selected: Option<usize>,
    force_select: bool,
    layer: Option<i64>,
    total_extruded: f64,
}

fn clamp_axis(axis: &str, v: f64, max: f64) -> f64 {
    if v.is_nan() {
        warn!(axis = axis, "coordinate is NaN, using 0");
        return 0.0;
    }
    if !(0.0..=max).contains(&v) {
        warn!(axis = axis, value = v, max = max, "coordinate outside the machine, clamped");
    }
    v.clamp(0.0, max)
}

impl<S: CommandSink> Emitter<S> {
    /// One logical extruder per configured extruder; extruders on the same
    /// channel share physical state.
    pub fn new(machine: MachineConfig, sink: S) -> Result<Self, ConfigError> {
        let extruders = Extruder::from_configs(&machine.extruders);
        Self::with_extruders(machine, extruders, sink)
    }

    /// Use prebuilt extruders, for callers that wire state handles themselves.
    pub fn with_extruders(
        machine: MachineConfig,
        extruders: Vec<Extruder>,
        sink: S,
    ) -> Result<Self, ConfigError> {
        machine.validate()?;
        if extruders.is_empty() {
            return Err(ConfigError::NoExtruders);
        }
        let purge = PurgePlanner::new(
            Pt::new(machine.dump_x, machine.dump_y),
            Pt::new(machine.bed_x / 2.0, machine.bed_y / 2.0),
        );
        Ok(Self {
            machine,
            extruders,
            purge,
            sink,
            state: EmitterState::Idle,
            pos: Position::default(),
            feedrate: 0.0,
            force_feedrate: true,
            selected: None,
            force_select: true,
            layer: None,
            total_extruded: 0.0,
        })
    }

    // Accessors
    // ----------------------------------------------------------------------

    pub fn position(&self) -> Position {
        self.pos
    }

    pub fn feedrate(&self) -> f64 {
        self.feedrate
    }

    pub fn max_feedrate_xy(&self) -> f64 {
        self.machine.max_feedrate_xy
    }

    pub fn max_feedrate_z(&self) -> f64 {
        self.machine.max_feedrate_z
    }

    pub fn state(&self) -> EmitterState {
        self.state
    }

    pub fn selected_extruder(&self) -> Option<usize> {
        self.selected
    }

    /// Net feedstock pushed over the whole run, retractions subtracted.
    pub fn total_extruded(&self) -> f64 {
        self.total_extruded
    }

    pub fn layer(&self) -> Option<i64> {
        self.layer
    }

    pub fn machine(&self) -> &MachineConfig {
        &self.machine
    }

    pub fn extruders(&self) -> &[Extruder] {
        &self.extruders
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    // Internals
    // ----------------------------------------------------------------------

    fn check_live(&self) -> EmitResult<()> {
        if self.state == EmitterState::Terminated {
            return Err(EmitError::Terminated);
        }
        Ok(())
    }

    fn in_layer(&self) -> bool {
        matches!(
            self.state,
            EmitterState::LayerStarted | EmitterState::Extruding | EmitterState::Traveling
        )
    }

    fn emit(&mut self, cmd: Command, note: Option<&str>) -> EmitResult<()> {
        self.sink.emit(&cmd, note)?;
        Ok(())
    }

    fn comment(&mut self, text: String) -> EmitResult<()> {
        self.emit(Command::Comment(text), None)
    }

    fn clamp_feed(&self, requested: f64, limit: f64) -> f64 {
        let f = if !requested.is_finite() || requested <= 0.0 {
            warn!(requested = requested, limit = limit, "unusable feed rate, using the limit");
            limit
        } else if requested > limit {
            warn!(requested = requested, limit = limit, "feed rate above the limit, clamped");
            limit
        } else {
            requested
        };
        round_to(f, F_PLACES)
    }

    /// The F word to send, if the rate differs from the last one sent.
    fn feed_field(&mut self, f: f64) -> Option<f64> {
        if self.force_feedrate || f != self.feedrate {
            self.feedrate = f;
            self.force_feedrate = false;
            Some(f)
        } else {
            None
        }
    }

    /// Move the selected extruder's absolute feed position by `delta` and
    /// return the E word to emit. The position itself is kept unrounded.
    fn advance_feed(&mut self, delta: f64) -> Option<f64> {
        let ex = &self.extruders[self.selected?];
        let abs = ex.extruded_length() + delta;
        self.total_extruded += ex.feed_to(abs);
        Some(round_to(abs, E_PLACES))
    }

    fn z_move(&mut self, z: f64, feedrate: Option<f64>) -> EmitResult<()> {
        let limit = self.machine.max_feedrate_z;
        let f = self.clamp_feed(feedrate.unwrap_or(limit), limit);
        let f = self.feed_field(f);
        self.emit(Command::Move { x: None, y: None, z: Some(z), e: None, f }, None)?;
        self.pos.z = z;
        Ok(())
    }

    fn xy_move(&mut self, x: f64, y: f64, feedrate: Option<f64>) -> EmitResult<()> {
        let dist = Pt::new(x, y).dist(Pt::new(self.pos.x, self.pos.y));
        let active = self.selected.map(|i| &self.extruders[i]);
        let extruding = active.is_some_and(|ex| ex.is_extruding());
        let e_len = active.map_or(0.0, |ex| ex.extrusion_for(dist));
        let (limit, default) = match active {
            Some(ex) if extruding => (
                self.machine.max_feedrate_xy.min(ex.config().max_feedrate),
                ex.config().extrusion_feedrate,
            ),
            _ => (self.machine.max_feedrate_xy, self.machine.fast_feedrate_xy),
        };

        let f = self.clamp_feed(feedrate.unwrap_or(default), limit);
        let f = self.feed_field(f);
        let e = if e_len > 0.0 { self.advance_feed(e_len) } else { None };
        let cmd = Command::Move {
            x: (x != self.pos.x).then_some(x),
            y: (y != self.pos.y).then_some(y),
            z: None,
            e,
            f,
        };
        self.emit(cmd, None)?;
        self.pos.x = x;
        self.pos.y = y;
        if self.in_layer() {
            self.state = if extruding { EmitterState::Extruding } else { EmitterState::Traveling };
        }
        Ok(())
    }

    fn purge(&mut self, index: usize) -> EmitResult<()> {
        let resume = Pt::new(self.pos.x, self.pos.y);
        let width = self.extruders[index].config().extrusion_width;
        let waypoints = self.purge.waypoints(index, width);
        let Some((first, rest)) = waypoints.split_first() else {
            return Ok(());
        };
        self.comment(format!("purge extruder {index}"))?;
        let z = self.pos.z;
        self.travel_to(first.x, first.y)?;
        self.start_extruder(false)?;
        for p in rest {
            self.move_to(p.x, p.y, z, None)?;
        }
        self.retract()?;
        self.travel_to(resume.x, resume.y)
    }

    fn emit_skirt(&mut self, outline: &MPoly) -> EmitResult<()> {
        let skirt = outline.inflate(self.machine.skirt_gap);
        if skirt.is_empty() {
            return Ok(());
        }
        self.select_extruder(0)?;
        self.comment("skirt".to_string())?;
        let (x, y) = (self.pos.x, self.pos.y);
        self.move_to(x, y, self.machine.layer_height, None)?;
        for (i, poly) in skirt.to_polygons().iter().enumerate() {
            self.plot_polygon(poly, i == 0)?;
        }
        self.state = EmitterState::RunStarted;
        Ok(())
    }

    // Operations
    // ----------------------------------------------------------------------

    /// Move to (x, y, z), extruding if the extruder is running.
    ///
    /// A move changing both Z and XY is split: Z first when rising, XY first
    /// when descending. A move that rounds to the current position emits
    /// nothing.
    pub fn move_to(&mut self, x: f64, y: f64, z: f64, feedrate: Option<f64>) -> EmitResult<()> {
        self.check_live()?;
        let x = round_to(clamp_axis("x", x, self.machine.bed_x), XY_PLACES);
        let y = round_to(clamp_axis("y", y, self.machine.bed_y), XY_PLACES);
        let z = round_to(clamp_axis("z", z, self.machine.bed_z), Z_PLACES);

        let z_changed = z != self.pos.z;
        let xy_changed = x != self.pos.x || y != self.pos.y;
        match (z_changed, xy_changed) {
            (false, false) => {
                debug!(x = x, y = y, z = z, "move suppressed, already there");
                Ok(())
            }
            (true, false) => self.z_move(z, feedrate),
            (false, true) => self.xy_move(x, y, feedrate),
            (true, true) => {
                warn!(from_z = self.pos.z, to_z = z, "move changes Z and XY together, split in two");
                if z > self.pos.z {
                    self.z_move(z, None)?;
                    self.xy_move(x, y, feedrate)
                } else {
                    self.xy_move(x, y, feedrate)?;
                    self.z_move(z, None)
                }
            }
        }
    }

    /// Non-extruding XY move at the current Z, lifting by the extruder's
    /// configured lift on the way.
    pub fn travel_to(&mut self, x: f64, y: f64) -> EmitResult<()> {
        self.check_live()?;
        if round_to(x, XY_PLACES) == self.pos.x && round_to(y, XY_PLACES) == self.pos.y {
            return Ok(());
        }
        let active = self.selected.map(|i| &self.extruders[i]);
        if let Some(ex) = active {
            ex.stop();
        }
        let lift = active.map_or(0.0, |ex| ex.config().lift);
        let z = self.pos.z;
        if lift > 0.0 {
            let (px, py) = (self.pos.x, self.pos.y);
            self.move_to(px, py, z + lift, None)?;
            self.move_to(x, y, z + lift, None)?;
            self.move_to(x, y, z, None)
        } else {
            self.move_to(x, y, z, None)
        }
    }

    /// Begin a run: home, absolute modes, cursor at the origin. The next feed
    /// rate and extruder selection are always sent. With the skirt enabled,
    /// `outline` grown by the skirt gap is extruded once at first-layer
    /// height.
    pub fn start_run(&mut self, outline: Option<&MPoly>) -> EmitResult<()> {
        self.check_live()?;
        if self.state != EmitterState::Idle {
            warn!(state = ?self.state, "run restarted");
        }
        info!(extruders = self.extruders.len(), "starting run");
        self.comment("rslice run".to_string())?;
        self.emit(Command::Home, None)?;
        self.emit(Command::AbsolutePositioning, None)?;
        self.emit(Command::AbsoluteExtrusion, None)?;
        self.emit(Command::SetExtruderPosition(0.0), None)?;
        for ex in &self.extruders {
            ex.stop();
            ex.reset_layer();
        }
        self.pos = Position::default();
        self.force_feedrate = true;
        self.force_select = true;
        self.layer = None;
        self.state = EmitterState::RunStarted;

        match outline {
            Some(outline) if self.machine.skirt => self.emit_skirt(outline),
            _ => Ok(()),
        }
    }

    /// Begin layer `layer` at height `z`: zero the feed counters and rise.
    pub fn starting_layer(&mut self, layer: i64, z: f64) -> EmitResult<()> {
        self.check_live()?;
        if self.state == EmitterState::Idle {
            warn!(layer = layer, "layer started before the run");
            self.start_run(None)?;
        }
        for ex in &self.extruders {
            ex.stop();
            ex.reset_layer();
        }
        self.comment(format!("layer {layer}"))?;
        self.emit(Command::SetExtruderPosition(0.0), None)?;
        self.layer = Some(layer);
        self.state = EmitterState::LayerStarted;
        let (x, y) = (self.pos.x, self.pos.y);
        self.move_to(x, y, z, None)?;
        debug!(layer = layer, z = z, "layer started");
        Ok(())
    }

    /// Select extruder `index`. Out of range falls back to extruder 0.
    /// With the shield on, a switch inside a layer purges at the dump point
    /// and returns.
    pub fn select_extruder(&mut self, index: usize) -> EmitResult<()> {
        self.check_live()?;
        let index = if index >= self.extruders.len() {
            warn!(index = index, count = self.extruders.len(), "no such extruder, using extruder 0");
            0
        } else {
            index
        };
        if self.selected == Some(index) && !self.force_select {
            return Ok(());
        }
        if let Some(old) = self.selected {
            self.extruders[old].stop();
        }

        let ex = &self.extruders[index];
        let tool = ex.tool();
        let material = ex.config().material.to_string();
        let e_abs = round_to(ex.extruded_length(), E_PLACES);
        self.emit(Command::SelectTool(tool), Some(&material))?;
        self.emit(Command::SetExtruderPosition(e_abs), None)?;
        self.selected = Some(index);
        self.force_select = false;
        self.force_feedrate = true;
        info!(extruder = index, tool = tool, material = %material, "selected extruder");

        if self.machine.shield && self.in_layer() {
            self.purge(index)?;
        }
        Ok(())
    }

    /// Select the first extruder loaded with `material`, else extruder 0.
    pub fn select_material(&mut self, material: &Material) -> EmitResult<()> {
        let index = match self.extruders.iter().position(|ex| &ex.config().material == material) {
            Some(i) => i,
            None => {
                warn!(material = %material, "no extruder loaded with material, using extruder 0");
                0
            }
        };
        self.select_extruder(index)
    }

    /// Start extruding: repay any retraction debt, then prime.
    pub fn start_extruder(&mut self, first_in_layer: bool) -> EmitResult<()> {
        self.check_live()?;
        let i = match self.selected {
            Some(i) => i,
            None => {
                warn!("no extruder selected, using extruder 0");
                self.select_extruder(0)?;
                0
            }
        };
        let retract_f = round_to(self.extruders[i].config().retraction_feedrate, F_PLACES);

        let debt = self.extruders[i].take_debt();
        if debt > 0.0 {
            let e = self.advance_feed(debt);
            let f = self.feed_field(retract_f);
            self.emit(Command::Move { x: None, y: None, z: None, e, f }, Some("unretract"))?;
        }
        let prime = self.extruders[i].prime_length(first_in_layer);
        if prime > 0.0 {
            let e = self.advance_feed(prime);
            let f = self.feed_field(retract_f);
            self.emit(Command::Move { x: None, y: None, z: None, e, f }, Some("prime"))?;
        }

        self.extruders[i].begin();
        if self.in_layer() {
            self.state = EmitterState::Extruding;
        }
        Ok(())
    }

    /// Stop extruding, pulling the feedstock back by the retraction distance.
    /// The pulled length becomes debt repaid by the next `start_extruder`.
    pub fn retract(&mut self) -> EmitResult<()> {
        self.check_live()?;
        let Some(i) = self.selected else {
            return Ok(());
        };
        let cfg = self.extruders[i].config();
        let (dist, retract_f) = (cfg.retraction_distance, round_to(cfg.retraction_feedrate, F_PLACES));
        if dist > 0.0 {
            self.extruders[i].set_reversed(true);
            let e = self.advance_feed(-dist);
            let f = self.feed_field(retract_f);
            self.emit(Command::Move { x: None, y: None, z: None, e, f }, Some("retract"))?;
            self.extruders[i].add_debt(dist);
        }
        self.extruders[i].stop();
        if self.in_layer() {
            self.state = EmitterState::Traveling;
        }
        Ok(())
    }

    /// Extrude `poly`: travel to its start, extrude along it (back to the
    /// start when closed), retract.
    pub fn plot_polygon(&mut self, poly: &Polygon, first_in_layer: bool) -> EmitResult<()> {
        let Some((start, rest)) = poly.points.split_first() else {
            return Ok(());
        };
        if rest.is_empty() {
            return Ok(());
        }
        self.travel_to(start.x, start.y)?;
        self.start_extruder(first_in_layer)?;
        let z = self.pos.z;
        for p in rest {
            self.move_to(p.x, p.y, z, None)?;
        }
        if poly.closed {
            self.move_to(start.x, start.y, z, None)?;
        }
        self.retract()
    }

    /// End the run: park at the dump point when shielding, emit the closing
    /// block and close the sink. Every later call fails.
    pub fn terminate(&mut self) -> EmitResult<()> {
        self.check_live()?;
        if self.selected.is_some_and(|i| self.extruders[i].is_extruding()) {
            self.retract()?;
        }
        if self.machine.shield {
            let dump = self.purge.dump;
            self.travel_to(dump.x, dump.y)?;
        }
        self.comment("end of run".to_string())?;
        self.emit(Command::Raw("M84".to_string()), Some("motors off"))?;
        self.sink.close()?;
        self.state = EmitterState::Terminated;
        info!(total_extruded = self.total_extruded, "run terminated");
        Ok(())
    }
}
