//! Machine commands and the sinks that receive them.

use crate::geom::round_to;
use crate::toolpath::{E_PLACES, F_PLACES, XY_PLACES, Z_PLACES};
use std::io::{self, Write};

// Half away from zero, matching the emitter. `{:.N}` alone rounds exact ties
// to even.
fn fixed(v: f64, places: i32) -> String {
    format!("{:.*}", places as usize, round_to(v, places))
}

/// One machine command. Coordinates are already rounded by the emitter.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// G1 - Linear move, optionally extruding to absolute `e`.
    Move {
        x: Option<f64>,
        y: Option<f64>,
        z: Option<f64>,
        e: Option<f64>,
        f: Option<f64>,
    },
    /// G28 - Home all axes
    Home,
    /// G90 - Absolute positioning
    AbsolutePositioning,
    /// M82 - Absolute extrusion
    AbsoluteExtrusion,
    /// G92 E - Redefine the extruder position
    SetExtruderPosition(f64),
    /// T - Tool select
    SelectTool(usize),
    /// Comment
    Comment(String),
    /// Raw G-code line
    Raw(String),
}

impl Command {
    pub fn is_move(&self) -> bool {
        matches!(self, Command::Move { .. })
    }

    /// Convert the command to a G-code line (no newline).
    pub fn to_gcode(&self) -> String {
        match self {
            Command::Move { x, y, z, e, f } => {
                let mut cmd = String::from("G1");
                let fields = [
                    ('X', x, XY_PLACES),
                    ('Y', y, XY_PLACES),
                    ('Z', z, Z_PLACES),
                    ('E', e, E_PLACES),
                    ('F', f, F_PLACES),
                ];
                for (axis, v, places) in fields {
                    if let Some(v) = v {
                        cmd.push_str(&format!(" {axis}{}", fixed(*v, places)));
                    }
                }
                cmd
            }
            Command::Home => "G28".to_string(),
            Command::AbsolutePositioning => "G90".to_string(),
            Command::AbsoluteExtrusion => "M82".to_string(),
            Command::SetExtruderPosition(e) => format!("G92 E{}", fixed(*e, E_PLACES)),
            Command::SelectTool(t) => format!("T{t}"),
            Command::Comment(text) => format!("; {text}"),
            Command::Raw(line) => line.clone(),
        }
    }
}

/// Receives commands one line at a time, each with an optional note.
pub trait CommandSink {
    fn emit(&mut self, cmd: &Command, note: Option<&str>) -> io::Result<()>;
    fn close(&mut self) -> io::Result<()>;
}

/// Writes commands as G-code text.
pub struct GCodeWriter<W: Write> {
    out: W,
    lines: usize,
}

impl<W: Write> GCodeWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, lines: 0 }
    }

    pub fn lines(&self) -> usize {
        self.lines
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> CommandSink for GCodeWriter<W> {
    fn emit(&mut self, cmd: &Command, note: Option<&str>) -> io::Result<()> {
        match note {
            Some(n) if !matches!(cmd, Command::Comment(_)) => {
                writeln!(self.out, "{} ; {}", cmd.to_gcode(), n)?
            }
            _ => writeln!(self.out, "{}", cmd.to_gcode())?,
        }
        self.lines += 1;
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// Keeps every command in memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub commands: Vec<Command>,
    pub closed: bool,
}

impl MemorySink {
    pub fn moves(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter().filter(|c| c.is_move())
    }
}

impl CommandSink for MemorySink {
    fn emit(&mut self, cmd: &Command, _note: Option<&str>) -> io::Result<()> {
        self.commands.push(cmd.clone());
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_uses_axis_precisions() {
        let cmd = Command::Move {
            x: Some(10.0),
            y: Some(20.125),
            z: Some(0.3),
            e: Some(1.5),
            f: Some(1200.0),
        };
        assert_eq!(cmd.to_gcode(), "G1 X10.00 Y20.13 Z0.3000 E1.500 F1200.0");

        let z_only = Command::Move { x: None, y: None, z: Some(2.0), e: None, f: None };
        assert_eq!(z_only.to_gcode(), "G1 Z2.0000");

        let ties = Command::Move { x: Some(0.125), y: Some(-0.375), z: None, e: Some(2.0625), f: None };
        assert_eq!(ties.to_gcode(), "G1 X0.13 Y-0.38 E2.063");
        assert_eq!(Command::SetExtruderPosition(0.0625).to_gcode(), "G92 E0.063");
    }

    #[test]
    fn other_commands() {
        assert_eq!(Command::SelectTool(1).to_gcode(), "T1");
        assert_eq!(Command::SetExtruderPosition(0.0).to_gcode(), "G92 E0.000");
        assert_eq!(Command::Comment("layer 3".to_string()).to_gcode(), "; layer 3");
        assert_eq!(Command::Raw("M84".to_string()).to_gcode(), "M84");
    }

    #[test]
    fn writer_appends_notes() {
        let mut w = GCodeWriter::new(Vec::new());
        w.emit(&Command::Home, Some("home")).unwrap();
        w.emit(&Command::Comment("hi".to_string()), Some("ignored")).unwrap();
        w.close().unwrap();
        assert_eq!(w.lines(), 2);
        assert_eq!(String::from_utf8(w.into_inner()).unwrap(), "G28 ; home\n; hi\n");
    }

    #[test]
    fn broken_writer_reports_io_error() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }
        let mut w = GCodeWriter::new(Broken);
        assert!(w.emit(&Command::Home, None).is_err());
    }
}
