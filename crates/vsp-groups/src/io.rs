//! Line-oriented group data file.
//!
//! One record per group, delimited by `BeginGroup` / `EndGroup`. Each line
//! is a keyword followed by whitespace-separated values. Doubles are written
//! in shortest round-trip form so a reload reproduces them bit for bit.
//!
//! ```text
//! BeginGroup
//! Name "main rotor"
//! Components 2 4 5
//! Flags 0 0 1 1 0
//! Origin 1.5 0.0 0.0
//! ...
//! Inviscid CT 0.0123 0.0119
//! SpanLoad 0 12
//! Station 0.1 0.2 ...
//! EndGroup
//! ```

use nalgebra::{Quaternion, Vector3};
use std::io::{BufRead, Write};

use crate::coefficients::CoefficientSet;
use crate::group::ComponentGroup;
use crate::span_load::SpanLoadData;
use crate::{GroupError, GroupResult};

const PAIR_NAMES: [&str; 15] = [
    "Cx", "Cy", "Cz", "Cmx", "Cmy", "Cmz", "CL", "CD", "CS", "CT", "CQ", "CP", "CT_h", "CQ_h",
    "CP_h",
];

fn join(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| format!("{v:?}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Quote a name so surrounding blanks and line breaks survive a reload.
fn quote(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    out.push('"');
    for c in name.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn quat_values(q: &Quaternion<f64>) -> [f64; 4] {
    [q.w, q.i, q.j, q.k]
}

fn vec_values(v: &Vector3<f64>) -> [f64; 3] {
    [v.x, v.y, v.z]
}

impl ComponentGroup {
    /// Write the full group state as one record.
    pub fn write_data<W: Write>(&self, out: &mut W) -> GroupResult<()> {
        let b = |v: bool| if v { "1" } else { "0" };

        writeln!(out, "BeginGroup")?;
        writeln!(out, "Name {}", quote(&self.name))?;
        let comps: Vec<String> = self.components.iter().map(|c| c.to_string()).collect();
        writeln!(out, "Components {} {}", self.components.len(), comps.join(" "))?;
        writeln!(
            out,
            "Flags {} {} {} {} {}",
            b(self.is_fixed),
            b(self.is_dynamic),
            b(self.is_rotor),
            b(self.has_wings),
            b(self.has_bodies)
        )?;
        writeln!(out, "Origin {}", join(&self.origin))?;
        writeln!(out, "Axis {}", join(&self.axis))?;
        writeln!(out, "UserInputVelocity {}", join(&self.user_input_velocity))?;
        writeln!(out, "UserInputAcceleration {}", join(&self.user_input_acceleration))?;
        writeln!(out, "Omega {:?}", self.omega)?;
        writeln!(out, "AngleMax {:?}", self.angle_max)?;
        writeln!(out, "RotorDiameter {:?}", self.rotor_diameter)?;
        writeln!(out, "StartDynamicAnalysisTime {:?}", self.start_dynamic_analysis_time)?;
        writeln!(out, "StartAveragingTime {:?}", self.start_averaging_time)?;

        let r = &self.reference;
        writeln!(
            out,
            "Reference {}",
            join(&[r.density, r.vref, r.sref, r.bref, r.cref, r.alpha_deg, r.beta_deg])
        )?;

        let body = &self.body;
        writeln!(out, "Mass {:?}", body.mass)?;
        writeln!(out, "Inertia {}", join(&body.inertia))?;
        writeln!(out, "LinearMomentum {}", join(&vec_values(&body.linear_momentum)))?;
        writeln!(out, "AngularMomentum {}", join(&vec_values(&body.angular_momentum)))?;
        writeln!(out, "BodyVelocity {}", join(&vec_values(&body.velocity)))?;
        writeln!(out, "BodyAngularVelocity {}", join(&vec_values(&body.angular_velocity)))?;
        writeln!(out, "Acceleration {}", join(&vec_values(&body.acceleration)))?;
        writeln!(
            out,
            "AngularAcceleration {}",
            join(&vec_values(&body.angular_acceleration))
        )?;

        writeln!(out, "Translation {}", join(&self.translation))?;
        writeln!(out, "Velocity {}", join(&self.velocity))?;
        writeln!(out, "AngularVelocity {}", join(&self.angular_velocity))?;
        writeln!(out, "Angle {:?}", self.angle)?;
        writeln!(out, "TotalRotationAngle {:?}", self.total_rotation_angle)?;
        writeln!(out, "TimeStep {:?}", self.time_step)?;
        writeln!(out, "CurrentTime {:?}", self.current_time)?;
        writeln!(out, "NumberOfTimeSamples {}", self.number_of_time_samples)?;
        writeln!(out, "Quat {}", join(&quat_values(&self.quat)))?;
        writeln!(out, "InvQuat {}", join(&quat_values(&self.inv_quat)))?;
        writeln!(out, "WQuat {}", join(&quat_values(&self.w_quat)))?;
        writeln!(out, "TotalQuat {}", join(&quat_values(&self.total_quat)))?;

        for (label, set) in [("Inviscid", &self.inviscid), ("Viscous", &self.viscous)] {
            for (name, pair) in PAIR_NAMES.iter().zip(set.pairs()) {
                writeln!(out, "{label} {name} {:?} {:?}", pair.instant, pair.average)?;
            }
        }
        writeln!(out, "EtaP {:?} {:?}", self.eta_p.instant, self.eta_p.average)?;
        writeln!(out, "FOM {:?} {:?}", self.fom.instant, self.fom.average)?;

        for (i, span) in self.span_loads.iter().enumerate() {
            writeln!(out, "SpanLoad {i} {}", span.number_of_stations())?;
            for (name, column) in span.columns() {
                writeln!(out, "{name} {}", join(column))?;
            }
        }
        writeln!(out, "EndGroup")?;
        Ok(())
    }

    /// Read one record. Fails with [`GroupError::EndOfInput`] when the input
    /// holds no further `BeginGroup`.
    pub fn load_data<R: BufRead>(input: &mut R) -> GroupResult<Self> {
        let mut reader = RecordReader::new(input);
        reader.read_group()?.ok_or(GroupError::EndOfInput)
    }
}

/// Write every group in order.
pub fn write_groups<W: Write>(out: &mut W, groups: &[ComponentGroup]) -> GroupResult<()> {
    writeln!(out, "NumberOfGroups {}", groups.len())?;
    for group in groups {
        group.write_data(out)?;
    }
    Ok(())
}

/// Read all groups written by [`write_groups`].
pub fn read_groups<R: BufRead>(input: &mut R) -> GroupResult<Vec<ComponentGroup>> {
    let mut reader = RecordReader::new(input);
    let expected = match reader.next_line()? {
        Some(line) => {
            let mut f = Fields::new(&line, reader.line);
            f.keyword("NumberOfGroups")?;
            f.usize()?
        }
        None => return Err(GroupError::EndOfInput),
    };

    let mut groups = Vec::with_capacity(expected);
    while let Some(group) = reader.read_group()? {
        groups.push(group);
    }
    if groups.len() != expected {
        return Err(GroupError::Parse {
            line: reader.line,
            what: format!("expected {expected} groups, found {}", groups.len()),
        });
    }
    Ok(groups)
}

struct RecordReader<'a, R> {
    input: &'a mut R,
    line: usize,
}

impl<'a, R: BufRead> RecordReader<'a, R> {
    fn new(input: &'a mut R) -> Self {
        Self { input, line: 0 }
    }

    /// Next non-blank line, trimmed of the line terminator.
    fn next_line(&mut self) -> GroupResult<Option<String>> {
        loop {
            let mut buf = String::new();
            if self.input.read_line(&mut buf)? == 0 {
                return Ok(None);
            }
            self.line += 1;
            let trimmed = buf.trim_end_matches(['\n', '\r']);
            if !trimmed.trim().is_empty() {
                return Ok(Some(trimmed.to_string()));
            }
        }
    }

    fn require_line(&mut self) -> GroupResult<String> {
        self.next_line()?.ok_or(GroupError::Parse {
            line: self.line,
            what: "unexpected end of input inside group".to_string(),
        })
    }

    fn read_group(&mut self) -> GroupResult<Option<ComponentGroup>> {
        let Some(first) = self.next_line()? else {
            return Ok(None);
        };
        if first.trim() != "BeginGroup" {
            return Err(self.error(format!("expected BeginGroup, found '{}'", first.trim())));
        }

        let mut g = ComponentGroup::default();
        loop {
            let line = self.require_line()?;
            let mut f = Fields::new(&line, self.line);
            let key = f.next_token()?;
            match key {
                "EndGroup" => break,
                "Name" => g.name = f.name()?,
                "Components" => {
                    let n = f.usize()?;
                    g.components = (0..n).map(|_| f.usize()).collect::<GroupResult<_>>()?;
                }
                "Flags" => {
                    g.is_fixed = f.flag()?;
                    g.is_dynamic = f.flag()?;
                    g.is_rotor = f.flag()?;
                    g.has_wings = f.flag()?;
                    g.has_bodies = f.flag()?;
                }
                "Origin" => g.origin = f.vec3()?,
                "Axis" => g.axis = f.vec3()?,
                "UserInputVelocity" => g.user_input_velocity = f.vec3()?,
                "UserInputAcceleration" => g.user_input_acceleration = f.vec3()?,
                "Omega" => g.omega = f.f64()?,
                "AngleMax" => g.angle_max = f.f64()?,
                "RotorDiameter" => g.rotor_diameter = f.f64()?,
                "StartDynamicAnalysisTime" => g.start_dynamic_analysis_time = f.f64()?,
                "StartAveragingTime" => g.start_averaging_time = f.f64()?,
                "Reference" => {
                    let r = &mut g.reference;
                    r.density = f.f64()?;
                    r.vref = f.f64()?;
                    r.sref = f.f64()?;
                    r.bref = f.f64()?;
                    r.cref = f.f64()?;
                    r.alpha_deg = f.f64()?;
                    r.beta_deg = f.f64()?;
                }
                "Mass" => g.body.mass = f.f64()?,
                "Inertia" => {
                    for v in g.body.inertia.iter_mut() {
                        *v = f.f64()?;
                    }
                }
                "LinearMomentum" => g.body.linear_momentum = f.vector3()?,
                "AngularMomentum" => g.body.angular_momentum = f.vector3()?,
                "BodyVelocity" => g.body.velocity = f.vector3()?,
                "BodyAngularVelocity" => g.body.angular_velocity = f.vector3()?,
                "Acceleration" => g.body.acceleration = f.vector3()?,
                "AngularAcceleration" => g.body.angular_acceleration = f.vector3()?,
                "Translation" => g.translation = f.vec3()?,
                "Velocity" => g.velocity = f.vec3()?,
                "AngularVelocity" => g.angular_velocity = f.vec3()?,
                "Angle" => g.angle = f.f64()?,
                "TotalRotationAngle" => g.total_rotation_angle = f.f64()?,
                "TimeStep" => g.time_step = f.f64()?,
                "CurrentTime" => g.current_time = f.f64()?,
                "NumberOfTimeSamples" => g.number_of_time_samples = f.usize()?,
                "Quat" => g.quat = f.quaternion()?,
                "InvQuat" => g.inv_quat = f.quaternion()?,
                "WQuat" => g.w_quat = f.quaternion()?,
                "TotalQuat" => g.total_quat = f.quaternion()?,
                "Inviscid" => read_pair(&mut g.inviscid, &mut f)?,
                "Viscous" => read_pair(&mut g.viscous, &mut f)?,
                "EtaP" => {
                    g.eta_p.instant = f.f64()?;
                    g.eta_p.average = f.f64()?;
                }
                "FOM" => {
                    g.fom.instant = f.f64()?;
                    g.fom.average = f.f64()?;
                }
                "SpanLoad" => {
                    let index = f.usize()?;
                    let stations = f.usize()?;
                    if index != g.span_loads.len() {
                        return Err(self.error(format!("span load {index} out of sequence")));
                    }
                    let span = self.read_span_load(stations)?;
                    g.span_loads.push(span);
                }
                other => return Err(self.error(format!("unknown keyword '{other}'"))),
            }
        }
        Ok(Some(g))
    }

    fn read_span_load(&mut self, stations: usize) -> GroupResult<SpanLoadData> {
        let mut span = SpanLoadData::with_stations(stations);
        for _ in 0..span.columns().len() {
            let line = self.require_line()?;
            let mut f = Fields::new(&line, self.line);
            let name = f.next_token()?;
            let Some(column) = span.column_mut(name) else {
                return Err(self.error(format!("unknown span load column '{name}'")));
            };
            for v in column.iter_mut() {
                *v = f.f64()?;
            }
        }
        Ok(span)
    }

    fn error(&self, what: String) -> GroupError {
        GroupError::Parse {
            line: self.line,
            what,
        }
    }
}

fn read_pair(set: &mut CoefficientSet, f: &mut Fields<'_>) -> GroupResult<()> {
    let name = f.next_token()?;
    let Some(k) = PAIR_NAMES.iter().position(|n| *n == name) else {
        return Err(f.error(format!("unknown coefficient '{name}'")));
    };
    let instant = f.f64()?;
    let average = f.f64()?;
    let Some(pair) = set.pairs_mut().into_iter().nth(k) else {
        return Err(f.error(format!("unknown coefficient '{name}'")));
    };
    pair.instant = instant;
    pair.average = average;
    Ok(())
}

/// Whitespace token cursor over one line.
struct Fields<'a> {
    rest: &'a str,
    line: usize,
}

impl<'a> Fields<'a> {
    fn new(text: &'a str, line: usize) -> Self {
        Self {
            rest: text.trim_start(),
            line,
        }
    }

    fn error(&self, what: String) -> GroupError {
        GroupError::Parse {
            line: self.line,
            what,
        }
    }

    fn next_token(&mut self) -> GroupResult<&'a str> {
        let s = self.rest.trim_start();
        if s.is_empty() {
            return Err(self.error("missing value".to_string()));
        }
        let end = s.find(char::is_whitespace).unwrap_or(s.len());
        let (tok, rest) = s.split_at(end);
        self.rest = rest;
        Ok(tok)
    }

    fn rest(&self) -> &'a str {
        self.rest.trim()
    }

    /// A quoted, escaped name; unquoted text is taken as written.
    fn name(&self) -> GroupResult<String> {
        let text = self.rest();
        let Some(inner) = text.strip_prefix('"') else {
            return Ok(text.to_string());
        };
        let inner = inner
            .strip_suffix('"')
            .ok_or_else(|| self.error("unterminated name".to_string()))?;
        let mut out = String::with_capacity(inner.len());
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            if c != '\\' {
                out.push(c);
                continue;
            }
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some('t') => out.push('\t'),
                Some(c @ ('"' | '\\')) => out.push(c),
                other => return Err(self.error(format!("invalid escape in name: {other:?}"))),
            }
        }
        Ok(out)
    }

    fn keyword(&mut self, expected: &str) -> GroupResult<()> {
        let tok = self.next_token()?;
        if tok == expected {
            Ok(())
        } else {
            Err(self.error(format!("expected {expected}, found '{tok}'")))
        }
    }

    fn f64(&mut self) -> GroupResult<f64> {
        let tok = self.next_token()?;
        tok.parse()
            .map_err(|_| self.error(format!("invalid number '{tok}'")))
    }

    fn usize(&mut self) -> GroupResult<usize> {
        let tok = self.next_token()?;
        tok.parse()
            .map_err(|_| self.error(format!("invalid count '{tok}'")))
    }

    fn flag(&mut self) -> GroupResult<bool> {
        match self.next_token()? {
            "0" => Ok(false),
            "1" => Ok(true),
            tok => Err(self.error(format!("invalid flag '{tok}'"))),
        }
    }

    fn vec3(&mut self) -> GroupResult<[f64; 3]> {
        Ok([self.f64()?, self.f64()?, self.f64()?])
    }

    fn vector3(&mut self) -> GroupResult<Vector3<f64>> {
        Ok(Vector3::from(self.vec3()?))
    }

    fn quaternion(&mut self) -> GroupResult<Quaternion<f64>> {
        let [w, i, j, k] = [self.f64()?, self.f64()?, self.f64()?, self.f64()?];
        Ok(Quaternion::new(w, i, j, k))
    }
}
