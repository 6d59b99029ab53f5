//! Surface mesh of vortex loops.
//!
//! Each loop is a quadrilateral with nodes ordered
//! `[LE inboard, LE outboard, TE outboard, TE inboard]` so that
//! `(n2 - n0) x (n1 - n3)` points to the upper surface.
//!
//! Text format:
//! ```text
//! # comment
//! Nodes <N>
//! x y z component surface
//! Loops <M>
//! n0 n1 n2 n3 component surface strip
//! ```

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::Path;

use crate::error::{SolverError, SolverResult};

#[derive(Clone, Debug, PartialEq)]
pub struct MeshNode {
    pub xyz: [f64; 3],
    pub component: usize,
    pub surface: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MeshLoop {
    pub nodes: [usize; 4],
    pub component: usize,
    pub surface: usize,
    /// Spanwise strip index within the surface
    pub strip: usize,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    pub nodes: Vec<MeshNode>,
    pub loops: Vec<MeshLoop>,
}

impl Mesh {
    pub fn number_of_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn number_of_loops(&self) -> usize {
        self.loops.len()
    }

    pub fn node(&self, i: usize) -> Option<[f64; 3]> {
        self.nodes.get(i).map(|n| n.xyz)
    }

    /// Flat `[x0, y0, z0, x1, ...]` coordinate vector.
    pub fn coordinates(&self) -> Vec<f64> {
        self.nodes.iter().flat_map(|n| n.xyz).collect()
    }

    /// Replace every node position from a flat coordinate vector.
    pub fn set_coordinates(&mut self, xyz: &[f64]) -> SolverResult<()> {
        if xyz.len() != 3 * self.nodes.len() {
            return Err(SolverError::InvalidArg {
                what: format!(
                    "coordinate vector has length {}, expected {}",
                    xyz.len(),
                    3 * self.nodes.len()
                ),
            });
        }
        if let Some(bad) = xyz.iter().find(|v| !v.is_finite()) {
            return Err(SolverError::InvalidArg {
                what: format!("non-finite coordinate {bad}"),
            });
        }
        for (node, c) in self.nodes.iter_mut().zip(xyz.chunks_exact(3)) {
            node.xyz = [c[0], c[1], c[2]];
        }
        Ok(())
    }

    /// Distinct lifting-surface ids in ascending order.
    pub fn surfaces(&self) -> Vec<usize> {
        self.loops
            .iter()
            .map(|l| l.surface)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Distinct surfaces owned by any of `components`, ascending.
    pub fn surfaces_of_components(&self, components: &[usize]) -> Vec<usize> {
        self.loops
            .iter()
            .filter(|l| components.contains(&l.component))
            .map(|l| l.surface)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn number_of_strips(&self, surface: usize) -> usize {
        self.loops
            .iter()
            .filter(|l| l.surface == surface)
            .map(|l| l.strip + 1)
            .max()
            .unwrap_or(0)
    }

    /// Loops sharing each node.
    pub fn node_loops(&self) -> Vec<Vec<usize>> {
        let mut out = vec![Vec::new(); self.nodes.len()];
        for (k, l) in self.loops.iter().enumerate() {
            for &n in &l.nodes {
                if !out[n].contains(&k) {
                    out[n].push(k);
                }
            }
        }
        out
    }

    pub fn validate(&self) -> SolverResult<()> {
        if self.loops.is_empty() {
            return Err(SolverError::InvalidMesh {
                what: "mesh has no loops".to_string(),
            });
        }
        for (k, l) in self.loops.iter().enumerate() {
            if let Some(&n) = l.nodes.iter().find(|&&n| n >= self.nodes.len()) {
                return Err(SolverError::InvalidMesh {
                    what: format!("loop {k} references node {n} of {}", self.nodes.len()),
                });
            }
        }
        Ok(())
    }

    /// Append another mesh, renumbering its nodes.
    pub fn append(&mut self, other: &Mesh) {
        let offset = self.nodes.len();
        self.nodes.extend(other.nodes.iter().cloned());
        self.loops.extend(other.loops.iter().map(|l| MeshLoop {
            nodes: l.nodes.map(|n| n + offset),
            ..l.clone()
        }));
    }

    pub fn parse(text: &str) -> SolverResult<Self> {
        let mut rows = text
            .lines()
            .enumerate()
            .map(|(i, l)| (i + 1, l.trim()))
            .filter(|(_, l)| !l.is_empty() && !l.starts_with('#'));
        let mut next_row = |what: &str| {
            rows.next().ok_or(SolverError::MeshParse {
                line: 0,
                what: format!("unexpected end of input, expected {what}"),
            })
        };

        let n_nodes = parse_header(next_row("'Nodes'")?, "Nodes")?;
        let mut nodes = Vec::with_capacity(n_nodes);
        for _ in 0..n_nodes {
            let (line, row) = next_row("node row")?;
            let mut it = row.split_whitespace();
            let xyz = [
                parse_field(it.next(), line)?,
                parse_field(it.next(), line)?,
                parse_field(it.next(), line)?,
            ];
            nodes.push(MeshNode {
                xyz,
                component: parse_field(it.next(), line)?,
                surface: parse_field(it.next(), line)?,
            });
        }

        let n_loops = parse_header(next_row("'Loops'")?, "Loops")?;
        let mut loops = Vec::with_capacity(n_loops);
        for _ in 0..n_loops {
            let (line, row) = next_row("loop row")?;
            let mut it = row.split_whitespace();
            let mut ids = [0usize; 7];
            for id in ids.iter_mut() {
                *id = parse_field(it.next(), line)?;
            }
            loops.push(MeshLoop {
                nodes: [ids[0], ids[1], ids[2], ids[3]],
                component: ids[4],
                surface: ids[5],
                strip: ids[6],
            });
        }

        let mesh = Mesh { nodes, loops };
        mesh.validate()?;
        Ok(mesh)
    }

    pub fn to_text(&self) -> String {
        let mut s = String::new();
        let _ = writeln!(s, "Nodes {}", self.nodes.len());
        for n in &self.nodes {
            let _ = writeln!(
                s,
                "{:?} {:?} {:?} {} {}",
                n.xyz[0], n.xyz[1], n.xyz[2], n.component, n.surface
            );
        }
        let _ = writeln!(s, "Loops {}", self.loops.len());
        for l in &self.loops {
            let [a, b, c, d] = l.nodes;
            let _ = writeln!(s, "{a} {b} {c} {d} {} {} {}", l.component, l.surface, l.strip);
        }
        s
    }

    pub fn read(path: &Path) -> SolverResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn write(&self, path: &Path) -> SolverResult<()> {
        std::fs::write(path, self.to_text())?;
        Ok(())
    }
}

fn parse_header((line, row): (usize, &str), key: &str) -> SolverResult<usize> {
    let mut it = row.split_whitespace();
    if it.next() != Some(key) {
        return Err(SolverError::MeshParse {
            line,
            what: format!("expected '{key}'"),
        });
    }
    parse_field(it.next(), line)
}

fn parse_field<V: std::str::FromStr>(tok: Option<&str>, line: usize) -> SolverResult<V> {
    let tok = tok.ok_or(SolverError::MeshParse {
        line,
        what: "missing field".to_string(),
    })?;
    tok.parse().map_err(|_| SolverError::MeshParse {
        line,
        what: format!("invalid field '{tok}'"),
    })
}

/// Planar trapezoidal lifting surface generator.
///
/// The surface lies in the x-y plane before incidence, dihedral and yaw are
/// applied; chord runs along +x, span along +y.
#[derive(Clone, Debug)]
pub struct WingBuilder {
    pub origin: [f64; 3],
    pub span: f64,
    pub root_chord: f64,
    pub tip_chord: f64,
    pub sweep_le_deg: f64,
    pub dihedral_deg: f64,
    /// Nose-up section incidence (deg)
    pub incidence_deg: f64,
    /// Rotation of the whole surface about the z axis through `origin` (deg)
    pub yaw_deg: f64,
    pub root_offset: f64,
    pub n_span: usize,
    pub n_chord: usize,
    /// Span from `-span/2` to `span/2` instead of `0` to `span`
    pub full_span: bool,
    pub component: usize,
    pub surface: usize,
}

impl Default for WingBuilder {
    fn default() -> Self {
        Self {
            origin: [0.0; 3],
            span: 10.0,
            root_chord: 1.0,
            tip_chord: 1.0,
            sweep_le_deg: 0.0,
            dihedral_deg: 0.0,
            incidence_deg: 0.0,
            yaw_deg: 0.0,
            root_offset: 0.0,
            n_span: 8,
            n_chord: 2,
            full_span: true,
            component: 0,
            surface: 0,
        }
    }
}

impl WingBuilder {
    pub fn build(&self) -> SolverResult<Mesh> {
        if self.n_span == 0 || self.n_chord == 0 {
            return Err(SolverError::InvalidArg {
                what: "wing needs at least one panel in each direction".to_string(),
            });
        }
        if !(self.span > 0.0) || !(self.root_chord > 0.0) || self.tip_chord < 0.0 {
            return Err(SolverError::InvalidArg {
                what: "wing span and chords must be positive".to_string(),
            });
        }

        let (sweep, dihedral) = (
            self.sweep_le_deg.to_radians().tan(),
            self.dihedral_deg.to_radians().tan(),
        );
        let (si, ci) = self.incidence_deg.to_radians().sin_cos();
        let (sy, cy) = self.yaw_deg.to_radians().sin_cos();
        let half = if self.full_span { 0.5 * self.span } else { self.span };

        let mut nodes = Vec::with_capacity((self.n_span + 1) * (self.n_chord + 1));
        for j in 0..=self.n_span {
            let s = j as f64 / self.n_span as f64;
            let y = if self.full_span {
                -half + self.span * s
            } else {
                self.root_offset + self.span * s
            };
            let eta = if self.full_span { y.abs() / half } else { s };
            let chord = self.root_chord + (self.tip_chord - self.root_chord) * eta;
            let arm = if self.full_span { y.abs() } else { y - self.root_offset };
            let x_le = arm * sweep;
            let z_le = arm * dihedral;
            for i in 0..=self.n_chord {
                let f = i as f64 / self.n_chord as f64 * chord;
                let local = [x_le + f * ci, y, z_le - f * si];
                let xyz = [
                    self.origin[0] + cy * local[0] - sy * local[1],
                    self.origin[1] + sy * local[0] + cy * local[1],
                    self.origin[2] + local[2],
                ];
                nodes.push(MeshNode {
                    xyz,
                    component: self.component,
                    surface: self.surface,
                });
            }
        }

        let stride = self.n_chord + 1;
        let id = |i: usize, j: usize| j * stride + i;
        let mut loops = Vec::with_capacity(self.n_span * self.n_chord);
        for j in 0..self.n_span {
            for i in 0..self.n_chord {
                loops.push(MeshLoop {
                    nodes: [id(i, j), id(i, j + 1), id(i + 1, j + 1), id(i + 1, j)],
                    component: self.component,
                    surface: self.surface,
                    strip: j,
                });
            }
        }
        Ok(Mesh { nodes, loops })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_counts() {
        let mesh = WingBuilder {
            n_span: 4,
            n_chord: 3,
            ..WingBuilder::default()
        }
        .build()
        .unwrap();
        assert_eq!(mesh.number_of_nodes(), 20);
        assert_eq!(mesh.number_of_loops(), 12);
        assert_eq!(mesh.number_of_strips(0), 4);
    }

    #[test]
    fn text_roundtrip() {
        let mut mesh = WingBuilder::default().build().unwrap();
        let tail = WingBuilder {
            origin: [4.0, 0.0, 0.5],
            span: 3.0,
            component: 1,
            surface: 1,
            ..WingBuilder::default()
        }
        .build()
        .unwrap();
        mesh.append(&tail);
        let back = Mesh::parse(&mesh.to_text()).unwrap();
        assert_eq!(back, mesh);
        assert_eq!(back.surfaces(), vec![0, 1]);
    }

    #[test]
    fn set_coordinates_checks_length() {
        let mut mesh = WingBuilder::default().build().unwrap();
        assert!(mesh.set_coordinates(&[0.0; 5]).is_err());
        let mut xyz = mesh.coordinates();
        xyz[2] += 1.0;
        mesh.set_coordinates(&xyz).unwrap();
        assert_eq!(mesh.node(0).unwrap()[2], xyz[2]);
    }

    #[test]
    fn dangling_loop_is_rejected() {
        let text = "Nodes 1\n0 0 0 0 0\nLoops 1\n0 1 2 3 0 0 0\n";
        assert!(matches!(
            Mesh::parse(text),
            Err(SolverError::InvalidMesh { .. })
        ));
    }
}
