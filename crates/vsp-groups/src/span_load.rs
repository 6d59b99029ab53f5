//! Spanwise sectional loads for one lifting surface.

/// Sectional load distribution along one lifting surface of a group.
///
/// All arrays have `number_of_stations()` entries, ordered along the span.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SpanLoadData {
    /// Span coordinate of each strip centre (m)
    pub station: Vec<f64>,
    /// Mean strip chord (m)
    pub chord: Vec<f64>,
    /// Strip planform area (m²)
    pub area: Vec<f64>,
    /// Sectional lift, drag and side force coefficients
    pub cl: Vec<f64>,
    pub cd: Vec<f64>,
    pub cs: Vec<f64>,
    /// Sectional body-axis force coefficients
    pub cx: Vec<f64>,
    pub cy: Vec<f64>,
    pub cz: Vec<f64>,
}

impl SpanLoadData {
    pub fn with_stations(n: usize) -> Self {
        let mut data = Self::default();
        data.size(n);
        data
    }

    /// Resize every array to `n` stations, zero-filling new entries.
    pub fn size(&mut self, n: usize) {
        for column in self.columns_mut() {
            column.resize(n, 0.0);
        }
    }

    pub fn number_of_stations(&self) -> usize {
        self.station.len()
    }

    /// Named columns in file order.
    pub fn columns(&self) -> [(&'static str, &Vec<f64>); 9] {
        [
            ("Station", &self.station),
            ("Chord", &self.chord),
            ("Area", &self.area),
            ("Cl", &self.cl),
            ("Cd", &self.cd),
            ("Cs", &self.cs),
            ("Cx", &self.cx),
            ("Cy", &self.cy),
            ("Cz", &self.cz),
        ]
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Vec<f64>> {
        match name {
            "Station" => Some(&mut self.station),
            "Chord" => Some(&mut self.chord),
            "Area" => Some(&mut self.area),
            "Cl" => Some(&mut self.cl),
            "Cd" => Some(&mut self.cd),
            "Cs" => Some(&mut self.cs),
            "Cx" => Some(&mut self.cx),
            "Cy" => Some(&mut self.cy),
            "Cz" => Some(&mut self.cz),
            _ => None,
        }
    }

    fn columns_mut(&mut self) -> [&mut Vec<f64>; 9] {
        [
            &mut self.station,
            &mut self.chord,
            &mut self.area,
            &mut self.cl,
            &mut self.cd,
            &mut self.cs,
            &mut self.cx,
            &mut self.cy,
            &mut self.cz,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_keeps_columns_aligned() {
        let mut data = SpanLoadData::with_stations(3);
        data.cl[2] = 0.7;
        data.size(5);
        for (_, col) in data.columns() {
            assert_eq!(col.len(), 5);
        }
        assert_eq!(data.cl[2], 0.7);
        assert_eq!(data.cl[4], 0.0);
    }
}
