//! Persistent aero-structural parameters.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::AeroStructResult;

pub const MAX_DYNAMIC_PRESSURE: f64 = 1e12;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AeroStructSettings {
    /// Dynamic pressure used to dimensionalise transferred loads
    pub dynamic_pressure: f64,
    /// Index into structures followed by assemblies, `-1` for none
    pub current_struct_assy_index: i64,
}

impl Default for AeroStructSettings {
    fn default() -> Self {
        Self {
            dynamic_pressure: 0.0,
            current_struct_assy_index: -1,
        }
    }
}

impl AeroStructSettings {
    pub fn set_dynamic_pressure(&mut self, q: f64) {
        self.dynamic_pressure = if q.is_nan() {
            0.0
        } else {
            q.clamp(0.0, MAX_DYNAMIC_PRESSURE)
        };
    }

    pub fn set_current_struct_assy_index(&mut self, index: i64) {
        self.current_struct_assy_index = index.max(-1);
    }

    /// Selected index, if any.
    pub fn selection(&self) -> Option<usize> {
        usize::try_from(self.current_struct_assy_index).ok()
    }

    fn sanitized(mut self) -> Self {
        let (q, i) = (self.dynamic_pressure, self.current_struct_assy_index);
        self.set_dynamic_pressure(q);
        self.set_current_struct_assy_index(i);
        self
    }

    pub fn from_yaml(text: &str) -> AeroStructResult<Self> {
        let settings: Self = serde_yaml::from_str(text)?;
        Ok(settings.sanitized())
    }

    pub fn to_yaml(&self) -> AeroStructResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn load_yaml(path: &Path) -> AeroStructResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn save_yaml(&self, path: &Path) -> AeroStructResult<()> {
        std::fs::write(path, self.to_yaml()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_are_enforced() {
        let mut s = AeroStructSettings::default();
        assert_eq!(s.selection(), None);
        s.set_dynamic_pressure(-5.0);
        assert_eq!(s.dynamic_pressure, 0.0);
        s.set_dynamic_pressure(2e12);
        assert_eq!(s.dynamic_pressure, MAX_DYNAMIC_PRESSURE);
        s.set_current_struct_assy_index(-7);
        assert_eq!(s.current_struct_assy_index, -1);
        s.set_current_struct_assy_index(2);
        assert_eq!(s.selection(), Some(2));
    }

    #[test]
    fn yaml_round_trip_and_partial_documents() {
        let mut s = AeroStructSettings::default();
        s.set_dynamic_pressure(1250.5);
        s.set_current_struct_assy_index(1);
        let back = AeroStructSettings::from_yaml(&s.to_yaml().unwrap()).unwrap();
        assert_eq!(back, s);

        let partial = AeroStructSettings::from_yaml("dynamic_pressure: 300.0\n").unwrap();
        assert_eq!(partial.dynamic_pressure, 300.0);
        assert_eq!(partial.current_struct_assy_index, -1);

        let clamped = AeroStructSettings::from_yaml("current_struct_assy_index: -4\n").unwrap();
        assert_eq!(clamped.selection(), None);
    }
}
