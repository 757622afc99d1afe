//! Material policy table: per-tool nozzle temperatures and wipe behavior.
//!
//! Each configured tool (extruder) maps to a [`MaterialProfile`]. The
//! [`MaterialTable`] is built once at run start and is read-only afterwards;
//! lookups for tools with no profile fail with [`MaterialError::UnknownTool`].

use std::collections::BTreeMap;

/// Errors from material profile lookups.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MaterialError {
    #[error("no material profile configured for tool T{0}")]
    UnknownTool(u32),
}

/// A planar offset or position in millimetres.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Offset {
    pub x: f64,
    pub y: f64,
}

impl Offset {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Whether both components are zero.
    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

/// Static per-tool material data.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialProfile {
    /// Material label (e.g. "PLA", "PVA"), informational only.
    pub material: String,
    /// Printing temperature in degrees Celsius.
    pub target_temperature: f64,
    /// Temperature to park the nozzle at while another tool prints.
    pub idle_temperature: Option<f64>,
    /// Whether the material leaks from an idle nozzle and needs a wipe.
    pub is_oozy: bool,
    /// Delta from the home position to the far end of the wipe stroke.
    pub wipe_offset: Offset,
}

impl MaterialProfile {
    /// Create a non-oozy profile with the given printing temperature.
    pub fn new(material: &str, target_temperature: f64) -> Self {
        Self {
            material: material.to_string(),
            target_temperature,
            idle_temperature: None,
            is_oozy: false,
            wipe_offset: Offset::default(),
        }
    }

    /// Mark the material as oozy, wiping along the given offset.
    pub fn oozy(mut self, wipe_offset: Offset) -> Self {
        self.is_oozy = true;
        self.wipe_offset = wipe_offset;
        self
    }

    /// Set the idle temperature.
    pub fn with_idle_temperature(mut self, temperature: f64) -> Self {
        self.idle_temperature = Some(temperature);
        self
    }
}

/// Tool index → material profile mapping.
///
/// Backed by a `BTreeMap` so iteration is in ascending tool order.
#[derive(Debug, Clone, Default)]
pub struct MaterialTable {
    profiles: BTreeMap<u32, MaterialProfile>,
}

impl MaterialTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) the profile for a tool.
    pub fn insert(&mut self, tool: u32, profile: MaterialProfile) {
        self.profiles.insert(tool, profile);
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, tool: u32, profile: MaterialProfile) -> Self {
        self.insert(tool, profile);
        self
    }

    /// Look up the profile for a tool.
    pub fn lookup(&self, tool: u32) -> Result<&MaterialProfile, MaterialError> {
        self.profiles
            .get(&tool)
            .ok_or(MaterialError::UnknownTool(tool))
    }

    /// Number of configured tools.
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Whether no tools are configured.
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Configured tool indices in ascending order.
    pub fn tools(&self) -> impl Iterator<Item = u32> + '_ {
        self.profiles.keys().copied()
    }
}
