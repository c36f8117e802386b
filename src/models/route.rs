//! Routing service results

use serde::{Deserialize, Serialize};

use super::LatLng;

/// One turn-by-turn step, attributed to the polyline from `index` onwards
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Instruction {
    /// Polyline index where this step starts
    pub index: usize,
    /// Step duration in seconds
    pub time: f64,
}

/// Route totals as reported by the routing service
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouteSummary {
    /// Meters
    pub total_distance: f64,
    /// Seconds
    pub total_time: f64,
}

/// A routed path through all waypoints
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoutedPath {
    pub coordinates: Vec<LatLng>,
    pub summary: RouteSummary,
    /// Polyline index of each requested waypoint, same order as the request
    pub waypoint_indices: Vec<usize>,
    pub instructions: Vec<Instruction>,
}

impl RoutedPath {
    /// Seconds spent between each pair of consecutive waypoints.
    ///
    /// A leg sums every instruction whose index falls in
    /// `[waypoint_indices[i], waypoint_indices[i + 1])`.
    #[must_use]
    pub fn leg_durations(&self) -> Vec<f64> {
        self.waypoint_indices
            .windows(2)
            .map(|pair| {
                let (start, end) = (pair[0], pair[1]);
                self.instructions
                    .iter()
                    .filter(|instr| instr.index >= start && instr.index < end)
                    .map(|instr| instr.time)
                    .sum()
            })
            .collect()
    }
}
