//! Parameters for the procedure manager and all its states.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::HashMap;

use comms_if::nav::Pose2;
use serde::Deserialize;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProcParams {
    pub calibrate: CalibrateParams,
    pub dig: DigParams,
    pub offload: OffloadParams,
    pub field: FieldParams,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CalibrateParams {
    /// Turning power used while searching for the field markers.
    pub turn_power: f64,

    /// Interval between detect requests to the vision service.
    pub detect_interval_s: f64,

    /// Spin correction applied after a successful detection, to point the
    /// robot back along the field x axis.
    pub correction_angle_rad: f64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DigParams {
    /// Skimmer height at which the belt cuts into the regolith.
    pub digging_height_m: f64,

    /// Skimmer height used while driving between sites.
    pub transit_height_m: f64,

    /// Distance to drive forward while cutting.
    pub drive_distance_m: f64,

    /// Speed to drive at while cutting.
    pub drive_speed_ms: f64,

    /// Belt power while cutting. Negative runs the belt in the digging
    /// direction.
    pub belt_power: f64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct OffloadParams {
    /// Skimmer height at which material clears the berm.
    pub dump_height_m: f64,

    /// Belt power while dumping.
    pub belt_power: f64,

    /// How long to run the belt for when dumping.
    pub dump_duration_s: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FieldParams {
    /// Name of the field layout in use, must be a key of `layouts`.
    pub layout: String,

    /// Site poses for each known field layout.
    pub layouts: HashMap<String, SiteSet>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SiteSet {
    pub dig_site: SitePose,
    pub berm_site: SitePose,
}

/// A pose as written in the parameter file.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SitePose {
    pub x_m: f64,
    pub y_m: f64,
    pub yaw_rad: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SitePose {
    pub fn as_pose(&self) -> Pose2 {
        Pose2::new(self.x_m, self.y_m, self.yaw_rad)
    }
}

impl Default for CalibrateParams {
    fn default() -> Self {
        Self {
            turn_power: 0.1,
            detect_interval_s: 1.0,
            correction_angle_rad: 0.0,
        }
    }
}

impl Default for DigParams {
    fn default() -> Self {
        Self {
            digging_height_m: 0.05,
            transit_height_m: 0.3,
            drive_distance_m: 1.0,
            drive_speed_ms: 0.25,
            belt_power: -0.3,
        }
    }
}

impl Default for OffloadParams {
    fn default() -> Self {
        Self {
            dump_height_m: 0.5,
            belt_power: 0.3,
            dump_duration_s: 8.0,
        }
    }
}

#[cfg(test)]
impl ProcParams {
    /// Fixed parameter values used by the procedure tests.
    pub(crate) fn test_values() -> Self {
        let mut layouts = HashMap::new();
        layouts.insert(
            "test".to_string(),
            SiteSet {
                dig_site: SitePose {
                    x_m: 6.2,
                    y_m: -3.2,
                    yaw_rad: 0.0,
                },
                berm_site: SitePose {
                    x_m: 7.25,
                    y_m: -1.4,
                    yaw_rad: 1.5707963,
                },
            },
        );

        Self {
            calibrate: CalibrateParams {
                turn_power: 0.15,
                detect_interval_s: 1.0,
                correction_angle_rad: 1.5707963,
            },
            dig: DigParams::default(),
            offload: OffloadParams {
                dump_height_m: 0.5,
                belt_power: 0.3,
                dump_duration_s: 8.0,
            },
            field: FieldParams {
                layout: "test".to_string(),
                layouts,
            },
        }
    }
}
