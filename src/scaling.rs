// ABOUTME: Instance-count resolution for upsize and downsize operations.
// ABOUTME: Pure functions; percentage-or-absolute requests against a base count.

use serde::{Deserialize, Serialize};

use crate::context::SetupOutput;

/// How a requested instance value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstanceUnit {
    /// Request is a percentage of the base count.
    Percentage,
    /// Request is an absolute instance count.
    Count,
}

/// A scale request as configured on a resize step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleRequest {
    pub value: i32,
    pub unit: InstanceUnit,
}

impl ScaleRequest {
    pub fn percentage(value: i32) -> Self {
        Self {
            value,
            unit: InstanceUnit::Percentage,
        }
    }

    pub fn count(value: i32) -> Self {
        Self {
            value,
            unit: InstanceUnit::Count,
        }
    }
}

/// Compute the target instance count for one scale operation.
///
/// For percentage requests the percentage is clamped to 100 and applied to
/// `base_count` with half-up rounding. An upsize result has a floor of one
/// instance; a downsize removes the scaled amount from the base. Absolute
/// requests are taken as-is (upsize) or subtracted from the base (downsize).
///
/// Negative results are intentionally not clamped: the base count can drift
/// under concurrent resizes and workflows rely on the raw arithmetic.
pub fn instance_count_to_update(
    base_count: i32,
    requested: i32,
    unit: InstanceUnit,
    upsize: bool,
) -> i32 {
    match unit {
        InstanceUnit::Percentage => {
            let percent = requested.min(100);
            let scaled = round_half_up(f64::from(percent) * f64::from(base_count) / 100.0);
            if upsize {
                scaled.max(1)
            } else {
                base_count - scaled.max(0)
            }
        }
        InstanceUnit::Count => {
            if upsize {
                requested
            } else {
                base_count - requested
            }
        }
    }
}

/// Target count for the new application on a resize step.
///
/// The base is the current running count when the setup phase was configured
/// to mirror it, otherwise the resolved maximum.
pub fn resolve_upsize_count(setup: &SetupOutput, request: ScaleRequest) -> i32 {
    instance_count_to_update(base_count(setup), request.value, request.unit, true)
}

/// Target count for the old application on a resize step.
///
/// Without an explicit downsize request the upsize result is used unchanged;
/// otherwise the downsize is recomputed against the same base.
pub fn resolve_downsize_count(
    setup: &SetupOutput,
    upsize_result: i32,
    request: Option<ScaleRequest>,
) -> i32 {
    match request {
        None => upsize_result,
        Some(req) => instance_count_to_update(base_count(setup), req.value, req.unit, false),
    }
}

fn base_count(setup: &SetupOutput) -> i32 {
    if setup.use_current_running_instance_count {
        setup.current_running_instance_count
    } else {
        setup.max_instance_count
    }
}

fn round_half_up(value: f64) -> i32 {
    (value + 0.5).floor() as i32
}
