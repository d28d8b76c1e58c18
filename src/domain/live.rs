//! Ambient pointer/segment state observed from the live endpoint.

use serde::{Deserialize, Serialize};

/// Last-observed ambient values, compared by value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveState {
    /// Normalized horizontal coordinate in [0, 1]
    pub x: f32,
    /// Normalized vertical coordinate in [0, 1]
    pub y: f32,
    /// Active content segment; empty strings are stored as `None`
    pub segment_id: Option<String>,
    /// Where the selection came from (e.g. "gaze", "hand")
    pub source: Option<String>,
}

impl LiveState {
    /// Create a snapshot, clamping coordinates into [0, 1]
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x: clamp_unit(x),
            y: clamp_unit(y),
            segment_id: None,
            source: None,
        }
    }

    pub fn with_segment(mut self, segment_id: impl Into<String>) -> Self {
        self.segment_id = normalize(Some(segment_id.into()));
        self
    }

    /// Build from a wire report, normalizing empty strings and ranges
    pub fn from_report(report: LiveStateReport) -> Self {
        Self {
            x: clamp_unit(report.x),
            y: clamp_unit(report.y),
            segment_id: normalize(report.segment_id),
            source: normalize(report.source),
        }
    }

    /// Coordinates equal within `tolerance`
    pub fn coords_match(&self, other: &LiveState, tolerance: f32) -> bool {
        (self.x - other.x).abs() <= tolerance && (self.y - other.y).abs() <= tolerance
    }

    pub fn segment(&self) -> Option<&str> {
        self.segment_id.as_deref()
    }

    /// What changed relative to the previous accepted snapshot.
    ///
    /// With no previous snapshot the coordinates always count as changed,
    /// and the segment counts as changed only if one is present.
    pub fn diff(&self, previous: Option<&LiveState>, tolerance: f32) -> LiveDiff {
        match previous {
            None => LiveDiff {
                segment_changed: self.segment_id.is_some(),
                coords_changed: true,
            },
            Some(prev) => LiveDiff {
                segment_changed: prev.segment_id != self.segment_id,
                coords_changed: !self.coords_match(prev, tolerance),
            },
        }
    }
}

/// Which observed fields differ between two snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LiveDiff {
    pub segment_changed: bool,
    pub coords_changed: bool,
}

impl LiveDiff {
    pub fn any(&self) -> bool {
        self.segment_changed || self.coords_changed
    }
}

/// Body of the live-state endpoint. Extra fields (timestamps etc.) are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveStateReport {
    pub x: f32,
    pub y: f32,
    #[serde(default, alias = "segment_group_id")]
    pub segment_id: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

/// How the front-end retires the previous segment's objects on a switch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum SegmentSwitchPolicy {
    /// Toggle visibility immediately
    #[default]
    Hide,

    /// Fade out/in over the given duration
    Fade { duration_ms: u64 },
}

/// A segment switch handed to the segment-activation collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentChange {
    /// Newly active segment (`None` when the remote reports no segment)
    pub segment_id: Option<String>,
    pub previous: Option<String>,
    pub policy: SegmentSwitchPolicy,
}

fn clamp_unit(v: f32) -> f32 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

fn normalize(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f32 = 1e-4;

    #[test]
    fn test_clamping() {
        let state = LiveState::new(1.4, -0.2);
        assert_eq!(state.x, 1.0);
        assert_eq!(state.y, 0.0);
        assert_eq!(LiveState::new(f32::NAN, 0.5).x, 0.0);
    }

    #[test]
    fn test_identical_snapshots_do_not_differ() {
        let a = LiveState::new(0.2, 0.3).with_segment("seg_a");
        let b = LiveState::new(0.2, 0.3).with_segment("seg_a");
        assert!(!b.diff(Some(&a), TOL).any());
    }

    #[test]
    fn test_tolerance() {
        let a = LiveState::new(0.2, 0.3);
        let b = LiveState::new(0.20005, 0.3);
        let c = LiveState::new(0.21, 0.3);
        assert!(!b.diff(Some(&a), TOL).coords_changed);
        assert!(c.diff(Some(&a), TOL).coords_changed);
    }

    #[test]
    fn test_empty_segment_equals_absent() {
        let report = LiveStateReport {
            x: 0.5,
            y: 0.5,
            segment_id: Some(String::new()),
            source: None,
        };
        let from_wire = LiveState::from_report(report);
        let plain = LiveState::new(0.5, 0.5);
        assert_eq!(from_wire.segment_id, None);
        assert!(!from_wire.diff(Some(&plain), TOL).segment_changed);
    }

    #[test]
    fn test_first_snapshot_diff() {
        let without_segment = LiveState::new(0.1, 0.1);
        let diff = without_segment.diff(None, TOL);
        assert!(diff.coords_changed);
        assert!(!diff.segment_changed);

        let with_segment = LiveState::new(0.1, 0.1).with_segment("page_1");
        assert!(with_segment.diff(None, TOL).segment_changed);
    }

    #[test]
    fn test_policy_yaml() {
        let fade: SegmentSwitchPolicy =
            serde_yaml::from_str("mode: fade\nduration_ms: 250\n").unwrap();
        assert_eq!(fade, SegmentSwitchPolicy::Fade { duration_ms: 250 });
        let hide: SegmentSwitchPolicy = serde_yaml::from_str("mode: hide\n").unwrap();
        assert_eq!(hide, SegmentSwitchPolicy::Hide);
    }
}
