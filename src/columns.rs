//! Column plan – column count, per-column width and gap for the text area.

use serde::{Deserialize, Serialize};

use crate::geometry::PageGeometry;
use crate::settings::WritingMode;

/// How content is distributed across columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnFill {
    /// Equalise content length across columns.
    #[default]
    Balance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub count: u8,
    /// Extent of one column along the writing mode's cross axis, in mm.
    pub width_mm: f32,
    /// Zero for a single column.
    pub gap_mm: f32,
    pub fill: ColumnFill,
}

/// Configuration problem that does not stop the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnWarning {
    /// The width the arithmetic produced before clamping.
    pub computed_width_mm: f32,
    pub message: String,
}

/// Result of [`plan_columns`].
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnPlan {
    pub spec: ColumnSpec,
    pub warning: Option<ColumnWarning>,
}

/// Size of the content box that columns divide.
///
/// Horizontal text places columns side by side, so they split the width.
/// Vertical text stacks its columns top to bottom, so they split the height.
pub fn cross_axis_mm(geometry: &PageGeometry, mode: WritingMode) -> f32 {
    match mode {
        WritingMode::Horizontal => geometry.content.width,
        WritingMode::Vertical => geometry.content.height,
    }
}

/// Divide the content box into `columns` columns separated by `gap_mm`.
///
/// A negative result (gap too large for the page) is clamped to zero and
/// reported as a warning; the renderer clips.
pub fn plan_columns(
    geometry: &PageGeometry,
    mode: WritingMode,
    columns: u8,
    gap_mm: f32,
) -> ColumnPlan {
    let available = cross_axis_mm(geometry, mode);
    let count = columns.max(1);

    if count == 1 {
        return ColumnPlan {
            spec: ColumnSpec {
                count,
                width_mm: available.max(0.0),
                gap_mm: 0.0,
                fill: ColumnFill::Balance,
            },
            warning: (available < 0.0).then(|| negative_width(available, count, gap_mm)),
        };
    }

    let n = f32::from(count);
    let width = (available - gap_mm * (n - 1.0)) / n;
    let warning = (width < 0.0).then(|| negative_width(width, count, gap_mm));

    ColumnPlan {
        spec: ColumnSpec {
            count,
            width_mm: width.max(0.0),
            gap_mm,
            fill: ColumnFill::Balance,
        },
        warning,
    }
}

fn negative_width(width: f32, count: u8, gap_mm: f32) -> ColumnWarning {
    let message = format!(
        "{count} column(s) with a {gap_mm}mm gap leave {width:.1}mm per column; output will be clipped"
    );
    log::warn!("{message}");
    ColumnWarning {
        computed_width_mm: width,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Margins, Orientation, PageSize};

    fn a4(margins: f32) -> PageGeometry {
        PageGeometry::resolve(
            PageSize::A4,
            Orientation::Portrait,
            Margins::uniform(margins),
            0.0,
            false,
        )
    }

    #[test]
    fn single_column_takes_the_cross_axis() {
        let g = a4(20.0);
        let h = plan_columns(&g, WritingMode::Horizontal, 1, 10.0);
        assert_eq!(h.spec.width_mm, 170.0);
        assert_eq!(h.spec.gap_mm, 0.0);
        assert!(h.warning.is_none());

        let v = plan_columns(&g, WritingMode::Vertical, 1, 10.0);
        assert_eq!(v.spec.width_mm, 257.0);
    }

    #[test]
    fn multi_column_width() {
        let g = a4(20.0);
        let p = plan_columns(&g, WritingMode::Horizontal, 2, 10.0);
        assert_eq!(p.spec.width_mm, 80.0);
        assert_eq!(p.spec.gap_mm, 10.0);
        assert_eq!(p.spec.fill, ColumnFill::Balance);

        let p = plan_columns(&g, WritingMode::Vertical, 3, 20.0);
        assert!((p.spec.width_mm - (257.0 - 40.0) / 3.0).abs() < 1e-4);
    }

    #[test]
    fn oversized_gap_warns_and_clamps() {
        let g = PageGeometry::resolve(
            PageSize::B6,
            Orientation::Portrait,
            Margins::uniform(50.0),
            0.0,
            false,
        );
        // Content width 28mm; two 20mm gaps do not fit.
        let p = plan_columns(&g, WritingMode::Horizontal, 3, 20.0);
        assert_eq!(p.spec.width_mm, 0.0);
        let w = p.warning.expect("warning");
        assert!(w.computed_width_mm < 0.0);
    }
}
