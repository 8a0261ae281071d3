//! Gradient operators for the edge-pattern metric.
//!
//! Both operators report gradient magnitude `sqrt(gx^2 + gy^2)` where each
//! component lies in `[-255, 255]`, so both share [`EDGE_FULL_SCALE`].

use std::f64::consts::SQRT_2;

use crate::config::EdgeOperatorKind;
use crate::raster::LumaField;

/// Largest gradient magnitude either operator can produce on 8-bit input.
pub const EDGE_FULL_SCALE: f64 = 255.0 * SQRT_2;

/// Capability used by the engine to turn a luma field into an edge field.
pub trait EdgeOperator: Send + Sync {
    /// Stable identifier, reported in logs and diagnostics.
    fn name(&self) -> &'static str;

    /// Per-pixel gradient magnitude, row-major, same length as the field.
    fn magnitude(&self, field: &LumaField) -> Vec<f64>;
}

/// Build the operator selected in the config.
pub fn operator_for(kind: EdgeOperatorKind) -> Box<dyn EdgeOperator> {
    match kind {
        EdgeOperatorKind::Sobel => Box::new(Sobel),
        EdgeOperatorKind::CentralDifference => Box::new(CentralDifference),
    }
}

/// 3x3 Sobel with replicated borders. Each component is divided by the
/// kernel weight (4) so its range matches a one-pixel difference.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sobel;

impl EdgeOperator for Sobel {
    fn name(&self) -> &'static str {
        "sobel"
    }

    fn magnitude(&self, field: &LumaField) -> Vec<f64> {
        let side = field.side() as isize;
        let mut out = Vec::with_capacity(field.len());
        for y in 0..side {
            for x in 0..side {
                let p = |dx: isize, dy: isize| field.at_clamped(x + dx, y + dy);
                let gx = (p(1, -1) + 2.0 * p(1, 0) + p(1, 1))
                    - (p(-1, -1) + 2.0 * p(-1, 0) + p(-1, 1));
                let gy = (p(-1, 1) + 2.0 * p(0, 1) + p(1, 1))
                    - (p(-1, -1) + 2.0 * p(0, -1) + p(1, -1));
                out.push((gx / 4.0).hypot(gy / 4.0));
            }
        }
        out
    }
}

/// Finite differences: central inside the field, one-sided on its border.
#[derive(Debug, Clone, Copy, Default)]
pub struct CentralDifference;

impl CentralDifference {
    fn derivative(before: f64, here: f64, after: f64, pos: usize, last: usize) -> f64 {
        if pos == 0 {
            after - here
        } else if pos == last {
            here - before
        } else {
            (after - before) / 2.0
        }
    }
}

impl EdgeOperator for CentralDifference {
    fn name(&self) -> &'static str {
        "central_difference"
    }

    fn magnitude(&self, field: &LumaField) -> Vec<f64> {
        let side = field.side();
        let last = side - 1;
        let mut out = Vec::with_capacity(field.len());
        for y in 0..side {
            for x in 0..side {
                let (xi, yi) = (x as isize, y as isize);
                let here = field.at_clamped(xi, yi);
                let gx = Self::derivative(
                    field.at_clamped(xi - 1, yi),
                    here,
                    field.at_clamped(xi + 1, yi),
                    x,
                    last,
                );
                let gy = Self::derivative(
                    field.at_clamped(xi, yi - 1),
                    here,
                    field.at_clamped(xi, yi + 1),
                    y,
                    last,
                );
                out.push(gx.hypot(gy));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_field() -> LumaField {
        // Left half black, right half white.
        let side = 6;
        let pixels = (0..side * side)
            .map(|i| if i % side < side / 2 { 0 } else { 255 })
            .collect();
        LumaField::from_raw(side, pixels).unwrap()
    }

    #[test]
    fn flat_field_has_no_edges() {
        let field = LumaField::from_raw(4, vec![90; 16]).unwrap();
        for op in [operator_for(EdgeOperatorKind::Sobel), operator_for(EdgeOperatorKind::CentralDifference)] {
            assert!(op.magnitude(&field).iter().all(|&m| m == 0.0), "{}", op.name());
        }
    }

    #[test]
    fn step_edge_is_detected_by_both_operators() {
        let field = step_field();
        for op in [operator_for(EdgeOperatorKind::Sobel), operator_for(EdgeOperatorKind::CentralDifference)] {
            let mags = op.magnitude(&field);
            // Column 2 and 3 straddle the step, column 0 is flat.
            assert!(mags[2] > 0.0, "{}", op.name());
            assert!(mags[3] > 0.0, "{}", op.name());
            assert_eq!(mags[0], 0.0, "{}", op.name());
        }
    }

    #[test]
    fn magnitudes_never_exceed_full_scale() {
        // Checkerboard maximizes local contrast.
        let side = 5;
        let pixels = (0..side * side)
            .map(|i| if (i % side + i / side) % 2 == 0 { 0 } else { 255 })
            .collect();
        let field = LumaField::from_raw(side, pixels).unwrap();
        for op in [operator_for(EdgeOperatorKind::Sobel), operator_for(EdgeOperatorKind::CentralDifference)] {
            assert!(op
                .magnitude(&field)
                .iter()
                .all(|&m| m <= EDGE_FULL_SCALE + 1e-9));
        }
    }

    #[test]
    fn operator_names_match_config() {
        assert_eq!(operator_for(EdgeOperatorKind::Sobel).name(), "sobel");
        assert_eq!(
            operator_for(EdgeOperatorKind::CentralDifference).name(),
            "central_difference"
        );
    }
}
