use glam::Vec2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeCurve {
    p0: Vec2,
    p1: Vec2,
    p2: Vec2,
    p3: Vec2,
}

impl EdgeCurve {
    pub fn new(src: Vec2, tar: Vec2) -> Self {
        let mid_x = (src.x + tar.x) * 0.5;
        Self {
            p0: src,
            p1: Vec2::new(mid_x, src.y),
            p2: Vec2::new(mid_x, tar.y),
            p3: tar,
        }
    }

    pub fn point_at(&self, t: f32) -> Vec2 {
        let t = t.clamp(0.0, 1.0);
        let u = 1.0 - t;
        self.p0 * (u * u * u)
            + self.p1 * (3.0 * u * u * t)
            + self.p2 * (3.0 * u * t * t)
            + self.p3 * (t * t * t)
    }

    pub fn middle(&self) -> Vec2 {
        self.point_at(0.5)
    }

    // Height of the curve at horizontal position `x`. Outside the curve's
    // horizontal span the nearer endpoint's height is returned.
    pub fn y_at_x(&self, x: f32) -> f32 {
        let (x0, x3) = (self.p0.x, self.p3.x);
        if (x3 - x0).abs() < f32::EPSILON {
            return (self.p0.y + self.p3.y) * 0.5;
        }
        let increasing = x3 > x0;
        let (lo_x, hi_x) = if increasing { (x0, x3) } else { (x3, x0) };
        if x <= lo_x {
            return if increasing { self.p0.y } else { self.p3.y };
        }
        if x >= hi_x {
            return if increasing { self.p3.y } else { self.p0.y };
        }

        // x(t) is monotone for this control layout, so bisection converges.
        let (mut lo, mut hi) = (0.0f32, 1.0f32);
        for _ in 0..32 {
            let mid = (lo + hi) * 0.5;
            let px = self.point_at(mid).x;
            if (px < x) == increasing {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        self.point_at((lo + hi) * 0.5).y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn curve_hits_endpoints_and_middle() {
        let c = EdgeCurve::new(Vec2::new(0.0, 0.0), Vec2::new(10.0, 4.0));
        assert_eq!(c.point_at(0.0), Vec2::new(0.0, 0.0));
        assert_eq!(c.point_at(1.0), Vec2::new(10.0, 4.0));
        let m = c.middle();
        assert!(approx(m.x, 5.0));
        assert!(approx(m.y, 2.0));
    }

    #[test]
    fn y_at_x_follows_curve_both_directions() {
        let fwd = EdgeCurve::new(Vec2::new(0.0, 0.0), Vec2::new(10.0, 4.0));
        let back = EdgeCurve::new(Vec2::new(10.0, 4.0), Vec2::new(0.0, 0.0));
        assert!(approx(fwd.y_at_x(5.0), 2.0));
        assert!(approx(back.y_at_x(5.0), 2.0));
        assert!(approx(fwd.y_at_x(-3.0), 0.0));
        assert!(approx(fwd.y_at_x(30.0), 4.0));
    }

    #[test]
    fn vertical_curve_uses_mean_height() {
        let c = EdgeCurve::new(Vec2::new(2.0, 0.0), Vec2::new(2.0, 6.0));
        assert!(approx(c.y_at_x(2.0), 3.0));
    }
}
