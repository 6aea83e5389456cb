//! Damped springs used to smooth agent steering

use glam::Vec2;

const SPRING_EPSILON: f32 = 1e-5;

/// Converts a halflife (seconds) into a damping coefficient
#[inline]
pub fn halflife_to_damping(halflife: f32) -> f32 {
    (4.0 * std::f32::consts::LN_2) / (halflife + SPRING_EPSILON)
}

#[inline]
pub fn damping_ratio_to_stiffness(ratio: f32, damping: f32) -> f32 {
    let k = damping / (ratio * 2.0);
    k * k
}

/// Rational approximation of `exp(-x)` for `x >= 0`
#[inline]
pub fn fast_neg_exp(x: f32) -> f32 {
    1.0 / (1.0 + x + 0.48 * x * x + 0.235 * x * x * x)
}

/// Scalar spring-damper integrated in closed form towards a goal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatSpring {
    pub halflife: f32,
    pub damping_ratio: f32,
    value: f32,
    velocity: f32,
    goal: f32,
}

impl Default for FloatSpring {
    fn default() -> Self {
        Self::new(1.0, 0.5)
    }
}

impl FloatSpring {
    pub fn new(halflife: f32, damping_ratio: f32) -> Self {
        Self {
            halflife,
            damping_ratio,
            value: 0.0,
            velocity: 0.0,
            goal: 0.0,
        }
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    pub fn goal(&self) -> f32 {
        self.goal
    }

    pub fn set_goal(&mut self, goal: f32) {
        self.goal = goal;
    }

    /// Jumps to `value` and stops
    pub fn set_value(&mut self, value: f32) {
        self.value = value;
        self.velocity = 0.0;
    }

    pub fn update(&mut self, dt: f32) -> f32 {
        let (value, velocity) = self.evaluate(dt);
        self.value = value;
        self.velocity = velocity;
        value
    }

    /// Value reached after `dt` seconds without changing state
    pub fn predict(&self, dt: f32) -> f32 {
        self.evaluate(dt).0
    }

    fn evaluate(&self, dt: f32) -> (f32, f32) {
        let (x, v) = (self.value, self.velocity);
        let d = halflife_to_damping(self.halflife);
        let s = damping_ratio_to_stiffness(self.damping_ratio, d);
        let c = self.goal;
        let y = d / 2.0;
        let discriminant = s - d * d / 4.0;

        if discriminant.abs() < SPRING_EPSILON {
            // Critically damped
            let j0 = x - c;
            let j1 = v + j0 * y;
            let eydt = fast_neg_exp(y * dt);
            (
                j0 * eydt + dt * j1 * eydt + c,
                -y * j0 * eydt - y * dt * j1 * eydt + j1 * eydt,
            )
        } else if discriminant > 0.0 {
            // Under damped
            let w = discriminant.sqrt();
            let offset = x - c;
            let mut j = ((v + y * offset).powi(2) / (w * w + SPRING_EPSILON) + offset * offset).sqrt();
            let p = ((v + offset * y) / (-offset * w + SPRING_EPSILON)).atan();
            if offset <= 0.0 {
                j = -j;
            }
            let eydt = fast_neg_exp(y * dt);
            (
                j * eydt * (w * dt + p).cos() + c,
                -y * j * eydt * (w * dt + p).cos() - w * j * eydt * (w * dt + p).sin(),
            )
        } else {
            // Over damped
            let root = (d * d - 4.0 * s).sqrt();
            let y0 = (d + root) / 2.0;
            let y1 = (d - root) / 2.0;
            let j1 = (c * y0 - x * y0 - v) / (y1 - y0);
            let j0 = x - j1 - c;
            let ey0dt = fast_neg_exp(y0 * dt);
            let ey1dt = fast_neg_exp(y1 * dt);
            (
                j0 * ey0dt + j1 * ey1dt + c,
                -y0 * j0 * ey0dt - y1 * j1 * ey1dt,
            )
        }
    }
}

/// Two independent [`FloatSpring`]s driving a vector
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2Spring {
    x: FloatSpring,
    y: FloatSpring,
}

impl Vec2Spring {
    pub fn new(halflife: f32, damping_ratio: f32) -> Self {
        Self {
            x: FloatSpring::new(halflife, damping_ratio),
            y: FloatSpring::new(halflife, damping_ratio),
        }
    }

    pub fn value(&self) -> Vec2 {
        Vec2::new(self.x.value(), self.y.value())
    }

    pub fn velocity(&self) -> Vec2 {
        Vec2::new(self.x.velocity(), self.y.velocity())
    }

    pub fn goal(&self) -> Vec2 {
        Vec2::new(self.x.goal(), self.y.goal())
    }

    pub fn set_goal(&mut self, goal: Vec2) {
        self.x.set_goal(goal.x);
        self.y.set_goal(goal.y);
    }

    pub fn set_value(&mut self, value: Vec2) {
        self.x.set_value(value.x);
        self.y.set_value(value.y);
    }

    pub fn update(&mut self, dt: f32) -> Vec2 {
        Vec2::new(self.x.update(dt), self.y.update(dt))
    }

    pub fn predict(&self, dt: f32) -> Vec2 {
        Vec2::new(self.x.predict(dt), self.y.predict(dt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settle(spring: &mut FloatSpring, seconds: f32) {
        for _ in 0..(seconds / 0.01) as usize {
            spring.update(0.01);
        }
    }

    #[test]
    fn test_critically_damped_converges_without_overshoot() {
        let mut spring = FloatSpring::new(0.1, 1.0);
        spring.set_goal(10.0);
        let mut previous = spring.value();
        for _ in 0..200 {
            let value = spring.update(0.01);
            assert!(value <= 10.0 + 1e-3, "overshoot to {value}");
            assert!(value >= previous - 1e-4);
            previous = value;
        }
        assert!((spring.value() - 10.0).abs() < 0.01);
    }

    #[test]
    fn test_under_and_over_damped_settle() {
        for ratio in [0.3, 2.0] {
            let mut spring = FloatSpring::new(0.2, ratio);
            spring.set_goal(-5.0);
            settle(&mut spring, 10.0);
            assert!((spring.value() + 5.0).abs() < 0.05, "ratio {ratio}: {}", spring.value());
        }
    }

    #[test]
    fn test_predict_does_not_mutate() {
        let mut spring = FloatSpring::new(0.5, 1.0);
        spring.set_goal(1.0);
        let predicted = spring.predict(0.25);
        assert_eq!(spring.value(), 0.0);
        assert!((spring.update(0.25) - predicted).abs() < 1e-6);

        spring.set_value(3.0);
        assert_eq!(spring.velocity(), 0.0);
    }

    #[test]
    fn test_vec2_spring_tracks_goal() {
        let mut spring = Vec2Spring::new(0.1, 1.0);
        spring.set_goal(Vec2::new(3.0, -4.0));
        for _ in 0..100 {
            spring.update(0.02);
        }
        assert!((spring.value() - Vec2::new(3.0, -4.0)).length() < 0.01);
        assert_eq!(spring.goal(), Vec2::new(3.0, -4.0));
    }
}
