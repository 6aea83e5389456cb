//! Two-dimensional linear programs over ORCA half-planes
//!
//! Each [`OrcaLine`] admits the velocities on its left. The programs look for
//! the velocity inside a speed circle that satisfies every line and lies
//! closest to a preferred velocity, falling back to the velocity that
//! minimizes the largest violation when the constraints cannot all be met.

use glam::Vec2;
use voxnav_common::{det, RVO_EPSILON};

/// Directed line in velocity space; permitted velocities lie to its left
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OrcaLine {
    pub point: Vec2,
    pub direction: Vec2,
}

impl OrcaLine {
    pub const fn new(point: Vec2, direction: Vec2) -> Self {
        Self { point, direction }
    }

    /// Positive when `velocity` is on the forbidden (right) side
    #[inline]
    pub fn violation(&self, velocity: Vec2) -> f32 {
        det(self.direction, self.point - velocity)
    }
}

/// Optimizes along line `line_no` subject to all earlier lines and the speed circle.
///
/// Returns false when the earlier lines leave no room on this line.
fn linear_program1(
    lines: &[OrcaLine],
    line_no: usize,
    radius: f32,
    opt_velocity: Vec2,
    direction_opt: bool,
    result: &mut Vec2,
) -> bool {
    let line = lines[line_no];
    let dot_product = line.point.dot(line.direction);
    let discriminant = dot_product * dot_product + radius * radius - line.point.length_squared();

    if discriminant < 0.0 {
        // The speed circle does not reach this line.
        return false;
    }

    let sqrt_discriminant = discriminant.sqrt();
    let mut t_left = -dot_product - sqrt_discriminant;
    let mut t_right = -dot_product + sqrt_discriminant;

    for other in &lines[..line_no] {
        let denominator = det(line.direction, other.direction);
        let numerator = det(other.direction, line.point - other.point);

        if denominator.abs() <= RVO_EPSILON {
            // Parallel lines
            if numerator < 0.0 {
                return false;
            }
            continue;
        }

        let t = numerator / denominator;
        if denominator >= 0.0 {
            t_right = t_right.min(t);
        } else {
            t_left = t_left.max(t);
        }

        if t_left > t_right {
            return false;
        }
    }

    let t = if direction_opt {
        if opt_velocity.dot(line.direction) > 0.0 {
            t_right
        } else {
            t_left
        }
    } else {
        let t = line.direction.dot(opt_velocity - line.point);
        if t < t_left {
            t_left
        } else if t > t_right {
            t_right
        } else {
            t
        }
    };
    *result = line.point + t * line.direction;
    true
}

/// Solves the program over all `lines`.
///
/// With `direction_opt` the preferred velocity is a unit direction to push as
/// far as possible along. Returns the number of lines that were satisfied in
/// order; anything below `lines.len()` means the program became infeasible at
/// that line and `result` holds the best velocity found before it.
pub fn linear_program2(
    lines: &[OrcaLine],
    radius: f32,
    opt_velocity: Vec2,
    direction_opt: bool,
    result: &mut Vec2,
) -> usize {
    *result = if direction_opt {
        opt_velocity * radius
    } else if opt_velocity.length_squared() > radius * radius {
        opt_velocity.normalize_or_zero() * radius
    } else {
        opt_velocity
    };

    for i in 0..lines.len() {
        if lines[i].violation(*result) > 0.0 {
            let previous = *result;
            if !linear_program1(lines, i, radius, opt_velocity, direction_opt, result) {
                *result = previous;
                return i;
            }
        }
    }

    lines.len()
}

/// Fallback used after [`linear_program2`] fails at `begin_line`.
///
/// The first `num_obstacle_lines` lines are treated as hard constraints; the
/// remaining ones are relaxed by minimizing the largest penetration.
pub fn linear_program3(
    lines: &[OrcaLine],
    num_obstacle_lines: usize,
    begin_line: usize,
    radius: f32,
    result: &mut Vec2,
) {
    let mut distance = 0.0;

    for i in begin_line..lines.len() {
        if lines[i].violation(*result) <= distance {
            continue;
        }

        let mut projected: Vec<OrcaLine> = lines[..num_obstacle_lines].to_vec();
        for j in num_obstacle_lines..i {
            let determinant = det(lines[i].direction, lines[j].direction);
            let point = if determinant.abs() <= RVO_EPSILON {
                if lines[i].direction.dot(lines[j].direction) > 0.0 {
                    // Same direction, line j adds nothing
                    continue;
                }
                0.5 * (lines[i].point + lines[j].point)
            } else {
                lines[i].point
                    + (det(lines[j].direction, lines[i].point - lines[j].point) / determinant)
                        * lines[i].direction
            };
            let direction = (lines[j].direction - lines[i].direction).normalize_or_zero();
            projected.push(OrcaLine::new(point, direction));
        }

        let previous = *result;
        let push = Vec2::new(-lines[i].direction.y, lines[i].direction.x);
        if linear_program2(&projected, radius, push, true, result) < projected.len() {
            // Only reachable through floating point error; the previous
            // result is already feasible for this program.
            *result = previous;
        }

        distance = lines[i].violation(*result);
    }
}

/// Runs the full solve: the primary program, then the fallback if needed
pub fn solve_velocity(
    lines: &[OrcaLine],
    num_obstacle_lines: usize,
    max_speed: f32,
    preferred: Vec2,
) -> Vec2 {
    let mut result = Vec2::ZERO;
    let line_fail = linear_program2(lines, max_speed, preferred, false, &mut result);
    if line_fail < lines.len() {
        linear_program3(lines, num_obstacle_lines, line_fail, max_speed, &mut result);
    }
    result
}
