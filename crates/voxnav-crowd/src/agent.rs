//! Avoidance agents and ORCA constraint construction

use glam::Vec2;
use voxnav_common::{det, dist_sq_point_segment, left_of, RVO_EPSILON};

#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};

use crate::config::AgentDefaults;
use crate::linear_program::{solve_velocity, OrcaLine};
use crate::obstacle::ObstacleSet;

/// Which other agents an agent steers around.
///
/// The raw integer form uses 0 for [`AvoidanceMask::All`] and -1 for
/// [`AvoidanceMask::None`]; any other value is a group bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub enum AvoidanceMask {
    #[default]
    All,
    None,
    /// Avoid agents whose layer shares a bit with the mask
    Groups(u32),
}

impl AvoidanceMask {
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            0 => Self::All,
            -1 => Self::None,
            bits => Self::Groups(bits as u32),
        }
    }

    pub fn raw(self) -> i32 {
        match self {
            Self::All => 0,
            Self::None => -1,
            Self::Groups(bits) => bits as i32,
        }
    }

    /// Whether an agent with this mask avoids an agent on `layer`
    pub fn avoids(self, layer: u32) -> bool {
        match self {
            Self::All => true,
            Self::None => false,
            Self::Groups(bits) => bits & layer != 0,
        }
    }
}

/// One agent of the avoidance simulation
#[derive(Debug, Clone, PartialEq)]
pub struct Agent {
    pub id: usize,
    pub position: Vec2,
    pub velocity: Vec2,
    pub pref_velocity: Vec2,
    pub radius: f32,
    pub max_speed: f32,
    pub max_neighbors: usize,
    pub neighbor_dist: f32,
    pub time_horizon: f32,
    pub time_horizon_obst: f32,
    /// Extra clearance other agents keep from this one
    pub weight: f32,
    pub avoidance_mask: AvoidanceMask,
    pub avoidance_layer: u32,
    pub(crate) agent_neighbors: Vec<(f32, usize)>,
    pub(crate) obstacle_neighbors: Vec<(f32, usize)>,
    pub(crate) orca_lines: Vec<OrcaLine>,
}

/// Outcome of the compute phase for one agent
#[derive(Debug, Clone)]
pub(crate) struct AgentSolve {
    pub agent_neighbors: Vec<(f32, usize)>,
    pub obstacle_neighbors: Vec<(f32, usize)>,
    pub orca_lines: Vec<OrcaLine>,
    pub new_velocity: Vec2,
}

impl Agent {
    pub fn new(id: usize, position: Vec2, defaults: &AgentDefaults) -> Self {
        Self {
            id,
            position,
            velocity: defaults.velocity,
            pref_velocity: Vec2::ZERO,
            radius: defaults.radius,
            max_speed: defaults.max_speed,
            max_neighbors: defaults.max_neighbors,
            neighbor_dist: defaults.neighbor_dist,
            time_horizon: defaults.time_horizon,
            time_horizon_obst: defaults.time_horizon_obst,
            weight: 0.0,
            avoidance_mask: AvoidanceMask::All,
            avoidance_layer: 0,
            agent_neighbors: Vec::new(),
            obstacle_neighbors: Vec::new(),
            orca_lines: Vec::new(),
        }
    }

    /// `(squared distance, agent id)` pairs used in the last step, nearest first
    pub fn agent_neighbors(&self) -> &[(f32, usize)] {
        &self.agent_neighbors
    }

    /// `(squared distance, vertex id)` pairs used in the last step, nearest first
    pub fn obstacle_neighbors(&self) -> &[(f32, usize)] {
        &self.obstacle_neighbors
    }

    /// Constraints of the last step; obstacle lines come first
    pub fn orca_lines(&self) -> &[OrcaLine] {
        &self.orca_lines
    }

    /// Squared range within which obstacle edges are considered
    pub fn obstacle_range_sq(&self) -> f32 {
        let range = self.time_horizon_obst * self.max_speed + self.radius;
        range * range
    }

    /// Inserts `other` into the sorted neighbor list, shrinking `range_sq`
    /// once the list is full
    pub(crate) fn insert_agent_neighbor(
        &self,
        neighbors: &mut Vec<(f32, usize)>,
        other: &Agent,
        range_sq: &mut f32,
    ) {
        if other.id == self.id || !self.avoidance_mask.avoids(other.avoidance_layer) {
            return;
        }

        let dist_sq = self.position.distance_squared(other.position);
        if dist_sq >= *range_sq {
            return;
        }

        if neighbors.len() < self.max_neighbors {
            neighbors.push((dist_sq, other.id));
        }
        let mut i = neighbors.len() - 1;
        while i != 0 && dist_sq < neighbors[i - 1].0 {
            neighbors[i] = neighbors[i - 1];
            i -= 1;
        }
        neighbors[i] = (dist_sq, other.id);

        if neighbors.len() == self.max_neighbors {
            *range_sq = neighbors[neighbors.len() - 1].0;
        }
    }

    /// Inserts the edge starting at `vertex` if the agent is on its outer side
    pub(crate) fn insert_obstacle_neighbor(
        &self,
        neighbors: &mut Vec<(f32, usize)>,
        obstacles: &ObstacleSet,
        vertex: usize,
        range_sq: f32,
    ) {
        let Some(v1) = obstacles.vertex(vertex) else {
            return;
        };
        let Some(v2) = obstacles.vertex(v1.next) else {
            return;
        };
        if left_of(v1.point, v2.point, self.position) >= 0.0 {
            return;
        }

        let dist_sq = dist_sq_point_segment(v1.point, v2.point, self.position);
        if dist_sq >= range_sq {
            return;
        }

        neighbors.push((dist_sq, vertex));
        let mut i = neighbors.len() - 1;
        while i != 0 && dist_sq < neighbors[i - 1].0 {
            neighbors[i] = neighbors[i - 1];
            i -= 1;
        }
        neighbors[i] = (dist_sq, vertex);
    }

    /// Builds constraints from already gathered neighbors and solves for the new velocity
    pub(crate) fn solve(
        &self,
        agent_neighbors: Vec<(f32, usize)>,
        obstacle_neighbors: Vec<(f32, usize)>,
        agents: &[Agent],
        obstacles: &ObstacleSet,
        time_step: f32,
    ) -> AgentSolve {
        let mut lines = Vec::with_capacity(obstacle_neighbors.len() + agent_neighbors.len());
        for &(_, vertex) in &obstacle_neighbors {
            if let Some(line) = self.obstacle_line(vertex, obstacles, &lines) {
                lines.push(line);
            }
        }
        let num_obstacle_lines = lines.len();

        for &(_, other) in &agent_neighbors {
            if let Some(other) = agents.get(other) {
                lines.push(self.agent_line(other, time_step));
            }
        }

        let new_velocity = solve_velocity(&lines, num_obstacle_lines, self.max_speed, self.pref_velocity);
        AgentSolve {
            agent_neighbors,
            obstacle_neighbors,
            orca_lines: lines,
            new_velocity,
        }
    }

    /// Constraint keeping this agent off the edge starting at `vertex`.
    ///
    /// Returns `None` when the edge is already covered by `existing` lines or
    /// cannot be collided with.
    fn obstacle_line(&self, vertex: usize, obstacles: &ObstacleSet, existing: &[OrcaLine]) -> Option<OrcaLine> {
        let inv_time_horizon_obst = 1.0 / self.time_horizon_obst;
        let mut obstacle1 = obstacles.vertex(vertex)?;
        let mut obstacle2 = obstacles.vertex(obstacle1.next)?;

        let relative_position1 = obstacle1.point - self.position;
        let relative_position2 = obstacle2.point - self.position;

        // Skip edges whose cutoff is already behind an existing line.
        let already_covered = existing.iter().any(|line| {
            det(inv_time_horizon_obst * relative_position1 - line.point, line.direction)
                - inv_time_horizon_obst * self.radius
                >= -RVO_EPSILON
                && det(inv_time_horizon_obst * relative_position2 - line.point, line.direction)
                    - inv_time_horizon_obst * self.radius
                    >= -RVO_EPSILON
        });
        if already_covered {
            return None;
        }

        let dist_sq1 = relative_position1.length_squared();
        let dist_sq2 = relative_position2.length_squared();
        let radius_sq = self.radius * self.radius;

        let obstacle_vector = obstacle2.point - obstacle1.point;
        let s = (-relative_position1).dot(obstacle_vector) / obstacle_vector.length_squared();
        let dist_sq_line = (-relative_position1 - s * obstacle_vector).length_squared();

        if s < 0.0 && dist_sq1 <= radius_sq {
            // Collision with the left vertex; non-convex vertices are ignored.
            return obstacle1.convex.then(|| {
                OrcaLine::new(
                    Vec2::ZERO,
                    Vec2::new(-relative_position1.y, relative_position1.x).normalize_or_zero(),
                )
            });
        }
        if s > 1.0 && dist_sq2 <= radius_sq {
            // Collision with the right vertex; handled by the next edge unless this is its left side.
            return (obstacle2.convex && det(relative_position2, obstacle2.direction) >= 0.0).then(|| {
                OrcaLine::new(
                    Vec2::ZERO,
                    Vec2::new(-relative_position2.y, relative_position2.x).normalize_or_zero(),
                )
            });
        }
        if (0.0..1.0).contains(&s) && dist_sq_line <= radius_sq {
            // Collision with the segment
            return Some(OrcaLine::new(Vec2::ZERO, -obstacle1.direction));
        }

        let leg = |relative: Vec2, dist_sq: f32, left: bool| {
            let l = (dist_sq - radius_sq).max(0.0).sqrt();
            if left {
                Vec2::new(
                    relative.x * l - relative.y * self.radius,
                    relative.x * self.radius + relative.y * l,
                ) / dist_sq
            } else {
                Vec2::new(
                    relative.x * l + relative.y * self.radius,
                    -relative.x * self.radius + relative.y * l,
                ) / dist_sq
            }
        };

        let (mut left_leg_direction, mut right_leg_direction) = if s < 0.0 && dist_sq_line <= radius_sq {
            // Seen obliquely so that only the left vertex defines the velocity obstacle.
            if !obstacle1.convex {
                return None;
            }
            obstacle2 = obstacle1;
            (
                leg(relative_position1, dist_sq1, true),
                leg(relative_position1, dist_sq1, false),
            )
        } else if s > 1.0 && dist_sq_line <= radius_sq {
            // Only the right vertex defines the velocity obstacle.
            if !obstacle2.convex {
                return None;
            }
            obstacle1 = obstacle2;
            (
                leg(relative_position2, dist_sq2, true),
                leg(relative_position2, dist_sq2, false),
            )
        } else {
            let left = if obstacle1.convex {
                leg(relative_position1, dist_sq1, true)
            } else {
                -obstacle1.direction
            };
            let right = if obstacle2.convex {
                leg(relative_position2, dist_sq2, false)
            } else {
                obstacle1.direction
            };
            (left, right)
        };

        // Legs must not point into the neighboring edges.
        let left_neighbor = obstacles.vertex(obstacle1.previous)?;
        let mut is_left_leg_foreign = false;
        let mut is_right_leg_foreign = false;

        if obstacle1.convex && det(left_leg_direction, -left_neighbor.direction) >= 0.0 {
            left_leg_direction = -left_neighbor.direction;
            is_left_leg_foreign = true;
        }
        if obstacle2.convex && det(right_leg_direction, obstacle2.direction) <= 0.0 {
            right_leg_direction = obstacle2.direction;
            is_right_leg_foreign = true;
        }

        let left_cutoff = inv_time_horizon_obst * (obstacle1.point - self.position);
        let right_cutoff = inv_time_horizon_obst * (obstacle2.point - self.position);
        let cutoff_vector = right_cutoff - left_cutoff;
        let same_vertex = obstacle1.id == obstacle2.id;

        let t = if same_vertex {
            0.5
        } else {
            (self.velocity - left_cutoff).dot(cutoff_vector) / cutoff_vector.length_squared()
        };
        let t_left = (self.velocity - left_cutoff).dot(left_leg_direction);
        let t_right = (self.velocity - right_cutoff).dot(right_leg_direction);

        let scaled_radius = self.radius * inv_time_horizon_obst;
        let cutoff_circle_line = |center: Vec2| {
            let unit_w = (self.velocity - center).normalize_or_zero();
            OrcaLine::new(center + scaled_radius * unit_w, Vec2::new(unit_w.y, -unit_w.x))
        };

        if (t < 0.0 && t_left < 0.0) || (same_vertex && t_left < 0.0 && t_right < 0.0) {
            return Some(cutoff_circle_line(left_cutoff));
        }
        if t > 1.0 && t_right < 0.0 {
            return Some(cutoff_circle_line(right_cutoff));
        }

        // Project on whichever of the cutoff line and the two legs is closest.
        let dist_sq_cutoff = if t < 0.0 || t > 1.0 || same_vertex {
            f32::INFINITY
        } else {
            (self.velocity - (left_cutoff + t * cutoff_vector)).length_squared()
        };
        let dist_sq_left = if t_left < 0.0 {
            f32::INFINITY
        } else {
            (self.velocity - (left_cutoff + t_left * left_leg_direction)).length_squared()
        };
        let dist_sq_right = if t_right < 0.0 {
            f32::INFINITY
        } else {
            (self.velocity - (right_cutoff + t_right * right_leg_direction)).length_squared()
        };

        let offset_line = |origin: Vec2, direction: Vec2| {
            OrcaLine::new(origin + scaled_radius * Vec2::new(-direction.y, direction.x), direction)
        };

        if dist_sq_cutoff <= dist_sq_left && dist_sq_cutoff <= dist_sq_right {
            return Some(offset_line(left_cutoff, -obstacle1.direction));
        }
        if dist_sq_left <= dist_sq_right {
            return (!is_left_leg_foreign).then(|| offset_line(left_cutoff, left_leg_direction));
        }
        (!is_right_leg_foreign).then(|| offset_line(right_cutoff, -right_leg_direction))
    }

    /// Reciprocal constraint against another agent
    fn agent_line(&self, other: &Agent, time_step: f32) -> OrcaLine {
        let inv_time_horizon = 1.0 / self.time_horizon;
        let relative_position = other.position - self.position;
        let relative_velocity = self.velocity - other.velocity;
        let dist_sq = relative_position.length_squared();
        let combined_radius = self.radius + other.radius + other.weight;
        let combined_radius_sq = combined_radius * combined_radius;

        let (direction, u) = if dist_sq > combined_radius_sq {
            // No collision yet
            let w = relative_velocity - inv_time_horizon * relative_position;
            let w_length_sq = w.length_squared();
            let dot_product1 = w.dot(relative_position);

            if dot_product1 < 0.0 && dot_product1 * dot_product1 > combined_radius_sq * w_length_sq {
                // Project on the cutoff circle
                let w_length = w_length_sq.sqrt();
                let unit_w = w / w_length;
                (
                    Vec2::new(unit_w.y, -unit_w.x),
                    (combined_radius * inv_time_horizon - w_length) * unit_w,
                )
            } else {
                // Project on the legs
                let leg = (dist_sq - combined_radius_sq).sqrt();
                let direction = if det(relative_position, w) > 0.0 {
                    Vec2::new(
                        relative_position.x * leg - relative_position.y * combined_radius,
                        relative_position.x * combined_radius + relative_position.y * leg,
                    ) / dist_sq
                } else {
                    -Vec2::new(
                        relative_position.x * leg + relative_position.y * combined_radius,
                        -relative_position.x * combined_radius + relative_position.y * leg,
                    ) / dist_sq
                };
                let dot_product2 = relative_velocity.dot(direction);
                (direction, dot_product2 * direction - relative_velocity)
            }
        } else {
            // Already overlapping: resolve within one time step.
            let inv_time_step = 1.0 / time_step;
            let w = relative_velocity - inv_time_step * relative_position;
            let w_length = w.length();
            let unit_w = if w_length > RVO_EPSILON {
                w / w_length
            } else {
                // Coincident agents with equal velocity; pick any separating axis.
                Vec2::new(-1.0, 0.0)
            };
            (
                Vec2::new(unit_w.y, -unit_w.x),
                (combined_radius * inv_time_step - w_length) * unit_w,
            )
        };

        OrcaLine::new(self.velocity + 0.5 * u, direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(id: usize, position: Vec2) -> Agent {
        Agent::new(id, position, &AgentDefaults::default())
    }

    #[test]
    fn test_mask_raw_round_trip() {
        assert_eq!(AvoidanceMask::from_raw(0), AvoidanceMask::All);
        assert_eq!(AvoidanceMask::from_raw(-1), AvoidanceMask::None);
        assert_eq!(AvoidanceMask::from_raw(6), AvoidanceMask::Groups(6));
        assert_eq!(AvoidanceMask::Groups(6).raw(), 6);
        assert_eq!(AvoidanceMask::None.raw(), -1);
    }

    #[test]
    fn test_mask_filtering() {
        assert!(AvoidanceMask::All.avoids(0));
        assert!(!AvoidanceMask::None.avoids(u32::MAX));
        assert!(AvoidanceMask::Groups(0b0110).avoids(0b0100));
        assert!(!AvoidanceMask::Groups(0b0110).avoids(0b1001));
    }

    #[test]
    fn test_neighbors_are_sorted_and_capped() {
        let mut a = agent(0, Vec2::ZERO);
        a.max_neighbors = 2;
        let others = [
            agent(1, Vec2::new(30.0, 0.0)),
            agent(2, Vec2::new(10.0, 0.0)),
            agent(3, Vec2::new(20.0, 0.0)),
        ];

        let mut neighbors = Vec::new();
        let mut range_sq = a.neighbor_dist * a.neighbor_dist;
        a.insert_agent_neighbor(&mut neighbors, &a.clone(), &mut range_sq);
        for other in &others {
            a.insert_agent_neighbor(&mut neighbors, other, &mut range_sq);
        }

        let ids: Vec<usize> = neighbors.iter().map(|n| n.1).collect();
        assert_eq!(ids, vec![2, 3]);
        assert_eq!(range_sq, 400.0);
    }

    #[test]
    fn test_approaching_agents_get_separating_line() {
        let mut a = agent(0, Vec2::ZERO);
        a.velocity = Vec2::new(50.0, 0.0);
        let mut b = agent(1, Vec2::new(100.0, 0.0));
        b.velocity = Vec2::new(-50.0, 0.0);

        let line = a.agent_line(&b, 0.1);
        // Keeping the head-on velocity must violate the constraint.
        assert!(line.violation(a.velocity) > 0.0);
        assert!(line.violation(Vec2::new(-50.0, 0.0)) < 0.0);
    }

    #[test]
    fn test_overlapping_agents_push_apart() {
        let a = agent(0, Vec2::ZERO);
        let b = agent(1, Vec2::new(10.0, 0.0));
        let line = a.agent_line(&b, 0.1);
        // Standing still is forbidden, moving away is encouraged.
        assert!(line.violation(Vec2::ZERO) > 0.0);
        assert!(line.violation(Vec2::new(-200.0, 0.0)) < 0.0);
    }
}
