//! Navigation agent adapter
//!
//! A [`NavMeshAgent`] follows a path from a [`NavMesh`] and turns it into a
//! preferred velocity for its avoidance agent in a [`Simulator`]. The host
//! reads the simulated position back every frame and passes it to
//! [`NavMeshAgent::update`].

use std::collections::VecDeque;
use std::fmt;

use glam::Vec2;
use voxnav_common::{deg_to_rad, normalize_biased, wrap_angle, Result};
use voxnav_query::NavMesh;

use crate::agent::AvoidanceMask;
use crate::config::{AgentAdapterConfig, AlignmentMode};
use crate::simulator::Simulator;
use crate::spring::Vec2Spring;

/// Fixed rate at which facing turns toward its alignment target
pub const TURN_RATE_DEGREES_PER_SECOND: f32 = 360.0;

/// Dot product against the outgoing edge above which a waypoint counts as passed
const PASSED_WAYPOINT_DOT: f32 = 0.2;

const DESIRED_VELOCITY_HALFLIFE: f32 = 0.1;
const DESIRED_VELOCITY_DAMPING: f32 = 1.0;

type ArrivalCallback = Box<dyn FnOnce()>;

pub struct NavMeshAgent {
    agent_id: usize,
    config: AgentAdapterConfig,
    /// Cosine of the required forward alignment angle
    required_alignment: Option<f32>,
    position: Vec2,
    rotation: f32,
    target_rotation: f32,
    desired_velocity: Vec2Spring,
    waypoints: VecDeque<Vec2>,
    has_path: bool,
    target: Option<Vec2>,
    reached_destination: bool,
    since_repath: f32,
    callbacks: Vec<ArrivalCallback>,
}

impl fmt::Debug for NavMeshAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavMeshAgent")
            .field("agent_id", &self.agent_id)
            .field("position", &self.position)
            .field("rotation", &self.rotation)
            .field("waypoints", &self.waypoints)
            .field("target", &self.target)
            .field("reached_destination", &self.reached_destination)
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}

impl NavMeshAgent {
    /// Registers a new avoidance agent at `position` and wraps it
    pub fn new(sim: &mut Simulator, position: Vec2, config: AgentAdapterConfig) -> Result<Self> {
        config.validate()?;
        let agent_id = sim.add_agent(position)?;
        sim.set_agent_max_speed(agent_id, config.speed)?;
        sim.set_agent_radius(agent_id, config.radius)?;

        let mut desired_velocity = Vec2Spring::new(DESIRED_VELOCITY_HALFLIFE, DESIRED_VELOCITY_DAMPING);
        desired_velocity.set_value(Vec2::ZERO);

        Ok(Self {
            agent_id,
            required_alignment: config
                .required_forward_alignment_degrees
                .map(|degrees| deg_to_rad(degrees).cos()),
            config,
            position,
            rotation: 0.0,
            target_rotation: 0.0,
            desired_velocity,
            waypoints: VecDeque::new(),
            has_path: false,
            target: None,
            reached_destination: false,
            since_repath: 0.0,
            callbacks: Vec::new(),
        })
    }

    /// Id of the wrapped agent in the simulator
    pub fn agent_id(&self) -> usize {
        self.agent_id
    }

    pub fn config(&self) -> &AgentAdapterConfig {
        &self.config
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Facing in radians
    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    pub fn set_rotation(&mut self, rotation: f32) {
        self.rotation = wrap_angle(rotation);
    }

    pub fn destination(&self) -> Option<Vec2> {
        self.target
    }

    /// Remaining waypoints, next one first
    pub fn waypoints(&self) -> &VecDeque<Vec2> {
        &self.waypoints
    }

    pub fn has_path(&self) -> bool {
        self.has_path
    }

    pub fn has_reached_destination(&self) -> bool {
        self.reached_destination
    }

    pub fn desired_velocity(&self) -> Vec2 {
        self.desired_velocity.value()
    }

    /// Plans a path to `target` and starts following it.
    ///
    /// A target the mesh cannot resolve leaves the agent without a path.
    pub fn set_destination(&mut self, nav: &mut NavMesh, target: Vec2) -> Result<()> {
        self.reached_destination = false;
        let path = nav.get_path(self.position, target)?;

        if self.config.apply_congestion {
            let congestion = nav.congestion_mut();
            for pair in path.windows(2) {
                congestion.set_congestion_line(pair[0], pair[1], self.config.congestion_value);
            }
        }

        self.has_path = !path.is_empty();
        self.waypoints = path.into();
        self.target = Some(target);
        self.since_repath = 0.0;
        Ok(())
    }

    pub fn clear_destination(&mut self) {
        self.waypoints.clear();
        self.desired_velocity.set_goal(Vec2::ZERO);
        self.has_path = false;
    }

    /// Queues `callback` for the next arrival; each callback runs once
    pub fn on_reach_destination(&mut self, callback: impl FnOnce() + 'static) {
        self.callbacks.push(Box::new(callback));
    }

    pub fn alignment_mode(&self) -> AlignmentMode {
        self.config.alignment_mode
    }

    pub fn set_alignment_mode(&mut self, mode: AlignmentMode) {
        self.config.alignment_mode = mode;
    }

    /// Facing error (in degrees) at which forward movement starts; `None` disables the gate
    pub fn set_required_forward_alignment(&mut self, degrees: Option<f32>) {
        self.config.required_forward_alignment_degrees = degrees;
        self.required_alignment = degrees.map(|d| deg_to_rad(d).cos());
    }

    pub fn set_immobile(&self, sim: &mut Simulator, immobile: bool) -> Result<()> {
        let speed = if immobile { 0.0 } else { self.config.speed };
        sim.set_agent_max_speed(self.agent_id, speed)
    }

    pub fn set_max_speed(&mut self, sim: &mut Simulator, max_speed: f32) -> Result<()> {
        self.config.speed = max_speed;
        sim.set_agent_max_speed(self.agent_id, max_speed)
    }

    pub fn set_avoidance_mask(&self, sim: &mut Simulator, mask: AvoidanceMask) -> Result<()> {
        sim.set_agent_avoidance_mask(self.agent_id, mask)
    }

    /// Places the agent on `layer`, optionally making it avoid only that layer
    pub fn set_avoidance_layer(&self, sim: &mut Simulator, layer: u32, and_set_mask: bool) -> Result<()> {
        sim.set_agent_avoidance_layer(self.agent_id, layer)?;
        if and_set_mask {
            sim.set_agent_avoidance_mask(self.agent_id, AvoidanceMask::from_raw(layer as i32))?;
        }
        Ok(())
    }

    /// Velocity to hand to the simulator, scaled down while facing away from the heading
    pub fn preferred_velocity(&self) -> Vec2 {
        self.forward_factor() * self.desired_velocity.value()
    }

    fn forward_factor(&self) -> f32 {
        let Some(required) = self.required_alignment else {
            return 1.0;
        };
        let facing = Vec2::from_angle(self.rotation);
        let heading = Vec2::from_angle(self.target_rotation);
        let dot = facing.dot(heading).max(0.0);
        ((dot - required) / (1.0 - required + 1e-4)).max(0.0)
    }

    fn alignment_angle(&self, current_velocity: Vec2) -> f32 {
        let towards = |point: Vec2| {
            let d = point - self.position;
            d.y.atan2(d.x)
        };
        match self.config.alignment_mode {
            AlignmentMode::None => self.rotation,
            AlignmentMode::CurrentVelocity => current_velocity.y.atan2(current_velocity.x),
            AlignmentMode::DesiredVelocity => {
                let desired = self.desired_velocity.value();
                desired.y.atan2(desired.x)
            }
            AlignmentMode::NextWaypoint => self.waypoints.front().map_or(self.rotation, |&p| towards(p)),
            AlignmentMode::FinalWaypoint => self.waypoints.back().map_or(self.rotation, |&p| towards(p)),
            AlignmentMode::Target => self.target.map_or(self.rotation, towards),
        }
    }

    fn turn(&mut self, dt: f32) {
        let delta = wrap_angle(self.target_rotation - self.rotation);
        let max_step = deg_to_rad(TURN_RATE_DEGREES_PER_SECOND) * dt;
        let step = if delta > max_step {
            max_step
        } else if delta < -max_step {
            -max_step
        } else {
            delta
        };
        self.rotation = wrap_angle(self.rotation + step);
    }

    fn arrive(&mut self) {
        self.desired_velocity.set_goal(Vec2::ZERO);
        self.has_path = false;
        self.reached_destination = true;
        for callback in self.callbacks.drain(..) {
            callback();
        }
    }

    /// Advances steering by `dt` seconds from the simulated `position`
    pub fn update(&mut self, dt: f32, position: Vec2, current_velocity: Vec2, nav: &mut NavMesh) -> Result<()> {
        self.position = position;
        self.desired_velocity.update(dt);

        self.target_rotation = self.alignment_angle(current_velocity);
        self.turn(dt);

        if !self.has_path {
            return Ok(());
        }

        self.since_repath += dt;
        if self.since_repath > self.config.repath_interval {
            if let Some(target) = self.target {
                log::debug!("agent {} re-planning to {}", self.agent_id, target);
                return self.set_destination(nav, target);
            }
        }

        let Some(&next) = self.waypoints.front() else {
            self.arrive();
            return Ok(());
        };

        let offset = next - position;
        let distance = offset.length();
        let direction = normalize_biased(offset);

        match self.waypoints.get(1) {
            Some(&after) => {
                let passed = (position - next).dot(after - next) > PASSED_WAYPOINT_DOT;
                if (distance < self.config.corner_distance && passed) || distance <= self.config.snap_distance {
                    self.waypoints.pop_front();
                }
            }
            None => {
                if distance <= self.config.arrival_distance {
                    self.waypoints.pop_front();
                    return Ok(());
                }
            }
        }

        self.desired_velocity.set_goal(direction * self.config.speed);
        Ok(())
    }
}
