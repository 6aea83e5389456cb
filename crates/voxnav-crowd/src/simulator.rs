//! Multi-agent ORCA simulation
//!
//! A step runs in two phases. The compute phase reads a consistent snapshot of
//! every agent and produces new velocities; the apply phase writes them back
//! and integrates positions. Agents never observe each other's new state within
//! one step, so splitting the compute phase into worker ranges does not change
//! the outcome.

use glam::Vec2;
use voxnav_common::{Error, Result};
use voxnav_query::ObstacleRegistry;

use crate::agent::{Agent, AgentSolve, AvoidanceMask};
use crate::config::{AgentDefaults, SimulatorConfig};
use crate::linear_program::OrcaLine;
use crate::obstacle::{ObstacleSet, ObstacleVertex};
use crate::proximity_grid::ProximityGrid;

/// ORCA simulator over agents and polygon obstacles
#[derive(Debug, Clone)]
pub struct Simulator {
    config: SimulatorConfig,
    defaults: Option<AgentDefaults>,
    agents: Vec<Agent>,
    obstacles: ObstacleSet,
    agent_grid: ProximityGrid,
    global_time: f32,
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new(SimulatorConfig::default())
    }
}

impl Simulator {
    pub fn new(config: SimulatorConfig) -> Self {
        Self {
            agent_grid: ProximityGrid::new(config.agent_cell_size),
            config: SimulatorConfig {
                num_workers: config.num_workers.max(1),
                ..config
            },
            defaults: None,
            agents: Vec::new(),
            obstacles: ObstacleSet::new(),
            global_time: 0.0,
        }
    }

    /// Creates a simulator that can accept agents right away
    pub fn with_defaults(config: SimulatorConfig, defaults: AgentDefaults) -> Self {
        let mut sim = Self::new(config);
        sim.defaults = Some(defaults);
        sim
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Sets the parameters applied to agents added afterwards
    pub fn set_agent_defaults(&mut self, defaults: AgentDefaults) -> Result<()> {
        defaults.validate()?;
        self.defaults = Some(defaults);
        Ok(())
    }

    pub fn agent_defaults(&self) -> Option<&AgentDefaults> {
        self.defaults.as_ref()
    }

    /// Adds an agent and returns its id
    pub fn add_agent(&mut self, position: Vec2) -> Result<usize> {
        let Some(defaults) = &self.defaults else {
            return Err(Error::Configuration(
                "agent defaults must be set before adding agents".to_string(),
            ));
        };
        let id = self.agents.len();
        self.agents.push(Agent::new(id, position, defaults));
        Ok(id)
    }

    pub fn num_agents(&self) -> usize {
        self.agents.len()
    }

    pub fn agent(&self, id: usize) -> Option<&Agent> {
        self.agents.get(id)
    }

    pub fn agent_mut(&mut self, id: usize) -> Option<&mut Agent> {
        self.agents.get_mut(id)
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    fn agent_checked(&self, id: usize) -> Result<&Agent> {
        self.agents
            .get(id)
            .ok_or_else(|| Error::InvalidInput(format!("no agent with id {id}")))
    }

    fn agent_checked_mut(&mut self, id: usize) -> Result<&mut Agent> {
        self.agents
            .get_mut(id)
            .ok_or_else(|| Error::InvalidInput(format!("no agent with id {id}")))
    }

    /// Adds a closed polygon obstacle; counter-clockwise polygons are solid.
    ///
    /// The obstacle only takes effect after [`Simulator::process_obstacles`].
    pub fn add_obstacle(&mut self, vertices: &[Vec2]) -> Option<usize> {
        self.obstacles.add_polygon(vertices)
    }

    pub fn process_obstacles(&mut self) {
        self.obstacles.process();
        log::debug!("processed {} obstacle vertices", self.obstacles.len());
    }

    /// Moves the polygon containing vertex `id` by `offset`
    pub fn move_obstacle(&mut self, id: usize, offset: Vec2) -> Result<()> {
        if self.obstacles.move_polygon(id, offset) {
            Ok(())
        } else {
            Err(Error::InvalidInput(format!("no obstacle vertex with id {id}")))
        }
    }

    pub fn obstacles(&self) -> &ObstacleSet {
        &self.obstacles
    }

    pub fn obstacle_vertex(&self, id: usize) -> Option<&ObstacleVertex> {
        self.obstacles.vertex(id)
    }

    pub fn num_obstacle_vertices(&self) -> usize {
        self.obstacles.len()
    }

    pub fn clear_obstacles(&mut self) {
        self.obstacles.clear();
    }

    /// Removes agents and obstacles and forgets the agent defaults
    pub fn clear(&mut self) {
        self.agents.clear();
        self.obstacles.clear();
        self.agent_grid.clear();
        self.defaults = None;
        self.global_time = 0.0;
    }

    /// Whether `q1` sees `q2` past every processed obstacle with `radius` clearance
    pub fn query_visibility(&self, q1: Vec2, q2: Vec2, radius: f32) -> bool {
        self.obstacles.query_visibility(q1, q2, radius)
    }

    pub fn time_step(&self) -> f32 {
        self.config.time_step
    }

    pub fn set_time_step(&mut self, time_step: f32) {
        self.config.time_step = time_step;
    }

    pub fn num_workers(&self) -> usize {
        self.config.num_workers
    }

    pub fn set_num_workers(&mut self, num_workers: usize) {
        self.config.num_workers = num_workers.max(1);
    }

    pub fn global_time(&self) -> f32 {
        self.global_time
    }

    pub fn set_global_time(&mut self, time: f32) {
        self.global_time = time;
    }

    pub fn agent_position(&self, id: usize) -> Result<Vec2> {
        Ok(self.agent_checked(id)?.position)
    }

    pub fn set_agent_position(&mut self, id: usize, position: Vec2) -> Result<()> {
        self.agent_checked_mut(id)?.position = position;
        Ok(())
    }

    pub fn agent_velocity(&self, id: usize) -> Result<Vec2> {
        Ok(self.agent_checked(id)?.velocity)
    }

    pub fn set_agent_velocity(&mut self, id: usize, velocity: Vec2) -> Result<()> {
        self.agent_checked_mut(id)?.velocity = velocity;
        Ok(())
    }

    pub fn agent_pref_velocity(&self, id: usize) -> Result<Vec2> {
        Ok(self.agent_checked(id)?.pref_velocity)
    }

    pub fn set_agent_pref_velocity(&mut self, id: usize, velocity: Vec2) -> Result<()> {
        self.agent_checked_mut(id)?.pref_velocity = velocity;
        Ok(())
    }

    pub fn agent_radius(&self, id: usize) -> Result<f32> {
        Ok(self.agent_checked(id)?.radius)
    }

    pub fn set_agent_radius(&mut self, id: usize, radius: f32) -> Result<()> {
        self.agent_checked_mut(id)?.radius = radius;
        Ok(())
    }

    pub fn agent_max_speed(&self, id: usize) -> Result<f32> {
        Ok(self.agent_checked(id)?.max_speed)
    }

    pub fn set_agent_max_speed(&mut self, id: usize, max_speed: f32) -> Result<()> {
        self.agent_checked_mut(id)?.max_speed = max_speed;
        Ok(())
    }

    pub fn set_agent_max_neighbors(&mut self, id: usize, max_neighbors: usize) -> Result<()> {
        self.agent_checked_mut(id)?.max_neighbors = max_neighbors;
        Ok(())
    }

    pub fn set_agent_neighbor_dist(&mut self, id: usize, neighbor_dist: f32) -> Result<()> {
        self.agent_checked_mut(id)?.neighbor_dist = neighbor_dist;
        Ok(())
    }

    pub fn set_agent_time_horizon(&mut self, id: usize, time_horizon: f32) -> Result<()> {
        self.agent_checked_mut(id)?.time_horizon = time_horizon;
        Ok(())
    }

    pub fn set_agent_time_horizon_obst(&mut self, id: usize, time_horizon: f32) -> Result<()> {
        self.agent_checked_mut(id)?.time_horizon_obst = time_horizon;
        Ok(())
    }

    pub fn agent_weight(&self, id: usize) -> Result<f32> {
        Ok(self.agent_checked(id)?.weight)
    }

    pub fn set_agent_weight(&mut self, id: usize, weight: f32) -> Result<()> {
        self.agent_checked_mut(id)?.weight = weight;
        Ok(())
    }

    pub fn agent_avoidance_mask(&self, id: usize) -> Result<AvoidanceMask> {
        Ok(self.agent_checked(id)?.avoidance_mask)
    }

    pub fn set_agent_avoidance_mask(&mut self, id: usize, mask: AvoidanceMask) -> Result<()> {
        self.agent_checked_mut(id)?.avoidance_mask = mask;
        Ok(())
    }

    pub fn agent_avoidance_layer(&self, id: usize) -> Result<u32> {
        Ok(self.agent_checked(id)?.avoidance_layer)
    }

    pub fn set_agent_avoidance_layer(&mut self, id: usize, layer: u32) -> Result<()> {
        self.agent_checked_mut(id)?.avoidance_layer = layer;
        Ok(())
    }

    pub fn agent_orca_lines(&self, id: usize) -> Result<&[OrcaLine]> {
        Ok(self.agent_checked(id)?.orca_lines())
    }

    pub fn agent_neighbors(&self, id: usize) -> Result<&[(f32, usize)]> {
        Ok(self.agent_checked(id)?.agent_neighbors())
    }

    pub fn obstacle_neighbors(&self, id: usize) -> Result<&[(f32, usize)]> {
        Ok(self.agent_checked(id)?.obstacle_neighbors())
    }

    /// Advances the simulation by one time step and returns the new global time
    pub fn step(&mut self) -> f32 {
        let dt = self.config.time_step;
        self.agent_grid
            .rebuild(self.agents.iter().map(|a| (a.id, a.position)));

        let count = self.agents.len();
        let workers = self.config.num_workers.min(count.max(1));
        let mut solves = Vec::with_capacity(count);
        for block in 0..workers {
            let start = block * count / workers;
            let end = (block + 1) * count / workers;
            solves.extend((start..end).map(|i| self.compute_agent(i, dt)));
        }

        for (agent, solve) in self.agents.iter_mut().zip(solves) {
            agent.agent_neighbors = solve.agent_neighbors;
            agent.obstacle_neighbors = solve.obstacle_neighbors;
            agent.orca_lines = solve.orca_lines;
            agent.velocity = solve.new_velocity;
            agent.position += agent.velocity * dt;
        }

        self.global_time += dt;
        log::debug!(
            "simulation step: {} agents, t={:.3}",
            count,
            self.global_time
        );
        self.global_time
    }

    /// Gathers neighbors for agent `index` and solves its velocity
    fn compute_agent(&self, index: usize, time_step: f32) -> AgentSolve {
        let agent = &self.agents[index];

        let mut obstacle_neighbors = Vec::new();
        let obstacle_range_sq = agent.obstacle_range_sq();
        for vertex in self
            .obstacles
            .edges_near(agent.position, obstacle_range_sq.sqrt())
        {
            agent.insert_obstacle_neighbor(
                &mut obstacle_neighbors,
                &self.obstacles,
                vertex,
                obstacle_range_sq,
            );
        }

        let mut agent_neighbors = Vec::new();
        if agent.max_neighbors > 0 {
            let mut range_sq = agent.neighbor_dist * agent.neighbor_dist;
            for entry in self.agent_grid.query(agent.position, agent.neighbor_dist) {
                if let Some(other) = self.agents.get(entry.id) {
                    agent.insert_agent_neighbor(&mut agent_neighbors, other, &mut range_sq);
                }
            }
        }

        agent.solve(
            agent_neighbors,
            obstacle_neighbors,
            &self.agents,
            &self.obstacles,
            time_step,
        )
    }
}

impl ObstacleRegistry for Simulator {
    fn clear_obstacles(&mut self) {
        Simulator::clear_obstacles(self);
    }

    fn register_obstacle(&mut self, vertices: &[Vec2]) -> Option<usize> {
        self.add_obstacle(vertices)
    }

    fn process_obstacles(&mut self) {
        Simulator::process_obstacles(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_agent_requires_defaults() {
        let mut sim = Simulator::default();
        assert!(matches!(sim.add_agent(Vec2::ZERO), Err(Error::Configuration(_))));

        sim.set_agent_defaults(AgentDefaults::default()).expect("valid defaults");
        assert_eq!(sim.add_agent(Vec2::ZERO).expect("defaults set"), 0);
        assert_eq!(sim.add_agent(Vec2::ONE).expect("defaults set"), 1);
        assert_eq!(sim.num_agents(), 2);

        sim.clear();
        assert_eq!(sim.num_agents(), 0);
        assert!(sim.agent_defaults().is_none());
        assert!(sim.add_agent(Vec2::ZERO).is_err());
    }

    #[test]
    fn test_invalid_agent_id() {
        let mut sim = Simulator::with_defaults(SimulatorConfig::default(), AgentDefaults::default());
        assert!(matches!(sim.agent_position(3), Err(Error::InvalidInput(_))));
        assert!(sim.set_agent_pref_velocity(3, Vec2::X).is_err());
        assert!(sim.move_obstacle(0, Vec2::X).is_err());
    }

    #[test]
    fn test_lone_agent_moves_at_preferred_velocity() {
        let mut sim = Simulator::with_defaults(SimulatorConfig::default(), AgentDefaults::default());
        let id = sim.add_agent(Vec2::ZERO).expect("defaults set");
        sim.set_agent_pref_velocity(id, Vec2::new(10.0, 0.0)).expect("valid id");

        let time = sim.step();
        assert!((time - 0.1).abs() < 1e-6);
        let position = sim.agent_position(id).expect("valid id");
        assert!((position - Vec2::new(1.0, 0.0)).length() < 1e-4);
        assert!(sim.agent_orca_lines(id).expect("valid id").is_empty());
    }

    #[test]
    fn test_workers_do_not_change_results() {
        let run = |workers: usize| {
            let mut sim = Simulator::with_defaults(SimulatorConfig::default(), AgentDefaults::default());
            sim.set_num_workers(workers);
            for i in 0..5 {
                let id = sim.add_agent(Vec2::new(i as f32 * 20.0, 0.0)).expect("defaults set");
                let dir = if i % 2 == 0 { 1.0 } else { -1.0 };
                sim.set_agent_pref_velocity(id, Vec2::new(dir * 50.0, 10.0)).expect("valid id");
            }
            for _ in 0..10 {
                sim.step();
            }
            sim.agents().iter().map(|a| a.position).collect::<Vec<_>>()
        };
        assert_eq!(run(1), run(3));
        assert_eq!(run(0), run(1));
    }

    #[test]
    fn test_registry_forwards_to_obstacles() {
        let mut sim = Simulator::default();
        let registry: &mut dyn ObstacleRegistry = &mut sim;
        registry.clear_obstacles();
        let id = registry.register_obstacle(&[Vec2::ZERO, Vec2::X, Vec2::ONE]);
        registry.process_obstacles();
        assert_eq!(id, Some(0));
        assert_eq!(sim.num_obstacle_vertices(), 3);
        assert!(sim.obstacles().is_processed());
    }
}
