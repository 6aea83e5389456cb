//! Per-frame driver tying navigation agents to one simulator

use glam::Vec2;
use voxnav_common::{Error, Rect, Result};
use voxnav_query::NavMesh;

use crate::config::AgentAdapterConfig;
use crate::nav_agent::NavMeshAgent;
use crate::simulator::Simulator;

/// Owns a simulator and the navigation agents living in it
#[derive(Debug)]
pub struct Crowd {
    simulator: Simulator,
    agents: Vec<NavMeshAgent>,
}

impl Crowd {
    pub fn new(simulator: Simulator) -> Self {
        Self {
            simulator,
            agents: Vec::new(),
        }
    }

    /// Adds a navigation agent and returns its index in the crowd
    pub fn add_agent(&mut self, position: Vec2, config: AgentAdapterConfig) -> Result<usize> {
        let agent = NavMeshAgent::new(&mut self.simulator, position, config)?;
        self.agents.push(agent);
        Ok(self.agents.len() - 1)
    }

    pub fn agent(&self, index: usize) -> Option<&NavMeshAgent> {
        self.agents.get(index)
    }

    pub fn agent_mut(&mut self, index: usize) -> Option<&mut NavMeshAgent> {
        self.agents.get_mut(index)
    }

    pub fn agents(&self) -> &[NavMeshAgent] {
        &self.agents
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn simulator(&self) -> &Simulator {
        &self.simulator
    }

    pub fn simulator_mut(&mut self) -> &mut Simulator {
        &mut self.simulator
    }

    /// Splits the crowd into the simulator and one agent
    pub fn agent_with_simulator(&mut self, index: usize) -> Option<(&mut NavMeshAgent, &mut Simulator)> {
        let agent = self.agents.get_mut(index)?;
        Some((agent, &mut self.simulator))
    }

    pub fn set_destination(&mut self, index: usize, nav: &mut NavMesh, target: Vec2) -> Result<()> {
        self.agents
            .get_mut(index)
            .ok_or_else(|| Error::InvalidInput(format!("no crowd agent with index {index}")))?
            .set_destination(nav, target)
    }

    /// Bakes `nav` over its full area, forwarding its geometry to the simulator as obstacles
    pub fn bake_obstacles(&mut self, nav: &mut NavMesh) -> Result<()> {
        let (width, height) = nav.dimensions();
        nav.bake_into(
            Rect::new(0.0, 0.0, width, height),
            0.0,
            &mut self.simulator,
        )
    }

    /// Steps every agent and then the simulator by `dt` seconds.
    ///
    /// Returns the simulator's global time. Non-positive `dt` leaves
    /// everything untouched.
    pub fn update(&mut self, dt: f32, nav: &mut NavMesh) -> Result<f32> {
        if !(dt > 0.0) {
            return Ok(self.simulator.global_time());
        }

        for agent in &mut self.agents {
            let id = agent.agent_id();
            let position = self.simulator.agent_position(id)?;
            let velocity = self.simulator.agent_velocity(id)?;
            agent.update(dt, position, velocity, nav)?;
            self.simulator
                .set_agent_pref_velocity(id, agent.preferred_velocity())?;
        }

        nav.congestion_mut().update(dt);
        self.simulator.set_time_step(dt);
        Ok(self.simulator.step())
    }
}
