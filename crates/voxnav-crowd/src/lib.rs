//! Local collision avoidance and navigation agents
//!
//! The [`Simulator`] runs ORCA (optimal reciprocal collision avoidance) over
//! circular agents and polygon obstacles. Each step builds one half-plane
//! constraint per nearby agent or obstacle edge and solves a small linear
//! program for the velocity closest to what the agent prefers.
//!
//! [`NavMeshAgent`] connects one simulated agent to a
//! [`voxnav_query::NavMesh`]: it follows waypoints, smooths its desired
//! velocity with a spring and turns to face its heading. [`Crowd`] drives a
//! set of such agents frame by frame.
//!
//! # Example
//!
//! ```rust,ignore
//! use voxnav_crowd::{AgentAdapterConfig, AgentDefaults, Crowd, Simulator, SimulatorConfig};
//! use voxnav_query::NavMesh;
//!
//! let mut nav = NavMesh::with_dimensions(100.0, 100.0);
//! let sim = Simulator::with_defaults(SimulatorConfig::default(), AgentDefaults::default());
//! let mut crowd = Crowd::new(sim);
//! crowd.bake_obstacles(&mut nav)?;
//!
//! let agent = crowd.add_agent(Vec2::new(10.0, 10.0), AgentAdapterConfig::default())?;
//! crowd.set_destination(agent, &mut nav, Vec2::new(90.0, 90.0))?;
//! loop {
//!     crowd.update(1.0 / 60.0, &mut nav)?;
//! }
//! ```

mod agent;
mod config;
mod crowd;
mod linear_program;
mod nav_agent;
mod obstacle;
mod proximity_grid;
mod simulator;
mod spring;

#[cfg(test)]
mod test_helpers;

#[cfg(test)]
mod avoidance_tests;


pub use agent::{Agent, AvoidanceMask};
pub use config::{AgentAdapterConfig, AgentDefaults, AlignmentMode, SimulatorConfig};
pub use crowd::Crowd;
pub use linear_program::{linear_program2, linear_program3, solve_velocity, OrcaLine};
pub use nav_agent::{NavMeshAgent, TURN_RATE_DEGREES_PER_SECOND};
pub use obstacle::{ObstacleEdge, ObstacleSet, ObstacleVertex};
pub use proximity_grid::{GridAgent, ProximityGrid, DEFAULT_CELL_SIZE};
pub use simulator::Simulator;
pub use spring::{fast_neg_exp, halflife_to_damping, FloatSpring, Vec2Spring};
