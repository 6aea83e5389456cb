//! Behavioural tests for the ORCA simulator

#[cfg(test)]
mod tests {
    use glam::Vec2;
    use voxnav_common::{Rect, Result};

    use crate::agent::AvoidanceMask;
    use crate::test_helpers::*;

    #[test]
    fn test_overlapping_agents_separate_monotonically() -> Result<()> {
        let mut sim = simulator();
        let a = sim.add_agent(Vec2::new(0.0, 0.0))?;
        let b = sim.add_agent(Vec2::new(10.0, 0.0))?;

        let mut previous = overlap(&sim, a, b);
        assert!((previous - 22.0).abs() < 1e-4);
        for _ in 0..20 {
            sim.step();
            let current = overlap(&sim, a, b);
            assert!(current <= previous + 1e-3, "overlap grew from {previous} to {current}");
            previous = current;
        }
        assert!(previous < 0.01, "agents still overlap by {previous}");
        Ok(())
    }

    #[test]
    fn test_solved_speed_never_exceeds_max() -> Result<()> {
        let mut sim = simulator();
        let count = 8;
        let mut targets = Vec::new();
        for i in 0..count {
            let angle = i as f32 / count as f32 * std::f32::consts::TAU;
            let offset = Vec2::from_angle(angle) * 60.0;
            let id = sim.add_agent(offset)?;
            if i % 2 == 0 {
                sim.set_agent_max_speed(id, 40.0)?;
            }
            targets.push(-offset);
        }

        for _ in 0..60 {
            for (id, &target) in targets.iter().enumerate() {
                let to_target = target - sim.agent_position(id)?;
                sim.set_agent_pref_velocity(id, to_target.clamp_length_max(1.0) * 120.0)?;
            }
            sim.step();
            for agent in sim.agents() {
                assert!(
                    agent.velocity.length() <= agent.max_speed + 1e-2,
                    "agent {} moves at {} over {}",
                    agent.id,
                    agent.velocity.length(),
                    agent.max_speed
                );
            }
        }
        Ok(())
    }

    #[test]
    fn test_agents_slow_down_for_each_other() -> Result<()> {
        let mut sim = simulator();
        let a = sim.add_agent(Vec2::new(0.0, 0.0))?;
        let b = sim.add_agent(Vec2::new(100.0, 0.0))?;
        sim.set_agent_pref_velocity(a, Vec2::new(50.0, 0.0))?;
        sim.set_agent_pref_velocity(b, Vec2::new(-50.0, 0.0))?;

        sim.step();
        assert!(sim.agent_velocity(a)?.x < 50.0);
        assert_eq!(sim.agent_neighbors(a)?.len(), 1);
        assert_eq!(sim.agent_orca_lines(a)?.len(), 1);
        Ok(())
    }

    #[test]
    fn test_mask_none_ignores_other_agents() -> Result<()> {
        let mut sim = simulator();
        let a = sim.add_agent(Vec2::new(0.0, 0.0))?;
        let b = sim.add_agent(Vec2::new(100.0, 0.0))?;
        sim.set_agent_pref_velocity(a, Vec2::new(50.0, 0.0))?;
        sim.set_agent_pref_velocity(b, Vec2::new(-50.0, 0.0))?;
        sim.set_agent_avoidance_mask(a, AvoidanceMask::None)?;
        sim.set_agent_avoidance_mask(b, AvoidanceMask::None)?;

        sim.step();
        assert_eq!(sim.agent_velocity(a)?, Vec2::new(50.0, 0.0));
        assert_eq!(sim.agent_velocity(b)?, Vec2::new(-50.0, 0.0));
        assert!(sim.agent_neighbors(a)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_mask_groups_filter_by_layer() -> Result<()> {
        let mut sim = simulator();
        let a = sim.add_agent(Vec2::new(0.0, 0.0))?;
        let b = sim.add_agent(Vec2::new(100.0, 0.0))?;
        sim.set_agent_pref_velocity(a, Vec2::new(50.0, 0.0))?;
        sim.set_agent_pref_velocity(b, Vec2::new(-50.0, 0.0))?;

        // a only avoids layer 2, b lives on layer 1; b avoids everyone.
        sim.set_agent_avoidance_mask(a, AvoidanceMask::Groups(0b10))?;
        sim.set_agent_avoidance_layer(b, 0b01)?;

        sim.step();
        assert_eq!(sim.agent_velocity(a)?, Vec2::new(50.0, 0.0));
        assert!(sim.agent_velocity(b)?.x > -50.0);
        Ok(())
    }

    #[test]
    fn test_weight_widens_clearance() -> Result<()> {
        let mut sim = simulator();
        let a = sim.add_agent(Vec2::new(0.0, 0.0))?;
        let b = sim.add_agent(Vec2::new(40.0, 0.0))?;
        sim.step();
        assert!(sim.agent_velocity(a)?.length() < 1e-4, "32 apart needs no push");

        sim.set_agent_weight(b, 20.0)?;
        sim.step();
        assert!(sim.agent_velocity(a)?.x < 0.0, "weighted neighbor pushes a away");
        Ok(())
    }

    #[test]
    fn test_agent_stops_at_obstacle() -> Result<()> {
        let mut sim = simulator();
        sim.add_obstacle(&CENTER_OBSTACLE.outline_ccw());
        sim.process_obstacles();

        let id = sim.add_agent(Vec2::new(0.0, 50.0))?;
        sim.set_agent_pref_velocity(id, Vec2::new(100.0, 0.0))?;
        for _ in 0..30 {
            sim.step();
            let position = sim.agent_position(id)?;
            assert!(position.x + 16.0 <= 40.5, "agent at {position} pierced the wall");
        }
        assert!(!sim.obstacle_neighbors(id)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_moving_obstacle_frees_the_way() -> Result<()> {
        let mut sim = simulator();
        let obstacle = sim
            .add_obstacle(&CENTER_OBSTACLE.outline_ccw())
            .ok_or_else(|| voxnav_common::Error::InvalidInput("square".to_string()))?;
        sim.process_obstacles();
        sim.move_obstacle(obstacle, Vec2::new(0.0, 200.0))?;

        let id = sim.add_agent(Vec2::new(0.0, 50.0))?;
        sim.set_agent_pref_velocity(id, Vec2::new(100.0, 0.0))?;
        for _ in 0..10 {
            sim.step();
        }
        assert!(sim.agent_position(id)?.x > 90.0);
        Ok(())
    }

    #[test]
    fn test_visibility_through_simulator() {
        let mut sim = simulator();
        sim.add_obstacle(&Rect::new(0.0, 0.0, 100.0, 100.0).outline_cw());
        sim.add_obstacle(&CENTER_OBSTACLE.outline_ccw());
        sim.process_obstacles();

        assert!(sim.query_visibility(Vec2::new(10.0, 10.0), Vec2::new(90.0, 10.0), 5.0));
        assert!(!sim.query_visibility(Vec2::new(10.0, 50.0), Vec2::new(90.0, 50.0), 0.0));
        // Passes 2 units below the square: clear without clearance, blocked with it.
        assert!(sim.query_visibility(Vec2::new(10.0, 38.0), Vec2::new(90.0, 38.0), 0.0));
        assert!(!sim.query_visibility(Vec2::new(10.0, 38.0), Vec2::new(90.0, 38.0), 5.0));
    }

    #[test]
    fn test_clear_resets_simulation() -> Result<()> {
        let mut sim = simulator();
        sim.add_agent(Vec2::ZERO)?;
        sim.add_obstacle(&CENTER_OBSTACLE.outline_ccw());
        sim.step();
        assert!(sim.global_time() > 0.0);

        sim.clear();
        assert_eq!(sim.num_agents(), 0);
        assert_eq!(sim.num_obstacle_vertices(), 0);
        assert_eq!(sim.global_time(), 0.0);
        Ok(())
    }
}
