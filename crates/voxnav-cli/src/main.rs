//! CLI utility for baking voxel navigation meshes, querying paths and running avoidance simulations

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use glam::Vec2;
use std::fs;
use std::path::{Path, PathBuf};

use voxnav_bake::{BakeMode, Encoding};
use voxnav_common::Rect;
use voxnav_crowd::{AgentAdapterConfig, AgentDefaults, Crowd, Simulator, SimulatorConfig};
use voxnav_query::{NavMesh, NavMeshConfig, PathFinderOptions};

/// A CLI utility for voxnav navigation meshes and crowds
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Bake a navigation mesh and write it to a file
    Bake {
        /// Output navigation mesh file
        #[clap(long, value_parser)]
        output: PathBuf,

        #[clap(long, default_value = "100.0")]
        width: f32,

        #[clap(long, default_value = "100.0")]
        height: f32,

        /// Smallest voxel side the subdivision produces
        #[clap(long, default_value = "5.0")]
        min_voxel_size: f32,

        /// Extra clearance added around every obstacle
        #[clap(long, default_value = "0.0")]
        padding: f32,

        /// `include-all` walks everything, `volume` only the given volumes
        #[clap(long, default_value = "include-all", value_parser = parse_bake_mode)]
        mode: BakeMode,

        /// Obstacle rectangle (x,y,w,h); repeatable
        #[clap(long = "obstacle", value_parser = parse_rect)]
        obstacles: Vec<Rect>,

        /// Walkable volume rectangle (x,y,w,h); repeatable
        #[clap(long = "volume", value_parser = parse_rect)]
        volumes: Vec<Rect>,

        /// Write the voxel envelope with the compact character encoding
        #[clap(long)]
        compact: bool,
    },

    /// Find a path on a baked navigation mesh
    Path {
        /// Input navigation mesh file
        #[clap(long, value_parser)]
        mesh: PathBuf,

        /// Start position (x,y)
        #[clap(long, value_parser = parse_point)]
        start: Vec2,

        /// End position (x,y)
        #[clap(long, value_parser = parse_point)]
        end: Vec2,

        /// Skip funnel string pulling and return voxel centers
        #[clap(long)]
        no_funnel: bool,

        /// Skip any-angle shortcutting
        #[clap(long)]
        no_any_angle: bool,

        /// Output path file (JSON array of points)
        #[clap(long, value_parser)]
        output: Option<PathBuf>,
    },

    /// Run a headless crowd simulation on a baked navigation mesh
    Simulate {
        /// Input navigation mesh file
        #[clap(long, value_parser)]
        mesh: PathBuf,

        /// Agent as start and destination (x,y:x,y); repeatable
        #[clap(long = "agent", value_parser = parse_route, required = true)]
        agents: Vec<(Vec2, Vec2)>,

        #[clap(long, default_value = "300")]
        steps: usize,

        /// Seconds per step
        #[clap(long, default_value = "0.1")]
        dt: f32,

        #[clap(long, default_value = "50.0")]
        speed: f32,

        #[clap(long, default_value = "8.0")]
        radius: f32,
    },
}

fn parse_numbers<const N: usize>(s: &str) -> Result<[f32; N], String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != N {
        return Err(format!("Expected {} components, got {}", N, parts.len()));
    }
    let mut out = [0.0; N];
    for (slot, part) in out.iter_mut().zip(&parts) {
        *slot = part.parse::<f32>().map_err(|e| e.to_string())?;
    }
    Ok(out)
}

/// Parse a comma-separated point
fn parse_point(s: &str) -> Result<Vec2, String> {
    let [x, y] = parse_numbers::<2>(s)?;
    Ok(Vec2::new(x, y))
}

/// Parse a comma-separated rectangle
fn parse_rect(s: &str) -> Result<Rect, String> {
    let [x, y, w, h] = parse_numbers::<4>(s)?;
    if w < 0.0 || h < 0.0 {
        return Err(format!("Rectangle size must be non-negative, got {}x{}", w, h));
    }
    Ok(Rect::new(x, y, w, h))
}

/// Parse `start:destination`
fn parse_route(s: &str) -> Result<(Vec2, Vec2), String> {
    let (start, end) = s
        .split_once(':')
        .ok_or_else(|| format!("Expected start:destination, got '{}'", s))?;
    Ok((parse_point(start)?, parse_point(end)?))
}

fn parse_bake_mode(s: &str) -> Result<BakeMode, String> {
    match s.to_lowercase().as_str() {
        "include-all" | "all" => Ok(BakeMode::IncludeAll),
        "volume" | "volumes" => Ok(BakeMode::Volume),
        other => Err(format!("Unknown bake mode '{}'", other)),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Commands::Bake {
            output,
            width,
            height,
            min_voxel_size,
            padding,
            mode,
            obstacles,
            volumes,
            compact,
        } => {
            let config = NavMeshConfig {
                width,
                height,
                min_voxel_size,
                bake_mode: mode,
                ..Default::default()
            };
            let encoding = if compact { Encoding::Compact } else { Encoding::Plain };
            bake_mesh(&output, config, obstacles, volumes, padding, encoding)
        }
        Commands::Path {
            mesh,
            start,
            end,
            no_funnel,
            no_any_angle,
            output,
        } => {
            let options = PathFinderOptions {
                use_funnel: !no_funnel,
                use_any_angle: !no_any_angle,
                ..Default::default()
            };
            let path = find_path(&mesh, start, end, options)?;
            write_path(&path, output.as_deref())
        }
        Commands::Simulate {
            mesh,
            agents,
            steps,
            dt,
            speed,
            radius,
        } => {
            let config = AgentAdapterConfig {
                speed,
                radius,
                ..Default::default()
            };
            let report = simulate(&mesh, &agents, steps, dt, config)?;
            for (i, agent) in report.iter().enumerate() {
                println!(
                    "agent {}: ({:.2}, {:.2}) {}",
                    i,
                    agent.position.x,
                    agent.position.y,
                    if agent.arrived { "arrived" } else { "en route" }
                );
            }
            Ok(())
        }
    }
}

/// Bake a navigation mesh and save it
fn bake_mesh(
    output: &Path,
    config: NavMeshConfig,
    obstacles: Vec<Rect>,
    volumes: Vec<Rect>,
    padding: f32,
    encoding: Encoding,
) -> Result<()> {
    let (width, height) = (config.width, config.height);
    let mut nav = NavMesh::new(config);
    nav.set_obstacles(obstacles);
    if !volumes.is_empty() {
        nav.set_volumes(volumes);
    }

    println!("Baking {}x{} navigation mesh...", width, height);
    nav.bake(Rect::new(0.0, 0.0, width, height), padding)
        .map_err(|e| anyhow!("Failed to bake navigation mesh: {}", e))?;
    println!("Navigation mesh baked: {} voxels", nav.voxels().len());
    print!("{}", nav.context().timer_summary());

    let data = nav
        .serialize(encoding)
        .map_err(|e| anyhow!("Failed to serialize navigation mesh: {}", e))?;

    println!("Saving navigation mesh to {}...", output.display());
    fs::write(output, data)
        .with_context(|| format!("Failed to write output file: {}", output.display()))?;
    Ok(())
}

fn load_mesh(path: &Path, nav: &mut NavMesh, simulator: Option<&mut Simulator>) -> Result<()> {
    println!("Loading navigation mesh from {}...", path.display());
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read navigation mesh: {}", path.display()))?;
    let result = match simulator {
        Some(sim) => nav.import_into(&data, sim),
        None => nav.import(&data),
    };
    result.map_err(|e| anyhow!("Failed to load navigation mesh: {}", e))
}

/// Find a path on a saved navigation mesh
fn find_path(mesh_path: &Path, start: Vec2, end: Vec2, options: PathFinderOptions) -> Result<Vec<Vec2>> {
    let mut nav = NavMesh::with_dimensions(0.0, 0.0);
    load_mesh(mesh_path, &mut nav, None)?;
    nav.set_path_finder_options(options);

    println!("Finding path from {} to {}...", start, end);
    let path = nav
        .find_path(start, end)
        .map_err(|e| anyhow!("Failed to find path: {}", e))?;
    println!("Found path with {} waypoints", path.len());
    Ok(path)
}

fn write_path(path: &[Vec2], output: Option<&Path>) -> Result<()> {
    match output {
        Some(output_path) => {
            println!("Saving path to {}...", output_path.display());
            let points: Vec<[f32; 2]> = path.iter().map(|p| p.to_array()).collect();
            let json = serde_json::to_string_pretty(&points)?;
            fs::write(output_path, json).with_context(|| {
                format!("Failed to create output file: {}", output_path.display())
            })?;
        }
        None => {
            println!("Path:");
            for (i, waypoint) in path.iter().enumerate() {
                println!("{}: {},{}", i, waypoint.x, waypoint.y);
            }
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy)]
struct AgentReport {
    position: Vec2,
    arrived: bool,
}

/// Run a crowd on a saved navigation mesh and report where every agent ended up
fn simulate(
    mesh_path: &Path,
    routes: &[(Vec2, Vec2)],
    steps: usize,
    dt: f32,
    config: AgentAdapterConfig,
) -> Result<Vec<AgentReport>> {
    let mut crowd = Crowd::new(Simulator::with_defaults(
        SimulatorConfig::default(),
        AgentDefaults::default(),
    ));
    let mut nav = NavMesh::with_dimensions(0.0, 0.0);
    load_mesh(mesh_path, &mut nav, Some(crowd.simulator_mut()))?;

    for &(start, destination) in routes {
        let index = crowd
            .add_agent(start, config)
            .map_err(|e| anyhow!("Failed to add agent at {}: {}", start, e))?;
        crowd
            .set_destination(index, &mut nav, destination)
            .map_err(|e| anyhow!("Failed to route agent to {}: {}", destination, e))?;
    }

    println!("Simulating {} agents for {} steps...", routes.len(), steps);
    for _ in 0..steps {
        crowd
            .update(dt, &mut nav)
            .map_err(|e| anyhow!("Simulation step failed: {}", e))?;
    }

    crowd
        .agents()
        .iter()
        .map(|agent| {
            Ok(AgentReport {
                position: crowd.simulator().agent_position(agent.agent_id())?,
                arrived: agent.has_reached_destination(),
            })
        })
        .collect::<voxnav_common::Result<Vec<_>>>()
        .map_err(|e| anyhow!("Failed to read agent state: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bake_to(dir: &Path, name: &str, obstacles: Vec<Rect>, encoding: Encoding) -> Result<PathBuf> {
        let output = dir.join(name);
        let config = NavMeshConfig {
            width: 100.0,
            height: 100.0,
            ..Default::default()
        };
        bake_mesh(&output, config, obstacles, Vec::new(), 0.0, encoding)?;
        Ok(output)
    }

    #[test]
    fn test_parsers() {
        assert_eq!(parse_point("1.5, 2").ok(), Some(Vec2::new(1.5, 2.0)));
        assert!(parse_point("1,2,3").is_err());
        assert_eq!(parse_rect("0,0,10,20").ok(), Some(Rect::new(0.0, 0.0, 10.0, 20.0)));
        assert!(parse_rect("0,0,-1,2").is_err());
        assert_eq!(
            parse_route("1,2:3,4").ok(),
            Some((Vec2::new(1.0, 2.0), Vec2::new(3.0, 4.0)))
        );
        assert!(parse_route("1,2").is_err());
        assert_eq!(parse_bake_mode("Volume").ok(), Some(BakeMode::Volume));
        assert!(parse_bake_mode("sideways").is_err());
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "voxnav", "bake", "--output", "mesh.json", "--obstacle", "40,40,20,20", "--obstacle", "0,0,5,5",
            "--compact",
        ])
        .expect("valid arguments");
        match args.command {
            Commands::Bake { obstacles, compact, mode, .. } => {
                assert_eq!(obstacles.len(), 2);
                assert!(compact);
                assert_eq!(mode, BakeMode::IncludeAll);
            }
            other => panic!("unexpected command {:?}", other),
        }

        assert!(Args::try_parse_from(["voxnav", "simulate", "--mesh", "mesh.json"]).is_err());
    }

    #[test]
    fn test_bake_then_path() -> Result<()> {
        let dir = tempfile::tempdir()?;
        for (name, encoding) in [("plain.json", Encoding::Plain), ("compact.json", Encoding::Compact)] {
            let mesh = bake_to(dir.path(), name, vec![Rect::new(40.0, 40.0, 20.0, 20.0)], encoding)?;
            let path = find_path(&mesh, Vec2::new(5.0, 5.0), Vec2::new(95.0, 95.0), PathFinderOptions::default())?;
            assert_eq!(path.first(), Some(&Vec2::new(5.0, 5.0)));
            assert_eq!(path.last(), Some(&Vec2::new(95.0, 95.0)));
            assert!(path.len() > 2, "path must bend around the obstacle");
        }
        Ok(())
    }

    #[test]
    fn test_path_output_is_json() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let output = dir.path().join("path.json");
        write_path(&[Vec2::new(1.0, 2.0), Vec2::new(3.0, 4.0)], Some(&output))?;
        let points: Vec<[f32; 2]> = serde_json::from_str(&fs::read_to_string(&output)?)?;
        assert_eq!(points, vec![[1.0, 2.0], [3.0, 4.0]]);
        Ok(())
    }

    #[test]
    fn test_missing_mesh_reports_context() {
        let err = find_path(
            Path::new("/nonexistent/mesh.json"),
            Vec2::ZERO,
            Vec2::ONE,
            PathFinderOptions::default(),
        )
        .expect_err("file does not exist");
        assert!(format!("{:#}", err).contains("Failed to read navigation mesh"));
    }

    #[test]
    fn test_simulate_reaches_destinations() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mesh = bake_to(dir.path(), "open.json", Vec::new(), Encoding::Plain)?;
        let routes = [
            (Vec2::new(10.0, 20.0), Vec2::new(90.0, 20.0)),
            (Vec2::new(90.0, 80.0), Vec2::new(10.0, 80.0)),
        ];
        let report = simulate(&mesh, &routes, 200, 0.1, AgentAdapterConfig::default())?;
        assert_eq!(report.len(), 2);
        assert!(report.iter().all(|agent| agent.arrived));
        assert!(report[0].position.x > 70.0);
        assert!(report[1].position.x < 30.0);
        Ok(())
    }
}
