//! Tether Runtime
//!
//! Headless driver: builds a demo scene and steps it at the fixed tick,
//! logging solver statistics once per simulated second.
//!
//! ```text
//! tether [scene] [frames] [config.json] [--realtime]
//! ```

mod scenes;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tether_core::time::{SimulationTime, TICK_RATE_HZ};
use tether_metrics::{FrameTimer, RingBuffer};
use tether_physics::{Scene, SolverConfig, XpbdSolver};
use tracing::info;

const DEFAULT_FRAMES: u64 = 600;

#[derive(Parser, Debug, PartialEq)]
#[command(version, about, long_about = None)]
struct Options {
    /// Demo scene to build.
    #[arg(default_value = scenes::DEFAULT_SCENE)]
    scene: String,

    /// Number of fixed ticks to simulate.
    #[arg(default_value_t = DEFAULT_FRAMES)]
    frames: u64,

    /// JSON solver config; fields left out keep their defaults.
    config: Option<PathBuf>,

    /// Pace ticks against the wall clock instead of running flat out.
    #[arg(long)]
    realtime: bool,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    tracing::info!("Tether v{}", tether_core::VERSION);
    let options = Options::parse();

    let config = match &options.config {
        Some(path) => SolverConfig::load(path)
            .with_context(|| format!("loading solver config from {}", path.display()))?,
        None => SolverConfig::default(),
    };
    let mut scene = scenes::build(&options.scene)?;
    info!(
        scene = %options.scene,
        particles = scene.particle_count(),
        constraints = scene.constraints().len(),
        "scene ready"
    );

    let mut solver = XpbdSolver::new(config);
    run(&mut solver, &mut scene, &options);
    Ok(())
}

fn run(solver: &mut XpbdSolver, scene: &mut Scene, options: &Options) {
    let mut time = SimulationTime::new();
    let mut step_timer = FrameTimer::new(TICK_RATE_HZ as usize);
    let mut solve_ms = RingBuffer::<f32>::new(TICK_RATE_HZ as usize);
    let mut collision_ms = RingBuffer::<f32>::new(TICK_RATE_HZ as usize);
    let dt = time.tick_seconds();
    let mut last_frame = Instant::now();

    while time.tick_count() < options.frames {
        let due = if options.realtime {
            std::thread::sleep(Duration::from_millis(1));
            let now = Instant::now();
            let due = time.accumulate(now - last_frame);
            last_frame = now;
            due
        } else {
            1
        };

        for _ in 0..due {
            if time.tick_count() >= options.frames {
                break;
            }
            step_timer.begin();
            solver.step(scene, dt);
            step_timer.end();
            time.advance_tick();

            let stats = solver.stats();
            solve_ms.push(stats.solve_time_ms);
            collision_ms.push(stats.collision_time_ms);
            if time.tick_count() % u64::from(TICK_RATE_HZ) == 0 {
                info!(
                    second = time.tick_count() / u64::from(TICK_RATE_HZ),
                    active = stats.active_particles,
                    sleeping = stats.sleeping_particles,
                    constraints = stats.active_constraints,
                    contacts = stats.contact_constraints,
                    solve_ms = solve_ms.average(),
                    collision_ms = collision_ms.average(),
                    "solver stats"
                );
            }
        }
    }

    let (min_ms, max_ms) = step_timer.range_ms();
    info!(
        frames = step_timer.total_frames(),
        simulated_s = time.total_time().as_secs_f32(),
        average_step_ms = step_timer.average_ms(),
        min_step_ms = min_ms,
        max_step_ms = max_ms,
        steps_per_second = step_timer.rate_hz(),
        "simulation finished"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Options, clap::Error> {
        Options::try_parse_from(std::iter::once("tether").chain(args.iter().copied()))
    }

    #[test]
    fn defaults_without_arguments() {
        let options = parse(&[]).expect("valid");
        assert_eq!(options.scene, "stacking");
        assert_eq!(options.frames, DEFAULT_FRAMES);
        assert_eq!(options.config, None);
        assert!(!options.realtime);
    }

    #[test]
    fn positional_arguments_in_order() {
        let options = parse(&["cloth", "120", "solver.json", "--realtime"]).expect("valid");
        assert_eq!(
            options,
            Options {
                scene: "cloth".into(),
                frames: 120,
                config: Some(PathBuf::from("solver.json")),
                realtime: true,
            }
        );
    }

    #[test]
    fn realtime_flag_can_lead() {
        let options = parse(&["--realtime", "rope"]).expect("valid");
        assert!(options.realtime);
        assert_eq!(options.scene, "rope");
        assert_eq!(options.frames, DEFAULT_FRAMES);
    }

    #[test]
    fn bad_frame_count_is_an_error() {
        assert!(parse(&["rope", "lots"]).is_err());
        assert!(parse(&["rope", "-5"]).is_err());
        assert!(parse(&["rope", "1", "a.json", "extra"]).is_err());
        assert!(parse(&["rope", "--fast"]).is_err());
    }

    #[test]
    fn short_run_counts_frames() {
        let options = parse(&["stacking", "30"]).expect("valid");
        let mut scene = scenes::build(&options.scene).expect("builds");
        let mut solver = XpbdSolver::new(SolverConfig::default());
        run(&mut solver, &mut scene, &options);
        assert!(solver.stats().active_particles > 0);
    }
}
