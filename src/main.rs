//! Split Pool headless host
//!
//! Stands in for the physics layer: balls fly inside a circular arena, every
//! wall bounce (and every ball-to-ball contact when balls collide) is reported
//! to the simulation as a collision. Frames arrive at an uneven cadence and
//! are cut into fixed ticks. Prints the run statistics as JSON at the end.
//!
//! Usage: `split-pool [config.json]`

use std::process::ExitCode;

use glam::Vec2;

use split_pool::consts::SIM_DT;
use split_pool::sim::{
    CollisionEvent, EntityHandle, FixedStep, Participant, Simulation, TickInput, tick,
};
use split_pool::{RunStats, SimConfig};

/// Arena border radius
const ARENA_RADIUS: f32 = 10.0;
const BALL_RADIUS: f32 = 0.25;
/// Simulated seconds to run
const RUN_SECONDS: f32 = 60.0;
/// Seconds between progress lines
const REPORT_INTERVAL: f64 = 10.0;
/// Host frame times, cycled (roughly 40 fps with jitter)
const FRAME_TIMES: [f32; 4] = [0.021, 0.029, 0.024, 0.026];

#[derive(Debug, Clone, Copy)]
struct Body {
    handle: EntityHandle,
    pos: Vec2,
    vel: Vec2,
    collides: bool,
}

/// Reflect velocity off a surface with the given normal
fn reflect_velocity(vel: Vec2, normal: Vec2) -> Vec2 {
    vel - 2.0 * vel.dot(normal) * normal
}

/// Integrate active balls and collect this tick's collisions
fn step_physics(sim: &mut Simulation, dt: f32) -> Vec<CollisionEvent> {
    let mut bodies: Vec<Body> = sim
        .active_entities()
        .map(|e| Body {
            handle: e.handle,
            pos: e.pos,
            vel: e.vel,
            collides: e.collision_exclusion,
        })
        .collect();
    let mut hits = Vec::new();

    let limit = ARENA_RADIUS - BALL_RADIUS;
    for body in &mut bodies {
        body.pos += body.vel * dt;
        if body.pos.length() > limit {
            // Normal points back toward the arena center
            let normal = -body.pos.normalize_or_zero();
            body.pos = -normal * limit;
            if body.vel.dot(normal) < 0.0 {
                body.vel = reflect_velocity(body.vel, normal);
            }
            hits.push(CollisionEvent::boundary(body.handle, body.pos, body.vel));
        }
    }

    for i in 0..bodies.len() {
        for j in (i + 1)..bodies.len() {
            let (a, b) = (bodies[i], bodies[j]);
            if !a.collides || !b.collides {
                continue;
            }
            let delta = b.pos - a.pos;
            let dist = delta.length();
            if dist >= 2.0 * BALL_RADIUS || dist == 0.0 {
                continue;
            }
            let normal = delta / dist;
            let closing = (a.vel - b.vel).dot(normal);
            if closing <= 0.0 {
                continue;
            }
            // Equal masses: swap the normal components
            bodies[i].vel -= normal * closing;
            bodies[j].vel += normal * closing;
            hits.push(CollisionEvent {
                entity: a.handle,
                position: a.pos,
                velocity: bodies[i].vel,
                other: Participant::Entity(b.handle),
            });
            hits.push(CollisionEvent {
                entity: b.handle,
                position: b.pos,
                velocity: bodies[j].vel,
                other: Participant::Entity(a.handle),
            });
        }
    }

    for body in &bodies {
        if let Some(entity) = sim.entity_mut(body.handle) {
            entity.pos = body.pos;
            entity.vel = body.vel;
        }
    }
    hits
}

fn load_config() -> Result<SimConfig, split_pool::ConfigError> {
    match std::env::args().nth(1) {
        Some(path) => SimConfig::load(path),
        None => Ok(SimConfig::default()),
    }
}

/// Run one frame: as many fixed ticks as the accumulator allows
fn run_frame(sim: &mut Simulation, step: &mut FixedStep, stats: &mut RunStats, frame_dt: f32) {
    for _ in 0..step.substeps(frame_dt) {
        let input = TickInput {
            collisions: step_physics(sim, SIM_DT),
        };
        tick(sim, &input, SIM_DT);
        for event in sim.drain_events() {
            stats.record(&event);
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> ExitCode {
    env_logger::init();
    log::info!("Split Pool (headless) starting...");

    let mut sim = match load_config().and_then(Simulation::new) {
        Ok(sim) => sim,
        Err(err) => {
            log::error!("{}", err);
            return ExitCode::FAILURE;
        }
    };
    let config = sim.config();
    log::info!(
        "Ball-to-ball collisions {}, reset delay {}s",
        if config.collision_exclusion_enabled { "on" } else { "off" },
        config.reset_delay
    );

    let mut stats = RunStats::new();
    let mut step = FixedStep::new();
    let mut next_report = REPORT_INTERVAL;

    for &frame_dt in FRAME_TIMES.iter().cycle() {
        if sim.clock() >= RUN_SECONDS as f64 {
            break;
        }
        run_frame(&mut sim, &mut step, &mut stats, frame_dt);

        if sim.clock() >= next_report {
            log::info!("t={:.0}s {}", sim.clock(), stats.summary());
            next_report += REPORT_INTERVAL;
        }
    }

    match serde_json::to_string_pretty(&stats) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            log::error!("Failed to serialize stats: {}", err);
            ExitCode::FAILURE
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // Headless host is native only; embedders drive the library directly
}
