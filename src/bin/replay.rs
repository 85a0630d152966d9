//! Drives the profiler against the simulated GPU with a jittery synthetic workload and logs what it measures.
//!
//! Usage: `replay [configuration.toml]`. Run with `RUST_LOG=info` (or `debug` to see discarded frames).

#[macro_use]
extern crate log;

use frame_profiler::configuration;
use frame_profiler::sim::{SimContext, SimDevice};
use frame_profiler::{FrameProfiler, FrameReport, Harvest, MarkerKind, ProfilerConfiguration};
use rand::prelude::*;

#[derive(serde::Deserialize, Debug, Clone, Default)]
#[serde(default)]
struct Root {
    profiler: ProfilerConfiguration,
    replay: ReplayConfiguration,
}

#[derive(serde::Deserialize, Debug, Clone)]
#[serde(default)]
struct ReplayConfiguration {
    frames: u32,
    frame_interval_ms: u64,
    frequency: u64,
    gpu_latency_polls: u32,
    report_every: u32,
    disjoint_chance: f32,
    jitter: f32,
    pass: Vec<Pass>,
}

/// GPU work between the previous marker and `marker`.
#[derive(serde::Deserialize, Debug, Clone)]
struct Pass {
    marker: MarkerKind,
    cost_us: f32,
}

impl Default for ReplayConfiguration {
    fn default() -> Self {
        Self {
            frames: 240,
            frame_interval_ms: 16,
            frequency: 1_000_000_000,
            gpu_latency_polls: 2,
            report_every: 60,
            disjoint_chance: 0.01,
            jitter: 0.1,
            pass: Vec::new(),
        }
    }
}

fn cost_ticks(rng: &mut impl Rng, cfg: &ReplayConfiguration, cost_us: f32) -> u64 {
    let jitter = if cfg.jitter > 0.0 {
        rng.gen_range(-cfg.jitter, cfg.jitter)
    } else {
        0.0
    };
    let seconds = (cost_us * (1.0 + jitter)).max(0.0) as f64 * 1e-6;
    (seconds * cfg.frequency as f64) as u64
}

fn record_frame(
    profiler: &mut FrameProfiler<SimDevice>,
    context: &mut SimContext,
    rng: &mut impl Rng,
    cfg: &ReplayConfiguration,
) {
    profiler.begin_frame(context);
    for pass in cfg.pass.iter() {
        let ticks = cost_ticks(rng, cfg, pass.cost_us);
        context.advance(ticks);
        match pass.marker {
            MarkerKind::FrameBegin => {}
            MarkerKind::FrameEnd => {}
            marker => profiler.timestamp(context, marker),
        }
    }
    if rng.gen::<f32>() < cfg.disjoint_chance {
        context.inject_disjoint();
    }
    profiler.end_frame(context);
}

fn main() {
    env_logger::init();

    let path = std::env::args().nth(1).unwrap_or_else(|| "configuration.toml".to_string());
    let root: Root = match configuration::read(&path) {
        Ok(root) => root,
        Err(err) => {
            warn!("{}, using defaults", err);
            Root::default()
        }
    };

    if let Err(err) = root.profiler.validate() {
        error!("{}", err);
        std::process::exit(1);
    }

    let mut cfg = root.replay;
    if cfg.pass.is_empty() {
        cfg.pass = vec![
            Pass { marker: MarkerKind::FrameInit, cost_us: 50.0 },
            Pass { marker: MarkerKind::ZPass, cost_us: 400.0 },
            Pass { marker: MarkerKind::ShadowCoverage, cost_us: 150.0 },
            Pass { marker: MarkerKind::ShadowCast, cost_us: 900.0 },
            Pass { marker: MarkerKind::MainPass, cost_us: 2500.0 },
            Pass { marker: MarkerKind::FrameEnd, cost_us: 300.0 },
        ];
    }
    info!("{:#?}", cfg);

    let device = SimDevice::new(cfg.frequency).with_latency(cfg.gpu_latency_polls);
    let mut context = device.context();
    let mut profiler = FrameProfiler::new(root.profiler);
    if let Err(err) = profiler.init(&device) {
        error!("{}", err);
        std::process::exit(1);
    }

    let mut rng = rand::thread_rng();
    let mut discarded = 0u32;
    let frame_interval = std::time::Duration::from_millis(cfg.frame_interval_ms);

    for frame in 0..cfg.frames {
        record_frame(&mut profiler, &mut context, &mut rng, &cfg);

        match profiler.wait_for_data_and_update(&mut context) {
            Harvest::Disjoint | Harvest::Failed | Harvest::TimedOut => discarded += 1,
            Harvest::Uninitialized | Harvest::Warmup | Harvest::Updated => {}
        }

        if cfg.report_every > 0 && (frame + 1) % cfg.report_every == 0 {
            info!("frame {}\n{}", frame + 1, FrameReport::new(&profiler));
        }

        std::thread::sleep(frame_interval);
    }

    info!("{} of {} frames discarded", discarded, cfg.frames);
    profiler.shutdown();
}
