use std::{sync::Arc, time::Instant};

use log::info;

use shell_tour_core::{
    ExperimentOptions, Result,
    experiment::{
        runner::{RunSettings, run_experiment},
        tasks::{generate_problems, generate_tasks},
    },
    logging,
    world::{demo::DemoContextFactory, scene::Scene},
};

fn main() -> Result<()> {
    let now = Instant::now();
    let options = ExperimentOptions::from_args()?;
    logging::init_logger(&options)?;
    info!("options: {options}");

    let scenes = load_scenes(&options)?;
    let problems = generate_problems(
        &scenes,
        &options.targets,
        options.runs,
        options.clearance,
        options.seed,
    )?;
    let tasks = generate_tasks(&options.planner_configs(), &problems, options.seed);
    info!(
        "tasks: scenes={} problems={} tasks={}",
        scenes.len(),
        problems.len(),
        tasks.len()
    );

    let factory = DemoContextFactory::new(options.clearance, options.goal_radius, options.ptp_budget());
    let summary = run_experiment(
        tasks,
        &factory,
        &RunSettings {
            results: options.results.clone(),
            batch_size: options.batch_size,
            workers: options.workers,
            task_budget: options.task_budget(),
        },
    )?;

    info!(
        "output: completed={}/{} interrupted={} time={:.2}s",
        summary.completed,
        summary.total,
        summary.interrupted,
        now.elapsed().as_secs_f32()
    );

    Ok(())
}

fn load_scenes(options: &ExperimentOptions) -> Result<Vec<Arc<Scene>>> {
    if options.scenes.is_empty() {
        let scene = Scene::procedural("procedural", options.seed, options.scene_targets);
        info!("scene: {scene}");
        return Ok(vec![Arc::new(scene)]);
    }
    options
        .scenes
        .iter()
        .map(|path| {
            let scene = Scene::load(path)?;
            info!("scene: {scene} path={}", path.display());
            Ok(Arc::new(scene))
        })
        .collect()
}
