//! Headless stage: a few entities ticking against a wall, no window.
//!
//! Pass a JSON config path as the first argument to override the defaults.
//! Set `RUST_LOG=orrery=debug` to watch the lifecycle.

use orrery::prelude::*;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    orrery::diag::init_logger();

    let config = match std::env::args().nth(1) {
        Some(path) => match StageConfig::from_file(&path) {
            Ok(config) => config,
            Err(e) => {
                log::error!("{e}; using defaults");
                StageConfig::default()
            }
        },
        None => StageConfig::default(),
    };
    let mut stage = Stage::from_config(&config);

    // A wall at x = 4 and a floor under everything.
    stage
        .collision()
        .add_static(Aabb::new(Vec3::new(4.0, -5.0, -5.0), Vec3::new(5.0, 5.0, 5.0)));
    stage
        .collision()
        .add_static(Aabb::new(Vec3::new(-50.0, -2.0, -50.0), Vec3::new(50.0, -0.5, 50.0)));

    // Both collision entities take the configured default policy.
    let mut runner = stage.actor(MeshHandle(0), Vec3::splat(0.5), Transform::IDENTITY);
    runner.set_name("runner");
    runner.set_velocity(Vec3::new(2.0, -1.0, 0.0));
    let runner = stage.spawn(runner)?;

    let mut spinner = VisualEntity::with_transform(stage.ids(), MeshHandle(1), Transform::from_xyz(0.0, 3.0, 0.0));
    spinner.set_name("spinner");
    spinner.set_angular_velocity(Vec3::new(0.0, 1.0, 0.0));
    stage.spawn(spinner)?;

    let pillar = stage
        .collision_body(Vec3::new(0.5, 2.0, 0.5), Transform::from_xyz(0.0, 1.5, 3.0))
        .fixed();
    let pillar = stage.spawn(pillar)?;

    for _ in 0..180 {
        stage.tick(1.0 / 60.0);
    }

    if !stage.move_entity(pillar, Vec3::ZERO) {
        log::info!("pillar {pillar} stays where it is");
    }
    if let Some(entity) = stage.get(runner) {
        log::info!("runner {runner} ended at {}", entity.position());
    }

    match stage.to_json() {
        Ok(json) => println!("{json}"),
        Err(e) => log::error!("snapshot failed: {e}"),
    }
    log::info!("{:?}", stage.stats());
    Ok(())
}
