//! Audio: a looping sound circling the listener, fading with distance.
//!
//! Usage: `cargo run --example audio --features audio -- path/to/sound.ogg`

use orrery::prelude::*;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let Some(path) = std::env::args().nth(1) else {
        eprintln!("usage: audio <sound file>");
        return Ok(());
    };
    let engine = AudioEngine::try_new()?;
    let sound = SoundData::from_file(&path)?.looping();

    let mut stage = Stage::new();
    let emitter = SoundEmitter::with_transform(
        stage.ids(),
        &engine,
        sound,
        15.0,
        Transform::from_xyz(5.0, 0.0, 0.0),
    )
    .with_volume(0.8);
    let emitter = stage.spawn(emitter)?;

    let dt = 1.0 / 60.0;
    for frame in 0..600 {
        let angle = frame as f32 * dt;
        let radius = 5.0 + 10.0 * (angle * 0.5).sin().abs();
        stage.move_entity(emitter, Vec3::new(radius * angle.cos(), 0.0, radius * angle.sin()));
        stage.tick(dt);
        std::thread::sleep(std::time::Duration::from_secs_f32(dt));
    }

    if let Some(entity) = stage.get(emitter) {
        println!("{}", entity.describe());
    }
    Ok(())
}
