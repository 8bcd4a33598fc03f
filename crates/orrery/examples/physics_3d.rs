//! 3D physics: a stack of boxes dropped on a fixed floor, printed as it settles.

use orrery::prelude::*;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let physics = PhysicsWorld3d::new();
    let mut stage = Stage::new();

    let floor = RigidBodyEntity::new(
        stage.ids(),
        &physics,
        BodyKind::Fixed,
        Shape3d::Cuboid {
            half_extents: Vec3::new(10.0, 0.5, 10.0),
        },
        Transform::from_xyz(0.0, -0.5, 0.0),
    );
    stage.spawn(floor)?;

    let mut boxes = Vec::new();
    for i in 0..5 {
        let crate_box = RigidBodyEntity::new(
            stage.ids(),
            &physics,
            BodyKind::Dynamic,
            Shape3d::Cuboid {
                half_extents: Vec3::splat(0.5),
            },
            Transform::from_xyz(0.1 * i as f32, 2.0 + 1.5 * i as f32, 0.0),
        )
        .with_mesh(MeshHandle(i))
        .with_restitution(0.2);
        boxes.push(stage.spawn(crate_box)?);
    }

    let mut paddle = RigidBodyEntity::new(
        stage.ids(),
        &physics,
        BodyKind::Kinematic,
        Shape3d::Cuboid {
            half_extents: Vec3::new(0.25, 0.5, 2.0),
        },
        Transform::from_xyz(-4.0, 0.5, 0.0),
    );
    paddle.set_name("paddle");
    let paddle = stage.spawn(paddle)?;

    let dt = 1.0 / 60.0;
    for frame in 0..240 {
        physics.step(dt);
        stage.tick(dt);
        if frame % 10 == 0 {
            let x = -4.0 + frame as f32 * 0.02;
            stage.move_entity(paddle, Vec3::new(x, 0.5, 0.0));
        }
        if frame % 60 == 0 {
            for id in &boxes {
                if let Some(entity) = stage.get(*id) {
                    println!("t={:.1}s {id} at {:.2}", frame as f32 * dt, entity.position());
                }
            }
        }
    }
    println!("{physics:?}");
    Ok(())
}
