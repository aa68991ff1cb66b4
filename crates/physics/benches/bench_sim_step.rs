use std::hint::black_box;
use std::time::Instant;

use glam::{Quat, Vec3};
use physview_physics::{BodyRole, PhysicsRegistry, SimConfig, SimWorld};

fn cube_points(half: f32) -> Vec<Vec3> {
    let mut pts = Vec::with_capacity(8);
    for x in [-half, half] {
        for y in [-half, half] {
            for z in [-half, half] {
                pts.push(Vec3::new(x, y, z));
            }
        }
    }
    pts
}

fn make_registry(side: i32, layers: i32) -> PhysicsRegistry<SimWorld> {
    let mut registry = PhysicsRegistry::new(SimWorld::new(SimConfig::default()));
    registry.set_gravity(Vec3::new(0.0, -9.81, 0.0));

    let ground = [
        Vec3::new(-100.0, 0.0, -100.0),
        Vec3::new(100.0, 0.0, -100.0),
        Vec3::new(100.0, 0.0, 100.0),
        Vec3::new(-100.0, 0.0, 100.0),
    ];
    registry
        .register_concave(Vec3::ZERO, Quat::IDENTITY, 0.0, &ground, &[0, 1, 2, 0, 2, 3])
        .expect("ground");

    let hull = cube_points(0.4);
    for x in -side..side {
        for z in -side..side {
            for y in 0..layers {
                let p = Vec3::new(x as f32 * 1.5, 20.0 + y as f32 * 1.5, z as f32 * 1.5);
                registry
                    .register_convex(BodyRole::Prop, p, Quat::IDENTITY, 10.0, &hull)
                    .expect("prop");
            }
        }
    }
    registry.commit().expect("commit");
    registry
}

fn bench_tick(side: i32, layers: i32, iterations: usize) {
    let mut registry = make_registry(side, layers);
    let bodies = registry.body_count();

    let start = Instant::now();
    for _ in 0..iterations {
        registry.step(black_box(1.0 / 60.0)).expect("step");
        let _ = black_box(registry.readback().expect("readback").len());
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!(
        "  step+readback ({bodies} bodies, {iterations} iters): {per_iter:?}/iter, total {elapsed:?}"
    );
}

fn main() {
    println!("=== Reference Simulation Benchmarks ===\n");

    bench_tick(2, 10, 200);
    bench_tick(5, 10, 100);
    // Default scene: 10 x 10 columns, 50 layers.
    bench_tick(5, 50, 20);

    println!("\n=== Done ===");
}
