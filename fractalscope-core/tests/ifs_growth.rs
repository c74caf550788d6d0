use fractalscope_core::ifs::UNVISITED;
use fractalscope_core::{
    barnsley_fern_chaos, sierpinski_carpet, sierpinski_triangle, AffineConfig, IfsGrid,
    InitialSet, Viewport,
};

fn seeded(config: &AffineConfig) -> IfsGrid {
    let mut grid = IfsGrid::new(config.size, config.viewport);
    grid.seed_points(&config.initial_set.points);
    grid
}

#[test]
fn sierpinski_from_origin_is_bounded_by_three_to_the_step() {
    let config = sierpinski_triangle((256, 256));
    let mut grid = seeded(&config);
    assert_eq!(grid.visited_count(), 1);

    // The first map fixes the origin, so every shorter path is also a path
    // of exactly `step` maps.
    let mut previous = grid.visited_count();
    for step in 1..=8u32 {
        grid.step(&config.transforms, config.samples_per_point, 0);
        let visited = grid.visited_count();
        assert!(visited >= previous, "step {step}: {visited} < {previous}");
        assert!(
            visited <= 3usize.pow(step),
            "step {step}: {visited} cells visited"
        );
        previous = visited;
    }
    assert!(previous > 1);
}

#[test]
fn carpet_cells_never_change_after_claim() {
    let config = sierpinski_carpet((81, 81));
    let mut grid = seeded(&config);
    let mut snapshot = grid.cells().to_vec();
    for _ in 0..5 {
        grid.step(&config.transforms, 1, 0);
        for (before, after) in snapshot.iter().zip(grid.cells()) {
            if *before != UNVISITED {
                assert_eq!(before, after);
            }
        }
        snapshot = grid.cells().to_vec();
    }
}

#[test]
fn chaos_fern_keeps_seeded_cells_and_counts_steps() {
    let config = barnsley_fern_chaos((128, 128));
    let mut grid = IfsGrid::new(config.size, config.viewport);
    grid.seed_density(|_, _| 0.02, 42);
    let seeded = grid.visited_count();
    assert!(seeded > 0);

    for call in 0..20 {
        grid.step(&config.transforms, config.samples_per_point, call);
    }
    assert!(grid.visited_count() >= seeded);
    assert_eq!(grid.counter(), 21);
}

#[test]
fn seed_outside_viewport_clamps_to_edge() {
    let config = sierpinski_triangle((16, 16))
        .with_initial_set(InitialSet::points(vec![(50.0, -50.0)]));
    let grid = seeded(&config);
    assert_eq!(grid.value_at(15, 0), 1);
    assert_eq!(grid.visited_count(), 1);
}

#[test]
fn unit_viewport_default_round_trips() {
    let vp = Viewport::default();
    assert_eq!(vp.to_array(), [0.0, 1.0, 0.0, 1.0]);
}
