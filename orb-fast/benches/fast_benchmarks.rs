use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use orb_core::{Image, OrbConfig};
use orb_fast::{CornerDetector, FastDetector, ImagePyramid, KeypointRefinement};

/// Create benchmark image with realistic corner patterns
fn create_benchmark_image(width: usize, height: usize, complexity: &str) -> Image {
    let mut img = vec![128; width * height];

    match complexity {
        "blocks" => {
            // Grid of bright squares with varying intensities
            for (i, cy) in (24..height.saturating_sub(24)).step_by(32).enumerate() {
                for (j, cx) in (24..width.saturating_sub(24)).step_by(32).enumerate() {
                    let intensity = 160 + ((i * 7 + j * 13) % 90) as u8;
                    for y in cy - 8..cy + 8 {
                        for x in cx - 8..cx + 8 {
                            img[y * width + x] = intensity;
                        }
                    }
                }
            }
        }
        "realistic" => {
            // Gradient with noise and checkered blobs
            for y in 0..height {
                for x in 0..width {
                    let gradient = ((x as f32 / width as f32) * 50.0) as u8;
                    let noise = ((x * 31 + y * 17) % 7) as u8;
                    img[y * width + x] = 100 + gradient + noise;
                }
            }
            for i in 0..40 {
                let cx = 20 + (i * 37) % (width - 40);
                let cy = 20 + (i * 53) % (height - 40);
                for dy in -4..=4i32 {
                    for dx in -4..=4i32 {
                        let x = (cx as i32 + dx) as usize;
                        let y = (cy as i32 + dy) as usize;
                        img[y * width + x] = if (dx / 3 + dy / 3) % 2 == 0 { 30 } else { 230 };
                    }
                }
            }
        }
        _ => {}
    }

    img
}

fn create_test_config() -> OrbConfig {
    OrbConfig {
        n_threads: 1,
        ..OrbConfig::default()
    }
}

/// Benchmark full multi-scale detection
fn bench_full_detection(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_detection");

    for &(width, height) in &[(160, 120), (320, 240), (640, 480)] {
        for complexity in ["blocks", "realistic"] {
            let detector = FastDetector::new(create_test_config(), width, height).unwrap();
            let img = create_benchmark_image(width, height, complexity);

            group.bench_with_input(
                BenchmarkId::new(format!("{}x{}", width, height), complexity),
                &(detector, img),
                |b, (detector, img)| b.iter(|| black_box(detector.detect_keypoints(black_box(img)).unwrap())),
            );
        }
    }

    group.finish();
}

/// Benchmark individual pipeline stages on the base level
fn bench_pipeline_stages(c: &mut Criterion) {
    let (width, height) = (320, 240);
    let detector = FastDetector::new(create_test_config(), width, height).unwrap();
    let img = create_benchmark_image(width, height, "realistic");
    let base = detector.scale_levels()[0];

    let mut group = c.benchmark_group("pipeline_stages");

    group.bench_function("detect_keypoints_with_response", |b| {
        b.iter(|| black_box(detector.detect_keypoints_with_response(black_box(&img), &base)))
    });

    let candidates = detector.detect_keypoints_with_response(&img, &base);
    group.bench_function("non_maximum_suppression", |b| {
        b.iter(|| black_box(KeypointRefinement::non_maximum_suppression(black_box(&candidates), 3.0, 500)))
    });

    group.bench_function("harris_100_points", |b| {
        b.iter(|| {
            for i in 0..100 {
                let (x, y) = (40 + (i % 10) * 20, 40 + (i / 10) * 15);
                black_box(CornerDetector::compute_harris_response(black_box(&img), width, height, x, y));
            }
        })
    });

    let umax = KeypointRefinement::circular_extent(15);
    group.bench_function("orientation_100_points", |b| {
        b.iter(|| {
            for i in 0..100 {
                let (x, y) = (40 + (i % 10) * 20, 40 + (i / 10) * 15);
                black_box(KeypointRefinement::compute_orientation(black_box(&img), width, x, y, &umax));
            }
        })
    });

    group.finish();
}

/// Benchmark pyramid construction
fn bench_multiscale(c: &mut Criterion) {
    let (width, height) = (640, 480);
    let detector = FastDetector::new(create_test_config(), width, height).unwrap();
    let img = create_benchmark_image(width, height, "realistic");

    c.bench_function("build_pyramid", |b| {
        b.iter(|| {
            black_box(ImagePyramid::build_image_pyramid(black_box(&img), width, height, detector.scale_levels()))
        })
    });
}

criterion_group!(benches, bench_full_detection, bench_pipeline_stages, bench_multiscale);
criterion_main!(benches);
