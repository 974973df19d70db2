use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use image::{imageops, DynamicImage, GrayImage};
use rand::prelude::*;

use super::{accumulate, build_match_set, match_all, zncc};
use crate::{
    basis::{Center, MatchCandidate, SolveError, ThresholdPolicy},
    fragment::Fragment,
    grid::Grid,
    preprocess,
};

fn noise_tile(rng: &mut StdRng, width: u32, height: u32) -> GrayImage {
    let mut img = GrayImage::new(width, height);
    for p in img.pixels_mut() {
        p.0[0] = rng.gen();
    }
    img
}

fn mosaic(tiles: &[GrayImage], arrangement: &[u32], tile_w: u32, tile_h: u32) -> GrayImage {
    let mut img = GrayImage::new(tile_w * 4, tile_h * 3);
    for (cell, &id) in arrangement.iter().enumerate() {
        let tile = &tiles[(id - 1) as usize];
        let ox = (cell as u32 % 4) * tile_w;
        let oy = (cell as u32 / 4) * tile_h;
        for y in 0..tile_h {
            for x in 0..tile_w {
                img.put_pixel(ox + x, oy + y, *tile.get_pixel(x, y));
            }
        }
    }
    img
}

fn candidate(id: u32, x: u32, y: u32, score: f32) -> MatchCandidate {
    MatchCandidate {
        id,
        center: Center { x, y },
        score,
    }
}

#[test]
fn zncc_is_maximal_on_an_exact_subimage() {
    let mut rng = StdRng::seed_from_u64(1);
    let image = noise_tile(&mut rng, 48, 36);
    let template = imageops::crop_imm(&image, 16, 12, 16, 12).to_image();

    let (score, location) = zncc::best_match(&image, &template);
    assert!(score > 0.999, "score: {}", score);
    assert_eq!(location, (16, 12));
}

#[test]
fn zncc_is_brightness_invariant() {
    let mut rng = StdRng::seed_from_u64(2);
    let image = noise_tile(&mut rng, 32, 32);
    // darkened copy of a subregion still correlates perfectly
    let mut template = imageops::crop_imm(&image, 8, 8, 12, 12).to_image();
    for p in template.pixels_mut() {
        p.0[0] /= 2;
    }

    let (score, location) = zncc::best_match(&image, &template);
    assert!(score > 0.999, "score: {}", score);
    assert_eq!(location, (8, 8));
}

#[test]
fn scrambled_mosaic_is_recovered() {
    let mut rng = StdRng::seed_from_u64(0);
    let tiles: Vec<GrayImage> = (0..12).map(|_| noise_tile(&mut rng, 16, 16)).collect();
    let arrangement: Vec<u32> = vec![5, 3, 12, 1, 8, 10, 2, 6, 11, 4, 9, 7];

    let target_image = DynamicImage::ImageLuma8(mosaic(&tiles, &arrangement, 16, 16));
    let fragments: Vec<Fragment> = tiles
        .iter()
        .zip(1..)
        .map(|(tile, id)| Fragment {
            id,
            path: PathBuf::new(),
            image: DynamicImage::ImageLuma8(tile.clone()),
        })
        .collect();

    let target = preprocess::normalize(&target_image);
    let cancelled = AtomicBool::new(false);
    let matched = AtomicUsize::new(0);
    let candidates = match_all(&target, &fragments, &cancelled, || {
        matched.fetch_add(1, Ordering::SeqCst);
    })
    .unwrap();

    assert_eq!(candidates.len(), 12);
    assert_eq!(matched.load(Ordering::SeqCst), 12);
    // merge order is fixed by ascending id
    assert!(candidates.windows(2).all(|w| w[0].id < w[1].id));

    let (_, matches) = build_match_set(&candidates, &ThresholdPolicy::default()).unwrap();
    assert_eq!(matches.len(), 12);

    let order = Grid::assign(64, 48, &matches).order();
    assert_eq!(order, arrangement);
}

#[test]
fn cancelled_run_discards_results() {
    let mut rng = StdRng::seed_from_u64(3);
    let tile = noise_tile(&mut rng, 8, 8);
    let fragments = vec![Fragment {
        id: 1,
        path: PathBuf::new(),
        image: DynamicImage::ImageLuma8(tile),
    }];
    let target = noise_tile(&mut rng, 32, 24);

    let cancelled = AtomicBool::new(true);
    let err = match_all(&target, &fragments, &cancelled, || {}).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SolveError>(),
        Some(SolveError::Cancelled)
    ));
}

#[test]
fn sweep_is_no_worse_than_any_fixed_threshold() {
    let candidates = [
        candidate(1, 10, 10, 0.45),
        candidate(2, 40, 10, 0.62),
        candidate(3, 70, 10, 0.78),
        candidate(4, 100, 10, 0.35),
    ];

    let policy = ThresholdPolicy::default();
    let (_, swept) = build_match_set(&candidates, &policy).unwrap();

    for threshold in policy.thresholds() {
        assert!(swept.len() >= accumulate(&candidates, threshold, false).len());
    }
    // 0.35 is below the whole swept range, the rest clear 0.4
    assert_eq!(swept.len(), 3);
}

#[test]
fn threshold_ties_go_to_the_lowest() {
    let candidates = [candidate(1, 10, 10, 0.9), candidate(2, 40, 10, 0.9)];
    let (threshold, set) = build_match_set(&candidates, &ThresholdPolicy::default()).unwrap();
    assert!((threshold - 0.4).abs() < 1e-6);
    assert_eq!(set.len(), 2);
}

#[test]
fn center_collision_keeps_the_later_id() {
    let candidates = [candidate(3, 10, 10, 0.9), candidate(7, 10, 10, 0.9)];
    let set = accumulate(&candidates, 0.5, false);
    assert_eq!(set.len(), 1);
    assert_eq!(set[&Center { x: 10, y: 10 }], 7);
}
