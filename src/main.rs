use std::path::PathBuf;

use anyhow::{bail, Context as _, Result};

mod basis;
mod fragment;
mod grid;
mod pipeline;
mod pixel_match;
mod preprocess;
mod swap_resolve;

use crate::basis::{SwapStep, ThresholdPolicy};
use crate::pipeline::Event;

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let (target, fragment_dir) = match (args.next(), args.next()) {
        (Some(target), Some(dir)) => (PathBuf::from(target), PathBuf::from(dir)),
        _ => bail!("usage: piece_resolve <target-image> <fragment-dir> [threshold]"),
    };
    let policy = match args.next() {
        Some(raw) => ThresholdPolicy::Fixed(
            raw.parse()
                .with_context(|| format!("invalid threshold {:?}", raw))?,
        ),
        None => ThresholdPolicy::default(),
    };

    let job = pipeline::spawn(target, fragment_dir, policy);

    let mut finished = None;
    for event in &job.events {
        match event {
            Event::Progress(percent) => println!("matching... {}%", percent),
            Event::Finished(result) => {
                finished = Some(result);
                break;
            }
        }
    }
    job.join();

    let solution = match finished {
        Some(result) => result?,
        None => bail!("solver thread exited without a result"),
    };

    println!("recovered order: {:?}", solution.order);
    println!("accepted threshold: {:.2}", solution.threshold);
    println!(
        "piece size: {}x{}",
        solution.piece_size.0, solution.piece_size.1
    );
    for (path, id) in solution.fragment_paths.iter().zip(1..) {
        println!("fragment {}: {}", id, path.display());
    }

    for (i, &SwapStep(a, b)) in solution.swaps.iter().enumerate() {
        println!("step {}: swap position {} and {}", i + 1, a + 1, b + 1);
    }
    println!("total swaps: {}", solution.swaps.len());
    println!("sorted: {:?}", solution.sorted);

    Ok(())
}
