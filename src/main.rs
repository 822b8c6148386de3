//! Runs synthetic k-space slices through the configured transform and reports
//! the produced tensor layout. Useful for checking a config before training.

use fastmri_transforms::data::augment::equispaced_mask;
use fastmri_transforms::data::{Attrs, SampleTransform, SliceSample};
use fastmri_transforms::TransformConfig;

use clap::Parser;
use ndarray::{ArrayD, IxDyn, Zip};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use num_complex::Complex32;
use std::time::Instant;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "Dry-run of k-space slice transforms", long_about = None)]
struct Args {
    /// JSON transform config; defaults to training mode without augmentation
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    /// K-space shape as coils,height,width
    #[arg(short, long, value_delimiter = ',', default_values_t = vec![4, 64, 64])]
    shape: Vec<usize>,

    /// Undersampling factor of the synthetic mask
    #[arg(short, long, default_value_t = 4)]
    acceleration: usize,

    /// Number of epochs to step the augmentation schedule through
    #[arg(short, long, default_value_t = 1)]
    epochs: usize,

    /// Slices per epoch
    #[arg(long, default_value_t = 8)]
    slices: usize,
}

fn synthetic_slice(shape: &[usize], acceleration: usize, slice: usize) -> SliceSample {
    let dim = IxDyn(shape);
    let re = ArrayD::<f32>::random(dim.clone(), Uniform::new(-1.0, 1.0));
    let im = ArrayD::<f32>::random(dim, Uniform::new(-1.0, 1.0));
    let kspace = Zip::from(&re)
        .and(&im)
        .map_collect(|&r, &i| Complex32::new(r, i));

    let width = shape.last().copied().unwrap_or(1);
    let height = if shape.len() >= 2 { shape[shape.len() - 2] } else { 1 };
    let mask = equispaced_mask(width, acceleration, 0.08, 0);

    let target = ArrayD::<f32>::random(IxDyn(&[height, width]), Uniform::new(0.0, 1.0));
    let maximum = target.iter().cloned().fold(0.0_f32, f32::max);
    let attrs = Attrs::new()
        .with("max", maximum as f64)
        .with("acquisition", "SYNTHETIC");

    SliceSample::new(mask, kspace, Some(target), attrs, "synthetic.h5", slice)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => TransformConfig::from_json_file(path)?,
        None => TransformConfig::default(),
    };
    println!("[Config] forward: {}, max_key: {}", config.is_forward, config.max_key);

    let transform = config.build_augmented_transform()?;
    println!(
        "[Config] augmentation: {}, mask augmentation: {}",
        transform.uses_augment(),
        transform.uses_mask_augment()
    );

    let start_time = Instant::now();
    for epoch in 0..args.epochs {
        transform.set_epoch(epoch);

        for slice in 0..args.slices {
            let mut sample = synthetic_slice(&args.shape, args.acceleration, slice);
            if config.is_forward {
                sample.target = None;
            }

            let out = transform.apply(sample)?;
            if slice == 0 {
                println!(
                    "Epoch: {:<3} kspace {:?}, mask {:?} ({} lines), target {:?}, max {:.4}",
                    epoch,
                    out.kspace.shape(),
                    out.mask.shape(),
                    out.mask.iter().filter(|&&m| m > 0).count(),
                    out.target.as_ref().map(|t| t.shape().to_vec()),
                    out.maximum_or_sentinel()
                );
            }
        }
    }

    let duration = start_time.elapsed();
    println!(
        "\n{} slices transformed in {:.2?}",
        args.epochs * args.slices,
        duration
    );
    Ok(())
}
