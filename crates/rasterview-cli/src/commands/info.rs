use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use rasterview_core::pyramid::LevelState;
use rayon::prelude::*;

use super::{load_config, open_source};

#[derive(Args)]
pub struct InfoArgs {
    /// Input image file
    pub file: PathBuf,

    /// Viewer config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Number of pyramid levels (default: until the coarsest fits one tile)
    #[arg(long)]
    pub levels: Option<usize>,

    /// Derive every level and report value ranges
    #[arg(long)]
    pub build: bool,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let mut config = load_config(args.config.as_ref())?;
    if args.levels.is_some() {
        config.pyramid.levels = args.levels;
    }
    let source = open_source(&args.file, &config.pyramid)?;
    let model = source.model();

    println!("File:        {}", args.file.display());
    println!("Dimensions:  {}x{}", model.width(), model.height());
    println!("Levels:      {}", model.level_count());
    println!("Derivation:  {}", config.pyramid.derivation);
    let bounds = model.model_bounds();
    println!(
        "Model:       ({:.1}, {:.1}) .. ({:.1}, {:.1})",
        bounds.x0, bounds.y0, bounds.x1, bounds.y1
    );

    if args.build {
        let pb = ProgressBar::new(model.level_count() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{msg:20} [{bar:40}] {pos}/{len}")?
                .progress_chars("=> "),
        );
        pb.set_message("Deriving levels");
        (0..model.level_count())
            .into_par_iter()
            .try_for_each(|level| -> Result<()> {
                source.level_image(level)?;
                pb.inc(1);
                Ok(())
            })?;
        pb.finish_with_message("Done");
    }

    println!();
    println!("  Level  Scale      Size          State     Range");
    for level in 0..model.level_count() {
        let (w, h) = model.level_size(level)?;
        let state = source.level_state(level)?;
        let range = match source.cached_level_image(level).and_then(|r| r.value_range()) {
            Some((lo, hi)) => format!("{lo:.4} .. {hi:.4}"),
            None if state == LevelState::Ready => "no data".to_string(),
            None => "-".to_string(),
        };
        println!(
            "  {:<6} {:<10} {:<13} {:<9} {}",
            level,
            format!("{}x", model.scale(level)?),
            format!("{w}x{h}"),
            format!("{state:?}"),
            range
        );
    }

    Ok(())
}
