use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use kurbo::Rect;
use rasterview_core::io::image_io::save_png;
use rasterview_core::render::{render_viewport, snapshot, RasterCanvas};

use super::{fitted_viewport, load_config, open_source, parse_floats};
use crate::summary::print_view_summary;

#[derive(Args)]
pub struct RenderArgs {
    /// Input image file
    pub file: PathBuf,

    /// Viewer config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Output width in pixels (default from config)
    #[arg(long)]
    pub width: Option<f64>,

    /// Output height in pixels (default from config)
    #[arg(long)]
    pub height: Option<f64>,

    /// Absolute zoom factor (view pixels per model unit)
    #[arg(long)]
    pub zoom: Option<f64>,

    /// Mouse wheel notches to zoom by, negative zooms out
    #[arg(long, allow_hyphen_values = true)]
    pub wheel: Option<i32>,

    /// Model point to center on, e.g. 512,384
    #[arg(long)]
    pub center: Option<String>,

    /// View rotation in degrees
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    pub rotate: f64,

    /// Render this model rectangle (x0,y0,x1,y1) instead of a fitted view
    #[arg(long, conflicts_with_all = ["zoom", "wheel", "center"])]
    pub rect: Option<String>,

    /// Output file path
    #[arg(short, long, default_value = "view.png")]
    pub output: PathBuf,
}

pub fn run(args: &RenderArgs) -> Result<()> {
    let config = load_config(args.config.as_ref())?;
    let source = open_source(&args.file, &config.pyramid)?;

    let width = args.width.unwrap_or(config.view.width);
    let height = args.height.unwrap_or(config.view.height);
    if !(width >= 1.0 && height >= 1.0) {
        bail!("Output size must be at least 1x1, got {width}x{height}");
    }
    let (w, h) = (width.round() as usize, height.round() as usize);

    let raster = if let Some(ref rect) = args.rect {
        let [x0, y0, x1, y1] = parse_floats::<4>(rect)?;
        println!("Rendering model rectangle ({x0}, {y0}) .. ({x1}, {y1})");
        snapshot(
            &source,
            Rect::new(x0, y0, x1, y1),
            w,
            h,
            args.rotate.to_radians(),
        )?
    } else {
        let mut canvas = RasterCanvas::new(w, h);
        let mut viewport = fitted_viewport(w as f64, h as f64, &source);
        if let Some(zoom) = args.zoom {
            viewport.set_zoom_factor(zoom);
        }
        if let Some(notches) = args.wheel {
            viewport.wheel_zoom(notches, config.zoom.wheel_step);
        }
        if args.rotate != 0.0 {
            viewport.set_orientation(args.rotate.to_radians());
        }
        if let Some(ref center) = args.center {
            let [x, y] = parse_floats::<2>(center)?;
            let current = viewport.model_center();
            viewport.move_by(x - current.x, y - current.y);
        }

        let level = render_viewport(&viewport, &source, &mut canvas)?;
        print_view_summary(&args.file, &viewport, &source.model(), level);
        canvas.into_raster()
    };

    save_png(&raster, &args.output)
        .with_context(|| format!("Failed to save {}", args.output.display()))?;
    println!("Output saved to {}", args.output.display());

    Ok(())
}
