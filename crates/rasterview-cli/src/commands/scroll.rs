use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use rasterview_core::scroll::{ScrollAxis, ScrollController};

use super::{fitted_viewport, load_config, open_source, parse_floats};
use crate::summary::print_scroll_summary;

#[derive(Args)]
pub struct ScrollArgs {
    /// Input image file
    pub file: PathBuf,

    /// Viewer config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// View width in pixels (default from config)
    #[arg(long)]
    pub width: Option<f64>,

    /// View height in pixels (default from config)
    #[arg(long)]
    pub height: Option<f64>,

    /// Absolute zoom factor (view pixels per model unit)
    #[arg(long)]
    pub zoom: Option<f64>,

    /// Move the content by a view-space delta, e.g. -200,50
    #[arg(long, allow_hyphen_values = true)]
    pub pan: Option<String>,

    /// Move the horizontal scrollbar to this value
    #[arg(long)]
    pub horizontal: Option<i32>,

    /// Move the vertical scrollbar to this value
    #[arg(long)]
    pub vertical: Option<i32>,
}

pub fn run(args: &ScrollArgs) -> Result<()> {
    let config = load_config(args.config.as_ref())?;
    let source = open_source(&args.file, &config.pyramid)?;
    let model_bounds = source.model().model_bounds();

    let mut viewport = fitted_viewport(
        args.width.unwrap_or(config.view.width),
        args.height.unwrap_or(config.view.height),
        &source,
    );
    if let Some(zoom) = args.zoom {
        viewport.set_zoom_factor(zoom);
    }
    if let Some(ref pan) = args.pan {
        let [dx, dy] = parse_floats::<2>(pan)?;
        viewport.move_view_delta(dx, dy);
    }

    let mut controller = ScrollController::new(&config.scroll);
    controller.attach(&mut viewport);
    controller.update(&mut viewport, model_bounds);
    print_scroll_summary("Scrollbars", &controller, &viewport);

    if args.horizontal.is_none() && args.vertical.is_none() {
        return Ok(());
    }
    if let Some(value) = args.horizontal {
        controller.scrollbar_moved(ScrollAxis::Horizontal, value);
    }
    if let Some(value) = args.vertical {
        controller.scrollbar_moved(ScrollAxis::Vertical, value);
    }
    let update = controller.update(&mut viewport, model_bounds);
    if !update.viewport_moved {
        println!("Scrollbar input had no effect (hidden scrollbar or unchanged value)");
    }
    print_scroll_summary("After scrollbar move", &controller, &viewport);

    Ok(())
}
