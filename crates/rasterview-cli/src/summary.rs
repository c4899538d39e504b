use std::path::Path;

use console::Style;
use rasterview_core::pyramid::PyramidModel;
use rasterview_core::scroll::{ScrollBarState, ScrollController};
use rasterview_core::viewport::Viewport;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    disabled: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
        }
    }
}

fn print_title(s: &Styles, title: &str) {
    println!();
    println!("  {}", s.title.apply_to(title));
    println!(
        "  {}",
        s.title
            .apply_to("\u{2550}".repeat(title.chars().count()))
    );
    println!();
}

pub fn print_view_summary(file: &Path, viewport: &Viewport, model: &PyramidModel, level: usize) {
    let s = Styles::new();
    print_title(&s, "Rasterview Render");

    println!(
        "  {:<14}{}",
        s.label.apply_to("Input"),
        s.path.apply_to(file.display())
    );
    let bounds = viewport.view_bounds();
    println!(
        "  {:<14}{}",
        s.label.apply_to("View"),
        s.value
            .apply_to(format!("{}x{}", bounds.width(), bounds.height()))
    );
    println!();

    println!("  {}", s.header.apply_to("Viewport"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Zoom"),
        s.value.apply_to(format!("{:.4}", viewport.zoom_factor()))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Rotation"),
        s.value
            .apply_to(format!("{:.1}\u{b0}", viewport.orientation().to_degrees()))
    );
    let center = viewport.model_center();
    println!(
        "    {:<12}{}",
        s.label.apply_to("Center"),
        s.value.apply_to(format!("({:.1}, {:.1})", center.x, center.y))
    );
    println!();

    println!("  {}", s.header.apply_to("Pyramid"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Level"),
        s.value
            .apply_to(format!("{level} of {}", model.level_count()))
    );
    match viewport.visible_image_bounds(model) {
        Some(r) => println!(
            "    {:<12}{}",
            s.label.apply_to("Visible"),
            s.value.apply_to(format!(
                "({:.0}, {:.0}) .. ({:.0}, {:.0})",
                r.x0, r.y0, r.x1, r.y1
            ))
        ),
        None => println!(
            "    {:<12}{}",
            s.label.apply_to("Visible"),
            s.disabled.apply_to("nothing in view")
        ),
    }
    println!();
}

pub fn print_scroll_summary(title: &str, controller: &ScrollController, viewport: &Viewport) {
    let s = Styles::new();
    print_title(&s, title);

    let offset = viewport.model_offset();
    println!(
        "  {:<14}{}",
        s.label.apply_to("Offset"),
        s.value.apply_to(format!("({:.2}, {:.2})", offset.x, offset.y))
    );
    let sa = controller.scroll_area();
    println!(
        "  {:<14}{}",
        s.label.apply_to("Scroll area"),
        s.value.apply_to(format!(
            "({:.1}, {:.1}) .. ({:.1}, {:.1})",
            sa.x0, sa.y0, sa.x1, sa.y1
        ))
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Increments"),
        s.value.apply_to(format!(
            "unit {}, block {}",
            controller.unit_increment(),
            controller.block_increment()
        ))
    );
    println!();

    print_bar(&s, "Horizontal", controller.horizontal());
    print_bar(&s, "Vertical", controller.vertical());
}

fn print_bar(s: &Styles, name: &str, bar: ScrollBarState) {
    if !bar.visible {
        println!(
            "  {:<14}{}",
            s.header.apply_to(name),
            s.disabled.apply_to("hidden")
        );
        println!();
        return;
    }
    println!("  {}", s.header.apply_to(name));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Value"),
        s.value.apply_to(bar.value)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Extent"),
        s.value.apply_to(bar.extent)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Range"),
        s.value.apply_to(format!("{} .. {}", bar.min, bar.max))
    );
    println!();
}
