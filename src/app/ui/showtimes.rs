// src/app/ui/showtimes.rs — theater card and per-format showtime buttons
use eframe::egui as eg;

use super::{BRAND_BLUE, TEXT_GRAY};
use crate::app::showtimes::{format_badge_class, format_description, format_icon, group_by_format};
use crate::app::types::{Showtime, Theater};

const BUTTON_SIZE: [f32; 2] = [130.0, 52.0];

fn badge_color(badge_class: &str) -> eg::Color32 {
    match badge_class {
        "format-badge imax-3d" => eg::Color32::from_rgb(120, 40, 200),
        "format-badge imax" => eg::Color32::from_rgb(0, 102, 204),
        "format-badge digital-3d" => eg::Color32::from_rgb(0, 140, 120),
        _ => eg::Color32::from_gray(110),
    }
}

/// Returns the showtime clicked this frame, if any.
pub(crate) fn render_showtimes(
    ui: &mut eg::Ui,
    theater: &Theater,
    showtimes: &[Showtime],
) -> Option<Showtime> {
    let mut clicked = None;

    eg::Frame::group(ui.style())
        .rounding(12.0)
        .inner_margin(eg::Margin::same(20.0))
        .fill(eg::Color32::from_gray(248))
        .show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.label(eg::RichText::new(&theater.name).size(24.0).strong());
            ui.label(eg::RichText::new(&theater.address).size(14.0).color(TEXT_GRAY));
        });
    ui.add_space(24.0);

    if showtimes.is_empty() {
        ui.label(eg::RichText::new("No showtimes available.").color(TEXT_GRAY));
    }

    for (group_idx, group) in group_by_format(showtimes).iter().enumerate() {
        ui.push_id(("format_group", group_idx), |ui| {
            ui.horizontal(|ui| {
                ui.label(eg::RichText::new(&group.format).size(18.0).strong());
                ui.add_space(8.0);
                ui.label(
                    eg::RichText::new(format!(" {} ", format_icon(&group.format)))
                        .small()
                        .color(eg::Color32::WHITE)
                        .background_color(badge_color(format_badge_class(&group.format))),
                );
            });
            ui.label(
                eg::RichText::new(format_description(&group.format))
                    .size(14.0)
                    .color(TEXT_GRAY),
            );
            ui.separator();
            ui.add_space(8.0);

            ui.horizontal_wrapped(|ui| {
                ui.spacing_mut().item_spacing = eg::vec2(16.0, 16.0);
                for (idx, showtime) in group.showtimes.iter().enumerate() {
                    let text = eg::RichText::new(format!("{}\n{}", showtime.time, showtime.price))
                        .size(16.0)
                        .color(BRAND_BLUE);
                    let resp = ui
                        .push_id(idx, |ui| {
                            ui.add_sized(
                                BUTTON_SIZE,
                                eg::Button::new(text)
                                    .stroke(eg::Stroke::new(1.0, BRAND_BLUE))
                                    .fill(eg::Color32::WHITE),
                            )
                        })
                        .inner;
                    if resp.clicked() {
                        clicked = Some(showtime.clone());
                    }
                }
            });
            ui.add_space(32.0);
        });
    }

    ui.separator();
    ui.label(eg::RichText::new("Showtimes and Tickets").strong());
    ui.label(
        eg::RichText::new(
            "* All showtimes are in local time. Pricing varies by location and format.",
        )
        .color(TEXT_GRAY),
    );
    ui.label(
        eg::RichText::new(
            "🎬 Premium format experiences available with enhanced picture and sound quality.",
        )
        .color(TEXT_GRAY),
    );
    ui.label(
        eg::RichText::new("Select a showtime to proceed to seat selection and checkout.")
            .small()
            .weak(),
    );

    clicked
}

#[cfg(test)]
mod tests {
    use super::badge_color;
    use crate::app::showtimes::format_badge_class;

    #[test]
    fn unknown_formats_share_the_neutral_badge() {
        assert_eq!(
            badge_color(format_badge_class("4DX")),
            badge_color(format_badge_class("Standard"))
        );
        assert_ne!(
            badge_color(format_badge_class("IMAX")),
            badge_color(format_badge_class("4DX"))
        );
    }
}
