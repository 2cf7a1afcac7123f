// src/app/ui/details.rs
use eframe::egui as eg;

use super::{BRAND_BLUE, TEXT_GRAY};
use crate::app::types::{Movie, PosterState};

const POSTER_W: f32 = 230.0;
const POSTER_H: f32 = 345.0;

impl crate::app::ShowtimeApp {
    pub(crate) fn ui_render_movie_details(&self, ui: &mut eg::Ui, movie: &Movie) {
        ui.horizontal_top(|ui| {
            self.ui_render_poster(ui, &movie.title);
            ui.add_space(32.0);
            ui.vertical(|ui| {
                ui.label(eg::RichText::new(&movie.title).size(32.0).strong());
                ui.add_space(8.0);
                ui.label(
                    eg::RichText::new(crate::app::utils::movie_meta_line(movie))
                        .size(15.0)
                        .color(TEXT_GRAY),
                );
                ui.add_space(16.0);
                ui.add(
                    eg::Label::new(
                        eg::RichText::new(&movie.description)
                            .size(16.0)
                            .color(TEXT_GRAY),
                    )
                    .wrap(),
                );
            });
        });
    }

    fn ui_render_poster(&self, ui: &mut eg::Ui, title: &str) {
        let size = eg::vec2(POSTER_W, POSTER_H);
        if let Some(tex) = self.poster.slot().and_then(|s| s.tex.as_ref()) {
            ui.add(eg::Image::new((tex.id(), size)).rounding(12.0))
                .on_hover_text(title);
            return;
        }

        // Placeholder while the texture is not ready
        let (rect, _resp) = ui.allocate_exact_size(size, eg::Sense::hover());
        ui.painter().rect_filled(rect, 12.0, BRAND_BLUE);
        let caption = match self.poster.slot().map(|s| s.state) {
            Some(PosterState::Failed) => title,
            _ => "Poster loading…",
        };
        ui.painter().text(
            rect.center(),
            eg::Align2::CENTER_CENTER,
            caption,
            eg::FontId::proportional(14.0),
            eg::Color32::WHITE,
        );
    }
}
