// src/app/ui/mod.rs — page chrome: header, footer, ads, loading/error bodies
pub mod details;
pub mod showtimes;

use eframe::egui as eg;

use crate::app::types::{PageData, Showtime};

pub(crate) const BRAND_BLUE: eg::Color32 = eg::Color32::from_rgb(13, 83, 246);
pub(crate) const TEXT_GRAY: eg::Color32 = eg::Color32::from_rgb(102, 102, 102);
const CONTENT_MAX_W: f32 = 860.0;
const AD_SLOTS: usize = 3;

impl crate::app::ShowtimeApp {
    pub(crate) fn ui_render_header(&self, ctx: &eg::Context) {
        eg::TopBottomPanel::top("header")
            .exact_height(56.0)
            .show(ctx, |ui| {
                ui.horizontal_centered(|ui| {
                    ui.label(
                        eg::RichText::new(&self.config.site_title)
                            .size(24.0)
                            .strong()
                            .color(BRAND_BLUE),
                    );
                    if matches!(self.page.state(), crate::app::types::PageState::Ready(_)) {
                        ui.with_layout(eg::Layout::right_to_left(eg::Align::Center), |ui| {
                            ui.label(eg::RichText::new("MOVIES").strong());
                        });
                    }
                });
            });
    }

    /// Loading spinner when `message` is `None`, otherwise a plain notice.
    pub(crate) fn ui_render_message(&self, ctx: &eg::Context, message: Option<&str>) {
        eg::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(48.0);
                match message {
                    None => {
                        ui.add(eg::Spinner::new().size(18.0));
                        ui.label("Loading...");
                    }
                    Some(msg) => {
                        ui.label(eg::RichText::new(msg).size(16.0));
                    }
                }
            });
        });
    }

    pub(crate) fn ui_render_footer(&self, ctx: &eg::Context, variation: &str) {
        eg::TopBottomPanel::bottom("footer").show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(6.0);
                ui.label(eg::RichText::new("© 2025 Demo Project").color(TEXT_GRAY));
                ui.label(
                    eg::RichText::new(
                        "This is a demo project for testing showtime sorting variations",
                    )
                    .color(TEXT_GRAY),
                );
                if !variation.is_empty() {
                    ui.label(
                        eg::RichText::new(format!("Showtime ordering: {variation}"))
                            .small()
                            .weak(),
                    );
                }
                ui.add_space(6.0);
            });
        });
    }

    pub(crate) fn ui_render_sidebar(&self, ctx: &eg::Context) {
        let screen_w = ctx.input(|i| i.screen_rect().width());
        if screen_w < 1024.0 {
            return;
        }
        eg::SidePanel::right("ads")
            .resizable(false)
            .exact_width(300.0)
            .show(ctx, |ui| {
                ui.add_space(12.0);
                for _ in 0..AD_SLOTS {
                    let (rect, _resp) =
                        ui.allocate_exact_size(eg::vec2(ui.available_width(), 250.0), eg::Sense::hover());
                    ui.painter()
                        .rect_filled(rect, 12.0, eg::Color32::from_gray(245));
                    ui.painter().rect_stroke(
                        rect,
                        12.0,
                        eg::Stroke::new(1.0, eg::Color32::from_gray(210)),
                    );
                    ui.painter().text(
                        rect.center(),
                        eg::Align2::CENTER_CENTER,
                        "Advertisement",
                        eg::FontId::proportional(14.0),
                        TEXT_GRAY,
                    );
                    ui.add_space(24.0);
                }
            });
    }

    /// Main column. Returns the showtime the user clicked this frame, if any.
    pub(crate) fn ui_render_page(&self, ctx: &eg::Context, data: &PageData) -> Option<Showtime> {
        let mut clicked = None;
        eg::CentralPanel::default().show(ctx, |ui| {
            eg::ScrollArea::vertical()
                .auto_shrink([false; 2])
                .show(ui, |ui| {
                    ui.set_max_width(CONTENT_MAX_W);
                    ui.add_space(12.0);
                    self.ui_render_movie_details(ui, &data.movie);
                    ui.add_space(24.0);
                    ui.separator();
                    ui.add_space(16.0);
                    clicked = showtimes::render_showtimes(ui, &data.theater, &data.showtimes);
                });
        });
        clicked
    }

    /// Returns true when the user dismissed the confirmation.
    pub(crate) fn ui_render_confirmation(&self, ctx: &eg::Context) -> bool {
        let Some(msg) = self.page.confirmation() else {
            return false;
        };
        let mut dismissed = false;
        eg::Window::new("Showtime selected")
            .collapsible(false)
            .resizable(false)
            .anchor(eg::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(msg);
                ui.add_space(8.0);
                if ui.button("OK").clicked() {
                    dismissed = true;
                }
            });
        dismissed
    }
}
