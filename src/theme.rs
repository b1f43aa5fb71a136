use crate::session::Role;
use eframe::egui::{self, Color32, CornerRadius, FontId, Frame, Margin, RichText, Stroke, TextStyle};

#[derive(Debug, Clone)]
pub struct Theme {
    pub page: Color32,
    pub card: Color32,
    pub student_bubble: Color32,
    pub tutor_bubble: Color32,
    pub accent: Color32,
    pub warning: Color32,
    pub success: Color32,
    pub text_primary: Color32,
    pub text_muted: Color32,
    pub text_on_accent: Color32,
    pub border_subtle: Color32,
    pub drop_highlight: Color32,
    pub bubble_max_width: f32,
    pub button_height: f32,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            page: Color32::from_rgb(0xF3, 0xF4, 0xF8),
            card: Color32::WHITE,
            student_bubble: Color32::from_rgb(0x4F, 0x46, 0xE5),
            tutor_bubble: Color32::WHITE,
            accent: Color32::from_rgb(0x4F, 0x46, 0xE5),
            warning: Color32::from_rgb(0xF5, 0x9E, 0x0B),
            success: Color32::from_rgb(0x16, 0xA3, 0x4A),
            text_primary: Color32::from_rgb(0x11, 0x18, 0x27),
            text_muted: Color32::from_rgb(0x6B, 0x72, 0x80),
            text_on_accent: Color32::WHITE,
            border_subtle: Color32::from_rgb(0xE5, 0xE7, 0xEB),
            drop_highlight: Color32::from_rgb(0xE0, 0xE7, 0xFF),
            bubble_max_width: 560.0,
            button_height: 44.0,
        }
    }
}

impl Theme {
    pub const RADIUS: u8 = 16;

    pub fn apply_visuals(&self, ctx: &egui::Context) {
        let mut visuals = egui::Visuals::light();
        visuals.panel_fill = self.page;
        visuals.window_fill = self.card;
        visuals.override_text_color = Some(self.text_primary);
        visuals.hyperlink_color = self.accent;
        visuals.selection.bg_fill = self.drop_highlight;
        visuals.widgets.inactive.bg_stroke = Stroke::new(1.0, self.border_subtle);
        visuals.widgets.hovered.bg_stroke = Stroke::new(1.0, self.accent);

        let mut style = (*ctx.style()).clone();
        style.visuals = visuals;
        style.spacing.item_spacing = egui::vec2(10.0, 10.0);
        style.spacing.button_padding = egui::vec2(14.0, 10.0);
        style.text_styles.insert(TextStyle::Heading, FontId::proportional(22.0));
        style.text_styles.insert(TextStyle::Body, FontId::proportional(15.0));
        style.text_styles.insert(TextStyle::Button, FontId::proportional(16.0));
        style.text_styles.insert(TextStyle::Small, FontId::proportional(12.0));
        ctx.set_style(style);
    }

    pub fn card_frame(&self) -> Frame {
        Frame::new()
            .fill(self.card)
            .inner_margin(Margin::same(24))
            .corner_radius(CornerRadius::same(Self::RADIUS))
            .stroke(Stroke::new(1.0, self.border_subtle))
            .shadow(egui::epaint::Shadow {
                offset: [0, 6],
                blur: 20,
                spread: 0,
                color: Color32::from_rgba_premultiplied(0, 0, 0, 24),
            })
    }

    pub fn controls_frame(&self) -> Frame {
        Frame::new()
            .fill(self.card)
            .inner_margin(Margin::same(12))
            .corner_radius(CornerRadius::same(Self::RADIUS))
            .stroke(Stroke::new(1.0, self.border_subtle))
    }

    pub fn drop_zone_frame(&self, hovered: bool) -> Frame {
        let (fill, stroke) = if hovered {
            (self.drop_highlight, Stroke::new(2.0, self.accent))
        } else {
            (self.page, Stroke::new(1.0, self.border_subtle))
        };
        Frame::new()
            .fill(fill)
            .inner_margin(Margin::same(20))
            .corner_radius(CornerRadius::same(12))
            .stroke(stroke)
    }

    /// Student bubbles are filled with the accent colour, tutor bubbles are cards.
    pub fn bubble_frame(&self, role: Role) -> Frame {
        let (fill, stroke) = match role {
            Role::Student => (self.student_bubble, Stroke::NONE),
            Role::Tutor => (self.tutor_bubble, Stroke::new(1.0, self.border_subtle)),
        };
        Frame::new()
            .fill(fill)
            .inner_margin(Margin::symmetric(14, 10))
            .corner_radius(CornerRadius::same(Self::RADIUS))
            .stroke(stroke)
    }

    pub fn bubble_text_color(&self, role: Role) -> Color32 {
        match role {
            Role::Student => self.text_on_accent,
            Role::Tutor => self.text_primary,
        }
    }

    pub fn action_button(&self, label: &str, fill: Color32) -> egui::Button<'static> {
        egui::Button::new(RichText::new(label.to_string()).strong().color(self.text_on_accent))
            .fill(fill)
            .stroke(Stroke::NONE)
            .corner_radius(CornerRadius::same(12))
            .min_size(egui::vec2(0.0, self.button_height))
    }

    pub fn secondary_button(&self, label: &str) -> egui::Button<'static> {
        egui::Button::new(RichText::new(label.to_string()).strong().color(self.text_muted))
            .fill(self.card)
            .stroke(Stroke::new(2.0, self.border_subtle))
            .corner_radius(CornerRadius::same(12))
            .min_size(egui::vec2(0.0, self.button_height))
    }
}
