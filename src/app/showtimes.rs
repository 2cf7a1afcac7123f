// src/app/showtimes.rs — grouping and per-format presentation labels
use crate::app::types::Showtime;

pub const FORMAT_IMAX_3D: &str = "IMAX 3D";
pub const FORMAT_IMAX: &str = "IMAX";
pub const FORMAT_DIGITAL_3D: &str = "Digital 3D";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormatGroup {
    /// The `format` field, verbatim.
    pub format: String,
    pub showtimes: Vec<Showtime>,
}

/// Partition `showtimes` by format. Groups appear in first-seen order and keep
/// the input order inside each group.
pub fn group_by_format(showtimes: &[Showtime]) -> Vec<FormatGroup> {
    let mut groups: Vec<FormatGroup> = Vec::new();
    for st in showtimes {
        match groups.iter_mut().find(|g| g.format == st.format) {
            Some(group) => group.showtimes.push(st.clone()),
            None => groups.push(FormatGroup {
                format: st.format.clone(),
                showtimes: vec![st.clone()],
            }),
        }
    }
    groups
}

pub fn format_badge_class(format: &str) -> &'static str {
    match format {
        FORMAT_IMAX_3D => "format-badge imax-3d",
        FORMAT_IMAX => "format-badge imax",
        FORMAT_DIGITAL_3D => "format-badge digital-3d",
        _ => "format-badge",
    }
}

pub fn format_icon(format: &str) -> &'static str {
    match format {
        FORMAT_IMAX_3D => "🎬 IMAX 3D",
        FORMAT_IMAX => "🎥 IMAX",
        FORMAT_DIGITAL_3D => "3D Digital",
        _ => "Standard",
    }
}

pub fn format_description(format: &str) -> &'static str {
    match format {
        FORMAT_IMAX_3D => "Premium large-format 3D experience",
        FORMAT_IMAX => "Premium large-format experience",
        FORMAT_DIGITAL_3D => "Digital 3D presentation",
        _ => "Standard digital presentation",
    }
}
