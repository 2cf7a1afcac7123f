// src/app/gfx.rs
use std::path::Path;

use egui::{ColorImage, Context, TextureHandle, TextureOptions};

/// Upload an RGBA image to a GPU texture. (UI thread only)
pub fn upload_rgba(ctx: &Context, w: u32, h: u32, bytes: &[u8], name: &str) -> TextureHandle {
    let img = ColorImage::from_rgba_unmultiplied([w as usize, h as usize], bytes);
    ctx.load_texture(name.to_string(), img, TextureOptions::LINEAR)
}

/// Load a texture from a cached poster; rejects images far from portrait.
/// (UI thread only)
pub fn load_texture_from_path(
    ctx: &Context,
    path: &Path,
    cache_name: &str,
) -> Result<TextureHandle, String> {
    let (w, h, bytes) = crate::app::cache::load_rgba(path)?;
    if !is_poster_aspect(w, h) {
        return Err(format!("non-poster aspect {w}x{h}"));
    }
    Ok(upload_rgba(ctx, w, h, &bytes, cache_name))
}

/// Portrait sanity check around 2:3.
pub fn is_poster_aspect(w: u32, h: u32) -> bool {
    if w == 0 || h == 0 {
        return false;
    }
    let ar = w as f32 / h as f32;
    (0.55..=0.80).contains(&ar)
}
