// src/app/cache.rs — on-disk poster cache keyed by md5(url)
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use image::{GenericImageView, ImageFormat};
use reqwest::blocking::Client;
use tracing::{debug, warn};

pub const POSTER_SUBDIR: &str = "posters";
const POSTER_RETENTION_DAYS: u64 = 14;
const POSTER_RETENTION: Duration = Duration::from_secs(POSTER_RETENTION_DAYS * 24 * 60 * 60);

pub struct PosterCache {
    dir: PathBuf,
    client: Client,
}

impl PosterCache {
    /// Create `<cache_dir>/posters` and drop entries older than the retention window.
    pub fn open(cache_dir: &Path, timeout: Duration) -> Result<Self, String> {
        let dir = cache_dir.join(POSTER_SUBDIR);
        fs::create_dir_all(&dir).map_err(|e| format!("create {}: {e}", dir.display()))?;
        match prune_older_than(&dir, POSTER_RETENTION) {
            Ok(0) => {}
            Ok(n) => debug!("pruned {n} stale posters"),
            Err(e) => warn!("poster cache prune failed: {e}"),
        }
        let client = Client::builder()
            .user_agent(concat!("showtimes/", env!("CARGO_PKG_VERSION"), " poster"))
            .timeout(timeout)
            .default_headers({
                use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
                let mut h = HeaderMap::new();
                h.insert(
                    ACCEPT,
                    HeaderValue::from_static("image/avif,image/webp,image/*;q=0.8,*/*;q=0.5"),
                );
                h
            })
            .build()
            .map_err(|e| format!("http client: {e}"))?;
        Ok(Self { dir, client })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Cached file for `url`, downloading it first if needed.
    pub fn fetch(&self, url: &str) -> Result<PathBuf, String> {
        let key = url_to_cache_key(url);
        if let Some(hit) = find_by_key(&self.dir, &key) {
            return Ok(hit);
        }
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| format!("GET {url}: {e}"))?;
        if !resp.status().is_success() {
            return Err(format!("HTTP {} for {url}", resp.status()));
        }
        let body = resp.bytes().map_err(|e| format!("read body: {e}"))?;
        store_png(&self.dir, &key, &body)
    }
}

pub fn url_to_cache_key(url: &str) -> String {
    format!("{:x}", md5::compute(url.as_bytes()))
}

pub fn find_by_key(dir: &Path, key: &str) -> Option<PathBuf> {
    let p = dir.join(format!("{key}.png"));
    p.exists().then_some(p)
}

/// Decode any supported image and re-encode it as PNG under `<key>.png`.
pub fn store_png(dir: &Path, key: &str, bytes: &[u8]) -> Result<PathBuf, String> {
    let img = image::load_from_memory(bytes).map_err(|e| format!("decode: {e}"))?;
    let mut png_bytes: Vec<u8> = Vec::new();
    img.write_to(&mut Cursor::new(&mut png_bytes), ImageFormat::Png)
        .map_err(|e| format!("encode png: {e}"))?;
    let out = dir.join(format!("{key}.png"));
    // write-then-rename so a half-written file is never picked up as a hit
    let tmp = dir.join(format!("{key}.png.tmp"));
    fs::write(&tmp, &png_bytes).map_err(|e| format!("write {}: {e}", tmp.display()))?;
    fs::rename(&tmp, &out).map_err(|e| format!("rename {}: {e}", out.display()))?;
    Ok(out)
}

/// (width, height, RGBA8 bytes) for a cached poster.
pub fn load_rgba(path: &Path) -> Result<(u32, u32, Vec<u8>), String> {
    let img = image::ImageReader::open(path)
        .map_err(|e| format!("open image {}: {e}", path.display()))?
        .with_guessed_format()
        .map_err(|e| format!("guess format {}: {e}", path.display()))?
        .decode()
        .map_err(|e| format!("decode {}: {e}", path.display()))?;
    let (w, h) = img.dimensions();
    Ok((w, h, img.to_rgba8().into_raw()))
}

fn prune_older_than(dir: &Path, max_age: Duration) -> std::io::Result<usize> {
    let cutoff = SystemTime::now()
        .checked_sub(max_age)
        .unwrap_or(SystemTime::UNIX_EPOCH);
    let mut removed = 0usize;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        let is_png = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("png"));
        if !is_png {
            continue;
        }
        let modified = entry
            .metadata()?
            .modified()
            .unwrap_or(SystemTime::UNIX_EPOCH);
        if modified < cutoff && fs::remove_file(&path).is_ok() {
            removed += 1;
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};

    fn tiny_jpeg() -> Vec<u8> {
        let img = ImageBuffer::from_pixel(4, 6, Rgba([13u8, 83, 246, 255]));
        let mut out = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .to_rgb8()
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Jpeg)
            .unwrap();
        out
    }

    #[test]
    fn cache_key_is_stable_md5_hex() {
        let a = url_to_cache_key("https://placehold.co/460x690");
        assert_eq!(a, url_to_cache_key("https://placehold.co/460x690"));
        assert_eq!(a.len(), 32);
        assert_ne!(a, url_to_cache_key("https://placehold.co/460x691"));
    }

    #[test]
    fn stores_png_and_reads_back_rgba() {
        let dir = tempfile::tempdir().unwrap();
        let key = url_to_cache_key("https://cdn/p.jpg");
        assert!(find_by_key(dir.path(), &key).is_none());

        let path = store_png(dir.path(), &key, &tiny_jpeg()).unwrap();
        assert_eq!(find_by_key(dir.path(), &key), Some(path.clone()));

        let (w, h, bytes) = load_rgba(&path).unwrap();
        assert_eq!((w, h), (4, 6));
        assert_eq!(bytes.len(), 4 * 6 * 4);
    }

    #[test]
    fn rejects_non_image_bytes() {
        let dir = tempfile::tempdir().unwrap();
        assert!(store_png(dir.path(), "k", b"<html>nope</html>").is_err());
        assert!(find_by_key(dir.path(), "k").is_none());
    }

    #[test]
    fn prune_keeps_fresh_files() {
        let dir = tempfile::tempdir().unwrap();
        store_png(dir.path(), "fresh", &tiny_jpeg()).unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();
        assert_eq!(prune_older_than(dir.path(), POSTER_RETENTION).unwrap(), 0);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(prune_older_than(dir.path(), Duration::ZERO).unwrap(), 1);
        assert!(dir.path().join("notes.txt").exists());
    }
}
