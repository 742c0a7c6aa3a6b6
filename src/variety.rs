//! Variety URL derivation.
//!
//! A *variety* of an image is a resized rendition served next to the
//! original. Two URL conventions are supported:
//!
//! - **Live asset paths** of the form
//!   `<prefix>__data/assets/image/<4 digits>/<4 digits>/<file>`. Varieties live
//!   in a `varieties/` directory next to the file.
//! - Any other image URL, where the variety is addressed as a child path of the
//!   original file.
//!
//! ```
//! use variety_engine::variety::variety_url;
//!
//! assert_eq!(
//!     variety_url("/site/__data/assets/image/2020/0101/foo.jpg", "small"),
//!     "/site/__data/assets/image/2020/0101/varieties/small.jpg",
//! );
//! assert_eq!(variety_url("/img/foo.PNG", "large"), "/img/foo.PNG/large.png");
//! assert_eq!(variety_url("/doc/readme.txt", "large"), "/doc/readme.txt");
//! ```
//!
//! Derivation is idempotent: feeding a derived URL back in returns it unchanged.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref TRAILING_EXTENSION: Regex = Regex::new(r"(?i)\.(jpeg|gif|jpg|png)$").unwrap();
    static ref EXTENSION_TOKEN: Regex = Regex::new(r"(?i)\.(?:jpeg|gif|jpg|png)(?:/|$)").unwrap();
    static ref LIVE_ASSET_PATH: Regex =
        Regex::new(r"(?i)(.*)__data/assets/image/[0-9]{4}/[0-9]{4}/").unwrap();
}

const VARIETIES_SEGMENT: &str = "/varieties/";

/// Returns the lower-cased image extension of `url`, if it ends in one.
pub fn image_extension(url: &str) -> Option<String> {
    TRAILING_EXTENSION
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_ascii_lowercase())
}

/// Returns true when `url` follows the live asset path convention.
pub fn is_live_asset(url: &str) -> bool {
    LIVE_ASSET_PATH.is_match(url)
}

/// Derives the URL of variety `name` for the image at `source`.
///
/// URLs that are not images, or that already address a variety, are
/// returned unchanged.
pub fn variety_url(source: &str, name: &str) -> String {
    let Some(ext) = image_extension(source) else {
        return source.to_string();
    };

    if is_live_asset(source) {
        if source.contains(VARIETIES_SEGMENT) {
            return source.to_string();
        }
        let prefix = LIVE_ASSET_PATH.find(source).map_or("", |m| m.as_str());
        return format!("{}varieties/{}.{}", prefix, name, ext);
    }

    // A file extension inside the path means the source is already a variety
    if EXTENSION_TOKEN.find_iter(source).count() > 1 {
        return source.to_string();
    }

    format!("{}/{}.{}", source, name, ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIVE: &str = "https://example.com/site/__data/assets/image/2020/0101/foo.jpg";

    #[test]
    fn live_asset_gets_varieties_dir() {
        assert_eq!(
            variety_url(LIVE, "small"),
            "https://example.com/site/__data/assets/image/2020/0101/varieties/small.jpg"
        );
    }

    #[test]
    fn live_asset_variety_is_left_alone() {
        let derived = variety_url(LIVE, "large");
        assert_eq!(variety_url(&derived, "large"), derived);
        assert_eq!(variety_url(&derived, "small"), derived);
    }

    #[test]
    fn static_image_gets_child_path() {
        assert_eq!(variety_url("/images/cat.gif", "thumb"), "/images/cat.gif/thumb.gif");
    }

    #[test]
    fn static_variety_is_left_alone() {
        let derived = variety_url("/images/cat.jpeg", "thumb");
        assert_eq!(derived, "/images/cat.jpeg/thumb.jpeg");
        assert_eq!(variety_url(&derived, "thumb"), derived);
        assert_eq!(variety_url(&derived, "other"), derived);
    }

    #[test]
    fn extension_is_case_insensitive_and_lowered() {
        assert_eq!(image_extension("/a/B.JPG").as_deref(), Some("jpg"));
        assert_eq!(
            variety_url("/x/__DATA/Assets/Image/2019/1231/pic.PNG", "m"),
            "/x/__DATA/Assets/Image/2019/1231/varieties/m.png"
        );
    }

    #[test]
    fn non_images_are_unchanged() {
        for url in ["/a/b.svg", "/a/b.jpg?v=2", "/a/b", "", "/a/jpg"] {
            assert_eq!(variety_url(url, "small"), url);
        }
    }

    #[test]
    fn live_detection_requires_both_digit_dirs() {
        assert!(is_live_asset(LIVE));
        assert!(!is_live_asset("/__data/assets/image/20/0101/foo.jpg"));
        assert!(!is_live_asset("/__data/assets/file/2020/0101/foo.jpg"));
    }

    #[test]
    fn layout_follows_live_detection() {
        for url in [LIVE, "/__data/assets/image/20/0101/foo.jpg", "/img/foo.png"] {
            let derived = variety_url(url, "s");
            assert_eq!(derived.contains("/varieties/s."), is_live_asset(url), "{}", url);
        }
    }
}
