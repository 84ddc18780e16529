use anyhow::{bail, Context, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

pub const IMAGE_EXTENSION: &str = "jpg";

static NON_PRICE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9.]").expect("price pattern is valid"));

/// Strips currency symbols and separators, then truncates the fractional part.
///
/// `"$1,234.56"` becomes `1234`, `"₹999"` becomes `999`.
pub fn clean_price(text: &str) -> Result<i64> {
    let cleaned = NON_PRICE_CHARS.replace_all(text, "");
    let value = cleaned
        .parse::<f64>()
        .with_context(|| format!("Failed to parse price from {:?}", text))?;

    let value = value.trunc();
    // i64::MAX as f64 rounds up to 2^63, hence the strict upper bound
    if !value.is_finite() || value < i64::MIN as f64 || value >= i64::MAX as f64 {
        bail!("Price out of range: {:?}", text);
    }
    Ok(value as i64)
}

/// Replaces every character that is not alphanumeric, `_` or `-` with `_`.
///
/// Distinct titles may collide after sanitizing; nothing here resolves that.
pub fn sanitize_filename(title: &str) -> String {
    title
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect()
}

pub fn image_path_for(image_root: &Path, title: &str) -> PathBuf {
    image_root.join(format!("{}.{}", sanitize_filename(title), IMAGE_EXTENSION))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_symbols_and_truncates() {
        assert_eq!(clean_price("$1,234.56").unwrap(), 1234);
        assert_eq!(clean_price("₹999").unwrap(), 999);
        assert_eq!(clean_price("₹ 12,499.99 incl. GST").unwrap(), 12499);
        assert_eq!(clean_price("0.99").unwrap(), 0);
    }

    #[test]
    fn rejects_text_without_a_number() {
        assert!(clean_price("Out of stock").is_err());
        assert!(clean_price("").is_err());
        assert!(clean_price("1.2.3").is_err());
    }

    #[test]
    fn rejects_prices_that_do_not_fit() {
        assert!(clean_price("₹99999999999999999999").is_err());
        assert!(clean_price(&"9".repeat(400)).is_err());
        assert_eq!(clean_price("₹9007199254740992").unwrap(), 9_007_199_254_740_992);
    }

    #[test]
    fn sanitizes_titles() {
        assert_eq!(sanitize_filename("Dental Mirror (Size #4)"), "Dental_Mirror__Size__4_");
        assert_eq!(sanitize_filename("a_b-c"), "a_b-c");
        assert_eq!(sanitize_filename("Ünïcode Explorer"), "Ünïcode_Explorer");
    }

    #[test]
    fn distinct_titles_can_collide() {
        assert_eq!(sanitize_filename("Explorer/1"), sanitize_filename("Explorer 1"));
    }

    #[test]
    fn image_path_lives_under_root() {
        let path = image_path_for(Path::new("data/images"), "Gloves, Large");
        assert_eq!(path, PathBuf::from("data/images/Gloves__Large.jpg"));
    }
}
