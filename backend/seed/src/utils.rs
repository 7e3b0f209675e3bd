use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};

use crate::models::SeedFile;

pub async fn read_source(source: &str) -> anyhow::Result<SeedFile> {
    if source.starts_with("http://") || source.starts_with("https://") {
        return reqwest::get(source)
            .await
            .and_then(|res| res.error_for_status())
            .with_context(|| format!("fetching {source}"))?
            .json()
            .await
            .with_context(|| format!("decoding {source}"));
    }

    let raw = tokio::fs::read_to_string(source)
        .await
        .with_context(|| format!("reading {source}"))?;

    serde_json::from_str(&raw).with_context(|| format!("decoding {source}"))
}

/// Trims and collapses inner whitespace.
pub fn sanitize(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Empty image strings count as no image.
pub fn sanitize_image(image: Option<&str>) -> Option<String> {
    image.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

pub fn progress_bar(len: usize) -> anyhow::Result<ProgressBar> {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        )?
        .progress_chars("=> "),
    );

    Ok(pb)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("  Sunset   Beach "), "Sunset Beach");
        assert_eq!(sanitize("\tCity\n"), "City");
        assert_eq!(sanitize("     "), "");
    }

    #[test]
    fn test_sanitize_image() {
        assert_eq!(sanitize_image(Some(" data:a ")), Some("data:a".to_string()));
        assert_eq!(sanitize_image(Some("  ")), None);
        assert_eq!(sanitize_image(None), None);
    }

    #[tokio::test]
    async fn test_read_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"categories":[{{"name":"Beach","items":[{{"name":"Cove","image":"data:x"}},{{"name":"Bay"}}]}},{{"name":"City"}}]}}"#
        )
        .unwrap();

        let seed = read_source(file.path().to_str().unwrap()).await.unwrap();

        assert_eq!(seed.categories.len(), 2);
        assert_eq!(seed.categories[0].items[0].image.as_deref(), Some("data:x"));
        assert_eq!(seed.categories[0].items[1].image, None);
        assert!(seed.categories[1].items.is_empty());
        assert_eq!(seed.len(), 4);
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let err = read_source("/definitely/not/here.json").await.unwrap_err();

        assert!(err.to_string().contains("reading /definitely/not/here.json"));
    }

    #[tokio::test]
    async fn test_read_bad_json() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"categories": 3}}"#).unwrap();

        assert!(read_source(file.path().to_str().unwrap()).await.is_err());
    }
}
