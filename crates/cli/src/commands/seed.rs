//! Catalog seeding.
//!
//! Reads a YAML list of photos and upserts them into `catalog.photo`:
//!
//! ```yaml
//! - id: 1
//!   caption: Harbour at dawn
//!   price: "12.00"
//!   image_url: https://images.example.com/harbour.jpg
//! ```

use std::path::Path;

use tracing::{error, info};

use photostock_core::CurrencyCode;
use photostock_storefront::db::{PhotoRepository, PhotoSeed};

use super::connect;

/// Parse seed YAML and reject entries the catalog would refuse.
///
/// # Errors
///
/// Returns an error if the YAML is malformed or any entry is invalid.
pub fn parse_seeds(content: &str) -> Result<Vec<PhotoSeed>, Box<dyn std::error::Error>> {
    let seeds: Vec<PhotoSeed> = serde_yaml::from_str(content)?;

    let mut problems = Vec::new();
    for seed in &seeds {
        if seed.caption.trim().is_empty() {
            problems.push(format!("photo {}: caption is empty", seed.id));
        }
        if seed.price.is_sign_negative() {
            problems.push(format!("photo {}: price is negative", seed.id));
        }
        if !seed.image_url.starts_with("https://") {
            problems.push(format!("photo {}: image_url must be https", seed.id));
        }
    }

    if problems.is_empty() {
        Ok(seeds)
    } else {
        for problem in &problems {
            error!("{problem}");
        }
        Err(format!("{} invalid catalog entries", problems.len()).into())
    }
}

/// Seed catalog photos from a YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or the database
/// write fails. Nothing is written unless every entry is valid.
pub async fn catalog(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading catalog from file");
    let content = tokio::fs::read_to_string(path).await?;
    let seeds = parse_seeds(&content)?;
    info!(photos = seeds.len(), "Parsed catalog");

    let pool = connect().await?;
    // Currency only affects how photos are read back, not how they are stored
    let written = PhotoRepository::new(&pool, CurrencyCode::default())
        .upsert_many(&seeds)
        .await?;

    info!(written, "Catalog seeded");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_bundled_seed_file() {
        let content = include_str!("../../seed/photos.yaml");
        let seeds = parse_seeds(content).unwrap();
        assert!(!seeds.is_empty());
    }

    #[test]
    fn rejects_plain_http_images() {
        let yaml = "- id: 1\n  caption: Test\n  price: \"1.00\"\n  image_url: http://x.test/a.jpg\n";
        assert!(parse_seeds(yaml).is_err());
    }

    #[test]
    fn rejects_blank_captions() {
        let yaml = "- id: 1\n  caption: \"  \"\n  price: \"1.00\"\n  image_url: https://x.test/a.jpg\n";
        assert!(parse_seeds(yaml).is_err());
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let err = catalog("/nonexistent/photostock/photos.yaml")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("File not found"));
    }
}
