//! Asset sync stage
//!
//! Mirrors each configured local directory to its prefix in the assets
//! bucket. A directory that does not exist locally is a soft-skip: it is
//! reported and its remote prefix is left untouched.

use std::path::Path;
use stratus_core::domain::infra::keys;
use stratus_core::domain::stage::{Stage, StageReport};
use tracing::{info, warn};

use crate::config::AssetLayout;
use crate::context::ExecutionContext;
use crate::error::Result;
use crate::inventory::ModelInventory;
use crate::stages::require;
use crate::tools::{Aws, Terraform};

pub async fn sync_assets(ctx: &ExecutionContext) -> Result<StageReport> {
    let config = ctx.config();
    let mut warnings = Vec::new();
    let mut present = Vec::new();

    for dir in &config.asset_dirs {
        let path = config.resolve(&dir.local);
        if path.is_dir() {
            present.push((dir, path));
        } else {
            let message = format!(
                "{} not found; s3 prefix '{}' left unchanged",
                dir.local.display(),
                dir.prefix
            );
            warn!("{}", message);
            warnings.push(message);
        }
    }

    if present.is_empty() {
        return Ok(
            StageReport::skipped(Stage::AssetSync, "no asset directories found")
                .with_warnings(warnings),
        );
    }

    let outputs = Terraform::new(ctx).outputs().await?;
    let bucket = require(&outputs, keys::S3_BUCKET_NAME)?;
    let aws = Aws::new(ctx);

    for (dir, path) in present {
        if dir.layout == AssetLayout::CityModels {
            for message in inventory_warnings(&path) {
                warn!("{}", message);
                warnings.push(message);
            }
        }

        aws.s3_sync_mirror(&path, bucket, &dir.prefix).await?;
    }

    Ok(StageReport::completed(Stage::AssetSync).with_warnings(warnings))
}

/// Gaps in a models directory; an unreadable directory is itself a warning
fn inventory_warnings(path: &Path) -> Vec<String> {
    match ModelInventory::scan(path) {
        Ok(inventory) => {
            info!(
                "{} of {} city model set(s) complete",
                inventory.complete_count(),
                inventory.cities.len()
            );
            inventory.warnings()
        }
        Err(e) => vec![format!(
            "{}: model inventory unavailable: {}",
            path.display(),
            e
        )],
    }
}
