use tracing::{debug, warn};

use crate::apply::ApplyContext;
use crate::directory::GatewayLister;
use crate::error::MconfigResult;
use crate::store::bundle::BundleWrite;
use crate::store::kv::{KvEngine, Precondition};
use crate::types::{
    ImageSpec, LifecycleConfig, Operation, TierUpdate, UNVERSIONED_PACKAGE_VERSION,
};

pub(super) async fn apply_tier_update<K, L>(
    ctx: &ApplyContext<K, L>,
    update: &TierUpdate,
) -> MconfigResult<usize>
where
    K: KvEngine + Sync,
    L: GatewayLister + Sync,
{
    let (version, images): (&str, &[ImageSpec]) = match update.operation {
        Operation::Read => return Ok(0),
        Operation::Delete => (UNVERSIONED_PACKAGE_VERSION, &[]),
        Operation::Create | Operation::Update if update.tier_version.is_empty() => {
            (UNVERSIONED_PACKAGE_VERSION, &[])
        }
        Operation::Create | Operation::Update => {
            (update.tier_version.as_str(), update.tier_images.as_slice())
        }
    };

    let gateway_ids = ctx.directory.list_gateways(&update.network_id).await?;
    if gateway_ids.is_empty() {
        return Ok(0);
    }

    let stored = ctx
        .storage
        .get_many_versioned(&update.network_id, &gateway_ids)
        .await?;

    let mut writes = Vec::new();
    for (gateway_id, versioned) in stored {
        let mut bundle = versioned.bundle.bundle;

        let mut lifecycle = match LifecycleConfig::read_from(&bundle) {
            Ok(Some(lifecycle)) => lifecycle,
            Ok(None) => continue,
            Err(err) => {
                warn!(
                    network_id = %update.network_id,
                    gateway_id = %gateway_id,
                    error = %err,
                    "skipping gateway with undecodable lifecycle fragment"
                );
                continue;
            }
        };
        if lifecycle.tier_id != update.tier_id {
            continue;
        }
        if !lifecycle.apply_tier_version(version, images) {
            continue;
        }

        lifecycle.write_to(&mut bundle)?;
        writes.push(BundleWrite {
            gateway_id,
            bundle,
            // The gateway keeps the offset of the config change that produced its bundle.
            offset: versioned.bundle.offset,
            precondition: Precondition::Generation(versioned.generation),
        });
    }
    writes.sort_by(|a, b| a.gateway_id.cmp(&b.gateway_id));

    let written = writes.len();
    ctx.storage
        .create_or_update(&update.network_id, writes)
        .await?;

    debug!(
        network_id = %update.network_id,
        tier_id = %update.tier_id,
        version,
        written,
        "applied tier update"
    );

    Ok(written)
}
