use tracing::{debug, info};

use crate::apply::ApplyContext;
use crate::directory::GatewayLister;
use crate::error::MconfigResult;
use crate::store::bundle::BundleWrite;
use crate::store::kv::{KvEngine, Precondition};
use crate::types::{GatewayUpdate, Operation, SEEDED_BUNDLE_OFFSET};

pub(super) async fn apply_gateway_update<K, L>(
    ctx: &ApplyContext<K, L>,
    update: &GatewayUpdate,
) -> MconfigResult<usize>
where
    K: KvEngine + Sync,
    L: GatewayLister + Sync,
{
    match update.operation {
        Operation::Read | Operation::Update => {
            debug!(gateway_id = %update.gateway_id, operation = %update.operation, "gateway change does not affect bundles");
            Ok(0)
        }
        Operation::Create => {
            let bundle = ctx
                .streamers
                .seed_bundle(&update.network_id, &update.gateway_id)?;

            // Seeding is unconditional so a replayed create converges to the same bundle.
            ctx.storage
                .create_or_update(
                    &update.network_id,
                    vec![BundleWrite {
                        gateway_id: update.gateway_id.clone(),
                        bundle,
                        offset: SEEDED_BUNDLE_OFFSET,
                        precondition: Precondition::None,
                    }],
                )
                .await?;

            info!(network_id = %update.network_id, gateway_id = %update.gateway_id, "seeded bundle of new gateway");

            Ok(1)
        }
        Operation::Delete => {
            ctx.storage
                .delete(&update.network_id, vec![update.gateway_id.clone()])
                .await?;

            info!(network_id = %update.network_id, gateway_id = %update.gateway_id, "deleted bundle of removed gateway");

            Ok(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::apply::tests::context;
    use crate::types::{GatewayUpdate, Operation, SEEDED_BUNDLE_OFFSET, Update};

    fn gateway_update(gateway_id: &str, operation: Operation) -> Update {
        Update::Gateway(GatewayUpdate {
            network_id: "n1".to_string(),
            gateway_id: gateway_id.to_string(),
            operation,
        })
    }

    #[tokio::test]
    async fn create_seeds_with_every_unit() {
        let ctx = context();

        gateway_update("gw4", Operation::Create)
            .apply(&ctx, 20)
            .await
            .unwrap();

        let stored = ctx.storage.get("n1", "gw4").await.unwrap().unwrap();
        assert_eq!(stored.offset, SEEDED_BUNDLE_OFFSET);
        assert_eq!(
            stored.bundle.get_typed::<String>("s1").unwrap().as_deref(),
            Some("seed:gw4")
        );
        assert_eq!(
            stored.bundle.get_typed::<String>("s2").unwrap().as_deref(),
            Some("seed:gw4")
        );
    }

    #[tokio::test]
    async fn replayed_create_converges() {
        let ctx = context();
        let update = gateway_update("gw4", Operation::Create);

        update.apply(&ctx, 20).await.unwrap();
        update.apply(&ctx, 20).await.unwrap();

        let stored = ctx.storage.get("n1", "gw4").await.unwrap().unwrap();
        assert_eq!(stored.offset, SEEDED_BUNDLE_OFFSET);
        assert_eq!(stored.bundle.len(), 2);
    }

    #[tokio::test]
    async fn delete_removes_the_bundle() {
        let ctx = context();
        gateway_update("gw4", Operation::Create)
            .apply(&ctx, 1)
            .await
            .unwrap();

        gateway_update("gw4", Operation::Delete)
            .apply(&ctx, 2)
            .await
            .unwrap();

        assert_eq!(ctx.storage.get("n1", "gw4").await.unwrap(), None);
    }

    #[tokio::test]
    async fn reads_and_updates_are_ignored() {
        let ctx = context();

        for operation in [Operation::Read, Operation::Update] {
            let written = gateway_update("gw4", operation)
                .apply(&ctx, 1)
                .await
                .unwrap();
            assert_eq!(written, 0);
        }
        assert_eq!(ctx.storage.get("n1", "gw4").await.unwrap(), None);
    }
}
