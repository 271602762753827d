use std::collections::HashMap;

use tracing::debug;

use crate::apply::ApplyContext;
use crate::directory::GatewayLister;
use crate::error::MconfigResult;
use crate::store::bundle::BundleWrite;
use crate::store::kv::{KvEngine, Precondition};
use crate::types::{Bundle, BundlesByGateway, ConfigUpdate};

pub(super) async fn apply_config_update<K, L>(
    ctx: &ApplyContext<K, L>,
    update: &ConfigUpdate,
    offset: i64,
) -> MconfigResult<usize>
where
    K: KvEngine + Sync,
    L: GatewayLister + Sync,
{
    if ctx.config_types.is_blacklisted(&update.config_type) {
        debug!(config_type = %update.config_type, "ignoring blacklisted config type");
        return Ok(0);
    }

    let gateway_ids = ctx
        .config_types
        .gateway_ids_for_config(&update.config_type, &update.network_id, &update.config_key)
        .await?;
    if gateway_ids.is_empty() {
        debug!(
            config_type = %update.config_type,
            config_key = %update.config_key,
            "config affects no gateways"
        );
        return Ok(0);
    }

    let mut stored = ctx
        .storage
        .get_many_versioned(&update.network_id, &gateway_ids)
        .await?;

    let mut preconditions = HashMap::with_capacity(gateway_ids.len());
    let mut bundles = BundlesByGateway::new();
    for gateway_id in gateway_ids {
        // Gateways without a stored bundle start from an empty one.
        let (bundle, precondition) = match stored.remove(&gateway_id) {
            Some(versioned) => (
                versioned.bundle.bundle,
                Precondition::Generation(versioned.generation),
            ),
            None => (Bundle::new(), Precondition::Absent),
        };

        preconditions.insert(gateway_id.clone(), precondition);
        bundles.insert(gateway_id, bundle);
    }

    let bundles = ctx.streamers.apply_config_update(update, bundles)?;

    let writes: Vec<_> = bundles
        .into_iter()
        .map(|(gateway_id, bundle)| BundleWrite {
            precondition: preconditions
                .get(&gateway_id)
                .copied()
                .unwrap_or(Precondition::Absent),
            gateway_id,
            bundle,
            offset,
        })
        .collect();
    let written = writes.len();

    ctx.storage
        .create_or_update(&update.network_id, writes)
        .await?;

    debug!(
        network_id = %update.network_id,
        config_type = %update.config_type,
        config_key = %update.config_key,
        operation = %update.operation,
        offset,
        written,
        "applied config update"
    );

    Ok(written)
}

#[cfg(test)]
mod tests {
    use crate::apply::tests::context;
    use crate::error::ErrorKind;
    use crate::store::bundle::BundleWrite;
    use crate::store::kv::Precondition;
    use crate::types::{Bundle, ConfigUpdate, Operation, Update};

    fn config_update(config_type: &str, key: &str, value: Option<&str>) -> Update {
        Update::Config(ConfigUpdate {
            network_id: "n1".to_string(),
            config_type: config_type.to_string(),
            config_key: key.to_string(),
            operation: if value.is_some() {
                Operation::Update
            } else {
                Operation::Delete
            },
            new_value: value.map(|value| serde_json::json!(value)),
        })
    }

    #[tokio::test]
    async fn config_fans_out_to_every_gateway_of_the_key() {
        let ctx = context();

        let written = config_update("type1", "k1", Some("v1"))
            .apply(&ctx, 10)
            .await
            .unwrap();
        assert_eq!(written, 2);

        for gateway_id in ["gw1", "gw2"] {
            let stored = ctx.storage.get("n1", gateway_id).await.unwrap().unwrap();
            assert_eq!(stored.offset, 10);
            assert_eq!(
                stored.bundle.get_typed::<String>("s1").unwrap().as_deref(),
                Some("v1")
            );
        }
    }

    #[tokio::test]
    async fn existing_fragments_are_kept() {
        let ctx = context();
        let mut bundle = Bundle::new();
        bundle.set_typed("s2", &"seed:gw3").unwrap();
        ctx.storage
            .create_or_update(
                "n1",
                vec![BundleWrite {
                    gateway_id: "gw3".to_string(),
                    bundle,
                    offset: -1,
                    precondition: Precondition::None,
                }],
            )
            .await
            .unwrap();

        config_update("type1", "gw3", Some("v1"))
            .apply(&ctx, 4)
            .await
            .unwrap();

        let stored = ctx.storage.get("n1", "gw3").await.unwrap().unwrap();
        assert_eq!(stored.offset, 4);
        assert_eq!(stored.bundle.keys().collect::<Vec<_>>(), vec!["s1", "s2"]);
    }

    #[tokio::test]
    async fn replaying_an_update_converges() {
        let ctx = context();
        let update = config_update("type1", "k1", Some("v1"));

        update.apply(&ctx, 7).await.unwrap();
        let first = ctx.storage.get("n1", "gw1").await.unwrap().unwrap();
        update.apply(&ctx, 7).await.unwrap();
        let second = ctx.storage.get("n1", "gw1").await.unwrap().unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn delete_removes_the_fragment_but_keeps_the_bundle() {
        let ctx = context();
        config_update("type2", "gw3", Some("v2"))
            .apply(&ctx, 1)
            .await
            .unwrap();

        config_update("type2", "gw3", None)
            .apply(&ctx, 2)
            .await
            .unwrap();

        let stored = ctx.storage.get("n1", "gw3").await.unwrap().unwrap();
        assert!(stored.bundle.is_empty());
        assert_eq!(stored.offset, 2);
    }

    #[tokio::test]
    async fn blacklisted_types_are_ignored() {
        let ctx = context();

        let written = config_update("blocked", "gw1", Some("v"))
            .apply(&ctx, 1)
            .await
            .unwrap();

        assert_eq!(written, 0);
        assert_eq!(ctx.storage.get("n1", "gw1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn unknown_config_type_fails() {
        let ctx = context();

        let err = config_update("type9", "gw1", Some("v"))
            .apply(&ctx, 1)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::UnknownConfigType);
    }
}
