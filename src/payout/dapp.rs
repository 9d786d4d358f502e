use tracing::{debug, info, instrument};

use crate::chain::types::{DappId, DappInfo, DappTierRewards, EraIndex, SmartContract};
use crate::chain::{Call, ChainView};
use crate::config::Validator;
use crate::error::ReadResult;

/// Claimable dapp reward for one era
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DappClaim {
    pub dapp_id: DappId,
    pub smart_contract: SmartContract,
    pub era: EraIndex,
}

impl DappClaim {
    pub fn to_call(&self) -> Call {
        Call::ClaimDappReward {
            smart_contract: self.smart_contract.clone(),
            era: self.era,
        }
    }
}

/// Finds eras in which a validator's registered dapp was assigned a reward tier
pub struct DappTierRewardScanner<'a> {
    view: ChainView<'a>,
}

impl<'a> DappTierRewardScanner<'a> {
    pub fn new(view: ChainView<'a>) -> Self {
        Self { view }
    }

    /// Claims per validator, oldest era first.
    ///
    /// Already-claimed eras are not filtered out; claiming them again fails harmlessly.
    #[instrument(skip_all, fields(validators = validators.len()))]
    pub async fn scan(&self, validators: &[Validator]) -> ReadResult<Vec<DappClaim>> {
        let dapps: Vec<DappInfo> = self
            .view
            .entries("dappStaking.integratedDApps", |r, cursor, size| {
                r.integrated_dapps(cursor, size)
            })
            .await?;
        let tiers: Vec<(EraIndex, Option<DappTierRewards>)> = self
            .view
            .entries("dappStaking.dAppTiers", |r, cursor, size| r.dapp_tiers(cursor, size))
            .await?;
        debug!("{} integrated dapps, {} tier entries", dapps.len(), tiers.len());

        let mut claims = Vec::new();
        for validator in validators {
            let Some(dapp) = dapps.iter().find(|d| d.owner == validator.address) else {
                info!("⏭️ No dapp registered for {}, skipping", validator.address);
                continue;
            };

            let eras = tiered_eras(dapp.id, &tiers);
            debug!("Dapp {} has {} claimable eras", dapp.id, eras.len());

            claims.extend(eras.into_iter().map(|era| DappClaim {
                dapp_id: dapp.id,
                smart_contract: dapp.smart_contract.clone(),
                era,
            }));
        }

        info!("📊 Found {} dapp reward claims", claims.len());
        Ok(claims)
    }
}

/// Eras whose tier table includes `dapp_id`, ascending
fn tiered_eras(dapp_id: DappId, tiers: &[(EraIndex, Option<DappTierRewards>)]) -> Vec<EraIndex> {
    let mut eras: Vec<EraIndex> = tiers
        .iter()
        .filter_map(|(era, rewards)| {
            rewards
                .as_ref()
                .filter(|r| r.dapps.contains_key(&dapp_id))
                .map(|_| *era)
        })
        .collect();
    eras.sort_unstable();
    eras.dedup();
    eras
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::retry::PAGE_SIZE;
    use crate::chain::{ChainSnapshot, RetryPolicy, SnapshotReader};
    use std::collections::BTreeMap;

    fn validator(address: &str) -> Validator {
        Validator {
            address: address.to_string(),
            voting_delegates: Vec::new(),
            vote_weight: 0,
            vote_enabled: false,
        }
    }

    fn tier_with(dapps: &[DappId]) -> Option<DappTierRewards> {
        Some(DappTierRewards {
            dapps: dapps.iter().map(|id| (*id, 1u8)).collect::<BTreeMap<_, _>>(),
        })
    }

    fn snapshot() -> ChainSnapshot {
        ChainSnapshot {
            integrated_dapps: vec![
                DappInfo {
                    id: 7,
                    owner: "alice".to_string(),
                    smart_contract: SmartContract::Evm("0x1234".to_string()),
                },
                DappInfo {
                    id: 9,
                    owner: "carol".to_string(),
                    smart_contract: SmartContract::Wasm("carol-contract".to_string()),
                },
            ],
            // node enumeration order is not era order
            dapp_tiers: vec![
                (812, tier_with(&[7, 9])),
                (640, tier_with(&[7])),
                (700, None),
                (701, tier_with(&[9])),
                (655, tier_with(&[7])),
            ],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_claims_are_ordered_oldest_first() {
        let reader = SnapshotReader::new(snapshot());
        let view = ChainView::new(&reader, RetryPolicy::immediate(1));

        let claims = DappTierRewardScanner::new(view)
            .scan(&[validator("alice")])
            .await
            .unwrap();

        let eras: Vec<EraIndex> = claims.iter().map(|c| c.era).collect();
        assert_eq!(eras, vec![640, 655, 812]);
        assert_eq!(
            claims[0].to_call(),
            Call::ClaimDappReward {
                smart_contract: SmartContract::Evm("0x1234".to_string()),
                era: 640,
            }
        );
    }

    #[tokio::test]
    async fn test_validator_without_dapp_is_skipped() {
        let reader = SnapshotReader::new(snapshot());
        let view = ChainView::new(&reader, RetryPolicy::immediate(1));

        let claims = DappTierRewardScanner::new(view)
            .scan(&[validator("bob"), validator("carol")])
            .await
            .unwrap();

        assert_eq!(claims.len(), 2);
        assert!(claims.iter().all(|c| c.dapp_id == 9));
        assert_eq!(claims[0].era, 701);
        assert_eq!(claims[1].era, 812);
    }

    #[tokio::test]
    async fn test_tier_table_spanning_pages() {
        let tiers: Vec<_> = (0..PAGE_SIZE + 10)
            .rev()
            .map(|era| (era, tier_with(&[7])))
            .collect();
        let reader = SnapshotReader::new(ChainSnapshot {
            dapp_tiers: tiers,
            ..snapshot()
        });
        let view = ChainView::new(&reader, RetryPolicy::immediate(1));

        let claims = DappTierRewardScanner::new(view)
            .scan(&[validator("alice")])
            .await
            .unwrap();

        assert_eq!(claims.len(), (PAGE_SIZE + 10) as usize);
        assert_eq!(claims.first().map(|c| c.era), Some(0));
        assert_eq!(claims.last().map(|c| c.era), Some(PAGE_SIZE + 9));
    }
}
