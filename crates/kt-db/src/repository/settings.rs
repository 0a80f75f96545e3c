//! # Settings Repository
//!
//! Singleton rows for the operator-editable fee policy and shuttle
//! pricing. A missing row means the built-in default.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use crate::codec;
use crate::error::DbResult;
use kt_core::{FeePolicy, ShuttleConfig};

#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SettingsRepository { pool }
    }

    /// The current fee policy, or [`FeePolicy::default`] if none was saved.
    pub async fn fee_policy(&self) -> DbResult<FeePolicy> {
        let raw: Option<String> =
            sqlx::query_scalar("SELECT card_fee_percentage FROM fee_policy WHERE id = 1")
                .fetch_optional(&self.pool)
                .await?;

        match raw {
            Some(raw) => Ok(FeePolicy::new(codec::decimal(
                "fee_policy",
                "card_fee_percentage",
                &raw,
            )?)),
            None => Ok(FeePolicy::default()),
        }
    }

    pub async fn set_fee_policy(&self, policy: &FeePolicy) -> DbResult<()> {
        info!(card_fee_percentage = %policy.card_fee_percentage, "Updating fee policy");

        sqlx::query(
            r#"
            INSERT INTO fee_policy (id, card_fee_percentage, updated_at) VALUES (1, ?1, ?2)
            ON CONFLICT(id) DO UPDATE SET
                card_fee_percentage = excluded.card_fee_percentage,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(codec::text(policy.card_fee_percentage))
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn shuttle_config(&self) -> DbResult<ShuttleConfig> {
        let raw: Option<String> =
            sqlx::query_scalar("SELECT price_per_passenger FROM shuttle_config WHERE id = 1")
                .fetch_optional(&self.pool)
                .await?;

        match raw {
            Some(raw) => Ok(ShuttleConfig {
                price_per_passenger: codec::decimal("shuttle_config", "price_per_passenger", &raw)?,
            }),
            None => Ok(ShuttleConfig::default()),
        }
    }

    pub async fn set_shuttle_config(&self, config: &ShuttleConfig) -> DbResult<()> {
        info!(price_per_passenger = %config.price_per_passenger, "Updating shuttle pricing");

        sqlx::query(
            r#"
            INSERT INTO shuttle_config (id, price_per_passenger, updated_at) VALUES (1, ?1, ?2)
            ON CONFLICT(id) DO UPDATE SET
                price_per_passenger = excluded.price_per_passenger,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(codec::text(config.price_per_passenger))
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_defaults_until_saved() {
        let db = test_support::db().await;
        let settings = db.settings();
        assert_eq!(settings.fee_policy().await.unwrap(), FeePolicy::default());
        assert_eq!(settings.shuttle_config().await.unwrap(), ShuttleConfig::default());

        settings.set_fee_policy(&FeePolicy::new(dec!(5.50))).await.unwrap();
        settings.set_fee_policy(&FeePolicy::new(dec!(6.00))).await.unwrap();
        settings
            .set_shuttle_config(&ShuttleConfig { price_per_passenger: dec!(65.00) })
            .await
            .unwrap();

        assert_eq!(settings.fee_policy().await.unwrap().card_fee_percentage, dec!(6.00));
        assert_eq!(settings.shuttle_config().await.unwrap().quote(2), dec!(130.00));
    }
}
