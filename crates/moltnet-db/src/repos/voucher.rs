//! Voucher repository - web-of-trust admission control

use rand::RngCore;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{DbError, DbResult, DbVoucher};
use moltnet_types::{TrustEdge, MAX_ACTIVE_VOUCHERS_PER_ISSUER, VOUCHER_TTL_SECONDS};

/// Voucher repository. `issue` and `redeem` are the two operations the spec
/// requires to be atomic; both are implemented as single round-trips to the
/// database rather than read-then-write from the application layer.
pub struct VoucherRepo {
    pool: PgPool,
}

impl VoucherRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Issue a fresh voucher for `issuer_id`, or `None` if the issuer
    /// already holds `MAX_ACTIVE_VOUCHERS_PER_ISSUER` active vouchers.
    ///
    /// Runs in a `SERIALIZABLE` transaction so the count-then-insert pair is
    /// atomic under concurrent issuance by the same issuer.
    pub async fn issue(&self, issuer_id: Uuid) -> DbResult<Option<DbVoucher>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await?;

        let active_count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM vouchers
            WHERE issuer_id = $1 AND redeemed_at IS NULL AND expires_at > NOW()
            "#,
        )
        .bind(issuer_id)
        .fetch_one(&mut *tx)
        .await?;

        if active_count >= MAX_ACTIVE_VOUCHERS_PER_ISSUER {
            return Ok(None);
        }

        let code = random_voucher_code();

        let voucher = sqlx::query_as::<_, DbVoucher>(
            r#"
            INSERT INTO vouchers (code, issuer_id, expires_at)
            VALUES ($1, $2, NOW() + make_interval(secs => $3))
            RETURNING code, issuer_id, redeemed_by, created_at, expires_at, redeemed_at
            "#,
        )
        .bind(&code)
        .bind(issuer_id)
        .bind(VOUCHER_TTL_SECONDS as f64)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(voucher))
    }

    /// Atomically redeem `code` for `redeemer_id`. Returns `None` uniformly
    /// for an unknown code, an already-redeemed voucher, or an expired one —
    /// callers must not be able to distinguish the three from the outside.
    pub async fn redeem(&self, code: &str, redeemer_id: Uuid) -> DbResult<Option<DbVoucher>> {
        let voucher = sqlx::query_as::<_, DbVoucher>(
            r#"
            UPDATE vouchers
            SET redeemed_by = $2, redeemed_at = NOW()
            WHERE code = $1 AND redeemed_at IS NULL AND expires_at > NOW()
            RETURNING code, issuer_id, redeemed_by, created_at, expires_at, redeemed_at
            "#,
        )
        .bind(code)
        .bind(redeemer_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(voucher)
    }

    pub async fn list_active_by_issuer(&self, issuer_id: Uuid) -> DbResult<Vec<DbVoucher>> {
        let vouchers = sqlx::query_as::<_, DbVoucher>(
            r#"
            SELECT code, issuer_id, redeemed_by, created_at, expires_at, redeemed_at
            FROM vouchers
            WHERE issuer_id = $1 AND redeemed_at IS NULL AND expires_at > NOW()
            ORDER BY created_at DESC
            "#,
        )
        .bind(issuer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(vouchers)
    }

    /// Directed edges of the trust graph: every consumed voucher, keyed by
    /// the stable fingerprints of issuer and redeemer rather than agent ids.
    pub async fn trust_graph(&self) -> DbResult<Vec<TrustEdge>> {
        let rows: Vec<(String, String, chrono::DateTime<chrono::Utc>)> = sqlx::query_as(
            r#"
            SELECT issuer.fingerprint, redeemer.fingerprint, v.redeemed_at
            FROM vouchers v
            JOIN agents issuer ON issuer.identity_id = v.issuer_id
            JOIN agents redeemer ON redeemer.identity_id = v.redeemed_by
            WHERE v.redeemed_at IS NOT NULL
            ORDER BY v.redeemed_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::Query)?;

        Ok(rows
            .into_iter()
            .map(|(issuer_fingerprint, redeemer_fingerprint, redeemed_at)| TrustEdge {
                issuer_fingerprint,
                redeemer_fingerprint,
                redeemed_at,
            })
            .collect())
    }
}

fn random_voucher_code() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

impl From<DbVoucher> for moltnet_types::Voucher {
    fn from(row: DbVoucher) -> Self {
        Self {
            code: row.code,
            issuer_id: row.issuer_id.into(),
            redeemed_by: row.redeemed_by.map(Into::into),
            created_at: row.created_at,
            expires_at: row.expires_at,
            redeemed_at: row.redeemed_at,
        }
    }
}

#[async_trait::async_trait]
impl moltnet_voucher::VoucherStore for VoucherRepo {
    async fn issue(
        &self,
        issuer_id: &str,
    ) -> Result<Option<moltnet_types::Voucher>, moltnet_voucher::VoucherError> {
        let issuer_id = parse_agent_id(issuer_id)?;
        self.issue(issuer_id)
            .await
            .map(|opt| opt.map(Into::into))
            .map_err(to_voucher_err)
    }

    async fn redeem(
        &self,
        code: &str,
        redeemer_id: &str,
    ) -> Result<Option<moltnet_types::Voucher>, moltnet_voucher::VoucherError> {
        let redeemer_id = parse_agent_id(redeemer_id)?;
        self.redeem(code, redeemer_id)
            .await
            .map(|opt| opt.map(Into::into))
            .map_err(to_voucher_err)
    }

    async fn list_active_by_issuer(
        &self,
        issuer_id: &str,
    ) -> Result<Vec<moltnet_types::Voucher>, moltnet_voucher::VoucherError> {
        let issuer_id = parse_agent_id(issuer_id)?;
        self.list_active_by_issuer(issuer_id)
            .await
            .map(|rows| rows.into_iter().map(Into::into).collect())
            .map_err(to_voucher_err)
    }

    async fn trust_graph(
        &self,
    ) -> Result<Vec<moltnet_types::TrustEdge>, moltnet_voucher::VoucherError> {
        self.trust_graph().await.map_err(to_voucher_err)
    }
}

fn parse_agent_id(s: &str) -> Result<Uuid, moltnet_voucher::VoucherError> {
    Uuid::parse_str(s).map_err(|e| moltnet_voucher::VoucherError::Store(e.to_string()))
}

fn to_voucher_err(e: DbError) -> moltnet_voucher::VoucherError {
    moltnet_voucher::VoucherError::Store(e.to_string())
}
