use kanau::processor::Processor;
use thiserror::Error;
use time::OffsetDateTime;

use crate::framework::{DatabaseAccessor, DatabaseProcessor};

const RECORD_COLUMNS: &str =
    "id, amount, payer_name, payer_tax_id, status, created_at, received_at, transfer_id";

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct InvoiceRecord {
    pub id: String,
    pub amount: i64,
    pub payer_name: String,
    pub payer_tax_id: String,
    pub status: InvoiceStatus,
    pub created_at: OffsetDateTime,
    pub received_at: Option<OffsetDateTime>,
    pub transfer_id: Option<String>,
}

/// Lifecycle of an invoice. Only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Issued,
    Received,
}

impl InvoiceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            InvoiceStatus::Issued => "issued",
            InvoiceStatus::Received => "received",
        }
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInvoiceRecord {
    pub id: String,
    pub amount: i64,
    pub payer_name: String,
    pub payer_tax_id: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct InvoiceStats {
    pub total: i64,
    pub issued: i64,
    pub received: i64,
    /// Sum of the amounts of received invoices, in cents.
    pub volume: i64,
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("invoice already recorded: {0}")]
    DuplicateKey(String),

    #[error("invoice not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

fn map_insert_error(invoice_id: &str, e: sqlx::Error) -> LedgerError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            LedgerError::DuplicateKey(invoice_id.to_string())
        }
        _ => LedgerError::Database(e),
    }
}

#[derive(Debug, Clone)]
/// Insert a single invoice in `issued` state.
pub struct CreateInvoiceRecord {
    pub record: NewInvoiceRecord,
}

impl Processor<CreateInvoiceRecord> for DatabaseProcessor {
    type Output = InvoiceRecord;
    type Error = LedgerError;
    #[tracing::instrument(skip_all, err, name = "SQL:CreateInvoiceRecord")]
    async fn process(&self, insert: CreateInvoiceRecord) -> Result<InvoiceRecord, LedgerError> {
        let NewInvoiceRecord {
            id,
            amount,
            payer_name,
            payer_tax_id,
        } = insert.record;

        let sql = format!(
            "INSERT INTO invoices (id, amount, payer_name, payer_tax_id, status, created_at) \
             VALUES (?, ?, ?, ?, 'issued', ?) \
             RETURNING {RECORD_COLUMNS}"
        );
        sqlx::query_as::<_, InvoiceRecord>(&sql)
            .bind(&id)
            .bind(amount)
            .bind(payer_name)
            .bind(payer_tax_id)
            .bind(OffsetDateTime::now_utc())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_insert_error(&id, e))
    }
}

#[derive(Debug, Clone)]
/// Transition an invoice from `issued` to `received`.
///
/// The conditional update makes the transition happen at most once. When the
/// record is already `received` the stored record is returned untouched.
pub struct MarkInvoiceReceived {
    pub invoice_id: String,
    pub transfer_id: String,
}

impl Processor<MarkInvoiceReceived> for DatabaseProcessor {
    type Output = InvoiceRecord;
    type Error = LedgerError;
    #[tracing::instrument(skip_all, err, name = "SQL:MarkInvoiceReceived")]
    async fn process(&self, cmd: MarkInvoiceReceived) -> Result<InvoiceRecord, LedgerError> {
        let sql = format!(
            "UPDATE invoices \
             SET status = 'received', received_at = ?, transfer_id = ? \
             WHERE id = ? AND status = 'issued' \
             RETURNING {RECORD_COLUMNS}"
        );
        let updated = sqlx::query_as::<_, InvoiceRecord>(&sql)
            .bind(OffsetDateTime::now_utc())
            .bind(&cmd.transfer_id)
            .bind(&cmd.invoice_id)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(record) = updated {
            return Ok(record);
        }

        self.process(GetInvoiceRecordById {
            invoice_id: cmd.invoice_id.clone(),
        })
        .await?
        .ok_or(LedgerError::NotFound(cmd.invoice_id))
    }
}

#[derive(Debug, Clone)]
pub struct GetInvoiceRecordById {
    pub invoice_id: String,
}

impl Processor<GetInvoiceRecordById> for DatabaseProcessor {
    type Output = Option<InvoiceRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetInvoiceRecordById")]
    async fn process(
        &self,
        query: GetInvoiceRecordById,
    ) -> Result<Option<InvoiceRecord>, sqlx::Error> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM invoices WHERE id = ?");
        sqlx::query_as::<_, InvoiceRecord>(&sql)
            .bind(query.invoice_id)
            .fetch_optional(&self.pool)
            .await
    }
}

#[derive(Debug, Clone, Copy)]
/// Aggregate counts over the whole ledger.
pub struct GetInvoiceStats;

impl Processor<GetInvoiceStats> for DatabaseProcessor {
    type Output = InvoiceStats;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetInvoiceStats")]
    async fn process(&self, _query: GetInvoiceStats) -> Result<InvoiceStats, sqlx::Error> {
        sqlx::query_as::<_, InvoiceStats>(
            r#"
            SELECT
                COUNT(*) AS total,
                COALESCE(SUM(CASE WHEN status = 'issued' THEN 1 ELSE 0 END), 0) AS issued,
                COALESCE(SUM(CASE WHEN status = 'received' THEN 1 ELSE 0 END), 0) AS received,
                COALESCE(SUM(CASE WHEN status = 'received' THEN amount ELSE 0 END), 0) AS volume
            FROM invoices
            "#,
        )
        .fetch_one(&self.pool)
        .await
    }
}

#[derive(Debug, Clone, Copy)]
/// Most recently issued invoices, newest first.
pub struct ListRecentInvoiceRecords {
    pub limit: u32,
}

impl Processor<ListRecentInvoiceRecords> for DatabaseProcessor {
    type Output = Vec<InvoiceRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListRecentInvoiceRecords")]
    async fn process(
        &self,
        query: ListRecentInvoiceRecords,
    ) -> Result<Vec<InvoiceRecord>, sqlx::Error> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM invoices ORDER BY created_at DESC, rowid DESC LIMIT ?"
        );
        sqlx::query_as::<_, InvoiceRecord>(&sql)
            .bind(i64::from(query.limit))
            .fetch_all(&self.pool)
            .await
    }
}

impl InvoiceRecord {
    pub fn is_received(&self) -> bool {
        self.status == InvoiceStatus::Received
    }

    /// Insert many invoices in a single statement.
    ///
    /// Meant to run on a [`TransactionProcessor`](crate::framework::TransactionProcessor)
    /// so that a batch lands entirely or not at all.
    pub async fn insert_many(
        db: &mut impl DatabaseAccessor,
        records: Vec<NewInvoiceRecord>,
    ) -> Result<u64, LedgerError> {
        if records.is_empty() {
            return Ok(0);
        }

        let ids: Vec<String> = records.iter().map(|r| r.id.clone()).collect();
        let now = OffsetDateTime::now_utc();

        let mut query_builder = sqlx::QueryBuilder::<sqlx::Sqlite>::new(
            "INSERT INTO invoices (id, amount, payer_name, payer_tax_id, status, created_at) ",
        );
        query_builder.push_values(records, |mut b, record| {
            b.push_bind(record.id)
                .push_bind(record.amount)
                .push_bind(record.payer_name)
                .push_bind(record.payer_tax_id)
                .push_bind(InvoiceStatus::Issued)
                .push_bind(now);
        });

        let result = query_builder
            .build()
            .execute(db.acquire())
            .await
            .map_err(|e| map_insert_error(&ids.join(","), e))?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::TransactionProcessor;
    use crate::framework::testing::memory_pool;

    fn new_record(id: &str, amount: i64) -> NewInvoiceRecord {
        NewInvoiceRecord {
            id: id.to_string(),
            amount,
            payer_name: "Ana Souza".to_string(),
            payer_tax_id: "529.982.247-25".to_string(),
        }
    }

    fn assert_received_pairing(record: &InvoiceRecord) {
        assert_eq!(record.received_at.is_none(), record.transfer_id.is_none());
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let db = DatabaseProcessor {
            pool: memory_pool().await,
        };
        let created = db
            .process(CreateInvoiceRecord {
                record: new_record("inv-1", 1500),
            })
            .await
            .unwrap();
        assert_eq!(created.status, InvoiceStatus::Issued);
        assert_eq!(created.amount, 1500);
        assert_received_pairing(&created);

        let fetched = db
            .process(GetInvoiceRecordById {
                invoice_id: "inv-1".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(fetched, Some(created));
    }

    #[tokio::test]
    async fn test_duplicate_create_is_rejected() {
        let db = DatabaseProcessor {
            pool: memory_pool().await,
        };
        db.process(CreateInvoiceRecord {
            record: new_record("inv-1", 1500),
        })
        .await
        .unwrap();
        let err = db
            .process(CreateInvoiceRecord {
                record: new_record("inv-1", 900),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateKey(id) if id == "inv-1"));
    }

    #[tokio::test]
    async fn test_mark_received_is_idempotent() {
        let db = DatabaseProcessor {
            pool: memory_pool().await,
        };
        db.process(CreateInvoiceRecord {
            record: new_record("inv-1", 1500),
        })
        .await
        .unwrap();

        let first = db
            .process(MarkInvoiceReceived {
                invoice_id: "inv-1".to_string(),
                transfer_id: "tr-1".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(first.status, InvoiceStatus::Received);
        assert_eq!(first.transfer_id.as_deref(), Some("tr-1"));
        assert_received_pairing(&first);

        let second = db
            .process(MarkInvoiceReceived {
                invoice_id: "inv-1".to_string(),
                transfer_id: "tr-1".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(first, second);

        // a different transfer id does not overwrite the first settlement
        let third = db
            .process(MarkInvoiceReceived {
                invoice_id: "inv-1".to_string(),
                transfer_id: "tr-2".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(third.transfer_id.as_deref(), Some("tr-1"));
    }

    #[tokio::test]
    async fn test_mark_received_unknown() {
        let db = DatabaseProcessor {
            pool: memory_pool().await,
        };
        let err = db
            .process(MarkInvoiceReceived {
                invoice_id: "missing".to_string(),
                transfer_id: "tr-1".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(id) if id == "missing"));
    }

    #[tokio::test]
    async fn test_half_settled_row_violates_check() {
        let pool = memory_pool().await;
        let result = sqlx::query(
            "INSERT INTO invoices (id, amount, payer_name, payer_tax_id, status, created_at, transfer_id) \
             VALUES ('x', 10, 'n', 't', 'issued', '2026-01-01T00:00:00Z', 'tr')",
        )
        .execute(&pool)
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_insert_many_in_transaction_and_stats() {
        let pool = memory_pool().await;
        let mut tx = TransactionProcessor {
            tx: pool.begin().await.unwrap(),
        };
        let inserted = InvoiceRecord::insert_many(
            &mut tx,
            vec![
                new_record("a", 1000),
                new_record("b", 2000),
                new_record("c", 3000),
            ],
        )
        .await
        .unwrap();
        tx.tx.commit().await.unwrap();
        assert_eq!(inserted, 3);

        let db = DatabaseProcessor { pool };
        db.process(MarkInvoiceReceived {
            invoice_id: "b".to_string(),
            transfer_id: "tr-b".to_string(),
        })
        .await
        .unwrap();

        let stats = db.process(GetInvoiceStats).await.unwrap();
        assert_eq!(
            stats,
            InvoiceStats {
                total: 3,
                issued: 2,
                received: 1,
                volume: 2000,
            }
        );

        let recent = db
            .process(ListRecentInvoiceRecords { limit: 2 })
            .await
            .unwrap();
        assert_eq!(recent.len(), 2);
    }

    #[tokio::test]
    async fn test_insert_many_rolls_back_on_duplicate() {
        let pool = memory_pool().await;
        let db = DatabaseProcessor { pool: pool.clone() };
        db.process(CreateInvoiceRecord {
            record: new_record("b", 2000),
        })
        .await
        .unwrap();

        let mut tx = TransactionProcessor {
            tx: pool.begin().await.unwrap(),
        };
        let result =
            InvoiceRecord::insert_many(&mut tx, vec![new_record("a", 1000), new_record("b", 1)])
                .await;
        assert!(matches!(result, Err(LedgerError::DuplicateKey(_))));
        tx.tx.rollback().await.unwrap();

        let stats = db.process(GetInvoiceStats).await.unwrap();
        assert_eq!(stats.total, 1);
    }

    #[tokio::test]
    async fn test_empty_ledger_stats() {
        let db = DatabaseProcessor {
            pool: memory_pool().await,
        };
        assert_eq!(
            db.process(GetInvoiceStats).await.unwrap(),
            InvoiceStats::default()
        );
    }
}
