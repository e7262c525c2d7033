use crate::dataset::{CleanRecord, SalesTable, Sentiment};
use crate::error::{PipelineError, PipelineResult};
use rusqlite::{params, OptionalExtension, Row};

use super::SalesDatabase;

impl SalesDatabase {
    /// テーブルが存在するか確認
    pub fn table_exists(&self) -> PipelineResult<bool> {
        let found: Option<i64> = self
            .connection
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![self.table_name()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Replace the whole table with `table`, keeping row order.
    ///
    /// Runs in one transaction: on any failure the previous contents stay as they were.
    pub fn replace_rows(&mut self, table: &SalesTable) -> PipelineResult<usize> {
        if table.is_empty() {
            return Err(PipelineError::GuardRejection);
        }

        let schema = self.schema_sql();
        let delete_sql = format!("DELETE FROM {}", self.quoted_table_name());
        let insert_sql = format!(
            "INSERT INTO {}
             (position, category, product_name, price, original_price, rating, rating_count, discount_percent, sentiment)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            self.quoted_table_name()
        );

        let tx = self.connection.transaction()?;
        tx.execute_batch(&schema)?;
        tx.execute(&delete_sql, [])?;
        {
            let mut stmt = tx.prepare(&insert_sql)?;
            for (position, record) in table.iter().enumerate() {
                stmt.execute(params![
                    position as i64,
                    record.category,
                    record.product_name,
                    record.price,
                    record.original_price,
                    record.rating,
                    record.rating_count,
                    record.discount_percent,
                    record.sentiment.as_str(),
                ])?;
            }
        }
        tx.commit()?;

        tracing::info!(
            table = self.table_name(),
            rows = table.len(),
            "Sales table replaced"
        );
        Ok(table.len())
    }

    /// 全行を取得（テーブルが無ければNone）
    pub fn fetch_rows(&self) -> PipelineResult<Option<SalesTable>> {
        if !self.table_exists()? {
            return Ok(None);
        }

        let sql = format!(
            "SELECT category, product_name, price, original_price, rating, rating_count, discount_percent, sentiment
             FROM {} ORDER BY position",
            self.quoted_table_name()
        );
        let mut stmt = self.connection.prepare(&sql)?;
        let record_iter = stmt.query_map([], Self::row_to_record)?;

        let mut records = Vec::new();
        for record in record_iter {
            records.push(record?);
        }

        Ok(Some(SalesTable::new(records)))
    }

    /// データベースの行をレコードに変換
    fn row_to_record(row: &Row) -> rusqlite::Result<CleanRecord> {
        let sentiment_str: String = row.get("sentiment")?;
        let sentiment = Sentiment::from_str_opt(&sentiment_str).ok_or_else(|| {
            rusqlite::Error::InvalidColumnType(
                7,
                "sentiment".to_string(),
                rusqlite::types::Type::Text,
            )
        })?;

        Ok(CleanRecord {
            category: row.get("category")?,
            product_name: row.get("product_name")?,
            price: row.get("price")?,
            original_price: row.get("original_price")?,
            rating: row.get("rating")?,
            rating_count: row.get("rating_count")?,
            discount_percent: row.get("discount_percent")?,
            sentiment,
        })
    }
}
