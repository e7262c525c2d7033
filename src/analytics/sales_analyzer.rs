use crate::dataset::{CleanRecord, Sentiment};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// 主要指標
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SalesSummary {
    /// 売上合計
    pub total_sales: f64,
    /// 平均単価（0件なら0）
    pub average_ticket: f64,
    /// 取引件数
    pub transactions: usize,
}

impl SalesSummary {
    pub fn from_records(records: &[&CleanRecord]) -> Self {
        let total_sales: f64 = records.iter().map(|r| r.price).sum();
        let transactions = records.len();
        let average_ticket = if transactions > 0 {
            total_sales / transactions as f64
        } else {
            0.0
        };

        Self {
            total_sales,
            average_ticket,
            transactions,
        }
    }
}

/// カテゴリ別売上
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySales {
    pub category: String,
    pub total_sales: f64,
    pub product_count: usize,
}

/// 商品別売上
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSales {
    pub product_name: String,
    pub total_sales: f64,
}

/// Price totals and row counts per category, ordered by category name
pub fn sales_by_category(records: &[&CleanRecord]) -> Vec<CategorySales> {
    let mut by_category: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for record in records {
        let entry = by_category.entry(record.category.as_str()).or_insert((0.0, 0));
        entry.0 += record.price;
        entry.1 += 1;
    }

    by_category
        .into_iter()
        .map(|(category, (total_sales, product_count))| CategorySales {
            category: category.to_string(),
            total_sales,
            product_count,
        })
        .collect()
}

/// Row count per category, most frequent first (ties by name)
pub fn category_counts(records: &[&CleanRecord]) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = sales_by_category(records)
        .into_iter()
        .map(|c| (c.category, c.product_count))
        .collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}

/// Products with the highest summed price
pub fn top_products(records: &[&CleanRecord], limit: usize) -> Vec<ProductSales> {
    let mut by_product: HashMap<&str, f64> = HashMap::new();
    for record in records {
        *by_product.entry(record.product_name.as_str()).or_insert(0.0) += record.price;
    }

    let mut products: Vec<ProductSales> = by_product
        .into_iter()
        .map(|(product_name, total_sales)| ProductSales {
            product_name: product_name.to_string(),
            total_sales,
        })
        .collect();
    products.sort_by(|a, b| {
        b.total_sales
            .partial_cmp(&a.total_sales)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.product_name.cmp(&b.product_name))
    });
    products.truncate(limit);
    products
}

/// Rows with the largest discount; rows without a discount are skipped.
/// Equal discounts keep table order.
pub fn top_discounts<'a>(records: &[&'a CleanRecord], limit: usize) -> Vec<&'a CleanRecord> {
    let mut discounted: Vec<&CleanRecord> = records
        .iter()
        .copied()
        .filter(|r| r.discount_percent.is_some())
        .collect();
    discounted.sort_by(|a, b| {
        b.discount_percent
            .partial_cmp(&a.discount_percent)
            .unwrap_or(Ordering::Equal)
    });
    discounted.truncate(limit);
    discounted
}

/// Count per sentiment bucket, always all four buckets in fixed order
pub fn sentiment_breakdown(records: &[&CleanRecord]) -> Vec<(Sentiment, usize)> {
    Sentiment::ALL
        .iter()
        .map(|bucket| {
            let count = records.iter().filter(|r| r.sentiment == *bucket).count();
            (*bucket, count)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<CleanRecord> {
        vec![
            CleanRecord::new("Electronics", "Cable", 200.0)
                .with_rating(4.5)
                .with_discount_percent(50.0),
            CleanRecord::new("Books", "Novel", 300.0).with_rating(3.2),
            CleanRecord::new("Electronics", "Phone", 1000.0)
                .with_rating(2.0)
                .with_discount_percent(10.0),
            CleanRecord::new("Electronics", "Cable", 100.0).with_discount_percent(50.0),
        ]
    }

    #[test]
    fn test_summary() {
        let records = records();
        let refs: Vec<&CleanRecord> = records.iter().collect();
        let summary = SalesSummary::from_records(&refs);

        assert_eq!(summary.total_sales, 1600.0);
        assert_eq!(summary.average_ticket, 400.0);
        assert_eq!(summary.transactions, 4);
    }

    #[test]
    fn test_summary_of_empty_selection() {
        assert_eq!(SalesSummary::from_records(&[]), SalesSummary::default());
    }

    #[test]
    fn test_sales_by_category() {
        let records = records();
        let refs: Vec<&CleanRecord> = records.iter().collect();
        let by_category = sales_by_category(&refs);

        assert_eq!(by_category.len(), 2);
        assert_eq!(by_category[0].category, "Books");
        assert_eq!(by_category[0].total_sales, 300.0);
        assert_eq!(by_category[1].category, "Electronics");
        assert_eq!(by_category[1].total_sales, 1300.0);
        assert_eq!(by_category[1].product_count, 3);
    }

    #[test]
    fn test_category_counts_most_frequent_first() {
        let records = records();
        let refs: Vec<&CleanRecord> = records.iter().collect();
        assert_eq!(
            category_counts(&refs),
            vec![("Electronics".to_string(), 3), ("Books".to_string(), 1)]
        );
    }

    #[test]
    fn test_top_products_sums_duplicates() {
        let records = records();
        let refs: Vec<&CleanRecord> = records.iter().collect();
        let top = top_products(&refs, 2);

        assert_eq!(top.len(), 2);
        assert_eq!(top[0].product_name, "Phone");
        assert_eq!(top[1].product_name, "Cable");
        assert_eq!(top[1].total_sales, 300.0);
    }

    #[test]
    fn test_top_products_ties_break_by_name() {
        let records = vec![
            CleanRecord::new("A", "Zeta", 10.0),
            CleanRecord::new("A", "Alpha", 10.0),
        ];
        let refs: Vec<&CleanRecord> = records.iter().collect();
        let names: Vec<String> = top_products(&refs, 5)
            .into_iter()
            .map(|p| p.product_name)
            .collect();
        assert_eq!(names, vec!["Alpha", "Zeta"]);
    }

    #[test]
    fn test_top_discounts() {
        let records = records();
        let refs: Vec<&CleanRecord> = records.iter().collect();
        let top = top_discounts(&refs, 10);

        assert_eq!(top.len(), 3);
        assert_eq!(top[0].price, 200.0);
        assert_eq!(top[1].price, 100.0);
        assert_eq!(top[2].product_name, "Phone");
    }

    #[test]
    fn test_sentiment_breakdown() {
        let records = records();
        let refs: Vec<&CleanRecord> = records.iter().collect();
        assert_eq!(
            sentiment_breakdown(&refs),
            vec![
                (Sentiment::Positive, 1),
                (Sentiment::Neutral, 1),
                (Sentiment::Negative, 1),
                (Sentiment::Unrated, 1),
            ]
        );
    }
}
