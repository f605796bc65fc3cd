//! Ledger and arrears aggregation.
//!
//! Both operations are read-only snapshots computed fresh per call: the
//! ledger walks every charge across a tenant's occupancy history plus every
//! payment linked through those charges, and the arrears report aggregates
//! billed and paid totals per tenant. Ledger entries sort by date ascending
//! with charges before payments on equal dates.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerEntryKind {
    Charge,
    Payment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    #[serde(rename = "type")]
    pub kind: LedgerEntryKind,
    pub amount: Decimal,
    pub date: NaiveDate,
}

/// Merge charge and payment lines into one chronological ledger.
pub fn build_ledger(
    charges: Vec<(NaiveDate, Decimal)>,
    payments: Vec<(NaiveDate, Decimal)>,
) -> Vec<LedgerEntry> {
    let mut entries: Vec<LedgerEntry> = charges
        .into_iter()
        .map(|(date, amount)| LedgerEntry {
            kind: LedgerEntryKind::Charge,
            amount,
            date,
        })
        .chain(payments.into_iter().map(|(date, amount)| LedgerEntry {
            kind: LedgerEntryKind::Payment,
            amount,
            date,
        }))
        .collect();
    entries.sort_by_key(|entry| (entry.date, tie_rank(entry.kind)));
    entries
}

fn tie_rank(kind: LedgerEntryKind) -> u8 {
    match kind {
        LedgerEntryKind::Charge => 0,
        LedgerEntryKind::Payment => 1,
    }
}

/// Every charge across every occupancy the tenant has ever held, and every
/// payment linked to those charges. Ledger charge amounts are rent plus the
/// water bill.
pub async fn tenant_ledger(pool: &PgPool, tenant_id: Uuid) -> AppResult<Vec<LedgerEntry>> {
    let charges: Vec<(NaiveDate, Decimal)> = sqlx::query_as(
        "SELECT c.charge_date, c.rent_amount + c.water_bill
         FROM monthly_charges c
         JOIN occupancies o ON o.id = c.occupancy_id
         WHERE o.tenant_id = $1",
    )
    .bind(tenant_id)
    .fetch_all(pool)
    .await?;

    let payments: Vec<(NaiveDate, Decimal)> = sqlx::query_as(
        "SELECT p.payment_date, p.amount
         FROM payments p
         JOIN monthly_charges c ON c.id = p.monthly_charge_id
         JOIN occupancies o ON o.id = c.occupancy_id
         WHERE o.tenant_id = $1",
    )
    .bind(tenant_id)
    .fetch_all(pool)
    .await?;

    Ok(build_ledger(charges, payments))
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ArrearsRow {
    pub tenant_id: Uuid,
    pub name: String,
    pub total_billed: Decimal,
    pub total_paid: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArrearsLine {
    pub tenant_id: Uuid,
    pub name: String,
    pub total_billed: Decimal,
    pub total_paid: Decimal,
    pub balance: Decimal,
}

/// Keep only tenants who still owe something.
pub fn arrears_lines(rows: Vec<ArrearsRow>) -> Vec<ArrearsLine> {
    rows.into_iter()
        .filter_map(|row| {
            let balance = row.total_billed - row.total_paid;
            if balance <= Decimal::ZERO {
                return None;
            }
            Some(ArrearsLine {
                tenant_id: row.tenant_id,
                name: row.name,
                total_billed: row.total_billed,
                total_paid: row.total_paid,
                balance,
            })
        })
        .collect()
}

/// Arrears snapshot across all tenants with at least one charge. Billed and
/// paid totals are aggregated separately before joining, so a charge with
/// several payments is never double-counted.
pub async fn arrears_report(pool: &PgPool) -> AppResult<Vec<ArrearsLine>> {
    let rows: Vec<ArrearsRow> = sqlx::query_as(
        "SELECT t.id AS tenant_id,
                t.name,
                b.total_billed,
                COALESCE(p.total_paid, 0) AS total_paid
         FROM tenants t
         JOIN (
             SELECT o.tenant_id, SUM(c.rent_amount + c.water_bill) AS total_billed
             FROM monthly_charges c
             JOIN occupancies o ON o.id = c.occupancy_id
             GROUP BY o.tenant_id
         ) b ON b.tenant_id = t.id
         LEFT JOIN (
             SELECT o.tenant_id, SUM(p.amount) AS total_paid
             FROM payments p
             JOIN monthly_charges c ON c.id = p.monthly_charge_id
             JOIN occupancies o ON o.id = c.occupancy_id
             GROUP BY o.tenant_id
         ) p ON p.tenant_id = t.id
         ORDER BY t.name",
    )
    .fetch_all(pool)
    .await?;

    Ok(arrears_lines(rows))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    use super::{arrears_lines, build_ledger, ArrearsRow, LedgerEntryKind};

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn ledger_interleaves_charges_and_payments_by_date() {
        let charges = vec![
            (date(2024, 2, 5), Decimal::from(5500)),
            (date(2024, 1, 5), Decimal::from(5500)),
        ];
        let payments = vec![
            (date(2024, 2, 10), Decimal::from(5500)),
            (date(2024, 1, 20), Decimal::from(5000)),
        ];

        let ledger = build_ledger(charges, payments);

        assert_eq!(ledger.len(), 4);
        assert_eq!(
            ledger
                .iter()
                .map(|entry| (entry.date, entry.kind))
                .collect::<Vec<_>>(),
            vec![
                (date(2024, 1, 5), LedgerEntryKind::Charge),
                (date(2024, 1, 20), LedgerEntryKind::Payment),
                (date(2024, 2, 5), LedgerEntryKind::Charge),
                (date(2024, 2, 10), LedgerEntryKind::Payment),
            ]
        );
    }

    #[test]
    fn charges_sort_before_payments_on_equal_dates() {
        let same_day = date(2024, 3, 1);
        let ledger = build_ledger(
            vec![(same_day, Decimal::from(6000))],
            vec![(same_day, Decimal::from(6000))],
        );

        assert_eq!(ledger[0].kind, LedgerEntryKind::Charge);
        assert_eq!(ledger[1].kind, LedgerEntryKind::Payment);
    }

    #[test]
    fn empty_history_yields_empty_ledger() {
        assert!(build_ledger(Vec::new(), Vec::new()).is_empty());
    }

    #[test]
    fn arrears_keeps_only_positive_balances() {
        let rows = vec![
            ArrearsRow {
                tenant_id: Uuid::new_v4(),
                name: "Achieng".to_string(),
                total_billed: Decimal::from(10000),
                total_paid: Decimal::from(6000),
            },
            ArrearsRow {
                tenant_id: Uuid::new_v4(),
                name: "Baraka".to_string(),
                total_billed: Decimal::from(8000),
                total_paid: Decimal::from(8000),
            },
            ArrearsRow {
                tenant_id: Uuid::new_v4(),
                name: "Chebet".to_string(),
                total_billed: Decimal::from(7000),
                total_paid: Decimal::from(7500),
            },
        ];

        let report = arrears_lines(rows);

        assert_eq!(report.len(), 1);
        assert_eq!(report[0].name, "Achieng");
        assert_eq!(report[0].balance, Decimal::from(4000));
    }

    #[test]
    fn tenant_with_no_payments_owes_everything() {
        let rows = vec![ArrearsRow {
            tenant_id: Uuid::new_v4(),
            name: "Dede".to_string(),
            total_billed: Decimal::from(5500),
            total_paid: Decimal::ZERO,
        }];

        let report = arrears_lines(rows);

        assert_eq!(report.len(), 1);
        assert_eq!(report[0].total_paid, Decimal::ZERO);
        assert_eq!(report[0].balance, Decimal::from(5500));
    }
}
