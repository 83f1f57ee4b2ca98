//! Read Path Tests
//!
//! Tests for statements, pending-credit overlay, summaries, open invoices
//! and ledger verification.
//!
//! # Test Organization
//!
//! - `statements` - Date filtering, ordering and totals
//! - `pending_overlay` - Transient credits merged at read time
//! - `summaries` - Per-customer and fleet-wide aggregates
//! - `open_invoices` - Unpaid sales
//! - `verification` - Chain integrity checks

use std::sync::Arc;

use chrono::NaiveDate;
use core_kernel::{CustomerId, DateRange, LedgerEntryId};
use domain_receivables::{
    EntryDirection, EntryRequest, LedgerEntry, LedgerError, ReceiptStatus, ReferenceType,
    SaleStatus, StatementLine,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use test_utils::{
    assert_newest_first, assert_summary_consistent, DateFixtures, RecordFixtures, StringFixtures,
    TestLedger, UnavailablePendingCredits,
};

fn january_range(from: u32, to: u32) -> DateRange {
    DateRange::between(
        NaiveDate::from_ymd_opt(2024, 1, from).unwrap(),
        NaiveDate::from_ymd_opt(2024, 1, to).unwrap(),
    )
    .unwrap()
}

mod statements {
    use super::*;

    #[tokio::test]
    async fn test_range_filters_lines_but_not_totals() {
        let ledger = TestLedger::new();
        let customer = ledger.customer().await;
        ledger.sale(customer, dec!(300), DateFixtures::january(2)).await;
        ledger.sale(customer, dec!(200), DateFixtures::january(15)).await;
        ledger.payment(customer, dec!(100), DateFixtures::february(3)).await;

        let account = ledger
            .service
            .get_account(customer, january_range(10, 31))
            .await
            .unwrap();

        assert_eq!(account.lines.len(), 1);
        assert_eq!(account.lines[0].amount(), dec!(200));
        assert_eq!(account.totals.total_debit, dec!(500));
        assert_eq!(account.totals.total_payments, dec!(100));
        assert_eq!(account.confirmed_balance, dec!(400));
        assert_eq!(account.current_balance, dec!(400));
    }

    #[tokio::test]
    async fn test_end_date_includes_the_whole_day() {
        let ledger = TestLedger::new();
        let customer = ledger.customer().await;
        ledger.sale(customer, dec!(10), DateFixtures::january(5)).await;

        let account = ledger
            .service
            .get_account(customer, january_range(1, 5))
            .await
            .unwrap();

        assert_eq!(account.lines.len(), 1);
    }

    #[tokio::test]
    async fn test_lines_are_newest_first() {
        let ledger = TestLedger::new();
        let customer = ledger.customer().await;
        ledger.sale(customer, dec!(10), DateFixtures::january(20)).await;
        ledger.sale(customer, dec!(20), DateFixtures::january(3)).await;
        ledger.payment(customer, dec!(5), DateFixtures::january(11)).await;

        let account = ledger
            .service
            .get_account(customer, DateRange::unbounded())
            .await
            .unwrap();

        assert_newest_first(&account);
        assert_eq!(
            account.lines.iter().map(StatementLine::amount).collect::<Vec<_>>(),
            vec![dec!(10), dec!(5), dec!(20)]
        );
    }

    #[tokio::test]
    async fn test_same_date_lines_show_latest_sequence_first() {
        let ledger = TestLedger::new();
        let customer = ledger.customer().await;
        let day = DateFixtures::january(8);
        ledger.sale(customer, dec!(10), day).await;
        ledger.sale(customer, dec!(20), day).await;

        let account = ledger
            .service
            .get_account(customer, DateRange::unbounded())
            .await
            .unwrap();

        let sequences: Vec<i64> = account.entries().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![2, 1]);
    }

    #[tokio::test]
    async fn test_unknown_customer_is_not_found() {
        let ledger = TestLedger::new();

        let result = ledger
            .service
            .get_account(CustomerId::new(), DateRange::unbounded())
            .await;

        assert!(result.unwrap_err().is_not_found());
    }
}

mod pending_overlay {
    use super::*;

    #[tokio::test]
    async fn test_pending_credit_lowers_displayed_balance_only() {
        let ledger = TestLedger::new();
        let customer = ledger.customer().await;
        ledger.sale(customer, dec!(1000), DateFixtures::january(2)).await;
        ledger.payment(customer, dec!(400), DateFixtures::january(10)).await;
        ledger.pending_receipt(customer, dec!(100), DateFixtures::january(12)).await;

        let account = ledger
            .service
            .get_account(customer, DateRange::unbounded())
            .await
            .unwrap();

        assert_eq!(account.current_balance, dec!(500));
        assert_eq!(account.confirmed_balance, dec!(600));
        assert_eq!(account.pending_total, dec!(100));
        assert_eq!(account.lines.len(), 3);
        assert!(account.lines[0].is_transient());
        assert_eq!(account.lines[0].balance(), dec!(500));
        assert_eq!(account.lines[0].reference_type(), ReferenceType::Return);

        assert_eq!(ledger.memory.entry_count().await, 2);
        assert_eq!(
            ledger.service.get_current_balance(customer).await.unwrap(),
            dec!(600)
        );
    }

    #[tokio::test]
    async fn test_repeated_reads_never_persist_pending_credits() {
        let ledger = TestLedger::new();
        let customer = ledger.customer().await;
        ledger.sale(customer, dec!(80), DateFixtures::january(2)).await;
        ledger.pending_receipt(customer, dec!(30), DateFixtures::january(3)).await;

        for _ in 0..3 {
            let account = ledger
                .service
                .get_account(customer, DateRange::unbounded())
                .await
                .unwrap();
            assert_eq!(account.current_balance, dec!(50));
        }

        assert_eq!(ledger.entries(customer).await.len(), 1);
    }

    #[tokio::test]
    async fn test_pending_credits_chain_oldest_first() {
        let ledger = TestLedger::new();
        let customer = ledger.customer().await;
        ledger.sale(customer, dec!(500), DateFixtures::january(2)).await;
        ledger.pending_receipt(customer, dec!(50), DateFixtures::january(9)).await;
        ledger.pending_receipt(customer, dec!(20), DateFixtures::january(4)).await;

        let account = ledger
            .service
            .get_account(customer, DateRange::unbounded())
            .await
            .unwrap();

        let transient: Vec<(Decimal, Decimal)> = account
            .lines
            .iter()
            .filter(|line| line.is_transient())
            .map(|line| (line.amount(), line.balance()))
            .collect();
        assert_eq!(transient, vec![(dec!(50), dec!(430)), (dec!(20), dec!(480))]);
        assert_eq!(account.current_balance, dec!(430));
    }

    #[tokio::test]
    async fn test_settled_receipts_are_not_overlaid() {
        let ledger = TestLedger::new();
        let customer = ledger.customer().await;
        ledger.sale(customer, dec!(100), DateFixtures::january(2)).await;
        let receipt = ledger.pending_receipt(customer, dec!(40), DateFixtures::january(3)).await;
        ledger
            .records
            .set_receipt_status(receipt.id, ReceiptStatus::Settled)
            .await
            .unwrap();

        let account = ledger
            .service
            .get_account(customer, DateRange::unbounded())
            .await
            .unwrap();

        assert_eq!(account.pending_total, Decimal::ZERO);
        assert_eq!(account.current_balance, dec!(100));
    }

    #[tokio::test]
    async fn test_pending_outside_range_still_counts_toward_balance() {
        let ledger = TestLedger::new();
        let customer = ledger.customer().await;
        ledger.sale(customer, dec!(100), DateFixtures::january(2)).await;
        ledger.pending_receipt(customer, dec!(25), DateFixtures::february(2)).await;

        let account = ledger
            .service
            .get_account(customer, january_range(1, 31))
            .await
            .unwrap();

        assert!(account.lines.iter().all(|line| !line.is_transient()));
        assert_eq!(account.current_balance, dec!(75));
    }

    #[tokio::test]
    async fn test_receipts_outage_falls_back_to_confirmed_view() {
        let ledger = TestLedger::builder()
            .with_pending_credits(Arc::new(UnavailablePendingCredits))
            .build();
        let customer = ledger.customer().await;
        ledger.sale(customer, dec!(90), DateFixtures::january(2)).await;

        let account = ledger
            .service
            .get_account(customer, DateRange::unbounded())
            .await
            .unwrap();

        assert_eq!(account.pending_total, Decimal::ZERO);
        assert_eq!(account.current_balance, dec!(90));
        assert_eq!(account.lines.len(), 1);
    }
}

mod summaries {
    use super::*;

    #[tokio::test]
    async fn test_fleet_totals_overflow_is_an_error() {
        let ledger = TestLedger::new();
        for _ in 0..2 {
            let customer = ledger.customer().await;
            ledger
                .service
                .append(EntryRequest::debit(customer, Decimal::MAX, ReferenceType::Sale))
                .await
                .unwrap();
        }

        let summaries = ledger.service.get_all_summaries().await.unwrap();
        let totals = ledger.service.get_fleet_totals().await;

        assert_eq!(summaries.len(), 2);
        assert!(matches!(totals, Err(LedgerError::FleetTotalsOverflow)));
    }

    #[tokio::test]
    async fn test_customer_without_entries_is_listed_with_zeros() {
        let ledger = TestLedger::new();
        let customer = ledger.customer().await;

        let summaries = ledger.service.get_all_summaries().await.unwrap();

        assert_eq!(summaries.len(), 1);
        let summary = &summaries[0];
        assert_eq!(summary.customer_id, customer);
        assert!(summary.customer_name.is_some());
        assert_eq!(summary.total_debit, Decimal::ZERO);
        assert_eq!(summary.total_credit, Decimal::ZERO);
        assert_eq!(summary.current_balance, Decimal::ZERO);
        assert_eq!(summary.remaining_debt, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_summaries_split_credit_categories() {
        let ledger = TestLedger::new();
        let customer = ledger.customer().await;
        ledger.sale(customer, dec!(1000), DateFixtures::january(2)).await;
        ledger.payment(customer, dec!(400), DateFixtures::january(10)).await;
        ledger.approve_return(customer, dec!(150), DateFixtures::january(12)).await;

        let summaries = ledger.service.get_all_summaries().await.unwrap();
        let summary = &summaries[0];

        assert_summary_consistent(summary);
        assert_eq!(summary.total_debit, dec!(1000));
        assert_eq!(summary.total_payments, dec!(400));
        assert_eq!(summary.total_returns, dec!(150));
        assert_eq!(summary.total_credit, dec!(550));
        assert_eq!(summary.current_balance, dec!(450));
        assert_eq!(summary.remaining_debt, dec!(450));
    }

    #[tokio::test]
    async fn test_summary_balance_matches_last_entry() {
        let ledger = TestLedger::new();
        let customer = ledger.customer().await;
        ledger.sale(customer, dec!(120.50), DateFixtures::january(2)).await;
        ledger.payment(customer, dec!(200), DateFixtures::january(3)).await;

        let summaries = ledger.service.get_all_summaries().await.unwrap();
        let balance = ledger.service.get_current_balance(customer).await.unwrap();

        assert_eq!(summaries[0].current_balance, balance);
        assert_eq!(summaries[0].remaining_debt, Decimal::ZERO);
        assert!(summaries[0].is_in_credit());
    }

    #[tokio::test]
    async fn test_orphaned_entries_are_reported_after_directory_customers() {
        let ledger = TestLedger::new();
        let known = ledger.customer().await;
        ledger.sale(known, dec!(10), DateFixtures::january(2)).await;
        let orphan = CustomerId::new();
        ledger
            .memory
            .insert_unchecked(LedgerEntry {
                id: LedgerEntryId::new(),
                customer_id: orphan,
                sequence: 1,
                direction: EntryDirection::Debit,
                amount: dec!(40),
                balance: dec!(40),
                reference_type: ReferenceType::Sale,
                reference_id: None,
                description: "Imported".to_string(),
                transaction_date: DateFixtures::january(1),
                created_at: DateFixtures::january(1),
            })
            .await;

        let summaries = ledger.service.get_all_summaries().await.unwrap();

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].customer_id, known);
        assert_eq!(summaries[1].customer_id, orphan);
        assert!(summaries[1].customer_name.is_none());

        let fleet = ledger.service.get_fleet_totals().await.unwrap();
        assert_eq!(fleet.customer_count, 2);
        assert_eq!(fleet.total_debit, dec!(50));
        assert_eq!(fleet.total_balance, dec!(50));
    }

    #[tokio::test]
    async fn test_fleet_totals_add_up_customer_summaries() {
        let ledger = TestLedger::new();
        let owing = ledger.customer().await;
        let in_credit = ledger.customer().await;
        ledger.sale(owing, dec!(300), DateFixtures::january(2)).await;
        ledger.sale(in_credit, dec!(50), DateFixtures::january(2)).await;
        ledger.payment(in_credit, dec!(80), DateFixtures::january(3)).await;

        let fleet = ledger.service.get_fleet_totals().await.unwrap();

        assert_eq!(fleet.customer_count, 2);
        assert_eq!(fleet.total_debit, dec!(350));
        assert_eq!(fleet.total_payments, dec!(80));
        assert_eq!(fleet.total_balance, dec!(270));
        assert_eq!(fleet.total_remaining_debt, dec!(300));
    }
}

mod open_invoices {
    use super::*;

    #[tokio::test]
    async fn test_only_unpaid_approved_sales_are_open() {
        let ledger = TestLedger::new();
        let customer = ledger.customer().await;

        let paid = RecordFixtures::approved_sale(customer, dec!(100), DateFixtures::january(2));
        let partial = RecordFixtures::approved_sale(customer, dec!(250), DateFixtures::january(5));
        let mut draft = RecordFixtures::approved_sale(customer, dec!(75), DateFixtures::january(6));
        draft.status = SaleStatus::Draft;
        let mut unpaid =
            RecordFixtures::approved_sale(customer, dec!(40), DateFixtures::january(3));
        unpaid.invoice_number = StringFixtures::invoice_number(7);

        ledger.record_sale(&paid).await;
        ledger.record_sale(&partial).await;
        ledger.record_sale(&unpaid).await;
        ledger.records.add_sale(draft).await;
        ledger.records.apply_sale_payment(paid.id, dec!(100)).await.unwrap();
        ledger.records.apply_sale_payment(partial.id, dec!(100)).await.unwrap();

        let invoices = ledger
            .service
            .get_open_invoices(customer, DateRange::unbounded())
            .await
            .unwrap();

        assert_eq!(invoices.len(), 2);
        assert_eq!(invoices[0].sale_id, unpaid.id);
        assert_eq!(invoices[0].outstanding, dec!(40));
        assert_eq!(invoices[1].sale_id, partial.id);
        assert_eq!(invoices[1].paid, dec!(100));
        assert_eq!(invoices[1].outstanding, dec!(150));
    }

    #[tokio::test]
    async fn test_range_limits_open_invoices() {
        let ledger = TestLedger::new();
        let customer = ledger.customer().await;
        ledger.sale(customer, dec!(10), DateFixtures::january(2)).await;
        ledger.sale(customer, dec!(20), DateFixtures::february(2)).await;

        let invoices = ledger
            .service
            .get_open_invoices(customer, january_range(1, 31))
            .await
            .unwrap();

        assert_eq!(invoices.len(), 1);
        assert_eq!(invoices[0].total, dec!(10));
    }
}

mod verification {
    use super::*;

    #[tokio::test]
    async fn test_intact_chain_verifies() {
        let ledger = TestLedger::new();
        let customer = ledger.customer().await;
        ledger.sale(customer, dec!(100), DateFixtures::january(2)).await;
        ledger.payment(customer, dec!(30), DateFixtures::january(3)).await;

        let verification = ledger.service.verify_ledger(customer).await.unwrap();

        assert!(verification.is_valid());
        assert_eq!(verification.entry_count, 2);
        assert_eq!(verification.current_balance, dec!(70));
    }

    #[tokio::test]
    async fn test_tampered_balance_is_detected() {
        let ledger = TestLedger::new();
        let customer = ledger.customer().await;
        ledger.sale(customer, dec!(100), DateFixtures::january(2)).await;
        ledger
            .memory
            .insert_unchecked(LedgerEntry {
                id: LedgerEntryId::new(),
                customer_id: customer,
                sequence: 2,
                direction: EntryDirection::Credit,
                amount: dec!(30),
                balance: dec!(90),
                reference_type: ReferenceType::Payment,
                reference_id: None,
                description: "Hand-edited".to_string(),
                transaction_date: DateFixtures::january(3),
                created_at: DateFixtures::january(3),
            })
            .await;

        let verification = ledger.service.verify_ledger(customer).await.unwrap();

        assert!(!verification.is_valid());
        let violation = verification.violation.unwrap();
        assert_eq!(violation.sequence, 2);
        assert_eq!(violation.expected_balance, Some(dec!(70)));
        assert_eq!(violation.recorded_balance, dec!(90));
    }

    #[tokio::test]
    async fn test_health_reports_store_status() {
        let ledger = TestLedger::new();

        assert!(ledger.service.health().await.is_healthy());
    }
}
