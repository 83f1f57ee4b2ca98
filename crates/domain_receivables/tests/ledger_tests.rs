//! Ledger Write Path Tests
//!
//! End-to-end tests of the entry writer through `ReceivablesService`, over
//! the in-memory adapters:
//! - Running balance and sequence chain across business events
//! - Validation of amounts and customers
//! - Serialization of concurrent writers for one customer
//! - Retry on lost sequence races
//!
//! # Test Organization
//!
//! - `balance_chain` - Balances and sequences produced by each event type
//! - `validation` - Rejected requests
//! - `concurrency` - Parallel writers
//! - `conflict_retry` - Store-level conflicts and their exhaustion
//! - `chain_properties` - Property tests over random event sequences

use core_kernel::{AdjustmentId, CustomerId, PaymentId, ReceiptId};
use domain_receivables::{
    EntryDirection, EntryRequest, LedgerConfig, LedgerError, ReferenceType,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use test_utils::{
    assert_chain_valid, assert_current_balance, AmountFixtures, DateFixtures, FlakyLedgerStore,
    TestLedger,
};

// ============================================================================
// TEST FIXTURES
// ============================================================================

/// A ledger whose store can be told to fail, plus the handle controlling it
fn flaky_ledger(config: LedgerConfig) -> (TestLedger, FlakyLedgerStore) {
    TestLedger::builder().with_config(config).build_flaky()
}

// ============================================================================
// BALANCE CHAIN
// ============================================================================

mod balance_chain {
    use super::*;

    #[tokio::test]
    async fn test_new_customer_has_zero_balance() {
        let ledger = TestLedger::new();
        let customer = ledger.customer().await;

        let balance = ledger.service.get_current_balance(customer).await.unwrap();

        assert_eq!(balance, Decimal::ZERO);
        assert!(ledger.entries(customer).await.is_empty());
    }

    #[tokio::test]
    async fn test_sale_then_partial_payment() {
        let ledger = TestLedger::new();
        let customer = ledger.customer().await;

        let sale = ledger.sale(customer, dec!(1000), DateFixtures::january(2)).await;
        let payment = ledger.payment(customer, dec!(400), DateFixtures::january(10)).await;

        assert_eq!(sale.sequence, 1);
        assert_eq!(sale.balance, dec!(1000));
        assert_eq!(payment.sequence, 2);
        assert_eq!(payment.balance, dec!(600));
        assert_eq!(
            ledger.service.get_current_balance(customer).await.unwrap(),
            dec!(600)
        );

        let account = ledger
            .service
            .get_account(customer, Default::default())
            .await
            .unwrap();
        assert_eq!(account.totals.total_debit, dec!(1000));
        assert_eq!(account.totals.total_payments, dec!(400));
        assert_eq!(account.totals.total_other_credits, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_overpayment_leaves_negative_balance() {
        let ledger = TestLedger::new();
        let customer = ledger.customer().await;

        ledger.sale(customer, dec!(100), DateFixtures::january(2)).await;
        let payment = ledger.payment(customer, dec!(250), DateFixtures::january(3)).await;

        assert_eq!(payment.balance, dec!(-150));
    }

    #[tokio::test]
    async fn test_every_event_type_extends_the_chain() {
        let ledger = TestLedger::new();
        let customer = ledger.customer().await;
        let service = &ledger.service;

        ledger.sale(customer, AmountFixtures::sale(), DateFixtures::january(2)).await;
        service
            .record_general_receipt(
                customer,
                ReceiptId::new(),
                dec!(50),
                "Cash at counter",
                DateFixtures::january(3),
            )
            .await
            .unwrap();
        ledger
            .approve_return(customer, AmountFixtures::return_credit(), DateFixtures::january(4))
            .await;
        service
            .record_adjustment(
                customer,
                AdjustmentId::new(),
                EntryDirection::Debit,
                AmountFixtures::fractional(),
                "Rounding correction",
            )
            .await
            .unwrap();
        service
            .record_payment(
                customer,
                PaymentId::new(),
                dec!(300),
                "Bank transfer",
                DateFixtures::january(5),
            )
            .await
            .unwrap();

        let entries = ledger.entries(customer).await;
        assert_eq!(entries.len(), 5);
        assert_chain_valid(&entries);
        // 1000 - 50 - 150 + 33.3333 - 300
        assert_current_balance(&entries, dec!(533.3333));
        assert_eq!(
            entries.iter().map(|e| e.reference_type).collect::<Vec<_>>(),
            vec![
                ReferenceType::Sale,
                ReferenceType::GeneralReceipt,
                ReferenceType::Return,
                ReferenceType::Adjustment,
                ReferenceType::Payment,
            ]
        );
    }

    #[tokio::test]
    async fn test_backdated_entry_is_chained_after_the_latest() {
        let ledger = TestLedger::new();
        let customer = ledger.customer().await;

        ledger.sale(customer, dec!(500), DateFixtures::february(1)).await;
        let backdated = ledger.payment(customer, dec!(200), DateFixtures::january(15)).await;

        assert_eq!(backdated.sequence, 2);
        assert_eq!(backdated.balance, dec!(300));
        assert_eq!(backdated.transaction_date, DateFixtures::january(15));
    }

    #[tokio::test]
    async fn test_customers_have_independent_chains() {
        let ledger = TestLedger::new();
        let first = ledger.customer().await;
        let second = ledger.customer().await;

        ledger.sale(first, dec!(100), DateFixtures::january(2)).await;
        let other = ledger.sale(second, dec!(70), DateFixtures::january(2)).await;

        assert_eq!(other.sequence, 1);
        assert_eq!(other.balance, dec!(70));
    }

    #[tokio::test]
    async fn test_record_return_is_written_once() {
        let ledger = TestLedger::new();
        let customer = ledger.customer().await;
        let sales_return = ledger
            .approve_return(customer, dec!(80), DateFixtures::january(5))
            .await;

        let again = ledger
            .service
            .record_return(
                customer,
                sales_return.id,
                dec!(80),
                "Return again",
                DateFixtures::january(5),
            )
            .await
            .unwrap();

        assert!(again.is_none());
        assert_eq!(ledger.entries(customer).await.len(), 1);
    }
}

// ============================================================================
// VALIDATION
// ============================================================================

mod validation {
    use super::*;

    #[tokio::test]
    async fn test_zero_amount_is_rejected() {
        let ledger = TestLedger::new();
        let customer = ledger.customer().await;

        let result = ledger
            .service
            .append(EntryRequest::debit(customer, Decimal::ZERO, ReferenceType::Sale))
            .await;

        assert!(matches!(result, Err(LedgerError::InvalidAmount(amount)) if amount.is_zero()));
        assert!(ledger.entries(customer).await.is_empty());
    }

    #[tokio::test]
    async fn test_negative_amount_is_rejected() {
        let ledger = TestLedger::new();
        let customer = ledger.customer().await;

        let result = ledger
            .service
            .append(EntryRequest::credit(customer, dec!(-5), ReferenceType::Payment))
            .await;

        assert!(matches!(result, Err(LedgerError::InvalidAmount(_))));
    }

    #[tokio::test]
    async fn test_unknown_customer_is_rejected() {
        let ledger = TestLedger::new();
        let stranger = CustomerId::new();

        let write = ledger
            .service
            .append(EntryRequest::debit(stranger, dec!(10), ReferenceType::Sale))
            .await;
        let read = ledger.service.get_current_balance(stranger).await;

        assert!(matches!(write, Err(LedgerError::CustomerNotFound(id)) if id == stranger));
        assert!(read.unwrap_err().is_not_found());
        assert_eq!(ledger.memory.entry_count().await, 0);
    }

    #[tokio::test]
    async fn test_balance_overflow_is_rejected() {
        let ledger = TestLedger::new();
        let customer = ledger.customer().await;
        ledger
            .service
            .append(EntryRequest::debit(customer, Decimal::MAX, ReferenceType::Sale))
            .await
            .unwrap();

        let result = ledger
            .service
            .append(EntryRequest::debit(customer, Decimal::MAX, ReferenceType::Sale))
            .await;

        assert!(matches!(result, Err(LedgerError::BalanceOverflow(id)) if id == customer));
        let entries = ledger.entries(customer).await;
        assert_eq!(entries.len(), 1);
        assert_current_balance(&entries, Decimal::MAX);

        let credit = ledger
            .service
            .append(EntryRequest::credit(customer, dec!(1), ReferenceType::Payment))
            .await
            .unwrap();
        assert_eq!(credit.sequence, 2);
    }
}

// ============================================================================
// CONCURRENCY
// ============================================================================

mod concurrency {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_two_concurrent_debits_do_not_lose_an_update() {
        let ledger = TestLedger::new();
        let customer = ledger.customer().await;

        let (a, b) = tokio::join!(
            ledger
                .service
                .append(EntryRequest::debit(customer, dec!(100), ReferenceType::Sale)),
            ledger
                .service
                .append(EntryRequest::debit(customer, dec!(50), ReferenceType::Sale)),
        );
        a.unwrap();
        b.unwrap();

        let entries = ledger.entries(customer).await;
        assert_eq!(entries.len(), 2);
        assert_chain_valid(&entries);
        assert_current_balance(&entries, dec!(150));
        assert!(entries[0].balance == dec!(100) || entries[0].balance == dec!(50));
        assert_eq!(entries[1].sequence, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_many_parallel_writers_keep_the_chain_intact() {
        let ledger = TestLedger::new();
        let customer = ledger.customer().await;

        let handles: Vec<_> = (1..=20)
            .map(|i| {
                let service = ledger.service.clone();
                tokio::spawn(async move {
                    let request = if i % 4 == 0 {
                        EntryRequest::credit(customer, Decimal::from(i), ReferenceType::Payment)
                    } else {
                        EntryRequest::debit(customer, Decimal::from(i), ReferenceType::Sale)
                    };
                    service.append(request).await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let entries = ledger.entries(customer).await;
        assert_eq!(entries.len(), 20);
        assert_chain_valid(&entries);
        // debits 1..=20 except multiples of 4 (sum 150), credits 4+8+12+16+20 (60)
        assert_current_balance(&entries, dec!(90));
    }
}

// ============================================================================
// CONFLICT RETRY
// ============================================================================

mod conflict_retry {
    use super::*;

    #[tokio::test]
    async fn test_conflicts_below_the_limit_are_retried() {
        let (ledger, flaky) = flaky_ledger(LedgerConfig::default());
        let customer = ledger.customer().await;
        ledger.sale(customer, dec!(10), DateFixtures::january(2)).await;

        flaky.conflict_next(2);
        let entry = ledger
            .service
            .append(EntryRequest::debit(customer, dec!(5), ReferenceType::Sale))
            .await
            .unwrap();

        assert_eq!(entry.sequence, 2);
        assert_eq!(entry.balance, dec!(15));
        assert_chain_valid(&ledger.entries(customer).await);
    }

    #[tokio::test]
    async fn test_exhausted_retries_surface_a_conflict() {
        let (ledger, flaky) = flaky_ledger(LedgerConfig::default());
        let customer = ledger.customer().await;

        flaky.conflict_next(3);
        let result = ledger
            .service
            .append(EntryRequest::debit(customer, dec!(5), ReferenceType::Sale))
            .await;

        match result {
            Err(LedgerError::ConcurrencyConflict { customer_id, attempts }) => {
                assert_eq!(customer_id, customer);
                assert_eq!(attempts, 3);
            }
            other => panic!("Expected ConcurrencyConflict, got {:?}", other),
        }
        assert!(ledger.entries(customer).await.is_empty());
    }

    #[tokio::test]
    async fn test_attempt_limit_is_configurable() {
        let config = LedgerConfig {
            max_append_attempts: 5,
            ..LedgerConfig::default()
        };
        let (ledger, flaky) = flaky_ledger(config);
        let customer = ledger.customer().await;

        flaky.conflict_next(4);
        let result = ledger
            .service
            .append(EntryRequest::debit(customer, dec!(5), ReferenceType::Sale))
            .await;

        assert!(result.is_ok());
    }
}

// ============================================================================
// CHAIN PROPERTIES
// ============================================================================

mod chain_properties {
    use super::*;
    use proptest::prelude::*;
    use test_utils::entry_ops_strategy;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_any_event_sequence_yields_a_valid_chain(ops in entry_ops_strategy(24)) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();

            let (entries, expected) = runtime.block_on(async {
                let ledger = TestLedger::new();
                let customer = ledger.customer().await;
                let mut expected = Decimal::ZERO;
                for (direction, amount, reference_type) in &ops {
                    ledger
                        .service
                        .append(EntryRequest::new(customer, *direction, *amount, *reference_type))
                        .await
                        .unwrap();
                    expected += direction.signed(*amount);
                }
                (ledger.entries(customer).await, expected)
            });

            prop_assert_eq!(entries.len(), ops.len());
            assert_chain_valid(&entries);
            if let Some(last) = entries.last() {
                prop_assert_eq!(last.balance, expected);
            }
        }
    }
}
