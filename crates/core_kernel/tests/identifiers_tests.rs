//! Unit tests for the Identifiers module
//!
//! Covers creation, parsing, conversion and display of the ledger's
//! identifier types.

use core_kernel::{
    CustomerId, LedgerEntryId, SaleId, PaymentId, ReturnId, ReceiptId, AdjustmentId,
};
use uuid::Uuid;

mod customer_id_tests {
    use super::*;

    #[test]
    fn test_new_generates_unique_ids() {
        let id1 = CustomerId::new();
        let id2 = CustomerId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_from_uuid() {
        let uuid = Uuid::new_v4();
        let id = CustomerId::from_uuid(uuid);
        assert_eq!(*id.as_uuid(), uuid);
    }

    #[test]
    fn test_from_str_without_prefix() {
        let uuid = Uuid::new_v4();
        let parsed: CustomerId = uuid.to_string().parse().unwrap();
        assert_eq!(*parsed.as_uuid(), uuid);
    }

    #[test]
    fn test_from_str_rejects_garbage() {
        assert!("CUS-not-a-uuid".parse::<CustomerId>().is_err());
    }

    #[test]
    fn test_json_is_bare_uuid() {
        let id = CustomerId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.as_uuid()));

        let deserialized: CustomerId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }
}

mod ledger_entry_id_tests {
    use super::*;

    #[test]
    fn test_new_v7_generates_time_ordered_ids() {
        let id1 = LedgerEntryId::new_v7();
        std::thread::sleep(std::time::Duration::from_millis(1));
        let id2 = LedgerEntryId::new_v7();
        assert!(id1 < id2);
    }
}

mod prefixes {
    use super::*;

    #[test]
    fn test_all_prefixes() {
        assert_eq!(CustomerId::prefix(), "CUS");
        assert_eq!(LedgerEntryId::prefix(), "LED");
        assert_eq!(SaleId::prefix(), "SAL");
        assert_eq!(PaymentId::prefix(), "PAY");
        assert_eq!(ReturnId::prefix(), "RET");
        assert_eq!(ReceiptId::prefix(), "RCP");
        assert_eq!(AdjustmentId::prefix(), "ADJ");
    }

    #[test]
    fn test_display_uses_prefix() {
        assert!(SaleId::new().to_string().starts_with("SAL-"));
        assert!(ReceiptId::new().to_string().starts_with("RCP-"));
    }
}

mod reference_ids {
    use super::*;

    #[test]
    fn test_different_id_types_share_uuid_space() {
        let uuid = Uuid::new_v4();
        let sale: Uuid = SaleId::from(uuid).into();
        let ret: Uuid = ReturnId::from(uuid).into();
        assert_eq!(sale, ret);
    }
}
