//! Property tests for the risk governor state machine and exposure rules

use keel_core::{Position, Side};
use keel_risk_manager::{HaltReason, RiskGovernor, RiskLimits};
use proptest::prelude::*;
use rust_decimal::Decimal;

fn cents(v: i64) -> Decimal {
    Decimal::new(v, 2)
}

proptest! {
    /// Once halted, no equity path brings the governor back
    #[test]
    fn halted_never_resumes(balances in prop::collection::vec(0i64..500_000, 1..50)) {
        let _ = env_logger::try_init();
        let mut gov = RiskGovernor::new("BTCUSDT", RiskLimits::default());
        gov.on_equity(cents(100_000));
        gov.halt(HaltReason::Manual("test".to_string()));

        for b in balances {
            prop_assert_eq!(gov.on_equity(cents(b)), None);
            prop_assert!(!gov.is_active());
        }
    }

    /// The kill switch fires at most once per session
    #[test]
    fn kill_switch_fires_at_most_once(balances in prop::collection::vec(0i64..200_000, 1..50)) {
        let mut gov = RiskGovernor::new("BTCUSDT", RiskLimits::default());
        let mut fired = 0;
        for b in balances {
            if gov.on_equity(cents(b)).is_some() {
                fired += 1;
            }
        }
        prop_assert!(fired <= 1);
    }

    /// The side that reduces inventory is never suppressed
    #[test]
    fn reducing_side_always_allowed(
        size_milli in 1i64..10_000,
        notional in 1i64..5_000,
        proposed in 0i64..5_000,
        long in any::<bool>(),
    ) {
        let gov = RiskGovernor::new("BTCUSDT", RiskLimits::default());
        let mut pos = Position::flat("BTCUSDT");
        let sign = if long { Decimal::ONE } else { Decimal::NEGATIVE_ONE };
        pos.size = Decimal::new(size_milli, 3) * sign;
        pos.notional_value = Decimal::from(notional);

        let reducing = if long { Side::Sell } else { Side::Buy };
        prop_assert!(gov.check_exposure(&pos, reducing, Decimal::from(proposed)).is_allowed());
    }
}
