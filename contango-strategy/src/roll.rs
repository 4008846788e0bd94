use contango_store::quote::QuoteDate;
use contango_instrument::symbol::SymbolCode;
use rust_decimal::Decimal;

/// Roll signal for one evaluation day: the basis between the front-month future and the VIX
/// spot, normalised by the days left to expiry and rounded to two decimal places.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RollSignal {
    pub date: QuoteDate,
    pub front_future: SymbolCode,
    pub future_close: Decimal,
    pub vix_close: Decimal,
    pub days_left: i64,
    pub roll: Decimal,
}

impl RollSignal {
    /// Compute the signal. `days_left` must be positive - the caller no-ops at expiry.
    pub fn compute(
        date: QuoteDate,
        front_future: SymbolCode,
        future_close: Decimal,
        vix_close: Decimal,
        days_left: i64,
    ) -> Self {
        let mut roll = ((future_close - vix_close) / Decimal::from(days_left)).round_dp(2);
        // Pin the scale so the ledger line is byte-stable across re-runs
        roll.rescale(2);

        Self {
            date,
            front_future,
            future_close,
            vix_close,
            days_left,
            roll,
        }
    }

    /// The line this evaluation writes to the idempotence ledger. Its presence proves the
    /// strategy already ran for this `(Date, Symbol)`.
    pub fn ledger_line(&self) -> String {
        format!(
            "{},{},{},{},{},{}\n",
            self.date, self.front_future, self.future_close, self.vix_close, self.days_left, self.roll
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn signal(future_close: Decimal, vix_close: Decimal, days_left: i64) -> RollSignal {
        RollSignal::compute(
            "20170601".parse().unwrap(),
            "VXM7".into(),
            future_close,
            vix_close,
            days_left,
        )
    }

    #[test]
    fn test_roll_in_contango() {
        assert_eq!(signal(dec!(12.00), dec!(10.00), 20).roll, dec!(0.10));
    }

    #[test]
    fn test_roll_in_backwardation() {
        assert_eq!(signal(dec!(13.00), dec!(15.00), 20).roll, dec!(-0.10));
    }

    #[test]
    fn test_roll_rounds_to_two_decimal_places() {
        // 1.00 / 3 = 0.333...
        assert_eq!(signal(dec!(11.00), dec!(10.00), 3).roll, dec!(0.33));
    }

    #[test]
    fn test_ledger_line_shape() {
        let line = signal(dec!(12.00), dec!(10.00), 20).ledger_line();
        assert_eq!(line, "20170601,VXM7,12.00,10.00,20,0.10\n");
    }
}
