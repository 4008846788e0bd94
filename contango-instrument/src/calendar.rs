use crate::{maturity::Maturity, symbol::SymbolCode};
use chrono::{Datelike, Days, NaiveDate, Weekday};
use smol_str::format_smolstr;

/// Futures month codes, January through December.
pub const MONTH_CODES: [char; 12] = ['F', 'G', 'H', 'J', 'K', 'M', 'N', 'Q', 'U', 'V', 'X', 'Z'];

/// Third Friday of the given calendar month.
pub fn third_friday(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_weekday_of_month_opt(year, month, Weekday::Fri, 3)
        .expect("every calendar month contains a third Friday")
}

/// Standard VIX monthly futures expiry for the contract month `(year, month)`: the Wednesday
/// 30 days prior to the third Friday of the following calendar month.
fn expiry_for_contract_month(year: i32, month: u32) -> NaiveDate {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    third_friday(next_year, next_month) - Days::new(30)
}

/// Next standard VIX monthly futures expiry on or after `date`.
pub fn vix_expiry_on_or_after(date: NaiveDate) -> NaiveDate {
    let mut year = date.year();
    let mut month = date.month();

    loop {
        let expiry = expiry_for_contract_month(year, month);
        if expiry >= date {
            return expiry;
        }
        (year, month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    }
}

/// Contract month of the front-month future as of `date`.
pub fn front_month_maturity(date: NaiveDate) -> Maturity {
    Maturity::from_date(vix_expiry_on_or_after(date))
}

/// Symbol of the front-month futures contract for `root` as of `date`: root + month code +
/// single-digit year.
///
/// eg/ `front_month_symbol("VX", 2017-11-14)` = `"VXX7"`.
pub fn front_month_symbol(root: &str, date: NaiveDate) -> SymbolCode {
    let expiry = vix_expiry_on_or_after(date);
    SymbolCode::new(format_smolstr!(
        "{}{}{}",
        root,
        MONTH_CODES[expiry.month0() as usize],
        expiry.year().rem_euclid(10)
    ))
}
