//! Reference-rate feed parsing.
//!
//! Both feeds share one envelope: an outer `Cube`, one `Cube time="..."` per
//! publication date, and one `Cube currency="..." rate="..."` per quote.

use std::str::FromStr;

use chrono::NaiveDate;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use refrates_common::{CurrencySet, HistoricalSeries, RateTable};
use rust_decimal::Decimal;
use tracing::debug;

use crate::error::{FxError, FxResult};

const ROOT_ELEMENT: &[u8] = b"Envelope";
const CUBE_ELEMENT: &[u8] = b"Cube";

/// One dated cube before validation.
#[derive(Debug)]
struct RawDay {
    date: NaiveDate,
    quotes: Vec<(String, String)>,
}

/// Parse the daily feed into a single table validated against current codes.
pub fn parse_daily(xml: &str) -> FxResult<RateTable> {
    let mut days = read_days(xml)?;
    if days.len() != 1 {
        return Err(FxError::Parse(format!(
            "daily feed must contain exactly one dated cube, found {}",
            days.len()
        )));
    }

    let day = days.remove(0);
    if day.quotes.is_empty() {
        return Err(FxError::Parse(format!(
            "daily cube for {} carries no quotes",
            day.date
        )));
    }

    let table = build_table(day, CurrencySet::Current)?;
    debug!(date = %table.date, currencies = table.len(), "Parsed daily feed");
    Ok(table)
}

/// Parse the historical feed. Each date is validated against historical codes.
pub fn parse_historical(xml: &str) -> FxResult<HistoricalSeries> {
    let days = read_days(xml)?;
    if days.is_empty() {
        return Err(FxError::Parse(
            "historical feed contains no dated cubes".to_string(),
        ));
    }

    let tables = days
        .into_iter()
        .map(|day| build_table(day, CurrencySet::Historical))
        .collect::<FxResult<Vec<_>>>()?;
    let series = HistoricalSeries::from_tables(tables);

    debug!(dates = series.len(), "Parsed historical feed");
    Ok(series)
}

fn build_table(day: RawDay, set: CurrencySet) -> FxResult<RateTable> {
    let mut table = RateTable::new(day.date);
    for (code, rate_text) in day.quotes {
        let currency = set
            .validate(&code)
            .map_err(|e| FxError::Parse(format!("{} on {}", e, day.date)))?;
        let rate = parse_rate(&rate_text).ok_or_else(|| {
            FxError::Parse(format!(
                "rate {:?} for {} on {} is not a number",
                rate_text, currency, day.date
            ))
        })?;
        table.insert(currency, rate)?;
    }
    Ok(table)
}

fn parse_rate(text: &str) -> Option<Decimal> {
    let text = text.trim();
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

fn read_days(xml: &str) -> FxResult<Vec<RawDay>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut root_seen = false;
    let mut outer_seen = false;
    let mut cube_depth = 0usize;
    let mut days: Vec<RawDay> = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                if visit_element(&e, &mut root_seen, &mut outer_seen, cube_depth, &mut days)? {
                    cube_depth += 1;
                }
            }
            Event::Empty(e) => {
                visit_element(&e, &mut root_seen, &mut outer_seen, cube_depth, &mut days)?;
            }
            Event::End(e) => {
                if e.local_name().as_ref() == CUBE_ELEMENT {
                    cube_depth = cube_depth.saturating_sub(1);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !root_seen {
        return Err(FxError::Parse("document has no root element".to_string()));
    }
    if !outer_seen {
        return Err(FxError::Parse("document has no rate cube".to_string()));
    }

    Ok(days)
}

/// Handle an opening element. Returns whether it was a `Cube`.
fn visit_element(
    e: &BytesStart<'_>,
    root_seen: &mut bool,
    outer_seen: &mut bool,
    cube_depth: usize,
    days: &mut Vec<RawDay>,
) -> FxResult<bool> {
    let name = e.local_name();
    if !*root_seen {
        if name.as_ref() != ROOT_ELEMENT {
            return Err(FxError::Parse(format!(
                "unexpected root element {:?}",
                String::from_utf8_lossy(name.as_ref())
            )));
        }
        *root_seen = true;
        return Ok(false);
    }

    if name.as_ref() != CUBE_ELEMENT {
        // Envelope metadata may sit beside the rate cube, never inside it.
        if cube_depth > 0 {
            return Err(FxError::Parse(format!(
                "unexpected element {:?} inside a rate cube",
                String::from_utf8_lossy(name.as_ref())
            )));
        }
        return Ok(false);
    }

    match cube_depth {
        0 => *outer_seen = true,
        1 => {
            let time = required_attribute(e, b"time")?;
            let date = NaiveDate::parse_from_str(time.trim(), "%Y-%m-%d")
                .map_err(|err| FxError::Parse(format!("invalid date {:?}: {}", time, err)))?;
            days.push(RawDay {
                date,
                quotes: Vec::new(),
            });
        }
        2 => {
            let currency = required_attribute(e, b"currency")?;
            let rate = required_attribute(e, b"rate")?;
            let day = days
                .last_mut()
                .ok_or_else(|| FxError::Parse("quote outside a dated cube".to_string()))?;
            day.quotes.push((currency, rate));
        }
        depth => {
            return Err(FxError::Parse(format!(
                "cube nested {} levels deep",
                depth + 1
            )))
        }
    }

    Ok(true)
}

fn required_attribute(e: &BytesStart<'_>, key: &[u8]) -> FxResult<String> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| FxError::Parse(err.to_string()))?;
        if attr.key.local_name().as_ref() == key {
            return Ok(attr.unescape_value()?.into_owned());
        }
    }
    Err(FxError::Parse(format!(
        "cube is missing the {:?} attribute",
        String::from_utf8_lossy(key)
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{DAILY_XML, HISTORICAL_XML};
    use refrates_common::Currency;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn envelope(cubes: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<gesmes:Envelope xmlns:gesmes="http://www.gesmes.org/xml/2002-08-01" xmlns="http://www.ecb.int/vocabulary/2002-08-01/eurofxref">
  <gesmes:subject>Reference rates</gesmes:subject>
  <Cube>{}</Cube>
</gesmes:Envelope>"#,
            cubes
        )
    }

    #[test]
    fn test_parse_daily() {
        let table = parse_daily(DAILY_XML).unwrap();

        assert_eq!(table.date, date(2024, 1, 5));
        assert_eq!(table.rate(&Currency::usd()), Some(dec!(1.0921)));
        assert_eq!(table.rate(&Currency::jpy()), Some(dec!(157.89)));
        assert_eq!(table.rate(&Currency::anchor()), Some(Decimal::ONE));
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn test_daily_codes_sorted_and_deduplicated() {
        let xml = envelope(
            r#"<Cube time="2024-01-05">
                 <Cube currency="usd" rate="1.09"/>
                 <Cube currency="GBP" rate="0.86"/>
                 <Cube currency="USD" rate="1.0921"/>
               </Cube>"#,
        );
        let table = parse_daily(&xml).unwrap();

        let codes: Vec<&str> = table.rates().keys().map(|c| c.code()).collect();
        assert_eq!(codes, vec!["GBP", "USD"]);
        assert_eq!(table.rate(&Currency::usd()), Some(dec!(1.0921)));
    }

    #[test]
    fn test_parse_historical_sorted_descending() {
        let series = parse_historical(HISTORICAL_XML).unwrap();

        assert_eq!(
            series.dates(),
            vec![date(2024, 1, 5), date(2024, 1, 4), date(2024, 1, 3)]
        );
        // GBP is missing on 2024-01-04 in the fixture.
        assert_eq!(series.get(date(2024, 1, 4)).unwrap().rate(&Currency::gbp()), None);
    }

    #[test]
    fn test_historical_accepts_legacy_codes() {
        let xml = envelope(
            r#"<Cube time="2022-12-30"><Cube currency="HRK" rate="7.5365"/></Cube>"#,
        );

        assert!(parse_historical(&xml).is_ok());
        assert!(matches!(parse_daily(&xml), Err(FxError::Parse(_))));
    }

    #[test]
    fn test_rejects_unknown_code() {
        let xml = envelope(
            r#"<Cube time="2024-01-05"><Cube currency="XYZ" rate="1.0"/></Cube>"#,
        );
        assert!(matches!(parse_daily(&xml), Err(FxError::Parse(_))));
    }

    #[test]
    fn test_rejects_bad_rates() {
        for rate in ["abc", "0", "-1.2", ""] {
            let xml = envelope(&format!(
                r#"<Cube time="2024-01-05"><Cube currency="USD" rate="{}"/></Cube>"#,
                rate
            ));
            assert!(
                matches!(parse_daily(&xml), Err(FxError::Parse(_))),
                "rate {:?} should be rejected",
                rate
            );
        }
    }

    #[test]
    fn test_rejects_anchor_quote() {
        let xml = envelope(
            r#"<Cube time="2024-01-05"><Cube currency="EUR" rate="1"/></Cube>"#,
        );
        assert!(matches!(parse_daily(&xml), Err(FxError::Parse(_))));
    }

    #[test]
    fn test_rejects_wrong_shape() {
        let wrong_root = r#"<rates><Cube><Cube time="2024-01-05"/></Cube></rates>"#;
        assert!(matches!(parse_daily(wrong_root), Err(FxError::Parse(_))));

        let no_cube = r#"<Envelope><subject>Reference rates</subject></Envelope>"#;
        assert!(matches!(parse_historical(no_cube), Err(FxError::Parse(_))));

        let missing_time = envelope(r#"<Cube><Cube currency="USD" rate="1.1"/></Cube>"#);
        assert!(matches!(parse_daily(&missing_time), Err(FxError::Parse(_))));

        let too_deep = envelope(
            r#"<Cube time="2024-01-05"><Cube currency="USD" rate="1.1"><Cube/></Cube></Cube>"#,
        );
        assert!(matches!(parse_daily(&too_deep), Err(FxError::Parse(_))));

        assert!(matches!(parse_daily("not xml at all"), Err(FxError::Parse(_))));
    }

    #[test]
    fn test_daily_requires_single_date() {
        assert!(matches!(parse_daily(HISTORICAL_XML), Err(FxError::Parse(_))));
        assert!(matches!(parse_daily(&envelope("")), Err(FxError::Parse(_))));
    }

    #[test]
    fn test_daily_rejects_date_without_quotes() {
        let open_close = r#"<Envelope><Cube><Cube time="2024-01-05"></Cube></Cube></Envelope>"#;
        assert!(matches!(parse_daily(open_close), Err(FxError::Parse(_))));

        let self_closing = envelope(r#"<Cube time="2024-01-05"/>"#);
        assert!(matches!(parse_daily(&self_closing), Err(FxError::Parse(_))));
    }

    #[test]
    fn test_historical_keeps_date_without_quotes() {
        let xml = envelope(
            r#"<Cube time="2024-01-05"><Cube currency="USD" rate="1.0921"/></Cube>
               <Cube time="2024-01-04"></Cube>"#,
        );
        let series = parse_historical(&xml).unwrap();

        assert_eq!(series.dates(), vec![date(2024, 1, 5), date(2024, 1, 4)]);
        assert!(series.get(date(2024, 1, 4)).unwrap().is_empty());
    }

    #[test]
    fn test_rejects_foreign_element_inside_cube() {
        let wrapped_quote = envelope(
            r#"<Cube time="2024-01-05"><x><Cube currency="USD" rate="1.1"/></x></Cube>"#,
        );
        assert!(matches!(parse_daily(&wrapped_quote), Err(FxError::Parse(_))));

        let stray_empty = envelope(
            r#"<Cube time="2024-01-05"><Cube currency="USD" rate="1.1"/><note/></Cube>"#,
        );
        assert!(matches!(parse_historical(&stray_empty), Err(FxError::Parse(_))));
    }
}
