//! 거래소 응답 값 변환 헬퍼.
//!
//! 거래소는 금액을 문자열, 숫자, 지수 표기 등 제각각으로 보내므로
//! `f64`를 거치지 않고 바로 `Decimal`로 변환합니다.

use std::str::FromStr;

use gateway_core::{
    ExchangeKind, GatewayError, GatewayResult, OrderSide, PriceLevel, UpstreamError,
};
use rust_decimal::Decimal;
use serde_json::Value;

fn parse_error(exchange: ExchangeKind, message: String) -> GatewayError {
    GatewayError::upstream(exchange.as_str(), UpstreamError::Parse(message))
}

/// 문자열 금액 변환. 빈 문자열은 0으로 취급합니다.
pub(crate) fn decimal(exchange: ExchangeKind, raw: &str) -> GatewayResult<Decimal> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Decimal::ZERO);
    }
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|e| parse_error(exchange, format!("금액 변환 실패 '{}': {}", raw, e)))
}

/// 선택적 문자열 금액 변환. 없거나 비어 있으면 `None`.
pub(crate) fn opt_decimal(
    exchange: ExchangeKind,
    raw: Option<&str>,
) -> GatewayResult<Option<Decimal>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => decimal(exchange, value).map(Some),
    }
}

/// JSON 값(문자열 또는 숫자) 금액 변환.
pub(crate) fn decimal_value(exchange: ExchangeKind, value: &Value) -> GatewayResult<Decimal> {
    match value {
        Value::String(s) => decimal(exchange, s),
        Value::Number(n) => decimal(exchange, &n.to_string()),
        Value::Null => Ok(Decimal::ZERO),
        other => Err(parse_error(
            exchange,
            format!("금액 형식이 아닙니다: {}", other),
        )),
    }
}

/// `[[price, size, ...], ...]` 형식의 호가 배열 변환.
pub(crate) fn price_levels(
    exchange: ExchangeKind,
    rows: &[Vec<Value>],
) -> GatewayResult<Vec<PriceLevel>> {
    rows.iter()
        .map(|row| match (row.first(), row.get(1)) {
            (Some(price), Some(size)) => Ok(PriceLevel::new(
                decimal_value(exchange, price)?,
                decimal_value(exchange, size)?,
            )),
            _ => Err(parse_error(
                exchange,
                format!("호가 항목 형식 오류: {:?}", row),
            )),
        })
        .collect()
}

/// 주문 방향 문자열 변환.
pub(crate) fn side(exchange: ExchangeKind, raw: &str) -> GatewayResult<OrderSide> {
    OrderSide::parse(raw)
        .ok_or_else(|| parse_error(exchange, format!("알 수 없는 주문 방향: {}", raw)))
}

/// 초 단위(소수 포함) 타임스탬프를 밀리초로 변환.
pub(crate) fn seconds_to_millis(seconds: f64) -> i64 {
    (seconds * 1000.0).floor() as i64
}

/// RFC 3339 시각을 밀리초로 변환. 실패 시 0.
pub(crate) fn rfc3339_millis(raw: &str) -> i64 {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.timestamp_millis())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use serde_json::json;

    use super::*;

    const EX: ExchangeKind = ExchangeKind::Kraken;

    #[test]
    fn test_decimal_formats() {
        assert_eq!(decimal(EX, "0.00100000").unwrap(), dec!(0.001));
        assert_eq!(decimal(EX, "").unwrap(), Decimal::ZERO);
        assert_eq!(decimal(EX, "1e-5").unwrap(), dec!(0.00001));
        assert!(decimal(EX, "abc").is_err());
    }

    #[test]
    fn test_decimal_value_mixed() {
        assert_eq!(decimal_value(EX, &json!("37500.1")).unwrap(), dec!(37500.1));
        assert_eq!(decimal_value(EX, &json!(12)).unwrap(), dec!(12));
        assert!(decimal_value(EX, &json!([1])).is_err());
    }

    #[test]
    fn test_price_levels() {
        let rows = vec![
            vec![json!("100.5"), json!("2.0"), json!(1616663113)],
            vec![json!("100.4"), json!("1.5"), json!(1616663112)],
        ];
        let levels = price_levels(EX, &rows).unwrap();
        assert_eq!(levels.len(), 2);
        assert_eq!(levels[0].price, dec!(100.5));
        assert_eq!(levels[1].size, dec!(1.5));

        assert!(price_levels(EX, &[vec![json!("1")]]).is_err());
    }

    #[test]
    fn test_side() {
        assert_eq!(side(EX, "BUY").unwrap(), OrderSide::Buy);
        assert_eq!(side(EX, "sell").unwrap(), OrderSide::Sell);
        assert!(side(EX, "hold").is_err());
    }

    #[test]
    fn test_time_conversions() {
        assert_eq!(seconds_to_millis(1616663113.1234), 1616663113123);
        assert_eq!(rfc3339_millis("2021-03-25T09:05:13.000Z"), 1616663113000);
        assert_eq!(rfc3339_millis("garbage"), 0);
    }
}
