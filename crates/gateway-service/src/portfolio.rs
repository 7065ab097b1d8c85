//! 다중 거래소 잔고 집계.

use std::collections::BTreeMap;

use gateway_core::{Balance, ExchangeKind};
use rust_decimal::Decimal;
use serde::Serialize;

/// 인스턴스 태그가 붙은 잔고 한 건.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceBalance {
    pub instance_key: String,
    pub exchange: ExchangeKind,
    #[serde(flatten)]
    pub balance: Balance,
}

/// 통화별 인스턴스 기여분.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExchangeContribution {
    pub instance_key: String,
    pub exchange: ExchangeKind,
    pub amount: Decimal,
}

/// 통화별 포트폴리오 합계.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioEntry {
    pub currency: String,
    pub total: Decimal,
    pub exchanges: Vec<ExchangeContribution>,
}

/// 통화별로 묶어 합산. 결과는 통화 코드 순이며 합계는 정규화됩니다 (`1.0 + 0.5 → 1.5`).
pub fn aggregate(balances: &[InstanceBalance]) -> Vec<PortfolioEntry> {
    let mut by_currency: BTreeMap<&str, PortfolioEntry> = BTreeMap::new();

    for item in balances {
        let currency = item.balance.currency();
        let entry = by_currency
            .entry(currency)
            .or_insert_with(|| PortfolioEntry {
                currency: currency.to_string(),
                total: Decimal::ZERO,
                exchanges: Vec::new(),
            });
        entry.total += item.balance.total();
        entry.exchanges.push(ExchangeContribution {
            instance_key: item.instance_key.clone(),
            exchange: item.exchange,
            amount: item.balance.total(),
        });
    }

    by_currency
        .into_values()
        .map(|mut entry| {
            entry.total = entry.total.normalize();
            entry
        })
        .collect()
}
