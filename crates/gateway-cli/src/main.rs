//! 거래소 게이트웨이 CLI.
//!
//! 환경변수의 API 키로 로컬 운영자 계정에 거래소를 연결한 뒤 명령을 실행합니다.
//!
//! ```bash
//! export BINANCE_API_KEY=... BINANCE_SECRET_KEY=...
//! export KUCOIN_API_KEY=... KUCOIN_SECRET_KEY=... KUCOIN_PASSPHRASE=...
//!
//! # 연결 테스트
//! gateway test -i binance
//!
//! # 전체 포트폴리오
//! gateway portfolio
//!
//! # 지정가 매수
//! gateway order-create -i binance -s BTCUSDT --side buy --type limit -a 0.001 -p 50000
//! ```

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use gateway_core::{ExchangeCredentials, ExchangeKind, OrderRequest, OrderSide};
use gateway_service::{ExchangeGateway, GatewayConfig};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

/// 환경변수 자격 증명이 연결되는 사용자 ID
const OPERATOR_USER: &str = "local";

#[derive(Parser)]
#[command(name = "gateway")]
#[command(about = "Multi-exchange trading gateway CLI (Coinbase, Binance, Kraken, KuCoin)", long_about = None)]
#[command(version)]
struct Cli {
    /// 로그 레벨 (RUST_LOG가 있으면 무시)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 지원 거래소 목록
    Exchanges,

    /// 연결된 인스턴스 목록
    Connected,

    /// 연결 테스트 (잔고 조회)
    Test {
        /// 인스턴스 키 (예: binance)
        #[arg(short, long)]
        instance: String,
    },

    /// 잔고 조회 (인스턴스 미지정 시 전체)
    Balances {
        #[arg(short, long)]
        instance: Option<String>,
    },

    /// 통화별 포트폴리오 합계
    Portfolio,

    /// 현재가 조회
    Ticker {
        #[arg(short, long)]
        instance: String,

        /// 거래소 심볼 (예: BTCUSDT, XBTUSD, BTC-USDT)
        #[arg(short, long)]
        symbol: String,
    },

    /// 거래 가능한 심볼 목록 (Binance, KuCoin)
    Pairs {
        #[arg(short, long)]
        instance: String,
    },

    /// 호가 조회
    Orderbook {
        #[arg(short, long)]
        instance: String,

        #[arg(short, long)]
        symbol: String,

        /// 호가 단계 수
        #[arg(short, long)]
        depth: Option<usize>,
    },

    /// 주문 목록 조회
    Orders {
        #[arg(short, long)]
        instance: String,

        #[arg(short, long)]
        symbol: Option<String>,
    },

    /// 단일 주문 조회
    Order {
        #[arg(short, long)]
        instance: String,

        /// 주문 ID
        #[arg(long)]
        id: String,

        #[arg(short, long)]
        symbol: Option<String>,
    },

    /// 체결 내역 조회
    Trades {
        #[arg(short, long)]
        instance: String,

        #[arg(short, long)]
        symbol: Option<String>,

        /// 최대 건수
        #[arg(short, long, default_value = "100")]
        limit: usize,
    },

    /// 주문 취소
    Cancel {
        #[arg(short, long)]
        instance: String,

        #[arg(long)]
        id: String,

        #[arg(short, long)]
        symbol: Option<String>,
    },

    /// 주문 생성
    OrderCreate {
        #[arg(short, long)]
        instance: String,

        #[arg(short, long)]
        symbol: String,

        /// buy 또는 sell
        #[arg(long)]
        side: String,

        /// market 또는 limit
        #[arg(long = "type", default_value = "market")]
        order_type: String,

        /// 주문 수량
        #[arg(short, long)]
        amount: Decimal,

        /// 지정가 (limit 주문 필수)
        #[arg(short, long)]
        price: Option<Decimal>,
    },
}

/// `<EXCHANGE>_API_KEY` 등 환경변수에서 자격 증명 로드.
fn credentials_from_env(exchange: ExchangeKind) -> Option<ExchangeCredentials> {
    let prefix = exchange.as_str().to_uppercase();
    let var = |name: &str| {
        std::env::var(format!("{}_{}", prefix, name))
            .ok()
            .filter(|v| !v.trim().is_empty())
    };

    let api_key = var("API_KEY")?;
    let secret_key = var("SECRET_KEY")?;

    let mut credentials = ExchangeCredentials::new(api_key, secret_key);
    if let Some(passphrase) = var("PASSPHRASE") {
        credentials = credentials.with_passphrase(passphrase);
    }
    let sandbox = var("SANDBOX")
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false);
    Some(credentials.with_sandbox(sandbox))
}

/// 환경변수에 자격 증명이 있는 거래소를 모두 연결.
async fn connect_from_env(gateway: &ExchangeGateway) -> usize {
    let mut connected = 0;
    for exchange in ExchangeKind::ALL {
        let Some(credentials) = credentials_from_env(exchange) else {
            continue;
        };
        match gateway
            .connect(OPERATOR_USER, exchange.as_str(), credentials, None)
            .await
        {
            Ok(summary) => {
                info!(instance_key = %summary.instance_key, sandbox = summary.sandbox, "거래소 연결");
                connected += 1;
            }
            Err(e) => warn!(%exchange, error = %e, "거래소 연결 실패"),
        }
    }
    connected
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "gateway_cli={},gateway_service={},gateway_exchange={}",
                    cli.log_level, cli.log_level, cli.log_level
                )
                .into()
            }),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = GatewayConfig::from_env();
    let gateway = ExchangeGateway::from_config(&config).context("게이트웨이 초기화 실패")?;

    if matches!(cli.command, Commands::Exchanges) {
        return print_json(&gateway.available_exchanges());
    }

    if connect_from_env(&gateway).await == 0 {
        bail!("연결된 거래소가 없습니다. <EXCHANGE>_API_KEY / <EXCHANGE>_SECRET_KEY 환경변수를 설정하세요");
    }
    let sweeper = gateway.spawn_limiter_sweeper(config.rate_limit.sweep_interval());

    let user = OPERATOR_USER;
    let result = match cli.command {
        Commands::Exchanges => Ok(()),
        Commands::Connected => print_json(&gateway.list_instances(user).await?),
        Commands::Test { instance } => {
            let result = gateway.test_connection(user, &instance).await?;
            print_json(&result)?;
            if !result.success {
                bail!("{} 연결 실패", instance);
            }
            Ok(())
        }
        Commands::Balances { instance: Some(instance) } => {
            print_json(&gateway.get_balances(user, &instance).await?)
        }
        Commands::Balances { instance: None } => print_json(&gateway.get_all_balances(user).await?),
        Commands::Portfolio => print_json(&gateway.get_portfolio_overview(user).await?),
        Commands::Ticker { instance, symbol } => {
            print_json(&gateway.get_ticker(user, &instance, &symbol).await?)
        }
        Commands::Pairs { instance } => {
            print_json(&gateway.get_trading_pairs(user, &instance).await?)
        }
        Commands::Orderbook {
            instance,
            symbol,
            depth,
        } => print_json(
            &gateway
                .get_order_book(user, &instance, &symbol, depth)
                .await?,
        ),
        Commands::Orders { instance, symbol } => print_json(
            &gateway
                .get_orders(user, &instance, symbol.as_deref())
                .await?,
        ),
        Commands::Order {
            instance,
            id,
            symbol,
        } => print_json(
            &gateway
                .get_order(user, &instance, &id, symbol.as_deref())
                .await?,
        ),
        Commands::Trades {
            instance,
            symbol,
            limit,
        } => print_json(
            &gateway
                .get_trades(user, &instance, symbol.as_deref(), limit)
                .await?,
        ),
        Commands::Cancel {
            instance,
            id,
            symbol,
        } => {
            let cancelled = gateway
                .cancel_order(user, &instance, &id, symbol.as_deref())
                .await?;
            print_json(&serde_json::json!({ "order_id": id, "cancelled": cancelled }))
        }
        Commands::OrderCreate {
            instance,
            symbol,
            side,
            order_type,
            amount,
            price,
        } => {
            let side = OrderSide::parse(&side)
                .with_context(|| format!("잘못된 주문 방향: {} (buy 또는 sell)", side))?;
            let request = match (order_type.to_ascii_lowercase().as_str(), price) {
                ("market", _) => OrderRequest::market(symbol, side, amount),
                ("limit", Some(price)) => OrderRequest::limit(symbol, side, amount, price),
                ("limit", None) => bail!("지정가 주문에는 --price가 필요합니다"),
                (other, _) => bail!("잘못된 주문 유형: {} (market 또는 limit)", other),
            };
            print_json(&gateway.create_order(user, &instance, &request).await?)
        }
    };

    sweeper.abort();
    result
}
