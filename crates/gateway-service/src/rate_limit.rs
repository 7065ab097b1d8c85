//! 인스턴스별 슬라이딩 윈도우 레이트 리미터.
//!
//! `(user_id, instance_key)`마다 최근 윈도우 안의 요청 시각을 보관하고,
//! 윈도우 안의 요청 수가 한도에 도달하면 거래소 호출 전에 거부합니다.
//!
//! # 원자성
//!
//! 만료 정리, 한도 확인, 기록은 모두 같은 `DashMap` 엔트리 락 안에서 수행되므로
//! 같은 키에 대한 동시 요청이 한도를 초과해 통과하지 않습니다.
//!
//! # 메모리
//!
//! 윈도우 안의 요청이 없는 키는 [`SlidingWindowRateLimiter::sweep_idle`]이 제거합니다.
//! [`SlidingWindowRateLimiter::spawn_sweeper`]로 주기 실행을 걸어 둘 수 있습니다.

use std::{collections::VecDeque, sync::Arc, time::Duration};

use dashmap::DashMap;
use gateway_core::{GatewayError, GatewayResult};
use tokio::{task::JoinHandle, time::Instant};
use tracing::debug;

use crate::config::RateLimitConfig;

type LimiterKey = (String, String);

/// 슬라이딩 윈도우 레이트 리미터.
///
/// `Clone`은 같은 상태를 공유합니다.
#[derive(Debug, Clone)]
pub struct SlidingWindowRateLimiter {
    max_requests: usize,
    window: Duration,
    entries: Arc<DashMap<LimiterKey, VecDeque<Instant>>>,
}

impl Default for SlidingWindowRateLimiter {
    fn default() -> Self {
        Self::from_config(&RateLimitConfig::default())
    }
}

impl SlidingWindowRateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            entries: Arc::new(DashMap::new()),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_requests, config.window())
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// 요청 허용 여부를 확인하고, 허용되면 기록합니다.
    ///
    /// # Errors
    ///
    /// 윈도우 안의 요청 수가 한도에 도달했으면 `RateLimitExceeded`.
    /// `retry_after_secs`는 가장 오래된 요청이 윈도우를 벗어날 때까지의 초(올림, 최소 1)입니다.
    pub fn check_and_record(&self, user_id: &str, instance_key: &str) -> GatewayResult<()> {
        let now = Instant::now();
        let mut entry = self
            .entries
            .entry((user_id.to_string(), instance_key.to_string()))
            .or_default();
        let timestamps = entry.value_mut();
        prune(timestamps, now, self.window);

        if timestamps.len() >= self.max_requests {
            let wait = timestamps
                .front()
                .map(|oldest| self.window.saturating_sub(now.duration_since(*oldest)))
                .unwrap_or(self.window);
            let retry_after_secs = ceil_secs(wait).max(1);

            debug!(user_id, instance_key, retry_after_secs, "요청 한도 초과");
            return Err(GatewayError::RateLimitExceeded {
                key: instance_key.to_string(),
                retry_after_secs,
            });
        }

        timestamps.push_back(now);
        Ok(())
    }

    /// 현재 윈도우에서 남은 요청 수.
    pub fn remaining(&self, user_id: &str, instance_key: &str) -> usize {
        let now = Instant::now();
        let used = self
            .entries
            .get(&(user_id.to_string(), instance_key.to_string()))
            .map(|ts| {
                ts.iter()
                    .filter(|t| now.duration_since(**t) < self.window)
                    .count()
            })
            .unwrap_or(0);
        self.max_requests.saturating_sub(used)
    }

    /// 윈도우 안의 요청이 없는 키 제거. 제거된 키 수를 반환합니다.
    pub fn sweep_idle(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, timestamps| {
            prune(timestamps, now, self.window);
            !timestamps.is_empty()
        });
        before.saturating_sub(self.entries.len())
    }

    /// 추적 중인 키 수.
    pub fn tracked_keys(&self) -> usize {
        self.entries.len()
    }

    /// 주기적으로 [`sweep_idle`](Self::sweep_idle)을 실행하는 백그라운드 태스크 시작.
    ///
    /// 반환된 핸들을 `abort()`하면 중지됩니다. tokio 런타임 안에서 호출해야 합니다.
    pub fn spawn_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // 첫 tick은 즉시 완료됨
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = limiter.sweep_idle();
                if removed > 0 {
                    debug!(removed, remaining = limiter.tracked_keys(), "유휴 레이트 리밋 키 정리");
                }
            }
        })
    }
}

fn prune(timestamps: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(oldest) = timestamps.front() {
        if now.duration_since(*oldest) >= window {
            timestamps.pop_front();
        } else {
            break;
        }
    }
}

fn ceil_secs(duration: Duration) -> u64 {
    duration.as_secs() + u64::from(duration.subsec_nanos() > 0)
}
