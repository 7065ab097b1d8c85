//! 사용자별 거래소 인스턴스 레지스트리.
//!
//! 사용자는 같은 거래소에 라벨을 달리해 여러 계정을 연결할 수 있습니다.
//! 인스턴스 키는 라벨이 없으면 `exchange`, 있으면 `exchange_label`입니다.
//!
//! # 저장 구조
//!
//! ```text
//! ExchangeRegistry
//! ├── InstanceStore (암호화된 자격 증명 레코드)
//! └── live: user_id → instance_key → Arc<dyn ExchangeAdapter>
//! ```
//!
//! 평문 자격 증명은 어댑터 안에만 존재합니다. 저장소에는 [`EncryptedCredentials`]만 보관되며,
//! 라이브 맵에 없는 레코드는 조회 시 복호화하여 어댑터를 다시 만듭니다.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gateway_core::{
    AdapterFactory, CredentialVault, EncryptedCredentials, ExchangeAdapter, ExchangeCredentials,
    ExchangeKind, GatewayError, GatewayResult,
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

// ============================================================================
// 인스턴스 레코드
// ============================================================================

/// 저장소에 보관되는 인스턴스 레코드.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub user_id: String,
    pub instance_key: String,
    pub exchange: ExchangeKind,
    pub label: Option<String>,
    pub credentials: EncryptedCredentials,
    pub connected_at: DateTime<Utc>,
}

/// 연결된 인스턴스 요약 (자격 증명 제외).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceSummary {
    pub instance_key: String,
    pub exchange: ExchangeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub sandbox: bool,
    pub connected_at: DateTime<Utc>,
}

impl From<&InstanceRecord> for InstanceSummary {
    fn from(record: &InstanceRecord) -> Self {
        Self {
            instance_key: record.instance_key.clone(),
            exchange: record.exchange,
            label: record.label.clone(),
            sandbox: record.credentials.sandbox,
            connected_at: record.connected_at,
        }
    }
}

/// 인스턴스 키 생성.
pub fn instance_key(exchange: ExchangeKind, label: Option<&str>) -> String {
    match label {
        Some(label) => format!("{}_{}", exchange, label),
        None => exchange.to_string(),
    }
}

// ============================================================================
// InstanceStore Trait
// ============================================================================

/// 인스턴스 레코드 저장소.
///
/// 기본 구현은 [`InMemoryInstanceStore`]이며, 재시작 후에도 연결을 유지하려면
/// 영속 저장소 구현으로 교체합니다.
#[async_trait]
pub trait InstanceStore: Send + Sync {
    /// 레코드 저장. 같은 키가 있으면 덮어씁니다.
    async fn save(&self, record: InstanceRecord) -> GatewayResult<()>;

    async fn load(&self, user_id: &str, instance_key: &str)
        -> GatewayResult<Option<InstanceRecord>>;

    /// 사용자의 레코드 목록 (인스턴스 키 순).
    async fn list(&self, user_id: &str) -> GatewayResult<Vec<InstanceRecord>>;

    /// 레코드 삭제. 존재했으면 `true`.
    async fn delete(&self, user_id: &str, instance_key: &str) -> GatewayResult<bool>;
}

/// 메모리 저장소.
#[derive(Debug, Default)]
pub struct InMemoryInstanceStore {
    records: RwLock<HashMap<String, BTreeMap<String, InstanceRecord>>>,
}

impl InMemoryInstanceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InstanceStore for InMemoryInstanceStore {
    async fn save(&self, record: InstanceRecord) -> GatewayResult<()> {
        self.records
            .write()
            .await
            .entry(record.user_id.clone())
            .or_default()
            .insert(record.instance_key.clone(), record);
        Ok(())
    }

    async fn load(
        &self,
        user_id: &str,
        instance_key: &str,
    ) -> GatewayResult<Option<InstanceRecord>> {
        Ok(self
            .records
            .read()
            .await
            .get(user_id)
            .and_then(|records| records.get(instance_key))
            .cloned())
    }

    async fn list(&self, user_id: &str) -> GatewayResult<Vec<InstanceRecord>> {
        Ok(self
            .records
            .read()
            .await
            .get(user_id)
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn delete(&self, user_id: &str, instance_key: &str) -> GatewayResult<bool> {
        let mut records = self.records.write().await;
        let Some(user_records) = records.get_mut(user_id) else {
            return Ok(false);
        };
        let removed = user_records.remove(instance_key).is_some();
        if user_records.is_empty() {
            records.remove(user_id);
        }
        Ok(removed)
    }
}

// ============================================================================
// ExchangeRegistry
// ============================================================================

type LiveMap = HashMap<String, HashMap<String, Arc<dyn ExchangeAdapter>>>;

/// 사용자별 거래소 인스턴스 레지스트리.
pub struct ExchangeRegistry {
    vault: CredentialVault,
    factory: Arc<dyn AdapterFactory>,
    store: Arc<dyn InstanceStore>,
    /// 추가/삭제/재구성은 쓰기 락을 잡은 채로 저장소와 함께 갱신
    live: RwLock<LiveMap>,
}

impl ExchangeRegistry {
    pub fn new(
        vault: CredentialVault,
        factory: Arc<dyn AdapterFactory>,
        store: Arc<dyn InstanceStore>,
    ) -> Self {
        Self {
            vault,
            factory,
            store,
            live: RwLock::new(HashMap::new()),
        }
    }

    /// 메모리 저장소를 사용하는 레지스트리.
    pub fn in_memory(vault: CredentialVault, factory: Arc<dyn AdapterFactory>) -> Self {
        Self::new(vault, factory, Arc::new(InMemoryInstanceStore::new()))
    }

    fn build_adapter(
        &self,
        exchange: ExchangeKind,
        credentials: ExchangeCredentials,
    ) -> GatewayResult<Arc<dyn ExchangeAdapter>> {
        let mut adapter = self.factory.create(exchange)?;
        adapter.set_credentials(credentials)?;
        Ok(Arc::from(adapter))
    }

    /// 거래소 인스턴스 추가.
    ///
    /// 같은 `(exchange, label)`이 이미 있으면 새 자격 증명으로 교체합니다.
    ///
    /// # Errors
    ///
    /// - `UnsupportedExchange`: 알 수 없는 거래소 이름
    /// - `Validation`: 빈 사용자 ID/라벨, 필수 자격 증명 누락
    pub async fn add_instance(
        &self,
        user_id: &str,
        exchange_name: &str,
        credentials: ExchangeCredentials,
        label: Option<&str>,
    ) -> GatewayResult<InstanceSummary> {
        if user_id.trim().is_empty() {
            return Err(GatewayError::validation("사용자 ID가 비어 있습니다"));
        }
        let exchange: ExchangeKind = exchange_name.parse()?;
        let label = match label.map(str::trim) {
            Some("") => return Err(GatewayError::validation("라벨이 비어 있습니다")),
            other => other,
        };
        let key = instance_key(exchange, label);

        let encrypted = self.vault.encrypt_credentials(&credentials)?;
        drop(credentials);
        let adapter = self.build_adapter(exchange, self.vault.decrypt_credentials(&encrypted)?)?;

        let record = InstanceRecord {
            user_id: user_id.to_string(),
            instance_key: key.clone(),
            exchange,
            label: label.map(str::to_string),
            credentials: encrypted,
            connected_at: Utc::now(),
        };
        let summary = InstanceSummary::from(&record);

        {
            let mut live = self.live.write().await;
            self.store.save(record).await?;
            live.entry(user_id.to_string())
                .or_default()
                .insert(key.clone(), adapter);
        }

        info!(user_id, instance_key = %key, %exchange, sandbox = summary.sandbox, "거래소 연결");
        Ok(summary)
    }

    /// 인스턴스 조회.
    ///
    /// 라이브 맵에 없고 저장소에 레코드가 있으면 복호화하여 어댑터를 다시 구성합니다.
    ///
    /// # Errors
    ///
    /// - `NotFound`: 연결된 인스턴스 없음
    /// - `Decryption`: 저장된 자격 증명 손상
    pub async fn get_instance(
        &self,
        user_id: &str,
        instance_key: &str,
    ) -> GatewayResult<Arc<dyn ExchangeAdapter>> {
        let not_found = || GatewayError::NotFound {
            user_id: user_id.to_string(),
            instance_key: instance_key.to_string(),
        };

        // 저장소에도 없으면 읽기 락만으로 NotFound 반환
        {
            let live = self.live.read().await;
            if let Some(adapter) = self.lookup_live(&live, user_id, instance_key) {
                return Ok(adapter);
            }
            if self.store.load(user_id, instance_key).await?.is_none() {
                return Err(not_found());
            }
        }

        let mut live = self.live.write().await;
        // 쓰기 락 대기 중 다른 태스크가 구성했을 수 있음
        if let Some(adapter) = self.lookup_live(&live, user_id, instance_key) {
            return Ok(adapter);
        }

        // 락을 바꾸는 사이 삭제되었을 수 있음
        let record = self
            .store
            .load(user_id, instance_key)
            .await?
            .ok_or_else(not_found)?;

        debug!(user_id, instance_key, "저장된 자격 증명으로 어댑터 재구성");
        let credentials = self.vault.decrypt_credentials(&record.credentials)?;
        let adapter = self.build_adapter(record.exchange, credentials)?;
        live.entry(user_id.to_string())
            .or_default()
            .insert(instance_key.to_string(), Arc::clone(&adapter));
        Ok(adapter)
    }

    fn lookup_live(
        &self,
        live: &LiveMap,
        user_id: &str,
        instance_key: &str,
    ) -> Option<Arc<dyn ExchangeAdapter>> {
        live.get(user_id)
            .and_then(|instances| instances.get(instance_key))
            .cloned()
    }

    /// 사용자의 연결 목록 (인스턴스 키 순).
    pub async fn list_instances(&self, user_id: &str) -> GatewayResult<Vec<InstanceSummary>> {
        let records = self.store.list(user_id).await?;
        let mut summaries: Vec<InstanceSummary> =
            records.iter().map(InstanceSummary::from).collect();
        summaries.sort_by(|a, b| a.instance_key.cmp(&b.instance_key));
        Ok(summaries)
    }

    /// 인스턴스 제거. 존재하지 않아도 에러가 아닙니다.
    pub async fn remove_instance(&self, user_id: &str, instance_key: &str) -> GatewayResult<bool> {
        let mut live = self.live.write().await;
        let stored = self.store.delete(user_id, instance_key).await?;

        let mut was_live = false;
        if let Some(instances) = live.get_mut(user_id) {
            was_live = instances.remove(instance_key).is_some();
            if instances.is_empty() {
                live.remove(user_id);
            }
        }
        drop(live);

        let removed = stored || was_live;
        if removed {
            info!(user_id, instance_key, "거래소 연결 해제");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use gateway_core::EncryptedSecret;
    use gateway_exchange::{MockAdapterFactory, MockProfile};
    use rust_decimal_macros::dec;

    use super::*;

    fn registry_with_store(store: Arc<dyn InstanceStore>, vault: CredentialVault) -> ExchangeRegistry {
        let factory = MockAdapterFactory::new()
            .with_profile("key-1", MockProfile::default().with_balance("BTC", dec!(1)));
        ExchangeRegistry::new(vault, Arc::new(factory), store)
    }

    fn registry() -> ExchangeRegistry {
        registry_with_store(Arc::new(InMemoryInstanceStore::new()), CredentialVault::generate())
    }

    fn creds() -> ExchangeCredentials {
        ExchangeCredentials::new("key-1", "secret-1")
    }

    #[test]
    fn test_instance_key() {
        assert_eq!(instance_key(ExchangeKind::Binance, None), "binance");
        assert_eq!(instance_key(ExchangeKind::Kraken, Some("main")), "kraken_main");
    }

    #[tokio::test]
    async fn test_unknown_key_lookup_does_not_need_write_lock() {
        let registry = registry();
        registry.add_instance("u1", "binance", creds(), None).await.unwrap();

        // 다른 조회가 읽기 락을 잡고 있어도 NotFound는 바로 반환됨
        let _reader = registry.live.read().await;
        let result = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            registry.get_instance("u2", "bogus"),
        )
        .await
        .expect("lookup of unknown key blocked on the write lock");
        assert!(matches!(result, Err(GatewayError::NotFound { .. })));

        assert!(registry.get_instance("u1", "binance").await.is_ok());
    }

    #[tokio::test]
    async fn test_add_get_remove() {
        let registry = registry();

        let summary = registry
            .add_instance("u1", "binance", creds(), Some("main"))
            .await
            .unwrap();
        assert_eq!(summary.instance_key, "binance_main");
        assert_eq!(summary.exchange, ExchangeKind::Binance);

        let adapter = registry.get_instance("u1", "binance_main").await.unwrap();
        assert!(adapter.is_configured());
        assert_eq!(adapter.get_balances().await.unwrap()[0].total(), dec!(1));

        assert!(registry.remove_instance("u1", "binance_main").await.unwrap());
        assert!(!registry.remove_instance("u1", "binance_main").await.unwrap());
        assert!(matches!(
            registry.get_instance("u1", "binance_main").await,
            Err(GatewayError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_instances_are_per_user() {
        let registry = registry();
        registry.add_instance("u1", "kraken", creds(), None).await.unwrap();

        assert!(matches!(
            registry.get_instance("u2", "kraken").await,
            Err(GatewayError::NotFound { .. })
        ));
        assert!(registry.list_instances("u2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_inputs() {
        let registry = registry();
        assert!(matches!(
            registry.add_instance("u1", "ftx", creds(), None).await,
            Err(GatewayError::UnsupportedExchange(_))
        ));
        assert!(matches!(
            registry.add_instance("u1", "binance", creds(), Some("  ")).await,
            Err(GatewayError::Validation(_))
        ));
        // passphrase 누락
        assert!(matches!(
            registry.add_instance("u1", "kucoin", creds(), None).await,
            Err(GatewayError::Validation(_))
        ));
        assert!(registry.list_instances("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_readd_overwrites() {
        let registry = registry();
        registry.add_instance("u1", "binance", creds(), None).await.unwrap();
        registry
            .add_instance(
                "u1",
                "binance",
                ExchangeCredentials::new("key-2", "secret-2").with_sandbox(true),
                None,
            )
            .await
            .unwrap();

        let list = registry.list_instances("u1").await.unwrap();
        assert_eq!(list.len(), 1);
        assert!(list[0].sandbox);

        // 새 자격 증명(key-2)은 잔고 프로필이 없음
        let adapter = registry.get_instance("u1", "binance").await.unwrap();
        assert!(adapter.get_balances().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_sorted_by_key() {
        let registry = registry();
        registry.add_instance("u1", "kraken", creds(), None).await.unwrap();
        registry.add_instance("u1", "binance", creds(), Some("b")).await.unwrap();
        registry.add_instance("u1", "binance", creds(), Some("a")).await.unwrap();

        let keys: Vec<String> = registry
            .list_instances("u1")
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.instance_key)
            .collect();
        assert_eq!(keys, vec!["binance_a", "binance_b", "kraken"]);
    }

    #[tokio::test]
    async fn test_rehydrates_from_store() {
        let store: Arc<dyn InstanceStore> = Arc::new(InMemoryInstanceStore::new());
        let vault = CredentialVault::generate();

        registry_with_store(Arc::clone(&store), vault.clone())
            .add_instance("u1", "binance", creds(), None)
            .await
            .unwrap();

        // 새 레지스트리: 라이브 맵은 비어 있고 저장소에만 레코드가 있음
        let restarted = registry_with_store(store, vault);
        let adapter = restarted.get_instance("u1", "binance").await.unwrap();
        assert_eq!(adapter.get_balances().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_tampered_record_fails_decryption() {
        let store: Arc<dyn InstanceStore> = Arc::new(InMemoryInstanceStore::new());
        let vault = CredentialVault::generate();
        let mut credentials = vault.encrypt_credentials(&creds()).unwrap();
        credentials.secret_key = EncryptedSecret {
            ciphertext: credentials.api_key.ciphertext.clone(),
            iv: credentials.secret_key.iv.clone(),
        };
        store
            .save(InstanceRecord {
                user_id: "u1".to_string(),
                instance_key: "binance".to_string(),
                exchange: ExchangeKind::Binance,
                label: None,
                credentials,
                connected_at: Utc::now(),
            })
            .await
            .unwrap();

        let registry = registry_with_store(store, vault);
        assert!(matches!(
            registry.get_instance("u1", "binance").await,
            Err(GatewayError::Decryption(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_connect_disconnect_stays_consistent() {
        let registry = Arc::new(registry());

        let mut handles = Vec::new();
        for i in 0..20 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                if i % 2 == 0 {
                    registry
                        .add_instance("u1", "binance", creds(), None)
                        .await
                        .map(|_| ())
                } else {
                    registry.remove_instance("u1", "binance").await.map(|_| ())
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        // 저장소와 라이브 맵이 같은 결론이어야 함
        let listed = !registry.list_instances("u1").await.unwrap().is_empty();
        let live = registry.get_instance("u1", "binance").await.is_ok();
        assert_eq!(listed, live);
    }
}
