use crate::chains::ChainKind;
use crate::error::CheckError;
use crate::rpc::RpcClient;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

/// 健康检查得到的存活指标
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Liveness {
    /// EVM 最新区块号
    BlockNumber(u64),
    /// Beacon Chain 最终确定的区块根
    FinalizedRoot(String),
    /// Solana 当前 slot
    Slot(u64),
    /// Aptos 账本版本
    LedgerVersion(u64),
    /// Sui 最新 checkpoint 序号
    CheckpointSequence(u64),
}

impl fmt::Display for Liveness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Liveness::BlockNumber(n) => write!(f, "Current block number: {}", n),
            Liveness::FinalizedRoot(root) => write!(f, "Finalized block root: {}", root),
            Liveness::Slot(slot) => write!(f, "Current slot: {}", slot),
            Liveness::LedgerVersion(v) => write!(f, "Ledger version: {}", v),
            Liveness::CheckpointSequence(seq) => {
                write!(f, "Latest checkpoint sequence number: {}", seq)
            }
        }
    }
}

/// 各链健康检查的统一接口
#[async_trait]
pub trait HealthCheck: Send + Sync {
    /// 对端点执行一次 `chain` 对应的检查。`silent` 只影响输出，不影响结果。
    async fn check(&self, chain: ChainKind, silent: bool) -> Result<Liveness, CheckError>;
}

/// 通过 HTTP 访问真实端点的健康检查
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: RpcClient,
}

impl HttpProber {
    pub fn new(client: RpcClient) -> Self {
        Self { client }
    }

    async fn check_evm(&self) -> Result<Liveness, CheckError> {
        let body = self.client.call("eth_blockNumber").await?;
        let result = non_empty(&body["result"]).ok_or(CheckError::LivenessAbsent {
            chain: ChainKind::Evm,
            indicator: "block number",
        })?;
        let hex = result.as_str().ok_or_else(|| CheckError::InvalidLiveness {
            chain: ChainKind::Evm,
            indicator: "block number",
            value: result.to_string(),
        })?;

        let digits = hex
            .strip_prefix("0x")
            .or_else(|| hex.strip_prefix("0X"))
            .unwrap_or(hex);
        u64::from_str_radix(digits, 16)
            .map(Liveness::BlockNumber)
            .map_err(|_| CheckError::InvalidLiveness {
                chain: ChainKind::Evm,
                indicator: "block number",
                value: hex.to_string(),
            })
    }

    async fn check_beacon(&self) -> Result<Liveness, CheckError> {
        let body = self
            .client
            .get("/eth/v1/beacon/states/head/finality_checkpoints")
            .await?;

        let root = non_empty(&body["data"]["finalized"]["root"]).ok_or(CheckError::LivenessAbsent {
            chain: ChainKind::Beacon,
            indicator: "finalized block root",
        })?;

        root.as_str()
            .map(|root| Liveness::FinalizedRoot(root.to_string()))
            .ok_or_else(|| CheckError::InvalidLiveness {
                chain: ChainKind::Beacon,
                indicator: "finalized block root",
                value: root.to_string(),
            })
    }

    async fn check_solana(&self) -> Result<Liveness, CheckError> {
        let body = self.client.call("getSlot").await?;
        counter(ChainKind::Solana, "slot info", &body["result"]).map(Liveness::Slot)
    }

    async fn check_aptos(&self) -> Result<Liveness, CheckError> {
        // 部分节点在根路径返回账本信息，其余只在 /v1 返回
        let body = self.client.get("/").await?;
        if let Some(version) = ledger_version(&body) {
            match counter(ChainKind::Aptos, "ledger version info", version) {
                Ok(version) => return Ok(Liveness::LedgerVersion(version)),
                Err(e) => log::debug!("{} at /, falling back to /v1", e),
            }
        } else {
            log::debug!("no ledger version at /, falling back to /v1");
        }

        let body = self.client.get("/v1").await?;
        let version = ledger_version(&body).ok_or(CheckError::LivenessAbsent {
            chain: ChainKind::Aptos,
            indicator: "ledger version info",
        })?;
        counter(ChainKind::Aptos, "ledger version info", version).map(Liveness::LedgerVersion)
    }

    async fn check_sui(&self) -> Result<Liveness, CheckError> {
        let body = self
            .client
            .call("sui_getLatestCheckpointSequenceNumber")
            .await?;
        counter(ChainKind::Sui, "checkpoint info", &body["result"])
            .map(Liveness::CheckpointSequence)
    }
}

#[async_trait]
impl HealthCheck for HttpProber {
    async fn check(&self, chain: ChainKind, silent: bool) -> Result<Liveness, CheckError> {
        let result = match chain {
            ChainKind::Evm => self.check_evm().await,
            ChainKind::Beacon => self.check_beacon().await,
            ChainKind::Solana => self.check_solana().await,
            ChainKind::Aptos => self.check_aptos().await,
            ChainKind::Sui => self.check_sui().await,
        };

        if !silent {
            match &result {
                Ok(liveness) => println!("[+] {} RPC is online. {}", chain, liveness),
                Err(e @ CheckError::LivenessAbsent { .. }) => println!("[-] {}.", e),
                Err(_) => {}
            }
        }

        result
    }
}

/// 过滤掉 JSON null
fn present(value: &Value) -> Option<&Value> {
    (!value.is_null()).then_some(value)
}

/// 过滤掉 JSON null 和空字符串
fn non_empty(value: &Value) -> Option<&Value> {
    present(value).filter(|v| v.as_str() != Some(""))
}

/// `ledger_version` 优先，其次 `ledger_info.version`
fn ledger_version(body: &Value) -> Option<&Value> {
    present(&body["ledger_version"]).or_else(|| present(&body["ledger_info"]["version"]))
}

/// 解析单调递增计数器，接受 JSON 数字或十进制字符串
fn counter(chain: ChainKind, indicator: &'static str, value: &Value) -> Result<u64, CheckError> {
    if value.is_null() {
        return Err(CheckError::LivenessAbsent { chain, indicator });
    }

    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| CheckError::InvalidLiveness {
        chain,
        indicator,
        value: value.to_string(),
    })
}
