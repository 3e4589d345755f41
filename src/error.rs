use crate::chains::ChainKind;
use thiserror::Error;

/// 单次健康检查可能出现的错误
#[derive(Debug, Error)]
pub enum CheckError {
    /// 传输层错误：超时、连接失败、非 2xx 状态码或无法解析的响应体
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// 响应是合法 JSON，但缺少期望的存活指标字段
    #[error("No {indicator} in response")]
    LivenessAbsent {
        chain: ChainKind,
        indicator: &'static str,
    },

    /// 字段存在但无法解释（例如非十六进制的区块号）
    #[error("{chain} returned an invalid {indicator}: {value}")]
    InvalidLiveness {
        chain: ChainKind,
        indicator: &'static str,
        value: String,
    },
}

impl CheckError {
    /// 是否为传输层错误
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// 手动选择链类型时的错误
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("invalid chain choice: {0:?}")]
    Invalid(String),
}
