use crate::error::SelectionError;
use std::fmt;
use std::str::FromStr;

/// 支持探测的链类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainKind {
    /// EVM 执行层 (Ethereum, BSC, Polygon 等)
    Evm,
    /// 以太坊共识层 Beacon Chain
    Beacon,
    /// Solana
    Solana,
    /// Aptos
    Aptos,
    /// Sui
    Sui,
}

impl ChainKind {
    /// 按菜单顺序排列的全部链类型
    pub const ALL: [ChainKind; 5] = [
        ChainKind::Evm,
        ChainKind::Beacon,
        ChainKind::Solana,
        ChainKind::Aptos,
        ChainKind::Sui,
    ];

    /// 菜单编号 (1-5)
    pub fn menu_number(self) -> u8 {
        match self {
            ChainKind::Evm => 1,
            ChainKind::Beacon => 2,
            ChainKind::Solana => 3,
            ChainKind::Aptos => 4,
            ChainKind::Sui => 5,
        }
    }

    /// 菜单中显示的描述
    pub fn menu_label(self) -> &'static str {
        match self {
            ChainKind::Evm => "EVM execution layer (Ethereum, BSC, Polygon, etc.)",
            ChainKind::Beacon => "Beacon chain (Ethereum consensus layer)",
            ChainKind::Solana => "Solana",
            ChainKind::Aptos => "Aptos",
            ChainKind::Sui => "Sui",
        }
    }

    /// 解析菜单输入，只接受 "1" 到 "5"
    pub fn from_menu_choice(choice: &str) -> Result<Self, SelectionError> {
        let choice = choice.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.menu_number().to_string() == choice)
            .ok_or_else(|| SelectionError::Invalid(choice.to_string()))
    }
}

impl fmt::Display for ChainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChainKind::Evm => "EVM",
            ChainKind::Beacon => "Beacon chain",
            ChainKind::Solana => "Solana",
            ChainKind::Aptos => "Aptos",
            ChainKind::Sui => "Sui",
        };
        f.write_str(name)
    }
}

/// 命令行 `--chain` 参数：接受菜单编号或链名
impl FromStr for ChainKind {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "evm" | "eth" | "ethereum" => Ok(ChainKind::Evm),
            "beacon" | "consensus" => Ok(ChainKind::Beacon),
            "solana" | "sol" => Ok(ChainKind::Solana),
            "aptos" => Ok(ChainKind::Aptos),
            "sui" => Ok(ChainKind::Sui),
            other => Self::from_menu_choice(other),
        }
    }
}

/// 关键字规则，按优先级排列，第一条命中的规则生效。
/// 泛用的 EVM 关键字（如 "rpc"）必须放在最后。
const DETECTION_RULES: &[(&[&str], ChainKind)] = &[
    (&["aptos", "apt"], ChainKind::Aptos),
    (&["sui"], ChainKind::Sui),
    (&["sol", "solana"], ChainKind::Solana),
    (&["beacon", "consensus"], ChainKind::Beacon),
    (
        &["ethereum", "eth", "rpc", "bsc", "polygon", "matic"],
        ChainKind::Evm,
    ),
];

/// 根据 RPC URL 中的关键字猜测链类型，无法判断时返回 `None`
pub fn detect_chain(rpc_url: &str) -> Option<ChainKind> {
    let rpc_lower = rpc_url.to_lowercase();

    let detected = DETECTION_RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| rpc_lower.contains(k)))
        .map(|(_, kind)| *kind);

    log::debug!("chain detection for {}: {:?}", rpc_url, detected);
    detected
}
