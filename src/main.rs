mod chains;
mod checks;
mod error;
mod flow;
mod rpc;
mod stats;

use anyhow::Result;
use chains::ChainKind;
use checks::HttpProber;
use clap::Parser;
use flow::{InteractionFlow, Outcome, StdinPrompt};
use rpc::RpcClient;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[clap(
    name = "chain-rpc-probe",
    about = "Detect the chain type of an RPC endpoint, check it is alive and measure RPS",
    version
)]
struct Cli {
    /// RPC URL (HTTP/HTTPS)，不指定时交互输入
    #[clap(short = 'u', long)]
    url: Option<String>,

    /// 链类型 (1-5 或 evm/beacon/solana/aptos/sui)，指定后跳过自动检测
    #[clap(short = 'k', long)]
    chain: Option<ChainKind>,

    /// 吞吐量测试请求次数
    #[clap(short = 'c', long, default_value_t = stats::DEFAULT_REQUEST_COUNT)]
    count: usize,

    /// 单次请求超时（秒）
    #[clap(short = 't', long, default_value_t = rpc::DEFAULT_TIMEOUT.as_secs())]
    timeout: u64,

    /// 将吞吐量结果追加到 CSV 文件
    #[clap(short = 'o', long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    // 解析命令行参数
    let cli = Cli::parse();
    log::debug!("{:?}", cli);

    let mut prompt = StdinPrompt;
    let rpc_url = match cli.url {
        Some(url) => url,
        None => flow::read_rpc_url(&mut prompt)?,
    };
    let rpc_url = rpc_url.trim().to_string();

    let Some(parsed) = flow::validate_rpc_url(&rpc_url) else {
        println!("Invalid RPC URL {:?}. Exiting.", rpc_url);
        return Ok(());
    };
    log::debug!("probing host {:?}", parsed.host_str());

    let prober = HttpProber::new(RpcClient::new(&rpc_url, Duration::from_secs(cli.timeout)));

    let outcome = InteractionFlow::new(&rpc_url, &prober, &mut prompt)
        .with_chain(cli.chain)
        .with_request_count(cli.count)
        .run()
        .await?;

    match outcome {
        Outcome::Measured(sample) => {
            if let Some(output) = &cli.output {
                stats::append_to_csv(&sample, &rpc_url, output)?;
                println!("\nResult appended to: {}", output.display());
            }
        }
        Outcome::Aborted(reason) => log::info!("probe aborted: {:?}", reason),
    }

    Ok(())
}
