use crate::chains::{detect_chain, ChainKind};
use crate::checks::HealthCheck;
use crate::error::SelectionError;
use crate::stats::{self, ThroughputSample};
use anyhow::{bail, Context, Result};
use std::io::{self, BufRead, Write};
use url::Url;

/// 交互输入来源
pub trait Prompt {
    /// 打印提示并读取一行输入，返回去掉首尾空白后的内容
    fn read_line(&mut self, message: &str) -> Result<String>;
}

/// 从标准输入读取
pub struct StdinPrompt;

impl Prompt for StdinPrompt {
    fn read_line(&mut self, message: &str) -> Result<String> {
        print!("{}", message);
        io::stdout().flush().context("failed to flush stdout")?;

        let mut line = String::new();
        let read = io::stdin()
            .lock()
            .read_line(&mut line)
            .context("failed to read from stdin")?;
        if read == 0 {
            bail!("stdin closed");
        }
        Ok(line.trim().to_string())
    }
}

/// 读取 RPC URL
pub fn read_rpc_url<P: Prompt>(prompt: &mut P) -> Result<String> {
    prompt.read_line("Enter the RPC URL to check:\n")
}

/// 校验 RPC URL，只接受 http/https
pub fn validate_rpc_url(rpc_url: &str) -> Option<Url> {
    let url = Url::parse(rpc_url.trim()).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}

/// 自动检测结果的提示，带菜单编号和链名
fn detected_message(chain: ChainKind) -> String {
    format!(
        "Detected chain type based on RPC URL: {} ({})",
        chain.menu_number(),
        chain
    )
}

/// 流程提前结束的原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    /// 菜单输入不在 1-5 之内
    InvalidSelection(SelectionError),
    /// 检查失败后再次选择了同一条链，视为确认失败
    SameChoiceRepeated(ChainKind),
    /// 重新选择后的检查仍然失败
    RetryFailed(ChainKind),
}

/// 流程的最终结果
#[derive(Debug)]
pub enum Outcome {
    Measured(ThroughputSample),
    Aborted(AbortReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Detecting,
    Confirming { chain: ChainKind, retried: bool },
    RetryPrompt { failed: ChainKind },
    Measuring(ChainKind),
}

/// 检测 -> 确认 -> 失败后手动重选 -> 吞吐量测试
pub struct InteractionFlow<'a, C: ?Sized, P> {
    rpc_url: &'a str,
    checker: &'a C,
    prompt: &'a mut P,
    preselected: Option<ChainKind>,
    request_count: usize,
}

impl<'a, C, P> InteractionFlow<'a, C, P>
where
    C: HealthCheck + ?Sized,
    P: Prompt,
{
    pub fn new(rpc_url: &'a str, checker: &'a C, prompt: &'a mut P) -> Self {
        Self {
            rpc_url,
            checker,
            prompt,
            preselected: None,
            request_count: stats::DEFAULT_REQUEST_COUNT,
        }
    }

    /// 指定链类型，跳过 URL 检测
    pub fn with_chain(mut self, chain: Option<ChainKind>) -> Self {
        self.preselected = chain;
        self
    }

    pub fn with_request_count(mut self, count: usize) -> Self {
        self.request_count = count;
        self
    }

    pub async fn run(&mut self) -> Result<Outcome> {
        let mut state = State::Detecting;

        loop {
            log::debug!("flow state: {:?}", state);

            state = match state {
                State::Detecting => {
                    let chain = if let Some(chain) = self.preselected {
                        println!("\nUsing chain type: {}", chain);
                        chain
                    } else if let Some(chain) = detect_chain(self.rpc_url) {
                        println!("\n{}", detected_message(chain));
                        chain
                    } else {
                        match self.choose_chain("Unable to detect chain automatically.")? {
                            Ok(chain) => chain,
                            Err(e) => return Ok(Outcome::Aborted(AbortReason::InvalidSelection(e))),
                        }
                    };

                    println!("\nChecking RPC availability...");
                    State::Confirming {
                        chain,
                        retried: false,
                    }
                }

                State::Confirming { chain, retried } => {
                    match self.checker.check(chain, false).await {
                        Ok(_) => State::Measuring(chain),
                        Err(e) if !retried => {
                            println!("[-] RPC check failed or offline: {}", e);
                            State::RetryPrompt { failed: chain }
                        }
                        Err(e) => {
                            println!("[-] RPC check failed again: {}", e);
                            return Ok(Outcome::Aborted(AbortReason::RetryFailed(chain)));
                        }
                    }
                }

                State::RetryPrompt { failed } => {
                    match self.choose_chain("Trying manual chain selection due to failure.")? {
                        Err(e) => return Ok(Outcome::Aborted(AbortReason::InvalidSelection(e))),
                        // 重复选择失败的链视为接受失败，不再重试
                        Ok(chain) if chain == failed => {
                            println!("Same chain type selected again. Exiting.");
                            return Ok(Outcome::Aborted(AbortReason::SameChoiceRepeated(chain)));
                        }
                        Ok(chain) => State::Confirming {
                            chain,
                            retried: true,
                        },
                    }
                }

                State::Measuring(chain) => {
                    println!("\nMeasuring requests per second (RPS)... This may take a few seconds.");
                    let sample =
                        stats::measure_throughput(self.checker, chain, self.request_count).await;
                    stats::print_report(&sample);
                    return Ok(Outcome::Measured(sample));
                }
            };
        }
    }

    /// 打印编号菜单并读取选择。外层 `Result` 是输入错误，内层是非法选择。
    fn choose_chain(&mut self, header: &str) -> Result<Result<ChainKind, SelectionError>> {
        println!("\n{}", header);
        println!("Please select the chain type manually:");
        for chain in ChainKind::ALL {
            println!("{}. {}", chain.menu_number(), chain.menu_label());
        }

        let choice = self.prompt.read_line("Enter choice [1-5]: ")?;
        let selected = ChainKind::from_menu_choice(&choice);
        if selected.is_err() {
            println!("Invalid choice. Exiting.");
        }
        Ok(selected)
    }
}
