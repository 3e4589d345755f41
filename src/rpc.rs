use crate::error::CheckError;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::{Duration, Instant};

/// 默认请求超时
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// 对单个 RPC 端点发送 JSON-RPC / REST 请求的客户端
#[derive(Debug, Clone)]
pub struct RpcClient {
    client: Client,
    rpc_url: String,
    timeout: Duration,
}

impl RpcClient {
    pub fn new(rpc_url: &str, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            rpc_url: rpc_url.to_string(),
            timeout,
        }
    }

    /// 在 URL 末尾拼接 REST 路径，先去掉末尾的 '/'
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.rpc_url.trim_end_matches('/'), path)
    }

    /// 通过 HTTP POST 发送无参数的 JSON-RPC 请求，返回完整响应体
    pub async fn call(&self, method: &str) -> Result<Value, CheckError> {
        let request_body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": []
        });

        let start = Instant::now();
        let response = self
            .client
            .post(&self.rpc_url)
            .json(&request_body)
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?;

        let body: Value = response.json().await?;
        log::debug!(
            "{} -> {} ({:.2}ms)",
            method,
            self.rpc_url,
            start.elapsed().as_secs_f64() * 1000.0
        );

        // 节点返回的 JSON-RPC error 不算传输错误，由调用方按缺少 result 处理
        if let Some(message) = body
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            log::debug!("{} returned rpc error: {}", method, message);
        }

        Ok(body)
    }

    /// 对 `path` 发送 REST GET 请求
    pub async fn get(&self, path: &str) -> Result<Value, CheckError> {
        let endpoint = self.endpoint(path);

        let start = Instant::now();
        let response = self
            .client
            .get(&endpoint)
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?;

        let body: Value = response.json().await?;
        log::debug!(
            "GET {} ({:.2}ms)",
            endpoint,
            start.elapsed().as_secs_f64() * 1000.0
        );

        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let client = RpcClient::new("http://node.example/", DEFAULT_TIMEOUT);
        assert_eq!(client.endpoint("/v1"), "http://node.example/v1");

        let client = RpcClient::new("http://node.example", DEFAULT_TIMEOUT);
        assert_eq!(client.endpoint("/"), "http://node.example/");
    }

    #[tokio::test]
    async fn test_call_sends_json_rpc_body() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "getSlot",
                "params": []
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"jsonrpc":"2.0","id":1,"result":7}"#)
            .create_async()
            .await;

        let client = RpcClient::new(&server.url(), DEFAULT_TIMEOUT);
        let body = client.call("getSlot").await.expect("call");
        assert_eq!(body["result"], json!(7));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_2xx_is_transport_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/eth/v1/node/health")
            .with_status(503)
            .create_async()
            .await;

        let client = RpcClient::new(&server.url(), DEFAULT_TIMEOUT);
        let err = client.get("/eth/v1/node/health").await.unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_malformed_body_is_transport_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let client = RpcClient::new(&server.url(), DEFAULT_TIMEOUT);
        let err = client.call("eth_blockNumber").await.unwrap_err();
        assert!(err.is_transport());
    }
}
