//! `nimbus send <METHOD> <URL>` – execute one logical API call.

use anyhow::{Context, Result};
use http::{HeaderName, HeaderValue, Method};
use nimbus_core::cancel::CancelToken;
use nimbus_core::config::NimbusConfig;
use nimbus_core::executor::CommandExecutor;
use nimbus_core::request::ApiRequest;
use nimbus_core::transport::CurlTransport;
use std::sync::Arc;
use url::Url;

pub fn run_send(
    cfg: &NimbusConfig,
    method: &str,
    url: &str,
    headers: &[String],
    data: Option<String>,
) -> Result<()> {
    let method: Method = method
        .to_uppercase()
        .parse()
        .context("invalid HTTP method")?;
    let endpoint: Url = url.parse().context("invalid URL")?;

    let mut request = ApiRequest::new(method, endpoint);
    for raw in headers {
        let (name, value) = raw
            .split_once(':')
            .with_context(|| format!("header must be `Name: value`, got {raw:?}"))?;
        let name = HeaderName::from_bytes(name.trim().as_bytes())
            .with_context(|| format!("invalid header name in {raw:?}"))?;
        let value = HeaderValue::from_str(value.trim())
            .with_context(|| format!("invalid header value in {raw:?}"))?;
        request.headers.insert(name, value);
    }
    if let Some(data) = data {
        request.body = Some(data.into_bytes());
    }

    let transport = Arc::new(CurlTransport::from_config(&cfg.transport));
    let executor = CommandExecutor::from_config(cfg, transport);
    let (result, stats) = executor.execute_with_stats(request, &CancelToken::new());

    match result {
        Ok(mut response) => {
            let body = response.body.read_to_vec()?;
            println!(
                "HTTP {} after {} attempt(s), {} redirect(s) in {:.2?}",
                response.status, stats.attempts, stats.redirects, stats.elapsed
            );
            if !body.is_empty() {
                println!("{}", String::from_utf8_lossy(&body));
            }
            Ok(())
        }
        Err(error) => anyhow::bail!(
            "{error} (after {} attempt(s) in {:.2?})",
            stats.attempts,
            stats.elapsed
        ),
    }
}
