//! Out-of-process primary analyzers speaking the [`wire`](super::wire) contract.
//!
//! - `CommandAnalyzer`: one child process per exchange, request on stdin,
//!   response on stdout. The child is killed when its future is dropped, so a
//!   primary that loses the timeout race does not linger.
//! - `HttpAnalyzer`: POSTs the request as JSON.

use std::process::Stdio;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::debug;

use super::wire::{WireRequest, WireResponse};
use super::Analyzer;
use crate::error::{AnalysisError, AnalysisResult};
use crate::lexicon::{LexiconEntry, LexiconSnapshot};
use crate::sentiment::SentimentResult;

fn shipped_lexicon(lexicon: &LexiconSnapshot) -> Option<Vec<LexiconEntry>> {
    let entries = lexicon.custom_entries();
    (!entries.is_empty()).then_some(entries)
}

fn primary_err(e: anyhow::Error) -> AnalysisError {
    AnalysisError::Primary(format!("{e:#}"))
}

#[derive(Debug, Clone)]
pub struct CommandAnalyzer {
    program: String,
    args: Vec<String>,
}

impl CommandAnalyzer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    async fn exchange(&self, req: &WireRequest) -> Result<WireResponse> {
        let payload = serde_json::to_vec(req)?;
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("spawning analyzer `{}`", self.program))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("analyzer stdin not captured"))?;
        stdin.write_all(&payload).await.context("writing request")?;
        stdin.shutdown().await.ok();
        drop(stdin);

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("analyzer stdout not captured"))?;
        let mut buf = Vec::new();
        stdout.read_to_end(&mut buf).await.context("reading response")?;

        let status = child.wait().await.context("waiting for analyzer")?;
        if !status.success() && buf.is_empty() {
            return Err(anyhow!("analyzer exited with {status}"));
        }
        debug!(target: "sentiment::analyze", bytes = buf.len(), "command analyzer replied");
        serde_json::from_slice(&buf).context("decoding analyzer response")
    }
}

#[async_trait::async_trait]
impl Analyzer for CommandAnalyzer {
    fn name(&self) -> &'static str {
        "command"
    }

    async fn analyze(&self, text: &str, lexicon: &LexiconSnapshot) -> AnalysisResult<SentimentResult> {
        let req = WireRequest::AnalyzeSingle {
            comment: text.to_string(),
            lexicon: shipped_lexicon(lexicon),
        };
        self.exchange(&req).await.map_err(primary_err)?.into_result()
    }

    async fn analyze_batch(
        &self,
        texts: &[String],
        lexicon: &LexiconSnapshot,
    ) -> AnalysisResult<Vec<SentimentResult>> {
        let req = WireRequest::GenerateReport {
            feedbacks: texts.to_vec(),
            lexicon: shipped_lexicon(lexicon),
        };
        self.exchange(&req)
            .await
            .map_err(primary_err)?
            .into_batch(texts.len())
    }
}

#[derive(Debug, Clone)]
pub struct HttpAnalyzer {
    http: reqwest::Client,
    url: String,
}

impl HttpAnalyzer {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("event-feedback-sentiment/0.1")
            .connect_timeout(Duration::from_secs(2))
            .timeout(timeout)
            .build()
            .context("building analyzer http client")?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }

    async fn exchange(&self, req: &WireRequest) -> Result<WireResponse> {
        let resp = self
            .http
            .post(&self.url)
            .json(req)
            .send()
            .await
            .with_context(|| format!("POST {}", self.url))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("analyzer returned HTTP {status}"));
        }
        resp.json::<WireResponse>()
            .await
            .context("decoding analyzer response")
    }
}

#[async_trait::async_trait]
impl Analyzer for HttpAnalyzer {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn analyze(&self, text: &str, lexicon: &LexiconSnapshot) -> AnalysisResult<SentimentResult> {
        let req = WireRequest::AnalyzeSingle {
            comment: text.to_string(),
            lexicon: shipped_lexicon(lexicon),
        };
        self.exchange(&req).await.map_err(primary_err)?.into_result()
    }

    async fn analyze_batch(
        &self,
        texts: &[String],
        lexicon: &LexiconSnapshot,
    ) -> AnalysisResult<Vec<SentimentResult>> {
        let req = WireRequest::GenerateReport {
            feedbacks: texts.to_vec(),
            lexicon: shipped_lexicon(lexicon),
        };
        self.exchange(&req)
            .await
            .map_err(primary_err)?
            .into_batch(texts.len())
    }
}
