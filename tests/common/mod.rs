//! Shared doubles and fixtures for the integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use tempfile::TempDir;

use codetalk::config::Config;
use codetalk::embedding::EmbeddingProvider;
use codetalk::llm::{LanguageModel, Message};

pub const DIMS: usize = 64;

/// Deterministic bag-of-words embedder: each lowercase word bumps one
/// of [`DIMS`] buckets, so texts sharing words score as similar.
pub struct HashEmbedder {
    pub calls: Mutex<Vec<usize>>,
    pub fail: bool,
}

impl HashEmbedder {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: true,
        }
    }
}

pub fn hash_embed(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; DIMS];
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let bucket = word
            .to_lowercase()
            .bytes()
            .fold(7usize, |h, b| h.wrapping_mul(31).wrapping_add(b as usize))
            % DIMS;
        v[bucket] += 1.0;
    }
    v
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    fn model_name(&self) -> &str {
        "hash"
    }
    fn dims(&self) -> usize {
        DIMS
    }
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.lock().unwrap().push(texts.len());
        if self.fail {
            anyhow::bail!("embedding service unavailable");
        }
        Ok(texts.iter().map(|t| hash_embed(t)).collect())
    }
}

/// Language model that records every prompt and replies with a fixed string.
pub struct ScriptedModel {
    pub reply: Option<String>,
    pub prompts: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedModel {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn last_user_prompt(&self) -> String {
        let prompts = self.prompts.lock().unwrap();
        let last = prompts.last().expect("no prompt recorded");
        last.last().expect("empty prompt").content.clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn model_name(&self) -> &str {
        "scripted"
    }
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        self.prompts.lock().unwrap().push(messages.to_vec());
        match &self.reply {
            Some(reply) => Ok(reply.clone()),
            None => anyhow::bail!("model rate limited"),
        }
    }
}

/// Config rooted in `tmp`, with providers disabled and the given bind address.
pub fn test_config(tmp: &TempDir, bind: &str) -> Config {
    let root = tmp.path();
    let content = format!(
        r#"
[db]
path = "{}/data/codetalk.sqlite"

[repos]
clone_dir = "{}/repos"

[server]
bind = "{}"
"#,
        root.display(),
        root.display(),
        bind
    );
    toml::from_str(&content).unwrap()
}

/// A small mixed-language checkout with files that must be skipped.
pub fn write_sample_repo(root: &Path) {
    fs::create_dir_all(root.join("src")).unwrap();
    fs::create_dir_all(root.join("web")).unwrap();
    fs::create_dir_all(root.join(".git")).unwrap();

    fs::write(
        root.join("src/config.py"),
        "import tomllib\n\n\
         def parseConfig(path):\n    \
             \"\"\"Read the TOML config file and return a dict.\"\"\"\n    \
             with open(path, 'rb') as f:\n        \
                 return tomllib.load(f)\n\n\
         def defaultConfig():\n    \
             return {'port': 8000}\n",
    )
    .unwrap();
    fs::write(
        root.join("src/server.rs"),
        "use std::net::TcpListener;\n\n\
         fn start_server(port: u16) {\n    \
             let listener = TcpListener::bind((\"127.0.0.1\", port)).unwrap();\n    \
             for stream in listener.incoming() {\n        \
                 handle(stream.unwrap());\n    \
             }\n\
         }\n",
    )
    .unwrap();
    fs::write(
        root.join("web/app.ts"),
        "export function renderChat(messages: string[]): string {\n  \
             return messages.join('\\n');\n\
         }\n",
    )
    .unwrap();
    fs::write(
        root.join("README.md"),
        "# Sample\n\nA sample project with a config parser and a TCP server.\n",
    )
    .unwrap();
    fs::write(root.join("logo.png"), [0x89u8, b'P', b'N', b'G']).unwrap();
    fs::write(root.join(".git/config"), "[core]\n\tbare = false\n").unwrap();
}

pub fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

pub async fn wait_for_server(port: u16) {
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{}/health", port);
    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                return;
            }
        }
    }
    panic!("Server did not become ready within 5 seconds");
}

pub fn sample_repo() -> (TempDir, Arc<HashEmbedder>) {
    let tmp = TempDir::new().unwrap();
    write_sample_repo(&tmp.path().join("checkout"));
    (tmp, Arc::new(HashEmbedder::new()))
}
