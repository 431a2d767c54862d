//! Request targets for the attack engine
//!
//! [`TargetGenerator`] is an endless byte stream of newline-delimited JSON
//! targets, each pairing a random secret path with a random auth token.
//! [`Targeter`] turns either that stream or a fixed list into one target per
//! request.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{self, BufRead, BufReader, Read};

use crate::errors::LoadTestError;
use crate::types::HttpMethod;

/// A single request description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub method: HttpMethod,
    pub url: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub header: BTreeMap<String, Vec<String>>,
}

impl Target {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::GET,
            url: url.into(),
            header: BTreeMap::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.header.entry(name.into()).or_default().push(value.into());
        self
    }
}

/// Base URL of a tenant's secrets API
pub fn secrets_base_url(tenant_base: &str) -> String {
    format!("{}/secrets", tenant_base.trim_end_matches('/'))
}

fn target_url(root: &str, path: &str) -> String {
    format!("{}/{}", root, path.trim_start_matches('/'))
}

fn non_empty(values: Vec<String>, what: &str) -> Result<Vec<String>, LoadTestError> {
    let values: Vec<String> = values.into_iter().filter(|v| !v.is_empty()).collect();
    if values.is_empty() {
        return Err(LoadTestError::InvalidJob(format!("no {} specified", what)));
    }
    Ok(values)
}

/// Infinite reader of randomized JSON targets
pub struct TargetGenerator {
    root: String,
    paths: Vec<String>,
    tokens: Vec<String>,
    rng: fastrand::Rng,
    data: Vec<u8>,
    read_index: usize,
}

impl TargetGenerator {
    pub fn new(
        root: impl Into<String>,
        paths: Vec<String>,
        tokens: Vec<String>,
    ) -> Result<Self, LoadTestError> {
        Self::with_rng(root, paths, tokens, fastrand::Rng::new())
    }

    /// Deterministic generator for reproducible streams
    pub fn with_seed(
        root: impl Into<String>,
        paths: Vec<String>,
        tokens: Vec<String>,
        seed: u64,
    ) -> Result<Self, LoadTestError> {
        Self::with_rng(root, paths, tokens, fastrand::Rng::with_seed(seed))
    }

    fn with_rng(
        root: impl Into<String>,
        paths: Vec<String>,
        tokens: Vec<String>,
        rng: fastrand::Rng,
    ) -> Result<Self, LoadTestError> {
        Ok(Self {
            root: root.into().trim_end_matches('/').to_string(),
            paths: non_empty(paths, "secret paths")?,
            tokens: non_empty(tokens, "auth tokens")?,
            rng,
            data: Vec::new(),
            read_index: 0,
        })
    }

    /// Draw one target
    pub fn next_target(&mut self) -> Target {
        let path = &self.paths[self.rng.usize(..self.paths.len())];
        let token = &self.tokens[self.rng.usize(..self.tokens.len())];
        Target::get(target_url(&self.root, path)).with_header("Authorization", token.as_str())
    }

    fn push_target(&mut self) -> io::Result<()> {
        let target = self.next_target();
        serde_json::to_writer(&mut self.data, &target)?;
        self.data.push(b'\n');
        Ok(())
    }

    fn compact(&mut self) {
        if self.read_index > 0 {
            self.data.drain(..self.read_index);
            self.read_index = 0;
        }
    }
}

impl Read for TargetGenerator {
    /// Always fills `buf` completely; never returns EOF
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.compact();
        while self.data.len() < buf.len() {
            self.push_target()?;
        }
        buf.copy_from_slice(&self.data[..buf.len()]);
        self.read_index = buf.len();
        Ok(buf.len())
    }
}

/// Source of targets for an attack
pub enum Targeter {
    /// Round-robin over a fixed list
    Static { targets: Vec<Target>, next: usize },
    /// Decodes targets from a newline-delimited JSON stream
    Json {
        reader: BufReader<Box<dyn Read + Send>>,
        line: String,
    },
}

impl Targeter {
    /// Unauthenticated GET targets, one per path
    pub fn static_paths(root: &str, paths: Vec<String>) -> Result<Self, LoadTestError> {
        let root = root.trim_end_matches('/');
        let targets = non_empty(paths, "secret paths")?
            .iter()
            .map(|path| Target::get(target_url(root, path)))
            .collect();
        Ok(Targeter::Static { targets, next: 0 })
    }

    /// Random path and token pairs drawn from a [`TargetGenerator`]
    pub fn dynamic(root: &str, paths: Vec<String>, tokens: Vec<String>) -> Result<Self, LoadTestError> {
        Ok(Self::from_reader(TargetGenerator::new(root, paths, tokens)?))
    }

    pub fn from_reader(reader: impl Read + Send + 'static) -> Self {
        Targeter::Json {
            reader: BufReader::new(Box::new(reader)),
            line: String::new(),
        }
    }

    pub fn next_target(&mut self) -> Result<Target, LoadTestError> {
        match self {
            Targeter::Static { targets, next } => {
                let target = targets
                    .get(*next % targets.len().max(1))
                    .cloned()
                    .ok_or_else(|| LoadTestError::InvalidJob("no targets".to_string()))?;
                *next = next.wrapping_add(1);
                Ok(target)
            }
            Targeter::Json { reader, line } => loop {
                line.clear();
                if reader.read_line(line)? == 0 {
                    return Err(LoadTestError::TargetStream(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "target stream ended",
                    )));
                }
                if !line.trim().is_empty() {
                    return Ok(serde_json::from_str(line.trim_end())?);
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths() -> Vec<String> {
        vec!["/10.0.0.1/10.0.0.2".to_string(), "10.0.0.3/10.0.0.4".to_string()]
    }

    fn tokens() -> Vec<String> {
        vec!["tok-a".to_string(), "tok-b".to_string(), "tok-c".to_string()]
    }

    #[test]
    fn test_reads_fill_buffer_and_stay_in_range() {
        let mut generator =
            TargetGenerator::with_seed("https://t.example.test/secrets/", paths(), tokens(), 7)
                .unwrap();

        let mut first = vec![0u8; 4000];
        let mut second = vec![0u8; 1234];
        assert_eq!(generator.read(&mut first).unwrap(), 4000);
        assert_eq!(generator.read(&mut second).unwrap(), 1234);

        let mut stream = first;
        stream.extend_from_slice(&second);
        let text = String::from_utf8(stream).unwrap();

        let allowed_urls = [
            "https://t.example.test/secrets/10.0.0.1/10.0.0.2",
            "https://t.example.test/secrets/10.0.0.3/10.0.0.4",
        ];
        let complete_lines: Vec<&str> = text.split_inclusive('\n').filter(|l| l.ends_with('\n')).collect();
        assert!(complete_lines.len() > 10);
        for line in complete_lines {
            let target: Target = serde_json::from_str(line.trim_end()).unwrap();
            assert_eq!(target.method, HttpMethod::GET);
            assert!(allowed_urls.contains(&target.url.as_str()));
            let auth = &target.header["Authorization"];
            assert_eq!(auth.len(), 1);
            assert!(tokens().contains(&auth[0]));
        }
    }

    #[test]
    fn test_tail_is_kept_between_reads() {
        let mut generator = TargetGenerator::with_seed("http://h", paths(), tokens(), 1).unwrap();
        let mut reader = BufReader::with_capacity(7, &mut generator);

        // lines are reassembled across many tiny reads
        for _ in 0..20 {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            let target: Target = serde_json::from_str(line.trim_end()).unwrap();
            assert!(target.url.starts_with("http://h/10.0.0."));
        }
    }

    #[test]
    fn test_never_eof() {
        let mut generator = TargetGenerator::new("http://h", paths(), tokens()).unwrap();
        let mut buf = [0u8; 512];
        for _ in 0..100 {
            assert_eq!(generator.read(&mut buf).unwrap(), 512);
        }
        assert_eq!(generator.read(&mut []).unwrap(), 0);
    }

    #[test]
    fn test_rejects_empty_inputs() {
        assert!(TargetGenerator::new("http://h", Vec::new(), tokens()).is_err());
        assert!(TargetGenerator::new("http://h", paths(), vec![String::new()]).is_err());
        assert!(Targeter::static_paths("http://h", Vec::new()).is_err());
    }

    #[test]
    fn test_dynamic_targeter() {
        let mut targeter = Targeter::dynamic("http://h", paths(), tokens()).unwrap();
        for _ in 0..50 {
            let target = targeter.next_target().unwrap();
            assert!(target.header.contains_key("Authorization"));
        }
    }

    #[test]
    fn test_static_targeter_round_robin() {
        let mut targeter = Targeter::static_paths("http://h/secrets/", paths()).unwrap();
        let urls: Vec<String> = (0..4)
            .map(|_| targeter.next_target().unwrap().url)
            .collect();
        assert_eq!(
            urls,
            vec![
                "http://h/secrets/10.0.0.1/10.0.0.2",
                "http://h/secrets/10.0.0.3/10.0.0.4",
                "http://h/secrets/10.0.0.1/10.0.0.2",
                "http://h/secrets/10.0.0.3/10.0.0.4",
            ]
        );
        assert!(targeter.next_target().unwrap().header.is_empty());
    }

    #[test]
    fn test_secrets_base_url() {
        assert_eq!(
            secrets_base_url("https://blue.example.test/"),
            "https://blue.example.test/secrets"
        );
    }
}
