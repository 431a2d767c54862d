//! Provisioning commands and their CLI argument rendering

use serde::{Deserialize, Serialize};
use std::fmt;

/// Action value passed to every permission command
pub const PERMISSION_ACTIONS: &str = "<read|delete|create|update>";

/// A single provisioning action against the secrets store CLI
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `config update <path> <value>`
    Config { path: String, value: String },
    /// `user create --username <u> --password <p>`
    CreateUser { username: String, password: String },
    /// `secret create --path <p> --data <d>`
    CreateSecret { path: String, data: String },
    /// `secret permission create --subject <s> --path <p> ...`
    CreatePermission { subject: String, path: String },
    /// `auth -u <u> -p <p>`
    CreateToken { username: String, password: String },
    /// Arguments passed through verbatim
    Raw { args: Vec<String> },
}

/// Type tag of a command and of the results it produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    Config,
    User,
    Secret,
    Permission,
    Token,
    Raw,
}

/// Commands that may run concurrently
pub type Stage = Vec<Command>;

/// Stages that run strictly in order
pub type CommandSet = Vec<Stage>;

impl Command {
    pub fn config(path: impl Into<String>, value: impl Into<String>) -> Self {
        Command::Config {
            path: path.into(),
            value: value.into(),
        }
    }

    pub fn raw<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Command::Raw {
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Config { .. } => CommandKind::Config,
            Command::CreateUser { .. } => CommandKind::User,
            Command::CreateSecret { .. } => CommandKind::Secret,
            Command::CreatePermission { .. } => CommandKind::Permission,
            Command::CreateToken { .. } => CommandKind::Token,
            Command::Raw { .. } => CommandKind::Raw,
        }
    }

    /// Render the CLI argument list for this command
    pub fn args(&self) -> Vec<String> {
        let args: Vec<&str> = match self {
            Command::Config { path, value } => vec!["config", "update", path.as_str(), value.as_str()],
            Command::CreateUser { username, password } => vec![
                "user",
                "create",
                "--username",
                username.as_str(),
                "--password",
                password.as_str(),
            ],
            Command::CreateSecret { path, data } => {
                vec!["secret", "create", "--path", path.as_str(), "--data", data.as_str()]
            }
            Command::CreatePermission { subject, path } => vec![
                "secret",
                "permission",
                "create",
                "--subject",
                subject.as_str(),
                "--path",
                path.as_str(),
                "--action",
                PERMISSION_ACTIONS,
                "--effect",
                "allow",
            ],
            Command::CreateToken { username, password } => {
                vec!["auth", "-u", username.as_str(), "-p", password.as_str()]
            }
            Command::Raw { args } => return args.clone(),
        };
        args.into_iter().map(String::from).collect()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.args().join(" "))
    }
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::Config => "config",
            CommandKind::User => "user",
            CommandKind::Secret => "secret",
            CommandKind::Permission => "permission",
            CommandKind::Token => "token",
            CommandKind::Raw => "raw",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed value produced by a successful command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CmdResult {
    pub kind: CommandKind,
    pub value: String,
}

/// Token response printed by the CLI's `auth` command
#[derive(Debug, Deserialize)]
struct TokenOutput {
    #[serde(
        rename = "accessToken",
        alias = "AccessToken",
        alias = "access_token",
        alias = "accesstoken"
    )]
    access_token: String,
}

impl CmdResult {
    pub fn token(value: impl Into<String>) -> Self {
        Self {
            kind: CommandKind::Token,
            value: value.into(),
        }
    }

    /// Parse the CLI's token output.
    ///
    /// Returns `None` when the output holds no JSON object with a non-empty
    /// access token. Text printed around the object is ignored.
    pub fn token_from_output(output: &[u8]) -> Option<Self> {
        let parsed = serde_json::from_slice::<TokenOutput>(output).ok().or_else(|| {
            let text = std::str::from_utf8(output).ok()?;
            let start = text.find('{')?;
            let end = text.rfind('}')?;
            if end < start {
                return None;
            }
            serde_json::from_str::<TokenOutput>(&text[start..=end]).ok()
        })?;

        if parsed.access_token.is_empty() {
            return None;
        }
        Some(Self::token(parsed.access_token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argument_rendering() {
        let cmd = Command::config("auth.username", "admin");
        assert_eq!(cmd.args(), vec!["config", "update", "auth.username", "admin"]);
        assert_eq!(cmd.kind(), CommandKind::Config);

        let cmd = Command::CreatePermission {
            subject: "users:a@b.c".to_string(),
            path: "10.0.0.1/<.*>".to_string(),
        };
        assert_eq!(
            cmd.to_string(),
            "secret permission create --subject users:a@b.c --path 10.0.0.1/<.*> \
             --action <read|delete|create|update> --effect allow"
        );

        let cmd = Command::CreateToken {
            username: "a@b.c".to_string(),
            password: "a@b.c@1".to_string(),
        };
        assert_eq!(cmd.args(), vec!["auth", "-u", "a@b.c", "-p", "a@b.c@1"]);
        assert_eq!(cmd.kind(), CommandKind::Token);
    }

    #[test]
    fn test_raw_args_are_verbatim() {
        let cmd = Command::raw(["auth", "clear"]);
        assert_eq!(cmd.args(), vec!["auth", "clear"]);
        assert_eq!(cmd.kind(), CommandKind::Raw);
        assert!(Command::raw(Vec::<String>::new()).args().is_empty());
    }

    #[test]
    fn test_token_from_output() {
        let output = br#"{"accessToken":"tok-1","expiresIn":3600,"tokenType":"bearer"}"#;
        assert_eq!(CmdResult::token_from_output(output), Some(CmdResult::token("tok-1")));

        let output = b"Authenticated.\n{\"access_token\": \"tok-2\"}\n";
        assert_eq!(CmdResult::token_from_output(output), Some(CmdResult::token("tok-2")));

        assert_eq!(CmdResult::token_from_output(b"not json"), None);
        assert_eq!(CmdResult::token_from_output(br#"{"accessToken":""}"#), None);
    }
}
