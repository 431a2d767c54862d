//! Construction of the staged provisioning command set

use crate::command::{Command, CommandKind, CommandSet, Stage};
use crate::error::ProvisionError;
use crate::random;
use crate::tree::PathTree;
use rand::Rng;
use vaultload_config::ProvisionConfig;

/// Root name of the secret tree
pub const SECRET_ROOT: &str = "secrets";

/// Inputs to [`ProvisionPlan::generate`]
#[derive(Debug, Clone)]
pub struct PlanSettings {
    pub tenant: String,
    pub domain: String,
    pub admin_user: String,
    pub admin_password: String,
    pub users: usize,
    pub secrets: usize,
    pub permissions: usize,
    pub secret_length: usize,
}

impl PlanSettings {
    pub fn from_config(config: &ProvisionConfig, tenant: impl Into<String>) -> Self {
        Self {
            tenant: tenant.into(),
            domain: config.domain.clone(),
            admin_user: config.admin_user.clone(),
            admin_password: config.admin_password(),
            users: config.users,
            secrets: config.secrets,
            permissions: config.permissions,
            secret_length: config.secret_length,
        }
    }
}

/// Everything needed to populate a tenant and later attack it
#[derive(Debug, Clone)]
pub struct ProvisionPlan {
    pub commands: CommandSet,
    pub users: Vec<String>,
    pub scopes: Vec<String>,
    pub secret_paths: Vec<String>,
}

/// Password given to each generated user
pub fn user_password(username: &str) -> String {
    format!("{}@1", username)
}

impl ProvisionPlan {
    /// Build the command stages for a tenant:
    ///
    /// 1. clear cached CLI auth
    /// 2. one stage per CLI config key (they rewrite the same config file)
    /// 3. users and secrets
    /// 4. one permission per user and scope
    /// 5. one token per user
    pub fn generate<R: Rng + ?Sized>(
        settings: &PlanSettings,
        rng: &mut R,
    ) -> Result<Self, ProvisionError> {
        let mut commands: CommandSet = vec![vec![Command::raw(["auth", "clear"])]];

        for (key, value) in [
            ("tenant", &settings.tenant),
            ("auth.username", &settings.admin_user),
            ("auth.password", &settings.admin_password),
            ("domain", &settings.domain),
        ] {
            commands.push(vec![Command::config(key, value.as_str())]);
        }

        let mut creation: Stage = Vec::with_capacity(settings.users + settings.secrets);

        let users: Vec<String> = (0..settings.users).map(|_| random::email(rng)).collect();
        for username in &users {
            creation.push(Command::CreateUser {
                username: username.clone(),
                password: user_password(username),
            });
        }

        let mut tree = PathTree::with_random_scopes(SECRET_ROOT, settings.permissions, rng);
        let mut secret_paths = Vec::with_capacity(settings.secrets);
        for _ in 0..settings.secrets {
            let leaf = tree.add_random_leaf(random::ipv4(rng), rng)?;
            let path = tree.path_of(leaf);
            creation.push(Command::CreateSecret {
                path: path.clone(),
                data: random::alphanumeric(rng, settings.secret_length),
            });
            secret_paths.push(path);
        }
        commands.push(creation);

        let scopes = tree.first_level_paths();
        let permissions: Stage = users
            .iter()
            .flat_map(|username| {
                scopes.iter().map(move |scope| Command::CreatePermission {
                    subject: format!("users:{}", username),
                    path: format!("{}/<.*>", scope),
                })
            })
            .collect();
        commands.push(permissions);

        let tokens: Stage = users
            .iter()
            .map(|username| Command::CreateToken {
                username: username.clone(),
                password: user_password(username),
            })
            .collect();
        commands.push(tokens);

        Ok(Self {
            commands,
            users,
            scopes,
            secret_paths,
        })
    }

    /// Number of token results the pipeline should produce
    pub fn expected_tokens(&self) -> usize {
        self.commands
            .iter()
            .flatten()
            .filter(|command| command.kind() == CommandKind::Token)
            .count()
    }

    pub fn total_commands(&self) -> usize {
        self.commands.iter().map(Vec::len).sum()
    }
}
