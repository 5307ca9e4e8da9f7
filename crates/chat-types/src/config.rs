use serde::{Deserialize, Serialize};

use crate::{ChatError, Result};

/// Text substituted into a placeholder whose stream failed
pub const STREAM_ERROR_TEXT: &str = "错误: 获取响应失败";

/// Top-level client configuration, loaded once at startup
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatConfig {
    pub chat: CozeConfig,
    pub content_store: ContentStoreConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CozeConfig {
    pub token: String,
    pub api_base: String,
    pub bot_id: String,
    pub user_id: String,
}

impl Default for CozeConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_base: "https://api.coze.cn".to_string(),
            bot_id: String::new(),
            user_id: "web-user".to_string(),
        }
    }
}

impl CozeConfig {
    pub fn chat_url(&self) -> String {
        format!("{}/v3/chat", self.api_base.trim_end_matches('/'))
    }
}

/// Where uploaded images live: {owner}/{repo}@{branch}/{directory}/
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentStoreConfig {
    pub token: String,
    pub api_base: String,
    pub raw_base: String,
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub directory: String,
}

impl Default for ContentStoreConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_base: "https://api.github.com".to_string(),
            raw_base: "https://raw.githubusercontent.com".to_string(),
            owner: "LivingRoomcode".to_string(),
            repo: "llmImage".to_string(),
            branch: "main".to_string(),
            directory: "images".to_string(),
        }
    }
}

impl ContentStoreConfig {
    /// Repository-relative path for an uploaded file
    pub fn object_path(&self, file_name: &str) -> String {
        let dir = self.directory.trim_matches('/');
        if dir.is_empty() {
            file_name.to_string()
        } else {
            format!("{}/{}", dir, file_name)
        }
    }
}

impl ChatConfig {
    /// Build a config from a key lookup, falling back to defaults for
    /// anything the lookup does not provide.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let chat_defaults = CozeConfig::default();
        let store_defaults = ContentStoreConfig::default();

        Self {
            chat: CozeConfig {
                token: get("COZE_API_TOKEN").unwrap_or(chat_defaults.token),
                api_base: get("COZE_API_BASE").unwrap_or(chat_defaults.api_base),
                bot_id: get("COZE_BOT_ID").unwrap_or(chat_defaults.bot_id),
                user_id: get("COZE_USER_ID").unwrap_or(chat_defaults.user_id),
            },
            content_store: ContentStoreConfig {
                token: get("GITHUB_ACCESS_TOKEN").unwrap_or(store_defaults.token),
                api_base: get("GITHUB_API_BASE").unwrap_or(store_defaults.api_base),
                raw_base: get("GITHUB_RAW_BASE").unwrap_or(store_defaults.raw_base),
                owner: get("GITHUB_OWNER").unwrap_or(store_defaults.owner),
                repo: get("GITHUB_REPO").unwrap_or(store_defaults.repo),
                branch: get("GITHUB_BRANCH").unwrap_or(store_defaults.branch),
                directory: get("GITHUB_IMAGE_DIR").unwrap_or(store_defaults.directory),
            },
        }
    }

    /// Config baked in from the build environment.
    /// There is no process environment inside the browser.
    pub fn from_build_env() -> Self {
        Self::from_lookup(|key| {
            let value = match key {
                "COZE_API_TOKEN" => option_env!("COZE_API_TOKEN"),
                "COZE_API_BASE" => option_env!("COZE_API_BASE"),
                "COZE_BOT_ID" => option_env!("COZE_BOT_ID"),
                "COZE_USER_ID" => option_env!("COZE_USER_ID"),
                "GITHUB_ACCESS_TOKEN" => option_env!("GITHUB_ACCESS_TOKEN"),
                "GITHUB_API_BASE" => option_env!("GITHUB_API_BASE"),
                "GITHUB_RAW_BASE" => option_env!("GITHUB_RAW_BASE"),
                "GITHUB_OWNER" => option_env!("GITHUB_OWNER"),
                "GITHUB_REPO" => option_env!("GITHUB_REPO"),
                "GITHUB_BRANCH" => option_env!("GITHUB_BRANCH"),
                "GITHUB_IMAGE_DIR" => option_env!("GITHUB_IMAGE_DIR"),
                _ => None,
            };
            value.map(String::from)
        })
    }

    /// Report every missing credential at once
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.chat.token.is_empty() {
            missing.push("COZE_API_TOKEN");
        }
        if self.chat.bot_id.is_empty() {
            missing.push("COZE_BOT_ID");
        }
        if self.content_store.token.is_empty() {
            missing.push("GITHUB_ACCESS_TOKEN");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ChatError::Config(format!("missing {}", missing.join(", "))))
        }
    }
}
