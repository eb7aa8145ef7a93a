use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, ValueEnum};
use url::Url;

use crate::conversation::Mode;
use crate::error::{ChatError, Result};
use crate::render::ImagePolicy;

/// Request body layout sent to the chat endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum PayloadShape {
    /// `{ messages, model, temperature, max_tokens }` with a bearer token.
    #[default]
    History,
    /// `{ user_input, user_unique_id }`, unauthenticated.
    SingleTurn,
}

#[derive(Debug, Clone, Args)]
pub struct ChatArgs {
    /// Chat API endpoint
    #[arg(long, env = "LINGXI_API_URL", default_value = "http://localhost:8888/chat")]
    pub api_url: String,

    /// Bearer token for the history payload
    #[arg(long, env = "LINGXI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Model name sent with the history payload
    #[arg(long, env = "LINGXI_MODEL", default_value = "gpt-3.5-turbo")]
    pub model: String,

    #[arg(long, env = "LINGXI_TEMPERATURE", default_value_t = 0.7)]
    pub temperature: f64,

    #[arg(long, env = "LINGXI_MAX_TOKENS", default_value_t = 1000)]
    pub max_tokens: u32,

    /// Request body layout for the starting mode (each mode has its own default)
    #[arg(long, env = "LINGXI_PAYLOAD", value_enum)]
    pub payload: Option<PayloadShape>,

    /// Stable user id for the single-turn payload (random per run if unset)
    #[arg(long, env = "LINGXI_USER_ID")]
    pub user_id: Option<String>,

    /// Request timeout in seconds
    #[arg(long, env = "LINGXI_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    /// Persona to start in
    #[arg(long, env = "LINGXI_MODE", default_value = "assistant")]
    pub mode: String,

    /// Shell command that records speech and prints the transcript
    #[arg(long, env = "LINGXI_VOICE_COMMAND")]
    pub voice_command: Option<String>,

    /// Emit image marker payloads without URL validation
    #[arg(long)]
    pub trust_images: bool,

    /// Print replies as HTML fragments instead of plain text
    #[arg(long)]
    pub html: bool,
}

#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub endpoint: Url,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    /// Overrides the payload shape of the starting mode only.
    pub payload: Option<PayloadShape>,
    pub user_id: String,
    pub timeout: Duration,
    pub mode: Mode,
    pub voice_command: Option<String>,
    pub image_policy: ImagePolicy,
    pub html: bool,
}

impl ChatConfig {
    pub fn from_args(args: ChatArgs) -> Result<Self> {
        let endpoint = Url::parse(&args.api_url)
            .map_err(|e| ChatError::Config(format!("invalid API URL '{}': {}", args.api_url, e)))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(ChatError::Config(format!(
                "API URL must use http or https, got '{}'",
                endpoint.scheme()
            )));
        }
        if args.timeout_secs == 0 {
            return Err(ChatError::Config("timeout must be at least one second".to_string()));
        }

        Ok(Self {
            endpoint,
            api_key: args.api_key.filter(|k| !k.trim().is_empty()),
            model: args.model,
            temperature: args.temperature,
            max_tokens: args.max_tokens,
            payload: args.payload,
            user_id: args
                .user_id
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            timeout: Duration::from_secs(args.timeout_secs),
            mode: args.mode.parse()?,
            voice_command: args.voice_command.filter(|c| !c.trim().is_empty()),
            image_policy: if args.trust_images {
                ImagePolicy::Verbatim
            } else {
                ImagePolicy::AbsoluteUrl
            },
            html: args.html,
        })
    }

    pub fn payload_for(&self, mode: Mode) -> PayloadShape {
        match self.payload {
            Some(shape) if mode == self.mode => shape,
            _ => mode.payload_shape(),
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 3333)]
    pub port: u16,

    /// Address to bind
    #[arg(long, env = "LINGXI_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Directory holding the widget assets
    #[arg(long, env = "LINGXI_WEB_ROOT", default_value = "web")]
    pub root: PathBuf,

    /// Extra origin allowed in the CSP connect-src (the chat API)
    #[arg(long, env = "LINGXI_API_ORIGIN", default_value = "http://localhost:8888")]
    pub api_origin: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub root: PathBuf,
    pub api_origin: String,
}

impl ServerConfig {
    pub fn from_args(args: ServeArgs) -> Result<Self> {
        let addr: SocketAddr = format!("{}:{}", args.host, args.port)
            .parse()
            .map_err(|e| ChatError::Config(format!("invalid bind address '{}': {}", args.host, e)))?;

        let origin = Url::parse(&args.api_origin)
            .map_err(|e| ChatError::Config(format!("invalid API origin '{}': {}", args.api_origin, e)))?
            .origin()
            .ascii_serialization();

        Ok(Self {
            addr,
            root: args.root,
            api_origin: origin,
        })
    }

    pub fn index_file(&self) -> PathBuf {
        self.root.join("index.html")
    }
}
