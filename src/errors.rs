use std::fmt;
use std::sync::Arc;

/// 后端服务标识，用于错误归类和日志
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    Database,
    Cache,
    Filter,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Database => "database",
            Backend::Cache => "cache",
            Backend::Filter => "existence filter",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared, cloneable error cause.
pub type Cause = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// 简单的字符串 cause（超时、取消等没有底层错误对象的场景）
#[derive(Debug)]
struct Message(String);

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for Message {}

#[derive(Debug, Clone)]
pub enum ShortdigestError {
    /// The URL is already registered; `digest` is the original one.
    AlreadyExists { url: String, digest: String },
    NotFound { digest: String },
    /// Any connectivity or storage fault. The raw cause is kept for diagnostics.
    BackendUnavailable { backend: Backend, cause: Cause },
    /// The single salted regeneration still collided.
    CollisionExhausted { url: String, digest: String },
    InvalidInput(String),
    Config(String),
    /// A backend stayed unreachable after every startup probe.
    Startup {
        backend: Backend,
        attempts: u32,
        cause: Cause,
    },
}

impl ShortdigestError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            ShortdigestError::AlreadyExists { .. } => "E001",
            ShortdigestError::NotFound { .. } => "E002",
            ShortdigestError::BackendUnavailable { .. } => "E003",
            ShortdigestError::CollisionExhausted { .. } => "E004",
            ShortdigestError::InvalidInput(_) => "E005",
            ShortdigestError::Config(_) => "E006",
            ShortdigestError::Startup { .. } => "E007",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            ShortdigestError::AlreadyExists { .. } => "URL Already Exists",
            ShortdigestError::NotFound { .. } => "Digest Not Found",
            ShortdigestError::BackendUnavailable { .. } => "Backend Unavailable",
            ShortdigestError::CollisionExhausted { .. } => "Collision Exhausted",
            ShortdigestError::InvalidInput(_) => "Invalid Input",
            ShortdigestError::Config(_) => "Configuration Error",
            ShortdigestError::Startup { .. } => "Startup Failure",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> String {
        match self {
            ShortdigestError::AlreadyExists { url, digest } => {
                format!("'{}' is already registered as '{}'", url, digest)
            }
            ShortdigestError::NotFound { digest } => {
                format!("no URL is registered for digest '{}'", digest)
            }
            ShortdigestError::BackendUnavailable { backend, cause } => {
                format!("{} failed: {}", backend, cause)
            }
            ShortdigestError::CollisionExhausted { url, digest } => format!(
                "digest '{}' for '{}' collided again after salting",
                digest, url
            ),
            ShortdigestError::InvalidInput(msg) => msg.clone(),
            ShortdigestError::Config(msg) => msg.clone(),
            ShortdigestError::Startup {
                backend,
                attempts,
                cause,
            } => format!(
                "{} unreachable after {} attempts: {}",
                backend, attempts, cause
            ),
        }
    }

    /// Digest attached to the error, if any.
    ///
    /// For `AlreadyExists` this is the digest the URL was first registered with.
    pub fn digest(&self) -> Option<&str> {
        match self {
            ShortdigestError::AlreadyExists { digest, .. }
            | ShortdigestError::NotFound { digest }
            | ShortdigestError::CollisionExhausted { digest, .. } => Some(digest),
            _ => None,
        }
    }

    /// 后端故障（运行期或启动期）
    pub fn is_backend_failure(&self) -> bool {
        matches!(
            self,
            ShortdigestError::BackendUnavailable { .. } | ShortdigestError::Startup { .. }
        )
    }

    /// 格式化为彩色输出（用于终端）
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for ShortdigestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for ShortdigestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ShortdigestError::BackendUnavailable { cause, .. }
            | ShortdigestError::Startup { cause, .. } => Some(cause.as_ref()),
            _ => None,
        }
    }
}

// 便捷的构造函数
impl ShortdigestError {
    pub fn already_exists<U: Into<String>, D: Into<String>>(url: U, digest: D) -> Self {
        ShortdigestError::AlreadyExists {
            url: url.into(),
            digest: digest.into(),
        }
    }

    pub fn not_found<T: Into<String>>(digest: T) -> Self {
        ShortdigestError::NotFound {
            digest: digest.into(),
        }
    }

    pub fn collision_exhausted<U: Into<String>, D: Into<String>>(url: U, digest: D) -> Self {
        ShortdigestError::CollisionExhausted {
            url: url.into(),
            digest: digest.into(),
        }
    }

    pub fn backend<E>(backend: Backend, err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ShortdigestError::BackendUnavailable {
            backend,
            cause: Arc::new(err),
        }
    }

    pub fn backend_msg<T: Into<String>>(backend: Backend, msg: T) -> Self {
        ShortdigestError::BackendUnavailable {
            backend,
            cause: Arc::new(Message(msg.into())),
        }
    }

    pub fn startup(backend: Backend, attempts: u32, cause: ShortdigestError) -> Self {
        // 展开运行期错误，保留最底层的 cause
        let cause: Cause = match cause {
            ShortdigestError::BackendUnavailable { cause, .. }
            | ShortdigestError::Startup { cause, .. } => cause,
            other => Arc::new(other),
        };
        ShortdigestError::Startup {
            backend,
            attempts,
            cause,
        }
    }

    pub fn invalid_input<T: Into<String>>(msg: T) -> Self {
        ShortdigestError::InvalidInput(msg.into())
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        ShortdigestError::Config(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for ShortdigestError {
    fn from(err: sea_orm::DbErr) -> Self {
        ShortdigestError::backend(Backend::Database, err)
    }
}

impl From<redis::RedisError> for ShortdigestError {
    fn from(err: redis::RedisError) -> Self {
        ShortdigestError::backend(Backend::Cache, err)
    }
}

impl From<config::ConfigError> for ShortdigestError {
    fn from(err: config::ConfigError) -> Self {
        ShortdigestError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ShortdigestError>;
