//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `SCOUT__*` 覆盖（双下划线表示嵌套，如 `SCOUT__LLM__PROVIDER=mock`）。

use std::path::PathBuf;

use serde::Deserialize;

use crate::llm::{GROQ_INSTANT, GROQ_VERSATILE};

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub tools: ToolsSection,
    pub memory: MemorySection,
    pub evaluation: EvaluationSection,
    pub learning: LearningSection,
}

impl AppConfig {
    /// 错误记忆文件路径：显式配置优先，否则为 `<data_dir>/mistakes.json`
    pub fn mistakes_file(&self) -> PathBuf {
        self.memory
            .mistakes_file
            .clone()
            .unwrap_or_else(|| self.app.data_dir.join("mistakes.json"))
    }
}

/// [app] 段：数据目录
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

/// [llm] 段：后端选择、模型与采样参数
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// 后端：groq / openai / mock
    #[serde(default = "default_provider")]
    pub provider: String,
    /// 自由文本回答使用的模型
    #[serde(default = "default_model")]
    pub model: String,
    /// 结构化输出（计划、摘要 JSON）使用的模型，通常更稳定
    #[serde(default = "default_structured_model")]
    pub structured_model: String,
    pub base_url: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            structured_model: default_structured_model(),
            base_url: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_provider() -> String {
    "groq".to_string()
}

fn default_model() -> String {
    GROQ_INSTANT.to_string()
}

fn default_structured_model() -> String {
    GROQ_VERSATILE.to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    2048
}

/// [tools] 段：单次工具调用超时与搜索参数
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsSection {
    /// 单次工具调用超时（秒）
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
    #[serde(default)]
    pub search: SearchSection,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            tool_timeout_secs: default_tool_timeout_secs(),
            search: SearchSection::default(),
        }
    }
}

fn default_tool_timeout_secs() -> u64 {
    30
}

/// [tools.search] 段：DuckDuckGo HTML 端点、结果条数、HTTP 超时
#[derive(Debug, Clone, Deserialize)]
pub struct SearchSection {
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default = "default_search_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            endpoint: default_search_endpoint(),
            max_results: default_max_results(),
            timeout_secs: default_search_timeout_secs(),
        }
    }
}

fn default_search_endpoint() -> String {
    "https://html.duckduckgo.com/html/".to_string()
}

fn default_max_results() -> usize {
    5
}

fn default_search_timeout_secs() -> u64 {
    15
}

/// [memory] 段：错误记忆文件、存储上限、「反复出现」阈值
#[derive(Debug, Clone, Deserialize)]
pub struct MemorySection {
    /// 未设置时使用 `<data_dir>/mistakes.json`
    pub mistakes_file: Option<PathBuf>,
    #[serde(default = "default_max_mistakes_stored")]
    pub max_mistakes_stored: usize,
    /// 频次达到该值的错误视为反复出现的模式
    #[serde(default = "default_recurrence_threshold")]
    pub recurrence_threshold: u32,
}

impl Default for MemorySection {
    fn default() -> Self {
        Self {
            mistakes_file: None,
            max_mistakes_stored: default_max_mistakes_stored(),
            recurrence_threshold: default_recurrence_threshold(),
        }
    }
}

fn default_max_mistakes_stored() -> usize {
    100
}

fn default_recurrence_threshold() -> u32 {
    2
}

/// [evaluation] 段：回答中「承认数据不足」的短语（大小写不敏感的子串匹配）
#[derive(Debug, Clone, Deserialize)]
pub struct EvaluationSection {
    #[serde(default = "default_admission_phrases")]
    pub admission_phrases: Vec<String>,
}

impl Default for EvaluationSection {
    fn default() -> Self {
        Self {
            admission_phrases: default_admission_phrases(),
        }
    }
}

pub fn default_admission_phrases() -> Vec<String> {
    vec![
        "don't have".into(),
        "no data".into(),
        "cannot answer".into(),
        "insufficient information".into(),
    ]
}

/// [learning] 段：是否按历史运行次数自动设定故障注入概率（演示学习过程）
#[derive(Debug, Clone, Deserialize)]
pub struct LearningSection {
    #[serde(default = "default_auto_mistake_schedule")]
    pub auto_mistake_schedule: bool,
}

impl Default for LearningSection {
    fn default() -> Self {
        Self {
            auto_mistake_schedule: default_auto_mistake_schedule(),
        }
    }
}

fn default_auto_mistake_schedule() -> bool {
    true
}

/// 从 config 目录加载配置，环境变量 SCOUT__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 则追加该文件（可覆盖前面的键），文件不存在时返回 NotFound
/// 3. 最后叠加环境变量 SCOUT__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(path) = config_path {
        if !path.exists() {
            return Err(config::ConfigError::NotFound(path.display().to_string()));
        }
        builder = builder.add_source(config::File::from(path));
    }

    builder = builder.add_source(
        config::Environment::with_prefix("SCOUT")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
