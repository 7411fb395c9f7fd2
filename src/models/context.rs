use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::query::{BackendChoice, ModeOverride, ResultSet};

#[derive(Debug, Deserialize, Clone)]
pub struct ChatRequest {
    #[serde(alias = "query")]
    pub question: String, // 用户提问内容
    #[serde(default)]
    pub mode: Option<ModeOverride>,
    #[serde(default = "default_show_details")]
    pub show_details: bool,
}

fn default_show_details() -> bool {
    true
}

impl ChatRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            mode: None,
            show_details: true,
        }
    }

    pub fn with_mode(mut self, mode: ModeOverride) -> Self {
        self.mode = Some(mode);
        self
    }
}

/// 地图展示用坐标 (结果中同时带有 latitude/longitude 时)
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct MapPoint {
    pub lat: f64,
    pub lon: f64,
}

/// 一次问答交给展示层的全部内容
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChatAnswer {
    pub request_id: Uuid,
    pub question: String,
    pub backend: BackendChoice,
    /// 合成出的查询文本, 供界面展示
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ResultSet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub map_points: Vec<MapPoint>,
    #[serde(default)]
    pub notices: Vec<String>,
}

impl ChatAnswer {
    pub fn new(request_id: Uuid, question: &str, backend: BackendChoice) -> Self {
        Self {
            request_id,
            question: question.to_string(),
            backend,
            query_text: None,
            result: None,
            summary: None,
            map_points: Vec::new(),
            notices: Vec::new(),
        }
    }
}
