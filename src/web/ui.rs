use crate::web::AppState;
use axum::{extract::State, response::Html};

const INDEX_TEMPLATE: &str = include_str!("../../templates/index.html");

/// 页面配色预设
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemePreset {
    #[default]
    Midnight,
    Daylight,
    Meadow,
}

/// 模板中替换的颜色
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub name: &'static str,
    pub background: &'static str,
    pub surface: &'static str,
    pub accent: &'static str,
    pub text: &'static str,
    pub muted: &'static str,
}

impl ThemePreset {
    pub fn theme(self) -> Theme {
        match self {
            ThemePreset::Midnight => Theme {
                name: "midnight",
                background: "linear-gradient(135deg, #1e1b4b 0%, #312e81 100%)",
                surface: "#1f2937",
                accent: "#a78bfa",
                text: "#f3f4f6",
                muted: "#9ca3af",
            },
            ThemePreset::Daylight => Theme {
                name: "daylight",
                background: "linear-gradient(135deg, #fef3c7 0%, #fde68a 100%)",
                surface: "#ffffff",
                accent: "#d97706",
                text: "#1f2937",
                muted: "#6b7280",
            },
            ThemePreset::Meadow => Theme {
                name: "meadow",
                background: "linear-gradient(135deg, #d1fae5 0%, #6ee7b7 100%)",
                surface: "#f0fdf4",
                accent: "#047857",
                text: "#064e3b",
                muted: "#4b5563",
            },
        }
    }
}

impl Theme {
    /// 把配色代入首页模板
    pub fn render(&self, fusion_supported: bool) -> String {
        INDEX_TEMPLATE
            .replace("{{THEME_NAME}}", self.name)
            .replace("{{BACKGROUND}}", self.background)
            .replace("{{SURFACE}}", self.surface)
            .replace("{{ACCENT}}", self.accent)
            .replace("{{TEXT}}", self.text)
            .replace("{{MUTED}}", self.muted)
            .replace("{{FUSION_DISABLED}}", if fusion_supported { "" } else { "disabled" })
    }
}

/// 首页处理器
pub async fn index_handler(State(state): State<AppState>) -> Html<String> {
    let theme = state.config.theme.theme();
    Html(theme.render(state.pipeline.supports_fusion()))
}
