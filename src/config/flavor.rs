use serde::{Deserialize, Serialize};

/// Upstream wire protocol spoken by the transport
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ProtocolFlavor {
    /// `POST {base}/v1/chat/completions` with a forced function call
    ChatCompletion,
    /// `POST {base}/v1beta/models/{model}:generateContent` with search grounding
    #[default]
    GenerativeSearch,
}

impl ProtocolFlavor {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolFlavor::ChatCompletion => "chat-completion",
            ProtocolFlavor::GenerativeSearch => "generative-search",
        }
    }
}

impl std::str::FromStr for ProtocolFlavor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chat" | "chat-completion" | "chat_completion" | "openai" => {
                Ok(ProtocolFlavor::ChatCompletion)
            }
            "generative" | "generative-search" | "generative_search" | "gemini" => {
                Ok(ProtocolFlavor::GenerativeSearch)
            }
            other => Err(format!("unknown protocol flavor: {other}")),
        }
    }
}

impl std::fmt::Display for ProtocolFlavor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
