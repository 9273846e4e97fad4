use urlencoding::encode;

const X_INTENT_URL: &str = "https://x.com/intent/tweet";
const LINE_SHARE_URL: &str = "https://social-plugins.line.me/lineit/share";

/// Value of an anchor's `data-share` attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShareTarget {
    X,
    Line,
}

impl ShareTarget {
    pub fn from_attr(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "x" | "twitter" => Some(Self::X),
            "line" => Some(Self::Line),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShareLinks {
    pub x: String,
    pub line: String,
}

impl ShareLinks {
    pub fn build(page_url: &str, title: &str) -> Self {
        let url = encode(page_url);
        Self {
            x: format!("{X_INTENT_URL}?url={url}&text={}", encode(title)),
            line: format!("{LINE_SHARE_URL}?url={url}"),
        }
    }

    pub fn href_for(&self, target: ShareTarget) -> &str {
        match target {
            ShareTarget::X => &self.x,
            ShareTarget::Line => &self.line,
        }
    }
}
