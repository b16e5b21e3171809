// How the uploaded link is handed back to the user.

use std::fmt;
use std::str::FromStr;

/// Output flavour for the hosted image URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkFormat {
    #[default]
    Plain,
    Markdown,
    Html,
}

impl LinkFormat {
    /// Render `url` in this format.
    pub fn render(self, url: &str) -> String {
        match self {
            LinkFormat::Plain => url.to_string(),
            LinkFormat::Markdown => format!("![]({})", url),
            LinkFormat::Html => format!("<img src=\"{}\">", url),
        }
    }
}

impl FromStr for LinkFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plain" | "url" => Ok(LinkFormat::Plain),
            "markdown" | "md" => Ok(LinkFormat::Markdown),
            "html" => Ok(LinkFormat::Html),
            other => Err(format!("unknown link format '{}'", other)),
        }
    }
}

impl fmt::Display for LinkFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LinkFormat::Plain => "plain",
            LinkFormat::Markdown => "markdown",
            LinkFormat::Html => "html",
        };
        f.write_str(name)
    }
}
