//! Output formatting for CLI

use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};
use tuner_core::{classify, Capabilities, Channel};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Table,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "table" => OutputFormat::Table,
            _ => OutputFormat::Text,
        }
    }
}

/// One playlist entry as shown by `list`
#[derive(Debug, Serialize, Tabled)]
pub struct ChannelRow {
    #[tabled(rename = "#")]
    pub number: usize,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Variant")]
    pub variant: String,
    #[tabled(rename = "Group")]
    pub group: String,
    #[tabled(rename = "URL")]
    pub url: String,
}

impl ChannelRow {
    pub fn from_channel(index: usize, channel: &Channel, capabilities: Capabilities) -> Self {
        Self {
            number: index + 1,
            name: channel.name.clone(),
            variant: classify(&channel.url, capabilities).to_string(),
            group: channel.attributes.group.clone().unwrap_or_default(),
            url: channel.url.clone(),
        }
    }
}

/// Result of probing one channel
#[derive(Debug, Serialize, Tabled)]
pub struct CheckRow {
    #[tabled(rename = "#")]
    pub number: usize,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Variant")]
    pub variant: String,
    #[tabled(rename = "Result")]
    pub result: String,
    #[tabled(skip)]
    pub ok: bool,
}

/// Render rows in the selected format
pub fn format_rows<T: Serialize + Tabled>(rows: &[T], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(rows).unwrap_or_else(|_| "[]".to_string())
        }
        OutputFormat::Table => Table::new(rows).with(Style::rounded()).to_string(),
        OutputFormat::Text => Table::new(rows).with(Style::blank()).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_str() {
        assert_eq!(OutputFormat::from("JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::from("table"), OutputFormat::Table);
        assert_eq!(OutputFormat::from("anything"), OutputFormat::Text);
    }

    #[test]
    fn test_channel_rows_as_json() {
        let channel = Channel::new("News", "http://a/news.m3u8");
        let rows = vec![ChannelRow::from_channel(0, &channel, Capabilities::default())];

        let json = format_rows(&rows, OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value[0]["number"], 1);
        assert_eq!(value[0]["variant"], "hls");
        assert_eq!(value[0]["group"], "");
    }

    #[test]
    fn test_table_has_headers() {
        let channel = Channel::new("Direct", "http://b/direct.ts");
        let rows = vec![ChannelRow::from_channel(1, &channel, Capabilities::default())];

        let table = format_rows(&rows, OutputFormat::Table);
        assert!(table.contains("Variant"));
        assert!(table.contains("direct"));
    }
}
