//! Execution-event notifications for the Jenkins Rundeck webhook.
//!
//! ```text
//! <notification><executions><execution id= href= status= project=>
//!   <argstring/> <user/> <abortedby/>
//!   <date-started unixtime=/> <date-ended unixtime=/>
//!   <job id= averageDuration=> <name/> <description/> <group/> <project/> </job>
//! </execution></executions></notification>
//! ```
//!
//! Values that are absent from the execution are left out of the document.

use jenkins_client::JenkinsClient;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::non_blank;
use crate::error::{BuildError, Result};

// ---------------------------------------------------------------------------
// Execution data
// ---------------------------------------------------------------------------

/// One job-scheduler execution, as handed to notification hooks.
///
/// Ids, timestamps and durations arrive as numbers or strings depending on
/// the sender, so they are kept as raw JSON values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionData {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub argstring: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub abortedby: Option<String>,
    #[serde(default)]
    pub date_started_unixtime: Option<Value>,
    #[serde(default)]
    pub date_ended_unixtime: Option<Value>,
    #[serde(default)]
    pub job: JobData,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobData {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub average_duration: Option<Value>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
}

fn scalar_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Element tree
// ---------------------------------------------------------------------------

/// Minimal XML element: attributes, optional text, child elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    text: Option<String>,
    children: Vec<Element>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            text: None,
            children: Vec::new(),
        }
    }

    /// Adds the attribute only when `value` is present.
    pub fn attr(mut self, name: &str, value: Option<String>) -> Self {
        if let Some(value) = value {
            self.attributes.push((name.to_string(), value));
        }
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Adds `<name>text</name>` only when `text` is present.
    pub fn text_child(self, name: &str, text: Option<&str>) -> Self {
        match text {
            Some(text) => self.child(Element::new(name).text(text)),
            None => self,
        }
    }

    /// Adds `<name attr="value"/>` only when `value` is present.
    pub fn attr_child(self, name: &str, attr: &str, value: Option<String>) -> Self {
        match value {
            Some(value) => self.child(Element::new(name).attr(attr, Some(value))),
            None => self,
        }
    }

    /// Compact document with an XML declaration.
    pub fn to_xml(&self) -> String {
        let mut out = String::from(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        self.write(&mut out);
        out
    }

    fn write(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (name, value) in &self.attributes {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            escape_into(value, out);
            out.push('"');
        }
        if self.text.is_none() && self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        if let Some(text) = &self.text {
            escape_into(text, out);
        }
        for child in &self.children {
            child.write(out);
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

fn escape_into(raw: &str, out: &mut String) {
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
}

pub fn notification_document(execution: &ExecutionData) -> Element {
    let job = &execution.job;
    let job_element = Element::new("job")
        .attr("id", scalar_text(job.id.as_ref()))
        .attr("averageDuration", scalar_text(job.average_duration.as_ref()))
        .text_child("name", job.name.as_deref())
        .text_child("description", job.description.as_deref())
        .text_child("group", job.group.as_deref())
        .text_child("project", job.project.as_deref());

    let execution_element = Element::new("execution")
        .attr("id", scalar_text(execution.id.as_ref()))
        .attr("href", execution.href.clone())
        .attr("status", execution.status.clone())
        .attr("project", execution.project.clone())
        .text_child("argstring", execution.argstring.as_deref())
        .text_child("user", execution.user.as_deref())
        .text_child("abortedby", execution.abortedby.as_deref())
        .attr_child(
            "date-started",
            "unixtime",
            scalar_text(execution.date_started_unixtime.as_ref()),
        )
        .attr_child(
            "date-ended",
            "unixtime",
            scalar_text(execution.date_ended_unixtime.as_ref()),
        )
        .child(job_element);

    Element::new("notification").child(Element::new("executions").child(execution_element))
}

// ---------------------------------------------------------------------------
// Delivery
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebhookConfig {
    pub base_url: Option<String>,
    pub user_id: Option<String>,
    pub api_token: Option<String>,
}

/// Render the notification for `execution` and post it to the webhook.
pub async fn deliver_notification(config: &WebhookConfig, execution: &ExecutionData) -> Result<()> {
    let base_url = non_blank(config.base_url.as_deref())
        .ok_or_else(|| BuildError::Configuration("base_url is required".into()))?;
    let client = JenkinsClient::builder(base_url)
        .user_id(non_blank(config.user_id.as_deref()).map(str::to_string))
        .api_token(non_blank(config.api_token.as_deref()).map(str::to_string))
        .build()
        .map_err(|_| {
            BuildError::Configuration(format!("invalid Jenkins base URL. base_url={base_url}"))
        })?;

    let document = notification_document(execution).to_xml();
    let execution_id = scalar_text(execution.id.as_ref());
    tracing::info!(
        execution = execution_id.as_deref().unwrap_or("-"),
        status = execution.status.as_deref().unwrap_or("-"),
        "delivering notification"
    );
    client.deliver(document).await?;
    Ok(())
}
