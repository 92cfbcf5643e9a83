//! List schema and idempotent provisioning

use shared::models::{MAX_TOTAL_DAYS, RequestState};

use super::{RemoteRecordService, RemoteResult};

/// Column types the remote service understands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    /// Multi-line text
    Note,
    DateTime,
    Number { min: u32, max: u32 },
    Choice(Vec<&'static str>),
    /// Reference to a directory user
    User,
}

impl FieldKind {
    /// Remote type name
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Text => "Text",
            Self::Note => "Note",
            Self::DateTime => "DateTime",
            Self::Number { .. } => "Number",
            Self::Choice(_) => "Choice",
            Self::User => "User",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDefinition {
    pub name: &'static str,
    pub display_name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldDefinition {
    pub fn new(name: &'static str, display_name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            display_name,
            kind,
            required: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Field schema XML accepted by `createfieldasxml`
    pub fn schema_xml(&self) -> String {
        let mut attrs = format!(
            r#"Type="{}" Name="{}" StaticName="{}" DisplayName="{}" Required="{}""#,
            self.kind.type_name(),
            self.name,
            self.name,
            self.display_name,
            if self.required { "TRUE" } else { "FALSE" },
        );

        let body = match &self.kind {
            FieldKind::DateTime => {
                attrs.push_str(r#" Format="DateOnly""#);
                String::new()
            }
            FieldKind::Number { min, max } => {
                attrs.push_str(&format!(r#" Min="{}" Max="{}" Decimals="0""#, min, max));
                String::new()
            }
            FieldKind::Note => {
                attrs.push_str(r#" NumLines="6" RichText="FALSE""#);
                String::new()
            }
            FieldKind::User => {
                attrs.push_str(r#" UserSelectionMode="PeopleOnly""#);
                String::new()
            }
            FieldKind::Choice(choices) => {
                let default = choices.first().copied().unwrap_or_default();
                let choices: String = choices
                    .iter()
                    .map(|c| format!("<CHOICE>{}</CHOICE>", c))
                    .collect();
                format!("<Default>{}</Default><CHOICES>{}</CHOICES>", default, choices)
            }
            FieldKind::Text => String::new(),
        };

        if body.is_empty() {
            format!("<Field {} />", attrs)
        } else {
            format!("<Field {}>{}</Field>", attrs, body)
        }
    }
}

/// A list and the columns it must carry
#[derive(Debug, Clone)]
pub struct ListSchema {
    pub title: String,
    pub description: String,
    pub fields: Vec<FieldDefinition>,
}

impl ListSchema {
    /// Columns of the vacation request list
    pub fn vacation_requests(title: impl Into<String>) -> Self {
        let states = RequestState::ALL.iter().map(|s| s.as_str()).collect();

        Self {
            title: title.into(),
            description: "Employee vacation requests".to_string(),
            fields: vec![
                FieldDefinition::new("Requester", "Requester", FieldKind::User).required(),
                FieldDefinition::new("RequesterEmail", "Requester email", FieldKind::Text),
                FieldDefinition::new("StartDate", "Start date", FieldKind::DateTime).required(),
                FieldDefinition::new("EndDate", "End date", FieldKind::DateTime).required(),
                FieldDefinition::new(
                    "TotalDays",
                    "Total days",
                    FieldKind::Number {
                        min: 1,
                        max: MAX_TOTAL_DAYS,
                    },
                )
                .required(),
                FieldDefinition::new("Reason", "Reason", FieldKind::Note),
                FieldDefinition::new("State", "State", FieldKind::Choice(states)).required(),
                FieldDefinition::new("RequestedAt", "Requested at", FieldKind::DateTime),
                FieldDefinition::new("Approver", "Approver", FieldKind::User),
                FieldDefinition::new("DecidedAt", "Decided at", FieldKind::DateTime),
                FieldDefinition::new("DecisionNotes", "Decision notes", FieldKind::Note),
            ],
        }
    }
}

/// What `ensure_list` had to create
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionReport {
    pub list_created: bool,
    pub fields_created: Vec<&'static str>,
}

/// Create the list when absent, then every missing field
///
/// Safe to call repeatedly.
pub async fn ensure_list(
    service: &dyn RemoteRecordService,
    schema: &ListSchema,
) -> RemoteResult<ProvisionReport> {
    let mut report = ProvisionReport::default();

    if !service.list_exists(&schema.title).await? {
        service.create_list(&schema.title, &schema.description).await?;
        report.list_created = true;
        tracing::info!(list = %schema.title, "Remote list created");
    }

    for field in &schema.fields {
        if service.ensure_field(&schema.title, field).await? {
            report.fields_created.push(field.name);
        }
    }

    if !report.fields_created.is_empty() {
        tracing::info!(
            list = %schema.title,
            fields = ?report.fields_created,
            "Remote fields provisioned"
        );
    }

    Ok(report)
}
