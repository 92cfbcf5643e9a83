//! HTTP transport for the remote record service
//!
//! Speaks the SharePoint-style REST dialect:
//! `/_api/web/lists/getbytitle('<list>')/items` with OData `$select`,
//! `$expand`, `$filter`, `$orderby`, `$top` and `$skip` parameters.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use shared::models::Employee;

use super::{CurrentUser, FieldDefinition, FieldMap, RemoteError, RemoteQuery, RemoteRecordService, RemoteResult};
use crate::config::ClientConfig;
use crate::query::{render_filter, render_order_by};

/// Server page size when the whole list is read (`odata.nextLink` is followed)
const PAGE_ROWS: u32 = 5000;

const ODATA_JSON: &str = "application/json;odata=nometadata";

/// `{"value": [...], "odata.nextLink": "..."}` collection envelope
#[derive(Debug, Deserialize)]
struct Collection<T> {
    value: Vec<T>,
    #[serde(rename = "odata.nextLink", default)]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SiteUser {
    id: u64,
    title: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    is_site_admin: bool,
}

impl SiteUser {
    fn into_employee(self) -> Employee {
        Employee::new(self.id, self.title, self.email.unwrap_or_default())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Titled {
    title: String,
}

/// OData string literal
fn literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn list_path(list: &str) -> String {
    format!("_api/web/lists/getbytitle({})", literal(list))
}

/// OData parameters for an item query
fn query_params(query: &RemoteQuery) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();

    if !query.select.is_empty() {
        params.push(("$select", query.select.join(",")));
    }
    if !query.expand.is_empty() {
        params.push(("$expand", query.expand.join(",")));
    }
    if let Some(filter) = query.filter.as_ref().and_then(render_filter) {
        params.push(("$filter", filter));
    }
    if let Some(sort) = query.order_by {
        params.push(("$orderby", render_order_by(sort)));
    }
    params.push(("$top", query.top.unwrap_or(PAGE_ROWS).to_string()));
    if let Some(skip) = query.skip {
        params.push(("$skip", skip.to_string()));
    }

    params
}

/// HTTP client for the remote list service
#[derive(Debug, Clone)]
pub struct HttpRecordService {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpRecordService {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> RemoteResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url: String = base_url.into();

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Build from configuration; `None` when no remote URL is configured
    pub fn from_config(config: &ClientConfig) -> Option<RemoteResult<Self>> {
        let base_url = config.base_url()?;
        Some(Self::new(base_url, config.request_timeout()).map(|service| match &config.remote_token {
            Some(token) => service.with_token(token.clone()),
            None => service,
        }))
    }

    /// Set the authentication token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.request_url(method, &format!("{}/{}", self.base_url, path))
    }

    /// Request against an absolute URL (server-supplied continuation links)
    fn request_url(&self, method: Method, url: &str) -> RequestBuilder {
        let mut request = self
            .client
            .request(method, url)
            .header(reqwest::header::ACCEPT, ODATA_JSON);

        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        request
    }

    /// POST with an `X-HTTP-Method` override (MERGE / DELETE)
    fn tunnel(&self, verb: &str, path: &str) -> RequestBuilder {
        self.request(Method::POST, path)
            .header("X-HTTP-Method", verb)
            .header(reqwest::header::IF_MATCH, "*")
    }

    /// Profile photo URL for `email`, if the directory serves one
    pub async fn lookup_user_photo(&self, email: &str) -> RemoteResult<Option<String>> {
        let request = self
            .request(Method::HEAD, "_layouts/15/userphoto.aspx")
            .query(&[("size", "M"), ("accountname", email)])
            .build()?;
        let url = request.url().to_string();

        let response = self.client.execute(request).await?;
        match response.status() {
            status if status.is_success() => Ok(Some(url)),
            StatusCode::NOT_FOUND => Ok(None),
            _ => Self::check(response).await.map(|_| None),
        }
    }

    async fn check(response: reqwest::Response) -> RemoteResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await?;
        Err(match status {
            StatusCode::UNAUTHORIZED => RemoteError::Unauthorized,
            StatusCode::FORBIDDEN => RemoteError::Forbidden(text),
            StatusCode::NOT_FOUND => RemoteError::NotFound(text),
            _ => RemoteError::Status {
                status: status.as_u16(),
                message: text,
            },
        })
    }

    /// Handle the HTTP response
    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> RemoteResult<T> {
        let response = Self::check(response).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| RemoteError::InvalidResponse(e.to_string()))
    }

    async fn handle_empty(response: reqwest::Response) -> RemoteResult<()> {
        Self::check(response).await.map(|_| ())
    }
}

#[async_trait]
impl RemoteRecordService for HttpRecordService {
    async fn list_exists(&self, list: &str) -> RemoteResult<bool> {
        let response = self
            .request(Method::GET, "_api/web/lists")
            .query(&[("$select", "Title".to_string()), ("$filter", format!("Title eq {}", literal(list)))])
            .send()
            .await?;
        let lists: Collection<Titled> = Self::handle_response(response).await?;
        Ok(lists.value.iter().any(|l| l.title == list))
    }

    async fn create_list(&self, list: &str, description: &str) -> RemoteResult<()> {
        let body = json!({
            "Title": list,
            "Description": description,
            "BaseTemplate": 100,
            "AllowContentTypes": true,
            "ContentTypesEnabled": false,
        });
        let response = self
            .request(Method::POST, "_api/web/lists")
            .json(&body)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn ensure_field(&self, list: &str, field: &FieldDefinition) -> RemoteResult<bool> {
        let fields_path = format!("{}/fields", list_path(list));
        let response = self
            .request(Method::GET, &fields_path)
            .query(&[
                ("$select", "InternalName".to_string()),
                ("$filter", format!("InternalName eq {}", literal(field.name))),
            ])
            .send()
            .await?;
        let existing: Collection<Value> = Self::handle_response(response).await?;
        if !existing.value.is_empty() {
            return Ok(false);
        }

        let body = json!({
            "parameters": {
                "SchemaXml": field.schema_xml(),
                "Options": 8,
            }
        });
        let response = self
            .request(Method::POST, &format!("{}/createfieldasxml", fields_path))
            .json(&body)
            .send()
            .await?;
        Self::check(response).await?;

        tracing::debug!(list, field = field.name, "Remote field created");
        Ok(true)
    }

    async fn query_items(&self, list: &str, query: &RemoteQuery) -> RemoteResult<Vec<FieldMap>> {
        let response = self
            .request(Method::GET, &format!("{}/items", list_path(list)))
            .query(&query_params(query))
            .send()
            .await?;
        let mut page: Collection<FieldMap> = Self::handle_response(response).await?;
        let mut items = std::mem::take(&mut page.value);

        // An explicit $top is a page request; otherwise read every page
        if query.top.is_none() {
            while let Some(next) = page.next_link.take() {
                let response = self.request_url(Method::GET, &next).send().await?;
                page = Self::handle_response(response).await?;
                items.append(&mut page.value);
            }
        }

        tracing::debug!(list, count = items.len(), "Remote items read");
        Ok(items)
    }

    async fn get_item(&self, list: &str, id: u64) -> RemoteResult<FieldMap> {
        let query = RemoteQuery::requests(None);
        let response = self
            .request(Method::GET, &format!("{}/items({})", list_path(list), id))
            .query(&[("$select", query.select.join(",")), ("$expand", query.expand.join(","))])
            .send()
            .await?;
        Self::handle_response(response).await
    }

    async fn add_item(&self, list: &str, fields: FieldMap) -> RemoteResult<u64> {
        let response = self
            .request(Method::POST, &format!("{}/items", list_path(list)))
            .json(&fields)
            .send()
            .await?;
        let created: FieldMap = Self::handle_response(response).await?;

        created
            .get("Id")
            .and_then(Value::as_u64)
            .ok_or_else(|| RemoteError::InvalidResponse("Created item carries no Id".to_string()))
    }

    async fn update_item(&self, list: &str, id: u64, fields: FieldMap) -> RemoteResult<()> {
        let response = self
            .tunnel("MERGE", &format!("{}/items({})", list_path(list), id))
            .json(&fields)
            .send()
            .await?;
        Self::handle_empty(response).await
    }

    async fn delete_item(&self, list: &str, id: u64) -> RemoteResult<()> {
        let response = self
            .tunnel("DELETE", &format!("{}/items({})", list_path(list), id))
            .send()
            .await?;
        Self::handle_empty(response).await
    }

    async fn current_user(&self) -> RemoteResult<CurrentUser> {
        let response = self
            .request(Method::GET, "_api/web/currentuser")
            .query(&[("$select", "Id,Title,Email,IsSiteAdmin")])
            .send()
            .await?;
        let user: SiteUser = Self::handle_response(response).await?;
        let is_site_admin = user.is_site_admin;

        Ok(CurrentUser {
            employee: user.into_employee(),
            is_site_admin,
        })
    }

    async fn current_user_groups(&self) -> RemoteResult<Vec<String>> {
        let response = self
            .request(Method::GET, "_api/web/currentuser/groups")
            .query(&[("$select", "Title")])
            .send()
            .await?;
        let groups: Collection<Titled> = Self::handle_response(response).await?;
        Ok(groups.value.into_iter().map(|g| g.title).collect())
    }

    async fn search_users(&self, text: &str, top: usize) -> RemoteResult<Vec<Employee>> {
        let term = literal(text.trim());
        let response = self
            .request(Method::GET, "_api/web/siteusers")
            .query(&[
                ("$select", "Id,Title,Email".to_string()),
                (
                    "$filter",
                    format!(
                        "PrincipalType eq 1 and (substringof({term}, Title) or substringof({term}, Email))"
                    ),
                ),
                ("$top", top.to_string()),
            ])
            .send()
            .await?;
        let users: Collection<SiteUser> = Self::handle_response(response).await?;
        Ok(users.value.into_iter().map(SiteUser::into_employee).collect())
    }
}
