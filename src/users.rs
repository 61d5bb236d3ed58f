// Copyright (c) 2024-2026 Nervosys LLC
// SPDX-License-Identifier: AGPL-3.0-only
//! Directory users with manager and Copilot license details

use crate::client::paging::fetch_all;
use crate::client::transport::HttpTransport;
use crate::client::ApiClient;
use crate::error::{AuditError, Result};
use serde::{Deserialize, Serialize, Serializer};

/// `$select` projection for the users query
pub const USER_SELECT: &str =
    "id,displayName,userPrincipalName,jobTitle,department,city,country,usageLocation,assignedLicenses";

/// User as returned by `GET /users`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphUser {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub user_principal_name: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub usage_location: Option<String>,
    #[serde(default)]
    pub assigned_licenses: Option<Vec<AssignedLicense>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedLicense {
    #[serde(default)]
    pub sku_id: Option<String>,
}

/// Manager as returned by `GET /users/{id}/manager`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphManager {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    user_principal_name: Option<String>,
}

/// Written as `True` / `False`
fn python_bool<S: Serializer>(
    value: &bool,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(if *value { "True" } else { "False" })
}

/// One row of `Copilot_Users.csv`; field order is the column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    #[serde(rename = "EntraID")]
    pub entra_id: String,
    #[serde(rename = "DisplayName")]
    pub display_name: String,
    #[serde(rename = "UserPrincipalName")]
    pub user_principal_name: String,
    #[serde(rename = "JobTitle")]
    pub job_title: String,
    #[serde(rename = "Department")]
    pub department: String,
    #[serde(rename = "City")]
    pub city: String,
    #[serde(rename = "Country")]
    pub country: String,
    #[serde(rename = "UsageLocation")]
    pub usage_location: String,
    #[serde(rename = "ManagerName")]
    pub manager_name: String,
    #[serde(rename = "ManagerUPN")]
    pub manager_upn: String,
    #[serde(rename = "HasCopilotLicense", serialize_with = "python_bool")]
    pub has_copilot_license: bool,
}

impl UserRecord {
    fn from_graph(user: &GraphUser, skus: &SkuAllowList) -> Self {
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        Self {
            entra_id: text(&user.id),
            display_name: text(&user.display_name),
            user_principal_name: text(&user.user_principal_name),
            job_title: text(&user.job_title),
            department: text(&user.department),
            city: text(&user.city),
            country: text(&user.country),
            usage_location: text(&user.usage_location),
            manager_name: String::new(),
            manager_upn: String::new(),
            has_copilot_license: skus.has_copilot_license(user),
        }
    }
}

/// SKU ids counted as a Copilot license, compared case-insensitively
#[derive(Debug, Clone)]
pub struct SkuAllowList {
    sku_ids: Vec<String>,
}

impl SkuAllowList {
    pub fn new<S: AsRef<str>>(sku_ids: &[S]) -> Self {
        Self {
            sku_ids: sku_ids
                .iter()
                .map(|s| s.as_ref().trim().to_lowercase())
                .collect(),
        }
    }

    pub fn contains(&self, sku_id: &str) -> bool {
        let sku_id = sku_id.trim().to_lowercase();
        self.sku_ids.iter().any(|allowed| *allowed == sku_id)
    }

    pub fn has_copilot_license(&self, user: &GraphUser) -> bool {
        user.assigned_licenses
            .iter()
            .flatten()
            .filter_map(|l| l.sku_id.as_deref())
            .any(|sku| self.contains(sku))
    }
}

/// Result of a user pass
#[derive(Debug)]
pub struct UserReport {
    pub users: Vec<UserRecord>,
    /// Users whose manager lookup failed or found none
    pub unresolved_managers: usize,
    /// Paging failure after which the user list may be incomplete
    pub interrupted: Option<AuditError>,
}

pub struct UserReportBuilder<'a, T: HttpTransport> {
    client: &'a mut ApiClient<T>,
    skus: SkuAllowList,
}

impl<'a, T: HttpTransport> UserReportBuilder<'a, T> {
    pub fn new(client: &'a mut ApiClient<T>, skus: SkuAllowList) -> Self {
        Self { client, skus }
    }

    /// Fetch users with a job title, resolve managers and license flags.
    ///
    /// A token failure before any user was read is returned as an error; other
    /// paging failures keep the users read so far.
    pub fn build(&mut self) -> Result<UserReport> {
        log::info!("Fetching users from Microsoft Graph...");
        let paged = fetch_all::<GraphUser, T>(
            self.client,
            "/users",
            &[
                ("$filter", "jobTitle ne null"),
                ("$select", USER_SELECT),
                ("$top", "999"),
                ("$count", "true"),
            ],
        );

        if let Some(err) = paged.interrupted {
            if paged.items.is_empty() && err.is_auth() {
                return Err(err);
            }
            log::warn!(
                "User listing incomplete after {} request(s): {}",
                paged.requests,
                err
            );
            return Ok(self.resolve(paged.items, Some(err)));
        }

        Ok(self.resolve(paged.items, None))
    }

    fn resolve(
        &mut self,
        graph_users: Vec<GraphUser>,
        interrupted: Option<AuditError>,
    ) -> UserReport {
        log::info!("Retrieved {} users with job titles", graph_users.len());

        let total = graph_users.len();
        let mut users = Vec::with_capacity(total);
        let mut unresolved_managers = 0;

        for (i, graph_user) in graph_users.iter().enumerate() {
            if (i + 1) % 50 == 0 {
                log::info!("Processing user {} of {}...", i + 1, total);
            }

            let mut record = UserRecord::from_graph(graph_user, &self.skus);
            match self.lookup_manager(&record.entra_id) {
                Ok(manager) => {
                    record.manager_name = manager.display_name.unwrap_or_default();
                    record.manager_upn = manager.user_principal_name.unwrap_or_default();
                }
                Err(e) => {
                    unresolved_managers += 1;
                    log::debug!(
                        "Could not retrieve manager for user {}: {}",
                        record.user_principal_name,
                        e
                    );
                }
            }
            users.push(record);
        }

        if unresolved_managers > 0 {
            log::info!(
                "Manager not resolved for {} of {} users",
                unresolved_managers,
                total
            );
        }

        UserReport {
            users,
            unresolved_managers,
            interrupted,
        }
    }

    fn lookup_manager(&mut self, user_id: &str) -> Result<GraphManager> {
        if user_id.is_empty() {
            return Err(AuditError::Parse("user has no id".to_string()));
        }
        let endpoint = format!("/users/{}/manager", urlencoding::encode(user_id));
        self.client.graph_get(&endpoint, &[])?.json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_config;
    use crate::client::transport::testing::FakeTransport;
    use crate::client::transport::HttpResponse;
    use crate::config::DEFAULT_COPILOT_SKU_ID;
    use serde_json::json;

    const USERS: &str = "https://graph.test/v1.0/users";

    fn graph_user(id: &str, skus: &[&str]) -> GraphUser {
        serde_json::from_value(json!({
            "id": id,
            "userPrincipalName": format!("{}@contoso.com", id),
            "jobTitle": "Engineer",
            "assignedLicenses": skus.iter().map(|s| json!({ "skuId": s, "disabledPlans": [] })).collect::<Vec<_>>()
        }))
        .unwrap()
    }

    #[test]
    fn test_license_match_ignores_case() {
        let skus = SkuAllowList::new(&[DEFAULT_COPILOT_SKU_ID]);
        let upper = DEFAULT_COPILOT_SKU_ID.to_uppercase();
        assert!(skus.has_copilot_license(&graph_user("a", &["other", upper.as_str()])));
        assert!(!skus.has_copilot_license(&graph_user("b", &["c5928f49-12ba-48f7-ada3-0d743a3601d5"])));
        assert!(!skus.has_copilot_license(&graph_user("c", &[])));
    }

    #[test]
    fn test_license_allow_list_override() {
        let skus = SkuAllowList::new(&["AAAA-1111".to_string()]);
        assert!(skus.has_copilot_license(&graph_user("a", &["aaaa-1111"])));
        assert!(!skus.has_copilot_license(&graph_user("b", &[DEFAULT_COPILOT_SKU_ID])));
    }

    #[test]
    fn test_null_licenses() {
        let user: GraphUser =
            serde_json::from_value(json!({ "id": "x", "assignedLicenses": null, "city": null }))
                .unwrap();
        let skus = SkuAllowList::new(&[DEFAULT_COPILOT_SKU_ID]);
        assert!(!skus.has_copilot_license(&user));
        assert_eq!(UserRecord::from_graph(&user, &skus).city, "");
    }

    #[test]
    fn test_build_resolves_managers_best_effort() {
        let transport = FakeTransport::new();
        transport
            .respond(
                USERS,
                HttpResponse::new(
                    200,
                    json!({ "value": [
                        { "id": "u1", "displayName": "Adele", "userPrincipalName": "adele@contoso.com",
                          "jobTitle": "Engineer", "assignedLicenses": [{ "skuId": DEFAULT_COPILOT_SKU_ID }] },
                        { "id": "u2", "displayName": "Lee", "userPrincipalName": "lee@contoso.com",
                          "jobTitle": "CEO", "assignedLicenses": [] }
                    ]})
                    .to_string(),
                ),
            )
            .respond(
                "https://graph.test/v1.0/users/u1/manager",
                HttpResponse::new(
                    200,
                    r#"{"displayName":"Lee","userPrincipalName":"lee@contoso.com"}"#,
                ),
            )
            .respond(
                "https://graph.test/v1.0/users/u2/manager",
                HttpResponse::new(403, r#"{"error":{"code":"Authorization_RequestDenied"}}"#),
            );

        let mut client = ApiClient::new(transport, &test_config());
        let report = UserReportBuilder::new(&mut client, SkuAllowList::new(&[DEFAULT_COPILOT_SKU_ID]))
            .build()
            .unwrap();

        assert_eq!(report.users.len(), 2);
        assert_eq!(report.unresolved_managers, 1);
        assert!(report.interrupted.is_none());

        let adele = &report.users[0];
        assert_eq!(adele.manager_name, "Lee");
        assert_eq!(adele.manager_upn, "lee@contoso.com");
        assert!(adele.has_copilot_license);

        let lee = &report.users[1];
        assert_eq!(lee.manager_name, "");
        assert!(!lee.has_copilot_license);

        let first = &client.transport().requests_to(USERS)[0];
        assert!(first
            .query
            .contains(&("$filter".to_string(), "jobTitle ne null".to_string())));
        assert!(first
            .query
            .contains(&("$select".to_string(), USER_SELECT.to_string())));
    }

    #[test]
    fn test_build_fails_when_token_unavailable() {
        let transport = FakeTransport::new();
        transport.respond(
            "https://login.test/contoso/oauth2/v2.0/token",
            HttpResponse::new(400, r#"{"error":"unauthorized_client"}"#),
        );
        let mut client = ApiClient::new(transport, &test_config());
        let err = UserReportBuilder::new(&mut client, SkuAllowList::new(&[DEFAULT_COPILOT_SKU_ID]))
            .build()
            .unwrap_err();
        assert!(err.is_auth());
    }

    #[test]
    fn test_csv_header_order() {
        let record = UserRecord::from_graph(&graph_user("u1", &[]), &SkuAllowList::new(&["x"]));
        let mut writer = csv::Writer::from_writer(vec![]);
        writer.serialize(&record).unwrap();
        let out = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        let header = out.lines().next().unwrap();
        assert_eq!(
            header,
            "EntraID,DisplayName,UserPrincipalName,JobTitle,Department,City,Country,UsageLocation,ManagerName,ManagerUPN,HasCopilotLicense"
        );
        assert!(out.lines().nth(1).unwrap().ends_with(",False"));
    }
}
